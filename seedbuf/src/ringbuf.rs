use crate::error::SeedBufError;
use crate::sync::{self, AtomicU64, Ordering};
use crate::CancelToken;
use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::ptr;
use std::sync::Weak;

// # Memory Ordering Strategy
//
// The ring is coordinated by three monotonic 64-bit cursors counting total
// bytes ever observed in each phase (never reduced modulo the capacity):
//
// - `started_writing`: bytes claimed by writers (fetch_add, Relaxed)
// - `finished_writing`: bytes durably written (published by CAS, Release)
// - `started_reading`: bytes claimed by readers (fetch_add, Relaxed)
//
// The copy into storage is sequenced before the Release CAS on
// `finished_writing`; a reader's Acquire load of `finished_writing`
// synchronizes-with that CAS, so a reader that observes a published range also
// observes its bytes. The writer-side Acquire load of `started_reading` pairs
// with the reader's claim so a writer never laps a reader by more than one
// trip around the buffer.
//
// The CAS publishes writes in claim order: a writer whose claim began after a
// still-unfinished earlier claim fails the CAS, reports zero progress, and
// surrenders its claim. Without this, `finished_writing` could advance past a
// gap of unwritten bytes and expose them to readers. Lost CAS work is retried
// by the caller; contention is never an error.
//
// There is no publish step on the read side. Claiming a range of positions is
// itself the commitment to consume them, so `started_reading` doubles as the
// finished-reading cursor.

/// A lock-free byte ring buffer carrying PRNG seed material from entropy
/// producers to reseeding consumers.
///
/// The ring upholds three invariants under any number of concurrent writers
/// and readers:
///
/// 1. No byte position is read before it has been written.
/// 2. Each byte position is read at most once between writes.
/// 3. Every byte that is read has the same value as a byte that was written.
///
/// The intended use is PRNG reseeding: a handful of threads read from slow
/// truly-random sources and [`write`](SeedRing::write) seed material, while
/// threads running simulations [`poll`](SeedRing::poll) and, when enough
/// bytes arrive, either replace their generator or jump it by a seed-shaped
/// distance. The ring never allocates per operation.
///
/// The capacity is fixed at construction and must be a power of two; logical
/// byte positions map to physical indices by masking with `capacity - 1`.
/// At 1 GB/s the 64-bit cursors take centuries to exhaust, so wraparound is
/// not handled.
pub struct SeedRing {
    capacity: u64,
    mask: u64,
    started_writing: CachePadded<AtomicU64>,
    finished_writing: CachePadded<AtomicU64>,
    started_reading: CachePadded<AtomicU64>,
    storage: Box<[UnsafeCell<u8>]>,
}

// The cursor discipline partitions storage so that any physical index is
// written by at most one claim and read by at most one claim at a time.
unsafe impl Send for SeedRing {}
unsafe impl Sync for SeedRing {}

impl SeedRing {
    /// Create a ring with the given capacity in bytes.
    ///
    /// Returns [`SeedBufError::CapacityNotPowerOfTwo`] unless `capacity` is a
    /// positive power of two.
    pub fn new(capacity: usize) -> Result<Self, SeedBufError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(SeedBufError::CapacityNotPowerOfTwo(capacity));
        }
        let mut storage = Vec::with_capacity(capacity);
        storage.resize_with(capacity, || UnsafeCell::new(0u8));
        Ok(SeedRing {
            capacity: capacity as u64,
            mask: capacity as u64 - 1,
            started_writing: CachePadded::new(AtomicU64::new(0)),
            finished_writing: CachePadded::new(AtomicU64::new(0)),
            started_reading: CachePadded::new(AtomicU64::new(0)),
            storage: storage.into_boxed_slice(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Total bytes ever claimed by writers.
    pub fn started_writing(&self) -> u64 {
        self.started_writing.load(Ordering::Relaxed)
    }

    /// Total bytes durably written and visible to readers.
    pub fn finished_writing(&self) -> u64 {
        self.finished_writing.load(Ordering::Acquire)
    }

    /// Total bytes ever claimed by readers.
    pub fn started_reading(&self) -> u64 {
        self.started_reading.load(Ordering::Acquire)
    }

    /// Published bytes not yet claimed by any reader.
    pub fn available(&self) -> u64 {
        self.finished_writing().saturating_sub(self.started_reading())
    }

    #[inline]
    fn storage_ptr(&self) -> *mut u8 {
        self.storage.as_ptr() as *mut UnsafeCell<u8> as *mut u8
    }

    /// Copy `src` into storage at logical position `pos`, wrapping at the end
    /// of the buffer.
    ///
    /// Caller must hold a claim covering `pos..pos + src.len()`.
    unsafe fn copy_in(&self, pos: u64, src: &[u8]) {
        let index = (pos & self.mask) as usize;
        let prefix = src.len().min(self.capacity as usize - index);
        let base = self.storage_ptr();
        ptr::copy_nonoverlapping(src.as_ptr(), base.add(index), prefix);
        ptr::copy_nonoverlapping(src.as_ptr().add(prefix), base, src.len() - prefix);
    }

    /// Copy from storage at logical position `pos` into `dest`, wrapping at
    /// the end of the buffer.
    ///
    /// Caller must hold a claim covering `pos..pos + dest.len()`.
    unsafe fn copy_out(&self, pos: u64, dest: &mut [u8]) {
        let index = (pos & self.mask) as usize;
        let prefix = dest.len().min(self.capacity as usize - index);
        let base = self.storage_ptr();
        ptr::copy_nonoverlapping(base.add(index), dest.as_mut_ptr(), prefix);
        ptr::copy_nonoverlapping(base, dest.as_mut_ptr().add(prefix), dest.len() - prefix);
    }

    /// Nonblocking write of up to `min(src.len(), capacity)` bytes.
    ///
    /// Returns the number of bytes actually written, possibly zero. A return
    /// of `k` guarantees those `k` bytes are contiguous in the logical stream
    /// and visible to any later [`poll`](SeedRing::poll) whose claim covers
    /// them; there are no partially visible writes. Zero is not an error, it
    /// means the buffer was full or publication lost a race with an earlier
    /// still-unfinished claim, and the caller may retry.
    pub fn offer(&self, src: &[u8]) -> usize {
        let desired = src.len().min(self.capacity as usize) as u64;
        if desired == 0 {
            return 0;
        }
        let write_start = self.started_writing.fetch_add(desired, Ordering::Relaxed);
        let write_limit = self.started_reading.load(Ordering::Acquire) + self.capacity;
        let mut actual = 0u64;
        if write_start < write_limit {
            actual = desired.min(write_limit - write_start);
            unsafe { self.copy_in(write_start, &src[..actual as usize]) };
            if self
                .finished_writing
                .compare_exchange(
                    write_start,
                    write_start + actual,
                    Ordering::Release,
                    Ordering::Relaxed,
                )
                .is_err()
            {
                // A claim that began before ours has not finished. Publishing
                // here would expose its unwritten gap to readers, so the
                // whole write is reported as failed and the claim surrendered.
                #[cfg(feature = "trace")]
                tracing::trace!(
                    write_start,
                    lost = actual,
                    "publish lost to an earlier unfinished claim"
                );
                actual = 0;
            }
        }
        if actual != desired {
            self.started_writing
                .fetch_sub(desired - actual, Ordering::Relaxed);
        }
        actual as usize
    }

    /// Nonblocking read of up to `min(dest.len(), capacity)` bytes.
    ///
    /// Returns the number of bytes actually read, possibly zero. A nonzero
    /// return is a commitment: those logical positions will never be returned
    /// to any reader again.
    pub fn poll(&self, dest: &mut [u8]) -> usize {
        let desired = dest.len().min(self.capacity as usize) as u64;
        if desired == 0 {
            return 0;
        }
        let read_start = self.started_reading.fetch_add(desired, Ordering::Relaxed);
        let written = self.finished_writing.load(Ordering::Acquire);
        let mut actual = 0u64;
        if read_start < written {
            actual = desired.min(written - read_start);
            unsafe { self.copy_out(read_start, &mut dest[..actual as usize]) };
        }
        if actual < desired {
            self.started_reading
                .fetch_sub(desired - actual, Ordering::Relaxed);
        }
        actual as usize
    }

    /// All-or-nothing read of exactly `dest.len()` bytes.
    ///
    /// On a partial poll the already-claimed bytes are pushed back into the
    /// ring. The pushback can itself fall short under contention; bytes that
    /// cannot be returned are discarded, which is safe for seed material.
    pub fn poll_exact(&self, dest: &mut [u8]) -> bool {
        if dest.len() > self.capacity as usize {
            // A read of more than the capacity can never succeed.
            return false;
        }
        let actually_read = self.poll(dest);
        if actually_read >= dest.len() {
            return true;
        }
        if actually_read > 0 {
            let _ = self.offer(&dest[..actually_read]);
        }
        false
    }

    /// Blocking write of exactly `src.len()` bytes.
    ///
    /// Spins with a CPU wait hint on zero progress; there is no kernel park.
    /// Deadlock-free provided enough bytes are eventually polled for.
    /// Starvation is possible when the number of writing threads exceeds the
    /// number of physical cores; that is accepted behavior. Observes `cancel`
    /// on every retry and returns [`SeedBufError::Cancelled`] once it is set,
    /// leaving the ring consistent.
    pub fn write(&self, src: &[u8], cancel: &CancelToken) -> Result<(), SeedBufError> {
        let mut written = 0;
        while written < src.len() {
            if cancel.is_cancelled() {
                return Err(SeedBufError::Cancelled);
            }
            let n = self.offer(&src[written..]);
            if n == 0 {
                sync::spin_wait();
            }
            written += n;
        }
        Ok(())
    }

    /// Blocking write of exactly `src.len()` bytes through a weak handle.
    ///
    /// Returns early, without error, if the ring dies before all bytes are
    /// written; this is the producer-side termination hook. The strong handle
    /// is re-acquired on every iteration, so the ring can die mid-write.
    pub fn write_weak(
        ring: &Weak<SeedRing>,
        src: &[u8],
        cancel: &CancelToken,
    ) -> Result<(), SeedBufError> {
        let mut written = 0;
        while written < src.len() {
            if cancel.is_cancelled() {
                return Err(SeedBufError::Cancelled);
            }
            let n = match ring.upgrade() {
                Some(ring) => ring.offer(&src[written..]),
                None => return Ok(()),
            };
            if n == 0 {
                sync::spin_wait();
            }
            written += n;
        }
        Ok(())
    }

    /// Blocking read of exactly `dest.len()` bytes.
    ///
    /// Spins with a CPU wait hint on zero progress. Deadlock-free provided
    /// enough bytes are eventually offered. Observes `cancel` on every retry.
    pub fn read(&self, dest: &mut [u8], cancel: &CancelToken) -> Result<(), SeedBufError> {
        let mut read = 0;
        while read < dest.len() {
            if cancel.is_cancelled() {
                return Err(SeedBufError::Cancelled);
            }
            let n = self.poll(&mut dest[read..]);
            if n == 0 {
                sync::spin_wait();
            }
            read += n;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        let finished = self.finished_writing();
        let started = self.started_writing();
        assert!(
            finished <= started,
            "finished_writing {finished} > started_writing {started}"
        );
        let finished_again = self.finished_writing();
        assert!(
            finished <= finished_again,
            "finished_writing moved backwards"
        );
        assert!(
            self.started_reading() <= finished_again,
            "a reader claimed past the published range"
        );
    }
}

impl std::fmt::Debug for SeedRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedRing")
            .field("capacity", &self.capacity)
            .field("started_writing", &self.started_writing)
            .field("finished_writing", &self.finished_writing)
            .field("started_reading", &self.started_reading)
            .finish()
    }
}
