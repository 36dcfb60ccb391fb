use crate::error::ReseedError;
use crate::source::{EntropySource, OsEntropySource};
use seedbuf::{CancelToken, SeedBufError, SeedRing};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// A long-running worker that moves bytes from an entropy source into a
/// seed ring.
///
/// The worker holds only a weak handle to the ring: dropping the last strong
/// handle is how the owning side shuts its producers down. Each iteration
/// fills the staging buffer from the source and pushes it with the blocking
/// weak-handle write, so a worker parked on a full ring still notices the
/// ring dying or its token being cancelled.
pub struct SeedReader<S> {
    ring: Weak<SeedRing>,
    staging: Box<[u8]>,
    source: S,
    cancel: CancelToken,
}

impl SeedReader<OsEntropySource> {
    /// A reader that draws from the operating system's CSPRNG.
    pub fn os(ring: &Arc<SeedRing>, read_size: usize) -> Self {
        SeedReader::new(ring, read_size, OsEntropySource)
    }
}

impl<S: EntropySource> SeedReader<S> {
    /// Create a reader that fills `read_size` bytes from `source` per
    /// iteration.
    pub fn new(ring: &Arc<SeedRing>, read_size: usize, source: S) -> Self {
        SeedReader {
            ring: Arc::downgrade(ring),
            staging: vec![0u8; read_size].into_boxed_slice(),
            source,
            cancel: CancelToken::new(),
        }
    }

    /// A handle that stops the worker from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run until the ring dies or the token is cancelled.
    ///
    /// Both shutdown paths return `Ok`. An entropy source failure is returned
    /// to the caller; what to do about a broken source is its policy, not the
    /// worker's.
    pub fn run(mut self) -> Result<(), ReseedError> {
        debug!(read_size = self.staging.len(), "seed reader started");
        loop {
            if self.ring.upgrade().is_none() {
                debug!("seed ring dropped, seed reader exiting");
                return Ok(());
            }
            if self.cancel.is_cancelled() {
                debug!("seed reader cancelled");
                return Ok(());
            }
            self.source.fill_bytes(&mut self.staging)?;
            match SeedRing::write_weak(&self.ring, &self.staging, &self.cancel) {
                Ok(()) => {}
                Err(SeedBufError::Cancelled) => {
                    debug!("seed reader cancelled mid-write");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl<S: EntropySource + Send + 'static> SeedReader<S> {
    /// Run the worker on its own named thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<Result<(), ReseedError>>> {
        thread::Builder::new()
            .name("seed-reader".to_string())
            .spawn(move || {
                let result = self.run();
                if let Err(ref err) = result {
                    warn!(error = ?err, "seed reader failed");
                }
                result
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::Result;
    use std::time::Duration;

    /// Deterministic source: every byte produced is the next value of a
    /// wrapping counter.
    struct CountingSource {
        next: u8,
    }

    impl EntropySource for CountingSource {
        fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), ReseedError> {
            for byte in dest {
                *byte = self.next;
                self.next = self.next.wrapping_add(1);
            }
            Ok(())
        }
    }

    #[test]
    fn delivers_source_bytes_in_order() -> Result<()> {
        let ring = Arc::new(SeedRing::new(64)?);
        let reader = SeedReader::new(&ring, 16, CountingSource { next: 0 });
        let handle = reader.spawn()?;

        let mut received = [0u8; 48];
        ring.read(&mut received, &CancelToken::new())?;
        let expected: Vec<u8> = (0..48).collect();
        assert_eq!(received.to_vec(), expected);

        drop(ring);
        handle.join().expect("reader thread panicked")?;
        Ok(())
    }

    #[test]
    fn exits_cleanly_when_the_ring_dies_while_it_is_parked() -> Result<()> {
        // Capacity below the read size keeps the worker parked mid-write.
        let ring = Arc::new(SeedRing::new(8)?);
        let reader = SeedReader::new(&ring, 16, CountingSource { next: 0 });
        let handle = reader.spawn()?;

        std::thread::sleep(Duration::from_millis(20));
        drop(ring);
        handle.join().expect("reader thread panicked")?;
        Ok(())
    }

    #[test]
    fn cancellation_is_a_graceful_exit() -> Result<()> {
        let ring = Arc::new(SeedRing::new(8)?);
        let reader = SeedReader::new(&ring, 16, CountingSource { next: 0 });
        let cancel = reader.cancel_token();
        let handle = reader.spawn()?;

        std::thread::sleep(Duration::from_millis(20));
        cancel.cancel();
        handle.join().expect("reader thread panicked")?;
        Ok(())
    }
}
