use crate::traits::SeedFactory;
use rand_core::RngCore;
use seedbuf::{CancelToken, SeedRing};
use std::cell::RefCell;
use std::sync::{Arc, Mutex};
use thread_local::ThreadLocal;

/// Where a thread's first seed comes from. Reseeds always come from the ring.
enum InitialSeed {
    Ring,
    Splittable(Mutex<Box<dyn RngCore + Send>>),
}

struct Slot<R> {
    delegate: Option<R>,
    seed: Box<[u8]>,
}

struct Shared<R: Send, F> {
    ring: Arc<SeedRing>,
    seed_size: usize,
    factory: F,
    initial: InitialSeed,
    slots: ThreadLocal<RefCell<Slot<R>>>,
    cancel: CancelToken,
}

/// A replacing generator with one delegate per thread.
///
/// The contract matches [`ReseedingRng`](crate::ReseedingRng), except that
/// the current delegate lives in a per-thread slot: each thread's first
/// random-number call lazily seeds its own delegate, and later calls reseed
/// it whenever that thread can take a full seed from the ring.
///
/// [`split`](ThreadLocalReseedingRng::split) hands back the same adapter;
/// every thread already has its own generator, so logically splitting is a
/// no-op. [`split_with`](ThreadLocalReseedingRng::split_with) instead returns
/// an adapter whose per-thread initial seeds are drawn from a supplied
/// splittable generator rather than the ring.
///
/// # Panics
///
/// A thread's first random-number call panics if its blocking initial seed
/// read is cancelled; the `RngCore` surface has no way to report it.
pub struct ThreadLocalReseedingRng<R: Send, F> {
    shared: Arc<Shared<R, F>>,
}

impl<R: Send, F> Clone for ThreadLocalReseedingRng<R, F> {
    fn clone(&self) -> Self {
        ThreadLocalReseedingRng {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R, F> ThreadLocalReseedingRng<R, F>
where
    R: RngCore + Send,
    F: SeedFactory<R>,
{
    pub fn new(ring: Arc<SeedRing>, seed_size: usize, factory: F) -> Self {
        Self::with_initial(ring, seed_size, factory, InitialSeed::Ring)
    }

    fn with_initial(ring: Arc<SeedRing>, seed_size: usize, factory: F, initial: InitialSeed) -> Self {
        ThreadLocalReseedingRng {
            shared: Arc::new(Shared {
                ring,
                seed_size,
                factory,
                initial,
                slots: ThreadLocal::new(),
                cancel: CancelToken::new(),
            }),
        }
    }

    pub fn seed_size(&self) -> usize {
        self.shared.seed_size
    }

    /// A handle that cancels blocked per-thread initial seed reads.
    pub fn cancel_token(&self) -> CancelToken {
        self.shared.cancel.clone()
    }

    /// Another handle to the same adapter.
    pub fn split(&self) -> Self {
        self.clone()
    }

    /// An adapter whose per-thread initial seeds come from `source` instead
    /// of the ring. Reseeds still come from the ring.
    pub fn split_with(&self, source: impl RngCore + Send + 'static) -> Self
    where
        F: Clone,
    {
        Self::with_initial(
            Arc::clone(&self.shared.ring),
            self.shared.seed_size,
            self.shared.factory.clone(),
            InitialSeed::Splittable(Mutex::new(Box::new(source))),
        )
    }

    fn with_delegate<T>(&self, op: impl FnOnce(&mut R) -> T) -> T {
        let shared = &*self.shared;
        let slot = shared.slots.get_or(|| {
            RefCell::new(Slot {
                delegate: None,
                seed: vec![0u8; shared.seed_size].into_boxed_slice(),
            })
        });
        let mut slot = slot.borrow_mut();
        let slot = &mut *slot;
        if slot.delegate.is_none() {
            match &shared.initial {
                InitialSeed::Ring => {
                    if let Err(err) = shared.ring.read(&mut slot.seed, &shared.cancel) {
                        panic!("per-thread seed read failed: {err}");
                    }
                }
                InitialSeed::Splittable(source) => {
                    let mut source = source.lock().expect("seed source lock poisoned");
                    source.fill_bytes(&mut slot.seed);
                }
            }
            slot.delegate = Some(shared.factory.create(&slot.seed));
        } else if shared.ring.poll_exact(&mut slot.seed) {
            slot.delegate = Some(shared.factory.create(&slot.seed));
        }
        op(slot
            .delegate
            .as_mut()
            .expect("delegate exists past first use"))
    }
}

impl<R, F> RngCore for ThreadLocalReseedingRng<R, F>
where
    R: RngCore + Send,
    F: SeedFactory<R>,
{
    fn next_u32(&mut self) -> u32 {
        self.with_delegate(|delegate| delegate.next_u32())
    }

    fn next_u64(&mut self) -> u64 {
        self.with_delegate(|delegate| delegate.next_u64())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.with_delegate(|delegate| delegate.fill_bytes(dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::CapturingRng;
    use eyre::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    const SEED_SIZE: usize = 16;

    fn counted_factory(creations: Arc<AtomicUsize>) -> impl Fn(&[u8]) -> CapturingRng + Clone {
        move |seed: &[u8]| {
            creations.fetch_add(1, Ordering::Relaxed);
            CapturingRng::from_seed(seed)
        }
    }

    #[test]
    fn each_thread_builds_its_own_delegate() -> Result<()> {
        let ring = Arc::new(SeedRing::new(64)?);
        assert_eq!(ring.offer(&[1u8; 2 * SEED_SIZE]), 2 * SEED_SIZE);

        let creations = Arc::new(AtomicUsize::new(0));
        let rng = ThreadLocalReseedingRng::new(
            Arc::clone(&ring),
            SEED_SIZE,
            counted_factory(Arc::clone(&creations)),
        );

        // Both threads seed themselves before either draws again, so a fast
        // thread cannot swallow the other's preloaded seed as a reseed.
        let seeded = Arc::new(Barrier::new(2));
        let mut handles = Vec::new();
        for _ in 0..2 {
            let mut rng = rng.clone();
            let seeded = Arc::clone(&seeded);
            handles.push(thread::spawn(move || {
                let first = rng.next_u64();
                seeded.wait();
                // Ring is dry after both inits, so the delegate survives.
                let second = rng.next_u64();
                (first, second)
            }));
        }
        for handle in handles {
            let (first, second) = handle.join().expect("consumer thread panicked");
            assert_eq!(second, first + 1);
        }

        assert_eq!(creations.load(Ordering::Relaxed), 2);
        Ok(())
    }

    #[test]
    fn split_shares_the_per_thread_state() -> Result<()> {
        let ring = Arc::new(SeedRing::new(64)?);
        assert_eq!(ring.offer(&[1u8; SEED_SIZE]), SEED_SIZE);

        let creations = Arc::new(AtomicUsize::new(0));
        let mut rng = ThreadLocalReseedingRng::new(
            ring,
            SEED_SIZE,
            counted_factory(Arc::clone(&creations)),
        );
        let mut twin = rng.split();

        rng.next_u64();
        twin.next_u64();

        // Same thread, same slot: the split handle reuses the delegate.
        assert_eq!(creations.load(Ordering::Relaxed), 1);
        Ok(())
    }

    #[test]
    fn reseeds_are_per_thread() -> Result<()> {
        let ring = Arc::new(SeedRing::new(64)?);
        assert_eq!(ring.offer(&[1u8; SEED_SIZE]), SEED_SIZE);

        let creations = Arc::new(AtomicUsize::new(0));
        let mut rng = ThreadLocalReseedingRng::new(
            Arc::clone(&ring),
            SEED_SIZE,
            counted_factory(Arc::clone(&creations)),
        );
        rng.next_u64();
        assert_eq!(creations.load(Ordering::Relaxed), 1);

        assert_eq!(ring.offer(&[2u8; SEED_SIZE]), SEED_SIZE);
        let value = rng.next_u64();
        assert_eq!(creations.load(Ordering::Relaxed), 2);
        assert_eq!(value, u64::from_le_bytes([2u8; 8]));
        Ok(())
    }

    #[test]
    fn split_with_seeds_from_the_splittable_source() -> Result<()> {
        // The ring stays empty: initial seeds must come from the source.
        let ring = Arc::new(SeedRing::new(64)?);
        let creations = Arc::new(AtomicUsize::new(0));
        let rng = ThreadLocalReseedingRng::new(
            ring,
            SEED_SIZE,
            counted_factory(Arc::clone(&creations)),
        );

        let mut seeded = rng.split_with(CapturingRng::from_seed(&[0xEEu8; 8]));
        let value = seeded.next_u64();

        let mut reference_source = CapturingRng::from_seed(&[0xEEu8; 8]);
        let mut expected_seed = [0u8; SEED_SIZE];
        reference_source.fill_bytes(&mut expected_seed);
        let expected = u64::from_le_bytes(expected_seed[..8].try_into()?);
        assert_eq!(value, expected);
        assert_eq!(creations.load(Ordering::Relaxed), 1);
        Ok(())
    }
}
