use crate::traits::SeedFactory;
use rand_core::RngCore;
use seedbuf::{CancelToken, SeedRing};
use std::sync::Arc;

/// A generator that replaces itself with a freshly seeded one whenever a
/// full seed can be taken from the ring.
///
/// Every random-number call first tries to reseed: an uninitialized adapter
/// blocks until `seed_size` bytes arrive and builds its first delegate; an
/// initialized one opportunistically takes a full seed with the ring's
/// all-or-nothing poll and rebuilds on success, otherwise keeps the current
/// delegate. The call is then forwarded to the delegate.
///
/// # Panics
///
/// The first random-number call panics if the blocking initial seed read is
/// cancelled through [`cancel_token`](ReseedingRng::cancel_token); the
/// `RngCore` surface has no way to report the condition.
pub struct ReseedingRng<R, F> {
    ring: Arc<SeedRing>,
    factory: F,
    seed: Box<[u8]>,
    delegate: Option<R>,
    reseeds: u64,
    cancel: CancelToken,
}

impl<R: RngCore, F: SeedFactory<R>> ReseedingRng<R, F> {
    pub fn new(ring: Arc<SeedRing>, seed_size: usize, factory: F) -> Self {
        ReseedingRng {
            ring,
            factory,
            seed: vec![0u8; seed_size].into_boxed_slice(),
            delegate: None,
            reseeds: 0,
            cancel: CancelToken::new(),
        }
    }

    pub fn seed_size(&self) -> usize {
        self.seed.len()
    }

    /// How many times the delegate has been built, the initial construction
    /// included.
    pub fn reseed_count(&self) -> u64 {
        self.reseeds
    }

    /// A handle that cancels a blocked initial seed read.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Reseed if seed material allows it, then hand out the delegate.
    fn refreshed(&mut self) -> &mut R {
        if self.delegate.is_none() {
            if let Err(err) = self.ring.read(&mut self.seed, &self.cancel) {
                panic!("initial seed read failed: {err}");
            }
            self.reseeds += 1;
            return self.delegate.insert(self.factory.create(&self.seed));
        }
        if self.ring.poll_exact(&mut self.seed) {
            self.reseeds += 1;
            return self.delegate.insert(self.factory.create(&self.seed));
        }
        self.delegate
            .as_mut()
            .expect("delegate exists past first use")
    }
}

impl<R: RngCore, F: SeedFactory<R>> RngCore for ReseedingRng<R, F> {
    fn next_u32(&mut self) -> u32 {
        self.refreshed().next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.refreshed().next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.refreshed().fill_bytes(dest)
    }
}
