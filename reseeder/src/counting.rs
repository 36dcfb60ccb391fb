use crate::replacing::ReseedingRng;
use crate::traits::SeedFactory;
use rand_core::RngCore;
use seedbuf::SeedRing;
use std::sync::Arc;

/// A replacing generator that tracks an advisory estimate of the entropy
/// remaining in its current state.
///
/// The counter starts at `seed_size * 8` bits, drops by the bit width of each
/// primitive drawn, and snaps back to the full amount whenever a call ends up
/// reseeding. It can go negative and never gates operation; callers that want
/// to force a reseed watch [`entropy_bits`](EntropyCountingRng::entropy_bits)
/// themselves.
pub struct EntropyCountingRng<R, F> {
    inner: ReseedingRng<R, F>,
    entropy_bits: i64,
    fresh_bits: i64,
}

impl<R: RngCore, F: SeedFactory<R>> EntropyCountingRng<R, F> {
    pub fn new(ring: Arc<SeedRing>, seed_size: usize, factory: F) -> Self {
        let fresh_bits = seed_size as i64 * 8;
        EntropyCountingRng {
            inner: ReseedingRng::new(ring, seed_size, factory),
            entropy_bits: fresh_bits,
            fresh_bits,
        }
    }

    /// Estimated entropy remaining in the current delegate, in bits.
    pub fn entropy_bits(&self) -> i64 {
        self.entropy_bits
    }

    pub fn reseed_count(&self) -> u64 {
        self.inner.reseed_count()
    }

    /// One random bit, debited as a single bit of entropy.
    pub fn next_bool(&mut self) -> bool {
        self.debited(1, |inner| inner.next_u64()) & 1 == 1
    }

    /// Run `op` against the inner generator and settle the entropy account:
    /// a reseed resets the balance, otherwise `bits` are debited.
    fn debited<T>(&mut self, bits: i64, op: impl FnOnce(&mut ReseedingRng<R, F>) -> T) -> T {
        let reseeds_before = self.inner.reseed_count();
        let value = op(&mut self.inner);
        if self.inner.reseed_count() != reseeds_before {
            self.entropy_bits = self.fresh_bits;
        } else {
            self.entropy_bits -= bits;
        }
        value
    }
}

impl<R: RngCore, F: SeedFactory<R>> RngCore for EntropyCountingRng<R, F> {
    fn next_u32(&mut self) -> u32 {
        self.debited(32, |inner| inner.next_u32())
    }

    fn next_u64(&mut self) -> u64 {
        self.debited(64, |inner| inner.next_u64())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.debited(dest.len() as i64 * 8, |inner| inner.fill_bytes(dest))
    }
}
