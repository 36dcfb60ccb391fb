use crate::traits::{JumpableRng, SeedFactory};
use rand_core::RngCore;
use seedbuf::{CancelToken, SeedBufError, SeedRing};
use std::sync::Arc;

/// A generator reseeded by jumping instead of replacement.
///
/// Meant for delegates whose period is so large that distinct jump distances
/// give effectively independent streams. Every random-number call tries to
/// take a full seed from the ring; on success the delegate is advanced by
/// the seed interpreted as a jump distance: for each set bit at position `i`
/// (bit 0 is the lowest bit of the first seed byte), the delegate jumps by
/// `2^i` steps. The call is then forwarded.
pub struct JumpReseedingRng<R, F> {
    ring: Arc<SeedRing>,
    factory: F,
    delegate: R,
    seed: Box<[u8]>,
    cancel: CancelToken,
}

impl<R, F> JumpReseedingRng<R, F>
where
    R: JumpableRng,
    F: SeedFactory<R>,
{
    pub fn new(delegate: R, ring: Arc<SeedRing>, seed_size: usize, factory: F) -> Self {
        JumpReseedingRng {
            ring,
            factory,
            delegate,
            seed: vec![0u8; seed_size].into_boxed_slice(),
            cancel: CancelToken::new(),
        }
    }

    pub fn seed_size(&self) -> usize {
        self.seed.len()
    }

    /// A handle that cancels a blocked [`split`](JumpReseedingRng::split).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// An independent generator built from a fresh seed.
    ///
    /// Blocks until `seed_size` bytes can be read from the ring; surfaces
    /// [`SeedBufError::Cancelled`] if the token is cancelled while waiting.
    pub fn split(&self) -> Result<Self, SeedBufError>
    where
        F: Clone,
    {
        let mut seed = vec![0u8; self.seed.len()].into_boxed_slice();
        self.ring.read(&mut seed, &self.cancel)?;
        let delegate = self.factory.create(&seed);
        seed.fill(0);
        Ok(JumpReseedingRng {
            ring: Arc::clone(&self.ring),
            factory: self.factory.clone(),
            delegate,
            seed,
            cancel: CancelToken::new(),
        })
    }

    fn maybe_jump(&mut self) {
        if !self.ring.poll_exact(&mut self.seed) {
            return;
        }
        for bit in 0..self.seed.len() * 8 {
            if self.seed[bit / 8] >> (bit % 8) & 1 != 0 {
                self.delegate.jump_power_of_two(bit as u32);
            }
        }
    }
}

impl<R, F> RngCore for JumpReseedingRng<R, F>
where
    R: JumpableRng,
    F: SeedFactory<R>,
{
    fn next_u32(&mut self) -> u32 {
        self.maybe_jump();
        self.delegate.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.maybe_jump();
        self.delegate.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.maybe_jump();
        self.delegate.fill_bytes(dest)
    }
}
