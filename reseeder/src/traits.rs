use rand_core::RngCore;

/// Builds a fresh generator whose state is fully determined by `seed`.
///
/// Implemented for any `Fn(&[u8]) -> R`, so a closure over a concrete
/// generator's seed constructor is enough:
///
/// ```
/// use rand_core::SeedableRng;
/// use rand_chacha::ChaCha12Rng;
///
/// let factory = |seed: &[u8]| {
///     let mut key = [0u8; 32];
///     key.copy_from_slice(seed);
///     ChaCha12Rng::from_seed(key)
/// };
/// # let _ = &factory;
/// ```
pub trait SeedFactory<R> {
    fn create(&self, seed: &[u8]) -> R;
}

impl<R, F> SeedFactory<R> for F
where
    F: Fn(&[u8]) -> R,
{
    fn create(&self, seed: &[u8]) -> R {
        self(seed)
    }
}

/// A generator that can advance its state by `2^k` outputs in sub-linear
/// time.
///
/// Meant for generators whose period so far exceeds any plausible output
/// volume that distinct jump distances yield effectively independent streams.
pub trait JumpableRng: RngCore {
    fn jump_power_of_two(&mut self, k: u32);
}
