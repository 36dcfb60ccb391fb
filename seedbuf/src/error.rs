use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedBufError {
    #[error("capacity must be a positive power of two, got {0}")]
    CapacityNotPowerOfTwo(usize),

    #[error("blocking operation cancelled")]
    Cancelled,
}
