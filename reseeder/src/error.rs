use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReseedError {
    #[error("entropy source failed: {0}")]
    Entropy(#[from] getrandom::Error),

    #[error(transparent)]
    Ring(#[from] seedbuf::SeedBufError),
}
