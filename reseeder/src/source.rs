use crate::error::ReseedError;

/// A source of cryptographically strong random bytes.
///
/// Implementations fill a caller-owned buffer; they decide themselves how
/// much blocking or retrying that entails.
pub trait EntropySource {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), ReseedError>;
}

/// The operating system's CSPRNG, via `getrandom`.
///
/// Linux/Android use the `getrandom` syscall, macOS/iOS `getentropy`,
/// Windows `BCryptGenRandom`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropySource;

impl EntropySource for OsEntropySource {
    fn fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), ReseedError> {
        getrandom::fill(dest)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::Result;

    #[test]
    fn fills_the_whole_buffer() -> Result<()> {
        let mut source = OsEntropySource;
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        source.fill_bytes(&mut first)?;
        source.fill_bytes(&mut second)?;

        // Two 256-bit draws colliding means the OS CSPRNG is broken.
        assert_ne!(first, second);
        Ok(())
    }
}
