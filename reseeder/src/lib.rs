//! Producers and consumers for the [`seedbuf`] seed ring.
//!
//! Producers ([`SeedReader`]) are long-running workers that move bytes from an
//! [`EntropySource`] into a shared [`seedbuf::SeedRing`]. Consumers are
//! [`rand_core::RngCore`] adapters that pull seed material back out:
//!
//! - [`ReseedingRng`] rebuilds its underlying generator whenever a full seed
//!   can be taken from the ring.
//! - [`ThreadLocalReseedingRng`] does the same with one generator per thread.
//! - [`EntropyCountingRng`] additionally tracks an advisory estimate of the
//!   entropy remaining in the current generator state.
//! - [`JumpReseedingRng`] consumes seeds as jump distances for generators
//!   with very long periods instead of replacing state.

pub mod counting;
pub mod error;
pub mod jumping;
pub mod per_thread;
pub mod reader;
pub mod replacing;
pub mod source;
pub mod traits;

#[cfg(test)]
pub(crate) mod support;

pub use counting::EntropyCountingRng;
pub use error::ReseedError;
pub use jumping::JumpReseedingRng;
pub use per_thread::ThreadLocalReseedingRng;
pub use reader::SeedReader;
pub use replacing::ReseedingRng;
pub use source::{EntropySource, OsEntropySource};
pub use traits::{JumpableRng, SeedFactory};
