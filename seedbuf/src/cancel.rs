use crate::sync::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag observed by the blocking ring operations.
///
/// Clones share the underlying flag; cancelling any clone cancels them all.
/// Blocking [`write`](crate::SeedRing::write) and
/// [`read`](crate::SeedRing::read) check the token on every retry and return
/// [`SeedBufError::Cancelled`](crate::SeedBufError::Cancelled) once it is set.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
