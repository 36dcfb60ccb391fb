#[cfg(not(feature = "loom"))]
pub(crate) use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[cfg(feature = "loom")]
pub(crate) use loom::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[cfg(not(feature = "loom"))]
#[inline]
pub(crate) fn spin_wait() {
    std::hint::spin_loop();
}

#[cfg(feature = "loom")]
pub(crate) fn spin_wait() {
    loom::thread::yield_now();
}
