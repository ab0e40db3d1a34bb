use std::sync::atomic::{AtomicBool, Ordering};

/// Holds a busy flag for as long as it lives.
///
/// Cleared on drop, so an early return, an error or a dropped future all
/// release it.
pub struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    /// Set the flag, or return `None` if it is already set.
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
