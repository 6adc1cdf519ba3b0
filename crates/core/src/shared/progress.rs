use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Frames done out of frames planned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    /// Fraction in `[0, 1]`; exactly `1.0` once `current == total`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.current.min(self.total) as f64) / (self.total as f64)
    }
}

/// Progress callback. Returning `false` requests cancellation.
pub type ProgressCallback = Box<dyn Fn(Progress) -> bool + Send>;

/// Shared cancellation token checked between frame writes.
pub type CancelToken = Arc<AtomicBool>;

pub fn new_cancel_token() -> CancelToken {
    Arc::new(AtomicBool::new(false))
}

pub(crate) fn is_cancelled(token: &CancelToken) -> bool {
    token.load(Ordering::Relaxed)
}
