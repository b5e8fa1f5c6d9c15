//! Cooperative cancellation for background work.
//!
//! Workers check the token between units of work (one archive, one page)
//! and stop early once it is cancelled. Work already running finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Every clone shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation() {
        let token = CancellationToken::new();
        let worker = token.clone();
        assert!(!worker.is_cancelled());
        token.cancel();
        assert!(worker.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
