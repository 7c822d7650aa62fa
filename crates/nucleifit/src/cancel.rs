//! Cooperative cancellation and time budgets.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared cancellation token, polled at every objective evaluation.
///
/// Tripping the token aborts in-flight cluster fits; those clusters report
/// a contained failure and keep their result slots empty, while clusters
/// that already finished keep their fitted blobs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Token that never trips on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that trips automatically once `budget` has elapsed.
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + budget),
        }
    }

    /// Request cancellation; safe to call from any thread.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_cancel_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn zero_budget_trips_immediately() {
        let token = CancelToken::with_budget(Duration::from_secs(0));
        assert!(token.is_cancelled());
    }
}
