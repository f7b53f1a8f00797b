use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use triomphe::Arc;

/// Cooperative cancellation.
///
/// The parser polls the token at every reader entry, at the top of every
/// token-run loop, and around speculative reads; there is no preemption.
/// Tripping the token makes the next poll raise
/// [`ParseErrorKind::Cancelled`](crate::ParseErrorKind::Cancelled), leaving
/// the partial node-id map intact.
///
/// Clones share the underlying flag, so a host can keep one half and hand
/// the other to [`ParseSettings`](crate::ParseSettings).
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CancellationToken({})", self.is_cancelled())
    }
}

#[cfg(test)]
mod test {
    use super::CancellationToken;

    #[test]
    fn clones_share_the_flag() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
