//! A cooperative cancellation token threaded through long-running
//! operations (spec §5: "Scan and join build" check it "at chunk
//! boundaries"; on cancel, "any partial outputs are dropped" and the
//! operator returns `Cancelled`).
//!
//! Deliberately minimal: no async machinery, just a shared flag a worker
//! polls between chunks. Cloning a token clones the `Arc`, so every
//! partition of a fanned-out operator observes the same cancel request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colframe_error::{ColframeError, ColframeResult};

#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self { flag: Arc::new(AtomicBool::new(false)) }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Bail with `ColframeError::Cancelled` if cancellation has been
    /// requested. Call at chunk/row-batch boundaries, never inside a
    /// single kernel's inner loop (spec §5: "inside a single kernel there
    /// is no suspension").
    pub fn check(&self) -> ColframeResult<()> {
        if self.is_cancelled() {
            return Err(ColframeError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uncancelled_token_checks_ok() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancelling_a_clone_is_observed_by_the_original() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(ColframeError::Cancelled)));
    }
}
