//! Cooperative cancellation.
//!
//! Index construction, validation, commit, and evaluation all accept a
//! [`Cancellation`] token and check it at loop boundaries and between
//! expression evaluations. Nothing in the core spawns threads; the token
//! only makes long synchronous operations interruptible by a caller that
//! holds a clone of it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// The error produced when a cancelled token is checked.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// A shared cancellation flag.
///
/// Cloning is cheap; all clones observe the same flag. A fresh token is
/// never cancelled, so `Cancellation::default()` is the right argument for
/// callers that do not need interruption.
///
/// # Example
///
/// ```rust
/// use sentrie::cancel::Cancellation;
///
/// let ctx = Cancellation::new();
/// assert!(ctx.check().is_ok());
/// ctx.cancel();
/// assert!(ctx.check().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// Creates a fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once any clone has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Returns `Err(Cancelled)` once the token is cancelled.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_live() {
        let ctx = Cancellation::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check().is_ok());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let ctx = Cancellation::new();
        let other = ctx.clone();
        other.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.check(), Err(Cancelled));
    }
}
