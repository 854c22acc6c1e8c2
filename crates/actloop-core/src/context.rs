//! Context - cancellation scope handed to submitters and work items.
//!
//! A `Context` is a [`CancellationToken`] plus an optional deadline.
//! Children inherit cancellation from their parent and can only tighten the
//! deadline, never extend it.
//!
//! # Rules
//! - `done()` resolves once the scope is cancelled or its deadline passes
//! - `err()` is `None` until then; cancellation wins over the deadline
//! - cloning shares the scope (cancelling a clone cancels the original)

use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;

#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Root scope with no deadline.
    ///
    /// Only an explicit `cancel()` on it (or a clone) ends it; children
    /// cancelling themselves never do.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Child scope that can be cancelled on its own.
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Wait until the scope is done.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// The error to report after `done()` resolved.
    ///
    /// Falls back to `Canceled` if called on a live scope.
    pub(crate) fn done_err(&self) -> ContextError {
        self.err().unwrap_or(ContextError::Canceled)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}
