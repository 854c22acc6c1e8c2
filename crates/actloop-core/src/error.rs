use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Why a [`Context`](crate::Context) is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Error produced by a work item.
///
/// Opaque wrapper so work items can fail with any error type. The loop never
/// inspects it; it is either handed back to the awaiting submitter or passed
/// to the loop's error handler.
pub struct ActionError {
    inner: Box<dyn StdError + Send + Sync + 'static>,
}

impl ActionError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self { inner: err.into() }
    }

    /// Build an error from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::new(message.to_string())
    }

    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    pub fn is<E: StdError + 'static>(&self) -> bool {
        self.inner.is::<E>()
    }

    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.inner
    }
}

impl fmt::Debug for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for ActionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// Errors returned by submission, await and shutdown paths.
#[derive(Debug, Error)]
pub enum LoopError {
    /// Shutdown was requested (or the worker is gone).
    #[error("shutting down")]
    ShuttingDown,

    /// The caller's context fired first.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// An awaited work item failed.
    #[error(transparent)]
    Action(#[from] ActionError),
}

impl LoopError {
    pub fn is_shutting_down(&self) -> bool {
        matches!(self, LoopError::ShuttingDown)
    }

    pub fn is_context(&self) -> bool {
        matches!(self, LoopError::Context(_))
    }

    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            LoopError::Context(e) => Some(*e),
            _ => None,
        }
    }

    pub fn action_error(&self) -> Option<&ActionError> {
        match self {
            LoopError::Action(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("boom")]
    struct Boom;

    #[test]
    fn shutting_down_message_is_stable() {
        assert_eq!(LoopError::ShuttingDown.to_string(), "shutting down");
    }

    #[test]
    fn action_error_keeps_original_type() {
        let err = ActionError::new(Boom);
        assert!(err.is::<Boom>());
        assert!(err.downcast_ref::<Boom>().is_some());
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn loop_error_is_transparent_over_action_error() {
        let err = LoopError::from(ActionError::msg("bad input"));
        assert_eq!(err.to_string(), "bad input");
        assert!(err.action_error().is_some());
        assert!(!err.is_shutting_down());
    }

    #[test]
    fn context_errors_convert() {
        let err: LoopError = ContextError::DeadlineExceeded.into();
        assert!(err.is_context());
        assert_eq!(err.context_error(), Some(ContextError::DeadlineExceeded));
        assert_eq!(err.to_string(), "context deadline exceeded");
    }
}
