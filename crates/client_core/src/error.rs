use thiserror::Error;

/// Caller contract violations. These indicate a bug in the screen wiring, not
/// a runtime condition, so callers are expected to treat them as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{operation} controller used after dispose")]
    Disposed { operation: &'static str },
    #[error("{operation} controller started an attempt outside a tokio runtime")]
    NoRuntime { operation: &'static str },
}
