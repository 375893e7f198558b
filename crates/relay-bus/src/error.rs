//! # Bus Errors
//!
//! Synchronous failures returned to callers of `subscribe` and `publish`.
//! Handler failures never surface here; those reach the bus error hook only.

use relay_context::ScopeError;
use thiserror::Error;

/// Errors returned by bus operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The bus was closed. Terminal: no further publish or subscribe will
    /// ever succeed on this instance.
    #[error("event bus closed")]
    Closed,

    /// The publish scope was cancelled before the event could be enqueued.
    /// The event was not accepted and will not be delivered.
    #[error("publish cancelled before enqueue")]
    Cancelled,

    /// The publish scope's deadline passed before the event could be
    /// enqueued. The event was not accepted and will not be delivered.
    #[error("publish deadline exceeded before enqueue")]
    DeadlineExceeded,
}

impl From<ScopeError> for BusError {
    fn from(err: ScopeError) -> Self {
        match err {
            ScopeError::Cancelled => BusError::Cancelled,
            ScopeError::DeadlineExceeded => BusError::DeadlineExceeded,
        }
    }
}
