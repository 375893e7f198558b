//! # Scope
//!
//! Cancellation signal, optional deadline, and attached headers for one
//! publish call and every delivery fanned out from it.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::headers::Headers;

/// Why a scope stopped waiting.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// The scope was cancelled explicitly (directly or via a parent).
    #[error("scope cancelled")]
    Cancelled,

    /// The scope's deadline passed.
    #[error("scope deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellation scope handed to `publish` and forwarded to handlers.
///
/// Cheap to clone: clones share the same cancellation signal and the same
/// frozen header bag. Derive children with [`Scope::child`],
/// [`Scope::with_timeout`], or [`Scope::with_headers`]; cancelling a parent
/// cancels all scopes derived from it, while cancelling a child leaves the
/// parent untouched.
#[derive(Clone, Debug)]
pub struct Scope {
    token: CancellationToken,
    deadline: Option<Instant>,
    headers: Option<Headers>,
}

impl Scope {
    /// A root scope: never expires, carries no headers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            headers: None,
        }
    }

    /// Derive a child scope. The child inherits the deadline and headers and
    /// is cancelled when `self` is; cancelling the child does not cancel
    /// `self`.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            headers: self.headers.clone(),
        }
    }

    /// Derive a child scope that additionally expires after `timeout`.
    ///
    /// An earlier deadline already on `self` is kept; a scope can never
    /// outlive its parent's deadline.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child scope that expires at `at` (or at the parent's earlier
    /// deadline, whichever comes first).
    #[must_use]
    pub fn with_deadline(&self, at: Instant) -> Self {
        let mut scope = self.child();
        scope.deadline = Some(match self.deadline {
            Some(existing) => existing.min(at),
            None => at,
        });
        scope
    }

    /// Derive a child scope carrying a copy of `map` as its header bag.
    ///
    /// The map is copied at attach time; the caller mutating `map` afterwards
    /// never affects this scope. An existing bag is replaced, not merged.
    #[must_use]
    pub fn with_headers(&self, map: &HashMap<String, String>) -> Self {
        let mut scope = self.child();
        scope.headers = Some(Headers::from_map(map));
        scope
    }

    /// Cancel this scope and everything derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once the scope is cancelled or its deadline has passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.err().is_some()
    }

    /// Non-blocking status check: the cancellation cause, if any.
    #[must_use]
    pub fn err(&self) -> Option<ScopeError> {
        if self.token.is_cancelled() {
            return Some(ScopeError::Cancelled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(ScopeError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Suspend until the scope is cancelled or expires, returning the cause.
    ///
    /// Never resolves for a root scope that is never cancelled; callers race
    /// this against the operation they are guarding.
    pub async fn done(&self) -> ScopeError {
        match self.deadline {
            Some(at) => tokio::select! {
                () = self.token.cancelled() => ScopeError::Cancelled,
                () = time::sleep_until(at) => ScopeError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ScopeError::Cancelled
            }
        }
    }

    /// The deadline, if one was set.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The attached header bag, if any.
    #[must_use]
    pub fn headers(&self) -> Option<&Headers> {
        self.headers.as_ref()
    }

    /// Look up a single header value.
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|h| h.get(key))
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
