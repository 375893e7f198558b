//! # Handler Contract
//!
//! Subscribers implement [`Handler`] (or wrap an async closure with
//! [`HandlerFn::arc`]). A handler returning `Err` signals a failed attempt;
//! the worker retries up to the subscription's budget before reporting the
//! final error to the bus hook.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use relay_context::Scope;

use crate::event::Event;

/// Error produced by a handler attempt. Opaque to the bus; it is only
/// retried, logged, and forwarded to the error hook.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Outcome of one handler attempt.
pub type HandlerResult = Result<(), HandlerError>;

/// A shared handler registered under a subscription.
pub type HandlerRef = Arc<dyn Handler>;

/// Processes one delivery of one event.
///
/// Invoked once per delivery attempt; a subscription with a retry budget of
/// `n` may see the same event up to `n` times. Handlers run to completion
/// once dispatched — the scope is informational (headers, cooperative
/// cancellation checks), the bus never aborts a running handler.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle one event. `Err` marks the attempt failed.
    async fn call(&self, scope: Scope, event: Event) -> HandlerResult;
}

/// Function-backed handler.
///
/// Wraps a closure that creates a fresh future per delivery, so no shared
/// mutable state is needed across attempts; share state explicitly with
/// `Arc` inside the closure if you want it.
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Wrap a closure.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Wrap a closure and return it as a shared [`HandlerRef`]-compatible
    /// handle.
    pub fn arc<Fut>(f: F) -> Arc<Self>
    where
        F: Fn(Scope, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Scope, Event) -> Fut + Send + Sync, // Fn, not FnMut
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn call(&self, scope: Scope, event: Event) -> HandlerResult {
        (self.f)(scope, event).await
    }
}
