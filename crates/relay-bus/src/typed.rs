//! # Typed Dispatch
//!
//! Adapters between typed handlers and the untyped [`Handler`] contract.
//! Topics are heterogeneous; a typed subscriber treats a payload of another
//! type as not-applicable and reports success, so mixed-type topics never
//! see spurious failures from subscribers meant for other payloads.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use relay_context::Scope;

use crate::bus::{EventBus, SubscribeOptions, SubscriptionHandle};
use crate::error::BusError;
use crate::event::Event;
use crate::handler::{HandlerFn, HandlerRef, HandlerResult};

/// Wrap a handler for payloads of type `T` into the untyped contract.
///
/// On delivery the payload is checked against `T`: a match runs the handler,
/// a mismatch is a no-op success (never an error, never a retry).
pub fn typed<T, F, Fut>(handler: F) -> HandlerRef
where
    T: Any + Send + Sync,
    F: Fn(Scope, Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    HandlerFn::arc(move |scope, event: Event| {
        let applicable = event.downcast::<T>().map(|payload| handler(scope, payload));
        async move {
            match applicable {
                Some(delivery) => delivery.await,
                None => Ok(()),
            }
        }
    })
}

/// Subscribe a typed handler to `topic` on `bus`.
pub async fn subscribe_typed<B, T, F, Fut>(
    bus: &B,
    topic: &str,
    handler: F,
    options: SubscribeOptions,
) -> Result<SubscriptionHandle, BusError>
where
    B: EventBus + ?Sized,
    T: Any + Send + Sync,
    F: Fn(Scope, Arc<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    bus.subscribe_with(topic, typed(handler), options).await
}
