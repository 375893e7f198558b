//! # Delivery Envelope
//!
//! One accepted publish as it travels a topic queue: the event payload plus
//! the publisher's scope (cancellation signal and frozen headers).

use relay_context::Scope;

use crate::event::Event;

/// A published event and the scope it was published under.
///
/// The scope's headers are frozen before the envelope is enqueued; nothing
/// the publisher does afterwards can change what handlers observe.
#[derive(Clone, Debug)]
pub struct Envelope {
    /// The publisher's scope, handed to every handler of this delivery.
    pub scope: Scope,
    /// The payload.
    pub event: Event,
}

impl Envelope {
    /// Pair a payload with its publish scope.
    #[must_use]
    pub fn new(scope: Scope, event: Event) -> Self {
        Self { scope, event }
    }
}
