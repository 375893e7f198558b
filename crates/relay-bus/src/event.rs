//! # Event Payload
//!
//! The opaque value carried by a publish. Topics are heterogeneous: payloads
//! of different types may share one topic, and subscribers downcast to the
//! types they understand (see [`crate::typed`]).

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// An opaque, shareable event payload.
///
/// Cheap to clone; every subscriber of a delivery observes the same payload.
/// The concrete type name is captured at construction for log and error-hook
/// output.
#[derive(Clone)]
pub struct Event {
    payload: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Event {
    /// Wrap a payload value.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(payload: T) -> Self {
        Self {
            payload: Arc::new(payload),
            type_name: type_name::<T>(),
        }
    }

    /// Borrow the payload as `T`, if that is what was published.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }

    /// Take a shared handle to the payload as `T`, if that is what was
    /// published.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.payload).downcast::<T>().ok()
    }

    /// True when the payload is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// The payload's concrete type name, as captured at construction.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event").field("type", &self.type_name).finish()
    }
}
