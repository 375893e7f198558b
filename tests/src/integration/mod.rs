//! Cross-crate integration flows for the event bus.

pub mod shutdown;
