//! # Relay Context - Cancellation Scope and Header Propagation
//!
//! The request-scoped plumbing consumed by the relay event bus:
//!
//! - [`Scope`]: a cancellation signal plus an optional deadline. Publishers
//!   hand one to `publish`; handlers receive a clone of it with every
//!   delivery.
//! - [`Headers`]: an immutable string key/value bag attached to a [`Scope`]
//!   at publish time and readable by every handler the event reaches.
//!
//! ## Design
//!
//! ```text
//! publisher ──► Scope::new().with_timeout(..)
//!                  │  with_headers(..)   (copies the map, never aliases)
//!                  ▼
//!              publish(scope, ...)  ──►  queue  ──►  handler(scope, event)
//!                                                       │
//!                                                       └─ scope.header("k")
//! ```
//!
//! Cancellation governs how long a publisher is willing to wait for queue
//! space. It is never used to interrupt a running handler; handlers that want
//! cooperative cancellation check [`Scope::is_cancelled`] themselves.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod headers;
pub mod scope;

pub use headers::Headers;
pub use scope::{Scope, ScopeError};
