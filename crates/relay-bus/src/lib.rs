//! # Relay Bus - In-Process Topic Pub/Sub
//!
//! A topic-addressed event dispatcher that decouples producers from
//! consumers: producers publish into named topics, each topic owns a bounded
//! FIFO queue drained by a fixed pool of worker tasks, and every worker fans
//! each event out to the topic's current subscribers with a per-subscription
//! retry budget.
//!
//! ## Architecture
//!
//! ```text
//! publisher ──► publish(scope, "topic", event)
//!                  │  (blocks on a full queue until space frees
//!                  │   or the scope cancels/expires)
//!                  ▼
//!            ┌───────────────┐      snapshot       ┌────────────┐
//!            │ Topic queue   │ ──► worker 1..W ──► │ handler A  │ retries rA
//!            │ (bounded FIFO)│      of subs        │ handler B  │ retries rB
//!            └───────────────┘                     └────────────┘
//!                                                        │
//!                                    exhausted ──► error hook (optional)
//! ```
//!
//! ## Delivery rules
//!
//! - At-most-once per subscriber per event; nothing is persisted.
//! - Strict FIFO per topic queue. With `workers_per_topic > 1`, workers
//!   dequeue different envelopes and dispatch independently, so two events
//!   may *complete* out of enqueue order.
//! - A handler failure is retried back-to-back up to the subscription's
//!   budget, then reported to the bus error hook; it is never re-queued and
//!   never affects delivery to the other subscribers.
//! - Closing the bus stops acceptance immediately; already-accepted events
//!   are drained through the normal dispatch path.
//!
//! ## Example
//!
//! ```rust,no_run
//! use relay_bus::{EventBus, Event, HandlerFn, MemoryBus, Scope};
//!
//! # async fn demo() -> Result<(), relay_bus::BusError> {
//! let bus = MemoryBus::new();
//! let scope = Scope::new();
//!
//! bus.subscribe(
//!     "orders",
//!     HandlerFn::arc(|_scope, event: Event| async move {
//!         if let Some(total) = event.downcast_ref::<u64>() {
//!             println!("order total: {total}");
//!         }
//!         Ok(())
//!     }),
//! )
//! .await?;
//!
//! bus.publish(&scope, "orders", Event::new(42u64)).await?;
//! bus.close();
//! # Ok(())
//! # }
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod envelope;
pub mod error;
pub mod event;
pub mod handler;
pub mod typed;

mod queue;
mod topic;

// Re-export main types
pub use bus::{
    BusConfig, ErrorHook, EventBus, MemoryBus, PublishOptions, SubscribeOptions,
    SubscriptionHandle,
};
pub use error::BusError;
pub use event::Event;
pub use handler::{Handler, HandlerError, HandlerFn, HandlerRef, HandlerResult};
pub use typed::{subscribe_typed, typed};

// The scope abstraction consumed by publish and handed to handlers.
pub use relay_context::{Headers, Scope, ScopeError};

/// Envelopes buffered per topic before publishers feel backpressure.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Dispatch workers started per topic.
pub const DEFAULT_WORKERS_PER_TOPIC: usize = 1;
