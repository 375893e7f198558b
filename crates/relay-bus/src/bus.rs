//! # Event Bus
//!
//! The caller-facing surface: [`EventBus`] trait, the in-memory
//! implementation [`MemoryBus`], and the configuration types.
//!
//! There is deliberately no process-wide default instance; construct a bus
//! where your application wires its dependencies and pass it down.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use relay_context::Scope;
use tracing::debug;

use crate::envelope::Envelope;
use crate::error::BusError;
use crate::event::Event;
use crate::handler::{HandlerError, HandlerRef};
use crate::topic::{SubscriptionRecord, Topic};
use crate::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS_PER_TOPIC};

/// Hook invoked when a subscriber exhausts its retry budget for one event:
/// `(scope, topic, event, last_error)`. The integration point for external
/// logging and metrics facades.
pub type ErrorHook = Arc<dyn Fn(&Scope, &str, &Event, &HandlerError) + Send + Sync>;

/// Bus-wide construction options.
#[derive(Clone)]
pub struct BusConfig {
    /// Envelopes buffered per topic before publishers block. 0 makes every
    /// enqueue a rendezvous with a ready worker.
    pub queue_capacity: usize,
    /// Dispatch workers per topic, fixed at topic start. Values above 1
    /// trade per-topic completion ordering for throughput.
    pub workers_per_topic: usize,
    /// Retry-exhaustion hook. `None` drops handler failures after a log
    /// line.
    pub error_hook: Option<ErrorHook>,
}

impl BusConfig {
    /// Set the per-topic queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the number of workers per topic (minimum 1).
    #[must_use]
    pub fn with_workers_per_topic(mut self, workers: usize) -> Self {
        self.workers_per_topic = workers.max(1);
        self
    }

    /// Install the retry-exhaustion hook.
    #[must_use]
    pub fn with_error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Scope, &str, &Event, &HandlerError) + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            workers_per_topic: DEFAULT_WORKERS_PER_TOPIC,
            error_hook: None,
        }
    }
}

impl fmt::Debug for BusConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusConfig")
            .field("queue_capacity", &self.queue_capacity)
            .field("workers_per_topic", &self.workers_per_topic)
            .field("error_hook", &self.error_hook.is_some())
            .finish()
    }
}

/// Per-subscription options.
#[derive(Clone, Copy, Debug)]
pub struct SubscribeOptions {
    retries: u32,
}

impl SubscribeOptions {
    /// Attempts per event for this handler before giving up (minimum 1,
    /// default 1 = no retry). 0 is ignored.
    #[must_use]
    pub fn with_retries(mut self, retries: u32) -> Self {
        if retries >= 1 {
            self.retries = retries;
        }
        self
    }

    /// The configured attempt budget.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self { retries: 1 }
    }
}

/// Per-publish options.
#[derive(Clone, Debug, Default)]
pub struct PublishOptions {
    headers: Option<HashMap<String, String>>,
}

impl PublishOptions {
    /// Attach metadata headers to the event. Repeated calls merge; later
    /// values win per key. The map is copied onto the delivery scope before
    /// enqueue, so the caller keeping and mutating a map of their own never
    /// affects the delivery.
    #[must_use]
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        if headers.is_empty() {
            return self;
        }
        match &mut self.headers {
            Some(existing) => existing.extend(headers),
            None => self.headers = Some(headers),
        }
        self
    }

    pub(crate) fn headers(&self) -> Option<&HashMap<String, String>> {
        self.headers.as_ref()
    }
}

/// Topic-addressed publish/subscribe.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Register `handler` on `topic` with explicit options.
    ///
    /// Lazily creates the topic and starts its worker pool on first use.
    /// Fails with [`BusError::Closed`] once the bus is closed.
    async fn subscribe_with(
        &self,
        topic: &str,
        handler: HandlerRef,
        options: SubscribeOptions,
    ) -> Result<SubscriptionHandle, BusError>;

    /// Register `handler` on `topic` with default options (no retry).
    async fn subscribe(
        &self,
        topic: &str,
        handler: HandlerRef,
    ) -> Result<SubscriptionHandle, BusError> {
        self.subscribe_with(topic, handler, SubscribeOptions::default())
            .await
    }

    /// Publish `event` to `topic` with explicit options.
    ///
    /// Returns as soon as the event is enqueued; delivery outcomes never
    /// propagate back. On a full queue the call suspends until space frees,
    /// the scope cancels or expires (the scope's error is returned and the
    /// event is dropped), or the bus closes ([`BusError::Closed`]).
    async fn publish_with(
        &self,
        scope: &Scope,
        topic: &str,
        event: Event,
        options: PublishOptions,
    ) -> Result<(), BusError>;

    /// Publish `event` to `topic` with default options.
    async fn publish(&self, scope: &Scope, topic: &str, event: Event) -> Result<(), BusError> {
        self.publish_with(scope, topic, event, PublishOptions::default())
            .await
    }

    /// Close the bus. Idempotent.
    ///
    /// New publishes and subscriptions fail immediately; each topic's
    /// workers drain what was already accepted and stop. Does not wait for
    /// in-flight handler execution.
    fn close(&self);
}

/// Handle for one registration; the only way to end it.
///
/// Dropping the handle does *not* unsubscribe — delivery continues for the
/// bus's lifetime unless [`SubscriptionHandle::unsubscribe`] is called.
pub struct SubscriptionHandle {
    topic: Arc<Topic>,
    id: u64,
}

impl SubscriptionHandle {
    /// Stop delivering to this subscription.
    ///
    /// Idempotent and callable from any task, including from inside the
    /// subscribed handler itself. A dispatch that already snapshotted the
    /// subscriber list may deliver one final event.
    pub fn unsubscribe(&self) {
        self.topic.unsubscribe(self.id);
    }

    /// The topic this subscription belongs to.
    #[must_use]
    pub fn topic(&self) -> &str {
        self.topic.name()
    }

    /// The subscription's ID, unique within its topic.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("topic", &self.topic.name())
            .field("id", &self.id)
            .finish()
    }
}

struct BusState {
    topics: HashMap<String, Arc<Topic>>,
    closed: bool,
}

/// In-memory [`EventBus`].
///
/// Suitable for wiring subsystems of one process together. Nothing is
/// persisted: a crash loses queued and in-flight events.
///
/// ## Thread safety
///
/// Share it via `Arc`; publish and subscribe are safe from any task. The
/// bus-level lock guards only the topic map and the closed flag — dispatch
/// runs entirely on per-topic state, so distinct topics never contend.
pub struct MemoryBus {
    config: BusConfig,
    state: RwLock<BusState>,
}

impl MemoryBus {
    /// A bus with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// A bus with explicit configuration.
    #[must_use]
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            config,
            state: RwLock::new(BusState {
                topics: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Live subscriptions on `topic` (0 for unknown topics).
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.state
            .read()
            .topics
            .get(topic)
            .map_or(0, |t| t.subscriber_count())
    }

    fn is_closed(&self) -> bool {
        self.state.read().closed
    }

    /// Resolve `name`, creating the topic if this is its first use. The
    /// closed flag is re-checked under the write lock, closing the race
    /// against a concurrent `close()`.
    fn ensure_topic(&self, name: &str) -> Result<Arc<Topic>, BusError> {
        let mut state = self.state.write();
        if state.closed {
            return Err(BusError::Closed);
        }
        if let Some(topic) = state.topics.get(name) {
            return Ok(Arc::clone(topic));
        }

        let topic = Topic::new(
            name.to_string(),
            self.config.queue_capacity,
            self.config.workers_per_topic,
        );
        state.topics.insert(name.to_string(), Arc::clone(&topic));
        debug!(
            topic = name,
            capacity = self.config.queue_capacity,
            workers = self.config.workers_per_topic,
            "topic created"
        );
        Ok(topic)
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn subscribe_with(
        &self,
        topic: &str,
        handler: HandlerRef,
        options: SubscribeOptions,
    ) -> Result<SubscriptionHandle, BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        let topic = self.ensure_topic(topic)?;
        // First subscriber starts the fixed worker pool; until then the
        // topic only buffers.
        topic.ensure_workers(self.config.error_hook.clone());

        let id = topic.subscribe(SubscriptionRecord {
            handler,
            retries: options.retries(),
        });
        Ok(SubscriptionHandle { topic, id })
    }

    async fn publish_with(
        &self,
        scope: &Scope,
        topic: &str,
        event: Event,
        options: PublishOptions,
    ) -> Result<(), BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }

        // Headers are frozen onto the delivery scope here; the publisher's
        // own map can change afterwards without effect.
        let scope = match options.headers() {
            Some(headers) => scope.with_headers(headers),
            None => scope.clone(),
        };

        let resolved = self.ensure_topic(topic)?;
        debug!(topic, event = event.type_name(), "publishing");
        resolved.enqueue(Envelope::new(scope, event)).await
    }

    fn close(&self) {
        let topics: Vec<Arc<Topic>> = {
            let mut state = self.state.write();
            if state.closed {
                return;
            }
            state.closed = true;
            state.topics.values().cloned().collect()
        };

        for topic in &topics {
            topic.close();
        }
        debug!(topics = topics.len(), "bus closed");
    }
}
