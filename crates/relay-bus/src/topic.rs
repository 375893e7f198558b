//! # Topic
//!
//! A named delivery channel: bounded queue, subscriber table, fixed worker
//! pool. Topics are created lazily and never removed, even when the last
//! subscriber leaves — in-flight publishes may still hold the topic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::bus::ErrorHook;
use crate::envelope::Envelope;
use crate::error::BusError;
use crate::handler::{HandlerError, HandlerRef, HandlerResult};
use crate::queue::DeliveryQueue;

/// A registered handler plus its per-subscription settings.
#[derive(Clone)]
pub(crate) struct SubscriptionRecord {
    pub(crate) handler: HandlerRef,
    /// Attempts per envelope, ≥ 1. 1 means no retry.
    pub(crate) retries: u32,
}

struct SubscriberTable {
    entries: HashMap<u64, SubscriptionRecord>,
    /// Monotonic within this topic; never reused.
    next_id: u64,
}

pub(crate) struct Topic {
    name: String,
    queue: DeliveryQueue,
    /// Pool size, fixed at creation. Not resizable.
    workers: usize,
    subscribers: RwLock<SubscriberTable>,
    workers_started: AtomicBool,
}

impl Topic {
    pub(crate) fn new(name: String, queue_capacity: usize, workers: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            queue: DeliveryQueue::new(queue_capacity),
            workers: workers.max(1),
            subscribers: RwLock::new(SubscriberTable {
                entries: HashMap::new(),
                next_id: 0,
            }),
            workers_started: AtomicBool::new(false),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Register a subscription under a fresh ID.
    pub(crate) fn subscribe(&self, record: SubscriptionRecord) -> u64 {
        let mut table = self.subscribers.write();
        table.next_id += 1;
        let id = table.next_id;
        table.entries.insert(id, record);
        debug!(topic = %self.name, subscription = id, "subscription registered");
        id
    }

    /// Remove a subscription. Idempotent; unknown IDs are ignored.
    pub(crate) fn unsubscribe(&self, id: u64) {
        if self.subscribers.write().entries.remove(&id).is_some() {
            debug!(topic = %self.name, subscription = id, "subscription removed");
        }
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.read().entries.len()
    }

    pub(crate) async fn enqueue(&self, envelope: Envelope) -> Result<(), BusError> {
        self.queue.push(envelope).await
    }

    pub(crate) fn close(&self) {
        self.queue.close();
    }

    /// Start the fixed worker pool. Exactly one caller wins; the pool is
    /// never resized afterwards.
    pub(crate) fn ensure_workers(self: &Arc<Self>, hook: Option<ErrorHook>) {
        if self.workers_started.swap(true, Ordering::AcqRel) {
            return;
        }
        for worker in 0..self.workers {
            let topic = Arc::clone(self);
            let hook = hook.clone();
            tokio::spawn(async move { topic.worker_loop(worker, hook).await });
        }
        debug!(topic = %self.name, workers = self.workers, "worker pool started");
    }

    /// One worker: dequeue, snapshot subscribers, fan out with retries.
    /// Exits once the queue is closed and drained.
    async fn worker_loop(self: Arc<Self>, worker: usize, hook: Option<ErrorHook>) {
        while let Some(envelope) = self.queue.pop().await {
            self.dispatch(envelope, hook.as_ref()).await;
        }
        debug!(topic = %self.name, worker, "worker stopped after drain");
    }

    async fn dispatch(&self, envelope: Envelope, hook: Option<&ErrorHook>) {
        // Copy the table out under the read lock; no lock is held while
        // handlers run. Subscribers added after this point miss the
        // envelope, subscribers removed after it still get this delivery.
        let snapshot: Vec<SubscriptionRecord> = {
            let table = self.subscribers.read();
            table.entries.values().cloned().collect()
        };

        let Envelope { scope, event } = envelope;
        for record in &snapshot {
            let mut last_err: Option<HandlerError> = None;
            for _attempt in 0..record.retries.max(1) {
                match invoke(&record.handler, &scope, &event).await {
                    Ok(()) => {
                        last_err = None;
                        break;
                    }
                    Err(err) => last_err = Some(err),
                }
            }

            // Exhausted budget: report and move on. One failing subscriber
            // never blocks delivery to the rest.
            if let Some(err) = last_err {
                warn!(
                    topic = %self.name,
                    event = event.type_name(),
                    error = %err,
                    "handler failed after final retry"
                );
                if let Some(hook) = hook {
                    hook(&scope, &self.name, &event, &err);
                }
            }
        }
    }
}

/// Run one handler attempt, converting a panic into an ordinary failed
/// attempt so a misbehaving subscriber cannot take its worker down.
async fn invoke(
    handler: &HandlerRef,
    scope: &relay_context::Scope,
    event: &crate::event::Event,
) -> HandlerResult {
    let fut = handler.call(scope.clone(), event.clone());
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("opaque panic payload");
            Err(format!("handler panicked: {msg}").into())
        }
    }
}
