//! # Delivery Queue
//!
//! Bounded MPMC queue between publishers and a topic's workers.
//!
//! Capacity semantics match a bounded channel: `capacity` envelopes may sit
//! buffered, and every worker that is ready to take an envelope contributes
//! one extra handoff slot. A capacity of 0 is therefore a rendezvous queue:
//! publishers suspend until a worker is ready, and with no workers at all
//! (a topic nobody ever subscribed to) a publish waits for its scope to
//! cancel or expire.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use crate::envelope::Envelope;
use crate::error::BusError;

pub(crate) struct DeliveryQueue {
    /// Free enqueue slots: `capacity` up front, plus one granted by each
    /// worker as it becomes ready to receive.
    slots: Semaphore,
    buffered: Mutex<VecDeque<Envelope>>,
    ready: Notify,
    closed: AtomicBool,
}

impl DeliveryQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            slots: Semaphore::new(capacity),
            buffered: Mutex::new(VecDeque::new()),
            ready: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue one envelope, suspending while the queue is full.
    ///
    /// Resumes on the first of: a slot freeing up (`Ok`), the envelope's
    /// scope cancelling or expiring (the scope's error), or the queue closing
    /// underneath the waiter (`Closed`).
    pub(crate) async fn push(&self, envelope: Envelope) -> Result<(), BusError> {
        let permit = tokio::select! {
            acquired = self.slots.acquire() => match acquired {
                Ok(permit) => permit,
                Err(_) => return Err(BusError::Closed),
            },
            cause = envelope.scope.done() => return Err(cause.into()),
        };
        // The slot stays consumed until a worker takes the envelope.
        permit.forget();

        self.buffered.lock().push_back(envelope);
        self.ready.notify_one();
        Ok(())
    }

    /// Dequeue one envelope, suspending while the queue is empty.
    ///
    /// Grants one handoff slot up front: a ready worker lets one publisher
    /// through even at capacity 0. Returns `None` once the queue is closed
    /// and fully drained.
    pub(crate) async fn pop(&self) -> Option<Envelope> {
        self.slots.add_permits(1);
        loop {
            let notified = self.ready.notified();
            tokio::pin!(notified);
            // Register for wakeups before checking, so a push or close that
            // lands between the check and the await is not lost.
            notified.as_mut().enable();

            if let Some(envelope) = self.buffered.lock().pop_front() {
                return Some(envelope);
            }
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Close the queue: blocked and future pushes fail with `Closed`, idle
    /// workers wake to drain what is buffered and then stop.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.slots.close();
        self.ready.notify_waiters();
    }

    #[cfg(test)]
    pub(crate) fn buffered_len(&self) -> usize {
        self.buffered.lock().len()
    }
}
