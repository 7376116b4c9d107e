//! # crucible-progress
//!
//! In-process multicast of [`ProgressEvent`]s from a running plan to N
//! subscribers (CLI output, SSE bridge, logs). Delivery is best-effort: a
//! slow or dropped subscriber never blocks the runner, and a subscriber that
//! panics while handling an event never takes down the broadcaster.
//!
//! The runner model is `std::thread`, not an async runtime, so the bus is
//! built on `std::sync::mpsc` channels rather than `tokio::sync::broadcast`.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Mutex;

use crucible_types::ProgressEvent;

/// Broadcasts [`ProgressEvent`]s to every currently-subscribed [`ProgressSubscriber`].
///
/// Cloning the bus is cheap and shares the subscriber list; clone it into
/// each worker thread rather than wrapping it in an `Arc` yourself.
#[derive(Clone, Default)]
pub struct ProgressBus {
    subscribers: std::sync::Arc<Mutex<Vec<Sender<ProgressEvent>>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber that receives every event broadcast from
    /// this point on. Events broadcast before subscribing are never seen.
    pub fn subscribe(&self) -> ProgressSubscriber {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().unwrap().push(tx);
        ProgressSubscriber { rx }
    }

    /// Broadcasts `event` to every live subscriber. Subscribers whose
    /// receiver has been dropped are pruned; no error is reported for them,
    /// since a dropped subscriber is an expected, not exceptional, state.
    pub fn publish(&self, event: ProgressEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of currently live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

/// A handle for draining events published to a [`ProgressBus`].
pub struct ProgressSubscriber {
    rx: Receiver<ProgressEvent>,
}

impl ProgressSubscriber {
    /// Blocks until the next event arrives, or returns `None` once the bus
    /// itself (and every clone of it) has been dropped.
    pub fn recv(&self) -> Option<ProgressEvent> {
        self.rx.recv().ok()
    }

    /// Drains every event currently queued without blocking.
    pub fn try_recv_all(&self) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}
