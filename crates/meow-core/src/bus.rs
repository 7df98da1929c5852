//! The event bus: one ordered, unbounded, multi-producer/single-consumer channel.
//!
//! Producers call [`EventSender::put`], which never blocks and never fails.
//! The dispatcher is the only consumer and calls [`EventReceiver::get`], which
//! suspends until an event is available and yields events in `put` order.
//!
//! The queue is unbounded: events are never rejected, and memory grows if the
//! consumer stalls. The dispatcher awaits each broadcast to completion before
//! taking the next event, so this queue is also where overlapping TTS requests
//! wait their turn.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::events::Event;

/// Create a connected sender/receiver pair.
pub fn event_bus() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    (
        EventSender {
            tx,
            pending: Arc::clone(&pending),
        },
        EventReceiver { rx, pending },
    )
}

/// Producer half. Cheap to clone; hand one to every producer.
#[derive(Clone, Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
    pending: Arc<AtomicUsize>,
}

impl EventSender {
    /// Enqueue an event without blocking.
    ///
    /// If the consumer is gone (process shutting down) the event is dropped.
    pub fn put(&self, event: Event) {
        let kind = event.kind();
        let _ = self.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(event).is_err() {
            let _ = self.pending.fetch_sub(1, Ordering::AcqRel);
            debug!(kind, "event bus closed, dropping event");
            return;
        }
        trace!(kind, "event enqueued");
    }

    /// Number of events enqueued but not yet taken by the consumer.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half. Exactly one exists per bus.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
    pending: Arc<AtomicUsize>,
}

impl EventReceiver {
    /// Wait for the next event.
    ///
    /// Returns `None` once every sender has been dropped and the queue is drained.
    pub async fn get(&mut self) -> Option<Event> {
        let event = self.rx.recv().await?;
        let _ = self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// Take the next event if one is already queued.
    pub fn try_get(&mut self) -> Option<Event> {
        let event = self.rx.try_recv().ok()?;
        let _ = self.pending.fetch_sub(1, Ordering::AcqRel);
        Some(event)
    }

    /// A read-only handle on the queue depth, for health reporting.
    pub fn depth(&self) -> QueueDepth {
        QueueDepth(Arc::clone(&self.pending))
    }
}

/// Read-only view of how many events are waiting on the bus.
///
/// Holding one does not keep the bus open.
#[derive(Clone, Debug)]
pub struct QueueDepth(Arc<AtomicUsize>);

impl QueueDepth {
    /// Current number of queued events.
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn fifo_order() {
        let (tx, mut rx) = event_bus();
        tx.put(Event::chat("a", "1"));
        tx.put(Event::cheer("b", 10, "2"));
        tx.put(Event::chat("c", "3"));

        assert_eq!(rx.get().await.unwrap().text(), "1");
        assert_eq!(rx.get().await.unwrap().text(), "2");
        assert_eq!(rx.get().await.unwrap().text(), "3");
    }

    #[tokio::test]
    async fn multiple_producers_share_one_queue() {
        let (tx, mut rx) = event_bus();
        let tx2 = tx.clone();
        tx.put(Event::chat("a", "first"));
        tx2.put(Event::chat("b", "second"));

        assert_eq!(rx.get().await.unwrap().speaker(), "a");
        assert_eq!(rx.get().await.unwrap().speaker(), "b");
    }

    #[tokio::test(start_paused = true)]
    async fn get_waits_for_put() {
        let (tx, mut rx) = event_bus();
        let handle = tokio::spawn(async move { rx.get().await });

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!handle.is_finished());

        tx.put(Event::chat("late", "hello"));
        let event = handle.await.unwrap().unwrap();
        assert_eq!(event.speaker(), "late");
    }

    #[tokio::test]
    async fn pending_tracks_depth() {
        let (tx, mut rx) = event_bus();
        let depth = rx.depth();
        assert_eq!(depth.get(), 0);

        tx.put(Event::chat("a", "1"));
        tx.put(Event::chat("a", "2"));
        assert_eq!(tx.pending(), 2);
        assert_eq!(depth.get(), 2);

        let _ = rx.get().await;
        assert_eq!(depth.get(), 1);
        let _ = rx.try_get();
        assert_eq!(depth.get(), 0);
    }

    #[tokio::test]
    async fn put_after_receiver_dropped_is_silent() {
        let (tx, rx) = event_bus();
        drop(rx);
        assert!(tx.is_closed());
        tx.put(Event::chat("a", "lost"));
        assert_eq!(tx.pending(), 0);
    }

    #[tokio::test]
    async fn get_returns_none_when_senders_gone() {
        let (tx, mut rx) = event_bus();
        tx.put(Event::chat("a", "last"));
        drop(tx);
        assert!(rx.get().await.is_some());
        assert!(rx.get().await.is_none());
    }

    #[test]
    fn try_get_on_empty_queue() {
        let (_tx, mut rx) = event_bus();
        assert!(rx.try_get().is_none());
    }
}
