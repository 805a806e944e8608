//! Acceptance event broadcasting.
//!
//! Each subscriber has an independent buffer. A subscriber that falls more
//! than the buffer capacity behind skips the missed events.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use murmur_types::events::SignalAccepted;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Default per-subscriber buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Broadcasts accepted signals to subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SignalAccepted>,
    next_subscription: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            next_subscription: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn emit(&self, event: SignalAccepted) {
        // No receivers is not an error.
        let _ = self.sender.send(event);
    }

    /// Start receiving events emitted from now on.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(subscription = id, "event subscription opened");
        Subscription {
            id,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

/// A live stream of acceptance events.
pub struct Subscription {
    id: u64,
    receiver: broadcast::Receiver<SignalAccepted>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the next event. `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<SignalAccepted> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscription = self.id, skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The next buffered event, if any.
    pub fn try_next(&mut self) -> Option<SignalAccepted> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(subscription = self.id, skipped, "subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Stop receiving events.
    pub fn unsubscribe(self) {
        tracing::debug!(subscription = self.id, "event subscription closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(sequence: u64) -> SignalAccepted {
        SignalAccepted {
            sequence,
            round: [1; 32],
            signal: format!("signal {sequence}"),
            nullifier_hash: [sequence as u8; 32],
            root: [2; 32],
        }
    }

    #[test]
    fn test_emit_subscribe() {
        let bus = EventBus::new(16);
        let mut sub = bus.subscribe();
        bus.emit(event(1));
        assert_eq!(sub.try_next().map(|e| e.sequence), Some(1));
        assert!(sub.try_next().is_none());
    }

    #[test]
    fn test_unsubscribe_and_resubscribe() {
        let bus = EventBus::new(16);
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);

        bus.emit(event(1));
        let mut fresh = bus.subscribe();
        assert!(fresh.try_next().is_none());
        bus.emit(event(2));
        assert_eq!(fresh.try_next().map(|e| e.sequence), Some(2));
    }

    #[test]
    fn test_lagged_subscriber_skips() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        for i in 1..=5 {
            bus.emit(event(i));
        }
        assert_eq!(sub.try_next().map(|e| e.sequence), Some(4));
        assert_eq!(sub.try_next().map(|e| e.sequence), Some(5));
    }

    #[test]
    fn test_subscription_ids_unique() {
        let bus = EventBus::default();
        let a = bus.subscribe();
        let b = bus.subscribe();
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_next_waits_for_event() {
        let bus = EventBus::new(4);
        let mut sub = bus.subscribe();
        let sender = bus.clone();
        tokio::spawn(async move { sender.emit(event(7)) });
        assert_eq!(sub.next().await.map(|e| e.sequence), Some(7));
    }
}
