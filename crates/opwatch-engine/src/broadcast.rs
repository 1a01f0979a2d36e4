//! Live update broadcasting.
//!
//! Progress snapshots and alerts go out on an in-process topic; the engine
//! has no knowledge of delivery transports. A subscriber that falls behind
//! or disconnects never affects chunk processing.

use tokio::sync::broadcast;
use tracing::debug;

use opwatch_models::MonitorEvent;

/// In-process publish/subscribe topic for monitor events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MonitorEvent>,
}

impl EventBus {
    /// Create a bus retaining up to `capacity` undelivered events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Delivery failures are logged, never propagated.
    pub fn publish(&self, event: MonitorEvent) {
        if self.tx.send(event).is_err() {
            debug!("No live subscribers for monitor event");
        }
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opwatch_models::SessionId;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(MonitorEvent::stopped(SessionId::from_string("s1"), 10));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, MonitorEvent::Stopped { frames_processed: 10, .. }));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(16);
        // Must not panic or error
        bus.publish(MonitorEvent::stopped(SessionId::from_string("s1"), 0));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
