//! Drop-event bus between the editor and its listeners.

use dl_core::model::DropEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const BUS_CAPACITY: usize = 16;

/// Publishes "shapes dropped over target" events.
#[derive(Debug, Clone)]
pub struct DropBus {
    tx: broadcast::Sender<DropEvent>,
}

impl DropBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Deliver `event` to every current subscriber. Returns how many
    /// received it (0 when nobody is listening).
    pub fn publish(&self, event: DropEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(_) => {
                log::debug!("drop event published with no listeners");
                0
            }
        }
    }

    pub fn subscribe(&self) -> DropSubscription {
        DropSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for DropBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One listener's view of the bus. Dropping it unsubscribes.
#[derive(Debug)]
pub struct DropSubscription {
    rx: broadcast::Receiver<DropEvent>,
}

impl DropSubscription {
    /// Next event, or `None` once every `DropBus` handle is gone.
    /// Events missed by a slow listener are skipped, never replayed.
    pub async fn recv(&mut self) -> Option<DropEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(n)) => log::warn!("listener lagged; skipped {n} drop events"),
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dl_core::model::{Bounds, Shape};

    fn event() -> DropEvent {
        DropEvent::new(
            Shape::frame("ev-frame", Bounds::new(0.0, 0.0, 800.0, 600.0)),
            [Shape::image("ev-img", Bounds::new(0.0, 0.0, 10.0, 10.0))],
        )
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = DropBus::new();
        let mut sub = bus.subscribe();
        assert_eq!(bus.publish(event()), 1);
        assert_eq!(sub.recv().await, Some(event()));
    }

    #[tokio::test]
    async fn dropping_subscription_unsubscribes() {
        let bus = DropBus::new();
        let sub = bus.subscribe();
        assert_eq!(bus.listener_count(), 1);
        drop(sub);
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.publish(event()), 0);
    }

    #[tokio::test]
    async fn closed_bus_ends_subscription() {
        let bus = DropBus::new();
        let mut sub = bus.subscribe();
        drop(bus);
        assert_eq!(sub.recv().await, None);
    }
}
