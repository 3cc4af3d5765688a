use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;
const FLEET_CHANNEL_CAPACITY: usize = 4096;

/// Broadcast hub for reservation changes, per resource and fleet-wide.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Event>>,
    fleet: broadcast::Sender<Event>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            fleet: broadcast::channel(FLEET_CHANNEL_CAPACITY).0,
        }
    }

    /// Subscribe to one resource. Creates the channel if needed.
    pub fn subscribe(&self, resource_id: Ulid) -> broadcast::Receiver<Event> {
        let sender = self
            .channels
            .entry(resource_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Subscribe to every resource.
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.fleet.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, event: &Event) {
        let resource_id = event.resource_id();
        if let Some(sender) = self.channels.get(&resource_id) {
            let _ = sender.send(event.clone());
        }
        let _ = self.fleet.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DateInterval, ManualBlock};

    fn block_added(resource_id: Ulid) -> Event {
        Event::BlockAdded {
            block: ManualBlock {
                id: Ulid::new(),
                resource_id,
                interval: DateInterval::try_new(0, 1_000).unwrap(),
                reason: None,
            },
        }
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let rid = Ulid::new();
        let mut rx = hub.subscribe(rid);

        let event = block_added(rid);
        hub.send(&event);

        let received = rx.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn fleet_subscriber_sees_every_resource() {
        let hub = NotifyHub::new();
        let mut all = hub.subscribe_all();
        let a = block_added(Ulid::new());
        let b = Event::BlockRemoved {
            id: Ulid::new(),
            resource_id: Ulid::new(),
        };
        hub.send(&a);
        hub.send(&b);
        assert_eq!(all.recv().await.unwrap(), a);
        assert_eq!(all.recv().await.unwrap(), b);
    }

    #[tokio::test]
    async fn other_resources_not_delivered() {
        let hub = NotifyHub::new();
        let mut rx = hub.subscribe(Ulid::new());
        hub.send(&block_added(Ulid::new()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.send(&block_added(Ulid::new()));
    }
}
