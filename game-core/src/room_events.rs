use game_types::RoomEvent;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Delivers room-scoped events to whoever is listening.
///
/// Fire-and-forget: the coordinator never learns whether delivery worked, so
/// implementations must not block or fail loudly.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, room_id: &str, event: RoomEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn publish(&self, _room_id: &str, _event: RoomEvent) {}
}

/// Fans each event out to every registered broadcaster.
#[derive(Default)]
pub struct RoomEventBus {
    handlers: RwLock<Vec<Arc<dyn Broadcaster>>>,
}

impl RoomEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_handler(&self, handler: Arc<dyn Broadcaster>) {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Broadcaster for RoomEventBus {
    fn publish(&self, room_id: &str, event: RoomEvent) {
        debug!("Publishing {} for room {}", event.name(), room_id);
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for handler in handlers.iter() {
            handler.publish(room_id, event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestHandler {
        events: Mutex<Vec<(String, RoomEvent)>>,
    }

    impl Broadcaster for TestHandler {
        fn publish(&self, room_id: &str, event: RoomEvent) {
            self.events.lock().unwrap().push((room_id.to_string(), event));
        }
    }

    #[test]
    fn test_event_bus_fans_out() {
        let bus = RoomEventBus::new();
        let first = Arc::new(TestHandler::default());
        let second = Arc::new(TestHandler::default());
        bus.add_handler(first.clone());
        bus.add_handler(second.clone());
        assert_eq!(bus.handler_count(), 2);

        bus.publish("ROOM01", RoomEvent::update("ROOM01"));
        bus.publish("ROOM01", RoomEvent::class_end("ROOM01"));

        for handler in [first, second] {
            let events = handler.events.lock().unwrap();
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].1.name(), "update");
            assert_eq!(events[1].1.name(), "class_end");
            assert!(events.iter().all(|(room, _)| room == "ROOM01"));
        }
    }

    #[test]
    fn test_empty_bus_is_fine() {
        let bus = RoomEventBus::new();
        bus.publish("ROOM01", RoomEvent::update("ROOM01"));
        NoopBroadcaster.publish("ROOM01", RoomEvent::update("ROOM01"));
    }
}
