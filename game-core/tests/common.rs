#![allow(dead_code)]

use game_core::{Broadcaster, FixedWordSource, ManualEnvironment, RoomRegistry};
use game_types::{RoomEvent, RoomSettings};
use std::sync::{Arc, Mutex};

pub const TEST_ANSWERS: [&str; 3] = ["apple", "crane", "stone"];

/// Event collector for testing event emissions
#[derive(Clone, Default)]
pub struct RecordingBroadcaster {
    events: Arc<Mutex<Vec<(String, RoomEvent)>>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RoomEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn events_for(&self, room_id: &str) -> Vec<RoomEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(room, _)| room == room_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, event)| event.name() == name)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn publish(&self, room_id: &str, event: RoomEvent) {
        self.events
            .lock()
            .unwrap()
            .push((room_id.to_string(), event));
    }
}

pub struct TestHarness {
    pub registry: Arc<RoomRegistry>,
    pub events: RecordingBroadcaster,
    pub env: Arc<ManualEnvironment>,
}

/// Registry over a manual clock and the fixed answers APPLE, CRANE, STONE.
pub fn create_test_harness() -> TestHarness {
    let events = RecordingBroadcaster::new();
    let env = Arc::new(ManualEnvironment::seeded(2024));
    let registry = Arc::new(RoomRegistry::new(
        Arc::new(FixedWordSource::new(TEST_ANSWERS)),
        Arc::new(events.clone()),
        env.clone(),
    ));
    TestHarness {
        registry,
        events,
        env,
    }
}

pub fn settings(max_participants: u32, total_rounds: u32, max_attempts: u32) -> RoomSettings {
    RoomSettings {
        max_participants,
        total_rounds,
        round_time_limit_seconds: 60,
        max_attempts_per_round: max_attempts,
    }
}

impl TestHarness {
    /// Creates a room led by "leader" and joins `others` to it.
    pub async fn room_with(&self, settings: RoomSettings, others: &[&str]) -> String {
        let view = self
            .registry
            .create_room("leader", Some("Leader"), settings)
            .await
            .unwrap();
        for id in others {
            self.registry
                .join_room(&view.room.id, id, None)
                .await
                .unwrap();
        }
        view.room.id
    }

    /// Starts the room and moves the clock past the countdown.
    pub async fn start(&self, room_id: &str) {
        self.registry.start_room(room_id, "leader").await.unwrap();
        self.env.advance(game_core::round_countdown());
    }
}
