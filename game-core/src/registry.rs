use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use game_types::{
    GuessOutcome, Participant, RoomError, RoomEvent, RoomId, RoomSettings, RoundStanding,
    SafeRoomState,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{Broadcaster, Environment, Room, WordSource};

pub const ROOM_ID_LENGTH: usize = 6;
const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub type SharedRoom = Arc<Mutex<Room>>;

/// All live rooms, keyed by id.
///
/// The map itself is sharded so lookups and inserts never contend on a global
/// lock; each room then carries its own async mutex. Every operation on a room,
/// reads included, runs under that mutex, and events are published before it
/// is released so subscribers see them in the order the room changed.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, SharedRoom>,
    word_source: Arc<dyn WordSource>,
    broadcaster: Arc<dyn Broadcaster>,
    env: Arc<dyn Environment>,
}

impl RoomRegistry {
    pub fn new(
        word_source: Arc<dyn WordSource>,
        broadcaster: Arc<dyn Broadcaster>,
        env: Arc<dyn Environment>,
    ) -> Self {
        Self {
            rooms: DashMap::new(),
            word_source,
            broadcaster,
            env,
        }
    }

    pub fn env(&self) -> &Arc<dyn Environment> {
        &self.env
    }

    pub async fn create_room(
        &self,
        leader_id: &str,
        leader_display_name: Option<&str>,
        settings: RoomSettings,
    ) -> Result<SafeRoomState, RoomError> {
        settings.validate()?;

        loop {
            let room_id = self.generate_room_id();
            match self.rooms.entry(room_id) {
                Entry::Occupied(entry) => {
                    debug!("Room id {} already taken, drawing another", entry.key());
                }
                Entry::Vacant(entry) => {
                    let room = Room::new(
                        entry.key().clone(),
                        leader_id.to_string(),
                        leader_display_name,
                        settings,
                        self.env.now(),
                    );
                    let view = room.safe_state();
                    entry.insert(Arc::new(Mutex::new(room)));

                    info!(
                        "Room {} created by {} ({} rounds, {} players max)",
                        view.room.id, leader_id, settings.total_rounds, settings.max_participants
                    );
                    return Ok(view);
                }
            }
        }
    }

    pub async fn join_room(
        &self,
        room_id: &str,
        participant_id: &str,
        display_name: Option<&str>,
    ) -> Result<Participant, RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;
        let participant = room.join(participant_id, display_name, self.env.now())?;
        // Joins change the roster other clients are showing.
        self.publish_all(room_id, vec![RoomEvent::update(room_id)]);
        Ok(participant)
    }

    pub async fn start_room(&self, room_id: &str, leader_id: &str) -> Result<(), RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;
        let events = room.start(leader_id, self.word_source.as_ref(), self.env.now())?;
        self.publish_all(room_id, events);
        Ok(())
    }

    /// Sweeps the room first, so a guess that lands after the deadline is
    /// refused even if the periodic sweeper has not run yet.
    pub async fn submit_guess(
        &self,
        room_id: &str,
        participant_id: &str,
        guessed_word: &str,
    ) -> Result<GuessOutcome, RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;

        let swept = room.sweep_timeouts(self.env.as_ref());
        self.publish_all(room_id, swept);

        let (outcome, events) =
            room.submit_guess(participant_id, guessed_word, self.env.as_ref())?;
        self.publish_all(room_id, events);
        Ok(outcome)
    }

    pub async fn advance_round(&self, room_id: &str, leader_id: &str) -> Result<(), RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;
        let events = room.advance_round(leader_id, self.env.now())?;
        self.publish_all(room_id, events);
        Ok(())
    }

    pub async fn restart_room(&self, room_id: &str, leader_id: &str) -> Result<(), RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;
        let events = room.restart(leader_id, self.word_source.as_ref(), self.env.now())?;
        self.publish_all(room_id, events);
        Ok(())
    }

    /// Client view of the room, after applying any pending timeouts.
    pub async fn get_room(&self, room_id: &str) -> Result<SafeRoomState, RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;
        self.sweep_locked(&mut room);
        Ok(room.safe_state())
    }

    pub async fn get_participant(
        &self,
        room_id: &str,
        participant_id: &str,
    ) -> Result<Participant, RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;
        self.sweep_locked(&mut room);
        room.state
            .participants
            .get(participant_id)
            .cloned()
            .ok_or_else(|| RoomError::ParticipantNotFound {
                participant_id: participant_id.to_string(),
            })
    }

    /// Roster in join order.
    pub async fn list_participants(&self, room_id: &str) -> Result<Vec<Participant>, RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;
        self.sweep_locked(&mut room);
        Ok(room.state.roster().into_iter().cloned().collect())
    }

    pub async fn round_standings(&self, room_id: &str) -> Result<Vec<RoundStanding>, RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;
        self.sweep_locked(&mut room);
        Ok(room.state.round_standings())
    }

    pub async fn sweep_room(&self, room_id: &str) -> Result<(), RoomError> {
        let shared = self.room(room_id)?;
        let mut room = shared.lock().await;
        self.sweep_locked(&mut room);
        Ok(())
    }

    /// One pass of the timeout sweep over every room.
    ///
    /// Rooms are collected first so no map shard stays locked while waiting
    /// on a room's mutex.
    pub async fn sweep_all(&self) {
        for shared in self.snapshot() {
            let mut room = shared.lock().await;
            self.sweep_locked(&mut room);
        }
    }

    pub fn remove_room(&self, room_id: &str) -> bool {
        let removed = self.rooms.remove(room_id).is_some();
        if removed {
            info!("Room {} removed", room_id);
        }
        removed
    }

    /// Removes the room if `evict` accepts it. The decision is made while the
    /// map entry is held, and a room that is locked or whose handle is held by
    /// an in-flight request is kept, so no operation can slip in between.
    pub fn remove_room_if<F>(&self, room_id: &str, evict: F) -> bool
    where
        F: FnOnce(&Room) -> bool,
    {
        self.rooms
            .remove_if(room_id, |_, shared| {
                if Arc::strong_count(shared) > 1 {
                    return false;
                }
                match shared.try_lock() {
                    Ok(room) => evict(&room),
                    Err(_) => false,
                }
            })
            .is_some()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Handle to a room for callers that need to inspect it under its lock.
    pub fn room(&self, room_id: &str) -> Result<SharedRoom, RoomError> {
        self.rooms
            .get(room_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RoomError::RoomNotFound {
                room_id: room_id.to_string(),
            })
    }

    pub(crate) fn snapshot(&self) -> Vec<SharedRoom> {
        self.rooms.iter().map(|entry| entry.value().clone()).collect()
    }

    fn sweep_locked(&self, room: &mut Room) {
        let events = room.sweep_timeouts(self.env.as_ref());
        if !events.is_empty() {
            debug!("Sweep of room {} produced {} event(s)", room.id(), events.len());
        }
        let room_id = room.id().to_string();
        self.publish_all(&room_id, events);
    }

    fn publish_all(&self, room_id: &str, events: Vec<RoomEvent>) {
        for event in events {
            self.broadcaster.publish(room_id, event);
        }
    }

    fn generate_room_id(&self) -> RoomId {
        (0..ROOM_ID_LENGTH)
            .map(|_| ROOM_ID_ALPHABET[self.env.random_below(ROOM_ID_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedWordSource, ManualEnvironment, NoopBroadcaster};

    fn registry() -> RoomRegistry {
        RoomRegistry::new(
            Arc::new(FixedWordSource::new(["apple"])),
            Arc::new(NoopBroadcaster),
            Arc::new(ManualEnvironment::seeded(5)),
        )
    }

    #[test]
    fn test_room_id_shape() {
        let registry = registry();
        for _ in 0..50 {
            let id = registry.generate_room_id();
            assert_eq!(id.len(), ROOM_ID_LENGTH);
            assert!(id.bytes().all(|b| ROOM_ID_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn test_create_rejects_zero_settings() {
        let registry = registry();
        let settings = RoomSettings {
            total_rounds: 0,
            ..RoomSettings::default()
        };

        let result = registry.create_room("leader", None, settings).await;
        assert!(matches!(result, Err(RoomError::InvalidSettings { .. })));
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let registry = registry();

        assert!(matches!(
            registry.get_room("NOPE00").await,
            Err(RoomError::RoomNotFound { .. })
        ));
        assert!(matches!(
            registry.join_room("NOPE00", "bob", None).await,
            Err(RoomError::RoomNotFound { .. })
        ));
        assert!(!registry.remove_room("NOPE00"));
        assert!(registry.sweep_room("NOPE00").await.is_err());
    }

    #[tokio::test]
    async fn test_remove_room() {
        let registry = registry();
        let view = registry
            .create_room("leader", None, RoomSettings::default())
            .await
            .unwrap();

        assert_eq!(registry.room_count(), 1);
        assert_eq!(registry.room_ids(), vec![view.room.id.clone()]);
        assert!(registry.remove_room(&view.room.id));
        assert_eq!(registry.room_count(), 0);
    }
}
