use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::{Participant, ParticipantId, RoomError, RoomId, RoundNumber, RoundStanding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomPhase {
    Waiting,
    Playing,
    Finished,
}

/// Limits fixed when the room is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    pub max_participants: u32,
    pub total_rounds: u32,
    pub round_time_limit_seconds: u32,
    pub max_attempts_per_round: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_participants: 6,
            total_rounds: 5,
            round_time_limit_seconds: 120,
            max_attempts_per_round: 6,
        }
    }
}

impl RoomSettings {
    pub fn validate(&self) -> Result<(), RoomError> {
        let fields = [
            ("maxParticipants", self.max_participants),
            ("totalRounds", self.total_rounds),
            ("roundTimeLimitSeconds", self.round_time_limit_seconds),
            ("maxAttemptsPerRound", self.max_attempts_per_round),
        ];

        match fields.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(RoomError::InvalidSettings {
                reason: format!("{name} must be at least 1"),
            }),
            None => Ok(()),
        }
    }

    pub fn round_time_limit(&self) -> Duration {
        Duration::seconds(i64::from(self.round_time_limit_seconds))
    }
}

/// Client-visible room state. The secret answers live in the coordinator and
/// never appear here.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub id: RoomId,
    pub leader_id: ParticipantId,
    pub phase: RoomPhase,
    pub settings: RoomSettings,
    pub join_locked: bool,
    pub current_round: RoundNumber,
    /// Length of this cycle's answers, `0` until the room has started.
    pub answer_length: u32,
    pub round_start_time: Option<DateTime<Utc>>,
    pub room_start_time: Option<DateTime<Utc>>,
    pub participants: HashMap<ParticipantId, Participant>,
    pub created_at: DateTime<Utc>,
}

impl RoomState {
    pub fn is_leader(&self, participant_id: &str) -> bool {
        self.leader_id == participant_id
    }

    pub fn is_last_round(&self) -> bool {
        self.current_round >= self.settings.total_rounds
    }

    /// When the current round stops accepting guesses, if it has started.
    pub fn round_deadline(&self) -> Option<DateTime<Utc>> {
        self.round_start_time
            .map(|start| start + self.settings.round_time_limit())
    }

    pub fn everyone_finished_round(&self, round_number: RoundNumber) -> bool {
        self.participants
            .values()
            .all(|participant| participant.has_finished_round(round_number))
    }

    /// Participants ordered by join time, then id.
    pub fn roster(&self) -> Vec<&Participant> {
        let mut roster: Vec<&Participant> = self.participants.values().collect();
        roster.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
        roster
    }

    /// Current-round leaderboard, fewest guesses first. Ties keep join order.
    pub fn round_standings(&self) -> Vec<RoundStanding> {
        let mut standings: Vec<RoundStanding> = self
            .roster()
            .into_iter()
            .map(|participant| RoundStanding::for_round(participant, self.current_round))
            .collect();
        standings.sort_by_key(|standing| standing.guess_count);
        standings
    }
}

/// Safe version of the room for HTTP responses: only answers of rounds that
/// are already over are revealed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SafeRoomState {
    #[serde(flatten)]
    pub room: RoomState,
    pub revealed_answers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_room() -> RoomState {
        let created_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut participants = HashMap::new();
        for (offset, id) in ["leader", "bob", "carol"].iter().enumerate() {
            participants.insert(
                id.to_string(),
                Participant::new(
                    id.to_string(),
                    id.to_string(),
                    created_at + Duration::seconds(offset as i64),
                ),
            );
        }

        RoomState {
            id: "ABC123".to_string(),
            leader_id: "leader".to_string(),
            phase: RoomPhase::Waiting,
            settings: RoomSettings::default(),
            join_locked: false,
            current_round: 1,
            answer_length: 0,
            round_start_time: None,
            room_start_time: None,
            participants,
            created_at,
        }
    }

    #[test]
    fn test_default_settings_are_valid() {
        let settings = RoomSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_participants, 6);
        assert_eq!(settings.total_rounds, 5);
        assert_eq!(settings.round_time_limit_seconds, 120);
        assert_eq!(settings.max_attempts_per_round, 6);
    }

    #[test]
    fn test_zero_settings_are_rejected() {
        let settings = RoomSettings {
            total_rounds: 0,
            ..RoomSettings::default()
        };
        match settings.validate() {
            Err(RoomError::InvalidSettings { reason }) => assert!(reason.contains("totalRounds")),
            other => panic!("Expected InvalidSettings, got {:?}", other),
        }
    }

    #[test]
    fn test_round_deadline() {
        let mut room = test_room();
        assert!(room.round_deadline().is_none());

        let start = room.created_at + Duration::seconds(3);
        room.round_start_time = Some(start);
        assert_eq!(room.round_deadline(), Some(start + Duration::seconds(120)));
    }

    #[test]
    fn test_roster_follows_join_order() {
        let room = test_room();
        let ids: Vec<&str> = room.roster().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["leader", "bob", "carol"]);
    }

    #[test]
    fn test_round_standings_sorted_by_guess_count() {
        let mut room = test_room();
        for participant in room.participants.values_mut() {
            participant.begin_round(1);
        }
        let now = room.created_at;
        let carol = room.participants.get_mut("carol").unwrap();
        carol.round_mut(1).unwrap().record_guess(crate::Guess {
            word: "CRANE".to_string(),
            letter_results: Vec::new(),
            submitted_at: now,
        });

        let order: Vec<String> = room
            .round_standings()
            .into_iter()
            .map(|s| s.participant_id)
            .collect();
        assert_eq!(order, vec!["leader", "bob", "carol"]);
    }

    #[test]
    fn test_everyone_finished_requires_round_state() {
        let mut room = test_room();
        assert!(!room.everyone_finished_round(1));

        let start = room.created_at;
        for participant in room.participants.values_mut() {
            participant.begin_round(1);
            participant.round_mut(1).unwrap().finish(start, start, false, 10);
        }
        assert!(room.everyone_finished_round(1));
        assert!(!room.everyone_finished_round(2));
    }

    #[test]
    fn test_safe_state_flattens_room_fields() {
        let view = SafeRoomState {
            room: test_room(),
            revealed_answers: vec!["APPLE".to_string()],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "ABC123");
        assert_eq!(json["phase"], "WAITING");
        assert_eq!(json["revealedAnswers"][0], "APPLE");
        assert!(json.get("answers").is_none());
    }
}
