use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{ParticipantId, RoomId, RoomSettings};

/// Room-scoped notifications pushed to subscribed clients. Clients re-fetch
/// the room on `update`; `class_end` is sent once per start/restart cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomEvent {
    Update {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    ClassEnd {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
}

impl RoomEvent {
    pub fn update(room_id: &str) -> Self {
        RoomEvent::Update {
            room_id: room_id.to_string(),
        }
    }

    pub fn class_end(room_id: &str) -> Self {
        RoomEvent::ClassEnd {
            room_id: room_id.to_string(),
        }
    }

    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::Update { .. } => "update",
            RoomEvent::ClassEnd { .. } => "class_end",
        }
    }

    pub fn room_id(&self) -> &str {
        match self {
            RoomEvent::Update { room_id } | RoomEvent::ClassEnd { room_id } => room_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub leader_id: ParticipantId,
    #[serde(default)]
    pub leader_display_name: Option<String>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub total_rounds: Option<u32>,
    #[serde(default)]
    pub round_time_limit_seconds: Option<u32>,
    #[serde(default)]
    pub max_attempts_per_round: Option<u32>,
}

impl CreateRoomRequest {
    /// Requested settings, with defaults for anything left out.
    pub fn settings(&self) -> RoomSettings {
        let defaults = RoomSettings::default();
        RoomSettings {
            max_participants: self.max_participants.unwrap_or(defaults.max_participants),
            total_rounds: self.total_rounds.unwrap_or(defaults.total_rounds),
            round_time_limit_seconds: self
                .round_time_limit_seconds
                .unwrap_or(defaults.round_time_limit_seconds),
            max_attempts_per_round: self
                .max_attempts_per_round
                .unwrap_or(defaults.max_attempts_per_round),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub participant_id: ParticipantId,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LeaderRequest {
    pub leader_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub participant_id: ParticipantId,
    pub guessed_word: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_string(&RoomEvent::class_end("ROOM42")).unwrap();
        assert_eq!(json, r#"{"event":"class_end","roomId":"ROOM42"}"#);

        let event: RoomEvent = serde_json::from_str(r#"{"event":"update","roomId":"R1"}"#).unwrap();
        assert_eq!(event, RoomEvent::update("R1"));
        assert_eq!(event.name(), "update");
        assert_eq!(event.room_id(), "R1");
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateRoomRequest =
            serde_json::from_str(r#"{"leaderId":"instructor","totalRounds":2}"#).unwrap();
        let settings = request.settings();

        assert_eq!(settings.total_rounds, 2);
        assert_eq!(settings.max_participants, 6);
        assert_eq!(settings.round_time_limit_seconds, 120);
        assert_eq!(settings.max_attempts_per_round, 6);
        assert!(request.leader_display_name.is_none());
    }
}
