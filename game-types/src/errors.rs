use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{ParticipantId, RoomId};

/// Every way a room operation can be refused. A refused operation leaves the
/// room untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, thiserror::Error)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RoomError {
    #[error("room {room_id} not found")]
    RoomNotFound { room_id: RoomId },
    #[error("participant {participant_id} not found")]
    ParticipantNotFound { participant_id: ParticipantId },
    #[error("room {room_id} is not open for joining")]
    RoomClosed { room_id: RoomId },
    #[error("room {room_id} is full")]
    RoomFull { room_id: RoomId },
    #[error("only the room leader can do that")]
    NotAuthorized,
    #[error("room {room_id} already started")]
    AlreadyStarted { room_id: RoomId },
    #[error("room {room_id} has not started")]
    NotStarted { room_id: RoomId },
    #[error("no more rounds")]
    NoMoreRounds,
    #[error("round not active or already finished")]
    RoundNotActive,
    #[error("guess must be {expected} letters, got {actual}")]
    InvalidGuess { expected: u32, actual: u32 },
    #[error("invalid room settings: {reason}")]
    InvalidSettings { reason: String },
    #[error("no answer words available")]
    NoAnswersAvailable,
}

impl RoomError {
    pub fn kind(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound { .. } => "roomNotFound",
            RoomError::ParticipantNotFound { .. } => "participantNotFound",
            RoomError::RoomClosed { .. } => "roomClosed",
            RoomError::RoomFull { .. } => "roomFull",
            RoomError::NotAuthorized => "notAuthorized",
            RoomError::AlreadyStarted { .. } => "alreadyStarted",
            RoomError::NotStarted { .. } => "notStarted",
            RoomError::NoMoreRounds => "noMoreRounds",
            RoomError::RoundNotActive => "roundNotActive",
            RoomError::InvalidGuess { .. } => "invalidGuess",
            RoomError::InvalidSettings { .. } => "invalidSettings",
            RoomError::NoAnswersAvailable => "noAnswersAvailable",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RoomError::RoomNotFound { .. } | RoomError::ParticipantNotFound { .. }
        )
    }
}
