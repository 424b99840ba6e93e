use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

use crate::websocket::ConnectionManager;
use game_core::RoomRegistry;
use game_types::{
    CreateRoomRequest, ErrorResponse, GuessRequest, JoinRoomRequest, LeaderRequest, RoomError,
};

pub mod config;
pub mod websocket;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscribeQuery {
    room_id: String,
}

pub fn create_routes(
    registry: Arc<RoomRegistry>,
    connection_manager: Arc<ConnectionManager>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let registry_filter = warp::any().map({
        let registry = registry.clone();
        move || registry.clone()
    });

    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    // WebSocket endpoint, one room per socket
    let websocket = warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .and(warp::query::<SubscribeQuery>())
        .and(registry_filter.clone())
        .and(connection_manager_filter.clone())
        .and_then(handle_subscribe);

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let create_room = warp::path!("class")
        .and(warp::post())
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_create_room);

    let join_room = warp::path!("class" / String / "join")
        .and(warp::post())
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_join_room);

    let start_room = warp::path!("class" / String / "start")
        .and(warp::post())
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_start_room);

    let next_round = warp::path!("class" / String / "next-round")
        .and(warp::post())
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_next_round);

    let restart_room = warp::path!("class" / String / "restart")
        .and(warp::post())
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_restart_room);

    let submit_guess = warp::path!("class" / String / "guess")
        .and(warp::post())
        .and(warp::body::json())
        .and(registry_filter.clone())
        .and_then(handle_submit_guess);

    // Read endpoints sweep timeouts before answering
    let room_state = warp::path!("class" / String)
        .and(warp::get())
        .and(registry_filter.clone())
        .and_then(handle_room_state);

    let participants = warp::path!("class" / String / "participants")
        .and(warp::get())
        .and(registry_filter.clone())
        .and_then(handle_participants);

    let participant = warp::path!("class" / String / "participant" / String)
        .and(warp::get())
        .and(registry_filter.clone())
        .and_then(handle_participant);

    let round_stats = warp::path!("class" / String / "round-stats")
        .and(warp::get())
        .and(registry_filter.clone())
        .and_then(handle_round_stats);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    websocket
        .or(health)
        .or(create_room)
        .or(join_room)
        .or(start_room)
        .or(next_round)
        .or(restart_room)
        .or(submit_guess)
        .or(room_state)
        .or(participants)
        .or(participant)
        .or(round_stats)
        .with(cors)
        .with(warp::log("class_server"))
}

/// HTTP status for a refused room operation.
pub fn status_for(error: &RoomError) -> StatusCode {
    match error {
        RoomError::RoomNotFound { .. } | RoomError::ParticipantNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        RoomError::NotAuthorized => StatusCode::FORBIDDEN,
        RoomError::RoomClosed { .. }
        | RoomError::RoomFull { .. }
        | RoomError::AlreadyStarted { .. }
        | RoomError::NotStarted { .. }
        | RoomError::NoMoreRounds
        | RoomError::RoundNotActive => StatusCode::CONFLICT,
        RoomError::InvalidGuess { .. } | RoomError::InvalidSettings { .. } => {
            StatusCode::BAD_REQUEST
        }
        RoomError::NoAnswersAvailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: RoomError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        warn!("Request failed: {}", error);
    } else {
        debug!("Request refused: {}", error);
    }

    let body = ErrorResponse {
        error: error.to_string(),
        kind: error.kind().to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

fn json_response<T: Serialize>(result: Result<T, RoomError>) -> Response {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), StatusCode::OK)
            .into_response(),
        Err(error) => error_response(error),
    }
}

fn no_content_response(result: Result<(), RoomError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => error_response(error),
    }
}

async fn handle_subscribe(
    ws: warp::ws::Ws,
    query: SubscribeQuery,
    registry: Arc<RoomRegistry>,
    connection_manager: Arc<ConnectionManager>,
) -> Result<Response, warp::Rejection> {
    if let Err(error) = registry.room(&query.room_id) {
        return Ok(error_response(error));
    }

    let room_id = query.room_id;
    Ok(ws
        .on_upgrade(move |socket| websocket::handle_connection(socket, room_id, connection_manager))
        .into_response())
}

async fn handle_create_room(
    request: CreateRoomRequest,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    let result = registry
        .create_room(
            &request.leader_id,
            request.leader_display_name.as_deref(),
            request.settings(),
        )
        .await;
    Ok(json_response(result))
}

async fn handle_join_room(
    room_id: String,
    request: JoinRoomRequest,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    let result = registry
        .join_room(
            &room_id,
            &request.participant_id,
            request.display_name.as_deref(),
        )
        .await;
    Ok(json_response(result))
}

async fn handle_start_room(
    room_id: String,
    request: LeaderRequest,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    let result = registry.start_room(&room_id, &request.leader_id).await;
    Ok(no_content_response(result))
}

async fn handle_next_round(
    room_id: String,
    request: LeaderRequest,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    let result = registry.advance_round(&room_id, &request.leader_id).await;
    Ok(no_content_response(result))
}

async fn handle_restart_room(
    room_id: String,
    request: LeaderRequest,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    let result = registry.restart_room(&room_id, &request.leader_id).await;
    Ok(no_content_response(result))
}

async fn handle_submit_guess(
    room_id: String,
    request: GuessRequest,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    let result = registry
        .submit_guess(&room_id, &request.participant_id, &request.guessed_word)
        .await;
    Ok(json_response(result))
}

async fn handle_room_state(
    room_id: String,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    Ok(json_response(registry.get_room(&room_id).await))
}

async fn handle_participants(
    room_id: String,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    Ok(json_response(registry.list_participants(&room_id).await))
}

async fn handle_participant(
    room_id: String,
    participant_id: String,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    Ok(json_response(
        registry.get_participant(&room_id, &participant_id).await,
    ))
}

async fn handle_round_stats(
    room_id: String,
    registry: Arc<RoomRegistry>,
) -> Result<Response, warp::Rejection> {
    Ok(json_response(registry.round_standings(&room_id).await))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                RoomError::RoomNotFound {
                    room_id: "X".into(),
                },
                404,
            ),
            (
                RoomError::ParticipantNotFound {
                    participant_id: "p".into(),
                },
                404,
            ),
            (RoomError::NotAuthorized, 403),
            (
                RoomError::RoomClosed {
                    room_id: "X".into(),
                },
                409,
            ),
            (
                RoomError::RoomFull {
                    room_id: "X".into(),
                },
                409,
            ),
            (
                RoomError::AlreadyStarted {
                    room_id: "X".into(),
                },
                409,
            ),
            (
                RoomError::NotStarted {
                    room_id: "X".into(),
                },
                409,
            ),
            (RoomError::NoMoreRounds, 409),
            (RoomError::RoundNotActive, 409),
            (
                RoomError::InvalidGuess {
                    expected: 5,
                    actual: 3,
                },
                400,
            ),
            (
                RoomError::InvalidSettings {
                    reason: "totalRounds must be at least 1".into(),
                },
                400,
            ),
            (RoomError::NoAnswersAvailable, 503),
        ];

        for (error, status) in cases {
            assert_eq!(status_for(&error).as_u16(), status, "{:?}", error);
        }
    }
}
