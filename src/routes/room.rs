use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::room::{CreateRoomRequest, RoomSnapshot},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Routes handling room creation and lookup.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", post(create_room))
        .route("/rooms/{id}", get(fetch_room))
}

/// Create a room, merging the supplied settings over the server defaults.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "room",
    request_body = CreateRoomRequest,
    responses(
        (status = 200, description = "Room created", body = RoomSnapshot)
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let room = room_service::create_room(
        &state,
        payload.id,
        payload.settings.map(Into::into),
        payload.host_id,
    )
    .await?;
    Ok(Json(RoomSnapshot::from(&room)))
}

/// Fetch a room by id. A missing room is a distinguishable outcome, not a
/// generic failure.
#[utoipa::path(
    get,
    path = "/rooms/{id}",
    tag = "room",
    params(("id" = String, Path, description = "Identifier of the room to fetch")),
    responses(
        (status = 200, description = "Room found", body = RoomSnapshot),
        (status = 404, description = "Room not found")
    )
)]
pub async fn fetch_room(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RoomSnapshot>, AppError> {
    let Some(room) = room_service::fetch_room(&state, &id).await? else {
        return Err(AppError::NotFound(format!("room `{id}` not found")));
    };
    Ok(Json(RoomSnapshot::from(&room)))
}
