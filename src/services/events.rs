//! Builders for the events pushed to room clients, plus the fan-out glue
//! over the room directory.

use axum::extract::ws::Message;
use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        room::{RoomSnapshot, TimerSnapshot, UserTodosDto},
        ws::ServerMessage,
    },
    error::ErrorCode,
    state::{
        SharedState,
        room::{ChatMessage, Participant, Room, UserTodos},
        timer::TimerState,
    },
};

fn encode(payload: &impl Serialize) -> Option<Message> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(err) => {
            warn!(error = %err, "failed to serialize server event");
            None
        }
    }
}

/// Push the full room snapshot to a single connection.
pub fn send_snapshot_to(state: &SharedState, connection_id: &str, room: &Room) {
    let payload = ServerMessage::RoomSnapshot {
        room: RoomSnapshot::from(room),
    };
    if let Some(message) = encode(&payload) {
        state.directory().send_to(connection_id, message);
    }
}

/// Broadcast the full room snapshot to every member.
pub fn broadcast_snapshot(state: &SharedState, room: &Room) {
    broadcast_snapshot_except(state, room, None);
}

/// Broadcast the full room snapshot to every member except `skip`.
pub fn broadcast_snapshot_except(state: &SharedState, room: &Room, skip: Option<&str>) {
    let payload = ServerMessage::RoomSnapshot {
        room: RoomSnapshot::from(room),
    };
    if let Some(message) = encode(&payload) {
        state.directory().broadcast_except(&room.id, skip, &message);
    }
}

/// Broadcast a timer-only delta; used for expected, frequent transitions to
/// keep snapshot churn down.
pub fn broadcast_timer(state: &SharedState, room_id: &str, timer: &TimerState) {
    let payload = ServerMessage::TimerUpdated {
        timer: TimerSnapshot::from(timer),
    };
    if let Some(message) = encode(&payload) {
        state.directory().broadcast(room_id, &message);
    }
}

/// Broadcast the current roster to every member.
pub fn broadcast_presence(state: &SharedState, room_id: &str, participants: &[Participant]) {
    broadcast_presence_except(state, room_id, participants, None);
}

/// Broadcast the current roster to every member except `skip`.
pub fn broadcast_presence_except(
    state: &SharedState,
    room_id: &str,
    participants: &[Participant],
    skip: Option<&str>,
) {
    let payload = ServerMessage::PresenceUpdated {
        participants: participants.iter().map(Into::into).collect(),
    };
    if let Some(message) = encode(&payload) {
        state.directory().broadcast_except(room_id, skip, &message);
    }
}

/// Broadcast a newly appended chat message.
pub fn broadcast_message(state: &SharedState, room_id: &str, message: &ChatMessage) {
    let payload = ServerMessage::MessageReceived {
        message: message.into(),
    };
    if let Some(encoded) = encode(&payload) {
        state.directory().broadcast(room_id, &encoded);
    }
}

/// Broadcast one person's todo list, echoing the originating client's
/// correlation id so optimistic inserts reconcile by id.
pub fn broadcast_todos(
    state: &SharedState,
    room_id: &str,
    person_id: &str,
    todos: &UserTodos,
    correlation_id: Option<String>,
) {
    let payload = ServerMessage::TodosUpdated {
        person_id: person_id.to_owned(),
        todos: UserTodosDto::from_user(person_id, todos),
        correlation_id,
    };
    if let Some(message) = encode(&payload) {
        state.directory().broadcast(room_id, &message);
    }
}

/// Surface an error to the issuing connection only.
pub fn send_error_to(
    state: &SharedState,
    connection_id: &str,
    code: Option<ErrorCode>,
    message: &str,
) {
    let payload = ServerMessage::Error {
        code,
        message: message.to_owned(),
    };
    if let Some(encoded) = encode(&payload) {
        state.directory().send_to(connection_id, encoded);
    }
}
