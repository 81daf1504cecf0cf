use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{
        common::PhaseDto,
        room::{
            ChatMessageDto, ParticipantSummary, RoomSnapshot, SettingsPatchInput, TimerSnapshot,
            UserTodosDto,
        },
    },
    error::ErrorCode,
    state::timer::SkipGuard,
};

/// Origin of a skip command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipSource {
    /// A participant pressed skip.
    Manual,
    /// The client observed the countdown reach zero.
    Auto,
}

/// Expected timer state attached to automatic skips.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
pub struct TimerGuardInput {
    /// Expected phase.
    pub phase: PhaseDto,
    /// Expected running flag.
    pub running: bool,
    /// Expected deadline, when running.
    #[serde(default)]
    pub phase_ends_at_ms: Option<u64>,
}

impl From<TimerGuardInput> for SkipGuard {
    fn from(value: TimerGuardInput) -> Self {
        Self {
            phase: value.phase.into(),
            running: value.running,
            phase_ends_at_ms: value.phase_ends_at_ms,
        }
    }
}

/// Commands accepted from room WebSocket clients.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Enter a room under a display name.
    Join {
        /// Target room token.
        room_id: String,
        /// Requested display name.
        name: String,
        /// Persistent identifier of this browser profile.
        person_id: String,
    },
    /// Change the display name without rejoining.
    UpdateName {
        /// New display name.
        name: String,
    },
    /// Resume the countdown.
    TimerStart {
        /// Action time (epoch milliseconds); server receipt time if absent.
        #[serde(default)]
        timestamp: Option<u64>,
    },
    /// Freeze the countdown.
    TimerPause {
        /// Action time (epoch milliseconds); server receipt time if absent.
        #[serde(default)]
        timestamp: Option<u64>,
    },
    /// Rewind the current phase.
    TimerReset {
        /// Action time (epoch milliseconds); server receipt time if absent.
        #[serde(default)]
        timestamp: Option<u64>,
    },
    /// Advance to the next phase.
    TimerSkip {
        /// Whether a person or the countdown itself requested the skip.
        source: SkipSource,
        /// Action time (epoch milliseconds); server receipt time if absent.
        #[serde(default)]
        timestamp: Option<u64>,
        /// Expected state for automatic skips.
        #[serde(default)]
        expected: Option<TimerGuardInput>,
    },
    /// Merge a partial settings update.
    UpdateSettings {
        /// Fields to change.
        settings: SettingsPatchInput,
        /// Action time (epoch milliseconds); server receipt time if absent.
        #[serde(default)]
        timestamp: Option<u64>,
    },
    /// Send a chat message.
    SendMessage {
        /// Message body.
        text: String,
    },
    /// Append a todo to the caller's list.
    TodoAdd {
        /// Todo text.
        text: String,
        /// Client-generated id echoed back in the resulting broadcast so
        /// optimistic inserts reconcile by id instead of by text.
        #[serde(default)]
        correlation_id: Option<String>,
    },
    /// Change text and/or completion of a todo.
    TodoUpdate {
        /// Target todo.
        todo_id: Uuid,
        /// New text, if changing.
        #[serde(default)]
        text: Option<String>,
        /// New completion flag, if changing.
        #[serde(default)]
        completed: Option<bool>,
    },
    /// Remove a todo.
    TodoDelete {
        /// Target todo.
        todo_id: Uuid,
    },
    /// Reorder the caller's list.
    TodoReorder {
        /// Requested id order.
        todo_ids: Vec<Uuid>,
    },
    /// Mark a todo as active, or clear the marker.
    TodoSetActive {
        /// Todo to activate, or null to clear.
        #[serde(default)]
        todo_id: Option<Uuid>,
    },
    /// Show or hide the caller's list.
    TodoSetVisibility {
        /// New visibility flag.
        visible: bool,
    },
    /// Unrecognised command; ignored with a warning.
    #[serde(other)]
    Unknown,
}

impl ClientCommand {
    /// Parse a command from the raw text frame.
    pub fn from_json_str(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Events pushed to room WebSocket clients.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full room state; authoritative, replaces the client's copy.
    RoomSnapshot {
        /// The room.
        room: RoomSnapshot,
    },
    /// Timer-only delta used for expected, frequent transitions.
    TimerUpdated {
        /// New timer state.
        timer: TimerSnapshot,
    },
    /// Roster delta.
    PresenceUpdated {
        /// Current participants.
        participants: Vec<ParticipantSummary>,
    },
    /// A chat message was appended.
    MessageReceived {
        /// The message.
        message: ChatMessageDto,
    },
    /// One person's todo list changed.
    TodosUpdated {
        /// Owner of the list.
        person_id: String,
        /// New list state.
        todos: UserTodosDto,
        /// Correlation id supplied by the originating client, if any.
        correlation_id: Option<String>,
    },
    /// A command failed; sent only to the issuing connection.
    Error {
        /// Machine-readable code, when one applies.
        code: Option<ErrorCode>,
        /// Human-readable description.
        message: String,
    },
}
