use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cycle stage stored for a room timer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseEntity {
    /// Work interval.
    Focus,
    /// Short recovery interval.
    Break,
    /// Long recovery interval granted every few cycles.
    LongBreak,
}

/// Control mode stored in the room settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlModeEntity {
    /// Every participant may drive the timer.
    Collab,
    /// Only the designated host may drive the timer.
    Host,
}

/// Countdown durations and control mode persisted with a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SettingsEntity {
    /// Focus interval length in seconds.
    pub focus_sec: u32,
    /// Short break length in seconds.
    pub break_sec: u32,
    /// Long break length in seconds.
    pub long_break_sec: u32,
    /// Every how many completed focus cycles a long break is granted.
    pub long_break_every: u32,
    /// Who is allowed to drive the timer.
    pub mode: ControlModeEntity,
}

/// Flat timer record persisted with a room.
///
/// Exactly one of `phase_ends_at_ms` / `remaining_sec` is meaningful,
/// selected by `running`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimerEntity {
    /// Whether the countdown is currently ticking.
    pub running: bool,
    /// Current cycle stage.
    pub phase: PhaseEntity,
    /// Absolute deadline (epoch milliseconds) while running.
    pub phase_ends_at_ms: Option<u64>,
    /// Seconds left on the clock while paused.
    pub remaining_sec: Option<u32>,
    /// Completed focus cycles.
    pub cycle_count: u32,
    /// Logical clock of the last accepted mutation (epoch milliseconds).
    pub last_updated_at_ms: u64,
}

/// Participant connection stored in the room roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Identifier of the socket connection.
    pub connection_id: String,
    /// Identifier stable across reconnects and tabs of the same browser.
    pub person_id: String,
    /// Display name, unique per room across distinct persons.
    pub name: String,
}

/// Chat message stored in the bounded room ring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageEntity {
    /// Stable identifier of the message.
    pub id: Uuid,
    /// Person that sent the message.
    pub person_id: String,
    /// Display name of the author at send time.
    pub author: String,
    /// Message body.
    pub text: String,
    /// Send time (epoch milliseconds).
    pub sent_at_ms: u64,
}

/// Single todo item of a participant's list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodoEntity {
    /// Stable identifier of the todo.
    pub id: Uuid,
    /// Todo text.
    pub text: String,
    /// Whether the todo has been completed.
    pub completed: bool,
}

/// Per-person todo list persisted with a room, keyed by person id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserTodosEntity {
    /// Denormalized display name, kept in sync with the roster.
    pub name: String,
    /// Ordered todo list.
    pub todos: Vec<TodoEntity>,
    /// Currently active todo, if any; must reference a non-completed entry.
    pub active_todo_id: Option<Uuid>,
    /// Whether the list is shown to other participants.
    pub visible: bool,
}

/// Kind of an activity log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKindEntity {
    /// The timer was started.
    TimerStart,
    /// The timer was paused.
    TimerPause,
    /// The timer was reset to the full phase duration.
    TimerReset,
    /// The timer advanced to the next phase.
    TimerSkip,
    /// A named participant joined the room.
    Join,
    /// A participant left the room.
    Leave,
}

/// Immutable activity log entry stored in the bounded history ring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityEntity {
    /// Stable identifier of the entry.
    pub id: Uuid,
    /// What happened.
    pub kind: ActivityKindEntity,
    /// Person that triggered the activity.
    pub actor_id: String,
    /// Display name of the actor at the time.
    pub actor_name: String,
    /// When it happened (epoch milliseconds).
    pub at_ms: u64,
    /// Optional free-text detail.
    pub detail: Option<String>,
}

/// Aggregate room record persisted by the storage layer, keyed by room id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomEntity {
    /// Opaque short room token.
    pub id: String,
    /// Durations and control mode.
    pub settings: SettingsEntity,
    /// Authoritative timer state.
    pub timer: TimerEntity,
    /// Person designated as host; only meaningful in host mode.
    pub host_id: Option<String>,
    /// Creation timestamp (epoch milliseconds).
    pub created_at_ms: u64,
    /// Ordered roster of connected participants.
    pub participants: Vec<ParticipantEntity>,
    /// Chat ring buffer, newest appended.
    pub messages: Vec<MessageEntity>,
    /// Per-person todo lists keyed by person id.
    pub user_todos: IndexMap<String, UserTodosEntity>,
    /// Activity ring buffer, newest prepended.
    pub history: Vec<ActivityEntity>,
}
