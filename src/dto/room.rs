use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        common::{ControlModeDto, PhaseDto},
        format_epoch_ms,
        validation::validate_room_id,
    },
    state::{
        room::{
            ActivityEntry, ActivityKind, ChatMessage, Participant, Room, RoomSettings,
            SettingsPatch, TodoItem, UserTodos,
        },
        timer::{TimerMode, TimerState},
    },
};

/// Payload used to create a room.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    /// Explicit room id; a random token is generated when omitted.
    #[serde(default)]
    pub id: Option<String>,
    /// Partial settings merged over the server defaults.
    #[serde(default)]
    pub settings: Option<SettingsPatchInput>,
    /// Person designated as host; enables control in host mode.
    #[serde(default)]
    pub host_id: Option<String>,
}

impl Validate for CreateRoomRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(ref id) = self.id {
            if let Err(e) = validate_room_id(id) {
                errors.add("id", e);
            }
        }

        if let Some(ref settings) = self.settings {
            errors.merge_self("settings", settings.validate());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Partial settings supplied by clients; absent fields keep their value.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SettingsPatchInput {
    /// Focus duration in seconds.
    #[validate(range(min = 60, max = 21600))]
    pub focus_sec: Option<u32>,
    /// Short break duration in seconds.
    #[validate(range(min = 60, max = 21600))]
    pub break_sec: Option<u32>,
    /// Long break duration in seconds.
    #[validate(range(min = 60, max = 21600))]
    pub long_break_sec: Option<u32>,
    /// Long-break cadence in completed focus cycles.
    #[validate(range(min = 1, max = 12))]
    pub long_break_every: Option<u32>,
    /// Control mode.
    pub mode: Option<ControlModeDto>,
}

impl From<SettingsPatchInput> for SettingsPatch {
    fn from(value: SettingsPatchInput) -> Self {
        Self {
            focus_sec: value.focus_sec,
            break_sec: value.break_sec,
            long_break_sec: value.long_break_sec,
            long_break_every: value.long_break_every,
            mode: value.mode.map(Into::into),
        }
    }
}

/// Full settings projection.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SettingsDto {
    /// Focus duration in seconds.
    pub focus_sec: u32,
    /// Short break duration in seconds.
    pub break_sec: u32,
    /// Long break duration in seconds.
    pub long_break_sec: u32,
    /// Long-break cadence in completed focus cycles.
    pub long_break_every: u32,
    /// Control mode.
    pub mode: ControlModeDto,
}

impl From<RoomSettings> for SettingsDto {
    fn from(value: RoomSettings) -> Self {
        Self {
            focus_sec: value.focus_sec,
            break_sec: value.break_sec,
            long_break_sec: value.long_break_sec,
            long_break_every: value.long_break_every,
            mode: value.mode.into(),
        }
    }
}

/// Timer projection clients run their local countdown from.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TimerSnapshot {
    /// Whether the countdown is ticking.
    pub running: bool,
    /// Current cycle stage.
    pub phase: PhaseDto,
    /// Absolute deadline (epoch milliseconds) while running.
    pub phase_ends_at_ms: Option<u64>,
    /// Seconds left on the clock while paused.
    pub remaining_sec: Option<u32>,
    /// Completed focus cycles.
    pub cycle_count: u32,
    /// Logical clock of the last accepted mutation.
    pub last_updated_at_ms: u64,
}

impl From<&TimerState> for TimerSnapshot {
    fn from(value: &TimerState) -> Self {
        let (running, phase_ends_at_ms, remaining_sec) = match value.mode {
            TimerMode::Running { ends_at_ms } => (true, Some(ends_at_ms), None),
            TimerMode::Paused { remaining_sec } => (false, None, Some(remaining_sec)),
        };
        Self {
            running,
            phase: value.phase.into(),
            phase_ends_at_ms,
            remaining_sec,
            cycle_count: value.cycle_count,
            last_updated_at_ms: value.last_updated_at,
        }
    }
}

/// Public projection of a roster entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ParticipantSummary {
    /// Connection identifier.
    pub connection_id: String,
    /// Persistent person identifier.
    pub person_id: String,
    /// Display name.
    pub name: String,
}

impl From<&Participant> for ParticipantSummary {
    fn from(value: &Participant) -> Self {
        Self {
            connection_id: value.connection_id.clone(),
            person_id: value.person_id.clone(),
            name: value.name.clone(),
        }
    }
}

/// Public projection of a chat message.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChatMessageDto {
    /// Message identifier.
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

impl From<&ChatMessage> for ChatMessageDto {
    fn from(value: &ChatMessage) -> Self {
        Self {
            id: value.id,
            person_id: value.person_id.clone(),
            author: value.author.clone(),
            text: value.text.clone(),
            sent_at_ms: value.sent_at_ms,
        }
    }
}

/// Public projection of a single todo.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TodoItemDto {
    /// Todo identifier.
    pub id: Uuid,
    /// Todo text.
    pub text: String,
    /// Completion flag.
    pub completed: bool,
}

impl From<&TodoItem> for TodoItemDto {
    fn from(value: &TodoItem) -> Self {
        Self {
            id: value.id,
            text: value.text.clone(),
            completed: value.completed,
        }
    }
}

/// Public projection of one person's todo list.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserTodosDto {
    /// Person the list belongs to.
    pub person_id: String,
    /// Denormalized display name.
    pub name: String,
    /// Ordered todo list.
    pub todos: Vec<TodoItemDto>,
    /// Currently active todo, if any.
    pub active_todo_id: Option<Uuid>,
    /// Whether the list is shown to other participants.
    pub visible: bool,
}

impl UserTodosDto {
    /// Build the projection for one person's list.
    pub fn from_user(person_id: &str, todos: &UserTodos) -> Self {
        Self {
            person_id: person_id.to_owned(),
            name: todos.name.clone(),
            todos: todos.todos.iter().map(Into::into).collect(),
            active_todo_id: todos.active_todo_id,
            visible: todos.visible,
        }
    }
}

/// Kind of an activity entry, as exposed to clients.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKindDto {
    /// The timer was started.
    TimerStart,
    /// The timer was paused.
    TimerPause,
    /// The timer was reset.
    TimerReset,
    /// The timer advanced to the next phase.
    TimerSkip,
    /// A named participant joined.
    Join,
    /// A participant left.
    Leave,
}

impl From<ActivityKind> for ActivityKindDto {
    fn from(value: ActivityKind) -> Self {
        match value {
            ActivityKind::TimerStart => ActivityKindDto::TimerStart,
            ActivityKind::TimerPause => ActivityKindDto::TimerPause,
            ActivityKind::TimerReset => ActivityKindDto::TimerReset,
            ActivityKind::TimerSkip => ActivityKindDto::TimerSkip,
            ActivityKind::Join => ActivityKindDto::Join,
            ActivityKind::Leave => ActivityKindDto::Leave,
        }
    }
}

/// Public projection of an activity entry.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityDto {
    /// Entry identifier.
    pub id: Uuid,
    /// What happened.
    pub kind: ActivityKindDto,
    /// Person that triggered the activity.
    pub actor_id: String,
    /// Display name of the actor at the time.
    pub actor_name: String,
    /// When it happened (epoch milliseconds).
    pub at_ms: u64,
    /// Optional free-text detail.
    pub detail: Option<String>,
}

impl From<&ActivityEntry> for ActivityDto {
    fn from(value: &ActivityEntry) -> Self {
        Self {
            id: value.id,
            kind: value.kind.into(),
            actor_id: value.actor_id.clone(),
            actor_name: value.actor_name.clone(),
            at_ms: value.at_ms,
            detail: value.detail.clone(),
        }
    }
}

/// Full room projection pushed to clients on join and after commands that
/// touch more than the timer.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoomSnapshot {
    /// Room token.
    pub id: String,
    /// Durations and control mode.
    pub settings: SettingsDto,
    /// Authoritative timer state.
    pub timer: TimerSnapshot,
    /// Designated host person, when host mode is in use.
    pub host_id: Option<String>,
    /// Creation time, RFC 3339.
    pub created_at: String,
    /// Current roster.
    pub participants: Vec<ParticipantSummary>,
    /// Chat ring, oldest first.
    pub messages: Vec<ChatMessageDto>,
    /// All shared todo lists.
    pub user_todos: Vec<UserTodosDto>,
    /// Activity ring, newest first.
    pub history: Vec<ActivityDto>,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            settings: room.settings.clone().into(),
            timer: (&room.timer).into(),
            host_id: room.host_id.clone(),
            created_at: format_epoch_ms(room.created_at_ms),
            participants: room.participants.iter().map(Into::into).collect(),
            messages: room.messages.iter().map(Into::into).collect(),
            user_todos: room
                .user_todos
                .iter()
                .map(|(person_id, todos)| UserTodosDto::from_user(person_id, todos))
                .collect(),
            history: room.history.iter().map(Into::into).collect(),
        }
    }
}
