//! Runtime representation of the room aggregate: settings, roster, chat and
//! activity rings, per-person todo lists, and the conversions from/to the
//! persisted entities.

use indexmap::IndexMap;
use rand::Rng;
use uuid::Uuid;

use crate::dao::models::{
    ActivityEntity, ActivityKindEntity, ControlModeEntity, MessageEntity, ParticipantEntity,
    PhaseEntity, RoomEntity, SettingsEntity, TimerEntity, TodoEntity, UserTodosEntity,
};
use crate::state::timer::{Phase, TimerMode, TimerState};

/// Placeholder name given to connections that have not introduced themselves.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Chat ring capacity: newest appended, oldest dropped.
pub const MAX_MESSAGES: usize = 100;
/// Activity ring capacity: newest prepended, oldest dropped.
pub const MAX_HISTORY: usize = 50;

const ROOM_ID_LENGTH: usize = 6;
const ROOM_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Who is allowed to drive the timer and settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Every participant may drive the timer.
    Collab,
    /// Only the designated host may drive the timer.
    Host,
}

/// Countdown durations and control mode shared by everyone in a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSettings {
    /// Focus interval length in seconds.
    pub focus_sec: u32,
    /// Short break length in seconds.
    pub break_sec: u32,
    /// Long break length in seconds.
    pub long_break_sec: u32,
    /// Every how many completed focus cycles a long break is granted.
    pub long_break_every: u32,
    /// Who is allowed to drive the timer.
    pub mode: ControlMode,
}

impl RoomSettings {
    /// Configured duration of the given phase, in seconds.
    pub fn phase_duration_sec(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Focus => self.focus_sec,
            Phase::Break => self.break_sec,
            Phase::LongBreak => self.long_break_sec,
        }
    }

    /// Merge a partial update over these settings.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            focus_sec: patch.focus_sec.unwrap_or(self.focus_sec),
            break_sec: patch.break_sec.unwrap_or(self.break_sec),
            long_break_sec: patch.long_break_sec.unwrap_or(self.long_break_sec),
            long_break_every: patch.long_break_every.unwrap_or(self.long_break_every),
            mode: patch.mode.unwrap_or(self.mode),
        }
    }
}

/// Partial settings update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    /// New focus duration, if changing.
    pub focus_sec: Option<u32>,
    /// New short-break duration, if changing.
    pub break_sec: Option<u32>,
    /// New long-break duration, if changing.
    pub long_break_sec: Option<u32>,
    /// New long-break cadence, if changing.
    pub long_break_every: Option<u32>,
    /// New control mode, if changing.
    pub mode: Option<ControlMode>,
}

/// A connection present in the room. Several participants may share a
/// `person_id` (multiple tabs of the same browser profile).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Identifier of the socket connection.
    pub connection_id: String,
    /// Identifier stable across reconnects and tabs.
    pub person_id: String,
    /// Display name, unique per room across distinct persons.
    pub name: String,
}

/// Chat message in the bounded room ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
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
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoItem {
    /// Stable identifier of the todo.
    pub id: Uuid,
    /// Todo text.
    pub text: String,
    /// Whether the todo has been completed.
    pub completed: bool,
}

/// Per-person todo list with at most one active entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTodos {
    /// Denormalized display name, kept in sync with the roster.
    pub name: String,
    /// Ordered todo list.
    pub todos: Vec<TodoItem>,
    /// Currently active todo; always references a non-completed entry.
    pub active_todo_id: Option<Uuid>,
    /// Whether the list is shown to other participants.
    pub visible: bool,
}

impl UserTodos {
    fn new(name: String) -> Self {
        Self {
            name,
            todos: Vec::new(),
            active_todo_id: None,
            visible: true,
        }
    }

    /// Apply a single todo mutation, upholding the active-todo invariant.
    pub fn apply(&mut self, op: TodoOp) {
        match op {
            TodoOp::Add { id, text } => self.todos.push(TodoItem {
                id,
                text,
                completed: false,
            }),
            TodoOp::Update {
                id,
                text,
                completed,
            } => {
                let Some(todo) = self.todos.iter_mut().find(|todo| todo.id == id) else {
                    return;
                };
                if let Some(text) = text {
                    todo.text = text;
                }
                if let Some(completed) = completed {
                    todo.completed = completed;
                    if completed && self.active_todo_id == Some(id) {
                        self.active_todo_id = None;
                    }
                }
            }
            TodoOp::Delete { id } => {
                self.todos.retain(|todo| todo.id != id);
                if self.active_todo_id == Some(id) {
                    self.active_todo_id = None;
                }
            }
            TodoOp::Reorder { ids } => {
                let mut reordered = Vec::with_capacity(self.todos.len());
                for id in &ids {
                    if let Some(index) = self.todos.iter().position(|todo| todo.id == *id) {
                        reordered.push(self.todos.remove(index));
                    }
                }
                // Entries missing from the requested order keep their
                // relative position at the tail.
                reordered.append(&mut self.todos);
                self.todos = reordered;
            }
            TodoOp::SetActive { id } => {
                self.active_todo_id = id.filter(|id| {
                    self.todos
                        .iter()
                        .any(|todo| todo.id == *id && !todo.completed)
                });
            }
            TodoOp::SetVisibility { visible } => self.visible = visible,
        }
    }
}

/// Mutation applied to one person's todo list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoOp {
    /// Append a new todo.
    Add {
        /// Durable id assigned by the server.
        id: Uuid,
        /// Todo text.
        text: String,
    },
    /// Change text and/or completion of an existing todo.
    Update {
        /// Target todo.
        id: Uuid,
        /// New text, if changing.
        text: Option<String>,
        /// New completion flag, if changing.
        completed: Option<bool>,
    },
    /// Remove a todo.
    Delete {
        /// Target todo.
        id: Uuid,
    },
    /// Reorder the list to the given id sequence.
    Reorder {
        /// Requested order; unknown ids are ignored, missing ids keep their
        /// relative order at the tail.
        ids: Vec<Uuid>,
    },
    /// Mark a todo as the one being worked on, or clear the marker.
    SetActive {
        /// Todo to activate, or `None` to clear.
        id: Option<Uuid>,
    },
    /// Show or hide the list to other participants.
    SetVisibility {
        /// New visibility flag.
        visible: bool,
    },
}

/// Kind of an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
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

/// Immutable entry of the bounded activity log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    /// Stable identifier of the entry.
    pub id: Uuid,
    /// What happened.
    pub kind: ActivityKind,
    /// Person that triggered the activity.
    pub actor_id: String,
    /// Display name of the actor at the time.
    pub actor_name: String,
    /// When it happened (epoch milliseconds).
    pub at_ms: u64,
    /// Optional free-text detail.
    pub detail: Option<String>,
}

/// Aggregate root: the unit of persistence and the unit of broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Opaque short room token.
    pub id: String,
    /// Durations and control mode.
    pub settings: RoomSettings,
    /// Authoritative timer state.
    pub timer: TimerState,
    /// Person designated as host; only meaningful in host mode.
    pub host_id: Option<String>,
    /// Creation timestamp (epoch milliseconds).
    pub created_at_ms: u64,
    /// Ordered roster of connected participants.
    pub participants: Vec<Participant>,
    /// Chat ring buffer, newest appended.
    pub messages: Vec<ChatMessage>,
    /// Per-person todo lists keyed by person id.
    pub user_todos: IndexMap<String, UserTodos>,
    /// Activity ring buffer, newest prepended.
    pub history: Vec<ActivityEntry>,
}

impl Room {
    /// Build a fresh room with an idle timer and empty collections.
    pub fn new(
        id: String,
        settings: RoomSettings,
        host_id: Option<String>,
        created_at_ms: u64,
    ) -> Self {
        let timer = TimerState::initial(&settings);
        Self {
            id,
            settings,
            timer,
            host_id,
            created_at_ms,
            participants: Vec::new(),
            messages: Vec::new(),
            user_todos: IndexMap::new(),
            history: Vec::new(),
        }
    }

    /// Whether a participant with this connection id is on the roster.
    pub fn has_connection(&self, connection_id: &str) -> bool {
        self.participants
            .iter()
            .any(|participant| participant.connection_id == connection_id)
    }

    /// Whether `name` is already held by a different person in this room.
    /// A person reusing their own name across tabs is never a conflict.
    pub fn name_taken_by_other(&self, person_id: &str, name: &str) -> bool {
        self.participants
            .iter()
            .any(|participant| participant.person_id != person_id && participant.name == name)
    }

    /// Remove the participant with this connection id, reporting whether the
    /// roster actually shrank.
    pub fn remove_connection(&mut self, connection_id: &str) -> bool {
        let before = self.participants.len();
        self.participants
            .retain(|participant| participant.connection_id != connection_id);
        self.participants.len() < before
    }

    /// Rename every connection of a person, plus the denormalized name in
    /// their todo list.
    pub fn rename_person(&mut self, person_id: &str, name: &str) {
        for participant in &mut self.participants {
            if participant.person_id == person_id {
                participant.name = name.to_owned();
            }
        }
        if let Some(todos) = self.user_todos.get_mut(person_id) {
            todos.name = name.to_owned();
        }
    }

    /// Borrow (creating if needed) the todo list of a person.
    pub fn todos_entry(&mut self, person_id: &str, name: &str) -> &mut UserTodos {
        self.user_todos
            .entry(person_id.to_owned())
            .or_insert_with(|| UserTodos::new(name.to_owned()))
    }

    /// Append a chat message, dropping the oldest past the ring capacity.
    pub fn push_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.messages.len() > MAX_MESSAGES {
            let overflow = self.messages.len() - MAX_MESSAGES;
            self.messages.drain(..overflow);
        }
    }

    /// Prepend an activity entry, dropping the oldest past the ring capacity.
    pub fn record_activity(
        &mut self,
        kind: ActivityKind,
        actor_id: &str,
        actor_name: &str,
        at_ms: u64,
        detail: Option<String>,
    ) {
        self.history.insert(
            0,
            ActivityEntry {
                id: Uuid::new_v4(),
                kind,
                actor_id: actor_id.to_owned(),
                actor_name: actor_name.to_owned(),
                at_ms,
                detail,
            },
        );
        self.history.truncate(MAX_HISTORY);
    }
}

/// Generate an opaque short lowercase-alphanumeric room token.
pub fn generate_room_id() -> String {
    let mut rng = rand::rng();
    (0..ROOM_ID_LENGTH)
        .map(|_| {
            let index = rng.random_range(0..ROOM_ID_ALPHABET.len());
            ROOM_ID_ALPHABET[index] as char
        })
        .collect()
}

impl From<Phase> for PhaseEntity {
    fn from(value: Phase) -> Self {
        match value {
            Phase::Focus => PhaseEntity::Focus,
            Phase::Break => PhaseEntity::Break,
            Phase::LongBreak => PhaseEntity::LongBreak,
        }
    }
}

impl From<PhaseEntity> for Phase {
    fn from(value: PhaseEntity) -> Self {
        match value {
            PhaseEntity::Focus => Phase::Focus,
            PhaseEntity::Break => Phase::Break,
            PhaseEntity::LongBreak => Phase::LongBreak,
        }
    }
}

impl From<ControlMode> for ControlModeEntity {
    fn from(value: ControlMode) -> Self {
        match value {
            ControlMode::Collab => ControlModeEntity::Collab,
            ControlMode::Host => ControlModeEntity::Host,
        }
    }
}

impl From<ControlModeEntity> for ControlMode {
    fn from(value: ControlModeEntity) -> Self {
        match value {
            ControlModeEntity::Collab => ControlMode::Collab,
            ControlModeEntity::Host => ControlMode::Host,
        }
    }
}

impl From<RoomSettings> for SettingsEntity {
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

impl From<SettingsEntity> for RoomSettings {
    fn from(value: SettingsEntity) -> Self {
        Self {
            focus_sec: value.focus_sec,
            break_sec: value.break_sec,
            long_break_sec: value.long_break_sec,
            long_break_every: value.long_break_every,
            mode: value.mode.into(),
        }
    }
}

impl From<TimerState> for TimerEntity {
    fn from(value: TimerState) -> Self {
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

impl From<TimerEntity> for TimerState {
    fn from(value: TimerEntity) -> Self {
        // A record that lost its live field is folded into a paused zero
        // rather than rejected; the next command re-normalizes it.
        let mode = match (value.running, value.phase_ends_at_ms, value.remaining_sec) {
            (true, Some(ends_at_ms), _) => TimerMode::Running { ends_at_ms },
            (_, _, remaining_sec) => TimerMode::Paused {
                remaining_sec: remaining_sec.unwrap_or(0),
            },
        };
        Self {
            phase: value.phase.into(),
            mode,
            cycle_count: value.cycle_count,
            last_updated_at: value.last_updated_at_ms,
        }
    }
}

impl From<Participant> for ParticipantEntity {
    fn from(value: Participant) -> Self {
        Self {
            connection_id: value.connection_id,
            person_id: value.person_id,
            name: value.name,
        }
    }
}

impl From<ParticipantEntity> for Participant {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            connection_id: value.connection_id,
            person_id: value.person_id,
            name: value.name,
        }
    }
}

impl From<ChatMessage> for MessageEntity {
    fn from(value: ChatMessage) -> Self {
        Self {
            id: value.id,
            person_id: value.person_id,
            author: value.author,
            text: value.text,
            sent_at_ms: value.sent_at_ms,
        }
    }
}

impl From<MessageEntity> for ChatMessage {
    fn from(value: MessageEntity) -> Self {
        Self {
            id: value.id,
            person_id: value.person_id,
            author: value.author,
            text: value.text,
            sent_at_ms: value.sent_at_ms,
        }
    }
}

impl From<TodoItem> for TodoEntity {
    fn from(value: TodoItem) -> Self {
        Self {
            id: value.id,
            text: value.text,
            completed: value.completed,
        }
    }
}

impl From<TodoEntity> for TodoItem {
    fn from(value: TodoEntity) -> Self {
        Self {
            id: value.id,
            text: value.text,
            completed: value.completed,
        }
    }
}

impl From<UserTodos> for UserTodosEntity {
    fn from(value: UserTodos) -> Self {
        Self {
            name: value.name,
            todos: value.todos.into_iter().map(Into::into).collect(),
            active_todo_id: value.active_todo_id,
            visible: value.visible,
        }
    }
}

impl From<UserTodosEntity> for UserTodos {
    fn from(value: UserTodosEntity) -> Self {
        Self {
            name: value.name,
            todos: value.todos.into_iter().map(Into::into).collect(),
            active_todo_id: value.active_todo_id,
            visible: value.visible,
        }
    }
}

impl From<ActivityKind> for ActivityKindEntity {
    fn from(value: ActivityKind) -> Self {
        match value {
            ActivityKind::TimerStart => ActivityKindEntity::TimerStart,
            ActivityKind::TimerPause => ActivityKindEntity::TimerPause,
            ActivityKind::TimerReset => ActivityKindEntity::TimerReset,
            ActivityKind::TimerSkip => ActivityKindEntity::TimerSkip,
            ActivityKind::Join => ActivityKindEntity::Join,
            ActivityKind::Leave => ActivityKindEntity::Leave,
        }
    }
}

impl From<ActivityKindEntity> for ActivityKind {
    fn from(value: ActivityKindEntity) -> Self {
        match value {
            ActivityKindEntity::TimerStart => ActivityKind::TimerStart,
            ActivityKindEntity::TimerPause => ActivityKind::TimerPause,
            ActivityKindEntity::TimerReset => ActivityKind::TimerReset,
            ActivityKindEntity::TimerSkip => ActivityKind::TimerSkip,
            ActivityKindEntity::Join => ActivityKind::Join,
            ActivityKindEntity::Leave => ActivityKind::Leave,
        }
    }
}

impl From<ActivityEntry> for ActivityEntity {
    fn from(value: ActivityEntry) -> Self {
        Self {
            id: value.id,
            kind: value.kind.into(),
            actor_id: value.actor_id,
            actor_name: value.actor_name,
            at_ms: value.at_ms,
            detail: value.detail,
        }
    }
}

impl From<ActivityEntity> for ActivityEntry {
    fn from(value: ActivityEntity) -> Self {
        Self {
            id: value.id,
            kind: value.kind.into(),
            actor_id: value.actor_id,
            actor_name: value.actor_name,
            at_ms: value.at_ms,
            detail: value.detail,
        }
    }
}

impl From<Room> for RoomEntity {
    fn from(value: Room) -> Self {
        Self {
            id: value.id,
            settings: value.settings.into(),
            timer: value.timer.into(),
            host_id: value.host_id,
            created_at_ms: value.created_at_ms,
            participants: value.participants.into_iter().map(Into::into).collect(),
            messages: value.messages.into_iter().map(Into::into).collect(),
            user_todos: value
                .user_todos
                .into_iter()
                .map(|(person_id, todos)| (person_id, todos.into()))
                .collect(),
            history: value.history.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<RoomEntity> for Room {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: value.id,
            settings: value.settings.into(),
            timer: value.timer.into(),
            host_id: value.host_id,
            created_at_ms: value.created_at_ms,
            participants: value.participants.into_iter().map(Into::into).collect(),
            messages: value.messages.into_iter().map(Into::into).collect(),
            user_todos: value
                .user_todos
                .into_iter()
                .map(|(person_id, todos)| (person_id, todos.into()))
                .collect(),
            history: value.history.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RoomSettings {
        RoomSettings {
            focus_sec: 1500,
            break_sec: 300,
            long_break_sec: 900,
            long_break_every: 4,
            mode: ControlMode::Collab,
        }
    }

    fn room() -> Room {
        Room::new("abc123".into(), settings(), None, 0)
    }

    #[test]
    fn chat_ring_drops_oldest_past_capacity() {
        let mut room = room();
        for index in 0..(MAX_MESSAGES + 5) {
            room.push_message(ChatMessage {
                id: Uuid::new_v4(),
                person_id: "p1".into(),
                author: "Ada".into(),
                text: format!("message {index}"),
                sent_at_ms: index as u64,
            });
        }
        assert_eq!(room.messages.len(), MAX_MESSAGES);
        assert_eq!(room.messages.first().unwrap().text, "message 5");
        assert_eq!(
            room.messages.last().unwrap().text,
            format!("message {}", MAX_MESSAGES + 4)
        );
    }

    #[test]
    fn activity_ring_prepends_and_truncates() {
        let mut room = room();
        for index in 0..(MAX_HISTORY + 3) {
            room.record_activity(ActivityKind::TimerStart, "p1", "Ada", index as u64, None);
        }
        assert_eq!(room.history.len(), MAX_HISTORY);
        // Newest first.
        assert_eq!(room.history.first().unwrap().at_ms, (MAX_HISTORY + 2) as u64);
    }

    #[test]
    fn rename_person_touches_all_tabs_and_todos() {
        let mut room = room();
        for connection in ["c1", "c2"] {
            room.participants.push(Participant {
                connection_id: connection.into(),
                person_id: "p1".into(),
                name: "Ada".into(),
            });
        }
        room.todos_entry("p1", "Ada");
        room.rename_person("p1", "Grace");

        assert!(room.participants.iter().all(|p| p.name == "Grace"));
        assert_eq!(room.user_todos["p1"].name, "Grace");
    }

    #[test]
    fn completing_the_active_todo_clears_the_marker() {
        let mut todos = UserTodos::new("Ada".into());
        let id = Uuid::new_v4();
        todos.apply(TodoOp::Add {
            id,
            text: "write tests".into(),
        });
        todos.apply(TodoOp::SetActive { id: Some(id) });
        assert_eq!(todos.active_todo_id, Some(id));

        todos.apply(TodoOp::Update {
            id,
            text: None,
            completed: Some(true),
        });
        assert_eq!(todos.active_todo_id, None);
    }

    #[test]
    fn deleting_the_active_todo_clears_the_marker() {
        let mut todos = UserTodos::new("Ada".into());
        let id = Uuid::new_v4();
        todos.apply(TodoOp::Add {
            id,
            text: "write tests".into(),
        });
        todos.apply(TodoOp::SetActive { id: Some(id) });
        todos.apply(TodoOp::Delete { id });
        assert_eq!(todos.active_todo_id, None);
        assert!(todos.todos.is_empty());
    }

    #[test]
    fn activating_a_completed_todo_is_refused() {
        let mut todos = UserTodos::new("Ada".into());
        let id = Uuid::new_v4();
        todos.apply(TodoOp::Add {
            id,
            text: "done already".into(),
        });
        todos.apply(TodoOp::Update {
            id,
            text: None,
            completed: Some(true),
        });
        todos.apply(TodoOp::SetActive { id: Some(id) });
        assert_eq!(todos.active_todo_id, None);
    }

    #[test]
    fn reorder_keeps_unlisted_entries_at_the_tail() {
        let mut todos = UserTodos::new("Ada".into());
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for (index, id) in ids.iter().enumerate() {
            todos.apply(TodoOp::Add {
                id: *id,
                text: format!("todo {index}"),
            });
        }
        todos.apply(TodoOp::Reorder {
            ids: vec![ids[2], ids[0]],
        });
        let order: Vec<Uuid> = todos.todos.iter().map(|todo| todo.id).collect();
        assert_eq!(order, vec![ids[2], ids[0], ids[1]]);
    }

    #[test]
    fn room_entity_conversion_preserves_timer_mode() {
        let mut source = room();
        source.timer = TimerState {
            phase: Phase::Break,
            mode: TimerMode::Running { ends_at_ms: 42_000 },
            cycle_count: 2,
            last_updated_at: 41_000,
        };
        let entity: RoomEntity = source.clone().into();
        assert!(entity.timer.running);
        assert_eq!(entity.timer.phase_ends_at_ms, Some(42_000));
        assert_eq!(entity.timer.remaining_sec, None);

        let restored: Room = entity.into();
        assert_eq!(restored.timer, source.timer);
    }

    #[test]
    fn generated_room_ids_are_short_lowercase_tokens() {
        let id = generate_room_id();
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
