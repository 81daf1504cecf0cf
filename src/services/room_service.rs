//! Room aggregate manager: every mutating operation follows the same shape,
//! fetch the room by id, mutate it in memory, persist it whole with a
//! refreshed TTL, and return the new sub-state. A missing room is an
//! expected outcome (expired TTL, bad link) and surfaces as `None`, never
//! as an error.

use tokio::time::sleep;
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    state::{
        SharedState,
        room::{
            ANONYMOUS_NAME, ActivityKind, ChatMessage, ControlMode, Participant, Room,
            SettingsPatch, TodoOp, UserTodos, generate_room_id,
        },
        timer::{
            LastWriteWins, OrderingPolicy, Phase, TimerCommand, TimerOutcome, TimerState, now_ms,
        },
    },
};

/// Identity a command was issued under, as tracked by the gateway session.
#[derive(Debug, Clone)]
pub struct Actor {
    /// Connection the command arrived on.
    pub connection_id: String,
    /// Persistent person identifier.
    pub person_id: String,
    /// Display name at the time of the command.
    pub name: String,
}

/// Result of a timer command against a room.
#[derive(Debug)]
pub enum TimerApplied {
    /// The command changed the timer; the room (including its activity log)
    /// was persisted.
    Updated(Room),
    /// The command left the timer untouched (idempotent or stale) but its
    /// attempt was still recorded in the activity log.
    Logged(Room),
    /// A guard or the near-zero gate rejected the command; nothing was
    /// written.
    Ignored(TimerState),
}

/// Result of a participant removal attempt.
#[derive(Debug)]
pub struct RemovalOutcome {
    /// Best-known roster after the attempt.
    pub participants: Vec<Participant>,
    /// Whether this call actually shrank the roster.
    pub removed: bool,
}

/// Result of a successful join.
#[derive(Debug)]
pub struct JoinOutcome {
    /// The room as persisted by this join.
    pub room: Room,
    /// False when the connection was already on the roster (duplicate join).
    pub newly_added: bool,
    /// Whether a join activity entry was recorded (anonymous joins are not
    /// newsworthy).
    pub join_logged: bool,
}

/// Result of a settings update.
#[derive(Debug)]
pub struct SettingsUpdate {
    /// The room after the operation.
    pub room: Room,
    /// False when the update lost against the room's logical clock.
    pub applied: bool,
}

/// Create a room, merging the supplied partial settings over the server
/// defaults. When no id is requested a fresh token is allocated.
pub async fn create_room(
    state: &SharedState,
    requested_id: Option<String>,
    patch: Option<SettingsPatch>,
    host_id: Option<String>,
) -> Result<Room, ServiceError> {
    let store = state.require_room_store().await?;

    let id = match requested_id {
        Some(id) => {
            if store.find_room(&id).await?.is_some() {
                return Err(ServiceError::InvalidInput(format!(
                    "room `{id}` already exists"
                )));
            }
            id
        }
        None => {
            // Token collisions are unlikely but cheap to dodge.
            let mut candidate = generate_room_id();
            let mut attempts = 0;
            while store.find_room(&candidate).await?.is_some() {
                attempts += 1;
                if attempts >= 5 {
                    return Err(ServiceError::InvalidInput(
                        "could not allocate a unique room id".into(),
                    ));
                }
                candidate = generate_room_id();
            }
            candidate
        }
    };

    let defaults = state.config().default_settings().clone();
    let settings = match patch {
        Some(patch) => defaults.merged(&patch),
        None => defaults,
    };

    let room = Room::new(id, settings, host_id, now_ms());
    store
        .save_room(room.clone().into(), state.config().room_ttl())
        .await?;
    Ok(room)
}

/// Fetch a room by id.
pub async fn fetch_room(state: &SharedState, room_id: &str) -> Result<Option<Room>, ServiceError> {
    let store = state.require_room_store().await?;
    Ok(store.find_room(room_id).await?.map(Room::from))
}

/// Apply a timer command under the last-write-wins ordering.
///
/// Every admitted command is recorded in the activity log even when it does
/// not change state; a failed skip guard (or the near-zero gate for
/// automatic skips) writes nothing at all.
pub async fn apply_timer_command(
    state: &SharedState,
    room_id: &str,
    actor: &Actor,
    command: TimerCommand,
    timestamp: u64,
    gate_on_deadline: bool,
) -> Result<Option<TimerApplied>, ServiceError> {
    let store = state.require_room_store().await?;
    let Some(entity) = store.find_room(room_id).await? else {
        return Ok(None);
    };
    let mut room = Room::from(entity);

    ensure_can_control(&room, actor)?;

    if gate_on_deadline
        && !room
            .timer
            .near_deadline(now_ms(), state.config().auto_skip_grace_ms())
    {
        // The countdown is visibly not done yet; a premature automatic skip
        // dissolves like a failed guard.
        return Ok(Some(TimerApplied::Ignored(room.timer)));
    }

    let outcome = room
        .timer
        .apply(command, &room.settings, timestamp, &LastWriteWins);

    let changed = match outcome {
        TimerOutcome::GuardRejected => {
            return Ok(Some(TimerApplied::Ignored(room.timer)));
        }
        TimerOutcome::Applied(next) => {
            room.timer = next;
            true
        }
        TimerOutcome::Unchanged | TimerOutcome::Stale => false,
    };

    let detail = match (&command, changed) {
        (TimerCommand::Skip { .. }, true) => {
            Some(format!("entered {}", phase_label(room.timer.phase)))
        }
        _ => None,
    };
    room.record_activity(
        activity_kind(&command),
        &actor.person_id,
        &actor.name,
        now_ms(),
        detail,
    );

    store
        .save_room(room.clone().into(), state.config().room_ttl())
        .await?;

    Ok(Some(if changed {
        TimerApplied::Updated(room)
    } else {
        TimerApplied::Logged(room)
    }))
}

/// Merge a partial settings update, recomputing the paused remainder.
/// The update competes on the same logical clock as timer commands.
pub async fn update_settings(
    state: &SharedState,
    room_id: &str,
    actor: &Actor,
    patch: SettingsPatch,
    timestamp: u64,
) -> Result<Option<SettingsUpdate>, ServiceError> {
    let store = state.require_room_store().await?;
    let Some(entity) = store.find_room(room_id).await? else {
        return Ok(None);
    };
    let mut room = Room::from(entity);

    ensure_can_control(&room, actor)?;

    if !LastWriteWins.admits(timestamp, room.timer.last_updated_at) {
        return Ok(Some(SettingsUpdate {
            room,
            applied: false,
        }));
    }

    room.settings = room.settings.merged(&patch);
    room.timer = room.timer.settings_changed(&room.settings, timestamp);

    store
        .save_room(room.clone().into(), state.config().room_ttl())
        .await?;

    Ok(Some(SettingsUpdate {
        room,
        applied: true,
    }))
}

/// Add a participant to the roster.
///
/// Idempotent per connection id (a duplicate join succeeds without
/// modification); the display name must not be held by a different person.
pub async fn add_participant(
    state: &SharedState,
    room_id: &str,
    connection_id: &str,
    person_id: &str,
    name: &str,
) -> Result<Option<JoinOutcome>, ServiceError> {
    let store = state.require_room_store().await?;
    let Some(entity) = store.find_room(room_id).await? else {
        return Ok(None);
    };
    let mut room = Room::from(entity);

    if room.has_connection(connection_id) {
        return Ok(Some(JoinOutcome {
            room,
            newly_added: false,
            join_logged: false,
        }));
    }

    if room.name_taken_by_other(person_id, name) {
        return Err(ServiceError::NameTaken(name.to_owned()));
    }

    room.participants.push(Participant {
        connection_id: connection_id.to_owned(),
        person_id: person_id.to_owned(),
        name: name.to_owned(),
    });
    // Other tabs of the same person and the denormalized todo-list name
    // follow the name used on this join.
    room.rename_person(person_id, name);

    let join_logged = name != ANONYMOUS_NAME;
    if join_logged {
        room.record_activity(ActivityKind::Join, person_id, name, now_ms(), None);
    }

    store
        .save_room(room.clone().into(), state.config().room_ttl())
        .await?;

    Ok(Some(JoinOutcome {
        room,
        newly_added: true,
        join_logged,
    }))
}

/// Remove a participant, tolerating the benign race where a concurrent
/// write resurrects it: the removal is re-verified after each write and
/// retried a bounded number of times with a linear backoff. The caller must
/// not assume success; the returned roster is the best-known state.
///
/// `leaver` carries the identity to record a leave activity under when the
/// roster actually shrinks; passing `None` removes without logging.
pub async fn remove_participant(
    state: &SharedState,
    room_id: &str,
    connection_id: &str,
    leaver: Option<&Actor>,
) -> Result<Option<RemovalOutcome>, ServiceError> {
    let store = state.require_room_store().await?;
    let ttl = state.config().room_ttl();

    let Some(entity) = store.find_room(room_id).await? else {
        return Ok(None);
    };
    let mut room = Room::from(entity);

    if !room.remove_connection(connection_id) {
        // Already absent: nothing to write, and no leave entry; the caller
        // alone knows whether this disconnect was already accounted for.
        return Ok(Some(RemovalOutcome {
            participants: room.participants,
            removed: false,
        }));
    }

    if let Some(leaver) = leaver {
        room.record_activity(
            ActivityKind::Leave,
            &leaver.person_id,
            &leaver.name,
            now_ms(),
            None,
        );
    }
    store.save_room(room.clone().into(), ttl).await?;

    let attempts = state.config().remove_retry_attempts();
    let base_delay = state.config().remove_retry_base_delay();

    for attempt in 1..=attempts {
        let Some(entity) = store.find_room(room_id).await? else {
            return Ok(None);
        };
        let mut current = Room::from(entity);
        if !current.has_connection(connection_id) {
            return Ok(Some(RemovalOutcome {
                participants: current.participants,
                removed: true,
            }));
        }

        // A concurrent write clobbered ours. Take its view, drop the
        // participant again, and give the race a beat to settle.
        sleep(base_delay * attempt).await;
        current.remove_connection(connection_id);
        if let Some(leaver) = leaver {
            current.record_activity(
                ActivityKind::Leave,
                &leaver.person_id,
                &leaver.name,
                now_ms(),
                None,
            );
        }
        store.save_room(current.clone().into(), ttl).await?;
    }

    warn!(
        room_id,
        connection_id, "participant removal did not converge within the retry budget"
    );
    let Some(entity) = store.find_room(room_id).await? else {
        return Ok(None);
    };
    let room = Room::from(entity);
    let removed = !room.has_connection(connection_id);
    Ok(Some(RemovalOutcome {
        participants: room.participants,
        removed,
    }))
}

/// Remove a batch of verified-dead participants in a single write.
/// Used by presence reconciliation; opportunistic, so no retry and no
/// activity entries.
pub async fn remove_participants(
    state: &SharedState,
    room_id: &str,
    connection_ids: &[String],
) -> Result<Option<(Vec<Participant>, bool)>, ServiceError> {
    let store = state.require_room_store().await?;
    let Some(entity) = store.find_room(room_id).await? else {
        return Ok(None);
    };
    let mut room = Room::from(entity);

    let mut removed_any = false;
    for connection_id in connection_ids {
        removed_any |= room.remove_connection(connection_id);
    }

    if removed_any {
        store
            .save_room(room.clone().into(), state.config().room_ttl())
            .await?;
    }

    Ok(Some((room.participants, removed_any)))
}

/// Rename a person on every connection they hold, plus the denormalized
/// name in their todo list. The activity log is only touched when the
/// caller asks for a synthetic join entry (unmasking from anonymous).
pub async fn update_participant_name(
    state: &SharedState,
    room_id: &str,
    person_id: &str,
    new_name: &str,
    record_join: bool,
) -> Result<Option<Room>, ServiceError> {
    let store = state.require_room_store().await?;
    let Some(entity) = store.find_room(room_id).await? else {
        return Ok(None);
    };
    let mut room = Room::from(entity);

    if room.name_taken_by_other(person_id, new_name) {
        return Err(ServiceError::NameTaken(new_name.to_owned()));
    }

    room.rename_person(person_id, new_name);
    if record_join {
        room.record_activity(ActivityKind::Join, person_id, new_name, now_ms(), None);
    }

    store
        .save_room(room.clone().into(), state.config().room_ttl())
        .await?;

    Ok(Some(room))
}

/// Append a chat message to the bounded ring.
pub async fn append_message(
    state: &SharedState,
    room_id: &str,
    actor: &Actor,
    text: String,
) -> Result<Option<ChatMessage>, ServiceError> {
    let store = state.require_room_store().await?;
    let Some(entity) = store.find_room(room_id).await? else {
        return Ok(None);
    };
    let mut room = Room::from(entity);

    let message = ChatMessage {
        id: Uuid::new_v4(),
        person_id: actor.person_id.clone(),
        author: actor.name.clone(),
        text,
        sent_at_ms: now_ms(),
    };
    room.push_message(message.clone());

    store
        .save_room(room.clone().into(), state.config().room_ttl())
        .await?;

    Ok(Some(message))
}

/// Apply a mutation to the actor's todo list, returning its new state.
/// Mutations referencing a missing todo are no-ops, not errors.
pub async fn apply_todo_op(
    state: &SharedState,
    room_id: &str,
    actor: &Actor,
    op: TodoOp,
) -> Result<Option<UserTodos>, ServiceError> {
    let store = state.require_room_store().await?;
    let Some(entity) = store.find_room(room_id).await? else {
        return Ok(None);
    };
    let mut room = Room::from(entity);

    let entry = room.todos_entry(&actor.person_id, &actor.name);
    entry.apply(op);
    let snapshot = entry.clone();

    store
        .save_room(room.clone().into(), state.config().room_ttl())
        .await?;

    Ok(Some(snapshot))
}

fn ensure_can_control(room: &Room, actor: &Actor) -> Result<(), ServiceError> {
    if room.settings.mode == ControlMode::Host
        && room.host_id.as_deref() != Some(actor.person_id.as_str())
    {
        return Err(ServiceError::Unauthorized(
            "only the host may control the timer in host mode".into(),
        ));
    }
    Ok(())
}

fn activity_kind(command: &TimerCommand) -> ActivityKind {
    match command {
        TimerCommand::Start => ActivityKind::TimerStart,
        TimerCommand::Pause => ActivityKind::TimerPause,
        TimerCommand::Reset => ActivityKind::TimerReset,
        TimerCommand::Skip { .. } => ActivityKind::TimerSkip,
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Focus => "focus",
        Phase::Break => "break",
        Phase::LongBreak => "long break",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{
        config::AppConfig,
        dao::room_store::memory::MemoryRoomStore,
        state::{
            AppState,
            room::{ANONYMOUS_NAME, ControlMode},
            timer::TimerMode,
        },
    };

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .set_room_store(Arc::new(MemoryRoomStore::new()))
            .await;
        state
    }

    fn actor(connection_id: &str, person_id: &str, name: &str) -> Actor {
        Actor {
            connection_id: connection_id.to_owned(),
            person_id: person_id.to_owned(),
            name: name.to_owned(),
        }
    }

    async fn room_with_actor(state: &SharedState, who: &Actor) -> Room {
        let room = create_room(state, None, None, None).await.unwrap();
        add_participant(state, &room.id, &who.connection_id, &who.person_id, &who.name)
            .await
            .unwrap()
            .unwrap()
            .room
    }

    #[tokio::test]
    async fn create_room_uses_default_settings() {
        let state = test_state().await;
        let room = create_room(&state, None, None, None).await.unwrap();
        assert_eq!(room.settings.focus_sec, 1500);
        assert_eq!(room.timer.mode, TimerMode::Paused { remaining_sec: 1500 });
        assert!(fetch_room(&state, &room.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_room_is_data_not_error() {
        let state = test_state().await;
        assert!(fetch_room(&state, "nosuch").await.unwrap().is_none());
        let who = actor("c1", "p1", "Ada");
        let applied =
            apply_timer_command(&state, "nosuch", &who, TimerCommand::Start, 0, false)
                .await
                .unwrap();
        assert!(applied.is_none());
    }

    #[tokio::test]
    async fn end_to_end_focus_pause_skip_scenario() {
        let state = test_state().await;
        let who = actor("c1", "p1", "Ada");
        let room = room_with_actor(&state, &who).await;

        let started =
            apply_timer_command(&state, &room.id, &who, TimerCommand::Start, 0, false)
                .await
                .unwrap()
                .unwrap();
        let TimerApplied::Updated(after_start) = started else {
            panic!("start should change state");
        };
        assert_eq!(
            after_start.timer.mode,
            TimerMode::Running {
                ends_at_ms: 1_500_000
            }
        );

        let paused = apply_timer_command(
            &state,
            &room.id,
            &who,
            TimerCommand::Pause,
            600_000,
            false,
        )
        .await
        .unwrap()
        .unwrap();
        let TimerApplied::Updated(after_pause) = paused else {
            panic!("pause should change state");
        };
        assert_eq!(
            after_pause.timer.mode,
            TimerMode::Paused { remaining_sec: 900 }
        );

        let skipped = apply_timer_command(
            &state,
            &room.id,
            &who,
            TimerCommand::Skip { guard: None },
            700_000,
            false,
        )
        .await
        .unwrap()
        .unwrap();
        let TimerApplied::Updated(after_skip) = skipped else {
            panic!("skip should change state");
        };
        assert_eq!(after_skip.timer.phase, Phase::Break);
        assert_eq!(after_skip.timer.cycle_count, 1);
        assert_eq!(
            after_skip.timer.mode,
            TimerMode::Paused { remaining_sec: 300 }
        );
    }

    #[tokio::test]
    async fn stale_command_leaves_state_but_appends_one_activity() {
        let state = test_state().await;
        let who = actor("c1", "p1", "Ada");
        let room = room_with_actor(&state, &who).await;

        apply_timer_command(&state, &room.id, &who, TimerCommand::Start, 10_000, false)
            .await
            .unwrap();
        let before = fetch_room(&state, &room.id).await.unwrap().unwrap();

        let outcome = apply_timer_command(
            &state,
            &room.id,
            &who,
            TimerCommand::Pause,
            9_999,
            false,
        )
        .await
        .unwrap()
        .unwrap();
        assert!(matches!(outcome, TimerApplied::Logged(_)));

        let after = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert_eq!(after.timer, before.timer);
        assert_eq!(after.history.len(), before.history.len() + 1);
    }

    #[tokio::test]
    async fn idempotent_pause_keeps_logical_clock() {
        let state = test_state().await;
        let who = actor("c1", "p1", "Ada");
        let room = room_with_actor(&state, &who).await;

        apply_timer_command(&state, &room.id, &who, TimerCommand::Start, 1_000, false)
            .await
            .unwrap();
        apply_timer_command(&state, &room.id, &who, TimerCommand::Pause, 2_000, false)
            .await
            .unwrap();

        let outcome = apply_timer_command(
            &state,
            &room.id,
            &who,
            TimerCommand::Pause,
            3_000,
            false,
        )
        .await
        .unwrap()
        .unwrap();
        assert!(matches!(outcome, TimerApplied::Logged(_)));

        let after = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert_eq!(after.timer.last_updated_at, 2_000);
    }

    #[tokio::test]
    async fn guard_mismatch_writes_nothing() {
        let state = test_state().await;
        let who = actor("c1", "p1", "Ada");
        let room = room_with_actor(&state, &who).await;

        apply_timer_command(&state, &room.id, &who, TimerCommand::Start, 0, false)
            .await
            .unwrap();
        let before = fetch_room(&state, &room.id).await.unwrap().unwrap();

        let guard = crate::state::timer::SkipGuard {
            phase: Phase::Focus,
            running: true,
            phase_ends_at_ms: Some(123),
        };
        let outcome = apply_timer_command(
            &state,
            &room.id,
            &who,
            TimerCommand::Skip { guard: Some(guard) },
            1_000,
            false,
        )
        .await
        .unwrap()
        .unwrap();
        assert!(matches!(outcome, TimerApplied::Ignored(_)));

        let after = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert_eq!(after.history.len(), before.history.len());
        assert_eq!(after.timer, before.timer);
    }

    #[tokio::test]
    async fn name_uniqueness_across_persons() {
        let state = test_state().await;
        let room = create_room(&state, None, None, None).await.unwrap();

        add_participant(&state, &room.id, "c1", "p1", "Ada")
            .await
            .unwrap()
            .unwrap();
        let err = add_participant(&state, &room.id, "c2", "p2", "Ada")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NameTaken(_)));

        let roster = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert_eq!(roster.participants.len(), 1);
    }

    #[tokio::test]
    async fn same_person_may_reuse_their_name_across_tabs() {
        let state = test_state().await;
        let room = create_room(&state, None, None, None).await.unwrap();

        add_participant(&state, &room.id, "c1", "p1", "Ada")
            .await
            .unwrap()
            .unwrap();
        add_participant(&state, &room.id, "c2", "p1", "Ada")
            .await
            .unwrap()
            .unwrap();

        let roster = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert_eq!(roster.participants.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_join_is_idempotent() {
        let state = test_state().await;
        let room = create_room(&state, None, None, None).await.unwrap();

        add_participant(&state, &room.id, "c1", "p1", "Ada")
            .await
            .unwrap()
            .unwrap();
        let again = add_participant(&state, &room.id, "c1", "p1", "Ada")
            .await
            .unwrap()
            .unwrap();
        assert!(!again.newly_added);
        assert_eq!(again.room.participants.len(), 1);
    }

    #[tokio::test]
    async fn anonymous_join_is_not_logged() {
        let state = test_state().await;
        let room = create_room(&state, None, None, None).await.unwrap();

        let join = add_participant(&state, &room.id, "c1", "p1", ANONYMOUS_NAME)
            .await
            .unwrap()
            .unwrap();
        assert!(!join.join_logged);
        assert!(join.room.history.is_empty());

        let join = add_participant(&state, &room.id, "c2", "p2", "Grace")
            .await
            .unwrap()
            .unwrap();
        assert!(join.join_logged);
        assert_eq!(join.room.history.len(), 1);
        assert_eq!(join.room.history[0].kind, ActivityKind::Join);
    }

    #[tokio::test]
    async fn concurrent_removals_converge() {
        let state = test_state().await;
        let room = create_room(&state, None, None, None).await.unwrap();
        add_participant(&state, &room.id, "c1", "p1", "Ada")
            .await
            .unwrap()
            .unwrap();
        add_participant(&state, &room.id, "c2", "p2", "Grace")
            .await
            .unwrap()
            .unwrap();

        // Duplicate disconnect delivery for the same connection.
        let (first, second) = tokio::join!(
            remove_participant(&state, &room.id, "c1", None),
            remove_participant(&state, &room.id, "c1", None),
        );
        first.unwrap().unwrap();
        second.unwrap().unwrap();

        let roster = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert_eq!(roster.participants.len(), 1);
        assert_eq!(roster.participants[0].connection_id, "c2");
    }

    #[tokio::test]
    async fn removal_of_absent_participant_is_a_noop() {
        let state = test_state().await;
        let who = actor("c1", "p1", "Ada");
        let room = room_with_actor(&state, &who).await;

        let outcome = remove_participant(&state, &room.id, "ghost", Some(&who))
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.removed);
        assert_eq!(outcome.participants.len(), 1);
        // No leave entry either; the target was never present.
        let after = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert!(
            after
                .history
                .iter()
                .all(|entry| entry.kind != ActivityKind::Leave)
        );
    }

    #[tokio::test]
    async fn removal_records_leave_under_the_caller_identity() {
        let state = test_state().await;
        let who = actor("c1", "p1", "Ada");
        let room = room_with_actor(&state, &who).await;

        let outcome = remove_participant(&state, &room.id, "c1", Some(&who))
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.removed);

        let after = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert_eq!(after.history[0].kind, ActivityKind::Leave);
        assert_eq!(after.history[0].actor_name, "Ada");
    }

    #[tokio::test]
    async fn host_mode_rejects_non_host_control() {
        let state = test_state().await;
        let patch = SettingsPatch {
            mode: Some(ControlMode::Host),
            ..SettingsPatch::default()
        };
        let room = create_room(&state, None, Some(patch), Some("host-person".into()))
            .await
            .unwrap();

        let outsider = actor("c1", "p1", "Ada");
        let err = apply_timer_command(&state, &room.id, &outsider, TimerCommand::Start, 0, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        // State untouched by the rejected attempt.
        let unchanged = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert!(!unchanged.timer.running());
        assert!(unchanged.history.is_empty());

        let host = actor("c2", "host-person", "Host");
        let outcome =
            apply_timer_command(&state, &room.id, &host, TimerCommand::Start, 0, false)
                .await
                .unwrap()
                .unwrap();
        assert!(matches!(outcome, TimerApplied::Updated(_)));
    }

    #[tokio::test]
    async fn settings_update_recomputes_paused_remainder() {
        let state = test_state().await;
        let who = actor("c1", "p1", "Ada");
        let room = room_with_actor(&state, &who).await;

        let patch = SettingsPatch {
            focus_sec: Some(1_800),
            ..SettingsPatch::default()
        };
        let update = update_settings(&state, &room.id, &who, patch, 1_000)
            .await
            .unwrap()
            .unwrap();
        assert!(update.applied);
        assert_eq!(
            update.room.timer.mode,
            TimerMode::Paused {
                remaining_sec: 1_800
            }
        );
    }

    #[tokio::test]
    async fn stale_settings_update_is_dropped() {
        let state = test_state().await;
        let who = actor("c1", "p1", "Ada");
        let room = room_with_actor(&state, &who).await;

        apply_timer_command(&state, &room.id, &who, TimerCommand::Start, 10_000, false)
            .await
            .unwrap();

        let patch = SettingsPatch {
            focus_sec: Some(1_800),
            ..SettingsPatch::default()
        };
        let update = update_settings(&state, &room.id, &who, patch, 9_000)
            .await
            .unwrap()
            .unwrap();
        assert!(!update.applied);
        assert_eq!(update.room.settings.focus_sec, 1_500);
    }

    #[tokio::test]
    async fn chat_and_todos_round_trip() {
        let state = test_state().await;
        let who = actor("c1", "p1", "Ada");
        let room = room_with_actor(&state, &who).await;

        let message = append_message(&state, &room.id, &who, "hello".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.author, "Ada");

        let todo_id = Uuid::new_v4();
        let todos = apply_todo_op(
            &state,
            &room.id,
            &who,
            TodoOp::Add {
                id: todo_id,
                text: "ship it".into(),
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(todos.todos.len(), 1);

        let after = fetch_room(&state, &room.id).await.unwrap().unwrap();
        assert_eq!(after.messages.len(), 1);
        assert_eq!(after.user_todos["p1"].todos[0].text, "ship it");
    }

    #[tokio::test]
    async fn rename_updates_all_tabs_and_logs_synthetic_join_on_request() {
        let state = test_state().await;
        let room = create_room(&state, None, None, None).await.unwrap();
        add_participant(&state, &room.id, "c1", "p1", ANONYMOUS_NAME)
            .await
            .unwrap()
            .unwrap();
        add_participant(&state, &room.id, "c2", "p1", ANONYMOUS_NAME)
            .await
            .unwrap()
            .unwrap();

        let renamed = update_participant_name(&state, &room.id, "p1", "Ada", true)
            .await
            .unwrap()
            .unwrap();
        assert!(renamed.participants.iter().all(|p| p.name == "Ada"));
        assert_eq!(renamed.history[0].kind, ActivityKind::Join);
        assert_eq!(renamed.history[0].actor_name, "Ada");
    }
}
