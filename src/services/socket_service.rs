//! Command gateway: one task per WebSocket connection, holding an explicit
//! session record (never ambient state), dispatching client commands to the
//! room aggregate manager and fanning the resulting deltas out to the room.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        room::SettingsPatchInput,
        validation::validate_display_name,
        ws::{ClientCommand, SkipSource},
    },
    error::ServiceError,
    services::{
        events, presence,
        room_service::{self, Actor, TimerApplied},
    },
    state::{
        ClientConnection, SharedState,
        room::{ANONYMOUS_NAME, TodoOp},
        timer::{TimerCommand, now_ms},
    },
};

/// Per-connection session owned by the gateway and passed into every
/// command handler. `person_id` is set once the join succeeds; until then
/// the connection is anonymous and roomless.
struct ClientSession {
    connection_id: String,
    person_id: Option<String>,
    display_name: String,
    room_id: Option<String>,
}

impl ClientSession {
    fn new(connection_id: String) -> Self {
        Self {
            connection_id,
            person_id: None,
            display_name: ANONYMOUS_NAME.to_owned(),
            room_id: None,
        }
    }

    /// Room id and actor identity, once joined.
    fn joined(&self) -> Result<(String, Actor), ServiceError> {
        match (&self.room_id, &self.person_id) {
            (Some(room_id), Some(person_id)) => Ok((
                room_id.clone(),
                Actor {
                    connection_id: self.connection_id.clone(),
                    person_id: person_id.clone(),
                    name: self.display_name.clone(),
                },
            )),
            _ => Err(ServiceError::InvalidInput("join a room first".into())),
        }
    }
}

/// Handle the full lifecycle of one client WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we
    // await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4().simple().to_string();
    state.directory().register(ClientConnection {
        id: connection_id.clone(),
        tx: outbound_tx.clone(),
    });
    info!(conn_id = %connection_id, "client connected");

    let mut session = ClientSession::new(connection_id.clone());

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientCommand::from_json_str(&text) {
                Ok(ClientCommand::Unknown) => {
                    warn!(conn_id = %connection_id, "ignoring unknown command");
                }
                Ok(command) => {
                    if let Err(err) = dispatch(&state, &mut session, command).await {
                        match err {
                            ServiceError::Unavailable(_) | ServiceError::Degraded => {
                                // No guaranteed client notification for
                                // storage trouble; the next broadcast or
                                // resync recovers the client.
                                warn!(conn_id = %connection_id, error = %err, "command dropped");
                            }
                            err => events::send_error_to(
                                &state,
                                &connection_id,
                                err.code(),
                                &err.to_string(),
                            ),
                        }
                    }
                }
                Err(err) => {
                    warn!(conn_id = %connection_id, error = %err, "failed to parse client command");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(conn_id = %connection_id, error = %err, "websocket error");
                break;
            }
        }
    }

    disconnect(&state, &session).await;
    info!(conn_id = %connection_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

async fn dispatch(
    state: &SharedState,
    session: &mut ClientSession,
    command: ClientCommand,
) -> Result<(), ServiceError> {
    match command {
        ClientCommand::Join {
            room_id,
            name,
            person_id,
        } => handle_join(state, session, room_id, name, person_id).await,
        ClientCommand::UpdateName { name } => handle_update_name(state, session, name).await,
        ClientCommand::TimerStart { timestamp } => {
            handle_timer(state, session, TimerCommand::Start, timestamp, false).await
        }
        ClientCommand::TimerPause { timestamp } => {
            handle_timer(state, session, TimerCommand::Pause, timestamp, false).await
        }
        ClientCommand::TimerReset { timestamp } => {
            handle_timer(state, session, TimerCommand::Reset, timestamp, false).await
        }
        ClientCommand::TimerSkip {
            source,
            timestamp,
            expected,
        } => {
            let command = TimerCommand::Skip {
                guard: expected.map(Into::into),
            };
            handle_timer(
                state,
                session,
                command,
                timestamp,
                source == SkipSource::Auto,
            )
            .await
        }
        ClientCommand::UpdateSettings {
            settings,
            timestamp,
        } => handle_settings(state, session, settings, timestamp).await,
        ClientCommand::SendMessage { text } => handle_message(state, session, text).await,
        ClientCommand::TodoAdd {
            text,
            correlation_id,
        } => {
            let op = TodoOp::Add {
                id: Uuid::new_v4(),
                text,
            };
            handle_todo(state, session, op, correlation_id).await
        }
        ClientCommand::TodoUpdate {
            todo_id,
            text,
            completed,
        } => {
            let op = TodoOp::Update {
                id: todo_id,
                text,
                completed,
            };
            handle_todo(state, session, op, None).await
        }
        ClientCommand::TodoDelete { todo_id } => {
            handle_todo(state, session, TodoOp::Delete { id: todo_id }, None).await
        }
        ClientCommand::TodoReorder { todo_ids } => {
            handle_todo(state, session, TodoOp::Reorder { ids: todo_ids }, None).await
        }
        ClientCommand::TodoSetActive { todo_id } => {
            handle_todo(state, session, TodoOp::SetActive { id: todo_id }, None).await
        }
        ClientCommand::TodoSetVisibility { visible } => {
            handle_todo(state, session, TodoOp::SetVisibility { visible }, None).await
        }
        ClientCommand::Unknown => Ok(()),
    }
}

async fn handle_join(
    state: &SharedState,
    session: &mut ClientSession,
    room_id: String,
    name: String,
    person_id: String,
) -> Result<(), ServiceError> {
    if session.room_id.is_some() {
        return Err(ServiceError::InvalidInput("already joined a room".into()));
    }
    validate_display_name(&name)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    if person_id.trim().is_empty() {
        return Err(ServiceError::InvalidInput("person id must not be blank".into()));
    }

    let Some(join) =
        room_service::add_participant(state, &room_id, &session.connection_id, &person_id, &name)
            .await?
    else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };

    session.room_id = Some(room_id.clone());
    session.person_id = Some(person_id);
    session.display_name = name;

    state
        .directory()
        .join_room(&room_id, &session.connection_id);

    // Opportunistic cleanup before snapshotting to the joiner.
    if let Err(err) = presence::reconcile_room(state, &room_id).await {
        warn!(room_id, error = %err, "presence reconciliation failed");
    }

    let room = match room_service::fetch_room(state, &room_id).await? {
        Some(room) => room,
        // The room evaporated between writes; fall back to the join view.
        None => join.room,
    };

    events::send_snapshot_to(state, &session.connection_id, &room);
    if join.join_logged {
        // The activity log changed too; everyone else gets the full picture.
        events::broadcast_snapshot_except(state, &room, Some(&session.connection_id));
    } else {
        events::broadcast_presence_except(
            state,
            &room.id,
            &room.participants,
            Some(&session.connection_id),
        );
    }
    Ok(())
}

async fn handle_update_name(
    state: &SharedState,
    session: &mut ClientSession,
    name: String,
) -> Result<(), ServiceError> {
    validate_display_name(&name)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let (Some(room_id), Some(person_id)) = (session.room_id.clone(), session.person_id.clone())
    else {
        // Not joined yet: just remember the name for the upcoming join.
        session.display_name = name;
        return Ok(());
    };

    let was_anonymous = session.display_name == ANONYMOUS_NAME;
    let record_join = was_anonymous && name != ANONYMOUS_NAME;

    let Some(room) =
        room_service::update_participant_name(state, &room_id, &person_id, &name, record_join)
            .await?
    else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };

    session.display_name = name;

    if record_join {
        // Unmasking from anonymous logged a synthetic join; keep everyone's
        // history accurate with the fuller snapshot.
        events::broadcast_snapshot(state, &room);
    } else {
        events::broadcast_presence(state, &room.id, &room.participants);
        if let Some(todos) = room.user_todos.get(&person_id) {
            events::broadcast_todos(state, &room.id, &person_id, todos, None);
        }
    }
    Ok(())
}

async fn handle_timer(
    state: &SharedState,
    session: &ClientSession,
    command: TimerCommand,
    timestamp: Option<u64>,
    auto: bool,
) -> Result<(), ServiceError> {
    let (room_id, actor) = session.joined()?;
    let timestamp = timestamp.unwrap_or_else(now_ms);

    let Some(applied) =
        room_service::apply_timer_command(state, &room_id, &actor, command, timestamp, auto)
            .await?
    else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };

    match applied {
        // Guard or near-zero gate rejected the command; nothing to tell
        // anyone, including the caller.
        TimerApplied::Ignored(_) => {}
        TimerApplied::Updated(room) | TimerApplied::Logged(room) if auto => {
            // Expected, frequent transition: the lighter timer-only delta
            // keeps snapshot churn down.
            events::broadcast_timer(state, &room_id, &room.timer);
        }
        TimerApplied::Updated(room) | TimerApplied::Logged(room) => {
            // Manual commands touch the activity log; push the full picture.
            events::broadcast_snapshot(state, &room);
        }
    }
    Ok(())
}

async fn handle_settings(
    state: &SharedState,
    session: &ClientSession,
    settings: SettingsPatchInput,
    timestamp: Option<u64>,
) -> Result<(), ServiceError> {
    let (room_id, actor) = session.joined()?;
    let timestamp = timestamp.unwrap_or_else(now_ms);

    let Some(update) =
        room_service::update_settings(state, &room_id, &actor, settings.into(), timestamp).await?
    else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };

    if update.applied {
        events::broadcast_snapshot(state, &update.room);
    }
    Ok(())
}

async fn handle_message(
    state: &SharedState,
    session: &ClientSession,
    text: String,
) -> Result<(), ServiceError> {
    if text.trim().is_empty() {
        return Err(ServiceError::InvalidInput("message must not be blank".into()));
    }
    let (room_id, actor) = session.joined()?;

    let Some(message) = room_service::append_message(state, &room_id, &actor, text).await? else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };

    events::broadcast_message(state, &room_id, &message);
    Ok(())
}

async fn handle_todo(
    state: &SharedState,
    session: &ClientSession,
    op: TodoOp,
    correlation_id: Option<String>,
) -> Result<(), ServiceError> {
    let (room_id, actor) = session.joined()?;

    let Some(todos) = room_service::apply_todo_op(state, &room_id, &actor, op).await? else {
        return Err(ServiceError::NotFound(format!("room `{room_id}` not found")));
    };

    events::broadcast_todos(state, &room_id, &actor.person_id, &todos, correlation_id);
    Ok(())
}

/// Tear down after the read loop exits: forget the socket, then reconcile
/// the roster. The removal backoff only ever runs here, after the
/// connection's command queue is already drained.
async fn disconnect(state: &SharedState, session: &ClientSession) {
    state.directory().unregister(&session.connection_id);

    let Some(room_id) = session.room_id.as_deref() else {
        return;
    };
    state
        .directory()
        .leave_room(room_id, &session.connection_id);

    let leaver = Actor {
        connection_id: session.connection_id.clone(),
        // The session is the only reliable source for who just left.
        person_id: session.person_id.clone().unwrap_or_default(),
        name: session.display_name.clone(),
    };

    match room_service::remove_participant(
        state,
        room_id,
        &session.connection_id,
        Some(&leaver),
    )
    .await
    {
        Ok(Some(outcome)) => {
            if outcome.removed {
                // A leave entry went into the log; the room view changed
                // beyond presence.
                match room_service::fetch_room(state, room_id).await {
                    Ok(Some(room)) => events::broadcast_snapshot(state, &room),
                    Ok(None) => {}
                    Err(err) => {
                        warn!(room_id, error = %err, "failed to fetch room after disconnect")
                    }
                }
            }
            events::broadcast_presence(state, room_id, &outcome.participants);
        }
        Ok(None) => {}
        Err(err) => {
            warn!(
                room_id,
                conn_id = %session.connection_id,
                error = %err,
                "participant removal failed"
            );
        }
    }
}

/// Ensure the writer task winds down before we return from the socket
/// handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
