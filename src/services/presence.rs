//! Presence reconciliation: the stored roster can drift from reality because
//! disconnect notifications and store writes do not interleave cleanly. This
//! service removes participants whose connections are verifiably gone.

use std::collections::HashSet;

use tracing::info;

use crate::{
    error::ServiceError,
    services::{events, room_service},
    state::SharedState,
};

/// Reconcile a room's stored roster against the connections that are
/// actually alive.
///
/// A stored participant missing from the room's broadcast group is not
/// necessarily dead: its join may still be in flight. Only connections also
/// absent from the raw registry are evicted, in a single batch, followed by
/// a presence broadcast. Invoked opportunistically (after a join, before
/// snapshotting to the joiner) rather than on a timer.
pub async fn reconcile_room(state: &SharedState, room_id: &str) -> Result<(), ServiceError> {
    let Some(room) = room_service::fetch_room(state, room_id).await? else {
        return Ok(());
    };

    let members: HashSet<String> = state
        .directory()
        .room_members(room_id)
        .into_iter()
        .collect();

    let stale: Vec<String> = room
        .participants
        .iter()
        .filter(|participant| !members.contains(&participant.connection_id))
        // Not in the broadcast group, but the socket itself is still
        // registered: a join in progress, not a corpse.
        .filter(|participant| !state.directory().is_connected(&participant.connection_id))
        .map(|participant| participant.connection_id.clone())
        .collect();

    if stale.is_empty() {
        return Ok(());
    }

    info!(
        room_id,
        count = stale.len(),
        "evicting participants with dead connections"
    );

    if let Some((participants, removed_any)) =
        room_service::remove_participants(state, room_id, &stale).await?
        && removed_any
    {
        events::broadcast_presence(state, room_id, &participants);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::{
        config::AppConfig,
        dao::room_store::memory::MemoryRoomStore,
        state::{AppState, ClientConnection},
    };

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .set_room_store(Arc::new(MemoryRoomStore::new()))
            .await;
        state
    }

    fn attach(
        state: &SharedState,
        connection_id: &str,
    ) -> mpsc::UnboundedReceiver<axum::extract::ws::Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        state.directory().register(ClientConnection {
            id: connection_id.to_owned(),
            tx,
        });
        rx
    }

    #[tokio::test]
    async fn evicts_dead_connections_but_keeps_joins_in_flight() {
        let state = test_state().await;
        let room = room_service::create_room(&state, None, None, None)
            .await
            .unwrap();

        // c1: fully joined (registry + broadcast group).
        let _rx1 = attach(&state, "c1");
        room_service::add_participant(&state, &room.id, "c1", "p1", "Ada")
            .await
            .unwrap()
            .unwrap();
        state.directory().join_room(&room.id, "c1");

        // c2: stored but its socket is gone entirely.
        room_service::add_participant(&state, &room.id, "c2", "p2", "Grace")
            .await
            .unwrap()
            .unwrap();

        // c3: socket registered but not yet in the broadcast group, a join
        // still in flight; must not be evicted.
        let _rx3 = attach(&state, "c3");
        room_service::add_participant(&state, &room.id, "c3", "p3", "Edsger")
            .await
            .unwrap()
            .unwrap();

        reconcile_room(&state, &room.id).await.unwrap();

        let roster = room_service::fetch_room(&state, &room.id)
            .await
            .unwrap()
            .unwrap()
            .participants;
        let ids: Vec<&str> = roster
            .iter()
            .map(|participant| participant.connection_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1", "c3"]);
    }

    #[tokio::test]
    async fn clean_roster_is_left_alone() {
        let state = test_state().await;
        let room = room_service::create_room(&state, None, None, None)
            .await
            .unwrap();

        let _rx1 = attach(&state, "c1");
        room_service::add_participant(&state, &room.id, "c1", "p1", "Ada")
            .await
            .unwrap()
            .unwrap();
        state.directory().join_room(&room.id, "c1");

        reconcile_room(&state, &room.id).await.unwrap();

        let roster = room_service::fetch_room(&state, &room.id)
            .await
            .unwrap()
            .unwrap()
            .participants;
        assert_eq!(roster.len(), 1);
    }
}
