use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use futures::future::BoxFuture;

use crate::dao::models::RoomEntity;
use crate::dao::room_store::RoomStore;
use crate::dao::storage::StorageResult;

/// Room record plus its absolute expiry deadline.
#[derive(Debug, Clone)]
struct StoredRoom {
    entity: RoomEntity,
    expires_at_ms: u64,
}

/// In-memory room store backed by a concurrent map.
///
/// Expiry is enforced lazily: an expired entry is dropped the next time it
/// is read. The store never fails, which also makes it the test double for
/// the service layer.
#[derive(Clone, Default)]
pub struct MemoryRoomStore {
    rooms: Arc<DashMap<String, StoredRoom>>,
}

impl MemoryRoomStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl RoomStore for MemoryRoomStore {
    fn save_room(&self, room: RoomEntity, ttl: Duration) -> BoxFuture<'static, StorageResult<()>> {
        let rooms = self.rooms.clone();
        Box::pin(async move {
            let expires_at_ms = Self::now_ms().saturating_add(ttl.as_millis() as u64);
            rooms.insert(
                room.id.clone(),
                StoredRoom {
                    entity: room,
                    expires_at_ms,
                },
            );
            Ok(())
        })
    }

    fn find_room(&self, id: &str) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let rooms = self.rooms.clone();
        let id = id.to_owned();
        Box::pin(async move {
            let expired = match rooms.get(&id) {
                Some(stored) if stored.expires_at_ms > Self::now_ms() => {
                    return Ok(Some(stored.entity.clone()));
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                rooms.remove(&id);
            }
            Ok(None)
        })
    }

    fn delete_room(&self, id: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let rooms = self.rooms.clone();
        let id = id.to_owned();
        Box::pin(async move { Ok(rooms.remove(&id).is_some()) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::{
        ControlModeEntity, PhaseEntity, RoomEntity, SettingsEntity, TimerEntity,
    };
    use indexmap::IndexMap;

    fn sample_room(id: &str) -> RoomEntity {
        RoomEntity {
            id: id.to_owned(),
            settings: SettingsEntity {
                focus_sec: 1500,
                break_sec: 300,
                long_break_sec: 900,
                long_break_every: 4,
                mode: ControlModeEntity::Collab,
            },
            timer: TimerEntity {
                running: false,
                phase: PhaseEntity::Focus,
                phase_ends_at_ms: None,
                remaining_sec: Some(1500),
                cycle_count: 0,
                last_updated_at_ms: 0,
            },
            host_id: None,
            created_at_ms: 0,
            participants: Vec::new(),
            messages: Vec::new(),
            user_todos: IndexMap::new(),
            history: Vec::new(),
        }
    }

    #[tokio::test]
    async fn save_then_find_round_trips() {
        let store = MemoryRoomStore::new();
        store
            .save_room(sample_room("abc123"), Duration::from_secs(60))
            .await
            .unwrap();

        let found = store.find_room("abc123").await.unwrap();
        assert_eq!(found.map(|room| room.id), Some("abc123".to_owned()));
    }

    #[tokio::test]
    async fn expired_room_is_absent() {
        let store = MemoryRoomStore::new();
        store
            .save_room(sample_room("abc123"), Duration::ZERO)
            .await
            .unwrap();

        assert!(store.find_room("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemoryRoomStore::new();
        store
            .save_room(sample_room("abc123"), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.delete_room("abc123").await.unwrap());
        assert!(!store.delete_room("abc123").await.unwrap());
    }
}
