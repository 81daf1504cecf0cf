/// In-memory backend used by default and in tests.
pub mod memory;
#[cfg(feature = "mongo-store")]
/// MongoDB backend with TTL-based room expiry.
pub mod mongodb;

use std::time::Duration;

use futures::future::BoxFuture;

use crate::dao::models::RoomEntity;
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for room aggregates.
///
/// Rooms are always read and written whole; `save_room` refreshes the
/// expiry deadline on every write.
pub trait RoomStore: Send + Sync {
    /// Upsert the room record and (re)arm its time-to-live.
    fn save_room(&self, room: RoomEntity, ttl: Duration) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a room by id; expired rooms are reported as absent.
    fn find_room(&self, id: &str) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Drop a room record, reporting whether anything was deleted.
    fn delete_room(&self, id: &str) -> BoxFuture<'static, StorageResult<bool>>;
    /// Probe backend connectivity.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a lost backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
