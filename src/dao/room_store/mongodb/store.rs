use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoRoomDocument, doc_id},
};
use crate::dao::{models::RoomEntity, room_store::RoomStore, storage::StorageResult};

const ROOM_COLLECTION_NAME: &str = "rooms";

/// Room store backed by MongoDB.
///
/// Rooms are single documents keyed by the room id. Expiry is handled by a
/// TTL index on `expires_at`, which every write pushes further into the
/// future, so a room only disappears once nobody has touched it for the
/// configured time-to-live.
#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        let collection = database.collection::<mongodb::bson::Document>(ROOM_COLLECTION_NAME);
        // expireAfterSeconds(0) makes MongoDB reap each document at its own
        // `expires_at`, giving every room an individually refreshed TTL.
        let index = mongodb::IndexModel::builder()
            .keys(doc! {"expires_at": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("room_ttl_idx".to_owned()))
                    .expire_after(Some(Duration::from_secs(0)))
                    .build(),
            )
            .build();

        collection
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ROOM_COLLECTION_NAME,
                index: "expires_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection(&self) -> Collection<MongoRoomDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoRoomDocument>(ROOM_COLLECTION_NAME)
    }

    async fn save_room(&self, room: RoomEntity, ttl: Duration) -> MongoResult<()> {
        let id = room.id.clone();
        let expires_at = DateTime::from_system_time(std::time::SystemTime::now() + ttl);
        let document = MongoRoomDocument::new(room, expires_at);
        let collection = self.collection().await;
        collection
            .replace_one(doc_id(&id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRoom { id, source })?;

        Ok(())
    }

    async fn find_room(&self, id: String) -> MongoResult<Option<RoomEntity>> {
        let collection = self.collection().await;

        let document = collection
            .find_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::LoadRoom { id, source })?;

        // The TTL monitor only sweeps periodically; treat an overdue
        // document as already gone.
        let now = DateTime::now();
        Ok(document
            .filter(|doc| doc.expires_at > now)
            .map(RoomEntity::from))
    }

    async fn delete_room(&self, id: String) -> MongoResult<bool> {
        let collection = self.collection().await;
        let result = collection
            .delete_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::DeleteRoom { id, source })?;
        Ok(result.deleted_count > 0)
    }
}

impl RoomStore for MongoRoomStore {
    fn save_room(&self, room: RoomEntity, ttl: Duration) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_room(room, ttl).await.map_err(Into::into) })
    }

    fn find_room(&self, id: &str) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { store.find_room(id).await.map_err(Into::into) })
    }

    fn delete_room(&self, id: &str) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        let id = id.to_owned();
        Box::pin(async move { store.delete_room(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
