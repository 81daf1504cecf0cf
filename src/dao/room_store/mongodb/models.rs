use indexmap::IndexMap;
use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{
    ActivityEntity, MessageEntity, ParticipantEntity, RoomEntity, SettingsEntity, TimerEntity,
    UserTodosEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    id: String,
    settings: SettingsEntity,
    timer: TimerEntity,
    host_id: Option<String>,
    created_at_ms: u64,
    participants: Vec<ParticipantEntity>,
    messages: Vec<MessageEntity>,
    user_todos: IndexMap<String, UserTodosEntity>,
    history: Vec<ActivityEntity>,
    /// Deadline driving the TTL index; refreshed on every write.
    pub expires_at: DateTime,
}

impl MongoRoomDocument {
    pub fn new(room: RoomEntity, expires_at: DateTime) -> Self {
        Self {
            id: room.id,
            settings: room.settings,
            timer: room.timer,
            host_id: room.host_id,
            created_at_ms: room.created_at_ms,
            participants: room.participants,
            messages: room.messages,
            user_todos: room.user_todos,
            history: room.history,
            expires_at,
        }
    }
}

impl From<MongoRoomDocument> for RoomEntity {
    fn from(value: MongoRoomDocument) -> Self {
        Self {
            id: value.id,
            settings: value.settings,
            timer: value.timer,
            host_id: value.host_id,
            created_at_ms: value.created_at_ms,
            participants: value.participants,
            messages: value.messages,
            user_todos: value.user_todos,
            history: value.history,
        }
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}
