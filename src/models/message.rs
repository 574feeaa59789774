use bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::serialize::iso;

/// A note posted on a project's conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub project_id: ObjectId,
    pub sender_id: ObjectId,
    pub message: String,
    pub created_at: BsonDateTime,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub project_id: String,
    pub sender_id: String,
    pub message: String,
    pub created_at: String,
    pub read: bool,
}

impl From<&Message> for MessageView {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id.to_hex(),
            project_id: msg.project_id.to_hex(),
            sender_id: msg.sender_id.to_hex(),
            message: msg.message.clone(),
            created_at: iso(&msg.created_at),
            read: msg.read,
        }
    }
}
