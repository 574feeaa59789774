use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
}
