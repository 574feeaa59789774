use bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::serialize::iso;

/// An inbound sales inquiry. Unique on (email, mobile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub mobile: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub project_type: String,
    #[serde(default)]
    pub project_details: String,
    pub created_at: BsonDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub project: String,
    pub project_type: String,
    pub project_details: String,
    pub created_at: String,
}

impl From<&Lead> for LeadView {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id.to_hex(),
            name: lead.name.clone(),
            email: lead.email.clone(),
            mobile: lead.mobile.clone(),
            project: lead.project.clone(),
            project_type: lead.project_type.clone(),
            project_details: lead.project_details.clone(),
            created_at: iso(&lead.created_at),
        }
    }
}
