use bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use crate::serialize::{iso, iso_opt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

/// An invoice raised against a project. `user_id` is the project's creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bill {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub project_id: ObjectId,
    pub user_id: ObjectId,
    pub amount: f64,
    pub due_date: BsonDateTime,
    pub issued_on: BsonDateTime,
    #[serde(default)]
    pub status: PaymentStatus,
    pub paid_on: Option<BsonDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillView {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub amount: f64,
    pub due_date: String,
    pub issued_on: String,
    pub status: PaymentStatus,
    pub paid_on: Option<String>,
}

impl From<&Bill> for BillView {
    fn from(bill: &Bill) -> Self {
        Self {
            id: bill.id.to_hex(),
            project_id: bill.project_id.to_hex(),
            user_id: bill.user_id.to_hex(),
            amount: bill.amount,
            due_date: iso(&bill.due_date),
            issued_on: iso(&bill.issued_on),
            status: bill.status,
            paid_on: iso_opt(&bill.paid_on),
        }
    }
}
