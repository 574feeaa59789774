//! Persistence seam between the services and the document database.

mod mongo;
#[cfg(test)]
pub mod memory;

pub use mongo::MongoStore;

use async_trait::async_trait;
use bson::oid::ObjectId;
use thiserror::Error;

use crate::models::{Bill, Lead, Message, Project, Subscriber, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate key")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Collection-level operations used by the services.
///
/// Listing methods return documents newest first. `save_*` methods replace the
/// whole document and report whether it existed.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>>;
    /// Ignores case: older accounts keep the casing they signed up with.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn save_user(&self, user: &User) -> StoreResult<bool>;

    async fn insert_project(&self, project: &Project) -> StoreResult<()>;
    async fn find_project(&self, id: &ObjectId) -> StoreResult<Option<Project>>;
    /// All projects, or only those created by `created_by`.
    async fn list_projects(&self, created_by: Option<&ObjectId>) -> StoreResult<Vec<Project>>;
    async fn save_project(&self, project: &Project) -> StoreResult<bool>;

    async fn insert_bill(&self, bill: &Bill) -> StoreResult<()>;
    async fn find_bill(&self, id: &ObjectId) -> StoreResult<Option<Bill>>;
    /// All bills, or only those owned by `user_id`.
    async fn list_bills(&self, user_id: Option<&ObjectId>) -> StoreResult<Vec<Bill>>;
    async fn save_bill(&self, bill: &Bill) -> StoreResult<bool>;

    async fn insert_lead(&self, lead: &Lead) -> StoreResult<()>;
    async fn find_lead(&self, email: &str, mobile: &str) -> StoreResult<Option<Lead>>;
    async fn list_leads(&self) -> StoreResult<Vec<Lead>>;

    async fn insert_subscriber(&self, subscriber: &Subscriber) -> StoreResult<()>;
    async fn find_subscriber(&self, email: &str) -> StoreResult<Option<Subscriber>>;

    async fn insert_message(&self, message: &Message) -> StoreResult<()>;
    async fn list_messages(&self, project_id: &ObjectId) -> StoreResult<Vec<Message>>;
}
