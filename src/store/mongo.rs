// src/store/mongo.rs

use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use futures_util::TryStreamExt;
use log::info;
use mongodb::{
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, Collation, CollationStrength, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};

use super::{Store, StoreError, StoreResult};
use crate::models::{Bill, Lead, Message, Project, Subscriber, User};

const USERS: &str = "users";
const PROJECTS: &str = "projects";
const BILLS: &str = "bills";
const LEADS: &str = "leads";
const NEWSLETTER: &str = "newsletter";
const MESSAGES: &str = "messages";

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn init(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        info!("Connected to MongoDB database {}", db_name);
        Ok(MongoStore { db })
    }

    /// Unique indexes backing the email and lead uniqueness rules.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = || IndexOptions::builder().unique(true).build();
        self.db
            .collection::<Document>(USERS)
            .create_index(IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build())
            .await?;
        self.db
            .collection::<Document>(LEADS)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1, "mobile": 1 })
                    .options(unique())
                    .build(),
            )
            .await?;
        self.db
            .collection::<Document>(NEWSLETTER)
            .create_index(IndexModel::builder().keys(doc! { "email": 1 }).options(unique()).build())
            .await?;
        info!("MongoDB indexes ensured on {}", self.db.name());
        Ok(())
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn projects(&self) -> Collection<Project> {
        self.db.collection(PROJECTS)
    }

    fn bills(&self) -> Collection<Bill> {
        self.db.collection(BILLS)
    }

    fn leads(&self) -> Collection<Lead> {
        self.db.collection(LEADS)
    }

    fn newsletter(&self) -> Collection<Subscriber> {
        self.db.collection(NEWSLETTER)
    }

    fn messages(&self) -> Collection<Message> {
        self.db.collection(MESSAGES)
    }
}

fn classify(err: MongoError) -> StoreError {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
        if write_error.code == DUPLICATE_KEY {
            return StoreError::Duplicate;
        }
    }
    StoreError::Database(err)
}

async fn insert<T>(coll: Collection<T>, value: &T) -> StoreResult<()>
where
    T: Serialize + Send + Sync,
{
    coll.insert_one(value).await.map_err(classify)?;
    Ok(())
}

async fn find_sorted<T>(coll: Collection<T>, filter: Document, sort_field: &str) -> StoreResult<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    let mut sort = Document::new();
    sort.insert(sort_field, -1);
    let cursor = coll.find(filter).sort(sort).await?;
    Ok(cursor.try_collect().await?)
}

async fn replace<T>(coll: Collection<T>, id: ObjectId, value: &T) -> StoreResult<bool>
where
    T: Serialize + Send + Sync,
{
    let res = coll.replace_one(doc! { "_id": id }, value).await.map_err(classify)?;
    Ok(res.matched_count == 1)
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        insert(self.users(), user).await
    }

    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": *id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let case_insensitive = Collation::builder()
            .locale("en")
            .strength(CollationStrength::Secondary)
            .build();
        Ok(self
            .users()
            .find_one(doc! { "email": email })
            .collation(case_insensitive)
            .await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        find_sorted(self.users(), doc! {}, "_id").await
    }

    async fn save_user(&self, user: &User) -> StoreResult<bool> {
        replace(self.users(), user.id, user).await
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<()> {
        insert(self.projects(), project).await
    }

    async fn find_project(&self, id: &ObjectId) -> StoreResult<Option<Project>> {
        Ok(self.projects().find_one(doc! { "_id": *id }).await?)
    }

    async fn list_projects(&self, created_by: Option<&ObjectId>) -> StoreResult<Vec<Project>> {
        let filter = match created_by {
            Some(id) => doc! { "created_by": *id },
            None => doc! {},
        };
        find_sorted(self.projects(), filter, "created_at").await
    }

    async fn save_project(&self, project: &Project) -> StoreResult<bool> {
        replace(self.projects(), project.id, project).await
    }

    async fn insert_bill(&self, bill: &Bill) -> StoreResult<()> {
        insert(self.bills(), bill).await
    }

    async fn find_bill(&self, id: &ObjectId) -> StoreResult<Option<Bill>> {
        Ok(self.bills().find_one(doc! { "_id": *id }).await?)
    }

    async fn list_bills(&self, user_id: Option<&ObjectId>) -> StoreResult<Vec<Bill>> {
        let filter = match user_id {
            Some(id) => doc! { "user_id": *id },
            None => doc! {},
        };
        find_sorted(self.bills(), filter, "issued_on").await
    }

    async fn save_bill(&self, bill: &Bill) -> StoreResult<bool> {
        replace(self.bills(), bill.id, bill).await
    }

    async fn insert_lead(&self, lead: &Lead) -> StoreResult<()> {
        insert(self.leads(), lead).await
    }

    async fn find_lead(&self, email: &str, mobile: &str) -> StoreResult<Option<Lead>> {
        Ok(self
            .leads()
            .find_one(doc! { "email": email, "mobile": mobile })
            .await?)
    }

    async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
        find_sorted(self.leads(), doc! {}, "created_at").await
    }

    async fn insert_subscriber(&self, subscriber: &Subscriber) -> StoreResult<()> {
        insert(self.newsletter(), subscriber).await
    }

    async fn find_subscriber(&self, email: &str) -> StoreResult<Option<Subscriber>> {
        Ok(self.newsletter().find_one(doc! { "email": email }).await?)
    }

    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        insert(self.messages(), message).await
    }

    async fn list_messages(&self, project_id: &ObjectId) -> StoreResult<Vec<Message>> {
        find_sorted(self.messages(), doc! { "project_id": *project_id }, "created_at").await
    }
}
