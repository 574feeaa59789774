//! In-process [`Store`] used by the test suite.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::models::{Bill, Lead, Message, Project, Subscriber, User};

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    projects: Vec<Project>,
    bills: Vec<Bill>,
    leads: Vec<Lead>,
    newsletter: Vec<Subscriber>,
    messages: Vec<Message>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
    fail_bill_writes: AtomicBool,
    fail_project_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent bill insert/save fail.
    pub fn fail_bill_writes(&self, fail: bool) {
        self.fail_bill_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent project save fail.
    pub fn fail_project_writes(&self, fail: bool) {
        self.fail_project_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn bill_count(&self) -> usize {
        self.inner.read().await.bills.len()
    }

    pub async fn lead_count(&self) -> usize {
        self.inner.read().await.leads.len()
    }

    pub async fn user_count(&self) -> usize {
        self.inner.read().await.users.len()
    }

    fn check(flag: &AtomicBool, what: &str) -> StoreResult<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("{what} writes disabled")));
        }
        Ok(())
    }
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(key(item)));
    items
}

fn replace_by<T>(items: &mut [T], value: &T, same: impl Fn(&T) -> bool) -> bool
where
    T: Clone,
{
    match items.iter_mut().find(|item| same(item)) {
        Some(slot) => {
            *slot = value.clone();
            true
        }
        None => false,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate);
        }
        inner.users.push(user.clone());
        Ok(())
    }

    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.iter().find(|u| u.id == *id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let wanted = email.to_lowercase();
        Ok(self
            .inner
            .read()
            .await
            .users
            .iter()
            .find(|u| u.email.to_lowercase() == wanted)
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = self.inner.read().await.users.clone();
        Ok(newest_first(users, |u| u.id))
    }

    async fn save_user(&self, user: &User) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(replace_by(&mut inner.users, user, |u| u.id == user.id))
    }

    async fn insert_project(&self, project: &Project) -> StoreResult<()> {
        self.inner.write().await.projects.push(project.clone());
        Ok(())
    }

    async fn find_project(&self, id: &ObjectId) -> StoreResult<Option<Project>> {
        Ok(self.inner.read().await.projects.iter().find(|p| p.id == *id).cloned())
    }

    async fn list_projects(&self, created_by: Option<&ObjectId>) -> StoreResult<Vec<Project>> {
        let projects = self
            .inner
            .read()
            .await
            .projects
            .iter()
            .filter(|p| created_by.map_or(true, |id| p.created_by == *id))
            .cloned()
            .collect();
        Ok(newest_first(projects, |p| (p.created_at, p.id)))
    }

    async fn save_project(&self, project: &Project) -> StoreResult<bool> {
        Self::check(&self.fail_project_writes, "project")?;
        let mut inner = self.inner.write().await;
        Ok(replace_by(&mut inner.projects, project, |p| p.id == project.id))
    }

    async fn insert_bill(&self, bill: &Bill) -> StoreResult<()> {
        Self::check(&self.fail_bill_writes, "bill")?;
        self.inner.write().await.bills.push(bill.clone());
        Ok(())
    }

    async fn find_bill(&self, id: &ObjectId) -> StoreResult<Option<Bill>> {
        Ok(self.inner.read().await.bills.iter().find(|b| b.id == *id).cloned())
    }

    async fn list_bills(&self, user_id: Option<&ObjectId>) -> StoreResult<Vec<Bill>> {
        let bills = self
            .inner
            .read()
            .await
            .bills
            .iter()
            .filter(|b| user_id.map_or(true, |id| b.user_id == *id))
            .cloned()
            .collect();
        Ok(newest_first(bills, |b| (b.issued_on, b.id)))
    }

    async fn save_bill(&self, bill: &Bill) -> StoreResult<bool> {
        Self::check(&self.fail_bill_writes, "bill")?;
        let mut inner = self.inner.write().await;
        Ok(replace_by(&mut inner.bills, bill, |b| b.id == bill.id))
    }

    async fn insert_lead(&self, lead: &Lead) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .leads
            .iter()
            .any(|l| l.email == lead.email && l.mobile == lead.mobile)
        {
            return Err(StoreError::Duplicate);
        }
        inner.leads.push(lead.clone());
        Ok(())
    }

    async fn find_lead(&self, email: &str, mobile: &str) -> StoreResult<Option<Lead>> {
        Ok(self
            .inner
            .read()
            .await
            .leads
            .iter()
            .find(|l| l.email == email && l.mobile == mobile)
            .cloned())
    }

    async fn list_leads(&self) -> StoreResult<Vec<Lead>> {
        let leads = self.inner.read().await.leads.clone();
        Ok(newest_first(leads, |l| (l.created_at, l.id)))
    }

    async fn insert_subscriber(&self, subscriber: &Subscriber) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.newsletter.iter().any(|s| s.email == subscriber.email) {
            return Err(StoreError::Duplicate);
        }
        inner.newsletter.push(subscriber.clone());
        Ok(())
    }

    async fn find_subscriber(&self, email: &str) -> StoreResult<Option<Subscriber>> {
        Ok(self
            .inner
            .read()
            .await
            .newsletter
            .iter()
            .find(|s| s.email == email)
            .cloned())
    }

    async fn insert_message(&self, message: &Message) -> StoreResult<()> {
        self.inner.write().await.messages.push(message.clone());
        Ok(())
    }

    async fn list_messages(&self, project_id: &ObjectId) -> StoreResult<Vec<Message>> {
        let messages = self
            .inner
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.project_id == *project_id)
            .cloned()
            .collect();
        Ok(newest_first(messages, |m| (m.created_at, m.id)))
    }
}
