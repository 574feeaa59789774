//! Shared fixtures for unit and HTTP tests.

use std::sync::Arc;

use bson::{oid::ObjectId, DateTime as BsonDateTime};

use crate::app_state::AppState;
use crate::authz::Requester;
use crate::credentials::Credentials;
use crate::models::{Role, User};
use crate::notifier::testing::RecordingNotifier;
use crate::store::{memory::MemoryStore, Store};
use crate::token::TokenService;

pub const TEST_SECRET: &str = "test-secret";

pub struct Fixture {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn fixture() -> Fixture {
    fixture_with(RecordingNotifier::new())
}

pub fn fixture_with(notifier: RecordingNotifier) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(notifier);
    let state = AppState {
        store: store.clone(),
        notifier: notifier.clone(),
        tokens: TokenService::new(TEST_SECRET),
        credentials: Credentials::new(4),
    };
    Fixture {
        state,
        store,
        notifier,
    }
}

pub async fn seed_user(fx: &Fixture, email: &str, password: &str, role: Role) -> (User, Requester) {
    let user = User {
        id: ObjectId::new(),
        full_name: format!("{:?} user", role),
        email: email.to_string(),
        phone: String::new(),
        location: String::new(),
        password: fx.state.credentials.hash(password).unwrap(),
        role,
        created_at: Some(BsonDateTime::now()),
    };
    fx.store.insert_user(&user).await.unwrap();
    let requester = Requester {
        user_id: user.id,
        role,
    };
    (user, requester)
}

pub fn bearer(fx: &Fixture, requester: &Requester) -> String {
    let token = fx
        .state
        .tokens
        .issue(&requester.user_id.to_hex(), requester.role)
        .unwrap();
    format!("Bearer {}", token)
}
