use crate::credentials::Credentials;
use crate::notifier::Notifier;
use crate::store::Store;
use crate::token::TokenService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub tokens: TokenService,
    pub credentials: Credentials,
}
