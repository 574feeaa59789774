// src/auth.rs

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http, web, Error, HttpMessage, HttpResponse, ResponseError,
};
use bson::{oid::ObjectId, DateTime as BsonDateTime};
use futures::future::{ok, Ready};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app_state::AppState;
use crate::authz::Requester;
use crate::credentials::Credentials;
use crate::error::ApiError;
use crate::models::{Role, User, UserView};
use crate::store::{Store, StoreError};
use crate::token::TokenService;
use crate::validation::{normalize_email, required};

const MIN_PASSWORD_LEN: usize = 6;
const INVALID_LOGIN: &str = "Invalid email or password";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserView,
}

/// Stores a new customer account and opens a session for it.
pub async fn register(
    store: &dyn Store,
    credentials: &Credentials,
    tokens: &TokenService,
    info: SignupRequest,
) -> Result<AuthSession, ApiError> {
    let full_name = required("full_name", &info.full_name)?;
    let email = normalize_email(&info.email)?;
    if info.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let user = User {
        id: ObjectId::new(),
        full_name,
        email,
        phone: info.phone.trim().to_string(),
        location: info.location.trim().to_string(),
        password: credentials.hash(&info.password)?,
        role: Role::Customer,
        created_at: Some(BsonDateTime::now()),
    };
    match store.insert_user(&user).await {
        Ok(()) => {}
        // Lost a race against a concurrent signup for the same address.
        Err(StoreError::Duplicate) => return Err(ApiError::conflict("Email already registered")),
        Err(e) => return Err(e.into()),
    }
    info!("User created {}", user.id);

    let token = tokens.issue(&user.id.to_hex(), user.role)?;
    Ok(AuthSession {
        token,
        user: UserView::from(&user),
    })
}

/// Unknown email and wrong password fail identically.
pub async fn authenticate(
    store: &dyn Store,
    credentials: &Credentials,
    tokens: &TokenService,
    info: LoginRequest,
) -> Result<AuthSession, ApiError> {
    let email = info.email.trim().to_lowercase();
    let mut user = match store.find_user_by_email(&email).await? {
        Some(user) => user,
        None => {
            debug!("Login for unknown email");
            return Err(ApiError::unauthorized(INVALID_LOGIN));
        }
    };
    if !credentials.verify(&info.password, &user.password) {
        debug!("Password mismatch for {}", user.id);
        return Err(ApiError::unauthorized(INVALID_LOGIN));
    }

    if credentials.needs_rehash(&user.password) {
        match credentials.hash(&info.password) {
            Ok(fresh) => {
                user.password = fresh;
                match store.save_user(&user).await {
                    Ok(_) => info!("Migrated password hash for {}", user.id),
                    Err(e) => warn!("Could not migrate password hash for {}: {}", user.id, e),
                }
            }
            Err(e) => warn!("Could not rehash password for {}: {}", user.id, e),
        }
    }

    let token = tokens.issue(&user.id.to_hex(), user.role)?;
    Ok(AuthSession {
        token,
        user: UserView::from(&user),
    })
}

/// The caller's account; `NotFound` when it was deleted after the token was issued.
pub async fn current_user(store: &dyn Store, requester: &Requester) -> Result<UserView, ApiError> {
    match store.find_user(&requester.user_id).await? {
        Some(user) => Ok(UserView::from(&user)),
        None => Err(ApiError::not_found("User not found")),
    }
}

/// POST /auth/signup
pub async fn signup(
    data: web::Data<AppState>,
    signup_info: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    let session = register(
        data.store.as_ref(),
        &data.credentials,
        &data.tokens,
        signup_info.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "message": "User created successfully",
        "token": session.token,
        "user": session.user,
    })))
}

/// POST /auth/login
pub async fn login(
    data: web::Data<AppState>,
    login_info: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let session = authenticate(
        data.store.as_ref(),
        &data.credentials,
        &data.tokens,
        login_info.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "token": session.token,
        "user": session.user,
    })))
}

/// GET /auth/me
pub async fn me(data: web::Data<AppState>, requester: Requester) -> Result<HttpResponse, ApiError> {
    let user = current_user(data.store.as_ref(), &requester).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// POST /auth/logout. Tokens are stateless, so there is nothing to revoke.
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "success", "message": "Logged out" }))
}

/// Decodes `Authorization: Bearer <token>` into [`crate::token::Claims`] request
/// extensions. Requests without a token pass through; a bad token is rejected.
#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|value| value.trim().to_string());

        if let Some(token) = token {
            let decoded = match req.app_data::<web::Data<AppState>>() {
                Some(state) => state.tokens.decode(&token),
                None => {
                    error!("AppState missing; cannot verify bearer token");
                    Err(ApiError::Internal("application state missing".into()))
                }
            };
            match decoded {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                }
                Err(e) => {
                    let (req_parts, _payload) = req.into_parts();
                    let srv_resp = ServiceResponse::new(req_parts, e.error_response());
                    return Box::pin(async move { Ok(srv_resp) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}
