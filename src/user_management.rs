use actix_web::{web, HttpResponse};

use crate::app_state::AppState;
use crate::auth::current_user;
use crate::authz::{Capability, Requester};
use crate::error::ApiError;
use crate::models::UserView;
use crate::serialize::parse_id;
use crate::store::Store;

pub async fn get_by_id(store: &dyn Store, raw_id: &str, requester: &Requester) -> Result<UserView, ApiError> {
    requester.require(Capability::Admin)?;
    let id = parse_id(raw_id).ok_or_else(|| ApiError::not_found("User not found"))?;
    match store.find_user(&id).await? {
        Some(user) => Ok(UserView::from(&user)),
        None => Err(ApiError::not_found("User not found")),
    }
}

pub async fn list_all(store: &dyn Store, requester: &Requester) -> Result<Vec<UserView>, ApiError> {
    requester.require(Capability::Admin)?;
    let users = store.list_users().await?;
    Ok(users.iter().map(UserView::from).collect())
}

/// GET /user/me
pub async fn get_me(data: web::Data<AppState>, requester: Requester) -> Result<HttpResponse, ApiError> {
    let user = current_user(data.store.as_ref(), &requester).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// GET /user/details/{id}
pub async fn get_user_by_id(
    path: web::Path<String>,
    data: web::Data<AppState>,
    requester: Requester,
) -> Result<HttpResponse, ApiError> {
    let user = get_by_id(data.store.as_ref(), &path, &requester).await?;
    Ok(HttpResponse::Ok().json(user))
}

/// GET /user/all
pub async fn get_all_users(data: web::Data<AppState>, requester: Requester) -> Result<HttpResponse, ApiError> {
    let users = list_all(data.store.as_ref(), &requester).await?;
    Ok(HttpResponse::Ok().json(users))
}
