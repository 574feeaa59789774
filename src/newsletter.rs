// src/newsletter.rs

use actix_web::{web, HttpResponse};
use bson::oid::ObjectId;
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::Subscriber;
use crate::store::{Store, StoreError};
use crate::validation::normalize_email;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

pub async fn subscribe(store: &dyn Store, info: SubscribeRequest) -> Result<Subscriber, ApiError> {
    let email = normalize_email(&info.email)?;
    if store.find_subscriber(&email).await?.is_some() {
        return Err(ApiError::conflict("Already subscribed"));
    }
    let subscriber = Subscriber {
        id: ObjectId::new(),
        email,
    };
    match store.insert_subscriber(&subscriber).await {
        Ok(()) => {}
        Err(StoreError::Duplicate) => return Err(ApiError::conflict("Already subscribed")),
        Err(e) => return Err(e.into()),
    }
    info!("Newsletter subscriber added {}", subscriber.id);
    Ok(subscriber)
}

/// POST /newsletter/subscribe
pub async fn add_subscriber(
    data: web::Data<AppState>,
    payload: web::Json<SubscribeRequest>,
) -> Result<HttpResponse, ApiError> {
    subscribe(data.store.as_ref(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "message": "Subscribed successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;

    #[actix_web::test]
    async fn second_subscription_is_conflict() {
        let fx = fixture();
        let store = fx.state.store.as_ref();
        let first = subscribe(store, SubscribeRequest { email: "Reader@Example.com".into() })
            .await
            .unwrap();
        assert_eq!(first.email, "reader@example.com");

        let again = subscribe(store, SubscribeRequest { email: "reader@example.com".into() }).await;
        assert!(matches!(again, Err(ApiError::Conflict(_))));
    }

    #[actix_web::test]
    async fn invalid_address_is_rejected() {
        let fx = fixture();
        let res = subscribe(fx.state.store.as_ref(), SubscribeRequest { email: "nope".into() }).await;
        assert!(matches!(res, Err(ApiError::BadRequest(_))));
    }
}
