// src/lead.rs

use actix_web::{web, HttpResponse};
use bson::{oid::ObjectId, DateTime as BsonDateTime};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{Lead, LeadView};
use crate::notifier::{lead_email, Notifier};
use crate::store::{Store, StoreError};
use crate::validation::{normalize_email, required};

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub name: String,
    pub email: String,
    pub mobile: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub project_type: String,
    #[serde(default, alias = "details")]
    pub project_details: String,
}

#[derive(Debug)]
pub enum LeadOutcome {
    Created(Lead),
    /// Same (email, mobile) was already captured; nothing was written.
    Duplicate,
}

/// Captures a lead and tells the admin about it. Delivery problems are
/// logged and never fail the capture.
pub async fn create(
    store: &dyn Store,
    notifier: &dyn Notifier,
    info: CreateLeadRequest,
) -> Result<LeadOutcome, ApiError> {
    let name = required("name", &info.name)?;
    let email = normalize_email(&info.email)?;
    let mobile = required("mobile", &info.mobile)?;

    if store.find_lead(&email, &mobile).await?.is_some() {
        info!("Duplicate lead ignored");
        return Ok(LeadOutcome::Duplicate);
    }

    let lead = Lead {
        id: ObjectId::new(),
        name,
        email,
        mobile,
        project: info.project.trim().to_string(),
        project_type: info.project_type.trim().to_string(),
        project_details: info.project_details.trim().to_string(),
        created_at: BsonDateTime::now(),
    };
    match store.insert_lead(&lead).await {
        Ok(()) => {}
        Err(StoreError::Duplicate) => return Ok(LeadOutcome::Duplicate),
        Err(e) => return Err(e.into()),
    }
    info!("Lead created {}", lead.id);

    match notifier.admin_address() {
        Some(admin) => {
            if let Err(e) = notifier.send(lead_email(admin, &lead)).await {
                error!("[EMAIL ERROR] lead {}: {}", lead.id, e);
            }
        }
        None => warn!("No admin address configured; lead {} not announced", lead.id),
    }

    Ok(LeadOutcome::Created(lead))
}

pub async fn list_all(store: &dyn Store) -> Result<Vec<Lead>, ApiError> {
    Ok(store.list_leads().await?)
}

/// POST /lead/create
pub async fn create_lead(
    data: web::Data<AppState>,
    lead_info: web::Json<CreateLeadRequest>,
) -> Result<HttpResponse, ApiError> {
    let outcome = create(data.store.as_ref(), data.notifier.as_ref(), lead_info.into_inner()).await?;
    Ok(match outcome {
        LeadOutcome::Created(lead) => HttpResponse::Created().json(json!({
            "status": "success",
            "message": "Lead created successfully",
            "lead": LeadView::from(&lead),
        })),
        LeadOutcome::Duplicate => HttpResponse::Ok().json(json!({
            "status": "failed",
            "message": "Lead already exists",
        })),
    })
}

/// GET /lead/all
///
/// Unauthenticated, as it has always been. Whether it should be admin-only
/// is still undecided.
pub async fn list_leads(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let leads = list_all(data.store.as_ref()).await?;
    let views: Vec<LeadView> = leads.iter().map(LeadView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}
