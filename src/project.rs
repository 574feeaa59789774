// src/project.rs

use actix_web::{web, HttpResponse};
use bson::{oid::ObjectId, DateTime as BsonDateTime};
use log::{debug, error, info};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::authz::{Capability, Requester};
use crate::error::ApiError;
use crate::models::{
    Bill, Message, MessageView, PaymentStatus, Phase, PhaseStatus, Project, ProjectStatus,
    ProjectView,
};
use crate::serialize::{dedup_preserving_order, parse_id, parse_timestamp};
use crate::store::Store;
use crate::validation::{non_negative, required};

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default, alias = "amount")]
    pub project_amount: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseInput {
    pub name: String,
    #[serde(default)]
    pub status: PhaseStatus,
    pub completed_on: Option<String>,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub service_type: Option<String>,
    pub status: Option<ProjectStatus>,
    pub tech_stack: Option<Vec<String>>,
    pub project_lead_id: Option<String>,
    pub assigned_team: Option<Vec<String>>,
    pub demo_link: Option<String>,
    pub payment_link: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub phases: Option<Vec<PhaseInput>>,
    pub project_amount: Option<f64>,
    pub paid_amount: Option<f64>,
}

impl ProjectPatch {
    /// Amounts and payment status; these are settled by admins or through `pay`.
    pub fn touches_billing(&self) -> bool {
        self.project_amount.is_some() || self.paid_amount.is_some() || self.payment_status.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub project_id: String,
    #[serde(alias = "text")]
    pub message: String,
}

/// Result of settling a project's outstanding balance.
#[derive(Debug)]
pub struct PayOutcome {
    pub charged: f64,
    pub bill: Option<Bill>,
}

/// Missing documents and malformed ids both read as `NotFound`.
async fn load(store: &dyn Store, raw_id: &str) -> Result<Project, ApiError> {
    let id = parse_id(raw_id).ok_or_else(|| ApiError::not_found("Project not found"))?;
    store
        .find_project(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))
}

/// Loads a project the requester may act on.
async fn load_authorized(
    store: &dyn Store,
    raw_id: &str,
    requester: &Requester,
) -> Result<Project, ApiError> {
    let project = load(store, raw_id).await?;
    requester.require(Capability::AdminOrOwner(&project.created_by))?;
    Ok(project)
}

pub async fn create(
    store: &dyn Store,
    requester: &Requester,
    info: CreateProjectRequest,
) -> Result<Project, ApiError> {
    let title = required("title", &info.title)?;
    let amount = non_negative("project_amount", info.project_amount)?;
    let project = Project::new(
        title,
        info.description.trim().to_string(),
        info.service_type.trim().to_string(),
        amount,
        requester.user_id,
        BsonDateTime::now(),
    );
    store.insert_project(&project).await?;
    info!("Project created {} by {}", project.id, requester.user_id);
    Ok(project)
}

/// Admins see everything; everyone else only what they created. Newest first.
pub async fn list(store: &dyn Store, requester: &Requester) -> Result<Vec<Project>, ApiError> {
    let owner = if requester.is_admin() {
        None
    } else {
        Some(&requester.user_id)
    };
    Ok(store.list_projects(owner).await?)
}

pub async fn get(store: &dyn Store, raw_id: &str, requester: &Requester) -> Result<Project, ApiError> {
    load_authorized(store, raw_id, requester).await
}

fn parse_user_ids(field: &str, raw: &[String]) -> Result<Vec<ObjectId>, ApiError> {
    let ids = raw
        .iter()
        .map(|s| parse_id(s).ok_or_else(|| ApiError::bad_request(format!("{} contains an invalid id", field))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dedup_preserving_order(&ids))
}

/// Completed phases always carry a completion time; others never do.
fn normalize_phases(input: Vec<PhaseInput>, now: BsonDateTime) -> Result<Vec<Phase>, ApiError> {
    input
        .into_iter()
        .map(|p| {
            let name = required("phase name", &p.name)?;
            let completed_on = match p.status {
                PhaseStatus::Completed => Some(
                    p.completed_on
                        .as_deref()
                        .and_then(parse_timestamp)
                        .unwrap_or(now),
                ),
                _ => None,
            };
            Ok(Phase {
                name,
                status: p.status,
                completed_on,
            })
        })
        .collect()
}

/// Applies `patch` to `project`, validating everything first.
pub fn apply_patch(project: &mut Project, patch: ProjectPatch, now: BsonDateTime) -> Result<(), ApiError> {
    let title = patch.title.as_deref().map(|t| required("title", t)).transpose()?;
    let project_lead_id = match patch.project_lead_id.as_deref().map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(raw) => Some(Some(
            parse_id(raw).ok_or_else(|| ApiError::bad_request("project_lead_id is not a valid id"))?,
        )),
    };
    let assigned_team = patch
        .assigned_team
        .as_deref()
        .map(|raw| parse_user_ids("assigned_team", raw))
        .transpose()?;
    let project_amount = patch
        .project_amount
        .map(|v| non_negative("project_amount", v))
        .transpose()?;
    let paid_amount = patch
        .paid_amount
        .map(|v| non_negative("paid_amount", v))
        .transpose()?;
    let phases = patch.phases.map(|p| normalize_phases(p, now)).transpose()?;

    let final_amount = project_amount.unwrap_or(project.project_amount);
    let final_paid = paid_amount.unwrap_or(project.paid_amount);
    if final_paid > final_amount {
        return Err(ApiError::bad_request("paid_amount cannot exceed project_amount"));
    }

    if let Some(title) = title {
        project.title = title;
    }
    if let Some(description) = patch.description {
        project.description = description;
    }
    if let Some(service_type) = patch.service_type {
        project.service_type = service_type;
    }
    if let Some(status) = patch.status {
        project.status = status;
    }
    if let Some(tech_stack) = patch.tech_stack {
        let cleaned: Vec<String> = tech_stack
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        project.tech_stack = dedup_preserving_order(&cleaned);
    }
    if let Some(lead) = project_lead_id {
        project.project_lead_id = lead;
    }
    if let Some(team) = assigned_team {
        project.assigned_team = team;
    }
    if let Some(link) = patch.demo_link {
        project.demo_link = Some(link);
    }
    if let Some(link) = patch.payment_link {
        project.payment_link = Some(link);
    }
    if let Some(status) = patch.payment_status {
        project.payment_status = status;
    }
    if let Some(phases) = phases {
        project.set_phases(phases);
    }
    project.project_amount = final_amount;
    project.paid_amount = final_paid;
    project.updated_at = now;
    Ok(())
}

pub async fn update(
    store: &dyn Store,
    raw_id: &str,
    requester: &Requester,
    patch: ProjectPatch,
) -> Result<Project, ApiError> {
    let mut project = load_authorized(store, raw_id, requester).await?;
    if patch.touches_billing() {
        requester.require(Capability::Admin)?;
    }
    apply_patch(&mut project, patch, BsonDateTime::now())?;
    if !store.save_project(&project).await? {
        return Err(ApiError::not_found("Project not found"));
    }
    info!("Project updated {} by {}", project.id, requester.user_id);
    Ok(project)
}

/// Settles the full outstanding balance and records it as a paid bill.
///
/// The project write and the bill insert are separate documents; if the
/// insert fails the project is written back to its previous state.
pub async fn pay(store: &dyn Store, raw_id: &str, requester: &Requester) -> Result<PayOutcome, ApiError> {
    let mut project = load_authorized(store, raw_id, requester).await?;
    let remaining = project.remaining_amount();
    if remaining <= 0.0 {
        debug!("Project {} already settled", project.id);
        return Ok(PayOutcome {
            charged: 0.0,
            bill: None,
        });
    }

    let previous = project.clone();
    let now = BsonDateTime::now();
    project.paid_amount = project.project_amount;
    project.payment_status = PaymentStatus::Paid;
    project.updated_at = now;
    if !store.save_project(&project).await? {
        return Err(ApiError::not_found("Project not found"));
    }

    let bill = Bill {
        id: ObjectId::new(),
        project_id: project.id,
        user_id: project.created_by,
        amount: remaining,
        due_date: now,
        issued_on: now,
        status: PaymentStatus::Paid,
        paid_on: Some(now),
    };
    if let Err(e) = store.insert_bill(&bill).await {
        error!("Bill insert failed for project {}: {}; restoring project", project.id, e);
        if let Err(revert) = store.save_project(&previous).await {
            error!(
                "Could not restore project {} after failed payment: {}",
                previous.id, revert
            );
        }
        return Err(e.into());
    }

    info!("Project {} paid {} (bill {})", project.id, remaining, bill.id);
    Ok(PayOutcome {
        charged: remaining,
        bill: Some(bill),
    })
}

pub async fn send_message(
    store: &dyn Store,
    requester: &Requester,
    info: SendMessageRequest,
) -> Result<Message, ApiError> {
    let project = load_authorized(store, &info.project_id, requester).await?;
    let text = required("message", &info.message)?;
    let message = Message {
        id: ObjectId::new(),
        project_id: project.id,
        sender_id: requester.user_id,
        message: text,
        created_at: BsonDateTime::now(),
        read: false,
    };
    store.insert_message(&message).await?;
    info!("Message {} posted on project {}", message.id, project.id);
    Ok(message)
}

pub async fn list_messages(
    store: &dyn Store,
    raw_id: &str,
    requester: &Requester,
) -> Result<Vec<Message>, ApiError> {
    let project = load_authorized(store, raw_id, requester).await?;
    Ok(store.list_messages(&project.id).await?)
}

/// POST /project/create
pub async fn create_project(
    data: web::Data<AppState>,
    requester: Requester,
    project_info: web::Json<CreateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let project = create(data.store.as_ref(), &requester, project_info.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "message": "Project created",
        "project": ProjectView::from(&project),
    })))
}

/// GET /project/all
pub async fn list_projects(
    data: web::Data<AppState>,
    requester: Requester,
) -> Result<HttpResponse, ApiError> {
    let projects = list(data.store.as_ref(), &requester).await?;
    let views: Vec<ProjectView> = projects.iter().map(ProjectView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// GET /project/details/{id}
pub async fn get_project(
    data: web::Data<AppState>,
    requester: Requester,
    project_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let project = get(data.store.as_ref(), &project_id, &requester).await?;
    Ok(HttpResponse::Ok().json(ProjectView::from(&project)))
}

/// PUT /project/update/{id}
pub async fn update_project(
    data: web::Data<AppState>,
    requester: Requester,
    project_id: web::Path<String>,
    update_info: web::Json<ProjectPatch>,
) -> Result<HttpResponse, ApiError> {
    let project = update(
        data.store.as_ref(),
        &project_id,
        &requester,
        update_info.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Project updated",
        "project": ProjectView::from(&project),
    })))
}

/// POST /project/payment/{id}
pub async fn pay_project(
    data: web::Data<AppState>,
    requester: Requester,
    project_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let outcome = pay(data.store.as_ref(), &project_id, &requester).await?;
    let message = if outcome.bill.is_some() {
        "Payment processed"
    } else {
        "Project already fully paid"
    };
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": message,
        "paid_amount": outcome.charged,
    })))
}

/// POST /project/message
pub async fn post_message(
    data: web::Data<AppState>,
    requester: Requester,
    payload: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let message = send_message(data.store.as_ref(), &requester, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "message": "Message sent",
        "data": MessageView::from(&message),
    })))
}

/// GET /project/messages/{id}
pub async fn get_messages(
    data: web::Data<AppState>,
    requester: Requester,
    project_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let messages = list_messages(data.store.as_ref(), &project_id, &requester).await?;
    let views: Vec<MessageView> = messages.iter().map(MessageView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}
