// src/bill.rs

use actix_web::{web, HttpResponse};
use bson::{oid::ObjectId, DateTime as BsonDateTime};
use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::json;

use crate::app_state::AppState;
use crate::authz::{Capability, Requester};
use crate::error::ApiError;
use crate::models::{Bill, BillView, PaymentStatus};
use crate::serialize::{parse_id, parse_timestamp};
use crate::store::Store;

#[derive(Debug, Deserialize)]
pub struct CreateBillRequest {
    pub project_id: String,
    pub amount: f64,
    pub due_date: String,
}

/// Raises an unpaid bill against a project, owned by the project's creator.
pub async fn create(store: &dyn Store, requester: &Requester, info: CreateBillRequest) -> Result<Bill, ApiError> {
    requester.require(Capability::Admin)?;
    if !info.amount.is_finite() || info.amount <= 0.0 {
        return Err(ApiError::bad_request("amount must be greater than zero"));
    }
    let due_date = parse_timestamp(&info.due_date)
        .ok_or_else(|| ApiError::bad_request("due_date is not a valid date"))?;
    let project_id = parse_id(&info.project_id).ok_or_else(|| ApiError::not_found("Project not found"))?;
    let project = store
        .find_project(&project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let bill = Bill {
        id: ObjectId::new(),
        project_id: project.id,
        user_id: project.created_by,
        amount: info.amount,
        due_date,
        issued_on: BsonDateTime::now(),
        status: PaymentStatus::Unpaid,
        paid_on: None,
    };
    store.insert_bill(&bill).await?;
    info!("Bill {} issued for project {}", bill.id, project.id);
    Ok(bill)
}

pub async fn list_mine(store: &dyn Store, requester: &Requester) -> Result<Vec<Bill>, ApiError> {
    requester.require(Capability::Authenticated)?;
    Ok(store.list_bills(Some(&requester.user_id)).await?)
}

pub async fn list_all(store: &dyn Store, requester: &Requester) -> Result<Vec<Bill>, ApiError> {
    requester.require(Capability::Admin)?;
    Ok(store.list_bills(None).await?)
}

/// Marks a bill paid and flags its project as paid.
///
/// If the project write fails the bill is written back to its previous state.
pub async fn mark_paid(store: &dyn Store, raw_id: &str, requester: &Requester) -> Result<Bill, ApiError> {
    let id = parse_id(raw_id).ok_or_else(|| ApiError::not_found("Bill not found"))?;
    let mut bill = store
        .find_bill(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Bill not found"))?;
    requester.require(Capability::AdminOrOwner(&bill.user_id))?;
    if bill.status == PaymentStatus::Paid {
        debug!("Bill {} already paid", bill.id);
        return Ok(bill);
    }

    let previous = bill.clone();
    let now = BsonDateTime::now();
    bill.status = PaymentStatus::Paid;
    bill.paid_on = Some(now);
    if !store.save_bill(&bill).await? {
        return Err(ApiError::not_found("Bill not found"));
    }

    let project = match store.find_project(&bill.project_id).await {
        Ok(found) => found,
        Err(e) => {
            restore_bill(store, &previous).await;
            return Err(e.into());
        }
    };
    match project {
        Some(mut project) => {
            project.payment_status = PaymentStatus::Paid;
            project.updated_at = now;
            if let Err(e) = store.save_project(&project).await {
                error!("Project {} update failed after paying bill {}: {}", project.id, bill.id, e);
                restore_bill(store, &previous).await;
                return Err(e.into());
            }
        }
        None => warn!("Bill {} paid but project {} no longer exists", bill.id, bill.project_id),
    }

    info!("Bill {} paid by {}", bill.id, requester.user_id);
    Ok(bill)
}

async fn restore_bill(store: &dyn Store, previous: &Bill) {
    if let Err(e) = store.save_bill(previous).await {
        error!("Could not restore bill {}: {}", previous.id, e);
    }
}

/// POST /bill/create
pub async fn create_bill(
    data: web::Data<AppState>,
    requester: Requester,
    bill_info: web::Json<CreateBillRequest>,
) -> Result<HttpResponse, ApiError> {
    let bill = create(data.store.as_ref(), &requester, bill_info.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "message": "Bill created",
        "bill": BillView::from(&bill),
    })))
}

/// GET /bill/my
pub async fn my_bills(data: web::Data<AppState>, requester: Requester) -> Result<HttpResponse, ApiError> {
    let bills = list_mine(data.store.as_ref(), &requester).await?;
    let views: Vec<BillView> = bills.iter().map(BillView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// GET /bill/all
pub async fn all_bills(data: web::Data<AppState>, requester: Requester) -> Result<HttpResponse, ApiError> {
    let bills = list_all(data.store.as_ref(), &requester).await?;
    let views: Vec<BillView> = bills.iter().map(BillView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

/// PUT /bill/payment/{id}
pub async fn pay_bill(
    data: web::Data<AppState>,
    requester: Requester,
    bill_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let bill = mark_paid(data.store.as_ref(), &bill_id, &requester).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Bill marked as paid",
        "bill": BillView::from(&bill),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Project, Role};
    use crate::test_support::{fixture, seed_user, Fixture};

    struct Scene {
        admin: Requester,
        owner: Requester,
        stranger: Requester,
        project: Project,
    }

    async fn scene(fx: &Fixture) -> Scene {
        let (_, admin) = seed_user(fx, "admin@example.com", "password1", Role::Admin).await;
        let (_, owner) = seed_user(fx, "owner@example.com", "password1", Role::Customer).await;
        let (_, stranger) = seed_user(fx, "stranger@example.com", "password1", Role::Customer).await;
        let project = Project::new(
            "Site".into(),
            String::new(),
            String::new(),
            900.0,
            owner.user_id,
            BsonDateTime::now(),
        );
        fx.store.insert_project(&project).await.unwrap();
        Scene {
            admin,
            owner,
            stranger,
            project,
        }
    }

    fn request(project: &Project, amount: f64) -> CreateBillRequest {
        CreateBillRequest {
            project_id: project.id.to_hex(),
            amount,
            due_date: "2025-06-30T00:00:00Z".into(),
        }
    }

    #[actix_web::test]
    async fn admin_issues_bill_to_project_creator() {
        let fx = fixture();
        let s = scene(&fx).await;
        let bill = create(fx.state.store.as_ref(), &s.admin, request(&s.project, 300.0))
            .await
            .unwrap();
        assert_eq!(bill.user_id, s.owner.user_id);
        assert_eq!(bill.status, PaymentStatus::Unpaid);
        assert!(bill.paid_on.is_none());

        let mine = list_mine(fx.state.store.as_ref(), &s.owner).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(list_mine(fx.state.store.as_ref(), &s.stranger).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn only_admin_creates_and_lists_all() {
        let fx = fixture();
        let s = scene(&fx).await;
        let store = fx.state.store.as_ref();
        assert!(matches!(
            create(store, &s.owner, request(&s.project, 300.0)).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(list_all(store, &s.owner).await, Err(ApiError::Forbidden(_))));
        assert!(list_all(store, &s.admin).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn create_validates_input() {
        let fx = fixture();
        let s = scene(&fx).await;
        let store = fx.state.store.as_ref();
        let mut missing = request(&s.project, 10.0);
        missing.project_id = ObjectId::new().to_hex();
        assert!(matches!(create(store, &s.admin, missing).await, Err(ApiError::NotFound(_))));

        let mut bad_date = request(&s.project, 10.0);
        bad_date.due_date = "someday".into();
        assert!(matches!(create(store, &s.admin, bad_date).await, Err(ApiError::BadRequest(_))));

        assert!(matches!(
            create(store, &s.admin, request(&s.project, 0.0)).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[actix_web::test]
    async fn paying_a_bill_flags_the_project() {
        let fx = fixture();
        let s = scene(&fx).await;
        let store = fx.state.store.as_ref();
        let bill = create(store, &s.admin, request(&s.project, 300.0)).await.unwrap();

        assert!(matches!(
            mark_paid(store, &bill.id.to_hex(), &s.stranger).await,
            Err(ApiError::Forbidden(_))
        ));

        let paid = mark_paid(store, &bill.id.to_hex(), &s.owner).await.unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert!(paid.paid_on.is_some());
        let project = store.find_project(&s.project.id).await.unwrap().unwrap();
        assert_eq!(project.payment_status, PaymentStatus::Paid);

        let again = mark_paid(store, &bill.id.to_hex(), &s.admin).await.unwrap();
        assert_eq!(again.paid_on, paid.paid_on);
    }

    #[actix_web::test]
    async fn unknown_bill_is_not_found() {
        let fx = fixture();
        let s = scene(&fx).await;
        let store = fx.state.store.as_ref();
        assert!(matches!(mark_paid(store, "zzz", &s.admin).await, Err(ApiError::NotFound(_))));
        assert!(matches!(
            mark_paid(store, &ObjectId::new().to_hex(), &s.admin).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn failed_project_write_restores_bill() {
        let fx = fixture();
        let s = scene(&fx).await;
        let store = fx.state.store.as_ref();
        let bill = create(store, &s.admin, request(&s.project, 300.0)).await.unwrap();
        fx.store.fail_project_writes(true);

        assert!(mark_paid(store, &bill.id.to_hex(), &s.owner).await.is_err());
        let stored = store.find_bill(&bill.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PaymentStatus::Unpaid);
        assert!(stored.paid_on.is_none());
    }
}
