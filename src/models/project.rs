use bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

use super::bill::PaymentStatus;
use crate::serialize::{hex_ids, iso, iso_opt};

/// Delivery pipeline every new project starts with.
pub const DEFAULT_PHASES: [&str; 5] = ["Requirement", "Design", "Development", "Testing", "Deployment"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Pending,
    Accepted,
    InProgress,
    Ongoing,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    #[serde(default)]
    pub status: PhaseStatus,
    /// Only set while `status` is `Completed`.
    pub completed_on: Option<BsonDateTime>,
}

impl Phase {
    pub fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: PhaseStatus::Pending,
            completed_on: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub status: ProjectStatus,
    pub created_by: ObjectId,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub assigned_team: Vec<ObjectId>,
    pub project_lead_id: Option<ObjectId>,
    #[serde(default)]
    pub progress_percentage: i32,
    pub demo_link: Option<String>,
    pub payment_link: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub project_amount: f64,
    #[serde(default)]
    pub paid_amount: f64,
}

impl Project {
    pub fn new(
        title: String,
        description: String,
        service_type: String,
        project_amount: f64,
        created_by: ObjectId,
        now: BsonDateTime,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            title,
            description,
            service_type,
            status: ProjectStatus::Pending,
            created_by,
            created_at: now,
            updated_at: now,
            phases: DEFAULT_PHASES.iter().map(|name| Phase::pending(name)).collect(),
            tech_stack: Vec::new(),
            assigned_team: Vec::new(),
            project_lead_id: None,
            progress_percentage: 0,
            demo_link: None,
            payment_link: None,
            payment_status: PaymentStatus::Unpaid,
            project_amount,
            paid_amount: 0.0,
        }
    }

    pub fn remaining_amount(&self) -> f64 {
        self.project_amount - self.paid_amount
    }

    /// Replaces the pipeline and recomputes the derived progress.
    pub fn set_phases(&mut self, phases: Vec<Phase>) {
        self.phases = phases;
        self.progress_percentage = progress_percentage(&self.phases);
    }
}

/// `round(100 * completed / total)` with ties to even, 0 for an empty pipeline.
pub fn progress_percentage(phases: &[Phase]) -> i32 {
    let total = phases.len() as i64;
    if total == 0 {
        return 0;
    }
    let completed = phases
        .iter()
        .filter(|p| p.status == PhaseStatus::Completed)
        .count() as i64;
    let scaled = 100 * completed;
    let (quotient, remainder) = (scaled / total, scaled % total);
    let rounded = match (2 * remainder).cmp(&total) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal if quotient % 2 == 1 => quotient + 1,
        _ => quotient,
    };
    rounded as i32
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseView {
    pub name: String,
    pub status: PhaseStatus,
    pub completed_on: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub service_type: String,
    pub status: ProjectStatus,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
    pub phases: Vec<PhaseView>,
    pub tech_stack: Vec<String>,
    pub assigned_team: Vec<String>,
    pub project_lead_id: Option<String>,
    pub progress_percentage: i32,
    pub demo_link: Option<String>,
    pub payment_link: Option<String>,
    pub payment_status: PaymentStatus,
    pub project_amount: f64,
    pub paid_amount: f64,
}

impl From<&Project> for ProjectView {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id.to_hex(),
            title: p.title.clone(),
            description: p.description.clone(),
            service_type: p.service_type.clone(),
            status: p.status,
            created_by: p.created_by.to_hex(),
            created_at: iso(&p.created_at),
            updated_at: iso(&p.updated_at),
            phases: p
                .phases
                .iter()
                .map(|ph| PhaseView {
                    name: ph.name.clone(),
                    status: ph.status,
                    completed_on: iso_opt(&ph.completed_on),
                })
                .collect(),
            tech_stack: p.tech_stack.clone(),
            assigned_team: hex_ids(&p.assigned_team),
            project_lead_id: p.project_lead_id.map(|id| id.to_hex()),
            progress_percentage: p.progress_percentage,
            demo_link: p.demo_link.clone(),
            payment_link: p.payment_link.clone(),
            payment_status: p.payment_status,
            project_amount: p.project_amount,
            paid_amount: p.paid_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pipeline(completed: usize, total: usize) -> Vec<Phase> {
        (0..total)
            .map(|i| Phase {
                name: format!("phase-{i}"),
                status: if i < completed {
                    PhaseStatus::Completed
                } else {
                    PhaseStatus::Pending
                },
                completed_on: None,
            })
            .collect()
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(0, 5, 0)]
    #[case(1, 5, 20)]
    #[case(5, 5, 100)]
    #[case(1, 3, 33)]
    #[case(2, 3, 67)]
    #[case(1, 8, 12)]
    #[case(3, 8, 38)]
    #[case(1, 40, 2)]
    fn progress_is_rounded_share_of_completed(
        #[case] completed: usize,
        #[case] total: usize,
        #[case] expected: i32,
    ) {
        assert_eq!(progress_percentage(&pipeline(completed, total)), expected);
    }

    #[test]
    fn new_project_starts_with_pending_pipeline() {
        let p = Project::new(
            "Site".into(),
            "Landing page".into(),
            "web".into(),
            1200.0,
            ObjectId::new(),
            BsonDateTime::now(),
        );
        assert_eq!(p.status, ProjectStatus::Pending);
        assert_eq!(p.payment_status, PaymentStatus::Unpaid);
        assert_eq!(p.progress_percentage, 0);
        assert_eq!(p.paid_amount, 0.0);
        let names: Vec<_> = p.phases.iter().map(|ph| ph.name.as_str()).collect();
        assert_eq!(names, DEFAULT_PHASES);
        assert!(p.phases.iter().all(|ph| ph.status == PhaseStatus::Pending && ph.completed_on.is_none()));
    }

    #[test]
    fn view_encodes_ids_and_timestamps_as_strings() {
        let creator = ObjectId::new();
        let mut p = Project::new(
            "Site".into(),
            String::new(),
            String::new(),
            0.0,
            creator,
            BsonDateTime::from_millis(0),
        );
        p.project_lead_id = Some(creator);
        let member = ObjectId::new();
        p.assigned_team = vec![member, creator];
        let json = serde_json::to_value(ProjectView::from(&p)).unwrap();
        assert_eq!(json["created_by"], creator.to_hex());
        assert_eq!(json["project_lead_id"], creator.to_hex());
        assert_eq!(json["assigned_team"], serde_json::json!([member.to_hex(), creator.to_hex()]));
        assert_eq!(json["created_at"], "1970-01-01T00:00:00.000Z");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["payment_status"], "unpaid");
    }
}
