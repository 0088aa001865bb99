//! Audit assignment
//!
//! Validates the request, runs eligibility and conflict-of-interest checks,
//! settles compensation, and persists the new audit record. Notification and
//! statistics delivery happen after the write and never fail the operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fundlock_core::{
    require_caller, Amount, Audit, AuditPriority, AuditStatus, Caller, Compensation, EngineError,
    EngineResult, Project, ProjectCategory, Specialization,
};
use fundlock_store::{
    AuditStore, AuditorDirectory, MetricEvent, MetricsSink, Notification, NotificationSink,
    ProjectStore, StoreError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::compensation::compute_compensation;
use crate::config::AuditConfig;
use crate::eligibility::{check_conflicts, validate_eligibility, ConflictInput, EligibilityInput};

const MAX_ASSIGNMENT_NOTES: usize = 1_000;

/// Caller-facing request to assign an auditor to a project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRequest {
    pub project_id: String,
    pub auditor_id: String,
    pub specializations: Vec<Specialization>,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub compensation: Option<Amount>,
    #[serde(default)]
    pub priority: AuditPriority,
    #[serde(default)]
    pub assignment_notes: Option<String>,
}

impl AssignmentRequest {
    /// Structural validation, before any lookup or side effect.
    pub fn validate(&self, config: &AuditConfig, now: DateTime<Utc>) -> EngineResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(EngineError::invalid_argument("projectId", "must not be empty"));
        }
        if self.auditor_id.trim().is_empty() {
            return Err(EngineError::invalid_argument("auditorId", "must not be empty"));
        }
        if self.specializations.is_empty() {
            return Err(EngineError::invalid_argument(
                "specializations",
                "at least one specialization is required",
            ));
        }
        if self.deadline <= now {
            return Err(EngineError::invalid_argument(
                "deadline",
                "must be in the future",
            ));
        }
        if let Some(compensation) = self.compensation {
            if compensation < config.min_requested_compensation
                || compensation > config.max_requested_compensation
            {
                return Err(EngineError::invalid_argument(
                    "compensation",
                    format!(
                        "must be between {} and {}",
                        config.min_requested_compensation, config.max_requested_compensation
                    ),
                ));
            }
        }
        if let Some(notes) = &self.assignment_notes {
            if notes.chars().count() > MAX_ASSIGNMENT_NOTES {
                return Err(EngineError::invalid_argument(
                    "assignmentNotes",
                    format!("must be at most {MAX_ASSIGNMENT_NOTES} characters"),
                ));
            }
        }
        Ok(())
    }
}

/// Response for a successful assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub audit_id: String,
    pub project_id: String,
    pub auditor_id: String,
    pub status: AuditStatus,
    pub assigned_at: DateTime<Utc>,
    pub compensation: Compensation,
    pub estimated_hours: u32,
    pub priority: AuditPriority,
    /// Non-blocking conflict-of-interest flags for manual review
    pub review_flags: Vec<String>,
}

/// Assigns auditors to projects
pub struct AssignmentService {
    projects: Arc<dyn ProjectStore>,
    audits: Arc<dyn AuditStore>,
    directory: Arc<dyn AuditorDirectory>,
    notifier: Arc<dyn NotificationSink>,
    metrics: Arc<dyn MetricsSink>,
    config: AuditConfig,
}

impl AssignmentService {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        audits: Arc<dyn AuditStore>,
        directory: Arc<dyn AuditorDirectory>,
        notifier: Arc<dyn NotificationSink>,
        metrics: Arc<dyn MetricsSink>,
        config: AuditConfig,
    ) -> Self {
        Self {
            projects,
            audits,
            directory,
            notifier,
            metrics,
            config,
        }
    }

    /// Assign an auditor to a project.
    ///
    /// Ordering: structural validation, then permission, then eligibility and
    /// conflict checks, then the audit-record write. Nothing is persisted if
    /// any check fails.
    pub async fn assign(
        &self,
        caller: Option<&Caller>,
        request: AssignmentRequest,
    ) -> EngineResult<AssignmentResponse> {
        let now = Utc::now();
        request.validate(&self.config, now)?;

        let caller = require_caller(caller)?;
        if !caller.is_admin() {
            return Err(EngineError::permission_denied(
                "only platform admins may assign auditors",
            ));
        }

        let project = self
            .projects
            .project(&request.project_id)
            .await
            .map_err(|e| map_not_found(e, "project"))?;
        let profile = self
            .directory
            .profile(&request.auditor_id)
            .await
            .map_err(|e| map_not_found(e, "auditor"))?;
        let active_count = self.audits.active_audit_count(&request.auditor_id).await?;

        validate_eligibility(
            &self.config,
            &EligibilityInput {
                profile: &profile,
                required_specializations: &request.specializations,
                category: project.category,
                active_audit_count: active_count,
                requested_compensation: request.compensation,
            },
        )?;

        let review_flags = check_conflicts(
            &self.config,
            &ConflictInput {
                auditor_id: &request.auditor_id,
                creator_id: &project.creator_id,
                has_contributed_to_project: self
                    .directory
                    .has_contributed(&request.auditor_id, &request.project_id)
                    .await?,
                audited_creator_projects: self
                    .audits
                    .audited_creator_project_count(&request.auditor_id, &project.creator_id)
                    .await?,
                shares_project_with_creator: self
                    .directory
                    .shares_project_with(&request.auditor_id, &project.creator_id)
                    .await?,
            },
        )?;

        // Explicit compensation is used verbatim; the eligibility check has
        // already enforced the rate floor.
        let amount = match request.compensation {
            Some(requested) => requested,
            None => compute_compensation(
                &self.config,
                project.category,
                request.specializations.len(),
                project.funding.goal,
            ),
        };
        let compensation = Compensation {
            amount,
            currency: project.funding.currency.clone(),
            terms: "payable_on_completion".to_string(),
        };
        let estimated_hours = self.config.hours_for(project.category);

        let audit = Audit {
            id: Audit::generate_id(),
            project_id: request.project_id.clone(),
            auditor_id: request.auditor_id.clone(),
            specializations: request.specializations.clone(),
            deadline: request.deadline,
            status: AuditStatus::Assigned,
            compensation: compensation.clone(),
            estimated_hours,
            criteria: derive_criteria(project.category, &request.specializations),
            required_documents: derive_required_documents(project.category),
            priority: request.priority,
            assignment_notes: request.assignment_notes.clone(),
            assigned_at: now,
            acceptance: None,
        };
        self.audits.insert_audit(&audit).await?;

        info!(
            audit_id = %audit.id,
            project_id = %audit.project_id,
            auditor_id = %audit.auditor_id,
            "audit assigned"
        );

        self.emit_side_effects(&audit, &project);

        Ok(AssignmentResponse {
            audit_id: audit.id,
            project_id: audit.project_id,
            auditor_id: audit.auditor_id,
            status: AuditStatus::Assigned,
            assigned_at: now,
            compensation,
            estimated_hours,
            priority: request.priority,
            review_flags,
        })
    }

    /// Notification and statistics delivery, isolated from the caller.
    fn emit_side_effects(&self, audit: &Audit, project: &Project) {
        let notifier = Arc::clone(&self.notifier);
        let metrics = Arc::clone(&self.metrics);
        let notification = Notification {
            recipient_id: audit.auditor_id.clone(),
            topic: "audit_assigned".to_string(),
            message: format!(
                "You have been assigned audit {} for project {} (deadline {})",
                audit.id,
                project.id,
                audit.deadline.date_naive()
            ),
        };
        let event = MetricEvent::count("audits_assigned", 1)
            .with_label("category", project.category.to_string())
            .with_label("auditor_id", audit.auditor_id.clone());

        tokio::spawn(async move {
            if let Err(e) = notifier.notify(notification).await {
                warn!(error = %e, "audit assignment notification failed");
            }
            if let Err(e) = metrics.record(event).await {
                warn!(error = %e, "audit assignment metric failed");
            }
        });
    }
}

fn map_not_found(err: StoreError, kind: &'static str) -> EngineError {
    match err {
        StoreError::NotFound(id) => EngineError::not_found(kind, id),
        other => other.into(),
    }
}

fn derive_criteria(category: ProjectCategory, specializations: &[Specialization]) -> Vec<String> {
    let mut criteria = vec![
        "milestone_deliverables_match_plan".to_string(),
        "spending_consistent_with_budget".to_string(),
    ];
    if category.is_regulated() {
        criteria.push("regulatory_compliance_verified".to_string());
    }
    for specialization in specializations {
        criteria.push(format!("{specialization}_review_complete"));
    }
    criteria
}

fn derive_required_documents(category: ProjectCategory) -> Vec<String> {
    let mut documents = vec![
        "progress_report".to_string(),
        "expense_ledger".to_string(),
    ];
    match category {
        ProjectCategory::Finance => documents.push("financial_statements".to_string()),
        ProjectCategory::Health => documents.push("safety_compliance_records".to_string()),
        ProjectCategory::Legal => documents.push("counsel_opinions".to_string()),
        _ => {}
    }
    documents
}
