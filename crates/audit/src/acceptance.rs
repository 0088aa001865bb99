//! Audit acceptance
//!
//! Drives the `assigned -> in_progress` transition. Expiry is detected
//! lazily: an acceptance attempt after the deadline marks the audit expired
//! and is refused.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use fundlock_core::{
    require_caller, AcceptanceRecord, AuditStatus, Caller, EngineError, EngineResult,
    RequestedResource, TimelinePhase,
};
use fundlock_store::{
    AuditStore, MetricEvent, MetricsSink, Notification, NotificationSink, ProjectStore, StoreError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const MAX_ACCEPTANCE_NOTE: usize = 500;
const MAX_PHASE_DAYS: u32 = 30;

/// Phases every proposed timeline must include
pub const MANDATED_PHASES: [&str; 3] = ["initial_review", "detailed_analysis", "final_report"];

/// Caller-facing request to accept an audit assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceRequest {
    pub audit_id: String,
    #[serde(default)]
    pub acceptance_note: Option<String>,
    pub estimated_completion_date: NaiveDate,
    #[serde(default)]
    pub proposed_timeline: Option<Vec<TimelinePhase>>,
    #[serde(default)]
    pub requested_resources: Option<Vec<RequestedResource>>,
}

impl AcceptanceRequest {
    /// Structural validation, before any lookup or side effect.
    pub fn validate(&self) -> EngineResult<()> {
        if self.audit_id.trim().is_empty() {
            return Err(EngineError::invalid_argument("auditId", "must not be empty"));
        }
        if let Some(note) = &self.acceptance_note {
            if note.chars().count() > MAX_ACCEPTANCE_NOTE {
                return Err(EngineError::invalid_argument(
                    "acceptanceNote",
                    format!("must be at most {MAX_ACCEPTANCE_NOTE} characters"),
                ));
            }
        }
        if let Some(timeline) = &self.proposed_timeline {
            for (index, phase) in timeline.iter().enumerate() {
                if phase.phase.trim().is_empty() {
                    return Err(EngineError::invalid_argument(
                        format!("proposedTimeline[{index}].phase"),
                        "must not be empty",
                    ));
                }
                if phase.estimated_days == 0 || phase.estimated_days > MAX_PHASE_DAYS {
                    return Err(EngineError::invalid_argument(
                        format!("proposedTimeline[{index}].estimatedDays"),
                        format!("must be between 1 and {MAX_PHASE_DAYS}"),
                    ));
                }
            }
        }
        if let Some(resources) = &self.requested_resources {
            for (index, resource) in resources.iter().enumerate() {
                if resource.description.trim().is_empty() {
                    return Err(EngineError::invalid_argument(
                        format!("requestedResources[{index}].description"),
                        "must not be empty",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Response for a successful acceptance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceResponse {
    pub audit_id: String,
    pub status: AuditStatus,
    pub accepted_at: DateTime<Utc>,
    pub estimated_completion_date: NaiveDate,
    /// Reference to the audit workspace the auditor works in
    pub workspace: String,
    /// Next-step guidance for the auditor
    pub next_steps: Vec<String>,
}

/// Accepts audit assignments on behalf of the assigned auditor
pub struct AcceptanceService {
    audits: Arc<dyn AuditStore>,
    projects: Arc<dyn ProjectStore>,
    notifier: Arc<dyn NotificationSink>,
    metrics: Arc<dyn MetricsSink>,
}

impl AcceptanceService {
    pub fn new(
        audits: Arc<dyn AuditStore>,
        projects: Arc<dyn ProjectStore>,
        notifier: Arc<dyn NotificationSink>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            audits,
            projects,
            notifier,
            metrics,
        }
    }

    /// Accept an assigned audit.
    ///
    /// Only the assigned auditor may accept, only while the audit is still
    /// `assigned`, and only before its deadline.
    pub async fn accept(
        &self,
        caller: Option<&Caller>,
        request: AcceptanceRequest,
    ) -> EngineResult<AcceptanceResponse> {
        request.validate()?;
        let caller = require_caller(caller)?;
        let now = Utc::now();

        let mut audit = self.audits.audit(&request.audit_id).await.map_err(|e| match e {
            StoreError::NotFound(id) => EngineError::not_found("audit", id),
            other => other.into(),
        })?;

        if caller.user_id != audit.auditor_id {
            return Err(EngineError::permission_denied(
                "only the assigned auditor may accept this audit",
            ));
        }
        if audit.status != AuditStatus::Assigned {
            return Err(EngineError::failed_precondition(format!(
                "audit {} is {} and cannot be accepted",
                audit.id, audit.status
            )));
        }
        if audit.deadline < now {
            // Lazy expiry: record it so later reads see a terminal status.
            audit.status = AuditStatus::Expired;
            self.audits.update_audit(&audit).await?;
            return Err(EngineError::failed_precondition(format!(
                "audit {} deadline has passed; the assignment has expired",
                audit.id
            )));
        }

        validate_completion_date(request.estimated_completion_date, audit.deadline, now)?;
        if let Some(timeline) = &request.proposed_timeline {
            validate_timeline(timeline, request.estimated_completion_date, now)?;
        }

        debug_assert!(audit.status.can_transition(AuditStatus::InProgress));
        audit.status = AuditStatus::InProgress;
        audit.acceptance = Some(AcceptanceRecord {
            accepted_at: now,
            acceptance_note: request.acceptance_note.clone(),
            estimated_completion_date: request.estimated_completion_date,
            proposed_timeline: request.proposed_timeline.clone().unwrap_or_default(),
            requested_resources: request.requested_resources.clone().unwrap_or_default(),
        });
        self.audits.update_audit(&audit).await?;

        info!(audit_id = %audit.id, auditor_id = %audit.auditor_id, "audit accepted");
        self.emit_side_effects(&audit);

        Ok(AcceptanceResponse {
            audit_id: audit.id.clone(),
            status: AuditStatus::InProgress,
            accepted_at: now,
            estimated_completion_date: request.estimated_completion_date,
            workspace: format!("workspaces/audits/{}", audit.id),
            next_steps: vec![
                "Review the audit criteria and required documents".to_string(),
                "Request any additional resources through the workspace".to_string(),
                format!(
                    "Submit the audit report before {}",
                    audit.deadline.date_naive()
                ),
            ],
        })
    }

    fn emit_side_effects(&self, audit: &fundlock_core::Audit) {
        let notifier = Arc::clone(&self.notifier);
        let metrics = Arc::clone(&self.metrics);
        let projects = Arc::clone(&self.projects);
        let audit_id = audit.id.clone();
        let project_id = audit.project_id.clone();
        let auditor_id = audit.auditor_id.clone();

        tokio::spawn(async move {
            // Creator lookup happens after the state write; a miss only
            // costs the notification.
            match projects.project(&project_id).await {
                Ok(project) => {
                    let notification = Notification {
                        recipient_id: project.creator_id,
                        topic: "audit_started".to_string(),
                        message: format!("Audit {audit_id} for project {project_id} is underway"),
                    };
                    if let Err(e) = notifier.notify(notification).await {
                        warn!(error = %e, "audit acceptance notification failed");
                    }
                }
                Err(e) => warn!(error = %e, "could not resolve project for notification"),
            }
            let event = MetricEvent::count("audits_accepted", 1)
                .with_label("auditor_id", auditor_id);
            if let Err(e) = metrics.record(event).await {
                warn!(error = %e, "audit acceptance metric failed");
            }
        });
    }
}

/// The proposed completion date must be in the future and strictly before the
/// audit deadline.
fn validate_completion_date(
    completion: NaiveDate,
    deadline: DateTime<Utc>,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    if completion <= now.date_naive() {
        return Err(EngineError::invalid_argument(
            "estimatedCompletionDate",
            "must be in the future",
        ));
    }
    if completion >= deadline.date_naive() {
        return Err(EngineError::invalid_argument(
            "estimatedCompletionDate",
            "must be before the audit deadline",
        ));
    }
    Ok(())
}

/// A proposed timeline must fit inside the days until the proposed completion
/// date and include every mandated phase.
fn validate_timeline(
    timeline: &[TimelinePhase],
    completion: NaiveDate,
    now: DateTime<Utc>,
) -> EngineResult<()> {
    let days_available = (completion - now.date_naive()).num_days();
    let total_days: i64 = timeline.iter().map(|p| i64::from(p.estimated_days)).sum();
    if total_days > days_available {
        return Err(EngineError::invalid_argument(
            "proposedTimeline",
            format!(
                "total duration of {total_days} days exceeds the {days_available} days until the proposed completion date"
            ),
        ));
    }

    let missing: Vec<&str> = MANDATED_PHASES
        .iter()
        .copied()
        .filter(|required| !timeline.iter().any(|p| p.phase == *required))
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::invalid_argument(
            "proposedTimeline",
            format!("missing required phases: {}", missing.join(", ")),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fundlock_core::{
        Amount, Audit, AuditPriority, Compensation, Currency, Specialization,
    };
    use fundlock_store::{MemoryMetrics, MemoryNotifier, MemoryStore};

    fn audit(id: &str, auditor: &str, deadline: DateTime<Utc>) -> Audit {
        Audit {
            id: id.to_string(),
            project_id: "p1".to_string(),
            auditor_id: auditor.to_string(),
            specializations: vec![Specialization::Financial],
            deadline,
            status: AuditStatus::Assigned,
            compensation: Compensation {
                amount: Amount::from_minor(120_000).unwrap(),
                currency: Currency::Usd,
                terms: "payable_on_completion".to_string(),
            },
            estimated_hours: 24,
            criteria: vec![],
            required_documents: vec![],
            priority: AuditPriority::Medium,
            assignment_notes: None,
            assigned_at: Utc::now(),
            acceptance: None,
        }
    }

    async fn seeded_service(audit: Audit) -> (AcceptanceService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.insert_audit(&audit).await.unwrap();
        let service = AcceptanceService::new(
            store.clone(),
            store.clone(),
            Arc::new(MemoryNotifier::new()),
            Arc::new(MemoryMetrics::new()),
        );
        (service, store)
    }

    fn request(audit_id: &str, completion_in_days: i64) -> AcceptanceRequest {
        AcceptanceRequest {
            audit_id: audit_id.to_string(),
            acceptance_note: None,
            estimated_completion_date: (Utc::now() + Duration::days(completion_in_days))
                .date_naive(),
            proposed_timeline: None,
            requested_resources: None,
        }
    }

    fn auditor_caller() -> Caller {
        Caller::new("aud-1", vec![fundlock_core::Role::Auditor])
    }

    #[tokio::test]
    async fn test_accept_happy_path() {
        let deadline = Utc::now() + Duration::days(30);
        let (service, store) = seeded_service(audit("AUD-1", "aud-1", deadline)).await;

        let response = service
            .accept(Some(&auditor_caller()), request("AUD-1", 20))
            .await
            .unwrap();
        assert_eq!(response.status, AuditStatus::InProgress);
        assert_eq!(response.workspace, "workspaces/audits/AUD-1");
        assert!(!response.next_steps.is_empty());

        let stored = store.audit("AUD-1").await.unwrap();
        assert_eq!(stored.status, AuditStatus::InProgress);
        assert!(stored.acceptance.is_some());
    }

    #[tokio::test]
    async fn test_accept_wrong_auditor() {
        let deadline = Utc::now() + Duration::days(30);
        let (service, _store) = seeded_service(audit("AUD-1", "aud-1", deadline)).await;

        let outsider = Caller::new("aud-2", vec![fundlock_core::Role::Auditor]);
        let err = service
            .accept(Some(&outsider), request("AUD-1", 20))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_accept_past_deadline_expires() {
        let deadline = Utc::now() - Duration::days(1);
        let (service, store) = seeded_service(audit("AUD-1", "aud-1", deadline)).await;

        let err = service
            .accept(Some(&auditor_caller()), request("AUD-1", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));

        let stored = store.audit("AUD-1").await.unwrap();
        assert_eq!(stored.status, AuditStatus::Expired);
    }

    #[tokio::test]
    async fn test_accept_twice_fails() {
        let deadline = Utc::now() + Duration::days(30);
        let (service, _store) = seeded_service(audit("AUD-1", "aud-1", deadline)).await;

        service
            .accept(Some(&auditor_caller()), request("AUD-1", 20))
            .await
            .unwrap();
        let err = service
            .accept(Some(&auditor_caller()), request("AUD-1", 20))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
    }

    #[tokio::test]
    async fn test_completion_date_equal_to_deadline_rejected() {
        let deadline = Utc::now() + Duration::days(30);
        let (service, _store) = seeded_service(audit("AUD-1", "aud-1", deadline)).await;

        let mut req = request("AUD-1", 20);
        req.estimated_completion_date = deadline.date_naive();
        let err = service
            .accept(Some(&auditor_caller()), req)
            .await
            .unwrap_err();
        match err {
            EngineError::InvalidArgument { field, message } => {
                assert_eq!(field, "estimatedCompletionDate");
                assert_eq!(message, "must be before the audit deadline");
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeline_missing_phase_named() {
        let deadline = Utc::now() + Duration::days(60);
        let (service, _store) = seeded_service(audit("AUD-1", "aud-1", deadline)).await;

        let mut req = request("AUD-1", 40);
        req.proposed_timeline = Some(vec![
            TimelinePhase {
                phase: "initial_review".to_string(),
                description: "Document review".to_string(),
                estimated_days: 5,
            },
            TimelinePhase {
                phase: "detailed_analysis".to_string(),
                description: "Deep dive".to_string(),
                estimated_days: 10,
            },
        ]);
        let err = service
            .accept(Some(&auditor_caller()), req)
            .await
            .unwrap_err();
        match err {
            EngineError::InvalidArgument { field, message } => {
                assert_eq!(field, "proposedTimeline");
                assert_eq!(message, "missing required phases: final_report");
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeline_too_long() {
        let deadline = Utc::now() + Duration::days(60);
        let (service, _store) = seeded_service(audit("AUD-1", "aud-1", deadline)).await;

        let mut req = request("AUD-1", 15);
        req.proposed_timeline = Some(vec![
            TimelinePhase {
                phase: "initial_review".to_string(),
                description: "Document review".to_string(),
                estimated_days: 10,
            },
            TimelinePhase {
                phase: "detailed_analysis".to_string(),
                description: "Deep dive".to_string(),
                estimated_days: 10,
            },
            TimelinePhase {
                phase: "final_report".to_string(),
                description: "Write-up".to_string(),
                estimated_days: 5,
            },
        ]);
        let err = service
            .accept(Some(&auditor_caller()), req)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidArgument { ref field, .. } if field == "proposedTimeline"
        ));
    }

    #[tokio::test]
    async fn test_phase_days_bounds() {
        let req = AcceptanceRequest {
            audit_id: "AUD-1".to_string(),
            acceptance_note: None,
            estimated_completion_date: (Utc::now() + Duration::days(20)).date_naive(),
            proposed_timeline: Some(vec![TimelinePhase {
                phase: "initial_review".to_string(),
                description: "Too long".to_string(),
                estimated_days: 31,
            }]),
            requested_resources: None,
        };
        let err = req.validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument { .. }));
    }
}
