//! Release condition evaluation
//!
//! Decides whether a release is currently permitted at the project/milestone
//! level. Pure over the project snapshot: the gate always completes before
//! any transfer is attempted.

use fundlock_core::{
    Amount, EngineError, EngineResult, MilestoneStatus, Project, ProjectStatus, ReleaseType,
};
use tracing::debug;

/// A release that passed its gating conditions
#[derive(Debug, Clone)]
pub struct ApprovedRelease {
    pub release_type: ReleaseType,
    pub milestone_id: Option<String>,
    /// Project-level amount eligible for this trigger
    pub project_amount: Amount,
    /// Safety checks were bypassed by an admin
    pub bypassed: bool,
}

/// Evaluate the gating conditions for a release.
///
/// `bypass` is the already-permission-checked flag: for milestone releases it
/// skips only the audit-approval gate; for project completion it skips the
/// completion checks. Override types carry no completion preconditions.
pub fn evaluate_conditions(
    project: &Project,
    release_type: ReleaseType,
    milestone_id: Option<&str>,
    bypass: bool,
) -> EngineResult<ApprovedRelease> {
    match release_type {
        ReleaseType::MilestoneCompletion => {
            let milestone_id = milestone_id.ok_or_else(|| {
                EngineError::invalid_argument("milestoneId", "required for milestone_completion")
            })?;
            let milestone = project
                .milestone(milestone_id)
                .ok_or_else(|| EngineError::not_found("milestone", milestone_id))?;

            if milestone.status != MilestoneStatus::Completed {
                return Err(EngineError::failed_precondition(format!(
                    "milestone {} is {} and must be completed before release",
                    milestone.id, milestone.status
                )));
            }
            if !milestone.audit_approved() && !bypass {
                return Err(EngineError::failed_precondition(format!(
                    "milestone {} requires an approved audit before release",
                    milestone.id
                )));
            }

            let amount = project
                .funding
                .raised
                .percentage(milestone.funding_percentage);
            debug!(
                project_id = %project.id,
                milestone_id,
                amount = %amount,
                "milestone release approved"
            );
            Ok(ApprovedRelease {
                release_type,
                milestone_id: Some(milestone_id.to_string()),
                project_amount: amount,
                bypassed: bypass,
            })
        }
        ReleaseType::ProjectCompletion => {
            if !bypass {
                if project.status != ProjectStatus::Completed {
                    return Err(EngineError::failed_precondition(format!(
                        "project {} is {} and must be completed before full release",
                        project.id, project.status
                    )));
                }
                if !project.all_milestones_completed() {
                    return Err(EngineError::failed_precondition(format!(
                        "project {} still has incomplete milestones",
                        project.id
                    )));
                }
            }
            Ok(ApprovedRelease {
                release_type,
                milestone_id: None,
                project_amount: project.funding.raised,
                bypassed: bypass,
            })
        }
        // Privileged override paths carry no completion preconditions; the
        // permission gate has already restricted them to admins.
        ReleaseType::EmergencyRelease | ReleaseType::AdminOverride => Ok(ApprovedRelease {
            release_type,
            milestone_id: None,
            project_amount: project.funding.raised,
            bypassed: bypass,
        }),
    }
}
