//! Release request and response schema
//!
//! Typed request per operation with an enumerated-constraint validator.
//! Validation runs before permission checks and before any side effect, and
//! reports failures per field.

use chrono::{DateTime, Utc};
use fundlock_core::{Amount, EngineError, EngineResult, ReleaseType};
use serde::{Deserialize, Serialize};

const MIN_REASON_LEN: usize = 10;
const MAX_REASON_LEN: usize = 500;

/// Caller-facing request to release escrowed funds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    pub release_type: ReleaseType,
    pub project_id: String,
    #[serde(default)]
    pub milestone_id: Option<String>,
    #[serde(default)]
    pub release_reason: Option<String>,
    /// Partial release, 1-100. Only honored for override release types.
    #[serde(default)]
    pub release_percentage: Option<u8>,
    #[serde(default = "default_true")]
    pub notify_contributors: bool,
    #[serde(default = "default_true")]
    pub notify_creator: bool,
    /// Honored only for admin callers; ignored otherwise.
    #[serde(default)]
    pub bypass_safety_checks: bool,
}

fn default_true() -> bool {
    true
}

impl ReleaseRequest {
    pub fn milestone(project_id: impl Into<String>, milestone_id: impl Into<String>) -> Self {
        Self {
            release_type: ReleaseType::MilestoneCompletion,
            project_id: project_id.into(),
            milestone_id: Some(milestone_id.into()),
            release_reason: None,
            release_percentage: None,
            notify_contributors: true,
            notify_creator: true,
            bypass_safety_checks: false,
        }
    }

    /// Structural validation, before any computation.
    pub fn validate(&self) -> EngineResult<()> {
        if self.project_id.trim().is_empty() {
            return Err(EngineError::invalid_argument("projectId", "must not be empty"));
        }
        if self.release_type == ReleaseType::MilestoneCompletion && self.milestone_id.is_none() {
            return Err(EngineError::invalid_argument(
                "milestoneId",
                "required for milestone_completion releases",
            ));
        }
        match &self.release_reason {
            None if self.release_type.requires_reason() => {
                return Err(EngineError::invalid_argument(
                    "releaseReason",
                    format!("required for {} releases", self.release_type),
                ));
            }
            Some(reason) => {
                let len = reason.chars().count();
                if !(MIN_REASON_LEN..=MAX_REASON_LEN).contains(&len) {
                    return Err(EngineError::invalid_argument(
                        "releaseReason",
                        format!("must be between {MIN_REASON_LEN} and {MAX_REASON_LEN} characters"),
                    ));
                }
            }
            None => {}
        }
        if let Some(percentage) = self.release_percentage {
            if !(1..=100).contains(&percentage) {
                return Err(EngineError::invalid_argument(
                    "releasePercentage",
                    "must be between 1 and 100",
                ));
            }
        }
        Ok(())
    }
}

/// Per-contribution outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseItemStatus {
    Released,
    Failed,
    /// A concurrent invocation released the entry first; nothing was written
    Skipped,
}

/// Outcome for one contribution in the batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionReleaseResult {
    pub contribution_id: String,
    pub transfer_id: Option<String>,
    pub release_amount: Amount,
    pub status: ReleaseItemStatus,
    pub success: bool,
    pub error: Option<String>,
}

impl ContributionReleaseResult {
    pub fn released(contribution_id: String, transfer_id: String, amount: Amount) -> Self {
        Self {
            contribution_id,
            transfer_id: Some(transfer_id),
            release_amount: amount,
            status: ReleaseItemStatus::Released,
            success: true,
            error: None,
        }
    }

    pub fn failed(contribution_id: String, amount: Amount, error: String) -> Self {
        Self {
            contribution_id,
            transfer_id: None,
            release_amount: amount,
            status: ReleaseItemStatus::Failed,
            success: false,
            error: Some(error),
        }
    }

    pub fn skipped(contribution_id: String, transfer_id: String, amount: Amount) -> Self {
        Self {
            contribution_id,
            transfer_id: Some(transfer_id),
            release_amount: amount,
            status: ReleaseItemStatus::Skipped,
            success: false,
            error: Some("entry already released by a concurrent invocation".to_string()),
        }
    }
}

/// Response for a release request.
///
/// `success` reflects whether the operation ran to completion; individual
/// transfer failures appear in `results` with a non-zero `failed` count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    pub release_type: ReleaseType,
    pub project_id: String,
    pub milestone_id: Option<String>,
    pub total_released: Amount,
    pub contributions_processed: u32,
    pub successful: u32,
    pub failed: u32,
    pub results: Vec<ContributionReleaseResult>,
    pub processed_at: DateTime<Utc>,
    pub success: bool,
}
