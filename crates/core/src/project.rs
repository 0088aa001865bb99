//! Project and milestone domain model
//!
//! Projects aggregate contributed funds and gate their release behind
//! milestone and audit status. Milestone/audit-status fields are mutated by
//! the audit lifecycle and by milestone-completion events upstream; the
//! release engine only reads them.

use crate::amount::Amount;
use crate::currency::Currency;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Project lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    Active,
    Funding,
    FundingComplete,
    Completed,
    Cancelled,
}

/// Milestone progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Completed,
}

/// Outcome of an audit attached to a milestone, as consumed by the release gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditApproval {
    Pending,
    Approved,
    Rejected,
}

/// Project category, used for auditor certification and compensation tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProjectCategory {
    Finance,
    Health,
    Legal,
    Technology,
    Arts,
    Community,
    Environment,
}

impl ProjectCategory {
    /// Regulated categories require an active auditor certification.
    pub fn is_regulated(&self) -> bool {
        matches!(
            self,
            ProjectCategory::Finance | ProjectCategory::Health | ProjectCategory::Legal
        )
    }
}

/// One funding milestone.
///
/// `funding_percentage` determines the project-level release amount for this
/// milestone; whether percentages across milestones sum to 100 is the
/// caller's policy, not enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub status: MilestoneStatus,
    pub funding_percentage: rust_decimal::Decimal,
    pub audit_required: bool,
    pub audit_status: Option<AuditApproval>,
}

impl Milestone {
    /// A milestone gates release until its audit (if required) is approved.
    pub fn audit_approved(&self) -> bool {
        !self.audit_required || self.audit_status == Some(AuditApproval::Approved)
    }
}

/// Aggregate funding state of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingSummary {
    pub raised: Amount,
    pub goal: Amount,
    pub currency: Currency,
}

/// A crowdfunded project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub creator_id: String,
    pub status: ProjectStatus,
    pub category: ProjectCategory,
    pub milestones: Vec<Milestone>,
    pub funding: FundingSummary,
    /// External payout destination. When absent, transfers route to the
    /// platform holding account configured on the release engine.
    pub payout_account: Option<String>,
}

impl Project {
    pub fn milestone(&self, milestone_id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.id == milestone_id)
    }

    pub fn all_milestones_completed(&self) -> bool {
        self.milestones
            .iter()
            .all(|m| m.status == MilestoneStatus::Completed)
    }
}
