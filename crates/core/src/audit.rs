//! Audit assignment domain model
//!
//! An audit record is created by assignment, mutated by acceptance and
//! report submission, and never deleted - it is part of the audit trail.

use crate::amount::Amount;
use crate::currency::Currency;
use crate::project::ProjectCategory;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Audit lifecycle status
///
/// ```text
/// assigned ──► in_progress ──► completed
///    │              └────────► rejected
///    └────► expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditStatus {
    Assigned,
    InProgress,
    Completed,
    Rejected,
    Expired,
}

impl AuditStatus {
    /// Legal state-machine edges.
    pub fn can_transition(self, to: AuditStatus) -> bool {
        use AuditStatus::*;
        matches!(
            (self, to),
            (Assigned, InProgress)
                | (Assigned, Expired)
                | (InProgress, Completed)
                | (InProgress, Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AuditStatus::Completed | AuditStatus::Rejected | AuditStatus::Expired
        )
    }
}

/// Auditor specialization, from a fixed enumerated set
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Specialization {
    Financial,
    Technical,
    Legal,
    Compliance,
    Environmental,
    QualityAssurance,
}

/// Assignment priority
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditPriority {
    Low,
    #[default]
    Medium,
    High,
}

/// Agreed compensation for an audit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compensation {
    pub amount: Amount,
    pub currency: Currency,
    pub terms: String,
}

/// One phase of an auditor's proposed timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelinePhase {
    pub phase: String,
    pub description: String,
    pub estimated_days: u32,
}

/// Resource kind an auditor may request at acceptance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceType {
    Document,
    Meeting,
    SiteVisit,
    FinancialData,
}

/// A resource requested at acceptance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedResource {
    pub resource_type: ResourceType,
    pub description: String,
    pub required: bool,
}

/// Details recorded when the auditor accepts the assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceRecord {
    pub accepted_at: DateTime<Utc>,
    pub acceptance_note: Option<String>,
    pub estimated_completion_date: NaiveDate,
    pub proposed_timeline: Vec<TimelinePhase>,
    pub requested_resources: Vec<RequestedResource>,
}

/// An audit assignment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Audit {
    pub id: String,
    pub project_id: String,
    pub auditor_id: String,
    pub specializations: Vec<Specialization>,
    pub deadline: DateTime<Utc>,
    pub status: AuditStatus,
    pub compensation: Compensation,
    pub estimated_hours: u32,
    pub criteria: Vec<String>,
    pub required_documents: Vec<String>,
    pub priority: AuditPriority,
    pub assignment_notes: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub acceptance: Option<AcceptanceRecord>,
}

impl Audit {
    /// Generate a prefixed audit id, e.g. `AUD-3F2A9C01`.
    pub fn generate_id() -> String {
        format!(
            "AUD-{}",
            uuid::Uuid::new_v4().to_string()[..8].to_uppercase()
        )
    }
}

/// Auditor account data consulted by the eligibility checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditorProfile {
    pub user_id: String,
    pub active: bool,
    pub capabilities: Vec<String>,
    pub specializations: Vec<Specialization>,
    pub certifications: Vec<Certification>,
    /// Per-auditor cap on concurrent audits; engine default applies when unset.
    pub concurrency_cap: Option<u32>,
    pub min_hourly_rate: Option<Amount>,
}

impl AuditorProfile {
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    pub fn certified_for(&self, category: ProjectCategory) -> bool {
        self.certifications
            .iter()
            .any(|c| c.category == category && c.active)
    }
}

/// A category certification held by an auditor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub category: ProjectCategory,
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        assert!(AuditStatus::Assigned.can_transition(AuditStatus::InProgress));
        assert!(AuditStatus::Assigned.can_transition(AuditStatus::Expired));
        assert!(AuditStatus::InProgress.can_transition(AuditStatus::Completed));
        assert!(AuditStatus::InProgress.can_transition(AuditStatus::Rejected));

        assert!(!AuditStatus::Assigned.can_transition(AuditStatus::Completed));
        assert!(!AuditStatus::Expired.can_transition(AuditStatus::InProgress));
        assert!(!AuditStatus::Completed.can_transition(AuditStatus::Rejected));
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AuditStatus::Assigned.is_terminal());
        assert!(!AuditStatus::InProgress.is_terminal());
        assert!(AuditStatus::Completed.is_terminal());
        assert!(AuditStatus::Rejected.is_terminal());
        assert!(AuditStatus::Expired.is_terminal());
    }

    #[test]
    fn test_specialization_parse() {
        let s: Specialization = "quality_assurance".parse().unwrap();
        assert_eq!(s, Specialization::QualityAssurance);
        assert!("underwater_basketweaving".parse::<Specialization>().is_err());
    }

    #[test]
    fn test_generate_id_prefix() {
        let id = Audit::generate_id();
        assert!(id.starts_with("AUD-"));
        assert_eq!(id.len(), 12);
    }

    #[test]
    fn test_certified_for() {
        let profile = AuditorProfile {
            user_id: "aud-1".to_string(),
            active: true,
            capabilities: vec!["audit".to_string()],
            specializations: vec![Specialization::Financial],
            certifications: vec![Certification {
                category: ProjectCategory::Finance,
                active: false,
            }],
            concurrency_cap: None,
            min_hourly_rate: None,
        };
        // Inactive certification does not count
        assert!(!profile.certified_for(ProjectCategory::Finance));
    }
}
