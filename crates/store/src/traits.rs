//! External collaborator interfaces
//!
//! The document store, payment primitive, and notification/metrics delivery
//! are all external systems. The engine talks to them through these seams;
//! tests use the in-memory implementations in [`crate::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fundlock_core::{Amount, AuditorProfile, Contribution, Currency, Project};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StoreResult;

/// Mutation applied inside a single-contribution atomic update.
///
/// Returning an error aborts the update; nothing is written.
pub type ContributionMutation<'a> =
    &'a mut (dyn FnMut(&mut Contribution) -> Result<(), String> + Send);

/// Read access to projects
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn project(&self, project_id: &str) -> StoreResult<Project>;
}

/// Contribution reads plus the per-contribution unit of work
///
/// `with_contribution_update` is the only write path for escrow state. It is
/// conditional on the contribution `version` the caller last observed
/// (compare-and-swap): when the stored version differs, the update fails with
/// `StoreError::VersionConflict` and nothing is written. Document stores
/// commonly cap writes per atomic unit, so the granularity is one
/// contribution per update, never the whole batch.
#[async_trait]
pub trait ContributionStore: Send + Sync {
    async fn contribution(&self, contribution_id: &str) -> StoreResult<Contribution>;

    /// All contributions on the project whose escrow is still held.
    async fn held_contributions(&self, project_id: &str) -> StoreResult<Vec<Contribution>>;

    /// Atomically mutate one contribution, conditional on `expected_version`.
    ///
    /// On success the stored version is bumped and the updated contribution
    /// returned.
    async fn with_contribution_update(
        &self,
        contribution_id: &str,
        expected_version: u64,
        mutate: ContributionMutation<'_>,
    ) -> StoreResult<Contribution>;
}

/// Audit record persistence and workload queries
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_audit(&self, audit: &fundlock_core::Audit) -> StoreResult<()>;

    async fn audit(&self, audit_id: &str) -> StoreResult<fundlock_core::Audit>;

    async fn update_audit(&self, audit: &fundlock_core::Audit) -> StoreResult<()>;

    /// Number of audits in {assigned, in_progress} for this auditor.
    async fn active_audit_count(&self, auditor_id: &str) -> StoreResult<u32>;

    /// Does this auditor hold a non-terminal audit on the project?
    async fn has_active_audit(&self, auditor_id: &str, project_id: &str) -> StoreResult<bool>;

    /// Distinct projects of `creator_id` this auditor has audits on.
    async fn audited_creator_project_count(
        &self,
        auditor_id: &str,
        creator_id: &str,
    ) -> StoreResult<u32>;
}

/// Auditor account and relationship lookups for eligibility checks
#[async_trait]
pub trait AuditorDirectory: Send + Sync {
    async fn profile(&self, auditor_id: &str) -> StoreResult<AuditorProfile>;

    /// Has this user contributed funds to the project?
    async fn has_contributed(&self, user_id: &str, project_id: &str) -> StoreResult<bool>;

    /// Does this user share any project with the creator (co-creator or
    /// team-member relationship)?
    async fn shares_project_with(&self, user_id: &str, creator_id: &str) -> StoreResult<bool>;
}

/// Metadata linking a transfer back to its release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferMetadata {
    pub contribution_id: String,
    pub project_id: String,
    pub release_type: String,
    pub milestone_id: Option<String>,
}

/// A single outbound fund transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub destination: String,
    pub amount: Amount,
    pub currency: Currency,
    pub metadata: TransferMetadata,
}

/// Confirmation for an executed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub transfer_id: String,
    pub created_at: DateTime<Utc>,
}

/// Errors from the payment primitive. Timeouts are failures like any other,
/// isolated to the contribution whose transfer timed out.
#[derive(Debug, Error, Clone)]
pub enum TransferError {
    #[error("Transfer declined: {0}")]
    Declined(String),

    #[error("Transfer timed out after {0}ms")]
    Timeout(u64),

    #[error("Payment service unavailable: {0}")]
    Unavailable(String),
}

/// The "create transfer" capability (external payment primitive)
#[async_trait]
pub trait TransferGateway: Send + Sync {
    async fn create_transfer(&self, request: TransferRequest)
        -> Result<TransferReceipt, TransferError>;
}

/// An outbound notification. Content templating is out of scope; this is the
/// minimal payload handed to the delivery system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_id: String,
    pub topic: String,
    pub message: String,
}

/// Outbound notification delivery. Failures are logged and swallowed.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), String>;
}

/// A counter/statistics event emitted by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricEvent {
    pub name: String,
    pub value: i64,
    pub labels: Vec<(String, String)>,
}

impl MetricEvent {
    pub fn count(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self
    }
}

/// Metrics ingestion, fire-and-forget with an at-least-once contract.
/// Replaces inline shared counters.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn record(&self, event: MetricEvent) -> Result<(), String>;
}
