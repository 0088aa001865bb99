//! In-memory collaborators for testing
//!
//! `MemoryStore` backs the document-store traits with hash maps and real
//! version/compare-and-swap semantics, so concurrency tests exercise the same
//! conflict paths a remote store would produce. `MemoryGateway` records
//! transfers and can be told to fail specific contributions.

use async_trait::async_trait;
use chrono::Utc;
use fundlock_core::{Audit, AuditStatus, AuditorProfile, Contribution, Project};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::traits::{
    AuditStore, AuditorDirectory, ContributionMutation, ContributionStore, MetricEvent,
    MetricsSink, Notification, NotificationSink, ProjectStore, TransferError, TransferGateway,
    TransferReceipt, TransferRequest,
};

/// In-memory document store
#[derive(Default)]
pub struct MemoryStore {
    projects: RwLock<HashMap<String, Project>>,
    contributions: RwLock<HashMap<String, Contribution>>,
    audits: RwLock<HashMap<String, Audit>>,
    auditors: RwLock<HashMap<String, AuditorProfile>>,
    /// (user_id, creator_id) pairs for shared-project relationships
    collaborations: RwLock<HashSet<(String, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_project(&self, project: Project) {
        self.projects.write().unwrap().insert(project.id.clone(), project);
    }

    pub fn insert_contribution(&self, contribution: Contribution) {
        self.contributions
            .write()
            .unwrap()
            .insert(contribution.id.clone(), contribution);
    }

    pub fn insert_auditor(&self, profile: AuditorProfile) {
        self.auditors
            .write()
            .unwrap()
            .insert(profile.user_id.clone(), profile);
    }

    /// Record that `user_id` shares a project with `creator_id`.
    pub fn add_collaboration(&self, user_id: &str, creator_id: &str) {
        self.collaborations
            .write()
            .unwrap()
            .insert((user_id.to_string(), creator_id.to_string()));
    }

    pub fn audit_count(&self) -> usize {
        self.audits.read().unwrap().len()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn project(&self, project_id: &str) -> StoreResult<Project> {
        self.projects
            .read()
            .unwrap()
            .get(project_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(project_id.to_string()))
    }
}

#[async_trait]
impl ContributionStore for MemoryStore {
    async fn contribution(&self, contribution_id: &str) -> StoreResult<Contribution> {
        self.contributions
            .read()
            .unwrap()
            .get(contribution_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(contribution_id.to_string()))
    }

    async fn held_contributions(&self, project_id: &str) -> StoreResult<Vec<Contribution>> {
        let mut held: Vec<Contribution> = self
            .contributions
            .read()
            .unwrap()
            .values()
            .filter(|c| c.project_id == project_id && c.escrow.held)
            .cloned()
            .collect();
        held.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(held)
    }

    async fn with_contribution_update(
        &self,
        contribution_id: &str,
        expected_version: u64,
        mutate: ContributionMutation<'_>,
    ) -> StoreResult<Contribution> {
        let mut contributions = self.contributions.write().unwrap();
        let stored = contributions
            .get_mut(contribution_id)
            .ok_or_else(|| StoreError::NotFound(contribution_id.to_string()))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: contribution_id.to_string(),
                expected: expected_version,
                actual: stored.version,
            });
        }

        // Mutate a copy; the stored record is untouched if the closure aborts.
        let mut updated = stored.clone();
        mutate(&mut updated).map_err(StoreError::Aborted)?;
        updated.version += 1;
        *stored = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn insert_audit(&self, audit: &Audit) -> StoreResult<()> {
        self.audits
            .write()
            .unwrap()
            .insert(audit.id.clone(), audit.clone());
        Ok(())
    }

    async fn audit(&self, audit_id: &str) -> StoreResult<Audit> {
        self.audits
            .read()
            .unwrap()
            .get(audit_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(audit_id.to_string()))
    }

    async fn update_audit(&self, audit: &Audit) -> StoreResult<()> {
        let mut audits = self.audits.write().unwrap();
        if !audits.contains_key(&audit.id) {
            return Err(StoreError::NotFound(audit.id.clone()));
        }
        audits.insert(audit.id.clone(), audit.clone());
        Ok(())
    }

    async fn active_audit_count(&self, auditor_id: &str) -> StoreResult<u32> {
        let count = self
            .audits
            .read()
            .unwrap()
            .values()
            .filter(|a| {
                a.auditor_id == auditor_id
                    && matches!(a.status, AuditStatus::Assigned | AuditStatus::InProgress)
            })
            .count();
        Ok(count as u32)
    }

    async fn has_active_audit(&self, auditor_id: &str, project_id: &str) -> StoreResult<bool> {
        Ok(self.audits.read().unwrap().values().any(|a| {
            a.auditor_id == auditor_id && a.project_id == project_id && !a.status.is_terminal()
        }))
    }

    async fn audited_creator_project_count(
        &self,
        auditor_id: &str,
        creator_id: &str,
    ) -> StoreResult<u32> {
        let projects = self.projects.read().unwrap();
        let audits = self.audits.read().unwrap();
        let distinct: HashSet<&str> = audits
            .values()
            .filter(|a| a.auditor_id == auditor_id)
            .filter(|a| {
                projects
                    .get(&a.project_id)
                    .is_some_and(|p| p.creator_id == creator_id)
            })
            .map(|a| a.project_id.as_str())
            .collect::<HashSet<_>>();
        Ok(distinct.len() as u32)
    }
}

#[async_trait]
impl AuditorDirectory for MemoryStore {
    async fn profile(&self, auditor_id: &str) -> StoreResult<AuditorProfile> {
        self.auditors
            .read()
            .unwrap()
            .get(auditor_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(auditor_id.to_string()))
    }

    async fn has_contributed(&self, user_id: &str, project_id: &str) -> StoreResult<bool> {
        Ok(self
            .contributions
            .read()
            .unwrap()
            .values()
            .any(|c| c.contributor_id == user_id && c.project_id == project_id))
    }

    async fn shares_project_with(&self, user_id: &str, creator_id: &str) -> StoreResult<bool> {
        Ok(self
            .collaborations
            .read()
            .unwrap()
            .contains(&(user_id.to_string(), creator_id.to_string())))
    }
}

/// Recording payment gateway for tests
#[derive(Default)]
pub struct MemoryGateway {
    transfers: Mutex<Vec<TransferRequest>>,
    fail_for: RwLock<HashSet<String>>,
    counter: AtomicU64,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force transfers for this contribution to fail.
    pub fn fail_contribution(&self, contribution_id: &str) {
        self.fail_for
            .write()
            .unwrap()
            .insert(contribution_id.to_string());
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers.lock().unwrap().len()
    }

    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.transfers.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferGateway for MemoryGateway {
    async fn create_transfer(
        &self,
        request: TransferRequest,
    ) -> Result<TransferReceipt, TransferError> {
        if self
            .fail_for
            .read()
            .unwrap()
            .contains(&request.metadata.contribution_id)
        {
            return Err(TransferError::Declined(format!(
                "test gateway configured to decline {}",
                request.metadata.contribution_id
            )));
        }

        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.transfers.lock().unwrap().push(request);
        Ok(TransferReceipt {
            transfer_id: format!("TXF-{seq:08}"),
            created_at: Utc::now(),
        })
    }
}

/// Recording notification sink
#[derive(Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for MemoryNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), String> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Recording metrics sink
#[derive(Default)]
pub struct MemoryMetrics {
    events: Mutex<Vec<MetricEvent>>,
}

impl MemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MetricEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetricsSink for MemoryMetrics {
    async fn record(&self, event: MetricEvent) -> Result<(), String> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundlock_core::{Amount, EscrowState, ScheduleEntry};

    fn contribution(id: &str, version: u64) -> Contribution {
        Contribution {
            id: id.to_string(),
            project_id: "p1".to_string(),
            contributor_id: "u1".to_string(),
            gross_amount: Amount::from_minor(10_000).unwrap(),
            net_amount: Amount::from_minor(9_200).unwrap(),
            escrow: EscrowState::held(
                Amount::from_minor(9_200).unwrap(),
                vec![ScheduleEntry::pending(
                    "m1",
                    Amount::from_minor(9_200).unwrap(),
                )],
            ),
            version,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_cas_conflict() {
        let store = MemoryStore::new();
        store.insert_contribution(contribution("c1", 3));

        // Stale version is rejected
        let err = store
            .with_contribution_update("c1", 2, &mut |_c| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { actual: 3, .. }));

        // Matching version succeeds and bumps
        let updated = store
            .with_contribution_update("c1", 3, &mut |c| {
                c.escrow
                    .release_milestone_entry("m1", "TXF-1", "admin-1", Utc::now())
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .await
            .unwrap();
        assert_eq!(updated.version, 4);
        assert!(!updated.escrow.held);
    }

    #[tokio::test]
    async fn test_aborted_update_writes_nothing() {
        let store = MemoryStore::new();
        store.insert_contribution(contribution("c1", 0));

        let err = store
            .with_contribution_update("c1", 0, &mut |c| {
                c.escrow.held = false;
                Err("deliberate abort".to_string())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Aborted(_)));

        let stored = store.contribution("c1").await.unwrap();
        assert!(stored.escrow.held);
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_gateway_fail_contribution() {
        let gateway = MemoryGateway::new();
        gateway.fail_contribution("c2");

        let request = TransferRequest {
            destination: "acct_1".to_string(),
            amount: Amount::from_minor(100).unwrap(),
            currency: fundlock_core::Currency::Usd,
            metadata: crate::traits::TransferMetadata {
                contribution_id: "c2".to_string(),
                project_id: "p1".to_string(),
                release_type: "milestone_completion".to_string(),
                milestone_id: Some("m1".to_string()),
            },
        };
        assert!(gateway.create_transfer(request).await.is_err());
        assert_eq!(gateway.transfer_count(), 0);
    }
}
