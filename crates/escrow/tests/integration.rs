//! End-to-end release pipeline tests against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fundlock_core::{
    Amount, AuditApproval, Caller, Contribution, Currency, EngineError, EscrowState,
    FundingSummary, Milestone, MilestoneStatus, Project, ProjectCategory, ProjectStatus,
    ReleaseType, Role, ScheduleEntry,
};
use fundlock_escrow::{ReleaseConfig, ReleaseEngine, ReleaseItemStatus, ReleaseRequest};
use fundlock_ledger::MemoryLedger;
use fundlock_store::{
    ContributionStore, MemoryGateway, MemoryMetrics, MemoryNotifier, MemoryStore,
};

struct Harness {
    store: Arc<MemoryStore>,
    gateway: Arc<MemoryGateway>,
    ledger: Arc<MemoryLedger>,
    notifier: Arc<MemoryNotifier>,
    engine: ReleaseEngine,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(MemoryGateway::new());
    let ledger = Arc::new(MemoryLedger::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let metrics = Arc::new(MemoryMetrics::new());
    let engine = ReleaseEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        gateway.clone(),
        ledger.clone(),
        notifier.clone(),
        metrics,
        ReleaseConfig::default(),
    );
    Harness {
        store,
        gateway,
        ledger,
        notifier,
        engine,
    }
}

fn milestone(id: &str, status: MilestoneStatus, pct: i64) -> Milestone {
    Milestone {
        id: id.to_string(),
        title: format!("Milestone {id}"),
        status,
        funding_percentage: pct.into(),
        audit_required: false,
        audit_status: None,
    }
}

/// Two milestones (40/60), funding raised 13,800 minor units.
fn project(status: ProjectStatus, m1_status: MilestoneStatus, m2_status: MilestoneStatus) -> Project {
    Project {
        id: "p1".to_string(),
        creator_id: "cr-1".to_string(),
        status,
        category: ProjectCategory::Technology,
        milestones: vec![
            milestone("m1", m1_status, 40),
            milestone("m2", m2_status, 60),
        ],
        funding: FundingSummary {
            raised: Amount::from_minor(13_800).unwrap(),
            goal: Amount::from_minor(13_800).unwrap(),
            currency: Currency::Usd,
        },
        payout_account: Some("acct_creator".to_string()),
    }
}

fn contribution(id: &str, contributor: &str, net: i64, m1: i64, m2: i64) -> Contribution {
    Contribution {
        id: id.to_string(),
        project_id: "p1".to_string(),
        contributor_id: contributor.to_string(),
        gross_amount: Amount::from_minor(net).unwrap(),
        net_amount: Amount::from_minor(net).unwrap(),
        escrow: EscrowState::held(
            Amount::from_minor(net).unwrap(),
            vec![
                ScheduleEntry::pending("m1", Amount::from_minor(m1).unwrap()),
                ScheduleEntry::pending("m2", Amount::from_minor(m2).unwrap()),
            ],
        ),
        version: 0,
        created_at: Utc::now(),
    }
}

fn seed_standard(harness: &Harness, status: ProjectStatus, m1: MilestoneStatus) {
    harness.store.insert_project(project(status, m1, MilestoneStatus::InProgress));
    harness
        .store
        .insert_contribution(contribution("c1", "user-1", 9_200, 3_680, 5_520));
    harness
        .store
        .insert_contribution(contribution("c2", "user-2", 4_600, 1_840, 2_760));
}

fn creator() -> Caller {
    Caller::new("cr-1", vec![Role::Creator])
}

#[tokio::test]
async fn test_milestone_release_end_to_end() {
    let h = harness();
    seed_standard(&h, ProjectStatus::Active, MilestoneStatus::Completed);

    let response = h
        .engine
        .execute(Some(&creator()), ReleaseRequest::milestone("p1", "m1"))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.contributions_processed, 2);
    assert_eq!(response.successful, 2);
    assert_eq!(response.failed, 0);
    assert_eq!(response.total_released, Amount::from_minor(5_520).unwrap());
    assert_eq!(h.gateway.transfer_count(), 2);
    assert_eq!(h.ledger.entries().len(), 2);

    // Entries flipped, escrow still holds the remainder
    for (id, remaining) in [("c1", 5_520), ("c2", 2_760)] {
        let stored = h.store.contribution(id).await.unwrap();
        assert!(stored.escrow.entry_for_milestone("m1").unwrap().released);
        assert!(stored.escrow.held);
        assert_eq!(stored.escrow.remaining(), Amount::from_minor(remaining).unwrap());
    }
}

#[tokio::test]
async fn test_repeat_release_is_idempotent() {
    let h = harness();
    seed_standard(&h, ProjectStatus::Active, MilestoneStatus::Completed);

    let request = ReleaseRequest::milestone("p1", "m1");
    h.engine
        .execute(Some(&creator()), request.clone())
        .await
        .unwrap();
    let second = h.engine.execute(Some(&creator()), request).await.unwrap();

    // Released entries drop out of the plan entirely
    assert!(second.success);
    assert_eq!(second.contributions_processed, 0);
    assert_eq!(second.total_released, Amount::ZERO);
    assert!(second.results.is_empty());
    assert_eq!(h.gateway.transfer_count(), 2);
    assert_eq!(h.ledger.entries().len(), 2);
}

#[tokio::test]
async fn test_incomplete_milestone_blocks_before_transfers() {
    let h = harness();
    seed_standard(&h, ProjectStatus::Active, MilestoneStatus::InProgress);

    let err = h
        .engine
        .execute(Some(&creator()), ReleaseRequest::milestone("p1", "m1"))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::FailedPrecondition(_)));
    assert_eq!(h.gateway.transfer_count(), 0);
    assert!(h.ledger.entries().is_empty());
    let stored = h.store.contribution("c1").await.unwrap();
    assert!(!stored.escrow.entry_for_milestone("m1").unwrap().released);
}

#[tokio::test]
async fn test_audit_gate_blocks_release() {
    let h = harness();
    let mut project = project(
        ProjectStatus::Active,
        MilestoneStatus::Completed,
        MilestoneStatus::InProgress,
    );
    project.milestones[0].audit_required = true;
    project.milestones[0].audit_status = Some(AuditApproval::Pending);
    h.store.insert_project(project);
    h.store
        .insert_contribution(contribution("c1", "user-1", 9_200, 3_680, 5_520));

    let err = h
        .engine
        .execute(Some(&creator()), ReleaseRequest::milestone("p1", "m1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::FailedPrecondition(_)));
    assert_eq!(h.gateway.transfer_count(), 0);
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let h = harness();
    seed_standard(&h, ProjectStatus::Active, MilestoneStatus::Completed);
    h.gateway.fail_contribution("c2");

    let response = h
        .engine
        .execute(Some(&creator()), ReleaseRequest::milestone("p1", "m1"))
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.successful, 1);
    assert_eq!(response.failed, 1);
    assert_eq!(response.total_released, Amount::from_minor(3_680).unwrap());

    let failed = response
        .results
        .iter()
        .find(|r| r.contribution_id == "c2")
        .unwrap();
    assert_eq!(failed.status, ReleaseItemStatus::Failed);
    assert!(failed.error.is_some());

    // Failed contribution keeps its unreleased entry for retry
    let stored = h.store.contribution("c2").await.unwrap();
    assert!(!stored.escrow.entry_for_milestone("m1").unwrap().released);
    assert_eq!(stored.version, 0);
    assert_eq!(h.ledger.entries().len(), 1);
}

#[tokio::test]
async fn test_project_completion_releases_remainder() {
    let h = harness();
    h.store.insert_project(project(
        ProjectStatus::Completed,
        MilestoneStatus::Completed,
        MilestoneStatus::Completed,
    ));
    h.store
        .insert_contribution(contribution("c1", "user-1", 9_200, 3_680, 5_520));
    h.store
        .insert_contribution(contribution("c2", "user-2", 4_600, 1_840, 2_760));

    // First the milestone, then project completion picks up what is left.
    h.engine
        .execute(Some(&creator()), ReleaseRequest::milestone("p1", "m1"))
        .await
        .unwrap();

    let mut request = ReleaseRequest::milestone("p1", "m1");
    request.release_type = ReleaseType::ProjectCompletion;
    request.milestone_id = None;
    let response = h.engine.execute(Some(&creator()), request).await.unwrap();

    assert_eq!(response.total_released, Amount::from_minor(8_280).unwrap());
    for id in ["c1", "c2"] {
        let stored = h.store.contribution(id).await.unwrap();
        assert!(!stored.escrow.held);
        assert_eq!(stored.escrow.remaining(), Amount::ZERO);
        assert_eq!(stored.escrow.released_total(), stored.escrow.held_amount);
    }

    // Conservation: ledger totals match what was held
    let ledger_total = Amount::sum(h.ledger.entries().iter().map(|e| &e.amount));
    assert_eq!(ledger_total, Amount::from_minor(13_800).unwrap());
}

#[tokio::test]
async fn test_admin_override_with_percentage() {
    let h = harness();
    seed_standard(&h, ProjectStatus::Active, MilestoneStatus::InProgress);

    let mut request = ReleaseRequest::milestone("p1", "m1");
    request.release_type = ReleaseType::AdminOverride;
    request.milestone_id = None;
    request.release_percentage = Some(50);
    request.release_reason = Some("chargeback settlement, partial payout ordered".to_string());

    let admin = Caller::admin("admin-1");
    let response = h.engine.execute(Some(&admin), request).await.unwrap();

    // 50% of 9,200 + 50% of 4,600
    assert_eq!(response.total_released, Amount::from_minor(6_900).unwrap());
    assert_eq!(response.successful, 2);

    // Override settles the schedule; the escrow is closed even though the
    // ledger records the scaled amounts.
    for id in ["c1", "c2"] {
        let stored = h.store.contribution(id).await.unwrap();
        assert!(!stored.escrow.held);
    }
}

#[tokio::test]
async fn test_override_requires_admin() {
    let h = harness();
    seed_standard(&h, ProjectStatus::Active, MilestoneStatus::Completed);

    let mut request = ReleaseRequest::milestone("p1", "m1");
    request.release_type = ReleaseType::EmergencyRelease;
    request.milestone_id = None;
    request.release_reason = Some("creator account frozen by payments team".to_string());

    let err = h
        .engine
        .execute(Some(&creator()), request)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
    assert_eq!(h.gateway.transfer_count(), 0);
}

#[tokio::test]
async fn test_outsider_denied() {
    let h = harness();
    seed_standard(&h, ProjectStatus::Active, MilestoneStatus::Completed);

    let outsider = Caller::new("user-9", vec![Role::Contributor]);
    let err = h
        .engine
        .execute(Some(&outsider), ReleaseRequest::milestone("p1", "m1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_bypass_ignored_for_non_admin() {
    let h = harness();
    let mut p = project(
        ProjectStatus::Active,
        MilestoneStatus::Completed,
        MilestoneStatus::InProgress,
    );
    p.milestones[0].audit_required = true;
    p.milestones[0].audit_status = Some(AuditApproval::Pending);
    h.store.insert_project(p);
    h.store
        .insert_contribution(contribution("c1", "user-1", 9_200, 3_680, 5_520));

    let mut request = ReleaseRequest::milestone("p1", "m1");
    request.bypass_safety_checks = true;

    // Creator cannot bypass the audit gate
    let err = h
        .engine
        .execute(Some(&creator()), request.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::FailedPrecondition(_)));

    // An admin with the same request can
    let admin = Caller::admin("admin-1");
    let response = h.engine.execute(Some(&admin), request).await.unwrap();
    assert_eq!(response.successful, 1);
}

#[tokio::test]
async fn test_unknown_project_not_found() {
    let h = harness();
    let err = h
        .engine
        .execute(Some(&creator()), ReleaseRequest::milestone("ghost", "m1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound { kind: "project", .. }));
}

#[tokio::test]
async fn test_notifications_sent_to_creator_and_contributors() {
    let h = harness();
    seed_standard(&h, ProjectStatus::Active, MilestoneStatus::Completed);

    h.engine
        .execute(Some(&creator()), ReleaseRequest::milestone("p1", "m1"))
        .await
        .unwrap();

    // Side effects run detached from the response
    tokio::time::sleep(Duration::from_millis(50)).await;
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 3);
    assert!(sent
        .iter()
        .any(|n| n.recipient_id == "cr-1" && n.topic == "escrow_released"));
    for contributor in ["user-1", "user-2"] {
        assert!(sent
            .iter()
            .any(|n| n.recipient_id == contributor && n.topic == "contribution_released"));
    }
}

#[tokio::test]
async fn test_fallback_payout_account() {
    let h = harness();
    let mut p = project(
        ProjectStatus::Active,
        MilestoneStatus::Completed,
        MilestoneStatus::InProgress,
    );
    p.payout_account = None;
    h.store.insert_project(p);
    h.store
        .insert_contribution(contribution("c1", "user-1", 9_200, 3_680, 5_520));

    h.engine
        .execute(Some(&creator()), ReleaseRequest::milestone("p1", "m1"))
        .await
        .unwrap();

    let transfers = h.gateway.transfers();
    assert_eq!(transfers.len(), 1);
    assert_eq!(transfers[0].destination, "acct_platform_holding");
}
