//! Release permission gate
//!
//! Who may invoke which release type, evaluated before any condition check:
//! - `milestone_completion`: project creator or an assigned auditor
//! - `project_completion`: project creator or a platform admin
//! - `emergency_release` / `admin_override`: platform admin only

use fundlock_core::{require_caller, Caller, EngineError, EngineResult, Project, ReleaseType};
use fundlock_store::AuditStore;

pub async fn authorize_release(
    audits: &dyn AuditStore,
    caller: Option<&Caller>,
    project: &Project,
    release_type: ReleaseType,
) -> EngineResult<()> {
    let caller = require_caller(caller)?;
    if caller.is_admin() {
        return Ok(());
    }

    let is_creator = caller.user_id == project.creator_id;
    match release_type {
        ReleaseType::MilestoneCompletion => {
            if is_creator || audits.has_active_audit(&caller.user_id, &project.id).await? {
                Ok(())
            } else {
                Err(EngineError::permission_denied(
                    "milestone releases require the project creator or an assigned auditor",
                ))
            }
        }
        ReleaseType::ProjectCompletion => {
            if is_creator {
                Ok(())
            } else {
                Err(EngineError::permission_denied(
                    "project completion releases require the project creator or an admin",
                ))
            }
        }
        ReleaseType::EmergencyRelease | ReleaseType::AdminOverride => {
            Err(EngineError::permission_denied(format!(
                "{release_type} releases require a platform admin"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundlock_core::{
        Amount, Currency, FundingSummary, ProjectCategory, ProjectStatus, Role,
    };
    use fundlock_store::MemoryStore;

    fn project() -> Project {
        Project {
            id: "p1".to_string(),
            creator_id: "cr-1".to_string(),
            status: ProjectStatus::Active,
            category: ProjectCategory::Technology,
            milestones: vec![],
            funding: FundingSummary {
                raised: Amount::from_minor(10_000).unwrap(),
                goal: Amount::from_minor(10_000).unwrap(),
                currency: Currency::Usd,
            },
            payout_account: None,
        }
    }

    #[tokio::test]
    async fn test_no_caller_is_unauthenticated() {
        let store = MemoryStore::new();
        let err = authorize_release(&store, None, &project(), ReleaseType::MilestoneCompletion)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_creator_may_release_milestone_and_completion() {
        let store = MemoryStore::new();
        let creator = Caller::new("cr-1", vec![Role::Creator]);
        assert!(authorize_release(
            &store,
            Some(&creator),
            &project(),
            ReleaseType::MilestoneCompletion
        )
        .await
        .is_ok());
        assert!(authorize_release(
            &store,
            Some(&creator),
            &project(),
            ReleaseType::ProjectCompletion
        )
        .await
        .is_ok());
        assert!(authorize_release(
            &store,
            Some(&creator),
            &project(),
            ReleaseType::EmergencyRelease
        )
        .await
        .is_err());
    }

    #[tokio::test]
    async fn test_admin_may_do_everything() {
        let store = MemoryStore::new();
        let admin = Caller::admin("admin-1");
        for release_type in [
            ReleaseType::MilestoneCompletion,
            ReleaseType::ProjectCompletion,
            ReleaseType::EmergencyRelease,
            ReleaseType::AdminOverride,
        ] {
            assert!(
                authorize_release(&store, Some(&admin), &project(), release_type)
                    .await
                    .is_ok()
            );
        }
    }

    #[tokio::test]
    async fn test_outsider_denied() {
        let store = MemoryStore::new();
        let outsider = Caller::new("someone", vec![Role::Contributor]);
        let err = authorize_release(
            &store,
            Some(&outsider),
            &project(),
            ReleaseType::MilestoneCompletion,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied(_)));
    }
}
