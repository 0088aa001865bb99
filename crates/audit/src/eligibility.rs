//! Auditor eligibility and conflict-of-interest checks
//!
//! Ordered checks that short-circuit on the first failure. All inputs are
//! pre-fetched by the assignment service; the functions here are pure so the
//! policy is testable without a store.

use fundlock_core::{Amount, AuditorProfile, EngineError, EngineResult, ProjectCategory,
    Specialization};
use tracing::warn;

use crate::compensation::minimum_compensation;
use crate::config::AuditConfig;

/// Capability required to take audit assignments
pub const AUDIT_CAPABILITY: &str = "audit";

/// Everything the eligibility checks consult
#[derive(Debug)]
pub struct EligibilityInput<'a> {
    pub profile: &'a AuditorProfile,
    pub required_specializations: &'a [Specialization],
    pub category: ProjectCategory,
    /// Audits currently in {assigned, in_progress} for this auditor
    pub active_audit_count: u32,
    pub requested_compensation: Option<Amount>,
}

/// Validate that a candidate auditor may be assigned.
///
/// Check order (short-circuiting):
/// 1. audit capability + active account
/// 2. specialization coverage
/// 3. certification for regulated categories
/// 4. workload below concurrency cap
/// 5. requested compensation above the auditor's rate floor
pub fn validate_eligibility(config: &AuditConfig, input: &EligibilityInput<'_>) -> EngineResult<()> {
    let profile = input.profile;

    if !profile.has_capability(AUDIT_CAPABILITY) {
        return Err(EngineError::permission_denied(format!(
            "user {} does not hold the audit capability",
            profile.user_id
        )));
    }
    if !profile.active {
        return Err(EngineError::failed_precondition(format!(
            "auditor account {} is not active",
            profile.user_id
        )));
    }

    let missing: Vec<String> = input
        .required_specializations
        .iter()
        .filter(|s| !profile.specializations.contains(s))
        .map(|s| s.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::invalid_argument(
            "specializations",
            format!("auditor lacks required specializations: {}", missing.join(", ")),
        ));
    }

    if input.category.is_regulated() && !profile.certified_for(input.category) {
        return Err(EngineError::failed_precondition(format!(
            "category {} requires an active certification the auditor does not hold",
            input.category
        )));
    }

    let cap = profile
        .concurrency_cap
        .unwrap_or(config.default_concurrency_cap);
    if input.active_audit_count >= cap {
        return Err(EngineError::failed_precondition(format!(
            "auditor {} already has {} active audits (cap {})",
            profile.user_id, input.active_audit_count, cap
        )));
    }

    if let Some(requested) = input.requested_compensation {
        let floor = minimum_compensation(config, input.category, profile.min_hourly_rate);
        if requested < floor {
            return Err(EngineError::invalid_argument(
                "compensation",
                format!(
                    "proposed compensation {} is below the auditor minimum {} for this category",
                    requested, floor
                ),
            ));
        }
    }

    Ok(())
}

/// Relationship facts consulted by the conflict-of-interest check
#[derive(Debug)]
pub struct ConflictInput<'a> {
    pub auditor_id: &'a str,
    pub creator_id: &'a str,
    pub has_contributed_to_project: bool,
    /// Distinct projects of this creator the auditor has audits on
    pub audited_creator_projects: u32,
    pub shares_project_with_creator: bool,
}

/// Check for conflicts of interest.
///
/// Contributing to the project or exceeding the per-creator audit cap is a
/// hard rejection. A shared-project relationship with the creator is
/// deliberately permissive: logged and returned as a review flag, but the
/// assignment proceeds.
pub fn check_conflicts(config: &AuditConfig, input: &ConflictInput<'_>) -> EngineResult<Vec<String>> {
    if input.has_contributed_to_project {
        return Err(EngineError::failed_precondition(format!(
            "auditor {} has contributed funds to this project",
            input.auditor_id
        )));
    }

    if input.audited_creator_projects > config.max_audits_per_creator {
        return Err(EngineError::failed_precondition(format!(
            "auditor {} has already audited {} projects from creator {} (max {})",
            input.auditor_id,
            input.audited_creator_projects,
            input.creator_id,
            config.max_audits_per_creator
        )));
    }

    let mut flags = Vec::new();
    if input.shares_project_with_creator {
        warn!(
            auditor_id = input.auditor_id,
            creator_id = input.creator_id,
            "auditor shares a project with the creator; flagging for manual review"
        );
        flags.push("shared_project_with_creator".to_string());
    }
    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundlock_core::Certification;

    fn profile() -> AuditorProfile {
        AuditorProfile {
            user_id: "aud-1".to_string(),
            active: true,
            capabilities: vec![AUDIT_CAPABILITY.to_string()],
            specializations: vec![Specialization::Financial, Specialization::Compliance],
            certifications: vec![Certification {
                category: ProjectCategory::Finance,
                active: true,
            }],
            concurrency_cap: None,
            min_hourly_rate: None,
        }
    }

    fn input<'a>(
        profile: &'a AuditorProfile,
        required: &'a [Specialization],
    ) -> EligibilityInput<'a> {
        EligibilityInput {
            profile,
            required_specializations: required,
            category: ProjectCategory::Technology,
            active_audit_count: 0,
            requested_compensation: None,
        }
    }

    #[test]
    fn test_happy_path() {
        let profile = profile();
        let required = [Specialization::Financial];
        assert!(validate_eligibility(&AuditConfig::default(), &input(&profile, &required)).is_ok());
    }

    #[test]
    fn test_missing_capability_is_permission_denied() {
        let mut profile = profile();
        profile.capabilities.clear();
        let required = [Specialization::Financial];
        let err =
            validate_eligibility(&AuditConfig::default(), &input(&profile, &required)).unwrap_err();
        assert!(matches!(err, EngineError::PermissionDenied(_)));
    }

    #[test]
    fn test_inactive_account() {
        let mut profile = profile();
        profile.active = false;
        let required = [Specialization::Financial];
        let err =
            validate_eligibility(&AuditConfig::default(), &input(&profile, &required)).unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
    }

    #[test]
    fn test_missing_specializations_named() {
        let profile = profile();
        let required = [Specialization::Financial, Specialization::Legal];
        let err =
            validate_eligibility(&AuditConfig::default(), &input(&profile, &required)).unwrap_err();
        match err {
            EngineError::InvalidArgument { field, message } => {
                assert_eq!(field, "specializations");
                assert!(message.contains("legal"));
                assert!(!message.contains("financial"));
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_regulated_category_requires_certification() {
        let profile = profile();
        let required = [Specialization::Financial];
        let mut inp = input(&profile, &required);
        inp.category = ProjectCategory::Health;
        let err = validate_eligibility(&AuditConfig::default(), &inp).unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));

        // Certified category passes
        inp.category = ProjectCategory::Finance;
        assert!(validate_eligibility(&AuditConfig::default(), &inp).is_ok());
    }

    #[test]
    fn test_workload_cap() {
        let profile = profile();
        let required = [Specialization::Financial];
        let mut inp = input(&profile, &required);
        inp.active_audit_count = 5; // default cap
        let err = validate_eligibility(&AuditConfig::default(), &inp).unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
    }

    #[test]
    fn test_per_auditor_cap_overrides_default() {
        let mut profile = profile();
        profile.concurrency_cap = Some(2);
        let required = [Specialization::Financial];
        let mut inp = input(&profile, &required);
        inp.active_audit_count = 2;
        assert!(validate_eligibility(&AuditConfig::default(), &inp).is_err());
        inp.active_audit_count = 1;
        assert!(validate_eligibility(&AuditConfig::default(), &inp).is_ok());
    }

    #[test]
    fn test_compensation_floor() {
        let mut profile = profile();
        profile.min_hourly_rate = Some(Amount::from_minor(5_000).unwrap());
        let required = [Specialization::Financial];
        let mut inp = input(&profile, &required);
        // Technology: 24h x 5000 = 120_000 floor
        inp.requested_compensation = Some(Amount::from_minor(100_000).unwrap());
        let err = validate_eligibility(&AuditConfig::default(), &inp).unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument { .. }));

        inp.requested_compensation = Some(Amount::from_minor(120_000).unwrap());
        assert!(validate_eligibility(&AuditConfig::default(), &inp).is_ok());
    }

    #[test]
    fn test_conflict_contributor_rejected() {
        let config = AuditConfig::default();
        let err = check_conflicts(
            &config,
            &ConflictInput {
                auditor_id: "aud-1",
                creator_id: "cr-1",
                has_contributed_to_project: true,
                audited_creator_projects: 0,
                shares_project_with_creator: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));
    }

    #[test]
    fn test_conflict_creator_cap() {
        let config = AuditConfig::default();
        let err = check_conflicts(
            &config,
            &ConflictInput {
                auditor_id: "aud-1",
                creator_id: "cr-1",
                has_contributed_to_project: false,
                audited_creator_projects: 4,
                shares_project_with_creator: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::FailedPrecondition(_)));

        // At the cap is still allowed
        let flags = check_conflicts(
            &config,
            &ConflictInput {
                auditor_id: "aud-1",
                creator_id: "cr-1",
                has_contributed_to_project: false,
                audited_creator_projects: 3,
                shares_project_with_creator: false,
            },
        )
        .unwrap();
        assert!(flags.is_empty());
    }

    #[test]
    fn test_shared_project_flags_but_allows() {
        let config = AuditConfig::default();
        let flags = check_conflicts(
            &config,
            &ConflictInput {
                auditor_id: "aud-1",
                creator_id: "cr-1",
                has_contributed_to_project: false,
                audited_creator_projects: 0,
                shares_project_with_creator: true,
            },
        )
        .unwrap();
        assert_eq!(flags, vec!["shared_project_with_creator".to_string()]);
    }
}
