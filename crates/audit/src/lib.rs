//! # FundLock Audit Module
//!
//! Audit assignment and acceptance lifecycle gating escrow release.
//!
//! ## Scope
//! - Auditor eligibility validation (permissions, qualifications, workload)
//! - Conflict-of-interest checks (hard rejects + manual-review flags)
//! - Compensation calculation with per-category tables
//! - `assigned -> in_progress` acceptance with timeline validation
//!
//! Completion and rejection are driven by the external report-submission
//! process; their resulting audit status feeds the escrow release gate.

mod acceptance;
mod assignment;
mod compensation;
mod config;
mod eligibility;

pub use acceptance::{
    AcceptanceRequest, AcceptanceResponse, AcceptanceService, MANDATED_PHASES,
};
pub use assignment::{AssignmentRequest, AssignmentResponse, AssignmentService};
pub use compensation::{compute_compensation, minimum_compensation};
pub use config::AuditConfig;
pub use eligibility::{
    check_conflicts, validate_eligibility, ConflictInput, EligibilityInput, AUDIT_CAPABILITY,
};
