//! FundLock Core - Domain types
//!
//! This crate contains the fundamental types used across FundLock:
//! - `Amount`: Non-negative decimal wrapper for monetary values (minor units)
//! - `Currency`: Type-safe currency codes
//! - Project, contribution/escrow, and audit domain models
//! - `EngineError`: the shared caller-facing error taxonomy
//! - `Caller`: verified caller identity and roles

pub mod amount;
pub mod audit;
pub mod caller;
pub mod contribution;
pub mod currency;
pub mod error;
pub mod project;
pub mod release;

pub use amount::Amount;
pub use audit::{
    AcceptanceRecord, Audit, AuditPriority, AuditStatus, AuditorProfile, Certification,
    Compensation, RequestedResource, ResourceType, Specialization, TimelinePhase,
};
pub use caller::{require_caller, Caller, Role};
pub use contribution::{Contribution, EscrowState, ScheduleEntry, ScheduleError};
pub use currency::Currency;
pub use error::{EngineError, EngineResult};
pub use release::ReleaseType;
pub use project::{
    AuditApproval, FundingSummary, Milestone, MilestoneStatus, Project, ProjectCategory,
    ProjectStatus,
};
