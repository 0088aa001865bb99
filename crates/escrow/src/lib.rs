//! FundLock Escrow - Release evaluation and execution
//!
//! The release pipeline: request validation, permission gating, condition
//! evaluation, per-contribution calculation, bounded-concurrency transfer
//! execution, and atomic ledger recording. [`ReleaseEngine`] wires the stages
//! together.

pub mod access;
pub mod calculator;
pub mod conditions;
pub mod config;
pub mod engine;
pub mod request;
pub mod transfer;

pub use conditions::ApprovedRelease;
pub use config::ReleaseConfig;
pub use engine::ReleaseEngine;
pub use request::{
    ContributionReleaseResult, ReleaseItemStatus, ReleaseRequest, ReleaseResponse,
};
pub use transfer::{TransferBatchExecutor, TransferContext, TransferOutcome};
