//! FundLock Store - External collaborator seams
//!
//! Interfaces for the systems the escrow engine depends on but does not own:
//! the document store, the payment-transfer primitive, notification delivery,
//! and metrics ingestion. Includes in-memory implementations used by tests
//! across the workspace.

mod error;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryGateway, MemoryMetrics, MemoryNotifier, MemoryStore};
pub use traits::{
    AuditStore, AuditorDirectory, ContributionMutation, ContributionStore, MetricEvent,
    MetricsSink, Notification, NotificationSink, ProjectStore, TransferError, TransferGateway,
    TransferMetadata, TransferReceipt, TransferRequest,
};
