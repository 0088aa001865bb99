//! Release ledger entries
//!
//! The ledger is the system of record for reconciliation: one immutable,
//! append-only entry per successful release. Entries are never updated after
//! creation; the store trait deliberately exposes no update or delete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fundlock_core::{Amount, ReleaseType};
use fundlock_store::StoreResult;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// An immutable record of one completed release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseLedgerEntry {
    pub id: String,
    pub contribution_id: String,
    pub project_id: String,
    pub release_type: ReleaseType,
    pub milestone_id: Option<String>,
    /// The amount actually transferred
    pub amount: Amount,
    pub transfer_id: String,
    pub released_by: String,
    pub created_at: DateTime<Utc>,
}

impl ReleaseLedgerEntry {
    /// Generate a prefixed ledger id, e.g. `LGR-9B41E7D2`.
    pub fn generate_id() -> String {
        format!(
            "LGR-{}",
            uuid::Uuid::new_v4().to_string()[..8].to_uppercase()
        )
    }
}

/// Append-only ledger persistence
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, entry: &ReleaseLedgerEntry) -> StoreResult<()>;
}

/// In-memory ledger for tests
#[derive(Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<ReleaseLedgerEntry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<ReleaseLedgerEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn entries_for_contribution(&self, contribution_id: &str) -> Vec<ReleaseLedgerEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.contribution_id == contribution_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn append(&self, entry: &ReleaseLedgerEntry) -> StoreResult<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}
