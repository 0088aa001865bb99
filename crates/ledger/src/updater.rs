//! Atomic ledger and escrow-state updates
//!
//! Applied only for successful transfers, one contribution per atomic unit of
//! work. The schedule-entry flip is conditional on the contribution version
//! (compare-and-swap), so two racing invocations cannot both release the same
//! entry: the loser either observes a version conflict and re-reads, or sees
//! `released = true` and skips.

use std::sync::Arc;

use chrono::Utc;
use fundlock_core::{Amount, EngineError, EngineResult, ReleaseType};
use fundlock_store::{ContributionStore, StoreError};
use tracing::{debug, info, warn};

use crate::entry::{LedgerStore, ReleaseLedgerEntry};

const DEFAULT_MAX_CAS_RETRIES: u32 = 3;

/// A successful transfer to be recorded against its contribution
#[derive(Debug, Clone)]
pub struct ReleaseRecord {
    pub contribution_id: String,
    pub project_id: String,
    pub release_type: ReleaseType,
    pub milestone_id: Option<String>,
    /// The amount actually transferred (may be a percentage of the remainder
    /// for override releases)
    pub amount: Amount,
    pub transfer_id: String,
    pub released_by: String,
}

/// Outcome of recording one release
#[derive(Debug, Clone)]
pub enum ReleaseApplied {
    /// Schedule flipped and ledger entry appended
    Applied {
        entry: ReleaseLedgerEntry,
        /// The escrow is now fully released (`held` cleared)
        fully_released: bool,
    },
    /// Another invocation already released this entry; nothing was written
    AlreadyReleased,
}

/// Applies successful releases to contributions and the ledger
pub struct LedgerUpdater {
    contributions: Arc<dyn ContributionStore>,
    ledger: Arc<dyn LedgerStore>,
    max_cas_retries: u32,
}

impl LedgerUpdater {
    pub fn new(contributions: Arc<dyn ContributionStore>, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            contributions,
            ledger,
            max_cas_retries: DEFAULT_MAX_CAS_RETRIES,
        }
    }

    pub fn with_max_cas_retries(mut self, retries: u32) -> Self {
        self.max_cas_retries = retries;
        self
    }

    /// Record one successful transfer: flip the matching schedule entries,
    /// clear `held` when fully covered, append one ledger entry.
    ///
    /// Milestone releases flip the single matching entry; full and override
    /// releases flip every entry still unreleased. A version conflict re-reads
    /// and retries up to the configured bound.
    pub async fn record_release(&self, record: &ReleaseRecord) -> EngineResult<ReleaseApplied> {
        let mut attempt = 0;
        loop {
            let contribution = self
                .contributions
                .contribution(&record.contribution_id)
                .await
                .map_err(EngineError::from)?;

            // A fresh read that shows nothing left to release means another
            // invocation won the race; skip without writing.
            match &record.milestone_id {
                Some(milestone_id) => {
                    match contribution.escrow.entry_for_milestone(milestone_id) {
                        Some(entry) if !entry.released => {}
                        _ => return Ok(ReleaseApplied::AlreadyReleased),
                    }
                }
                None => {
                    if contribution.escrow.remaining().is_zero() {
                        return Ok(ReleaseApplied::AlreadyReleased);
                    }
                }
            }

            let now = Utc::now();
            let milestone_id = record.milestone_id.clone();
            let transfer_id = record.transfer_id.clone();
            let released_by = record.released_by.clone();
            let result = self
                .contributions
                .with_contribution_update(
                    &record.contribution_id,
                    contribution.version,
                    &mut |c| match &milestone_id {
                        Some(m) => c
                            .escrow
                            .release_milestone_entry(m, &transfer_id, &released_by, now)
                            .map(|_| ())
                            .map_err(|e| e.to_string()),
                        None => {
                            c.escrow
                                .release_remaining_entries(&transfer_id, &released_by, now);
                            Ok(())
                        }
                    },
                )
                .await;

            match result {
                Ok(updated) => {
                    let entry = ReleaseLedgerEntry {
                        id: ReleaseLedgerEntry::generate_id(),
                        contribution_id: record.contribution_id.clone(),
                        project_id: record.project_id.clone(),
                        release_type: record.release_type,
                        milestone_id: record.milestone_id.clone(),
                        amount: record.amount,
                        transfer_id: record.transfer_id.clone(),
                        released_by: record.released_by.clone(),
                        created_at: now,
                    };
                    self.ledger.append(&entry).await.map_err(EngineError::from)?;

                    let fully_released = !updated.escrow.held;
                    if fully_released {
                        info!(
                            contribution_id = %record.contribution_id,
                            "escrow fully released"
                        );
                    }
                    return Ok(ReleaseApplied::Applied {
                        entry,
                        fully_released,
                    });
                }
                Err(StoreError::VersionConflict { actual, .. }) => {
                    attempt += 1;
                    if attempt > self.max_cas_retries {
                        return Err(EngineError::internal(format!(
                            "gave up updating contribution {} after {} version conflicts",
                            record.contribution_id, attempt
                        )));
                    }
                    debug!(
                        contribution_id = %record.contribution_id,
                        actual_version = actual,
                        attempt,
                        "version conflict, re-reading"
                    );
                }
                Err(StoreError::Aborted(reason)) => {
                    // The flip re-checks `released` inside the unit of work;
                    // an abort here means the entry was released between our
                    // read and the write.
                    warn!(
                        contribution_id = %record.contribution_id,
                        reason = %reason,
                        "release update aborted"
                    );
                    return Ok(ReleaseApplied::AlreadyReleased);
                }
                Err(other) => return Err(other.into()),
            }
        }
    }
}
