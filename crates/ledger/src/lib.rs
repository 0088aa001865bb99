//! FundLock Ledger - Release ledger and atomic escrow updates
//!
//! One immutable ledger entry per successful release, applied together with
//! the schedule-entry flip inside a single-contribution atomic unit of work.

mod entry;
mod updater;

pub use entry::{LedgerStore, MemoryLedger, ReleaseLedgerEntry};
pub use updater::{LedgerUpdater, ReleaseApplied, ReleaseRecord};
