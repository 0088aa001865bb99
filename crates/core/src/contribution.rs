//! Contribution and escrow domain model
//!
//! Each contribution holds funds in escrow with a per-milestone release
//! schedule. The escrow sub-object is exclusively owned by the release
//! engine; nothing else mutates it.
//!
//! # Invariants
//! - A schedule entry's `released` flag flips false -> true exactly once and
//!   never back.
//! - The sum of released schedule amounts never exceeds `held_amount`.
//! - `held` clears only once the released sum reaches `held_amount`.

use crate::amount::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a schedule entry could not be released
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("no schedule entry for milestone {0}")]
    NotScheduled(String),

    #[error("schedule entry for milestone {0} already released")]
    AlreadyReleased(String),
}

/// The portion of one contribution's held funds tied to one milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub milestone_id: String,
    pub amount: Amount,
    pub release_condition: String,
    pub released: bool,
    pub released_at: Option<DateTime<Utc>>,
    pub transfer_id: Option<String>,
    pub released_by: Option<String>,
}

impl ScheduleEntry {
    pub fn pending(milestone_id: impl Into<String>, amount: Amount) -> Self {
        Self {
            milestone_id: milestone_id.into(),
            amount,
            release_condition: "milestone_completion".to_string(),
            released: false,
            released_at: None,
            transfer_id: None,
            released_by: None,
        }
    }

    fn mark_released(&mut self, transfer_id: &str, actor: &str, at: DateTime<Utc>) {
        self.released = true;
        self.released_at = Some(at);
        self.transfer_id = Some(transfer_id.to_string());
        self.released_by = Some(actor.to_string());
    }
}

/// Escrow state for one contribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowState {
    pub held: bool,
    pub held_amount: Amount,
    pub release_schedule: Vec<ScheduleEntry>,
    pub fully_released_at: Option<DateTime<Utc>>,
}

impl EscrowState {
    /// New escrow holding `held_amount` against the given schedule.
    pub fn held(held_amount: Amount, release_schedule: Vec<ScheduleEntry>) -> Self {
        Self {
            held: true,
            held_amount,
            release_schedule,
            fully_released_at: None,
        }
    }

    /// Sum of amounts whose entries are already released.
    pub fn released_total(&self) -> Amount {
        Amount::sum(
            self.release_schedule
                .iter()
                .filter(|e| e.released)
                .map(|e| &e.amount),
        )
    }

    /// Held amount not yet covered by released entries.
    pub fn remaining(&self) -> Amount {
        self.held_amount.saturating_sub(&self.released_total())
    }

    pub fn entry_for_milestone(&self, milestone_id: &str) -> Option<&ScheduleEntry> {
        self.release_schedule
            .iter()
            .find(|e| e.milestone_id == milestone_id)
    }

    /// Flip the entry for `milestone_id` to released.
    ///
    /// Returns the entry amount on success. Rejects a second flip so a racing
    /// invocation that lost the update cannot double-release.
    pub fn release_milestone_entry(
        &mut self,
        milestone_id: &str,
        transfer_id: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Result<Amount, ScheduleError> {
        let entry = self
            .release_schedule
            .iter_mut()
            .find(|e| e.milestone_id == milestone_id)
            .ok_or_else(|| ScheduleError::NotScheduled(milestone_id.to_string()))?;
        if entry.released {
            return Err(ScheduleError::AlreadyReleased(milestone_id.to_string()));
        }
        entry.mark_released(transfer_id, actor, at);
        let amount = entry.amount;
        self.settle(at);
        Ok(amount)
    }

    /// Flip every not-yet-released entry (full or override releases).
    ///
    /// Returns the sum of the entry amounts flipped; zero when nothing was
    /// left to release.
    pub fn release_remaining_entries(
        &mut self,
        transfer_id: &str,
        actor: &str,
        at: DateTime<Utc>,
    ) -> Amount {
        let mut flipped = Amount::ZERO;
        for entry in self.release_schedule.iter_mut().filter(|e| !e.released) {
            entry.mark_released(transfer_id, actor, at);
            flipped = flipped.checked_add(&entry.amount).unwrap_or(flipped);
        }
        self.settle(at);
        flipped
    }

    /// Clear `held` once the released sum covers the held amount.
    fn settle(&mut self, at: DateTime<Utc>) {
        if self.held && self.released_total() >= self.held_amount {
            self.held = false;
            self.fully_released_at = Some(at);
        }
    }
}

/// One party's contribution to a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub id: String,
    pub project_id: String,
    pub contributor_id: String,
    pub gross_amount: Amount,
    pub net_amount: Amount,
    pub escrow: EscrowState,
    /// Optimistic-concurrency token, bumped on every write.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn escrow_two_milestones() -> EscrowState {
        EscrowState::held(
            Amount::from_minor(9_200).unwrap(),
            vec![
                ScheduleEntry::pending("m1", Amount::from_minor(3_680).unwrap()),
                ScheduleEntry::pending("m2", Amount::from_minor(5_520).unwrap()),
            ],
        )
    }

    #[test]
    fn test_release_milestone_entry_once() {
        let mut escrow = escrow_two_milestones();
        let now = Utc::now();

        let amount = escrow
            .release_milestone_entry("m1", "TXF-1", "admin-1", now)
            .unwrap();
        assert_eq!(amount, Amount::from_minor(3_680).unwrap());
        assert!(escrow.held);
        assert_eq!(escrow.remaining(), Amount::from_minor(5_520).unwrap());

        // Second flip is rejected
        let err = escrow
            .release_milestone_entry("m1", "TXF-2", "admin-1", now)
            .unwrap_err();
        assert_eq!(err, ScheduleError::AlreadyReleased("m1".to_string()));
    }

    #[test]
    fn test_unscheduled_milestone() {
        let mut escrow = escrow_two_milestones();
        let err = escrow
            .release_milestone_entry("m9", "TXF-1", "admin-1", Utc::now())
            .unwrap_err();
        assert_eq!(err, ScheduleError::NotScheduled("m9".to_string()));
    }

    #[test]
    fn test_held_clears_when_fully_released() {
        let mut escrow = escrow_two_milestones();
        let now = Utc::now();

        escrow
            .release_milestone_entry("m1", "TXF-1", "admin-1", now)
            .unwrap();
        assert!(escrow.held);
        assert!(escrow.fully_released_at.is_none());

        escrow
            .release_milestone_entry("m2", "TXF-2", "admin-1", now)
            .unwrap();
        assert!(!escrow.held);
        assert!(escrow.fully_released_at.is_some());
        assert_eq!(escrow.remaining(), Amount::ZERO);
    }

    #[test]
    fn test_release_remaining_entries() {
        let mut escrow = escrow_two_milestones();
        let now = Utc::now();
        escrow
            .release_milestone_entry("m1", "TXF-1", "admin-1", now)
            .unwrap();

        let flipped = escrow.release_remaining_entries("TXF-2", "admin-1", now);
        assert_eq!(flipped, Amount::from_minor(5_520).unwrap());
        assert!(!escrow.held);

        // Nothing left to flip
        let again = escrow.release_remaining_entries("TXF-3", "admin-1", now);
        assert_eq!(again, Amount::ZERO);
    }

    #[test]
    fn test_conservation() {
        let mut escrow = escrow_two_milestones();
        let now = Utc::now();
        escrow.release_remaining_entries("TXF-1", "admin-1", now);
        assert!(escrow.released_total() <= escrow.held_amount);
    }
}
