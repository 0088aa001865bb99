//! Per-contribution release calculation
//!
//! Given an approved release, computes the releasable amount for every
//! contribution with held escrow. Contributions with nothing releasable are
//! excluded, not errors; an empty plan is a valid zero-total outcome.

use fundlock_core::{Amount, Contribution, ReleaseType};
use rust_decimal::Decimal;
use tracing::debug;

use crate::conditions::ApprovedRelease;

/// One contribution's planned share of the release
#[derive(Debug, Clone)]
pub struct PlannedRelease {
    pub contribution_id: String,
    pub contributor_id: String,
    pub amount: Amount,
}

/// Compute the release plan across held contributions.
///
/// Milestone releases take the matching unreleased schedule-entry amount;
/// anything else releases the held remainder, scaled by `percentage` for
/// override types. Already-released and unscheduled contributions drop out
/// silently.
pub fn plan_releases(
    contributions: &[Contribution],
    approved: &ApprovedRelease,
    percentage: Option<u8>,
) -> Vec<PlannedRelease> {
    if percentage.is_some() && !approved.release_type.is_override() {
        debug!(
            release_type = %approved.release_type,
            "releasePercentage ignored for non-override release"
        );
    }

    contributions
        .iter()
        .filter(|c| c.escrow.held)
        .filter_map(|contribution| {
            let amount = releasable_amount(contribution, approved, percentage);
            if amount.is_zero() {
                None
            } else {
                Some(PlannedRelease {
                    contribution_id: contribution.id.clone(),
                    contributor_id: contribution.contributor_id.clone(),
                    amount,
                })
            }
        })
        .collect()
}

fn releasable_amount(
    contribution: &Contribution,
    approved: &ApprovedRelease,
    percentage: Option<u8>,
) -> Amount {
    match (approved.release_type, &approved.milestone_id) {
        (ReleaseType::MilestoneCompletion, Some(milestone_id)) => {
            match contribution.escrow.entry_for_milestone(milestone_id) {
                Some(entry) if !entry.released => entry.amount,
                _ => Amount::ZERO,
            }
        }
        _ => {
            let remaining = contribution.escrow.remaining();
            match percentage {
                Some(pct) if approved.release_type.is_override() => {
                    remaining.percentage(Decimal::from(pct))
                }
                _ => remaining,
            }
        }
    }
}

/// Total of a plan
pub fn plan_total(plan: &[PlannedRelease]) -> Amount {
    Amount::sum(plan.iter().map(|p| &p.amount))
}
