//! Compensation calculation
//!
//! Pure functions over [`AuditConfig`]: no I/O, no clock. An explicitly
//! requested compensation bypasses this entirely (the eligibility check has
//! already enforced the auditor's rate floor).

use fundlock_core::{Amount, ProjectCategory};
use rust_decimal::Decimal;

use crate::config::AuditConfig;

/// Compute audit compensation when none was requested.
///
/// `compensation = min(max_cap, round(base_rate x hours(category)
///     x category_multiplier x specialization_bonus x size_multiplier))`
///
/// The specialization bonus applies when more than one specialization is
/// requested; the size multiplier when the project's funding goal exceeds
/// the large-project threshold.
pub fn compute_compensation(
    config: &AuditConfig,
    category: ProjectCategory,
    specialization_count: usize,
    funding_goal: Amount,
) -> Amount {
    let hours = Decimal::from(config.hours_for(category));
    let mut value = config.base_hourly_rate.value() * hours * config.multiplier_for(category);

    if specialization_count > 1 {
        value *= config.specialization_bonus;
    }
    if funding_goal > config.large_project_threshold {
        value *= config.size_multiplier;
    }

    let rounded = Amount::new_unchecked(value).round_minor();
    rounded.min(config.max_compensation)
}

/// Minimum acceptable compensation for an auditor on a category:
/// their hourly-rate floor times the category's estimated hours.
pub fn minimum_compensation(
    config: &AuditConfig,
    category: ProjectCategory,
    min_hourly_rate: Option<Amount>,
) -> Amount {
    let rate = min_hourly_rate.unwrap_or(config.default_min_hourly_rate);
    let hours = Decimal::from(config.hours_for(category));
    Amount::new_unchecked(rate.value() * hours).round_minor()
}
