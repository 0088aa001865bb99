//! Audit configuration with configurable policy values
//!
//! Workload caps, compensation tables, and conflict-of-interest limits are
//! all configurable via file, not hardcoded, so policy can be tuned without
//! recompilation.

use fundlock_core::{Amount, ProjectCategory};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for audit assignment and acceptance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    // === Workload ===
    /// Concurrent-audit cap applied when an auditor has none configured
    #[serde(default = "default_concurrency_cap")]
    pub default_concurrency_cap: u32,

    /// Maximum projects of one creator an auditor may have audited before a
    /// new assignment for that creator is rejected
    #[serde(default = "default_max_audits_per_creator")]
    pub max_audits_per_creator: u32,

    // === Compensation ===
    /// Base hourly rate in minor currency units
    #[serde(default = "default_base_hourly_rate")]
    pub base_hourly_rate: Amount,

    /// Estimated hours per category; `default_estimated_hours` applies to
    /// categories not in the table
    #[serde(default = "default_estimated_hours_table")]
    pub estimated_hours: HashMap<ProjectCategory, u32>,

    #[serde(default = "default_estimated_hours")]
    pub default_estimated_hours: u32,

    /// Per-category rate multiplier (1.0 when absent)
    #[serde(default = "default_category_multipliers")]
    pub category_multipliers: HashMap<ProjectCategory, Decimal>,

    /// Applied when more than one specialization is requested
    #[serde(default = "default_specialization_bonus")]
    pub specialization_bonus: Decimal,

    /// Funding-goal threshold above which the size multiplier applies
    #[serde(default = "default_large_project_threshold")]
    pub large_project_threshold: Amount,

    #[serde(default = "default_size_multiplier")]
    pub size_multiplier: Decimal,

    /// Hard cap on computed compensation
    #[serde(default = "default_max_compensation")]
    pub max_compensation: Amount,

    /// Bounds for explicitly requested compensation
    #[serde(default = "default_min_requested_compensation")]
    pub min_requested_compensation: Amount,

    #[serde(default = "default_max_requested_compensation")]
    pub max_requested_compensation: Amount,

    /// Minimum hourly rate applied when an auditor has none configured
    #[serde(default = "default_min_hourly_rate")]
    pub default_min_hourly_rate: Amount,
}

// Default value functions for serde
fn default_concurrency_cap() -> u32 {
    5
}

fn default_max_audits_per_creator() -> u32 {
    3
}

fn default_base_hourly_rate() -> Amount {
    // 75.00 in minor units
    Amount::new_unchecked(Decimal::new(7_500, 0))
}

fn default_estimated_hours_table() -> HashMap<ProjectCategory, u32> {
    HashMap::from([
        (ProjectCategory::Finance, 40),
        (ProjectCategory::Health, 36),
        (ProjectCategory::Legal, 32),
        (ProjectCategory::Technology, 24),
        (ProjectCategory::Environment, 20),
    ])
}

fn default_estimated_hours() -> u32 {
    16
}

fn default_category_multipliers() -> HashMap<ProjectCategory, Decimal> {
    HashMap::from([
        (ProjectCategory::Finance, Decimal::new(15, 1)),  // 1.5
        (ProjectCategory::Health, Decimal::new(14, 1)),   // 1.4
        (ProjectCategory::Legal, Decimal::new(13, 1)),    // 1.3
        (ProjectCategory::Technology, Decimal::new(11, 1)), // 1.1
    ])
}

fn default_specialization_bonus() -> Decimal {
    Decimal::new(12, 1) // 1.2
}

fn default_large_project_threshold() -> Amount {
    // 100,000.00 in minor units
    Amount::new_unchecked(Decimal::new(10_000_000, 0))
}

fn default_size_multiplier() -> Decimal {
    Decimal::new(15, 1) // 1.5
}

fn default_max_compensation() -> Amount {
    // 10,000.00 in minor units
    Amount::new_unchecked(Decimal::new(1_000_000, 0))
}

fn default_min_requested_compensation() -> Amount {
    // 50.00 in minor units
    Amount::new_unchecked(Decimal::new(5_000, 0))
}

fn default_max_requested_compensation() -> Amount {
    // 50,000.00 in minor units
    Amount::new_unchecked(Decimal::new(5_000_000, 0))
}

fn default_min_hourly_rate() -> Amount {
    // 25.00 in minor units
    Amount::new_unchecked(Decimal::new(2_500, 0))
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_concurrency_cap: default_concurrency_cap(),
            max_audits_per_creator: default_max_audits_per_creator(),
            base_hourly_rate: default_base_hourly_rate(),
            estimated_hours: default_estimated_hours_table(),
            default_estimated_hours: default_estimated_hours(),
            category_multipliers: default_category_multipliers(),
            specialization_bonus: default_specialization_bonus(),
            large_project_threshold: default_large_project_threshold(),
            size_multiplier: default_size_multiplier(),
            max_compensation: default_max_compensation(),
            min_requested_compensation: default_min_requested_compensation(),
            max_requested_compensation: default_max_requested_compensation(),
            default_min_hourly_rate: default_min_hourly_rate(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Estimated hours for a category, falling back to the default.
    pub fn hours_for(&self, category: ProjectCategory) -> u32 {
        self.estimated_hours
            .get(&category)
            .copied()
            .unwrap_or(self.default_estimated_hours)
    }

    /// Rate multiplier for a category, 1.0 when none configured.
    pub fn multiplier_for(&self, category: ProjectCategory) -> Decimal {
        self.category_multipliers
            .get(&category)
            .copied()
            .unwrap_or(Decimal::ONE)
    }
}
