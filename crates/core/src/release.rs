//! Release triggers

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What triggered an escrow release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReleaseType {
    /// One milestone reached completion (and passed audit if required)
    MilestoneCompletion,
    /// The whole project completed
    ProjectCompletion,
    /// Privileged emergency payout, no completion preconditions
    EmergencyRelease,
    /// Privileged administrative override, no completion preconditions
    AdminOverride,
}

impl ReleaseType {
    /// Emergency and admin releases bypass completion gating and may carry a
    /// partial percentage.
    pub fn is_override(self) -> bool {
        matches!(self, ReleaseType::EmergencyRelease | ReleaseType::AdminOverride)
    }

    /// Override releases must state a reason.
    pub fn requires_reason(self) -> bool {
        self.is_override()
    }
}
