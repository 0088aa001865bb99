//! Release engine configuration

use serde::{Deserialize, Serialize};

/// Configuration for the escrow release engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    /// Transfers executed concurrently per sub-batch
    #[serde(default = "default_transfer_batch_size")]
    pub transfer_batch_size: usize,

    /// Destination used when a project has no payout account configured.
    /// Routes to the platform-operated holding account; an explicit policy
    /// value, not an environment default.
    #[serde(default = "default_fallback_payout_account")]
    pub fallback_payout_account: String,
}

fn default_transfer_batch_size() -> usize {
    5
}

fn default_fallback_payout_account() -> String {
    "acct_platform_holding".to_string()
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            transfer_batch_size: default_transfer_batch_size(),
            fallback_payout_account: default_fallback_payout_account(),
        }
    }
}

impl ReleaseConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
