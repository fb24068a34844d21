//! Fixed heuristics behind the savings estimates.

use serde::{Deserialize, Serialize};

/// Dollar and threshold assumptions used by the savings calculations.
///
/// The defaults are the production figures. Every field can be overridden
/// from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavingsAssumptions {
    /// Days without a login before a user counts as inactive.
    pub inactivity_days: i64,
    /// Monthly list price of a Salesforce Platform license.
    pub platform_license_monthly: f64,
    /// Monthly cost of one full-copy sandbox.
    pub full_sandbox_monthly: f64,
    /// Full-copy sandboxes included with the org at no extra cost.
    pub free_full_sandboxes: usize,
    /// Storage usage percentage above which storage savings apply.
    pub storage_threshold_percent: f64,
    /// Storage assumed reclaimable once over the threshold.
    pub reclaimable_storage_gb: f64,
    pub storage_gb_monthly: f64,
    /// Days before a contract's end date at which renewal advice starts.
    pub renewal_window_days: i64,
    /// Share of unused-license cost assumed negotiable at renewal.
    pub renewal_savings_rate: f64,
    /// Minimum distinct OAuth tokens for an integration conversion candidate.
    pub integration_min_tokens: usize,
    /// A candidate needs at least one token used more often than this.
    pub integration_use_count_threshold: u64,
}

impl Default for SavingsAssumptions {
    fn default() -> Self {
        Self {
            inactivity_days: 30,
            platform_license_monthly: 25.0,
            full_sandbox_monthly: 5000.0,
            free_full_sandboxes: 1,
            storage_threshold_percent: 75.0,
            reclaimable_storage_gb: 2.0,
            storage_gb_monthly: 250.0,
            renewal_window_days: 90,
            renewal_savings_rate: 0.30,
            integration_min_tokens: 2,
            integration_use_count_threshold: 1000,
        }
    }
}
