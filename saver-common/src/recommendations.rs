//! Threshold-based license and contract recommendations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::assumptions::SavingsAssumptions;
use crate::records::{Contract, Invoice, LicenseCount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
        }
    }
}

/// When a license with unused seats is worth acting on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LicenseThresholds {
    pub min_unused_percent: f64,
    pub min_unused: i64,
    pub high_priority_percent: f64,
}

pub const USER_LICENSE_THRESHOLDS: LicenseThresholds = LicenseThresholds {
    min_unused_percent: 20.0,
    min_unused: 2,
    high_priority_percent: 30.0,
};

pub const PACKAGE_LICENSE_THRESHOLDS: LicenseThresholds = LicenseThresholds {
    min_unused_percent: 25.0,
    min_unused: 3,
    high_priority_percent: 40.0,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecommendation {
    pub license_name: String,
    pub total: i64,
    pub used: i64,
    pub unused: i64,
    pub unused_percent: f64,
    pub priority: Priority,
    pub action: String,
}

fn recommend(licenses: &[LicenseCount], thresholds: LicenseThresholds, kind: &str) -> Vec<LicenseRecommendation> {
    let mut recommendations: Vec<LicenseRecommendation> = licenses
        .iter()
        .filter(|l| l.total > 0)
        .filter_map(|license| {
            let unused = license.unused();
            let unused_percent = license.unused_percent();
            if unused_percent < thresholds.min_unused_percent || unused < thresholds.min_unused {
                return None;
            }

            let priority = if unused_percent >= thresholds.high_priority_percent {
                Priority::High
            } else {
                Priority::Medium
            };

            Some(LicenseRecommendation {
                license_name: license.name.clone(),
                total: license.total,
                used: license.used,
                unused,
                unused_percent,
                priority,
                action: format!(
                    "Reduce {} {} licenses by {} ({:.0}% unused)",
                    license.name, kind, unused, unused_percent
                ),
            })
        })
        .collect();

    recommendations.sort_by(|a, b| a.priority.cmp(&b.priority).then(b.unused.cmp(&a.unused)));
    recommendations
}

/// User licenses with at least 20% and 2 seats unused.
pub fn license_recommendations(licenses: &[LicenseCount]) -> Vec<LicenseRecommendation> {
    recommend(licenses, USER_LICENSE_THRESHOLDS, "user")
}

/// Permission-set licenses, judged like user licenses.
pub fn permission_set_license_recommendations(licenses: &[LicenseCount]) -> Vec<LicenseRecommendation> {
    recommend(licenses, USER_LICENSE_THRESHOLDS, "permission set")
}

/// Managed-package licenses with at least 25% and 3 seats unused.
pub fn package_license_recommendations(licenses: &[LicenseCount]) -> Vec<LicenseRecommendation> {
    recommend(licenses, PACKAGE_LICENSE_THRESHOLDS, "package")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecommendation {
    pub contract_id: String,
    pub contract_name: String,
    pub end_date: NaiveDate,
    pub days_left: i64,
    pub unused_licenses: i64,
    pub average_cost_per_user: f64,
    pub potential_savings: f64,
    pub action: String,
}

/// Active contracts entering the renewal window.
///
/// Savings assume a share of the per-user invoice cost of every unused user
/// license can be negotiated away at renewal.
pub fn contract_renewal_recommendations(
    contracts: &[Contract],
    invoices: &[Invoice],
    user_licenses: &[LicenseCount],
    today: NaiveDate,
    assumptions: &SavingsAssumptions,
) -> Vec<ContractRecommendation> {
    let seats: i64 = user_licenses.iter().map(|l| l.total.max(0)).sum();
    let unused: i64 = user_licenses.iter().map(|l| l.unused()).sum();
    let invoiced: f64 = invoices.iter().map(|i| i.amount).sum();
    let average_cost_per_user = if seats > 0 { invoiced / seats as f64 } else { 0.0 };
    let potential_savings = unused as f64 * average_cost_per_user * assumptions.renewal_savings_rate;

    contracts
        .iter()
        .filter(|c| c.is_active())
        .filter_map(|contract| {
            let days_left = contract.days_left(today);
            if !(0..=assumptions.renewal_window_days).contains(&days_left) {
                return None;
            }

            Some(ContractRecommendation {
                contract_id: contract.id.clone(),
                contract_name: contract.name.clone(),
                end_date: contract.end_date,
                days_left,
                unused_licenses: unused,
                average_cost_per_user,
                potential_savings,
                action: format!(
                    "Renegotiate {} before {}: {} unused licenses",
                    contract.name, contract.end_date, unused
                ),
            })
        })
        .collect()
}
