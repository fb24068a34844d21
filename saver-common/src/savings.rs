//! Savings calculations.
//!
//! Each function is a pure filter/reduce over org records and returns an
//! annualised estimate. Preconditions that cannot be met (no integration
//! license, no storage limits) produce a zero estimate rather than an error.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::assumptions::SavingsAssumptions;
use crate::records::{
    LicenseCount, OAuthToken, OrgLimits, SalesforceUser, Sandbox, INTEGRATION_LICENSE,
    PLATFORM_LICENSE,
};

const MONTHS_PER_YEAR: f64 = 12.0;
const STORAGE_RESOURCES: [&str; 2] = ["DataStorageMB", "FileStorageMB"];

/// Result of one savings calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavingsEstimate {
    /// Number of users, sandboxes or units the estimate covers.
    pub count: usize,
    /// Estimated savings per year in dollars.
    pub annual_savings: f64,
    /// Ids of the users the estimate is based on, when it is user-based.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_ids: Vec<String>,
}

impl SavingsEstimate {
    pub fn zero() -> Self {
        Self::default()
    }

    fn for_users(user_ids: Vec<String>, monthly_per_user: f64) -> Self {
        let count = user_ids.len();
        Self {
            count,
            annual_savings: count as f64 * monthly_per_user * MONTHS_PER_YEAR,
            user_ids,
        }
    }
}

/// Users who never logged in, or whose last login is older than the
/// inactivity window.
pub fn inactive_user_savings(
    users: &[SalesforceUser],
    license_price: f64,
    as_of: DateTime<Utc>,
    assumptions: &SavingsAssumptions,
) -> SavingsEstimate {
    // None when the window reaches past the earliest representable date.
    let cutoff = Duration::try_days(assumptions.inactivity_days)
        .and_then(|window| as_of.checked_sub_signed(window));

    let inactive: Vec<String> = users
        .iter()
        .filter(|u| match (u.last_login_date, cutoff) {
            (None, _) => true,
            (Some(last_login), Some(cutoff)) => last_login < cutoff,
            (Some(_), None) => false,
        })
        .map(|u| u.id.clone())
        .collect();

    SavingsEstimate::for_users(inactive, license_price)
}

/// Heavy API users that could move to the cheaper integration license.
///
/// Never recommends more conversions than the integration license has free
/// seats. Candidates are ranked by total token use so the chosen subset is
/// stable.
pub fn integration_user_savings(
    users: &[SalesforceUser],
    tokens: &[OAuthToken],
    license_price: f64,
    user_licenses: &[LicenseCount],
    assumptions: &SavingsAssumptions,
) -> SavingsEstimate {
    let available = match user_licenses.iter().find(|l| l.name == INTEGRATION_LICENSE) {
        Some(license) => license.total - license.used,
        None => return SavingsEstimate::zero(),
    };
    if available <= 0 {
        return SavingsEstimate::zero();
    }

    let mut tokens_by_user: HashMap<&str, Vec<&OAuthToken>> = HashMap::new();
    for token in tokens {
        tokens_by_user.entry(token.user_id.as_str()).or_default().push(token);
    }

    let mut candidates: Vec<(&SalesforceUser, u64)> = users
        .iter()
        .filter(|u| !u.is_integration_user())
        .filter_map(|user| {
            let user_tokens = tokens_by_user.get(user.id.as_str())?;
            let distinct: HashSet<&str> = user_tokens.iter().map(|t| t.id.as_str()).collect();
            let heavy = user_tokens
                .iter()
                .any(|t| t.use_count > assumptions.integration_use_count_threshold);

            if distinct.len() >= assumptions.integration_min_tokens && heavy {
                let total_use = user_tokens.iter().map(|t| t.use_count).sum();
                Some((user, total_use))
            } else {
                None
            }
        })
        .collect();

    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));

    let recommended: Vec<String> = candidates
        .into_iter()
        .take(available as usize)
        .map(|(u, _)| u.id.clone())
        .collect();

    SavingsEstimate::for_users(recommended, license_price)
}

/// Full-license users with no CRM object access, who could move to a
/// platform license.
pub fn platform_license_savings(
    users: &[SalesforceUser],
    license_price: f64,
    assumptions: &SavingsAssumptions,
) -> SavingsEstimate {
    let convertible: Vec<String> = users
        .iter()
        .filter(|u| u.is_platform_eligible && u.user_type == "Standard")
        .filter(|u| match u.license_name() {
            Some(name) => {
                name.contains("Salesforce") && name != PLATFORM_LICENSE && name != INTEGRATION_LICENSE
            }
            None => false,
        })
        .map(|u| u.id.clone())
        .collect();

    let difference = (license_price - assumptions.platform_license_monthly).max(0.0);
    SavingsEstimate::for_users(convertible, difference)
}

/// Full-copy sandboxes beyond the ones included with the org.
pub fn sandbox_savings(sandboxes: &[Sandbox], assumptions: &SavingsAssumptions) -> SavingsEstimate {
    let full = sandboxes.iter().filter(|s| s.is_full_copy()).count();
    let excess = full.saturating_sub(assumptions.free_full_sandboxes);

    SavingsEstimate {
        count: excess,
        annual_savings: excess as f64 * assumptions.full_sandbox_monthly * MONTHS_PER_YEAR,
        user_ids: Vec::new(),
    }
}

/// Combined data and file storage usage as a percentage.
///
/// Returns `None` when the org reports neither resource.
pub fn storage_usage_percent(limits: &OrgLimits) -> Option<f64> {
    let (max, used) = STORAGE_RESOURCES
        .iter()
        .filter_map(|r| limits.get(r))
        .fold((0i64, 0i64), |(max, used), l| (max + l.max, used + l.used()));

    if max <= 0 {
        return None;
    }
    Some(used as f64 * 100.0 / max as f64)
}

/// Flat estimate once storage passes the threshold. Does not scale with the
/// actual usage.
pub fn storage_savings(usage_percent: f64, assumptions: &SavingsAssumptions) -> SavingsEstimate {
    if usage_percent <= assumptions.storage_threshold_percent {
        return SavingsEstimate::zero();
    }

    SavingsEstimate {
        count: assumptions.reclaimable_storage_gb as usize,
        annual_savings: assumptions.reclaimable_storage_gb
            * assumptions.storage_gb_monthly
            * MONTHS_PER_YEAR,
        user_ids: Vec::new(),
    }
}
