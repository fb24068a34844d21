//! Savings report assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assumptions::SavingsAssumptions;
use crate::recommendations::{
    contract_renewal_recommendations, license_recommendations, package_license_recommendations,
    permission_set_license_recommendations, ContractRecommendation, LicenseRecommendation,
};
use crate::records::{Contract, Invoice, LicenseCount, OAuthToken, OrgLimits, SalesforceUser, Sandbox};
use crate::savings::{
    inactive_user_savings, integration_user_savings, platform_license_savings, sandbox_savings,
    storage_savings, storage_usage_percent, SavingsEstimate,
};

/// Everything known about one org at report time.
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    /// Active users, with platform eligibility already marked.
    pub users: Vec<SalesforceUser>,
    pub oauth_tokens: Vec<OAuthToken>,
    pub user_licenses: Vec<LicenseCount>,
    pub package_licenses: Vec<LicenseCount>,
    pub permission_set_licenses: Vec<LicenseCount>,
    pub sandboxes: Vec<Sandbox>,
    pub limits: OrgLimits,
    pub contracts: Vec<Contract>,
    pub invoices: Vec<Invoice>,
    /// Monthly price the org pays for one full license.
    pub license_price: f64,
}

/// Full cost-optimisation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsReport {
    pub generated_at: DateTime<Utc>,
    pub license_price: f64,
    pub inactive_users: SavingsEstimate,
    pub integration_conversion: SavingsEstimate,
    pub platform_conversion: SavingsEstimate,
    pub sandboxes: SavingsEstimate,
    pub storage: SavingsEstimate,
    pub storage_usage_percent: Option<f64>,
    pub license_recommendations: Vec<LicenseRecommendation>,
    pub package_recommendations: Vec<LicenseRecommendation>,
    pub permission_set_recommendations: Vec<LicenseRecommendation>,
    pub contract_recommendations: Vec<ContractRecommendation>,
    pub total_annual_savings: f64,
}

/// Ungated teaser: totals and counts without any detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub generated_at: DateTime<Utc>,
    pub total_annual_savings: f64,
    pub inactive_user_count: usize,
    pub integration_candidate_count: usize,
    pub platform_candidate_count: usize,
    pub excess_full_sandboxes: usize,
    pub storage_over_threshold: bool,
    pub recommendation_count: usize,
}

pub fn build_report(
    input: &ReportInput,
    assumptions: &SavingsAssumptions,
    as_of: DateTime<Utc>,
) -> SavingsReport {
    let inactive_users = inactive_user_savings(&input.users, input.license_price, as_of, assumptions);
    let integration_conversion = integration_user_savings(
        &input.users,
        &input.oauth_tokens,
        input.license_price,
        &input.user_licenses,
        assumptions,
    );
    let platform_conversion = platform_license_savings(&input.users, input.license_price, assumptions);
    let sandboxes = sandbox_savings(&input.sandboxes, assumptions);

    let usage = storage_usage_percent(&input.limits);
    let storage = usage
        .map(|percent| storage_savings(percent, assumptions))
        .unwrap_or_default();

    let contract_recommendations = contract_renewal_recommendations(
        &input.contracts,
        &input.invoices,
        &input.user_licenses,
        as_of.date_naive(),
        assumptions,
    );

    // Every renewal shares the same org-wide seat figures, so count it once.
    let contract_savings = contract_recommendations
        .first()
        .map(|c| c.potential_savings)
        .unwrap_or(0.0);

    let total_annual_savings = inactive_users.annual_savings
        + integration_conversion.annual_savings
        + platform_conversion.annual_savings
        + sandboxes.annual_savings
        + storage.annual_savings
        + contract_savings;

    SavingsReport {
        generated_at: as_of,
        license_price: input.license_price,
        inactive_users,
        integration_conversion,
        platform_conversion,
        sandboxes,
        storage,
        storage_usage_percent: usage,
        license_recommendations: license_recommendations(&input.user_licenses),
        package_recommendations: package_license_recommendations(&input.package_licenses),
        permission_set_recommendations: permission_set_license_recommendations(
            &input.permission_set_licenses,
        ),
        contract_recommendations,
        total_annual_savings,
    }
}

impl SavingsReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            generated_at: self.generated_at,
            total_annual_savings: self.total_annual_savings,
            inactive_user_count: self.inactive_users.count,
            integration_candidate_count: self.integration_conversion.count,
            platform_candidate_count: self.platform_conversion.count,
            excess_full_sandboxes: self.sandboxes.count,
            storage_over_threshold: self.storage.annual_savings > 0.0,
            recommendation_count: self.license_recommendations.len()
                + self.package_recommendations.len()
                + self.permission_set_recommendations.len()
                + self.contract_recommendations.len(),
        }
    }
}
