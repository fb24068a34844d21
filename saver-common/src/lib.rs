//! SalesforceSaver Common Types
//!
//! Org records as returned by the Salesforce REST API, plus the pure
//! calculations that turn them into savings estimates and recommendations.

pub mod apps;
pub mod assumptions;
pub mod datetime;
pub mod eligibility;
pub mod recommendations;
pub mod records;
pub mod report;
pub mod savings;

pub use apps::{summarize_connected_apps, ConnectedAppUsage};
pub use assumptions::SavingsAssumptions;
pub use eligibility::{mark_platform_eligible, platform_eligible_user_ids};
pub use recommendations::{
    contract_renewal_recommendations, license_recommendations, package_license_recommendations,
    permission_set_license_recommendations, ContractRecommendation, LicenseRecommendation,
    Priority,
};
pub use records::{
    Contract, Invoice, LicenseCount, LimitUsage, OAuthToken, ObjectPermission, OrgLimits,
    PermissionSetAssignment, Profile, Sandbox, SalesforceUser, UserLicenseRef,
};
pub use report::{build_report, ReportInput, ReportSummary, SavingsReport};
pub use savings::{
    inactive_user_savings, integration_user_savings, platform_license_savings, sandbox_savings,
    storage_savings, storage_usage_percent, SavingsEstimate,
};
