//! Org records.
//!
//! Salesforce-sourced records keep the API's PascalCase field names on the
//! wire so query results deserialize directly. Contracts and invoices are
//! owned by this application and use snake_case.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// License name of the restricted integration license.
pub const INTEGRATION_LICENSE: &str = "Salesforce Integration";
/// License name of the restricted platform license.
pub const PLATFORM_LICENSE: &str = "Salesforce Platform";
/// `UserType` value Salesforce reports for integration users.
pub const INTEGRATION_USER_TYPE: &str = "Integration User";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLicenseRef {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "UserLicense", default)]
    pub user_license: Option<UserLicenseRef>,
}

/// A Salesforce `User` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesforceUser {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "LastLoginDate", default, with = "crate::datetime::optional")]
    pub last_login_date: Option<DateTime<Utc>>,
    #[serde(rename = "UserType", default)]
    pub user_type: String,
    #[serde(rename = "IsActive", default = "default_true")]
    pub is_active: bool,
    #[serde(rename = "Profile", default)]
    pub profile: Option<Profile>,
    /// Set by the platform eligibility check, never by Salesforce.
    #[serde(rename = "isPlatformEligible", default)]
    pub is_platform_eligible: bool,
}

fn default_true() -> bool {
    true
}

impl SalesforceUser {
    /// Name of the license attached to the user's profile.
    pub fn license_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.user_license.as_ref())
            .map(|l| l.name.as_str())
    }

    pub fn is_integration_user(&self) -> bool {
        self.user_type == INTEGRATION_USER_TYPE || self.license_name() == Some(INTEGRATION_LICENSE)
    }
}

/// A Salesforce `OauthToken` record: one connected app's grant for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "AppName")]
    pub app_name: String,
    #[serde(rename = "LastUsedDate", default, with = "crate::datetime::optional")]
    pub last_used_date: Option<DateTime<Utc>>,
    #[serde(rename = "UseCount", default)]
    pub use_count: u64,
    #[serde(rename = "UserId")]
    pub user_id: String,
}

/// Seat counts for a user, package or permission-set license.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseCount {
    pub name: String,
    pub total: i64,
    pub used: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl LicenseCount {
    pub fn new(name: impl Into<String>, total: i64, used: i64) -> Self {
        Self {
            name: name.into(),
            total,
            used,
            status: None,
        }
    }

    /// Unused seats. Saturates at zero when `used > total`.
    pub fn unused(&self) -> i64 {
        (self.total - self.used).max(0)
    }

    /// Unused seats as a percentage of total, 0 when there are no seats.
    pub fn unused_percent(&self) -> f64 {
        if self.total <= 0 {
            return 0.0;
        }
        self.unused() as f64 * 100.0 / self.total as f64
    }
}

/// A tooling API `SandboxInfo` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sandbox {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "SandboxName")]
    pub sandbox_name: String,
    #[serde(rename = "LicenseType", default)]
    pub license_type: String,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

impl Sandbox {
    pub fn is_full_copy(&self) -> bool {
        self.license_type.to_ascii_lowercase().contains("full")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitUsage {
    #[serde(rename = "Max")]
    pub max: i64,
    #[serde(rename = "Remaining")]
    pub remaining: i64,
}

impl LimitUsage {
    pub fn used(&self) -> i64 {
        (self.max - self.remaining).max(0)
    }
}

/// Response of the `/limits` endpoint, keyed by resource name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgLimits(pub HashMap<String, LimitUsage>);

impl OrgLimits {
    pub fn get(&self, resource: &str) -> Option<&LimitUsage> {
        self.0.get(resource)
    }

    pub fn insert(&mut self, resource: impl Into<String>, max: i64, remaining: i64) {
        self.0.insert(resource.into(), LimitUsage { max, remaining });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionSetAssignment {
    #[serde(rename = "AssigneeId")]
    pub assignee_id: String,
    #[serde(rename = "PermissionSetId")]
    pub permission_set_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPermission {
    /// Id of the owning permission set.
    #[serde(rename = "ParentId")]
    pub parent_id: String,
    #[serde(rename = "SobjectType")]
    pub sobject_type: String,
    #[serde(rename = "PermissionsRead", default)]
    pub permissions_read: bool,
}

/// A customer contract with Salesforce, recorded by the org admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub amount: f64,
    #[serde(default)]
    pub document_name: Option<String>,
}

impl Contract {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case("active")
    }

    /// Whole days from `today` until the contract ends. Negative once expired.
    pub fn days_left(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub org_id: String,
    #[serde(default)]
    pub contract_id: Option<String>,
    pub invoice_date: NaiveDate,
    pub status: String,
    pub amount: f64,
}
