//! Salesforce API wire types.

use saver_common::LicenseCount;
use serde::{Deserialize, Serialize};

/// One page of a SOQL query result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse<T> {
    pub total_size: u64,
    pub done: bool,
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    #[serde(default)]
    pub next_records_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(rename = "errorCode")]
    pub error_code: String,
}

#[derive(Debug, Deserialize)]
pub struct UserLicenseRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "TotalLicenses")]
    pub total_licenses: i64,
    #[serde(rename = "UsedLicenses")]
    pub used_licenses: i64,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

impl From<UserLicenseRecord> for LicenseCount {
    fn from(r: UserLicenseRecord) -> Self {
        LicenseCount {
            name: r.name,
            total: r.total_licenses,
            used: r.used_licenses,
            status: r.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PackageLicenseRecord {
    #[serde(rename = "NamespacePrefix", default)]
    pub namespace_prefix: Option<String>,
    /// -1 for site-wide licenses.
    #[serde(rename = "AllowedLicenses")]
    pub allowed_licenses: i64,
    #[serde(rename = "UsedLicenses")]
    pub used_licenses: i64,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

impl PackageLicenseRecord {
    /// Seat-based licenses only. Site-wide licenses have no seats to trim.
    pub fn into_license_count(self) -> Option<LicenseCount> {
        if self.allowed_licenses < 0 {
            return None;
        }
        Some(LicenseCount {
            name: self
                .namespace_prefix
                .unwrap_or_else(|| "(no namespace)".to_string()),
            total: self.allowed_licenses,
            used: self.used_licenses,
            status: self.status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct PermissionSetLicenseRecord {
    #[serde(rename = "MasterLabel")]
    pub master_label: String,
    #[serde(rename = "TotalLicenses")]
    pub total_licenses: i64,
    #[serde(rename = "UsedLicenses")]
    pub used_licenses: i64,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

impl From<PermissionSetLicenseRecord> for LicenseCount {
    fn from(r: PermissionSetLicenseRecord) -> Self {
        LicenseCount {
            name: r.master_label,
            total: r.total_licenses,
            used: r.used_licenses,
            status: r.status,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrganizationRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
}

/// Response of the OAuth token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub instance_url: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    pub issued_at: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Org identity and pipeline record counts shown alongside the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrgOverview {
    pub org_id: String,
    pub org_name: String,
    pub lead_count: u64,
    pub opportunity_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_wide_package_license_is_skipped() {
        let site = PackageLicenseRecord {
            namespace_prefix: Some("sitewide".to_string()),
            allowed_licenses: -1,
            used_licenses: 40,
            status: Some("Active".to_string()),
        };
        assert!(site.into_license_count().is_none());

        let seats = PackageLicenseRecord {
            namespace_prefix: Some("cpq".to_string()),
            allowed_licenses: 20,
            used_licenses: 12,
            status: None,
        };
        let license = seats.into_license_count().unwrap();
        assert_eq!(license.name, "cpq");
        assert_eq!(license.unused(), 8);
    }

    #[test]
    fn test_query_response_page() {
        let json = r#"{
            "totalSize": 3,
            "done": false,
            "nextRecordsUrl": "/services/data/v59.0/query/01gxx-2000",
            "records": [{"Name": "Salesforce", "TotalLicenses": 10, "UsedLicenses": 7, "Status": "Active"}]
        }"#;
        let page: QueryResponse<UserLicenseRecord> = serde_json::from_str(json).unwrap();
        assert!(!page.done);
        assert_eq!(page.total_size, 3);
        assert_eq!(page.next_records_url.as_deref(), Some("/services/data/v59.0/query/01gxx-2000"));
        let license: LicenseCount = page.records.into_iter().next().unwrap().into();
        assert_eq!(license.unused(), 3);
    }

    #[test]
    fn test_count_query_has_no_records() {
        let page: QueryResponse<serde_json::Value> =
            serde_json::from_str(r#"{"totalSize": 42, "done": true, "records": []}"#).unwrap();
        assert_eq!(page.total_size, 42);
        assert!(page.records.is_empty());
    }
}
