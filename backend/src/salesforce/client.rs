use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use saver_common::{
    LicenseCount, OAuthToken, ObjectPermission, OrgLimits, PermissionSetAssignment,
    SalesforceUser, Sandbox,
};
use serde::de::DeserializeOwned;

use super::types::{
    OrganizationRecord, PackageLicenseRecord, PermissionSetLicenseRecord, QueryResponse,
    UserLicenseRecord,
};
use super::{api_error, OrgOverview, SalesforceError};
use crate::session::SalesforceSession;

const USERS_SOQL: &str = "SELECT Id, Username, LastLoginDate, UserType, IsActive, Profile.Name, \
     Profile.UserLicense.Name FROM User WHERE IsActive = true";
const OAUTH_TOKENS_SOQL: &str = "SELECT Id, AppName, LastUsedDate, UseCount, UserId FROM OauthToken";
const USER_LICENSES_SOQL: &str = "SELECT Name, TotalLicenses, UsedLicenses, Status FROM UserLicense";
const PACKAGE_LICENSES_SOQL: &str =
    "SELECT NamespacePrefix, AllowedLicenses, UsedLicenses, Status FROM PackageLicense";
const PERMISSION_SET_LICENSES_SOQL: &str =
    "SELECT MasterLabel, TotalLicenses, UsedLicenses, Status FROM PermissionSetLicense";
const ASSIGNMENTS_SOQL: &str = "SELECT AssigneeId, PermissionSetId FROM PermissionSetAssignment \
     WHERE Assignee.IsActive = true";
const CRM_PERMISSIONS_SOQL: &str = "SELECT ParentId, SobjectType, PermissionsRead FROM ObjectPermissions \
     WHERE SobjectType IN ('Opportunity', 'Lead', 'Case') AND PermissionsRead = true";
const SANDBOXES_SOQL: &str = "SELECT Id, SandboxName, LicenseType, Description FROM SandboxInfo";
const ORGANIZATION_SOQL: &str = "SELECT Id, Name FROM Organization LIMIT 1";

/// The tooling API can be slow to answer for SandboxInfo.
const DEFAULT_SANDBOX_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Salesforce REST and tooling APIs.
///
/// Holds no credentials; every call takes the caller's session.
pub struct SalesforceClient {
    http_client: Client,
    api_path: String,
    sandbox_timeout: Duration,
}

impl SalesforceClient {
    /// `api_version` without the `v` prefix, e.g. "59.0".
    pub fn new(api_version: &str) -> Self {
        Self {
            http_client: Client::new(),
            api_path: format!("/services/data/v{}", api_version.trim_start_matches('v')),
            sandbox_timeout: DEFAULT_SANDBOX_TIMEOUT,
        }
    }

    pub fn with_sandbox_timeout(mut self, timeout: Duration) -> Self {
        self.sandbox_timeout = timeout;
        self
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SalesforceError> {
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| SalesforceError::InvalidResponse(e.to_string()))
    }

    /// Run a SOQL query and follow `nextRecordsUrl` until every page is read.
    async fn query_all<T: DeserializeOwned>(
        &self,
        session: &SalesforceSession,
        endpoint: &str,
        soql: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<T>, SalesforceError> {
        let url = format!("{}{}/{}", session.instance_url, self.api_path, endpoint);
        tracing::debug!(endpoint = %endpoint, soql = %soql, "Querying Salesforce");

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&session.access_token)
            .query(&[("q", soql)]);
        if let Some(t) = timeout {
            request = request.timeout(t);
        }

        let mut page: QueryResponse<T> = self.send(request).await?;
        let mut records = std::mem::take(&mut page.records);

        while let (false, Some(next)) = (page.done, page.next_records_url.take()) {
            let next_url = format!("{}{}", session.instance_url, next);
            tracing::debug!(url = %next_url, "Fetching next query page");
            let mut request = self.http_client.get(&next_url).bearer_auth(&session.access_token);
            if let Some(t) = timeout {
                request = request.timeout(t);
            }
            page = self.send(request).await?;
            records.append(&mut page.records);
        }

        Ok(records)
    }

    pub async fn query<T: DeserializeOwned>(
        &self,
        session: &SalesforceSession,
        soql: &str,
    ) -> Result<Vec<T>, SalesforceError> {
        self.query_all(session, "query", soql, None).await
    }

    pub async fn tooling_query<T: DeserializeOwned>(
        &self,
        session: &SalesforceSession,
        soql: &str,
        timeout: Option<Duration>,
    ) -> Result<Vec<T>, SalesforceError> {
        self.query_all(session, "tooling/query", soql, timeout).await
    }

    /// `SELECT COUNT() FROM {object}`.
    pub async fn count(&self, session: &SalesforceSession, object: &str) -> Result<u64, SalesforceError> {
        let url = format!("{}{}/query", session.instance_url, self.api_path);
        let soql = format!("SELECT COUNT() FROM {}", object);
        let request = self
            .http_client
            .get(&url)
            .bearer_auth(&session.access_token)
            .query(&[("q", soql.as_str())]);

        let page: QueryResponse<serde_json::Value> = self.send(request).await?;
        Ok(page.total_size)
    }

    pub async fn limits(&self, session: &SalesforceSession) -> Result<OrgLimits, SalesforceError> {
        let url = format!("{}{}/limits", session.instance_url, self.api_path);
        let request = self.http_client.get(&url).bearer_auth(&session.access_token);
        self.send(request).await
    }

    pub async fn active_users(&self, session: &SalesforceSession) -> Result<Vec<SalesforceUser>, SalesforceError> {
        self.query(session, USERS_SOQL).await
    }

    pub async fn oauth_tokens(&self, session: &SalesforceSession) -> Result<Vec<OAuthToken>, SalesforceError> {
        self.query(session, OAUTH_TOKENS_SOQL).await
    }

    pub async fn user_licenses(&self, session: &SalesforceSession) -> Result<Vec<LicenseCount>, SalesforceError> {
        let records: Vec<UserLicenseRecord> = self.query(session, USER_LICENSES_SOQL).await?;
        Ok(records.into_iter().map(LicenseCount::from).collect())
    }

    pub async fn package_licenses(&self, session: &SalesforceSession) -> Result<Vec<LicenseCount>, SalesforceError> {
        let records: Vec<PackageLicenseRecord> = self.query(session, PACKAGE_LICENSES_SOQL).await?;
        Ok(records
            .into_iter()
            .filter_map(PackageLicenseRecord::into_license_count)
            .collect())
    }

    pub async fn permission_set_licenses(
        &self,
        session: &SalesforceSession,
    ) -> Result<Vec<LicenseCount>, SalesforceError> {
        let records: Vec<PermissionSetLicenseRecord> =
            self.query(session, PERMISSION_SET_LICENSES_SOQL).await?;
        Ok(records.into_iter().map(LicenseCount::from).collect())
    }

    pub async fn permission_set_assignments(
        &self,
        session: &SalesforceSession,
    ) -> Result<Vec<PermissionSetAssignment>, SalesforceError> {
        self.query(session, ASSIGNMENTS_SOQL).await
    }

    /// Object permissions granting read on Opportunity, Lead or Case.
    pub async fn crm_object_permissions(
        &self,
        session: &SalesforceSession,
    ) -> Result<Vec<ObjectPermission>, SalesforceError> {
        self.query(session, CRM_PERMISSIONS_SOQL).await
    }

    pub async fn sandboxes(&self, session: &SalesforceSession) -> Result<Vec<Sandbox>, SalesforceError> {
        self.tooling_query(session, SANDBOXES_SOQL, Some(self.sandbox_timeout)).await
    }

    /// The org the session's token belongs to.
    pub async fn identity(&self, session: &SalesforceSession) -> Result<OrganizationRecord, SalesforceError> {
        self.query::<OrganizationRecord>(session, ORGANIZATION_SOQL)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SalesforceError::InvalidResponse("Organization query returned no rows".to_string()))
    }

    pub async fn overview(&self, session: &SalesforceSession) -> Result<OrgOverview, SalesforceError> {
        let (org, lead_count, opportunity_count) = tokio::try_join!(
            self.identity(session),
            self.count(session, "Lead"),
            self.count(session, "Opportunity"),
        )?;

        Ok(OrgOverview {
            org_id: org.id,
            org_name: org.name,
            lead_count,
            opportunity_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_path_accepts_prefixed_version() {
        assert_eq!(SalesforceClient::new("v59.0").api_path, "/services/data/v59.0");
        assert_eq!(SalesforceClient::new("60.0").api_path, "/services/data/v60.0");
    }
}
