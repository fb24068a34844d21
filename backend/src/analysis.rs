//! Report assembly: fetch an org's data, then run the savings calculations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use saver_common::{
    build_report, mark_platform_eligible, platform_eligible_user_ids, LicenseCount, OAuthToken,
    ObjectPermission, OrgLimits, PermissionSetAssignment, ReportInput, SalesforceUser, Sandbox,
    SavingsAssumptions, SavingsReport,
};

use crate::error::Result;
use crate::salesforce::{OrgOverview, SalesforceClient, SalesforceError};
use crate::session::SalesforceSession;
use crate::store::Store;

/// Raw org data needed for one report.
#[derive(Debug, Clone, Default)]
pub struct OrgSnapshot {
    pub users: Vec<SalesforceUser>,
    pub oauth_tokens: Vec<OAuthToken>,
    pub user_licenses: Vec<LicenseCount>,
    pub package_licenses: Vec<LicenseCount>,
    pub permission_set_licenses: Vec<LicenseCount>,
    pub assignments: Vec<PermissionSetAssignment>,
    pub object_permissions: Vec<ObjectPermission>,
    pub sandboxes: Vec<Sandbox>,
    pub limits: OrgLimits,
}

/// Where org data comes from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrgDataSource: Send + Sync {
    async fn organization(&self, session: &SalesforceSession) -> std::result::Result<OrgOverview, SalesforceError>;

    async fn oauth_tokens(&self, session: &SalesforceSession) -> std::result::Result<Vec<OAuthToken>, SalesforceError>;

    async fn snapshot(&self, session: &SalesforceSession) -> std::result::Result<OrgSnapshot, SalesforceError>;
}

/// Fall back to an empty value when an optional fetch fails.
///
/// The tooling API and `/limits` are often restricted for the connected user.
/// A rejected session still fails the whole snapshot.
fn or_empty<T: Default>(
    fetch: &str,
    result: std::result::Result<T, SalesforceError>,
) -> std::result::Result<T, SalesforceError> {
    match result {
        Err(SalesforceError::InvalidSession(msg)) => Err(SalesforceError::InvalidSession(msg)),
        Err(e) => {
            tracing::warn!(fetch = %fetch, error = %e, "Salesforce fetch failed, using empty result");
            Ok(T::default())
        }
        ok => ok,
    }
}

#[async_trait]
impl OrgDataSource for SalesforceClient {
    async fn organization(&self, session: &SalesforceSession) -> std::result::Result<OrgOverview, SalesforceError> {
        self.overview(session).await
    }

    async fn oauth_tokens(&self, session: &SalesforceSession) -> std::result::Result<Vec<OAuthToken>, SalesforceError> {
        SalesforceClient::oauth_tokens(self, session).await
    }

    async fn snapshot(&self, session: &SalesforceSession) -> std::result::Result<OrgSnapshot, SalesforceError> {
        let (users, oauth_tokens, user_licenses, package_licenses, permission_set_licenses) = tokio::try_join!(
            self.active_users(session),
            SalesforceClient::oauth_tokens(self, session),
            self.user_licenses(session),
            self.package_licenses(session),
            self.permission_set_licenses(session),
        )?;
        let (assignments, object_permissions, sandboxes, limits) = tokio::try_join!(
            self.permission_set_assignments(session),
            self.crm_object_permissions(session),
            async { or_empty("sandboxes", self.sandboxes(session).await) },
            async { or_empty("limits", self.limits(session).await) },
        )?;

        tracing::debug!(
            users = users.len(),
            tokens = oauth_tokens.len(),
            sandboxes = sandboxes.len(),
            "Fetched org snapshot"
        );

        Ok(OrgSnapshot {
            users,
            oauth_tokens,
            user_licenses,
            package_licenses,
            permission_set_licenses,
            assignments,
            object_permissions,
            sandboxes,
            limits,
        })
    }
}

/// Price precedence: request override, then stored org setting, then the
/// configured default.
pub fn resolve_license_price(
    store: &Store,
    org_id: &str,
    override_price: Option<f64>,
    default_price: f64,
) -> Result<f64> {
    if let Some(price) = override_price {
        return Ok(price);
    }
    Ok(store
        .get_settings(org_id)?
        .map(|s| s.license_price)
        .unwrap_or(default_price))
}

/// Fetch everything for `org_id` and build the full report.
pub async fn generate_report<D>(
    source: &D,
    store: &Store,
    session: &SalesforceSession,
    org_id: &str,
    license_price: f64,
    assumptions: &SavingsAssumptions,
    now: DateTime<Utc>,
) -> Result<SavingsReport>
where
    D: OrgDataSource + ?Sized,
{
    let snapshot = source.snapshot(session).await?;

    let mut users = snapshot.users;
    let eligible = platform_eligible_user_ids(&users, &snapshot.assignments, &snapshot.object_permissions);
    mark_platform_eligible(&mut users, &eligible);

    let input = ReportInput {
        users,
        oauth_tokens: snapshot.oauth_tokens,
        user_licenses: snapshot.user_licenses,
        package_licenses: snapshot.package_licenses,
        permission_set_licenses: snapshot.permission_set_licenses,
        sandboxes: snapshot.sandboxes,
        limits: snapshot.limits,
        contracts: store.list_contracts(org_id)?,
        invoices: store.list_invoices(org_id)?,
        license_price,
    };

    let report = build_report(&input, assumptions, now);
    tracing::info!(
        org_id = %org_id,
        total_annual_savings = report.total_annual_savings,
        "Generated savings report"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use saver_common::{Contract, Profile, UserLicenseRef};

    fn user(id: &str, license: &str, last_login: Option<DateTime<Utc>>) -> SalesforceUser {
        SalesforceUser {
            id: id.to_string(),
            username: format!("{}@acme.test", id),
            last_login_date: last_login,
            user_type: "Standard".to_string(),
            is_active: true,
            profile: Some(Profile {
                name: "Standard User".to_string(),
                user_license: Some(UserLicenseRef {
                    name: license.to_string(),
                }),
            }),
            is_platform_eligible: false,
        }
    }

    fn snapshot(now: DateTime<Utc>) -> OrgSnapshot {
        OrgSnapshot {
            users: vec![
                user("005A", "Salesforce", None),
                user("005B", "Salesforce", Some(now - Duration::days(1))),
            ],
            user_licenses: vec![LicenseCount::new("Salesforce", 10, 7)],
            assignments: vec![PermissionSetAssignment {
                assignee_id: "005A".to_string(),
                permission_set_id: "0PS1".to_string(),
            }],
            object_permissions: vec![ObjectPermission {
                parent_id: "0PS1".to_string(),
                sobject_type: "Opportunity".to_string(),
                permissions_read: true,
            }],
            ..OrgSnapshot::default()
        }
    }

    #[tokio::test]
    async fn test_generate_report_marks_eligibility_and_uses_store() {
        let now = Utc::now();
        let store = Store::new(":memory:").unwrap();
        store
            .insert_contract(&Contract {
                id: "c1".to_string(),
                org_id: "00D1".to_string(),
                name: "Enterprise".to_string(),
                start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end_date: (now + Duration::days(30)).date_naive(),
                status: "Active".to_string(),
                amount: 10_000.0,
                document_name: None,
            })
            .unwrap();

        let mut source = MockOrgDataSource::new();
        let snap = snapshot(now);
        source
            .expect_snapshot()
            .times(1)
            .returning(move |_| Ok(snap.clone()));

        let session = SalesforceSession::new("token", "https://acme.my.salesforce.com");
        let report = generate_report(
            &source,
            &store,
            &session,
            "00D1",
            100.0,
            &SavingsAssumptions::default(),
            now,
        )
        .await
        .unwrap();

        // 005A never logged in and reads Opportunity; 005B has no CRM access.
        assert_eq!(report.inactive_users.count, 1);
        assert_eq!(report.platform_conversion.user_ids, vec!["005B".to_string()]);
        assert_eq!(report.license_recommendations.len(), 1);
        assert_eq!(report.contract_recommendations.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_session_propagates() {
        let mut source = MockOrgDataSource::new();
        source
            .expect_snapshot()
            .returning(|_| Err(SalesforceError::InvalidSession("INVALID_SESSION_ID".to_string())));

        let store = Store::new(":memory:").unwrap();
        let session = SalesforceSession::new("token", "https://acme.my.salesforce.com");
        let err = generate_report(
            &source,
            &store,
            &session,
            "00D1",
            100.0,
            &SavingsAssumptions::default(),
            Utc::now(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.error_type(), "session_expired");
    }

    #[test]
    fn test_optional_fetch_falls_back_to_empty() {
        let denied: std::result::Result<Vec<Sandbox>, _> = Err(SalesforceError::Api {
            status: 403,
            message: "INSUFFICIENT_ACCESS: tooling API disabled".to_string(),
        });
        assert!(or_empty("sandboxes", denied).unwrap().is_empty());

        let timed_out: std::result::Result<OrgLimits, _> = Err(SalesforceError::Timeout("10s".to_string()));
        assert_eq!(or_empty("limits", timed_out).unwrap(), OrgLimits::default());

        let revoked: std::result::Result<Vec<Sandbox>, _> =
            Err(SalesforceError::InvalidSession("INVALID_SESSION_ID".to_string()));
        assert!(matches!(
            or_empty("sandboxes", revoked),
            Err(SalesforceError::InvalidSession(_))
        ));
    }

    #[test]
    fn test_license_price_precedence() {
        let store = Store::new(":memory:").unwrap();
        assert_eq!(resolve_license_price(&store, "00D1", None, 150.0).unwrap(), 150.0);

        store.upsert_settings("00D1", 120.0).unwrap();
        assert_eq!(resolve_license_price(&store, "00D1", None, 150.0).unwrap(), 120.0);
        assert_eq!(resolve_license_price(&store, "00D1", Some(90.0), 150.0).unwrap(), 90.0);
    }
}
