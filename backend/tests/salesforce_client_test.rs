use std::time::Duration;

use salesforce_saver_backend::config::SalesforceConfig;
use salesforce_saver_backend::salesforce::{SalesforceClient, SalesforceError, SalesforceOAuth};
use salesforce_saver_backend::test_util::query_page;
use salesforce_saver_backend::SalesforceSession;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param, query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUERY_PATH: &str = "/services/data/v59.0/query";

fn session(server: &MockServer) -> SalesforceSession {
    SalesforceSession::new("00Dxx!token", server.uri())
}

#[tokio::test]
async fn test_query_follows_next_records_url() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param_contains("q", "FROM OauthToken"))
        .and(header("authorization", "Bearer 00Dxx!token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 3,
            "done": false,
            "nextRecordsUrl": "/services/data/v59.0/query/01gxx-2000",
            "records": [
                {"Id": "1", "AppName": "Slack", "UseCount": 10, "UserId": "005A"},
                {"Id": "2", "AppName": "Slack", "UseCount": 5, "UserId": "005B"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/query/01gxx-2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 3,
            "done": true,
            "records": [
                {"Id": "3", "AppName": "Zoom", "LastUsedDate": "2024-03-01T08:00:00.000+0000", "UseCount": 1, "UserId": "005A"}
            ]
        })))
        .mount(&server)
        .await;

    let client = SalesforceClient::new("59.0");
    let tokens = client.oauth_tokens(&session(&server)).await.unwrap();

    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[2].app_name, "Zoom");
    assert!(tokens[2].last_used_date.is_some());
}

#[tokio::test]
async fn test_invalid_session_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!([
            {"message": "Session expired or invalid", "errorCode": "INVALID_SESSION_ID"}
        ])))
        .mount(&server)
        .await;

    let client = SalesforceClient::new("59.0");
    let err = client.active_users(&session(&server)).await.unwrap_err();
    assert!(matches!(err, SalesforceError::InvalidSession(_)));
}

#[tokio::test]
async fn test_api_error_keeps_error_code() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([
            {"message": "sObject type 'PackageLicense' is not supported.", "errorCode": "INVALID_TYPE"}
        ])))
        .mount(&server)
        .await;

    let client = SalesforceClient::new("59.0");
    match client.package_licenses(&session(&server)).await {
        Err(SalesforceError::Api { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.starts_with("INVALID_TYPE"));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_package_licenses_skip_site_wide() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param_contains("q", "FROM PackageLicense"))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_page(json!([
            {"NamespacePrefix": "cpq", "AllowedLicenses": 40, "UsedLicenses": 12, "Status": "Active"},
            {"NamespacePrefix": "free", "AllowedLicenses": -1, "UsedLicenses": 300, "Status": "Active"}
        ]))))
        .mount(&server)
        .await;

    let client = SalesforceClient::new("59.0");
    let licenses = client.package_licenses(&session(&server)).await.unwrap();
    assert_eq!(licenses.len(), 1);
    assert_eq!(licenses[0].name, "cpq");
    assert_eq!(licenses[0].unused(), 28);
}

#[tokio::test]
async fn test_limits_and_sandboxes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/limits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "DataStorageMB": {"Max": 1000, "Remaining": 200},
            "FileStorageMB": {"Max": 1000, "Remaining": 400},
            "DailyApiRequests": {"Max": 15000, "Remaining": 14000, "Ant Migration Tool": {"Max": 0, "Remaining": 0}}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/tooling/query"))
        .and(query_param_contains("q", "FROM SandboxInfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_page(json!([
            {"Id": "0GQ1", "SandboxName": "uat", "LicenseType": "FULL", "Description": null},
            {"Id": "0GQ2", "SandboxName": "dev", "LicenseType": "DEVELOPER"}
        ]))))
        .mount(&server)
        .await;

    let client = SalesforceClient::new("59.0");
    let s = session(&server);

    let limits = client.limits(&s).await.unwrap();
    assert_eq!(limits.get("DataStorageMB").map(|l| l.used()), Some(800));

    let sandboxes = client.sandboxes(&s).await.unwrap();
    assert_eq!(sandboxes.iter().filter(|s| s.is_full_copy()).count(), 1);
}

#[tokio::test]
async fn test_sandbox_query_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/data/v59.0/tooling/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(query_page(json!([])))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = SalesforceClient::new("59.0").with_sandbox_timeout(Duration::from_millis(100));
    match client.sandboxes(&session(&server)).await {
        Err(SalesforceError::Timeout(_)) => {}
        other => panic!("expected a timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_overview_counts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param_contains("q", "FROM Organization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(query_page(json!([
            {"Id": "00D000000000001", "Name": "Acme"}
        ]))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("q", "SELECT COUNT() FROM Lead"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalSize": 42, "done": true, "records": []})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(QUERY_PATH))
        .and(query_param("q", "SELECT COUNT() FROM Opportunity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"totalSize": 7, "done": true, "records": []})))
        .mount(&server)
        .await;

    let overview = SalesforceClient::new("59.0").overview(&session(&server)).await.unwrap();
    assert_eq!(overview.org_id, "00D000000000001");
    assert_eq!(overview.org_name, "Acme");
    assert_eq!(overview.lead_count, 42);
    assert_eq!(overview.opportunity_count, 7);
}

fn oauth(server: &MockServer) -> SalesforceOAuth {
    SalesforceOAuth::new(SalesforceConfig {
        client_id: "cid".to_string(),
        client_secret: "csecret".to_string(),
        redirect_uri: "https://saver.test/oauth/callback".to_string(),
        login_url: server.uri(),
        api_version: "59.0".to_string(),
        sandbox_timeout_secs: 10,
    })
}

#[tokio::test]
async fn test_exchange_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "00Dxx!fresh",
            "instance_url": "https://acme.my.salesforce.com",
            "id": "https://login.salesforce.com/id/00D/005",
            "token_type": "Bearer",
            "issued_at": "1700000000000"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = oauth(&server).exchange_code("auth-code").await.unwrap();
    assert_eq!(token.access_token, "00Dxx!fresh");
    assert_eq!(token.instance_url, "https://acme.my.salesforce.com");
    assert_eq!(token.issued_at.as_deref(), Some("1700000000000"));
}

#[tokio::test]
async fn test_exchange_code_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/services/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "expired authorization code"
        })))
        .mount(&server)
        .await;

    match oauth(&server).exchange_code("stale").await {
        Err(SalesforceError::OAuth(message)) => {
            assert_eq!(message, "invalid_grant: expired authorization code")
        }
        other => panic!("unexpected result: {:?}", other),
    }
}
