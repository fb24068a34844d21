//! Per-request Salesforce session.
//!
//! Clients hold the access token from the OAuth callback and send it back on
//! every call. Nothing is kept server-side between requests.

use std::net::IpAddr;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use reqwest::Url;

use crate::error::Error;

pub const INSTANCE_URL_HEADER: &str = "x-salesforce-instance-url";
pub const ISSUED_AT_HEADER: &str = "x-salesforce-issued-at";

/// Sessions older than this are treated as expired without asking Salesforce.
pub const SESSION_TTL_HOURS: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SalesforceSession {
    pub access_token: String,
    pub instance_url: String,
    pub issued_at: Option<DateTime<Utc>>,
}

impl SalesforceSession {
    pub fn new(access_token: impl Into<String>, instance_url: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            issued_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.issued_at {
            Some(issued) => now - issued > Duration::hours(SESSION_TTL_HOURS),
            None => false,
        }
    }

    /// Build a session from request headers, rejecting expired ones.
    pub fn from_headers(headers: &HeaderMap, now: DateTime<Utc>) -> Result<Self, Error> {
        let access_token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Unauthorized("Missing Salesforce access token".to_string()))?;

        let instance_url = headers
            .get(INSTANCE_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Unauthorized("Missing Salesforce instance URL".to_string()))?;

        let parsed = Url::parse(instance_url)
            .map_err(|e| Error::InvalidRequest(format!("Invalid instance URL: {}", e)))?;
        match parsed.scheme() {
            "https" => {}
            "http" if is_loopback(&parsed) => {}
            other => {
                return Err(Error::InvalidRequest(format!(
                    "Unsupported instance URL scheme: {}",
                    other
                )));
            }
        }

        let issued_at = match headers.get(ISSUED_AT_HEADER).and_then(|v| v.to_str().ok()) {
            Some(raw) => Some(
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| Error::InvalidRequest(format!("Invalid issued-at: {}", e)))?,
            ),
            None => None,
        };

        let mut session = SalesforceSession::new(access_token, instance_url);
        session.issued_at = issued_at;

        if session.is_expired(now) {
            return Err(Error::SessionExpired(format!(
                "session is older than {} hours",
                SESSION_TTL_HOURS
            )));
        }

        Ok(session)
    }
}

/// Plain http is only allowed for local development servers.
fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SalesforceSession
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        SalesforceSession::from_headers(&parts.headers, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(token: &str, instance: &str, issued_at: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers.insert(INSTANCE_URL_HEADER, HeaderValue::from_str(instance).unwrap());
        if let Some(issued) = issued_at {
            headers.insert(ISSUED_AT_HEADER, HeaderValue::from_str(issued).unwrap());
        }
        headers
    }

    #[test]
    fn test_session_from_headers() {
        let now = Utc::now();
        let h = headers("00Dxx!token", "https://acme.my.salesforce.com/", None);
        let session = SalesforceSession::from_headers(&h, now).unwrap();
        assert_eq!(session.access_token, "00Dxx!token");
        assert_eq!(session.instance_url, "https://acme.my.salesforce.com");
        assert!(session.issued_at.is_none());
    }

    #[test]
    fn test_session_expires_after_two_hours() {
        let now = Utc::now();
        let stale = (now - Duration::hours(2) - Duration::minutes(1)).to_rfc3339();
        let fresh = (now - Duration::minutes(90)).to_rfc3339();

        let err = SalesforceSession::from_headers(&headers("t", "https://x.my.salesforce.com", Some(&stale)), now)
            .unwrap_err();
        assert_eq!(err.error_type(), "session_expired");

        assert!(SalesforceSession::from_headers(&headers("t", "https://x.my.salesforce.com", Some(&fresh)), now).is_ok());
    }

    #[test]
    fn test_missing_token_is_unauthorized() {
        let mut h = HeaderMap::new();
        h.insert(INSTANCE_URL_HEADER, HeaderValue::from_static("https://x.my.salesforce.com"));
        let err = SalesforceSession::from_headers(&h, Utc::now()).unwrap_err();
        assert_eq!(err.error_type(), "unauthorized");
    }

    #[rstest]
    #[case("http://127.0.0.1:8080", true)]
    #[case("http://localhost:3000", true)]
    #[case("http://[::1]:9000", true)]
    #[case("http://acme.my.salesforce.com", false)]
    #[case("http://10.0.0.5", false)]
    #[case("https://acme.my.salesforce.com", true)]
    fn test_plain_http_only_for_loopback(#[case] instance: &str, #[case] accepted: bool) {
        let result = SalesforceSession::from_headers(&headers("t", instance, None), Utc::now());
        match result {
            Ok(_) => assert!(accepted, "{} should be rejected", instance),
            Err(e) => {
                assert!(!accepted, "{} should be accepted", instance);
                assert_eq!(e.error_type(), "invalid_request");
            }
        }
    }

    #[test]
    fn test_rejects_non_http_instance() {
        let err = SalesforceSession::from_headers(&headers("t", "ftp://x.example.com", None), Utc::now())
            .unwrap_err();
        assert_eq!(err.error_type(), "invalid_request");
    }
}
