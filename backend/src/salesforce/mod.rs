//! Salesforce REST API access.
//!
//! `SalesforceClient` issues SOQL and tooling queries on behalf of an explicit
//! [`SalesforceSession`](crate::session::SalesforceSession). `SalesforceOAuth`
//! covers the authorization-code flow that produces those sessions.

mod client;
mod oauth;
pub mod types;

pub use client::SalesforceClient;
pub use oauth::SalesforceOAuth;
pub use types::{OrgOverview, TokenResponse};

/// Error code Salesforce returns for expired or revoked tokens.
pub const INVALID_SESSION_ID: &str = "INVALID_SESSION_ID";

#[derive(Debug, thiserror::Error)]
pub enum SalesforceError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Invalid session: {0}")]
    InvalidSession(String),
    #[error("Salesforce API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
}

impl From<reqwest::Error> for SalesforceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SalesforceError::Timeout(e.to_string())
        } else if e.is_decode() {
            SalesforceError::InvalidResponse(e.to_string())
        } else {
            SalesforceError::RequestFailed(e.to_string())
        }
    }
}

/// Classify a non-success response body.
pub(crate) fn api_error(status: u16, body: &str) -> SalesforceError {
    if body.contains(INVALID_SESSION_ID) {
        return SalesforceError::InvalidSession(INVALID_SESSION_ID.to_string());
    }

    let message = serde_json::from_str::<Vec<types::ApiErrorBody>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next())
        .map(|e| format!("{}: {}", e.error_code, e.message))
        .unwrap_or_else(|| body.to_string());

    SalesforceError::Api { status, message }
}
