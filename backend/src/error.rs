//! API error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::billing::StripeError;
use crate::llm::OpenAiError;
use crate::salesforce::SalesforceError;
use crate::store::StoreError;

/// Errors surfaced to API clients.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The Salesforce session is too old or was rejected. The client should
    /// drop its stored token and re-authenticate.
    #[error("Salesforce session expired: {0}")]
    SessionExpired(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The session is valid but belongs to a different org.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn error_type(&self) -> &'static str {
        match self {
            Error::SessionExpired(_) => "session_expired",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::PaymentRequired(_) => "payment_required",
            Error::InvalidRequest(_) => "invalid_request",
            Error::NotFound(_) => "not_found",
            Error::Upstream(_) => "upstream_error",
            Error::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::SessionExpired(_) | Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = Json(json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

impl From<SalesforceError> for Error {
    fn from(e: SalesforceError) -> Self {
        match e {
            SalesforceError::InvalidSession(msg) => Error::SessionExpired(msg),
            SalesforceError::OAuth(msg) => Error::Unauthorized(msg),
            other => Error::Upstream(other.to_string()),
        }
    }
}

impl From<StripeError> for Error {
    fn from(e: StripeError) -> Self {
        match e {
            StripeError::InvalidSignature(msg) => Error::InvalidRequest(msg),
            StripeError::InvalidPayload(msg) => Error::InvalidRequest(msg),
            other => Error::Upstream(other.to_string()),
        }
    }
}

impl From<OpenAiError> for Error {
    fn from(e: OpenAiError) -> Self {
        match e {
            OpenAiError::NotConfigured => Error::Internal(e.to_string()),
            other => Error::Upstream(other.to_string()),
        }
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Internal(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::SessionExpired("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::PaymentRequired("x".into()).status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(Error::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(Error::Upstream("x".into()).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_session_maps_to_session_expired() {
        let err: Error = SalesforceError::InvalidSession("INVALID_SESSION_ID".into()).into();
        assert_eq!(err.error_type(), "session_expired");

        let err: Error = SalesforceError::Api {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert_eq!(err.error_type(), "upstream_error");
    }
}
