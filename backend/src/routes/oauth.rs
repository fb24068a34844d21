use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::AppState;

#[derive(Serialize)]
pub struct AuthorizeResponse {
    pub url: String,
    pub state: String,
}

#[derive(Deserialize)]
pub struct CallbackRequest {
    pub code: String,
    /// The `state` Salesforce redirected back with.
    #[serde(default)]
    pub state: Option<String>,
}

/// What the client keeps and sends back as session headers.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub access_token: String,
    pub instance_url: String,
    pub issued_at: DateTime<Utc>,
    /// Echo of the verified `state`, for the client to match against the one
    /// it started the flow with.
    pub state: String,
}

/// Salesforce reports `issued_at` as epoch milliseconds in a string.
fn parse_issued_at(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| s.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
}

async fn authorize(State(state): State<Arc<AppState>>) -> Result<Json<AuthorizeResponse>> {
    let csrf = state.oauth.issue_state(Utc::now().timestamp())?;
    let url = state.oauth.authorize_url(&csrf)?;
    Ok(Json(AuthorizeResponse { url, state: csrf }))
}

async fn callback(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>> {
    if request.code.trim().is_empty() {
        return Err(Error::InvalidRequest("code is required".to_string()));
    }
    let csrf = request
        .state
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidRequest("state is required".to_string()))?;
    state.oauth.verify_state(&csrf, Utc::now().timestamp())?;

    let token = state.oauth.exchange_code(&request.code).await?;
    tracing::info!(instance_url = %token.instance_url, "Salesforce OAuth completed");

    Ok(Json(CallbackResponse {
        issued_at: parse_issued_at(token.issued_at.as_deref()).unwrap_or_else(Utc::now),
        access_token: token.access_token,
        instance_url: token.instance_url,
        state: csrf,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/oauth/authorize", get(authorize))
        .route("/oauth/callback", post(callback))
        .with_state(state)
}
