use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::require_org;
use crate::error::{Error, Result};
use crate::session::SalesforceSession;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub org_id: String,
    pub license_price: f64,
    /// `None` until the org saves its own price.
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct UpdateSettingsRequest {
    pub license_price: f64,
}

async fn get_settings(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    Path(org_id): Path<String>,
) -> Result<Json<SettingsResponse>> {
    require_org(&state, &session, &org_id).await?;
    let response = match state.store.get_settings(&org_id)? {
        Some(settings) => SettingsResponse {
            org_id: settings.org_id,
            license_price: settings.license_price,
            updated_at: Some(settings.updated_at),
        },
        None => SettingsResponse {
            org_id,
            license_price: state.config.pricing.default_license_price,
            updated_at: None,
        },
    };
    Ok(Json(response))
}

async fn put_settings(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    Path(org_id): Path<String>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>> {
    require_org(&state, &session, &org_id).await?;
    if !request.license_price.is_finite() || request.license_price < 0.0 {
        return Err(Error::InvalidRequest(
            "license_price must be a non-negative number".to_string(),
        ));
    }

    let settings = state.store.upsert_settings(&org_id, request.license_price)?;
    Ok(Json(SettingsResponse {
        org_id: settings.org_id,
        license_price: settings.license_price,
        updated_at: Some(settings.updated_at),
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/settings/:org_id", get(get_settings).put(put_settings))
        .with_state(state)
}
