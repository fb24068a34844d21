use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use saver_common::{summarize_connected_apps, ConnectedAppUsage};
use serde::{Deserialize, Serialize};

use super::require_org;
use crate::analysis::OrgDataSource;
use crate::error::{Error, Result};
use crate::llm::ConsolidationAnalysis;
use crate::models::ToolAnalysis;
use crate::session::SalesforceSession;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsolidationResponse {
    pub org_id: String,
    pub apps: Vec<ConnectedAppUsage>,
    pub analysis: ConsolidationAnalysis,
}

async fn consolidate(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
) -> Result<Json<ConsolidationResponse>> {
    let (org, tokens) = tokio::try_join!(
        state.salesforce.organization(&session),
        OrgDataSource::oauth_tokens(&state.salesforce, &session),
    )?;

    let apps = summarize_connected_apps(&tokens);
    let analysis = state.openai.analyze_apps(&apps).await?;

    let value = serde_json::to_value(&analysis).map_err(|e| Error::Internal(e.to_string()))?;
    state.store.save_tool_analysis(&org.org_id, &value)?;
    tracing::info!(
        org_id = %org.org_id,
        apps = apps.len(),
        categories = analysis.categories.len(),
        "Stored consolidation analysis"
    );

    Ok(Json(ConsolidationResponse {
        org_id: org.org_id,
        apps,
        analysis,
    }))
}

async fn latest(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    Path(org_id): Path<String>,
) -> Result<Json<ToolAnalysis>> {
    require_org(&state, &session, &org_id).await?;
    state
        .store
        .latest_tool_analysis(&org_id)?
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("no consolidation analysis for {}", org_id)))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/apps/consolidation", post(consolidate))
        .route("/apps/consolidation/:org_id", get(latest))
        .with_state(state)
}
