use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::analysis::OrgDataSource;
use crate::error::Result;
use crate::salesforce::OrgOverview;
use crate::session::SalesforceSession;
use crate::AppState;

async fn overview(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
) -> Result<Json<OrgOverview>> {
    let overview = state.salesforce.organization(&session).await?;
    Ok(Json(overview))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/org", get(overview))
        .with_state(state)
}
