pub mod apps;
pub mod billing;
pub mod consultations;
pub mod contracts;
pub mod health;
pub mod oauth;
pub mod org;
pub mod report;
pub mod settings;

use std::sync::Arc;

use axum::Router;

use crate::error::{Error, Result};
use crate::session::SalesforceSession;
use crate::AppState;

/// Check that `org_id` is the org the session's token belongs to.
pub(crate) async fn require_org(
    state: &AppState,
    session: &SalesforceSession,
    org_id: &str,
) -> Result<()> {
    let org = state.salesforce.identity(session).await?;
    if org.id != org_id {
        tracing::warn!(requested = %org_id, session_org = %org.id, "Org id does not match session");
        return Err(Error::Forbidden(format!("session does not belong to org {}", org_id)));
    }
    Ok(())
}

/// Every API route, mounted under `/api`, plus health and metrics.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(oauth::router(state.clone()))
        .merge(org::router(state.clone()))
        .merge(report::router(state.clone()))
        .merge(billing::router(state.clone()))
        .merge(consultations::router(state.clone()))
        .merge(settings::router(state.clone()))
        .merge(contracts::router(state.clone()))
        .merge(apps::router(state));

    Router::new().merge(health::router()).nest("/api", api)
}
