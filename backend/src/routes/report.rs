use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use saver_common::{ReportSummary, SavingsReport};
use serde::{Deserialize, Serialize};

use crate::analysis::{generate_report, resolve_license_price, OrgDataSource};
use crate::error::{Error, Result};
use crate::export::report_to_csv;
use crate::salesforce::OrgOverview;
use crate::session::SalesforceSession;
use crate::AppState;

/// Per-request override of the stored monthly license price.
pub const LICENSE_PRICE_HEADER: &str = "x-license-price";

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub org_id: String,
    pub org_name: String,
    /// Whether `report` carries the full detail.
    pub paid: bool,
    pub summary: ReportSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<SavingsReport>,
}

fn license_price_override(headers: &HeaderMap) -> Result<Option<f64>> {
    let Some(raw) = headers.get(LICENSE_PRICE_HEADER) else {
        return Ok(None);
    };
    let price = raw
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite() && *p >= 0.0)
        .ok_or_else(|| Error::InvalidRequest("X-License-Price must be a non-negative number".to_string()))?;
    Ok(Some(price))
}

async fn build(
    state: &AppState,
    session: &SalesforceSession,
    headers: &HeaderMap,
    org: &OrgOverview,
) -> Result<SavingsReport> {
    let price = resolve_license_price(
        &state.store,
        &org.org_id,
        license_price_override(headers)?,
        state.config.pricing.default_license_price,
    )?;

    generate_report(
        &state.salesforce,
        &state.store,
        session,
        &org.org_id,
        price,
        &state.config.assumptions,
        Utc::now(),
    )
    .await
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    headers: HeaderMap,
) -> Result<Json<ReportResponse>> {
    let org = state.salesforce.organization(&session).await?;
    let report = build(&state, &session, &headers, &org).await?;
    let paid = state.store.has_paid_access(&org.org_id)?;

    Ok(Json(ReportResponse {
        summary: report.summary(),
        report: paid.then_some(report),
        org_id: org.org_id,
        org_name: org.org_name,
        paid,
    }))
}

async fn export_csv(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    headers: HeaderMap,
) -> Result<Response> {
    let org = state.salesforce.organization(&session).await?;
    if !state.store.has_paid_access(&org.org_id)? {
        return Err(Error::PaymentRequired(
            "CSV export requires a subscription or report purchase".to_string(),
        ));
    }

    let report = build(&state, &session, &headers, &org).await?;
    let body = report_to_csv(&report).map_err(|e| Error::Internal(e.to_string()))?;
    let disposition = format!(
        "attachment; filename=\"salesforce-savings-{}-{}.csv\"",
        org.org_id,
        report.generated_at.format("%Y-%m-%d")
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/report", get(get_report))
        .route("/report/export.csv", get(export_csv))
        .with_state(state)
}
