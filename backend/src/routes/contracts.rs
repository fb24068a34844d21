use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use saver_common::{Contract, Invoice};
use serde::{Deserialize, Serialize};

use super::require_org;
use crate::error::{Error, Result};
use crate::session::SalesforceSession;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ContractsResponse {
    pub contracts: Vec<Contract>,
    pub invoices: Vec<Invoice>,
}

#[derive(Deserialize)]
pub struct NewContract {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default = "default_contract_status")]
    pub status: String,
    pub amount: f64,
    /// File name of the uploaded contract; the document itself is not stored.
    #[serde(default)]
    pub document_name: Option<String>,
}

#[derive(Deserialize)]
pub struct NewInvoice {
    #[serde(default)]
    pub contract_id: Option<String>,
    pub invoice_date: NaiveDate,
    #[serde(default = "default_invoice_status")]
    pub status: String,
    pub amount: f64,
}

fn default_contract_status() -> String {
    "Active".to_string()
}

fn default_invoice_status() -> String {
    "Paid".to_string()
}

fn check_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidRequest("amount must be a non-negative number".to_string()))
    }
}

async fn list(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    Path(org_id): Path<String>,
) -> Result<Json<ContractsResponse>> {
    require_org(&state, &session, &org_id).await?;
    Ok(Json(ContractsResponse {
        contracts: state.store.list_contracts(&org_id)?,
        invoices: state.store.list_invoices(&org_id)?,
    }))
}

async fn create_contract(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    Path(org_id): Path<String>,
    Json(request): Json<NewContract>,
) -> Result<(StatusCode, Json<Contract>)> {
    require_org(&state, &session, &org_id).await?;
    if request.name.trim().is_empty() {
        return Err(Error::InvalidRequest("name is required".to_string()));
    }
    if request.end_date < request.start_date {
        return Err(Error::InvalidRequest("end_date is before start_date".to_string()));
    }
    check_amount(request.amount)?;

    let contract = Contract {
        id: uuid::Uuid::new_v4().to_string(),
        org_id,
        name: request.name.trim().to_string(),
        start_date: request.start_date,
        end_date: request.end_date,
        status: request.status,
        amount: request.amount,
        document_name: request.document_name,
    };
    state.store.insert_contract(&contract)?;
    Ok((StatusCode::CREATED, Json(contract)))
}

async fn create_invoice(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    Path(org_id): Path<String>,
    Json(request): Json<NewInvoice>,
) -> Result<(StatusCode, Json<Invoice>)> {
    require_org(&state, &session, &org_id).await?;
    check_amount(request.amount)?;

    if let Some(contract_id) = &request.contract_id {
        let known = state
            .store
            .list_contracts(&org_id)?
            .iter()
            .any(|c| &c.id == contract_id);
        if !known {
            return Err(Error::NotFound(format!("contract {}", contract_id)));
        }
    }

    let invoice = Invoice {
        id: uuid::Uuid::new_v4().to_string(),
        org_id,
        contract_id: request.contract_id,
        invoice_date: request.invoice_date,
        status: request.status,
        amount: request.amount,
    };
    state.store.insert_invoice(&invoice)?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/contracts/:org_id", get(list).post(create_contract))
        .route("/contracts/:org_id/invoices", post(create_invoice))
        .with_state(state)
}
