use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::billing::{verify_signature, BillingEvent, CheckoutMode, CheckoutSession, StripeEvent};
use super::require_org;
use crate::error::{Error, Result};
use crate::models::OrganizationSubscription;
use crate::session::SalesforceSession;
use crate::store::Store;
use crate::AppState;

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub org_id: String,
    pub price_id: String,
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub org_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BillingStatus {
    pub org_id: String,
    pub subscription_status: Option<String>,
    pub has_report_access: bool,
    pub paid: bool,
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutSession>> {
    if request.org_id.trim().is_empty() || request.price_id.trim().is_empty() {
        return Err(Error::InvalidRequest("org_id and price_id are required".to_string()));
    }
    require_org(&state, &session, &request.org_id).await?;

    let created = state
        .stripe
        .create_checkout_session(&request.org_id, &request.price_id)
        .await?;
    tracing::info!(
        org_id = %request.org_id,
        session_id = %created.id,
        mode = created.mode.as_str(),
        "Created checkout session"
    );
    Ok(Json(created))
}

/// Apply a verified billing event to the store.
pub fn apply_billing_event(store: &Store, event: BillingEvent) -> Result<()> {
    match event {
        BillingEvent::CheckoutCompleted {
            session_id,
            org_id,
            mode,
            customer_id,
            subscription_id,
        } => {
            let Some(org_id) = org_id else {
                tracing::warn!(session_id = %session_id, "Checkout completed without an org id");
                return Ok(());
            };
            match mode {
                CheckoutMode::Payment => {
                    store.grant_report_access(&org_id, &session_id)?;
                }
                CheckoutMode::Subscription => {
                    let mut sub = OrganizationSubscription::new(org_id, "active");
                    sub.stripe_customer_id = customer_id;
                    sub.stripe_subscription_id = subscription_id;
                    store.upsert_subscription(&sub)?;
                }
            }
        }
        BillingEvent::SubscriptionChanged {
            subscription_id,
            org_id,
            customer_id,
            status,
            price_id,
            current_period_end,
        } => {
            let org_id = match org_id {
                Some(id) => Some(id),
                None => store.find_org_by_subscription(&subscription_id)?,
            };
            let Some(org_id) = org_id else {
                tracing::warn!(subscription_id = %subscription_id, "Subscription event for unknown org");
                return Ok(());
            };

            let mut sub = OrganizationSubscription::new(org_id, status);
            sub.stripe_customer_id = customer_id;
            sub.stripe_subscription_id = Some(subscription_id);
            sub.price_id = price_id;
            sub.current_period_end = current_period_end.and_then(|secs| DateTime::from_timestamp(secs, 0));
            store.upsert_subscription(&sub)?;
        }
        BillingEvent::SubscriptionDeleted { subscription_id, org_id } => {
            let changed = store.set_subscription_status(&subscription_id, "canceled")?;
            if changed == 0 {
                if let Some(org_id) = org_id {
                    let mut sub = OrganizationSubscription::new(org_id, "canceled");
                    sub.stripe_subscription_id = Some(subscription_id);
                    store.upsert_subscription(&sub)?;
                } else {
                    tracing::warn!(subscription_id = %subscription_id, "Deleted subscription for unknown org");
                }
            } else {
                tracing::info!(subscription_id = %subscription_id, "Subscription canceled");
            }
        }
        BillingEvent::Ignored(event_type) => {
            tracing::debug!(event_type = %event_type, "Ignoring Stripe event");
        }
    }
    Ok(())
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::InvalidRequest("Missing Stripe-Signature header".to_string()))?;

    verify_signature(&body, signature, &state.config.stripe.webhook_secret, Utc::now().timestamp())?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidRequest(format!("Invalid event body: {}", e)))?;
    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Received Stripe event");

    apply_billing_event(&state.store, BillingEvent::from_event(&event)?)?;

    Ok(Json(json!({ "received": true })))
}

async fn status(
    State(state): State<Arc<AppState>>,
    session: SalesforceSession,
    Query(query): Query<StatusQuery>,
) -> Result<Json<BillingStatus>> {
    require_org(&state, &session, &query.org_id).await?;
    let subscription = state.store.get_subscription(&query.org_id)?;
    let has_report_access = state.store.has_report_access(&query.org_id)?;
    let subscribed = subscription.as_ref().map(|s| s.is_active()).unwrap_or(false);

    Ok(Json(BillingStatus {
        subscription_status: subscription.map(|s| s.status),
        paid: subscribed || has_report_access,
        has_report_access,
        org_id: query.org_id,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/billing/checkout", post(checkout))
        .route("/billing/webhook", post(webhook))
        .route("/billing/status", get(status))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::new(":memory:").unwrap()
    }

    #[test]
    fn test_payment_checkout_grants_report_access() {
        let store = store();
        apply_billing_event(
            &store,
            BillingEvent::CheckoutCompleted {
                session_id: "cs_1".to_string(),
                org_id: Some("00D1".to_string()),
                mode: CheckoutMode::Payment,
                customer_id: None,
                subscription_id: None,
            },
        )
        .unwrap();
        assert!(store.has_report_access("00D1").unwrap());
        assert!(store.get_subscription("00D1").unwrap().is_none());
    }

    #[test]
    fn test_subscription_lifecycle() {
        let store = store();
        apply_billing_event(
            &store,
            BillingEvent::CheckoutCompleted {
                session_id: "cs_2".to_string(),
                org_id: Some("00D1".to_string()),
                mode: CheckoutMode::Subscription,
                customer_id: Some("cus_1".to_string()),
                subscription_id: Some("sub_1".to_string()),
            },
        )
        .unwrap();
        assert!(store.has_paid_access("00D1").unwrap());

        // No metadata: the org is found through the stored subscription id.
        apply_billing_event(
            &store,
            BillingEvent::SubscriptionChanged {
                subscription_id: "sub_1".to_string(),
                org_id: None,
                customer_id: None,
                status: "past_due".to_string(),
                price_id: Some("price_1".to_string()),
                current_period_end: Some(1_700_000_000),
            },
        )
        .unwrap();
        let sub = store.get_subscription("00D1").unwrap().unwrap();
        assert_eq!(sub.status, "past_due");
        assert_eq!(sub.price_id.as_deref(), Some("price_1"));
        assert_eq!(sub.current_period_end.map(|d| d.timestamp()), Some(1_700_000_000));
        assert!(!store.has_paid_access("00D1").unwrap());

        apply_billing_event(
            &store,
            BillingEvent::SubscriptionDeleted {
                subscription_id: "sub_1".to_string(),
                org_id: None,
            },
        )
        .unwrap();
        assert_eq!(store.get_subscription("00D1").unwrap().unwrap().status, "canceled");
    }

    #[test]
    fn test_events_without_org_are_acknowledged() {
        let store = store();
        apply_billing_event(
            &store,
            BillingEvent::SubscriptionChanged {
                subscription_id: "sub_unknown".to_string(),
                org_id: None,
                customer_id: None,
                status: "active".to_string(),
                price_id: None,
                current_period_end: None,
            },
        )
        .unwrap();
        assert!(store.find_org_by_subscription("sub_unknown").unwrap().is_none());
    }
}
