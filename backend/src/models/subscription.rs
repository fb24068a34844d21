use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stripe subscription state for an org (the `organization_subscriptions` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSubscription {
    pub org_id: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    /// Stripe status string: active, trialing, past_due, canceled, ...
    pub status: String,
    pub price_id: Option<String>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizationSubscription {
    pub fn new(org_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            stripe_customer_id: None,
            stripe_subscription_id: None,
            status: status.into(),
            price_id: None,
            current_period_end: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        crate::billing::is_active_status(&self.status)
    }
}

/// One-time report purchase (the `report_access` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAccess {
    pub id: String,
    pub org_id: String,
    pub stripe_session_id: String,
    pub granted_at: DateTime<Utc>,
}
