//! Stripe billing: checkout sessions and webhook events.

mod client;
mod webhook;

pub use client::{CheckoutMode, CheckoutSession, Price, StripeClient};
pub use webhook::{verify_signature, BillingEvent, StripeEvent, SIGNATURE_TOLERANCE_SECS};

/// Subscription states that unlock the full report.
pub fn is_active_status(status: &str) -> bool {
    matches!(status, "active" | "trialing")
}

#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Stripe error: {0}")]
    Api(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}
