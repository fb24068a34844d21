//! Stripe webhook verification and event decoding.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;

use super::{CheckoutMode, StripeError};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a `Stripe-Signature` header against the raw request body.
///
/// The header carries `t=<unix seconds>` and one or more `v1=<hex hmac>`
/// entries; any matching `v1` is accepted.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(StripeError::InvalidSignature("missing v1 signature".to_string()));
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(StripeError::InvalidSignature("timestamp outside tolerance".to_string()));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    if signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok())
    {
        Ok(())
    } else {
        Err(StripeError::InvalidSignature("no matching signature".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

/// The webhook events the service reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    CheckoutCompleted {
        session_id: String,
        org_id: Option<String>,
        mode: CheckoutMode,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    },
    SubscriptionChanged {
        subscription_id: String,
        org_id: Option<String>,
        customer_id: Option<String>,
        status: String,
        price_id: Option<String>,
        current_period_end: Option<i64>,
    },
    SubscriptionDeleted {
        subscription_id: String,
        org_id: Option<String>,
    },
    Ignored(String),
}

fn str_field(object: &Value, pointer: &str) -> Option<String> {
    object.pointer(pointer).and_then(Value::as_str).map(String::from)
}

fn required(object: &Value, pointer: &str) -> Result<String, StripeError> {
    str_field(object, pointer)
        .ok_or_else(|| StripeError::InvalidPayload(format!("missing field {}", pointer)))
}

impl BillingEvent {
    pub fn from_event(event: &StripeEvent) -> Result<Self, StripeError> {
        let object = &event.data.object;

        match event.event_type.as_str() {
            "checkout.session.completed" => {
                let mode = match object.get("mode").and_then(Value::as_str) {
                    Some("subscription") => CheckoutMode::Subscription,
                    Some("payment") => CheckoutMode::Payment,
                    other => {
                        return Err(StripeError::InvalidPayload(format!(
                            "unsupported checkout mode: {:?}",
                            other
                        )))
                    }
                };
                Ok(BillingEvent::CheckoutCompleted {
                    session_id: required(object, "/id")?,
                    org_id: str_field(object, "/metadata/org_id")
                        .or_else(|| str_field(object, "/client_reference_id")),
                    mode,
                    customer_id: str_field(object, "/customer"),
                    subscription_id: str_field(object, "/subscription"),
                })
            }
            "customer.subscription.created" | "customer.subscription.updated" => {
                Ok(BillingEvent::SubscriptionChanged {
                    subscription_id: required(object, "/id")?,
                    org_id: str_field(object, "/metadata/org_id"),
                    customer_id: str_field(object, "/customer"),
                    status: required(object, "/status")?,
                    price_id: str_field(object, "/items/data/0/price/id"),
                    current_period_end: object
                        .get("current_period_end")
                        .and_then(Value::as_i64),
                })
            }
            "customer.subscription.deleted" => Ok(BillingEvent::SubscriptionDeleted {
                subscription_id: required(object, "/id")?,
                org_id: str_field(object, "/metadata/org_id"),
            }),
            other => Ok(BillingEvent::Ignored(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = format!("t=1700000000,v1={}", sign(payload, "whsec_test", 1_700_000_000));
        assert!(verify_signature(payload, &header, "whsec_test", 1_700_000_100).is_ok());
    }

    #[test]
    fn test_any_v1_may_match() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = format!(
            "t=1700000000,v1={},v1={},v0=ignored",
            "00".repeat(32),
            sign(payload, "whsec_test", 1_700_000_000)
        );
        assert!(verify_signature(payload, &header, "whsec_test", 1_700_000_000).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = format!("t=1700000000,v1={}", sign(payload, "other", 1_700_000_000));
        assert!(matches!(
            verify_signature(payload, &header, "whsec_test", 1_700_000_000),
            Err(StripeError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = format!("t=1700000000,v1={}", sign(payload, "whsec_test", 1_700_000_000));
        assert!(verify_signature(payload, &header, "whsec_test", 1_700_000_000 + 301).is_err());
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature(b"{}", "garbage", "whsec_test", 0).is_err());
        assert!(verify_signature(b"{}", "t=1", "whsec_test", 1).is_err());
    }

    fn event(event_type: &str, object: Value) -> StripeEvent {
        StripeEvent {
            id: "evt_1".to_string(),
            event_type: event_type.to_string(),
            data: StripeEventData { object },
        }
    }

    #[test]
    fn test_checkout_completed_uses_client_reference() {
        let e = event(
            "checkout.session.completed",
            json!({"id": "cs_1", "mode": "payment", "client_reference_id": "00D1", "customer": "cus_1", "subscription": null}),
        );
        assert_eq!(
            BillingEvent::from_event(&e).unwrap(),
            BillingEvent::CheckoutCompleted {
                session_id: "cs_1".to_string(),
                org_id: Some("00D1".to_string()),
                mode: CheckoutMode::Payment,
                customer_id: Some("cus_1".to_string()),
                subscription_id: None,
            }
        );
    }

    #[test]
    fn test_subscription_updated() {
        let e = event(
            "customer.subscription.updated",
            json!({
                "id": "sub_1",
                "status": "past_due",
                "customer": "cus_1",
                "metadata": {"org_id": "00D1"},
                "current_period_end": 1_700_000_000,
                "items": {"data": [{"price": {"id": "price_pro"}}]}
            }),
        );
        match BillingEvent::from_event(&e).unwrap() {
            BillingEvent::SubscriptionChanged { status, price_id, org_id, .. } => {
                assert_eq!(status, "past_due");
                assert_eq!(price_id.as_deref(), Some("price_pro"));
                assert_eq!(org_id.as_deref(), Some("00D1"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let e = event("invoice.paid", json!({"id": "in_1"}));
        assert_eq!(
            BillingEvent::from_event(&e).unwrap(),
            BillingEvent::Ignored("invoice.paid".to_string())
        );
    }
}
