//! Fixtures shared by unit and integration tests.

use std::sync::Arc;

use hmac::{Hmac, Mac};
use saver_common::SavingsAssumptions;
use serde_json::{json, Value};
use sha2::Sha256;

use crate::config::{
    Config, ConsultationConfig, CorsConfig, DatabaseConfig, LoggingConfig, OpenAiConfig,
    PricingConfig, SalesforceConfig, ServerConfig, StripeConfig,
};
use crate::store::Store;
use crate::AppState;

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test";

/// Config whose external services all point at `base_url`, typically a
/// wiremock server.
pub fn test_config(base_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
        salesforce: SalesforceConfig {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: "https://saver.test/oauth/callback".to_string(),
            login_url: base_url.to_string(),
            api_version: "59.0".to_string(),
            sandbox_timeout_secs: 1,
        },
        stripe: StripeConfig {
            secret_key: "sk_test".to_string(),
            webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
            api_base: base_url.to_string(),
            success_url: "https://saver.test/success".to_string(),
            cancel_url: "https://saver.test/cancel".to_string(),
            consultation_price_id: None,
        },
        openai: OpenAiConfig {
            api_key: "sk-openai-test".to_string(),
            base_url: base_url.to_string(),
            model: "gpt-4o-mini".to_string(),
        },
        database: DatabaseConfig {
            url: ":memory:".to_string(),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig {
            origins: "*".to_string(),
        },
        consultation: ConsultationConfig {
            calendly_url: Some("https://calendly.com/saver/consultation".to_string()),
        },
        pricing: PricingConfig {
            default_license_price: 150.0,
        },
        assumptions: SavingsAssumptions::default(),
    }
}

/// State backed by an in-memory store.
pub fn create_test_state(config: Config) -> Arc<AppState> {
    let store = Arc::new(Store::new(":memory:").expect("in-memory store"));
    Arc::new(AppState::new(config, store))
}

/// A `Stripe-Signature` header for `payload`.
pub fn sign_webhook(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key");
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

/// A single, complete SOQL result page.
pub fn query_page(records: Value) -> Value {
    let total = records.as_array().map(|r| r.len()).unwrap_or(0);
    json!({
        "totalSize": total,
        "done": true,
        "records": records,
    })
}
