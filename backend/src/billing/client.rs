use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::StripeError;
use crate::config::StripeConfig;

/// Checkout mode, inferred from the price being sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutMode {
    Subscription,
    Payment,
}

impl CheckoutMode {
    /// Recurring prices need a subscription; anything else is a one-time payment.
    pub fn for_price(price: &Price) -> Self {
        if price.price_type == "recurring" {
            CheckoutMode::Subscription
        } else {
            CheckoutMode::Payment
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Subscription => "subscription",
            CheckoutMode::Payment => "payment",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
    #[serde(rename = "type")]
    pub price_type: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    pub mode: CheckoutMode,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

/// Client for the Stripe REST API.
pub struct StripeClient {
    http_client: Client,
    secret_key: String,
    api_base: String,
    success_url: String,
    cancel_url: String,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            http_client: Client::new(),
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorBody>(&body)
                .ok()
                .and_then(|b| b.error.message.or(b.error.error_type))
                .unwrap_or(body);
            return Err(StripeError::Api(format!("{}: {}", status, message)));
        }

        response
            .json()
            .await
            .map_err(|e| StripeError::InvalidResponse(e.to_string()))
    }

    pub async fn get_price(&self, price_id: &str) -> Result<Price, StripeError> {
        let url = format!("{}/v1/prices/{}", self.api_base, price_id);
        tracing::debug!("Fetching Stripe price {}", price_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        Self::parse(response).await
    }

    /// Create a hosted checkout for `price_id`, tagged with the org id so the
    /// webhook can attribute the payment.
    pub async fn create_checkout_session(
        &self,
        org_id: &str,
        price_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let price = self.get_price(price_id).await?;
        let mode = CheckoutMode::for_price(&price);

        let mut form: Vec<(&str, &str)> = vec![
            ("mode", mode.as_str()),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", self.success_url.as_str()),
            ("cancel_url", self.cancel_url.as_str()),
            ("client_reference_id", org_id),
            ("metadata[org_id]", org_id),
        ];
        if mode == CheckoutMode::Subscription {
            form.push(("subscription_data[metadata][org_id]", org_id));
        }

        let url = format!("{}/v1/checkout/sessions", self.api_base);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| StripeError::RequestFailed(e.to_string()))?;

        let session: CheckoutSession = Self::parse(response).await?;
        tracing::info!(
            org_id = %org_id,
            session_id = %session.id,
            mode = mode.as_str(),
            "Created Stripe checkout session"
        );
        Ok(session)
    }
}
