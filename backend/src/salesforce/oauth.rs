use hmac::{Hmac, Mac};
use rand::RngCore;
use reqwest::{Client, Url};
use sha2::Sha256;

use super::types::{OAuthErrorBody, TokenResponse};
use super::SalesforceError;
use crate::config::SalesforceConfig;

/// Salesforce OAuth 2.0 web-server flow.
pub struct SalesforceOAuth {
    http_client: Client,
    config: SalesforceConfig,
}

type HmacSha256 = Hmac<Sha256>;

/// How long an issued `state` stays valid for the callback.
pub const STATE_TTL_SECS: i64 = 600;

/// Random nonce for the `state` parameter.
fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl SalesforceOAuth {
    pub fn new(config: SalesforceConfig) -> Self {
        Self {
            http_client: Client::new(),
            config,
        }
    }

    fn login_url(&self) -> &str {
        self.config.login_url.trim_end_matches('/')
    }

    fn state_mac(&self, payload: &str) -> Result<HmacSha256, SalesforceError> {
        let mut mac = HmacSha256::new_from_slice(self.config.client_secret.as_bytes())
            .map_err(|e| SalesforceError::OAuth(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    /// A `state` value of the form `{issued}.{nonce}.{mac}`, verifiable on
    /// callback without keeping anything server-side.
    pub fn issue_state(&self, now: i64) -> Result<String, SalesforceError> {
        let payload = format!("{}.{}", now, generate_state());
        let signature = hex::encode(self.state_mac(&payload)?.finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    /// Check that `state` was issued by [`issue_state`](Self::issue_state)
    /// within the last [`STATE_TTL_SECS`].
    pub fn verify_state(&self, state: &str, now: i64) -> Result<(), SalesforceError> {
        let invalid = || SalesforceError::OAuth("invalid or expired state".to_string());

        let (payload, signature) = state.rsplit_once('.').ok_or_else(invalid)?;
        let signature = hex::decode(signature).map_err(|_| invalid())?;
        self.state_mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| invalid())?;

        let issued: i64 = payload
            .split_once('.')
            .and_then(|(issued, _)| issued.parse().ok())
            .ok_or_else(invalid)?;
        if now - issued > STATE_TTL_SECS || issued - now > 60 {
            return Err(invalid());
        }
        Ok(())
    }

    pub fn authorize_url(&self, state: &str) -> Result<String, SalesforceError> {
        let url = Url::parse_with_params(
            &format!("{}/services/oauth2/authorize", self.login_url()),
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| SalesforceError::OAuth(format!("Invalid login URL: {}", e)))?;

        Ok(url.to_string())
    }

    /// Exchange an authorization code for an access token and instance URL.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SalesforceError> {
        let url = format!("{}/services/oauth2/token", self.login_url());
        tracing::debug!("Exchanging authorization code at {}", url);

        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OAuthErrorBody>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {}", e.error, desc),
                    None => e.error,
                })
                .unwrap_or_else(|_| format!("{}: {}", status, body));
            return Err(SalesforceError::OAuth(message));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SalesforceError::InvalidResponse(e.to_string()))?;

        tracing::info!(instance_url = %token.instance_url, "Salesforce authorization completed");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SalesforceConfig {
        SalesforceConfig {
            client_id: "client id".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "https://app.example.com/oauth/callback".to_string(),
            login_url: "https://login.salesforce.com/".to_string(),
            api_version: "59.0".to_string(),
            sandbox_timeout_secs: 10,
        }
    }

    #[test]
    fn test_authorize_url_is_encoded() {
        let oauth = SalesforceOAuth::new(config());
        let url = oauth.authorize_url("abc123").unwrap();
        assert!(url.starts_with("https://login.salesforce.com/services/oauth2/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client+id"));
        assert!(url.contains("redirect_uri=https%3A%2F%2Fapp.example.com%2Foauth%2Fcallback"));
        assert!(url.contains("state=abc123"));
    }

    #[test]
    fn test_issued_state_verifies() {
        let oauth = SalesforceOAuth::new(config());
        let now = 1_700_000_000;
        let state = oauth.issue_state(now).unwrap();

        assert!(oauth.verify_state(&state, now + 30).is_ok());
        assert!(oauth.verify_state(&state, now + STATE_TTL_SECS + 1).is_err());
    }

    #[test]
    fn test_forged_state_is_rejected() {
        let oauth = SalesforceOAuth::new(config());
        let now = 1_700_000_000;
        let state = oauth.issue_state(now).unwrap();

        let (payload, _) = state.rsplit_once('.').unwrap();
        let forged = format!("{}.{}", payload, "00".repeat(32));
        assert!(oauth.verify_state(&forged, now).is_err());
        assert!(oauth.verify_state("abc123", now).is_err());

        let mut other = config();
        other.client_secret = "another secret".to_string();
        assert!(SalesforceOAuth::new(other).verify_state(&state, now).is_err());
    }

    #[test]
    fn test_generate_state_is_random_hex() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
