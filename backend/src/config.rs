//! Configuration for the SalesforceSaver API.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use saver_common::SavingsAssumptions;
use serde::Deserialize;

/// Upper bound for the day windows under `[assumptions]`.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub salesforce: SalesforceConfig,
    pub stripe: StripeConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub consultation: ConsultationConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Overrides for the savings heuristics.
    #[serde(default)]
    pub assumptions: SavingsAssumptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Connected app credentials for the OAuth web-server flow.
#[derive(Debug, Clone, Deserialize)]
pub struct SalesforceConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    /// REST API version without the `v` prefix, e.g. "59.0".
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Timeout for the tooling API SandboxInfo query.
    #[serde(default = "default_sandbox_timeout_secs")]
    pub sandbox_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Price charged for a consultation, if consultations are paid.
    #[serde(default)]
    pub consultation_price_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated origins, or "*".
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConsultationConfig {
    #[serde(default)]
    pub calendly_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    /// Monthly full-license price used until an org saves its own.
    #[serde(default = "default_license_price")]
    pub default_license_price: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_license_price: default_license_price(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_login_url() -> String {
    "https://login.salesforce.com".to_string()
}
fn default_api_version() -> String {
    "59.0".to_string()
}
fn default_sandbox_timeout_secs() -> u64 {
    10
}
fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_database_url() -> String {
    "sqlite:./data/saver.db".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}
fn default_license_price() -> f64 {
    150.0
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (SAVER__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("SAVER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the calculations cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let windows = [
            ("assumptions.inactivity_days", self.assumptions.inactivity_days),
            ("assumptions.renewal_window_days", self.assumptions.renewal_window_days),
        ];
        for (key, days) in windows {
            if !(0..=MAX_WINDOW_DAYS).contains(&days) {
                return Err(ConfigError::Message(format!(
                    "{} must be between 0 and {}, got {}",
                    key, MAX_WINDOW_DAYS, days
                )));
            }
        }
        if self.salesforce.sandbox_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "salesforce.sandbox_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the versioned REST API for an org instance.
    pub fn api_path(&self) -> String {
        format!("/services/data/v{}", self.salesforce.api_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_server_config() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 8080);
    }

    #[test]
    fn test_deserialize_minimal_config() {
        let raw = ConfigLoader::builder()
            .add_source(config::File::from_str(
                r#"
                [salesforce]
                client_id = "cid"
                client_secret = "secret"
                redirect_uri = "https://app.example.com/oauth/callback"

                [stripe]
                secret_key = "sk_test"
                webhook_secret = "whsec_test"
                success_url = "https://app.example.com/success"
                cancel_url = "https://app.example.com/cancel"

                [assumptions]
                full_sandbox_monthly = 4000.0
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: Config = raw.try_deserialize().unwrap();
        assert_eq!(config.salesforce.login_url, "https://login.salesforce.com");
        assert_eq!(config.api_path(), "/services/data/v59.0");
        assert_eq!(config.stripe.api_base, "https://api.stripe.com");
        assert_eq!(config.pricing.default_license_price, 150.0);
        assert_eq!(config.assumptions.full_sandbox_monthly, 4000.0);
        assert_eq!(config.assumptions.inactivity_days, 30);
        assert!(config.consultation.calendly_url.is_none());
        assert_eq!(config.salesforce.sandbox_timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_inactivity_window_is_rejected() {
        let mut config = crate::test_util::test_config("http://127.0.0.1:9");
        config.assumptions.inactivity_days = i64::MAX;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("assumptions.inactivity_days"));

        config.assumptions.inactivity_days = -1;
        assert!(config.validate().is_err());

        config.assumptions.inactivity_days = 60;
        assert!(config.validate().is_ok());
    }
}
