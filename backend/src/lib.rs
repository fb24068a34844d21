pub mod analysis;
pub mod billing;
pub mod config;
pub mod error;
pub mod export;
pub mod llm;
pub mod logging;
pub mod models;
pub mod routes;
pub mod salesforce;
pub mod session;
pub mod store;
pub mod test_util;

pub use config::Config;
pub use error::Error;
pub use session::SalesforceSession;

use std::sync::Arc;
use std::time::Duration;

use billing::StripeClient;
use llm::OpenAiClient;
use salesforce::{SalesforceClient, SalesforceOAuth};
use store::Store;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Org data access; each call carries the caller's session.
    pub salesforce: SalesforceClient,
    pub oauth: SalesforceOAuth,
    pub stripe: StripeClient,
    pub openai: OpenAiClient,
    pub store: Arc<Store>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<Store>) -> Self {
        Self {
            salesforce: SalesforceClient::new(&config.salesforce.api_version)
                .with_sandbox_timeout(Duration::from_secs(config.salesforce.sandbox_timeout_secs)),
            oauth: SalesforceOAuth::new(config.salesforce.clone()),
            stripe: StripeClient::new(&config.stripe),
            openai: OpenAiClient::new(&config.openai),
            store,
            config,
        }
    }
}
