use reqwest::Client;
use saver_common::ConnectedAppUsage;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;

/// Client for OpenAI chat completions, used to group connected apps.
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

/// OpenAI chat request format.
#[derive(Debug, Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

/// A group of overlapping apps and what to do about them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppCategory {
    pub category: String,
    pub apps: Vec<String>,
    pub recommendation: String,
    #[serde(default)]
    pub estimated_monthly_savings: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationAnalysis {
    pub categories: Vec<AppCategory>,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAiError {
    #[error("OpenAI API key is not configured")]
    NotConfigured,
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("OpenAI error: {0}")]
    Api(String),
}

const SYSTEM_PROMPT: &str = "You are a Salesforce cost optimisation consultant. \
     You identify connected apps with overlapping functionality that could be consolidated. \
     Respond only with JSON.";

/// Prompt listing every connected app with its usage.
pub fn build_consolidation_prompt(apps: &[ConnectedAppUsage]) -> String {
    let mut prompt = String::from(
        "These third-party apps are connected to our Salesforce org through OAuth:\n\n",
    );
    for app in apps {
        let last_used = app
            .last_used
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "never".to_string());
        prompt.push_str(&format!(
            "- {} (users: {}, total uses: {}, last used: {})\n",
            app.app_name, app.user_count, app.total_use_count, last_used
        ));
    }
    prompt.push_str(
        "\nGroup apps that serve the same purpose and suggest which to consolidate. \
         Answer with a JSON object of the form \
         {\"categories\": [{\"category\": string, \"apps\": [string], \
         \"recommendation\": string, \"estimated_monthly_savings\": number | null}]}. \
         Only include categories with at least two apps.",
    );
    prompt
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            http_client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    /// Ask the model to categorise consolidation opportunities.
    pub async fn analyze_apps(
        &self,
        apps: &[ConnectedAppUsage],
    ) -> Result<ConsolidationAnalysis, OpenAiError> {
        if self.api_key.is_empty() {
            return Err(OpenAiError::NotConfigured);
        }
        if apps.is_empty() {
            return Ok(ConsolidationAnalysis { categories: Vec::new() });
        }

        let request = OpenAiChatRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: build_consolidation_prompt(apps),
                },
            ],
            temperature: 0.2,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        tracing::debug!("Sending {} apps to OpenAI for consolidation analysis", apps.len());

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| OpenAiError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OpenAiError::Api(format!("{}: {}", status, body)));
        }

        let chat: OpenAiChatResponse = response
            .json()
            .await
            .map_err(|e| OpenAiError::InvalidResponse(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OpenAiError::InvalidResponse("no choices returned".to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| OpenAiError::InvalidResponse(format!("model returned invalid JSON: {}", e)))
    }
}
