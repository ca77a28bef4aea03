use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{send_for_text, ProviderError, TextProvider};
use crate::config::ProviderConfig;

/// OpenAI-compatible chat completions endpoint (Groq, OpenRouter, Together).
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiProvider {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    fn is_available(&self) -> bool {
        self.config.is_available()
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let api_key = self.config.api_key.as_deref().ok_or(ProviderError::MissingCredential)?;

        info!(provider = %self.config.name, model = %self.config.model, "🔗 chat completion request");

        let payload = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": "You are an expert e-commerce copywriter. You answer with JSON only."},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.7,
            "top_p": 0.95,
            "max_tokens": 1000
        });

        let request = self.client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&payload);

        let body = send_for_text(self.name(), request).await?;
        parse_chat_completion(&body)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice { message: Message }

#[derive(Debug, Deserialize)]
struct Message { #[serde(default)] content: Option<String> }

pub(crate) fn parse_chat_completion(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .filter_map(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .find(|text| !text.is_empty())
        .ok_or(ProviderError::Empty)
}
