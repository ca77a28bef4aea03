use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{send_for_text, ProviderError, TextProvider};
use crate::config::ProviderConfig;

/// Hugging Face text-generation inference. The token is optional on the free tier.
pub struct HuggingFaceProvider {
    client: Client,
    config: ProviderConfig,
}

impl HuggingFaceProvider {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl TextProvider for HuggingFaceProvider {
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
        info!(provider = %self.config.name, model = %self.config.model, "🔗 text-generation request");

        let payload = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": 1000,
                "temperature": 0.7,
                "top_p": 0.95,
                "return_full_text": false
            }
        });

        let mut request = self.client.post(&self.config.endpoint).json(&payload);
        if let Some(token) = &self.config.api_key {
            request = request.bearer_auth(token);
        }

        let body = send_for_text(self.name(), request).await?;
        parse_generated_text(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Generated {
    #[serde(default)]
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerationOutput {
    Batch(Vec<Generated>),
    Single(Generated),
}

/// Accepts both `[{"generated_text": ..}]` and `{"generated_text": ..}`.
pub(crate) fn parse_generated_text(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerationOutput = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

    let text = match parsed {
        GenerationOutput::Batch(items) => items.into_iter().next().map(|g| g.generated_text).unwrap_or_default(),
        GenerationOutput::Single(g) => g.generated_text,
    };

    if text.trim().is_empty() {
        return Err(ProviderError::Empty);
    }
    Ok(text)
}
