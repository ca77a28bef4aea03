use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{send_for_text, ProviderError, TextProvider};
use crate::config::ProviderConfig;

/// Google Generative Language `generateContent`, key passed as a query parameter.
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn new(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
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

        info!("🔗 Making request to: {}?key=***", self.config.endpoint);

        let payload = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": 0.7,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 1000
            }
        });

        let request = self.client
            .post(&self.config.endpoint)
            .query(&[("key", api_key)])
            .json(&payload);

        let body = send_for_text(self.name(), request).await?;
        parse_gemini_text(&body)
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(serde_json::Value),
}

/// First non-blank text part of the first candidate that has one.
pub(crate) fn parse_gemini_text(body: &str) -> Result<String, ProviderError> {
    let parsed: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Decode(format!("Failed to parse response: {}", e)))?;

    parsed
        .candidates
        .iter()
        .flat_map(|c| c.content.parts.iter())
        .find_map(|part| match part {
            Part::Text { text } if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        })
        .ok_or(ProviderError::Empty)
}
