//! Hosted text-generation backends that make up the fallback chain.

mod gemini;
mod huggingface;
mod openai;

pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceProvider;
pub use openai::OpenAiProvider;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::{ProviderConfig, ProviderKind};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("credential not configured")] MissingCredential,
    #[error("HTTP error: {0}")] Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")] Status { status: u16, body: String },
    #[error("unexpected response shape: {0}")] Decode(String),
    #[error("no generated text in response")] Empty,
}

/// One entry of the fallback chain: takes the rendered prompt, returns raw model text.
#[async_trait]
pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Budget for a single call; the resolver abandons the call once it expires.
    fn timeout(&self) -> Duration;

    /// False when a required credential is missing. Unavailable providers are never invoked.
    fn is_available(&self) -> bool;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Builds the chain in configured order, sharing one HTTP client.
pub fn build_chain(configs: &[ProviderConfig], client: &Client) -> Vec<Arc<dyn TextProvider>> {
    configs
        .iter()
        .map(|cfg| -> Arc<dyn TextProvider> {
            match cfg.kind {
                ProviderKind::Gemini => Arc::new(GeminiProvider::new(client.clone(), cfg.clone())),
                ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(client.clone(), cfg.clone())),
                ProviderKind::HuggingFace => Arc::new(HuggingFaceProvider::new(client.clone(), cfg.clone())),
            }
        })
        .collect()
}

/// Sends a prepared request and returns the body of a 2xx response.
pub(crate) async fn send_for_text(name: &str, request: reqwest::RequestBuilder) -> Result<String, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        tracing::warn!(provider = name, %status, body = %preview(&body, 300), "provider call failed");
        return Err(ProviderError::Status { status: status.as_u16(), body });
    }
    tracing::debug!(provider = name, body = %preview(&body, 500), "📥 raw provider response");
    Ok(body)
}

/// Char-boundary safe prefix for log lines.
pub(crate) fn preview(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...[{} chars total]", &s[..idx], s.chars().count()),
        None => s.to_string(),
    }
}
