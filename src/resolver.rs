//! Ordered provider fallback: one prompt, one attempt per provider, first valid
//! answer wins, local synthesis when everything fails.
//!
//! Attribute inference and keyword suggestion reuse the same chain; their
//! callers fall back to local tables when it returns nothing.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::keywords::{keyword_prompt, keywords_from_json};
use crate::models::{
    truncate_chars, GenerationRequest, GenerationResult, KeywordSet, Tone, MAX_BULLETS, MAX_META_CHARS,
    MAX_TITLE_CHARS,
};
use crate::providers::{preview, ProviderError, TextProvider};
use crate::synthesis::{self, DEFAULT_STYLE};
use crate::validate;

/// Style labels a model may pick when inferring attributes.
pub const STYLE_OPTIONS: &[&str] = &["Modern", "Classic", "Minimalist", "Contemporary", "Vintage", "Industrial"];

const INFERRED_MATERIALS: usize = 2;

/// Why a single provider attempt did not produce a result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptFailure {
    #[error("skipped: credential not configured")] MissingCredential,
    #[error("timed out after {0:?}")] Timeout(Duration),
    #[error("transport error: {0}")] Transport(String),
    #[error("HTTP status {0}")] Status(u16),
    #[error("empty response")] EmptyResponse,
    #[error("no parseable JSON object")] Malformed,
    #[error("undeclared color in output")] Rejected,
    #[error("required fields missing")] Incomplete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub provider: String,
    pub failure: Option<AttemptFailure>,
}

/// Materials and style a model suggested for a category.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredAttributes {
    pub materials: Vec<String>,
    pub style: Option<String>,
}

pub struct Resolver {
    providers: Vec<Arc<dyn TextProvider>>,
}

impl Resolver {
    pub fn new(providers: Vec<Arc<dyn TextProvider>>) -> Self {
        Self { providers }
    }

    pub fn providers(&self) -> &[Arc<dyn TextProvider>] {
        &self.providers
    }

    /// Always returns a result; failures only show up in the provider tag.
    pub async fn resolve(&self, request: &GenerationRequest) -> GenerationResult {
        let (result, attempts) = self.resolve_traced(request).await;
        let failed: Vec<String> = attempts
            .iter()
            .filter_map(|a| a.failure.as_ref().map(|f| format!("{}: {}", a.provider, f)))
            .collect();
        if !failed.is_empty() {
            info!(provider = %result.provider, skipped = %failed.join("; "), "resolved after fallbacks");
        }
        result
    }

    /// Like [`Resolver::resolve`], also returning every attempt in order.
    pub async fn resolve_traced(&self, request: &GenerationRequest) -> (GenerationResult, Vec<Attempt>) {
        let prompt = render_prompt(request);
        let accept = |parsed: &Value, provider: &str| {
            if !validate::accepts(parsed, request) {
                return Err(AttemptFailure::Rejected);
            }
            into_result(parsed, request, provider).ok_or(AttemptFailure::Incomplete)
        };

        match self.first_accepted(&prompt, accept).await {
            (Some(result), attempts) => {
                info!(provider = %result.provider, tone = ?request.tone, "✅ listing generated");
                (result, attempts)
            }
            (None, attempts) => {
                info!(attempted = attempts.len(), tone = ?request.tone, "🔄 all providers failed, using local synthesis");
                (synthesis::synthesize(request), attempts)
            }
        }
    }

    /// Likely materials and a style for `category`, or `None` when no provider
    /// gives a usable answer. Materials naming a color are refused.
    pub async fn infer_attributes(&self, category: &str) -> Option<InferredAttributes> {
        let prompt = attribute_prompt(category);
        let (inferred, _) = self.first_accepted(&prompt, |parsed: &Value, _: &str| parse_attributes(parsed)).await;
        match &inferred {
            Some(attrs) => info!(%category, materials = ?attrs.materials, style = ?attrs.style, "🧪 attributes inferred"),
            None => info!(%category, "🔄 attribute inference unavailable, using category table"),
        }
        inferred
    }

    /// Search keywords drafted by a model from the product and its description.
    pub async fn suggest_keywords(&self, request: &GenerationRequest, description: &str) -> Option<KeywordSet> {
        let prompt = keyword_prompt(request, description);
        let accept = |parsed: &Value, _: &str| {
            let Some(keywords) = keywords_from_json(parsed) else {
                return Err(AttemptFailure::Incomplete);
            };
            let all = keywords.primary.iter().chain(&keywords.long_tail).cloned().collect::<Vec<_>>().join(" ");
            if !validate::foreign_colors(&all, request).is_empty() {
                return Err(AttemptFailure::Rejected);
            }
            Ok(keywords)
        };
        let (keywords, _) = self.first_accepted(&prompt, accept).await;
        if keywords.is_none() {
            info!(product = %request.product_name, "🔄 keyword suggestion unavailable, using templates");
        }
        keywords
    }

    /// Tries each provider in order until `accept` takes one parsed answer.
    async fn first_accepted<T, F>(&self, prompt: &str, accept: F) -> (Option<T>, Vec<Attempt>)
    where
        F: Fn(&Value, &str) -> Result<T, AttemptFailure>,
    {
        let mut attempts = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let name = provider.name().to_string();
            match attempt(provider.as_ref(), prompt, &accept).await {
                Ok(value) => {
                    attempts.push(Attempt { provider: name, failure: None });
                    return (Some(value), attempts);
                }
                Err(failure) => {
                    warn!(provider = %name, %failure, "provider attempt failed, trying next");
                    attempts.push(Attempt { provider: name, failure: Some(failure) });
                }
            }
        }
        (None, attempts)
    }
}

async fn attempt<T, F>(provider: &dyn TextProvider, prompt: &str, accept: &F) -> Result<T, AttemptFailure>
where
    F: Fn(&Value, &str) -> Result<T, AttemptFailure>,
{
    if !provider.is_available() {
        return Err(AttemptFailure::MissingCredential);
    }

    let budget = provider.timeout();
    let raw = match tokio::time::timeout(budget, provider.generate(prompt)).await {
        Err(_) => return Err(AttemptFailure::Timeout(budget)),
        Ok(Err(e)) => return Err(classify(e, budget)),
        Ok(Ok(raw)) => raw,
    };

    let parsed = extract_json(&raw).ok_or_else(|| {
        warn!(provider = provider.name(), raw = %preview(&raw, 200), "no JSON object in response");
        AttemptFailure::Malformed
    })?;

    accept(&parsed, provider.name())
}

fn classify(err: ProviderError, budget: Duration) -> AttemptFailure {
    match err {
        ProviderError::MissingCredential => AttemptFailure::MissingCredential,
        ProviderError::Http(e) if e.is_timeout() => AttemptFailure::Timeout(budget),
        ProviderError::Http(e) => AttemptFailure::Transport(e.to_string()),
        ProviderError::Status { status, .. } => AttemptFailure::Status(status),
        ProviderError::Decode(_) => AttemptFailure::Malformed,
        ProviderError::Empty => AttemptFailure::EmptyResponse,
    }
}

/// Strips code fences and parses the span from the first `{` to the last `}`.
pub fn extract_json(raw: &str) -> Option<Value> {
    let cleaned = raw.replace("```json", "").replace("```JSON", "").replace("```", "");
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&cleaned[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

fn string_field(parsed: &Value, key: &str) -> String {
    parsed.get(key).and_then(Value::as_str).map(str::trim).unwrap_or_default().to_string()
}

fn bullet_field(parsed: &Value) -> Vec<String> {
    let items: Vec<String> = match parsed.get("bullet_points") {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
        Some(Value::String(text)) => text.lines().map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .iter()
        .map(|b| b.trim().trim_start_matches(&['-', '*', '•'][..]).trim().to_string())
        .filter(|b| !b.is_empty())
        .take(MAX_BULLETS)
        .collect()
}

fn into_result(parsed: &Value, request: &GenerationRequest, provider: &str) -> Option<GenerationResult> {
    let title = string_field(parsed, "title");
    let description = string_field(parsed, "description");
    if title.is_empty() && description.is_empty() {
        return None;
    }

    let title = if title.is_empty() {
        let style = if request.style.trim().is_empty() { DEFAULT_STYLE } else { request.style.trim() };
        format!("{} - {}", request.product_name.trim(), style)
    } else {
        title
    };

    let mut meta = string_field(parsed, "meta_description");
    if meta.is_empty() {
        meta = description.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    Some(GenerationResult {
        title: truncate_chars(&title, MAX_TITLE_CHARS),
        description,
        bullet_points: bullet_field(parsed),
        meta_description: truncate_chars(&meta, MAX_META_CHARS),
        tone: request.tone,
        provider: provider.to_string(),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub fn attribute_prompt(category: &str) -> String {
    format!(
        "Based on product category \"{}\", suggest {} likely materials.\n\
         Respond ONLY with JSON: {{\"materials\": [\"material1\", \"material2\"], \"style\": \"style_name\"}}\n\
         Style options: {}",
        category.trim(),
        INFERRED_MATERIALS,
        STYLE_OPTIONS.join(", ")
    )
}

fn parse_attributes(parsed: &Value) -> Result<InferredAttributes, AttemptFailure> {
    let materials: Vec<String> = match parsed.get("materials") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .take(INFERRED_MATERIALS)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    if materials.is_empty() {
        return Err(AttemptFailure::Incomplete);
    }
    if materials.iter().any(|m| !validate::color_words(m).is_empty()) {
        return Err(AttemptFailure::Rejected);
    }
    // Labels outside the option list are dropped, not guessed.
    let style = parsed
        .get("style")
        .and_then(Value::as_str)
        .and_then(|s| STYLE_OPTIONS.iter().find(|o| o.eq_ignore_ascii_case(s.trim())))
        .map(|s| s.to_string());
    Ok(InferredAttributes { materials, style })
}

/// The single prompt shared by every provider for one request.
pub fn render_prompt(request: &GenerationRequest) -> String {
    let (min_words, max_words) = request.tone.word_budget();
    let voice = match request.tone {
        Tone::Storytelling => "a compelling storytelling description that creates an emotional connection, using sensory language",
        Tone::FeatureBenefit => "clear feature-benefit copy that explains how each feature helps the customer",
        Tone::Minimalist => "a clean minimalist description with short, direct sentences and no fluff",
    };

    let mut lines = vec![
        "You are an expert e-commerce copywriter.".to_string(),
        String::new(),
        format!("Product: {}", request.product_name.trim()),
    ];
    if let Some(category) = non_blank(Some(&request.category)) {
        lines.push(format!("Category: {}", category));
    }
    if let Some(subtype) = non_blank(request.subtype.as_deref()) {
        lines.push(format!("Type: {}", subtype));
    }
    if let Some(style) = non_blank(Some(&request.style)) {
        lines.push(format!("Style: {}", style));
    }
    if !request.materials.is_empty() {
        lines.push(format!("Materials: {}", request.materials.join(", ")));
    }
    lines.push(format!("Features: {}", non_blank(request.features.as_deref()).unwrap_or("Premium quality product")));
    if let Some(audience) = non_blank(request.target_audience.as_deref()) {
        lines.push(format!("Target audience: {}", audience));
    }
    if let Some(price) = non_blank(request.price_hint.as_deref()) {
        lines.push(format!("Price point: {}", price));
    }

    lines.push(String::new());
    lines.push("Rules:".to_string());
    match request.declared_color() {
        Some(color) => lines.push(format!(
            "- The product color is {}. Use ONLY this color; never mention any other color.",
            color
        )),
        None => lines.push("- The color is unknown. Do not mention any color at all.".to_string()),
    }
    lines.push("- Mention only the materials and style listed above; do not invent others.".to_string());
    lines.push(format!("- Write {}. {}-{} words.", voice, min_words, max_words));
    lines.push(String::new());
    lines.push("Respond ONLY with valid JSON (no markdown, no extra text):".to_string());
    lines.push(
        r#"{"title": "product title", "description": "product description", "bullet_points": ["point 1", "point 2", "point 3", "point 4", "point 5"], "meta_description": "SEO description under 160 characters"}"#
            .to_string(),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Tone, LOCAL_PROVIDER};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Clone)]
    enum Reply {
        Text(String),
        Status(u16),
        Hang,
    }

    struct Stub {
        name: String,
        available: bool,
        reply: Reply,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TextProvider for Stub {
        fn name(&self) -> &str {
            &self.name
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(10)
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.lock().push(self.name.clone());
            match &self.reply {
                Reply::Text(text) => Ok(text.clone()),
                Reply::Status(status) => Err(ProviderError::Status { status: *status, body: "busy".into() }),
                Reply::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }
    }

    fn chain(entries: Vec<(&str, bool, Reply)>) -> (Resolver, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let providers = entries
            .into_iter()
            .map(|(name, available, reply)| -> Arc<dyn TextProvider> {
                Arc::new(Stub { name: name.into(), available, reply, calls: calls.clone() })
            })
            .collect();
        (Resolver::new(providers), calls)
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            product_name: "Leather Tote Bag".into(),
            category: "Fashion & Apparel".into(),
            color: Some("brown".into()),
            style: "Classic".into(),
            materials: vec!["Full-Grain Leather".into()],
            tone: Tone::Storytelling,
            ..Default::default()
        }
    }

    fn valid_json() -> String {
        json!({
            "title": "Classic Brown Leather Tote Bag",
            "description": "A brown full-grain leather tote with classic lines.",
            "bullet_points": ["Roomy", "Durable"],
            "meta_description": "Classic brown leather tote bag."
        })
        .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn short_circuits_on_third_provider() {
        let (resolver, calls) = chain(vec![
            ("first", true, Reply::Hang),
            ("second", true, Reply::Text("Sure! Here is your listing.".into())),
            ("third", true, Reply::Text(valid_json())),
            ("fourth", true, Reply::Text(valid_json())),
            ("fifth", true, Reply::Status(500)),
        ]);

        let (result, attempts) = resolver.resolve_traced(&request()).await;

        assert_eq!(*calls.lock(), vec!["first", "second", "third"]);
        assert_eq!(result.provider, "third");
        assert_eq!(result.bullet_points, vec!["Roomy", "Durable"]);
        assert_eq!(
            attempts.iter().map(|a| a.failure.clone()).collect::<Vec<_>>(),
            vec![Some(AttemptFailure::Timeout(Duration::from_secs(10))), Some(AttemptFailure::Malformed), None]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_falls_back_to_local() {
        let (resolver, calls) = chain(vec![
            ("a", true, Reply::Status(429)),
            ("b", true, Reply::Text("{not json}".into())),
            ("c", true, Reply::Hang),
            ("d", true, Reply::Text(String::new())),
        ]);
        let req = request();

        let result = resolver.resolve(&req).await;

        assert_eq!(*calls.lock(), vec!["a", "b", "c", "d"]);
        assert_eq!(result.provider, LOCAL_PROVIDER);
        assert_eq!(result, crate::synthesis::synthesize(&req));
    }

    #[tokio::test]
    async fn empty_chain_is_local() {
        let result = Resolver::new(Vec::new()).resolve(&request()).await;
        assert!(result.is_local());
        assert!(!result.title.is_empty());
    }

    #[tokio::test]
    async fn skips_providers_without_credentials() {
        let (resolver, calls) = chain(vec![
            ("keyless", false, Reply::Text(valid_json())),
            ("configured", true, Reply::Text(valid_json())),
        ]);

        let (result, attempts) = resolver.resolve_traced(&request()).await;

        assert_eq!(*calls.lock(), vec!["configured"]);
        assert_eq!(result.provider, "configured");
        assert_eq!(attempts[0].failure, Some(AttemptFailure::MissingCredential));
    }

    #[tokio::test]
    async fn color_hallucination_moves_to_next_provider() {
        let hallucinated = valid_json().replace("classic lines", "classic lines and burgundy stitching");
        let (resolver, calls) = chain(vec![
            ("hallucinates", true, Reply::Text(hallucinated)),
            ("faithful", true, Reply::Text(valid_json())),
        ]);

        let (result, attempts) = resolver.resolve_traced(&request()).await;

        assert_eq!(*calls.lock(), vec!["hallucinates", "faithful"]);
        assert_eq!(attempts[0].failure, Some(AttemptFailure::Rejected));
        assert!(!result.description.contains("burgundy"));
    }

    #[tokio::test]
    async fn truncates_without_padding() {
        let long = json!({
            "title": "T".repeat(250),
            "description": "A sturdy tote.",
            "bullet_points": ["1", "2", "3", "4", "5", "6", "7"],
            "meta_description": "m".repeat(200)
        })
        .to_string();
        let (resolver, _) = chain(vec![("p", true, Reply::Text(format!("```json\n{}\n```", long)))]);

        let result = resolver.resolve(&request()).await;

        assert_eq!(result.title.chars().count(), 200);
        assert_eq!(result.meta_description.chars().count(), 160);
        assert_eq!(result.bullet_points, vec!["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn object_without_copy_is_rejected() {
        let (resolver, _) = chain(vec![
            ("blank", true, Reply::Text(r#"{"title": "", "bullet_points": ["x"]}"#.into())),
        ]);
        let (result, attempts) = resolver.resolve_traced(&request()).await;
        assert_eq!(attempts[0].failure, Some(AttemptFailure::Incomplete));
        assert!(result.is_local());
    }

    #[tokio::test]
    async fn attribute_inference_refuses_colored_materials() {
        let (resolver, calls) = chain(vec![
            ("colored", true, Reply::Text(json!({"materials": ["Red Velvet", "Oak"], "style": "Modern"}).to_string())),
            ("plain", true, Reply::Text(format!("Sure:\n{}", json!({"materials": [" Oak ", "Steel", "Glass"], "style": "retro"})))),
        ]);

        let inferred = resolver.infer_attributes("Furniture").await.unwrap();

        assert_eq!(*calls.lock(), vec!["colored", "plain"]);
        assert_eq!(inferred, InferredAttributes { materials: vec!["Oak".into(), "Steel".into()], style: None });
    }

    #[tokio::test]
    async fn attribute_inference_gives_up_quietly() {
        let (resolver, _) = chain(vec![
            ("down", true, Reply::Status(503)),
            ("empty", true, Reply::Text(r#"{"materials": [], "style": "Classic"}"#.into())),
        ]);
        assert_eq!(resolver.infer_attributes("Electronics").await, None);
        assert!(attribute_prompt("Electronics").contains("Style options: Modern, Classic, Minimalist"));
    }

    #[tokio::test]
    async fn keyword_suggestion_skips_answers_with_other_colors() {
        let (resolver, calls) = chain(vec![
            ("colored", true, Reply::Text(json!({"primary": ["green leather tote"], "long_tail": []}).to_string())),
            ("faithful", true, Reply::Text(json!({"primary": ["Brown Leather Tote"], "long_tail": ["classic tote bag for work"]}).to_string())),
        ]);

        let keywords = resolver.suggest_keywords(&request(), "A brown tote.").await.unwrap();

        assert_eq!(*calls.lock(), vec!["colored", "faithful"]);
        assert_eq!(keywords.primary, vec!["brown leather tote"]);
        assert_eq!(keywords.long_tail, vec!["classic tote bag for work"]);
        assert_eq!(Resolver::new(Vec::new()).suggest_keywords(&request(), "").await, None);
    }

    #[test]
    fn extract_json_handles_fences_and_chatter() {
        let raw = "Here you go:\n```json\n{\"title\": \"Mug\", \"nested\": {\"a\": 1}}\n```\nEnjoy!";
        assert_eq!(extract_json(raw).unwrap()["nested"]["a"], 1);
        assert!(extract_json("} backwards {").is_none());
        assert!(extract_json("no braces").is_none());
        assert!(extract_json("{\"title\": \"unterminated\"").is_none());
    }

    #[test]
    fn missing_title_gets_default_and_meta_from_description() {
        let parsed = json!({"description": "  Soft   leather\ntote. ", "bullet_points": "- Roomy\n• Durable\n\n"});
        let result = into_result(&parsed, &request(), "p").unwrap();
        assert_eq!(result.title, "Leather Tote Bag - Classic");
        assert_eq!(result.meta_description, "Soft leather tote.");
        assert_eq!(result.bullet_points, vec!["Roomy", "Durable"]);
    }

    #[test]
    fn prompt_pins_color_and_word_budget() {
        let prompt = render_prompt(&request());
        assert!(prompt.contains("The product color is brown. Use ONLY this color"));
        assert!(prompt.contains("Materials: Full-Grain Leather"));
        assert!(prompt.contains("150-200 words"));
        assert!(prompt.contains("\"meta_description\""));

        let mut req = request();
        req.color = None;
        req.tone = Tone::Minimalist;
        req.price_hint = Some("$49".into());
        let prompt = render_prompt(&req);
        assert!(prompt.contains("Do not mention any color at all."));
        assert!(prompt.contains("80-100 words"));
        assert!(prompt.contains("Price point: $49"));
    }
}
