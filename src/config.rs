use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown provider '{0}' in QUICKLIST_PROVIDERS")] UnknownProvider(String),
    #[error("invalid value for {key}: {value}")] Invalid { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAi,
    HuggingFace,
}

/// Static settings for one entry of the fallback chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub key_required: bool,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn is_available(&self) -> bool {
        !self.key_required || self.api_key.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Text-to-image endpoint for lifestyle scenes. The prompt is appended as a path segment.
#[derive(Debug, Clone, PartialEq)]
pub struct LifestyleConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub providers: Vec<ProviderConfig>,
    pub classifier: ClassifierConfig,
    pub lifestyle: LifestyleConfig,
}

struct CatalogEntry {
    name: &'static str,
    kind: ProviderKind,
    path: &'static str,
    model: &'static str,
    key_var: &'static str,
    key_required: bool,
    timeout_secs: u64,
}

// Default priority order: direct low-latency provider first, free tiers last.
const CATALOG: &[CatalogEntry] = &[
    CatalogEntry { name: "gemini", kind: ProviderKind::Gemini, path: "", model: "gemini-1.5-flash", key_var: "GEMINI_API_KEY", key_required: true, timeout_secs: 15 },
    CatalogEntry { name: "groq", kind: ProviderKind::OpenAi, path: "https://api.groq.com/openai/v1/chat/completions", model: "llama-3.1-8b-instant", key_var: "GROQ_API_KEY", key_required: true, timeout_secs: 15 },
    CatalogEntry { name: "openrouter", kind: ProviderKind::OpenAi, path: "https://openrouter.ai/api/v1/chat/completions", model: "mistralai/mistral-7b-instruct:free", key_var: "OPENROUTER_API_KEY", key_required: true, timeout_secs: 20 },
    CatalogEntry { name: "together", kind: ProviderKind::OpenAi, path: "https://api.together.xyz/v1/chat/completions", model: "mistralai/Mixtral-8x7B-Instruct-v0.1", key_var: "TOGETHER_API_KEY", key_required: true, timeout_secs: 20 },
    CatalogEntry { name: "huggingface-mistral", kind: ProviderKind::HuggingFace, path: "", model: "mistralai/Mistral-7B-Instruct-v0.2", key_var: "HF_API_TOKEN", key_required: false, timeout_secs: 30 },
    CatalogEntry { name: "huggingface-zephyr", kind: ProviderKind::HuggingFace, path: "", model: "HuggingFaceH4/zephyr-7b-beta", key_var: "HF_API_TOKEN", key_required: false, timeout_secs: 30 },
];

const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_HF_BASE: &str = "https://api-inference.huggingface.co/models";
const DEFAULT_CLASSIFIER_MODEL: &str = "openai/clip-vit-base-patch32";
const DEFAULT_IMAGE_BASE: &str = "https://image.pollinations.ai/prompt";

impl AppConfig {
    /// Reads the process environment once; call after `dotenv`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key: "PORT".into(), value: v })?,
            None => 8080,
        };

        let timeout_override = match get("QUICKLIST_TIMEOUT_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => return Err(ConfigError::Invalid { key: "QUICKLIST_TIMEOUT_SECS".into(), value: v }),
            },
            None => None,
        };

        let gemini_base = get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_GEMINI_BASE.to_string());
        let hf_base = get("HF_API_BASE").unwrap_or_else(|| DEFAULT_HF_BASE.to_string());
        let gemini_base = gemini_base.trim_end_matches('/');
        let hf_base = hf_base.trim_end_matches('/');

        let order: Vec<String> = match get("QUICKLIST_PROVIDERS") {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => CATALOG.iter().map(|e| e.name.to_string()).collect(),
        };

        let mut providers = Vec::with_capacity(order.len());
        for name in order {
            let entry = CATALOG
                .iter()
                .find(|e| e.name == name)
                .ok_or_else(|| ConfigError::UnknownProvider(name.clone()))?;
            if providers.iter().any(|p: &ProviderConfig| p.name == entry.name) {
                continue;
            }
            let endpoint = match entry.kind {
                ProviderKind::Gemini => format!("{}/models/{}:generateContent", gemini_base, entry.model),
                ProviderKind::HuggingFace => format!("{}/{}", hf_base, entry.model),
                ProviderKind::OpenAi => entry.path.to_string(),
            };
            providers.push(ProviderConfig {
                name: entry.name.to_string(),
                kind: entry.kind,
                endpoint,
                model: entry.model.to_string(),
                api_key: get(entry.key_var),
                key_required: entry.key_required,
                timeout: timeout_override.unwrap_or(Duration::from_secs(entry.timeout_secs)),
            });
        }

        let classifier_model = get("QUICKLIST_CLASSIFIER_MODEL").unwrap_or_else(|| DEFAULT_CLASSIFIER_MODEL.to_string());
        let classifier = ClassifierConfig {
            endpoint: format!("{}/{}", hf_base, classifier_model),
            api_key: get("HF_API_TOKEN"),
            timeout: Duration::from_secs(30),
        };

        let lifestyle = LifestyleConfig {
            endpoint: get("QUICKLIST_IMAGE_BASE")
                .unwrap_or_else(|| DEFAULT_IMAGE_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(50),
        };

        Ok(Self { port, providers, classifier, lifestyle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_follow_catalog_order() {
        let cfg = config_with(&[]).unwrap();
        let names: Vec<_> = cfg.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["gemini", "groq", "openrouter", "together", "huggingface-mistral", "huggingface-zephyr"]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(
            cfg.providers[0].endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn keyed_providers_unavailable_without_credentials() {
        let cfg = config_with(&[("GROQ_API_KEY", "gsk-test"), ("GEMINI_API_KEY", "   ")]).unwrap();
        let availability: Vec<_> = cfg.providers.iter().map(|p| (p.name.as_str(), p.is_available())).collect();
        assert_eq!(
            availability,
            vec![
                ("gemini", false),
                ("groq", true),
                ("openrouter", false),
                ("together", false),
                ("huggingface-mistral", true),
                ("huggingface-zephyr", true),
            ]
        );
    }

    #[test]
    fn order_override_and_timeout() {
        let cfg = config_with(&[
            ("QUICKLIST_PROVIDERS", "huggingface-zephyr, GROQ,groq"),
            ("QUICKLIST_TIMEOUT_SECS", "12"),
            ("HF_API_BASE", "http://localhost:9000/"),
        ])
        .unwrap();
        let names: Vec<_> = cfg.providers.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["huggingface-zephyr", "groq"]);
        assert!(cfg.providers.iter().all(|p| p.timeout == Duration::from_secs(12)));
        assert_eq!(cfg.providers[0].endpoint, "http://localhost:9000/HuggingFaceH4/zephyr-7b-beta");
    }

    #[test]
    fn lifestyle_endpoint_default_and_override() {
        assert_eq!(config_with(&[]).unwrap().lifestyle.endpoint, "https://image.pollinations.ai/prompt");
        let cfg = config_with(&[("QUICKLIST_IMAGE_BASE", "http://localhost:7000/img/")]).unwrap();
        assert_eq!(cfg.lifestyle.endpoint, "http://localhost:7000/img");
        assert_eq!(cfg.lifestyle.timeout, Duration::from_secs(50));
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            config_with(&[("QUICKLIST_PROVIDERS", "gemini,chatgpt")]).unwrap_err(),
            ConfigError::UnknownProvider("chatgpt".into())
        );
        assert!(matches!(config_with(&[("PORT", "http")]), Err(ConfigError::Invalid { .. })));
        assert!(matches!(config_with(&[("QUICKLIST_TIMEOUT_SECS", "0")]), Err(ConfigError::Invalid { .. })));
    }
}
