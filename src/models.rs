use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Provider tag carried by results that were synthesized without any model call.
pub const LOCAL_PROVIDER: &str = "local";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Storytelling,
    #[default]
    FeatureBenefit,
    Minimalist,
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Storytelling, Tone::FeatureBenefit, Tone::Minimalist];

    pub fn label(self) -> &'static str {
        match self {
            Tone::Storytelling => "Storytelling (Emotional)",
            Tone::FeatureBenefit => "Feature-Benefit (Practical)",
            Tone::Minimalist => "Minimalist (Clean)",
        }
    }

    /// Inclusive word range requested from the model.
    pub fn word_budget(self) -> (u32, u32) {
        match self {
            Tone::Storytelling | Tone::FeatureBenefit => (150, 200),
            Tone::Minimalist => (80, 100),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Shopify,
    Amazon,
    Etsy,
    WooCommerce,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct GenerationRequest {
    pub product_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub features: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub price_hint: Option<String>,
    #[serde(default)]
    pub tone: Tone,
}

impl GenerationRequest {
    /// The declared color, ignoring blank values.
    pub fn declared_color(&self) -> Option<&str> {
        self.color.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GenerationResult {
    pub title: String,
    pub description: String,
    pub bullet_points: Vec<String>,
    pub meta_description: String,
    pub tone: Tone,
    pub provider: String,
}

impl GenerationResult {
    pub fn is_local(&self) -> bool {
        self.provider == LOCAL_PROVIDER
    }
}

/// Staged setting for a generated lifestyle photo.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Scene {
    Workspace,
    Outdoor,
    Gift,
    SizeComparison,
}

impl Scene {
    pub const ALL: [Scene; 4] = [Scene::Workspace, Scene::Outdoor, Scene::Gift, Scene::SizeComparison];

    pub fn label(self) -> &'static str {
        match self {
            Scene::Workspace => "Workspace",
            Scene::Outdoor => "Outdoor",
            Scene::Gift => "Gift",
            Scene::SizeComparison => "Size comparison",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LifestyleImage {
    pub scene: Scene,
    pub prompt: String,
    pub mime_type: String,
    pub image_base64: String,
    /// False when the image is the local placeholder.
    pub generated: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LifestyleRequest {
    pub product_name: String,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProductAnalysis {
    pub category: String,
    pub subtype: Option<String>,
    pub color: Option<String>,
    pub materials: Vec<String>,
    pub style: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct KeywordSet {
    pub primary: Vec<String>,
    pub long_tail: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListingRequest {
    pub product_name: String,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub features: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub price_hint: Option<String>,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub tones: Option<Vec<Tone>>, // defaults to all three
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub materials: Option<Vec<String>>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub lifestyle_images: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Listing {
    pub id: Uuid,
    pub product_name: String,
    pub analysis: ProductAnalysis,
    pub descriptions: Vec<GenerationResult>,
    pub keywords: KeywordSet,
    pub platform: Platform,
    pub export: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lifestyle_images: Vec<LifestyleImage>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzeRequest {
    pub image_base64: String,
}

/// Keyword request: the product fields plus an optional description to mine.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KeywordRequest {
    #[serde(flatten)]
    pub request: GenerationRequest,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FormatRequest {
    pub result: GenerationResult,
    pub keywords: KeywordSet,
    #[serde(default)]
    pub platform: Platform,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FormatResponse {
    pub platform: Platform,
    pub text: String,
}

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_META_CHARS: usize = 160;
pub const MAX_BULLETS: usize = 5;

/// Cuts `s` to at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
