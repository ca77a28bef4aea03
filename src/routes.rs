use axum::{Json, Router, extract::{Path, State}, http::StatusCode, response::{IntoResponse, Response}, routing::{get, post}};
use base64::Engine;
use parking_lot::RwLock;
use serde_json::json;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use uuid::Uuid;
use chrono::Utc;

use crate::{
    analysis::ImageAnalyzer,
    keywords::generate_keywords,
    lifestyle::LifestyleGenerator,
    models::{AnalyzeRequest, FormatRequest, FormatResponse, GenerationRequest, GenerationResult, KeywordRequest, KeywordSet, LifestyleImage, LifestyleRequest, Listing, ListingRequest, ProductAnalysis, Scene, Tone},
    platform::format_listing,
    resolver::Resolver,
    synthesis::{category_profile, DEFAULT_CATEGORY, DEFAULT_STYLE},
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<HashMap<Uuid, Listing>>>,
    pub resolver: Arc<Resolver>,
    pub analyzer: Arc<ImageAnalyzer>,
    pub lifestyle: Arc<LifestyleGenerator>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("listing {0} not found")] NotFound(Uuid),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze_image))
        .route("/api/describe", post(describe))
        .route("/api/keywords", post(keywords))
        .route("/api/format", post(format_for_platform))
        .route("/api/lifestyle", post(lifestyle_images))
        .route("/api/listing", post(create_listing))
        .route("/api/listing/:id", get(get_listing))
        .with_state(state)
}

/// Accepts raw base64 or a `data:image/...;base64,` URL.
fn decode_image(encoded: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match encoded.split_once(',') {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("image_base64 is not valid base64: {}", e)))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let providers: Vec<_> = state.resolver.providers().iter().map(|p| json!({
        "name": p.name(),
        "available": p.is_available(),
        "timeout_secs": p.timeout().as_secs(),
    })).collect();
    Json(json!({ "status": "ok", "providers": providers }))
}

/// Replaces table materials with model-inferred ones when the chain answers.
/// The inferred style is used only when `style_known` is false.
async fn refine_attributes(resolver: &Resolver, analysis: &mut ProductAnalysis, style_known: bool) {
    if let Some(inferred) = resolver.infer_attributes(&analysis.category).await {
        analysis.materials = inferred.materials;
        if let (false, Some(style)) = (style_known, inferred.style) {
            analysis.style = style;
        }
    }
}

pub async fn analyze_image(State(state): State<AppState>, Json(body): Json<AnalyzeRequest>) -> Result<Json<ProductAnalysis>, ApiError> {
    let bytes = decode_image(&body.image_base64)?;
    let mut analysis = state.analyzer.analyze(bytes).await;
    refine_attributes(&state.resolver, &mut analysis, true).await;
    Ok(Json(analysis))
}

pub async fn describe(State(state): State<AppState>, Json(body): Json<GenerationRequest>) -> Json<GenerationResult> {
    tracing::info!("🎯 Generating {:?} copy for product: {}", body.tone, body.product_name);
    Json(state.resolver.resolve(&body).await)
}

pub async fn keywords(State(state): State<AppState>, Json(body): Json<KeywordRequest>) -> Json<KeywordSet> {
    let description = body.description.as_deref().unwrap_or_default();
    let suggested = state.resolver.suggest_keywords(&body.request, description).await;
    Json(suggested.unwrap_or_else(|| generate_keywords(&body.request)))
}

pub async fn lifestyle_images(State(state): State<AppState>, Json(body): Json<LifestyleRequest>) -> Result<Json<Vec<LifestyleImage>>, ApiError> {
    let product_name = body.product_name.trim();
    if product_name.is_empty() {
        return Err(ApiError::BadRequest("product_name must not be empty".into()));
    }
    let count = body.count.unwrap_or(Scene::ALL.len());
    tracing::info!("🎨 Generating {} lifestyle images for product: {}", count.min(Scene::ALL.len()), product_name);
    Ok(Json(state.lifestyle.generate(product_name, count).await))
}

pub async fn format_for_platform(Json(body): Json<FormatRequest>) -> Json<FormatResponse> {
    let text = format_listing(&body.result, &body.keywords, body.platform);
    Json(FormatResponse { platform: body.platform, text })
}

fn default_analysis() -> ProductAnalysis {
    ProductAnalysis {
        category: DEFAULT_CATEGORY.to_string(),
        subtype: None,
        color: None,
        materials: category_profile(DEFAULT_CATEGORY).materials.iter().map(|m| m.to_string()).collect(),
        style: DEFAULT_STYLE.to_string(),
        confidence: 0.0,
    }
}

fn apply_overrides(mut analysis: ProductAnalysis, body: &ListingRequest) -> ProductAnalysis {
    let pick = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    if let Some(category) = pick(&body.category) {
        if category != analysis.category {
            analysis.materials = category_profile(&category).materials.iter().map(|m| m.to_string()).collect();
            analysis.subtype = None;
        }
        analysis.category = category;
    }
    if let Some(color) = pick(&body.color) {
        analysis.color = Some(color);
    }
    if let Some(style) = pick(&body.style) {
        analysis.style = style;
    }
    if let Some(materials) = &body.materials {
        let materials: Vec<String> = materials.iter().map(|m| m.trim().to_string()).filter(|m| !m.is_empty()).collect();
        if !materials.is_empty() {
            analysis.materials = materials;
        }
    }
    analysis
}

pub async fn create_listing(State(state): State<AppState>, Json(body): Json<ListingRequest>) -> Result<Json<Listing>, ApiError> {
    let product_name = body.product_name.trim().to_string();
    if product_name.is_empty() {
        return Err(ApiError::BadRequest("product_name must not be empty".into()));
    }

    let image = body.image_base64.as_deref().map(decode_image).transpose()?;

    tracing::info!("🚀 Generating listing for product: {}", product_name);

    let analyzed = image.is_some();
    let analysis = match image {
        Some(bytes) => state.analyzer.analyze(bytes).await,
        None => default_analysis(),
    };
    let mut analysis = apply_overrides(analysis, &body);
    let materials_given = body.materials.as_ref().is_some_and(|m| m.iter().any(|m| !m.trim().is_empty()));
    if !materials_given {
        let style_known = analyzed || body.style.as_deref().is_some_and(|s| !s.trim().is_empty());
        refine_attributes(&state.resolver, &mut analysis, style_known).await;
    }

    let mut tones: Vec<Tone> = Vec::new();
    for tone in body.tones.clone().unwrap_or_default() {
        if !tones.contains(&tone) {
            tones.push(tone);
        }
    }
    if tones.is_empty() {
        tones = Tone::ALL.to_vec();
    }

    let base = GenerationRequest {
        product_name: product_name.clone(),
        category: analysis.category.clone(),
        subtype: analysis.subtype.clone(),
        color: analysis.color.clone(),
        style: analysis.style.clone(),
        materials: analysis.materials.clone(),
        features: body.features.clone(),
        target_audience: body.target_audience.clone(),
        price_hint: body.price_hint.clone(),
        tone: tones[0],
    };

    // One resolver call per tone, strictly one after another.
    let mut descriptions = Vec::with_capacity(tones.len());
    for tone in &tones {
        let request = GenerationRequest { tone: *tone, ..base.clone() };
        descriptions.push(state.resolver.resolve(&request).await);
    }

    let keywords = match state.resolver.suggest_keywords(&base, &descriptions[0].description).await {
        Some(keywords) => keywords,
        None => generate_keywords(&base),
    };
    let export = format_listing(&descriptions[0], &keywords, body.platform);

    let lifestyle_images = if body.lifestyle_images {
        state.lifestyle.generate(&product_name, Scene::ALL.len()).await
    } else {
        Vec::new()
    };

    let summary: Vec<_> = descriptions.iter().map(|d| format!("{}: {}", d.tone.label(), d.provider)).collect();
    let local = descriptions.iter().filter(|d| d.is_local()).count();
    tracing::info!("✅ Listing generated with {} descriptions ({} local): {}", descriptions.len(), local, summary.join(", "));

    let listing = Listing {
        id: Uuid::new_v4(),
        product_name,
        analysis,
        descriptions,
        keywords,
        platform: body.platform,
        export,
        lifestyle_images,
        created_at: Utc::now(),
    };

    state.store.write().insert(listing.id, listing.clone());
    Ok(Json(listing))
}

pub async fn get_listing(Path(id): Path<String>, State(state): State<AppState>) -> Result<Json<Listing>, ApiError> {
    let id = Uuid::parse_str(id.trim()).map_err(|_| ApiError::BadRequest(format!("invalid listing id: {}", id)))?;
    let listing = state.store.read().get(&id).cloned();
    listing.map(Json).ok_or(ApiError::NotFound(id))
}
