//! Lifestyle scene photos from a hosted text-to-image endpoint, with a local
//! SVG placeholder for any scene the endpoint cannot deliver.

use base64::Engine;
use reqwest::{Client, Url};
use tracing::{info, warn};

use crate::config::LifestyleConfig;
use crate::models::{LifestyleImage, Scene};
use crate::providers::{preview, ProviderError};

const IMAGE_EDGE: u32 = 768;
const SEED_STEP: u64 = 100;

fn scene_context(scene: Scene, product: &str) -> String {
    match scene {
        Scene::Workspace => format!(
            "{} on elegant modern desk workspace, professional office setting, soft natural window light, minimalist aesthetic, high-end commercial product photography",
            product
        ),
        Scene::Outdoor => format!(
            "{} in beautiful outdoor lifestyle scene, natural environment background, golden hour lighting, professional advertising photography style",
            product
        ),
        Scene::Gift => format!(
            "{} styled as premium gift presentation, luxury wrapping paper and elegant ribbons, celebration setting, high-end product photography",
            product
        ),
        Scene::SizeComparison => format!(
            "{} size comparison on white studio background, placed next to common everyday objects for scale reference, clean professional product photography",
            product
        ),
    }
}

pub fn scene_prompt(scene: Scene, product: &str) -> String {
    format!(
        "professional commercial product photography, {}, 8k ultra high quality resolution, sharp focus, beautiful composition, advertising quality",
        scene_context(scene, product.trim())
    )
}

/// `{base}/{encoded prompt}?width=..&height=..&model=flux&nologo=true&enhance=true&seed=..`
pub fn image_url(base: &str, prompt: &str, seed: u64) -> Option<Url> {
    let mut url = Url::parse(base).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(prompt);
    url.query_pairs_mut()
        .append_pair("width", &IMAGE_EDGE.to_string())
        .append_pair("height", &IMAGE_EDGE.to_string())
        .append_pair("model", "flux")
        .append_pair("nologo", "true")
        .append_pair("enhance", "true")
        .append_pair("seed", &seed.to_string());
    Some(url)
}

fn escape_xml(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '&' => "&amp;".to_string(),
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '"' => "&quot;".to_string(),
            c => c.to_string(),
        })
        .collect()
}

/// Base64 SVG card standing in for a scene that could not be generated.
pub fn placeholder_svg(scene: Scene, product: &str) -> String {
    let svg = format!(
        r##"<svg width="{edge}" height="{edge}" xmlns="http://www.w3.org/2000/svg">
            <rect width="{edge}" height="{edge}" fill="#F5F5F5" />
            <text x="384" y="370" font-family="Arial, sans-serif" font-size="32" font-weight="bold"
                  text-anchor="middle" fill="#4B5563">{name}</text>
            <text x="384" y="420" font-family="Arial, sans-serif" font-size="20"
                  text-anchor="middle" fill="#9CA3AF">{scene} scene</text>
        </svg>"##,
        edge = IMAGE_EDGE,
        name = escape_xml(product.trim()),
        scene = scene.label(),
    );
    base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
}

pub struct LifestyleGenerator {
    client: Client,
    config: LifestyleConfig,
}

impl LifestyleGenerator {
    pub fn new(client: Client, config: LifestyleConfig) -> Self {
        Self { client, config }
    }

    async fn fetch(&self, url: Url) -> Result<(Vec<u8>, &'static str), ProviderError> {
        let response = self.client.get(url).timeout(self.config.timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status { status: status.as_u16(), body: preview(&body, 200) });
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::Empty);
        }
        let format = image::guess_format(&bytes).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok((bytes.to_vec(), format.to_mime_type()))
    }

    /// One image per scene, in [`Scene::ALL`] order, at most four. Never fails:
    /// a scene the endpoint does not deliver gets a placeholder.
    pub async fn generate(&self, product: &str, count: usize) -> Vec<LifestyleImage> {
        let mut images = Vec::with_capacity(count.min(Scene::ALL.len()));
        for (i, scene) in Scene::ALL.iter().copied().take(count).enumerate() {
            let prompt = scene_prompt(scene, product);
            let seed = i as u64 * SEED_STEP;
            let fetched = match image_url(&self.config.endpoint, &prompt, seed) {
                Some(url) => self.fetch(url).await,
                None => Err(ProviderError::Decode(format!("bad image endpoint {}", self.config.endpoint))),
            };
            let image = match fetched {
                Ok((bytes, mime_type)) => {
                    info!(scene = scene.label(), bytes = bytes.len(), "🖼️ lifestyle image generated");
                    LifestyleImage {
                        scene,
                        prompt,
                        mime_type: mime_type.to_string(),
                        image_base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
                        generated: true,
                    }
                }
                Err(e) => {
                    warn!(scene = scene.label(), error = %e, "lifestyle image failed, using placeholder");
                    LifestyleImage {
                        scene,
                        image_base64: placeholder_svg(scene, product),
                        prompt,
                        mime_type: "image/svg+xml".to_string(),
                        generated: false,
                    }
                }
            };
            images.push(image);
        }
        images
    }
}
