//! Product attributes from a photo: local dominant color plus a hosted
//! zero-shot image classifier for category, subtype and style.

use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::config::ClassifierConfig;
use crate::models::ProductAnalysis;
use crate::providers::{send_for_text, ProviderError};
use crate::synthesis::{category_profile, DEFAULT_CATEGORY, DEFAULT_STYLE};

/// Classifier label → category name.
const CATEGORY_LABELS: &[(&str, &str)] = &[
    ("electronics gadget", "Electronics"),
    ("fashion clothing", "Fashion & Apparel"),
    ("home kitchen product", "Home & Kitchen"),
    ("sports equipment", "Sports & Outdoors"),
    ("beauty cosmetic", "Beauty & Personal Care"),
    ("toy game", "Toys & Games"),
    ("book media", "Books & Media"),
    ("furniture", "Furniture"),
    ("jewelry accessory", "Jewelry & Accessories"),
    ("tool hardware", "Tools & Hardware"),
];

const SUBTYPE_LABELS: &[(&str, &[&str])] = &[
    ("Electronics", &["headphones", "smartphone", "speaker", "smartwatch", "laptop", "camera", "charger"]),
    ("Fashion & Apparel", &["t-shirt", "dress", "jacket", "sneakers", "handbag", "hat", "jeans"]),
    ("Home & Kitchen", &["mug", "cookware", "kitchen knife", "lamp", "vase", "bedding", "storage container"]),
    ("Sports & Outdoors", &["yoga mat", "water bottle", "backpack", "dumbbell", "tent", "bicycle"]),
    ("Beauty & Personal Care", &["lipstick", "skincare bottle", "perfume", "hair brush", "makeup palette"]),
    ("Toys & Games", &["board game", "plush toy", "building blocks", "puzzle", "action figure"]),
    ("Books & Media", &["book", "notebook", "vinyl record", "magazine"]),
    ("Furniture", &["chair", "table", "sofa", "shelf", "desk", "bed frame"]),
    ("Jewelry & Accessories", &["necklace", "ring", "bracelet", "earrings", "watch", "wallet", "sunglasses"]),
    ("Tools & Hardware", &["drill", "hammer", "wrench", "screwdriver", "saw", "tool set"]),
];

const STYLE_LABELS: &[(&str, &str)] = &[
    ("a modern style product", "Modern"),
    ("a classic style product", "Classic"),
    ("a minimalist style product", "Minimalist"),
    ("a contemporary style product", "Contemporary"),
    ("a vintage style product", "Vintage"),
    ("an industrial style product", "Industrial"),
];

/// Named colors matched against the average pixel. Names are validator vocabulary words.
const PALETTE: &[(&str, [u8; 3])] = &[
    ("black", [20, 20, 20]),
    ("white", [245, 245, 245]),
    ("gray", [128, 128, 128]),
    ("red", [200, 30, 30]),
    ("maroon", [120, 20, 30]),
    ("orange", [240, 140, 20]),
    ("yellow", [240, 220, 40]),
    ("green", [40, 160, 60]),
    ("blue", [40, 80, 200]),
    ("navy", [20, 30, 90]),
    ("purple", [120, 50, 160]),
    ("pink", [240, 150, 190]),
    ("brown", [120, 75, 40]),
    ("beige", [225, 205, 170]),
];

const THUMBNAIL_EDGE: u32 = 64;

/// Nearest palette name for an RGB triple.
pub fn nearest_color_name(rgb: [u8; 3]) -> &'static str {
    PALETTE
        .iter()
        .min_by_key(|(_, p)| distance_sq(*p, rgb))
        .map(|(name, _)| *name)
        .unwrap_or("gray")
}

/// Squared RGB distance under which a pixel counts as backdrop.
const BACKGROUND_TOLERANCE: u32 = 3 * 36 * 36;

fn distance_sq(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = i32::from(*x) - i32::from(*y);
            (d * d) as u32
        })
        .sum()
}

fn mean(pixels: impl Iterator<Item = [u8; 3]>) -> Option<[u8; 3]> {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    for pixel in pixels {
        for (sum, channel) in sums.iter_mut().zip(pixel.iter()) {
            *sum += u64::from(*channel);
        }
        count += 1;
    }
    (count > 0).then(|| sums.map(|s| (s / count) as u8))
}

/// Color of the subject in the middle of the frame, or `None` if the image does not decode.
///
/// The border ring of a thumbnail estimates the backdrop. Pixels in the central
/// half of the frame that differ from it are averaged; when almost nothing
/// differs (a solid or full-bleed shot) the whole center is averaged instead.
pub fn dominant_color(bytes: &[u8]) -> Option<&'static str> {
    let img = image::load_from_memory(bytes).ok()?;
    let thumb = img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE).to_rgb8();
    let (w, h) = thumb.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    let background = mean(
        thumb
            .enumerate_pixels()
            .filter(|(x, y, _)| *x == 0 || *y == 0 || *x == w - 1 || *y == h - 1)
            .map(|(_, _, p)| p.0),
    )?;

    let (x0, x1, y0, y1) = if w >= 4 && h >= 4 { (w / 4, w - w / 4, h / 4, h - h / 4) } else { (0, w, 0, h) };
    let center: Vec<[u8; 3]> = thumb
        .enumerate_pixels()
        .filter(|(x, y, _)| (x0..x1).contains(x) && (y0..y1).contains(y))
        .map(|(_, _, p)| p.0)
        .collect();

    let subject: Vec<[u8; 3]> =
        center.iter().copied().filter(|p| distance_sq(*p, background) > BACKGROUND_TOLERANCE).collect();
    let avg = if subject.len() * 20 >= center.len() && !subject.is_empty() {
        mean(subject.into_iter())?
    } else {
        mean(center.into_iter())?
    };
    Some(nearest_color_name(avg))
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

/// Highest scoring label from a zero-shot classification response.
pub(crate) fn top_label(body: &str) -> Result<(String, f32), ProviderError> {
    let scores: Vec<LabelScore> = serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    scores
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|s| (s.label, s.score))
        .ok_or(ProviderError::Empty)
}

pub struct ImageAnalyzer {
    client: Client,
    config: ClassifierConfig,
}

impl ImageAnalyzer {
    pub fn new(client: Client, config: ClassifierConfig) -> Self {
        Self { client, config }
    }

    async fn classify(&self, image_b64: &str, labels: &[&str]) -> Result<(String, f32), ProviderError> {
        let payload = json!({
            "inputs": image_b64,
            "parameters": { "candidate_labels": labels }
        });
        let mut request = self.client.post(&self.config.endpoint).timeout(self.config.timeout).json(&payload);
        if let Some(token) = &self.config.api_key {
            request = request.bearer_auth(token);
        }
        let body = send_for_text("classifier", request).await?;
        top_label(&body)
    }

    /// Never fails: each classifier step falls back independently.
    pub async fn analyze(&self, image: Vec<u8>) -> ProductAnalysis {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&image);
        let color = tokio::task::spawn_blocking(move || dominant_color(&image)).await.ok().flatten();

        let category_labels: Vec<&str> = CATEGORY_LABELS.iter().map(|(label, _)| *label).collect();
        let (category, confidence) = match self.classify(&encoded, &category_labels).await {
            Ok((label, score)) => match CATEGORY_LABELS.iter().find(|(l, _)| *l == label) {
                Some((_, category)) => (category.to_string(), score),
                None => (DEFAULT_CATEGORY.to_string(), score),
            },
            Err(e) => {
                warn!(error = %e, "category classification failed, using default");
                (DEFAULT_CATEGORY.to_string(), 0.0)
            }
        };

        let subtype = match SUBTYPE_LABELS.iter().find(|(c, _)| *c == category) {
            Some((_, labels)) => match self.classify(&encoded, labels).await {
                Ok((label, _)) => Some(label),
                Err(e) => {
                    warn!(error = %e, "subtype classification failed");
                    None
                }
            },
            None => None,
        };

        let style_labels: Vec<&str> = STYLE_LABELS.iter().map(|(label, _)| *label).collect();
        let style = match self.classify(&encoded, &style_labels).await {
            Ok((label, _)) => STYLE_LABELS
                .iter()
                .find(|(l, _)| *l == label)
                .map(|(_, s)| s.to_string())
                .unwrap_or_else(|| DEFAULT_STYLE.to_string()),
            Err(e) => {
                warn!(error = %e, "style classification failed, using default");
                DEFAULT_STYLE.to_string()
            }
        };

        let materials = category_profile(&category).materials.iter().map(|m| m.to_string()).collect();

        info!(%category, ?subtype, ?color, %style, confidence, "🖼️ image analyzed");

        ProductAnalysis {
            category,
            subtype,
            color: color.map(str::to_string),
            materials,
            style,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::time::Duration;

    fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn nearest_palette_entries() {
        assert_eq!(nearest_color_name([0, 0, 0]), "black");
        assert_eq!(nearest_color_name([250, 250, 250]), "white");
        assert_eq!(nearest_color_name([30, 40, 110]), "navy");
        assert_eq!(nearest_color_name([215, 200, 165]), "beige");
    }

    #[test]
    fn dominant_color_of_solid_images() {
        assert_eq!(dominant_color(&png(120, 80, [210, 25, 25])), Some("red"));
        assert_eq!(dominant_color(&png(8, 8, [35, 150, 70])), Some("green"));
        assert_eq!(dominant_color(b"definitely not an image"), None);
    }

    #[test]
    fn backdrop_does_not_drown_the_subject() {
        let mut img = RgbImage::from_pixel(200, 200, Rgb([250, 250, 250]));
        for x in 60..140 {
            for y in 60..140 {
                img.put_pixel(x, y, Rgb([215, 25, 25]));
            }
        }
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, ImageFormat::Png).unwrap();

        assert_eq!(dominant_color(&buf.into_inner()), Some("red"));
    }

    #[test]
    fn palette_names_are_vocabulary_colors() {
        for (name, _) in PALETTE {
            assert!(crate::validate::COLOR_VOCABULARY.contains(name), "{name}");
        }
    }

    #[test]
    fn top_label_picks_highest_score() {
        let body = r#"[{"label":"toy game","score":0.12},{"label":"furniture","score":0.81},{"label":"book media","score":0.07}]"#;
        assert_eq!(top_label(body).unwrap(), ("furniture".to_string(), 0.81));
        assert!(matches!(top_label("[]"), Err(ProviderError::Empty)));
        assert!(top_label(r#"{"error":"loading"}"#).is_err());
    }

    #[test]
    fn every_category_has_subtypes_and_materials() {
        for (_, category) in CATEGORY_LABELS {
            assert!(SUBTYPE_LABELS.iter().any(|(c, _)| c == category), "{category}");
            assert_eq!(category_profile(category).category, *category);
        }
    }

    #[tokio::test]
    async fn unreachable_classifier_falls_back() {
        let analyzer = ImageAnalyzer::new(
            Client::new(),
            ClassifierConfig {
                endpoint: "http://127.0.0.1:9/clip".into(),
                api_key: None,
                timeout: Duration::from_secs(2),
            },
        );
        let analysis = analyzer.analyze(png(16, 16, [20, 30, 95])).await;
        assert_eq!(analysis.category, DEFAULT_CATEGORY);
        assert_eq!(analysis.subtype, None);
        assert_eq!(analysis.style, DEFAULT_STYLE);
        assert_eq!(analysis.color.as_deref(), Some("navy"));
        assert_eq!(analysis.materials, vec!["Premium Material", "Durable Construction"]);
        assert_eq!(analysis.confidence, 0.0);
    }
}
