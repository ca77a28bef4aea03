//! Network-free listing copy built from request fields and fixed fragments.

use crate::validate::foreign_colors;
use crate::models::{
    truncate_chars, GenerationRequest, GenerationResult, Tone, LOCAL_PROVIDER, MAX_META_CHARS, MAX_TITLE_CHARS,
};

pub const DEFAULT_CATEGORY: &str = "General Product";
pub const DEFAULT_STYLE: &str = "Modern";

/// Sentence fragments for one product category.
#[derive(Debug)]
pub struct CategoryProfile {
    pub category: &'static str,
    pub materials: [&'static str; 2],
    pub usage: &'static str,
    pub benefit: &'static str,
}

pub const CATEGORY_PROFILES: &[CategoryProfile] = &[
    CategoryProfile { category: "Electronics", materials: ["Aluminum", "Plastic"], usage: "keeps up with your work, travel and downtime", benefit: "Reliable everyday performance" },
    CategoryProfile { category: "Fashion & Apparel", materials: ["Premium Cotton", "Polyester"], usage: "moves with you from morning plans to evening outings", benefit: "Comfortable fit that holds its shape" },
    CategoryProfile { category: "Home & Kitchen", materials: ["Stainless Steel", "Glass"], usage: "fits naturally into daily routines at home", benefit: "Easy to clean and built for daily use" },
    CategoryProfile { category: "Sports & Outdoors", materials: ["Nylon", "Rubber"], usage: "stands up to training sessions and weekend adventures", benefit: "Grip and durability for active use" },
    CategoryProfile { category: "Beauty & Personal Care", materials: ["Silicone", "Plastic"], usage: "brings a little care into every morning and evening", benefit: "Gentle, comfortable everyday care" },
    CategoryProfile { category: "Toys & Games", materials: ["ABS Plastic", "Wood"], usage: "turns ordinary afternoons into playtime", benefit: "Sturdy build for hours of play" },
    CategoryProfile { category: "Books & Media", materials: ["Paper", "Cardboard"], usage: "rewards a quiet hour on the couch or a long commute", benefit: "Engaging content worth returning to" },
    CategoryProfile { category: "Furniture", materials: ["Solid Wood", "Metal"], usage: "anchors a room while standing up to daily life", benefit: "Stable construction made to last years" },
    CategoryProfile { category: "Jewelry & Accessories", materials: ["Sterling Silver", "Leather"], usage: "completes an outfit for work, dinner or a special occasion", benefit: "Polished finish that elevates any look" },
    CategoryProfile { category: "Tools & Hardware", materials: ["Steel", "Aluminum"], usage: "handles repairs and projects around the house", benefit: "Precision and strength when the job demands it" },
];

const GENERAL_PROFILE: CategoryProfile = CategoryProfile {
    category: DEFAULT_CATEGORY,
    materials: ["Premium Material", "Durable Construction"],
    usage: "fits easily into everyday life",
    benefit: "Dependable quality you can count on",
};

/// Profile for `category` (case-insensitive), or the general profile.
pub fn category_profile(category: &str) -> &'static CategoryProfile {
    let wanted = category.trim();
    CATEGORY_PROFILES
        .iter()
        .find(|p| p.category.eq_ignore_ascii_case(wanted))
        .unwrap_or(&GENERAL_PROFILE)
}

/// Fixed per-tone copy: bullet tails appended after the two attribute bullets.
struct ToneFrame {
    bullet_tails: [&'static str; 3],
}

fn frame(tone: Tone) -> ToneFrame {
    match tone {
        Tone::Storytelling => ToneFrame {
            bullet_tails: [
                "Exceptional attention to detail in every aspect of craftsmanship",
                "Versatile enough for daily use while special enough for occasions",
                "Creates memorable moments and makes an unforgettable gift",
            ],
        },
        Tone::FeatureBenefit => ToneFrame {
            bullet_tails: [
                "Durable construction withstands regular use while maintaining performance",
                "Versatile functionality adapts to multiple use cases and situations",
                "Quality craftsmanship backed by attention to detail and standards",
            ],
        },
        Tone::Minimalist => ToneFrame {
            bullet_tails: [
                "Essential functionality without excess",
                "Superior craftsmanship standards",
                "Timeless quality and appeal",
            ],
        },
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Builds a complete result from the request alone. Deterministic, never fails.
pub fn synthesize<'a>(request: &'a GenerationRequest) -> GenerationResult {
    let name = non_blank(Some(&request.product_name)).unwrap_or("Product");
    let lower_name = name.to_lowercase();
    let profile = category_profile(&request.category);
    let category = non_blank(Some(&request.category)).unwrap_or(profile.category);
    let style = non_blank(Some(&request.style)).unwrap_or(DEFAULT_STYLE);
    let lower_style = style.to_lowercase();

    let materials: Vec<&str> = {
        let declared: Vec<&str> = request.materials.iter().map(|m| m.trim()).filter(|m| !m.is_empty()).collect();
        if declared.is_empty() { profile.materials.to_vec() } else { declared }
    };
    let primary_material = materials[0];
    let material_list = materials.join(" and ").to_lowercase();

    let color_line = request.declared_color().map(|c| format!("Finished in {}.", c.to_lowercase()));
    // Free text is not a declared attribute; it is dropped if it names another color.
    let clean = |text: Option<&'a str>| text.filter(|t| foreign_colors(t, request).is_empty());
    let features = clean(non_blank(request.features.as_deref()));
    let audience = clean(non_blank(request.target_audience.as_deref()));

    let (title, paragraphs, first_bullets) = match request.tone {
        Tone::Storytelling => {
            let mut paragraphs = vec![
                format!("Discover the perfect harmony of form and function with this exceptional {}.", lower_name),
                format!(
                    "Every detail has been thoughtfully designed to elevate your experience. Crafted from premium {}, this {} combines {} aesthetics with uncompromising quality.{}",
                    material_list, lower_name, lower_style,
                    color_line.as_ref().map(|l| format!(" {}", l)).unwrap_or_default()
                ),
                format!("It {}, and from the first use you will feel the difference.", profile.usage),
            ];
            if let Some(features) = features {
                paragraphs.push(features.to_string());
            }
            paragraphs.push(match audience {
                Some(a) => format!("Made for {}, this {} delivers an experience that exceeds expectations.", a, lower_name),
                None => format!("Whether enhancing your daily routine or seeking that perfect gift, this {} delivers an experience that exceeds expectations.", lower_name),
            });
            (
                format!("{} {} - Experience Premium Quality", style, name),
                paragraphs,
                [
                    format!("Premium {} construction ensures lasting durability and elegance", primary_material.to_lowercase()),
                    format!("Sophisticated {} design complements any setting beautifully", lower_style),
                ],
            )
        }
        Tone::FeatureBenefit => {
            let mut paragraphs = vec![
                format!("Experience the perfect balance of quality and value with this professional-grade {}.", lower_name),
                format!(
                    "SUPERIOR CONSTRUCTION: Built with premium {}, which means exceptional durability you can count on.",
                    material_list
                ),
                format!(
                    "INTELLIGENT DESIGN: The {} aesthetic is engineered for optimal functionality.{}",
                    lower_style,
                    color_line.as_ref().map(|l| format!(" {}", l)).unwrap_or_default()
                ),
                format!(
                    "PROVEN PERFORMANCE: {}",
                    features.map(str::to_string).unwrap_or_else(|| format!("{}. It {}.", profile.benefit, profile.usage))
                ),
            ];
            if let Some(a) = audience {
                paragraphs.push(format!("IDEAL FOR: {}.", a));
            }
            (
                format!("{} - {} Design | Professional Quality", name, style),
                paragraphs,
                [
                    format!("Professional-grade {} provides superior strength and longevity", primary_material.to_lowercase()),
                    format!("{} for {}", profile.benefit, category.to_lowercase()),
                ],
            )
        }
        Tone::Minimalist => {
            let mut paragraphs = vec![
                "Clean design. Premium materials. Built to last.".to_string(),
                format!("This {} represents essentials, perfected. No unnecessary complexity.", lower_name),
                format!(
                    "Crafted from {}. Designed with {} principles.{}",
                    material_list, lower_style,
                    color_line.as_ref().map(|l| format!(" {}", l)).unwrap_or_default()
                ),
            ];
            paragraphs.push(features.unwrap_or("Functional. Reliable. Timeless.").to_string());
            (
                format!("{} | {}", name, style),
                paragraphs,
                [
                    format!("Premium {} construction", primary_material),
                    format!("{} design aesthetic", style),
                ],
            )
        }
    };

    let tails = frame(request.tone).bullet_tails;
    let bullet_points: Vec<String> = first_bullets
        .into_iter()
        .chain(tails.iter().map(|t| t.to_string()))
        .collect();

    let meta = format!(
        "{} - {} {}. {}. Premium quality.",
        name,
        style,
        category.to_lowercase(),
        truncate_chars(&bullet_points[0], 80)
    );

    GenerationResult {
        title: truncate_chars(&title, MAX_TITLE_CHARS),
        description: paragraphs.join("\n\n"),
        bullet_points,
        meta_description: truncate_chars(&meta, MAX_META_CHARS),
        tone: request.tone,
        provider: LOCAL_PROVIDER.to_string(),
    }
}
