use crate::models::{truncate_chars, GenerationResult, KeywordSet, Platform};

fn bullets(points: &[String], max: usize) -> String {
    points.iter().take(max).map(|bp| format!("• {}", bp)).collect::<Vec<_>>().join("\n")
}

fn joined(keywords: &[String], max: usize) -> String {
    keywords.iter().take(max).cloned().collect::<Vec<_>>().join(", ")
}

/// Renders the listing in the field order and length limits of one marketplace.
pub fn format_listing(result: &GenerationResult, keywords: &KeywordSet, platform: Platform) -> String {
    match platform {
        Platform::Shopify => format!(
            "PRODUCT TITLE:\n{}\n\nDESCRIPTION:\n{}\n\nKEY FEATURES:\n{}\n\nMETA DESCRIPTION:\n{}\n\nPRODUCT TAGS:\n{}\n\nSEO KEYWORDS:\n{}",
            result.title,
            result.description,
            bullets(&result.bullet_points, usize::MAX),
            result.meta_description,
            joined(&keywords.primary, 10),
            joined(&keywords.long_tail, 8),
        ),
        Platform::Amazon => format!(
            "PRODUCT TITLE (max 200 characters):\n{}\n\nBULLET POINTS (5 maximum):\n{}\n\nPRODUCT DESCRIPTION:\n{}\n\nBACKEND SEARCH TERMS:\n{}\n\nADDITIONAL KEYWORDS:\n{}",
            truncate_chars(&result.title, 200),
            bullets(&result.bullet_points, 5),
            truncate_chars(&result.description, 2000),
            joined(&keywords.primary, 7),
            joined(&keywords.long_tail, 10),
        ),
        Platform::Etsy => format!(
            "LISTING TITLE (max 140 characters):\n{}\n\nABOUT THIS ITEM:\n{}\n\nITEM DETAILS:\n{}\n\nTAGS (max 13 tags):\n{}\n\nSHOP SECTION:\n{}",
            truncate_chars(&result.title, 140),
            result.description,
            bullets(&result.bullet_points, usize::MAX),
            joined(&keywords.primary, 13),
            keywords.primary.first().map(String::as_str).unwrap_or("Products"),
        ),
        Platform::WooCommerce => format!(
            "PRODUCT NAME:\n{}\n\nSHORT DESCRIPTION:\n{}\n\nFULL DESCRIPTION:\n{}\n\nPRODUCT FEATURES:\n{}\n\nSEO TITLE:\n{}\n\nSEO META DESCRIPTION:\n{}\n\nFOCUS KEYWORDS:\n{}",
            result.title,
            result.meta_description,
            result.description,
            bullets(&result.bullet_points, usize::MAX),
            result.title,
            result.meta_description,
            joined(&keywords.primary, 5),
        ),
    }
}
