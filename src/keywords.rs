use serde_json::Value;

use crate::models::{truncate_chars, GenerationRequest, KeywordSet};
use crate::synthesis::{category_profile, DEFAULT_STYLE};
use crate::validate::foreign_colors;

const PRIMARY_COUNT: usize = 7;
const LONG_TAIL_COUNT: usize = 10;
const PROMPT_DESCRIPTION_CHARS: usize = 300;

fn push_unique(list: &mut Vec<String>, keyword: String) {
    let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
    if !keyword.is_empty() && !list.contains(&keyword) {
        list.push(keyword);
    }
}

/// Primary and long-tail search keywords built from the product attributes.
pub fn generate_keywords(request: &GenerationRequest) -> KeywordSet {
    let name = request.product_name.trim().to_lowercase();
    let name = if name.is_empty() { "product".to_string() } else { name };
    let style = match request.style.trim() {
        "" => DEFAULT_STYLE.to_lowercase(),
        s => s.to_lowercase(),
    };
    let profile = category_profile(&request.category);
    let category = match request.category.trim() {
        "" => profile.category.to_lowercase(),
        c => c.to_lowercase(),
    };
    let material = request
        .materials
        .iter()
        .map(|m| m.trim())
        .find(|m| !m.is_empty())
        .unwrap_or(profile.materials[0])
        .to_lowercase();
    let color = request.declared_color().map(str::to_lowercase);

    let mut primary = Vec::with_capacity(PRIMARY_COUNT);
    push_unique(&mut primary, name.clone());
    push_unique(&mut primary, format!("{} {}", style, name));
    push_unique(&mut primary, format!("premium {}", name));
    push_unique(&mut primary, format!("best {}", name));
    push_unique(&mut primary, format!("{} {}", material, name));
    if let Some(color) = &color {
        push_unique(&mut primary, format!("{} {}", color, name));
    }
    push_unique(&mut primary, format!("professional {}", name));
    push_unique(&mut primary, format!("high quality {}", name));
    primary.truncate(PRIMARY_COUNT);

    let mut long_tail = Vec::with_capacity(LONG_TAIL_COUNT);
    push_unique(&mut long_tail, format!("buy {} online", name));
    push_unique(&mut long_tail, format!("best {} for sale", name));
    push_unique(&mut long_tail, format!("where to buy {}", name));
    push_unique(&mut long_tail, format!("{} {} reviews", style, name));
    let audience = request
        .target_audience
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty() && foreign_colors(a, request).is_empty());
    if let Some(audience) = audience {
        push_unique(&mut long_tail, format!("{} for {}", name, audience.to_lowercase()));
    }
    push_unique(&mut long_tail, format!("affordable {}", name));
    push_unique(&mut long_tail, format!("professional grade {}", name));
    push_unique(&mut long_tail, format!("{} with {}", name, material));
    push_unique(&mut long_tail, format!("durable {}", name));
    push_unique(&mut long_tail, format!("top rated {}", name));
    push_unique(&mut long_tail, format!("{} {}", category, name));
    long_tail.truncate(LONG_TAIL_COUNT);

    KeywordSet { primary, long_tail }
}

/// Prompt asking a model for the same two keyword lists.
pub fn keyword_prompt(request: &GenerationRequest, description: &str) -> String {
    let mut lines = vec![
        "Generate SEO keywords for this product listing.".to_string(),
        String::new(),
        format!("Product: {}", request.product_name.trim()),
    ];
    if !request.category.trim().is_empty() {
        lines.push(format!("Category: {}", request.category.trim()));
    }
    let description = truncate_chars(description.trim(), PROMPT_DESCRIPTION_CHARS);
    if !description.is_empty() {
        lines.push(format!("Description: {}", description));
    }
    match request.declared_color() {
        Some(color) => lines.push(format!("Color: {} (the only color keywords may mention)", color)),
        None => lines.push("Do not include any color in the keywords.".to_string()),
    }
    lines.push(String::new());
    lines.push(format!(
        "Generate primary keywords ({} items) and long-tail keywords ({} items).",
        PRIMARY_COUNT, LONG_TAIL_COUNT
    ));
    lines.push(String::new());
    lines.push("Respond ONLY with valid JSON:".to_string());
    lines.push(r#"{"primary": ["keyword1", "keyword2"], "long_tail": ["long tail phrase 1", "long tail phrase 2"]}"#.to_string());
    lines.join("\n")
}

/// Keyword lists from a parsed model answer, normalized and capped.
/// `None` when there are no primary keywords.
pub fn keywords_from_json(parsed: &Value) -> Option<KeywordSet> {
    let list = |key: &str, cap: usize| {
        let mut out = Vec::with_capacity(cap);
        if let Some(Value::Array(items)) = parsed.get(key) {
            for item in items.iter().filter_map(Value::as_str) {
                push_unique(&mut out, item.to_lowercase());
            }
        }
        out.truncate(cap);
        out
    };
    let primary = list("primary", PRIMARY_COUNT);
    if primary.is_empty() {
        return None;
    }
    Some(KeywordSet { primary, long_tail: list("long_tail", LONG_TAIL_COUNT) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_seven_primary_and_ten_long_tail() {
        let request = GenerationRequest {
            product_name: "Yoga  Mat".into(),
            category: "Sports & Outdoors".into(),
            style: "Minimalist".into(),
            materials: vec!["Natural Rubber".into()],
            ..Default::default()
        };
        let keywords = generate_keywords(&request);
        assert_eq!(
            keywords.primary,
            vec![
                "yoga mat",
                "minimalist yoga mat",
                "premium yoga mat",
                "best yoga mat",
                "natural rubber yoga mat",
                "professional yoga mat",
                "high quality yoga mat",
            ]
        );
        assert_eq!(keywords.long_tail.len(), 10);
        assert_eq!(keywords.long_tail[0], "buy yoga mat online");
        assert_eq!(keywords.long_tail[9], "sports & outdoors yoga mat");
    }

    #[test]
    fn color_and_audience_take_precedence() {
        let request = GenerationRequest {
            product_name: "Desk Lamp".into(),
            color: Some("Black".into()),
            target_audience: Some("Students".into()),
            ..Default::default()
        };
        let keywords = generate_keywords(&request);
        assert_eq!(keywords.primary.len(), 7);
        assert!(keywords.primary.contains(&"black desk lamp".to_string()));
        assert!(keywords.primary.contains(&"premium material desk lamp".to_string()));
        assert!(!keywords.primary.contains(&"high quality desk lamp".to_string()));
        assert!(keywords.long_tail.contains(&"desk lamp for students".to_string()));
        assert_eq!(keywords.long_tail.len(), 10);
        assert!(!keywords.long_tail.contains(&"general product desk lamp".to_string()));
    }

    #[test]
    fn audience_naming_another_color_is_left_out() {
        let request = GenerationRequest {
            product_name: "Desk Lamp".into(),
            color: Some("Black".into()),
            target_audience: Some("fans of green living".into()),
            ..Default::default()
        };
        let keywords = generate_keywords(&request);
        assert!(keywords.long_tail.iter().all(|k| !k.contains("green")));
        assert_eq!(keywords.long_tail.len(), 10);
    }

    #[test]
    fn model_keywords_are_normalized_and_capped() {
        let parsed = serde_json::json!({
            "primary": ["Desk Lamp", "desk  lamp", "LED lamp", 7, "", "a", "b", "c", "d", "e", "f"],
            "long_tail": "not a list"
        });
        let keywords = keywords_from_json(&parsed).unwrap();
        assert_eq!(keywords.primary, vec!["desk lamp", "led lamp", "a", "b", "c", "d", "e"]);
        assert!(keywords.long_tail.is_empty());
        assert_eq!(keywords_from_json(&serde_json::json!({"long_tail": ["x"]})), None);
    }

    #[test]
    fn keyword_prompt_caps_description_and_pins_color() {
        let request = GenerationRequest {
            product_name: "Desk Lamp".into(),
            category: "Home & Kitchen".into(),
            color: Some("Black".into()),
            ..Default::default()
        };
        let prompt = keyword_prompt(&request, &"x".repeat(400));
        assert!(prompt.contains(&format!("Description: {}\n", "x".repeat(300))));
        assert!(prompt.contains("Color: Black"));
        assert!(prompt.contains("primary keywords (7 items)"));
    }

    #[test]
    fn duplicates_are_dropped() {
        let request = GenerationRequest { product_name: "Premium".into(), style: "premium".into(), ..Default::default() };
        let keywords = generate_keywords(&request);
        let mut deduped = keywords.primary.clone();
        deduped.dedup();
        assert_eq!(deduped, keywords.primary);
        assert_eq!(keywords.primary.iter().filter(|k| *k == "premium premium").count(), 1);
    }
}
