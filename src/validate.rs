//! Lexical guard against color hallucination in model output.
//!
//! Only words from [`COLOR_VOCABULARY`] are checked. Descriptive phrases and
//! synonyms outside the list pass through.

use std::collections::HashSet;

use serde_json::Value;

use crate::models::GenerationRequest;

pub const COLOR_VOCABULARY: &[&str] = &[
    "red", "blue", "green", "yellow", "orange", "purple", "pink", "brown",
    "white", "black", "gray", "grey", "beige", "navy", "maroon", "burgundy",
    "crimson", "scarlet", "teal", "turquoise", "violet", "indigo", "magenta",
    "cyan", "lavender", "ivory", "khaki", "olive", "charcoal",
];

/// Lowercased alphabetic words of `text`.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

fn is_color_word(word: &str) -> bool {
    COLOR_VOCABULARY.contains(&word)
}

/// Vocabulary colors the request itself puts on the table: the declared color
/// plus any color word already present in the name, materials or style.
fn declared_colors(request: &GenerationRequest) -> HashSet<String> {
    let mut declared: HashSet<String> = HashSet::new();
    let sources = request
        .declared_color()
        .into_iter()
        .chain(std::iter::once(request.product_name.as_str()))
        .chain(std::iter::once(request.style.as_str()))
        .chain(request.materials.iter().map(String::as_str));
    for source in sources {
        declared.extend(tokens(source).filter(|w| is_color_word(w)));
    }
    declared
}

/// Distinct vocabulary colors in `text`, in order of appearance.
pub fn color_words(text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for word in tokens(text) {
        if is_color_word(&word) && !found.contains(&word) {
            found.push(word);
        }
    }
    found
}

/// Vocabulary colors in `text` the request did not declare.
pub fn foreign_colors(text: &str, request: &GenerationRequest) -> Vec<String> {
    let declared = declared_colors(request);
    color_words(text).into_iter().filter(|w| !declared.contains(w)).collect()
}

fn field<'a>(parsed: &'a Value, key: &str) -> &'a str {
    parsed.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Accepts or rejects a parsed provider response. Never fails: missing or
/// mistyped fields count as empty.
pub fn accepts(parsed: &Value, request: &GenerationRequest) -> bool {
    let combined = format!("{} {}", field(parsed, "title"), field(parsed, "description"));
    let foreign = foreign_colors(&combined, request);
    if !foreign.is_empty() {
        tracing::warn!(?foreign, declared = ?request.declared_color(), "rejecting response with undeclared colors");
        return false;
    }
    true
}
