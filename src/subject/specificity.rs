//! Specificity validation for extracted subjects
//!
//! Checks run in a fixed precedence order and the first failure is reported.
//! A failure does not discard the candidate; the caller shows it with an edit
//! affordance instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::lane::Lane;
use crate::utils::text::contains_word;

/// Subjects longer than this are cut before validation
pub const MAX_SUBJECT_WORDS: usize = 8;
/// Tokens at least this long count as descriptive detail
pub const DETAIL_TOKEN_LEN: usize = 4;

pub const BRAND_NAMES: &[&str] = &[
    "apple", "samsung", "sony", "nike", "adidas", "dell", "hp", "lenovo", "asus", "acer",
    "logitech", "microsoft", "google", "amazon", "bose", "lg", "canon", "nikon", "dyson",
    "philips", "panasonic", "razer", "corsair", "fitbit", "garmin", "jbl", "beats", "anker",
    "xiaomi", "huawei", "oneplus", "nintendo", "ikea", "kitchenaid", "ninja", "keurig",
    "vitamix", "puma", "reebok", "levi's", "levis", "patagonia", "lego", "hasbro", "gopro",
    "instant pot", "under armour", "new balance", "the north face", "north face",
    "hewlett packard", "black+decker", "dewalt", "makita", "bosch", "whirlpool",
];

/// Terms that make a subject too broad wherever they appear as a whole word
pub const GENERIC_TERMS: &[&str] = &[
    "product", "products", "item", "items", "shop", "store", "deals", "deal", "sale",
    "electronics", "accessories", "clothing", "apparel", "category", "categories",
    "collection", "collections", "department", "new arrivals", "best sellers", "bestsellers",
    "gifts", "home page", "homepage", "health", "wellness", "news", "article", "blog",
    "tips", "guide", "overview", "information", "info", "misc", "miscellaneous", "stuff",
    "things", "everything",
];

/// Single-word informational subjects that name a field rather than a topic
pub const HEALTH_GENERIC_WORDS: &[&str] = &[
    "health", "wellness", "medicine", "medical", "nutrition", "fitness", "diet", "disease",
    "diseases", "symptoms", "treatment", "treatments", "conditions", "drugs", "supplements",
    "vitamins", "news", "article", "research", "science", "healthcare",
];

static UPPER_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2,5}\d*$").unwrap());
static UNIT_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d+(\.\d+)?(gb|tb|mb|mm|cm|in|inch|oz|ml|l|w|mah|hz|mp|k|ft|lb|lbs|g|kg|v|qt|pc|pcs|pack)$")
        .unwrap()
});
static ALNUM_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([a-z]+-?\d+[a-z0-9-]*|\d+[a-z]+[a-z0-9-]*)$").unwrap()
});
static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^v?\d+(\.\d+)*$").unwrap());

/// Machine-readable reason a subject needs confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificityFailure {
    Empty,
    BrandOnly,
    GenericSingleWord,
    TooFewWords,
    ContainsGenericTerm,
    LacksModelOrDetail,
}

impl SpecificityFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecificityFailure::Empty => "empty",
            SpecificityFailure::BrandOnly => "brand_only",
            SpecificityFailure::GenericSingleWord => "generic_single_word",
            SpecificityFailure::TooFewWords => "too_few_words",
            SpecificityFailure::ContainsGenericTerm => "contains_generic_term",
            SpecificityFailure::LacksModelOrDetail => "lacks_model_or_detail",
        }
    }
}

impl std::fmt::Display for SpecificityFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn tokens(subject: &str) -> Vec<&str> {
    subject
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '.' && c != '-'))
        .map(|t| t.trim_matches(|c: char| c == '.' || c == '-'))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Cut to [`MAX_SUBJECT_WORDS`] words.
pub fn truncate_words(subject: &str) -> String {
    subject
        .split_whitespace()
        .take(MAX_SUBJECT_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_brand(lower: &str) -> bool {
    BRAND_NAMES.contains(&lower)
}

/// Whole phrase is a brand, optionally pluralized or "the "-prefixed.
pub fn is_brand_phrase(subject: &str) -> bool {
    let lower = subject.trim().to_lowercase();
    let base = lower.strip_prefix("the ").unwrap_or(&lower).trim();
    if is_brand(base) || is_brand(&lower) {
        return true;
    }
    let singular = base
        .strip_suffix("'s")
        .or_else(|| base.strip_suffix("es"))
        .or_else(|| base.strip_suffix('s'));
    singular.is_some_and(|s| is_brand(s.trim()))
        || base.strip_suffix('s').is_some_and(|s| is_brand(s.trim()))
}

/// Token looks like a model or variant code (`M2`, `128GB`, `RTX`, `15`, `2.0`).
pub fn is_model_token(token: &str) -> bool {
    UPPER_CODE_RE.is_match(token)
        || UNIT_CODE_RE.is_match(token)
        || ALNUM_CODE_RE.is_match(token)
        || VERSION_RE.is_match(token)
}

/// Validate a (truncated) candidate for `lane`; `None` means it passes.
pub fn validate(lane: Lane, subject: &str) -> Option<SpecificityFailure> {
    let subject = subject.trim();
    if subject.is_empty() {
        return Some(SpecificityFailure::Empty);
    }
    let toks = tokens(subject);
    if toks.is_empty() {
        return Some(SpecificityFailure::Empty);
    }
    let lower = subject.to_lowercase();

    if toks.len() == 1 {
        let word = toks[0].to_lowercase();
        match lane {
            Lane::Commerce if is_brand_phrase(&word) => {
                return Some(SpecificityFailure::BrandOnly);
            }
            Lane::Commerce if GENERIC_TERMS.contains(&word.as_str()) => {
                return Some(SpecificityFailure::ContainsGenericTerm);
            }
            Lane::Informational if HEALTH_GENERIC_WORDS.contains(&word.as_str()) => {
                return Some(SpecificityFailure::GenericSingleWord);
            }
            _ => {}
        }
    }
    if toks.len() < 2 {
        return Some(SpecificityFailure::TooFewWords);
    }
    if GENERIC_TERMS.iter().any(|term| contains_word(&lower, term)) {
        return Some(SpecificityFailure::ContainsGenericTerm);
    }
    if lane == Lane::Commerce && is_brand_phrase(subject) {
        return Some(SpecificityFailure::BrandOnly);
    }

    let has_model = toks.iter().any(|t| is_model_token(t));
    let detail_tokens = toks
        .iter()
        .filter(|t| t.chars().count() >= DETAIL_TOKEN_LEN)
        .count();
    if !has_model && detail_tokens < 2 {
        return Some(SpecificityFailure::LacksModelOrDetail);
    }
    None
}
