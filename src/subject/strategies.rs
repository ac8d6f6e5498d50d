//! Generic acquisition strategies, tried in order after site adapters

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::detect;
use crate::lane::Lane;
use crate::snapshot::PageView;
use crate::utils::text::{compact_ws, element_text};

/// Strategy name plus the function that tries it
pub type Strategy = (&'static str, fn(&PageView<'_>, Lane) -> Option<String>);

/// Ordered fallback chain; the page title is always last.
pub const CHAIN: &[Strategy] = &[
    ("json_ld", structured_name),
    ("og_title", social_title),
    ("heading", nearby_heading),
    ("breadcrumb", last_breadcrumb),
    ("url_slug", url_slug),
    ("page_title", page_title),
];

/// Methods whose output is considered high-precision
pub const HIGH_PRECISION_METHODS: &[&str] = &["json_ld", "og_title", "heading"];

static SITE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+[|\-–—:·»]\s+[^|\-–—:·»]{1,60}$").unwrap());
static YEAR_PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[(\[]\s*(19|20)\d{2}\s*[)\]]").unwrap());
static LEADING_BUY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(buy|shop|order)\s+").unwrap());
static TRAILING_REVIEW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(reviews?|for sale|online)$").unwrap());
static BREADCRUMB_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[>›»/|]\s*").unwrap());
static UUID_LIKE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{8}(-[0-9a-f]{4}){3}-[0-9a-f]{12}$").unwrap());

const SLUG_MARKERS: &[&str] = &[
    "dp", "gp", "p", "ip", "itm", "item", "product", "products", "pd", "sku", "site", "en",
    "en-us", "us", "amp", "index",
];

/// Strip site suffixes, parenthesized years, leading "Buy" and trailing "Reviews".
///
/// Suffix stripping repeats so "Name - Brand | Store" reduces to "Name".
pub fn clean_title(raw: &str) -> String {
    let mut title = compact_ws(raw);
    title = YEAR_PAREN_RE.replace_all(&title, "").to_string();
    for _ in 0..3 {
        let stripped = SITE_SUFFIX_RE.replace(&title, "").to_string();
        if stripped == title || stripped.trim().is_empty() {
            break;
        }
        title = stripped;
    }
    title = LEADING_BUY_RE.replace(&title, "").to_string();
    title = TRAILING_REVIEW_RE.replace(&title, "").to_string();
    compact_ws(title.trim_matches(|c: char| c.is_whitespace() || matches!(c, '|' | '-' | ':')))
}

/// Whitespace-compacted text, if any remains.
pub fn non_empty(s: String) -> Option<String> {
    let compacted = compact_ws(&s);
    (!compacted.is_empty()).then_some(compacted)
}

/// Title-shaped text with site suffixes and shop boilerplate removed.
fn cleaned(s: String) -> Option<String> {
    let title = clean_title(&s);
    (!title.is_empty()).then_some(title)
}

fn ld_string(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Structured-data `name` / `headline`, taken as written.
pub fn structured_name(view: &PageView<'_>, lane: Lane) -> Option<String> {
    match lane {
        Lane::Commerce => view
            .json_ld_of_type(detect::PRODUCT_TYPES)
            .and_then(|node| ld_string(&node, "name"))
            .or_else(|| view.first_text("[itemtype*=\"schema.org/Product\"] [itemprop=\"name\"]"))
            .and_then(non_empty),
        Lane::Informational => view
            .json_ld_of_type(detect::ARTICLE_TYPES)
            .and_then(|node| ld_string(&node, "headline").or_else(|| ld_string(&node, "name")))
            .or_else(|| view.first_text("[itemprop=\"headline\"]"))
            .and_then(non_empty),
    }
}

/// Social preview title (`og:title`, then `twitter:title`).
pub fn social_title(view: &PageView<'_>, _lane: Lane) -> Option<String> {
    view.meta("og:title")
        .or_else(|| view.meta("twitter:title"))
        .and_then(cleaned)
}

/// Heading near commerce markers (product lane) or inside the article container.
pub fn nearby_heading(view: &PageView<'_>, lane: Lane) -> Option<String> {
    match lane {
        Lane::Commerce => {
            let markers: Vec<_> = detect::price_elements(view)
                .into_iter()
                .chain(detect::cart_elements(view))
                .collect();
            if markers.is_empty() {
                return None;
            }
            let radius = detect::ADJACENCY_RADIUS + 1;
            let scope: HashSet<_> = markers
                .iter()
                .flat_map(|m| detect::local_ancestors(*m, radius).map(|e| e.id()))
                .collect();
            view.select("h1, h2")
                .into_iter()
                .find(|h| detect::local_ancestors(*h, radius).any(|e| scope.contains(&e.id())))
                .map(element_text)
                .and_then(non_empty)
        }
        Lane::Informational => {
            let css = detect::ARTICLE_CONTAINER_SELECTOR
                .split(',')
                .map(|s| format!("{} h1", s.trim()))
                .collect::<Vec<_>>()
                .join(", ");
            view.first_text(&css).and_then(non_empty)
        }
    }
}

/// Last breadcrumb segment, from markup or a JSON-LD `BreadcrumbList`.
pub fn last_breadcrumb(view: &PageView<'_>, _lane: Lane) -> Option<String> {
    let item_css = "nav[aria-label*=\"readcrumb\"] li, .breadcrumb li, .breadcrumbs li, \
                    ol.breadcrumb li, [itemtype*=\"BreadcrumbList\"] [itemprop=\"name\"]";
    let items: Vec<String> = view
        .select(item_css)
        .into_iter()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    if let Some(last) = items.last() {
        return last_crumb_piece(last).and_then(non_empty);
    }

    if let Some(text) = view.first_text(".breadcrumb, .breadcrumbs, nav[aria-label*=\"readcrumb\"]") {
        return last_crumb_piece(&text).and_then(non_empty);
    }

    view.json_ld_of_type(&["BreadcrumbList"])
        .and_then(|node| {
            node.get("itemListElement")?
                .as_array()?
                .iter()
                .filter_map(|item| {
                    ld_string(item, "name")
                        .or_else(|| item.get("item").and_then(|i| ld_string(i, "name")))
                })
                .last()
        })
        .and_then(non_empty)
}

fn last_crumb_piece(text: &str) -> Option<String> {
    BREADCRUMB_SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .last()
        .map(str::to_string)
}

/// Last meaningful URL path segment, de-slugged and title-cased.
pub fn url_slug(view: &PageView<'_>, _lane: Lane) -> Option<String> {
    let url = view.url.as_ref()?;
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    segments
        .iter()
        .rev()
        .map(|seg| {
            seg.trim_end_matches(".html")
                .trim_end_matches(".htm")
                .trim_end_matches(".aspx")
        })
        .filter(|seg| !SLUG_MARKERS.contains(&seg.to_ascii_lowercase().as_str()))
        .filter(|seg| !is_opaque_segment(seg))
        .find(|seg| seg.chars().filter(|c| c.is_alphabetic()).count() >= 3)
        .map(de_slug)
        .and_then(non_empty)
}

/// Numeric ids, SKU/ASIN-like codes and UUIDs carry no subject.
fn is_opaque_segment(seg: &str) -> bool {
    if seg.chars().all(|c| c.is_ascii_digit()) || UUID_LIKE_RE.is_match(seg) {
        return true;
    }
    let has_separator = seg.contains(['-', '_']);
    !has_separator && seg.len() >= 8 && seg.chars().any(|c| c.is_ascii_digit())
}

fn de_slug(segment: &str) -> String {
    let decoded = segment.replace("%20", " ");
    decoded
        .split(['-', '_', '+', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Document title, cleaned. Terminal fallback.
pub fn page_title(view: &PageView<'_>, _lane: Lane) -> Option<String> {
    view.title().and_then(cleaned)
}
