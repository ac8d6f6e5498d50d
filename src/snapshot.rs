//! Content snapshots and the parsed page view shared by every pipeline stage
//!
//! A [`ContentSnapshot`] is the owned, `Send` payload handed over by the page
//! collaborator. Stages never hold it in parsed form across an await point;
//! instead they build a [`PageView`] synchronously, query it, and drop it.

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::utils::text::{compact_ws, element_text, truncate_chars};
use crate::utils::url::normalize_host;

/// Cap on the raw visible text carried by a snapshot
pub const MAX_VISIBLE_TEXT_CHARS: usize = 5_000;

/// Current URL, rendered markup and capped visible text of a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentSnapshot {
    pub url: String,
    pub html: String,
    #[serde(default)]
    pub visible_text: String,
}

impl ContentSnapshot {
    pub fn new(
        url: impl Into<String>,
        html: impl Into<String>,
        visible_text: impl AsRef<str>,
    ) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            visible_text: truncate_chars(visible_text.as_ref(), MAX_VISIBLE_TEXT_CHARS).to_string(),
        }
    }

    /// Build a snapshot whose visible text is derived from the markup body.
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let text = {
            let doc = Html::parse_document(&html);
            match Selector::parse("body") {
                Ok(sel) => doc
                    .select(&sel)
                    .next()
                    .map(element_text)
                    .unwrap_or_default(),
                Err(_) => String::new(),
            }
        };
        Self::new(url, html, text)
    }
}

/// Source of page snapshots for the orchestrator
pub trait SnapshotProvider: Send + Sync {
    fn snapshot(&self) -> Result<ContentSnapshot>;
}

/// Provider that always returns the same snapshot, swappable at runtime
#[derive(Debug, Default)]
pub struct StaticSnapshot {
    inner: std::sync::RwLock<Option<ContentSnapshot>>,
}

impl StaticSnapshot {
    pub fn new(snapshot: ContentSnapshot) -> Self {
        Self {
            inner: std::sync::RwLock::new(Some(snapshot)),
        }
    }

    /// Replace the current page (simulates navigation).
    pub fn replace(&self, snapshot: ContentSnapshot) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(snapshot);
        }
    }
}

impl SnapshotProvider for StaticSnapshot {
    fn snapshot(&self) -> Result<ContentSnapshot> {
        let guard = self
            .inner
            .read()
            .map_err(|_| crate::error::ChipGateError::snapshot("snapshot lock poisoned"))?;
        guard
            .clone()
            .ok_or_else(|| crate::error::ChipGateError::snapshot("no page loaded"))
    }
}

/// Parsed, queryable form of a snapshot
pub struct PageView<'a> {
    pub snapshot: &'a ContentSnapshot,
    pub doc: Html,
    pub url: Option<Url>,
    /// Lower-case host with presentation prefixes removed
    pub host: String,
    /// Lower-case path, always starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl<'a> PageView<'a> {
    pub fn parse(snapshot: &'a ContentSnapshot) -> Self {
        let doc = Html::parse_document(&snapshot.html);
        let url = Url::parse(snapshot.url.trim()).ok();
        let (host, path, query) = match &url {
            Some(u) => (
                u.host_str().map(normalize_host).unwrap_or_default(),
                u.path().to_ascii_lowercase(),
                u.query_pairs()
                    .map(|(k, v)| (k.to_ascii_lowercase(), v.into_owned()))
                    .collect(),
            ),
            None => (String::new(), "/".to_string(), Vec::new()),
        };
        Self {
            snapshot,
            doc,
            url,
            host,
            path,
            query,
        }
    }

    pub fn visible_text(&self) -> &str {
        &self.snapshot.visible_text
    }

    /// Non-empty path segments.
    pub fn path_segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    pub fn has_query_param(&self, name: &str) -> bool {
        self.query.iter().any(|(k, v)| k == name && !v.is_empty())
    }

    /// Host equals `domain` or is a subdomain of it.
    pub fn host_matches(&self, domain: &str) -> bool {
        self.host == domain || self.host.ends_with(&format!(".{domain}"))
    }

    /// All elements matching `css`; an invalid selector matches nothing.
    pub fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(sel) => self.doc.select(&sel).collect(),
            Err(_) => {
                tracing::trace!("invalid selector skipped: {}", css);
                Vec::new()
            }
        }
    }

    pub fn count(&self, css: &str) -> usize {
        match Selector::parse(css) {
            Ok(sel) => self.doc.select(&sel).count(),
            Err(_) => 0,
        }
    }

    pub fn exists(&self, css: &str) -> bool {
        match Selector::parse(css) {
            Ok(sel) => self.doc.select(&sel).next().is_some(),
            Err(_) => false,
        }
    }

    /// Compacted text of the first non-empty match.
    pub fn first_text(&self, css: &str) -> Option<String> {
        self.select(css)
            .into_iter()
            .map(element_text)
            .find(|t| !t.is_empty())
    }

    /// Content of `<meta property=..>` or `<meta name=..>`.
    pub fn meta(&self, key: &str) -> Option<String> {
        let css = format!("meta[property=\"{key}\"], meta[name=\"{key}\"]");
        self.select(&css)
            .into_iter()
            .filter_map(|m| m.value().attr("content"))
            .map(compact_ws)
            .find(|c| !c.is_empty())
    }

    pub fn title(&self) -> Option<String> {
        self.first_text("title")
    }

    /// Every JSON-LD node on the page, with arrays and `@graph` flattened.
    ///
    /// Blocks that fail to parse are skipped.
    pub fn json_ld(&self) -> Vec<Value> {
        let mut nodes = Vec::new();
        for script in self.select("script[type=\"application/ld+json\"]") {
            let raw: String = script.text().collect();
            match serde_json::from_str::<Value>(raw.trim()) {
                Ok(value) => flatten_ld(value, &mut nodes),
                Err(e) => tracing::trace!("malformed ld+json block ignored: {}", e),
            }
        }
        nodes
    }

    /// First JSON-LD node whose `@type` is one of `types` (case-insensitive).
    pub fn json_ld_of_type(&self, types: &[&str]) -> Option<Value> {
        self.json_ld()
            .into_iter()
            .find(|node| ld_type_matches(node, types))
    }

    pub fn json_ld_has_type(&self, types: &[&str]) -> bool {
        self.json_ld_of_type(types).is_some()
    }
}

fn flatten_ld(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                flatten_ld(item, out);
            }
        }
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_ld(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

/// `@type` may be a string or an array of strings.
pub fn ld_type_matches(node: &Value, types: &[&str]) -> bool {
    let matches = |t: &str| types.iter().any(|want| t.eq_ignore_ascii_case(want));
    match node.get("@type") {
        Some(Value::String(t)) => matches(t),
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}
