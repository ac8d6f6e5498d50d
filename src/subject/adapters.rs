//! Per-site extraction adapters
//!
//! A static map from normalized host to a small capability record. Hosts with
//! no adapter simply fall through to the generic strategies.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::lane::Lane;
use crate::snapshot::PageView;

pub type AdapterFn = fn(&PageView<'_>) -> Option<String>;

/// High-precision readers for one site
#[derive(Clone, Copy, Default)]
pub struct SiteAdapter {
    pub product_name: Option<AdapterFn>,
    pub health_topic: Option<AdapterFn>,
}

impl SiteAdapter {
    pub fn for_lane(&self, lane: Lane) -> Option<AdapterFn> {
        match lane {
            Lane::Commerce => self.product_name,
            Lane::Informational => self.health_topic,
        }
    }
}

fn first_of(view: &PageView<'_>, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| view.first_text(css))
}

fn amazon_product(view: &PageView<'_>) -> Option<String> {
    first_of(view, &["#productTitle", "#title span", "h1#title"])
}

fn bestbuy_product(view: &PageView<'_>) -> Option<String> {
    first_of(view, &[".sku-title h1", "h1.heading-5", "[data-testid=\"product-title\"]"])
}

fn walmart_product(view: &PageView<'_>) -> Option<String> {
    first_of(view, &["h1[itemprop=\"name\"]", "#main-title", "h1[data-automation-id=\"product-title\"]"])
}

fn target_product(view: &PageView<'_>) -> Option<String> {
    first_of(view, &["h1[data-test=\"product-title\"]", "#pdp-product-title-id"])
}

fn ebay_product(view: &PageView<'_>) -> Option<String> {
    first_of(view, &["h1.x-item-title__mainTitle", "#itemTitle", ".x-item-title h1"])
}

fn mayoclinic_topic(view: &PageView<'_>) -> Option<String> {
    first_of(view, &[".main h1", "#main-content h1", "h1"])
}

fn webmd_topic(view: &PageView<'_>) -> Option<String> {
    first_of(view, &["h1[itemprop=\"headline\"]", ".article__title h1", "h1"])
}

fn healthline_topic(view: &PageView<'_>) -> Option<String> {
    first_of(view, &["article h1", "h1"])
}

fn medlineplus_topic(view: &PageView<'_>) -> Option<String> {
    first_of(view, &["h1.with-also", ".page-title h1", "h1"])
}

fn clevelandclinic_topic(view: &PageView<'_>) -> Option<String> {
    first_of(view, &["[data-identity=\"headline\"]", "h1"])
}

static ADAPTERS: Lazy<HashMap<&'static str, SiteAdapter>> = Lazy::new(|| {
    let product = |f: AdapterFn| SiteAdapter {
        product_name: Some(f),
        health_topic: None,
    };
    let health = |f: AdapterFn| SiteAdapter {
        product_name: None,
        health_topic: Some(f),
    };
    HashMap::from([
        ("amazon.com", product(amazon_product)),
        ("amazon.co.uk", product(amazon_product)),
        ("bestbuy.com", product(bestbuy_product)),
        ("walmart.com", product(walmart_product)),
        ("target.com", product(target_product)),
        ("ebay.com", product(ebay_product)),
        ("mayoclinic.org", health(mayoclinic_topic)),
        ("webmd.com", health(webmd_topic)),
        ("healthline.com", health(healthline_topic)),
        ("medlineplus.gov", health(medlineplus_topic)),
        ("nih.gov", health(medlineplus_topic)),
        ("clevelandclinic.org", health(clevelandclinic_topic)),
    ])
});

/// Adapter for a normalized host, trying parent domains (`nlm.nih.gov` → `nih.gov`).
pub fn lookup(host: &str) -> Option<&'static SiteAdapter> {
    let mut candidate = host;
    loop {
        if let Some(adapter) = ADAPTERS.get(candidate) {
            return Some(adapter);
        }
        let (_, parent) = candidate.split_once('.')?;
        if !parent.contains('.') {
            return None;
        }
        candidate = parent;
    }
}

/// Run the adapter for the page's host and lane, if any.
///
/// Returns the adapter key used, for the extraction method label.
pub fn run(view: &PageView<'_>, lane: Lane) -> Option<(String, String)> {
    let adapter = lookup(&view.host)?;
    let read = adapter.for_lane(lane)?;
    let value = read(view)?;
    Some((view.host.clone(), value))
}
