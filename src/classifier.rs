//! Page archetype classification
//!
//! Rules are evaluated in a fixed order and the first match wins. Categories
//! overlap (a product grid looks superficially like a product page), so the
//! order below is load-bearing.

use serde::{Deserialize, Serialize};

use crate::detect;
use crate::snapshot::PageView;

/// Minimum repeated result items for DOM-based search detection
pub const MIN_SEARCH_RESULTS: usize = 3;
/// Outbound link count that, together with a search box, marks a results page
pub const SEARCH_OUTBOUND_LINKS: usize = 40;
/// Distinct feed containers required for a feed page
pub const MIN_FEED_SIGNATURES: usize = 2;
/// Product cards required for a listing without other evidence
pub const MIN_LISTING_CARDS: usize = 6;

/// Page archetype for the current document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageArchetype {
    SearchResults,
    Portal,
    CategoryListing,
    Product,
    Article,
    Ambiguous,
}

impl PageArchetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageArchetype::SearchResults => "search_results",
            PageArchetype::Portal => "portal",
            PageArchetype::CategoryListing => "category_listing",
            PageArchetype::Product => "product",
            PageArchetype::Article => "article",
            PageArchetype::Ambiguous => "ambiguous",
        }
    }

    /// Archetypes on which no lane may ever offer a chip.
    pub fn is_excluded(&self) -> bool {
        matches!(
            self,
            PageArchetype::SearchResults
                | PageArchetype::Portal
                | PageArchetype::CategoryListing
                | PageArchetype::Ambiguous
        )
    }
}

/// Classification plus the rule and evidence that produced it
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    /// Archetype as seen by the rest of the pipeline (listings resolve to `Portal`)
    pub archetype: PageArchetype,
    /// Rule that fired, before listing resolution
    pub rule: PageArchetype,
    pub evidence: Vec<String>,
}

impl Classification {
    fn matched(rule: PageArchetype, evidence: Vec<String>) -> Self {
        let archetype = match rule {
            PageArchetype::CategoryListing => PageArchetype::Portal,
            other => other,
        };
        Self {
            archetype,
            rule,
            evidence,
        }
    }
}

/// Classify a page. Total: every input yields exactly one archetype.
pub fn classify(view: &PageView<'_>) -> PageArchetype {
    classify_detailed(view).archetype
}

pub fn classify_detailed(view: &PageView<'_>) -> Classification {
    let rules: [(PageArchetype, fn(&PageView<'_>) -> Option<String>); 5] = [
        (PageArchetype::SearchResults, search_results_evidence),
        (PageArchetype::Portal, portal_evidence),
        (PageArchetype::CategoryListing, listing_evidence),
        (PageArchetype::Product, product_evidence),
        (PageArchetype::Article, article_evidence),
    ];

    for (archetype, rule) in rules {
        if let Some(evidence) = rule(view) {
            tracing::trace!(
                "classified {} as {} ({})",
                view.host,
                archetype.as_str(),
                evidence
            );
            return Classification::matched(archetype, vec![evidence]);
        }
    }
    Classification::matched(PageArchetype::Ambiguous, Vec::new())
}

fn search_results_evidence(view: &PageView<'_>) -> Option<String> {
    if detect::is_search_engine(view) {
        return Some(format!("search_engine_host:{}", view.host));
    }
    if detect::search_query_in_url(view) {
        return Some("search_query_url".to_string());
    }
    let results = detect::repeated_search_results(view);
    if results >= MIN_SEARCH_RESULTS {
        return Some(format!("repeated_results:{results}"));
    }
    if view.exists(detect::SEARCH_INPUT_SELECTOR) {
        let outbound = detect::outbound_link_count(view);
        if outbound > SEARCH_OUTBOUND_LINKS {
            return Some(format!("search_box_outbound_links:{outbound}"));
        }
    }
    None
}

fn portal_evidence(view: &PageView<'_>) -> Option<String> {
    if detect::host_in(view, detect::PORTAL_HOSTS) && detect::is_root_or_section(view) {
        return Some(format!("portal_host:{}", view.host));
    }
    if detect::host_in(view, detect::NEWS_HOSTS) && detect::is_news_section(view) {
        return Some(format!("news_section:{}", view.path));
    }
    if detect::host_in(view, detect::ECOMMERCE_HOSTS) && view.path_segments().is_empty() {
        return Some(format!("ecommerce_home:{}", view.host));
    }
    if detect::is_social_feed(view) {
        return Some("social_feed_url".to_string());
    }
    let feeds = detect::feed_signature_count(view);
    if feeds >= MIN_FEED_SIGNATURES {
        return Some(format!("feed_containers:{feeds}"));
    }
    None
}

fn listing_evidence(view: &PageView<'_>) -> Option<String> {
    if detect::category_url_pattern(view) {
        return Some("category_url".to_string());
    }
    let cards = detect::product_card_count(view);
    if cards >= MIN_LISTING_CARDS {
        return Some(format!("product_cards:{cards}"));
    }
    if cards > 0 && detect::has_pagination(view) {
        return Some(format!("paginated_cards:{cards}"));
    }
    None
}

fn product_evidence(view: &PageView<'_>) -> Option<String> {
    // Listing URLs were already consumed by the previous rule.
    if detect::product_url_pattern(view) {
        return Some("product_url".to_string());
    }
    if detect::has_product_schema(view) {
        return Some("product_schema".to_string());
    }
    if detect::price_cart_adjacent(view) {
        return Some("price_cart_adjacency".to_string());
    }
    if detect::title_price_buy(view) {
        return Some("title_price_buy".to_string());
    }
    None
}

fn article_evidence(view: &PageView<'_>) -> Option<String> {
    let article_shape = detect::has_article_container(view) && view.exists("h1");
    if detect::host_in(view, detect::HEALTH_HOSTS) && view.path_segments().len() >= 2 {
        return Some(format!("health_domain_article:{}", view.host));
    }
    if detect::health_path_pattern(view) && (article_shape || detect::has_byline_or_timestamp(view))
    {
        return Some("health_path_article".to_string());
    }
    if detect::has_article_schema(view) || detect::og_type_is(view, "article") {
        return Some("article_schema".to_string());
    }
    if article_shape && detect::has_byline_or_timestamp(view) {
        return Some("article_container".to_string());
    }
    None
}
