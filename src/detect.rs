//! Markup and URL detectors shared by the page classifier and the intent scorer
//!
//! Every detector is a pure boolean (or count) over a [`PageView`]. Missing
//! nodes, bad selectors and malformed structured data all read as "absent".

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::ElementRef;
use url::Url;

use crate::snapshot::PageView;
use crate::utils::text::element_text;

/// How many ancestor levels a price and a cart control may be apart
pub const ADJACENCY_RADIUS: usize = 4;

pub const PRICE_SELECTOR: &str = "[itemprop=\"price\"], .price, .a-price, .product-price, \
     [class*=\"price\"], [data-testid*=\"price\"], [data-price]";

pub const CART_SELECTOR: &str = "#add-to-cart-button, #buy-now-button, button[name=\"add-to-cart\"], \
     [id*=\"add-to-cart\"], [class*=\"add-to-cart\"], [data-action=\"add-to-cart\"], \
     [class*=\"buy-now\"], form[action*=\"cart\"] button";

pub const PRODUCT_CARD_SELECTOR: &str = ".product-card, .product-tile, .product-item, li.product, \
     [data-component=\"product-card\"], [data-testid=\"product-card\"], .s-result-item[data-asin]";

pub const PAGINATION_SELECTOR: &str =
    ".pagination, [class*=\"pagination\"], nav[aria-label*=\"agination\"], a[rel=\"next\"]";

pub const SEARCH_RESULT_SELECTOR: &str = "div.g, li.b_algo, .search-result, [data-testid=\"result\"], \
     div.result, li.result, [data-component-type=\"s-search-result\"]";

pub const SEARCH_INPUT_SELECTOR: &str =
    "input[type=\"search\"], input[name=\"q\"], input[name=\"query\"], input[name=\"search\"]";

/// Distinct feed container signatures; two or more distinct hits mark a feed
pub const FEED_SIGNATURES: &[&str] = &[
    "[role=\"feed\"]",
    ".feed",
    ".news-feed",
    ".stream-item",
    "[data-testid=\"tweet\"]",
    ".river",
    ".story-list",
    "[class*=\"timeline\"]",
    ".card-grid",
    "[data-testid=\"post-container\"]",
];

pub const ARTICLE_CONTAINER_SELECTOR: &str = "article, [role=\"article\"], [itemtype*=\"Article\"], \
     [itemtype*=\"BlogPosting\"], .article-body, .post-content, .entry-content, .article-content";

pub const BYLINE_SELECTOR: &str =
    "[rel=\"author\"], .byline, .author, [itemprop=\"author\"], [class*=\"byline\"]";

pub const TIMESTAMP_SELECTOR: &str =
    "time[datetime], [itemprop=\"datePublished\"], [itemprop=\"dateModified\"]";

pub const REFERENCES_SELECTOR: &str = "#references, .references, ol.references, [class*=\"citation\"], \
     #sources, .sources, section[id*=\"reference\"]";

pub const REVIEW_SELECTOR: &str = "[itemprop=\"review\"], [itemprop=\"aggregateRating\"], #reviews, \
     [class*=\"review\"], [data-hook=\"review\"]";

pub const VARIANT_SELECTOR: &str = "select[name*=\"size\"], select[name*=\"color\"], select[name*=\"variant\"], \
     [class*=\"swatch\"], [data-variant], [class*=\"variant-selector\"], #variation_color_name, #variation_size_name";

pub const PRODUCT_TYPES: &[&str] = &["Product", "ProductGroup", "IndividualProduct", "ProductModel"];

pub const ARTICLE_TYPES: &[&str] = &[
    "Article",
    "NewsArticle",
    "BlogPosting",
    "MedicalWebPage",
    "HealthTopicContent",
    "ScholarlyArticle",
    "Report",
    "MedicalScholarlyArticle",
];

pub const SEARCH_ENGINE_HOSTS: &[&str] = &[
    "bing.com",
    "duckduckgo.com",
    "search.yahoo.com",
    "yandex.com",
    "yandex.ru",
    "baidu.com",
    "ecosia.org",
    "search.brave.com",
    "startpage.com",
    "kagi.com",
];

pub const PORTAL_HOSTS: &[&str] = &[
    "yahoo.com",
    "msn.com",
    "aol.com",
    "news.google.com",
    "flipboard.com",
    "feedly.com",
];

pub const NEWS_HOSTS: &[&str] = &[
    "cnn.com",
    "bbc.com",
    "bbc.co.uk",
    "nytimes.com",
    "theguardian.com",
    "foxnews.com",
    "reuters.com",
    "apnews.com",
    "washingtonpost.com",
    "nbcnews.com",
    "usatoday.com",
];

pub const NEWS_SECTIONS: &[&str] = &[
    "news", "world", "us", "politics", "business", "tech", "technology", "science", "health",
    "sport", "sports", "entertainment", "opinion", "lifestyle", "travel", "section", "topics",
];

pub const ECOMMERCE_HOSTS: &[&str] = &[
    "amazon.com",
    "amazon.co.uk",
    "ebay.com",
    "walmart.com",
    "target.com",
    "bestbuy.com",
    "etsy.com",
    "aliexpress.com",
    "costco.com",
    "homedepot.com",
];

pub const SOCIAL_HOSTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "tiktok.com",
    "threads.net",
    "pinterest.com",
];

pub const HEALTH_HOSTS: &[&str] = &[
    "mayoclinic.org",
    "webmd.com",
    "healthline.com",
    "medlineplus.gov",
    "nih.gov",
    "cdc.gov",
    "clevelandclinic.org",
    "medicalnewstoday.com",
    "hopkinsmedicine.org",
    "nhs.uk",
    "who.int",
    "health.harvard.edu",
];

static PRODUCT_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(/dp/[a-z0-9]{6,}|/gp/product/|/products?/[^/]+|/p/[^/]+|/ip/[^/]+|/itm/[^/]+|/item/[^/]+|/pd/[^/]+|/sku/[^/]+|-p-\d+|/\d{6,}\.p$)")
        .unwrap()
});

static CATEGORY_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^/(c|cat|category|categories|collections|browse|department|departments|b|shop)(/[^/]+){0,2}/?$")
        .unwrap()
});

static HEALTH_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/(health|conditions?|diseases?|nutrition|wellness|medical|medicine|drugs|symptoms|treatments?|diet|fitness|mental-health)(/|-|$)")
        .unwrap()
});

static CART_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(add to (cart|bag|basket|trolley)|buy (it )?now|add to order|purchase)\b").unwrap()
});

static SOCIAL_FEED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^/(home|feed|explore|foryou|following|r/[^/]+/?$|hashtag/)").unwrap()
});

/// True when the page host equals or is a subdomain of any listed host.
pub fn host_in(view: &PageView<'_>, hosts: &[&str]) -> bool {
    hosts.iter().any(|h| view.host_matches(h))
}

/// Google hosts (`google.com`, `google.de`, `google.co.uk`) count only on the
/// home and search paths. Other Google properties (`store.`, `docs.`) do not.
pub fn is_search_engine(view: &PageView<'_>) -> bool {
    if view.host.starts_with("google.") {
        return matches!(
            view.path_segments().first().copied(),
            None | Some("search" | "webhp")
        );
    }
    if view.host.contains(".google.") {
        return false;
    }
    host_in(view, SEARCH_ENGINE_HOSTS)
}

pub fn search_query_in_url(view: &PageView<'_>) -> bool {
    let has_query = ["q", "query", "s", "k", "search_query"]
        .iter()
        .any(|p| view.has_query_param(p));
    has_query
        && view
            .path_segments()
            .iter()
            .any(|seg| *seg == "search" || *seg == "s" || seg.starts_with("search"))
}

pub fn repeated_search_results(view: &PageView<'_>) -> usize {
    view.count(SEARCH_RESULT_SELECTOR)
}

/// Absolute links pointing at a different host.
pub fn outbound_link_count(view: &PageView<'_>) -> usize {
    view.select("a[href]")
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| Url::parse(href).ok())
        .filter(|u| {
            u.host_str()
                .map(crate::utils::url::normalize_host)
                .is_some_and(|h| !h.is_empty() && h != view.host)
        })
        .count()
}

pub fn is_root_or_section(view: &PageView<'_>) -> bool {
    view.path_segments().len() <= 1
}

pub fn is_news_section(view: &PageView<'_>) -> bool {
    let segs = view.path_segments();
    match segs.as_slice() {
        [] => true,
        [one] => NEWS_SECTIONS.contains(one) || !one.contains('-'),
        [first, second] => NEWS_SECTIONS.contains(first) && !second.contains('-'),
        _ => false,
    }
}

pub fn is_social_feed(view: &PageView<'_>) -> bool {
    if view.host_matches("linkedin.com") && view.path.starts_with("/feed") {
        return true;
    }
    if view.host_matches("reddit.com") {
        return view.path == "/" || SOCIAL_FEED_RE.is_match(&view.path);
    }
    if view.host_matches("youtube.com") {
        return view.path == "/" || view.path.starts_with("/feed");
    }
    host_in(view, SOCIAL_HOSTS) && (view.path == "/" || SOCIAL_FEED_RE.is_match(&view.path))
}

/// Number of distinct feed signatures present.
pub fn feed_signature_count(view: &PageView<'_>) -> usize {
    FEED_SIGNATURES.iter().filter(|sig| view.exists(sig)).count()
}

pub fn product_url_pattern(view: &PageView<'_>) -> bool {
    PRODUCT_URL_RE.is_match(&view.path)
}

pub fn category_url_pattern(view: &PageView<'_>) -> bool {
    CATEGORY_URL_RE.is_match(&view.path)
}

pub fn health_path_pattern(view: &PageView<'_>) -> bool {
    HEALTH_PATH_RE.is_match(&view.path)
}

pub fn product_card_count(view: &PageView<'_>) -> usize {
    view.count(PRODUCT_CARD_SELECTOR)
}

pub fn has_pagination(view: &PageView<'_>) -> bool {
    view.exists(PAGINATION_SELECTOR)
}

/// JSON-LD `Product` or schema.org/Product microdata.
pub fn has_product_schema(view: &PageView<'_>) -> bool {
    view.json_ld_has_type(PRODUCT_TYPES) || view.exists("[itemtype*=\"schema.org/Product\"]")
}

pub fn has_article_schema(view: &PageView<'_>) -> bool {
    view.json_ld_has_type(ARTICLE_TYPES)
        || view.exists("[itemtype*=\"schema.org/Article\"], [itemtype*=\"schema.org/NewsArticle\"], [itemtype*=\"schema.org/BlogPosting\"]")
}

pub fn og_type_is(view: &PageView<'_>, wanted: &str) -> bool {
    view.meta("og:type")
        .is_some_and(|t| t.to_ascii_lowercase().starts_with(wanted))
}

/// Price elements on the page.
pub fn price_elements<'v>(view: &'v PageView<'_>) -> Vec<ElementRef<'v>> {
    view.select(PRICE_SELECTOR)
}

/// Cart / buy controls, by selector or by button text.
pub fn cart_elements<'v>(view: &'v PageView<'_>) -> Vec<ElementRef<'v>> {
    let mut found = view.select(CART_SELECTOR);
    let mut seen: HashSet<_> = found.iter().map(|e| e.id()).collect();
    for el in view.select("button, input[type=\"submit\"], a[role=\"button\"]") {
        if seen.contains(&el.id()) {
            continue;
        }
        let label = match el.value().attr("value") {
            Some(v) if el.value().name() == "input" => v.to_string(),
            _ => element_text(el),
        };
        if CART_TEXT_RE.is_match(&label) {
            seen.insert(el.id());
            found.push(el);
        }
    }
    found
}

/// The element and its ancestors up to `radius` levels, stopping below `<body>`.
pub(crate) fn local_ancestors<'a>(
    el: ElementRef<'a>,
    radius: usize,
) -> impl Iterator<Item = ElementRef<'a>> {
    std::iter::once(el)
        .chain(el.ancestors().filter_map(ElementRef::wrap))
        .take_while(|e| !matches!(e.value().name(), "body" | "html"))
        .take(radius + 1)
}

/// A price element and a cart control share an ancestor within [`ADJACENCY_RADIUS`].
pub fn price_cart_adjacent(view: &PageView<'_>) -> bool {
    let prices = price_elements(view);
    if prices.is_empty() {
        return false;
    }
    let carts = cart_elements(view);
    if carts.is_empty() {
        return false;
    }
    let price_scope: HashSet<_> = prices
        .into_iter()
        .flat_map(|p| local_ancestors(p, ADJACENCY_RADIUS).map(|e| e.id()))
        .collect();
    carts.into_iter().any(|c| {
        local_ancestors(c, ADJACENCY_RADIUS).any(|e| price_scope.contains(&e.id()))
    })
}

/// Title (h1, itemprop name or document title), price and buy button all present.
pub fn title_price_buy(view: &PageView<'_>) -> bool {
    let has_title = view.exists("h1, [itemprop=\"name\"]") || view.title().is_some();
    has_title && !price_elements(view).is_empty() && !cart_elements(view).is_empty()
}

pub fn has_article_container(view: &PageView<'_>) -> bool {
    view.exists(ARTICLE_CONTAINER_SELECTOR)
}

pub fn has_byline_or_timestamp(view: &PageView<'_>) -> bool {
    view.exists(BYLINE_SELECTOR)
        || view.exists(TIMESTAMP_SELECTOR)
        || view.meta("author").is_some()
        || view.meta("article:published_time").is_some()
}

pub fn has_references(view: &PageView<'_>) -> bool {
    view.exists(REFERENCES_SELECTOR)
}

pub fn has_reviews(view: &PageView<'_>) -> bool {
    view.exists(REVIEW_SELECTOR)
}

pub fn has_variant_selector(view: &PageView<'_>) -> bool {
    view.exists(VARIANT_SELECTOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ContentSnapshot;

    fn view_of(url: &str, html: &str) -> ContentSnapshot {
        ContentSnapshot::from_html(url, html)
    }

    #[test]
    fn adjacency_within_radius() {
        let html = r#"<div class="buybox"><span class="price">$19.99</span>
            <div><button>Add to Cart</button></div></div>"#;
        let snap = view_of("https://shop.example.com/product/1", html);
        let view = PageView::parse(&snap);
        assert!(price_cart_adjacent(&view));
    }

    #[test]
    fn distant_price_and_cart_are_not_adjacent() {
        let html = r#"<body>
            <section><div><div><div><div><div><span class="price">$5</span></div></div></div></div></div></section>
            <footer><div><div><div><div><div><button>Buy now</button></div></div></div></div></div></footer>
            </body>"#;
        let snap = view_of("https://shop.example.com/", html);
        let view = PageView::parse(&snap);
        assert!(!price_cart_adjacent(&view));
        assert!(title_price_buy(&view) == view.title().is_some());
    }

    #[test]
    fn url_patterns() {
        let cases = [
            ("https://www.amazon.com/Logitech-Mouse/dp/B07FKMDJQZ", true),
            ("https://shop.example.com/products/wireless-mouse", true),
            ("https://shop.example.com/about", false),
        ];
        for (url, want) in cases {
            let snap = view_of(url, "");
            let view = PageView::parse(&snap);
            assert_eq!(product_url_pattern(&view), want, "{url}");
        }

        let snap = view_of("https://shop.example.com/collections/summer", "");
        assert!(category_url_pattern(&PageView::parse(&snap)));
        let snap = view_of("https://shop.example.com/collections/summer/products/hat", "");
        assert!(!category_url_pattern(&PageView::parse(&snap)));
    }

    #[test]
    fn search_query_requires_search_segment() {
        let snap = view_of("https://shop.example.com/search?q=mouse", "");
        assert!(search_query_in_url(&PageView::parse(&snap)));
        let snap = view_of("https://shop.example.com/list?q=mouse", "");
        assert!(!search_query_in_url(&PageView::parse(&snap)));
    }
}
