//! Shared page fixtures and test doubles for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chip_gate::{
    ChipGateError, ContentSnapshot, GateConfig, GateOrchestrator, KvStore, ManualClock,
    MemoryStore, Result, StaticSnapshot,
};
use serde_json::Value;

pub const PRODUCT_URL: &str = "https://shop.example.com/product/88123";
pub const ARTICLE_URL: &str = "https://wellness.example.org/health/mediterranean-diet-heart";

/// Product detail page whose only subject source is the breadcrumb trail.
///
/// Carries only structured product markup, a price beside the cart button and
/// a product URL; no social preview tags.
pub fn product_page(crumb: &str) -> String {
    format!(
        r#"<html><head>
        <title>{crumb} | ShopCo</title>
        <script type="application/ld+json">{{"@context":"https://schema.org","@type":"Product","sku":"88123","offers":{{"@type":"Offer","price":"24.99","priceCurrency":"USD"}}}}</script>
        </head><body>
        <nav aria-label="Breadcrumb"><ol><li>Home</li><li>Computers</li><li>{crumb}</li></ol></nav>
        <div class="buybox">
          <span class="price">$24.99</span>
          <button id="add-to-cart-button">Add to Cart</button>
        </div>
        </body></html>"#
    )
}

pub fn article_page() -> String {
    r#"<html><head>
    <title>Mediterranean diet reduces heart disease risk - Wellness Weekly</title>
    <script type="application/ld+json">{"@context":"https://schema.org","@type":"NewsArticle","headline":"Mediterranean diet reduces heart disease risk","datePublished":"2024-03-02"}</script>
    </head><body>
    <article>
      <h1>Mediterranean diet reduces heart disease risk</h1>
      <time datetime="2024-03-02">March 2, 2024</time>
      <p>A large trial followed thousands of adults for five years.</p>
      <p>Researchers found that a Mediterranean diet reduces heart disease risk in older adults.</p>
      <p>Participants ate more olive oil, nuts, fish and vegetables than the control group.</p>
    </article>
    </body></html>"#
        .to_string()
}

/// Article schema plus the claim sentence, with no article container or dates.
pub fn plain_article_page() -> String {
    r#"<html><head>
    <title>Mediterranean diet reduces heart disease risk - Wellness Weekly</title>
    <script type="application/ld+json">{"@context":"https://schema.org","@type":"Article","headline":"Mediterranean diet reduces heart disease risk"}</script>
    </head><body>
    <div class="content">
      <p>A Mediterranean diet reduces heart disease risk, according to a five year trial.</p>
      <p>Participants ate more olive oil, nuts, fish and vegetables than the control group.</p>
    </div>
    </body></html>"#
        .to_string()
}

pub fn snapshot(url: &str, html: &str) -> ContentSnapshot {
    ContentSnapshot::from_html(url, html)
}

pub struct Harness {
    pub orchestrator: Arc<GateOrchestrator>,
    pub provider: Arc<StaticSnapshot>,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(url: &str, html: &str) -> Harness {
    harness_with(url, html, GateConfig::default())
}

pub fn harness_with(url: &str, html: &str, config: GateConfig) -> Harness {
    let provider = Arc::new(StaticSnapshot::new(snapshot(url, html)));
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let orchestrator = Arc::new(GateOrchestrator::new(
        provider.clone(),
        store.clone(),
        clock.clone(),
        config,
    ));
    Harness {
        orchestrator,
        provider,
        store,
        clock,
    }
}

/// Store whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl KvStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Err(ChipGateError::storage(format!("get {key}: quota exceeded")))
    }

    async fn set(&self, key: &str, _value: Value) -> Result<()> {
        Err(ChipGateError::storage(format!("set {key}: quota exceeded")))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        Err(ChipGateError::storage(format!("remove {key}: quota exceeded")))
    }
}
