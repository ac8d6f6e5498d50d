//! Intent scoring
//!
//! Each lane owns a fixed weight table over boolean signals. The score is the
//! sum of the weights of the signals that fired and is compared against a
//! strict per-lane threshold. Tables sum to 1.0, so the score never leaves
//! `[0, 1]`.

pub mod pairing;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::detect;
use crate::lane::Lane;
use crate::snapshot::PageView;

/// Lower bound of the "borderline" band logged for offline threshold tuning
pub const BORDERLINE_FLOOR: f32 = 0.55;

/// Absorbs f32 rounding when fired weights sum exactly to a threshold
const SCORE_EPSILON: f32 = 1e-5;

/// Named indicator contributing a fixed weight to a lane's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    // Commerce
    ProductSchema,
    PriceCtaAdjacency,
    ProductUrlPattern,
    OgProduct,
    ProductTitlePrice,
    VariantSelector,
    ReviewBlock,
    // Informational
    ArticleSchema,
    MedicalPairing,
    HealthUrlPattern,
    BylineOrDate,
    ArticleContainer,
    ReferencesBlock,
    HealthDomain,
}

pub const COMMERCE_WEIGHTS: &[(Signal, f32)] = &[
    (Signal::ProductSchema, 0.35),
    (Signal::PriceCtaAdjacency, 0.30),
    (Signal::ProductUrlPattern, 0.20),
    (Signal::OgProduct, 0.05),
    (Signal::ProductTitlePrice, 0.05),
    (Signal::VariantSelector, 0.025),
    (Signal::ReviewBlock, 0.025),
];

pub const INFORMATIONAL_WEIGHTS: &[(Signal, f32)] = &[
    (Signal::ArticleSchema, 0.25),
    (Signal::MedicalPairing, 0.30),
    (Signal::HealthUrlPattern, 0.20),
    (Signal::BylineOrDate, 0.10),
    (Signal::ArticleContainer, 0.10),
    (Signal::ReferencesBlock, 0.025),
    (Signal::HealthDomain, 0.025),
];

pub fn weights_for(lane: Lane) -> &'static [(Signal, f32)] {
    match lane {
        Lane::Commerce => COMMERCE_WEIGHTS,
        Lane::Informational => INFORMATIONAL_WEIGHTS,
    }
}

/// Evaluated signals for one page, plus raw diagnostic tags
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignalSet {
    pub fired: BTreeMap<Signal, bool>,
    pub tags: Vec<String>,
}

impl SignalSet {
    pub fn is_fired(&self, signal: Signal) -> bool {
        self.fired.get(&signal).copied().unwrap_or(false)
    }

    fn record(&mut self, signal: Signal, value: bool) {
        self.fired.insert(signal, value);
    }
}

/// Score, threshold and the signals behind them
#[derive(Debug, Clone, Serialize)]
pub struct IntentResult {
    pub lane: Lane,
    pub score: f32,
    pub threshold: f32,
    pub signals: SignalSet,
    pub passes: bool,
}

/// Sum of the weights of fired signals.
pub fn weighted_score(lane: Lane, signals: &SignalSet) -> f32 {
    weights_for(lane)
        .iter()
        .filter(|(signal, _)| signals.is_fired(*signal))
        .map(|(_, w)| *w)
        .sum()
}

/// Score with the lane's default threshold.
pub fn score(lane: Lane, view: &PageView<'_>) -> IntentResult {
    score_with_threshold(lane, view, lane.default_threshold())
}

pub fn score_with_threshold(lane: Lane, view: &PageView<'_>, threshold: f32) -> IntentResult {
    let signals = match lane {
        Lane::Commerce => commerce_signals(view),
        Lane::Informational => informational_signals(view),
    };
    let score = weighted_score(lane, &signals);
    let passes = score + SCORE_EPSILON >= threshold;

    if !passes && score >= BORDERLINE_FLOOR {
        tracing::info!(
            lane = lane.as_str(),
            score,
            threshold,
            host = %view.host,
            "borderline intent score"
        );
    }

    IntentResult {
        lane,
        score,
        threshold,
        signals,
        passes,
    }
}

fn commerce_signals(view: &PageView<'_>) -> SignalSet {
    let mut set = SignalSet::default();
    set.record(Signal::ProductSchema, detect::has_product_schema(view));
    set.record(Signal::PriceCtaAdjacency, detect::price_cart_adjacent(view));
    set.record(Signal::ProductUrlPattern, detect::product_url_pattern(view));
    set.record(
        Signal::OgProduct,
        detect::og_type_is(view, "product") || view.meta("product:price:amount").is_some(),
    );
    set.record(Signal::ProductTitlePrice, detect::title_price_buy(view));
    set.record(Signal::VariantSelector, detect::has_variant_selector(view));
    set.record(Signal::ReviewBlock, detect::has_reviews(view));
    for (signal, fired) in &set.fired {
        if *fired {
            set.tags.push(format!("{signal:?}"));
        }
    }
    set
}

fn informational_signals(view: &PageView<'_>) -> SignalSet {
    let mut set = SignalSet::default();
    set.record(
        Signal::ArticleSchema,
        detect::has_article_schema(view) || detect::og_type_is(view, "article"),
    );

    let density = pairing::pairing_density(view.visible_text());
    set.record(Signal::MedicalPairing, density.fires);

    set.record(Signal::HealthUrlPattern, detect::health_path_pattern(view));
    set.record(Signal::BylineOrDate, detect::has_byline_or_timestamp(view));
    set.record(Signal::ArticleContainer, detect::has_article_container(view));
    set.record(Signal::ReferencesBlock, detect::has_references(view));
    set.record(
        Signal::HealthDomain,
        detect::host_in(view, detect::HEALTH_HOSTS),
    );
    for (signal, fired) in &set.fired {
        if *fired {
            set.tags.push(format!("{signal:?}"));
        }
    }
    set.tags
        .extend(density.pairings.iter().map(pairing::Pairing::tag));
    set.tags.push(format!("pairing_density:{:.2}", density.density));
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ContentSnapshot;

    #[test]
    fn lane_weights_sum_to_one() {
        for lane in Lane::ALL {
            let total: f32 = weights_for(lane).iter().map(|(_, w)| w).sum();
            assert!((total - 1.0).abs() < 1e-5, "{lane}: {total}");
        }
    }

    #[test]
    fn signals_belong_to_one_lane() {
        for (signal, _) in COMMERCE_WEIGHTS {
            assert!(!INFORMATIONAL_WEIGHTS.iter().any(|(s, _)| s == signal));
        }
    }

    #[test]
    fn score_is_monotonic_in_fired_signals() {
        for lane in Lane::ALL {
            let mut set = SignalSet::default();
            let mut previous = weighted_score(lane, &set);
            assert_eq!(previous, 0.0);
            for (signal, _) in weights_for(lane) {
                set.record(*signal, true);
                let next = weighted_score(lane, &set);
                assert!(next >= previous);
                assert!(next <= 1.0 + 1e-5);
                previous = next;
            }
            assert!((previous - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn foreign_signals_do_not_count() {
        let mut set = SignalSet::default();
        set.record(Signal::ArticleSchema, true);
        assert_eq!(weighted_score(Lane::Commerce, &set), 0.0);
    }

    #[test]
    fn product_page_clears_commerce_threshold() {
        let html = r#"<html><head><title>Wireless Mouse | ShopCo</title>
            <script type="application/ld+json">{"@type":"Product","offers":{"price":"24.99"}}</script>
            </head><body><div class="buybox"><span class="price">$24.99</span>
            <button id="add-to-cart-button">Add to Cart</button></div></body></html>"#;
        let snap = ContentSnapshot::from_html("https://shop.example.com/product/88123", html);
        let view = PageView::parse(&snap);
        let result = score(Lane::Commerce, &view);
        assert!(result.passes, "score {}", result.score);
        assert!(result.signals.is_fired(Signal::ProductSchema));
        assert!(result.signals.is_fired(Signal::PriceCtaAdjacency));
    }

    fn fired(lane: Lane, signals: &[Signal]) -> SignalSet {
        let mut set = SignalSet::default();
        for signal in signals {
            set.record(*signal, true);
        }
        let score = weighted_score(lane, &set);
        assert!(score <= 1.0 + SCORE_EPSILON, "{lane}: {score}");
        set
    }

    #[test]
    fn core_commerce_signals_alone_reach_threshold() {
        let set = fired(
            Lane::Commerce,
            &[
                Signal::ProductSchema,
                Signal::PriceCtaAdjacency,
                Signal::ProductUrlPattern,
            ],
        );
        let score = weighted_score(Lane::Commerce, &set);
        assert!(score + SCORE_EPSILON >= Lane::Commerce.default_threshold(), "{score}");

        let without_url = fired(
            Lane::Commerce,
            &[Signal::ProductSchema, Signal::PriceCtaAdjacency],
        );
        assert!(weighted_score(Lane::Commerce, &without_url) < Lane::Commerce.default_threshold());
    }

    #[test]
    fn pairing_with_schema_and_health_path_reaches_threshold() {
        let set = fired(
            Lane::Informational,
            &[
                Signal::MedicalPairing,
                Signal::ArticleSchema,
                Signal::HealthUrlPattern,
            ],
        );
        let score = weighted_score(Lane::Informational, &set);
        assert!(score + SCORE_EPSILON >= Lane::Informational.default_threshold(), "{score}");

        let unpaired = fired(
            Lane::Informational,
            &[
                Signal::ArticleSchema,
                Signal::HealthUrlPattern,
                Signal::BylineOrDate,
                Signal::ReferencesBlock,
                Signal::HealthDomain,
            ],
        );
        assert!(
            weighted_score(Lane::Informational, &unpaired) < Lane::Informational.default_threshold()
        );
    }

    #[test]
    fn article_without_pairing_stays_below_threshold() {
        let html = r#"<html><head><script type="application/ld+json">{"@type":"NewsArticle","headline":"City council meets"}</script></head>
            <body><article><h1>City council meets</h1><time datetime="2024-05-01">May 1</time>
            <p>The council discussed parking.</p></article></body></html>"#;
        let snap = ContentSnapshot::from_html("https://news.example.org/local/council", html);
        let view = PageView::parse(&snap);
        let result = score(Lane::Informational, &view);
        assert!(!result.passes);
        assert!(!result.signals.is_fired(Signal::MedicalPairing));
    }
}
