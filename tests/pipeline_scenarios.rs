//! End-to-end gate scenarios through the public orchestrator API

mod common;

use std::sync::Arc;
use std::time::Duration;

use chip_gate::store::cache::CACHE_STORAGE_KEY;
use chip_gate::{
    CacheKey, DisplayState, GateConfig, GateOrchestrator, HiddenReason, KvStore, Lane, ManualClock,
    PageArchetype, Signal, SpecificityFailure, StaticSnapshot, UserAction,
};
use common::{
    ARTICLE_URL, FailingStore, PRODUCT_URL, article_page, harness, plain_article_page, product_page,
    snapshot,
};
use serde_json::json;

fn confirmed(subject: &str) -> DisplayState {
    DisplayState::ReadyConfirmed {
        subject: subject.to_string(),
    }
}

#[tokio::test]
async fn product_page_with_specific_breadcrumb_is_confirmed() {
    let h = harness(PRODUCT_URL, &product_page("Wireless Mouse"));
    let state = h.orchestrator.evaluate(Lane::Commerce).await;
    assert_eq!(state, confirmed("Wireless Mouse"));

    let eval = h.orchestrator.last_evaluation(Lane::Commerce).await.unwrap();
    assert_eq!(eval.archetype, Some(PageArchetype::Product));
    let intent = eval.intent.unwrap();
    assert!(intent.passes, "score {}", intent.score);
    assert!(!intent.signals.is_fired(Signal::OgProduct));
    assert!(intent.signals.is_fired(Signal::ProductSchema));
    assert!(intent.signals.is_fired(Signal::PriceCtaAdjacency));
    assert!(intent.signals.is_fired(Signal::ProductUrlPattern));
    let extraction = eval.extraction.unwrap();
    assert_eq!(extraction.extraction_method, "breadcrumb");
    assert!(!extraction.needs_confirm);
}

#[tokio::test]
async fn generic_breadcrumb_renders_editable() {
    let h = harness(PRODUCT_URL, &product_page("Consumer Electronics"));
    let state = h.orchestrator.evaluate(Lane::Commerce).await;
    assert_eq!(
        state,
        DisplayState::ReadyEditable {
            subject: "Consumer Electronics".to_string(),
            fail_reason: Some(SpecificityFailure::ContainsGenericTerm),
        }
    );
    let encoded = serde_json::to_value(&state).unwrap();
    assert_eq!(encoded["state"], "ready_editable");
    assert_eq!(encoded["fail_reason"], "contains_generic_term");
}

#[tokio::test]
async fn single_generic_breadcrumb_is_flagged_as_generic() {
    let h = harness(PRODUCT_URL, &product_page("Electronics"));
    let state = h.orchestrator.evaluate(Lane::Commerce).await;
    assert_eq!(
        state,
        DisplayState::ReadyEditable {
            subject: "Electronics".to_string(),
            fail_reason: Some(SpecificityFailure::ContainsGenericTerm),
        }
    );
    let encoded = serde_json::to_value(&state).unwrap();
    assert_eq!(encoded["state"], "ready_editable");
    assert_eq!(encoded["fail_reason"], "contains_generic_term");
}

#[tokio::test]
async fn health_article_with_claim_sentence_is_confirmed() {
    let h = harness(ARTICLE_URL, &article_page());
    let states = h.orchestrator.evaluate_all().await;
    assert_eq!(
        states.informational,
        confirmed("Mediterranean diet reduces heart disease risk")
    );
    assert_eq!(
        states.commerce,
        DisplayState::hidden(HiddenReason::WrongPageType)
    );

    let eval = h
        .orchestrator
        .last_evaluation(Lane::Informational)
        .await
        .unwrap();
    let intent = eval.intent.unwrap();
    assert!(intent.passes, "score {}", intent.score);
    assert!(intent.signals.is_fired(Signal::MedicalPairing));
    assert!(intent.signals.is_fired(Signal::ArticleSchema));
    assert!(intent.signals.is_fired(Signal::HealthUrlPattern));
    assert!(intent.signals.tags.iter().any(|t| t.starts_with("pairing:")));
    assert_eq!(eval.extraction.unwrap().extraction_method, "json_ld");
}

#[tokio::test]
async fn claim_sentence_with_schema_and_health_path_is_enough() {
    let h = harness(ARTICLE_URL, &plain_article_page());
    let state = h.orchestrator.evaluate(Lane::Informational).await;
    assert_eq!(state, confirmed("Mediterranean diet reduces heart disease risk"));

    let eval = h
        .orchestrator
        .last_evaluation(Lane::Informational)
        .await
        .unwrap();
    assert_eq!(eval.archetype, Some(PageArchetype::Article));
    let intent = eval.intent.unwrap();
    assert!(intent.passes, "score {}", intent.score);
    assert!(!intent.signals.is_fired(Signal::ArticleContainer));
    assert!(!intent.signals.is_fired(Signal::BylineOrDate));
}

#[tokio::test]
async fn displayed_url_is_on_cooldown_until_window_passes() {
    let h = harness(PRODUCT_URL, &product_page("Wireless Mouse"));
    assert!(h.orchestrator.evaluate(Lane::Commerce).await.is_visible());

    // Passing the gates alone does not start a cooldown.
    assert!(h.orchestrator.evaluate(Lane::Commerce).await.is_visible());

    assert!(h.orchestrator.mark_displayed(Lane::Commerce).await);
    assert_eq!(
        h.orchestrator.evaluate(Lane::Commerce).await,
        DisplayState::hidden(HiddenReason::UrlCooldown)
    );

    // Tracking parameters do not dodge the cooldown.
    h.provider.replace(snapshot(
        &format!("{PRODUCT_URL}?utm_source=newsletter#reviews"),
        &product_page("Wireless Mouse"),
    ));
    assert_eq!(
        h.orchestrator.evaluate(Lane::Commerce).await,
        DisplayState::hidden(HiddenReason::UrlCooldown)
    );

    h.clock.advance(Duration::from_secs(31 * 60));
    assert_eq!(
        h.orchestrator.evaluate(Lane::Commerce).await,
        confirmed("Wireless Mouse")
    );
}

#[tokio::test]
async fn render_failure_does_not_start_cooldown() {
    let h = harness(PRODUCT_URL, &product_page("Wireless Mouse"));
    h.orchestrator.evaluate(Lane::Commerce).await;
    h.orchestrator.mark_render_failed(Lane::Commerce).await;
    let eval = h.orchestrator.last_evaluation(Lane::Commerce).await.unwrap();
    assert_eq!(eval.state, DisplayState::hidden(HiddenReason::RenderFailed));
    assert!(!h.orchestrator.mark_displayed(Lane::Commerce).await);
    assert!(h.orchestrator.evaluate(Lane::Commerce).await.is_visible());
}

#[tokio::test]
async fn excluded_archetypes_hide_both_lanes() {
    let product_markup = product_page("Wireless Mouse");
    let pages = [
        ("https://www.google.com/search?q=wireless+mouse", product_markup.clone()),
        ("https://www.yahoo.com/", article_page()),
        ("https://shop.example.com/collections/mice", product_markup.clone()),
        (
            "https://example.com/about",
            "<html><body><p>We are a small team.</p></body></html>".to_string(),
        ),
    ];
    for (url, html) in pages {
        let h = harness(url, &html);
        let states = h.orchestrator.evaluate_all().await;
        for lane in Lane::ALL {
            assert_eq!(
                states.get(lane),
                &DisplayState::hidden(HiddenReason::WrongPageType),
                "{url} {lane}"
            );
        }
        let eval = h.orchestrator.last_evaluation(Lane::Commerce).await.unwrap();
        assert!(eval.archetype.unwrap().is_excluded(), "{url}");
    }
}

#[tokio::test]
async fn dismissal_hides_lane_across_the_origin() {
    let h = harness(PRODUCT_URL, &product_page("Wireless Mouse"));
    h.orchestrator.evaluate(Lane::Commerce).await;
    let state = h
        .orchestrator
        .on_user_action(Lane::Commerce, UserAction::Dismiss)
        .await;
    assert_eq!(state, DisplayState::hidden(HiddenReason::UserDismissed));

    h.provider.replace(snapshot(
        "https://shop.example.com/product/99999",
        &product_page("Wireless Mouse"),
    ));
    assert_eq!(
        h.orchestrator.evaluate(Lane::Commerce).await,
        DisplayState::hidden(HiddenReason::UserDismissed)
    );

    h.clock.advance(Duration::from_secs(25 * 60 * 60));
    assert!(h.orchestrator.evaluate(Lane::Commerce).await.is_visible());
}

#[tokio::test]
async fn edits_confirm_new_subject_and_ignore_noise() {
    let h = harness(PRODUCT_URL, &product_page("Consumer Electronics"));
    let editable = h.orchestrator.evaluate(Lane::Commerce).await;

    for noise in ["   ", "Consumer  Electronics"] {
        let state = h
            .orchestrator
            .on_user_action(Lane::Commerce, UserAction::Edit(noise.to_string()))
            .await;
        assert_eq!(state, editable);
    }

    let state = h
        .orchestrator
        .on_user_action(
            Lane::Commerce,
            UserAction::Edit("Logitech M720 Triathlon".to_string()),
        )
        .await;
    assert_eq!(state, confirmed("Logitech M720 Triathlon"));
    let key = h.orchestrator.cache_key(Lane::Commerce).await.unwrap();
    assert_eq!(
        key.as_str(),
        "commerce:https://shop.example.com:logitech_m720_triathlon"
    );

    // Once confirmed there is nothing left to edit.
    let state = h
        .orchestrator
        .on_user_action(Lane::Commerce, UserAction::Edit("Logitech".to_string()))
        .await;
    assert_eq!(state, confirmed("Logitech M720 Triathlon"));
}

#[tokio::test]
async fn failing_user_edit_is_accepted() {
    let h = harness(PRODUCT_URL, &product_page("Consumer Electronics"));
    h.orchestrator.evaluate(Lane::Commerce).await;
    let state = h
        .orchestrator
        .on_user_action(Lane::Commerce, UserAction::Edit("Logitech".to_string()))
        .await;
    assert_eq!(state, confirmed("Logitech"));
}

#[tokio::test]
async fn fully_specific_subject_cannot_be_edited() {
    let h = harness(PRODUCT_URL, &product_page("Wireless Mouse"));
    assert_eq!(
        h.orchestrator.evaluate(Lane::Commerce).await,
        confirmed("Wireless Mouse")
    );
    let state = h
        .orchestrator
        .on_user_action(Lane::Commerce, UserAction::Edit("Gaming Mouse G502".to_string()))
        .await;
    assert_eq!(state, confirmed("Wireless Mouse"));
    let eval = h.orchestrator.last_evaluation(Lane::Commerce).await.unwrap();
    assert_eq!(eval.subject.as_deref(), Some("Wireless Mouse"));
}

#[tokio::test]
async fn confirm_accepts_flagged_subject() {
    let h = harness(PRODUCT_URL, &product_page("Consumer Electronics"));
    h.orchestrator.evaluate(Lane::Commerce).await;
    let state = h
        .orchestrator
        .on_user_action(Lane::Commerce, UserAction::Confirm)
        .await;
    assert_eq!(state, confirmed("Consumer Electronics"));
}

#[tokio::test]
async fn actions_on_hidden_lane_are_ignored() {
    let h = harness(ARTICLE_URL, &article_page());
    h.orchestrator.evaluate(Lane::Commerce).await;
    let state = h
        .orchestrator
        .on_user_action(Lane::Commerce, UserAction::Dismiss)
        .await;
    assert_eq!(state, DisplayState::hidden(HiddenReason::WrongPageType));
    assert!(h.store.keys().await.is_empty());
}

#[tokio::test]
async fn variant_change_invalidates_subject_scope() {
    let h = harness(PRODUCT_URL, &product_page("Wireless Mouse"));
    h.orchestrator.evaluate(Lane::Commerce).await;
    let base = h.orchestrator.cache_key(Lane::Commerce).await.unwrap();
    let cache = h.orchestrator.cache();
    cache.set(&base, json!({"offers": 3})).await;
    let grey = CacheKey::new(
        Lane::Commerce,
        "https://shop.example.com",
        "Wireless Mouse",
        Some("grey"),
    );
    cache.set(&grey, json!({"offers": 1})).await;

    let state = h
        .orchestrator
        .on_variant_changed(Some("Black".to_string()))
        .await;
    assert_eq!(state, confirmed("Wireless Mouse"));
    assert!(cache.get(&base).await.is_none());
    assert!(cache.get(&grey).await.is_none());

    let key = h.orchestrator.cache_key(Lane::Commerce).await.unwrap();
    assert_eq!(
        key.as_str(),
        "commerce:https://shop.example.com:wireless_mouse:black"
    );
    let eval = h.orchestrator.last_evaluation(Lane::Commerce).await.unwrap();
    assert_eq!(eval.trigger, "variant_changed");
}

#[tokio::test]
async fn variant_change_without_visible_commerce_chip_is_a_no_op() {
    let h = harness(ARTICLE_URL, &article_page());
    h.orchestrator.evaluate(Lane::Commerce).await;
    let state = h.orchestrator.on_variant_changed(Some("red".into())).await;
    assert_eq!(state, DisplayState::hidden(HiddenReason::WrongPageType));
    assert!(h.store.get(CACHE_STORAGE_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn rapid_triggers_coalesce_into_one_pass() {
    let mut config = GateConfig::default();
    config.runtime.debounce_ms = 20;
    let h = common::harness_with(PRODUCT_URL, &product_page("Wireless Mouse"), config);

    let first = h.orchestrator.on_trigger("mutation");
    let second = h.orchestrator.on_trigger("mutation");
    let last = h.orchestrator.on_trigger("navigation");

    assert!(first.await.unwrap().is_none());
    assert!(second.await.unwrap().is_none());
    let states = last.await.unwrap().expect("latest trigger runs");
    assert_eq!(states.commerce, confirmed("Wireless Mouse"));
    let eval = h.orchestrator.last_evaluation(Lane::Commerce).await.unwrap();
    assert_eq!(eval.trigger, "navigation");
}

#[tokio::test]
async fn storage_failures_fail_open() {
    let provider = Arc::new(StaticSnapshot::new(snapshot(
        PRODUCT_URL,
        &product_page("Wireless Mouse"),
    )));
    let orchestrator = GateOrchestrator::new(
        provider,
        Arc::new(FailingStore),
        Arc::new(ManualClock::default()),
        GateConfig::default(),
    );
    assert_eq!(
        orchestrator.evaluate(Lane::Commerce).await,
        confirmed("Wireless Mouse")
    );
    assert!(orchestrator.mark_displayed(Lane::Commerce).await);
    // The dropped cooldown write means the chip may be offered again.
    assert!(orchestrator.evaluate(Lane::Commerce).await.is_visible());

    let key = orchestrator.cache_key(Lane::Commerce).await.unwrap();
    orchestrator.cache().set(&key, json!({"offers": 2})).await;
    assert!(orchestrator.cache().get(&key).await.is_none());
}
