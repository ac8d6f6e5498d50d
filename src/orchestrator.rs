//! Gate orchestrator
//!
//! Sequences the gates for each lane and turns the outcome into a
//! [`DisplayState`]. Gate order per pass:
//!
//! 1. page type (classifier archetype must match the lane)
//! 2. cooldowns (URL offer window, then origin dismissal)
//! 3. intent score against the lane threshold
//! 4. subject extraction, 5/6. specificity decides editable vs confirmed
//!
//! Each lane is guarded by its own async mutex so passes for one lane never
//! overlap, while the two lanes evaluate concurrently. Page inspection is
//! synchronous and happens in [`analyze`]; the only suspension points are
//! storage reads and writes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use crate::classifier::{Classification, PageArchetype, classify_detailed};
use crate::config::GateConfig;
use crate::display::{DisplayState, HiddenReason};
use crate::intent::{self, IntentResult};
use crate::lane::Lane;
use crate::snapshot::{ContentSnapshot, PageView, SnapshotProvider};
use crate::store::{CacheKey, Clock, CooldownScope, CooldownStore, KvStore, ResultCache};
use crate::subject::{self, ExtractionResult};
use crate::utils::compact_ws;

/// Feedback from the chip widget
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Accept the current subject as shown
    Confirm,
    /// Accept a user-edited subject
    Edit(String),
    Dismiss,
}

/// Display states for both lanes after one full pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateStates {
    pub commerce: DisplayState,
    pub informational: DisplayState,
}

impl GateStates {
    pub fn get(&self, lane: Lane) -> &DisplayState {
        match lane {
            Lane::Commerce => &self.commerce,
            Lane::Informational => &self.informational,
        }
    }
}

/// Last pass for one lane, kept for diagnostics and follow-up actions
#[derive(Debug, Clone, Serialize)]
pub struct LaneEvaluation {
    pub lane: Lane,
    pub state: DisplayState,
    pub trigger: String,
    pub evaluated_at: i64,
    pub scope: Option<CooldownScope>,
    pub archetype: Option<PageArchetype>,
    pub classification_rule: Option<PageArchetype>,
    pub intent: Option<IntentResult>,
    pub extraction: Option<ExtractionResult>,
    /// Subject currently offered, including user edits
    pub subject: Option<String>,
    /// Variant discriminator set by the page (size, colour)
    pub variant: Option<String>,
}

impl LaneEvaluation {
    fn new(lane: Lane, trigger: &str, evaluated_at: i64) -> Self {
        Self {
            lane,
            state: DisplayState::hidden(HiddenReason::Error),
            trigger: trigger.to_string(),
            evaluated_at,
            scope: None,
            archetype: None,
            classification_rule: None,
            intent: None,
            extraction: None,
            subject: None,
            variant: None,
        }
    }

    fn hide(mut self, reason: HiddenReason) -> Self {
        self.state = DisplayState::hidden(reason);
        self
    }

    /// Apply steps 3 to 6 from a fresh intent/extraction pair.
    fn apply_content(&mut self, intent: IntentResult, extraction: Option<ExtractionResult>) {
        self.state = content_state(&intent, extraction.as_ref());
        self.subject = self.state.subject().map(str::to_string);
        self.intent = Some(intent);
        self.extraction = extraction;
    }
}

/// Everything the synchronous half of a pass learns from one parse.
struct PageAnalysis {
    classification: Classification,
    intent: Option<IntentResult>,
    extraction: Option<ExtractionResult>,
}

fn page_type_allowed(lane: Lane, archetype: PageArchetype) -> bool {
    !archetype.is_excluded() && archetype == lane.required_archetype()
}

fn score_and_extract(
    view: &PageView<'_>,
    lane: Lane,
    threshold: f32,
) -> (IntentResult, Option<ExtractionResult>) {
    let intent = intent::score_with_threshold(lane, view, threshold);
    let extraction = intent.passes.then(|| subject::extract(lane, view));
    (intent, extraction)
}

/// Parse once and run every pure stage the lane is eligible for.
fn analyze(snapshot: &ContentSnapshot, lane: Lane, threshold: f32) -> PageAnalysis {
    let view = PageView::parse(snapshot);
    let classification = classify_detailed(&view);
    if !page_type_allowed(lane, classification.archetype) {
        return PageAnalysis {
            classification,
            intent: None,
            extraction: None,
        };
    }
    let (intent, extraction) = score_and_extract(&view, lane, threshold);
    PageAnalysis {
        classification,
        intent: Some(intent),
        extraction,
    }
}

fn content_state(intent: &IntentResult, extraction: Option<&ExtractionResult>) -> DisplayState {
    if !intent.passes {
        return DisplayState::hidden(HiddenReason::LowIntent);
    }
    let Some(extraction) = extraction else {
        return DisplayState::hidden(HiddenReason::NoSubject);
    };
    match extraction.subject.as_deref().map(str::trim) {
        None | Some("") => DisplayState::hidden(HiddenReason::NoSubject),
        Some(subject) if extraction.needs_confirm => DisplayState::ReadyEditable {
            subject: subject.to_string(),
            fail_reason: extraction.fail_reason,
        },
        Some(subject) => DisplayState::ReadyConfirmed {
            subject: subject.to_string(),
        },
    }
}

type LaneSlot = Mutex<Option<LaneEvaluation>>;

pub struct GateOrchestrator {
    provider: Arc<dyn SnapshotProvider>,
    clock: Arc<dyn Clock>,
    cooldowns: CooldownStore,
    cache: ResultCache,
    config: GateConfig,
    commerce: LaneSlot,
    informational: LaneSlot,
    generation: AtomicU64,
}

impl GateOrchestrator {
    pub fn new(
        provider: Arc<dyn SnapshotProvider>,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        config: GateConfig,
    ) -> Self {
        let cooldowns = CooldownStore::new(store.clone(), clock.clone(), &config.cooldown);
        let cache = ResultCache::new(store, clock.clone(), &config.cache);
        Self {
            provider,
            clock,
            cooldowns,
            cache,
            config,
            commerce: Mutex::new(None),
            informational: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Shared result cache for the scan client.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    fn slot(&self, lane: Lane) -> &LaneSlot {
        match lane {
            Lane::Commerce => &self.commerce,
            Lane::Informational => &self.informational,
        }
    }

    async fn lock(&self, lane: Lane) -> MutexGuard<'_, Option<LaneEvaluation>> {
        self.slot(lane).lock().await
    }

    /// Run one full pass for `lane`.
    pub async fn evaluate(&self, lane: Lane) -> DisplayState {
        self.evaluate_for(lane, "explicit").await
    }

    /// Run one pass per lane, lanes concurrently.
    pub async fn evaluate_all(&self) -> GateStates {
        self.evaluate_all_for("explicit").await
    }

    async fn evaluate_all_for(&self, trigger: &str) -> GateStates {
        let (commerce, informational) = tokio::join!(
            self.evaluate_for(Lane::Commerce, trigger),
            self.evaluate_for(Lane::Informational, trigger)
        );
        GateStates {
            commerce,
            informational,
        }
    }

    async fn evaluate_for(&self, lane: Lane, trigger: &str) -> DisplayState {
        let mut slot = self.lock(lane).await;
        let evaluation = self.run_pass(lane, trigger, slot.as_ref()).await;
        tracing::debug!(
            lane = lane.as_str(),
            trigger,
            state = ?evaluation.state,
            archetype = ?evaluation.archetype,
            score = evaluation.intent.as_ref().map(|i| i.score),
            "gate decision"
        );
        let state = evaluation.state.clone();
        *slot = Some(evaluation);
        state
    }

    async fn run_pass(
        &self,
        lane: Lane,
        trigger: &str,
        previous: Option<&LaneEvaluation>,
    ) -> LaneEvaluation {
        let mut evaluation = LaneEvaluation::new(lane, trigger, self.clock.now_ms());
        let snapshot = match self.provider.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(lane = lane.as_str(), "snapshot unavailable: {}", e);
                return evaluation.hide(HiddenReason::Error);
            }
        };

        let scope = CooldownScope::from_url(&snapshot.url);
        let threshold = self.config.thresholds.for_lane(lane);
        let analysis = analyze(&snapshot, lane, threshold);
        evaluation.scope = Some(scope.clone());
        evaluation.archetype = Some(analysis.classification.archetype);
        evaluation.classification_rule = Some(analysis.classification.rule);

        // Step 1
        if !page_type_allowed(lane, analysis.classification.archetype) {
            return evaluation.hide(HiddenReason::WrongPageType);
        }

        // Step 2
        let check = self.cooldowns.check_cooldowns(lane, &scope).await;
        if let Some(reason) = check.reason.filter(|_| check.blocked) {
            return evaluation.hide(reason);
        }

        // Steps 3-6
        let Some(intent) = analysis.intent else {
            return evaluation.hide(HiddenReason::Error);
        };
        evaluation.apply_content(intent, analysis.extraction);

        // A variant chosen earlier on the same subject still applies.
        if let Some(prev) = previous
            && prev.subject.is_some()
            && prev.subject == evaluation.subject
            && prev.scope.as_ref().map(|s| &s.origin) == Some(&scope.origin)
        {
            evaluation.variant = prev.variant.clone();
        }
        evaluation
    }

    /// Debounced trigger from the navigation/mutation source.
    ///
    /// Only the latest trigger inside the debounce window runs a pass; the
    /// handles of superseded triggers resolve to `None`.
    pub fn on_trigger(
        self: &Arc<Self>,
        reason: impl Into<String>,
    ) -> tokio::task::JoinHandle<Option<GateStates>> {
        let reason = reason.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.config.runtime.debounce();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if this.generation.load(Ordering::SeqCst) != generation {
                tracing::trace!(reason = %reason, "trigger coalesced");
                return None;
            }
            Some(this.evaluate_all_for(&reason).await)
        })
    }

    /// Apply a user action to the lane's current state.
    pub async fn on_user_action(&self, lane: Lane, action: UserAction) -> DisplayState {
        let mut slot = self.lock(lane).await;
        let Some(evaluation) = slot.as_mut() else {
            tracing::debug!(lane = lane.as_str(), "user action before any evaluation ignored");
            return DisplayState::hidden(HiddenReason::NoSubject);
        };
        if !evaluation.state.is_visible() {
            tracing::debug!(lane = lane.as_str(), ?action, "user action on hidden lane ignored");
            return evaluation.state.clone();
        }

        match action {
            UserAction::Dismiss => {
                if let Some(scope) = &evaluation.scope {
                    self.cooldowns.dismiss_on_origin(lane, scope).await;
                }
                evaluation.state = DisplayState::hidden(HiddenReason::UserDismissed);
            }
            UserAction::Confirm => {
                if let DisplayState::ReadyEditable { subject, fail_reason } = &evaluation.state {
                    tracing::info!(
                        lane = lane.as_str(),
                        subject = %subject,
                        fail_reason = ?fail_reason,
                        "user confirmed subject that failed specificity"
                    );
                    evaluation.state = DisplayState::ReadyConfirmed {
                        subject: subject.clone(),
                    };
                }
            }
            UserAction::Edit(text) => {
                if !matches!(evaluation.state, DisplayState::ReadyEditable { .. }) {
                    tracing::debug!(lane = lane.as_str(), "edit on a non-editable chip ignored");
                    return evaluation.state.clone();
                }
                let edited = compact_ws(&text);
                if edited.is_empty() || evaluation.subject.as_deref() == Some(edited.as_str()) {
                    tracing::debug!(lane = lane.as_str(), "empty or unchanged edit ignored");
                    return evaluation.state.clone();
                }
                if let Some(reason) = subject::validate(lane, &edited) {
                    tracing::info!(
                        lane = lane.as_str(),
                        subject = %edited,
                        fail_reason = %reason,
                        "accepting user edit that failed specificity"
                    );
                }
                evaluation.subject = Some(edited.clone());
                evaluation.state = DisplayState::ReadyConfirmed { subject: edited };
            }
        }
        evaluation.state.clone()
    }

    /// Product variant changed on the page: drop cached results for the
    /// subject and re-run intent and extraction without page-type or
    /// cooldown gates.
    pub async fn on_variant_changed(&self, variant: Option<String>) -> DisplayState {
        let lane = Lane::Commerce;
        let mut slot = self.lock(lane).await;
        let Some(evaluation) = slot.as_mut() else {
            return DisplayState::hidden(HiddenReason::NoSubject);
        };
        let (Some(scope), Some(subject)) = (evaluation.scope.clone(), evaluation.subject.clone())
        else {
            return evaluation.state.clone();
        };
        if !evaluation.state.is_visible() {
            return evaluation.state.clone();
        }

        let removed = self.cache.invalidate_scope(lane, &scope.origin, &subject).await;
        tracing::debug!(subject = %subject, removed, "variant change invalidated cache scope");
        evaluation.variant = variant
            .map(|v| compact_ws(&v))
            .filter(|v| !v.is_empty());

        let snapshot = match self.provider.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(lane = lane.as_str(), "snapshot unavailable: {}", e);
                evaluation.state = DisplayState::hidden(HiddenReason::Error);
                return evaluation.state.clone();
            }
        };
        let threshold = self.config.thresholds.for_lane(lane);
        let (intent, extraction) = {
            let view = PageView::parse(&snapshot);
            score_and_extract(&view, lane, threshold)
        };
        evaluation.trigger = "variant_changed".to_string();
        evaluation.evaluated_at = self.clock.now_ms();
        evaluation.apply_content(intent, extraction);
        evaluation.state.clone()
    }

    /// The widget rendered the chip: start the URL cooldown.
    ///
    /// Returns false when the lane has nothing visible to mark.
    pub async fn mark_displayed(&self, lane: Lane) -> bool {
        let slot = self.lock(lane).await;
        match slot.as_ref() {
            Some(LaneEvaluation {
                scope: Some(scope),
                state,
                ..
            }) if state.is_visible() => {
                self.cooldowns.set_url_cooldown(lane, scope).await;
                true
            }
            _ => false,
        }
    }

    /// The widget could not render the chip. No cooldown is written, so the
    /// next pass retries.
    pub async fn mark_render_failed(&self, lane: Lane) {
        let mut slot = self.lock(lane).await;
        if let Some(evaluation) = slot.as_mut() {
            tracing::debug!(lane = lane.as_str(), "chip render failed");
            evaluation.state = DisplayState::hidden(HiddenReason::RenderFailed);
        }
    }

    pub async fn last_evaluation(&self, lane: Lane) -> Option<LaneEvaluation> {
        self.lock(lane).await.clone()
    }

    /// Cache key for the lane's current subject, if one is offered.
    pub async fn cache_key(&self, lane: Lane) -> Option<CacheKey> {
        let slot = self.lock(lane).await;
        let evaluation = slot.as_ref().filter(|e| e.state.is_visible())?;
        let scope = evaluation.scope.as_ref()?;
        let subject = evaluation.subject.as_deref()?;
        Some(CacheKey::new(
            lane,
            &scope.origin,
            subject,
            evaluation.variant.as_deref(),
        ))
    }
}
