//! Subject extraction
//!
//! Two phases: acquisition (site adapter, then the generic fallback chain) and
//! specificity validation. A candidate that fails validation is still returned,
//! flagged with `needs_confirm` so the caller can offer inline editing.

pub mod adapters;
pub mod specificity;
pub mod strategies;

use serde::{Deserialize, Serialize};

use crate::lane::Lane;
use crate::snapshot::PageView;

pub use specificity::{SpecificityFailure, validate};

/// How much the pipeline trusts an extracted subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    High,
    Low,
}

/// Outcome of subject extraction for one lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub subject: Option<String>,
    pub confidence_tier: ConfidenceTier,
    pub extraction_method: String,
    pub needs_confirm: bool,
    pub fail_reason: Option<SpecificityFailure>,
}

impl ExtractionResult {
    fn exhausted() -> Self {
        Self {
            subject: None,
            confidence_tier: ConfidenceTier::Low,
            extraction_method: "exhausted".to_string(),
            needs_confirm: false,
            fail_reason: None,
        }
    }

    /// Validate `candidate` and wrap it with the method that produced it.
    pub fn from_candidate(lane: Lane, candidate: &str, method: impl Into<String>) -> Self {
        let method = method.into();
        let subject = specificity::truncate_words(candidate);
        let fail_reason = validate(lane, &subject);
        let high_method = method.starts_with("adapter:")
            || strategies::HIGH_PRECISION_METHODS.contains(&method.as_str());
        let confidence_tier = if fail_reason.is_none() && high_method {
            ConfidenceTier::High
        } else {
            ConfidenceTier::Low
        };
        Self {
            subject: Some(subject),
            confidence_tier,
            extraction_method: method,
            needs_confirm: fail_reason.is_some(),
            fail_reason,
        }
    }
}

/// Acquire a candidate subject for `lane` without validating it.
pub fn acquire(view: &PageView<'_>, lane: Lane) -> Option<(String, String)> {
    if let Some((host, raw)) = adapters::run(view, lane) {
        if let Some(name) = strategies::non_empty(raw) {
            return Some((format!("adapter:{host}"), name));
        }
        tracing::debug!("adapter for {} yielded nothing usable, falling through", host);
    }
    strategies::CHAIN.iter().find_map(|(method, strategy)| {
        strategy(view, lane).map(|candidate| (method.to_string(), candidate))
    })
}

/// Extract and validate the subject for `lane`.
pub fn extract(lane: Lane, view: &PageView<'_>) -> ExtractionResult {
    match acquire(view, lane) {
        Some((method, candidate)) => {
            let result = ExtractionResult::from_candidate(lane, &candidate, method);
            tracing::debug!(
                lane = lane.as_str(),
                method = %result.extraction_method,
                subject = ?result.subject,
                fail_reason = ?result.fail_reason,
                "subject extracted"
            );
            result
        }
        None => ExtractionResult::exhausted(),
    }
}
