//! Paired-term density check for the informational lane
//!
//! A sentence qualifies when it names a condition, an intervention and a claim
//! verb at once ("a Mediterranean diet reduces heart disease risk"). The signal
//! fires only when qualifying sentences per 100 words reach the floor.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::text::{contains_word, word_count};

/// Qualifying sentences per 100 words required for the signal to fire
pub const MEDICAL_PAIRING_FLOOR: f32 = 0.5;

pub const CONDITION_TERMS: &[&str] = &[
    "heart disease",
    "cardiovascular disease",
    "diabetes",
    "cancer",
    "hypertension",
    "high blood pressure",
    "blood pressure",
    "obesity",
    "depression",
    "anxiety",
    "alzheimer's",
    "alzheimers",
    "dementia",
    "arthritis",
    "asthma",
    "stroke",
    "cholesterol",
    "inflammation",
    "insomnia",
    "migraine",
    "migraines",
    "covid",
    "influenza",
    "flu",
    "infection",
    "eczema",
    "acne",
    "osteoporosis",
    "kidney disease",
    "liver disease",
    "adhd",
    "autism",
];

pub const THERAPY_TERMS: &[&str] = &[
    "diet",
    "supplement",
    "supplements",
    "vitamin",
    "vitamins",
    "exercise",
    "medication",
    "medications",
    "drug",
    "drugs",
    "vaccine",
    "vaccines",
    "therapy",
    "treatment",
    "fasting",
    "probiotic",
    "probiotics",
    "herbal",
    "herbs",
    "turmeric",
    "fish oil",
    "omega-3",
    "meditation",
    "yoga",
    "surgery",
    "acupuncture",
    "essential oil",
    "essential oils",
    "cbd",
    "keto",
];

pub const CLAIM_VERBS: &[&str] = &[
    "cures",
    "cure",
    "treats",
    "treat",
    "prevents",
    "prevent",
    "reduces",
    "reduce",
    "lowers",
    "lower",
    "reverses",
    "reverse",
    "heals",
    "heal",
    "boosts",
    "fights",
    "eliminates",
    "protects against",
    "improves",
    "relieves",
];

static SENTENCE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[.!?]+["”'’]?(\s+|$)"#).unwrap());

/// A sentence containing a condition, an intervention and a claim verb
#[derive(Debug, Clone, PartialEq)]
pub struct Pairing {
    pub condition: &'static str,
    pub therapy: &'static str,
    pub claim: &'static str,
}

impl Pairing {
    pub fn tag(&self) -> String {
        format!("pairing:{}+{}+{}", self.condition, self.therapy, self.claim)
    }
}

/// Outcome of the density check
#[derive(Debug, Clone)]
pub struct PairingDensity {
    pub pairings: Vec<Pairing>,
    pub words: usize,
    /// Qualifying sentences per 100 words
    pub density: f32,
    pub fires: bool,
}

fn first_hit(sentence_lower: &str, vocab: &'static [&'static str]) -> Option<&'static str> {
    vocab
        .iter()
        .copied()
        .find(|term| contains_word(sentence_lower, term))
}

fn pairing_in(sentence: &str) -> Option<Pairing> {
    let lower = sentence.to_lowercase();
    Some(Pairing {
        condition: first_hit(&lower, CONDITION_TERMS)?,
        therapy: first_hit(&lower, THERAPY_TERMS)?,
        claim: first_hit(&lower, CLAIM_VERBS)?,
    })
}

/// Scan `text` sentence by sentence and compute the pairing density.
pub fn pairing_density(text: &str) -> PairingDensity {
    let words = word_count(text).max(1);
    let pairings: Vec<Pairing> = SENTENCE_SPLIT
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .filter_map(pairing_in)
        .collect();
    let density = pairings.len() as f32 * 100.0 / words as f32;
    PairingDensity {
        fires: !pairings.is_empty() && density >= MEDICAL_PAIRING_FLOOR,
        pairings,
        words,
        density,
    }
}
