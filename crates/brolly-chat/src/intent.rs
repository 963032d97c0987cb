//! Typed query-intent classification.
//!
//! Topic keywords live here and nowhere else: the answer orchestrator, the
//! deterministic fallback generator, and the policy suggester all consume
//! this one classifier instead of carrying their own keyword lists.

use regex::Regex;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use brolly_core::PolicyType;

// =============================================================================
// Keyword tables
// =============================================================================

const HEALTH_KEYWORDS: &[&str] = &[
    "health",
    "medical",
    "hospital",
    "doctor",
    "treatment",
    "illness",
    "surgery",
];

const CAR_KEYWORDS: &[&str] = &[
    "car",
    "auto",
    "vehicle",
    "automobile",
    "accident",
    "collision",
    "driving",
];

const BIKE_KEYWORDS: &[&str] = &["bike", "bicycle", "motorcycle", "two-wheeler", "scooter"];

const COMPARISON_KEYWORDS: &[&str] = &["compare", "comparison", "versus", "difference between"];

/// Words that signal a concrete insurance need without naming a topic.
const HELP_KEYWORDS: &[&str] = &["help", "need", "want"];

/// Intent words that, combined with an insurance mention, mark a query as
/// insurance-specific even when no topic keyword is present.
const INTENT_KEYWORDS: &[&str] = &["need", "want", "compare"];

const INSURANCE_MENTIONS: &[&str] = &["insurance", "policy"];

/// Greeting must be a whole leading token ("hi there", not "high deductible").
static GREETING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(hi|hiya|hello|hey|howdy|greetings|good\s+(morning|afternoon|evening))\b")
        .expect("Invalid greeting regex")
});

/// Age and dependent markers that imply a health-insurance need
/// ("insurance for my 57 year old father"). Word-bounded so that "age"
/// does not fire inside "coverage".
static AGE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(age|aged|\d+\s*years?\s*old|father|mother|senior|elderly)\b")
        .expect("Invalid age marker regex")
});

// =============================================================================
// QueryIntent
// =============================================================================

/// Coarse category of a user query, driving mode selection and fallback
/// template choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Health,
    Car,
    Bike,
    Comparison,
    /// A concrete ask ("help", "need", "want") with no topic named.
    Generic,
    SmallTalk,
    Unclassified,
}

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

/// Classify a query into one intent.
///
/// Checks in priority order: small talk, health (including age markers),
/// bike before car (so "bicycle" is not swallowed by vehicle terms),
/// comparison, then the generic help/need/want bucket.
pub fn classify(query: &str) -> QueryIntent {
    if is_small_talk(query) {
        return QueryIntent::SmallTalk;
    }

    let lower = query.to_lowercase();
    if contains_any(&lower, HEALTH_KEYWORDS) || AGE_MARKER_RE.is_match(&lower) {
        return QueryIntent::Health;
    }
    if contains_any(&lower, BIKE_KEYWORDS) {
        return QueryIntent::Bike;
    }
    if contains_any(&lower, CAR_KEYWORDS) {
        return QueryIntent::Car;
    }
    if contains_any(&lower, COMPARISON_KEYWORDS) {
        return QueryIntent::Comparison;
    }
    if contains_any(&lower, HELP_KEYWORDS) {
        return QueryIntent::Generic;
    }
    QueryIntent::Unclassified
}

/// True when the query opens with a greeting token.
pub fn is_small_talk(query: &str) -> bool {
    GREETING_RE.is_match(query)
}

/// True when the query asks about insurance specifically: it names a topic
/// (health/car/bike), or pairs an intent word ("need", "want", "compare")
/// with a mention of insurance or a policy.
pub fn is_insurance_query(query: &str) -> bool {
    let lower = query.to_lowercase();
    if contains_any(&lower, HEALTH_KEYWORDS)
        || contains_any(&lower, CAR_KEYWORDS)
        || contains_any(&lower, BIKE_KEYWORDS)
    {
        return true;
    }
    contains_any(&lower, INTENT_KEYWORDS) && contains_any(&lower, INSURANCE_MENTIONS)
}

/// Every policy type whose keywords appear in the query, in health/car/bike
/// order. Used by the policy suggester to award type-match bonuses.
pub fn detect_policy_types(query: &str) -> Vec<PolicyType> {
    let lower = query.to_lowercase();
    let mut detected = Vec::new();
    if contains_any(&lower, HEALTH_KEYWORDS) {
        detected.push(PolicyType::Health);
    }
    if contains_any(&lower, CAR_KEYWORDS) {
        detected.push(PolicyType::Car);
    }
    if contains_any(&lower, BIKE_KEYWORDS) {
        detected.push(PolicyType::Bike);
    }
    detected
}

// =============================================================================
// Tests
// =============================================================================
