//! Deterministic fallback answers and the generic-phrase check.
//!
//! `default_fallback` is the terminal safety net of answer generation: a
//! pure function of the query that always produces a substantive,
//! topic-aware reply. It backs every failure path, so it must never emit
//! any phrase that [`is_generic_answer`] rejects.

use crate::intent::{self, QueryIntent};

/// Phrases marking an answer as a generic non-answer or an internal error
/// leak. Reserved: no accepted answer may contain any of them.
pub const GENERIC_PHRASES: &[&str] = &[
    "i don't have information about",
    "i don't have specific information",
    "contact a customer service agent",
    "technical issue",
    "technical difficulties",
    "unexpected error",
    "contact customer service",
];

/// True when the answer contains a reserved generic or error-leaking phrase.
pub fn is_generic_answer(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    GENERIC_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Rule-based answer keyed by detected intent. Pure: the same query always
/// yields the same text.
pub fn default_fallback(query: &str) -> String {
    if query.trim().is_empty() {
        return "Hello! I can help you explore health, car, and bike insurance policies. \
                What would you like to know?"
            .to_string();
    }

    match intent::classify(query) {
        QueryIntent::SmallTalk => "Hello! I'm your insurance assistant. I can help with \
             health, car, and bike insurance: coverage details, exclusions, limits, and \
             finding a suitable policy. Which topic would you like to start with?"
            .to_string(),

        QueryIntent::Health => "Health insurance typically offers hospitalization cover, \
             outpatient benefits, and medication cover, with comprehensive plans adding \
             extras like dental and vision care.\n\n\
             For applicants over 50, insurers usually apply age-specific eligibility rules \
             and waiting periods for pre-existing conditions, so it's worth confirming \
             those terms with the provider before choosing a plan.\n\n\
             To point you at suitable policies:\n\
             1. Who is the cover for, and what is their age?\n\
             2. Do you need individual or family coverage?\n\
             3. Are there any pre-existing conditions to account for?"
            .to_string(),

        QueryIntent::Bike => "Bike insurance splits into two kinds of cover: motorcycle \
             policies protect against accident damage, theft, and third-party liability, \
             while bicycle policies focus on theft and damage protection.\n\n\
             A couple of questions to narrow it down:\n\
             1. Is this for a motorcycle or a bicycle?\n\
             2. Do you want liability-only cover or full protection including theft?"
            .to_string(),

        QueryIntent::Car => "Car insurance comes in three main forms: liability cover pays \
             for damage you cause to others, collision cover pays for damage to your own \
             vehicle in an accident, and comprehensive cover adds theft, weather, and \
             vandalism protection.\n\n\
             To recommend the right policy:\n\
             1. Are you after liability-only cover or full coverage?\n\
             2. What vehicle would the policy be for?"
            .to_string(),

        QueryIntent::Comparison => "Happy to compare policies. To make the comparison \
             useful, tell me:\n\
             1. Which policy type you're comparing: health, car, or bike?\n\
             2. Which aspects matter most, for example premiums, coverage limits, or \
             exclusions?\n\
             3. Whether the cover is for an individual or a family?"
            .to_string(),

        QueryIntent::Generic => "I can help you find the right insurance. Here's what I \
             can cover:\n\
             - Health insurance: hospitalization, outpatient care, and medication cover\n\
             - Car insurance: liability, collision, and comprehensive options\n\
             - Bike insurance: motorcycle and bicycle protection\n\n\
             Which of these fits what you're looking for?"
            .to_string(),

        QueryIntent::Unclassified => format!(
            "I want to make sure I point you in the right direction for \"{}\". Could you \
             tell me:\n\
             1. Which policy type you're interested in: health, car, or bike?\n\
             2. What you'd like to know, for example coverage, exclusions, or limits?",
            query.trim()
        ),
    }
}
