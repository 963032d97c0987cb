//! Policy recommendation scoring.
//!
//! Ranks catalog policies by how strongly the retrieved chunks support them
//! and whether their line of insurance matches what the query asked about.

use serde::{Deserialize, Serialize};
use tracing::debug;

use brolly_core::{PolicyType, RetrievedChunk};

/// Maximum number of suggestions returned per query.
const MAX_SUGGESTIONS: usize = 3;

/// Added to a policy's score when its type matches the query.
const TYPE_MATCH_BONUS: f32 = 0.5;

/// Catalog entry for a sellable policy product.
#[derive(Debug, Clone, Copy)]
pub struct PolicyListing {
    pub policy_id: &'static str,
    pub policy_type: PolicyType,
    pub title: &'static str,
    pub company: &'static str,
    pub website: &'static str,
    pub description: &'static str,
}

/// Product catalog consulted for suggestions. Stand-in for a provider
/// database; ids match the shipped policy corpus.
pub const CATALOG: [PolicyListing; 6] = [
    PolicyListing {
        policy_id: "health_policy_1",
        policy_type: PolicyType::Health,
        title: "Comprehensive Health Insurance Plan",
        company: "HealthGuard Insurance",
        website: "https://www.healthguard.com/comprehensive-plan",
        description: "Full coverage health insurance with comprehensive benefits",
    },
    PolicyListing {
        policy_id: "health_policy_2",
        policy_type: PolicyType::Health,
        title: "Basic Health Insurance Plan",
        company: "MediCare Plus",
        website: "https://www.medicareplus.com/basic-plan",
        description: "Affordable basic health coverage for essential needs",
    },
    PolicyListing {
        policy_id: "car_policy_1",
        policy_type: PolicyType::Car,
        title: "Full Coverage Auto Insurance",
        company: "AutoSecure Insurance",
        website: "https://www.autosecure.com/full-coverage",
        description: "Complete auto insurance with comprehensive and collision coverage",
    },
    PolicyListing {
        policy_id: "car_policy_2",
        policy_type: PolicyType::Car,
        title: "Liability-Only Auto Insurance",
        company: "BudgetAuto Insurance",
        website: "https://www.budgetauto.com/liability",
        description: "Affordable liability-only coverage meeting state requirements",
    },
    PolicyListing {
        policy_id: "bike_policy_1",
        policy_type: PolicyType::Bike,
        title: "Motorcycle Insurance Plan",
        company: "RideSafe Insurance",
        website: "https://www.ridesafe.com/motorcycle",
        description: "Comprehensive motorcycle insurance with full protection",
    },
    PolicyListing {
        policy_id: "bike_policy_2",
        policy_type: PolicyType::Bike,
        title: "Bicycle Theft Protection",
        company: "CycleGuard Insurance",
        website: "https://www.cycleguard.com/theft-protection",
        description: "Specialized bicycle insurance for theft and damage protection",
    },
];

fn catalog_entry(policy_id: &str) -> Option<&'static PolicyListing> {
    CATALOG.iter().find(|listing| listing.policy_id == policy_id)
}

/// One recommended policy with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySuggestion {
    pub policy_id: String,
    pub policy_type: PolicyType,
    pub title: String,
    pub reason: String,
}

/// Rank catalog policies against the retrieved chunks.
///
/// `query_types` is the typed classifier's view of which insurance lines the
/// query mentions. Per-policy score is
/// `chunk_count x average similarity`, plus a fixed bonus when the policy's
/// type matches the query. Only policies with at least one retrieved chunk
/// and a catalog listing are candidates; ties keep retrieval order. Returns
/// at most three suggestions, best first.
pub fn suggest(query_types: &[PolicyType], chunks: &[RetrievedChunk]) -> Vec<PolicySuggestion> {
    if chunks.is_empty() {
        return Vec::new();
    }

    // Per-document chunk count and similarity sum, in first-seen order
    let mut tallies: Vec<(&str, usize, f32)> = Vec::new();
    for chunk in chunks {
        let id = chunk.record.document_id.as_str();
        match tallies.iter_mut().find(|(seen, _, _)| *seen == id) {
            Some((_, count, sum)) => {
                *count += 1;
                *sum += chunk.similarity;
            }
            None => tallies.push((id, 1, chunk.similarity)),
        }
    }

    let mut scored: Vec<(&'static PolicyListing, f32)> = Vec::new();
    for (id, count, sum) in tallies {
        let Some(listing) = catalog_entry(id) else {
            debug!(document = id, "No catalog listing, not suggestible");
            continue;
        };
        let avg_similarity = sum / count as f32;
        let mut score = count as f32 * avg_similarity;
        if query_types.contains(&listing.policy_type) {
            score += TYPE_MATCH_BONUS;
        }
        scored.push((listing, score));
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(MAX_SUGGESTIONS);

    debug!(candidates = scored.len(), "Scored policy suggestions");
    scored
        .into_iter()
        .map(|(listing, _)| PolicySuggestion {
            policy_id: listing.policy_id.to_string(),
            policy_type: listing.policy_type,
            title: format!("{} - {}", listing.company, listing.title),
            reason: format!(
                "Recommended: {} - {}. Visit {} for details.",
                listing.company, listing.description, listing.website
            ),
        })
        .collect()
}
