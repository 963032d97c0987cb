use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// The line of insurance a policy document belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyType {
    Health,
    Car,
    Bike,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Health => "health",
            PolicyType::Car => "car",
            PolicyType::Bike => "bike",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "health" => Ok(PolicyType::Health),
            "car" => Ok(PolicyType::Car),
            "bike" => Ok(PolicyType::Bike),
            other => Err(format!("unknown policy type: {}", other)),
        }
    }
}

/// Coarse classification of a chunk's clause content, assigned by keyword
/// heuristics at chunking time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseCategory {
    /// Text describing what the policy does not pay for.
    Exclusion,
    /// Text describing what the policy pays for.
    Coverage,
    /// Text describing caps, maximums, and thresholds.
    Limit,
    /// Everything else.
    #[default]
    General,
}

impl ClauseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseCategory::Exclusion => "exclusion",
            ClauseCategory::Coverage => "coverage",
            ClauseCategory::Limit => "limit",
            ClauseCategory::General => "general",
        }
    }
}

impl fmt::Display for ClauseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Capitalized label used when rendering transcripts ("User: ...").
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// How an answer was produced: grounded in retrieved document text, or from
/// general knowledge with no grounding available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Contextual,
    General,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerMode::Contextual => "contextual",
            AnswerMode::General => "general",
        }
    }
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Entity Structs (defined in brolly-core for shared use)
// =============================================================================

/// A policy document as ingested. Immutable once loaded; the source of truth
/// for chunking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub id: String,
    pub policy_type: PolicyType,
    pub region: String,
    pub title: String,
    pub body: String,
}

/// An overlapping segment of one document's body.
///
/// Offsets are character offsets into the body, `start_offset < end_offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub clause_category: ClauseCategory,
}

/// Per-chunk metadata stored alongside its vector in the index.
///
/// Invariant: the record's position in the metadata list and its vector's
/// position in the index always correspond 1:1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub document_id: String,
    pub document_type: PolicyType,
    pub region: String,
    pub title: String,
    pub clause_category: ClauseCategory,
    pub chunk_id: String,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

/// A chunk returned from similarity search. Request-scoped, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub record: ChunkRecord,
    /// Similarity in `[0, 1]`, higher is more relevant.
    pub similarity: f32,
}

/// One message in a conversation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Evidence summary attached to a generated answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportingInfo {
    /// Distinct source document ids, in first-seen retrieval order.
    pub document_ids: Vec<String>,
    /// Distinct clause categories among the supporting chunks.
    pub clause_categories: Vec<ClauseCategory>,
    /// Number of chunks supplied to generation.
    pub chunk_count: usize,
}

/// The orchestrator's final output for one query.
///
/// Invariant: `answer` is never empty and never contains a reserved
/// error-leaking or generic-template phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub answer: String,
    pub mode: AnswerMode,
    pub supporting_info: SupportingInfo,
}
