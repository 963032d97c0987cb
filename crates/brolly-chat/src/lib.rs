//! Brolly Chat crate - conversational question answering over policy documents.
//!
//! Provides the session-aware chat engine: query intent classification,
//! in-memory conversation sessions with expiry, prompt construction, a
//! language-model abstraction with bounded retry, deterministic fallback
//! answers, and the quality-gated answer orchestrator.

pub mod engine;
pub mod fallback;
pub mod intent;
pub mod llm;
pub mod memory;
pub mod orchestrator;
pub mod prompt;

pub use engine::{ChatEngine, ChatReply};
pub use fallback::{default_fallback, is_generic_answer};
pub use intent::{classify, detect_policy_types, is_insurance_query, is_small_talk, QueryIntent};
pub use llm::{complete_with_retry, LlmError, LlmService, MockLlm};
pub use memory::{format_transcript, Clock, FixedClock, SessionStore, SystemClock};
pub use orchestrator::AnswerOrchestrator;
