//! Session-aware chat facade tying retrieval, memory, and generation together.
//!
//! One [`ChatEngine`] serves all sessions for the process. Each call resolves
//! the session, threads the recent transcript into generation, and records
//! both sides of the exchange before replying.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use brolly_core::error::Result;
use brolly_core::{AnswerMode, PolicyType, Role, SupportingInfo};
use brolly_insight::PolicySuggestion;
use brolly_vector::RetrieverInit;

use crate::intent;
use crate::memory::{format_transcript, SessionStore};
use crate::orchestrator::AnswerOrchestrator;

/// One answered turn, including the session it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: Uuid,
    pub answer: String,
    pub mode: AnswerMode,
    pub supporting_info: SupportingInfo,
    pub suggestions: Vec<PolicySuggestion>,
}

/// Shared chat entry point: retriever, orchestrator, and session store.
#[derive(Debug)]
pub struct ChatEngine {
    retriever: RetrieverInit,
    orchestrator: AnswerOrchestrator,
    store: SessionStore,
    retrieval_k: usize,
    max_recent: usize,
}

impl ChatEngine {
    pub fn new(
        retriever: RetrieverInit,
        orchestrator: AnswerOrchestrator,
        store: SessionStore,
        retrieval_k: usize,
        max_recent: usize,
    ) -> Self {
        Self {
            retriever,
            orchestrator,
            store,
            retrieval_k,
            max_recent,
        }
    }

    /// Answer one query within a session.
    ///
    /// A missing or unknown `session_id` starts a fresh session; the reply
    /// carries the id to pass back on the next turn. The transcript supplied
    /// to generation covers turns before this query. Errors here are session
    /// bookkeeping failures only; answering itself never fails.
    pub async fn chat(
        &self,
        session_id: Option<Uuid>,
        query: &str,
        type_filter: Option<PolicyType>,
        region_filter: Option<&str>,
    ) -> Result<ChatReply> {
        let session_id = self.store.get_or_create(session_id)?;

        let turns = self.store.recent(session_id, self.max_recent)?;
        let transcript = format_transcript(&turns);
        let conversation = (!transcript.is_empty()).then_some(transcript.as_str());

        self.store.append(session_id, Role::User, query)?;

        let chunks = self
            .retriever
            .retrieve(query, type_filter, region_filter, self.retrieval_k)
            .await;
        let result = self
            .orchestrator
            .generate(query, &chunks, type_filter, region_filter, conversation)
            .await;

        self.store.append(session_id, Role::Assistant, &result.answer)?;

        let suggestions = brolly_insight::suggest(&intent::detect_policy_types(query), &chunks);

        debug!(
            session = %session_id,
            mode = %result.mode,
            chunks = chunks.len(),
            suggestions = suggestions.len(),
            "Turn answered"
        );

        Ok(ChatReply {
            session_id,
            answer: result.answer,
            mode: result.mode,
            supporting_info: result.supporting_info,
            suggestions,
        })
    }

    /// Remove sessions whose oldest activity has passed the expiry window.
    /// Returns the number removed.
    pub fn sweep_sessions(&self) -> Result<usize> {
        self.store.sweep()
    }

    /// Whether grounded answering is possible at all this process lifetime.
    pub fn retriever_ready(&self) -> bool {
        self.retriever.is_ready()
    }

    /// Load failure detail when the retriever is unavailable.
    pub fn retriever_unavailable_reason(&self) -> Option<&str> {
        self.retriever.unavailable_reason()
    }
}
