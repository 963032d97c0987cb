//! Answer-generation orchestration with quality gating.
//!
//! Decides between grounded, deterministic, and general answering, invokes
//! the language model with bounded retry, and gates whatever comes back so
//! the caller always receives a non-empty, non-generic answer. Model
//! failures never propagate past this module.

use std::time::Duration;

use tracing::{debug, warn};

use brolly_core::config::LlmConfig;
use brolly_core::{
    AnswerMode, ClauseCategory, GenerationResult, PolicyType, RetrievedChunk, SupportingInfo,
};

use crate::fallback::{default_fallback, is_generic_answer};
use crate::intent;
use crate::llm::{complete_with_retry, LlmService};
use crate::prompt;

/// Quality-gated answer generator.
pub struct AnswerOrchestrator {
    llm: Box<dyn LlmService>,
    max_retries: u32,
    retry_delay: Duration,
    min_answer_len: usize,
}

impl std::fmt::Debug for AnswerOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerOrchestrator")
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("min_answer_len", &self.min_answer_len)
            .finish()
    }
}

impl AnswerOrchestrator {
    /// Wrap a model backend with the configured retry and gating policy.
    pub fn new(llm: Box<dyn LlmService>, config: &LlmConfig) -> Self {
        Self {
            llm,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            min_answer_len: config.min_answer_len,
        }
    }

    /// Generate an answer for one query.
    ///
    /// Mode selection: retrieved chunks present means grounded answering; a
    /// recognized insurance query with no chunks skips the model in favor of
    /// the deterministic fallback (the model tends toward generic non-answers
    /// there); everything else gets a general model answer. The result is
    /// then quality-gated.
    ///
    /// Total: every input, including the empty query and a failing model,
    /// yields a non-empty answer with no reserved phrase in it.
    pub async fn generate(
        &self,
        query: &str,
        chunks: &[RetrievedChunk],
        type_filter: Option<PolicyType>,
        region_filter: Option<&str>,
        conversation: Option<&str>,
    ) -> GenerationResult {
        let has_context = !chunks.is_empty();
        let small_talk = intent::is_small_talk(query);
        let insurance_query = intent::is_insurance_query(query);

        debug!(
            has_context,
            small_talk,
            insurance_query,
            type_filter = ?type_filter,
            region_filter = ?region_filter,
            chunks = chunks.len(),
            "Generating answer"
        );

        let raw_answer = if has_context {
            let context = prompt::build_context_block(chunks);
            let user_prompt = prompt::build_grounded_prompt(query, &context, conversation);
            self.invoke_model(prompt::SYSTEM_PROMPT, &user_prompt).await
        } else if insurance_query && !small_talk {
            // Known insurance topic with nothing to ground on: answer
            // deterministically instead of risking a generic model reply.
            debug!("Insurance query without context, skipping the model");
            default_fallback(query)
        } else {
            let user_prompt = prompt::build_general_prompt(query, conversation);
            self.invoke_model(prompt::GENERAL_SYSTEM_PROMPT, &user_prompt)
                .await
        };

        let answer = self.quality_gate(raw_answer, query, has_context, insurance_query);

        GenerationResult {
            answer,
            mode: if has_context {
                AnswerMode::Contextual
            } else {
                AnswerMode::General
            },
            supporting_info: supporting_info(chunks),
        }
    }

    /// Call the model with retry; unrecovered failure degrades to the empty
    /// string, which the quality gate replaces.
    async fn invoke_model(&self, system_prompt: &str, user_prompt: &str) -> String {
        match complete_with_retry(
            self.llm.as_ref(),
            system_prompt,
            user_prompt,
            self.max_retries,
            self.retry_delay,
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Language model failed, degrading to fallback");
                String::new()
            }
        }
    }

    /// Reject disallowed answer shapes, substituting the deterministic
    /// fallback. Checks run in a fixed order; the trailing emptiness check
    /// is a hard post-condition no path may violate.
    fn quality_gate(
        &self,
        answer: String,
        query: &str,
        has_context: bool,
        insurance_query: bool,
    ) -> String {
        let generic = is_generic_answer(&answer);

        let gated = if generic && insurance_query {
            // Strict rule: a generic-sounding answer is never acceptable for
            // a classified insurance query, grounded or not.
            debug!("Generic answer for an insurance query, regenerating");
            default_fallback(query)
        } else if answer.trim().is_empty() || answer.len() < self.min_answer_len {
            debug!(len = answer.len(), "Answer below minimum length, regenerating");
            default_fallback(query)
        } else if generic && !has_context {
            debug!("Generic answer with no context, regenerating");
            default_fallback(query)
        } else {
            answer
        };

        if gated.trim().is_empty() {
            return default_fallback(query);
        }
        gated
    }
}

/// Distinct document ids in first-seen order, distinct clause categories,
/// and the number of chunks supplied to generation.
fn supporting_info(chunks: &[RetrievedChunk]) -> SupportingInfo {
    let mut document_ids: Vec<String> = Vec::new();
    let mut clause_categories: Vec<ClauseCategory> = Vec::new();
    for chunk in chunks {
        if !document_ids.contains(&chunk.record.document_id) {
            document_ids.push(chunk.record.document_id.clone());
        }
        if !clause_categories.contains(&chunk.record.clause_category) {
            clause_categories.push(chunk.record.clause_category);
        }
    }
    SupportingInfo {
        document_ids,
        clause_categories,
        chunk_count: chunks.len(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use brolly_core::ChunkRecord;

    use crate::llm::{LlmError, MockLlm};

    const LONG_ANSWER: &str = "The policy covers hospitalization, surgery, and prescribed \
                               medication up to the annual limit. Would you like details \
                               on the exclusions?";

    /// Returns a fixed answer and records every prompt it was given.
    struct CapturingLlm {
        answer: String,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl CapturingLlm {
        fn returning(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        fn last_user_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().unwrap().1.clone()
        }
    }

    #[async_trait]
    impl LlmService for CapturingLlm {
        async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string()));
            Ok(self.answer.clone())
        }
    }

    /// Always fails with the given constructor.
    struct FailingLlm(fn() -> LlmError);

    #[async_trait]
    impl LlmService for FailingLlm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
            Err((self.0)())
        }
    }

    fn test_config() -> LlmConfig {
        LlmConfig {
            retry_delay_secs: 0,
            ..LlmConfig::default()
        }
    }

    fn make_orchestrator(llm: Box<dyn LlmService>) -> AnswerOrchestrator {
        AnswerOrchestrator::new(llm, &test_config())
    }

    fn make_chunk(document_id: &str, clause: ClauseCategory, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            record: ChunkRecord {
                document_id: document_id.to_string(),
                document_type: PolicyType::Health,
                region: "US".to_string(),
                title: format!("{} plan", document_id),
                clause_category: clause,
                chunk_id: format!("{}_chunk_0", document_id),
                text: text.to_string(),
                start_offset: 0,
                end_offset: text.len(),
            },
            similarity: 0.9,
        }
    }

    fn health_chunks() -> Vec<RetrievedChunk> {
        vec![make_chunk(
            "health_1",
            ClauseCategory::Coverage,
            "This policy covers hospitalization and surgery.",
        )]
    }

    // ---- mode selection ----

    #[tokio::test]
    async fn test_context_produces_contextual_mode() {
        let orch = make_orchestrator(Box::new(CapturingLlm::returning(LONG_ANSWER)));
        let result = orch
            .generate("What does it cover?", &health_chunks(), None, None, None)
            .await;

        assert_eq!(result.mode, AnswerMode::Contextual);
        assert_eq!(result.answer, LONG_ANSWER);
        assert_eq!(result.supporting_info.document_ids, vec!["health_1"]);
        assert_eq!(result.supporting_info.chunk_count, 1);
    }

    #[tokio::test]
    async fn test_no_context_produces_general_mode() {
        let orch = make_orchestrator(Box::new(CapturingLlm::returning(LONG_ANSWER)));
        let result = orch
            .generate("tell me about the weather", &[], None, None, None)
            .await;
        assert_eq!(result.mode, AnswerMode::General);
    }

    /// Keeps a handle on the double after the orchestrator takes ownership.
    fn make_orchestrator_from_ref(llm: &'static CapturingLlm) -> AnswerOrchestrator {
        struct Forward(&'static CapturingLlm);

        #[async_trait]
        impl LlmService for Forward {
            async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
                self.0.complete(system, user).await
            }
        }

        make_orchestrator(Box::new(Forward(llm)))
    }

    #[tokio::test]
    async fn test_insurance_query_without_context_skips_model() {
        let llm_ref: &'static CapturingLlm =
            Box::leak(Box::new(CapturingLlm::returning(LONG_ANSWER)));
        let orch = make_orchestrator_from_ref(llm_ref);

        let result = orch
            .generate("I need car insurance", &[], None, None, None)
            .await;

        assert_eq!(llm_ref.prompt_count(), 0);
        assert_eq!(result.answer, default_fallback("I need car insurance"));
        assert_eq!(result.mode, AnswerMode::General);
    }

    #[tokio::test]
    async fn test_small_talk_goes_to_model_not_deterministic_branch() {
        let llm_ref: &'static CapturingLlm =
            Box::leak(Box::new(CapturingLlm::returning(LONG_ANSWER)));
        let orch = make_orchestrator_from_ref(llm_ref);

        let result = orch.generate("Hi there", &[], None, None, None).await;

        assert_eq!(llm_ref.prompt_count(), 1);
        assert_eq!(result.answer, LONG_ANSWER);
    }

    // ---- prompts ----

    #[tokio::test]
    async fn test_grounded_prompt_carries_chunks_and_conversation() {
        let llm_ref: &'static CapturingLlm =
            Box::leak(Box::new(CapturingLlm::returning(LONG_ANSWER)));
        let orch = make_orchestrator_from_ref(llm_ref);

        orch.generate(
            "What does it cover?",
            &health_chunks(),
            None,
            None,
            Some("User: hello\nAssistant: Hello!"),
        )
        .await;

        let prompt = llm_ref.last_user_prompt();
        assert!(prompt.contains("[Chunk 1]"));
        assert!(prompt.contains("Policy ID: health_1"));
        assert!(prompt.contains("PRIOR CONVERSATION:\nUser: hello"));
        assert!(prompt.contains("USER'S QUESTION: What does it cover?"));
    }

    #[tokio::test]
    async fn test_general_prompt_carries_conversation() {
        let llm_ref: &'static CapturingLlm =
            Box::leak(Box::new(CapturingLlm::returning(LONG_ANSWER)));
        let orch = make_orchestrator_from_ref(llm_ref);

        orch.generate(
            "what happened earlier?",
            &[],
            None,
            None,
            Some("User: hi\nAssistant: Hello!"),
        )
        .await;

        let prompt = llm_ref.last_user_prompt();
        assert!(prompt.starts_with("PRIOR CONVERSATION:"));
        assert!(prompt.contains("USER'S QUESTION: what happened earlier?"));
    }

    // ---- quality gate ----

    #[tokio::test]
    async fn test_model_failure_degrades_to_fallback() {
        let orch = make_orchestrator(Box::new(FailingLlm(|| LlmError::Timeout)));
        let result = orch
            .generate("What does it cover?", &health_chunks(), None, None, None)
            .await;

        assert_eq!(result.answer, default_fallback("What does it cover?"));
        // Chunks were supplied, so the mode still reports contextual
        assert_eq!(result.mode, AnswerMode::Contextual);
    }

    #[tokio::test]
    async fn test_transient_failures_retried_before_degrading() {
        struct CountingFailure(std::sync::atomic::AtomicU32);

        #[async_trait]
        impl LlmService for CountingFailure {
            async fn complete(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err(LlmError::RateLimited)
            }
        }

        let llm_ref: &'static CountingFailure =
            Box::leak(Box::new(CountingFailure(std::sync::atomic::AtomicU32::new(0))));

        struct Forward(&'static CountingFailure);

        #[async_trait]
        impl LlmService for Forward {
            async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
                self.0.complete(system, user).await
            }
        }

        let orch = make_orchestrator(Box::new(Forward(llm_ref)));
        let result = orch
            .generate("What does it cover?", &health_chunks(), None, None, None)
            .await;

        // Initial attempt plus max_retries further ones
        assert_eq!(llm_ref.0.load(std::sync::atomic::Ordering::SeqCst), 3);
        assert_eq!(result.answer, default_fallback("What does it cover?"));
    }

    #[tokio::test]
    async fn test_generic_answer_for_insurance_query_replaced_despite_context() {
        let generic = "I don't have specific information about that in the available \
                       policy documents, sorry.";
        let orch = make_orchestrator(Box::new(CapturingLlm::returning(generic)));
        let result = orch
            .generate("what does my health policy cover", &health_chunks(), None, None, None)
            .await;

        assert_eq!(
            result.answer,
            default_fallback("what does my health policy cover")
        );
        assert_eq!(result.mode, AnswerMode::Contextual);
    }

    #[tokio::test]
    async fn test_generic_answer_without_context_replaced_for_any_query() {
        let generic = "Please contact customer service for assistance with this request.";
        let orch = make_orchestrator(Box::new(CapturingLlm::returning(generic)));
        let result = orch
            .generate("tell me something interesting", &[], None, None, None)
            .await;

        assert!(!is_generic_answer(&result.answer));
    }

    #[tokio::test]
    async fn test_generic_answer_with_context_kept_for_non_insurance_query() {
        // The gate only rejects generic text for insurance queries or when
        // no context exists; a grounded generic answer to an off-topic query
        // passes through.
        let generic = "Please contact customer service for assistance with this request.";
        let orch = make_orchestrator(Box::new(CapturingLlm::returning(generic)));
        let result = orch
            .generate("thanks for everything", &health_chunks(), None, None, None)
            .await;

        assert_eq!(result.answer, generic);
    }

    #[tokio::test]
    async fn test_short_answer_replaced() {
        let orch = make_orchestrator(Box::new(CapturingLlm::returning("ok")));
        let result = orch
            .generate("What does it cover?", &health_chunks(), None, None, None)
            .await;
        assert_eq!(result.answer, default_fallback("What does it cover?"));
    }

    #[tokio::test]
    async fn test_whitespace_answer_replaced() {
        let orch = make_orchestrator(Box::new(CapturingLlm::returning("   \n  ")));
        let result = orch
            .generate("anything to know?", &[], None, None, None)
            .await;
        assert!(!result.answer.trim().is_empty());
    }

    // ---- total answer guarantee ----

    #[tokio::test]
    async fn test_every_query_and_backend_yields_valid_answer() {
        let queries = [
            "",
            "   ",
            "Hi",
            "I need health insurance",
            "compare policies",
            "zxcvbnm",
        ];

        for query in queries {
            let backends: Vec<Box<dyn LlmService>> = vec![
                Box::new(MockLlm::new()),
                Box::new(FailingLlm(|| LlmError::Auth)),
                Box::new(FailingLlm(|| LlmError::Other("exploded".to_string()))),
                Box::new(CapturingLlm::returning("no")),
            ];
            for llm in backends {
                let orch = make_orchestrator(llm);
                let result = orch.generate(query, &[], None, None, None).await;
                assert!(!result.answer.trim().is_empty(), "empty for {:?}", query);
                assert!(
                    !is_generic_answer(&result.answer),
                    "generic leak for {:?}: {}",
                    query,
                    result.answer
                );
            }
        }
    }

    // ---- scenario: greeting ----

    #[tokio::test]
    async fn test_greeting_answer_mentions_all_topics() {
        let orch = make_orchestrator(Box::new(MockLlm::new()));
        let result = orch.generate("Hi", &[], None, None, None).await;

        // MockLlm's no-context reply is generic, so the gate substitutes the
        // small-talk fallback
        assert!(result.answer.starts_with("Hello"));
        assert!(result.answer.contains("health"));
        assert!(result.answer.contains("car"));
        assert!(result.answer.contains("bike"));
        assert_eq!(result.mode, AnswerMode::General);
    }

    // ---- scenario: specific query with no context ----

    #[tokio::test]
    async fn test_specific_no_context_query_gets_age_aware_fallback() {
        let orch = make_orchestrator(Box::new(MockLlm::new()));
        let result = orch
            .generate(
                "I need health insurance for my 57 year old father",
                &[],
                None,
                None,
                None,
            )
            .await;

        assert_eq!(result.mode, AnswerMode::General);
        assert!(result.answer.contains("age"));
        assert!(result.answer.contains("eligibility"));
        assert!(result.answer.contains('?'));
        assert_eq!(result.supporting_info.chunk_count, 0);
    }

    // ---- scenario: contextual query ----

    #[tokio::test]
    async fn test_contextual_query_reports_source_documents() {
        let orch = make_orchestrator(Box::new(MockLlm::new()));
        let result = orch
            .generate("What does it cover?", &health_chunks(), None, None, None)
            .await;

        assert_eq!(result.mode, AnswerMode::Contextual);
        assert!(result
            .supporting_info
            .document_ids
            .contains(&"health_1".to_string()));
    }

    // ---- supporting info ----

    #[tokio::test]
    async fn test_supporting_info_dedups_preserving_order() {
        let chunks = vec![
            make_chunk("health_1", ClauseCategory::Coverage, "covers a"),
            make_chunk("health_1", ClauseCategory::Exclusion, "excludes b"),
            make_chunk("health_2", ClauseCategory::Coverage, "covers c"),
        ];
        let orch = make_orchestrator(Box::new(CapturingLlm::returning(LONG_ANSWER)));
        let result = orch.generate("coverage?", &chunks, None, None, None).await;

        assert_eq!(result.supporting_info.document_ids, vec!["health_1", "health_2"]);
        assert_eq!(
            result.supporting_info.clause_categories,
            vec![ClauseCategory::Coverage, ClauseCategory::Exclusion]
        );
        assert_eq!(result.supporting_info.chunk_count, 3);
    }

    #[tokio::test]
    async fn test_supporting_info_empty_without_chunks() {
        let orch = make_orchestrator(Box::new(MockLlm::new()));
        let result = orch.generate("Hi", &[], None, None, None).await;
        assert!(result.supporting_info.document_ids.is_empty());
        assert!(result.supporting_info.clause_categories.is_empty());
        assert_eq!(result.supporting_info.chunk_count, 0);
    }
}
