//! Language-model service boundary.
//!
//! Backends implement [`LlmService`]; callers go through
//! [`complete_with_retry`], which retries transient failures with linear
//! backoff and leaves everything else to the caller's degradation policy.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

/// Failure classes a language-model backend can report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    #[error("rate limited")]
    RateLimited,
    #[error("request timed out")]
    Timeout,
    #[error("authentication failed")]
    Auth,
    #[error("quota exhausted")]
    QuotaExhausted,
    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Only rate limiting and timeouts are worth retrying; authentication
    /// and quota failures will not clear on their own.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::RateLimited | LlmError::Timeout)
    }
}

/// A completion backend: system prompt and user prompt in, answer text out.
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, LlmError>;
}

/// Call the service with bounded retry.
///
/// Transient errors are retried up to `max_retries` additional times,
/// sleeping `retry_delay * (attempt + 1)` between attempts. Non-transient
/// errors and exhausted retries surface to the caller.
pub async fn complete_with_retry(
    service: &dyn LlmService,
    system_prompt: &str,
    user_prompt: &str,
    max_retries: u32,
    retry_delay: Duration,
) -> Result<String, LlmError> {
    let mut attempt: u32 = 0;
    loop {
        match service.complete(system_prompt, user_prompt).await {
            Ok(answer) => return Ok(answer),
            Err(e) if e.is_transient() && attempt < max_retries => {
                let wait = retry_delay * (attempt + 1);
                warn!(
                    attempt = attempt + 1,
                    max_attempts = max_retries + 1,
                    error = %e,
                    "Transient language-model failure, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// =============================================================================
// MockLlm
// =============================================================================

/// Deterministic offline backend.
///
/// With policy snippets in the prompt it answers from the first one; with
/// none it produces the stock no-information reply, which the quality gate
/// downstream replaces with a topic-specific fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockLlm;

impl MockLlm {
    pub fn new() -> Self {
        Self
    }
}

const NO_CONTEXT_REPLY: &str = "I don't have specific information about that in the \
available policy documents. However, I can help you find the right insurance policy. \
Please contact a customer service agent or visit insurance provider websites for \
detailed information about eligibility, pricing, and coverage options.";

/// Value of the first `{key} ` line in the prompt, if any.
fn first_field<'a>(prompt: &'a str, key: &str) -> Option<&'a str> {
    prompt
        .lines()
        .find_map(|line| line.trim_start().strip_prefix(key))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        let policy_id = first_field(user_prompt, "Policy ID:");
        let content = first_field(user_prompt, "Content:");

        match (policy_id, content) {
            (Some(policy_id), Some(content)) => {
                let snippet: String = content.chars().take(400).collect();
                Ok(format!(
                    "Based on the supplied policy documents, here's what I found:\n\n\
                     **{}**: {}\n\n\
                     For exact eligibility and pricing, please speak with the insurance \
                     provider directly. Is there a specific clause you'd like me to look \
                     at more closely?",
                    policy_id, snippet
                ))
            }
            _ => Ok(NO_CONTEXT_REPLY.to_string()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
