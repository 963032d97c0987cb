//! Prompt construction for grounded and general answering.
//!
//! The context-block layout is load-bearing: `MockLlm` and any real backend
//! read the `Policy ID:` / `Content:` lines, so changes here must keep the
//! field labels stable.

use brolly_core::RetrievedChunk;

/// System prompt for grounded (contextual) answering.
pub const SYSTEM_PROMPT: &str = "\
You are a helpful and knowledgeable insurance assistant. You help users \
understand insurance policies: coverage, exclusions, limits, and terms.

GUIDELINES:
1. Ground your answer in the policy document excerpts provided in the user \
message. They contain the actual policy text.
2. Reference policy document identifiers when you use them, so the user can \
trace the answer back to a document.
3. Do not invent premium amounts, coverage limits, company names, or policy \
terms that are not in the excerpts. If a detail is missing, say so and point \
the user to the insurance provider.
4. Be specific where the excerpts are specific, and clear about when you are \
giving general guidance instead.
5. Structure the answer: direct answer first, then supporting details, then \
next steps. End with a clarifying question when one would move the \
conversation forward.";

/// System prompt for general answering when no document context exists.
pub const GENERAL_SYSTEM_PROMPT: &str = "\
You are a helpful insurance assistant. No policy documents are available for \
this question, so answer from general insurance knowledge: explain the \
usual coverage options, typical exclusions, and what information you need \
from the user to narrow things down. Be specific and practical, never \
vague. Do not invent policy details, providers, or prices. End with one \
clarifying question.";

/// Render retrieved chunks as a context block, one entry per chunk:
///
/// ```text
/// [Chunk 1]
/// Policy ID: ...
/// Policy Type: ...
/// Clause Type: ...
/// Region: ...
/// Content: ...
/// ```
pub fn build_context_block(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[Chunk {}]\nPolicy ID: {}\nPolicy Type: {}\nClause Type: {}\nRegion: {}\nContent: {}\n",
                i + 1,
                chunk.record.document_id,
                chunk.record.document_type,
                chunk.record.clause_category,
                chunk.record.region,
                chunk.record.text,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// User prompt for grounded answering: documents, optional prior
/// conversation, the question, and answering instructions.
pub fn build_grounded_prompt(query: &str, context: &str, conversation: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are helping a user understand insurance policies. Use the following \
         policy document excerpts to answer their question.\n\nPOLICY DOCUMENTS:\n",
    );
    prompt.push_str(context);

    if let Some(history) = conversation.filter(|history| !history.is_empty()) {
        prompt.push_str("\n\nPRIOR CONVERSATION:\n");
        prompt.push_str(history);
    }

    prompt.push_str("\n\nUSER'S QUESTION: ");
    prompt.push_str(query);
    prompt.push_str(
        "\n\nINSTRUCTIONS:\n\
         1. Read the policy documents carefully\n\
         2. Answer the user's question using information from the documents\n\
         3. Be specific and detailed when the documents contain relevant information\n\
         4. If the user asks about something not in the documents (like exact premium \
         costs or age eligibility), acknowledge this and guide them to the insurance \
         provider\n\
         5. Structure your answer clearly with a direct answer, specific details from \
         the policies, and helpful next steps\n\n\
         Provide a comprehensive, helpful answer now:",
    );
    prompt
}

/// User prompt for general answering with no document grounding.
pub fn build_general_prompt(query: &str, conversation: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(history) = conversation.filter(|history| !history.is_empty()) {
        prompt.push_str("PRIOR CONVERSATION:\n");
        prompt.push_str(history);
        prompt.push_str("\n\n");
    }
    prompt.push_str("USER'S QUESTION: ");
    prompt.push_str(query);
    prompt
}
