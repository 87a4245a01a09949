//! Default prompt templates for the extractor (C6) and verifier (C7).
//!
//! The core treats prompts as injected templates, not fixed wording —
//! `Config` can override either string. These are the defaults, kept in
//! their own module the way the teacher keeps `GRAPH_EXTRACTION_SYSTEM_PROMPT`
//! separate from the providers that use it.

/// System prompt for candidate-fact extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are a fact extraction engine. You are given a chunk of text (delimited by ```). Your task is to extract every self-contained, independently verifiable factual statement mentioned in the chunk.

Rules:
- Each statement must be understandable without the surrounding context (resolve pronouns, spell out what "it"/"they" refer to).
- Do not paraphrase beyond what is needed for standalone clarity; stay close to the source wording.
- Do not infer facts that are not explicitly stated.
- Emit zero statements if the chunk contains no verifiable facts — this is a valid outcome.
- Output each statement wrapped in <fact></fact> tags, one per line, and nothing else."#;

pub fn extraction_user_prompt(chunk_content: &str) -> String {
    format!("chunk:\n```{chunk_content}```\n\nfacts:")
}

/// System prompt for verifying a single candidate statement against its
/// source chunk. The verifier must attribute its decision to the given
/// context, not to world knowledge, and should run at low temperature
/// for repeatable decisions (a provider-level knob, not enforced here).
pub const VERIFICATION_SYSTEM_PROMPT: &str = r#"You are a fact verification engine. You are given a candidate statement and the source text it was extracted from. Decide whether the source text actually supports the statement.

Judge only against the provided source text, not general world knowledge. If the statement is supported, decide "verified". If it is not supported, contradicted, or not present in the source text, decide "rejected".

Output a single JSON object and nothing else:
{"decision": "verified" | "rejected", "reason": "one sentence explaining the decision"}"#;

pub fn verification_user_prompt(statement: &str, original_text: &str) -> String {
    format!(
        "statement: {statement}\n\nsource text:\n```{original_text}```\n\ndecision:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_includes_chunk_content() {
        let prompt = extraction_user_prompt("some content");
        assert!(prompt.contains("some content"));
    }

    #[test]
    fn verification_prompt_includes_statement_and_source() {
        let prompt = verification_user_prompt("a statement", "the source");
        assert!(prompt.contains("a statement"));
        assert!(prompt.contains("the source"));
    }
}
