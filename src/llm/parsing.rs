//! Shared response-parsing utilities for the LLM collaborator.
//!
//! LLM responses are unpredictable — they may wrap content in markdown
//! fences, include explanatory prose before/after, or return malformed
//! structure. Ported near-verbatim from the teacher's relation-array
//! parser: `extract_json_array`/`strip_code_fences`/`find_matching_bracket`
//! are reused for the verifier's JSON object, and a sibling
//! `extract_tagged` applies the same fence-stripping discipline to the
//! extractor's `<fact>...</fact>`-delimited candidates.

use crate::error::{FactCheckError, Result};

/// Extract the list of candidate statements from an extractor response
/// delimited by `<fact>...</fact>` tags.
pub fn extract_tagged(response: &str, tag: &str) -> Vec<String> {
    let stripped = strip_code_fences(response.trim());
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let mut candidates = Vec::new();
    let mut rest = stripped;
    while let Some(start) = rest.find(&open) {
        let after_open = &rest[start + open.len()..];
        let Some(end) = after_open.find(&close) else {
            break;
        };
        let statement = after_open[..end].trim();
        if !statement.is_empty() {
            candidates.push(statement.to_string());
        }
        rest = &after_open[end + close.len()..];
    }
    candidates
}

/// Parse the verifier's `{"decision": "...", "reason": "..."}` response.
pub fn parse_verification_json(response: &str) -> Result<(String, String)> {
    let json_str = extract_json_object(response);
    let value: serde_json::Value = serde_json::from_str(&json_str).map_err(|e| {
        FactCheckError::VerificationParseError(format!("invalid JSON ({e}): {response}"))
    })?;

    let decision = value
        .get("decision")
        .and_then(|v| v.as_str())
        .ok_or_else(|| FactCheckError::VerificationParseError(format!("missing 'decision' field: {response}")))?
        .trim()
        .to_lowercase();
    let reason = value
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    Ok((decision, reason))
}

/// Extract a JSON object from a response that may contain extra text.
fn extract_json_object(response: &str) -> String {
    let response = response.trim();
    let stripped = strip_code_fences(response);

    if stripped.starts_with('{')
        && let Some(end) = find_matching_brace(stripped)
    {
        return stripped[..=end].to_string();
    }

    if let Some(start) = stripped.find('{')
        && let Some(end) = find_matching_brace(&stripped[start..])
    {
        return stripped[start..=start + end].to_string();
    }

    stripped.to_string()
}

/// Strip markdown code fences (``` or ```json) from around content.
fn strip_code_fences(s: &str) -> &str {
    let s = s.trim();

    if s.starts_with("```") {
        if let Some(first_newline) = s.find('\n') {
            let inner = &s[first_newline + 1..];
            if let Some(closing) = inner.rfind("```") {
                return inner[..closing].trim();
            }
        }
    }

    s
}

/// Find the index of the `}` that matches the first `{` in the string,
/// ignoring braces inside quoted strings.
fn find_matching_brace(s: &str) -> Option<usize> {
    find_matching(s, '{', '}')
}

/// Find the index of the `]` that matches the first `[` in the string,
/// ignoring brackets inside quoted strings. Exposed for extractor-style
/// JSON-array responses if a future provider needs it.
#[allow(dead_code)]
fn find_matching_bracket(s: &str) -> Option<usize> {
    find_matching(s, '[', ']')
}

fn find_matching(s: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.chars().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if c == '\\' && in_string {
            escape_next = true;
            continue;
        }
        if c == '"' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_tagged_single_fact() {
        let response = "<fact>ACME shipped 12,345 units in 2023.</fact>";
        let facts = extract_tagged(response, "fact");
        assert_eq!(facts, vec!["ACME shipped 12,345 units in 2023.".to_string()]);
    }

    #[test]
    fn extract_tagged_multiple_facts() {
        let response = "<fact>First fact.</fact>\n<fact>Second fact.</fact>";
        let facts = extract_tagged(response, "fact");
        assert_eq!(facts, vec!["First fact.".to_string(), "Second fact.".to_string()]);
    }

    #[test]
    fn extract_tagged_no_candidates_returns_empty() {
        assert!(extract_tagged("No facts here.", "fact").is_empty());
    }

    #[test]
    fn extract_tagged_strips_markdown_fences() {
        let response = "```\n<fact>Fenced fact.</fact>\n```";
        let facts = extract_tagged(response, "fact");
        assert_eq!(facts, vec!["Fenced fact.".to_string()]);
    }

    #[test]
    fn extract_tagged_ignores_empty_tags() {
        let response = "<fact></fact><fact>Real fact.</fact>";
        let facts = extract_tagged(response, "fact");
        assert_eq!(facts, vec!["Real fact.".to_string()]);
    }

    #[test]
    fn parse_verification_json_clean() {
        let response = r#"{"decision": "verified", "reason": "supported by context"}"#;
        let (decision, reason) = parse_verification_json(response).unwrap();
        assert_eq!(decision, "verified");
        assert_eq!(reason, "supported by context");
    }

    #[test]
    fn parse_verification_json_wrapped_in_prose_and_fences() {
        let response = "Here's my decision:\n```json\n{\"decision\": \"rejected\", \"reason\": \"not in source\"}\n```";
        let (decision, reason) = parse_verification_json(response).unwrap();
        assert_eq!(decision, "rejected");
        assert_eq!(reason, "not in source");
    }

    #[test]
    fn parse_verification_json_missing_decision_errors() {
        let response = r#"{"reason": "no decision field"}"#;
        assert!(parse_verification_json(response).is_err());
    }

    #[test]
    fn parse_verification_json_invalid_json_errors() {
        assert!(parse_verification_json("not json at all").is_err());
    }

    #[test]
    fn find_matching_brace_handles_nested_quotes() {
        assert_eq!(find_matching_brace(r#"{"a": "b}c"}"#), Some(11));
    }

    #[test]
    fn find_matching_bracket_basic() {
        assert_eq!(find_matching_bracket("[abc]"), Some(4));
    }
}
