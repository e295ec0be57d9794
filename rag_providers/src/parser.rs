//! Parses the nested-array JSONP-ish wire format the web-session endpoint
//! returns: a `)]}'` anti-hijacking prelude followed by one JSON array per
//! non-empty line, each line itself wrapping a deeper array that somewhere
//! contains the actual response text.

use rag_core::{CoreError, CoreResult};
use serde_json::Value;
use tracing::warn;

const ANTI_HIJACKING_PRELUDE: &str = ")]}'";
const MAX_DESCENT_DEPTH: usize = 10;
const MIN_PLAIN_LEN: usize = 20;
const MIN_UNCONDITIONAL_LEN: usize = 100;

/// Strips the prelude, splits into candidate array lines (those starting
/// with `[`), and tries to extract the response text from line index 2,
/// then 1, then 0, then the first line that parses at all.
///
/// `CoreError::Parse` is reserved for the case where there is no parseable
/// JSON line at all (nothing to even attempt extraction on). If at least
/// one line parsed but no plausible text was found inside any of them,
/// that's a known-shape-but-unexpected-content response, not a parse
/// failure: this logs a warning and returns `Ok(String::new())`.
pub fn parse_response_text(body: &str) -> CoreResult<String> {
    let stripped = body
        .strip_prefix(ANTI_HIJACKING_PRELUDE)
        .unwrap_or(body);

    let candidate_lines: Vec<&str> = stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.starts_with('['))
        .collect();

    if candidate_lines.is_empty() {
        return Err(CoreError::Parse("no JSON array lines found in response body".to_string()));
    }

    let parsed_lines: Vec<Value> = candidate_lines
        .iter()
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .collect();

    if parsed_lines.is_empty() {
        return Err(CoreError::Parse("no line in response body was valid JSON".to_string()));
    }

    for &preferred_index in &[2_usize, 1, 0] {
        if let Some(value) = parsed_lines.get(preferred_index) {
            if let Some(text) = extract_text(value, 0) {
                return Ok(text);
            }
        }
    }

    for value in &parsed_lines {
        if let Some(text) = extract_text(value, 0) {
            return Ok(text);
        }
    }

    warn!("response body parsed as JSON but no plausible text was found inside it");
    Ok(String::new())
}

/// Depth-limited recursive descent: returns the first string at least
/// `MIN_UNCONDITIONAL_LEN` characters long, or at least `MIN_PLAIN_LEN`
/// characters long *and* containing a space (filters out ids/hashes that
/// happen to clear the short-length bar).
fn extract_text(value: &Value, depth: usize) -> Option<String> {
    if depth > MAX_DESCENT_DEPTH {
        return None;
    }

    match value {
        Value::String(s) => {
            let len = s.chars().count();
            if len > MIN_UNCONDITIONAL_LEN || (len > MIN_PLAIN_LEN && s.contains(' ')) {
                Some(s.clone())
            } else {
                None
            }
        }
        Value::Array(items) => items.iter().find_map(|item| extract_text(item, depth + 1)),
        _ => None,
    }
}
