//! Self-referential phrase stripping for `cleaned_query`.
//!
//! The decision agent asks the model to produce `cleaned_query` directly,
//! but local models are small and occasionally forget the instruction. This
//! is the deterministic fallback `RagAgent::enforce_invariants` runs over
//! whatever the model returned, regardless of which `LocalLlmClient`
//! produced it, using the same pattern-table-of-regexes approach to query
//! normalization as the memory query expander.

use regex::Regex;
use std::sync::OnceLock;

struct Pattern {
    regex: Regex,
    replacement: &'static str,
}

fn patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Order matters: longer/more specific phrasing first so a shorter
        // pattern doesn't eat part of a longer one's match.
        let raw: &[(&str, &str)] = &[
            (r"(?i)\s*according to my (notes|files|documents|uploads)\b", ""),
            (r"(?i)\s*from my (notes|files|documents|uploads)\b", ""),
            (r"(?i)\s*in my (notes|files|documents|uploads)\b", ""),
            (r"(?i)^summarize my (notes|files|documents|uploads) about\s+", "summarize "),
            (r"(?i)^summarize my (notes|files|documents|uploads)\s*(on|about)?\s*", "summarize "),
            (r"(?i)\bwhat i uploaded\b", ""),
            (r"(?i)\bwhat i imported\b", ""),
            (r"(?i)\s*that i uploaded\b", ""),
            (r"(?i)\s*that i imported\b", ""),
            (r"(?i)\bmy (notes|files|documents|uploads) (say|says|mention|mentions)\b", "it says"),
        ];
        raw.iter()
            .map(|(pattern, replacement)| Pattern {
                regex: Regex::new(pattern).expect("static pattern is valid regex"),
                replacement,
            })
            .collect()
    })
}

/// Strips self-referential framing from a user query. Returns the original
/// string unchanged when nothing matched.
#[must_use]
pub fn strip_self_referential(query: &str) -> String {
    let mut result = query.to_string();

    for pattern in patterns() {
        result = pattern.regex.replace_all(&result, pattern.replacement).to_string();
    }

    let trimmed = result.trim();
    // Normalize doubled whitespace left behind by a mid-sentence removal,
    // and restore a trailing '?' dropped by the "according to..." strip.
    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return query.to_string();
    }

    if query.trim_end().ends_with('?') && !collapsed.ends_with('?') {
        format!("{collapsed}?")
    } else {
        collapsed
    }
}
