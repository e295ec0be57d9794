//! Formats ranked context chunks into the delimiter-wrapped block the
//! prompt template splices into the system message.

use crate::types::RankedContext;

const HEADER: &str = "=== RETRIEVED CONTEXT ===";
const FOOTER: &str = "=== END RETRIEVED CONTEXT ===";
const DIVIDER: &str = "---";
const SOURCE_TAIL_LEN: usize = 47;

/// Builds the formatted context block for `contexts`. Returns an empty
/// string when there is nothing to include, so callers can splice the
/// result into a prompt unconditionally without an extra branch.
#[must_use]
pub fn format_context_for_prompt(contexts: &[RankedContext]) -> String {
    if contexts.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(HEADER);
    out.push('\n');

    for (index, context) in contexts.iter().enumerate() {
        if index > 0 {
            out.push_str(DIVIDER);
            out.push('\n');
        }
        out.push_str(&format!("[Source: {}]\n", truncate_source(&context.source)));
        out.push_str(context.content.trim());
        out.push('\n');
    }

    out.push_str(FOOTER);
    out
}

/// Sources longer than 50 characters are shown as an ellipsis plus their
/// last 47 characters, so a long filesystem path still ends on the part a
/// user recognizes (the filename) rather than the part that doesn't fit.
fn truncate_source(source: &str) -> String {
    if source.chars().count() <= 50 {
        return source.to_string();
    }
    let tail: String = source
        .chars()
        .rev()
        .take(SOURCE_TAIL_LEN)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(source: &str, content: &str, score: f64) -> RankedContext {
        RankedContext {
            content: content.to_string(),
            source: source.to_string(),
            score,
            id: "id".to_string(),
        }
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(format_context_for_prompt(&[]), "");
    }

    #[test]
    fn single_chunk_has_header_source_and_footer() {
        let out = format_context_for_prompt(&[ctx("notes.md", "some content", 0.9)]);
        assert!(out.starts_with(HEADER));
        assert!(out.ends_with(FOOTER));
        assert!(out.contains("[Source: notes.md]"));
        assert!(out.contains("some content"));
    }

    #[test]
    fn multiple_chunks_are_divider_separated() {
        let out = format_context_for_prompt(&[
            ctx("a.md", "alpha", 0.9),
            ctx("b.md", "beta", 0.8),
        ]);
        assert_eq!(out.matches(DIVIDER).count(), 1);
    }

    #[test]
    fn long_source_is_truncated_to_tail() {
        let long_source = "/home/user/Documents/projects/nested/deep/folder/structure/final_report.pdf";
        assert!(long_source.chars().count() > 50);
        let out = format_context_for_prompt(&[ctx(long_source, "x", 0.9)]);
        assert!(out.contains('…'));
        let tail: String = long_source.chars().rev().take(SOURCE_TAIL_LEN).collect::<Vec<_>>().into_iter().rev().collect();
        assert!(out.contains(&tail));
    }

    #[test]
    fn short_source_is_unchanged() {
        let out = format_context_for_prompt(&[ctx("short.pdf", "x", 0.9)]);
        assert!(out.contains("[Source: short.pdf]"));
        assert!(!out.contains('…'));
    }
}
