//! Response extraction: turns the raw text of a tailoring call into the
//! compilable LaTeX document plus the model's trailing improvements summary.
//!
//! Pipeline: strip reasoning blocks → unwrap a code fence → trim → split on
//! `\end{document}`. Every step is total; nothing here returns an error.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

/// Marks the end of the resume markup. Anything after it is commentary.
pub const DOCUMENT_END_MARKER: &str = r"\end{document}";

const FENCE: &str = "```";

/// `None` only if the pattern fails to build, in which case stripping is skipped.
///
/// Tags match ASCII case-insensitively only; no Unicode case folding.
static THINK_BLOCK_RE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?s)<[tT][hH][iI][nN][kK]>.*?</[tT][hH][iI][nN][kK]>").ok()
});

/// The cleaned output of one tailoring request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TailorResult {
    /// LaTeX source intended for compilation and preview. May be empty.
    pub document: String,
    /// Free-form trailing commentary from the model. Empty when absent.
    pub summary: String,
}

impl TailorResult {
    pub fn has_summary(&self) -> bool {
        !self.summary.is_empty()
    }
}

/// Removes every `<think>…</think>` span (ASCII case-insensitive, non-greedy).
///
/// Falls back to the untouched input if the pattern is unavailable.
pub fn strip_reasoning_blocks(text: &str) -> Cow<'_, str> {
    match THINK_BLOCK_RE.as_ref() {
        Some(re) => re.replace_all(text, ""),
        None => {
            warn!("Reasoning block pattern unavailable; leaving response untouched");
            Cow::Borrowed(text)
        }
    }
}

/// Unwraps a response that starts with a ```` ```lang\n ```` fence.
///
/// The closing fence is the last ```` ``` ```` in the text and must start after
/// the opening marker ends; otherwise the text is returned as is.
pub fn strip_code_fence(text: &str) -> &str {
    let Some(open_len) = opening_fence_len(text) else {
        return text;
    };

    match text.rfind(FENCE) {
        Some(closing) if closing > open_len => &text[open_len..closing],
        _ => text,
    }
}

/// Length of a leading ```` ``` ```` + ASCII letters + `\n` marker, if present.
fn opening_fence_len(text: &str) -> Option<usize> {
    let rest = text.strip_prefix(FENCE)?;
    let lang_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .count();

    rest[lang_len..]
        .starts_with('\n')
        .then_some(FENCE.len() + lang_len + 1)
}

/// Splits cleaned text at the first document-end marker.
///
/// The marker stays with the document; the summary is whatever follows it.
pub fn split_document(cleaned: &str) -> TailorResult {
    match cleaned.find(DOCUMENT_END_MARKER) {
        Some(idx) => {
            let end = idx + DOCUMENT_END_MARKER.len();
            TailorResult {
                document: cleaned[..end].trim().to_string(),
                summary: cleaned[end..].trim().to_string(),
            }
        }
        None => TailorResult {
            document: cleaned.to_string(),
            summary: String::new(),
        },
    }
}

/// Runs the full extraction pipeline on a raw model response.
pub fn extract_tailor_result(raw: &str) -> TailorResult {
    let without_reasoning = strip_reasoning_blocks(raw);
    let cleaned = strip_code_fence(&without_reasoning).trim();
    let result = split_document(cleaned);

    debug!(
        raw_len = raw.len(),
        document_len = result.document.len(),
        summary_len = result.summary.len(),
        "Extracted tailored resume"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAILORED_DOC: &str = "\\documentclass{article}\n\\begin{document}\nHello\n\\end{document}";

    #[test]
    fn test_strip_reasoning_blocks_without_tags_is_identity() {
        for input in ["", "plain text", "\\begin{document}\n<thin>k</thin>", "think </think> only"] {
            assert_eq!(strip_reasoning_blocks(input), input);
        }
    }

    #[test]
    fn test_strip_reasoning_blocks_removes_inline_block() {
        assert_eq!(
            strip_reasoning_blocks("before<think>secret</think>after"),
            "beforeafter"
        );
    }

    #[test]
    fn test_strip_reasoning_blocks_is_case_insensitive() {
        assert_eq!(strip_reasoning_blocks("<THINK>x</THINK>"), "");
        assert_eq!(strip_reasoning_blocks("a<Think>x</tHiNk>b"), "ab");
    }

    #[test]
    fn test_strip_reasoning_blocks_ignores_unicode_case_folding() {
        // U+212A KELVIN SIGN folds to `k` under Unicode rules only.
        let input = "a<thin\u{212A}>x</thin\u{212A}>b";
        assert_eq!(strip_reasoning_blocks(input), input);
    }

    #[test]
    fn test_strip_reasoning_blocks_spans_newlines_and_repeats() {
        let input = "<think>\nline one\nline two\n</think>A<think>again</think>B";
        assert_eq!(strip_reasoning_blocks(input), "AB");
    }

    #[test]
    fn test_strip_reasoning_blocks_is_non_greedy() {
        let input = "<think>a</think>keep</think>";
        assert_eq!(strip_reasoning_blocks(input), "keep</think>");
    }

    #[test]
    fn test_strip_reasoning_blocks_leaves_unclosed_tag() {
        let input = "<think>never closed";
        assert_eq!(strip_reasoning_blocks(input), input);
    }

    #[test]
    fn test_strip_code_fence_with_language_tag() {
        let input = "```latex\nBODY\n```";
        assert_eq!(strip_code_fence(input), "BODY\n");
        assert_eq!(strip_code_fence(input).trim(), "BODY");
    }

    #[test]
    fn test_strip_code_fence_without_language_tag() {
        assert_eq!(strip_code_fence("```\nBODY\n```"), "BODY\n");
    }

    #[test]
    fn test_strip_code_fence_without_closing_fence_is_unchanged() {
        let input = "```latex\nBODY with no closing";
        assert_eq!(strip_code_fence(input), input);
    }

    #[test]
    fn test_strip_code_fence_closing_must_follow_opening_marker() {
        // Closing fence starts exactly where the opening marker ends.
        let input = "```\n```";
        assert_eq!(strip_code_fence(input), input);
    }

    #[test]
    fn test_strip_code_fence_uses_last_closing_fence() {
        let input = "```tex\na\n```\nb\n```";
        assert_eq!(strip_code_fence(input), "a\n```\nb\n");
    }

    #[test]
    fn test_strip_code_fence_requires_fence_at_start() {
        let input = "text\n```latex\nBODY\n```";
        assert_eq!(strip_code_fence(input), input);
        // Non-letter language tag is not an opening fence.
        let input = "```c++\nBODY\n```";
        assert_eq!(strip_code_fence(input), input);
    }

    #[test]
    fn test_split_document_with_trailing_summary() {
        let cleaned = format!("{TAILORED_DOC}\n\nGreat match, 85%!");
        let result = split_document(&cleaned);
        assert!(result.document.ends_with(DOCUMENT_END_MARKER));
        assert_eq!(result.document, TAILORED_DOC);
        assert_eq!(result.summary, "Great match, 85%!");
        assert!(result.has_summary());
    }

    #[test]
    fn test_split_document_without_marker() {
        let result = split_document("\\section{Experience} only");
        assert_eq!(result.document, "\\section{Experience} only");
        assert_eq!(result.summary, "");
        assert!(!result.has_summary());
    }

    #[test]
    fn test_split_document_marker_is_case_sensitive() {
        let result = split_document("body \\END{document} tail");
        assert_eq!(result.document, "body \\END{document} tail");
        assert!(result.summary.is_empty());
    }

    #[test]
    fn test_extract_full_pipeline() {
        let raw = format!(
            "<think>\nThe candidate lacks Kubernetes.\n</think>```latex\n{TAILORED_DOC}\n\n- Added Kubernetes keywords\n```\n"
        );
        let result = extract_tailor_result(&raw);
        assert_eq!(result.document, TAILORED_DOC);
        assert_eq!(result.summary, "- Added Kubernetes keywords");
    }

    #[test]
    fn test_extract_newline_after_reasoning_block_keeps_fence() {
        // The newline left behind by the think block sits before the fence,
        // so the fence is not recognised and survives trimming.
        let raw = format!("<think>plan</think>\n```latex\n{TAILORED_DOC}\n```");
        let result = extract_tailor_result(&raw);
        assert_eq!(result.document, format!("```latex\n{TAILORED_DOC}"));
        assert_eq!(result.summary, "```");
    }

    #[test]
    fn test_extract_leading_whitespace_blocks_fence_detection() {
        // Leading whitespace blocks fence detection; the fence text survives trimming.
        let raw = "  ```latex\nBODY\n```";
        let result = extract_tailor_result(raw);
        assert_eq!(result.document, "```latex\nBODY\n```");
    }

    #[test]
    fn test_extract_empty_input() {
        assert_eq!(extract_tailor_result(""), TailorResult::default());
    }

    #[test]
    fn test_extract_document_never_contains_reasoning_or_fence() {
        let raw = format!("<think>plan</think>```\n{TAILORED_DOC}\n```");
        let result = extract_tailor_result(&raw);
        assert!(!result.document.to_lowercase().contains("<think>"));
        assert!(!result.document.contains(FENCE));
    }
}
