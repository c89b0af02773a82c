//! Markdown structure helpers for reading model responses.
//!
//! Responses are loosely structured markdown: ATX headings delimit blocks,
//! bold labels (`**Supporting Evidence:**`) introduce fields, and lists use
//! `-`, `*` or `•` bullets. These helpers locate those pieces without
//! assuming the response is well formed.

use std::sync::LazyLock;

use regex::Regex;

/// ATX heading line. Captures: (1) hashes, (2) title text.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(#{1,6})[ \t]*(.*?)[ \t]*\r?$").expect("valid regex")
});

/// Start of the next labelled field: a line opening with a bold marker, or a
/// bullet whose content opens with a bold label (`- **Evidence:** ...`).
#[allow(clippy::expect_used)]
static BOLD_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:\*\*|[-*•][ \t]+\*\*[^*\n]+?(?::[ \t]*\*\*|\*\*[ \t]*:))")
        .expect("valid regex")
});

/// Two consecutive line breaks, optionally separated by whitespace.
#[allow(clippy::expect_used)]
static BLANK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\r?\n").expect("valid regex"));

/// Bold span including its contents.
#[allow(clippy::expect_used)]
static BOLD_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^*]+\*\*").expect("valid regex"));

#[allow(clippy::expect_used)]
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A heading found in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heading<'a> {
    pub level: usize,
    pub title: &'a str,
    /// Byte offset of the heading line.
    pub start: usize,
    /// Byte offset just past the heading line.
    pub body_start: usize,
}

/// All headings in document order.
pub fn headings(text: &str) -> Vec<Heading<'_>> {
    HEADING_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(Heading {
                level: caps.get(1)?.as_str().len(),
                title: caps.get(2)?.as_str(),
                start: whole.start(),
                body_start: whole.end(),
            })
        })
        .collect()
}

/// End offset of the block opened by `headings[index]`.
///
/// The block runs until the next heading whose level is at most `stop_level`.
fn block_end(text: &str, headings: &[Heading<'_>], index: usize, stop_level: usize) -> usize {
    headings
        .iter()
        .skip(index + 1)
        .find(|h| h.level <= stop_level)
        .map_or(text.len(), |h| h.start)
}

/// Body of a heading's block, excluding the heading line.
pub fn block_body<'a>(
    text: &'a str,
    headings: &[Heading<'_>],
    index: usize,
    stop_level: usize,
) -> &'a str {
    let end = block_end(text, headings, index, stop_level);
    &text[headings[index].body_start..end]
}

/// A heading's block including the heading line itself.
pub fn block_with_heading<'a>(
    text: &'a str,
    headings: &[Heading<'_>],
    index: usize,
    stop_level: usize,
) -> &'a str {
    let end = block_end(text, headings, index, stop_level);
    &text[headings[index].start..end]
}

/// How a labelled span ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanEnd {
    /// At the next line that starts with a bold label.
    NextLabel,
    /// At the next bold label or an empty line.
    NextLabelOrBlankLine,
}

/// Text following the first match of `label`, up to the span terminator.
///
/// Leading whitespace after the label is skipped before looking for the
/// terminator, so a label on its own line still captures the lines below it.
/// Returns `None` when the label is absent.
pub fn labelled_span<'a>(block: &'a str, label: &Regex, end: SpanEnd) -> Option<&'a str> {
    let found = label.find(block)?;
    let rest = &block[found.end()..];
    let rest = rest.trim_start();

    let mut cut = BOLD_LINE_RE.find(rest).map_or(rest.len(), |m| m.start());
    if end == SpanEnd::NextLabelOrBlankLine {
        if let Some(blank) = BLANK_LINE_RE.find(rest) {
            cut = cut.min(blank.start());
        }
    }

    Some(rest[..cut].trim())
}

/// Whether `text` opens with a bold label such as `**Evidence:**` or `**Evidence**:`.
fn starts_with_bold_label(text: &str) -> bool {
    let Some(inner) = text.strip_prefix("**") else {
        return false;
    };
    let Some(close) = inner.find("**") else {
        return false;
    };
    inner[..close].trim_end().ends_with(':') || inner[close + 2..].trim_start().starts_with(':')
}

/// Strip a leading list marker (`-`, `*`, `•` or `1.`), if any.
///
/// Lines that open a new labelled field are not list items.
fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with("**") {
        return None;
    }
    if let Some(rest) = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('*'))
        .or_else(|| trimmed.strip_prefix('•'))
    {
        let rest = rest.trim();
        return (!starts_with_bold_label(rest)).then_some(rest);
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix('.') {
            return Some(rest.trim());
        }
    }
    None
}

/// Items of a list span.
///
/// Bullet lines are returned in order with their markers removed. A span
/// without bullets yields its collapsed text as a single item, and an empty
/// span yields nothing.
pub fn list_items(span: &str) -> Vec<String> {
    let bullets: Vec<String> = span
        .lines()
        .filter_map(strip_bullet)
        .filter(|item| !item.is_empty())
        .map(collapse_whitespace)
        .collect();

    if !bullets.is_empty() {
        return bullets;
    }

    let collapsed = collapse_whitespace(span);
    if collapsed.is_empty() {
        Vec::new()
    } else {
        vec![collapsed]
    }
}

/// Replace every whitespace run with a single space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Remove bold spans (markers and contents).
pub fn strip_bold_spans(text: &str) -> String {
    BOLD_SPAN_RE.replace_all(text, "").into_owned()
}

/// Build a case-insensitive label matcher for `words` (a regex alternation).
///
/// Matches the bold form (`**Key Strengths:**`, `**Company's Contribution**:`)
/// and a plain form at the start of a line (`Evidence:`).
///
/// # Errors
/// Returns the regex error when `words` is not a valid pattern fragment.
pub fn label_regex(words: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?i)\*\*[^*\n]*?(?:{words})[^*\n]*?\*\*:?|(?m:^)[ \t]*[-*]?[ \t]*(?:{words})[^:\n]*:"
    ))
}
