//! WebVTT caption markup normalisation.
//!
//! Caption tracks fetched from the media platform are WebVTT documents full of
//! scaffolding (banner, cue numbers, timing ranges, style blocks) and inline
//! markup. [`parse`] flattens them into plain text lines, collapsing the cue
//! repetition that auto-generated tracks produce during transitions.

use once_cell::sync::Lazy;
use regex::Regex;

/// Parsed text shorter than this is treated as "no usable captions".
pub const MIN_USABLE_CHARS: usize = 30;

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

static STYLE_DIRECTIVE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]+\}").expect("valid style directive regex"));

static CUE_INDEX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid cue index regex"));

const ENTITIES: [(&str, &str); 6] = [
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&nbsp;", " "),
    ("&#39;", "'"),
    ("&quot;", "\""),
];

/// Parse a caption document into newline-joined text.
///
/// Returns `None` when the document holds no usable cues, including when the
/// surviving text is shorter than [`MIN_USABLE_CHARS`].
pub fn parse(markup: &str) -> Option<String> {
    let text = normalize_cues(markup).join("\n");
    is_usable(&text).then_some(text)
}

/// Whether a transcript candidate is long enough to stop the fallback chain.
pub fn is_usable(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.chars().count() >= MIN_USABLE_CHARS
}

/// Extract cue text lines in order, with consecutive duplicates collapsed.
pub fn normalize_cues(markup: &str) -> Vec<String> {
    let mut cues: Vec<String> = Vec::new();
    // STYLE and NOTE open a block only after a blank line and run to the next one
    let mut in_block = false;
    let mut block_start = true;

    for raw in markup.lines() {
        let line = raw.trim();
        if line.is_empty() {
            in_block = false;
            block_start = true;
            continue;
        }
        let opens_block = block_start && is_block_header(line);
        block_start = false;
        if in_block || opens_block {
            in_block = true;
            continue;
        }
        if is_scaffolding(line) {
            continue;
        }

        let text = clean_cue_text(line);
        if text.is_empty() {
            continue;
        }
        if cues.last().is_some_and(|previous| *previous == text) {
            continue;
        }
        cues.push(text);
    }

    cues
}

fn is_block_header(line: &str) -> bool {
    line == "STYLE" || line == "NOTE" || line.starts_with("NOTE ") || line.starts_with("NOTE\t")
}

fn is_scaffolding(line: &str) -> bool {
    line == "WEBVTT"
        || line.starts_with("WEBVTT ")
        || line.contains("-->")
        || CUE_INDEX_REGEX.is_match(line)
        || line.starts_with("Kind:")
        || line.starts_with("Language:")
}

fn clean_cue_text(line: &str) -> String {
    let without_tags = TAG_REGEX.replace_all(line, "");
    let mut text = without_tags.into_owned();
    for (entity, replacement) in ENTITIES {
        text = text.replace(entity, replacement);
    }
    STYLE_DIRECTIVE_REGEX.replace_all(&text, "").trim().to_string()
}
