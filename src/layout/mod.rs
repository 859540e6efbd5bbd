//! Text preparation and greedy word wrapping for the PDF renderer.

use once_cell::sync::Lazy;
use regex::Regex;

pub mod metrics;
pub mod paginate;

pub use metrics::{StandardFont, TextMeasure};

/// Source lines grouped into one body paragraph.
pub const LINES_PER_PARAGRAPH: usize = 4;

/// Longest title shown in running headers before it is cut.
pub const HEADER_TITLE_MAX_CHARS: usize = 55;

static TIMESTAMP_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\d{2}:\d{2}(?::\d{2})?\][ \t]*").expect("valid timestamp regex"));

/// One wrapped, render-ready line.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub text: String,
    /// Rendered width in layout units
    pub width: f32,
}

/// Replace everything outside printable ASCII with a space.
///
/// The standard-14 fonts only guarantee glyphs for that range.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { ' ' })
        .collect()
}

/// Greedy word wrap of `text` to `max_width`.
///
/// A single word wider than `max_width` is kept whole on its own line.
pub fn wrap(text: &str, font: &dyn TextMeasure, size: f32, max_width: f32) -> Vec<LayoutLine> {
    let clean = sanitize(text);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in clean.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{} {}", current, word);
        if font.measure(&candidate, size) > max_width {
            let width = font.measure(&current, size);
            lines.push(LayoutLine {
                text: std::mem::replace(&mut current, word.to_string()),
                width,
            });
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        let width = font.measure(&current, size);
        lines.push(LayoutLine { text: current, width });
    }

    lines
}

/// Remove inline `[MM:SS]` / `[HH:MM:SS]` markers and trim the result.
pub fn strip_timestamps(text: &str) -> String {
    TIMESTAMP_REGEX.replace_all(text, "").trim().to_string()
}

/// Consecutive non-empty source lines rendered as one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub lines: Vec<String>,
}

impl Paragraph {
    /// Source lines joined with single spaces
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }
}

/// Group non-empty trimmed lines into paragraphs of up to four lines.
pub fn build_paragraphs(text: &str) -> Vec<Paragraph> {
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    lines
        .chunks(LINES_PER_PARAGRAPH)
        .map(|group| Paragraph { lines: group.to_vec() })
        .collect()
}

/// Title for running headers: sanitised and cut to 55 visible characters.
pub fn header_title(title: &str) -> String {
    let clean = sanitize(title).trim().to_string();
    if clean.chars().count() > HEADER_TITLE_MAX_CHARS {
        let cut: String = clean.chars().take(HEADER_TITLE_MAX_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        clean
    }
}
