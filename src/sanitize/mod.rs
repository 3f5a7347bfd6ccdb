//! Cleanup of summarizer output into short, readable prose.
//!
//! The summarizer returns scraped page text with navigation cruft, markdown
//! and consent banners mixed in. The pipeline here strips that noise, rebuilds
//! paragraph and heading structure, drops boilerplate sentences and bounds the
//! result at a sentence boundary.

use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_SUMMARY_LENGTH: usize = 2000;
pub const MIN_PARAGRAPH_LENGTH: usize = 50;
pub const HEADING_MAX_LENGTH: usize = 100;
pub const HEADING_MARKER: &str = "## ";
pub const ELLIPSIS: &str = "...";

/// Lines containing any of these (case-insensitive) are dropped from prose.
pub const DENYLIST: &[&str] = &[
    "cookie",
    "privacy policy",
    "terms of service",
    "newsletter",
    "subscribe",
    "advertisement",
    "sign up",
    "log in",
    "create account",
];

static SKIP_TO_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Skip to (?:main )?content.*?(?:[\n.]|$)").unwrap());

static BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"When autocomplete results are available.*?select\.?",
        r"Touch device users,.*?gestures\.?",
        r"Press Enter to search\.?",
        r"(?i)(?:log[- ]?in|sign[- ]?up|register|subscribe)(?:\snow|\stoday)?",
        r"(?i)accept (?:all )?cookies",
        r"(?i)we value your privacy",
        r"(?i)stay up to date",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static MARKDOWN_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[.*?\]\(.*?\)").unwrap());
static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]\(.*?\)").unwrap());
static MARKDOWN_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#*`]").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

static TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?])\s+").unwrap());

/// Run the full cleanup pipeline over raw summarizer text.
///
/// Returns an empty string when nothing survives. Text that already has the
/// shape this pipeline produces is returned unchanged, so sanitizing a
/// summary a second time is a no-op.
pub fn sanitize_summary(raw: &str) -> String {
    if is_settled(raw) {
        return raw.to_string();
    }
    let text = clean_text(raw.trim());
    let text = reflow_paragraphs(&text);
    truncate_at_sentence(&text, MAX_SUMMARY_LENGTH)
}

/// Strip boilerplate, markup and excess whitespace until nothing is left to
/// strip. Removing one pattern can expose another (`Sign **up**`), so the
/// steps repeat; every rewrite shortens the text, which bounds the loop.
pub fn clean_text(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let text = strip_boilerplate(text);
    let text = strip_markup(&text);
    normalize_whitespace(&text)
}

/// Remove navigation prompts, consent banners and auth/subscribe calls to action.
pub fn strip_boilerplate(text: &str) -> String {
    let mut out = SKIP_TO_CONTENT.replace_all(text, "").into_owned();
    for pattern in BOILERPLATE.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    out
}

/// Remove markdown images, links and emphasis characters, then HTML tags.
pub fn strip_markup(text: &str) -> String {
    let out = MARKDOWN_IMAGE.replace_all(text, "");
    let out = MARKDOWN_LINK.replace_all(&out, "");
    let out = MARKDOWN_CHARS.replace_all(&out, "");
    HTML_TAG.replace_all(&out, "").into_owned()
}

/// Unix line endings, at most one blank line in a row, single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    let out = text.replace("\r\n", "\n").replace('\r', "\n");
    let out = TRAILING_SPACE.replace_all(&out, "\n");
    let out = EXCESS_NEWLINES.replace_all(&out, "\n\n");
    SPACE_RUNS.replace_all(&out, " ").into_owned()
}

/// Split into paragraphs, drop noise, mark headings and put each prose
/// sentence on its own line.
pub fn reflow_paragraphs(text: &str) -> String {
    text.split("\n\n")
        .filter_map(|paragraph| format_paragraph(paragraph.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_paragraph(paragraph: &str) -> Option<String> {
    let len = paragraph.chars().count();
    if len < MIN_PARAGRAPH_LENGTH {
        return None;
    }
    if is_heading(paragraph, len) {
        return Some(format!("{HEADING_MARKER}{paragraph}"));
    }

    let split = SENTENCE_END.replace_all(paragraph, "${1}\n");
    let lines: Vec<&str> = split
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_boilerplate_line(line))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn is_heading(paragraph: &str, len: usize) -> bool {
    len < HEADING_MAX_LENGTH
        && !paragraph.contains('\n')
        && paragraph.starts_with(|c: char| c.is_ascii_uppercase())
        && paragraph.ends_with(['.', '!', '?', ':'])
}

pub fn is_boilerplate_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    DENYLIST.iter().any(|term| lower.contains(term))
}

/// Whether `text` is already pipeline output: trimmed lines with nothing left
/// to strip, marked headings, one clean prose sentence per line, and a tail
/// that truncation leaves alone.
///
/// Paragraph length and heading shape are not re-tested: the prose left after
/// dropping a denylisted sentence may be short or heading-shaped and stays
/// prose.
fn is_settled(text: &str) -> bool {
    if text.is_empty() || text != text.trim() || text.contains('\r') {
        return false;
    }

    let mut unmarked = Vec::new();
    for line in text.split('\n') {
        if line != line.trim() {
            return false;
        }
        match line.strip_prefix(HEADING_MARKER) {
            Some(heading) if heading.starts_with(|c: char| c.is_ascii_uppercase()) => {
                unmarked.push(heading);
            }
            Some(_) => return false,
            None if SENTENCE_END.is_match(line) || is_boilerplate_line(line) => return false,
            None => unmarked.push(line),
        }
    }

    let unmarked = unmarked.join("\n");
    clean_once(&unmarked) == unmarked && truncate_at_sentence(text, MAX_SUMMARY_LENGTH) == text
}

/// Bound `text` at `max` characters without cutting inside a `.`-separated
/// piece. One character stays reserved for the closing period, and a cut
/// text ends in an ellipsis. A trailing ellipsis on the input is treated as
/// an earlier truncation and kept.
pub fn truncate_at_sentence(text: &str, max: usize) -> String {
    let (body, truncated) = match text.strip_suffix(ELLIPSIS) {
        Some(body) => (body, true),
        None => (text, false),
    };
    if body.trim().is_empty() {
        return String::new();
    }

    let closed = body.ends_with(['.', '!', '?']);
    if !truncated && body.chars().count() + usize::from(!closed) <= max {
        let mut out = body.to_string();
        if !closed {
            out.push('.');
        }
        return out;
    }

    // Longest run of whole pieces, rejoined exactly as they appeared.
    let mut end = 0;
    let mut len = 0;
    for (i, piece) in body.split('.').enumerate() {
        let separator = usize::from(i > 0);
        let next_len = len + separator + piece.chars().count();
        if next_len + 1 > max {
            break;
        }
        end += separator + piece.len();
        len = next_len;
    }

    let kept = body[..end].trim_end_matches(|c: char| c == '.' || c.is_whitespace());
    if kept.is_empty() {
        String::new()
    } else {
        format!("{kept}{ELLIPSIS}")
    }
}
