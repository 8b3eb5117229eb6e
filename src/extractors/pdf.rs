//! Heuristic PDF text recovery without a PDF library.
//!
//! The binary is decoded lossily and mined by three independent scanners.
//! Compressed content streams yield nothing useful, which is why the result
//! is confidence-scored rather than trusted.

use super::{collapse_whitespace, ExtractionResult, Extras};
use crate::error::{ExtractError, ExtractResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Cleaned text longer than this counts as a real extraction.
const MIN_USEFUL_CHARS: usize = 100;

static TEXT_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\bBT\b(.*?)\bET\b").expect("text object regex is valid"));
static SHOW_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(((?:[^()\\]|\\.)*)\)\s*Tj").expect("Tj regex is valid")
});
static SHOW_TEXT_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[((?:[^\]\\]|\\.)*)\]\s*TJ").expect("TJ regex is valid")
});
static STRING_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(((?:[^()\\]|\\.)*)\)").expect("literal regex is valid"));
static PRINTABLE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x20-\x7E]{20,}").expect("printable run regex is valid"));
static STREAM_BODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\bstream\r?\n(.*?)endstream").expect("stream regex is valid"));
static LETTER_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z\s]{10,}").expect("letter run regex is valid"));
static PAGE_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/Type\s*/Page[^s]").expect("page regex is valid"));
static ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([nrt()\\])").expect("escape regex is valid"));

/// Tokens that mark a printable run as PDF syntax rather than prose.
const STRUCTURAL_TOKENS: &[&str] = &[
    " 0 obj", "endobj", "/Type", "/Filter", "/Length", "/Font", "/Resources", "<<", ">>", "xref", "trailer",
    "stream", "%PDF", " Tj", " TJ", " Tf", " Td", " Tm",
];

pub fn extract(data: &[u8]) -> ExtractResult<ExtractionResult> {
    if data.is_empty() {
        return Err(ExtractError::Malformed("empty PDF".to_string()));
    }

    let raw = String::from_utf8_lossy(data);
    let page_count = count_pages(&raw);

    let mut seen = HashSet::new();
    let fragments: Vec<String> = text_operator_strings(&raw)
        .into_iter()
        .chain(printable_runs(&raw))
        .chain(stream_letter_runs(&raw))
        .filter(|f| seen.insert(f.clone()))
        .collect();

    let cleaned = clean_text(&fragments.join(" "));
    tracing::debug!(
        "PDF heuristics: {} fragments, {} cleaned chars, {} pages",
        fragments.len(),
        cleaned.chars().count(),
        page_count
    );

    let extras = Extras {
        page_count: Some(page_count),
        ..Default::default()
    };

    if cleaned.chars().count() > MIN_USEFUL_CHARS {
        return Ok(ExtractionResult::new(cleaned, 0.7, "pdf-binary-parse").with_extras(extras));
    }

    let notice = format!(
        "This PDF ({} page{}) contains little extractable text. It may be scanned, image-based, or use compressed content streams. Try uploading a text-based version, or images of the pages for OCR.",
        page_count,
        if page_count == 1 { "" } else { "s" }
    );
    Ok(ExtractionResult::new(notice, 0.3, "pdf-limited").with_extras(extras))
}

/// String literals shown by `Tj` / `TJ` inside `BT ... ET` text objects.
pub fn text_operator_strings(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    for block in TEXT_OBJECT.captures_iter(raw) {
        let body = &block[1];
        for cap in SHOW_TEXT.captures_iter(body) {
            push_non_blank(&mut out, &cap[1]);
        }
        for cap in SHOW_TEXT_ARRAY.captures_iter(body) {
            let joined: String = STRING_LITERAL
                .captures_iter(&cap[1])
                .map(|lit| lit[1].to_string())
                .collect();
            push_non_blank(&mut out, &joined);
        }
    }
    out
}

/// Long printable-ASCII runs that do not look like PDF syntax.
pub fn printable_runs(raw: &str) -> Vec<String> {
    PRINTABLE_RUN
        .find_iter(raw)
        .map(|m| m.as_str())
        .filter(|run| !STRUCTURAL_TOKENS.iter().any(|t| run.contains(t)))
        .map(|run| run.trim().to_string())
        .filter(|run| !run.is_empty())
        .collect()
}

/// Letter/whitespace runs inside `stream ... endstream` bodies.
pub fn stream_letter_runs(raw: &str) -> Vec<String> {
    let mut out = Vec::new();
    for stream in STREAM_BODY.captures_iter(raw) {
        for run in LETTER_RUN.find_iter(&stream[1]) {
            push_non_blank(&mut out, run.as_str());
        }
    }
    out
}

/// Rough page count; `/Type /Pages` tree nodes are excluded.
pub fn count_pages(raw: &str) -> usize {
    PAGE_OBJECT.find_iter(raw).count()
}

/// Unescape literal-string escapes, drop characters outside Latin ranges and
/// normalize whitespace.
pub fn clean_text(text: &str) -> String {
    let unescaped = ESCAPE.replace_all(text, |caps: &regex::Captures| match &caps[1] {
        "n" | "r" | "t" => " ".to_string(),
        other => other.to_string(),
    });
    let kept: String = unescaped
        .chars()
        .filter(|c| c.is_whitespace() || matches!(*c, '\x20'..='\x7e' | '\u{a0}'..='\u{24f}'))
        .collect();
    collapse_whitespace(&kept)
}

fn push_non_blank(out: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}
