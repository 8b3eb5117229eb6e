//! HTML and XML tag stripping.

use super::{collapse_whitespace, ExtractionResult};
use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script regex is valid"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("style regex is valid"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"));

pub fn extract_html(data: &[u8]) -> ExtractionResult {
    let raw = String::from_utf8_lossy(data);
    let without_scripts = SCRIPT_BLOCK.replace_all(&raw, " ");
    let without_styles = STYLE_BLOCK.replace_all(&without_scripts, " ");
    ExtractionResult::new(strip_tags(&without_styles), 0.9, "html-parser")
}

pub fn extract_xml(data: &[u8]) -> ExtractionResult {
    let raw = String::from_utf8_lossy(data);
    ExtractionResult::new(strip_tags(&raw), 0.9, "xml-parser")
}

/// Remove tags, decode the common named entities and normalize whitespace.
pub fn strip_tags(markup: &str) -> String {
    let text = TAG.replace_all(markup, " ");
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    collapse_whitespace(&decoded)
}
