//! Plain text, JSON and the unknown-format fallback.

use super::{ExtractionResult, StructuredData};

/// Share of printable characters required before unknown bytes are accepted as text.
const PRINTABLE_RATIO_THRESHOLD: f64 = 0.8;

pub fn extract_plain(data: &[u8]) -> ExtractionResult {
    ExtractionResult::new(String::from_utf8_lossy(data), 1.0, "plain-text")
}

/// Pretty-print valid JSON; fall back to the raw text otherwise.
pub fn extract_json(data: &[u8]) -> ExtractionResult {
    let raw = String::from_utf8_lossy(data);
    match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(pretty) => ExtractionResult::new(pretty, 1.0, "json-parser")
                .with_structured(StructuredData::Json(value)),
            Err(_) => ExtractionResult::new(raw, 0.5, "json-fallback"),
        },
        Err(e) => {
            tracing::debug!("JSON parse failed, keeping raw text: {}", e);
            ExtractionResult::new(raw, 0.5, "json-fallback")
        }
    }
}

/// Best-effort decode for types the registry does not know.
pub fn extract_fallback(data: &[u8], type_key: &str) -> ExtractionResult {
    let text = String::from_utf8_lossy(data);
    if !text.is_empty() && printable_ratio(&text) > PRINTABLE_RATIO_THRESHOLD {
        return ExtractionResult::new(text, 0.5, "fallback-text");
    }

    let label = if type_key.is_empty() {
        "this file type".to_string()
    } else {
        format!(".{} files", type_key)
    };
    ExtractionResult::failed(
        "unsupported",
        format!(
            "Unsupported file format: {} cannot be converted to text. Supported formats include PDF, Word, Excel, PowerPoint, CSV, JSON, HTML, XML, plain text and images.",
            label
        ),
        None,
    )
}

/// Fraction of characters that are printable ASCII or common whitespace.
pub fn printable_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut printable = 0usize;
    for c in text.chars() {
        total += 1;
        if matches!(c, '\x20'..='\x7e' | '\t' | '\n' | '\r') {
            printable += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    printable as f64 / total as f64
}
