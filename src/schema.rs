//! Response envelope and processing metadata types.
//!
//! Field names serialize in camelCase to match the JSON contract of the
//! `/parse-document` endpoint.

use crate::extractors::{Extras, StructuredData};
use crate::stats::DocumentStats;
use serde::Serialize;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const PREVIEW_CHARS: usize = 500;

/// Generate ISO8601 timestamp for current time.
pub fn now_iso8601() -> String {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format_timestamp(duration.as_secs(), duration.subsec_millis())
}

fn format_timestamp(secs: u64, millis: u32) -> String {
    let (year, month, day) = civil_from_days((secs / 86400) as i64);
    let time_of_day = secs % 86400;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60,
        millis
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date.
pub(crate) fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Successful parse result.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub success: bool,
    pub content: String,
    pub structured_data: Option<StructuredData>,
    pub preview: String,
    pub metadata: ProcessingMetadata,
    pub stats: DocumentStats,
    pub character_count: usize,
    pub word_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMetadata {
    pub file_name: String,
    /// MIME type as declared by the client.
    pub file_type: String,
    pub extension: String,
    pub size: usize,
    pub size_formatted: String,
    pub processed_at: String,
    pub processing_stages: Vec<String>,
    pub detected_type: String,
    pub category: String,
    pub extraction_method: String,
    pub confidence: f64,
    pub language: String,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_enhanced: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
    pub content_hash: String,
    #[serde(flatten)]
    pub extras: Extras,
}

/// Ordered `"{stage} ({ms}ms)"` log, timed from construction.
#[derive(Debug)]
pub struct ProcessingStages {
    started: Instant,
    last: Instant,
    stages: Vec<String>,
}

impl ProcessingStages {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            started: now,
            last: now,
            stages: Vec::new(),
        }
    }

    /// Record a finished stage with the time since the previous one.
    pub fn record(&mut self, stage: &str) {
        let now = Instant::now();
        let ms = now.duration_since(self.last).as_millis();
        self.stages.push(format!("{} ({}ms)", stage, ms));
        self.last = now;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    pub fn into_vec(self) -> Vec<String> {
        self.stages
    }
}

/// First 500 characters, with `...` when truncated.
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

/// Human-readable byte size using 1024 steps, e.g. `1.5 KB`.
pub fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[exponent])
}

/// JSON error body returned with 4xx/5xx responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// One entry of a batch response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Parsed(Box<ParseResponse>),
    #[serde(rename_all = "camelCase")]
    Rejected { file_name: String, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub results: Vec<BatchItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_civil_from_days() {
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(19_723), (2024, 1, 1));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(512), "512 Bytes");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(2 * 1024 * 1024), "2 MB");
        assert_eq!(format_size(52_428_800), "50 MB");
        assert_eq!(format_size(1_000_000), "976.56 KB");
    }

    #[test]
    fn test_preview_truncates_on_chars() {
        assert_eq!(preview("short"), "short");
        let long = "é".repeat(600);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), 503);
        assert_eq!(preview(&"a".repeat(500)), "a".repeat(500));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0, 0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_timestamp(1_704_067_200 + 3661, 42), "2024-01-01T01:01:01.042Z");
    }

    #[test]
    fn test_stages_are_ordered() {
        let mut stages = ProcessingStages::start();
        stages.record("File type detection");
        stages.record("Content extraction");
        let stages = stages.into_vec();
        assert_eq!(stages.len(), 2);
        assert!(stages[0].starts_with("File type detection ("));
        assert!(stages[1].ends_with("ms)"));
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ErrorBody::new("No file provided")).unwrap();
        assert_eq!(body, json!({"error": "No file provided"}));
        let body = serde_json::to_value(ErrorBody::new("boom").with_details("trace")).unwrap();
        assert_eq!(body, json!({"error": "boom", "details": "trace"}));
    }

    #[test]
    fn test_rejected_batch_item_shape() {
        let item = BatchItem::Rejected {
            file_name: "huge.pdf".to_string(),
            error: "too large".to_string(),
        };
        assert_eq!(
            serde_json::to_value(item).unwrap(),
            json!({"fileName": "huge.pdf", "error": "too large"})
        );
    }
}
