//! Format-specific extraction strategies and the dispatcher that routes to them.
//!
//! Every extractor is total from the caller's point of view: internal failures
//! are returned as `ExtractError` and converted here into a zero-confidence
//! [`ExtractionResult`] carrying a readable placeholder.

pub mod delimited;
pub mod docx;
pub mod markup;
pub mod pdf;
pub mod pptx;
pub mod text;
pub mod vision;
pub mod workbook;
pub mod xlsx;

use crate::completion::TextCompleter;
use crate::error::ExtractResult;
use crate::file_types::DocumentKind;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Uniform output of every extractor.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub text: String,
    pub structured_data: Option<StructuredData>,
    pub confidence: f64,
    pub method: &'static str,
    pub extras: Extras,
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn new(text: impl Into<String>, confidence: f64, method: &'static str) -> Self {
        Self {
            text: text.into(),
            structured_data: None,
            confidence: confidence.clamp(0.0, 1.0),
            method,
            extras: Extras::default(),
            error: None,
        }
    }

    /// Zero-confidence result. The placeholder must be human readable.
    pub fn failed(method: &'static str, placeholder: impl Into<String>, error: Option<String>) -> Self {
        let mut placeholder = placeholder.into();
        if placeholder.trim().is_empty() {
            placeholder = "Text could not be extracted from this file.".to_string();
        }
        Self {
            text: placeholder,
            structured_data: None,
            confidence: 0.0,
            method,
            extras: Extras::default(),
            error,
        }
    }

    pub fn with_structured(mut self, data: StructuredData) -> Self {
        self.structured_data = Some(data);
        self
    }

    pub fn with_extras(mut self, extras: Extras) -> Self {
        self.extras = extras;
        self
    }
}

/// Format-specific counters merged into processing metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extras {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraph_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides_with_notes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presentation_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_height: Option<u32>,
}

/// Secondary representation returned alongside the flattened text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructuredData {
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    #[serde(rename_all = "camelCase")]
    Document {
        headings: Vec<Heading>,
        table_count: usize,
        tables: Vec<Vec<String>>,
    },
    Workbook {
        sheets: Vec<SheetSummary>,
    },
    Presentation {
        title: Option<String>,
        author: Option<String>,
        slides: Vec<crate::slides::Slide>,
    },
    Json(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heading {
    pub level: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummary {
    pub name: String,
    pub row_count: usize,
}

/// Capabilities available to extractors that need network calls.
#[derive(Clone)]
pub struct ExtractContext {
    pub completer: Option<Arc<dyn TextCompleter>>,
    pub completion_timeout: Duration,
    pub type_key: String,
    pub mime: Option<&'static str>,
}

/// Route raw bytes to the extractor for `kind`.
pub async fn extract(kind: DocumentKind, data: Arc<Vec<u8>>, ctx: &ExtractContext) -> ExtractionResult {
    debug!("Dispatching {} bytes to {:?} extractor", data.len(), kind);

    match kind {
        DocumentKind::Image => vision::extract(&data, ctx).await,
        DocumentKind::PlainText => blocking(kind, data, |d| Ok(text::extract_plain(d))).await,
        DocumentKind::Json => blocking(kind, data, |d| Ok(text::extract_json(d))).await,
        DocumentKind::Csv => blocking(kind, data, |d| Ok(delimited::extract(d))).await,
        DocumentKind::Html => blocking(kind, data, |d| Ok(markup::extract_html(d))).await,
        DocumentKind::Xml => blocking(kind, data, |d| Ok(markup::extract_xml(d))).await,
        DocumentKind::Pdf => blocking(kind, data, pdf::extract).await,
        DocumentKind::WordProcessing => blocking(kind, data, docx::extract).await,
        DocumentKind::Spreadsheet => blocking(kind, data, xlsx::extract).await,
        DocumentKind::LegacyWorkbook => blocking(kind, data, workbook::extract).await,
        DocumentKind::Presentation => blocking(kind, data, pptx::extract).await,
        DocumentKind::Unknown => {
            let key = ctx.type_key.clone();
            blocking(kind, data, move |d| Ok(text::extract_fallback(d, &key))).await
        }
    }
}

/// Run a CPU-bound extractor on the blocking pool, converting errors and
/// panics into the family's zero-confidence result.
async fn blocking<F>(kind: DocumentKind, data: Arc<Vec<u8>>, f: F) -> ExtractionResult
where
    F: FnOnce(&[u8]) -> ExtractResult<ExtractionResult> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || f(data.as_slice())).await;

    let error = match outcome {
        Ok(Ok(result)) => return result,
        Ok(Err(e)) => e.to_string(),
        Err(join_err) => format!("extractor aborted: {}", join_err),
    };

    warn!("{:?} extraction failed: {}", kind, error);
    failure_for(kind, error)
}

/// Canned zero-confidence result for each family.
pub fn failure_for(kind: DocumentKind, error: String) -> ExtractionResult {
    let (method, placeholder) = match kind {
        DocumentKind::Pdf => (
            "pdf-error",
            "Error processing PDF file. The document may be corrupted, encrypted, or in an unsupported PDF variant.".to_string(),
        ),
        DocumentKind::WordProcessing => (
            "docx-error",
            "Unable to extract text from this Word document. It may be corrupted or saved in the legacy .doc format.".to_string(),
        ),
        DocumentKind::Spreadsheet => (
            "xlsx-error",
            "Unable to extract data from this Excel workbook. It may be corrupted or password protected.".to_string(),
        ),
        DocumentKind::LegacyWorkbook => (
            "workbook-error",
            "Unable to extract data from this spreadsheet. It may be corrupted or password protected.".to_string(),
        ),
        DocumentKind::Presentation => (
            "pptx-error",
            format!("Failed to parse presentation: {}", error),
        ),
        DocumentKind::Image => (
            "ocr-error",
            "Failed to extract text from image. The image may be unreadable or the OCR service is unavailable.".to_string(),
        ),
        DocumentKind::PlainText
        | DocumentKind::Csv
        | DocumentKind::Json
        | DocumentKind::Html
        | DocumentKind::Xml
        | DocumentKind::Unknown => (
            "extraction-error",
            "Unable to extract text from this file.".to_string(),
        ),
    };
    ExtractionResult::failed(method, placeholder, Some(error))
}

/// Collapse runs of whitespace to single spaces and trim.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
