//! File type registry and resolution.
//!
//! Browsers and clients mislabel office formats routinely, so the filename
//! extension is trusted first and the declared MIME type is only a fallback.

use anyhow::Result;
use std::collections::HashSet;

/// Broad grouping reported in processing metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Document,
    Text,
    Spreadsheet,
    Presentation,
    Image,
    Data,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Text => "text",
            Self::Spreadsheet => "spreadsheet",
            Self::Presentation => "presentation",
            Self::Image => "image",
            Self::Data => "data",
        }
    }
}

/// Extractor family a registry entry routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Csv,
    Json,
    Html,
    Xml,
    Pdf,
    WordProcessing,
    Spreadsheet,
    LegacyWorkbook,
    Presentation,
    Image,
    Unknown,
}

/// Static registry entry.
#[derive(Debug, Clone)]
pub struct FileTypeDescriptor {
    pub extension: &'static str,
    pub mime_patterns: &'static [&'static str],
    pub category: FileCategory,
    pub kind: DocumentKind,
}

const fn entry(
    extension: &'static str,
    mime_patterns: &'static [&'static str],
    category: FileCategory,
    kind: DocumentKind,
) -> FileTypeDescriptor {
    FileTypeDescriptor {
        extension,
        mime_patterns,
        category,
        kind,
    }
}

// OOXML entries precede `doc`: their vendor MIME strings contain "officedocument".
const BUILTIN: &[FileTypeDescriptor] = &[
    entry("pdf", &["application/pdf"], FileCategory::Document, DocumentKind::Pdf),
    entry(
        "docx",
        &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"],
        FileCategory::Document,
        DocumentKind::WordProcessing,
    ),
    entry(
        "xlsx",
        &["application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"],
        FileCategory::Spreadsheet,
        DocumentKind::Spreadsheet,
    ),
    entry(
        "pptx",
        &["application/vnd.openxmlformats-officedocument.presentationml.presentation"],
        FileCategory::Presentation,
        DocumentKind::Presentation,
    ),
    entry("doc", &["application/msword"], FileCategory::Document, DocumentKind::WordProcessing),
    entry("xls", &["application/vnd.ms-excel"], FileCategory::Spreadsheet, DocumentKind::LegacyWorkbook),
    entry(
        "xlsb",
        &["application/vnd.ms-excel.sheet.binary.macroenabled.12"],
        FileCategory::Spreadsheet,
        DocumentKind::LegacyWorkbook,
    ),
    entry(
        "ods",
        &["application/vnd.oasis.opendocument.spreadsheet"],
        FileCategory::Spreadsheet,
        DocumentKind::LegacyWorkbook,
    ),
    entry("ppt", &["application/vnd.ms-powerpoint"], FileCategory::Presentation, DocumentKind::Presentation),
    entry("csv", &["text/csv", "application/csv"], FileCategory::Spreadsheet, DocumentKind::Csv),
    entry("txt", &["text/plain"], FileCategory::Text, DocumentKind::PlainText),
    entry("md", &["text/markdown", "text/x-markdown"], FileCategory::Text, DocumentKind::PlainText),
    entry("json", &["application/json"], FileCategory::Data, DocumentKind::Json),
    entry("xml", &["application/xml", "text/xml"], FileCategory::Data, DocumentKind::Xml),
    entry("html", &["text/html"], FileCategory::Document, DocumentKind::Html),
    entry("htm", &["text/html"], FileCategory::Document, DocumentKind::Html),
    entry("jpg", &["image/jpeg"], FileCategory::Image, DocumentKind::Image),
    entry("jpeg", &["image/jpeg"], FileCategory::Image, DocumentKind::Image),
    entry("png", &["image/png"], FileCategory::Image, DocumentKind::Image),
    entry("tiff", &["image/tiff"], FileCategory::Image, DocumentKind::Image),
    entry("tif", &["image/tiff"], FileCategory::Image, DocumentKind::Image),
    entry("webp", &["image/webp"], FileCategory::Image, DocumentKind::Image),
];

/// Immutable lookup table, built once at startup and shared via `Arc`.
#[derive(Debug, Clone)]
pub struct FileTypeRegistry {
    entries: Vec<FileTypeDescriptor>,
}

impl FileTypeRegistry {
    /// The registry the server runs with.
    pub fn builtin() -> Result<Self> {
        Self::new(BUILTIN.to_vec())
    }

    /// Build a registry from explicit entries. Scan order is the given order.
    pub fn new(entries: Vec<FileTypeDescriptor>) -> Result<Self> {
        let mut seen = HashSet::new();
        for e in &entries {
            if e.extension.is_empty()
                || e.extension.starts_with('.')
                || e.extension != e.extension.to_lowercase()
            {
                anyhow::bail!("Invalid registry key: {:?}", e.extension);
            }
            if !seen.insert(e.extension) {
                anyhow::bail!("Duplicate registry key: {}", e.extension);
            }
        }
        Ok(Self { entries })
    }

    pub fn lookup(&self, key: &str) -> Option<&FileTypeDescriptor> {
        self.entries.iter().find(|e| e.extension == key)
    }

    /// Resolve a canonical type key from a filename and declared MIME type.
    ///
    /// Returns the raw (possibly empty) extension when nothing matches; callers
    /// treat a key without a registry entry as unknown.
    pub fn resolve_type(&self, file_name: &str, declared_mime: &str) -> String {
        let extension = extension_of(file_name);
        if self.lookup(&extension).is_some() {
            return extension;
        }

        let mime = declared_mime.trim().to_lowercase();
        if !mime.is_empty() {
            let hit = self.entries.iter().find(|e| {
                e.mime_patterns.iter().any(|p| mime.contains(p)) || mime.contains(e.extension)
            });
            if let Some(e) = hit {
                return e.extension.to_string();
            }
        }

        extension
    }

    /// Extractor family for a resolved key.
    pub fn kind_of(&self, key: &str) -> DocumentKind {
        self.lookup(key).map(|e| e.kind).unwrap_or(DocumentKind::Unknown)
    }

    /// Canonical MIME type for a resolved key (first pattern).
    pub fn mime_for(&self, key: &str) -> Option<&'static str> {
        self.lookup(key).and_then(|e| e.mime_patterns.first().copied())
    }
}

/// Lowercased substring after the last `.`, or empty when there is none.
pub fn extension_of(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}
