//! Word (.docx) extraction straight from `word/document.xml`.

use super::{ExtractionResult, Extras, Heading, StructuredData};
use crate::error::ExtractResult;
use crate::ooxml::{decode_entities, open_archive, read_part};
use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:p(?:\s[^>]*)?>").expect("paragraph regex is valid"));
static RUN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("run text regex is valid"));
static PARAGRAPH_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<w:pStyle\s+w:val="([^"]*)""#).expect("style regex is valid"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digits regex is valid"));
static TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:tbl(?:\s[^>]*)?>(.*?)</w:tbl>").expect("table regex is valid"));
static TABLE_ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:tr(?:\s[^>]*)?>(.*?)</w:tr>").expect("row regex is valid"));
static TABLE_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:tc(?:\s[^>]*)?>(.*?)</w:tc>").expect("cell regex is valid"));

/// A paragraph recovered from the document body.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub text: String,
    pub heading_level: Option<u32>,
}

pub fn extract(data: &[u8]) -> ExtractResult<ExtractionResult> {
    let mut archive = open_archive(data)?;
    let xml = read_part(&mut archive, "word/document.xml")?;

    let paragraphs = parse_paragraphs(&xml);
    let tables = parse_tables(&xml);

    let headings: Vec<Heading> = paragraphs
        .iter()
        .filter_map(|p| {
            p.heading_level.map(|level| Heading {
                level,
                text: p.text.clone(),
            })
        })
        .collect();

    let text = paragraphs
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    tracing::debug!(
        "DOCX: {} paragraphs, {} headings, {} tables",
        paragraphs.len(),
        headings.len(),
        tables.len()
    );

    let extras = Extras {
        paragraph_count: Some(paragraphs.len()),
        heading_count: Some(headings.len()),
        table_count: Some(tables.len()),
        ..Default::default()
    };

    Ok(ExtractionResult::new(text, 0.9, "docx-xml-parse")
        .with_structured(StructuredData::Document {
            headings,
            table_count: tables.len(),
            tables,
        })
        .with_extras(extras))
}

/// Split the body on paragraph-open tags and collect each paragraph's runs.
pub fn parse_paragraphs(xml: &str) -> Vec<Paragraph> {
    PARAGRAPH_OPEN
        .split(xml)
        .filter_map(|chunk| {
            let text = run_text(chunk);
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(Paragraph {
                text: text.to_string(),
                heading_level: heading_level(chunk),
            })
        })
        .collect()
}

/// Heading level from a `w:pStyle` value such as `Heading2`; `None` when the
/// paragraph is not a heading.
pub fn heading_level(chunk: &str) -> Option<u32> {
    let style = PARAGRAPH_STYLE.captures(chunk)?;
    let value = &style[1];
    if !value.to_lowercase().contains("heading") {
        return None;
    }
    Some(
        DIGITS
            .find(value)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1),
    )
}

/// Each table as a list of rows, cells joined with `" | "`.
pub fn parse_tables(xml: &str) -> Vec<Vec<String>> {
    TABLE
        .captures_iter(xml)
        .map(|table| {
            TABLE_ROW
                .captures_iter(&table[1])
                .map(|row| {
                    TABLE_CELL
                        .captures_iter(&row[1])
                        .map(|cell| run_text(&cell[1]).trim().to_string())
                        .collect::<Vec<_>>()
                        .join(" | ")
                })
                .collect()
        })
        .collect()
}

fn run_text(fragment: &str) -> String {
    let raw: String = RUN_TEXT
        .captures_iter(fragment)
        .map(|c| c[1].to_string())
        .collect();
    decode_entities(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::ooxml::test_support::build_zip;

    const BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p w:rsidR="001"><w:pPr><w:pStyle w:val="Heading2"/></w:pPr><w:r><w:t>Leave </w:t></w:r><w:r><w:t xml:space="preserve">Policy</w:t></w:r></w:p>
<w:p><w:r><w:t>Employees accrue &amp; carry over leave.</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Handbook</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="heading"/></w:pPr><w:r><w:t>Scope</w:t></w:r></w:p>
<w:p/>
<w:tbl><w:tblPr/><w:tr><w:tc><w:tcPr/><w:p><w:r><w:t>Name</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Days</w:t></w:r></w:p></w:tc></w:tr>
<w:tr><w:tc><w:p><w:r><w:t>Ana</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>12</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
</w:body></w:document>"#;

    #[test]
    fn test_heading_levels() {
        let paragraphs = parse_paragraphs(BODY);
        assert_eq!(paragraphs[0].text, "Leave Policy");
        assert_eq!(paragraphs[0].heading_level, Some(2));
        assert_eq!(paragraphs[1].heading_level, None);
        assert_eq!(paragraphs[2].heading_level, None);
        assert_eq!(paragraphs[3].heading_level, Some(1));
    }

    #[test]
    fn test_entities_in_runs() {
        let paragraphs = parse_paragraphs(BODY);
        assert_eq!(paragraphs[1].text, "Employees accrue & carry over leave.");
    }

    #[test]
    fn test_tables() {
        let tables = parse_tables(BODY);
        assert_eq!(tables, vec![vec!["Name | Days".to_string(), "Ana | 12".to_string()]]);
    }

    #[test]
    fn test_extract_from_archive() {
        let data = build_zip(&[("word/document.xml", BODY)]);
        let r = extract(&data).unwrap();
        assert_eq!(r.confidence, 0.9);
        assert_eq!(r.method, "docx-xml-parse");
        assert!(r.text.starts_with("Leave Policy\n\nEmployees accrue"));
        assert_eq!(r.extras.table_count, Some(1));
        match r.structured_data {
            Some(StructuredData::Document { headings, table_count, .. }) => {
                assert_eq!(headings.len(), 2);
                assert_eq!(table_count, 1);
            }
            other => panic!("unexpected structured data: {:?}", other),
        }
    }

    #[test]
    fn test_missing_document_part() {
        let data = build_zip(&[("word/styles.xml", "<w:styles/>")]);
        assert!(matches!(extract(&data), Err(ExtractError::MissingPart(_))));
    }
}
