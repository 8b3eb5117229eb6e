//! Excel (.xlsx) extraction by walking the workbook's XML parts.

use super::{ExtractionResult, Extras, SheetSummary, StructuredData};
use crate::error::{ExtractError, ExtractResult};
use crate::ooxml::{decode_entities, open_archive, part_names, read_optional_part, read_part};
use once_cell::sync::Lazy;
use regex::Regex;

/// Rows read per worksheet.
pub const MAX_ROWS_PER_SHEET: usize = 500;

static WORKSHEET_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^xl/worksheets/sheet\d+\.xml$").expect("worksheet regex is valid"));
static SHARED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<si(?:\s[^>]*)?>(.*?)</si>").expect("shared item regex is valid"));
static TEXT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<t(?:\s[^>]*)?>(.*?)</t>").expect("text run regex is valid"));
static SHEET_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<sheet\s[^>]*?name="([^"]*)""#).expect("sheet name regex is valid"));
static ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<row\b[^>]*?(?:/>|>(.*?)</row>)").expect("row regex is valid")
});
static CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<c\b([^>]*?)(?:/>|>(.*?)</c>)").expect("cell regex is valid")
});
static CELL_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bt="([^"]*)""#).expect("cell type regex is valid"));
static CELL_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<v>(.*?)</v>").expect("cell value regex is valid"));

/// Rows recovered from one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRows {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

pub fn extract(data: &[u8]) -> ExtractResult<ExtractionResult> {
    let mut archive = open_archive(data)?;

    let shared = read_optional_part(&mut archive, "xl/sharedStrings.xml")?
        .map(|xml| parse_shared_strings(&xml))
        .unwrap_or_default();
    let names = parse_sheet_names(&read_part(&mut archive, "xl/workbook.xml")?);

    let mut parts = part_names(&archive, &WORKSHEET_PART);
    if parts.is_empty() {
        return Err(ExtractError::MissingPart("xl/worksheets/sheet*.xml".to_string()));
    }
    parts.sort();

    let mut sheets = Vec::with_capacity(parts.len());
    for (idx, part) in parts.iter().enumerate() {
        let xml = read_part(&mut archive, part)?;
        let name = names
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("Sheet{}", idx + 1));
        sheets.push(SheetRows {
            name,
            rows: parse_rows(&xml, &shared),
        });
    }

    Ok(render_sheets(sheets, "xlsx-xml-parse"))
}

/// Shared string table, index-addressable. Rich-text runs are concatenated.
pub fn parse_shared_strings(xml: &str) -> Vec<String> {
    SHARED_ITEM
        .captures_iter(xml)
        .map(|item| {
            let joined: String = TEXT_RUN
                .captures_iter(&item[1])
                .map(|t| t[1].to_string())
                .collect();
            decode_entities(&joined)
        })
        .collect()
}

/// Sheet display names in declaration order.
pub fn parse_sheet_names(xml: &str) -> Vec<String> {
    SHEET_NAME
        .captures_iter(xml)
        .map(|c| decode_entities(&c[1]))
        .collect()
}

/// Resolve cell values for the first [`MAX_ROWS_PER_SHEET`] rows, keeping
/// only rows with at least one non-blank cell.
pub fn parse_rows(xml: &str, shared: &[String]) -> Vec<Vec<String>> {
    ROW.captures_iter(xml)
        .take(MAX_ROWS_PER_SHEET)
        .filter_map(|row| {
            let body = row.get(1).map(|m| m.as_str()).unwrap_or("");
            let cells: Vec<String> = CELL
                .captures_iter(body)
                .map(|cell| {
                    let attrs = &cell[1];
                    let inner = cell.get(2).map(|m| m.as_str()).unwrap_or("");
                    resolve_cell(attrs, inner, shared)
                })
                .collect();
            if cells.iter().any(|c| !c.trim().is_empty()) {
                Some(cells)
            } else {
                None
            }
        })
        .collect()
}

fn resolve_cell(attrs: &str, inner: &str, shared: &[String]) -> String {
    let cell_type = CELL_TYPE.captures(attrs).map(|c| c[1].to_string());
    match cell_type.as_deref() {
        Some("s") => CELL_VALUE
            .captures(inner)
            .and_then(|v| v[1].trim().parse::<usize>().ok())
            .and_then(|idx| shared.get(idx).cloned())
            .unwrap_or_default(),
        Some("inlineStr") => {
            let joined: String = TEXT_RUN
                .captures_iter(inner)
                .map(|t| t[1].to_string())
                .collect();
            decode_entities(&joined)
        }
        _ => CELL_VALUE
            .captures(inner)
            .map(|v| decode_entities(&v[1]))
            .unwrap_or_default(),
    }
}

/// Text rendering shared with the calamine-backed workbook path.
pub fn render_sheets(sheets: Vec<SheetRows>, method: &'static str) -> ExtractionResult {
    let total_rows: usize = sheets.iter().map(|s| s.rows.len()).sum();

    let text = sheets
        .iter()
        .map(|sheet| {
            let mut block = format!("=== {} ===", sheet.name);
            for row in &sheet.rows {
                block.push('\n');
                block.push_str(&row.join(" | "));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let summaries: Vec<SheetSummary> = sheets
        .iter()
        .map(|s| SheetSummary {
            name: s.name.clone(),
            row_count: s.rows.len(),
        })
        .collect();

    let extras = Extras {
        sheet_count: Some(sheets.len()),
        total_rows: Some(total_rows),
        ..Default::default()
    };

    ExtractionResult::new(text, 0.9, method)
        .with_structured(StructuredData::Workbook { sheets: summaries })
        .with_extras(extras)
}
