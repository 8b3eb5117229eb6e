//! Legacy and non-OOXML workbooks (.xls, .xlsb, .ods) through calamine.

use super::xlsx::{render_sheets, SheetRows, MAX_ROWS_PER_SHEET};
use super::ExtractionResult;
use crate::error::ExtractResult;
use crate::schema::civil_from_days;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

pub fn extract(data: &[u8]) -> ExtractResult<ExtractionResult> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for name in &sheet_names {
        let range = match workbook.worksheet_range(name) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Skipping sheet '{}': {}", name, e);
                continue;
            }
        };

        let rows = range
            .rows()
            .take(MAX_ROWS_PER_SHEET)
            .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
            .filter(|values| values.iter().any(|v| !v.trim().is_empty()))
            .collect();

        sheets.push(SheetRows {
            name: name.clone(),
            rows,
        });
    }

    Ok(render_sheets(sheets, "workbook-calamine"))
}

/// Convert a calamine cell to a string representation.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Avoid trailing ".0" for whole numbers
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_string(dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{:?}", e),
    }
}

/// Render an Excel serial date.
/// Serial 60 is the fictitious 1900-02-29, so later serials shift back a day.
fn excel_serial_to_string(serial: f64) -> String {
    let days = serial.floor() as i64;
    let secs_of_day = ((serial - days as f64) * 86400.0).round() as i64;

    let adjusted = if days > 59 { days - 1 } else { days };
    // Serial 25569 is 1970-01-01.
    let (year, month, day) = civil_from_days(adjusted - 25568);

    let (h, m, s) = (secs_of_day / 3600, (secs_of_day % 3600) / 60, secs_of_day % 60);
    if h == 0 && m == 0 && s == 0 {
        format!("{:04}-{:02}-{:02}", year, month, day)
    } else {
        format!("{:04}-{:02}-{:02} {:02}:{:02}:{:02}", year, month, day, h, m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excel_serial_dates() {
        assert_eq!(excel_serial_to_string(1.0), "1900-01-01");
        assert_eq!(excel_serial_to_string(61.0), "1900-03-01");
        assert_eq!(excel_serial_to_string(45292.0), "2024-01-01");
        assert_eq!(excel_serial_to_string(45292.5), "2024-01-01 12:00:00");
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(extract(b"not a workbook at all").is_err());
    }
}
