//! CSV extraction.
//!
//! Whitespace-only lines are dropped, then each remaining line is tokenized
//! on its own: a `"` toggles quoted mode and only commas outside quotes split
//! fields. Rows may be ragged.

use super::{ExtractionResult, Extras, StructuredData};

pub fn extract(data: &[u8]) -> ExtractionResult {
    let raw = String::from_utf8_lossy(data);
    let (headers, rows) = parse_table(&raw);
    let text = render_rows(&headers, &rows);
    let extras = Extras {
        row_count: Some(rows.len()),
        column_count: Some(headers.len()),
        ..Default::default()
    };
    ExtractionResult::new(text, 1.0, "csv-parser")
        .with_structured(StructuredData::Table { headers, rows })
        .with_extras(extras)
}

/// Split CSV text into headers and data rows.
pub fn parse_table(text: &str) -> (Vec<String>, Vec<Vec<String>>) {
    let mut records = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(split_line);

    match records.next() {
        Some(headers) => (headers, records.collect()),
        None => (Vec::new(), Vec::new()),
    }
}

/// Tokenize one line. Quote characters are consumed, fields are trimmed.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn render_rows(headers: &[String], rows: &[Vec<String>]) -> String {
    std::iter::once(headers)
        .chain(rows.iter().map(|r| r.as_slice()))
        .filter(|r| !r.is_empty())
        .map(|r| r.join(" | "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_comma_is_not_split() {
        let (headers, rows) = parse_table("a,\"b,c\",d\n1,2,3");
        assert_eq!(headers, vec!["a", "b,c", "d"]);
        assert_eq!(rows, vec![vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_quoted_field_after_space() {
        let (headers, rows) = parse_table("name, \"Smith, John\",age\n1,2,3");
        assert_eq!(headers, vec!["name", "Smith, John", "age"]);
        assert_eq!(rows, vec![vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_unbalanced_quote_stays_on_its_line() {
        let (headers, rows) = parse_table("a,\"b\nc,d");
        assert_eq!(headers, vec!["a", "b"]);
        assert_eq!(rows, vec![vec!["c", "d"]]);
    }

    #[test]
    fn test_blank_lines_dropped() {
        let (headers, rows) = parse_table("name,age\n\n   \nAlice,30\n\nBob,25\n");
        assert_eq!(headers, vec!["name", "age"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["Bob", "25"]);
    }

    #[test]
    fn test_ragged_rows() {
        let (_, rows) = parse_table("a,b,c\n1,2\n3,4,5,6");
        assert_eq!(rows[0], vec!["1", "2"]);
        assert_eq!(rows[1].len(), 4);
    }

    #[test]
    fn test_extract_result_shape() {
        let r = extract(b"x,y\r\n1,2\r\n");
        assert_eq!(r.confidence, 1.0);
        assert_eq!(r.method, "csv-parser");
        assert_eq!(r.text, "x | y\n1 | 2");
        assert_eq!(r.extras.row_count, Some(1));
        assert_eq!(
            r.structured_data,
            Some(StructuredData::Table {
                headers: vec!["x".into(), "y".into()],
                rows: vec![vec!["1".into(), "2".into()]],
            })
        );
    }

    #[test]
    fn test_empty_csv() {
        let r = extract(b"\n\n");
        assert_eq!(r.confidence, 1.0);
        assert_eq!(r.text, "");
    }
}
