//! Shared helpers for ZIP-packaged XML formats (docx, xlsx, pptx).

use crate::error::{ExtractError, ExtractResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read};
use zip::ZipArchive;

pub type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Largest decompressed size accepted for a single part.
const MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("numeric entity regex is valid"));

pub fn open_archive(data: &[u8]) -> ExtractResult<Archive<'_>> {
    Ok(ZipArchive::new(Cursor::new(data))?)
}

/// Read a required part as UTF-8 (lossy).
pub fn read_part(archive: &mut Archive<'_>, name: &str) -> ExtractResult<String> {
    read_optional_part(archive, name)?.ok_or_else(|| ExtractError::MissingPart(name.to_string()))
}

/// Read a part if the archive has it.
pub fn read_optional_part(archive: &mut Archive<'_>, name: &str) -> ExtractResult<Option<String>> {
    let file = match archive.by_name(name) {
        Ok(f) => f,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let buf = read_limited(file, name, MAX_PART_BYTES)?;
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Read at most `cap` bytes; the declared entry size is not trusted.
fn read_limited<R: Read>(reader: R, name: &str, cap: u64) -> ExtractResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(cap + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > cap {
        return Err(ExtractError::Malformed(format!(
            "part {} expands beyond {} bytes",
            name, cap
        )));
    }
    Ok(buf)
}

/// Names of all parts matching `pattern`, in archive order.
pub fn part_names(archive: &Archive<'_>, pattern: &Regex) -> Vec<String> {
    archive
        .file_names()
        .filter(|n| pattern.is_match(n))
        .map(|n| n.to_string())
        .collect()
}

/// Decode the predefined XML entities and numeric character references.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
