//! CSV reader with encoding and delimiter auto-detection.
//!
//! Produces an [`InputTable`] of raw cell text. No profile logic here.

use serde::Serialize;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::InputTable;

/// What the reader detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadInfo {
    pub encoding: String,
    pub delimiter: char,
    pub row_count: usize,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes with the given encoding, falling back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let text = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Read a CSV file with auto-detection.
pub fn read_table(path: &Path) -> CsvResult<(InputTable, ReadInfo)> {
    let bytes = std::fs::read(path)?;
    read_bytes(&bytes)
}

/// Read CSV bytes with auto-detection.
pub fn read_bytes(bytes: &[u8]) -> CsvResult<(InputTable, ReadInfo)> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let table = parse_str(&content, delimiter)?;

    let info = ReadInfo {
        encoding,
        delimiter,
        row_count: table.len(),
    };
    Ok((table, info))
}

/// Parse decoded CSV text with an explicit delimiter.
///
/// Header names are trimmed; cells are kept as written. Short rows are
/// padded, extra cells dropped, and rows with only blank cells skipped.
pub fn parse_str(content: &str, delimiter: char) -> CsvResult<InputTable> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte(delimiter))
        .flexible(true)
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row: Vec<String> = record.iter().take(headers.len()).map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(InputTable::new(headers, rows))
}

/// Display form of a delimiter.
pub fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

fn delimiter_byte(d: char) -> u8 {
    if d.is_ascii() {
        d as u8
    } else {
        b','
    }
}

fn parse_error(err: csv::Error) -> CsvError {
    CsvError::Parse {
        line: err.position().map(|p| p.line()).unwrap_or(0),
        message: err.to_string(),
    }
}
