//! Loaded input table with a case-insensitive header index.
//!
//! The index maps a normalized header (trimmed, lowercased) to its column
//! position. It is built once per table so that per-row lookups never
//! re-normalize the header list.

use std::collections::HashMap;

/// Normalize a header or key for case-insensitive comparison.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalized header name → column position (first occurrence wins).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
}

impl HeaderIndex {
    pub fn new(headers: &[String]) -> Self {
        let mut positions = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            positions.entry(normalize_key(header)).or_insert(i);
        }
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(&normalize_key(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }
}

/// An input table: ordered headers and rows of already-stringified cells.
///
/// Produced by a reader, read-only to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct InputTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    index: HeaderIndex,
}

impl InputTable {
    /// Build a table; short rows read as empty cells, extra cells are kept but unreachable.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let index = HeaderIndex::new(&headers);
        Self { headers, rows, index }
    }

    /// Build a table from header names and rows of `(header, value)` pairs.
    pub fn from_records<H, R, K, V>(headers: H, records: R) -> Self
    where
        H: IntoIterator<Item = K>,
        K: Into<String>,
        R: IntoIterator<Item = Vec<(K, V)>>,
        V: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let index = HeaderIndex::new(&headers);
        let rows = records
            .into_iter()
            .map(|record| {
                let mut values = vec![String::new(); headers.len()];
                for (key, value) in record {
                    let key: String = key.into();
                    if let Some(pos) = index.position(&key) {
                        values[pos] = value.into();
                    }
                }
                values
            })
            .collect();
        Self { headers, rows, index }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn index(&self) -> &HeaderIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, i: usize) -> Option<RowView<'_>> {
        self.rows.get(i).map(|values| RowView {
            headers: &self.headers,
            index: &self.index,
            values,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |values| RowView {
            headers: &self.headers,
            index: &self.index,
            values,
        })
    }
}

/// Borrowed view of one row with case-insensitive cell lookup.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    headers: &'a [String],
    index: &'a HeaderIndex,
    values: &'a [String],
}

impl<'a> RowView<'a> {
    /// Cell text for a column; `None` when the table has no such header.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.index
            .position(name)
            .map(|pos| self.values.get(pos).map(String::as_str).unwrap_or(""))
    }

    /// Cell text for the first header equal to `name` ignoring case only.
    ///
    /// Whitespace is significant and a blank name never matches.
    pub fn get_exact(&self, name: &str) -> Option<&'a str> {
        if name.trim().is_empty() {
            return None;
        }
        let wanted = name.to_lowercase();
        self.headers
            .iter()
            .position(|h| h.to_lowercase() == wanted)
            .map(|pos| self.values.get(pos).map(String::as_str).unwrap_or(""))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains(name)
    }
}
