//! Output rows, one list per object type.

use std::collections::BTreeMap;

use super::table::normalize_key;

/// Well-known output column names.
pub mod columns {
    pub const IMPORT_ID: &str = "Import ID";
    pub const ASSOCIATION_LABEL: &str = "Association Label";
    pub const DATA_SOURCE: &str = "Data Source";
    pub const DATA_TYPE: &str = "Data Type";
    pub const TAGS: &str = "Tags";
    pub const FIRST_NAME: &str = "First Name";
    pub const LAST_NAME: &str = "Last Name";
    pub const ADDRESS: &str = "Address";
    pub const CITY: &str = "City";
    pub const STATE: &str = "State";
    pub const POSTAL_CODE: &str = "Postal Code";
    pub const PHONE_NUMBER: &str = "Phone Number";
    pub const PHONE_TYPE: &str = "Phone Type";
}

/// A single output record.
///
/// `values` holds every written cell, metadata columns included. The
/// metadata accessors read from those cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutputRow {
    pub correlation_id: String,
    pub values: BTreeMap<String, String>,
}

impl OutputRow {
    /// Cell value, matching the column name case-insensitively.
    pub fn get(&self, column: &str) -> Option<&str> {
        if let Some(v) = self.values.get(column) {
            return Some(v.as_str());
        }
        let wanted = normalize_key(column);
        self.values
            .iter()
            .find(|(k, _)| normalize_key(k) == wanted)
            .map(|(_, v)| v.as_str())
    }

    /// True when the column holds a non-blank value.
    pub fn is_filled(&self, column: &str) -> bool {
        self.get(column).is_some_and(|v| !v.trim().is_empty())
    }

    /// Set a cell, reusing an existing key that differs only in case.
    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        let key = self.existing_key(column).unwrap_or_else(|| column.to_string());
        self.values.insert(key, value.into());
    }

    /// Set a cell only when it is currently blank or absent.
    pub fn set_if_blank(&mut self, column: &str, value: &str) {
        if !value.trim().is_empty() && !self.is_filled(column) {
            self.set(column, value);
        }
    }

    /// Drop a cell, matching the column name case-insensitively.
    pub fn remove(&mut self, column: &str) -> Option<String> {
        let key = self.existing_key(column)?;
        self.values.remove(&key)
    }

    pub fn association_label(&self) -> &str {
        self.get(columns::ASSOCIATION_LABEL).unwrap_or("")
    }

    pub fn data_source(&self) -> &str {
        self.get(columns::DATA_SOURCE).unwrap_or("")
    }

    pub fn data_type(&self) -> &str {
        self.get(columns::DATA_TYPE).unwrap_or("")
    }

    /// The `Tags` cell split on commas.
    pub fn tags(&self) -> Vec<&str> {
        self.get(columns::TAGS)
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn existing_key(&self, column: &str) -> Option<String> {
        if self.values.contains_key(column) {
            return Some(column.to_string());
        }
        let wanted = normalize_key(column);
        self.values.keys().find(|k| normalize_key(k) == wanted).cloned()
    }
}
