//! Column order planning.
//!
//! Preferred columns come first, in a fixed order per object type. Any other
//! populated column follows, sorted case-insensitively. A column that is blank
//! on every row is never planned, and neither is a metadata column the object
//! type does not carry.

use std::collections::HashSet;

use crate::models::{columns, normalize_key, ObjectType, OutputRow};

const PROPERTY_PREFERRED: &[&str] = &[
    columns::IMPORT_ID,
    columns::ADDRESS,
    columns::CITY,
    columns::STATE,
    columns::POSTAL_CODE,
    columns::ASSOCIATION_LABEL,
    columns::DATA_SOURCE,
    columns::DATA_TYPE,
    columns::TAGS,
];

const CONTACT_PREFERRED: &[&str] = &[
    columns::IMPORT_ID,
    columns::FIRST_NAME,
    columns::LAST_NAME,
    columns::DATA_SOURCE,
    columns::DATA_TYPE,
    columns::TAGS,
];

const PHONE_PREFERRED: &[&str] = &[
    columns::IMPORT_ID,
    columns::PHONE_NUMBER,
    columns::PHONE_TYPE,
    columns::DATA_SOURCE,
];

/// Preferred column sequence for one object type.
pub fn preferred_columns(object_type: ObjectType, include_contact_label: bool) -> Vec<&'static str> {
    match object_type {
        ObjectType::Property => PROPERTY_PREFERRED.to_vec(),
        ObjectType::Contact => {
            let mut cols = CONTACT_PREFERRED.to_vec();
            if include_contact_label {
                cols.push(columns::ASSOCIATION_LABEL);
            }
            cols
        }
        ObjectType::Phone => PHONE_PREFERRED.to_vec(),
    }
}

const CONTACT_EXCLUDED: &[&str] = &[columns::ASSOCIATION_LABEL];

const PHONE_EXCLUDED: &[&str] = &[columns::ASSOCIATION_LABEL, columns::DATA_TYPE, columns::TAGS];

/// Metadata columns an object type never writes.
pub fn excluded_columns(object_type: ObjectType, include_contact_label: bool) -> &'static [&'static str] {
    match object_type {
        ObjectType::Contact if !include_contact_label => CONTACT_EXCLUDED,
        ObjectType::Phone => PHONE_EXCLUDED,
        _ => &[],
    }
}

/// Ordered columns to write for `rows`; empty when there are no rows.
pub fn plan(rows: &[OutputRow], object_type: ObjectType, include_contact_label: bool) -> Vec<String> {
    if rows.is_empty() {
        return Vec::new();
    }

    let populated = |column: &str| rows.iter().any(|r| r.is_filled(column));

    let mut planned: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = excluded_columns(object_type, include_contact_label)
        .iter()
        .map(|c| normalize_key(c))
        .collect();

    for column in preferred_columns(object_type, include_contact_label) {
        // Claimed even when blank so a differently-cased copy cannot sneak in below.
        seen.insert(normalize_key(column));
        if populated(column) {
            planned.push(column.to_string());
        }
    }

    let mut others: Vec<&String> = Vec::new();
    for row in rows {
        for column in row.values.keys() {
            if seen.insert(normalize_key(column)) && populated(column) {
                others.push(column);
            }
        }
    }
    others.sort_by(|a, b| {
        normalize_key(a)
            .cmp(&normalize_key(b))
            .then_with(|| a.cmp(b))
    });

    planned.extend(others.into_iter().cloned());
    planned
}
