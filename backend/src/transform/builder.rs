//! Fold processed rows into property, contact and phone output rows.
//!
//! Property rows are deduplicated by address as they arrive:
//!
//! ```text
//! Processed rows                         Property output
//! ┌─────────────────────────────────┐   ┌──────────────────────────────────┐
//! │ 1 Main St, Springfield  (Owner) │   │ 1 Main St, Springfield           │
//! │ 1 MAIN ST, springfield  (Exec.) │ → │ Association Label: Owner;Exec.   │
//! │ (no address)            (Heir)  │   ├──────────────────────────────────┤
//! └─────────────────────────────────┘   │ (no address)  (Heir)             │
//!                                       └──────────────────────────────────┘
//! ```
//!
//! The first row with a key is the survivor; later duplicates only add
//! association labels and fill its blank cells. Rows without an address are
//! never merged.

use std::collections::{HashMap, HashSet};

use super::processor::{ProcessedGroup, ProcessedRow};
use crate::models::{columns, normalize_key, ObjectType, OutputRow};

/// Address candidates, in priority order.
const ADDRESS_FIELDS: [&str; 4] = ["address", "street", "property address", "mailing address"];
const CITY_FIELDS: [&str; 3] = ["city", "property city", "mailing city"];
const STATE_FIELDS: [&str; 3] = ["state", "property state", "mailing state"];
const POSTAL_CODE_FIELDS: [&str; 5] = ["postal code", "zip", "zip code", "property zip", "mailing zip"];

/// Separator for tag lists in output cells.
pub const TAG_SEPARATOR: &str = ", ";

/// The three output row lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputRows {
    pub properties: Vec<OutputRow>,
    pub contacts: Vec<OutputRow>,
    pub phones: Vec<OutputRow>,
    /// Property rows folded into an earlier row with the same address.
    pub merged_properties: usize,
}

impl OutputRows {
    pub fn for_type(&self, object_type: ObjectType) -> &[OutputRow] {
        match object_type {
            ObjectType::Property => &self.properties,
            ObjectType::Contact => &self.contacts,
            ObjectType::Phone => &self.phones,
        }
    }
}

/// Incremental builder; rows must be pushed in input order.
#[derive(Debug, Default)]
pub struct OutputBuilder {
    include_secondary_labels: bool,
    tag_override: Option<String>,
    properties: PropertyDeduper,
    contacts: Vec<OutputRow>,
    phones: Vec<OutputRow>,
}

impl OutputBuilder {
    pub fn new(include_secondary_labels: bool, tag_override: Option<&str>) -> Self {
        Self {
            include_secondary_labels,
            tag_override: tag_override
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            ..Self::default()
        }
    }

    pub fn push(&mut self, row: &ProcessedRow) {
        for group in row.groups_with_data(ObjectType::Property) {
            let out = self.output_row(group, &row.correlation_id);
            self.properties.add(out);
        }
        for group in row.groups_with_data(ObjectType::Contact) {
            let out = self.output_row(group, &row.correlation_id);
            self.contacts.push(out);
        }
        for group in row.groups_with_data(ObjectType::Phone) {
            let out = self.output_row(group, &row.correlation_id);
            self.phones.push(out);
        }
    }

    pub fn finish(self) -> OutputRows {
        OutputRows {
            merged_properties: self.properties.merged,
            properties: self.properties.rows,
            contacts: self.contacts,
            phones: self.phones,
        }
    }

    fn output_row(&self, group: &ProcessedGroup, correlation_id: &str) -> OutputRow {
        let object_type = group.object_type;
        let mut row = OutputRow {
            correlation_id: correlation_id.to_string(),
            ..OutputRow::default()
        };

        for (header, value) in &group.values {
            row.set(header, value.as_str());
        }
        row.set(columns::IMPORT_ID, correlation_id);
        row.set_if_blank(columns::DATA_SOURCE, &group.data_source);

        let carries_label = match object_type {
            ObjectType::Property => true,
            ObjectType::Contact => self.include_secondary_labels,
            ObjectType::Phone => false,
        };
        if carries_label {
            row.set_if_blank(columns::ASSOCIATION_LABEL, &group.association_label);
        } else {
            row.remove(columns::ASSOCIATION_LABEL);
        }

        if object_type == ObjectType::Phone {
            row.remove(columns::DATA_TYPE);
            row.remove(columns::TAGS);
            return row;
        }

        row.set_if_blank(columns::DATA_TYPE, &group.data_type);
        match &self.tag_override {
            Some(tag) => row.set(columns::TAGS, tag.as_str()),
            None => row.set_if_blank(columns::TAGS, &group.tags.join(TAG_SEPARATOR)),
        }

        row
    }
}

/// Build all output rows at once.
pub fn build(rows: &[ProcessedRow], include_secondary_labels: bool, tag_override: Option<&str>) -> OutputRows {
    let mut builder = OutputBuilder::new(include_secondary_labels, tag_override);
    for row in rows {
        builder.push(row);
    }
    builder.finish()
}

/// Greedy, order-dependent address deduplication.
#[derive(Debug, Default)]
struct PropertyDeduper {
    rows: Vec<OutputRow>,
    index: HashMap<String, usize>,
    merged: usize,
}

impl PropertyDeduper {
    fn add(&mut self, row: OutputRow) {
        match dedup_key(&row) {
            Some(key) => {
                if let Some(&kept) = self.index.get(&key) {
                    merge_into(&mut self.rows[kept], &row);
                    self.merged += 1;
                } else {
                    self.index.insert(key, self.rows.len());
                    self.rows.push(row);
                }
            }
            None => self.rows.push(row),
        }
    }
}

/// Normalized (address, city, state, postal code) key; `None` without an address.
pub fn dedup_key(row: &OutputRow) -> Option<String> {
    let address = first_filled(row, &ADDRESS_FIELDS)?;
    let city = first_filled(row, &CITY_FIELDS).unwrap_or("");
    let state = first_filled(row, &STATE_FIELDS).unwrap_or("");
    let postal = first_filled(row, &POSTAL_CODE_FIELDS).unwrap_or("");
    Some(
        [address, city, state, postal]
            .iter()
            .map(|part| normalize_key(part))
            .collect::<Vec<_>>()
            .join("|"),
    )
}

fn first_filled<'a>(row: &'a OutputRow, candidates: &[&str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| row.get(c))
        .find(|v| !v.trim().is_empty())
}

fn merge_into(kept: &mut OutputRow, incoming: &OutputRow) {
    let labels = merge_labels(
        kept.get(columns::ASSOCIATION_LABEL).unwrap_or(""),
        incoming.get(columns::ASSOCIATION_LABEL).unwrap_or(""),
    );
    if !labels.is_empty() {
        kept.set(columns::ASSOCIATION_LABEL, labels);
    }

    for (column, value) in &incoming.values {
        if normalize_key(column) == normalize_key(columns::ASSOCIATION_LABEL) {
            continue;
        }
        kept.set_if_blank(column, value);
    }
}

/// Union of two `;`-delimited label lists, case-insensitive, first spelling and order kept.
pub fn merge_labels(first: &str, second: &str) -> String {
    let mut seen = HashSet::new();
    first
        .split(';')
        .chain(second.split(';'))
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .filter(|label| seen.insert(label.to_lowercase()))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(object_type: ObjectType, label: &str, values: &[(&str, &str)]) -> ProcessedGroup {
        ProcessedGroup {
            object_type,
            group_index: 1,
            association_label: label.to_string(),
            data_source: "County".to_string(),
            data_type: "Probate".to_string(),
            tags: vec!["probate".to_string(), "hot".to_string()],
            values: values
                .iter()
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
            has_data: values.iter().any(|(_, v)| !v.trim().is_empty()),
        }
    }

    fn row(id: &str, groups: Vec<ProcessedGroup>) -> ProcessedRow {
        ProcessedRow {
            correlation_id: id.to_string(),
            groups,
        }
    }

    #[test]
    fn test_duplicate_addresses_merge_labels_and_backfill() {
        let rows = vec![
            row(
                "a",
                vec![group(
                    ObjectType::Property,
                    "Owner",
                    &[("Address", "1 Main St"), ("City", "Springfield"), ("State", "IL"), ("Postal Code", "62701"), ("County", "")],
                )],
            ),
            row(
                "b",
                vec![group(
                    ObjectType::Property,
                    "Executor",
                    &[("Address", "1 MAIN ST"), ("City", "springfield"), ("State", "il"), ("Postal Code", "62701"), ("County", "Sangamon")],
                )],
            ),
        ];

        let out = build(&rows, false, None);
        assert_eq!(out.properties.len(), 1);
        assert_eq!(out.merged_properties, 1);

        let kept = &out.properties[0];
        assert_eq!(kept.get("Import ID"), Some("a"));
        assert_eq!(kept.get("Association Label"), Some("Owner;Executor"));
        assert_eq!(kept.association_label(), "Owner;Executor");
        assert_eq!(kept.get("Address"), Some("1 Main St"));
        assert_eq!(kept.get("County"), Some("Sangamon"));
    }

    #[test]
    fn test_rows_without_address_never_merge() {
        let rows = vec![
            row("a", vec![group(ObjectType::Property, "Owner", &[("Address", ""), ("City", "Springfield")])]),
            row("b", vec![group(ObjectType::Property, "Owner", &[("Address", " "), ("City", "Springfield")])]),
        ];

        let out = build(&rows, false, None);
        assert_eq!(out.properties.len(), 2);
        assert_eq!(out.merged_properties, 0);
    }

    #[test]
    fn test_different_city_is_a_different_property() {
        let rows = vec![
            row("a", vec![group(ObjectType::Property, "Owner", &[("Address", "1 Main St"), ("City", "Springfield")])]),
            row("b", vec![group(ObjectType::Property, "Owner", &[("Address", "1 Main St"), ("City", "Shelbyville")])]),
        ];
        assert_eq!(build(&rows, false, None).properties.len(), 2);
    }

    #[test]
    fn test_fallback_address_fields() {
        let a = OutputRow {
            values: [("Property Address".to_string(), "9 Oak Ave".to_string()), ("Zip".to_string(), "60601".to_string())]
                .into_iter()
                .collect(),
            ..OutputRow::default()
        };
        assert_eq!(dedup_key(&a).as_deref(), Some("9 oak ave|||60601"));

        let mut b = a.clone();
        b.set("Address", "1 Main");
        assert_eq!(dedup_key(&b).as_deref(), Some("1 main|||60601"));
    }

    #[test]
    fn test_merge_labels_union_in_order() {
        assert_eq!(merge_labels("Owner;Heir", "heir; Executor"), "Owner;Heir;Executor");
        assert_eq!(merge_labels("", "Owner"), "Owner");
        assert_eq!(merge_labels("", ""), "");
    }

    #[test]
    fn test_kept_values_never_overwritten() {
        let rows = vec![
            row("a", vec![group(ObjectType::Property, "Owner", &[("Address", "1 Main"), ("Beds", "3")])]),
            row("b", vec![group(ObjectType::Property, "Owner", &[("Address", "1 main"), ("Beds", "4")])]),
        ];
        let out = build(&rows, false, None);
        assert_eq!(out.properties[0].get("Beds"), Some("3"));
        assert_eq!(out.properties[0].get("Association Label"), Some("Owner"));
    }

    #[test]
    fn test_metadata_columns_per_object_type() {
        let rows = vec![row(
            "a",
            vec![
                group(ObjectType::Contact, "Heir", &[("First Name", "Ann")]),
                group(ObjectType::Phone, "Heir", &[("Phone Number", "5551234567"), ("Phone Type", "Mobile")]),
            ],
        )];

        let out = build(&rows, false, None);
        let contact = &out.contacts[0];
        assert_eq!(contact.get("Import ID"), Some("a"));
        assert_eq!(contact.get("Data Source"), Some("County"));
        assert_eq!(contact.get("Data Type"), Some("Probate"));
        assert_eq!(contact.get("Tags"), Some("probate, hot"));
        assert_eq!(contact.get("Association Label"), None);

        let phone = &out.phones[0];
        assert_eq!(phone.get("Import ID"), Some("a"));
        assert_eq!(phone.get("Data Source"), Some("County"));
        assert_eq!(phone.get("Phone Type"), Some("Mobile"));
        assert_eq!(phone.get("Association Label"), None);
        assert_eq!(phone.get("Data Type"), None);
        assert_eq!(phone.get("Tags"), None);

        let out = build(&rows, true, None);
        assert_eq!(out.contacts[0].get("Association Label"), Some("Heir"));
    }

    #[test]
    fn test_tag_override_replaces_tags() {
        let rows = vec![row("a", vec![group(ObjectType::Contact, "Heir", &[("First Name", "Ann")])])];

        let out = build(&rows, false, Some(" batch-7 "));
        assert_eq!(out.contacts[0].get("Tags"), Some("batch-7"));
        assert_eq!(out.contacts[0].tags(), vec!["batch-7"]);

        let out = build(&rows, false, Some("   "));
        assert_eq!(out.contacts[0].get("Tags"), Some("probate, hot"));
    }

    #[test]
    fn test_groups_without_data_produce_no_rows() {
        let rows = vec![row(
            "a",
            vec![
                group(ObjectType::Property, "Owner", &[("Address", "1 Main")]),
                group(ObjectType::Contact, "Owner", &[("First Name", "")]),
            ],
        )];
        let out = build(&rows, false, None);
        assert_eq!(out.properties.len(), 1);
        assert!(out.contacts.is_empty());
    }

    #[test]
    fn test_mapped_metadata_header_wins_over_group_metadata() {
        let rows = vec![row(
            "a",
            vec![group(ObjectType::Contact, "Owner", &[("First Name", "Ann"), ("Data Source", "Referral")])],
        )];
        let out = build(&rows, false, None);
        assert_eq!(out.contacts[0].get("Data Source"), Some("Referral"));
        assert_eq!(out.contacts[0].data_source(), "Referral");
    }

    #[test]
    fn test_tag_override_replaces_mapped_tags() {
        let rows = vec![row(
            "a",
            vec![
                group(ObjectType::Contact, "Heir", &[("First Name", "Ann"), ("Tags", "old")]),
                group(ObjectType::Property, "Owner", &[("Address", "1 Main"), ("tags", "stale, cold")]),
            ],
        )];

        let out = build(&rows, false, Some("batch"));
        assert_eq!(out.contacts[0].get("Tags"), Some("batch"));
        assert_eq!(out.contacts[0].tags(), vec!["batch"]);
        assert_eq!(out.properties[0].tags(), vec!["batch"]);
        assert_eq!(out.properties[0].values.len(), 6);

        let out = build(&rows, false, None);
        assert_eq!(out.contacts[0].get("Tags"), Some("old"));
    }

    #[test]
    fn test_mapped_contact_label_dropped_unless_enabled() {
        let rows = vec![row(
            "a",
            vec![group(ObjectType::Contact, "", &[("First Name", "Ann"), ("Association Label", "Heir")])],
        )];

        let out = build(&rows, false, None);
        assert_eq!(out.contacts[0].get("Association Label"), None);

        let out = build(&rows, true, None);
        assert_eq!(out.contacts[0].association_label(), "Heir");
    }

    #[test]
    fn test_phone_rows_drop_mapped_label_type_and_tags() {
        let rows = vec![row(
            "a",
            vec![group(
                ObjectType::Phone,
                "Heir",
                &[
                    ("Phone Number", "5551234567"),
                    ("Association Label", "Heir"),
                    ("Data Type", "Cell"),
                    ("TAGS", "dnc"),
                    ("Import ID", "x"),
                    ("Carrier", "Acme"),
                ],
            )],
        )];

        let out = build(&rows, true, Some("batch"));
        let phone = &out.phones[0];
        let mut headers: Vec<&str> = phone.values.keys().map(String::as_str).collect();
        headers.sort();
        assert_eq!(headers, vec!["Carrier", "Data Source", "Import ID", "Phone Number"]);
        assert_eq!(phone.get("Import ID"), Some("a"));
    }
}
