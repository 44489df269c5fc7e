//! Evaluate one input row against every resolved group.
//!
//! The processor is pure apart from the correlation-id source it is handed:
//! counters and warnings live in [`GroupCounters`] and the pipeline, not here.

use serde::Serialize;
use std::collections::BTreeMap;

use super::dsl;
use super::resolver::{ResolvedGroup, ResolvedGroups};
use crate::models::{ObjectType, RowView};

/// One group's result for one row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedGroup {
    pub object_type: ObjectType,
    pub group_index: u32,
    pub association_label: String,
    pub data_source: String,
    pub data_type: String,
    pub tags: Vec<String>,
    /// (output header, value) in mapping order.
    pub values: Vec<(String, String)>,
    /// At least one value is non-blank after transform.
    pub has_data: bool,
}

/// Every group's result for one kept row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRow {
    pub correlation_id: String,
    pub groups: Vec<ProcessedGroup>,
}

impl ProcessedRow {
    /// Groups of one object type that produced data.
    pub fn groups_with_data(&self, object_type: ObjectType) -> impl Iterator<Item = &ProcessedGroup> {
        self.groups
            .iter()
            .filter(move |g| g.object_type == object_type && g.has_data)
    }
}

/// Evaluate a row; `None` when no group of any object type has data.
///
/// `next_id` is only called for kept rows, so dropped rows never consume a
/// correlation id.
pub fn process_row<F>(row: &RowView<'_>, groups: &ResolvedGroups, next_id: &mut F) -> Option<ProcessedRow>
where
    F: FnMut() -> String,
{
    let processed: Vec<ProcessedGroup> = groups.iter().map(|g| process_group(row, g)).collect();

    if !processed.iter().any(|g| g.has_data) {
        return None;
    }

    Some(ProcessedRow {
        correlation_id: next_id(),
        groups: processed,
    })
}

fn process_group(row: &RowView<'_>, group: &ResolvedGroup) -> ProcessedGroup {
    let values: Vec<(String, String)> = group
        .mappings
        .iter()
        .map(|m| {
            // Missing source columns read as empty; the policy check runs once per table.
            let raw = row.get(&m.source_field).unwrap_or("");
            let value = dsl::apply(raw, m.transform.as_ref(), row);
            (m.output_header.clone(), value)
        })
        .collect();

    let has_data = values.iter().any(|(_, v)| !v.trim().is_empty());

    ProcessedGroup {
        object_type: group.object_type,
        group_index: group.group_index,
        association_label: group.metadata.association_label.clone(),
        data_source: group.metadata.data_source.clone(),
        data_type: group.metadata.data_type.clone(),
        tags: group.metadata.tags.clone(),
        values,
        has_data,
    }
}

/// Rows-with-data count for one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupCount {
    pub object_type: ObjectType,
    pub group_index: u32,
    pub rows: usize,
}

/// Per-(object type, group) counters, updated in row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupCounters {
    counts: BTreeMap<(ObjectType, u32), usize>,
}

impl GroupCounters {
    /// Counters starting at zero for every resolved group.
    pub fn for_groups(groups: &ResolvedGroups) -> Self {
        Self {
            counts: groups.iter().map(|g| ((g.object_type, g.group_index), 0)).collect(),
        }
    }

    pub fn record(&mut self, row: &ProcessedRow) {
        for g in row.groups.iter().filter(|g| g.has_data) {
            *self.counts.entry((g.object_type, g.group_index)).or_insert(0) += 1;
        }
    }

    pub fn get(&self, object_type: ObjectType, group_index: u32) -> usize {
        self.counts.get(&(object_type, group_index)).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> Vec<GroupCount> {
        self.counts
            .iter()
            .map(|(&(object_type, group_index), &rows)| GroupCount {
                object_type,
                group_index,
                rows,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputTable, Mapping, Profile};
    use crate::transform::resolver::resolve;

    fn profile() -> Profile {
        Profile::new("p")
            .with_mapping(Mapping::new("Address", ObjectType::Property, 1, "Address").with_transform("Trim"))
            .with_mapping(Mapping::new("Owner", ObjectType::Contact, 1, "First Name"))
            .with_mapping(Mapping::new("Phone", ObjectType::Phone, 1, "Phone Number").with_transform("Phone10"))
    }

    fn ids() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("id-{n}")
        }
    }

    #[test]
    fn test_row_with_data_gets_id_and_flags() {
        let table = InputTable::from_records(
            ["Address", "Owner", "Phone"],
            vec![vec![("Address", " 1 Main St "), ("Owner", ""), ("Phone", "n/a")]],
        );
        let groups = resolve(&profile()).unwrap();
        let mut next = ids();

        let row = process_row(&table.row(0).unwrap(), &groups, &mut next).unwrap();
        assert_eq!(row.correlation_id, "id-1");
        assert_eq!(row.groups.len(), 3);
        assert!(row.groups[0].has_data);
        assert_eq!(row.groups[0].values, vec![("Address".to_string(), "1 Main St".to_string())]);
        assert!(!row.groups[1].has_data);
        // Phone10 of "n/a" has no digits
        assert!(!row.groups[2].has_data);
        assert_eq!(row.groups_with_data(ObjectType::Property).count(), 1);
        assert_eq!(row.groups_with_data(ObjectType::Phone).count(), 0);
    }

    #[test]
    fn test_blank_row_dropped_without_consuming_id() {
        let table = InputTable::from_records(
            ["Address", "Owner", "Phone"],
            vec![
                vec![("Address", "   "), ("Owner", ""), ("Phone", "")],
                vec![("Address", ""), ("Owner", "Ann"), ("Phone", "")],
            ],
        );
        let groups = resolve(&profile()).unwrap();
        let mut next = ids();

        assert!(process_row(&table.row(0).unwrap(), &groups, &mut next).is_none());
        let kept = process_row(&table.row(1).unwrap(), &groups, &mut next).unwrap();
        assert_eq!(kept.correlation_id, "id-1");
    }

    #[test]
    fn test_missing_source_column_reads_empty() {
        let table = InputTable::from_records(["Owner"], vec![vec![("Owner", "Ann")]]);
        let groups = resolve(&profile()).unwrap();
        let mut next = ids();

        let row = process_row(&table.row(0).unwrap(), &groups, &mut next).unwrap();
        assert_eq!(row.groups[0].values[0].1, "");
        assert!(!row.groups[0].has_data);
        assert!(row.groups[1].has_data);
    }

    #[test]
    fn test_counters() {
        let table = InputTable::from_records(
            ["Address", "Owner", "Phone"],
            vec![
                vec![("Address", "1 Main"), ("Owner", "Ann"), ("Phone", "")],
                vec![("Address", "2 Main"), ("Owner", ""), ("Phone", "")],
            ],
        );
        let groups = resolve(&profile()).unwrap();
        let mut counters = GroupCounters::for_groups(&groups);
        let mut next = ids();

        for row in table.rows() {
            if let Some(processed) = process_row(&row, &groups, &mut next) {
                counters.record(&processed);
            }
        }

        assert_eq!(counters.get(ObjectType::Property, 1), 2);
        assert_eq!(counters.get(ObjectType::Contact, 1), 1);
        assert_eq!(counters.get(ObjectType::Phone, 1), 0);
        assert_eq!(counters.counts().len(), 3);
    }
}
