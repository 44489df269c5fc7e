//! Resolve a profile's flat mapping list into numbered groups.
//!
//! Each (object type, group index) becomes one [`ResolvedGroup`] holding its
//! mappings in declaration order, compiled transforms, and effective metadata.
//!
//! # Metadata precedence
//!
//! - Association label / data source: the group default, unless mappings carry
//!   non-blank overrides. Overrides are de-duplicated case-insensitively; with
//!   more than one distinct value the first declared wins and a warning is
//!   recorded.
//! - Tags: every non-blank tag override of the group is unioned (no warning),
//!   and the union replaces the default tags when non-empty.
//! - Data type: group default only.

use std::collections::{BTreeMap, HashSet};

use super::columns::excluded_columns;
use super::dsl::Transform;
use crate::error::{ConfigError, ConfigResult};
use crate::models::{columns, normalize_key, Mapping, ObjectType, Profile};

/// A mapping with its transform compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMapping {
    pub source_field: String,
    pub output_header: String,
    pub transform: Option<Transform>,
}

/// Metadata applied to every output row of a group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroupMetadata {
    pub association_label: String,
    pub data_source: String,
    pub data_type: String,
    pub tags: Vec<String>,
}

/// One (object type, group index) bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    pub object_type: ObjectType,
    pub group_index: u32,
    pub mappings: Vec<ResolvedMapping>,
    pub metadata: GroupMetadata,
}

/// All groups of a profile, per object type, ordered by group index.
#[derive(Debug, Clone, Default)]
pub struct ResolvedGroups {
    pub properties: Vec<ResolvedGroup>,
    pub contacts: Vec<ResolvedGroup>,
    pub phones: Vec<ResolvedGroup>,
    /// Override conflicts and other non-fatal findings.
    pub warnings: Vec<String>,
}

impl ResolvedGroups {
    pub fn for_type(&self, object_type: ObjectType) -> &[ResolvedGroup] {
        match object_type {
            ObjectType::Property => &self.properties,
            ObjectType::Contact => &self.contacts,
            ObjectType::Phone => &self.phones,
        }
    }

    /// Every group: properties, then contacts, then phones.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedGroup> {
        self.properties
            .iter()
            .chain(self.contacts.iter())
            .chain(self.phones.iter())
    }

    pub fn len(&self) -> usize {
        self.properties.len() + self.contacts.len() + self.phones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve every mapping group of a profile.
///
/// Fails on the first group index ≤ 0, duplicate output header, or invalid
/// transform. Nothing is evaluated against data here.
pub fn resolve(profile: &Profile) -> ConfigResult<ResolvedGroups> {
    let mut buckets: BTreeMap<(ObjectType, u32), Vec<&Mapping>> = BTreeMap::new();

    for mapping in &profile.mappings {
        let index = group_index(mapping.object_type, mapping.group_index, &mapping.source_field)?;
        buckets
            .entry((mapping.object_type, index))
            .or_default()
            .push(mapping);
    }

    let mut resolved = ResolvedGroups::default();

    for defaults in &profile.groups {
        let index = group_index(defaults.object_type, defaults.group_index, "(group defaults)")?;
        if !buckets.contains_key(&(defaults.object_type, index)) {
            resolved.warnings.push(format!(
                "{} group {} has defaults but no mappings",
                defaults.object_type, index
            ));
        }
    }

    for ((object_type, index), mappings) in buckets {
        check_unique_headers(object_type, index, &mappings)?;
        warn_ignored_headers(object_type, index, &mappings, &mut resolved.warnings);

        let compiled = mappings
            .iter()
            .map(|m| -> ConfigResult<ResolvedMapping> {
                let transform = match m.transform.as_deref().map(str::trim) {
                    Some(text) if !text.is_empty() => Some(Transform::parse(text, &m.source_field)?),
                    _ => None,
                };
                Ok(ResolvedMapping {
                    source_field: m.source_field.clone(),
                    output_header: m.output_header.trim().to_string(),
                    transform,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        let metadata = resolve_metadata(profile, object_type, index, &mappings, &mut resolved.warnings);

        let group = ResolvedGroup {
            object_type,
            group_index: index,
            mappings: compiled,
            metadata,
        };

        match object_type {
            ObjectType::Property => resolved.properties.push(group),
            ObjectType::Contact => resolved.contacts.push(group),
            ObjectType::Phone => resolved.phones.push(group),
        }
    }

    Ok(resolved)
}

fn group_index(object_type: ObjectType, index: i64, source_field: &str) -> ConfigResult<u32> {
    u32::try_from(index)
        .ok()
        .filter(|i| *i > 0)
        .ok_or_else(|| ConfigError::InvalidGroupIndex {
            object_type,
            index,
            source_field: source_field.to_string(),
        })
}

fn check_unique_headers(object_type: ObjectType, index: u32, mappings: &[&Mapping]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for m in mappings {
        let key = normalize_key(&m.output_header);
        if !seen.insert(key.clone()) && reported.insert(key) {
            duplicates.push(m.output_header.trim().to_string());
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::DuplicateTarget {
            object_type,
            group: index,
            headers: duplicates,
        })
    }
}

/// Mapped headers the output builder overwrites or drops.
fn warn_ignored_headers(object_type: ObjectType, index: u32, mappings: &[&Mapping], warnings: &mut Vec<String>) {
    let import_id = normalize_key(columns::IMPORT_ID);
    let always_dropped: HashSet<String> = match object_type {
        ObjectType::Phone => excluded_columns(object_type, false)
            .iter()
            .map(|c| normalize_key(c))
            .collect(),
        _ => HashSet::new(),
    };

    for m in mappings {
        let key = normalize_key(&m.output_header);
        if key == import_id {
            warnings.push(format!(
                "{} group {} maps '{}' to Import ID; the row's correlation id is written instead",
                object_type, index, m.source_field
            ));
        } else if always_dropped.contains(&key) {
            warnings.push(format!(
                "{} group {} maps '{}' to {}, which {} rows never carry; the column is dropped",
                object_type,
                index,
                m.source_field,
                m.output_header.trim(),
                object_type.label().to_lowercase()
            ));
        }
    }
}

fn resolve_metadata(
    profile: &Profile,
    object_type: ObjectType,
    index: u32,
    mappings: &[&Mapping],
    warnings: &mut Vec<String>,
) -> GroupMetadata {
    let defaults = profile.defaults_for(object_type, i64::from(index));
    let default_label = defaults.map(|d| d.association_label.trim()).unwrap_or("");
    let default_source = defaults.map(|d| d.data_source.trim()).unwrap_or("");
    let default_type = defaults.map(|d| d.data_type.trim()).unwrap_or("");
    let default_tags = defaults.map(|d| d.tags.as_slice()).unwrap_or(&[]);

    let label = first_override(
        mappings.iter().map(|m| m.association_label_override.as_deref()),
        object_type,
        index,
        "association label",
        warnings,
    );
    let source = first_override(
        mappings.iter().map(|m| m.data_source_override.as_deref()),
        object_type,
        index,
        "data source",
        warnings,
    );

    let tag_overrides = distinct_non_blank(mappings.iter().flat_map(|m| m.tags_override.iter().map(String::as_str)));
    let tags = if tag_overrides.is_empty() {
        distinct_non_blank(default_tags.iter().map(String::as_str))
    } else {
        tag_overrides
    };

    GroupMetadata {
        association_label: label.unwrap_or_else(|| default_label.to_string()),
        data_source: source.unwrap_or_else(|| default_source.to_string()),
        data_type: default_type.to_string(),
        tags,
    }
}

/// First-declared override, warning when distinct values disagree.
fn first_override<'a>(
    values: impl Iterator<Item = Option<&'a str>>,
    object_type: ObjectType,
    index: u32,
    what: &str,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let distinct = distinct_non_blank(values.flatten());
    if distinct.len() > 1 {
        warnings.push(format!(
            "{} group {}: conflicting {} overrides ({}); using '{}'",
            object_type,
            index,
            what,
            distinct.join(", "),
            distinct[0]
        ));
    }
    distinct.into_iter().next()
}

/// Trimmed non-blank values, de-duplicated case-insensitively, first spelling kept.
fn distinct_non_blank<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_lowercase()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GroupDefaults;

    fn property(source: &str, group: i64, header: &str) -> Mapping {
        Mapping::new(source, ObjectType::Property, group, header)
    }

    #[test]
    fn test_duplicate_target_in_group_fails() {
        let profile = Profile::new("dup")
            .with_mapping(property("City", 1, "City"))
            .with_mapping(property("Town", 1, "City"));

        let err = resolve(&profile).unwrap_err();
        match err {
            ConfigError::DuplicateTarget { object_type, group, headers } => {
                assert_eq!(object_type, ObjectType::Property);
                assert_eq!(group, 1);
                assert_eq!(headers, vec!["City".to_string()]);
            }
            other => panic!("expected DuplicateTarget, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_target_is_case_insensitive() {
        let profile = Profile::new("dup")
            .with_mapping(property("City", 2, "City"))
            .with_mapping(property("Town", 2, "city "));
        assert!(matches!(resolve(&profile), Err(ConfigError::DuplicateTarget { group: 2, .. })));
    }

    #[test]
    fn test_same_header_in_other_group_is_fine() {
        let profile = Profile::new("ok")
            .with_mapping(property("City", 1, "City"))
            .with_mapping(property("Mail City", 2, "City"))
            .with_mapping(Mapping::new("City", ObjectType::Contact, 1, "City"));

        let groups = resolve(&profile).unwrap();
        assert_eq!(groups.properties.len(), 2);
        assert_eq!(groups.contacts.len(), 1);
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_group_index_must_be_positive() {
        let profile = Profile::new("bad").with_mapping(property("City", 0, "City"));
        assert!(matches!(
            resolve(&profile),
            Err(ConfigError::InvalidGroupIndex { index: 0, .. })
        ));

        let profile = Profile::new("bad").with_mapping(property("City", -3, "City"));
        assert!(matches!(
            resolve(&profile),
            Err(ConfigError::InvalidGroupIndex { index: -3, .. })
        ));
    }

    #[test]
    fn test_groups_sorted_by_index_mappings_in_declaration_order() {
        let profile = Profile::new("order")
            .with_mapping(property("B", 2, "B"))
            .with_mapping(property("Z", 1, "Z"))
            .with_mapping(property("A", 1, "A"));

        let groups = resolve(&profile).unwrap();
        assert_eq!(groups.properties[0].group_index, 1);
        assert_eq!(groups.properties[1].group_index, 2);
        let headers: Vec<&str> = groups.properties[0]
            .mappings
            .iter()
            .map(|m| m.output_header.as_str())
            .collect();
        assert_eq!(headers, vec!["Z", "A"]);
    }

    #[test]
    fn test_defaults_used_without_overrides() {
        let profile = Profile::new("defaults")
            .with_mapping(property("Address", 1, "Address"))
            .with_group(
                GroupDefaults::new(ObjectType::Property, 1)
                    .with_association_label("Owner")
                    .with_data_source("Tax roll")
                    .with_data_type("Absentee")
                    .with_tags(["hot", "", "HOT", "vacant"]),
            );

        let groups = resolve(&profile).unwrap();
        let meta = &groups.properties[0].metadata;
        assert_eq!(meta.association_label, "Owner");
        assert_eq!(meta.data_source, "Tax roll");
        assert_eq!(meta.data_type, "Absentee");
        assert_eq!(meta.tags, vec!["hot", "vacant"]);
        assert!(groups.warnings.is_empty());
    }

    #[test]
    fn test_conflicting_overrides_first_wins_with_warning() {
        let profile = Profile::new("conflict")
            .with_mapping(property("Address", 1, "Address").with_association_label("Owner"))
            .with_mapping(property("City", 1, "City").with_association_label("owner"))
            .with_mapping(property("State", 1, "State").with_association_label("Executor"))
            .with_group(GroupDefaults::new(ObjectType::Property, 1).with_association_label("Heir"));

        let groups = resolve(&profile).unwrap();
        assert_eq!(groups.properties[0].metadata.association_label, "Owner");
        assert_eq!(groups.warnings.len(), 1);
        assert!(groups.warnings[0].contains("Property group 1"));
        assert!(groups.warnings[0].contains("Owner, Executor"));
    }

    #[test]
    fn test_case_variants_of_one_override_do_not_warn() {
        let profile = Profile::new("same")
            .with_mapping(property("Address", 1, "Address").with_data_source("MLS"))
            .with_mapping(property("City", 1, "City").with_data_source("mls"));

        let groups = resolve(&profile).unwrap();
        assert_eq!(groups.properties[0].metadata.data_source, "MLS");
        assert!(groups.warnings.is_empty());
    }

    #[test]
    fn test_tag_overrides_union_and_replace_defaults() {
        let profile = Profile::new("tags")
            .with_mapping(property("Address", 1, "Address").with_tags(["a", "b"]))
            .with_mapping(property("City", 1, "City").with_tags(["B", "c"]))
            .with_group(GroupDefaults::new(ObjectType::Property, 1).with_tags(["default"]));

        let groups = resolve(&profile).unwrap();
        assert_eq!(groups.properties[0].metadata.tags, vec!["a", "b", "c"]);
        assert!(groups.warnings.is_empty());
    }

    #[test]
    fn test_invalid_transform_fails_at_resolution() {
        let profile = Profile::new("bad").with_mapping(property("Zip", 1, "Postal Code").with_transform("Zip9"));
        assert!(matches!(resolve(&profile), Err(ConfigError::UnknownTransform { .. })));

        let profile = Profile::new("blank").with_mapping(property("Zip", 1, "Postal Code").with_transform("  "));
        assert_eq!(resolve(&profile).unwrap().properties[0].mappings[0].transform, None);
    }

    #[test]
    fn test_orphan_defaults_warn() {
        let profile = Profile::new("orphan")
            .with_mapping(property("Address", 1, "Address"))
            .with_group(GroupDefaults::new(ObjectType::Contact, 4));

        let groups = resolve(&profile).unwrap();
        assert_eq!(groups.warnings.len(), 1);
        assert!(groups.warnings[0].contains("Contact group 4"));
    }

    #[test]
    fn test_ignored_metadata_headers_warn() {
        let profile = Profile::new("phones")
            .with_mapping(Mapping::new("Phone", ObjectType::Phone, 1, "Phone Number"))
            .with_mapping(Mapping::new("Flag", ObjectType::Phone, 1, "tags"))
            .with_mapping(Mapping::new("Kind", ObjectType::Phone, 1, "Data Type"))
            .with_mapping(Mapping::new("Role", ObjectType::Contact, 1, "Association Label"))
            .with_mapping(Mapping::new("Id", ObjectType::Contact, 1, "Import ID"));

        let groups = resolve(&profile).unwrap();
        assert_eq!(groups.warnings.len(), 3);
        assert!(groups.warnings.iter().any(|w| w.contains("'Id' to Import ID")));
        assert!(groups.warnings.iter().any(|w| w.contains("'Flag' to tags")));
        assert!(groups.warnings.iter().any(|w| w.contains("'Kind' to Data Type")));
    }
}
