//! Domain models for the crmload conversion pipeline.
//!
//! - [`Profile`] - User-authored mapping configuration
//! - [`Mapping`] - One source column → one output header in a numbered group
//! - [`GroupDefaults`] - Metadata shared by every row of a group
//! - [`ObjectType`] - Property, Contact or Phone
//! - [`InputTable`] - Loaded input with case-insensitive header lookup
//! - [`OutputRow`] - One row of an output file

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigError, ConfigResult};

pub mod output;
pub mod table;

pub use output::{columns, OutputRow};
pub use table::{normalize_key, HeaderIndex, InputTable, RowView};

// =============================================================================
// Object Type
// =============================================================================

/// Kind of CRM record a mapping group produces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Property,
    Contact,
    Phone,
}

impl ObjectType {
    /// All object types, in output order.
    pub const ALL: [ObjectType; 3] = [ObjectType::Property, ObjectType::Contact, ObjectType::Phone];

    /// Display name ("Property").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Property => "Property",
            Self::Contact => "Contact",
            Self::Phone => "Phone",
        }
    }

    /// Plural file stem ("properties").
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Property => "properties",
            Self::Contact => "contacts",
            Self::Phone => "phones",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Missing Header Policy
// =============================================================================

/// What to do when a mapped source column is not in the input.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingHeaderBehavior {
    /// Abort the run, listing every missing column.
    Error,
    /// Resolve missing columns to empty strings and report them.
    #[default]
    #[serde(alias = "tolerant")]
    Ignore,
}

// =============================================================================
// Mapping
// =============================================================================

/// A single field mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    /// Input column name (matched case-insensitively).
    pub source_field: String,
    /// Target record kind.
    pub object_type: ObjectType,
    /// Group number within the object type (1-based).
    pub group_index: i64,
    /// Output column name.
    pub output_header: String,
    /// Transform expression, e.g. `Trim` or `Left(5)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association_label_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source_override: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags_override: Vec<String>,
}

impl Mapping {
    /// Create a plain mapping without transform or overrides.
    pub fn new(
        source_field: impl Into<String>,
        object_type: ObjectType,
        group_index: i64,
        output_header: impl Into<String>,
    ) -> Self {
        Self {
            source_field: source_field.into(),
            object_type,
            group_index,
            output_header: output_header.into(),
            transform: None,
            association_label_override: None,
            data_source_override: None,
            tags_override: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = Some(transform.into());
        self
    }

    pub fn with_association_label(mut self, label: impl Into<String>) -> Self {
        self.association_label_override = Some(label.into());
        self
    }

    pub fn with_data_source(mut self, source: impl Into<String>) -> Self {
        self.data_source_override = Some(source.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags_override = tags.into_iter().map(Into::into).collect();
        self
    }
}

// =============================================================================
// Group Defaults
// =============================================================================

/// Metadata authored once per (object type, group) and applied to every row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupDefaults {
    pub object_type: ObjectType,
    pub group_index: i64,
    #[serde(default)]
    pub association_label: String,
    #[serde(default)]
    pub data_source: String,
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl GroupDefaults {
    pub fn new(object_type: ObjectType, group_index: i64) -> Self {
        Self {
            object_type,
            group_index,
            association_label: String::new(),
            data_source: String::new(),
            data_type: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_association_label(mut self, label: impl Into<String>) -> Self {
        self.association_label = label.into();
        self
    }

    pub fn with_data_source(mut self, source: impl Into<String>) -> Self {
        self.data_source = source.into();
        self
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

// =============================================================================
// Profile
// =============================================================================

/// A complete mapping profile.
///
/// Owned by the caller and never mutated by a processing run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mappings: Vec<Mapping>,
    #[serde(default)]
    pub groups: Vec<GroupDefaults>,
    #[serde(default)]
    pub missing_header_behavior: MissingHeaderBehavior,
    #[serde(default)]
    pub include_secondary_contacts_association_label: bool,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn with_group(mut self, defaults: GroupDefaults) -> Self {
        self.groups.push(defaults);
        self
    }

    /// Parse a profile from JSON, validating it against the embedded schema first.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse a profile from an already-decoded JSON value.
    pub fn from_value(value: &serde_json::Value) -> ConfigResult<Self> {
        crate::validation::validate_profile(value)
            .map_err(|errors| ConfigError::InvalidProfile { errors })?;
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Defaults authored for a group, if any.
    pub fn defaults_for(&self, object_type: ObjectType, group_index: i64) -> Option<&GroupDefaults> {
        self.groups
            .iter()
            .find(|g| g.object_type == object_type && g.group_index == group_index)
    }

    /// Distinct source columns in declaration order (case-insensitive).
    pub fn source_fields(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.mappings
            .iter()
            .filter(|m| seen.insert(normalize_key(&m.source_field)))
            .map(|m| m.source_field.clone())
            .collect()
    }

    /// Source columns referenced by the profile that the input lacks.
    pub fn missing_headers(&self, index: &HeaderIndex) -> Vec<String> {
        self.source_fields()
            .into_iter()
            .filter(|field| !index.contains(field))
            .collect()
    }
}

/// Example profile used by `crmload example-profile` and the tests.
pub fn example_profile() -> Profile {
    Profile::new("Probate leads")
        .with_mapping(Mapping::new("Address", ObjectType::Property, 1, "Address").with_transform("Trim"))
        .with_mapping(Mapping::new("City", ObjectType::Property, 1, "City").with_transform("Trim"))
        .with_mapping(Mapping::new("State", ObjectType::Property, 1, "State").with_transform("Upper"))
        .with_mapping(Mapping::new("Zip", ObjectType::Property, 1, "Postal Code").with_transform("Zip5"))
        .with_mapping(Mapping::new("Owner First", ObjectType::Contact, 1, "First Name").with_transform("Trim"))
        .with_mapping(Mapping::new("Owner Last", ObjectType::Contact, 1, "Last Name").with_transform("Trim"))
        .with_mapping(Mapping::new("Owner Phone", ObjectType::Phone, 1, "Phone Number").with_transform("Phone10"))
        .with_group(
            GroupDefaults::new(ObjectType::Property, 1)
                .with_association_label("Owner")
                .with_data_source("County Records")
                .with_data_type("Probate"),
        )
        .with_group(
            GroupDefaults::new(ObjectType::Contact, 1)
                .with_association_label("Owner")
                .with_data_source("County Records")
                .with_data_type("Probate")
                .with_tags(["probate"]),
        )
        .with_group(GroupDefaults::new(ObjectType::Phone, 1).with_data_source("County Records"))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_json_roundtrip_fields() {
        let json = json!({
            "name": "Leads",
            "mappings": [{
                "sourceField": "Addr",
                "objectType": "property",
                "groupIndex": 1,
                "outputHeader": "Address",
                "transform": "Trim",
                "associationLabelOverride": "Owner"
            }],
            "groups": [{
                "objectType": "property",
                "groupIndex": 1,
                "dataSource": "Tax roll"
            }],
            "missingHeaderBehavior": "error"
        });

        let profile = Profile::from_value(&json).unwrap();
        assert_eq!(profile.mappings.len(), 1);
        assert_eq!(profile.mappings[0].object_type, ObjectType::Property);
        assert_eq!(profile.mappings[0].association_label_override.as_deref(), Some("Owner"));
        assert_eq!(profile.missing_header_behavior, MissingHeaderBehavior::Error);
        assert_eq!(
            profile.defaults_for(ObjectType::Property, 1).map(|g| g.data_source.as_str()),
            Some("Tax roll")
        );
        assert!(profile.defaults_for(ObjectType::Contact, 1).is_none());
    }

    #[test]
    fn test_tolerant_alias() {
        let behavior: MissingHeaderBehavior = serde_json::from_str("\"tolerant\"").unwrap();
        assert_eq!(behavior, MissingHeaderBehavior::Ignore);
    }

    #[test]
    fn test_source_fields_deduplicated_case_insensitively() {
        let profile = Profile::new("p")
            .with_mapping(Mapping::new("Address", ObjectType::Property, 1, "Address"))
            .with_mapping(Mapping::new("ADDRESS", ObjectType::Property, 2, "Address"))
            .with_mapping(Mapping::new("Owner", ObjectType::Contact, 1, "First Name"));

        assert_eq!(profile.source_fields(), vec!["Address", "Owner"]);
    }

    #[test]
    fn test_missing_headers() {
        let profile = example_profile();
        let index = HeaderIndex::new(&["address".to_string(), "CITY".to_string()]);
        let missing = profile.missing_headers(&index);
        assert!(!missing.contains(&"Address".to_string()));
        assert!(!missing.contains(&"City".to_string()));
        assert!(missing.contains(&"Zip".to_string()));
        assert!(missing.contains(&"Owner Phone".to_string()));
    }

    #[test]
    fn test_object_type_display() {
        assert_eq!(ObjectType::Phone.to_string(), "Phone");
        assert_eq!(ObjectType::Property.file_stem(), "properties");
    }
}
