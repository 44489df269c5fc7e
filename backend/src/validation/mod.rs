//! JSON Schema validation for profile documents.
//!
//! Profiles are checked against `schemas/profile.schema.json` (Draft 7,
//! embedded at compile time) before they are deserialized, so a malformed
//! document reports every problem at once instead of the first serde error.
//!
//! ```rust,ignore
//! use serde_json::json;
//! use crmload::validation::validate_profile;
//!
//! let profile = json!({
//!     "mappings": [{
//!         "sourceField": "Addr",
//!         "objectType": "property",
//!         "groupIndex": 1,
//!         "outputHeader": "Address"
//!     }]
//! });
//! assert!(validate_profile(&profile).is_ok());
//! ```

use serde_json::Value;

const PROFILE_SCHEMA: &str = include_str!("../../schemas/profile.schema.json");

/// Validate a JSON value against a JSON schema.
///
/// Returns every validation message on failure.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// True when `data` satisfies `schema`.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// The embedded profile schema.
pub fn profile_schema() -> Result<Value, Vec<String>> {
    serde_json::from_str(PROFILE_SCHEMA).map_err(|e| vec![format!("Invalid embedded profile schema: {}", e)])
}

/// Validate a profile document.
pub fn validate_profile(data: &Value) -> Result<(), Vec<String>> {
    let schema = profile_schema()?;
    validate(&schema, data)
}
