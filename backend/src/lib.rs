//! # crmload - profile-driven CSV to CRM import conversion
//!
//! crmload turns a lead list (one CSV row per source record) into three
//! import files for a relational CRM: properties, contacts and phone numbers.
//! A JSON profile says which column feeds which output field, in which
//! numbered group, with which transform and metadata.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV File   │────▶│   Parser    │────▶│  Transform  │────▶│   Output    │
//! │ (any enc.)  │     │ (auto-enc)  │     │ (profile +  │     │ (csv, xlsx, │
//! └─────────────┘     └─────────────┘     │   dedup)    │     │  summary)   │
//!                                         └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use crmload::{example_profile, process, read_table, ProcessOptions};
//!
//! let (table, _info) = read_table("leads.csv".as_ref())?;
//! let result = process(&example_profile(), &table, &ProcessOptions::default())?;
//! println!("{} properties after dedup", result.properties.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Profile, input table and output row types
//! - [`parser`] - CSV reading with auto-detection
//! - [`transform`] - DSL, group resolution, row processing, dedup, pipeline
//! - [`output`] - CSV / xlsx / summary writers
//! - [`validation`] - Profile schema validation
//! - [`store`] - On-disk profile store
//! - [`logs`] - Log broadcasting and progress

// Core modules
pub mod error;
pub mod models;

// Input
pub mod parser;

// Conversion
pub mod transform;

// Output
pub mod output;

// Profiles
pub mod store;
pub mod validation;

// Logging
pub mod logs;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, CsvError, CsvResult, PipelineError, PipelineResult, StoreError, StoreResult,
    WriteError, WriteResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    columns, example_profile, GroupDefaults, HeaderIndex, InputTable, Mapping, MissingHeaderBehavior, ObjectType,
    OutputRow, Profile, RowView,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{detect_delimiter, detect_encoding, read_bytes, read_table, ReadInfo};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::dsl::{transforms_description, Transform};
pub use transform::{
    process, process_cancellable, resolve, ProcessOptions, ProcessResult, ResolvedGroups, RunHandle, RunOutcome,
};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use output::{write_outputs, OutputFormat, OutputOptions, RunSummary, WriteReport};

// =============================================================================
// Re-exports - Store, validation, logs
// =============================================================================

pub use logs::{LogProgress, NoProgress, ProgressSink};
pub use store::{ProfileStore, StoredProfile};
pub use validation::validate_profile;
