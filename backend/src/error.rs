//! Error types for the crmload conversion pipeline.
//!
//! - [`ConfigError`] - Profile / mapping configuration errors (fatal, raised before any row)
//! - [`CsvError`] - Input reader errors
//! - [`WriteError`] - Output writer errors, always tagged with the target path
//! - [`StoreError`] - Profile store errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::ObjectType;

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in a profile, detected while resolving mapping groups.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Group indexes start at 1.
    #[error("Invalid group index {index} for {object_type} mapping '{source_field}' (must be > 0)")]
    InvalidGroupIndex {
        object_type: ObjectType,
        index: i64,
        source_field: String,
    },

    /// Two mappings of one group write the same output header.
    #[error("{object_type} group {group} maps more than one field to output header(s): {}", .headers.join(", "))]
    DuplicateTarget {
        object_type: ObjectType,
        group: u32,
        headers: Vec<String>,
    },

    /// Transform verb is not part of the DSL.
    #[error("Unknown transform '{verb}' on field '{field}'")]
    UnknownTransform { field: String, verb: String },

    /// Transform called with the wrong number of arguments.
    #[error("Transform '{verb}' on field '{field}' expects {expected} argument(s), got {actual}")]
    TransformArity {
        field: String,
        verb: String,
        expected: String,
        actual: usize,
    },

    /// Numeric transform argument did not parse.
    #[error("Transform '{verb}' on field '{field}': '{value}' is not a non-negative integer")]
    TransformArgument {
        field: String,
        verb: String,
        value: String,
    },

    /// Transform text could not be tokenised.
    #[error("Malformed transform '{text}' on field '{field}': {message}")]
    TransformSyntax {
        field: String,
        text: String,
        message: String,
    },

    /// Profile document failed schema validation.
    #[error("Invalid profile: {}", .errors.join("; "))]
    InvalidProfile { errors: Vec<String> },

    /// JSON serialization/deserialization error.
    #[error("Profile JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Input Reader Errors
// =============================================================================

/// Errors while reading the input table.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid CSV format.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

// =============================================================================
// Writer Errors
// =============================================================================

/// Errors while writing one output artifact.
#[derive(Debug, Error)]
pub enum WriteError {
    /// File system failure.
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization failure.
    #[error("Failed to write CSV {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Spreadsheet serialization failure.
    #[error("Failed to write spreadsheet {}: {source}", .path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// JSON serialization failure.
    #[error("Failed to write summary {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Background writer task died.
    #[error("Writer task for {} failed: {message}", .path.display())]
    Task { path: PathBuf, message: String },
}

impl WriteError {
    /// Path of the artifact that failed.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Io { path, .. }
            | Self::Csv { path, .. }
            | Self::Xlsx { path, .. }
            | Self::Json { path, .. }
            | Self::Task { path, .. } => path,
        }
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the profile store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Profile not found.
    #[error("Profile not found: {0}")]
    NotFound(String),

    /// Stored or imported profile is invalid.
    #[error("Invalid profile: {0}")]
    Invalid(#[from] ConfigError),

    /// IO error.
    #[error("Profile store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Profile store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::process`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Profile configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input reader error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Profile store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Mapped source columns absent from the input under the `Error` policy.
    #[error("Input is missing mapped source column(s): {}", .0.join(", "))]
    MissingHeaders(Vec<String>),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for configuration checks.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for input reading.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for writers.
pub type WriteResult<T> = Result<T, WriteError>;

/// Result type for the profile store.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
