//! High-level conversion API.
//!
//! Combines resolution, row processing, output building and deduplication
//! in one sequential pass over the input table.
//!
//! # Example
//!
//! ```rust,ignore
//! use crmload::transform::pipeline::{process, ProcessOptions};
//! use crmload::{example_profile, read_table};
//!
//! let (table, _info) = read_table("leads.csv".as_ref())?;
//! let result = process(&example_profile(), &table, &ProcessOptions::default())?;
//! println!("{} properties, {} contacts", result.properties.len(), result.contacts.len());
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use super::builder::{OutputBuilder, OutputRows};
use super::columns;
use super::processor::{process_row, GroupCounters};
use super::resolver::{resolve, ResolvedGroups};
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning, percent, ProgressSink};
use crate::models::{InputTable, MissingHeaderBehavior, ObjectType, OutputRow, Profile, RowView};

/// Per-run options layered over the profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOptions {
    /// Emit association labels on contact rows (OR-ed with the profile flag).
    #[serde(default)]
    pub include_secondary_contacts_association_label: bool,

    /// Replaces every property and contact row's tags when non-blank.
    #[serde(default)]
    pub tag_override: Option<String>,
}

/// Everything one conversion produced.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    pub properties: Vec<OutputRow>,
    pub contacts: Vec<OutputRow>,
    pub phones: Vec<OutputRow>,
    pub counters: GroupCounters,
    pub warnings: Vec<String>,
    /// Profile source columns absent from the input.
    pub missing_headers: Vec<String>,
    pub input_rows: usize,
    pub dropped_rows: usize,
    pub merged_properties: usize,
    /// Whether contact rows carry association labels in this run.
    pub include_contact_label: bool,
}

impl ProcessResult {
    pub fn rows(&self, object_type: ObjectType) -> &[OutputRow] {
        match object_type {
            ObjectType::Property => &self.properties,
            ObjectType::Contact => &self.contacts,
            ObjectType::Phone => &self.phones,
        }
    }

    /// Planned output columns for one object type.
    pub fn columns(&self, object_type: ObjectType) -> Vec<String> {
        columns::plan(self.rows(object_type), object_type, self.include_contact_label)
    }
}

// =============================================================================
// Cancellation
// =============================================================================

/// Shared between the row loop and the writers of one run.
#[derive(Debug, Clone, Default)]
pub struct RunHandle {
    cancelled: Arc<AtomicBool>,
    written: Arc<Mutex<Vec<PathBuf>>>,
}

impl RunHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn record_written(&self, path: &Path) {
        if let Ok(mut written) = self.written.lock() {
            written.push(path.to_path_buf());
        }
    }

    pub fn written_files(&self) -> Vec<PathBuf> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Delete every file recorded by this run; returns how many were removed.
    pub fn discard_written(&self) -> usize {
        let paths = match self.written.lock() {
            Ok(mut written) => std::mem::take(&mut *written),
            Err(_) => return 0,
        };
        paths
            .iter()
            .filter(|p| std::fs::remove_file(p).is_ok())
            .count()
    }
}

/// Result of a run that may be cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> RunOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunOutcome::Cancelled)
    }

    pub fn completed(self) -> Option<T> {
        match self {
            RunOutcome::Completed(value) => Some(value),
            RunOutcome::Cancelled => None,
        }
    }
}

// =============================================================================
// Run
// =============================================================================

/// One conversion in progress: resolved once, then fed rows in order.
pub struct RowPipeline {
    groups: ResolvedGroups,
    builder: OutputBuilder,
    counters: GroupCounters,
    warnings: Vec<String>,
    missing_headers: Vec<String>,
    include_contact_label: bool,
    input_rows: usize,
    dropped_rows: usize,
}

impl RowPipeline {
    /// Resolve the profile and apply the missing-header policy.
    pub fn prepare(profile: &Profile, table: &InputTable, options: &ProcessOptions) -> PipelineResult<Self> {
        log_info(format!(
            "📋 Input has {} columns, {} rows",
            table.headers().len(),
            table.len()
        ));

        let groups = resolve(profile)?;
        log_success(format!(
            "Resolved {} property, {} contact, {} phone group(s)",
            groups.properties.len(),
            groups.contacts.len(),
            groups.phones.len()
        ));

        let mut warnings = groups.warnings.clone();
        for warning in &warnings {
            log_warning(warning.as_str());
        }

        let missing_headers = profile.missing_headers(table.index());
        if !missing_headers.is_empty() {
            if profile.missing_header_behavior == MissingHeaderBehavior::Error {
                return Err(PipelineError::MissingHeaders(missing_headers));
            }
            let warning = format!("Missing source column(s): {}", missing_headers.join(", "));
            log_warning(warning.as_str());
            warnings.push(warning);
        }

        let include_contact_label =
            profile.include_secondary_contacts_association_label || options.include_secondary_contacts_association_label;

        Ok(Self {
            counters: GroupCounters::for_groups(&groups),
            builder: OutputBuilder::new(include_contact_label, options.tag_override.as_deref()),
            groups,
            warnings,
            missing_headers,
            include_contact_label,
            input_rows: 0,
            dropped_rows: 0,
        })
    }

    /// Feed the next input row.
    pub fn push(&mut self, row: &RowView<'_>) {
        let mut next_id = || Uuid::new_v4().to_string();
        match process_row(row, &self.groups, &mut next_id) {
            Some(processed) => {
                self.counters.record(&processed);
                self.builder.push(&processed);
            }
            None => self.dropped_rows += 1,
        }
        self.input_rows += 1;
    }

    /// Deduplicated rows plus run totals.
    pub fn finish(self) -> ProcessResult {
        let OutputRows {
            properties,
            contacts,
            phones,
            merged_properties,
        } = self.builder.finish();

        log_success(format!(
            "{} properties, {} contacts, {} phones",
            properties.len(),
            contacts.len(),
            phones.len()
        ));
        if merged_properties > 0 {
            log_info_indent(format!("{} duplicate properties merged", merged_properties), 1);
        }
        if self.dropped_rows > 0 {
            log_info_indent(format!("{} empty rows dropped", self.dropped_rows), 1);
        }

        ProcessResult {
            properties,
            contacts,
            phones,
            counters: self.counters,
            warnings: self.warnings,
            missing_headers: self.missing_headers,
            input_rows: self.input_rows,
            dropped_rows: self.dropped_rows,
            merged_properties,
            include_contact_label: self.include_contact_label,
        }
    }
}

/// Convert `table` with `profile`.
pub fn process(profile: &Profile, table: &InputTable, options: &ProcessOptions) -> PipelineResult<ProcessResult> {
    let mut pipeline = RowPipeline::prepare(profile, table, options)?;
    for row in table.rows() {
        pipeline.push(&row);
    }
    Ok(pipeline.finish())
}

/// Like [`process`], reporting progress and stopping when `handle` is cancelled.
pub fn process_cancellable(
    profile: &Profile,
    table: &InputTable,
    options: &ProcessOptions,
    handle: &RunHandle,
    progress: &dyn ProgressSink,
) -> PipelineResult<RunOutcome<ProcessResult>> {
    let mut pipeline = RowPipeline::prepare(profile, table, options)?;
    let total = table.len();

    for (i, row) in table.rows().enumerate() {
        if handle.is_cancelled() {
            log_warning(format!("Cancelled after {} of {} rows", i, total));
            return Ok(RunOutcome::Cancelled);
        }
        pipeline.push(&row);
        progress.on_progress(percent(i + 1, total), i + 1);
    }

    Ok(RunOutcome::Completed(pipeline.finish()))
}
