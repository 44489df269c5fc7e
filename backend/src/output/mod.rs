//! Output writers.
//!
//! - `delimited`: CSV tables
//! - `spreadsheet`: `.xlsx` tables, one worksheet per file
//! - `summary`: JSON run summary
//!
//! [`write_outputs`] writes every selected artifact of a run concurrently.
//! Each file succeeds or fails on its own; a cancelled run deletes whatever
//! it already wrote.

pub mod delimited;
pub mod spreadsheet;
pub mod summary;

pub use delimited::write_csv;
pub use spreadsheet::write_xlsx;
pub use summary::{write_summary, RunSummary};

use chrono::{DateTime, Local, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{WriteError, WriteResult};
use crate::logs::{log_error, log_info, log_success, log_warning};
use crate::models::ObjectType;
use crate::transform::pipeline::{ProcessResult, RunHandle, RunOutcome};

/// Environment variable for the default output directory.
pub const OUTPUT_DIR_ENV: &str = "CRMLOAD_OUTPUT_DIR";

/// Table file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Xlsx,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "xlsx" | "excel" => Ok(OutputFormat::Xlsx),
            other => Err(format!("unknown output format '{}' (expected csv or xlsx)", other)),
        }
    }
}

/// Where and how to write a run's artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    pub output_dir: PathBuf,
    pub formats: Vec<OutputFormat>,
    pub write_summary: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            formats: vec![OutputFormat::Csv],
            write_summary: true,
        }
    }
}

/// `YYYYMMDD-HHMMSS`, shared by every file of one run.
pub fn run_stamp(now: DateTime<Local>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// `<stem>-<stamp>.<ext>`, e.g. `properties-20240301-101500.csv`.
pub fn output_file_name(stem: &str, stamp: &str, extension: &str) -> String {
    format!("{}-{}.{}", stem, stamp, extension)
}

/// Files written by a completed run, and the ones that failed.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    /// Object types with no rows, so no file.
    pub skipped: Vec<ObjectType>,
    pub failures: Vec<WriteError>,
}

impl WriteReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Artifact {
    Table {
        object_type: ObjectType,
        format: OutputFormat,
        columns: Vec<String>,
    },
    Summary,
}

struct Job {
    path: PathBuf,
    artifact: Artifact,
}

/// Write tables (and the summary) for `result` into `options.output_dir`.
pub async fn write_outputs(
    result: Arc<ProcessResult>,
    options: &OutputOptions,
    handle: &RunHandle,
) -> RunOutcome<WriteReport> {
    let mut report = WriteReport::default();

    if let Err(source) = tokio::fs::create_dir_all(&options.output_dir).await {
        report.failures.push(WriteError::Io {
            path: options.output_dir.clone(),
            source,
        });
        return RunOutcome::Completed(report);
    }

    let stamp = run_stamp(Local::now());
    let jobs = plan_jobs(&result, options, &stamp, &mut report.skipped);

    let tasks = jobs.into_iter().map(|job| {
        let result = Arc::clone(&result);
        let handle = handle.clone();
        let path = job.path.clone();
        async move {
            let joined = tokio::task::spawn_blocking(move || run_job(job, &result, &handle)).await;
            match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(WriteError::Task {
                    path,
                    message: e.to_string(),
                }),
            }
        }
    });

    for outcome in join_all(tasks).await {
        match outcome {
            Ok(Some(path)) => report.written.push(path),
            Ok(None) => {}
            Err(e) => {
                log_error(e.to_string());
                report.failures.push(e);
            }
        }
    }

    if handle.is_cancelled() {
        let removed = handle.discard_written();
        log_warning(format!("Cancelled; removed {} written file(s)", removed));
        return RunOutcome::Cancelled;
    }

    for path in &report.written {
        log_success(format!("Wrote {}", path.display()));
    }
    RunOutcome::Completed(report)
}

fn plan_jobs(result: &ProcessResult, options: &OutputOptions, stamp: &str, skipped: &mut Vec<ObjectType>) -> Vec<Job> {
    let mut jobs = Vec::new();

    for object_type in ObjectType::ALL {
        let columns = result.columns(object_type);
        if columns.is_empty() {
            log_info(format!("No {} rows; nothing to write", object_type.label().to_lowercase()));
            skipped.push(object_type);
            continue;
        }
        for &format in &options.formats {
            let name = output_file_name(object_type.file_stem(), stamp, format.extension());
            jobs.push(Job {
                path: options.output_dir.join(name),
                artifact: Artifact::Table {
                    object_type,
                    format,
                    columns: columns.clone(),
                },
            });
        }
    }

    if options.write_summary {
        jobs.push(Job {
            path: options.output_dir.join(output_file_name("summary", stamp, "json")),
            artifact: Artifact::Summary,
        });
    }

    jobs
}

/// `Ok(None)` when the run was cancelled before this file started.
fn run_job(job: Job, result: &ProcessResult, handle: &RunHandle) -> WriteResult<Option<PathBuf>> {
    if handle.is_cancelled() {
        return Ok(None);
    }

    let written = match &job.artifact {
        Artifact::Table {
            object_type,
            format: OutputFormat::Csv,
            columns,
        } => write_csv(&job.path, result.rows(*object_type), columns),
        Artifact::Table {
            object_type,
            format: OutputFormat::Xlsx,
            columns,
        } => write_xlsx(&job.path, *object_type, result.rows(*object_type), columns),
        Artifact::Summary => write_summary(&job.path, &RunSummary::new(result, Utc::now())),
    };

    match written {
        Ok(()) => {
            handle.record_written(&job.path);
            Ok(Some(job.path))
        }
        Err(e) => {
            remove_partial(&job.path);
            Err(e)
        }
    }
}

fn remove_partial(path: &Path) {
    if path.exists() {
        let _ = std::fs::remove_file(path);
    }
}
