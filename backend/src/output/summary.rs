//! JSON run summary.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{WriteError, WriteResult};
use crate::transform::pipeline::ProcessResult;
use crate::transform::processor::GroupCount;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputCounts {
    pub properties: usize,
    pub contacts: usize,
    pub phones: usize,
}

/// What a run produced, for audit next to the import files.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub input_rows: usize,
    pub dropped_rows: usize,
    pub output_rows: OutputCounts,
    pub merged_properties: usize,
    pub group_counts: Vec<GroupCount>,
    /// Source columns referenced by the profile but absent from the input
    pub missing_headers: Vec<String>,
    pub warnings: Vec<String>,
}

impl RunSummary {
    pub fn new(result: &ProcessResult, generated_at: DateTime<Utc>) -> Self {
        Self {
            generated_at,
            input_rows: result.input_rows,
            dropped_rows: result.dropped_rows,
            output_rows: OutputCounts {
                properties: result.properties.len(),
                contacts: result.contacts.len(),
                phones: result.phones.len(),
            },
            merged_properties: result.merged_properties,
            group_counts: result.counters.counts(),
            missing_headers: result.missing_headers.clone(),
            warnings: result.warnings.clone(),
        }
    }
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> WriteResult<()> {
    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut writer, summary).map_err(|source| WriteError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.write_all(b"\n").map_err(io_err)?;
    writer.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InputTable, Mapping, ObjectType, Profile};
    use crate::transform::pipeline::{process, ProcessOptions};

    #[test]
    fn test_summary_shape() {
        let profile = Profile::new("p")
            .with_mapping(Mapping::new("Address", ObjectType::Property, 1, "Address"))
            .with_mapping(Mapping::new("Zip", ObjectType::Property, 1, "Postal Code"));
        let table = InputTable::from_records(
            ["Address"],
            vec![vec![("Address", "1 Main")], vec![("Address", "1 main")], vec![("Address", "")]],
        );
        let result = process(&profile, &table, &ProcessOptions::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_summary(&path, &RunSummary::new(&result, Utc::now())).unwrap();

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(json["generatedAt"].is_string());
        assert_eq!(json["inputRows"], 3);
        assert_eq!(json["droppedRows"], 1);
        assert_eq!(json["outputRows"]["properties"], 1);
        assert_eq!(json["mergedProperties"], 1);
        assert_eq!(json["groupCounts"][0]["objectType"], "property");
        assert_eq!(json["groupCounts"][0]["groupIndex"], 1);
        assert_eq!(json["groupCounts"][0]["rows"], 2);
        assert_eq!(json["missingHeaders"][0], "Zip");
        assert_eq!(json["warnings"].as_array().unwrap().len(), 1);
    }
}
