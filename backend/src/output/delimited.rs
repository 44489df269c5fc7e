//! CSV table writer.

use csv::WriterBuilder;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{WriteError, WriteResult};
use crate::models::OutputRow;

/// Write `rows` under `columns`; absent cells are written empty.
pub fn write_csv(path: &Path, rows: &[OutputRow], columns: &[String]) -> WriteResult<()> {
    let file = File::create(path).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = WriterBuilder::new().from_writer(BufWriter::new(file));
    let csv_err = |source| WriteError::Csv {
        path: path.to_path_buf(),
        source,
    };

    writer.write_record(columns.iter()).map_err(csv_err)?;
    for row in rows {
        writer
            .write_record(columns.iter().map(|c| row.get(c).unwrap_or("")))
            .map_err(csv_err)?;
    }

    writer.flush().map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })
}
