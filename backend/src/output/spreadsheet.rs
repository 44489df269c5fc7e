//! Spreadsheet (.xlsx) table writer.

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

use crate::error::{WriteError, WriteResult};
use crate::models::{ObjectType, OutputRow};

/// Write `rows` to a single worksheet named after `object_type`.
pub fn write_xlsx(path: &Path, object_type: ObjectType, rows: &[OutputRow], columns: &[String]) -> WriteResult<()> {
    build_workbook(path, object_type, rows, columns).map_err(|source| WriteError::Xlsx {
        path: path.to_path_buf(),
        source,
    })
}

fn build_workbook(path: &Path, object_type: ObjectType, rows: &[OutputRow], columns: &[String]) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name(object_type))?;

    for (col, name) in columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name.as_str(), &header)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, name) in columns.iter().enumerate() {
            let value = row.get(name).unwrap_or("");
            if !value.is_empty() {
                sheet.write_string(r, col as u16, value)?;
            }
        }
    }

    workbook.save(path)
}

fn sheet_name(object_type: ObjectType) -> &'static str {
    match object_type {
        ObjectType::Property => "Properties",
        ObjectType::Contact => "Contacts",
        ObjectType::Phone => "Phones",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_xlsx_creates_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phones.xlsx");

        let mut row = OutputRow::default();
        row.set("Import ID", "a");
        row.set("Phone Number", "5551234567");

        let columns = vec!["Import ID".to_string(), "Phone Number".to_string()];
        write_xlsx(&path, ObjectType::Phone, &[row], &columns).unwrap();

        // xlsx files are zip archives
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_write_xlsx_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("phones.xlsx");

        let err = write_xlsx(&path, ObjectType::Phone, &[], &[]).unwrap_err();
        assert!(matches!(err, WriteError::Xlsx { .. }));
        assert_eq!(err.path(), &path);
    }
}
