//! Entry points: bulk export of a dataset and single-cell mutation of an
//! existing package.

use log::{debug, info};
use std::path::Path;

use crate::dataset::Dataset;
use crate::document::Document;
use crate::error::{Result, XlgenError};
use crate::types::SheetPolicy;

/// Row that holds the column headers; data starts on the next row.
pub const HEADER_ROW: u32 = 1;

fn to_index(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| XlgenError::CellRef(format!("{what} {value} is out of range")))
}

/// Build a document holding `columns` in row 1 and `rows` from row 2 on,
/// every value a shared-string cell of the single worksheet.
pub fn build_document(columns: &[String], rows: &[Vec<String>]) -> Result<Document> {
    let mut doc = Document::new();
    doc.ensure_worksheet(SheetPolicy::Single)?;

    for (col, header) in columns.iter().enumerate() {
        doc.insert_text(to_index(col, "column")?, HEADER_ROW, header, SheetPolicy::Single)?;
    }
    for (offset, values) in rows.iter().enumerate() {
        let row = to_index(offset, "row")?
            .checked_add(HEADER_ROW + 1)
            .ok_or_else(|| XlgenError::CellRef(format!("row offset {offset} is out of range")))?;
        for (col, value) in values.iter().enumerate() {
            doc.insert_text(to_index(col, "column")?, row, value, SheetPolicy::Single)?;
        }
    }

    debug!(
        "built dataset document: {} columns, {} rows, {} shared strings",
        columns.len(),
        rows.len(),
        doc.shared_strings().len()
    );
    Ok(doc)
}

/// Export a dataset to XLSX bytes.
pub fn export_dataset(dataset: &Dataset) -> Result<Vec<u8>> {
    build_document(&dataset.columns, &dataset.rows)?.to_bytes()
}

/// Replace whatever is at `path` with `bytes`.
///
/// Callers produce the complete byte sequence first, so a failed export
/// never touches the destination.
pub fn write_file(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    match std::fs::remove_file(path) {
        Ok(()) => debug!("removed existing {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Export a dataset straight to a file.
pub fn export_to_file(path: impl AsRef<Path>, dataset: &Dataset) -> Result<()> {
    let bytes = export_dataset(dataset)?;
    write_file(path.as_ref(), &bytes)?;
    info!(
        "exported {} values to {} ({} bytes)",
        dataset.value_count(),
        path.as_ref().display(),
        bytes.len()
    );
    Ok(())
}

/// Create a package at `path` holding one empty worksheet, "Sheet1".
pub fn create_spreadsheet(path: impl AsRef<Path>) -> Result<()> {
    let mut doc = Document::new();
    doc.ensure_worksheet(SheetPolicy::Single)?;
    doc.save(path)
}

fn mutate(path: &Path, text: &str, policy: SheetPolicy) -> Result<()> {
    let mut doc = Document::open(path)?;
    let (sheet_idx, index) = doc.insert_text(0, HEADER_ROW, text, policy)?;
    debug!(
        "wrote shared string {index} to A1 of sheet {sheet_idx} in {}",
        path.display()
    );
    doc.save(path)
}

/// Open the package at `path`, write `text` to A1 of its first worksheet
/// (creating "Sheet1" when it has none) and save it in place.
///
/// Repeating the call with the same text leaves one string and one sheet.
pub fn insert_text(path: impl AsRef<Path>, text: &str) -> Result<()> {
    mutate(path.as_ref(), text, SheetPolicy::Single)
}

/// Open the package at `path`, add a new worksheet, write `text` to its A1
/// and save it in place.
pub fn insert_text_in_new_sheet(path: impl AsRef<Path>, text: &str) -> Result<()> {
    mutate(path.as_ref(), text, SheetPolicy::New)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_build_document_layout() {
        let doc = build_document(
            &strings(&["A", "B"]),
            &[strings(&["1", "2"]), strings(&["3", "4"])],
        )
        .unwrap();
        assert_eq!(doc.sheets().len(), 1);
        assert_eq!(doc.cell_text(0, "A1"), Some("A"));
        assert_eq!(doc.cell_text(0, "B1"), Some("B"));
        assert_eq!(doc.cell_text(0, "A2"), Some("1"));
        assert_eq!(doc.cell_text(0, "B3"), Some("4"));
    }

    #[test]
    fn test_build_document_dedups_values() {
        let doc = build_document(
            &strings(&["x"]),
            &[strings(&["x"]), strings(&["y"]), strings(&["x"])],
        )
        .unwrap();
        assert_eq!(doc.shared_strings().len(), 2);
        assert_eq!(doc.workbook().sheets[0].worksheet.cell_count(), 4);
    }

    #[test]
    fn test_empty_dataset_still_has_sheet1() {
        let doc = build_document(&[], &[]).unwrap();
        assert_eq!(doc.sheets().len(), 1);
        assert_eq!(doc.sheets()[0].name, "Sheet1");
        assert!(doc.shared_strings().is_empty());
    }

    #[test]
    fn test_ragged_rows() {
        let doc = build_document(&strings(&["a"]), &[strings(&["1", "2", "3"]), vec![]]).unwrap();
        assert_eq!(doc.cell_text(0, "C2"), Some("3"));
        assert!(doc.cell(0, "B1").is_none());
    }

    #[test]
    fn test_write_file_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        std::fs::write(&path, b"old content that is longer than the new one").unwrap();
        write_file(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[test]
    fn test_failed_mutation_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a package").unwrap();
        assert!(matches!(
            insert_text(&path, "test"),
            Err(XlgenError::Format(_))
        ));
        assert_eq!(std::fs::read(&path).unwrap(), b"not a package");
    }
}
