//! The editable document: package state, sheet catalog, worksheets and the
//! shared-string table, loaded or built in memory and serialized once.

use log::{debug, warn};
use std::path::Path;

use crate::cell_ref::{parse_cell_ref, validate_position};
use crate::error::{Result, XlgenError};
use crate::export::{save_xlsx, SaveOptions};
use crate::namespaces::{
    is_shared_strings_relationship, is_styles_relationship, REL_SHARED_STRINGS, REL_STYLES,
};
use crate::package::{Package, DEFAULT_STYLES_PATH};
use crate::shared_strings::SharedStringPool;
use crate::types::{Cell, Sheet, SheetPolicy, Workbook};

/// An in-memory spreadsheet package.
///
/// A `Document` is not shared between threads while it is being mutated;
/// all edits go through `&mut self`.
#[derive(Debug, Clone)]
pub struct Document {
    package: Package,
    workbook: Workbook,
    shared_strings: SharedStringPool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty fresh document with no sheets yet.
    pub fn new() -> Self {
        let package = Package::fresh();
        let mut workbook = Workbook::new();
        workbook.ensure_relationship(is_styles_relationship, REL_STYLES, DEFAULT_STYLES_PATH);
        workbook.ensure_relationship(
            is_shared_strings_relationship,
            REL_SHARED_STRINGS,
            &package.shared_strings_path,
        );
        Self {
            package,
            workbook,
            shared_strings: SharedStringPool::new(),
        }
    }

    pub(crate) fn from_parts(
        package: Package,
        workbook: Workbook,
        shared_strings: SharedStringPool,
    ) -> Self {
        Self {
            package,
            workbook,
            shared_strings,
        }
    }

    /// Load an existing package from bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        crate::parser::parse(data)
    }

    /// Open an existing package for editing.
    ///
    /// A path that does not exist is a format error, like any other input
    /// that is not a usable package.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                XlgenError::Format(format!("{} does not exist", path.display()))
            }
            _ => XlgenError::Io(e),
        })?;
        debug!("opening {} ({} bytes)", path.display(), data.len());
        Self::from_bytes(data)
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn shared_strings(&self) -> &SharedStringPool {
        &self.shared_strings
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.workbook.sheets
    }

    /// Resolve the target worksheet under `policy` without inserting text.
    ///
    /// Returns the sheet's index in the catalog.
    pub fn ensure_worksheet(&mut self, policy: SheetPolicy) -> Result<usize> {
        self.workbook.resolve_worksheet(policy)
    }

    /// Write `text` into the cell at `(col, row)` of the worksheet chosen by
    /// `policy`, as a shared-string cell.
    ///
    /// The text is interned first, then the worksheet is resolved, then the
    /// cell is located or created. Returns the sheet index and the
    /// shared-string index.
    pub fn insert_text(
        &mut self,
        col: u32,
        row: u32,
        text: &str,
        policy: SheetPolicy,
    ) -> Result<(usize, u32)> {
        validate_position(col, row)?;

        let index = self.shared_strings.intern(text)?;
        if self.shared_strings.is_dirty() {
            self.workbook.ensure_relationship(
                is_shared_strings_relationship,
                REL_SHARED_STRINGS,
                &self.package.shared_strings_path,
            );
        }

        let sheet_idx = self.workbook.resolve_worksheet(policy)?;
        let sheet = self
            .workbook
            .sheets
            .get_mut(sheet_idx)
            .ok_or_else(|| XlgenError::Other(format!("sheet index {sheet_idx} out of range")))?;

        let cell = sheet.worksheet.get_or_insert_cell(col, row)?;
        if cell.shared_string_index() != Some(index) || cell.formula.is_some() {
            let master = cell.shared_formula_master().map(str::to_string);
            let reference = cell.reference().to_string();
            cell.set_shared_string(index);
            if let Some(si) = master {
                let detached = sheet.worksheet.detach_shared_formula(&si);
                warn!(
                    "{}: {reference} held shared formula {si}, {detached} dependent cells keep only cached values",
                    sheet.name
                );
            }
            sheet.worksheet.mark_dirty();
        }
        Ok((sheet_idx, index))
    }

    /// Same as [`Self::insert_text`], addressed by a reference such as `"A1"`.
    pub fn insert_text_at(
        &mut self,
        reference: &str,
        text: &str,
        policy: SheetPolicy,
    ) -> Result<(usize, u32)> {
        let (col, row) = parse_cell_ref(reference)
            .ok_or_else(|| XlgenError::CellRef(format!("'{reference}' is not a cell reference")))?;
        self.insert_text(col, row, text, policy)
    }

    pub fn cell(&self, sheet_idx: usize, reference: &str) -> Option<&Cell> {
        self.workbook
            .sheets
            .get(sheet_idx)?
            .worksheet
            .cell_by_ref(reference)
    }

    /// Text of a cell: shared strings are resolved through the table, other
    /// kinds return their raw value.
    pub fn cell_text(&self, sheet_idx: usize, reference: &str) -> Option<&str> {
        let cell = self.cell(sheet_idx, reference)?;
        match cell.shared_string_index() {
            Some(index) => self.shared_strings.get(index),
            None => cell.v.as_deref(),
        }
    }

    /// Serialize with default options.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(&SaveOptions::default())
    }

    pub fn to_bytes_with(&self, options: &SaveOptions) -> Result<Vec<u8>> {
        save_xlsx(&self.package, &self.workbook, &self.shared_strings, options)
    }

    /// Serialize and write to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        crate::assembler::write_file(path, &bytes)
    }
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
    use crate::types::CellType;

    #[test]
    fn test_insert_text_single_policy() {
        let mut doc = Document::new();
        let (s1, i1) = doc.insert_text(0, 1, "hello", SheetPolicy::Single).unwrap();
        let (s2, i2) = doc.insert_text(1, 1, "hello", SheetPolicy::Single).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(i1, i2);
        assert_eq!(doc.sheets().len(), 1);
        assert_eq!(doc.shared_strings().len(), 1);
        assert_eq!(doc.cell_text(0, "A1"), Some("hello"));
        assert_eq!(doc.cell_text(0, "B1"), Some("hello"));
        assert_eq!(doc.cell(0, "A1").unwrap().t, CellType::SharedString);
    }

    #[test]
    fn test_insert_text_new_policy() {
        let mut doc = Document::new();
        doc.insert_text_at("A1", "one", SheetPolicy::Single).unwrap();
        let (sheet, _) = doc.insert_text_at("A1", "two", SheetPolicy::New).unwrap();
        assert_eq!(sheet, 1);
        assert_eq!(doc.sheets()[1].sheet_id, 2);
        assert_eq!(doc.sheets()[1].name, "Sheet2");
        assert_eq!(doc.cell_text(0, "A1"), Some("one"));
        assert_eq!(doc.cell_text(1, "A1"), Some("two"));
    }

    #[test]
    fn test_overwrite_cell() {
        let mut doc = Document::new();
        doc.insert_text_at("C3", "first", SheetPolicy::Single).unwrap();
        doc.insert_text_at("C3", "second", SheetPolicy::Single).unwrap();
        assert_eq!(doc.cell_text(0, "C3"), Some("second"));
        assert_eq!(doc.workbook().sheets[0].worksheet.cell_count(), 1);
        assert_eq!(doc.shared_strings().len(), 2);
    }

    #[test]
    fn test_invalid_position_changes_nothing() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.insert_text(0, 0, "x", SheetPolicy::Single),
            Err(XlgenError::CellRef(_))
        ));
        assert!(doc.insert_text_at("1A", "x", SheetPolicy::Single).is_err());
        assert!(doc.shared_strings().is_empty());
        assert!(doc.sheets().is_empty());
    }

    #[test]
    fn test_fresh_relationships() {
        let mut doc = Document::new();
        doc.ensure_worksheet(SheetPolicy::Single).unwrap();
        let ids: Vec<&str> = doc
            .workbook()
            .relationships()
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["rId1", "rId2", "rId3"]);
        assert_eq!(doc.sheets()[0].rel_id, "rId3");
    }

    #[test]
    fn test_open_missing_file_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Document::open(dir.path().join("nope.xlsx"));
        assert!(matches!(result, Err(XlgenError::Format(_))));
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(matches!(
            Document::from_bytes(b"definitely not a zip".to_vec()),
            Err(XlgenError::Format(_))
        ));
    }
}
