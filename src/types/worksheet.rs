use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use log::trace;

use crate::cell_ref::{cell_reference, parse_cell_ref, validate_position};
use crate::error::{Result, XlgenError};

use super::cell::{Cell, Row};

/// Row and cell content of one worksheet.
///
/// Rows are keyed by index so storage order always follows row number,
/// whatever order rows were created in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worksheet {
    rows: BTreeMap<u32, Row>,
    dirty: bool,
}

impl Worksheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cell at `(col, row)`, creating the row and cell if needed.
    ///
    /// Calling this twice with the same coordinates yields the same cell.
    /// Coordinates outside the grid are rejected with [`XlgenError::CellRef`].
    pub fn get_or_insert_cell(&mut self, col: u32, row: u32) -> Result<&mut Cell> {
        validate_position(col, row)?;

        let row_entry = match self.rows.entry(row) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                trace!("creating row {row}");
                self.dirty = true;
                entry.insert(Row::new(row))
            }
        };

        let (cell, inserted) = row_entry.get_or_insert(col);
        if inserted {
            trace!("creating cell {}", cell.reference());
            self.dirty = true;
        }
        Ok(cell)
    }

    /// Same as [`Self::get_or_insert_cell`], addressed by reference text.
    pub fn get_or_insert_cell_by_ref(&mut self, reference: &str) -> Result<&mut Cell> {
        let (col, row) = parse_cell_ref(reference)
            .ok_or_else(|| XlgenError::CellRef(format!("'{reference}' is not a cell reference")))?;
        self.get_or_insert_cell(col, row)
    }

    pub fn cell(&self, col: u32, row: u32) -> Option<&Cell> {
        self.rows.get(&row).and_then(|r| r.cell(col))
    }

    pub fn cell_by_ref(&self, reference: &str) -> Option<&Cell> {
        let (col, row) = parse_cell_ref(reference)?;
        self.cell(col, row)
    }

    /// Rows in ascending row-number order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(Row::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(Row::is_empty)
    }

    /// Used range such as `"A1:C4"`, or `None` when there are no cells.
    pub fn dimension(&self) -> Option<String> {
        let mut populated = self.rows.values().filter(|r| !r.is_empty());
        let first = populated.next()?;
        let mut min_col = first.first_col()?;
        let mut max_col = first.last_col()?;
        let mut max_row = first.index();
        for row in populated {
            if let (Some(lo), Some(hi)) = (row.first_col(), row.last_col()) {
                min_col = min_col.min(lo);
                max_col = max_col.max(hi);
            }
            max_row = row.index();
        }

        let start = cell_reference(min_col, first.index());
        let end = cell_reference(max_col, max_row);
        if start == end {
            Some(start)
        } else {
            Some(format!("{start}:{end}"))
        }
    }

    /// Store a loaded row. Loaded content does not mark the sheet dirty.
    pub(crate) fn put_row(&mut self, row: Row) {
        match self.rows.entry(row.index()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                for cell in row.cells() {
                    existing.put(cell.clone());
                }
                if existing.attrs.is_empty() {
                    existing.attrs = row.attrs;
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(row);
            }
        }
    }

    /// Drop the formula from every cell in shared-formula group `si`.
    ///
    /// Used when the group's master cell is overwritten: dependents have no
    /// formula text of their own and keep only their cached values.
    pub(crate) fn detach_shared_formula(&mut self, si: &str) -> usize {
        let detached = self
            .rows
            .values_mut()
            .map(|row| row.detach_shared_formula(si))
            .sum();
        if detached > 0 {
            self.dirty = true;
        }
        detached
    }

    /// Whether rows or cells were created since the sheet was loaded.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_insert_is_idempotent() {
        let mut ws = Worksheet::new();
        ws.get_or_insert_cell(0, 1).unwrap().set_shared_string(0);
        ws.get_or_insert_cell(0, 1).unwrap();
        assert_eq!(ws.cell_count(), 1);
        assert_eq!(ws.row_count(), 1);
        assert_eq!(ws.cell(0, 1).unwrap().shared_string_index(), Some(0));
    }

    #[test]
    fn test_rows_stay_ordered_regardless_of_creation_order() {
        let mut ws = Worksheet::new();
        for row in [5, 2, 9, 1] {
            ws.get_or_insert_cell(0, row).unwrap();
        }
        let order: Vec<u32> = ws.rows().map(Row::index).collect();
        assert_eq!(order, vec![1, 2, 5, 9]);
    }

    #[test]
    fn test_cells_in_row_ordered_by_column() {
        let mut ws = Worksheet::new();
        for reference in ["C1", "A1", "AA1", "B1", "Z1"] {
            ws.get_or_insert_cell_by_ref(reference).unwrap();
        }
        let row = ws.rows().next().unwrap();
        let refs: Vec<&str> = row.cells().map(Cell::reference).collect();
        assert_eq!(refs, vec!["A1", "B1", "C1", "Z1", "AA1"]);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut ws = Worksheet::new();
        assert!(matches!(
            ws.get_or_insert_cell(0, 0),
            Err(XlgenError::CellRef(_))
        ));
        assert!(ws.get_or_insert_cell(16_384, 1).is_err());
        assert!(ws.get_or_insert_cell_by_ref("not a ref").is_err());
        assert!(ws.is_empty());
        assert!(!ws.is_dirty());
    }

    #[test]
    fn test_dimension() {
        let mut ws = Worksheet::new();
        assert_eq!(ws.dimension(), None);
        ws.get_or_insert_cell(1, 2).unwrap();
        assert_eq!(ws.dimension().as_deref(), Some("B2"));
        ws.get_or_insert_cell(3, 5).unwrap();
        ws.get_or_insert_cell(0, 3).unwrap();
        assert_eq!(ws.dimension().as_deref(), Some("A2:D5"));
    }

    #[test]
    fn test_lookup_by_ref() {
        let mut ws = Worksheet::new();
        ws.get_or_insert_cell(26, 7).unwrap();
        assert!(ws.cell_by_ref("AA7").is_some());
        assert!(ws.cell_by_ref("aa7").is_some());
        assert!(ws.cell_by_ref("AB7").is_none());
    }
}
