use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::cell_ref::cell_reference;

/// Cell value kind, from the `t` attribute of a `<c>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellType {
    /// No `t` attribute (or `t="n"`).
    #[default]
    Number,
    /// `t="s"`: value is an index into the shared-string table.
    SharedString,
    /// `t="inlineStr"`: text stored in the cell itself.
    InlineString,
    /// `t="str"`: cached string result of a formula.
    FormulaString,
    Boolean,
    Error,
    Date,
}

impl CellType {
    pub fn from_tag(value: &[u8]) -> Self {
        match value {
            b"s" => Self::SharedString,
            b"inlineStr" => Self::InlineString,
            b"str" => Self::FormulaString,
            b"b" => Self::Boolean,
            b"e" => Self::Error,
            b"d" => Self::Date,
            _ => Self::Number,
        }
    }

    /// The `t` attribute to write, `None` for plain numbers.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Self::Number => None,
            Self::SharedString => Some("s"),
            Self::InlineString => Some("inlineStr"),
            Self::FormulaString => Some("str"),
            Self::Boolean => Some("b"),
            Self::Error => Some("e"),
            Self::Date => Some("d"),
        }
    }
}

/// A single cell, addressed by its reference string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    reference: String,
    col: u32,
    /// Value kind
    pub t: CellType,
    /// Raw value text: the decimal shared-string index for `SharedString`,
    /// the text itself for `InlineString`.
    pub v: Option<String>,
    /// Formula text, kept from loaded packages.
    pub formula: Option<String>,
    /// Cell format index (`s` attribute), kept from loaded packages.
    pub style: Option<u32>,
    /// Attributes of the `<f>` element (`t`, `ref`, `si`, ...) as raw
    /// escaped text. A dependent shared formula has an empty `formula`.
    pub(crate) formula_attrs: Vec<(String, String)>,
    /// Other `<c>` attributes (`cm`, `vm`, `ph`) as raw escaped text.
    pub(crate) extra_attrs: Vec<(String, String)>,
}

impl Cell {
    pub(crate) fn new(col: u32, row: u32) -> Self {
        Self {
            reference: cell_reference(col, row),
            col,
            t: CellType::default(),
            v: None,
            formula: None,
            style: None,
            formula_attrs: Vec::new(),
            extra_attrs: Vec::new(),
        }
    }

    /// Reference such as `"B3"`.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// 0-indexed column.
    pub fn col(&self) -> u32 {
        self.col
    }

    /// Point this cell at a shared-string entry.
    ///
    /// Drops any formula along with the value metadata that belonged to it.
    pub fn set_shared_string(&mut self, index: u32) {
        self.t = CellType::SharedString;
        self.v = Some(index.to_string());
        self.clear_formula();
        self.extra_attrs.clear();
    }

    pub(crate) fn clear_formula(&mut self) {
        self.formula = None;
        self.formula_attrs.clear();
    }

    fn formula_attr(&self, key: &str) -> Option<&str> {
        self.formula_attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Group index of a shared formula this cell takes part in.
    pub(crate) fn shared_formula_group(&self) -> Option<&str> {
        match self.formula_attr("t") {
            Some("shared") if self.formula.is_some() => self.formula_attr("si"),
            _ => None,
        }
    }

    /// Group index when this cell holds the master of a shared formula.
    pub(crate) fn shared_formula_master(&self) -> Option<&str> {
        self.formula_attr("ref")
            .and_then(|_| self.shared_formula_group())
    }

    /// The shared-string index, if this is a shared-string cell.
    pub fn shared_string_index(&self) -> Option<u32> {
        match self.t {
            CellType::SharedString => self.v.as_deref().and_then(|v| v.trim().parse().ok()),
            _ => None,
        }
    }
}

/// One worksheet row.
///
/// Cells are keyed by column, so storage order is ascending column order and
/// each reference appears at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    index: u32,
    cells: BTreeMap<u32, Cell>,
    /// `<row>` attributes other than `r` (`ht`, `hidden`, `spans`, ...) as
    /// raw escaped text, kept from loaded packages.
    pub(crate) attrs: Vec<(String, String)>,
}

impl Row {
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            cells: BTreeMap::new(),
            attrs: Vec::new(),
        }
    }

    /// 1-based row number.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Return the cell in column `col`, creating it if needed.
    ///
    /// The flag is `true` when a new cell was inserted.
    pub(crate) fn get_or_insert(&mut self, col: u32) -> (&mut Cell, bool) {
        match self.cells.entry(col) {
            Entry::Occupied(entry) => (entry.into_mut(), false),
            Entry::Vacant(entry) => {
                let cell = Cell::new(col, self.index);
                (entry.insert(cell), true)
            }
        }
    }

    /// Store a fully built cell (used by the package parser).
    ///
    /// A later cell with the same column replaces the earlier one.
    pub(crate) fn put(&mut self, cell: Cell) {
        self.cells.insert(cell.col, cell);
    }

    pub fn cell(&self, col: u32) -> Option<&Cell> {
        self.cells.get(&col)
    }

    /// Cells in storage (ascending column) order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn first_col(&self) -> Option<u32> {
        self.cells.keys().next().copied()
    }

    pub(crate) fn last_col(&self) -> Option<u32> {
        self.cells.keys().next_back().copied()
    }

    /// Remove the formula from every cell of shared-formula group `si`,
    /// keeping cached values. Returns how many cells changed.
    pub(crate) fn detach_shared_formula(&mut self, si: &str) -> usize {
        let mut detached = 0;
        for cell in self.cells.values_mut() {
            if cell.shared_formula_group() == Some(si) {
                cell.clear_formula();
                detached += 1;
            }
        }
        detached
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_type_tags() {
        for t in [
            CellType::SharedString,
            CellType::InlineString,
            CellType::FormulaString,
            CellType::Boolean,
            CellType::Error,
            CellType::Date,
        ] {
            let tag = t.tag().unwrap();
            assert_eq!(CellType::from_tag(tag.as_bytes()), t);
        }
        assert_eq!(CellType::Number.tag(), None);
        assert_eq!(CellType::from_tag(b"n"), CellType::Number);
    }

    #[test]
    fn test_row_get_or_insert_is_idempotent() {
        let mut row = Row::new(4);
        let (cell, inserted) = row.get_or_insert(2);
        assert!(inserted);
        assert_eq!(cell.reference(), "C4");
        cell.set_shared_string(9);

        let (again, inserted) = row.get_or_insert(2);
        assert!(!inserted);
        assert_eq!(again.shared_string_index(), Some(9));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn test_row_orders_by_column() {
        let mut row = Row::new(1);
        for col in [27, 3, 25, 0, 26] {
            row.get_or_insert(col);
        }
        let refs: Vec<&str> = row.cells().map(Cell::reference).collect();
        assert_eq!(refs, vec!["A1", "D1", "Z1", "AA1", "AB1"]);
        assert_eq!(row.first_col(), Some(0));
        assert_eq!(row.last_col(), Some(27));
    }

    #[test]
    fn test_shared_string_index_requires_type() {
        let mut cell = Cell::new(0, 1);
        cell.v = Some("3".into());
        assert_eq!(cell.shared_string_index(), None);
        cell.t = CellType::SharedString;
        assert_eq!(cell.shared_string_index(), Some(3));
    }

    fn shared_formula(cell: &mut Cell, formula: &str, attrs: &[(&str, &str)]) {
        cell.formula = Some(formula.into());
        cell.formula_attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
    }

    #[test]
    fn test_shared_formula_roles() {
        let mut master = Cell::new(1, 1);
        shared_formula(&mut master, "A1*2", &[("t", "shared"), ("ref", "B1:B3"), ("si", "0")]);
        let mut dependent = Cell::new(1, 2);
        shared_formula(&mut dependent, "", &[("t", "shared"), ("si", "0")]);
        let mut array = Cell::new(2, 1);
        shared_formula(&mut array, "A1:A2", &[("t", "array"), ("ref", "C1")]);

        assert_eq!(master.shared_formula_master(), Some("0"));
        assert_eq!(dependent.shared_formula_master(), None);
        assert_eq!(dependent.shared_formula_group(), Some("0"));
        assert_eq!(array.shared_formula_group(), None);
    }

    #[test]
    fn test_set_shared_string_drops_formula_metadata() {
        let mut cell = Cell::new(0, 1);
        shared_formula(&mut cell, "B1", &[("t", "shared"), ("ref", "A1:A2"), ("si", "1")]);
        cell.extra_attrs.push(("cm".into(), "1".into()));
        cell.style = Some(4);

        cell.set_shared_string(2);
        assert_eq!(cell.formula, None);
        assert!(cell.formula_attrs.is_empty());
        assert!(cell.extra_attrs.is_empty());
        assert_eq!(cell.style, Some(4));
    }

    #[test]
    fn test_detach_shared_formula() {
        let mut row = Row::new(2);
        shared_formula(row.get_or_insert(0).0, "", &[("t", "shared"), ("si", "0")]);
        row.get_or_insert(0).0.v = Some("4".into());
        shared_formula(row.get_or_insert(1).0, "", &[("t", "shared"), ("si", "1")]);

        assert_eq!(row.detach_shared_formula("0"), 1);
        let a2 = row.cell(0).unwrap();
        assert_eq!(a2.formula, None);
        assert_eq!(a2.v.as_deref(), Some("4"));
        assert_eq!(row.cell(1).unwrap().shared_formula_group(), Some("1"));
    }
}
