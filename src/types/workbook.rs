use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;

use super::Worksheet;
use crate::error::{Result, XlgenError};
use crate::namespaces::REL_WORKSHEET;
use crate::package::relative_target;

/// Sheet visibility state
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    pub fn from_attr(value: &str) -> Self {
        match value {
            "hidden" => Self::Hidden,
            "veryHidden" => Self::VeryHidden,
            _ => Self::Visible,
        }
    }

    /// Attribute value to write, `None` for visible sheets.
    pub fn as_attr(self) -> Option<&'static str> {
        match self {
            Self::Visible => None,
            Self::Hidden => Some("hidden"),
            Self::VeryHidden => Some("veryHidden"),
        }
    }
}

/// What a catalog entry's relationship points at.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SheetKind {
    #[default]
    Worksheet,
    Chartsheet,
    /// Dialog or macro sheets, kept as-is.
    Other,
}

/// How the registry picks the worksheet that receives an insertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SheetPolicy {
    /// Reuse the first worksheet, creating "Sheet1" only when there is none.
    #[default]
    Single,
    /// Always create and register a new worksheet.
    New,
}

/// A workbook-level relationship (`xl/_rels/workbook.xml.rels` entry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    /// Target as written in the rels part, relative to the workbook part.
    pub target: String,
    pub target_mode: Option<String>,
}

/// One entry in the workbook's sheet catalog.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub sheet_id: u32,
    pub name: String,
    pub rel_id: String,
    #[serde(skip_serializing_if = "is_visible")]
    pub state: SheetState,
    pub kind: SheetKind,
    /// Package part holding the sheet, e.g. `xl/worksheets/sheet1.xml`.
    pub part_path: String,
    /// Cell content; always empty for non-worksheet entries.
    #[serde(skip)]
    pub worksheet: Worksheet,
}

fn is_visible(state: &SheetState) -> bool {
    *state == SheetState::Visible
}

impl Sheet {
    pub fn is_worksheet(&self) -> bool {
        self.kind == SheetKind::Worksheet
    }
}

/// The sheet catalog plus the workbook relationships it is linked through.
///
/// This is the single source of truth for sheet ids: new sheets always get
/// one more than the largest id in the catalog.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    pub(crate) relationships: Vec<Relationship>,
    /// Directory of the workbook part, with trailing slash (`xl/`).
    pub(crate) part_dir: String,
    /// Part names already present in the package.
    pub(crate) reserved_parts: BTreeSet<String>,
    catalog_dirty: bool,
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            relationships: Vec::new(),
            part_dir: "xl/".to_string(),
            reserved_parts: BTreeSet::new(),
            catalog_dirty: false,
        }
    }

    /// Build a workbook from a loaded catalog. Nothing is marked dirty.
    pub(crate) fn from_parts(
        sheets: Vec<Sheet>,
        relationships: Vec<Relationship>,
        part_dir: String,
        reserved_parts: BTreeSet<String>,
    ) -> Self {
        Self {
            sheets,
            relationships,
            part_dir,
            reserved_parts,
            catalog_dirty: false,
        }
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Link a workbook-level part (styles, shared strings) unless a
    /// relationship accepted by `is_kind` already exists.
    pub(crate) fn ensure_relationship(
        &mut self,
        is_kind: fn(&str) -> bool,
        rel_type: &str,
        part_path: &str,
    ) {
        if self.relationships.iter().any(|r| is_kind(&r.rel_type)) {
            return;
        }
        let id = self.next_rel_id();
        debug!("linking {part_path} as {id}");
        self.relationships.push(Relationship {
            id,
            rel_type: rel_type.to_string(),
            target: relative_target(&self.part_dir, part_path),
            target_mode: None,
        });
        self.catalog_dirty = true;
    }

    /// Whether sheets were registered since the workbook was loaded.
    pub fn is_catalog_dirty(&self) -> bool {
        self.catalog_dirty
    }

    /// `1 + max(existing ids)`, or 1 for an empty catalog.
    pub fn next_sheet_id(&self) -> Result<u32> {
        let max = self.sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0);
        max.checked_add(1)
            .ok_or_else(|| XlgenError::Other("sheet id space exhausted".into()))
    }

    /// Find a sheet by name, case-insensitively as spreadsheet readers do.
    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Index of the first catalog entry that is a worksheet.
    pub fn first_worksheet(&self) -> Option<usize> {
        self.sheets.iter().position(Sheet::is_worksheet)
    }

    pub fn worksheet_count(&self) -> usize {
        self.sheets.iter().filter(|s| s.is_worksheet()).count()
    }

    /// Pick (or create) the worksheet that receives the next insertion.
    ///
    /// Returns an index into [`Self::sheets`].
    pub fn resolve_worksheet(&mut self, policy: SheetPolicy) -> Result<usize> {
        match policy {
            SheetPolicy::Single => match self.first_worksheet() {
                Some(idx) => Ok(idx),
                None => self.add_worksheet(),
            },
            SheetPolicy::New => self.add_worksheet(),
        }
    }

    /// Create a worksheet, register it in the catalog and link it with a
    /// new workbook relationship.
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let sheet_id = self.next_sheet_id()?;
        let name = self.default_name(sheet_id)?;
        let rel_id = self.next_rel_id();
        let part_path = self.next_part_path()?;
        let target = relative_target(&self.part_dir, &part_path);

        debug!("registering sheet {sheet_id} '{name}' as {rel_id} -> {part_path}");

        self.relationships.push(Relationship {
            id: rel_id.clone(),
            rel_type: REL_WORKSHEET.to_string(),
            target,
            target_mode: None,
        });

        let mut worksheet = Worksheet::new();
        worksheet.mark_dirty();
        self.sheets.push(Sheet {
            sheet_id,
            name,
            rel_id,
            state: SheetState::Visible,
            kind: SheetKind::Worksheet,
            part_path,
            worksheet,
        });
        self.catalog_dirty = true;
        Ok(self.sheets.len() - 1)
    }

    /// `"Sheet" + id`, bumping the suffix while the name is taken.
    fn default_name(&self, sheet_id: u32) -> Result<String> {
        let mut n = sheet_id;
        loop {
            let candidate = format!("Sheet{n}");
            if self.sheet_by_name(&candidate).is_none() {
                return Ok(candidate);
            }
            n = n
                .checked_add(1)
                .ok_or_else(|| XlgenError::Other("no free sheet name".into()))?;
        }
    }

    /// First `rId{n}` not used by any workbook relationship.
    fn next_rel_id(&self) -> String {
        let mut n: u64 = 1;
        loop {
            let candidate = format!("rId{n}");
            if !self.relationships.iter().any(|r| r.id == candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// First `worksheets/sheet{n}.xml` under the workbook directory that no
    /// part or sheet already uses.
    fn next_part_path(&self) -> Result<String> {
        let mut n: u32 = 1;
        loop {
            let candidate = format!("{}worksheets/sheet{n}.xml", self.part_dir);
            let taken = self.reserved_parts.contains(&candidate)
                || self.sheets.iter().any(|s| s.part_path == candidate);
            if !taken {
                return Ok(candidate);
            }
            n = n
                .checked_add(1)
                .ok_or_else(|| XlgenError::Other("no free worksheet part name".into()))?;
        }
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

    fn loaded_sheet(sheet_id: u32, name: &str, rel_id: &str, part_path: &str) -> Sheet {
        Sheet {
            sheet_id,
            name: name.to_string(),
            rel_id: rel_id.to_string(),
            state: SheetState::Visible,
            kind: SheetKind::Worksheet,
            part_path: part_path.to_string(),
            worksheet: Worksheet::new(),
        }
    }

    #[test]
    fn test_single_policy_creates_sheet1_once() {
        let mut wb = Workbook::new();
        let first = wb.resolve_worksheet(SheetPolicy::Single).unwrap();
        let second = wb.resolve_worksheet(SheetPolicy::Single).unwrap();
        assert_eq!(first, second);
        assert_eq!(wb.sheets.len(), 1);

        let sheet = &wb.sheets[0];
        assert_eq!(sheet.sheet_id, 1);
        assert_eq!(sheet.name, "Sheet1");
        assert_eq!(sheet.rel_id, "rId1");
        assert_eq!(sheet.part_path, "xl/worksheets/sheet1.xml");
        assert_eq!(wb.relationships()[0].target, "worksheets/sheet1.xml");
        assert!(wb.is_catalog_dirty());
    }

    #[test]
    fn test_new_policy_ids_are_max_plus_one() {
        let mut wb = Workbook::new();
        let mut seen = Vec::new();
        for _ in 0..5 {
            let prev_max = wb.sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0);
            let idx = wb.resolve_worksheet(SheetPolicy::New).unwrap();
            let id = wb.sheets[idx].sheet_id;
            assert_eq!(id, prev_max + 1);
            assert!(!seen.contains(&id));
            seen.push(id);
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(wb.sheets[4].name, "Sheet5");
    }

    #[test]
    fn test_ids_follow_max_not_count() {
        let mut wb = Workbook::from_parts(
            vec![
                loaded_sheet(3, "Data", "rId1", "xl/worksheets/sheet1.xml"),
                loaded_sheet(7, "Other", "rId2", "xl/worksheets/sheet2.xml"),
            ],
            Vec::new(),
            "xl/".into(),
            BTreeSet::new(),
        );
        assert_eq!(wb.next_sheet_id().unwrap(), 8);
        let idx = wb.add_worksheet().unwrap();
        assert_eq!(wb.sheets[idx].sheet_id, 8);
        assert_eq!(wb.sheets[idx].name, "Sheet8");
        assert_eq!(wb.sheets[idx].part_path, "xl/worksheets/sheet3.xml");
    }

    #[test]
    fn test_name_collision_bumps_suffix() {
        let mut wb = Workbook::from_parts(
            vec![
                loaded_sheet(1, "sheet2", "rId1", "xl/worksheets/a.xml"),
                loaded_sheet(2, "SHEET3", "rId2", "xl/worksheets/b.xml"),
            ],
            Vec::new(),
            "xl/".into(),
            BTreeSet::new(),
        );
        let idx = wb.add_worksheet().unwrap();
        assert_eq!(wb.sheets[idx].sheet_id, 3);
        assert_eq!(wb.sheets[idx].name, "Sheet4");
    }

    #[test]
    fn test_rel_id_and_part_skip_taken_values() {
        let rels = vec![
            Relationship {
                id: "rId1".into(),
                rel_type: crate::namespaces::REL_STYLES.into(),
                target: "styles.xml".into(),
                target_mode: None,
            },
            Relationship {
                id: "rId2".into(),
                rel_type: crate::namespaces::REL_SHARED_STRINGS.into(),
                target: "sharedStrings.xml".into(),
                target_mode: None,
            },
        ];
        let reserved: BTreeSet<String> = ["xl/worksheets/sheet1.xml".to_string()].into();
        let mut wb = Workbook::from_parts(Vec::new(), rels, "xl/".into(), reserved);
        let idx = wb.add_worksheet().unwrap();
        assert_eq!(wb.sheets[idx].rel_id, "rId3");
        assert_eq!(wb.sheets[idx].part_path, "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_single_policy_skips_chartsheets() {
        let mut chart = loaded_sheet(1, "Chart1", "rId1", "xl/chartsheets/sheet1.xml");
        chart.kind = SheetKind::Chartsheet;
        let mut wb = Workbook::from_parts(vec![chart], Vec::new(), "xl/".into(), BTreeSet::new());
        assert_eq!(wb.first_worksheet(), None);
        let idx = wb.resolve_worksheet(SheetPolicy::Single).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(wb.sheets[idx].sheet_id, 2);
        assert_eq!(wb.worksheet_count(), 1);
    }

    #[test]
    fn test_sheet_id_overflow() {
        let mut wb = Workbook::from_parts(
            vec![loaded_sheet(u32::MAX, "Last", "rId1", "xl/worksheets/sheet1.xml")],
            Vec::new(),
            "xl/".into(),
            BTreeSet::new(),
        );
        assert!(matches!(wb.add_worksheet(), Err(XlgenError::Other(_))));
        assert_eq!(wb.sheets.len(), 1);
    }

    #[test]
    fn test_sheet_state_attr() {
        assert_eq!(SheetState::from_attr("hidden"), SheetState::Hidden);
        assert_eq!(SheetState::from_attr("veryHidden").as_attr(), Some("veryHidden"));
        assert_eq!(SheetState::from_attr("visible").as_attr(), None);
    }
}
