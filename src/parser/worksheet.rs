//! Worksheet `sheetData` parsing.

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

use crate::cell_ref::{parse_cell_ref, validate_position};
use crate::error::Result;
use crate::types::{Cell, CellType, Row, Worksheet};
use crate::xml_helpers::{attr_string, attr_u32, raw_attributes};

/// Which child of `<c>` the reader is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellText {
    None,
    Value,
    Formula,
    InlineText,
}

/// Parse the rows and cells of a worksheet part.
///
/// Rows without `r` follow the previous row; cells without `r` take the
/// column after the previous cell. Cells that fall outside the grid are
/// dropped with a warning.
pub(super) fn parse_sheet_data<B: BufRead>(reader: B, part_name: &str) -> Result<Worksheet> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut worksheet = Worksheet::new();
    let mut buf = Vec::new();

    let mut current_row: Option<Row> = None;
    let mut last_row: u32 = 0;
    let mut next_col: u32 = 0;
    let mut current_cell: Option<Cell> = None;
    let mut text_target = CellText::None;
    let mut in_rph = false;
    let mut in_t = false;
    let mut text_buf = String::new();

    loop {
        let event = xml.read_event_into(&mut buf)?;
        let is_start = matches!(event, Event::Start(_));
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                match e.local_name().as_ref() {
                    b"row" => {
                        if let Some(row) = current_row.take() {
                            worksheet.put_row(row);
                        }
                        let index = attr_u32(e, b"r").unwrap_or(last_row.saturating_add(1));
                        last_row = index;
                        next_col = 0;
                        if validate_position(0, index).is_ok() {
                            let mut row = Row::new(index);
                            row.attrs = raw_attributes(e, &[b"r"]);
                            if is_start {
                                current_row = Some(row);
                            } else {
                                worksheet.put_row(row);
                            }
                        } else {
                            warn!("{part_name}: skipping row {index} outside the grid");
                        }
                    }
                    b"c" => {
                        let cell = start_cell(e, last_row, next_col, part_name);
                        if let Some(cell) = &cell {
                            next_col = cell.col().saturating_add(1);
                        } else {
                            next_col = next_col.saturating_add(1);
                        }
                        match (cell, is_start) {
                            (Some(cell), true) => current_cell = Some(cell),
                            (Some(cell), false) => {
                                if let Some(row) = current_row.as_mut() {
                                    row.put(cell);
                                }
                            }
                            (None, _) => current_cell = None,
                        }
                    }
                    b"v" if is_start && current_cell.is_some() => {
                        text_target = CellText::Value;
                        text_buf.clear();
                    }
                    b"f" => {
                        if let Some(cell) = current_cell.as_mut() {
                            cell.formula_attrs = raw_attributes(e, &[]);
                            if is_start {
                                text_target = CellText::Formula;
                                text_buf.clear();
                            } else {
                                // shared-formula dependent
                                cell.formula = Some(String::new());
                            }
                        }
                    }
                    b"is" if is_start && current_cell.is_some() => {
                        text_target = CellText::InlineText;
                        text_buf.clear();
                    }
                    b"t" if is_start => in_t = true,
                    b"rPh" if is_start => in_rph = true,
                    _ => {}
                }
            }
            Event::Text(ref e) if collects_text(text_target, in_t, in_rph) => {
                text_buf.push_str(&e.unescape()?);
            }
            Event::CData(ref e) if collects_text(text_target, in_t, in_rph) => {
                text_buf.push_str(&String::from_utf8_lossy(e));
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" if text_target == CellText::Value => {
                    if let Some(cell) = current_cell.as_mut() {
                        cell.v = Some(std::mem::take(&mut text_buf));
                    }
                    text_target = CellText::None;
                }
                b"f" if text_target == CellText::Formula => {
                    if let Some(cell) = current_cell.as_mut() {
                        cell.formula = Some(std::mem::take(&mut text_buf));
                    }
                    text_target = CellText::None;
                }
                b"is" if text_target == CellText::InlineText => {
                    if let Some(cell) = current_cell.as_mut() {
                        cell.v = Some(std::mem::take(&mut text_buf));
                    }
                    text_target = CellText::None;
                }
                b"t" => in_t = false,
                b"rPh" => in_rph = false,
                b"c" => {
                    if let (Some(cell), Some(row)) = (current_cell.take(), current_row.as_mut()) {
                        row.put(cell);
                    }
                    text_target = CellText::None;
                }
                b"row" => {
                    if let Some(row) = current_row.take() {
                        worksheet.put_row(row);
                    }
                }
                b"sheetData" => break,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(row) = current_row.take() {
        worksheet.put_row(row);
    }
    Ok(worksheet)
}

/// Inline strings only take text from `<t>` runs outside phonetic hints.
fn collects_text(target: CellText, in_t: bool, in_rph: bool) -> bool {
    match target {
        CellText::None => false,
        CellText::Value | CellText::Formula => true,
        CellText::InlineText => in_t && !in_rph,
    }
}

/// Build a cell from its `<c>` attributes, or `None` when its position is
/// unusable.
fn start_cell(e: &BytesStart, row: u32, next_col: u32, part_name: &str) -> Option<Cell> {
    let (col, row_index) = match attr_string(e, b"r") {
        Some(reference) => match parse_cell_ref(&reference) {
            Some(position) => position,
            None => {
                warn!("{part_name}: skipping cell with bad reference '{reference}'");
                return None;
            }
        },
        None => (next_col, row),
    };
    if row_index != row {
        warn!("{part_name}: cell in row {row_index} found inside row {row}, skipping");
        return None;
    }
    if validate_position(col, row_index).is_err() {
        warn!("{part_name}: skipping cell outside the grid at column {col}, row {row_index}");
        return None;
    }

    let mut cell = Cell::new(col, row_index);
    cell.t = attr_string(e, b"t")
        .map(|t| CellType::from_tag(t.as_bytes()))
        .unwrap_or_default();
    cell.style = attr_u32(e, b"s");
    cell.extra_attrs = raw_attributes(e, &[b"r", b"s", b"t"]);
    Some(cell)
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

    fn parse(xml: &str) -> Worksheet {
        parse_sheet_data(xml.as_bytes(), "xl/worksheets/sheet1.xml").unwrap()
    }

    #[test]
    fn test_shared_string_cells() {
        let ws = parse(
            r#"<worksheet><sheetData>
<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
<row r="2"><c r="A2" t="s"><v>2</v></c></row>
</sheetData></worksheet>"#,
        );
        assert_eq!(ws.cell_count(), 3);
        assert_eq!(ws.cell_by_ref("B1").unwrap().shared_string_index(), Some(1));
        assert_eq!(ws.cell_by_ref("A2").unwrap().shared_string_index(), Some(2));
        assert!(!ws.is_dirty());
    }

    #[test]
    fn test_other_value_kinds_preserved() {
        let ws = parse(
            r#"<worksheet><sheetData><row r="3">
<c r="A3" s="2"><v>1.5</v></c>
<c r="B3" t="b"><v>1</v></c>
<c r="C3" t="str"><f>A3&amp;"x"</f><v>1.5x</v></c>
<c r="D3" t="inlineStr"><is>
  <r><t xml:space="preserve">in</t></r><r><t>line</t></r>
</is></c>
<c r="E3" t="e"><v>#N/A</v></c>
</row></sheetData></worksheet>"#,
        );
        let a3 = ws.cell_by_ref("A3").unwrap();
        assert_eq!(a3.t, CellType::Number);
        assert_eq!(a3.v.as_deref(), Some("1.5"));
        assert_eq!(a3.style, Some(2));
        assert_eq!(ws.cell_by_ref("B3").unwrap().t, CellType::Boolean);
        let c3 = ws.cell_by_ref("C3").unwrap();
        assert_eq!(c3.formula.as_deref(), Some("A3&\"x\""));
        assert_eq!(c3.v.as_deref(), Some("1.5x"));
        let d3 = ws.cell_by_ref("D3").unwrap();
        assert_eq!(d3.t, CellType::InlineString);
        assert_eq!(d3.v.as_deref(), Some("inline"));
        assert_eq!(ws.cell_by_ref("E3").unwrap().t, CellType::Error);
    }

    #[test]
    fn test_implicit_positions() {
        let ws = parse(
            r#"<worksheet><sheetData>
<row><c><v>1</v></c><c><v>2</v></c></row>
<row><c r="C2"><v>3</v></c><c><v>4</v></c></row>
</sheetData></worksheet>"#,
        );
        assert_eq!(ws.cell_by_ref("A1").unwrap().v.as_deref(), Some("1"));
        assert_eq!(ws.cell_by_ref("B1").unwrap().v.as_deref(), Some("2"));
        assert_eq!(ws.cell_by_ref("C2").unwrap().v.as_deref(), Some("3"));
        assert_eq!(ws.cell_by_ref("D2").unwrap().v.as_deref(), Some("4"));
    }

    #[test]
    fn test_unsorted_rows_are_ordered() {
        let ws = parse(
            r#"<worksheet><sheetData>
<row r="5"><c r="A5"><v>5</v></c></row>
<row r="2"><c r="B2"><v>2</v></c><c r="A2"><v>1</v></c></row>
</sheetData></worksheet>"#,
        );
        let rows: Vec<u32> = ws.rows().map(Row::index).collect();
        assert_eq!(rows, vec![2, 5]);
        let refs: Vec<&str> = ws.rows().next().unwrap().cells().map(Cell::reference).collect();
        assert_eq!(refs, vec!["A2", "B2"]);
    }

    #[test]
    fn test_bad_cells_are_skipped() {
        let ws = parse(
            r#"<worksheet><sheetData>
<row r="1"><c r="1A"><v>x</v></c><c r="A1"><v>ok</v></c><c r="B7"><v>wrong row</v></c></row>
<row r="0"><c><v>zero</v></c></row>
</sheetData></worksheet>"#,
        );
        assert_eq!(ws.cell_count(), 1);
        assert_eq!(ws.cell_by_ref("A1").unwrap().v.as_deref(), Some("ok"));
    }

    #[test]
    fn test_row_and_formula_attributes_kept() {
        let ws = parse(
            r#"<worksheet><sheetData>
<row r="1" spans="1:2" ht="30" customHeight="1"><c r="A1"><v>2</v></c><c r="B1"><f t="shared" ref="B1:B3" si="0">A1*2</f><v>4</v></c></row>
<row r="2" hidden="1"><c r="B2" cm="1"><f t="shared" si="0"/><v>6</v></c></row>
</sheetData></worksheet>"#,
        );
        let rows: Vec<&Row> = ws.rows().collect();
        assert_eq!(
            rows[0].attrs,
            vec![
                ("spans".to_string(), "1:2".to_string()),
                ("ht".to_string(), "30".to_string()),
                ("customHeight".to_string(), "1".to_string()),
            ]
        );
        assert_eq!(rows[1].attrs, vec![("hidden".to_string(), "1".to_string())]);

        let b1 = ws.cell_by_ref("B1").unwrap();
        assert_eq!(b1.formula.as_deref(), Some("A1*2"));
        assert_eq!(b1.shared_formula_master(), Some("0"));

        let b2 = ws.cell_by_ref("B2").unwrap();
        assert_eq!(b2.formula.as_deref(), Some(""));
        assert_eq!(b2.shared_formula_group(), Some("0"));
        assert_eq!(b2.v.as_deref(), Some("6"));
        assert_eq!(b2.extra_attrs, vec![("cm".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_prefixed_sheet_data() {
        let ws = parse(
            r#"<x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:sheetData>
<x:row r="1"><x:c r="A1" t="s"><x:v>0</x:v></x:c><x:c r="B1" t="inlineStr"><x:is><x:t>in</x:t></x:is></x:c></x:row>
</x:sheetData></x:worksheet>"#,
        );
        assert_eq!(ws.cell_by_ref("A1").unwrap().shared_string_index(), Some(0));
        assert_eq!(ws.cell_by_ref("B1").unwrap().v.as_deref(), Some("in"));
    }

    #[test]
    fn test_empty_sheet() {
        let ws = parse(r#"<worksheet><dimension ref="A1"/><sheetData/></worksheet>"#);
        assert!(ws.is_empty());
        assert_eq!(ws.row_count(), 0);
    }
}
