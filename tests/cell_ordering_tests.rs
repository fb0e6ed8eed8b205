//! Tests for row and cell ordering in written worksheets.
//!
//! Rows must appear in ascending row number and cells in ascending column
//! within a row, whatever order they were inserted in.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

mod common;
mod fixtures;

use common::*;
use test_case::test_case;
use xlgen::{Document, SheetPolicy};

fn written_order(inserts: &[&str]) -> Vec<String> {
    let mut doc = Document::new();
    for reference in inserts {
        doc.insert_text_at(reference, reference, SheetPolicy::Single)
            .unwrap();
    }
    let data = doc.to_bytes().unwrap();
    sheet_rows(&data, "xl/worksheets/sheet1.xml")
        .into_iter()
        .flat_map(|(_, cells)| cells.into_iter().map(|c| c.reference))
        .collect()
}

#[test_case(&["A1", "B1", "A2"], &["A1", "B1", "A2"] ; "already ordered")]
#[test_case(&["A3", "A1", "A2"], &["A1", "A2", "A3"] ; "rows reversed")]
#[test_case(&["C1", "A1", "B1"], &["A1", "B1", "C1"] ; "columns reversed")]
#[test_case(&["AA1", "Z1", "B1"], &["B1", "Z1", "AA1"] ; "two letter columns after one letter")]
#[test_case(&["A10", "A9", "A100"], &["A9", "A10", "A100"] ; "numeric not lexical rows")]
#[test_case(&["B2", "A5", "C1", "A2"], &["C1", "A2", "B2", "A5"] ; "mixed")]
fn test_cells_written_in_order(inserts: &[&str], expected: &[&str]) {
    assert_eq!(written_order(inserts), expected);
}

#[test]
fn test_row_numbers_ascending() {
    let mut doc = Document::new();
    for row in [7, 3, 5, 1] {
        doc.insert_text(0, row, "x", SheetPolicy::Single).unwrap();
    }
    let data = doc.to_bytes().unwrap();
    let rows: Vec<u32> = sheet_rows(&data, "xl/worksheets/sheet1.xml")
        .into_iter()
        .map(|(r, _)| r)
        .collect();
    assert_eq!(rows, vec![1, 3, 5, 7]);
    let sheet = read_part_string(&data, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(r#"<dimension ref="A1:A7"/>"#));
}

#[test]
fn test_insert_into_opened_sheet_lands_in_order() {
    // Source rows are deliberately out of order
    let source = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1", 1)
                .text("B3", "b3")
                .text("A1", "a1")
                .text("C1", "c1"),
        )
        .build();
    let mut doc = Document::from_bytes(source).unwrap();
    doc.insert_text_at("B1", "b1", SheetPolicy::Single).unwrap();
    doc.insert_text_at("A2", "a2", SheetPolicy::Single).unwrap();
    let data = doc.to_bytes().unwrap();

    assert_eq!(
        sheet_text(&data, "xl/worksheets/sheet1.xml"),
        vec![
            ("A1".to_string(), "a1".to_string()),
            ("B1".to_string(), "b1".to_string()),
            ("C1".to_string(), "c1".to_string()),
            ("A2".to_string(), "a2".to_string()),
            ("B3".to_string(), "b3".to_string()),
        ]
    );
}

#[test_case(0, 1, "A1")]
#[test_case(25, 1, "Z1")]
#[test_case(26, 2, "AA2")]
#[test_case(701, 10, "ZZ10")]
#[test_case(702, 1, "AAA1")]
#[test_case(16_383, 1_048_576, "XFD1048576")]
fn test_insert_by_position_uses_reference(col: u32, row: u32, reference: &str) {
    let mut doc = Document::new();
    doc.insert_text(col, row, "v", SheetPolicy::Single).unwrap();
    assert_eq!(doc.cell_text(0, reference), Some("v"));
    assert_eq!(doc.cell(0, reference).unwrap().reference(), reference);
}

#[test_case(16_384, 1 ; "column past XFD")]
#[test_case(0, 0 ; "row zero")]
#[test_case(0, 1_048_577 ; "row past limit")]
fn test_out_of_range_positions_rejected(col: u32, row: u32) {
    let mut doc = Document::new();
    assert!(matches!(
        doc.insert_text(col, row, "v", SheetPolicy::Single),
        Err(xlgen::XlgenError::CellRef(_))
    ));
}
