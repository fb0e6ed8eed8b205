//! Generates worksheet XML from a `Worksheet`.
//!
//! New sheets get a complete part. Loaded sheets that were modified only get
//! their `<dimension>` and `<sheetData>` regenerated; see `xml_patch`.

use crate::namespaces::{NS_OFFICE_RELATIONSHIPS, NS_SPREADSHEET};
use crate::types::{Cell, CellType, Row, Worksheet};
use crate::xml_helpers::{push_raw_attribute, push_raw_attributes, push_text_element, xml_escape};

/// Schema order of `CT_Worksheet` children, used to place a missing
/// `<dimension>` or `<sheetData>`.
pub(crate) const WORKSHEET_CHILD_ORDER: &[&[u8]] = &[
    b"sheetPr",
    b"dimension",
    b"sheetViews",
    b"sheetFormatPr",
    b"cols",
    b"sheetData",
    b"sheetCalcPr",
    b"sheetProtection",
    b"protectedRanges",
    b"scenarios",
    b"autoFilter",
    b"sortState",
    b"dataConsolidate",
    b"customSheetViews",
    b"mergeCells",
    b"phoneticPr",
    b"conditionalFormatting",
    b"dataValidations",
    b"hyperlinks",
    b"printOptions",
    b"pageMargins",
    b"pageSetup",
    b"headerFooter",
    b"rowBreaks",
    b"colBreaks",
    b"customProperties",
    b"cellWatches",
    b"ignoredErrors",
    b"smartTags",
    b"drawing",
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"drawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"webPublishItems",
    b"tableParts",
    b"extLst",
];

/// Write a complete worksheet part.
pub(crate) fn write_sheet_xml(worksheet: &Worksheet) -> String {
    let mut out = String::with_capacity(256 + worksheet.cell_count() * 32);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(&format!(
        r#"<worksheet xmlns="{NS_SPREADSHEET}" xmlns:r="{NS_OFFICE_RELATIONSHIPS}">"#
    ));
    out.push_str(&write_dimension(worksheet, ""));
    write_sheet_data(&mut out, worksheet, "");
    out.push_str("</worksheet>");
    out
}

/// `<dimension>` element for the used range; `A1` for a sheet without cells.
///
/// `p` is the namespace prefix of the surrounding part, `""` or `"x:"`.
pub(crate) fn write_dimension(worksheet: &Worksheet, p: &str) -> String {
    let range = worksheet.dimension().unwrap_or_else(|| "A1".to_string());
    format!("<{p}dimension ref=\"{range}\"/>")
}

/// Write the `<sheetData>` element with every row in ascending order.
pub(crate) fn write_sheet_data(out: &mut String, worksheet: &Worksheet, p: &str) {
    if worksheet.row_count() == 0 {
        out.push_str(&format!("<{p}sheetData/>"));
        return;
    }
    out.push_str(&format!("<{p}sheetData>"));
    for row in worksheet.rows() {
        write_row(out, row, p);
    }
    out.push_str(&format!("</{p}sheetData>"));
}

fn write_row(out: &mut String, row: &Row, p: &str) {
    out.push_str(&format!("<{p}row r=\"{}\"", row.index()));
    for (key, value) in &row.attrs {
        if key == "spans" {
            push_raw_attribute(out, key, &row_spans(row, value));
        } else {
            push_raw_attribute(out, key, value);
        }
    }
    if row.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for cell in row.cells() {
        write_cell(out, cell, p);
    }
    out.push_str(&format!("</{p}row>"));
}

/// Keep a loaded `spans` hint while it still covers every cell, otherwise
/// recompute it from the row's first and last column.
fn row_spans(row: &Row, loaded: &str) -> String {
    let (Some(first), Some(last)) = (row.first_col(), row.last_col()) else {
        return loaded.to_string();
    };
    let ranges: Vec<(u32, u32)> = loaded
        .split_whitespace()
        .filter_map(|span| {
            let (lo, hi) = span.split_once(':')?;
            Some((lo.parse().ok()?, hi.parse().ok()?))
        })
        .collect();
    let covered = row.cells().all(|cell| {
        let col = cell.col() + 1;
        ranges.iter().any(|&(lo, hi)| lo <= col && col <= hi)
    });
    if covered {
        loaded.to_string()
    } else {
        format!("{}:{}", first + 1, last + 1)
    }
}

/// Write a single `<c>` element.
fn write_cell(out: &mut String, cell: &Cell, p: &str) {
    out.push_str(&format!("<{p}c r=\"{}\"", cell.reference()));
    if let Some(s) = cell.style {
        out.push_str(&format!(" s=\"{s}\""));
    }
    if let Some(tag) = cell.t.tag() {
        out.push_str(&format!(" t=\"{tag}\""));
    }
    push_raw_attributes(out, &cell.extra_attrs);

    if cell.t == CellType::InlineString {
        out.push_str(&format!("><{p}is>"));
        push_text_element(out, p, cell.v.as_deref().unwrap_or_default());
        out.push_str(&format!("</{p}is></{p}c>"));
        return;
    }

    if cell.formula.is_none() && cell.v.is_none() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    if let Some(ref f) = cell.formula {
        out.push_str(&format!("<{p}f"));
        push_raw_attributes(out, &cell.formula_attrs);
        if f.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            out.push_str(&xml_escape(f));
            out.push_str(&format!("</{p}f>"));
        }
    }
    if let Some(ref v) = cell.v {
        out.push_str(&format!("<{p}v>"));
        out.push_str(&xml_escape(v));
        out.push_str(&format!("</{p}v>"));
    }
    out.push_str(&format!("</{p}c>"));
}
