//! Workbook-level parts: root relationships, the workbook part, its
//! relationships, a minimal stylesheet and the shared-string table.

use crate::namespaces::{
    NS_OFFICE_RELATIONSHIPS, NS_RELATIONSHIPS, NS_SPREADSHEET, REL_WORKBOOK,
};
use crate::shared_strings::SharedStringPool;
use crate::types::Workbook;
use crate::xml_helpers::{push_text_element, xml_escape};

use super::xml_patch::MarkupScope;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// `_rels/.rels` pointing at the workbook part.
pub(crate) fn write_root_rels(workbook_path: &str) -> String {
    format!(
        "{XML_DECL}\n<Relationships xmlns=\"{NS_RELATIONSHIPS}\">\
<Relationship Id=\"rId1\" Type=\"{REL_WORKBOOK}\" Target=\"{}\"/></Relationships>",
        xml_escape(workbook_path)
    )
}

/// Schema order of `CT_Workbook` children, used to place a missing
/// `<sheets>`.
pub(crate) const WORKBOOK_CHILD_ORDER: &[&[u8]] = &[
    b"fileVersion",
    b"fileSharing",
    b"workbookPr",
    b"workbookProtection",
    b"bookViews",
    b"sheets",
    b"functionGroups",
    b"externalReferences",
    b"definedNames",
    b"calcPr",
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// The `<sheets>` catalog element.
///
/// Element names take the scope's prefix. When the surrounding part has no
/// relationships namespace in scope, `<sheets>` declares `xmlns:r` itself so
/// the `r:id` attributes stay bound.
pub(crate) fn write_sheets_element(workbook: &Workbook, scope: &MarkupScope) -> String {
    let p = scope.prefix.as_str();
    let (r, declaration) = match scope.relationships_prefix.as_deref() {
        Some(r) => (r, String::new()),
        None => ("r:", format!(" xmlns:r=\"{NS_OFFICE_RELATIONSHIPS}\"")),
    };
    if workbook.sheets.is_empty() {
        return format!("<{p}sheets{declaration}/>");
    }
    let mut out = format!("<{p}sheets{declaration}>");
    for sheet in &workbook.sheets {
        out.push_str(&format!(
            "<{p}sheet name=\"{}\" sheetId=\"{}\"",
            xml_escape(&sheet.name),
            sheet.sheet_id
        ));
        if let Some(state) = sheet.state.as_attr() {
            out.push_str(&format!(" state=\"{state}\""));
        }
        out.push_str(&format!(" {r}id=\"{}\"/>", xml_escape(&sheet.rel_id)));
    }
    out.push_str(&format!("</{p}sheets>"));
    out
}

/// A complete workbook part for a fresh package.
pub(crate) fn write_workbook_xml(workbook: &Workbook) -> String {
    format!(
        "{XML_DECL}\n<workbook xmlns=\"{NS_SPREADSHEET}\" xmlns:r=\"{NS_OFFICE_RELATIONSHIPS}\">\
<bookViews><workbookView/></bookViews>{}</workbook>",
        write_sheets_element(workbook, &MarkupScope::fresh())
    )
}

/// The workbook's relationships part, one entry per known relationship.
pub(crate) fn write_workbook_rels(workbook: &Workbook) -> String {
    let mut out = format!("{XML_DECL}\n<Relationships xmlns=\"{NS_RELATIONSHIPS}\">");
    for rel in workbook.relationships() {
        out.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"",
            xml_escape(&rel.id),
            xml_escape(&rel.rel_type),
            xml_escape(&rel.target)
        ));
        if let Some(ref mode) = rel.target_mode {
            out.push_str(&format!(" TargetMode=\"{}\"", xml_escape(mode)));
        }
        out.push_str("/>");
    }
    out.push_str("</Relationships>");
    out
}

/// Minimal stylesheet: one font, the two mandatory fills, one border and a
/// single default cell format.
pub(crate) fn write_styles_xml() -> String {
    format!(
        "{XML_DECL}\n<styleSheet xmlns=\"{NS_SPREADSHEET}\">\
<fonts count=\"1\"><font><sz val=\"11\"/><name val=\"Calibri\"/></font></fonts>\
<fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill><fill><patternFill patternType=\"gray125\"/></fill></fills>\
<borders count=\"1\"><border/></borders>\
<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>\
<cellXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/></cellXfs>\
<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>\
</styleSheet>"
    )
}

/// A `<si>` item for one shared-string entry, with element prefix `p`.
pub(crate) fn push_string_item(out: &mut String, p: &str, text: &str) {
    out.push_str(&format!("<{p}si>"));
    push_text_element(out, p, text);
    out.push_str(&format!("</{p}si>"));
}

/// A complete shared-string part. `count` is the number of cells that
/// reference the table.
pub(crate) fn write_shared_strings_xml(pool: &SharedStringPool, count: usize) -> String {
    let mut out = String::with_capacity(128 + pool.len() * 24);
    out.push_str(XML_DECL);
    out.push('\n');
    out.push_str(&format!(
        "<sst xmlns=\"{NS_SPREADSHEET}\" count=\"{count}\" uniqueCount=\"{}\">",
        pool.len()
    ));
    for text in pool.iter() {
        push_string_item(&mut out, "", text);
    }
    out.push_str("</sst>");
    out
}
