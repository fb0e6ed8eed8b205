//! Package-level parts: content types, relationships, the sheet catalog and
//! the shared-string table.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use crate::error::{Result, XlgenError};
use crate::namespaces::{get_rel_id, is_workbook_relationship};
use crate::package::ContentTypes;
use crate::types::{Relationship, SheetState};
use crate::xml_helpers::{attr_string, attr_u32};

/// A `<sheet>` entry of `xl/workbook.xml` before its relationship is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CatalogEntry {
    pub name: String,
    pub sheet_id: u32,
    pub rel_id: String,
    pub state: SheetState,
}

pub(super) fn open_part<'a, R: Read + Seek>(
    archive: &'a mut ZipArchive<R>,
    path: &str,
) -> Result<Option<BufReader<zip::read::ZipFile<'a>>>> {
    match archive.by_name(path) {
        Ok(file) => Ok(Some(BufReader::new(file))),
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse `[Content_Types].xml`. The part is mandatory.
pub(super) fn parse_content_types<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<ContentTypes> {
    let reader = open_part(archive, crate::package::CONTENT_TYPES_PATH)?
        .ok_or_else(|| XlgenError::Format("package has no [Content_Types].xml".into()))?;
    read_content_types(reader)
}

pub(super) fn read_content_types<B: BufRead>(reader: B) -> Result<ContentTypes> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut content_types = ContentTypes::new();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) => match e.local_name().as_ref() {
                b"Default" => {
                    if let (Some(ext), Some(ct)) =
                        (attr_string(e, b"Extension"), attr_string(e, b"ContentType"))
                    {
                        content_types.set_default(&ext, &ct);
                    }
                }
                b"Override" => {
                    if let (Some(part), Some(ct)) =
                        (attr_string(e, b"PartName"), attr_string(e, b"ContentType"))
                    {
                        content_types.set_override(&part, &ct);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(content_types)
}

/// Parse a relationships part. A missing part yields no relationships.
pub(super) fn parse_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<Relationship>> {
    match open_part(archive, path)? {
        Some(reader) => read_relationships(reader),
        None => Ok(Vec::new()),
    }
}

pub(super) fn read_relationships<B: BufRead>(reader: B) -> Result<Vec<Relationship>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = attr_string(e, b"Id").unwrap_or_default();
                    let rel_type = attr_string(e, b"Type").unwrap_or_default();
                    let target = attr_string(e, b"Target").unwrap_or_default();
                    if !id.is_empty() && !target.is_empty() {
                        rels.push(Relationship {
                            id,
                            rel_type,
                            target,
                            target_mode: attr_string(e, b"TargetMode"),
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Target of the package's `officeDocument` relationship.
pub(super) fn office_document_target(root_rels: &[Relationship]) -> Option<&str> {
    root_rels
        .iter()
        .find(|r| is_workbook_relationship(&r.rel_type) && r.target_mode.is_none())
        .map(|r| r.target.as_str())
}

/// Read the `<sheets>` catalog of the workbook part.
pub(super) fn parse_catalog<B: BufRead>(reader: B) -> Result<Vec<CatalogEntry>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) => {
                if e.local_name().as_ref() == b"sheet" {
                    let name = attr_string(e, b"name").unwrap_or_default();
                    let rel_id = get_rel_id(e).unwrap_or_default();
                    let Some(sheet_id) = attr_u32(e, b"sheetId").filter(|&id| id > 0) else {
                        return Err(XlgenError::Format(format!(
                            "sheet '{name}' has no valid sheetId"
                        )));
                    };
                    let state = attr_string(e, b"state")
                        .map(|s| SheetState::from_attr(&s))
                        .unwrap_or_default();
                    entries.push(CatalogEntry {
                        name,
                        sheet_id,
                        rel_id,
                        state,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

/// Parse the shared-string table. Rich-text runs are concatenated and
/// phonetic runs (`rPh`) are skipped.
pub(super) fn parse_shared_strings<B: BufRead>(reader: B) -> Result<Vec<String>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current_string = String::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut in_rph = false;

    loop {
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current_string.clear();
                }
                b"rPh" => in_rph = true,
                b"t" if in_si && !in_rph => in_t = true,
                _ => {}
            },
            Event::Empty(ref e) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Event::Text(ref e) if in_t => {
                current_string.push_str(&e.unescape()?);
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current_string));
                    in_si = false;
                }
                b"rPh" => in_rph = false,
                b"t" => in_t = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
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
    use crate::namespaces::{CT_WORKSHEET, REL_STYLES};

    #[test]
    fn test_read_content_types() {
        let xml = r#"<?xml version="1.0"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;
        let ct = read_content_types(xml.as_bytes()).unwrap();
        assert_eq!(ct.content_type_of("xl/worksheets/sheet1.xml"), Some(CT_WORKSHEET));
        assert_eq!(ct.content_type_of("docProps/app.xml"), Some("application/xml"));
    }

    #[test]
    fn test_read_relationships() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
</Relationships>"#;
        let rels = read_relationships(xml.as_bytes()).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].rel_type, REL_STYLES);
        assert_eq!(rels[1].target, "https://example.com/?a=1&b=2");
        assert_eq!(rels[1].target_mode.as_deref(), Some("External"));
    }

    #[test]
    fn test_office_document_target() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;
        let rels = read_relationships(xml.as_bytes()).unwrap();
        assert_eq!(office_document_target(&rels), Some("xl/workbook.xml"));
    }

    #[test]
    fn test_parse_catalog() {
        let xml = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Data &amp; More" sheetId="4" r:id="rId3"/>
    <sheet name="Hidden" sheetId="9" state="hidden" r:id="rId1"/>
  </sheets>
</workbook>"#;
        let entries = parse_catalog(xml.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Data & More");
        assert_eq!(entries[0].sheet_id, 4);
        assert_eq!(entries[0].rel_id, "rId3");
        assert_eq!(entries[1].state, SheetState::Hidden);
    }

    #[test]
    fn test_parse_catalog_rejects_missing_sheet_id() {
        let xml = r#"<workbook><sheets><sheet name="A" r:id="rId1"/></sheets></workbook>"#;
        assert!(matches!(
            parse_catalog(xml.as_bytes()),
            Err(XlgenError::Format(_))
        ));
    }

    #[test]
    fn test_parse_shared_strings() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="4" uniqueCount="4">
  <si><t>Plain</t></si>
  <si><r><t>Rich </t></r><r><rPr><b/></rPr><t>text</t></r></si>
  <si><t>漢字</t><rPh sb="0" eb="2"><t>かんじ</t></rPh></si>
  <si><t xml:space="preserve"> a &amp; b </t></si>
  <si/>
</sst>"#;
        let strings = parse_shared_strings(xml.as_bytes()).unwrap();
        assert_eq!(strings, vec!["Plain", "Rich text", "漢字", " a & b ", ""]);
    }

    #[test]
    fn test_parse_shared_strings_malformed() {
        let xml = "<sst><si><t>open</si></sst>";
        assert!(parse_shared_strings(xml.as_bytes()).is_err());
    }
}
