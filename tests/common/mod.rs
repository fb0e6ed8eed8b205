//! Common test utilities: read saved packages back without going through
//! the library's own parser.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Reader};
use std::io::{Cursor, Read};

// Re-export fixtures for convenience
pub use super::fixtures::*;

/// Names of every entry, in archive order.
#[must_use]
pub fn entry_names(data: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).expect("Failed to open ZIP archive");
    (0..archive.len())
        .map(|i| archive.by_index_raw(i).unwrap().name().to_string())
        .collect()
}

/// Raw bytes of one part, if present.
#[must_use]
pub fn read_part(data: &[u8], name: &str) -> Option<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).expect("Failed to open ZIP archive");
    let mut file = archive.by_name(name).ok()?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).unwrap();
    Some(buf)
}

/// One part as text. Panics when missing.
#[must_use]
pub fn read_part_string(data: &[u8], name: &str) -> String {
    let bytes = read_part(data, name).unwrap_or_else(|| panic!("missing part {name}"));
    String::from_utf8(bytes).unwrap()
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .map(|a| a.unescape_value().unwrap().into_owned())
}

/// Entries of the shared-string table, in index order.
#[must_use]
pub fn shared_strings(data: &[u8]) -> Vec<String> {
    let Some(xml) = read_part(data, "xl/sharedStrings.xml") else {
        return Vec::new();
    };
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut out = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) if e.local_name().as_ref() == b"si" => current = Some(String::new()),
            Event::Empty(e) if e.local_name().as_ref() == b"si" => out.push(String::new()),
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_t = true,
            Event::Text(t) if in_t => {
                if let Some(ref mut s) = current {
                    s.push_str(&t.unescape().unwrap());
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"t" => in_t = false,
            Event::End(e) if e.local_name().as_ref() == b"si" => {
                out.extend(current.take());
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

/// `count` and `uniqueCount` of the shared-string table.
#[must_use]
pub fn shared_string_counts(data: &[u8]) -> (Option<u32>, Option<u32>) {
    let xml = read_part(data, "xl/sharedStrings.xml").expect("no shared strings part");
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sst" => {
                let count = attr(&e, b"count").map(|v| v.parse().unwrap());
                let unique = attr(&e, b"uniqueCount").map(|v| v.parse().unwrap());
                return (count, unique);
            }
            Event::Eof => panic!("no <sst> element"),
            _ => {}
        }
        buf.clear();
    }
}

/// A `<sheet>` entry of the workbook catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSheet {
    pub name: String,
    pub sheet_id: u32,
    pub rel_id: String,
}

#[must_use]
pub fn catalog(data: &[u8]) -> Vec<CatalogSheet> {
    let xml = read_part(data, "xl/workbook.xml").expect("no workbook part");
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut out = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                out.push(CatalogSheet {
                    name: attr(&e, b"name").unwrap(),
                    sheet_id: attr(&e, b"sheetId").unwrap().parse().unwrap(),
                    rel_id: attr(&e, b"r:id").unwrap(),
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

/// `(Id, Target)` pairs of the workbook relationships.
#[must_use]
pub fn workbook_rels(data: &[u8]) -> Vec<(String, String)> {
    let xml = read_part(data, "xl/_rels/workbook.xml.rels").expect("no workbook rels");
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut out = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                out.push((attr(&e, b"Id").unwrap(), attr(&e, b"Target").unwrap()));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

/// A `<c>` element as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCell {
    pub reference: String,
    pub t: Option<String>,
    pub v: Option<String>,
}

/// Row numbers and their cells, in document order.
#[must_use]
pub fn sheet_rows(data: &[u8], part: &str) -> Vec<(u32, Vec<SheetCell>)> {
    let xml = read_part(data, part).unwrap_or_else(|| panic!("missing part {part}"));
    let mut reader = Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut rows: Vec<(u32, Vec<SheetCell>)> = Vec::new();
    let mut in_v = false;
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                rows.push((attr(&e, b"r").unwrap().parse().unwrap(), Vec::new()));
            }
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let cell = SheetCell {
                    reference: attr(&e, b"r").unwrap(),
                    t: attr(&e, b"t"),
                    v: None,
                };
                rows.last_mut().unwrap().1.push(cell);
            }
            Event::Start(e) if e.local_name().as_ref() == b"v" => in_v = true,
            Event::Text(t) if in_v => {
                let cell = rows.last_mut().unwrap().1.last_mut().unwrap();
                cell.v = Some(t.unescape().unwrap().into_owned());
            }
            Event::End(e) if e.local_name().as_ref() == b"v" => in_v = false,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    rows
}

/// Text of every shared-string cell of a sheet, as `(reference, text)`.
#[must_use]
pub fn sheet_text(data: &[u8], part: &str) -> Vec<(String, String)> {
    let strings = shared_strings(data);
    sheet_rows(data, part)
        .into_iter()
        .flat_map(|(_, cells)| cells)
        .filter(|c| c.t.as_deref() == Some("s"))
        .map(|c| {
            let idx: usize = c.v.unwrap().parse().unwrap();
            (c.reference, strings[idx].clone())
        })
        .collect()
}

/// Namespace mistakes in one part: elements that do not resolve to the
/// SpreadsheetML main namespace and attributes whose prefix is undeclared.
///
/// Empty for a well-formed part.
#[must_use]
pub fn namespace_problems(data: &[u8], part: &str) -> Vec<String> {
    let xml = read_part(data, part).unwrap_or_else(|| panic!("missing part {part}"));
    let mut reader = NsReader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut problems = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).unwrap() {
            Event::Start(e) | Event::Empty(e) => {
                let qualified = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match reader.resolve_element(e.name()).0 {
                    ResolveResult::Bound(Namespace(ns)) if ns == NS_MAIN.as_bytes() => {}
                    other => problems.push(format!("element {qualified} resolves to {other:?}")),
                }
                for a in e.attributes().flatten() {
                    if let ResolveResult::Unknown(prefix) = reader.resolve_attribute(a.key).0 {
                        problems.push(format!(
                            "attribute {} on {qualified} uses undeclared prefix {}",
                            String::from_utf8_lossy(a.key.as_ref()),
                            String::from_utf8_lossy(&prefix)
                        ));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    problems
}
