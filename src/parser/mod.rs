//! Package loader
//!
//! Reads an existing XLSX archive into the owned document model: content
//! types, the workbook part and its relationships, the sheet catalog, the
//! shared-string table and the `sheetData` of every worksheet.

mod relationships;
mod worksheet;

use log::{debug, warn};
use std::collections::BTreeSet;
use std::io::Cursor;
use zip::ZipArchive;

use crate::document::Document;
use crate::error::{Result, XlgenError};
use crate::namespaces::{
    is_shared_strings_relationship, is_worksheet_relationship, CT_WORKBOOK, REL_CHARTSHEET,
};
use crate::package::{
    part_dir, rels_path_for, resolve_target, Package, DEFAULT_WORKBOOK_PATH, ROOT_RELS_PATH,
};
use crate::shared_strings::SharedStringPool;
use crate::types::{Sheet, SheetKind, Workbook, Worksheet};

use relationships::{
    office_document_target, open_part, parse_catalog, parse_content_types, parse_relationships,
    parse_shared_strings,
};
use worksheet::parse_sheet_data;

/// Parse XLSX bytes into an editable [`Document`].
///
/// The bytes are kept so untouched parts can be copied through on save.
/// Anything that is not a readable spreadsheet package fails with
/// [`XlgenError::Format`].
pub fn parse(data: Vec<u8>) -> Result<Document> {
    let mut archive = ZipArchive::new(Cursor::new(data.as_slice()))
        .map_err(|e| XlgenError::Format(format!("not a ZIP package: {e}")))?;

    let content_types = parse_content_types(&mut archive)?;

    let root_rels = parse_relationships(&mut archive, ROOT_RELS_PATH)?;
    let workbook_path = match office_document_target(&root_rels) {
        Some(target) => resolve_target("", target),
        None => content_types
            .overrides()
            .find(|(_, ct)| *ct == CT_WORKBOOK)
            .map_or_else(|| DEFAULT_WORKBOOK_PATH.to_string(), |(part, _)| part.to_string()),
    };
    let workbook_dir = part_dir(&workbook_path).to_string();

    let entries = {
        let reader = open_part(&mut archive, &workbook_path)?.ok_or_else(|| {
            XlgenError::Format(format!("workbook part {workbook_path} is missing"))
        })?;
        parse_catalog(reader)?
    };

    let workbook_rels = parse_relationships(&mut archive, &rels_path_for(&workbook_path))?;

    let shared_strings_path = workbook_rels
        .iter()
        .find(|r| is_shared_strings_relationship(&r.rel_type))
        .map_or_else(
            || resolve_target(&workbook_dir, "sharedStrings.xml"),
            |r| resolve_target(&workbook_dir, &r.target),
        );
    let shared_strings = match open_part(&mut archive, &shared_strings_path)? {
        Some(reader) => SharedStringPool::from_entries(parse_shared_strings(reader)?),
        None => SharedStringPool::new(),
    };

    let mut sheets = Vec::with_capacity(entries.len());
    for entry in entries {
        let rel = workbook_rels
            .iter()
            .find(|r| r.id == entry.rel_id)
            .ok_or_else(|| {
                XlgenError::Format(format!(
                    "sheet '{}' references missing relationship '{}'",
                    entry.name, entry.rel_id
                ))
            })?;
        let part_path = resolve_target(&workbook_dir, &rel.target);
        let kind = if is_worksheet_relationship(&rel.rel_type) {
            SheetKind::Worksheet
        } else if rel.rel_type == REL_CHARTSHEET || rel.rel_type.ends_with("/chartsheet") {
            SheetKind::Chartsheet
        } else {
            warn!("sheet '{}' has relationship type {}", entry.name, rel.rel_type);
            SheetKind::Other
        };

        let worksheet = if kind == SheetKind::Worksheet {
            let reader = open_part(&mut archive, &part_path)?.ok_or_else(|| {
                XlgenError::Format(format!(
                    "worksheet part {part_path} for sheet '{}' is missing",
                    entry.name
                ))
            })?;
            parse_sheet_data(reader, &part_path)?
        } else {
            Worksheet::new()
        };

        sheets.push(Sheet {
            sheet_id: entry.sheet_id,
            name: entry.name,
            rel_id: entry.rel_id,
            state: entry.state,
            kind,
            part_path,
            worksheet,
        });
    }

    let reserved_parts: BTreeSet<String> = archive.file_names().map(str::to_string).collect();

    debug!(
        "loaded {workbook_path}: {} sheets, {} shared strings, {} parts",
        sheets.len(),
        shared_strings.len(),
        reserved_parts.len()
    );

    let workbook = Workbook::from_parts(sheets, workbook_rels, workbook_dir, reserved_parts);
    drop(archive);

    let package = Package {
        content_types,
        workbook_path,
        shared_strings_path,
        source: Some(data),
    };

    Ok(Document::from_parts(package, workbook, shared_strings))
}
