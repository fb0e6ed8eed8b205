//! Write a complete package for a document that was not opened from a file.

use log::{debug, warn};
use std::io::{Cursor, Write};
use zip::ZipWriter;

use crate::error::Result;
use crate::package::{Package, CONTENT_TYPES_PATH, DEFAULT_STYLES_PATH, ROOT_RELS_PATH};
use crate::shared_strings::SharedStringPool;
use crate::types::Workbook;

use super::parts::{
    write_root_rels, write_shared_strings_xml, write_styles_xml, write_workbook_rels,
    write_workbook_xml,
};
use super::sheet_writer::write_sheet_xml;
use super::{shared_string_cell_count, SaveOptions};

/// Write every part of a fresh package.
pub(crate) fn write_package(
    package: &Package,
    workbook: &Workbook,
    shared_strings: &SharedStringPool,
    options: &SaveOptions,
) -> Result<Vec<u8>> {
    if workbook.sheets.is_empty() {
        warn!("writing a workbook with an empty sheet catalog");
    }

    let mut content_types = package.content_types.clone();
    content_types.ensure_model_parts(
        workbook
            .sheets
            .iter()
            .filter(|s| s.is_worksheet())
            .map(|s| s.part_path.as_str()),
        Some(&package.shared_strings_path),
    );

    let mut parts: Vec<(String, String)> = vec![
        (CONTENT_TYPES_PATH.to_string(), content_types.to_xml()),
        (ROOT_RELS_PATH.to_string(), write_root_rels(&package.workbook_path)),
        (package.workbook_path.clone(), write_workbook_xml(workbook)),
        (package.workbook_rels_path(), write_workbook_rels(workbook)),
        (DEFAULT_STYLES_PATH.to_string(), write_styles_xml()),
        (
            package.shared_strings_path.clone(),
            write_shared_strings_xml(shared_strings, shared_string_cell_count(workbook)),
        ),
    ];
    for sheet in workbook.sheets.iter().filter(|s| s.is_worksheet()) {
        parts.push((sheet.part_path.clone(), write_sheet_xml(&sheet.worksheet)));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = options.file_options();
    for (name, xml) in &parts {
        writer.start_file(name.as_str(), file_options)?;
        writer.write_all(xml.as_bytes())?;
    }
    let cursor = writer.finish()?;

    debug!(
        "wrote fresh package: {} parts, {} sheets, {} shared strings",
        parts.len(),
        workbook.sheets.len(),
        shared_strings.len()
    );
    Ok(cursor.into_inner())
}
