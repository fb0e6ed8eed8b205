//! Patch an opened XLSX archive with the parts the model changed.
//!
//! Unmodified entries are copied via `raw_copy_file` (zero recompression cost).
//! Regenerated parts replace their original entry in place; parts that did
//! not exist before are appended at the end.

use log::debug;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use zip::{ZipArchive, ZipWriter};

use crate::error::Result;
use crate::package::{Package, CONTENT_TYPES_PATH};
use crate::shared_strings::SharedStringPool;
use crate::types::Workbook;

use super::parts::{
    write_sheets_element, write_shared_strings_xml, write_workbook_rels, WORKBOOK_CHILD_ORDER,
};
use super::sheet_writer::{
    write_dimension, write_sheet_data, write_sheet_xml, WORKSHEET_CHILD_ORDER,
};
use super::xml_patch::{append_shared_strings, replace_children, Replacement};
use super::{shared_string_cell_count, SaveOptions};

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<Vec<u8>>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
            file.read_to_end(&mut data)?;
            Ok(Some(data))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Collect the regenerated parts, in the order new parts should be appended.
fn changed_parts<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    package: &Package,
    workbook: &Workbook,
    shared_strings: &SharedStringPool,
) -> Result<Vec<(String, Vec<u8>)>> {
    let mut parts = Vec::new();

    let has_sst_part = archive.by_name(&package.shared_strings_path).is_ok();
    let new_sst_part = shared_strings.is_dirty() && !has_sst_part;

    if workbook.is_catalog_dirty() || new_sst_part {
        let mut content_types = package.content_types.clone();
        content_types.ensure_model_parts(
            workbook
                .sheets
                .iter()
                .filter(|s| s.is_worksheet())
                .map(|s| s.part_path.as_str()),
            shared_strings
                .is_dirty()
                .then_some(package.shared_strings_path.as_str()),
        );
        parts.push((CONTENT_TYPES_PATH.to_string(), content_types.to_xml().into_bytes()));
    }

    if workbook.is_catalog_dirty() {
        let original = read_entry(archive, &package.workbook_path)?.unwrap_or_default();
        let patched = replace_children(
            &original,
            &package.workbook_path,
            &[Replacement::new(b"sheets", WORKBOOK_CHILD_ORDER, |scope| {
                write_sheets_element(workbook, scope)
            })],
        )?;
        parts.push((package.workbook_path.clone(), patched));
        parts.push((
            package.workbook_rels_path(),
            write_workbook_rels(workbook).into_bytes(),
        ));
    }

    if shared_strings.is_dirty() {
        let count = shared_string_cell_count(workbook);
        let xml = match read_entry(archive, &package.shared_strings_path)? {
            Some(original) => append_shared_strings(
                &original,
                &package.shared_strings_path,
                shared_strings.appended(),
                count,
                shared_strings.len(),
            )?,
            None => write_shared_strings_xml(shared_strings, count).into_bytes(),
        };
        parts.push((package.shared_strings_path.clone(), xml));
    }

    for sheet in workbook.sheets.iter().filter(|s| s.is_worksheet()) {
        if !sheet.worksheet.is_dirty() {
            continue;
        }
        let xml = match read_entry(archive, &sheet.part_path)? {
            Some(original) => replace_children(
                &original,
                &sheet.part_path,
                &[
                    Replacement::new(b"dimension", WORKSHEET_CHILD_ORDER, |scope| {
                        write_dimension(&sheet.worksheet, &scope.prefix)
                    }),
                    Replacement::new(b"sheetData", WORKSHEET_CHILD_ORDER, |scope| {
                        let mut sheet_data = String::new();
                        write_sheet_data(&mut sheet_data, &sheet.worksheet, &scope.prefix);
                        sheet_data
                    }),
                ],
            )?,
            None => write_sheet_xml(&sheet.worksheet).into_bytes(),
        };
        parts.push((sheet.part_path.clone(), xml));
    }

    Ok(parts)
}

/// Patch the original XLSX bytes with every part the model changed.
///
/// Returns the new XLSX file as `Vec<u8>`.
pub(crate) fn patch_zip(
    original_data: &[u8],
    package: &Package,
    workbook: &Workbook,
    shared_strings: &SharedStringPool,
    options: &SaveOptions,
) -> Result<Vec<u8>> {
    let cursor = Cursor::new(original_data);
    let mut archive = ZipArchive::new(cursor)?;

    let parts = changed_parts(&mut archive, package, workbook, shared_strings)?;
    let mut pending: HashMap<&str, &[u8]> = parts
        .iter()
        .map(|(name, data)| (name.as_str(), data.as_slice()))
        .collect();
    debug!("patching package: {} regenerated parts", parts.len());

    let buf: Vec<u8> = Vec::with_capacity(original_data.len());
    let mut writer = ZipWriter::new(Cursor::new(buf));
    let file_options = options.file_options();

    // Copy all entries, replacing regenerated ones
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();

        if let Some(data) = pending.remove(name.as_str()) {
            writer.start_file(name.as_str(), file_options)?;
            writer.write_all(data)?;
            continue;
        }

        // Pass through unmodified entry (raw copy, no re-compression)
        writer.raw_copy_file(entry)?;
    }

    // Parts that are new to the package
    for (name, data) in &parts {
        if pending.remove(name.as_str()).is_some() {
            writer.start_file(name.as_str(), file_options)?;
            writer.write_all(data)?;
        }
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
