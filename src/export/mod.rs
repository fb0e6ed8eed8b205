//! XLSX export pipeline.
//!
//! Fresh documents are written part by part. Opened documents are saved by
//! patching the original ZIP archive: only the parts the model changed are
//! regenerated, everything else is passed through byte-identical.

pub(crate) mod package_writer;
pub(crate) mod parts;
pub(crate) mod sheet_writer;
pub(crate) mod xml_patch;
pub(crate) mod zip_patcher;

use zip::write::FileOptions;
use zip::CompressionMethod;

use crate::error::Result;
use crate::package::Package;
use crate::shared_strings::SharedStringPool;
use crate::types::Workbook;

/// Compression used for the ZIP entries the exporter writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartCompression {
    #[default]
    Deflated,
    Stored,
}

/// Options for serializing a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Compression for regenerated parts. Copied parts keep their own.
    pub compression: PartCompression,
}

impl SaveOptions {
    pub fn stored() -> Self {
        Self {
            compression: PartCompression::Stored,
        }
    }

    pub(crate) fn file_options(&self) -> FileOptions {
        let method = match self.compression {
            PartCompression::Deflated => CompressionMethod::Deflated,
            PartCompression::Stored => CompressionMethod::Stored,
        };
        FileOptions::default().compression_method(method)
    }
}

/// Number of cells, across all worksheets, that point into the shared-string
/// table. Written as the table's `count` attribute.
pub(crate) fn shared_string_cell_count(workbook: &Workbook) -> usize {
    workbook
        .sheets
        .iter()
        .flat_map(|s| s.worksheet.rows())
        .flat_map(|r| r.cells())
        .filter(|c| c.shared_string_index().is_some())
        .count()
}

/// Serialize a document to XLSX bytes.
pub(crate) fn save_xlsx(
    package: &Package,
    workbook: &Workbook,
    shared_strings: &SharedStringPool,
    options: &SaveOptions,
) -> Result<Vec<u8>> {
    match package.source.as_deref() {
        Some(original) => {
            zip_patcher::patch_zip(original, package, workbook, shared_strings, options)
        }
        None => package_writer::write_package(package, workbook, shared_strings, options),
    }
}
