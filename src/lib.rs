//! xlgen - XLSX spreadsheet writer
//!
//! Builds OOXML spreadsheet packages from tabular data and edits existing
//! ones in place:
//! - Deduplicated shared-string table
//! - Rows and cells kept in spreadsheet order
//! - Sheet catalog with unique ids and default names
//! - Opened packages saved by patching, untouched parts copied byte-for-byte
//!
//! # Usage
//!
//! ```no_run
//! use xlgen::{assembler, Dataset};
//!
//! let dataset = Dataset::new(
//!     vec!["A".into(), "B".into()],
//!     vec![vec!["1".into(), "2".into()], vec!["3".into(), "4".into()]],
//! );
//! assembler::export_to_file("report.xlsx", &dataset)?;
//! assembler::insert_text("report.xlsx", "test")?;
//! # Ok::<(), xlgen::XlgenError>(())
//! ```

pub mod assembler;
pub mod cell_ref;
pub mod dataset;
pub mod document;
pub mod error;
pub mod export;
pub mod namespaces;
pub mod package;
pub mod parser;
pub mod shared_strings;
pub mod types;
pub mod xml_helpers;

pub use dataset::Dataset;
pub use document::Document;
pub use error::{Result, XlgenError};
pub use export::{PartCompression, SaveOptions};
pub use shared_strings::SharedStringPool;
pub use types::*;

/// Parse an XLSX file and return its sheet catalog as a JSON string.
///
/// # Errors
/// Returns an error if the data is not a readable spreadsheet package.
pub fn catalog_json(data: &[u8]) -> Result<String> {
    let doc = Document::from_bytes(data.to_vec())?;
    Ok(serde_json::to_string_pretty(doc.sheets())?)
}

