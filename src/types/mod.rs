//! Owned document model: cells, rows, worksheets and the sheet catalog.

mod cell;
mod workbook;
mod worksheet;

pub use cell::*;
pub use workbook::*;
pub use worksheet::*;
