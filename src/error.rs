//! Structured error types for xlgen.

/// All errors that can occur while building, loading or saving a package.
#[derive(Debug, thiserror::Error)]
pub enum XlgenError {
    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Dataset JSON could not be decoded.
    #[error("Dataset JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or out-of-range cell coordinates.
    #[error("Invalid cell reference: {0}")]
    CellRef(String),

    /// The input is not a usable spreadsheet package.
    #[error("Document format: {0}")]
    Format(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for string errors.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlgenError>;

impl From<String> for XlgenError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for XlgenError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}
