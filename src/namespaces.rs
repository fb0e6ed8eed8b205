//! XML namespace, content-type and relationship-type constants for XLSX packages
//!
//! Writers always emit the Transitional forms. Readers accept the Strict forms
//! too, since Office 2013+ can save Strict conformance packages.

use quick_xml::events::BytesStart;

// =============================================================================
// Spreadsheet namespaces
// =============================================================================

/// Main spreadsheet namespace (Transitional conformance)
pub const NS_SPREADSHEET: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// Office document relationships namespace (the `r:` prefix in workbook.xml)
pub const NS_OFFICE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Office document relationships namespace (Strict conformance)
pub const NS_OFFICE_RELATIONSHIPS_STRICT: &str =
    "http://purl.oclc.org/ooxml/officeDocument/relationships";

// =============================================================================
// Package namespaces
// =============================================================================

/// Relationships namespace
pub const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Content types namespace
pub const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

// =============================================================================
// Content types
// =============================================================================

pub const CT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const CT_XML: &str = "application/xml";
pub const CT_WORKBOOK: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
pub const CT_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
pub const CT_SHARED_STRINGS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
pub const CT_STYLES: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";

// =============================================================================
// Office document relationship types
// =============================================================================

/// Relationship type for worksheets
pub const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";

/// Relationship type for chartsheets
pub const REL_CHARTSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet";

/// Relationship type for styles
pub const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

/// Relationship type for shared strings
pub const REL_SHARED_STRINGS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";

/// Relationship type for workbook (from root .rels)
pub const REL_WORKBOOK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

// =============================================================================
// Strict OOXML relationship types (Office 2013+)
// =============================================================================

/// Strict relationship type for worksheets
pub const REL_WORKSHEET_STRICT: &str =
    "http://purl.oclc.org/ooxml/officeDocument/relationships/worksheet";

/// Strict relationship type for styles
pub const REL_STYLES_STRICT: &str =
    "http://purl.oclc.org/ooxml/officeDocument/relationships/styles";

/// Strict relationship type for shared strings
pub const REL_SHARED_STRINGS_STRICT: &str =
    "http://purl.oclc.org/ooxml/officeDocument/relationships/sharedStrings";

/// Strict relationship type for the workbook
pub const REL_WORKBOOK_STRICT: &str =
    "http://purl.oclc.org/ooxml/officeDocument/relationships/officeDocument";

// =============================================================================
// Helper functions for namespace-aware parsing
// =============================================================================

/// Check if a namespace URI is the office relationships namespace (either form).
pub fn is_office_relationships_namespace(uri: &[u8]) -> bool {
    uri == NS_OFFICE_RELATIONSHIPS.as_bytes() || uri == NS_OFFICE_RELATIONSHIPS_STRICT.as_bytes()
}

/// Get a relationship ID attribute (commonly `r:id`).
///
/// Accepts `r:id`, any other prefixed `*:id`, or plain `id`.
pub fn get_rel_id(e: &BytesStart) -> Option<String> {
    for attr in e.attributes().flatten() {
        let key = attr.key.as_ref();
        if key == b"id" || key == b"r:id" || (key.len() > 3 && key.ends_with(b":id")) {
            return std::str::from_utf8(&attr.value).ok().map(|s| s.to_string());
        }
    }
    None
}

/// Check if a relationship type is for worksheets, handling both
/// transitional and strict OOXML variants.
pub fn is_worksheet_relationship(rel_type: &str) -> bool {
    rel_type == REL_WORKSHEET || rel_type == REL_WORKSHEET_STRICT || rel_type.ends_with("/worksheet")
}

/// Check if a relationship type is for styles.
pub fn is_styles_relationship(rel_type: &str) -> bool {
    rel_type == REL_STYLES || rel_type == REL_STYLES_STRICT || rel_type.ends_with("/styles")
}

/// Check if a relationship type is for shared strings.
pub fn is_shared_strings_relationship(rel_type: &str) -> bool {
    rel_type == REL_SHARED_STRINGS
        || rel_type == REL_SHARED_STRINGS_STRICT
        || rel_type.ends_with("/sharedStrings")
}

/// Check if a relationship type points at the main workbook part.
pub fn is_workbook_relationship(rel_type: &str) -> bool {
    rel_type == REL_WORKBOOK || rel_type == REL_WORKBOOK_STRICT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_type_matching() {
        // Transitional conformance
        assert!(is_worksheet_relationship(REL_WORKSHEET));
        assert!(is_styles_relationship(REL_STYLES));
        assert!(is_shared_strings_relationship(REL_SHARED_STRINGS));
        assert!(is_workbook_relationship(REL_WORKBOOK));

        // Strict conformance
        assert!(is_worksheet_relationship(REL_WORKSHEET_STRICT));
        assert!(is_styles_relationship(REL_STYLES_STRICT));
        assert!(is_shared_strings_relationship(REL_SHARED_STRINGS_STRICT));
        assert!(is_workbook_relationship(REL_WORKBOOK_STRICT));

        assert!(is_office_relationships_namespace(NS_OFFICE_RELATIONSHIPS.as_bytes()));
        assert!(is_office_relationships_namespace(NS_OFFICE_RELATIONSHIPS_STRICT.as_bytes()));
        assert!(!is_office_relationships_namespace(NS_RELATIONSHIPS.as_bytes()));

        // Chartsheets are not worksheets
        assert!(!is_worksheet_relationship(
            "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet"
        ));
    }
}
