//! Package-level state that is not part of the sheet model: content types,
//! the location of the workbook and shared-string parts, and the original
//! archive bytes when the document was opened from an existing file.

use std::collections::BTreeMap;

use crate::namespaces::{
    CT_RELATIONSHIPS, CT_SHARED_STRINGS, CT_STYLES, CT_WORKBOOK, CT_WORKSHEET, CT_XML,
    NS_CONTENT_TYPES,
};
use crate::xml_helpers::xml_escape;

pub const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
pub const ROOT_RELS_PATH: &str = "_rels/.rels";
pub const DEFAULT_WORKBOOK_PATH: &str = "xl/workbook.xml";
pub const DEFAULT_SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
pub const DEFAULT_STYLES_PATH: &str = "xl/styles.xml";

/// `[Content_Types].xml`: extension defaults plus per-part overrides.
///
/// Part names are stored without the leading slash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content types of a freshly generated package, before sheets are added.
    pub fn fresh() -> Self {
        let mut ct = Self::new();
        ct.set_default("rels", CT_RELATIONSHIPS);
        ct.set_default("xml", CT_XML);
        ct.set_override(DEFAULT_WORKBOOK_PATH, CT_WORKBOOK);
        ct.set_override(DEFAULT_STYLES_PATH, CT_STYLES);
        ct
    }

    pub fn set_default(&mut self, extension: &str, content_type: &str) {
        self.defaults
            .insert(extension.to_ascii_lowercase(), content_type.to_string());
    }

    pub fn set_override(&mut self, part_name: &str, content_type: &str) {
        self.overrides.insert(
            part_name.trim_start_matches('/').to_string(),
            content_type.to_string(),
        );
    }

    /// Overrides as `(part name, content type)`, sorted by part name.
    pub fn overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.overrides.iter().map(|(p, ct)| (p.as_str(), ct.as_str()))
    }

    /// Content type for a part: its override, else its extension default.
    pub fn content_type_of(&self, part_name: &str) -> Option<&str> {
        let part_name = part_name.trim_start_matches('/');
        if let Some(ct) = self.overrides.get(part_name) {
            return Some(ct);
        }
        let ext = part_name.rsplit_once('.')?.1.to_ascii_lowercase();
        self.defaults.get(&ext).map(String::as_str)
    }

    /// Register the parts the model writes so readers can find them.
    pub(crate) fn ensure_model_parts<'a>(
        &mut self,
        worksheet_parts: impl Iterator<Item = &'a str>,
        shared_strings_part: Option<&str>,
    ) {
        for part in worksheet_parts {
            if self.content_type_of(part) != Some(CT_WORKSHEET) {
                self.set_override(part, CT_WORKSHEET);
            }
        }
        if let Some(part) = shared_strings_part {
            if self.content_type_of(part) != Some(CT_SHARED_STRINGS) {
                self.set_override(part, CT_SHARED_STRINGS);
            }
        }
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(r#"<Types xmlns="{NS_CONTENT_TYPES}">"#));
        for (ext, ct) in &self.defaults {
            xml.push_str(&format!(
                r#"<Default Extension="{}" ContentType="{}"/>"#,
                xml_escape(ext),
                xml_escape(ct)
            ));
        }
        for (part, ct) in &self.overrides {
            xml.push_str(&format!(
                r#"<Override PartName="/{}" ContentType="{}"/>"#,
                xml_escape(part),
                xml_escape(ct)
            ));
        }
        xml.push_str("</Types>");
        xml
    }
}

/// Where the workbook-level parts live, and the archive they were read from.
#[derive(Debug, Clone)]
pub struct Package {
    pub(crate) content_types: ContentTypes,
    pub(crate) workbook_path: String,
    pub(crate) shared_strings_path: String,
    /// Original archive bytes for opened packages.
    pub(crate) source: Option<Vec<u8>>,
}

impl Default for Package {
    fn default() -> Self {
        Self::fresh()
    }
}

impl Package {
    pub fn fresh() -> Self {
        Self {
            content_types: ContentTypes::fresh(),
            workbook_path: DEFAULT_WORKBOOK_PATH.to_string(),
            shared_strings_path: DEFAULT_SHARED_STRINGS_PATH.to_string(),
            source: None,
        }
    }

    pub fn is_opened(&self) -> bool {
        self.source.is_some()
    }

    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    pub fn workbook_path(&self) -> &str {
        &self.workbook_path
    }

    pub fn shared_strings_path(&self) -> &str {
        &self.shared_strings_path
    }

    /// Relationships part of the workbook, e.g. `xl/_rels/workbook.xml.rels`.
    pub fn workbook_rels_path(&self) -> String {
        rels_path_for(&self.workbook_path)
    }
}

/// Directory of a part name including the trailing slash (`xl/`), or `""`
/// for parts at the package root.
pub fn part_dir(part_name: &str) -> &str {
    match part_name.rfind('/') {
        Some(idx) => part_name.get(..=idx).unwrap_or(""),
        None => "",
    }
}

/// Relationships part for a source part: `xl/workbook.xml` ->
/// `xl/_rels/workbook.xml.rels`.
pub fn rels_path_for(part_name: &str) -> String {
    let dir = part_dir(part_name);
    let file = part_name.get(dir.len()..).unwrap_or(part_name);
    format!("{dir}_rels/{file}.rels")
}

/// Resolve a relationship target against the directory of its source part.
///
/// Absolute targets (`/xl/...`) are taken from the package root; `.` and
/// `..` segments are collapsed.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{base_dir}{target}"),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Express `part_name` as a target relative to `base_dir` when it lies
/// underneath it, else as an absolute target.
pub fn relative_target(base_dir: &str, part_name: &str) -> String {
    match part_name.strip_prefix(base_dir) {
        Some(rel) if !base_dir.is_empty() => rel.to_string(),
        _ => format!("/{part_name}"),
    }
}
