//! Test fixtures for building XLSX packages in memory.
//!
//! These produce packages the way another spreadsheet application would,
//! so tests can check that saving keeps what the library does not model.
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const CT_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
pub const CT_CHARTSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.chartsheet+xml";
pub const CT_SST: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
pub const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub const REL_CHARTSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/chartsheet";
pub const REL_SST: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
pub const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Value of a fixture cell.
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Shared string, stored through the fixture's string table.
    Shared(String),
    Number(String),
    Formula(String, String),
}

#[derive(Debug, Clone)]
pub struct SheetBuilder {
    pub name: String,
    pub sheet_id: u32,
    pub chartsheet: bool,
    pub state: Option<String>,
    pub cells: Vec<(String, CellValue)>,
    /// Markup placed after `<sheetData>`, such as `<mergeCells>`.
    pub trailer: String,
    /// Raw `<row>` markup used instead of `cells`.
    pub rows_xml: Option<String>,
    /// Whether the part has a `<sheetData>` element at all.
    pub sheet_data: bool,
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str, sheet_id: u32) -> Self {
        Self {
            name: name.to_string(),
            sheet_id,
            chartsheet: false,
            state: None,
            cells: Vec::new(),
            trailer: String::new(),
            rows_xml: None,
            sheet_data: true,
        }
    }

    #[must_use]
    pub fn chartsheet(mut self) -> Self {
        self.chartsheet = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.state = Some("hidden".to_string());
        self
    }

    #[must_use]
    pub fn text(mut self, reference: &str, text: &str) -> Self {
        self.cells
            .push((reference.to_string(), CellValue::Shared(text.to_string())));
        self
    }

    #[must_use]
    pub fn number(mut self, reference: &str, value: &str) -> Self {
        self.cells
            .push((reference.to_string(), CellValue::Number(value.to_string())));
        self
    }

    #[must_use]
    pub fn formula(mut self, reference: &str, formula: &str, cached: &str) -> Self {
        self.cells.push((
            reference.to_string(),
            CellValue::Formula(formula.to_string(), cached.to_string()),
        ));
        self
    }

    #[must_use]
    pub fn trailer(mut self, markup: &str) -> Self {
        self.trailer = markup.to_string();
        self
    }

    /// Use hand-written `<row>` markup inside `<sheetData>`. Element names
    /// must carry the package prefix themselves.
    #[must_use]
    pub fn rows_xml(mut self, markup: &str) -> Self {
        self.rows_xml = Some(markup.to_string());
        self
    }

    /// Leave `<sheetData>` out of the part, as some producers do for blank
    /// sheets.
    #[must_use]
    pub fn without_sheet_data(mut self) -> Self {
        self.sheet_data = false;
        self
    }
}

/// Builder for complete XLSX packages.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    shared_strings: bool,
    extra_parts: Vec<(String, String, String)>,
    /// Element prefix for the main namespace, with colon; empty for the
    /// default namespace.
    prefix: String,
    omit_sheets: bool,
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Write a shared-string part even when no cell uses it.
    #[must_use]
    pub fn with_shared_strings(mut self) -> Self {
        self.shared_strings = true;
        self
    }

    /// Bind the main namespace to `prefix` in every spreadsheet part, the way
    /// the OpenXML SDK writes `<x:workbook xmlns:x="...">`.
    #[must_use]
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.prefix = format!("{prefix}:");
        self
    }

    /// Write a workbook part with no `<sheets>` element and no relationships
    /// namespace declaration. Only meaningful without sheets.
    #[must_use]
    pub fn without_sheets_element(mut self) -> Self {
        self.omit_sheets = true;
        self
    }

    /// Add a part the library does not model, with its content type.
    #[must_use]
    pub fn extra_part(mut self, name: &str, content_type: &str, body: &str) -> Self {
        self.extra_parts
            .push((name.to_string(), content_type.to_string(), body.to_string()));
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut strings: Vec<String> = Vec::new();
        for sheet in &self.sheets {
            for (_, value) in &sheet.cells {
                if let CellValue::Shared(s) = value {
                    if !strings.contains(s) {
                        strings.push(s.clone());
                    }
                }
            }
        }
        let write_sst = self.shared_strings || !strings.is_empty();

        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        // [Content_Types].xml
        let mut ct = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        for (i, sheet) in self.sheets.iter().enumerate() {
            let (dir, content_type) = part_kind(sheet);
            ct.push_str(&format!(
                r#"<Override PartName="/xl/{dir}/sheet{}.xml" ContentType="{content_type}"/>"#,
                i + 1
            ));
        }
        if write_sst {
            ct.push_str(&format!(
                r#"<Override PartName="/xl/sharedStrings.xml" ContentType="{CT_SST}"/>"#
            ));
        }
        for (name, content_type, _) in &self.extra_parts {
            ct.push_str(&format!(
                r#"<Override PartName="/{name}" ContentType="{content_type}"/>"#
            ));
        }
        ct.push_str("</Types>");
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(ct.as_bytes()).unwrap();

        // _rels/.rels
        zip.start_file("_rels/.rels", options).unwrap();
        zip.write_all(
            br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        )
        .unwrap();

        // xl/workbook.xml, with markup around the catalog that must survive
        let p = self.prefix.as_str();
        let r_decl = if self.omit_sheets {
            String::new()
        } else {
            format!(r#" xmlns:r="{NS_R}""#)
        };
        let mut wb = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<{p}workbook {}{r_decl}><{p}workbookPr defaultThemeVersion="124226"/><{p}bookViews><{p}workbookView activeTab="0"/></{p}bookViews>"#,
            namespace_decl(p)
        );
        if !self.omit_sheets {
            wb.push_str(&format!("<{p}sheets>"));
            for (i, sheet) in self.sheets.iter().enumerate() {
                wb.push_str(&format!(
                    r#"<{p}sheet name="{}" sheetId="{}""#,
                    sheet.name, sheet.sheet_id
                ));
                if let Some(ref state) = sheet.state {
                    wb.push_str(&format!(r#" state="{state}""#));
                }
                wb.push_str(&format!(r#" r:id="rId{}"/>"#, i + 1));
            }
            wb.push_str(&format!("</{p}sheets>"));
        }
        wb.push_str(&format!(r#"<{p}calcPr calcId="145621"/></{p}workbook>"#));
        zip.start_file("xl/workbook.xml", options).unwrap();
        zip.write_all(wb.as_bytes()).unwrap();

        // xl/_rels/workbook.xml.rels
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, sheet) in self.sheets.iter().enumerate() {
            let rel_type = if sheet.chartsheet {
                REL_CHARTSHEET
            } else {
                REL_WORKSHEET
            };
            let (dir, _) = part_kind(sheet);
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{rel_type}" Target="{dir}/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }
        if write_sst {
            rels.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="{REL_SST}" Target="sharedStrings.xml"/>"#,
                self.sheets.len() + 1
            ));
        }
        rels.push_str("</Relationships>");
        zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
        zip.write_all(rels.as_bytes()).unwrap();

        // Sheets
        for (i, sheet) in self.sheets.iter().enumerate() {
            let (dir, _) = part_kind(sheet);
            zip.start_file(format!("xl/{dir}/sheet{}.xml", i + 1), options)
                .unwrap();
            zip.write_all(generate_sheet(sheet, &strings, p).as_bytes())
                .unwrap();
        }

        if write_sst {
            let mut sst = format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<{p}sst {} count="{}" uniqueCount="{}">"#,
                namespace_decl(p),
                strings.len(),
                strings.len()
            );
            for s in &strings {
                sst.push_str(&format!("<{p}si><{p}t>{s}</{p}t></{p}si>"));
            }
            sst.push_str(&format!("</{p}sst>"));
            zip.start_file("xl/sharedStrings.xml", options).unwrap();
            zip.write_all(sst.as_bytes()).unwrap();
        }

        for (name, _, body) in &self.extra_parts {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }
}

fn part_kind(sheet: &SheetBuilder) -> (&'static str, &'static str) {
    if sheet.chartsheet {
        ("chartsheets", CT_CHARTSHEET)
    } else {
        ("worksheets", CT_WORKSHEET)
    }
}

/// `xmlns` or `xmlns:x` declaration of the main namespace for prefix `p`.
fn namespace_decl(p: &str) -> String {
    match p.strip_suffix(':') {
        Some(name) => format!(r#"xmlns:{name}="{NS_MAIN}""#),
        None => format!(r#"xmlns="{NS_MAIN}""#),
    }
}

fn generate_sheet(sheet: &SheetBuilder, strings: &[String], p: &str) -> String {
    if sheet.chartsheet {
        return format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<{p}chartsheet {}><{p}sheetViews><{p}sheetView workbookViewId="0"/></{p}sheetViews></{p}chartsheet>"#,
            namespace_decl(p)
        );
    }

    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<{p}worksheet {} xmlns:r="{NS_R}"><{p}dimension ref="A1"/><{p}sheetViews><{p}sheetView workbookViewId="0"/></{p}sheetViews><{p}sheetFormatPr defaultRowHeight="15"/>"#,
        namespace_decl(p)
    );
    if !sheet.sheet_data {
        xml.push_str(&sheet.trailer);
        xml.push_str(&format!(
            r#"<{p}pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></{p}worksheet>"#
        ));
        return xml;
    }
    xml.push_str(&format!("<{p}sheetData>"));
    if let Some(ref rows) = sheet.rows_xml {
        xml.push_str(rows);
    }

    // Group cells by row number, in insertion order within a row
    let mut rows: Vec<(u32, Vec<String>)> = Vec::new();
    for (reference, value) in &sheet.cells {
        let row: u32 = reference
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .unwrap();
        let cell = match value {
            CellValue::Shared(s) => {
                let idx = strings.iter().position(|x| x == s).unwrap();
                format!(r#"<{p}c r="{reference}" t="s"><{p}v>{idx}</{p}v></{p}c>"#)
            }
            CellValue::Number(n) => {
                format!(r#"<{p}c r="{reference}"><{p}v>{n}</{p}v></{p}c>"#)
            }
            CellValue::Formula(f, v) => {
                format!(r#"<{p}c r="{reference}"><{p}f>{f}</{p}f><{p}v>{v}</{p}v></{p}c>"#)
            }
        };
        match rows.iter_mut().find(|(r, _)| *r == row) {
            Some((_, cells)) => cells.push(cell),
            None => rows.push((row, vec![cell])),
        }
    }
    for (row, cells) in &rows {
        xml.push_str(&format!(r#"<{p}row r="{row}">"#));
        for cell in cells {
            xml.push_str(cell);
        }
        xml.push_str(&format!("</{p}row>"));
    }

    xml.push_str(&format!("</{p}sheetData>"));
    xml.push_str(&sheet.trailer);
    xml.push_str(&format!(
        r#"<{p}pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></{p}worksheet>"#
    ));
    xml
}
