//! [`Workbook`] -> package.
//!
//! Output is a minimal, self-consistent package: one styles part, one shared
//! string table, and per sheet its worksheet part plus optional comments and
//! legacy drawing. Formulas are written without cached values and the
//! workbook asks for a full recalculation on load.

mod comments;
mod styles;
mod worksheet;

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;

use dcfm_model::Workbook;
use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{XlsxError, XlsxResult};
use crate::package::{
    REL_NS, REL_TYPE_COMMENTS, REL_TYPE_HYPERLINK, REL_TYPE_OFFICE_DOCUMENT,
    REL_TYPE_SHARED_STRINGS, REL_TYPE_STYLES, REL_TYPE_VML_DRAWING, REL_TYPE_WORKSHEET,
};
use crate::xml::{close, Tag, MAIN_NS};

use styles::StyleTable;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const PACKAGE_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CT_SHARED_STRINGS: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
const CT_COMMENTS: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml";
const CT_VML: &str = "application/vnd.openxmlformats-officedocument.vmlDrawing";
const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";

/// Serialize a workbook into `.xlsx` bytes.
pub fn write_workbook_to_vec(workbook: &Workbook) -> XlsxResult<Vec<u8>> {
    if workbook.is_empty() {
        return Err(XlsxError::malformed(
            "xl/workbook.xml",
            "a workbook must contain at least one sheet",
        ));
    }

    let mut styles = StyleTable::new(workbook.default_font.as_ref());
    let mut strings = SharedStrings::default();
    let mut parts: Vec<(String, String)> = Vec::new();
    let mut overrides: Vec<(String, &'static str)> = Vec::new();
    let mut has_vml = false;

    let active = active_tab(workbook);
    for (index, sheet) in workbook.sheets().iter().enumerate() {
        let number = index + 1;
        let sheet_part = format!("xl/worksheets/sheet{number}.xml");
        let mut ctx = worksheet::WriteContext {
            styles: &mut styles,
            strings: &mut strings,
            date1904: workbook.date1904,
            selected: index == active,
        };
        let written = worksheet::write_worksheet(&mut ctx, sheet);

        let mut rels = Relationships::default();
        for url in &written.external_links {
            rels.push_external(REL_TYPE_HYPERLINK, url);
        }
        let mut xml = written.xml;
        if !written.comments.is_empty() {
            let comments_part = format!("xl/comments{number}.xml");
            let vml_part = format!("xl/drawings/vmlDrawing{number}.vml");
            rels.push(REL_TYPE_COMMENTS, &format!("../comments{number}.xml"));
            let vml_id = rels.push(REL_TYPE_VML_DRAWING, &format!("../drawings/vmlDrawing{number}.vml"));
            // legacyDrawing is the last element the worksheet writes.
            let end = "</worksheet>";
            let body_len = xml.len() - end.len();
            xml.truncate(body_len);
            Tag::new("legacyDrawing").attr("r:id", &vml_id).empty(&mut xml);
            xml.push_str(end);

            parts.push((comments_part.clone(), comments::comments_xml(&written.comments)));
            parts.push((vml_part, comments::vml_xml(&written.comments)));
            overrides.push((comments_part, CT_COMMENTS));
            has_vml = true;
        }
        if !rels.is_empty() {
            parts.push((crate::package::rels_for_part(&sheet_part), rels.to_xml()));
        }
        debug!(sheet = sheet.name(), part = %sheet_part, "wrote worksheet");
        overrides.push((sheet_part.clone(), CT_WORKSHEET));
        parts.push((sheet_part, xml));
    }

    let mut workbook_rels = Relationships::default();
    for index in 0..workbook.len() {
        workbook_rels.push(REL_TYPE_WORKSHEET, &format!("worksheets/sheet{}.xml", index + 1));
    }
    workbook_rels.push(REL_TYPE_STYLES, "styles.xml");
    workbook_rels.push(REL_TYPE_SHARED_STRINGS, "sharedStrings.xml");

    let mut root_rels = Relationships::default();
    root_rels.push(REL_TYPE_OFFICE_DOCUMENT, "xl/workbook.xml");

    overrides.push(("xl/workbook.xml".to_string(), CT_WORKBOOK));
    overrides.push(("xl/styles.xml".to_string(), CT_STYLES));
    overrides.push(("xl/sharedStrings.xml".to_string(), CT_SHARED_STRINGS));

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    let mut put = |name: &str, body: &str| -> XlsxResult<()> {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
        Ok(())
    };

    put("[Content_Types].xml", &content_types_xml(&overrides, has_vml))?;
    put("_rels/.rels", &root_rels.to_xml())?;
    put("xl/workbook.xml", &workbook_xml(workbook))?;
    put("xl/_rels/workbook.xml.rels", &workbook_rels.to_xml())?;
    put("xl/styles.xml", &styles.to_xml())?;
    put("xl/sharedStrings.xml", &strings.to_xml())?;
    for (name, body) in &parts {
        put(name, body)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Serialize a workbook and write it to `path`.
pub fn write_workbook_to_path(workbook: &Workbook, path: impl AsRef<Path>) -> XlsxResult<()> {
    let bytes = write_workbook_to_vec(workbook)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

/// First visible sheet. A workbook needs one, so when every sheet is hidden
/// the first is shown.
fn active_tab(workbook: &Workbook) -> usize {
    workbook
        .sheets()
        .iter()
        .position(|s| s.visibility.is_visible())
        .unwrap_or(0)
}

fn workbook_xml(workbook: &Workbook) -> String {
    let mut out = String::from(XML_DECL);
    out.push('\n');
    Tag::new("workbook")
        .attr("xmlns", MAIN_NS)
        .attr("xmlns:r", REL_NS)
        .open(&mut out);
    Tag::new("workbookPr").flag("date1904", workbook.date1904).empty(&mut out);
    let active = active_tab(workbook);
    out.push_str("<bookViews>");
    Tag::new("workbookView").attr("activeTab", active).empty(&mut out);
    out.push_str("</bookViews>");
    out.push_str("<sheets>");
    for (index, sheet) in workbook.sheets().iter().enumerate() {
        let state = (index != active && !sheet.visibility.is_visible())
            .then(|| sheet.visibility.as_str());
        if index == active && !sheet.visibility.is_visible() {
            warn!(sheet = sheet.name(), "every sheet is hidden, showing the first");
        }
        Tag::new("sheet")
            .attr("name", sheet.name())
            .attr("sheetId", index + 1)
            .attr_opt("state", state)
            .attr("r:id", format!("rId{}", index + 1))
            .empty(&mut out);
    }
    out.push_str("</sheets>");
    write_defined_names(&mut out, workbook);
    Tag::new("calcPr")
        .attr("calcId", 191029)
        .attr("fullCalcOnLoad", 1)
        .empty(&mut out);
    close(&mut out, "workbook");
    out
}

fn write_defined_names(out: &mut String, workbook: &Workbook) {
    let names: Vec<_> = workbook
        .defined_names()
        .iter()
        .filter_map(|name| match name.local_sheet.as_deref() {
            None => Some((name, None)),
            Some(sheet) => match workbook.position(sheet) {
                Some(index) => Some((name, Some(index))),
                None => {
                    warn!(defined = %name.name, sheet, "dropping name local to a missing sheet");
                    None
                }
            },
        })
        .collect();
    if names.is_empty() {
        return;
    }
    out.push_str("<definedNames>");
    for (name, local) in names {
        Tag::new("definedName")
            .attr("name", &name.name)
            .attr_opt("comment", name.comment.as_deref())
            .attr_opt("localSheetId", local)
            .flag("hidden", name.hidden)
            .text(out, &name.refers_to);
    }
    out.push_str("</definedNames>");
}

fn content_types_xml(overrides: &[(String, &'static str)], has_vml: bool) -> String {
    let mut out = String::from(XML_DECL);
    out.push('\n');
    Tag::new("Types").attr("xmlns", CONTENT_TYPES_NS).open(&mut out);
    Tag::new("Default").attr("Extension", "rels").attr("ContentType", CT_RELS).empty(&mut out);
    Tag::new("Default")
        .attr("Extension", "xml")
        .attr("ContentType", "application/xml")
        .empty(&mut out);
    if has_vml {
        Tag::new("Default").attr("Extension", "vml").attr("ContentType", CT_VML).empty(&mut out);
    }
    for (part, content_type) in overrides {
        Tag::new("Override")
            .attr("PartName", format!("/{part}"))
            .attr("ContentType", content_type)
            .empty(&mut out);
    }
    close(&mut out, "Types");
    out
}

/// Relationship list for one source part, numbered `rId1..`.
#[derive(Default)]
struct Relationships {
    entries: Vec<(String, &'static str, String, bool)>,
}

impl Relationships {
    fn push(&mut self, rel_type: &'static str, target: &str) -> String {
        self.push_entry(rel_type, target, false)
    }

    fn push_external(&mut self, rel_type: &'static str, target: &str) -> String {
        self.push_entry(rel_type, target, true)
    }

    fn push_entry(&mut self, rel_type: &'static str, target: &str, external: bool) -> String {
        let id = format!("rId{}", self.entries.len() + 1);
        self.entries.push((id.clone(), rel_type, target.to_string(), external));
        id
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_xml(&self) -> String {
        let mut out = String::from(XML_DECL);
        out.push('\n');
        Tag::new("Relationships").attr("xmlns", PACKAGE_RELS_NS).open(&mut out);
        for (id, rel_type, target, external) in &self.entries {
            let tag = Tag::new("Relationship")
                .attr("Id", id)
                .attr("Type", rel_type)
                .attr("Target", target);
            let tag = if *external { tag.attr("TargetMode", "External") } else { tag };
            tag.empty(&mut out);
        }
        close(&mut out, "Relationships");
        out
    }
}

/// Shared string table, deduplicated in first-use order.
#[derive(Default)]
pub(crate) struct SharedStrings {
    index: HashMap<String, u32>,
    strings: Vec<String>,
    references: usize,
}

impl SharedStrings {
    pub(crate) fn intern(&mut self, text: &str) -> u32 {
        self.references += 1;
        if let Some(id) = self.index.get(text) {
            return *id;
        }
        let id = self.strings.len() as u32;
        self.index.insert(text.to_string(), id);
        self.strings.push(text.to_string());
        id
    }

    fn to_xml(&self) -> String {
        let mut out = String::from(XML_DECL);
        out.push('\n');
        Tag::new("sst")
            .attr("xmlns", MAIN_NS)
            .attr("count", self.references)
            .attr("uniqueCount", self.strings.len())
            .open(&mut out);
        for text in &self.strings {
            out.push_str("<si>");
            text_element(&mut out, text);
            out.push_str("</si>");
        }
        close(&mut out, "sst");
        out
    }
}

/// `<t>` with `xml:space="preserve"` when whitespace at either end matters.
pub(crate) fn text_element(out: &mut String, text: &str) {
    let tag = Tag::new("t");
    let needs_preserve = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
    let tag = if needs_preserve { tag.attr("xml:space", "preserve") } else { tag };
    tag.text(out, text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcfm_model::{DefinedName, SheetVisibility, PRINT_TITLES};

    #[test]
    fn shared_strings_dedupe() {
        let mut sst = SharedStrings::default();
        assert_eq!(sst.intern("Revenue"), 0);
        assert_eq!(sst.intern(" EBIT "), 1);
        assert_eq!(sst.intern("Revenue"), 0);
        let xml = sst.to_xml();
        assert!(xml.contains(r#"count="3" uniqueCount="2""#));
        assert!(xml.contains(r#"<t xml:space="preserve"> EBIT </t>"#));
    }

    #[test]
    fn relationships_number_sequentially() {
        let mut rels = Relationships::default();
        assert_eq!(rels.push(REL_TYPE_STYLES, "styles.xml"), "rId1");
        assert_eq!(rels.push_external(REL_TYPE_HYPERLINK, "https://example.com/?a=1&b=2"), "rId2");
        let xml = rels.to_xml();
        assert!(xml.contains(r#"Target="https://example.com/?a=1&amp;b=2" TargetMode="External""#));
    }

    #[test]
    fn hidden_sheets_keep_their_state() {
        let mut wb = Workbook::empty();
        wb.create_sheet("Cover").unwrap().visibility = SheetVisibility::VeryHidden;
        wb.create_sheet("DCF Model").unwrap();
        let xml = workbook_xml(&wb);
        assert!(xml.contains(r#"<workbookView activeTab="1"/>"#));
        assert!(xml.contains(r#"<sheet name="Cover" sheetId="1" state="veryHidden" r:id="rId1"/>"#));
        assert!(xml.contains(r#"<sheet name="DCF Model" sheetId="2" r:id="rId2"/>"#));
    }

    #[test]
    fn first_sheet_shown_when_all_hidden() {
        let mut wb = Workbook::empty();
        wb.create_sheet("A").unwrap().visibility = SheetVisibility::Hidden;
        wb.create_sheet("B").unwrap().visibility = SheetVisibility::Hidden;
        let xml = workbook_xml(&wb);
        assert!(xml.contains(r#"<sheet name="A" sheetId="1" r:id="rId1"/>"#));
        assert!(xml.contains(r#"<sheet name="B" sheetId="2" state="hidden" r:id="rId2"/>"#));
    }

    #[test]
    fn local_names_carry_sheet_index() {
        let mut wb = Workbook::empty();
        wb.create_sheet("Consensus").unwrap();
        wb.create_sheet("DCF Model").unwrap();
        wb.add_defined_name(DefinedName::local(PRINT_TITLES, "'DCF Model'!$1:$2", "DCF Model"))
            .unwrap();
        let xml = workbook_xml(&wb);
        assert!(xml.contains(
            r#"<definedName name="_xlnm.Print_Titles" localSheetId="1">'DCF Model'!$1:$2</definedName>"#
        ));
        assert!(xml.find("</sheets>").unwrap() < xml.find("<definedNames>").unwrap());
        assert!(xml.find("</definedNames>").unwrap() < xml.find("<calcPr").unwrap());
    }

    #[test]
    fn empty_workbook_cannot_be_written() {
        assert!(write_workbook_to_vec(&Workbook::empty()).is_err());
    }
}
