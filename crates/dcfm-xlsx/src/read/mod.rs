//! Package -> [`Workbook`].

mod styles;
mod worksheet;

use std::path::Path;

use dcfm_model::{DefinedName, SheetVisibility, Workbook};
use tracing::{debug, warn};

use crate::error::{XlsxError, XlsxResult};
use crate::package::{
    Package, REL_TYPE_OFFICE_DOCUMENT, REL_TYPE_SHARED_STRINGS, REL_TYPE_STYLES,
    REL_TYPE_WORKSHEET,
};
use crate::xml::{self, attr, attr_bool, attr_u32, child, children};

use styles::StyleSheet;

const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

/// Shared lookups every worksheet of one package reads through.
pub(crate) struct ReadContext<'a> {
    pub(crate) package: &'a Package,
    pub(crate) styles: &'a StyleSheet,
    pub(crate) shared_strings: &'a [String],
    pub(crate) date1904: bool,
}

/// Read a workbook from the bytes of an `.xlsx` file.
pub fn read_workbook_from_bytes(bytes: &[u8]) -> XlsxResult<Workbook> {
    let package = Package::from_bytes(bytes)?;
    read_package(&package)
}

/// Read a workbook from an `.xlsx` file on disk.
pub fn read_workbook_from_path(path: impl AsRef<Path>) -> XlsxResult<Workbook> {
    let bytes = std::fs::read(path.as_ref())?;
    read_workbook_from_bytes(&bytes)
}

/// Names of the workbook's sheets in tab order, without reading any cells.
pub fn sheet_names_from_bytes(bytes: &[u8]) -> XlsxResult<Vec<String>> {
    let package = Package::from_bytes(bytes)?;
    let workbook_part = workbook_part(&package)?;
    let text = package.required_xml_part(&workbook_part)?;
    let doc = xml::parse(&workbook_part, text)?;
    Ok(sheet_entries(doc.root_element())
        .map(|entry| entry.name.to_string())
        .collect())
}

fn workbook_part(package: &Package) -> XlsxResult<String> {
    Ok(package
        .relationships("")?
        .into_iter()
        .find(|r| r.rel_type == REL_TYPE_OFFICE_DOCUMENT)
        .map(|r| r.target)
        .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string()))
}

/// One `<sheet>` of the workbook part, in tab order.
struct SheetEntry<'a> {
    name: &'a str,
    rel_id: Option<&'a str>,
    visibility: SheetVisibility,
}

fn sheet_entries<'a, 'input: 'a>(
    root: roxmltree::Node<'a, 'input>,
) -> impl Iterator<Item = SheetEntry<'a>> + 'a {
    child(root, "sheets")
        .into_iter()
        .flat_map(|sheets| children(sheets, "sheet"))
        .filter_map(|s| {
            Some(SheetEntry {
                name: attr(s, "name")?,
                rel_id: attr(s, "id"),
                visibility: attr(s, "state").map_or(SheetVisibility::Visible, SheetVisibility::from_state),
            })
        })
}

/// `<definedName>` elements; `localSheetId` indexes the `<sheets>` list.
fn read_defined_names(root: roxmltree::Node<'_, '_>, entries: &[SheetEntry<'_>], workbook: &mut Workbook) {
    let Some(names) = child(root, "definedNames") else {
        return;
    };
    for node in children(names, "definedName") {
        let (Some(name), Some(refers_to)) = (attr(node, "name"), node.text()) else {
            continue;
        };
        let local_sheet = match attr_u32(node, "localSheetId") {
            None => None,
            Some(index) => match entries.get(index as usize) {
                Some(entry) => Some(entry.name.to_string()),
                None => {
                    warn!(defined = name, index, "defined name scoped to a missing sheet");
                    continue;
                }
            },
        };
        let defined = DefinedName {
            name: name.to_string(),
            refers_to: refers_to.trim().trim_start_matches('=').to_string(),
            local_sheet,
            hidden: attr_bool(node, "hidden").unwrap_or(false),
            comment: attr(node, "comment").map(str::to_string),
        };
        if let Err(err) = workbook.add_defined_name(defined) {
            warn!(defined = name, error = %err, "ignoring defined name");
        }
    }
}

pub(crate) fn read_package(package: &Package) -> XlsxResult<Workbook> {
    let workbook_part = workbook_part(package)?;
    let text = package.required_xml_part(&workbook_part)?;
    let doc = xml::parse(&workbook_part, text)?;
    let root = doc.root_element();
    let rels = package.relationships(&workbook_part)?;

    let date1904 = child(root, "workbookPr")
        .and_then(|pr| attr_bool(pr, "date1904"))
        .unwrap_or(false);

    let styles = match rels.iter().find(|r| r.rel_type == REL_TYPE_STYLES) {
        Some(rel) => match package.xml_part(&rel.target)? {
            Some(text) => StyleSheet::parse(&rel.target, text)?,
            None => StyleSheet::default(),
        },
        None => StyleSheet::default(),
    };
    let shared_strings = match rels.iter().find(|r| r.rel_type == REL_TYPE_SHARED_STRINGS) {
        Some(rel) => match package.xml_part(&rel.target)? {
            Some(text) => parse_shared_strings(&rel.target, text)?,
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let ctx = ReadContext {
        package,
        styles: &styles,
        shared_strings: &shared_strings,
        date1904,
    };

    let mut workbook = Workbook::empty();
    workbook.date1904 = date1904;
    workbook.default_font = styles.default_font().cloned();

    let entries: Vec<SheetEntry<'_>> = sheet_entries(root).collect();
    for entry in &entries {
        let name = entry.name;
        let Some(rel) = entry.rel_id.and_then(|id| rels.iter().find(|r| r.id == id)) else {
            return Err(XlsxError::malformed(
                &workbook_part,
                format!("sheet {name:?} has no relationship"),
            ));
        };
        if rel.rel_type != REL_TYPE_WORKSHEET {
            // Chartsheets and dialog sheets carry no cells.
            debug!(sheet = name, rel_type = %rel.rel_type, "skipping non-worksheet sheet");
            continue;
        }
        let mut sheet = worksheet::read_worksheet(&ctx, name, &rel.target)?;
        sheet.visibility = entry.visibility;
        debug!(sheet = name, cells = sheet.cell_count(), "read worksheet");
        workbook.add_sheet(sheet)?;
    }
    read_defined_names(root, &entries, &mut workbook);

    if workbook.is_empty() {
        warn!("workbook contains no worksheets");
    }
    Ok(workbook)
}

fn parse_shared_strings(part: &str, text: &str) -> XlsxResult<Vec<String>> {
    let doc = xml::parse(part, text)?;
    Ok(children(doc.root_element(), "si").map(xml::rich_text).collect())
}
