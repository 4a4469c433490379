use std::collections::HashMap;

use chrono::NaiveDateTime;
use dcfm_model::{
    serial_to_datetime, shift_references, Cell, CellRange, CellRef, CellValue, ColumnDimension,
    Comment, ConditionalFormat, ConditionalRule, DataValidation, DxfRef, Formula, HeaderFooter,
    Hyperlink, PageMargins, PageSetup, PrintOptions, RowDimension, SheetFormat, SheetView,
    Worksheet, MAX_COLS,
};
use roxmltree::Node;
use tracing::warn;

use super::styles::parse_color;
use super::ReadContext;
use crate::error::{XlsxError, XlsxResult};
use crate::package::{REL_TYPE_COMMENTS, REL_TYPE_HYPERLINK};
use crate::xml::{self, attr, attr_bool, attr_f64, attr_u32, child, children, is};

/// Master of a shared formula group: where it sits and its text.
type SharedFormulas = HashMap<u32, (CellRef, String)>;

const CF_RULE_KNOWN_ATTRS: &[&str] = &["type", "priority", "operator", "stopIfTrue", "dxfId"];

pub(super) fn read_worksheet(ctx: &ReadContext<'_>, name: &str, part: &str) -> XlsxResult<Worksheet> {
    let text = ctx.package.required_xml_part(part)?;
    let doc = xml::parse(part, text)?;
    let root = doc.root_element();
    let rels = ctx.package.relationships(part)?;

    let mut sheet = Worksheet::new(name);
    let mut shared = SharedFormulas::new();

    for node in root.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "sheetPr" => {
                sheet.print.fit_to_page = child(node, "pageSetUpPr")
                    .and_then(|p| attr_bool(p, "fitToPage"))
                    .unwrap_or(false);
                sheet.view.tab_color = child(node, "tabColor").and_then(parse_color);
            }
            "sheetViews" => {
                sheet.freeze_panes = read_frozen_pane(node);
                if let Some(view) = child(node, "sheetView") {
                    read_sheet_view(view, &mut sheet.view);
                }
            }
            "sheetFormatPr" => sheet.format = read_sheet_format(node),
            "cols" => read_columns(ctx, node, &mut sheet),
            "sheetData" => read_sheet_data(ctx, part, node, &mut sheet, &mut shared)?,
            "mergeCells" => {
                for merge in children(node, "mergeCell") {
                    let Some(range) = attr(merge, "ref").and_then(|r| CellRange::from_a1(r).ok()) else {
                        continue;
                    };
                    if let Err(err) = sheet.merge(range) {
                        warn!(sheet = name, %range, error = %err, "ignoring merged range");
                    }
                }
            }
            "conditionalFormatting" => {
                if let Some(cf) = read_conditional_format(ctx, node) {
                    sheet.conditional_formats.push(cf);
                }
            }
            "dataValidations" => {
                sheet
                    .data_validations
                    .extend(children(node, "dataValidation").filter_map(read_data_validation));
            }
            "hyperlinks" => {
                for link in children(node, "hyperlink") {
                    read_hyperlink(link, &rels, &mut sheet);
                }
            }
            "printOptions" => sheet.print.options = Some(read_print_options(node)),
            "pageMargins" => sheet.print.margins = Some(read_page_margins(node)),
            "pageSetup" => sheet.print.page_setup = Some(read_page_setup(node)),
            "headerFooter" => sheet.print.header_footer = Some(read_header_footer(node)),
            _ => {}
        }
    }

    if let Some(rel) = rels.iter().find(|r| r.rel_type == REL_TYPE_COMMENTS && !r.external) {
        if let Some(text) = ctx.package.xml_part(&rel.target)? {
            read_comments(&rel.target, text, &mut sheet)?;
        }
    }

    Ok(sheet)
}

fn read_frozen_pane(views: Node<'_, '_>) -> Option<CellRef> {
    let pane = child(views, "sheetView").and_then(|v| child(v, "pane"))?;
    if !matches!(attr(pane, "state"), Some("frozen" | "frozenSplit")) {
        return None;
    }
    // topLeftCell is the scroll position of the lower pane, not the split.
    if attr(pane, "xSplit").is_none() && attr(pane, "ySplit").is_none() {
        return attr(pane, "topLeftCell").and_then(|a| CellRef::from_a1(a).ok());
    }
    let (x, y) = (split_count(pane, "xSplit")?, split_count(pane, "ySplit")?);
    if x == 0 && y == 0 {
        return None;
    }
    CellRef::new(1, 1).offset(y, x)
}

/// Frozen rows or columns; `None` for a present but non-integral count.
fn split_count(pane: Node<'_, '_>, name: &str) -> Option<i64> {
    let Some(raw) = attr(pane, name) else {
        return Some(0);
    };
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX))
        .then_some(value as i64)
}

fn read_sheet_view(node: Node<'_, '_>, view: &mut SheetView) {
    let defaults = SheetView::default();
    view.show_grid_lines = attr_bool(node, "showGridLines").unwrap_or(defaults.show_grid_lines);
    view.show_row_col_headers =
        attr_bool(node, "showRowColHeaders").unwrap_or(defaults.show_row_col_headers);
    view.show_zeros = attr_bool(node, "showZeros").unwrap_or(defaults.show_zeros);
    view.right_to_left = attr_bool(node, "rightToLeft").unwrap_or(defaults.right_to_left);
    // Excel clamps zoom to 10..=400; 100 is the default.
    view.zoom_scale = attr_u32(node, "zoomScale")
        .filter(|z| *z != 100)
        .map(|z| z.clamp(10, 400));
}

fn read_data_validation(node: Node<'_, '_>) -> Option<DataValidation> {
    let ranges = CellRange::parse_list(attr(node, "sqref")?).ok()?;
    let text = |name: &str| attr(node, name).map(str::to_string);
    let formula = |name: &str| {
        child(node, name)
            .and_then(|f| f.text())
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
    };
    let flag = |name: &str| attr_bool(node, name).unwrap_or(false);
    Some(DataValidation {
        ranges,
        kind: text("type").filter(|t| t != "none"),
        operator: text("operator"),
        allow_blank: flag("allowBlank"),
        hide_dropdown: flag("showDropDown"),
        show_input_message: flag("showInputMessage"),
        show_error_message: flag("showErrorMessage"),
        error_style: text("errorStyle"),
        error_title: text("errorTitle"),
        error: text("error"),
        prompt_title: text("promptTitle"),
        prompt: text("prompt"),
        formula1: formula("formula1"),
        formula2: formula("formula2"),
    })
}

fn read_sheet_format(node: Node<'_, '_>) -> SheetFormat {
    SheetFormat {
        default_row_height: attr_f64(node, "defaultRowHeight"),
        default_column_width: attr_f64(node, "defaultColWidth"),
        base_column_width: attr_u32(node, "baseColWidth"),
        custom_height: attr_bool(node, "customHeight").unwrap_or(false),
    }
}

fn read_columns(ctx: &ReadContext<'_>, cols: Node<'_, '_>, sheet: &mut Worksheet) {
    for col in children(cols, "col") {
        let (Some(min), Some(max)) = (attr_u32(col, "min"), attr_u32(col, "max")) else {
            continue;
        };
        let dim = ColumnDimension {
            width: attr_f64(col, "width"),
            hidden: attr_bool(col, "hidden").unwrap_or(false),
            outline_level: attr_u32(col, "outlineLevel").unwrap_or(0).min(7) as u8,
            collapsed: attr_bool(col, "collapsed").unwrap_or(false),
            best_fit: attr_bool(col, "bestFit").unwrap_or(false),
            style: attr_u32(col, "style").and_then(|s| ctx.styles.cell_style(s)),
        };
        for index in min.max(1)..=max.min(MAX_COLS) {
            sheet.set_column_dimension(index, dim.clone());
        }
    }
}

fn read_sheet_data(
    ctx: &ReadContext<'_>,
    part: &str,
    data: Node<'_, '_>,
    sheet: &mut Worksheet,
    shared: &mut SharedFormulas,
) -> XlsxResult<()> {
    // Cells spilled by an array formula hold only cached results.
    let mut arrays: Vec<CellRange> = Vec::new();
    let mut row_index = 0u32;
    for row in children(data, "row") {
        row_index = attr_u32(row, "r").unwrap_or(row_index + 1);
        let dim = RowDimension {
            height: attr_f64(row, "ht"),
            hidden: attr_bool(row, "hidden").unwrap_or(false),
            outline_level: attr_u32(row, "outlineLevel").unwrap_or(0).min(7) as u8,
            collapsed: attr_bool(row, "collapsed").unwrap_or(false),
            style: attr_u32(row, "s")
                .filter(|_| attr_bool(row, "customFormat").unwrap_or(false))
                .and_then(|s| ctx.styles.cell_style(s)),
        };
        sheet.set_row_dimension(row_index, dim);

        let mut col_index = 0u32;
        for c in children(row, "c") {
            let at = match attr(c, "r") {
                Some(a1) => CellRef::from_a1(a1)
                    .map_err(|_| XlsxError::malformed(part, format!("bad cell reference {a1:?}")))?,
                None => CellRef::new(row_index, col_index + 1),
            };
            col_index = at.col;

            let style_id = attr_u32(c, "s").unwrap_or(0);
            let mut value = read_cell_value(ctx, part, c, at, style_id, shared)?;
            match value.as_formula().and_then(|f| f.array_range) {
                Some(range) => arrays.push(range),
                None if arrays.iter().any(|r| r.contains(at) && r.anchor() != at) => {
                    value = CellValue::Empty;
                }
                None => {}
            }
            let cell = Cell {
                value,
                style: ctx.styles.cell_style(style_id),
                ..Cell::default()
            };
            if !cell.is_blank() {
                sheet.put_cell(at, cell)?;
            }
        }
    }
    Ok(())
}

fn read_cell_value(
    ctx: &ReadContext<'_>,
    part: &str,
    c: Node<'_, '_>,
    at: CellRef,
    style_id: u32,
    shared: &mut SharedFormulas,
) -> XlsxResult<CellValue> {
    if let Some(f) = child(c, "f") {
        if let Some(formula) = read_formula(f, at, shared) {
            return Ok(CellValue::Formula(formula));
        }
    }

    let raw = child(c, "v").and_then(|v| v.text());
    let value = match attr(c, "t").unwrap_or("n") {
        "s" => {
            let Some(index) = raw.and_then(|v| v.trim().parse::<usize>().ok()) else {
                return Ok(CellValue::Empty);
            };
            let text = ctx.shared_strings.get(index).ok_or_else(|| {
                XlsxError::malformed(part, format!("{at} points at missing shared string {index}"))
            })?;
            CellValue::Text(text.clone())
        }
        "inlineStr" => child(c, "is")
            .map(|is| CellValue::Text(xml::rich_text(is)))
            .unwrap_or_default(),
        "str" => raw.map(|v| CellValue::Text(v.to_string())).unwrap_or_default(),
        "b" => raw
            .map(|v| CellValue::Bool(xml::parse_bool(v)))
            .unwrap_or_default(),
        "e" => raw.map(|v| CellValue::Error(v.to_string())).unwrap_or_default(),
        "d" => raw
            .map(|v| match parse_iso_datetime(v) {
                Some(dt) => CellValue::Date(dt),
                None => CellValue::Text(v.to_string()),
            })
            .unwrap_or_default(),
        _ => match raw.map(str::trim).filter(|v| !v.is_empty()) {
            None => CellValue::Empty,
            Some(v) => {
                let number: f64 = v
                    .parse()
                    .map_err(|_| XlsxError::malformed(part, format!("{at} holds non-numeric {v:?}")))?;
                match ctx
                    .styles
                    .is_date(style_id)
                    .then(|| serial_to_datetime(number, ctx.date1904))
                    .flatten()
                {
                    Some(dt) => CellValue::Date(dt),
                    None => CellValue::Number(number),
                }
            }
        },
    };
    Ok(value)
}

/// Formula of a cell, expanding shared-formula followers from their master.
fn read_formula(f: Node<'_, '_>, at: CellRef, shared: &mut SharedFormulas) -> Option<Formula> {
    let text = f.text().map(str::trim).filter(|t| !t.is_empty());
    match attr(f, "t") {
        Some("shared") => {
            let si = attr_u32(f, "si")?;
            if let Some(text) = text {
                shared.insert(si, (at, text.to_string()));
                return Some(Formula::new(text));
            }
            let (origin, master) = shared.get(&si)?;
            let rows = i64::from(at.row) - i64::from(origin.row);
            let cols = i64::from(at.col) - i64::from(origin.col);
            Some(Formula::new(shift_references(master, rows, cols)))
        }
        Some("array") => {
            let range = attr(f, "ref")
                .and_then(|r| CellRange::from_a1(r).ok())
                .unwrap_or_else(|| CellRange::new(at, at));
            Some(Formula::array(text?, range))
        }
        _ => text.map(Formula::new),
    }
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

fn read_conditional_format(ctx: &ReadContext<'_>, node: Node<'_, '_>) -> Option<ConditionalFormat> {
    let ranges = CellRange::parse_list(attr(node, "sqref")?).ok()?;
    let rules = children(node, "cfRule")
        .map(|rule| {
            let format = attr_u32(rule, "dxfId").map(|id| match ctx.styles.dxf(id) {
                Some(dxf) => DxfRef::Resolved(dxf.clone()),
                None => DxfRef::Unresolved(id),
            });
            let extension_xml: String = rule
                .children()
                .filter(|n| n.is_element() && !is(n, "formula") && !is(n, "extLst"))
                .map(xml::serialize_element)
                .collect();
            ConditionalRule {
                kind: attr(rule, "type").unwrap_or("expression").to_string(),
                priority: attr_u32(rule, "priority").unwrap_or(1),
                operator: attr(rule, "operator").map(str::to_string),
                stop_if_true: attr_bool(rule, "stopIfTrue").unwrap_or(false),
                formulas: children(rule, "formula")
                    .filter_map(|f| f.text())
                    .map(str::to_string)
                    .collect(),
                format,
                attributes: rule
                    .attributes()
                    .filter(|a| a.namespace().is_none() && !CF_RULE_KNOWN_ATTRS.contains(&a.name()))
                    .map(|a| (a.name().to_string(), a.value().to_string()))
                    .collect(),
                extension_xml: (!extension_xml.is_empty()).then_some(extension_xml),
            }
        })
        .collect();
    Some(ConditionalFormat {
        ranges,
        rules,
        pivot: attr_bool(node, "pivot").unwrap_or(false),
    })
}

fn read_hyperlink(link: Node<'_, '_>, rels: &[crate::package::Relationship], sheet: &mut Worksheet) {
    let Some(range) = attr(link, "ref").and_then(|r| CellRange::from_a1(r).ok()) else {
        return;
    };
    let target = attr(link, "id").and_then(|id| {
        rels.iter()
            .find(|r| r.id == id && r.rel_type == REL_TYPE_HYPERLINK)
            .map(|r| r.target.clone())
    });
    let hyperlink = Hyperlink {
        target,
        location: attr(link, "location").map(str::to_string),
        tooltip: attr(link, "tooltip").map(str::to_string),
        display: attr(link, "display").map(str::to_string),
    };
    match sheet.cell_mut(range.anchor()) {
        Ok(cell) => cell.hyperlink = Some(hyperlink),
        Err(err) => warn!(sheet = sheet.name(), error = %err, "dropping hyperlink"),
    }
}

fn read_print_options(node: Node<'_, '_>) -> PrintOptions {
    PrintOptions {
        horizontal_centered: attr_bool(node, "horizontalCentered").unwrap_or(false),
        vertical_centered: attr_bool(node, "verticalCentered").unwrap_or(false),
        headings: attr_bool(node, "headings").unwrap_or(false),
        grid_lines: attr_bool(node, "gridLines").unwrap_or(false),
    }
}

fn read_page_margins(node: Node<'_, '_>) -> PageMargins {
    let defaults = PageMargins::default();
    PageMargins {
        left: attr_f64(node, "left").unwrap_or(defaults.left),
        right: attr_f64(node, "right").unwrap_or(defaults.right),
        top: attr_f64(node, "top").unwrap_or(defaults.top),
        bottom: attr_f64(node, "bottom").unwrap_or(defaults.bottom),
        header: attr_f64(node, "header").unwrap_or(defaults.header),
        footer: attr_f64(node, "footer").unwrap_or(defaults.footer),
    }
}

fn read_page_setup(node: Node<'_, '_>) -> PageSetup {
    let text = |name: &str| attr(node, name).map(str::to_string);
    PageSetup {
        orientation: text("orientation"),
        paper_size: attr_u32(node, "paperSize"),
        scale: attr_u32(node, "scale"),
        fit_to_width: attr_u32(node, "fitToWidth"),
        fit_to_height: attr_u32(node, "fitToHeight"),
        first_page_number: attr_u32(node, "firstPageNumber"),
        use_first_page_number: attr_bool(node, "useFirstPageNumber").unwrap_or(false),
        page_order: text("pageOrder"),
        black_and_white: attr_bool(node, "blackAndWhite").unwrap_or(false),
        draft: attr_bool(node, "draft").unwrap_or(false),
        cell_comments: text("cellComments"),
        horizontal_dpi: attr_u32(node, "horizontalDpi"),
        vertical_dpi: attr_u32(node, "verticalDpi"),
        copies: attr_u32(node, "copies"),
    }
}

fn read_header_footer(node: Node<'_, '_>) -> HeaderFooter {
    let text = |name: &str| child(node, name).and_then(|n| n.text()).map(str::to_string);
    HeaderFooter {
        odd_header: text("oddHeader"),
        odd_footer: text("oddFooter"),
        even_header: text("evenHeader"),
        even_footer: text("evenFooter"),
        first_header: text("firstHeader"),
        first_footer: text("firstFooter"),
        different_odd_even: attr_bool(node, "differentOddEven").unwrap_or(false),
        different_first: attr_bool(node, "differentFirst").unwrap_or(false),
    }
}

fn read_comments(part: &str, text: &str, sheet: &mut Worksheet) -> XlsxResult<()> {
    let doc = xml::parse(part, text)?;
    let root = doc.root_element();
    let authors: Vec<String> = child(root, "authors")
        .map(|a| {
            children(a, "author")
                .map(|n| n.text().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default();
    let Some(list) = child(root, "commentList") else {
        return Ok(());
    };
    for comment in children(list, "comment") {
        let Some(at) = attr(comment, "ref").and_then(|r| CellRef::from_a1(r).ok()) else {
            continue;
        };
        let author = attr_u32(comment, "authorId")
            .and_then(|id| authors.get(id as usize))
            .cloned()
            .unwrap_or_default();
        let body = child(comment, "text").map(xml::rich_text).unwrap_or_default();
        match sheet.cell_mut(at) {
            Ok(cell) => cell.comment = Some(Comment::new(author, body)),
            Err(err) => warn!(sheet = sheet.name(), error = %err, "dropping comment"),
        }
    }
    Ok(())
}
