use std::collections::BTreeMap;

use dcfm_model::{
    datetime_to_serial, Cell, CellRef, CellValue, ColumnDimension, Comment, ConditionalFormat,
    DataValidation, DxfRef, HeaderFooter, PageMargins, PageSetup, PrintOptions, RowDimension,
    Worksheet,
};
use tracing::warn;

use super::styles::{write_color, StyleTable};
use super::SharedStrings;
use crate::package::REL_NS;
use crate::xml::{close, Tag, MAIN_NS};

pub(super) struct WriteContext<'a> {
    pub(super) styles: &'a mut StyleTable,
    pub(super) strings: &'a mut SharedStrings,
    pub(super) date1904: bool,
    /// The sheet is the active tab.
    pub(super) selected: bool,
}

/// A serialized worksheet plus what its relationships part must carry.
pub(super) struct WrittenSheet {
    pub(super) xml: String,
    /// External hyperlink targets, in `rId1..` order.
    pub(super) external_links: Vec<String>,
    pub(super) comments: Vec<(CellRef, Comment)>,
}

pub(super) fn write_worksheet(ctx: &mut WriteContext<'_>, sheet: &Worksheet) -> WrittenSheet {
    let mut out = String::with_capacity(4096 + sheet.cell_count() * 48);
    out.push_str(super::XML_DECL);
    out.push('\n');
    Tag::new("worksheet")
        .attr("xmlns", MAIN_NS)
        .attr("xmlns:r", REL_NS)
        .open(&mut out);

    let tab_color = sheet.view.tab_color.as_ref();
    if sheet.print.fit_to_page || tab_color.is_some() {
        out.push_str("<sheetPr>");
        if let Some(color) = tab_color {
            write_color(&mut out, "tabColor", color);
        }
        if sheet.print.fit_to_page {
            out.push_str(r#"<pageSetUpPr fitToPage="1"/>"#);
        }
        close(&mut out, "sheetPr");
    }
    let dimension = sheet
        .used_range()
        .map_or_else(|| "A1".to_string(), |r| r.to_string());
    Tag::new("dimension").attr("ref", dimension).empty(&mut out);
    write_sheet_view(&mut out, sheet, ctx.selected);

    let format = &sheet.format;
    Tag::new("sheetFormatPr")
        .attr_opt("baseColWidth", format.base_column_width)
        .attr_opt("defaultColWidth", format.default_column_width)
        .attr("defaultRowHeight", format.default_row_height.unwrap_or(15.0))
        .flag("customHeight", format.custom_height)
        .empty(&mut out);

    write_columns(&mut out, ctx, sheet);
    write_sheet_data(&mut out, ctx, sheet);

    if !sheet.merged_ranges().is_empty() {
        Tag::new("mergeCells")
            .attr("count", sheet.merged_ranges().len())
            .open(&mut out);
        for range in sheet.merged_ranges() {
            Tag::new("mergeCell").attr("ref", range).empty(&mut out);
        }
        close(&mut out, "mergeCells");
    }

    for cf in &sheet.conditional_formats {
        write_conditional_format(&mut out, ctx, sheet.name(), cf);
    }

    if !sheet.data_validations.is_empty() {
        Tag::new("dataValidations")
            .attr("count", sheet.data_validations.len())
            .open(&mut out);
        for dv in &sheet.data_validations {
            write_data_validation(&mut out, dv);
        }
        close(&mut out, "dataValidations");
    }

    let external_links = write_hyperlinks(&mut out, sheet);

    if let Some(options) = &sheet.print.options {
        write_print_options(&mut out, options);
    }
    write_page_margins(&mut out, sheet.print.margins.as_ref());
    if let Some(setup) = &sheet.print.page_setup {
        write_page_setup(&mut out, setup);
    }
    if let Some(hf) = sheet.print.header_footer.as_ref().filter(|hf| !hf.is_empty()) {
        write_header_footer(&mut out, hf);
    }

    close(&mut out, "worksheet");

    let comments = sheet
        .cells()
        .filter_map(|(at, cell)| cell.comment.clone().map(|c| (at, c)))
        .collect();
    WrittenSheet { xml: out, external_links, comments }
}

fn write_sheet_view(out: &mut String, sheet: &Worksheet, selected: bool) {
    out.push_str("<sheetViews>");
    let settings = &sheet.view;
    let view = Tag::new("sheetView")
        .flag("tabSelected", selected)
        .attr_opt("showGridLines", (!settings.show_grid_lines).then_some(0))
        .attr_opt("showRowColHeaders", (!settings.show_row_col_headers).then_some(0))
        .attr_opt("showZeros", (!settings.show_zeros).then_some(0))
        .flag("rightToLeft", settings.right_to_left)
        .attr_opt("zoomScale", settings.zoom_scale)
        .attr("workbookViewId", 0);
    let split = sheet
        .freeze_panes
        .map(|tl| (tl.col - 1, tl.row - 1, tl))
        .filter(|(x, y, _)| *x > 0 || *y > 0);
    match split {
        None => view.empty(out),
        Some((x, y, top_left)) => {
            view.open(out);
            let active = match (x > 0, y > 0) {
                (true, true) => "bottomRight",
                (false, true) => "bottomLeft",
                _ => "topRight",
            };
            Tag::new("pane")
                .attr_opt("xSplit", (x > 0).then_some(x))
                .attr_opt("ySplit", (y > 0).then_some(y))
                .attr("topLeftCell", top_left)
                .attr("activePane", active)
                .attr("state", "frozen")
                .empty(out);
            Tag::new("selection").attr("pane", active).empty(out);
            close(out, "sheetView");
        }
    }
    out.push_str("</sheetViews>");
}

fn write_data_validation(out: &mut String, dv: &DataValidation) {
    let sqref = dv
        .ranges
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    let tag = Tag::new("dataValidation")
        .attr_opt("type", dv.kind.as_deref())
        .attr_opt("errorStyle", dv.error_style.as_deref())
        .attr_opt("operator", dv.operator.as_deref())
        .flag("allowBlank", dv.allow_blank)
        .flag("showDropDown", dv.hide_dropdown)
        .flag("showInputMessage", dv.show_input_message)
        .flag("showErrorMessage", dv.show_error_message)
        .attr_opt("errorTitle", dv.error_title.as_deref())
        .attr_opt("error", dv.error.as_deref())
        .attr_opt("promptTitle", dv.prompt_title.as_deref())
        .attr_opt("prompt", dv.prompt.as_deref())
        .attr("sqref", sqref);
    if dv.formula1.is_none() && dv.formula2.is_none() {
        tag.empty(out);
        return;
    }
    tag.open(out);
    if let Some(f) = &dv.formula1 {
        Tag::new("formula1").text(out, f);
    }
    if let Some(f) = &dv.formula2 {
        Tag::new("formula2").text(out, f);
    }
    close(out, "dataValidation");
}

fn write_columns(out: &mut String, ctx: &mut WriteContext<'_>, sheet: &Worksheet) {
    // Runs of adjacent columns with identical records collapse into one <col>.
    let mut runs: Vec<(u32, u32, &ColumnDimension)> = Vec::new();
    for (col, dim) in sheet.column_dimensions() {
        match runs.last_mut() {
            Some((_, max, last)) if *max + 1 == col && *last == dim => *max = col,
            _ => runs.push((col, col, dim)),
        }
    }
    if runs.is_empty() {
        return;
    }
    out.push_str("<cols>");
    for (min, max, dim) in runs {
        let style = dim.style.as_ref().map(|s| ctx.styles.cell_xf(Some(s)));
        Tag::new("col")
            .attr("min", min)
            .attr("max", max)
            .attr_opt("width", dim.width)
            .attr_opt("style", style)
            .flag("hidden", dim.hidden)
            .flag("bestFit", dim.best_fit)
            .flag("customWidth", dim.width.is_some())
            .attr_opt("outlineLevel", (dim.outline_level > 0).then_some(dim.outline_level))
            .flag("collapsed", dim.collapsed)
            .empty(out);
    }
    out.push_str("</cols>");
}

fn write_sheet_data(out: &mut String, ctx: &mut WriteContext<'_>, sheet: &Worksheet) {
    let mut rows: BTreeMap<u32, (Option<&RowDimension>, Vec<(CellRef, &Cell)>)> = BTreeMap::new();
    for (row, dim) in sheet.row_dimensions() {
        rows.entry(row).or_default().0 = Some(dim);
    }
    for (at, cell) in sheet.cells() {
        rows.entry(at.row).or_default().1.push((at, cell));
    }
    if rows.is_empty() {
        out.push_str("<sheetData/>");
        return;
    }

    out.push_str("<sheetData>");
    for (row, (dim, cells)) in rows {
        let mut tag = Tag::new("row").attr("r", row);
        if let Some(dim) = dim {
            let style = dim.style.as_ref().map(|s| ctx.styles.cell_xf(Some(s)));
            tag = tag
                .attr_opt("s", style)
                .flag("customFormat", style.is_some())
                .attr_opt("ht", dim.height)
                .flag("hidden", dim.hidden)
                .flag("customHeight", dim.height.is_some())
                .attr_opt("outlineLevel", (dim.outline_level > 0).then_some(dim.outline_level))
                .flag("collapsed", dim.collapsed);
        }
        if cells.is_empty() {
            tag.empty(out);
            continue;
        }
        tag.open(out);
        for (at, cell) in cells {
            write_cell(out, ctx, at, cell);
        }
        close(out, "row");
    }
    out.push_str("</sheetData>");
}

fn write_cell(out: &mut String, ctx: &mut WriteContext<'_>, at: CellRef, cell: &Cell) {
    let style = cell.style.as_ref();
    let xf = match cell.value {
        CellValue::Date(_) => ctx.styles.date_xf(style),
        _ => ctx.styles.cell_xf(style),
    };
    let tag = Tag::new("c").attr("r", at).attr_opt("s", (xf != 0).then_some(xf));
    match &cell.value {
        CellValue::Empty => tag.empty(out),
        CellValue::Text(text) => {
            let id = ctx.strings.intern(text);
            tag.attr("t", "s").open(out);
            Tag::new("v").text(out, &id.to_string());
            close(out, "c");
        }
        CellValue::Number(n) if n.is_finite() => {
            tag.open(out);
            Tag::new("v").text(out, &n.to_string());
            close(out, "c");
        }
        CellValue::Number(_) => {
            tag.attr("t", "e").open(out);
            Tag::new("v").text(out, "#NUM!");
            close(out, "c");
        }
        CellValue::Bool(b) => {
            tag.attr("t", "b").open(out);
            Tag::new("v").text(out, if *b { "1" } else { "0" });
            close(out, "c");
        }
        CellValue::Date(dt) => {
            tag.open(out);
            Tag::new("v").text(out, &datetime_to_serial(*dt, ctx.date1904).to_string());
            close(out, "c");
        }
        CellValue::Error(code) => {
            tag.attr("t", "e").open(out);
            Tag::new("v").text(out, code);
            close(out, "c");
        }
        CellValue::Formula(formula) => {
            tag.open(out);
            let f = Tag::new("f");
            let f = match formula.array_range {
                Some(range) => f.attr("t", "array").attr("ref", range),
                None => f,
            };
            f.text(out, formula.body());
            close(out, "c");
        }
    }
}

fn write_conditional_format(
    out: &mut String,
    ctx: &mut WriteContext<'_>,
    sheet: &str,
    cf: &ConditionalFormat,
) {
    if cf.ranges.is_empty() || cf.rules.is_empty() {
        return;
    }
    Tag::new("conditionalFormatting")
        .flag("pivot", cf.pivot)
        .attr("sqref", cf.sqref())
        .open(out);
    for rule in &cf.rules {
        let dxf_id = match &rule.format {
            Some(DxfRef::Resolved(dxf)) => Some(ctx.styles.dxf(&dxf.xml)),
            Some(DxfRef::Unresolved(id)) => {
                warn!(sheet, dxf_id = id, sqref = %cf.sqref(), "conditional format rule lost its differential style");
                None
            }
            None => None,
        };
        let mut tag = Tag::new("cfRule")
            .attr("type", &rule.kind)
            .attr_opt("dxfId", dxf_id)
            .attr("priority", rule.priority)
            .flag("stopIfTrue", rule.stop_if_true)
            .attr_opt("operator", rule.operator.as_deref());
        for (key, value) in &rule.attributes {
            tag = tag.attr(key, value);
        }
        if rule.formulas.is_empty() && rule.extension_xml.is_none() {
            tag.empty(out);
            continue;
        }
        tag.open(out);
        for formula in &rule.formulas {
            Tag::new("formula").text(out, formula);
        }
        if let Some(xml) = &rule.extension_xml {
            out.push_str(xml);
        }
        close(out, "cfRule");
    }
    close(out, "conditionalFormatting");
}

fn write_hyperlinks(out: &mut String, sheet: &Worksheet) -> Vec<String> {
    let mut external = Vec::new();
    let links: Vec<_> = sheet
        .cells()
        .filter_map(|(at, cell)| cell.hyperlink.as_ref().map(|h| (at, h)))
        .collect();
    if links.is_empty() {
        return external;
    }
    out.push_str("<hyperlinks>");
    for (at, link) in links {
        let rel_id = link.target.as_ref().map(|url| {
            external.push(url.clone());
            format!("rId{}", external.len())
        });
        Tag::new("hyperlink")
            .attr("ref", at)
            .attr_opt("r:id", rel_id)
            .attr_opt("location", link.location.as_deref())
            .attr_opt("tooltip", link.tooltip.as_deref())
            .attr_opt("display", link.display.as_deref())
            .empty(out);
    }
    out.push_str("</hyperlinks>");
    external
}

fn write_print_options(out: &mut String, options: &PrintOptions) {
    Tag::new("printOptions")
        .flag("horizontalCentered", options.horizontal_centered)
        .flag("verticalCentered", options.vertical_centered)
        .flag("headings", options.headings)
        .flag("gridLines", options.grid_lines)
        .empty(out);
}

fn write_page_margins(out: &mut String, margins: Option<&PageMargins>) {
    let default = PageMargins::default();
    let m = margins.unwrap_or(&default);
    Tag::new("pageMargins")
        .attr("left", m.left)
        .attr("right", m.right)
        .attr("top", m.top)
        .attr("bottom", m.bottom)
        .attr("header", m.header)
        .attr("footer", m.footer)
        .empty(out);
}

fn write_page_setup(out: &mut String, setup: &PageSetup) {
    Tag::new("pageSetup")
        .attr_opt("paperSize", setup.paper_size)
        .attr_opt("scale", setup.scale)
        .attr_opt("firstPageNumber", setup.first_page_number)
        .attr_opt("fitToWidth", setup.fit_to_width)
        .attr_opt("fitToHeight", setup.fit_to_height)
        .attr_opt("pageOrder", setup.page_order.as_deref())
        .attr_opt("orientation", setup.orientation.as_deref())
        .flag("blackAndWhite", setup.black_and_white)
        .flag("draft", setup.draft)
        .attr_opt("cellComments", setup.cell_comments.as_deref())
        .flag("useFirstPageNumber", setup.use_first_page_number)
        .attr_opt("horizontalDpi", setup.horizontal_dpi)
        .attr_opt("verticalDpi", setup.vertical_dpi)
        .attr_opt("copies", setup.copies)
        .empty(out);
}

fn write_header_footer(out: &mut String, hf: &HeaderFooter) {
    Tag::new("headerFooter")
        .flag("differentOddEven", hf.different_odd_even)
        .flag("differentFirst", hf.different_first)
        .open(out);
    let sections = [
        ("oddHeader", &hf.odd_header),
        ("oddFooter", &hf.odd_footer),
        ("evenHeader", &hf.even_header),
        ("evenFooter", &hf.even_footer),
        ("firstHeader", &hf.first_header),
        ("firstFooter", &hf.first_footer),
    ];
    for (name, text) in sections {
        if let Some(text) = text {
            Tag::new(name).text(out, text);
        }
    }
    close(out, "headerFooter");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcfm_model::{CellRange, Formula, Hyperlink};

    fn render(sheet: &Worksheet) -> WrittenSheet {
        let mut styles = StyleTable::new(None);
        let mut strings = SharedStrings::default();
        let mut ctx = WriteContext {
            styles: &mut styles,
            strings: &mut strings,
            date1904: false,
            selected: true,
        };
        write_worksheet(&mut ctx, sheet)
    }

    #[test]
    fn formulas_are_written_without_cached_values() {
        let mut ws = Worksheet::new("S");
        ws.set_value(CellRef::new(1, 1), Formula::new("SUM(B1:B3)")).unwrap();
        let xml = render(&ws).xml;
        assert!(xml.contains(r#"<c r="A1"><f>SUM(B1:B3)</f></c>"#));
    }

    #[test]
    fn adjacent_equal_columns_collapse() {
        let mut ws = Worksheet::new("S");
        let wide = ColumnDimension { width: Some(20.0), ..Default::default() };
        for col in 2..=4 {
            ws.set_column_dimension(col, wide.clone());
        }
        ws.set_column_dimension(6, wide);
        let xml = render(&ws).xml;
        assert!(xml.contains(r#"<col min="2" max="4" width="20" customWidth="1"/>"#));
        assert!(xml.contains(r#"<col min="6" max="6""#));
    }

    #[test]
    fn frozen_pane_written() {
        let mut ws = Worksheet::new("S");
        ws.freeze_panes = Some(CellRef::from_a1("B3").unwrap());
        let xml = render(&ws).xml;
        assert!(xml.contains(
            r#"<pane xSplit="1" ySplit="2" topLeftCell="B3" activePane="bottomRight" state="frozen"/>"#
        ));
    }

    #[test]
    fn view_settings_written() {
        let mut ws = Worksheet::new("S");
        ws.view.show_grid_lines = false;
        ws.view.zoom_scale = Some(85);
        ws.view.tab_color = Some(dcfm_model::Color::Rgb("FF1F4E79".into()));
        let xml = render(&ws).xml;
        assert!(xml.contains(r#"<sheetPr><tabColor rgb="FF1F4E79"/></sheetPr>"#));
        assert!(xml.contains(r#"<sheetView tabSelected="1" showGridLines="0" zoomScale="85" workbookViewId="0"/>"#));
    }

    #[test]
    fn data_validations_follow_conditional_formatting() {
        let mut ws = Worksheet::new("S");
        ws.data_validations.push(DataValidation::list(
            vec![CellRange::from_a1("C3:C9").unwrap()],
            "\"Base,Bull,Bear\"",
        ));
        let xml = render(&ws).xml;
        assert!(xml.contains(
            r#"<dataValidations count="1"><dataValidation type="list" allowBlank="1" showErrorMessage="1" sqref="C3:C9"><formula1>"Base,Bull,Bear"</formula1></dataValidation></dataValidations>"#
        ));
        assert!(xml.find("<dataValidations").unwrap() < xml.find("<pageMargins").unwrap());
    }

    #[test]
    fn external_hyperlinks_get_relationship_ids() {
        let mut ws = Worksheet::new("S");
        ws.cell_mut(CellRef::new(1, 1)).unwrap().hyperlink =
            Some(Hyperlink::external("https://example.com"));
        ws.cell_mut(CellRef::new(2, 1)).unwrap().hyperlink = Some(Hyperlink::internal("'DCF Model'!A1"));
        let written = render(&ws);
        assert_eq!(written.external_links, vec!["https://example.com"]);
        assert!(written.xml.contains(r#"<hyperlink ref="A1" r:id="rId1"/>"#));
        assert!(written.xml.contains(r#"<hyperlink ref="A2" location="'DCF Model'!A1"/>"#));
    }

    #[test]
    fn merges_and_placeholders() {
        let mut ws = Worksheet::new("S");
        ws.set_value(CellRef::new(1, 1), "Title").unwrap();
        ws.merge(CellRange::from_a1("A1:D1").unwrap()).unwrap();
        let xml = render(&ws).xml;
        assert!(xml.contains(r#"<mergeCells count="1"><mergeCell ref="A1:D1"/></mergeCells>"#));
        assert!(!xml.contains(r#"r="B1""#));
    }
}
