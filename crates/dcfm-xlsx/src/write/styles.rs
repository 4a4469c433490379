use dcfm_model::{
    Alignment, Border, BorderEdge, Color, Fill, Font, Protection, Style, ISO_DATE_FORMAT,
};

use crate::numfmt::{builtin_id, FIRST_CUSTOM_ID};
use crate::xml::{close, Tag, MAIN_NS};

/// Interns every style written to a package and renders `styles.xml`.
///
/// Cell format 0 is always the base style: the workbook's default font with
/// no fill, border or number format.
pub(crate) struct StyleTable {
    fonts: Vec<Font>,
    fills: Vec<Fill>,
    borders: Vec<Border>,
    custom_formats: Vec<(u32, String)>,
    styles: Vec<Style>,
    xfs: Vec<Xf>,
    dxfs: Vec<String>,
}

struct Xf {
    font: usize,
    fill: usize,
    border: usize,
    num_fmt: u32,
    alignment: Alignment,
    protection: Protection,
}

impl StyleTable {
    pub(crate) fn new(default_font: Option<&Font>) -> Self {
        let font = default_font.cloned().unwrap_or_else(fallback_font);
        let mut table = Self {
            fonts: Vec::new(),
            fills: vec![
                Fill::None,
                Fill::Pattern { pattern: "gray125".to_string(), fg: None, bg: None },
            ],
            borders: Vec::new(),
            custom_formats: Vec::new(),
            styles: Vec::new(),
            xfs: Vec::new(),
            dxfs: Vec::new(),
        };
        table.cell_xf(Some(&Style { font, ..Style::default() }));
        table
    }

    /// Cell format index for a style; unstyled cells use the base format.
    pub(crate) fn cell_xf(&mut self, style: Option<&Style>) -> u32 {
        let Some(style) = style else {
            return 0;
        };
        if let Some(pos) = self.styles.iter().position(|s| s == style) {
            return pos as u32;
        }
        let xf = Xf {
            font: intern(&mut self.fonts, &style.font),
            fill: intern(&mut self.fills, &style.fill),
            border: intern(&mut self.borders, &style.border),
            num_fmt: self.num_fmt_id(&style.number_format),
            alignment: style.alignment.clone(),
            protection: style.protection.clone(),
        };
        self.styles.push(style.clone());
        self.xfs.push(xf);
        (self.xfs.len() - 1) as u32
    }

    /// Cell format for a date value: the cell's own style when it already
    /// formats dates, otherwise that style (or the base one) with ISO dates.
    pub(crate) fn date_xf(&mut self, style: Option<&Style>) -> u32 {
        if let Some(style) = style.filter(|s| s.is_date()) {
            return self.cell_xf(Some(style));
        }
        let mut dated = style
            .cloned()
            .or_else(|| self.styles.first().cloned())
            .unwrap_or_default();
        dated.number_format = ISO_DATE_FORMAT.to_string();
        self.cell_xf(Some(&dated))
    }

    pub(crate) fn dxf(&mut self, xml: &str) -> u32 {
        if let Some(pos) = self.dxfs.iter().position(|d| d == xml) {
            return pos as u32;
        }
        self.dxfs.push(xml.to_string());
        (self.dxfs.len() - 1) as u32
    }

    fn num_fmt_id(&mut self, code: &str) -> u32 {
        if let Some(id) = builtin_id(code) {
            return id;
        }
        if let Some((id, _)) = self.custom_formats.iter().find(|(_, c)| c == code) {
            return *id;
        }
        let id = FIRST_CUSTOM_ID + self.custom_formats.len() as u32;
        self.custom_formats.push((id, code.to_string()));
        id
    }

    pub(crate) fn to_xml(&self) -> String {
        let mut out = String::from(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push('\n');
        Tag::new("styleSheet").attr("xmlns", MAIN_NS).open(&mut out);

        if !self.custom_formats.is_empty() {
            Tag::new("numFmts").attr("count", self.custom_formats.len()).open(&mut out);
            for (id, code) in &self.custom_formats {
                Tag::new("numFmt").attr("numFmtId", id).attr("formatCode", code).empty(&mut out);
            }
            close(&mut out, "numFmts");
        }

        Tag::new("fonts").attr("count", self.fonts.len()).open(&mut out);
        for font in &self.fonts {
            write_font(&mut out, font);
        }
        close(&mut out, "fonts");

        Tag::new("fills").attr("count", self.fills.len()).open(&mut out);
        for fill in &self.fills {
            write_fill(&mut out, fill);
        }
        close(&mut out, "fills");

        Tag::new("borders").attr("count", self.borders.len()).open(&mut out);
        for border in &self.borders {
            write_border(&mut out, border);
        }
        close(&mut out, "borders");

        out.push_str(r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#);

        Tag::new("cellXfs").attr("count", self.xfs.len()).open(&mut out);
        for xf in &self.xfs {
            write_xf(&mut out, xf);
        }
        close(&mut out, "cellXfs");

        out.push_str(r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#);

        Tag::new("dxfs").attr("count", self.dxfs.len()).open(&mut out);
        for dxf in &self.dxfs {
            out.push_str(dxf);
        }
        close(&mut out, "dxfs");

        close(&mut out, "styleSheet");
        out
    }
}

fn fallback_font() -> Font {
    Font {
        name: Some("Calibri".to_string()),
        size: Some(11.0),
        family: Some(2),
        scheme: Some("minor".to_string()),
        ..Font::default()
    }
}

fn intern<T: Clone + PartialEq>(items: &mut Vec<T>, item: &T) -> usize {
    match items.iter().position(|i| i == item) {
        Some(pos) => pos,
        None => {
            items.push(item.clone());
            items.len() - 1
        }
    }
}

pub(super) fn write_color(out: &mut String, name: &'static str, color: &Color) {
    let tag = Tag::new(name);
    let tag = match color {
        Color::Rgb(rgb) => tag.attr("rgb", rgb),
        Color::Theme { index, tint } => tag.attr("theme", index).attr_opt("tint", *tint),
        Color::Indexed(index) => tag.attr("indexed", index),
        Color::Auto => tag.attr("auto", 1),
    };
    tag.empty(out);
}

fn write_font(out: &mut String, font: &Font) {
    out.push_str("<font>");
    for (name, on) in [("b", font.bold), ("i", font.italic), ("strike", font.strike)] {
        if on {
            Tag::new(name).empty(out);
        }
    }
    if let Some(u) = &font.underline {
        let tag = Tag::new("u");
        let tag = if u == "single" { tag } else { tag.attr("val", u) };
        tag.empty(out);
    }
    if let Some(v) = &font.vert_align {
        Tag::new("vertAlign").attr("val", v).empty(out);
    }
    if let Some(sz) = font.size {
        Tag::new("sz").attr("val", sz).empty(out);
    }
    if let Some(color) = &font.color {
        write_color(out, "color", color);
    }
    if let Some(name) = &font.name {
        Tag::new("name").attr("val", name).empty(out);
    }
    if let Some(family) = font.family {
        Tag::new("family").attr("val", family).empty(out);
    }
    if let Some(charset) = font.charset {
        Tag::new("charset").attr("val", charset).empty(out);
    }
    if let Some(scheme) = &font.scheme {
        Tag::new("scheme").attr("val", scheme).empty(out);
    }
    out.push_str("</font>");
}

fn write_fill(out: &mut String, fill: &Fill) {
    out.push_str("<fill>");
    match fill {
        Fill::None => out.push_str(r#"<patternFill patternType="none"/>"#),
        Fill::Pattern { pattern, fg, bg } => {
            let tag = Tag::new("patternFill").attr("patternType", pattern);
            if fg.is_none() && bg.is_none() {
                tag.empty(out);
            } else {
                tag.open(out);
                if let Some(fg) = fg {
                    write_color(out, "fgColor", fg);
                }
                if let Some(bg) = bg {
                    write_color(out, "bgColor", bg);
                }
                close(out, "patternFill");
            }
        }
        Fill::Gradient(xml) => out.push_str(xml),
    }
    out.push_str("</fill>");
}

fn write_edge(out: &mut String, name: &'static str, edge: &BorderEdge) {
    let tag = Tag::new(name).attr_opt("style", edge.style.as_deref());
    match &edge.color {
        Some(color) => {
            tag.open(out);
            write_color(out, "color", color);
            close(out, name);
        }
        None => tag.empty(out),
    }
}

fn write_border(out: &mut String, border: &Border) {
    Tag::new("border")
        .flag("diagonalUp", border.diagonal_up)
        .flag("diagonalDown", border.diagonal_down)
        .open(out);
    write_edge(out, "left", &border.left);
    write_edge(out, "right", &border.right);
    write_edge(out, "top", &border.top);
    write_edge(out, "bottom", &border.bottom);
    write_edge(out, "diagonal", &border.diagonal);
    close(out, "border");
}

fn write_xf(out: &mut String, xf: &Xf) {
    let tag = Tag::new("xf")
        .attr("numFmtId", xf.num_fmt)
        .attr("fontId", xf.font)
        .attr("fillId", xf.fill)
        .attr("borderId", xf.border)
        .attr("xfId", 0)
        .flag("applyNumberFormat", xf.num_fmt != 0)
        .flag("applyFont", xf.font != 0)
        .flag("applyFill", xf.fill != 0)
        .flag("applyBorder", xf.border != 0)
        .flag("applyAlignment", !xf.alignment.is_default())
        .flag("applyProtection", !xf.protection.is_default());
    if xf.alignment.is_default() && xf.protection.is_default() {
        tag.empty(out);
        return;
    }
    tag.open(out);
    if !xf.alignment.is_default() {
        let a = &xf.alignment;
        Tag::new("alignment")
            .attr_opt("horizontal", a.horizontal.as_deref())
            .attr_opt("vertical", a.vertical.as_deref())
            .attr_opt("textRotation", (a.text_rotation != 0).then_some(a.text_rotation))
            .flag("wrapText", a.wrap_text)
            .attr_opt("indent", (a.indent != 0).then_some(a.indent))
            .flag("shrinkToFit", a.shrink_to_fit)
            .empty(out);
    }
    if !xf.protection.is_default() {
        Tag::new("protection")
            .attr("locked", u8::from(xf.protection.locked))
            .attr("hidden", u8::from(xf.protection.hidden))
            .empty(out);
    }
    close(out, "xf");
}
