use std::collections::HashMap;

use dcfm_model::{
    Alignment, Border, BorderEdge, Color, DifferentialStyle, Fill, Font, Protection, Style,
    GENERAL_FORMAT,
};
use roxmltree::Node;

use crate::error::XlsxResult;
use crate::numfmt::builtin_format;
use crate::xml::{self, attr, attr_bool, attr_f64, attr_u32, child, children, toggle, val};

/// Parsed `styles.xml`, with every cell format resolved to a model [`Style`].
#[derive(Debug, Default)]
pub(crate) struct StyleSheet {
    styles: Vec<Style>,
    base: Style,
    dxfs: Vec<DifferentialStyle>,
    default_font: Option<Font>,
}

impl StyleSheet {
    pub(crate) fn parse(part: &str, text: &str) -> XlsxResult<Self> {
        let doc = xml::parse(part, text)?;
        let root = doc.root_element();

        let num_fmts: HashMap<u32, String> = child(root, "numFmts")
            .map(|n| {
                children(n, "numFmt")
                    .filter_map(|f| Some((attr_u32(f, "numFmtId")?, attr(f, "formatCode")?.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        let fonts: Vec<Font> = section(root, "fonts", "font").map(parse_font).collect();
        let fills: Vec<Fill> = section(root, "fills", "fill").map(parse_fill).collect();
        let borders: Vec<Border> = section(root, "borders", "border").map(parse_border).collect();
        let dxfs = section(root, "dxfs", "dxf")
            .map(|n| DifferentialStyle::new(xml::serialize_element(n)))
            .collect();

        let default_font = fonts.first().cloned();
        let base = Style {
            font: default_font.clone().unwrap_or_default(),
            ..Style::default()
        };

        let styles = section(root, "cellXfs", "xf")
            .map(|xf| {
                let number_format = attr_u32(xf, "numFmtId")
                    .and_then(|id| {
                        num_fmts
                            .get(&id)
                            .cloned()
                            .or_else(|| builtin_format(id).map(str::to_string))
                    })
                    .unwrap_or_else(|| GENERAL_FORMAT.to_string());
                Style {
                    font: pick(&fonts, xf, "fontId"),
                    fill: pick(&fills, xf, "fillId"),
                    border: pick(&borders, xf, "borderId"),
                    number_format,
                    alignment: child(xf, "alignment").map(parse_alignment).unwrap_or_default(),
                    protection: child(xf, "protection").map(parse_protection).unwrap_or_default(),
                }
            })
            .collect();

        Ok(Self { styles, base, dxfs, default_font })
    }

    /// Style for a cell format index. `None` when the index is unknown or the
    /// format is indistinguishable from the workbook's base look.
    pub(crate) fn cell_style(&self, xf: u32) -> Option<Style> {
        self.styles
            .get(xf as usize)
            .filter(|s| **s != self.base)
            .cloned()
    }

    pub(crate) fn is_date(&self, xf: u32) -> bool {
        self.styles.get(xf as usize).is_some_and(Style::is_date)
    }

    pub(crate) fn dxf(&self, id: u32) -> Option<&DifferentialStyle> {
        self.dxfs.get(id as usize)
    }

    pub(crate) fn default_font(&self) -> Option<&Font> {
        self.default_font.as_ref()
    }
}

fn section<'a, 'input: 'a>(
    root: Node<'a, 'input>,
    container: &'a str,
    item: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    child(root, container)
        .into_iter()
        .flat_map(move |c| children(c, item))
}

fn pick<T: Clone + Default>(items: &[T], xf: Node<'_, '_>, id_attr: &str) -> T {
    attr_u32(xf, id_attr)
        .and_then(|id| items.get(id as usize))
        .cloned()
        .unwrap_or_default()
}

pub(super) fn parse_color(node: Node<'_, '_>) -> Option<Color> {
    if attr_bool(node, "auto") == Some(true) {
        return Some(Color::Auto);
    }
    if let Some(rgb) = attr(node, "rgb") {
        return Some(Color::Rgb(rgb.to_ascii_uppercase()));
    }
    if let Some(index) = attr_u32(node, "theme") {
        return Some(Color::Theme { index, tint: attr_f64(node, "tint") });
    }
    attr_u32(node, "indexed").map(Color::Indexed)
}

fn parse_font(node: Node<'_, '_>) -> Font {
    Font {
        name: val(node, "name").map(str::to_string),
        size: val(node, "sz").and_then(|v| v.parse().ok()),
        bold: toggle(node, "b"),
        italic: toggle(node, "i"),
        strike: toggle(node, "strike"),
        underline: child(node, "u")
            .map(|u| attr(u, "val").unwrap_or("single").to_string())
            .filter(|u| u != "none"),
        vert_align: val(node, "vertAlign").map(str::to_string),
        color: child(node, "color").and_then(parse_color),
        family: val(node, "family").and_then(|v| v.parse().ok()),
        charset: val(node, "charset").and_then(|v| v.parse().ok()),
        scheme: val(node, "scheme").map(str::to_string),
    }
}

fn parse_fill(node: Node<'_, '_>) -> Fill {
    if let Some(gradient) = child(node, "gradientFill") {
        return Fill::Gradient(xml::serialize_element(gradient));
    }
    let Some(pattern) = child(node, "patternFill") else {
        return Fill::None;
    };
    let fg = child(pattern, "fgColor").and_then(parse_color);
    let bg = child(pattern, "bgColor").and_then(parse_color);
    match attr(pattern, "patternType") {
        Some("none") => Fill::None,
        None if fg.is_none() && bg.is_none() => Fill::None,
        // A pattern fill without a type but with colours renders as solid.
        other => Fill::Pattern {
            pattern: other.unwrap_or("solid").to_string(),
            fg,
            bg,
        },
    }
}

fn parse_edge(node: Option<Node<'_, '_>>) -> BorderEdge {
    let Some(node) = node else {
        return BorderEdge::default();
    };
    BorderEdge {
        style: attr(node, "style").filter(|s| *s != "none").map(str::to_string),
        color: child(node, "color").and_then(parse_color),
    }
}

fn parse_border(node: Node<'_, '_>) -> Border {
    Border {
        left: parse_edge(child(node, "left").or_else(|| child(node, "start"))),
        right: parse_edge(child(node, "right").or_else(|| child(node, "end"))),
        top: parse_edge(child(node, "top")),
        bottom: parse_edge(child(node, "bottom")),
        diagonal: parse_edge(child(node, "diagonal")),
        diagonal_up: attr_bool(node, "diagonalUp").unwrap_or(false),
        diagonal_down: attr_bool(node, "diagonalDown").unwrap_or(false),
    }
}

fn parse_alignment(node: Node<'_, '_>) -> Alignment {
    Alignment {
        horizontal: attr(node, "horizontal").map(str::to_string),
        vertical: attr(node, "vertical").map(str::to_string),
        wrap_text: attr_bool(node, "wrapText").unwrap_or(false),
        shrink_to_fit: attr_bool(node, "shrinkToFit").unwrap_or(false),
        indent: attr_u32(node, "indent").unwrap_or(0),
        text_rotation: attr_u32(node, "textRotation").unwrap_or(0),
    }
}

fn parse_protection(node: Node<'_, '_>) -> Protection {
    Protection {
        locked: attr_bool(node, "locked").unwrap_or(true),
        hidden: attr_bool(node, "hidden").unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="#,##0.0x"/></numFmts>
  <fonts count="2">
    <font><sz val="10"/><name val="Arial"/></font>
    <font><b/><sz val="12"/><color rgb="ff1f4e79"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor theme="4" tint="0.4"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left/><right/><top style="thin"><color auto="1"/></top><bottom style="double"/><diagonal/></border>
  </borders>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="164" fontId="1" fillId="2" borderId="1" applyNumberFormat="1">
      <alignment horizontal="center" wrapText="1"/>
      <protection locked="0"/>
    </xf>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="10" fontId="0" fillId="0" borderId="0"/>
  </cellXfs>
  <dxfs count="1"><dxf><font><color rgb="FF9C0006"/></font></dxf></dxfs>
</styleSheet>"##;

    #[test]
    fn resolves_cell_formats() {
        let sheet = StyleSheet::parse("xl/styles.xml", STYLES).unwrap();
        assert!(sheet.cell_style(0).is_none());
        let style = sheet.cell_style(1).unwrap();
        assert!(style.font.bold);
        assert_eq!(style.font.size, Some(12.0));
        assert_eq!(style.font.color, Some(Color::Rgb("FF1F4E79".into())));
        assert_eq!(style.number_format, "#,##0.0x");
        assert_eq!(
            style.fill,
            Fill::Pattern {
                pattern: "solid".into(),
                fg: Some(Color::Theme { index: 4, tint: Some(0.4) }),
                bg: Some(Color::Indexed(64)),
            }
        );
        assert_eq!(style.border.top.style.as_deref(), Some("thin"));
        assert_eq!(style.border.top.color, Some(Color::Auto));
        assert_eq!(style.border.bottom.style.as_deref(), Some("double"));
        assert!(style.border.left.is_empty());
        assert_eq!(style.alignment.horizontal.as_deref(), Some("center"));
        assert!(style.alignment.wrap_text);
        assert!(!style.protection.locked);
        assert_eq!(sheet.default_font().unwrap().name.as_deref(), Some("Arial"));
    }

    #[test]
    fn builtin_formats_and_dates() {
        let sheet = StyleSheet::parse("xl/styles.xml", STYLES).unwrap();
        assert!(sheet.is_date(2));
        assert!(!sheet.is_date(3));
        assert_eq!(sheet.cell_style(3).unwrap().number_format, "0.00%");
        assert!(sheet.cell_style(99).is_none());
    }

    #[test]
    fn differential_formats_are_detached() {
        let sheet = StyleSheet::parse("xl/styles.xml", STYLES).unwrap();
        assert_eq!(sheet.dxf(0).unwrap().xml, r#"<dxf><font><color rgb="FF9C0006"/></font></dxf>"#);
        assert!(sheet.dxf(1).is_none());
    }
}
