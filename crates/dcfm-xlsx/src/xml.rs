//! Small helpers over `roxmltree` for reading, and string escaping for writing.
//!
//! Element and attribute matching is by local name only; producers disagree
//! on prefixes, and nothing in the parts we read depends on them.

use roxmltree::{Document, Node};

use crate::error::{XlsxError, XlsxResult};

pub(crate) const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

pub(crate) fn parse<'input>(part: &str, text: &'input str) -> XlsxResult<Document<'input>> {
    Document::parse(text).map_err(|source| XlsxError::Xml {
        part: part.to_string(),
        source,
    })
}

pub(crate) fn is(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is(n, name))
}

pub(crate) fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |n| is(n, name))
}

pub(crate) fn attr<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes().find(|a| a.name() == name).map(|a| a.value())
}

pub(crate) fn attr_bool(node: Node<'_, '_>, name: &str) -> Option<bool> {
    attr(node, name).map(parse_bool)
}

pub(crate) fn attr_u32(node: Node<'_, '_>, name: &str) -> Option<u32> {
    attr(node, name).and_then(|v| v.trim().parse().ok())
}

pub(crate) fn attr_f64(node: Node<'_, '_>, name: &str) -> Option<f64> {
    attr(node, name).and_then(|v| v.trim().parse().ok())
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "on")
}

/// Toggle elements such as `<b/>` are on unless `val` says otherwise.
pub(crate) fn toggle(node: Node<'_, '_>, name: &str) -> bool {
    child(node, name).is_some_and(|n| attr_bool(n, "val").unwrap_or(true))
}

pub(crate) fn val<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    child(node, name).and_then(|n| attr(n, "val"))
}

/// Plain text of a string item (`<si>`, `<is>`): all `<t>` runs concatenated,
/// phonetic guides skipped.
pub(crate) fn rich_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| is(n, "t"))
        .filter(|n| !n.ancestors().any(|a| is(&a, "rPh")))
        .filter_map(|n| n.text())
        .collect()
}

pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;").replace('\n', "&#10;")
}

/// Start tag under construction. Attributes are escaped as they are added.
pub(crate) struct Tag {
    buf: String,
    name: &'static str,
}

impl Tag {
    pub(crate) fn new(name: &'static str) -> Self {
        let mut buf = String::with_capacity(64);
        buf.push('<');
        buf.push_str(name);
        Self { buf, name }
    }

    pub(crate) fn attr(mut self, key: &str, value: impl std::fmt::Display) -> Self {
        self.buf.push(' ');
        self.buf.push_str(key);
        self.buf.push_str("=\"");
        self.buf.push_str(&escape_attr(&value.to_string()));
        self.buf.push('"');
        self
    }

    pub(crate) fn attr_opt<T: std::fmt::Display>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.attr(key, v),
            None => self,
        }
    }

    /// `key="1"` when set, nothing otherwise.
    pub(crate) fn flag(self, key: &str, on: bool) -> Self {
        if on {
            self.attr(key, 1)
        } else {
            self
        }
    }

    /// `<name .../>`
    pub(crate) fn empty(mut self, out: &mut String) {
        self.buf.push_str("/>");
        out.push_str(&self.buf);
    }

    /// `<name ...>`; the caller writes the matching [`close`].
    pub(crate) fn open(mut self, out: &mut String) {
        self.buf.push('>');
        out.push_str(&self.buf);
    }

    /// `<name ...>text</name>`
    pub(crate) fn text(mut self, out: &mut String, text: &str) {
        self.buf.push('>');
        self.buf.push_str(&escape_text(text));
        out.push_str(&self.buf);
        close(out, self.name);
    }
}

pub(crate) fn close(out: &mut String, name: &str) {
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Re-serialize an element subtree from the main namespace without prefixes.
///
/// Attributes and elements from other namespaces (extension lists, revision
/// ids) are dropped because their declarations would not travel with them.
pub(crate) fn serialize_element(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    write_element(node, &mut out);
    out
}

fn write_element(node: Node<'_, '_>, out: &mut String) {
    let name = node.tag_name().name();
    out.push('<');
    out.push_str(name);
    for a in node.attributes().filter(|a| a.namespace().is_none()) {
        out.push(' ');
        out.push_str(a.name());
        out.push_str("=\"");
        out.push_str(&escape_attr(a.value()));
        out.push('"');
    }
    let mut kids = node
        .children()
        .filter(|c| c.is_text() || (c.is_element() && in_main_ns(c)))
        .peekable();
    if kids.peek().is_none() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for kid in kids {
        if kid.is_text() {
            out.push_str(&escape_text(kid.text().unwrap_or_default()));
        } else {
            write_element(kid, out);
        }
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn in_main_ns(node: &Node<'_, '_>) -> bool {
    matches!(node.tag_name().namespace(), None | Some(MAIN_NS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rich_text_skips_phonetics() {
        let xml = r#"<si xmlns="x"><r><t>Hello </t></r><r><t>World</t></r><rPh><t>ignored</t></rPh></si>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(rich_text(doc.root_element()), "Hello World");
    }

    #[test]
    fn serialize_drops_foreign_namespaces() {
        let xml = r#"<dxf xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:x14="urn:x14"><font><b/><color rgb="FF9C0006"/></font><x14:ext a="1"/><fill><patternFill><bgColor rgb="FFFFC7CE"/></patternFill></fill></dxf>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(
            serialize_element(doc.root_element()),
            r#"<dxf><font><b/><color rgb="FF9C0006"/></font><fill><patternFill><bgColor rgb="FFFFC7CE"/></patternFill></fill></dxf>"#
        );
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_text("a<b & c>"), "a&lt;b &amp; c&gt;");
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }

    #[test]
    fn tags_escape_and_skip_unset() {
        let mut out = String::new();
        Tag::new("sheet")
            .attr("name", "P&L \"FY\"")
            .attr_opt("state", None::<&str>)
            .flag("hidden", false)
            .flag("selected", true)
            .empty(&mut out);
        Tag::new("t").attr("xml:space", "preserve").text(&mut out, "a<b");
        assert_eq!(
            out,
            r#"<sheet name="P&amp;L &quot;FY&quot;" selected="1"/><t xml:space="preserve">a&lt;b</t>"#
        );
    }

    #[test]
    fn toggles_default_on() {
        let doc = Document::parse(r#"<font><b/><i val="0"/></font>"#).unwrap();
        let font = doc.root_element();
        assert!(toggle(font, "b"));
        assert!(!toggle(font, "i"));
        assert!(!toggle(font, "strike"));
    }
}
