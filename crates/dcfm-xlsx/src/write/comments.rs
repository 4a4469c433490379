//! Cell notes: the comments part and the legacy VML drawing Excel needs to
//! show them.

use dcfm_model::{CellRef, Comment};

use super::{text_element, XML_DECL};
use crate::xml::{close, escape_text, Tag, MAIN_NS};

pub(super) fn comments_xml(comments: &[(CellRef, Comment)]) -> String {
    let mut authors: Vec<&str> = Vec::new();
    for (_, comment) in comments {
        if !authors.contains(&comment.author.as_str()) {
            authors.push(&comment.author);
        }
    }

    let mut out = String::from(XML_DECL);
    out.push('\n');
    Tag::new("comments").attr("xmlns", MAIN_NS).open(&mut out);
    out.push_str("<authors>");
    for author in &authors {
        Tag::new("author").text(&mut out, author);
    }
    out.push_str("</authors><commentList>");
    for (at, comment) in comments {
        let author_id = authors
            .iter()
            .position(|a| *a == comment.author)
            .unwrap_or(0);
        Tag::new("comment")
            .attr("ref", at)
            .attr("authorId", author_id)
            .open(&mut out);
        out.push_str("<text>");
        text_element(&mut out, &comment.text);
        out.push_str("</text>");
        close(&mut out, "comment");
    }
    out.push_str("</commentList>");
    close(&mut out, "comments");
    out
}

const VML_HEADER: &str = r##"<xml xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office" xmlns:x="urn:schemas-microsoft-com:office:excel">
<o:shapelayout v:ext="edit"><o:idmap v:ext="edit" data="1"/></o:shapelayout>
<v:shapetype id="_x0000_t202" coordsize="21600,21600" o:spt="202" path="m,l,21600r21600,l21600,xe">
<v:stroke joinstyle="miter"/><v:path gradientshapeok="t" o:connecttype="rect"/>
</v:shapetype>
"##;

pub(super) fn vml_xml(comments: &[(CellRef, Comment)]) -> String {
    let mut out = String::from(VML_HEADER);
    for (index, (at, _)) in comments.iter().enumerate() {
        // VML rows and columns are zero-based.
        let row = at.row - 1;
        let col = at.col - 1;
        out.push_str(&format!(
            concat!(
                r##"<v:shape id="_x0000_s{id}" type="#_x0000_t202" "##,
                r##"style="position:absolute;margin-left:59.25pt;margin-top:1.5pt;width:108pt;height:59.25pt;z-index:{z};visibility:hidden" "##,
                r##"fillcolor="#ffffe1" o:insetmode="auto">"##,
                r##"<v:fill color2="#ffffe1"/><v:shadow on="t" color="black" obscured="t"/>"##,
                r##"<v:path o:connecttype="none"/><v:textbox style="mso-direction-alt:auto"><div style="text-align:left"></div></v:textbox>"##,
                r##"<x:ClientData ObjectType="Note"><x:MoveWithCells/><x:SizeWithCells/>"##,
                r##"<x:Anchor>{anchor}</x:Anchor><x:AutoFill>False</x:AutoFill>"##,
                r##"<x:Row>{row}</x:Row><x:Column>{col}</x:Column></x:ClientData></v:shape>"##,
                "\n"
            ),
            id = 1025 + index,
            z = index + 1,
            anchor = escape_text(&format!("{}, 15, {}, 2, {}, 15, {}, 16", col + 1, row, col + 3, row + 4)),
            row = row,
            col = col,
        ));
    }
    out.push_str("</xml>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes() -> Vec<(CellRef, Comment)> {
        vec![
            (CellRef::new(2, 3), Comment::new("Analyst", "Source: FactSet")),
            (CellRef::new(5, 1), Comment::new("Reviewer", "Check")),
            (CellRef::new(6, 1), Comment::new("Analyst", "Restated")),
        ]
    }

    #[test]
    fn authors_are_deduplicated() {
        let xml = comments_xml(&notes());
        assert!(xml.contains("<authors><author>Analyst</author><author>Reviewer</author></authors>"));
        assert!(xml.contains(r#"<comment ref="A6" authorId="0"><text><t>Restated</t></text></comment>"#));
    }

    #[test]
    fn vml_anchors_are_zero_based() {
        let xml = vml_xml(&notes());
        assert!(xml.contains("<x:Row>1</x:Row><x:Column>2</x:Column>"));
        assert_eq!(xml.matches("<v:shape ").count(), 3);
    }
}
