//! [`Dom`] → HTML text.
//!
//! Traversal is an explicit stack of open/close steps, same as the walker, so
//! deeply nested import graphs serialize without recursion.

use super::{Dom, NodeData, NodeId};
use crate::utils::xml::{XmlWriter, create_xml_writer, raw_start};
use quick_xml::events::{BytesEnd, BytesText, Event};
use std::io;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

enum Step {
    Open(NodeId),
    Close(NodeId),
}

/// Serialize everything under `root`. `Document` nodes contribute only their
/// children, so spliced imports leave no wrapper behind.
pub fn serialize(dom: &Dom, root: NodeId) -> io::Result<Vec<u8>> {
    let mut writer = create_xml_writer(4096);
    let mut steps = vec![Step::Open(root)];

    while let Some(step) = steps.pop() {
        match step {
            Step::Open(id) => {
                write_open(&mut writer, dom, id)?;
                if !is_void(dom, id) {
                    steps.push(Step::Close(id));
                    steps.extend(dom.children(id).iter().rev().map(|&c| Step::Open(c)));
                }
            }
            Step::Close(id) => {
                if let NodeData::Element { name, .. } = dom.data(id) {
                    writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                }
            }
        }
    }

    Ok(writer.into_inner().into_inner())
}

fn write_open(writer: &mut XmlWriter, dom: &Dom, id: NodeId) -> io::Result<()> {
    match dom.data(id) {
        NodeData::Document { .. } => {}
        NodeData::Element { name, attrs } => {
            writer.write_event(Event::Start(raw_start(name, attrs.iter())))?;
        }
        NodeData::Comment(text) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
        }
        NodeData::Text(text) | NodeData::Data(text) => {
            if !text.is_empty() {
                writer.write_event(Event::Text(BytesText::from_escaped(text.as_str())))?;
            }
        }
        NodeData::Doctype(doctype) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(doctype.as_str())))?;
        }
    }
    Ok(())
}

fn is_void(dom: &Dom, id: NodeId) -> bool {
    dom.tag_name(id).is_some_and(|tag| VOID_ELEMENTS.contains(&tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Attributes, parse_document};

    fn round_trip(html: &str) -> String {
        let mut dom = Dom::new();
        let root = parse_document(&mut dom, "t.html", html.as_bytes()).unwrap();
        String::from_utf8(serialize(&dom, root).unwrap()).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_markup() {
        let html = r#"<!DOCTYPE html><html><head><link rel="icon" href="a.png"></head><body><p class="x">a &amp; b</p></body></html>"#;
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_script_body_not_escaped() {
        let html = "<script>if (a < b && c) {}</script>";
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_comment_written() {
        assert_eq!(round_trip("<!-- @license x --><b></b>"), "<!-- @license x --><b></b>");
    }

    #[test]
    fn test_single_quoted_value_with_double_quotes() {
        assert_eq!(
            round_trip(r#"<div title='say "hi"' onclick='f("a")'>x</div>"#),
            r#"<div title="say &quot;hi&quot;" onclick="f(&quot;a&quot;)">x</div>"#
        );
    }

    #[test]
    fn test_bare_lt_in_text() {
        let html = "<p>a < b and c</p><i>z</i>";
        assert_eq!(round_trip(html), html);
    }

    #[test]
    fn test_unquoted_value_ending_in_slash() {
        assert_eq!(round_trip("<a href=/docs/>d</a><i>z</i>"), r#"<a href="/docs/">d</a><i>z</i>"#);
    }

    #[test]
    fn test_nested_document_has_no_wrapper() {
        let mut dom = Dom::new();
        let outer = parse_document(&mut dom, "a.html", b"<div><link rel=import href=b.html></div>")
            .unwrap();
        let inner = parse_document(&mut dom, "b.html", b"<span>b</span>").unwrap();
        dom.attrs_mut(inner).unwrap().set("href", "b.html");

        let div = dom.elements_by_tag(outer, "div")[0];
        let link = dom.children(div)[0];
        dom.replace(link, inner);

        let html = String::from_utf8(serialize(&dom, outer).unwrap()).unwrap();
        assert_eq!(html, "<div><span>b</span></div>");
    }

    #[test]
    fn test_created_element_with_attributes() {
        let mut dom = Dom::new();
        let attrs: Attributes = [("type", "module")].into_iter().collect();
        let script = dom.create_raw_element("script", attrs, "let a = '</div>';".into());
        let html = String::from_utf8(serialize(&dom, script).unwrap()).unwrap();
        assert_eq!(html, r#"<script type="module">let a = '</div>';</script>"#);
    }
}
