//! HTML → [`Dom`] tree builder on top of quick-xml's event reader.
//!
//! quick-xml is an XML tokenizer, so three HTML rules are layered on top:
//!
//! - void elements (`<link>`, `<meta>`, ...) never take children
//! - `<script>`/`<style>` bodies are raw text, sliced straight from the input
//!   up to the matching close tag
//! - end tags close the nearest matching open element; stray ones are dropped
//!
//! A `<` that cannot start markup is kept as text, and a `/` closing an
//! unquoted attribute value does not make the tag self-closing.

use super::{Attributes, Dom, NodeData, NodeId};
use crate::error::{BundleError, BundleResult};
use crate::utils::xml::create_xml_reader;
use quick_xml::events::{BytesStart, Event};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Parse `content` into a new `Document` node of `dom`.
///
/// `name` is only used in error messages.
pub fn parse_document(dom: &mut Dom, name: &str, content: &[u8]) -> BundleResult<NodeId> {
    let document = dom.create(NodeData::Document {
        attrs: Attributes::new(),
    });
    let mut builder = TreeBuilder::new(dom, document);
    let mut offset = 0;

    // A fresh reader is started after every raw-text body, since quick-xml
    // would otherwise try to tokenize script source as markup, and after
    // every bare `<`, which it would read as a nameless tag.
    'chunks: loop {
        let mut reader = create_xml_reader(&content[offset..]);
        loop {
            let at = offset + reader.buffer_position() as usize;
            if is_bare_lt(content, at) {
                builder.text("<");
                offset = at + 1;
                continue 'chunks;
            }

            let event = reader.read_event().map_err(|err| BundleError::Parse {
                path: name.to_owned(),
                position: offset + reader.error_position() as usize,
                message: err.to_string(),
            })?;

            let (tag, attrs) = match event {
                Event::Start(elem) => read_start(&elem),
                Event::Empty(elem) => {
                    let (tag, mut attrs) = read_start(&elem);
                    if !slash_ends_unquoted_value(&elem) {
                        builder.leaf(&tag, attrs);
                        continue;
                    }
                    // `<a href=/docs/>`: the slash belongs to the value.
                    if let Some((_, value)) = attrs.0.last_mut() {
                        value.push('/');
                    }
                    (tag, attrs)
                }
                Event::End(elem) => {
                    builder.close(&String::from_utf8_lossy(elem.name().as_ref()).to_ascii_lowercase());
                    continue;
                }
                Event::Text(text) => {
                    builder.text(&String::from_utf8_lossy(&text));
                    continue;
                }
                Event::GeneralRef(entity) => {
                    builder.text(&format!("&{};", String::from_utf8_lossy(&entity)));
                    continue;
                }
                Event::CData(cdata) => {
                    builder.text(&format!("<![CDATA[{}]]>", String::from_utf8_lossy(&cdata)));
                    continue;
                }
                Event::Comment(comment) => {
                    builder.push(NodeData::Comment(String::from_utf8_lossy(&comment).into_owned()));
                    continue;
                }
                Event::DocType(doctype) => {
                    let doctype = String::from_utf8_lossy(&doctype).trim().to_owned();
                    builder.push(NodeData::Doctype(doctype));
                    continue;
                }
                Event::Eof => break 'chunks,
                _ => continue,
            };

            if VOID_ELEMENTS.contains(&tag.as_str()) {
                builder.leaf(&tag, attrs);
            } else if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
                let body_start = offset + reader.buffer_position() as usize;
                let (body_end, resume) = find_raw_text_end(content, body_start, &tag);
                builder.raw(&tag, attrs, &content[body_start..body_end]);
                offset = resume;
                continue 'chunks;
            } else {
                builder.open(&tag, attrs);
            }
        }
    }

    Ok(document)
}

/// Lowercased tag name and attributes of a start tag.
///
/// Malformed attributes are skipped, valueless ones get an empty value.
fn read_start(elem: &BytesStart<'_>) -> (String, Attributes) {
    let tag = String::from_utf8_lossy(elem.name().as_ref()).to_ascii_lowercase();
    let attrs = elem
        .html_attributes()
        .flatten()
        .map(|attr| {
            (
                String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase(),
                String::from_utf8_lossy(attr.value.as_ref()).into_owned(),
            )
        })
        .collect();
    (tag, attrs)
}

/// A `<` at `at` that cannot open markup (`a < b`, or a trailing `<`) is
/// plain text. Markup starts with a letter, `/`, `!` or `?`.
fn is_bare_lt(content: &[u8], at: usize) -> bool {
    content.get(at) == Some(&b'<')
        && !content
            .get(at + 1)
            .is_some_and(|&b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?'))
}

/// quick-xml reports `<a href=/docs/>` as an empty element. In HTML a slash
/// right after an unquoted value is part of that value, so the tag is an
/// ordinary start tag.
///
/// `content` is the tag body without the trailing `/`.
fn slash_ends_unquoted_value(content: &[u8]) -> bool {
    let last = content
        .rsplit(|b| b.is_ascii_whitespace())
        .next()
        .unwrap_or_default();
    let Some(eq) = last.iter().position(|&b| b == b'=') else {
        return false;
    };
    let value = &last[eq + 1..];
    match (value.first(), value.last()) {
        (Some(&first), Some(&end)) => !matches!(first, b'"' | b'\'') && !matches!(end, b'"' | b'\''),
        _ => false,
    }
}

/// Locate `</tag` (ASCII case-insensitive) at or after `start`.
///
/// Returns `(end of body, offset just past the close tag)`. An unterminated
/// body runs to the end of input.
fn find_raw_text_end(content: &[u8], start: usize, tag: &str) -> (usize, usize) {
    let needle = format!("</{tag}");
    let needle = needle.as_bytes();
    let haystack = &content[start..];

    let found = haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle));

    match found {
        Some(pos) => {
            let body_end = start + pos;
            let resume = content[body_end..]
                .iter()
                .position(|&b| b == b'>')
                .map_or(content.len(), |gt| body_end + gt + 1);
            (body_end, resume)
        }
        None => (content.len(), content.len()),
    }
}

// ============================================================================
// Tree Builder
// ============================================================================

struct TreeBuilder<'a> {
    dom: &'a mut Dom,
    /// Open elements, innermost last. The document sits at the bottom with an
    /// empty name.
    open: Vec<(NodeId, String)>,
}

impl<'a> TreeBuilder<'a> {
    fn new(dom: &'a mut Dom, document: NodeId) -> Self {
        Self {
            dom,
            open: vec![(document, String::new())],
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().map(|(id, _)| *id).unwrap_or_else(|| unreachable!())
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = self.dom.create(data);
        let parent = self.current();
        self.dom.append_child(parent, id);
        id
    }

    fn open(&mut self, tag: &str, attrs: Attributes) {
        let id = self.push(NodeData::Element {
            name: tag.to_owned(),
            attrs,
        });
        self.open.push((id, tag.to_owned()));
    }

    fn leaf(&mut self, tag: &str, attrs: Attributes) {
        self.push(NodeData::Element {
            name: tag.to_owned(),
            attrs,
        });
    }

    fn raw(&mut self, tag: &str, attrs: Attributes, body: &[u8]) {
        let element = self.push(NodeData::Element {
            name: tag.to_owned(),
            attrs,
        });
        if !body.is_empty() {
            let data = self
                .dom
                .create(NodeData::Data(String::from_utf8_lossy(body).into_owned()));
            self.dom.append_child(element, data);
        }
    }

    /// Pop up to and including the innermost open `tag`. Unknown end tags are
    /// ignored; the document itself is never popped.
    fn close(&mut self, tag: &str) {
        if let Some(pos) = self.open.iter().skip(1).rposition(|(_, name)| name == tag) {
            self.open.truncate(pos + 1);
        }
    }

    /// Append text, merging with a preceding text sibling.
    fn text(&mut self, text: &str) {
        let parent = self.current();
        if let Some(&last) = self.dom.children(parent).last()
            && let NodeData::Text(existing) = self.dom.data_mut(last)
        {
            existing.push_str(text);
            return;
        }
        self.push(NodeData::Text(text.to_owned()));
    }
}

// ============================================================================
// Tests
// ============================================================================
