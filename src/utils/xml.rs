//! quick-xml reader/writer setup shared by the parser and the serializer.

use quick_xml::{Reader, Writer, events::BytesStart};
use std::io::Cursor;

pub type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Create a reader tolerant enough for hand-written HTML.
#[inline]
pub fn create_xml_reader(content: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(content);
    let config = reader.config_mut();
    config.trim_text(false);
    config.enable_all_checks(false);
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    reader
}

#[inline]
pub fn create_xml_writer(capacity: usize) -> XmlWriter {
    Writer::new(Cursor::new(Vec::with_capacity(capacity)))
}

/// Build a start tag from already-escaped attribute values.
///
/// The tag body is assembled as text so values are not escaped a second time
/// and empty attributes stay in their bare HTML form (`<script defer>`).
/// Values written in single quotes may hold a literal `"`; it becomes
/// `&quot;` since every value is emitted double-quoted.
pub fn raw_start<'a>(tag: &str, attrs: impl Iterator<Item = (&'a str, &'a str)>) -> BytesStart<'static> {
    let mut content = String::from(tag);
    for (key, value) in attrs {
        content.push(' ');
        content.push_str(key);
        if !value.is_empty() {
            content.push_str("=\"");
            content.push_str(&value.replace('"', "&quot;"));
            content.push('"');
        }
    }
    BytesStart::from_content(content, tag.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;

    fn start_tag(tag: &str, attrs: &[(&str, &str)]) -> String {
        let mut writer = create_xml_writer(64);
        writer
            .write_event(Event::Start(raw_start(tag, attrs.iter().copied())))
            .unwrap();
        String::from_utf8(writer.into_inner().into_inner()).unwrap()
    }

    #[test]
    fn test_raw_start_keeps_escapes() {
        assert_eq!(
            start_tag("a", &[("href", "x?a=1&amp;b=2"), ("title", "&quot;q&quot;")]),
            "<a href=\"x?a=1&amp;b=2\" title=\"&quot;q&quot;\">"
        );
    }

    #[test]
    fn test_raw_start_escapes_double_quote() {
        assert_eq!(
            start_tag("div", &[("onclick", "f(\"a\")"), ("title", "it's")]),
            "<div onclick=\"f(&quot;a&quot;)\" title=\"it's\">"
        );
    }

    #[test]
    fn test_raw_start_bare_attribute() {
        assert_eq!(start_tag("script", &[("defer", ""), ("src", "x.js")]), "<script defer src=\"x.js\">");
    }
}
