//! Merge runs of inline scripts.
//!
//! Inline scripts between two `src` scripts are concatenated into one block
//! placed before the next `src` script, so execution order is unchanged:
//!
//! ```text
//! <script>A</script>                <script>A\nB\n</script>
//! <script>B</script>           =>   <script src="x.js"></script>
//! <script src="x.js"></script>      ...
//! <script>C</script>                <body>... <script>C\n</script></body>
//! ```
//!
//! Whatever is left after the last `src` script goes to the end of the last
//! `<body>`.

use crate::dom::{Attributes, Dom, NodeId};

const CLASSIC_SCRIPT_TYPES: &[&str] = &[
    "text/javascript",
    "application/javascript",
    "text/ecmascript",
    "application/ecmascript",
    "javascript",
];

/// Combine inline scripts under `root`. Scripts inside an element named in
/// `passthrough` and non-classic scripts (`type="module"`, templates, JSON)
/// are not touched.
pub fn combine_scripts(dom: &mut Dom, root: NodeId, passthrough: &[String]) {
    let scripts: Vec<NodeId> = dom
        .elements_by_tag(root, "script")
        .into_iter()
        .filter(|&script| is_classic(dom, script) && !dom.has_ancestor_named(script, passthrough))
        .collect();

    let mut buffer = String::new();
    for script in scripts {
        if !dom.attr(script, "src").is_empty() {
            if !buffer.is_empty() {
                let merged = merged_script(dom, std::mem::take(&mut buffer));
                dom.insert_before(script, merged);
            }
        } else {
            buffer.push_str(&dom.inner_data(script));
            buffer.push('\n');
            dom.detach(script);
        }
    }

    if buffer.is_empty() {
        return;
    }
    let parent = dom
        .elements_by_tag(root, "body")
        .last()
        .copied()
        .unwrap_or(root);
    let merged = merged_script(dom, buffer);
    dom.append_child(parent, merged);
}

fn merged_script(dom: &mut Dom, body: String) -> NodeId {
    dom.create_raw_element("script", Attributes::new(), body)
}

fn is_classic(dom: &Dom, script: NodeId) -> bool {
    let kind = dom.attr(script, "type").trim();
    kind.is_empty()
        || CLASSIC_SCRIPT_TYPES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_document, serialize};

    fn combined(html: &str) -> String {
        let mut dom = Dom::new();
        let root = parse_document(&mut dom, "/t.html", html.as_bytes()).unwrap();
        combine_scripts(&mut dom, root, &["demo-snippet".to_string()]);
        String::from_utf8(serialize(&dom, root).unwrap()).unwrap()
    }

    #[test]
    fn test_groups_between_src_scripts() {
        let html = "<body><script>A</script><script>B</script>\
                    <script src=\"s1.js\"></script><script src=\"s2.js\"></script>\
                    <script>C</script><script>D</script><script src=\"s3.js\"></script>\
                    <script>E</script></body>";
        assert_eq!(
            combined(html),
            "<body><script>A\nB\n</script><script src=\"s1.js\"></script>\
             <script src=\"s2.js\"></script><script>C\nD\n</script>\
             <script src=\"s3.js\"></script><script>E\n</script></body>"
        );
    }

    #[test]
    fn test_trailing_block_goes_to_last_body() {
        let html = "<body><p></p></body><div><script>x</script></div><body><i></i></body>";
        assert_eq!(
            combined(html),
            "<body><p></p></body><div></div><body><i></i><script>x\n</script></body>"
        );
    }

    #[test]
    fn test_no_body_appends_to_root() {
        assert_eq!(combined("<script>a</script><p></p>"), "<p></p><script>a\n</script>");
    }

    #[test]
    fn test_nothing_to_merge() {
        let html = "<body><script src=\"a.js\"></script></body>";
        assert_eq!(combined(html), html);
    }

    #[test]
    fn test_passthrough_and_module_scripts_untouched() {
        let html = "<body><demo-snippet><script>demo</script></demo-snippet>\
                    <script type=\"module\">m</script><script>a</script></body>";
        assert_eq!(
            combined(html),
            "<body><demo-snippet><script>demo</script></demo-snippet>\
             <script type=\"module\">m</script><script>a\n</script></body>"
        );
    }
}
