//! Output document minification.
//!
//! Script bodies are left byte-for-byte alone so that the CSP hashes
//! computed from the tree still match what the browser sees.

use std::borrow::Cow;

/// Minify `html` when `enabled`.
///
/// Returns `Cow::Borrowed` if minify disabled, `Cow::Owned` if minified.
pub fn minify(html: &[u8], enabled: bool) -> Cow<'_, [u8]> {
    if enabled {
        Cow::Owned(minify_html_inner(html))
    } else {
        Cow::Borrowed(html)
    }
}

fn minify_html_inner(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    // The merged license block must survive.
    cfg.keep_comments = true;
    cfg.minify_css = true;
    cfg.minify_js = false;
    cfg.remove_bangs = false;
    cfg.remove_processing_instructions = true;
    minify_html::minify(html, &cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_removes_whitespace() {
        let html = b"<html>\n  <head>\n  </head>\n  <body>\n    <p>Hello</p>\n  </body>\n</html>";
        let result = minify(html, true);
        let result_str = String::from_utf8_lossy(&result);

        assert!(!result_str.contains("\n  "));
        assert!(result_str.contains("<p>Hello</p>"));
    }

    #[test]
    fn test_minify_keeps_script_and_license() {
        let html = b"<!--\n@license MIT\n--><body>\n  <script>var  a = 1;\n  f( a );</script>\n</body>";
        let result = minify(html, true);
        let result_str = String::from_utf8_lossy(&result);

        assert!(result_str.contains("@license MIT"));
        assert!(result_str.contains("<script>var  a = 1;\n  f( a );</script>"));
    }

    #[test]
    fn test_minify_disabled() {
        let html = b"<html>\n  <body>\n  </body>\n</html>";
        let result = minify(html, false);

        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(&*result, html);
    }
}
