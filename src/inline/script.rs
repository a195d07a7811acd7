//! Script body rewriting and naming.

use crate::webpath::Webpath;
use regex::Regex;
use std::sync::OnceLock;

/// Remove `//# sourceMappingURL=...` lines; the maps are not bundled.
pub fn strip_source_maps(code: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"//# sourceMappingURL=.*").expect("static regex"));
    re.replace_all(code, "").into_owned()
}

/// Keep a literal `</script` in JS from closing the hosting tag.
pub fn escape_script_close(code: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)</(script)").expect("static regex"));
    re.replace_all(code, r"<\/$1").into_owned()
}

/// Identity for an inline script of the document at `current`:
/// `<current>.js`, then `<current>-2.js`, `<current>-3.js`, ...
pub fn synthetic_name(current: &Webpath, taken: impl Fn(&Webpath) -> bool) -> Webpath {
    let candidate = Webpath::new(format!("{current}.js"));
    if !taken(&candidate) {
        return candidate;
    }
    (2..)
        .map(|n| Webpath::new(format!("{current}-{n}.js")))
        .find(|name| !taken(name))
        .unwrap_or(candidate)
}
