//! Diagnostic suppression.
//!
//! Per-script suppressions come from `jscomp-suppress` attributes; on top of
//! those sit blanket rules for third-party paths and framework false
//! positives that are known to be noisy.

use super::optimizer::Diagnostic;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CheckLevel {
    Off,
    Warning,
    Error,
}

impl fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "OFF",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        })
    }
}

/// Diagnostic groups understood out of the box, as group → keys.
const BUILTIN_GROUPS: &[(&str, &[&str])] = &[
    ("checkTypes", &["JSC_TYPE_MISMATCH", "JSC_WRONG_ARGUMENT_COUNT", "JSC_NOT_FUNCTION_TYPE"]),
    ("missingProperties", &["JSC_INEXISTENT_PROPERTY", "JSC_POSSIBLE_INEXISTENT_PROPERTY"]),
    ("globalThis", &["JSC_USED_GLOBAL_THIS"]),
    ("undefinedVars", &["JSC_UNDEFINED_VARIABLE"]),
    ("uselessCode", &["JSC_USELESS_CODE"]),
    ("visibility", &["JSC_BAD_PRIVATE_PROPERTY_ACCESS", "JSC_BAD_PROTECTED_PROPERTY_ACCESS"]),
    ("deprecated", &["JSC_DEPRECATED_CLASS", "JSC_DEPRECATED_PROP", "JSC_DEPRECATED_VAR"]),
    ("duplicate", &["JSC_DUP_VAR_DECLARATION"]),
    ("misplacedTypeAnnotation", &["JSC_MISPLACED_TYPE_ANNOTATION"]),
    ("nonStandardJsDocs", &["JSC_BAD_JSDOC_ANNOTATION"]),
    ("suspiciousCode", &["JSC_SUSPICIOUS_SEMICOLON"]),
];

/// Decides the effective level of optimizer diagnostics.
#[derive(Debug, Default, Clone)]
pub struct SuppressionGuard {
    /// Source name → suppressed keys or group names (`*` for everything).
    per_path: FxHashMap<String, FxHashSet<String>>,
    /// Diagnostic key → groups containing it.
    groups: FxHashMap<String, Vec<String>>,
    /// Sources emitted by the TypeScript compiler.
    transpiled: FxHashSet<String>,
}

impl SuppressionGuard {
    /// A guard knowing the built-in groups plus `extra` (group → keys).
    pub fn with_groups(extra: &BTreeMap<String, Vec<String>>) -> Self {
        let mut guard = Self::default();
        for (group, keys) in BUILTIN_GROUPS {
            guard.add_group(group, keys.iter().copied());
        }
        for (group, keys) in extra {
            guard.add_group(group, keys.iter().map(String::as_str));
        }
        guard
    }

    fn add_group<'a>(&mut self, group: &str, keys: impl Iterator<Item = &'a str>) {
        for key in keys {
            self.groups
                .entry(key.to_owned())
                .or_default()
                .push(group.to_owned());
        }
    }

    pub fn suppress(&mut self, source: &str, codes: impl IntoIterator<Item = String>) {
        self.per_path
            .entry(source.to_owned())
            .or_default()
            .extend(codes);
    }

    pub fn mark_transpiled(&mut self, source: &str) {
        self.transpiled.insert(source.to_owned());
    }

    /// Override for `diagnostic`, or `None` to keep its own level.
    pub fn level(&self, diagnostic: &Diagnostic) -> Option<CheckLevel> {
        static IGNORE_PATHS: OnceLock<Regex> = OnceLock::new();
        let ignore_paths = IGNORE_PATHS.get_or_init(|| {
            Regex::new(r"^/(?:polymer|marked-element)/.*$").expect("static regex")
        });

        let source = diagnostic.source.as_deref()?;
        let key = diagnostic.key.as_str();
        let is_warning = diagnostic.level == CheckLevel::Warning;

        // Trust the TypeScript compiler on code it emitted.
        if is_warning && self.transpiled.contains(source) {
            return Some(CheckLevel::Off);
        }
        if is_warning && ["/iron-", "/neon-", "/paper-"].iter().any(|p| source.starts_with(p)) {
            return Some(CheckLevel::Off);
        }
        if source.starts_with("javascript/externs")
            || source.contains("com_google_javascript_closure_compiler_externs")
        {
            return Some(CheckLevel::Off);
        }
        if source.ends_with("externs/webcomponents-externs.js") {
            return Some(CheckLevel::Warning);
        }
        if ignore_paths.is_match(source) {
            return Some(CheckLevel::Off);
        }
        if (source.starts_with("/tf-") || source.starts_with("/vz-"))
            && key == "JSC_VAR_MULTIPLY_DECLARED_ERROR"
        {
            return Some(CheckLevel::Off);
        }
        if matches!(
            key,
            "JSC_POLYMER_UNQUALIFIED_BEHAVIOR" | "JSC_POLYMER_UNANNOTATED_BEHAVIOR"
        ) {
            return Some(CheckLevel::Off);
        }

        let codes = self.per_path.get(source)?;
        if codes.contains("*") || codes.contains(key) {
            return Some(CheckLevel::Off);
        }
        let in_suppressed_group = self
            .groups
            .get(key)
            .is_some_and(|groups| groups.iter().any(|g| codes.contains(g)));
        in_suppressed_group.then_some(CheckLevel::Off)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(source: &str, level: CheckLevel, key: &str) -> Diagnostic {
        Diagnostic {
            source: Some(source.into()),
            line: Some(1),
            level,
            key: key.into(),
            message: "msg".into(),
        }
    }

    #[test]
    fn test_no_source_no_override() {
        let guard = SuppressionGuard::with_groups(&BTreeMap::new());
        let mut d = diagnostic("/x.js", CheckLevel::Error, "JSC_X");
        d.source = None;
        assert_eq!(guard.level(&d), None);
    }

    #[test]
    fn test_third_party_warnings_off() {
        let guard = SuppressionGuard::default();
        let d = diagnostic("/paper-button/paper-button.js", CheckLevel::Warning, "JSC_X");
        assert_eq!(guard.level(&d), Some(CheckLevel::Off));
        // Errors from the same place are kept.
        let d = diagnostic("/paper-button/paper-button.js", CheckLevel::Error, "JSC_X");
        assert_eq!(guard.level(&d), None);
    }

    #[test]
    fn test_polymer_paths_off() {
        let guard = SuppressionGuard::default();
        let d = diagnostic("/polymer/lib/legacy.js", CheckLevel::Error, "JSC_X");
        assert_eq!(guard.level(&d), Some(CheckLevel::Off));
        let d = diagnostic("/my/polymer/x.js", CheckLevel::Error, "JSC_X");
        assert_eq!(guard.level(&d), None);
    }

    #[test]
    fn test_webcomponents_externs_downgraded() {
        let guard = SuppressionGuard::default();
        let d = diagnostic("a/externs/webcomponents-externs.js", CheckLevel::Error, "JSC_X");
        assert_eq!(guard.level(&d), Some(CheckLevel::Warning));
    }

    #[test]
    fn test_multiply_declared_in_tf_components() {
        let guard = SuppressionGuard::default();
        let key = "JSC_VAR_MULTIPLY_DECLARED_ERROR";
        assert_eq!(
            guard.level(&diagnostic("/tf-backend/x.js", CheckLevel::Error, key)),
            Some(CheckLevel::Off)
        );
        assert_eq!(guard.level(&diagnostic("/other/x.js", CheckLevel::Error, key)), None);
    }

    #[test]
    fn test_transpiled_typescript() {
        let mut guard = SuppressionGuard::default();
        guard.mark_transpiled("/app/main.js");
        let d = diagnostic("/app/main.js", CheckLevel::Warning, "JSC_X");
        assert_eq!(guard.level(&d), Some(CheckLevel::Off));
    }

    #[test]
    fn test_per_path_suppression() {
        let mut guard = SuppressionGuard::with_groups(&BTreeMap::new());
        guard.suppress("/a.js", ["JSC_FOO".to_string()]);
        guard.suppress("/b.js", ["*".to_string()]);
        guard.suppress("/c.js", ["globalThis".to_string()]);

        assert_eq!(
            guard.level(&diagnostic("/a.js", CheckLevel::Error, "JSC_FOO")),
            Some(CheckLevel::Off)
        );
        assert_eq!(guard.level(&diagnostic("/a.js", CheckLevel::Error, "JSC_BAR")), None);
        assert_eq!(
            guard.level(&diagnostic("/b.js", CheckLevel::Error, "JSC_ANY")),
            Some(CheckLevel::Off)
        );
        assert_eq!(
            guard.level(&diagnostic("/c.js", CheckLevel::Warning, "JSC_USED_GLOBAL_THIS")),
            Some(CheckLevel::Off)
        );
    }

    #[test]
    fn test_custom_group() {
        let extra = BTreeMap::from([("mine".to_string(), vec!["JSC_CUSTOM".to_string()])]);
        let mut guard = SuppressionGuard::with_groups(&extra);
        guard.suppress("/a.js", ["mine".to_string()]);
        assert_eq!(
            guard.level(&diagnostic("/a.js", CheckLevel::Error, "JSC_CUSTOM")),
            Some(CheckLevel::Off)
        );
    }
}
