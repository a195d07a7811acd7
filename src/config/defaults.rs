//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [bundle] Section Defaults
// ============================================================================

pub mod bundle {
    use std::path::PathBuf;

    /// Elements whose content is shown as source code, e.g. in demo pages.
    pub fn passthrough() -> Vec<String> {
        vec!["demo-snippet".into()]
    }

    pub fn license_marker() -> String {
        "@license".into()
    }

    pub fn ignore_file() -> Option<PathBuf> {
        None
    }
}

// ============================================================================
// [compile] Section Defaults
// ============================================================================

pub mod compile {
    use super::super::{OptimizationLevel, OptimizerKind};
    use std::collections::BTreeMap;

    pub fn level() -> OptimizationLevel {
        OptimizationLevel::default()
    }

    pub fn optimizer() -> OptimizerKind {
        OptimizerKind::default()
    }

    pub fn command() -> Vec<String> {
        vec!["google-closure-compiler".into()]
    }

    pub fn language_in() -> String {
        "ECMASCRIPT_2018".into()
    }

    pub fn language_out() -> String {
        "ECMASCRIPT_2015".into()
    }

    pub fn groups() -> BTreeMap<String, Vec<String>> {
        BTreeMap::new()
    }
}
