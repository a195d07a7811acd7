//! Script aggregation for compiling mode.
//!
//! During the walk the inliner defers scripts here instead of inlining them.
//! Afterwards everything is handed to one [`Optimizer`] call and the blob it
//! returns is cut back into the original `<script>` positions.
//!
//! ```text
//! libraries (CLI order) ─┐
//! deferred tags (doc order) ─┼─► optimizer ─► blob ─► segment ─► tags replaced
//! externs ───────────────┘
//! ```

pub mod closure;
pub mod combine;
pub mod optimizer;
pub mod segment;
pub mod suppress;

pub use closure::ClosureCompiler;
pub use combine::combine_scripts;
pub use optimizer::{Concat, Optimizer, OptimizerConfig};
pub use suppress::SuppressionGuard;

use crate::config::CompileConfig;
use crate::dom::{Attributes, Dom, NodeId};
use crate::error::BundleResult;
use crate::inline::escape_script_close;
use crate::log;
use crate::webfiles::Webfiles;
use crate::webpath::Webpath;
use rustc_hash::FxHashSet;

/// A named piece of JS handed to the optimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub code: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }

    /// Closure-style externs files declare themselves with `@externs`.
    pub fn is_externs(&self) -> bool {
        self.code.contains("@externs")
    }
}

/// A `<script>` waiting for its optimized body.
#[derive(Debug, Clone)]
pub struct PendingScript {
    /// Identity key: the resolved `src`, or a synthetic name for inline bodies.
    pub path: Webpath,
    pub source: String,
    /// The tag to replace once the optimizer output is segmented.
    pub tag: NodeId,
    /// Diagnostic keys or groups from `jscomp-suppress`.
    pub suppressions: Vec<String>,
}

#[derive(Debug, Default)]
pub struct Aggregator {
    libraries: Vec<SourceFile>,
    externs: Vec<SourceFile>,
    pending: Vec<PendingScript>,
    paths: FxHashSet<Webpath>,
}

impl Aggregator {
    pub fn new(libraries: Vec<SourceFile>, externs: Vec<SourceFile>) -> Self {
        Self {
            libraries,
            externs,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn externs(&self) -> &[SourceFile] {
        &self.externs
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[PendingScript] {
        &self.pending
    }

    /// Register an externs source found in the document. A second source
    /// with the same name replaces the first.
    pub fn add_extern(&mut self, source: SourceFile) {
        match self.externs.iter_mut().find(|e| e.name == source.name) {
            Some(existing) => *existing = source,
            None => self.externs.push(source),
        }
    }

    #[inline]
    pub fn contains(&self, path: &Webpath) -> bool {
        self.paths.contains(path)
    }

    /// Queue a script. Returns false (and queues nothing) if its path is
    /// already queued.
    pub fn defer(&mut self, script: PendingScript) -> bool {
        if !self.paths.insert(script.path.clone()) {
            return false;
        }
        self.pending.push(script);
        true
    }

    /// Run the optimizer over libraries and queued scripts and splice the
    /// output back into the queued tags. A no-op when nothing was queued.
    pub fn compile(
        self,
        dom: &mut Dom,
        optimizer: &dyn Optimizer,
        config: &CompileConfig,
        webfiles: &Webfiles,
    ) -> BundleResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut guard = SuppressionGuard::with_groups(&config.groups);
        for script in &self.pending {
            guard.suppress(script.path.as_str(), script.suppressions.iter().cloned());
        }

        let mut sources = self.libraries.clone();
        sources.extend(
            self.pending
                .iter()
                .map(|script| SourceFile::new(script.path.as_str(), script.source.as_str())),
        );
        for source in &sources {
            if webfiles.is_transpiled_typescript(&source.name) {
                guard.mark_transpiled(&source.name);
            }
        }

        log!(
            "compile";
            "{} script(s), {} librar(ies), {} externs",
            self.pending.len(),
            self.libraries.len(),
            self.externs.len()
        );
        let settings = OptimizerConfig::bundle(config, &guard);
        let compiled = optimizer.optimize(&self.externs, &sources, &settings)?;
        for warning in &compiled.warnings {
            log!("warn"; "{warning}");
        }

        let library_names: FxHashSet<&str> =
            self.libraries.iter().map(|lib| lib.name.as_str()).collect();
        for (tag, body) in segment::segment(&compiled.code, self.pending, &library_names)? {
            let body = escape_script_close(&body);
            let script = dom.create_raw_element("script", Attributes::new(), body);
            dom.replace(tag, script);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::optimizer::Compiled;
    use super::*;
    use crate::dom::{parse_document, serialize};

    fn pending(dom: &mut Dom, path: &str, source: &str) -> PendingScript {
        let tag = dom.create_raw_element("script", Attributes::new(), source.to_owned());
        PendingScript {
            path: Webpath::new(path),
            source: source.to_owned(),
            tag,
            suppressions: Vec::new(),
        }
    }

    #[test]
    fn test_defer_rejects_duplicate_path() {
        let mut dom = Dom::new();
        let mut aggregator = Aggregator::default();
        assert!(aggregator.defer(pending(&mut dom, "/a.js", "a")));
        assert!(!aggregator.defer(pending(&mut dom, "/a.js", "b")));
        assert_eq!(aggregator.pending().len(), 1);
        assert!(aggregator.contains(&Webpath::new("/a.js")));
    }

    #[test]
    fn test_add_extern_replaces_by_name() {
        let mut aggregator = Aggregator::default();
        aggregator.add_extern(SourceFile::new("x.js", "/** @externs */ var a;"));
        aggregator.add_extern(SourceFile::new("x.js", "/** @externs */ var b;"));
        assert_eq!(aggregator.externs().len(), 1);
        assert!(aggregator.externs()[0].code.contains("var b"));
    }

    #[test]
    fn test_compile_splices_segments_into_tags() {
        let mut dom = Dom::new();
        let root = parse_document(
            &mut dom,
            "/index.html",
            b"<body><script>a();</script><p></p><script>b();</script></body>",
        )
        .unwrap();
        let tags = dom.elements_by_tag(root, "script");

        let mut aggregator = Aggregator::new(vec![SourceFile::new("lib.js", "lib();")], Vec::new());
        for (tag, (path, code)) in tags.iter().zip([("/index.html.js", "a();"), ("/index.html-2.js", "b();")]) {
            aggregator.defer(PendingScript {
                path: Webpath::new(path),
                source: code.into(),
                tag: *tag,
                suppressions: Vec::new(),
            });
        }

        aggregator
            .compile(&mut dom, &Concat, &CompileConfig::default(), &Webfiles::default())
            .unwrap();

        let html = String::from_utf8(serialize(&dom, root).unwrap()).unwrap();
        assert_eq!(
            html,
            "<body><script>//# sourceURL=build:/lib.js\nlib();\n\
             //# sourceURL=build://index.html.js\na();\n</script><p></p>\
             <script>//# sourceURL=build://index.html-2.js\nb();\n</script></body>"
        );
    }

    #[test]
    fn test_compile_without_pending_skips_optimizer() {
        struct Unreachable;
        impl Optimizer for Unreachable {
            fn optimize(
                &self,
                _: &[SourceFile],
                _: &[SourceFile],
                _: &OptimizerConfig<'_>,
            ) -> BundleResult<Compiled> {
                panic!("optimizer must not run");
            }
        }

        let mut dom = Dom::new();
        let aggregator = Aggregator::new(vec![SourceFile::new("lib.js", "x")], Vec::new());
        aggregator
            .compile(&mut dom, &Unreachable, &CompileConfig::default(), &Webfiles::default())
            .unwrap();
    }

    #[test]
    fn test_is_externs() {
        assert!(SourceFile::new("e.js", "/** @externs */").is_externs());
        assert!(!SourceFile::new("l.js", "var x;").is_externs());
    }
}
