//! The inlining walk.
//!
//! One pass over the document tree does all per-node work:
//!
//! - `<link rel="import">` is replaced by the parsed target document, which
//!   the walk then descends into. Each path is inlined once; later imports of
//!   it become empty placeholders.
//! - External stylesheets become `<style>` blocks.
//! - Scripts are inlined (or, when compiling, deferred to the
//!   [`Aggregator`]).
//! - License comments are merged, other comments dropped.
//! - `href`/`src`/`action`/`assetpath` pointing at declared files are
//!   rewritten relative to the output location.
//!
//! Subtrees under a passthrough element are left exactly as written.

mod license;
mod script;

pub use license::LicenseMerger;
pub use script::{escape_script_close, strip_source_maps, synthetic_name};

use crate::compile::{Aggregator, Optimizer, OptimizerConfig, PendingScript, SourceFile};
use crate::config::{BundleConfig, CompileConfig};
use crate::dom::{Attributes, Dom, NodeData, NodeId, Visit, Visitor, parse_document, walk};
use crate::error::{BundleError, BundleResult};
use crate::webfiles::Webfiles;
use crate::webpath::{Webpath, is_ignorable, resolve};
use regex::Regex;
use rustc_hash::FxHashSet;

/// Attributes holding references that get rootified.
const REFERENCE_ATTRS: &[&str] = &["href", "src", "action", "assetpath"];

/// Read-only inputs of the walk.
pub struct InlineSettings<'a> {
    /// Webpath the output document will be served at.
    pub output_path: &'a Webpath,
    pub bundle: &'a BundleConfig,
    pub ignore: &'a [Regex],
}

/// Compiling-mode state: where deferred scripts go and what minifies
/// `jscomp-minify` scripts.
pub struct Compiling<'a> {
    pub aggregator: Aggregator,
    pub optimizer: &'a dyn Optimizer,
    pub config: &'a CompileConfig,
}

/// What the walk leaves behind for the later passes.
pub struct Inlined {
    pub root: NodeId,
    /// Present in compiling mode.
    pub aggregator: Option<Aggregator>,
    /// First script seen outside passthrough regions (non-compiling mode).
    pub first_script: Option<NodeId>,
    pub licenses: LicenseMerger,
}

/// Mutable state carried across the walk.
#[derive(Debug)]
pub struct TraversalContext {
    input: Webpath,
    /// Documents currently being walked; the last one is "me".
    stack: Vec<Webpath>,
    already_inlined: FxHashSet<Webpath>,
    passthrough_depth: usize,
    first_script: Option<NodeId>,
    licenses: LicenseMerger,
}

impl TraversalContext {
    pub fn new(input: &Webpath) -> Self {
        Self {
            input: input.clone(),
            stack: vec![input.clone()],
            already_inlined: FxHashSet::from_iter([input.clone()]),
            passthrough_depth: 0,
            first_script: None,
            licenses: LicenseMerger::default(),
        }
    }

    /// The document whose nodes are being visited.
    pub fn me(&self) -> &Webpath {
        self.stack.last().unwrap_or(&self.input)
    }
}

/// Inline everything reachable from `root`, the parsed document at `input`.
pub fn inline(
    dom: &mut Dom,
    root: NodeId,
    input: &Webpath,
    webfiles: &Webfiles,
    settings: &InlineSettings<'_>,
    compiling: Option<Compiling<'_>>,
) -> BundleResult<Inlined> {
    let mut inliner = Inliner {
        webfiles,
        settings,
        ctx: TraversalContext::new(input),
        compiling,
    };
    let root = walk(dom, root, &mut inliner)?;
    Ok(Inlined {
        root,
        aggregator: inliner.compiling.map(|c| c.aggregator),
        first_script: inliner.ctx.first_script,
        licenses: inliner.ctx.licenses,
    })
}

struct Inliner<'a, 'b> {
    webfiles: &'a Webfiles,
    settings: &'a InlineSettings<'b>,
    ctx: TraversalContext,
    compiling: Option<Compiling<'a>>,
}

impl Visitor for Inliner<'_, '_> {
    type Error = BundleError;

    fn enter(&mut self, dom: &mut Dom, node: NodeId) -> BundleResult<Visit> {
        if self.is_passthrough(dom, node) {
            self.ctx.passthrough_depth += 1;
        }
        if self.ctx.passthrough_depth > 0 {
            return Ok(Visit::Keep);
        }

        match dom.data(node) {
            NodeData::Element { .. } => self.enter_element(dom, node),
            NodeData::Comment(text) => {
                let text = text.clone();
                Ok(self.enter_comment(dom, node, &text))
            }
            _ => Ok(Visit::Keep),
        }
    }

    fn leave(&mut self, dom: &mut Dom, node: NodeId) -> BundleResult<Visit> {
        if matches!(dom.data(node), NodeData::Document { .. }) {
            self.ctx.stack.pop();
        } else if self.is_passthrough(dom, node) {
            self.ctx.passthrough_depth = self.ctx.passthrough_depth.saturating_sub(1);
        }
        Ok(Visit::Keep)
    }
}

impl Inliner<'_, '_> {
    fn is_passthrough(&self, dom: &Dom, node: NodeId) -> bool {
        dom.tag_name(node)
            .is_some_and(|tag| self.settings.bundle.passthrough.iter().any(|p| p == tag))
    }

    fn is_ignored(&self, reference: &str) -> bool {
        !reference.is_empty() && self.settings.ignore.iter().any(|re| re.is_match(reference))
    }

    fn enter_element(&mut self, dom: &mut Dom, node: NodeId) -> BundleResult<Visit> {
        let href = dom.attr(node, "href").to_owned();
        let src = dom.attr(node, "src").to_owned();
        if self.is_ignored(&href) || self.is_ignored(&src) {
            return Ok(Visit::Keep);
        }

        let visit = if is_external_css(dom, node) && !is_ignorable(&href) {
            self.inline_stylesheet(dom, node, &href)?
        } else if is_import(dom, node) && !href.is_empty() && !is_ignorable(&href) {
            self.inline_import(dom, node, &href)?
        } else if dom.is_element(node, "script")
            && !is_ignorable(&src)
            && !dom.has_attr(node, "jscomp-ignore")
        {
            if self.compiling.is_some() {
                self.visit_script(dom, node, &src)?
            } else {
                self.inline_script(dom, node, &src)?
            }
        } else {
            Visit::Keep
        };

        let target = match visit {
            Visit::Keep => node,
            Visit::Replace(new) => new,
        };
        if matches!(dom.data(target), NodeData::Element { .. }) {
            self.rootify(dom, target);
        }
        Ok(visit)
    }

    fn enter_comment(&mut self, dom: &mut Dom, node: NodeId, text: &str) -> Visit {
        if text.contains(self.settings.bundle.license_marker.as_str()) {
            self.ctx.licenses.record(text);
            if self.ctx.licenses.claim_carrier(node) {
                return Visit::Keep;
            }
        }
        Visit::Replace(dom.create_placeholder())
    }

    // ------------------------------------------------------------------------
    // Imports and stylesheets
    // ------------------------------------------------------------------------

    fn inline_import(&mut self, dom: &mut Dom, link: NodeId, href: &str) -> BundleResult<Visit> {
        let path = resolve(self.ctx.me(), href);
        if !self.ctx.already_inlined.insert(path.clone()) {
            return Ok(Visit::Replace(dom.create_placeholder()));
        }

        let content = self.webfiles.read(self.ctx.me(), &path)?;
        let document = parse_document(dom, path.as_str(), content.as_bytes())?;
        let inherited = copy_attrs(dom, link, &[]);
        if let Some(attrs) = dom.attrs_mut(document) {
            for (key, value) in inherited.iter() {
                attrs.set(key, value);
            }
        }

        self.ctx.stack.push(path);
        Ok(Visit::Replace(document))
    }

    fn inline_stylesheet(&mut self, dom: &mut Dom, link: NodeId, href: &str) -> BundleResult<Visit> {
        let path = resolve(self.ctx.me(), href);
        let content = self.webfiles.read(self.ctx.me(), &path)?;
        let attrs = copy_attrs(dom, link, &["rel", "href"]);
        Ok(Visit::Replace(dom.create_raw_element("style", attrs, content)))
    }

    // ------------------------------------------------------------------------
    // Scripts
    // ------------------------------------------------------------------------

    /// Non-compiling mode: pull `src` content into the tag.
    fn inline_script(&mut self, dom: &mut Dom, script: NodeId, src: &str) -> BundleResult<Visit> {
        let visit = if src.is_empty() {
            Visit::Keep
        } else {
            let path = resolve(self.ctx.me(), src);
            let code = self.webfiles.read(self.ctx.me(), &path)?;
            let body = escape_script_close(&strip_source_maps(&code));
            let attrs = copy_attrs(dom, script, &["src"]);
            Visit::Replace(dom.create_raw_element("script", attrs, body))
        };

        if self.ctx.first_script.is_none() {
            self.ctx.first_script = Some(match visit {
                Visit::Keep => script,
                Visit::Replace(new) => new,
            });
        }
        Ok(visit)
    }

    /// Compiling mode: register externs, pass minified or precompiled
    /// scripts through, defer the rest.
    fn visit_script(&mut self, dom: &mut Dom, script: NodeId, src: &str) -> BundleResult<Visit> {
        let Some(compiling) = self.compiling.as_mut() else {
            return Ok(Visit::Keep);
        };
        let me = self.ctx.me();

        let (path, code) = if src.is_empty() {
            let path = synthetic_name(me, |p| compiling.aggregator.contains(p));
            (path, dom.inner_data(script))
        } else {
            let path = resolve(me, src);
            let code = self.webfiles.read(me, &path)?;
            (path, strip_source_maps(&code))
        };

        if dom.has_attr(script, "jscomp-externs") {
            // Externs are named by physical location so that two webpaths
            // backed by one file register once.
            let name = match self.webfiles.get(&path) {
                Some(file) => file.to_string_lossy().into_owned(),
                None => path.as_str().to_owned(),
            };
            compiling.aggregator.add_extern(SourceFile::new(name, code));
            return Ok(Visit::Replace(dom.create_placeholder()));
        }

        let minify = dom.attr_transitive(script, "jscomp-minify").is_some();
        if src.ends_with(".min.js") || minify || dom.attr_transitive(script, "jscomp-nocompile").is_some() {
            let body = if minify {
                let settings = OptimizerConfig::minify(compiling.config);
                let source = SourceFile::new(path.as_str(), code);
                compiling.optimizer.optimize(&[], &[source], &settings)?.code
            } else {
                code
            };
            let attrs = copy_attrs(dom, script, &["src", "jscomp-minify", "jscomp-nocompile"]);
            let body = escape_script_close(&body);
            return Ok(Visit::Replace(dom.create_raw_element("script", attrs, body)));
        }

        let suppressions = match dom.attr_transitive(script, "jscomp-suppress") {
            None => Vec::new(),
            Some(value) if value.trim().is_empty() => vec!["*".to_owned()],
            Some(value) => value.split_whitespace().map(str::to_owned).collect(),
        };
        let deferred = compiling.aggregator.defer(PendingScript {
            path,
            source: code,
            tag: script,
            suppressions,
        });
        if deferred {
            Ok(Visit::Keep)
        } else {
            Ok(Visit::Replace(dom.create_placeholder()))
        }
    }

    // ------------------------------------------------------------------------
    // Rootification
    // ------------------------------------------------------------------------

    /// Rewrite references to declared files relative to the output location.
    fn rootify(&self, dom: &mut Dom, node: NodeId) {
        let base = self.settings.output_path.parent();
        for attr in REFERENCE_ATTRS {
            let value = dom.attr(node, attr);
            if value.is_empty() || is_ignorable(value) {
                continue;
            }
            let path = resolve(self.ctx.me(), value);
            if !self.webfiles.contains(&path) {
                continue;
            }
            let rootified = base.relativize(&path);
            if let Some(attrs) = dom.attrs_mut(node) {
                attrs.set(attr, rootified.as_str());
            }
        }
    }
}

fn is_import(dom: &Dom, node: NodeId) -> bool {
    dom.is_element(node, "link") && dom.attr(node, "rel") == "import"
}

fn is_external_css(dom: &Dom, node: NodeId) -> bool {
    if !dom.is_element(node, "link") || dom.attr(node, "href").is_empty() {
        return false;
    }
    match dom.attr(node, "rel") {
        "stylesheet" => true,
        "import" => matches!(dom.attr(node, "type"), "css" | "text/css"),
        _ => false,
    }
}

/// Attributes of `node` minus `skip`.
fn copy_attrs(dom: &Dom, node: NodeId, skip: &[&str]) -> Attributes {
    dom.attrs(node)
        .map(|attrs| {
            attrs
                .iter()
                .filter(|(key, _)| !skip.contains(key))
                .collect()
        })
        .unwrap_or_default()
}
