//! Declarative data binding for HTML document trees.
//!
//! Templates are plain HTML. `{{ path }}` placeholders in text are filled from
//! a scope's JSON data, and `hb-repeat="item in collection"` elements are
//! cloned once per collection item into a child scope. Elements carrying
//! `hb-controller="name"` are mounted by a [`Registry`].

pub mod dom;
pub mod error;
pub mod html;
pub mod parser;
pub mod registry;
pub mod repeat;
pub mod scope;
pub mod template;
pub mod value;
pub mod variable;

pub use dom::{Document, Element, NodeId, NodeKind};
pub use error::{BindError, CompileError, ErrorKind, ParseError};
pub use parser::{Span, parse};
pub use registry::{Controller, Mount, Registry};
pub use repeat::RepeatExpression;
pub use scope::{RepeatSummary, Scope, ScopeSummary};

use serde::Serialize;
use serde_json::Value;

/// Directive attribute names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Marks an element to clone per collection item (default: "hb-repeat")
    pub repeat_attribute: String,
    /// Marks an element as a controller mount point (default: "hb-controller")
    pub controller_attribute: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            repeat_attribute: "hb-repeat".to_string(),
            controller_attribute: "hb-controller".to_string(),
        }
    }
}

/// Output of [`render`].
#[derive(Debug, Clone, Serialize)]
pub struct Rendered {
    pub html: String,
    /// One summary per mounted controller, or a single one for the whole document
    pub scopes: Vec<ScopeSummary>,
}

/// Render `source` against `data` and serialize the result.
///
/// A document with controller elements is bootstrapped: controller `name`
/// gets `data[name]` as its scope data. Otherwise the whole document binds to
/// `data` directly.
pub fn render(source: &str, data: &Value, options: &Options) -> Result<Rendered, CompileError> {
    let mut doc = parse(source)?;

    let has_controllers = !doc
        .elements_with_attribute(doc.root(), &options.controller_attribute)
        .is_empty();

    let scopes = if has_controllers {
        let mut registry = Registry::with_options(options.clone());
        if let Value::Object(map) = data {
            for (name, controller_data) in map {
                let controller_data = controller_data.clone();
                registry.register(name.as_str(), move |scope: &Scope| {
                    scope.set_data(controller_data.clone());
                })?;
            }
        }
        registry
            .bootstrap(&mut doc)?
            .iter()
            .map(|mount| mount.scope.summary())
            .collect()
    } else {
        let scope = Scope::new(data.clone());
        let root = doc.root();
        scope.compile_with(&mut doc, root, options)?;
        scope.render(&mut doc);
        vec![scope.summary()]
    };

    Ok(Rendered {
        html: doc.to_html(),
        scopes,
    })
}

/// Render `source` against `data` and return the HTML.
pub fn render_document(source: &str, data: &Value, options: &Options) -> Result<String, CompileError> {
    render(source, data, options).map(|rendered| rendered.html)
}

/// Parse and compile `source` without rendering, reporting what it binds.
pub fn check(source: &str, options: &Options) -> Result<ScopeSummary, CompileError> {
    let mut doc = parse(source)?;
    let scope = Scope::default();
    let root = doc.root();
    scope.compile_with(&mut doc, root, options)?;
    Ok(scope.summary())
}
