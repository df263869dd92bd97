//! Hierarchical data scopes and the render pass.
//!
//! A [`Scope`] owns a JSON data object, its child scopes, the compiled
//! [`Template`] of its static content and one descriptor per repeat directive.
//! Lookups that miss locally are retried, with the full path, in the parent.
//!
//! ```
//! use html_bindings::{parse, Scope};
//! use serde_json::json;
//!
//! let mut doc = parse("<ul><li hb-repeat=\"t in tracks\">{{ t.name }}</li></ul>").unwrap();
//! let scope = Scope::new(json!({ "tracks": [{ "name": "A" }, { "name": "B" }] }));
//! let root = doc.root();
//! scope.compile(&mut doc, root).unwrap();
//! scope.render(&mut doc);
//! assert_eq!(doc.to_html(), "<ul><li>A</li><li>B</li></ul>");
//! ```

use crate::Options;
use crate::dom::{Document, NodeId};
use crate::error::BindError;
use crate::repeat::{Repeat, RepeatExpression, RepeatSite};
use crate::template::Template;
use crate::value;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

#[derive(Debug)]
struct ScopeInner {
    data: Value,
    parent: Weak<RefCell<ScopeInner>>,
    children: Vec<Scope>,
    template: Template,
    repeats: Vec<Repeat>,
}

/// Shared handle to a scope. Clones refer to the same scope.
#[derive(Debug, Clone)]
pub struct Scope {
    inner: Rc<RefCell<ScopeInner>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl Scope {
    /// A root scope. Data that is not an object is replaced by an empty one.
    pub fn new(data: Value) -> Self {
        Self::with_parent(data, Weak::new())
    }

    fn with_parent(data: Value, parent: Weak<RefCell<ScopeInner>>) -> Self {
        let data = if data.is_object() { data } else { Value::Object(Map::new()) };
        Self {
            inner: Rc::new(RefCell::new(ScopeInner {
                data,
                parent,
                children: Vec::new(),
                template: Template::default(),
                repeats: Vec::new(),
            })),
        }
    }

    /// Create a scope whose lookups fall back to `self`. `self` owns it.
    pub fn create_child(&self, data: Option<Value>) -> Scope {
        let child = Self::with_parent(data.unwrap_or(Value::Null), Rc::downgrade(&self.inner));
        self.inner.borrow_mut().children.push(child.clone());
        child
    }

    pub fn parent(&self) -> Option<Scope> {
        self.inner.borrow().parent.upgrade().map(|inner| Scope { inner })
    }

    pub fn children(&self) -> Vec<Scope> {
        self.inner.borrow().children.clone()
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // === Data ===

    pub fn data(&self) -> Ref<'_, Value> {
        Ref::map(self.inner.borrow(), |inner| &inner.data)
    }

    /// Mutable access to the local data. Do not hold it across a render.
    pub fn data_mut(&self) -> RefMut<'_, Value> {
        RefMut::map(self.inner.borrow_mut(), |inner| &mut inner.data)
    }

    pub fn set_data(&self, data: Value) {
        *self.data_mut() = if data.is_object() { data } else { Value::Object(Map::new()) };
    }

    /// Assign one top-level field of the local data.
    pub fn set(&self, name: &str, value: Value) {
        let mut data = self.data_mut();
        if let Value::Object(map) = &mut *data {
            map.insert(name.to_string(), value);
        }
    }

    /// Resolve a dotted path. An empty path is the whole local data object.
    /// `None` means no scope in the chain has the value.
    pub fn get(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return Some(self.data().clone());
        }
        self.resolve(&value::segments(path))
    }

    fn resolve(&self, segments: &[&str]) -> Option<Value> {
        let local = value::lookup(&self.data(), segments).cloned();
        match local {
            Some(found) => Some(found),
            // Parent retries the full path, not the unresolved remainder
            None => self.parent()?.resolve(segments),
        }
    }

    // === Compilation ===

    /// Compile the content below `root` with the default directive attributes.
    pub fn compile(&self, doc: &mut Document, root: NodeId) -> Result<(), BindError> {
        self.compile_with(doc, root, &Options::default())
    }

    /// Detach every repeat directive under `root` into a child scope, then bind
    /// the placeholders left in `root`'s own content.
    ///
    /// Every directive below `root` is validated before anything is touched, so
    /// a failed compile leaves the document and the scope as they were.
    /// Compiling a scope again first removes the fragments its previous
    /// repeats rendered.
    pub fn compile_with(&self, doc: &mut Document, root: NodeId, options: &Options) -> Result<(), BindError> {
        validate(doc, root, &options.repeat_attribute)?;
        self.teardown(doc);
        self.compile_validated(doc, root, options);
        Ok(())
    }

    /// Remove rendered fragments and the child scopes of the current repeats.
    fn teardown(&self, doc: &mut Document) {
        let old = std::mem::take(&mut self.inner.borrow_mut().repeats);
        if old.is_empty() {
            return;
        }
        for repeat in &old {
            for &fragment in &repeat.fragments {
                doc.remove(fragment);
            }
        }
        self.inner
            .borrow_mut()
            .children
            .retain(|child| !old.iter().any(|r| r.site.scope.ptr_eq(child)));
        log::debug!("dropped {} previously compiled repeats", old.len());
    }

    fn compile_validated(&self, doc: &mut Document, root: NodeId, options: &Options) {
        let attribute = options.repeat_attribute.as_str();
        let mut repeats: Vec<Repeat> = Vec::new();

        for element in repeat_elements(doc, root, attribute) {
            let raw = doc.attribute(element, attribute).unwrap_or_default();
            let Some(expression) = RepeatExpression::parse(raw) else {
                continue;
            };

            let Some(container) = doc.parent(element) else {
                continue;
            };

            let scope = self.create_child(None);
            scope.compile_validated(doc, element, options);

            let anchor = doc.next_sibling(element);
            doc.remove_attribute(element, attribute);
            doc.detach(element);

            // An earlier directive anchored on this element now anchors where it did
            for earlier in &mut repeats {
                if earlier.site.anchor == Some(element) {
                    earlier.site.anchor = anchor;
                }
            }

            log::debug!(
                "compiled repeat '{} in {}' ({} bindings)",
                expression.item,
                expression.collection,
                scope.inner.borrow().template.len()
            );

            repeats.push(Repeat::new(RepeatSite {
                expression,
                scope,
                template: element,
                container,
                anchor,
            }));
        }

        let template = Template::extract(doc, root);
        let mut inner = self.inner.borrow_mut();
        inner.repeats = repeats;
        inner.template = template;
    }

    // === Rendering ===

    /// Re-render every repeat, then substitute this scope's own placeholders.
    pub fn render(&self, doc: &mut Document) {
        let count = self.inner.borrow().repeats.len();

        for index in 0..count {
            let (site, stale) = {
                let mut inner = self.inner.borrow_mut();
                let repeat = &mut inner.repeats[index];
                (repeat.site.clone(), std::mem::take(&mut repeat.fragments))
            };

            for fragment in stale {
                doc.remove(fragment);
            }

            let fragments = self.materialize(doc, &site);
            self.inner.borrow_mut().repeats[index].fragments = fragments;
        }

        let inner = self.inner.borrow();
        inner.template.apply(doc, self);
    }

    fn materialize(&self, doc: &mut Document, site: &RepeatSite) -> Vec<NodeId> {
        let Some(items) = value::items(self.get(&site.expression.collection)) else {
            log::trace!("'{}' is not a collection, repeat renders nothing", site.expression.collection);
            return Vec::new();
        };

        let mut fragments = Vec::with_capacity(items.len());
        for item in items {
            site.scope.set(&site.expression.item, item);
            site.scope.render(doc);

            let fragment = doc.deep_clone(site.template);
            doc.insert_before(site.container, fragment, site.anchor);
            fragments.push(fragment);
        }

        log::trace!("repeat over '{}' rendered {} fragments", site.expression.collection, fragments.len());
        fragments
    }

    /// Roots of the fragments each repeat currently has in the document, in
    /// directive order.
    pub fn fragments(&self) -> Vec<Vec<NodeId>> {
        self.inner
            .borrow()
            .repeats
            .iter()
            .map(|r| r.fragments.clone())
            .collect()
    }

    /// What this scope binds, recursively.
    pub fn summary(&self) -> ScopeSummary {
        let inner = self.inner.borrow();
        ScopeSummary {
            bindings: inner.template.paths().map(str::to_string).collect(),
            repeats: inner
                .repeats
                .iter()
                .map(|r| RepeatSummary {
                    item: r.site.expression.item.clone(),
                    collection: r.site.expression.collection.clone(),
                    scope: r.site.scope.summary(),
                })
                .collect(),
        }
    }
}

/// Check every repeat expression below `root`, including those nested inside
/// other directives.
fn validate(doc: &Document, root: NodeId, attribute: &str) -> Result<(), BindError> {
    for element in repeat_elements(doc, root, attribute) {
        let raw = doc.attribute(element, attribute).unwrap_or_default();
        if RepeatExpression::parse(raw).is_none() {
            return Err(BindError::InvalidRepeatExpression {
                expression: raw.to_string(),
                span: doc.span(element),
            });
        }
        validate(doc, element, attribute)?;
    }
    Ok(())
}

/// Repeat directives below `root` in document order, not looking inside a
/// directive (its content belongs to the directive's own scope).
fn repeat_elements(doc: &Document, root: NodeId, attribute: &str) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut stack: Vec<NodeId> = doc.children(root).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        match doc.element(node) {
            Some(element) if element.has_attribute(attribute) => found.push(node),
            Some(_) => stack.extend(doc.children(node).iter().rev()),
            None => {}
        }
    }
    found
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeSummary {
    pub bindings: Vec<String>,
    pub repeats: Vec<RepeatSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepeatSummary {
    pub item: String,
    pub collection: String,
    pub scope: ScopeSummary,
}
