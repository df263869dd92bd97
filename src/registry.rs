//! Controller registration and the document bootstrap pass.

use crate::Options;
use crate::dom::{Document, NodeId};
use crate::error::BindError;
use crate::scope::Scope;
use indexmap::IndexMap;

/// Fills a freshly compiled scope with data.
pub type Controller = Box<dyn Fn(&Scope)>;

/// A controller bound to one element of a document.
#[derive(Debug, Clone)]
pub struct Mount {
    pub name: String,
    pub element: NodeId,
    pub scope: Scope,
}

impl Mount {
    /// Re-render after the host changed `scope`'s data.
    pub fn render(&self, doc: &mut Document) {
        self.scope.render(doc);
    }
}

/// Named controllers, owned by the host.
#[derive(Default)]
pub struct Registry {
    controllers: IndexMap<String, Controller>,
    options: Options,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            controllers: IndexMap::new(),
            options,
        }
    }

    pub fn register<F>(&mut self, name: impl Into<String>, controller: F) -> Result<(), BindError>
    where
        F: Fn(&Scope) + 'static,
    {
        let name = name.into();
        if self.controllers.contains_key(&name) {
            return Err(BindError::DuplicateRegistration { name });
        }
        self.controllers.insert(name, Box::new(controller));
        Ok(())
    }

    /// Mount every controller element in `doc`.
    ///
    /// Elements are processed last to first, so a controller nested inside
    /// another claims its own directives and placeholders before the outer one
    /// compiles. Mounts are returned in document order.
    pub fn bootstrap(&self, doc: &mut Document) -> Result<Vec<Mount>, BindError> {
        let elements = doc.elements_with_attribute(doc.root(), &self.options.controller_attribute);

        let mut mounts = Vec::with_capacity(elements.len());
        for &element in elements.iter().rev() {
            mounts.push(self.mount(doc, element)?);
        }
        mounts.reverse();
        Ok(mounts)
    }

    /// Compile `element` into a new root scope, run its controller, render.
    pub fn mount(&self, doc: &mut Document, element: NodeId) -> Result<Mount, BindError> {
        let name = doc
            .attribute(element, &self.options.controller_attribute)
            .unwrap_or_default()
            .to_string();

        let Some(controller) = self.controllers.get(&name) else {
            return Err(BindError::NotFound {
                name,
                span: doc.span(element),
            });
        };

        let scope = Scope::default();
        scope.compile_with(doc, element, &self.options)?;
        controller(&scope);
        scope.render(doc);

        log::debug!("mounted controller '{}'", name);
        Ok(Mount { name, element, scope })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    #[test]
    fn test_duplicate_registration() {
        let mut registry = Registry::new();
        registry.register("music", |_| {}).unwrap();
        let err = registry.register("music", |_| {}).unwrap_err();
        assert_eq!(err, BindError::DuplicateRegistration { name: "music".into() });
    }

    #[test]
    fn test_not_found() {
        let mut doc = parse("<div hb-controller=\"missing\">{{ x }}</div>").unwrap();
        let err = Registry::new().bootstrap(&mut doc).unwrap_err();
        assert!(matches!(err, BindError::NotFound { ref name, span: Some(_) } if name == "missing"));
    }

    #[test]
    fn test_bootstrap_runs_controller_and_renders() {
        let mut doc = parse("<div hb-controller=\"music\"><h1>{{ title }}</h1></div>").unwrap();
        let mut registry = Registry::new();
        registry
            .register("music", |scope: &Scope| scope.set("title", json!("Music")))
            .unwrap();

        let mounts = registry.bootstrap(&mut doc).unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].name, "music");
        assert_eq!(doc.to_html(), "<div hb-controller=\"music\"><h1>Music</h1></div>");

        mounts[0].scope.set("title", json!("Silence"));
        mounts[0].render(&mut doc);
        assert_eq!(doc.to_html(), "<div hb-controller=\"music\"><h1>Silence</h1></div>");
    }

    #[test]
    fn test_nested_controllers_keep_their_placeholders() {
        let mut doc = parse(
            "<div hb-controller=\"outer\">{{ name }}<p hb-controller=\"inner\">{{ name }}</p></div>",
        )
        .unwrap();
        let mut registry = Registry::new();
        registry.register("outer", |s: &Scope| s.set("name", json!("O"))).unwrap();
        registry.register("inner", |s: &Scope| s.set("name", json!("I"))).unwrap();

        let mounts = registry.bootstrap(&mut doc).unwrap();
        assert_eq!(mounts.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(), vec!["outer", "inner"]);
        assert_eq!(
            doc.to_html(),
            "<div hb-controller=\"outer\">O<p hb-controller=\"inner\">I</p></div>"
        );
    }
}
