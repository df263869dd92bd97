use crate::dom::{Document, NodeId};
use crate::value;
use serde_json::Value;

/// One placeholder location: a text node owned by the binding and overwritten
/// on every apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    node: NodeId,
}

impl Variable {
    /// Take over `node`, blanking it so unrendered templates show no markers.
    pub fn bind(doc: &mut Document, node: NodeId) -> Self {
        doc.set_text(node, "");
        Self { node }
    }

    pub fn apply(&self, doc: &mut Document, value: Option<&Value>) {
        doc.set_text(self.node, &value::display(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bind_blanks_and_apply_overwrites() {
        let mut doc = Document::new();
        let text = doc.create_text("{{ title }}");
        let variable = Variable::bind(&mut doc, text);
        assert_eq!(doc.text(text), Some(""));

        variable.apply(&mut doc, Some(&json!("Music")));
        assert_eq!(doc.text(text), Some("Music"));

        variable.apply(&mut doc, None);
        assert_eq!(doc.text(text), Some(""));

        variable.apply(&mut doc, Some(&Value::Null));
        assert_eq!(doc.text(text), Some(""));
    }
}
