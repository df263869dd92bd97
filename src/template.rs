use crate::dom::{Document, NodeId};
use crate::scope::Scope;
use crate::variable::Variable;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // {{ path }} with at most one space of padding inside the markers
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{\s?([a-zA-Z0-9_.?]+)\s?\}\}").unwrap();
}

/// The compiled placeholders of one scope's static subtree.
#[derive(Debug, Clone, Default)]
pub struct Template {
    /// Path -> locations, in document order of first occurrence
    bindings: IndexMap<String, Vec<Variable>>,
}

impl Template {
    /// Compile every placeholder under `root` (its children, recursively).
    pub fn extract(doc: &mut Document, root: NodeId) -> Self {
        let mut template = Self::default();
        template.extract_from(doc, root);
        template
    }

    fn extract_from(&mut self, doc: &mut Document, node: NodeId) {
        // The child list grows while text is split, so walk a snapshot
        let children = doc.children(node).to_vec();
        for child in children {
            if doc.is_text(child) {
                self.extract_text(doc, child);
            } else if doc.is_element(child) {
                self.extract_from(doc, child);
            }
        }
    }

    fn extract_text(&mut self, doc: &mut Document, text: NodeId) {
        let mut current = text;

        loop {
            let found = doc.text(current).and_then(|content| {
                PLACEHOLDER.captures(content).and_then(|caps| {
                    let whole = caps.get(0)?;
                    Some((whole.start(), whole.end(), whole.end() < content.len(), caps[1].to_string()))
                })
            });
            let Some((start, end, has_rest, path)) = found else {
                break;
            };

            if start > 0 {
                current = doc.split_text(current, start);
            }
            let rest = has_rest.then(|| doc.split_text(current, end - start));

            self.bindings
                .entry(path)
                .or_default()
                .push(Variable::bind(doc, current));

            match rest {
                Some(rest) => current = rest,
                None => break,
            }
        }
    }

    /// Substitute the current value of every bound path, resolved through `scope`.
    pub fn apply(&self, doc: &mut Document, scope: &Scope) {
        for (path, variables) in &self.bindings {
            let value = scope.get(path);
            if value.is_none() {
                log::trace!("'{}' is unresolved, rendering empty", path);
            }
            for variable in variables {
                variable.apply(doc, value.as_ref());
            }
        }
    }

    /// Bound paths in document order of first occurrence.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn variables(&self, path: &str) -> &[Variable] {
        self.bindings.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total placeholder occurrences.
    pub fn len(&self) -> usize {
        self.bindings.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_extract_splits_and_blanks() {
        let mut doc = parse("<p>Now playing: {{ title }} by {{artist}}!</p>").unwrap();
        let p = doc.children(doc.root())[0];
        let root = doc.root();
        let template = Template::extract(&mut doc, root);

        assert_eq!(template.paths().collect::<Vec<_>>(), vec!["title", "artist"]);
        assert_eq!(template.len(), 2);
        assert_eq!(doc.to_html(), "<p>Now playing:  by !</p>");

        let texts: Vec<_> = doc.children(p).iter().map(|&n| doc.text(n).unwrap().to_string()).collect();
        assert_eq!(texts, vec!["Now playing: ", "", " by ", "", "!"]);
    }

    #[test]
    fn test_repeated_path_keeps_every_location() {
        let mut doc = parse("<h1>{{ title }}</h1><title>{{ title }}</title>").unwrap();
        let root = doc.root();
        let template = Template::extract(&mut doc, root);
        assert_eq!(template.variables("title").len(), 2);
        assert_eq!(template.len(), 2);
    }

    #[test]
    fn test_adjacent_placeholders() {
        let mut doc = parse("<p>{{ a }}{{ b }}</p>").unwrap();
        let root = doc.root();
        let template = Template::extract(&mut doc, root);
        assert_eq!(template.paths().collect::<Vec<_>>(), vec!["a", "b"]);
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.children(p).len(), 2);
    }

    #[test]
    fn test_malformed_markers_are_left_alone() {
        let mut doc = parse("<p>{{ not a path }} {{}} { x }</p>").unwrap();
        let root = doc.root();
        let template = Template::extract(&mut doc, root);
        assert!(template.is_empty());
        assert_eq!(doc.to_html(), "<p>{{ not a path }} {{}} { x }</p>");
    }

    #[test]
    fn test_placeholders_in_attributes_and_comments_ignored() {
        let mut doc = parse("<a title=\"{{ x }}\"><!-- {{ y }} -->z</a>").unwrap();
        let root = doc.root();
        let template = Template::extract(&mut doc, root);
        assert!(template.is_empty());
    }
}
