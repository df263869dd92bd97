//! Arena-backed document tree.
//!
//! Nodes live in a single `Vec` and are addressed by [`NodeId`]. Detaching a
//! node keeps it alive (it can be re-inserted or cloned); [`Document::remove`]
//! detaches a subtree and returns its slots to a free list.

use crate::html;
use crate::parser::Span;

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// `None` for boolean attributes
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    Doctype(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    span: Option<Span>,
}

/// A mutable document tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Option<NodeData>>,
    free: Vec<usize>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = NodeData {
            kind: NodeKind::Document,
            parent: None,
            children: Vec::new(),
            span: None,
        };
        Self {
            nodes: vec![Some(root)],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    /// The document node. Top-level content is its children.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, including the document node.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    // === Construction ===

    fn alloc(&mut self, kind: NodeKind, span: Option<Span>) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            span,
        };
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(data);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(data));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.alloc(NodeKind::Element(element), None)
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()), None)
    }

    pub(crate) fn create_node(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.alloc(kind, Some(span))
    }

    // === Inspection ===

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.node(id).and_then(|n| n.span)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.children(self.parent(id)?);
        let index = siblings.iter().position(|&c| c == id)?;
        siblings.get(index + 1).copied()
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Elements below `id` carrying `name`, in document order.
    pub fn elements_with_attribute(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.element(n).is_some_and(|e| e.has_attribute(name)))
            .collect()
    }

    // === Mutation ===

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let Some(NodeData { kind: NodeKind::Text(current), .. }) = self.node_mut(id) {
            current.clear();
            current.push_str(text);
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(NodeData { kind: NodeKind::Element(element), .. }) = self.node_mut(id) {
            element.attributes.retain(|a| a.name != name);
        }
    }

    /// Split a text node at a byte offset. The original keeps `[..offset]`; a new
    /// sibling inserted right after it holds `[offset..]` and is returned.
    ///
    /// Panics if `offset` is not on a char boundary.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> NodeId {
        let tail = match self.node_mut(id) {
            Some(NodeData { kind: NodeKind::Text(text), .. }) => text.split_off(offset),
            _ => String::new(),
        };
        let span = self.span(id);
        let new = self.alloc(NodeKind::Text(tail), span);

        if let Some(parent) = self.parent(id) {
            let anchor = self.next_sibling(id);
            self.insert_before(parent, new, anchor);
        }
        new
    }

    /// Unlink `id` from its parent. The subtree stays alive.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(data) = self.node_mut(parent) {
            data.children.retain(|&c| c != id);
        }
        if let Some(data) = self.node_mut(id) {
            data.parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` before `anchor` under `parent`. A missing anchor, or one that
    /// is no longer a child of `parent`, appends.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, anchor: Option<NodeId>) {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return;
        }
        self.detach(child);

        let index = anchor.and_then(|a| self.children(parent).iter().position(|&c| c == a));
        if let Some(data) = self.node_mut(parent) {
            match index {
                Some(i) => data.children.insert(i, child),
                None => data.children.push(child),
            }
        }
        if let Some(data) = self.node_mut(child) {
            data.parent = Some(parent);
        }
    }

    /// Detach and free a whole subtree. Handles into it become invalid.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root || !self.contains(id) {
            return;
        }
        self.detach(id);

        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(data) = self.nodes[next.0].take() {
                stack.extend(data.children);
                self.free.push(next.0);
            }
        }
    }

    /// Deep copy of `id`; the copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let Some(source) = self.node(id) else {
            return id;
        };
        let kind = source.kind.clone();
        let span = source.span;
        let children = source.children.clone();

        let copy = self.alloc(kind, span);
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    // === Serialization ===

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        self.inner_html(self.root)
    }

    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.element(id).is_some_and(|e| html::is_raw_text_element(&e.tag));
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(kind) = self.kind(id) else {
            return;
        };

        match kind {
            NodeKind::Document => out.push_str(&self.inner_html(id)),
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => html::escape_text(text, out),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Doctype(text) => {
                out.push_str("<!");
                out.push_str(text);
                out.push('>');
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for attr in &element.attributes {
                    out.push(' ');
                    out.push_str(&attr.name);
                    if let Some(value) = &attr.value {
                        out.push_str("=\"");
                        html::escape_attribute(value, out);
                        out.push('"');
                    }
                }
                out.push('>');

                if html::is_void_element(&element.tag) {
                    return;
                }

                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}
