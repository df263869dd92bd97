use crate::dom::NodeId;
use crate::scope::Scope;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref REPEAT_EXPRESSION: Regex =
        Regex::new(r"^\s*([a-zA-Z0-9_]+)\s+in\s+([a-zA-Z0-9_.]+)\s*$").unwrap();
}

/// A parsed `<item> in <collection>` directive value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatExpression {
    /// Name the current item is bound to in the child scope
    pub item: String,
    /// Path of the collection, resolved in the owning scope
    pub collection: String,
}

impl RepeatExpression {
    pub fn parse(expression: &str) -> Option<Self> {
        let caps = REPEAT_EXPRESSION.captures(expression)?;
        Some(Self {
            item: caps[1].to_string(),
            collection: caps[2].to_string(),
        })
    }
}

/// Where a repeat directive renders and what it renders.
#[derive(Debug, Clone)]
pub(crate) struct RepeatSite {
    pub expression: RepeatExpression,
    /// Child scope reused for every item
    pub scope: Scope,
    /// The detached directive element, cloned once per item
    pub template: NodeId,
    /// Element the clones are inserted into
    pub container: NodeId,
    /// Clones go right before this node; `None` appends
    pub anchor: Option<NodeId>,
}

/// A compiled repeat directive and the fragments it currently has in the document.
#[derive(Debug, Clone)]
pub(crate) struct Repeat {
    pub site: RepeatSite,
    pub fragments: Vec<NodeId>,
}

impl Repeat {
    pub fn new(site: RepeatSite) -> Self {
        Self {
            site,
            fragments: Vec::new(),
        }
    }
}
