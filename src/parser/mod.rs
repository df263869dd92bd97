pub mod tokenizer;
mod tree_builder;

pub use tokenizer::{Position, Span, Token, tokenize};
use tree_builder::TreeBuilder;

use crate::dom::Document;
use crate::error::ParseError;
use std::sync::Arc;

/// Parse HTML markup into a document tree.
pub fn parse(source: &str) -> Result<Document, ParseError> {
    TreeBuilder::new(tokenize(source), Arc::from(source)).build()
}
