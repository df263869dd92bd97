use super::tokenizer::{Attribute, AttributeValue, Position, Span, Token};
use crate::dom::{self, Document, Element, NodeId, NodeKind};
use crate::error::{ErrorKind, ParseError};
use crate::html;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a document tree from a token stream
pub struct TreeBuilder {
    tokens: Vec<Token>,
    pos: usize,
    source: Arc<str>,
    document: Document,
    element_stack: Vec<String>, // Open element names, innermost last
}

impl TreeBuilder {
    pub fn new(tokens: Vec<Token>, source: Arc<str>) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            document: Document::new(),
            element_stack: Vec::new(),
        }
    }

    pub fn build(mut self) -> Result<Document, ParseError> {
        let root = self.document.root();

        while !self.is_at_end() {
            self.parse_node(root)?;
        }

        Ok(self.document)
    }

    /// Get a span at the current position (for EOF or current token)
    fn current_span(&self) -> Span {
        if let Some(token) = self.peek() {
            token.span()
        } else {
            // EOF span - point to end of source
            let byte = self.source.len();
            let line = self.source.lines().count().saturating_sub(1);
            let col = self.source.lines().last().map(|l| l.chars().count()).unwrap_or(0);
            let end = Position { byte, line, col };
            Span { start: end, end }
        }
    }

    fn parse_node(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let Some(token) = self.peek().cloned() else {
            return Ok(());
        };

        match token {
            Token::Text { text, span } | Token::RawText { text, span } => {
                self.push(parent, NodeKind::Text(text), span);
                self.advance();
            }

            Token::Comment { text, span } => {
                self.push(parent, NodeKind::Comment(text), span);
                self.advance();
            }

            Token::Doctype { text, span } => {
                self.push(parent, NodeKind::Doctype(text), span);
                self.advance();
            }

            Token::HtmlElementOpen {
                tag,
                attributes,
                self_closing,
                span,
                ..
            } => {
                self.check_duplicate_attributes(&attributes)?;
                self.advance();

                let element = Element {
                    tag: tag.clone(),
                    attributes: convert_attributes(&attributes),
                };
                let node = self.push(parent, NodeKind::Element(element), span);

                // Void elements never have children, with or without the trailing slash
                if !self_closing && !html::is_void_element(&tag) {
                    self.parse_until_element_close(&tag, &span, node)?;
                }
            }

            Token::HtmlElementClose { .. } => {
                // Closing tag with nothing open to close - skip it
                self.advance();
            }

            Token::Eof { .. } => {
                self.advance();
            }
        }

        Ok(())
    }

    fn parse_until_element_close(&mut self, tag: &str, open_span: &Span, node: NodeId) -> Result<(), ParseError> {
        self.element_stack.push(tag.to_string());

        while !self.is_at_end() {
            match self.peek() {
                Some(Token::HtmlElementClose { tag: close_tag, .. }) if close_tag == tag => {
                    self.advance();
                    self.element_stack.pop();
                    return Ok(());
                }
                Some(Token::HtmlElementClose { tag: close_tag, .. })
                    if self.element_stack.iter().any(|open| open == close_tag) =>
                {
                    // Closes an outer element: this one ends implicitly (<li>a</ul>)
                    self.element_stack.pop();
                    return Ok(());
                }
                _ => self.parse_node(node)?,
            }
        }

        self.element_stack.pop();
        Err(ParseError::new(
            ErrorKind::UnclosedElement,
            format!("<{}> is never closed.", tag),
            self.current_span(),
        )
        .with_related(*open_span)
        .with_help(format!("Close with </{}>", tag)))
    }

    fn check_duplicate_attributes(&self, attrs: &[Attribute]) -> Result<(), ParseError> {
        let mut seen = HashMap::new();
        for attr in attrs {
            if let Some(first_span) = seen.get(attr.name.as_str()) {
                return Err(ParseError::new(
                    ErrorKind::DuplicateAttribute,
                    format!("\"{}\" is set twice on this element.", attr.name),
                    attr.span,
                )
                .with_related(*first_span)
                .with_related_label("first use"));
            }
            seen.insert(attr.name.as_str(), attr.span);
        }
        Ok(())
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind, span: Span) -> NodeId {
        let node = self.document.create_node(kind, span);
        self.document.append_child(parent, node);
        node
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
            || matches!(self.peek(), Some(Token::Eof { .. }))
    }
}

fn convert_attributes(token_attrs: &[Attribute]) -> Vec<dom::Attribute> {
    token_attrs
        .iter()
        .map(|attr| dom::Attribute {
            name: attr.name.clone(),
            value: match &attr.value {
                AttributeValue::String(s) => Some(s.clone()),
                AttributeValue::Bool => None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tokenize;

    fn build(source: &str) -> Result<Document, ParseError> {
        TreeBuilder::new(tokenize(source), Arc::from(source)).build()
    }

    #[test]
    fn test_nesting() {
        let doc = build("<ul><li>a</li><li>b</li></ul>").unwrap();
        let ul = doc.children(doc.root())[0];
        assert_eq!(doc.element(ul).unwrap().tag, "ul");
        assert_eq!(doc.children(ul).len(), 2);
        assert_eq!(doc.to_html(), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_void_elements_need_no_close() {
        let doc = build("<p>a<br>b<img src=\"x.png\">c</p>").unwrap();
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.children(p).len(), 5);
        assert_eq!(doc.to_html(), "<p>a<br>b<img src=\"x.png\">c</p>");
    }

    #[test]
    fn test_unclosed_element() {
        let err = build("<div>\n  <span>hi</span>\n").unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnclosedElement);
        assert_eq!(err.message, "<div> is never closed.");
        assert_eq!(err.related_span.map(|s| s.start.line), Some(0));
    }

    #[test]
    fn test_duplicate_attribute() {
        let err = build("<div id=\"a\" id=\"b\"></div>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateAttribute);
        assert_eq!(err.related_label.as_deref(), Some("first use"));
    }

    #[test]
    fn test_implicit_close_by_outer_tag() {
        let doc = build("<ul><li>a</ul><p>b</p>").unwrap();
        assert_eq!(doc.to_html(), "<ul><li>a</li></ul><p>b</p>");
    }

    #[test]
    fn test_stray_close_tag_is_skipped() {
        let doc = build("a</span>b").unwrap();
        assert_eq!(doc.to_html(), "ab");
    }

    #[test]
    fn test_elements_carry_spans() {
        let doc = build("<div>\n  <p hb-repeat=\"x\">y</p>\n</div>").unwrap();
        let p = doc.elements_with_attribute(doc.root(), "hb-repeat")[0];
        let span = doc.span(p).unwrap();
        assert_eq!((span.start.line, span.start.col), (1, 2));
    }
}
