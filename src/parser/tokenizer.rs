use crate::html;

/// Position in source code (byte offset, plus line/column for diagnostics)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset in source
    pub byte: usize,
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in characters)
    pub col: usize,
}

impl Position {
    pub fn new() -> Self {
        Self { byte: 0, line: 0, col: 0 }
    }
}

/// Span in source code (a range from start position to end position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Element attribute as written in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Quoted or unquoted value: attr="value", attr='value', attr=value
    String(String),
    /// Boolean (no value): disabled
    Bool,
}

/// Tokens produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Text content, entities already decoded
    Text { text: String, span: Span },
    /// Contents of a raw-text element (<script>, <style>), kept verbatim
    RawText { text: String, span: Span },
    /// <!-- comment -->
    Comment { text: String, span: Span },
    /// <!DOCTYPE html>
    Doctype { text: String, span: Span },
    /// HTML element opening tag: <tag attributes>
    HtmlElementOpen {
        tag: String,
        tag_span: Span,
        attributes: Vec<Attribute>,
        self_closing: bool,
        span: Span,
    },
    /// HTML element closing tag: </tag>
    HtmlElementClose { tag: String, span: Span },
    /// End of file
    Eof { position: Position },
}

impl Token {
    pub fn span(&self) -> Span {
        match self {
            Token::Text { span, .. } => *span,
            Token::RawText { span, .. } => *span,
            Token::Comment { span, .. } => *span,
            Token::Doctype { span, .. } => *span,
            Token::HtmlElementOpen { span, .. } => *span,
            Token::HtmlElementClose { span, .. } => *span,
            Token::Eof { position } => Span { start: *position, end: *position },
        }
    }
}

/// Tokenizer for HTML markup
pub struct Tokenizer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    position: Position,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            position: Position::new(),
        }
    }

    /// Tokenize the entire source
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while !self.at_eof() {
            if self.starts_with("<!--") {
                self.tokenize_comment(&mut tokens);
            } else if self.starts_with("<!") {
                self.tokenize_doctype(&mut tokens);
            } else if self.is_html_element_close() {
                self.tokenize_html_element_close(&mut tokens);
            } else if self.is_html_element_start() {
                self.tokenize_html_element_open(&mut tokens);
            } else {
                self.tokenize_text(&mut tokens);
            }
        }

        tokens.push(Token::Eof { position: self.position });
        tokens
    }

    /// Text up to the next markup construct. A '<' that does not start a tag is literal text.
    fn tokenize_text(&mut self, tokens: &mut Vec<Token>) {
        let start = self.position;
        // Always consume at least one char so a stray '<' cannot stall the loop
        self.advance();
        while !self.at_eof() {
            if self.peek_char() == Some('<')
                && (self.starts_with("<!") || self.is_html_element_start() || self.is_html_element_close())
            {
                break;
            }
            self.advance();
        }

        let raw = &self.source[start.byte..self.position.byte];
        tokens.push(Token::Text {
            text: html::decode_entities(raw),
            span: Span { start, end: self.position },
        });
    }

    fn tokenize_comment(&mut self, tokens: &mut Vec<Token>) {
        let start = self.position;
        self.advance_by(4); // <!--
        let text = self.consume_until("-->");
        self.advance_by(3);
        tokens.push(Token::Comment {
            text,
            span: Span { start, end: self.position },
        });
    }

    fn tokenize_doctype(&mut self, tokens: &mut Vec<Token>) {
        let start = self.position;
        self.advance_by(2); // <!
        let text = self.consume_until(">");
        self.advance();
        tokens.push(Token::Doctype {
            text,
            span: Span { start, end: self.position },
        });
    }

    /// Parse an HTML element opening tag: <tag attributes>
    fn tokenize_html_element_open(&mut self, tokens: &mut Vec<Token>) {
        let start = self.position;
        self.advance(); // <

        let tag = self.consume_while(is_tag_char).to_ascii_lowercase();
        let tag_end = self.position;

        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();

            let Some(ch) = self.peek_char() else {
                break;
            };

            if ch == '/' && self.peek_next_char() == Some('>') {
                self.advance_by(2);
                self_closing = true;
                break;
            }
            if ch == '>' {
                self.advance();
                break;
            }

            if let Some(attr) = self.parse_attribute() {
                attrs.push(attr);
            } else {
                // Unknown character, skip
                self.advance();
            }
        }

        let raw_text = !self_closing && html::is_raw_text_element(&tag);
        tokens.push(Token::HtmlElementOpen {
            tag: tag.clone(),
            tag_span: Span { start, end: tag_end },
            attributes: attrs,
            self_closing,
            span: Span { start, end: self.position },
        });

        if raw_text {
            self.tokenize_raw_text(&tag, tokens);
        }
    }

    /// Everything up to the matching close tag is text, verbatim.
    fn tokenize_raw_text(&mut self, tag: &str, tokens: &mut Vec<Token>) {
        let start = self.position;
        let close = format!("</{}", tag);
        while !self.at_eof() && !self.starts_with_ignore_case(&close) {
            self.advance();
        }
        if self.position.byte > start.byte {
            tokens.push(Token::RawText {
                text: self.source[start.byte..self.position.byte].to_string(),
                span: Span { start, end: self.position },
            });
        }
    }

    /// Parse a single attribute. Returns None if no attribute could be parsed.
    fn parse_attribute(&mut self) -> Option<Attribute> {
        let ch = self.peek_char()?;
        if !(ch.is_alphabetic() || ch == '_' || ch == '-' || ch == '@' || ch == ':') {
            return None;
        }

        let attr_start = self.position;
        let attr_name = self.consume_while(is_attribute_name_char);
        let name_end = self.position;
        self.skip_whitespace();

        if self.peek_char() != Some('=') {
            // Boolean attribute; leave trailing whitespace for the caller
            return Some(Attribute {
                name: attr_name,
                value: AttributeValue::Bool,
                span: Span { start: attr_start, end: name_end },
            });
        }

        self.advance(); // =
        self.skip_whitespace();

        let value = match self.peek_char() {
            Some(quote @ ('"' | '\'')) => {
                self.advance();
                let val = self.consume_until(if quote == '"' { "\"" } else { "'" });
                self.advance(); // closing quote
                val
            }
            _ => self.consume_while(|c| !c.is_whitespace() && c != '>' && c != '"' && c != '\''),
        };

        Some(Attribute {
            name: attr_name,
            value: AttributeValue::String(html::decode_entities(&value)),
            span: Span { start: attr_start, end: self.position },
        })
    }

    /// Parse an HTML element closing tag: </tag>
    fn tokenize_html_element_close(&mut self, tokens: &mut Vec<Token>) {
        let start = self.position;
        self.advance_by(2); // </

        let tag = self.consume_while(is_tag_char).to_ascii_lowercase();

        // Skip to >
        while !self.at_eof() && self.peek_char() != Some('>') {
            self.advance();
        }
        if self.peek_char() == Some('>') {
            self.advance();
        }

        tokens.push(Token::HtmlElementClose {
            tag,
            span: Span { start, end: self.position },
        });
    }

    fn is_html_element_start(&self) -> bool {
        self.peek_char() == Some('<')
            && self.peek_next_char().is_some_and(|c| c.is_ascii_alphabetic())
    }

    fn is_html_element_close(&self) -> bool {
        self.starts_with("</")
            && self.source[self.position.byte + 2..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
    }

    // === Low-level helpers ===

    fn at_eof(&self) -> bool {
        self.position.byte >= self.bytes.len()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        self.source[self.position.byte..].starts_with(pattern)
    }

    fn starts_with_ignore_case(&self, pattern: &str) -> bool {
        let rest = &self.bytes[self.position.byte..];
        rest.len() >= pattern.len() && rest[..pattern.len()].eq_ignore_ascii_case(pattern.as_bytes())
    }

    fn peek_char(&self) -> Option<char> {
        if self.at_eof() { return None; }
        // Simple ASCII fast path
        let b = self.bytes[self.position.byte];
        if b < 128 {
            Some(b as char)
        } else {
            self.source[self.position.byte..].chars().next()
        }
    }

    fn peek_next_char(&self) -> Option<char> {
        self.source[self.position.byte..].chars().nth(1)
    }

    fn advance(&mut self) {
        let Some(ch) = self.peek_char() else {
            return;
        };

        self.position.byte += ch.len_utf8();

        if ch == '\n' {
            self.position.line += 1;
            self.position.col = 0;
        } else {
            self.position.col += 1;
        }
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Consume until `stop` (exclusive) or end of input.
    fn consume_until(&mut self, stop: &str) -> String {
        let start = self.position.byte;
        while !self.at_eof() && !self.starts_with(stop) {
            self.advance();
        }
        self.source[start..self.position.byte].to_string()
    }

    fn consume_while<F: Fn(char) -> bool>(&mut self, pred: F) -> String {
        let start = self.position.byte;
        while let Some(ch) = self.peek_char() {
            if !pred(ch) {
                break;
            }
            self.advance();
        }
        self.source[start..self.position.byte].to_string()
    }
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'
}

fn is_attribute_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '@' || c == ':' || c == '.'
}

/// Tokenize source code
pub fn tokenize(source: &str) -> Vec<Token> {
    Tokenizer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_html() {
        let tokens = tokenize("<div>Hello</div>\n");
        assert!(matches!(&tokens[0], Token::HtmlElementOpen { tag, .. } if tag == "div"));
        assert!(matches!(&tokens[1], Token::Text { text, .. } if text == "Hello"));
        assert!(matches!(&tokens[2], Token::HtmlElementClose { tag, .. } if tag == "div"));
        assert!(matches!(&tokens[3], Token::Text { text, .. } if text == "\n"));
        assert!(matches!(&tokens[4], Token::Eof { .. }));
    }

    #[test]
    fn test_placeholder_stays_in_text() {
        let tokens = tokenize("<span>{{ name }}</span>");
        assert!(matches!(&tokens[1], Token::Text { text, .. } if text == "{{ name }}"));
    }

    #[test]
    fn test_attributes() {
        let tokens = tokenize("<li hb-repeat=\"track in tracks\" class='row' data-x=1 hidden>");
        if let Token::HtmlElementOpen { tag, attributes, self_closing, .. } = &tokens[0] {
            assert_eq!(tag, "li");
            assert!(!self_closing);
            assert_eq!(attributes.len(), 4);
            assert_eq!(attributes[0].name, "hb-repeat");
            assert_eq!(attributes[0].value, AttributeValue::String("track in tracks".into()));
            assert_eq!(attributes[1].value, AttributeValue::String("row".into()));
            assert_eq!(attributes[2].value, AttributeValue::String("1".into()));
            assert_eq!(attributes[3].value, AttributeValue::Bool);
        } else {
            panic!("Expected HtmlElementOpen");
        }
    }

    #[test]
    fn test_attribute_over_multiple_lines() {
        let tokens = tokenize("<div\n  id=\"a\"\n  class=\"b\"\n>x</div>");
        if let Token::HtmlElementOpen { attributes, span, .. } = &tokens[0] {
            assert_eq!(attributes.len(), 2);
            assert_eq!(span.end.line, 3);
        } else {
            panic!("Expected HtmlElementOpen");
        }
    }

    #[test]
    fn test_self_closing() {
        let tokens = tokenize("<br/><img src=\"a.png\" />");
        assert!(matches!(&tokens[0], Token::HtmlElementOpen { tag, self_closing: true, .. } if tag == "br"));
        assert!(matches!(&tokens[1], Token::HtmlElementOpen { tag, self_closing: true, .. } if tag == "img"));
    }

    #[test]
    fn test_comment_and_doctype() {
        let tokens = tokenize("<!DOCTYPE html><!-- note --><p>x</p>");
        assert!(matches!(&tokens[0], Token::Doctype { text, .. } if text == "DOCTYPE html"));
        assert!(matches!(&tokens[1], Token::Comment { text, .. } if text == " note "));
        assert!(matches!(&tokens[2], Token::HtmlElementOpen { tag, .. } if tag == "p"));
    }

    #[test]
    fn test_entities_decoded_in_text() {
        let tokens = tokenize("<p>a &amp; b &lt;c&gt;</p>");
        assert!(matches!(&tokens[1], Token::Text { text, .. } if text == "a & b <c>"));
    }

    #[test]
    fn test_stray_less_than_is_text() {
        let tokens = tokenize("<p>1 < 2</p>");
        assert!(matches!(&tokens[1], Token::Text { text, .. } if text == "1 < 2"));
        assert!(matches!(&tokens[2], Token::HtmlElementClose { tag, .. } if tag == "p"));
    }

    #[test]
    fn test_raw_text_element() {
        let tokens = tokenize("<script>if (a < b) { x(\"</p>\") }</script>");
        assert!(matches!(&tokens[1], Token::RawText { text, .. } if text == "if (a < b) { x(\"</p>\") }"));
        assert!(matches!(&tokens[2], Token::HtmlElementClose { tag, .. } if tag == "script"));
    }

    #[test]
    fn test_positions_track_lines() {
        let tokens = tokenize("<ul>\n  <li>a</li>\n</ul>");
        let li = tokens
            .iter()
            .find(|t| matches!(t, Token::HtmlElementOpen { tag, .. } if tag == "li"))
            .unwrap();
        assert_eq!(li.span().start.line, 1);
        assert_eq!(li.span().start.col, 2);
    }
}
