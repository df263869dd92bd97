use crate::parser::Span;
use std::fmt;

/// Kind of parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnclosedElement,
    DuplicateAttribute,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnclosedElement => "Unclosed element",
            ErrorKind::DuplicateAttribute => "Duplicate attribute",
        }
    }
}

/// Error during parsing
#[derive(Debug, Clone)]
pub struct ParseError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
    pub related_span: Option<Span>,
    pub related_label: Option<String>,
    pub help: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            related_span: None,
            related_label: None,
            help: None,
        }
    }

    /// Add a related span with a label (e.g., "opened here")
    pub fn with_related(mut self, span: Span) -> Self {
        self.related_span = Some(span);
        self
    }

    /// Set the label for the related span
    pub fn with_related_label(mut self, label: impl Into<String>) -> Self {
        self.related_label = Some(label.into());
        self
    }

    /// Add help text
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render the error with source context
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.snippet().render(source, filename, false)
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        self.snippet().render(source, filename, true)
    }

    fn snippet(&self) -> Snippet<'_> {
        Snippet {
            message: &self.message,
            span: self.span,
            related: self.related_span.map(|span| {
                (span, self.related_label.as_deref().unwrap_or("opened here"))
            }),
            help: self.help.as_deref(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Error while binding a document: compiling directives or mounting controllers
#[derive(Debug, Clone, PartialEq)]
pub enum BindError {
    /// A repeat directive whose value is not `<item> in <collection>`
    InvalidRepeatExpression { expression: String, span: Option<Span> },
    /// A controller name registered twice
    DuplicateRegistration { name: String },
    /// An element names a controller that was never registered
    NotFound { name: String, span: Option<Span> },
}

impl BindError {
    pub fn span(&self) -> Option<Span> {
        match self {
            BindError::InvalidRepeatExpression { span, .. } => *span,
            BindError::DuplicateRegistration { .. } => None,
            BindError::NotFound { span, .. } => *span,
        }
    }

    pub fn help(&self) -> Option<&'static str> {
        match self {
            BindError::InvalidRepeatExpression { .. } => {
                Some("Write it as \"<item> in <collection>\", e.g. \"track in album.tracks\"")
            }
            BindError::DuplicateRegistration { .. } => None,
            BindError::NotFound { .. } => Some("Register the controller before bootstrapping the document"),
        }
    }

    /// Render the error with source context (no color)
    pub fn render(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, false)
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        self.render_inner(source, filename, true)
    }

    fn render_inner(&self, source: &str, filename: &str, color: bool) -> String {
        let message = self.to_string();
        match self.span() {
            Some(span) => Snippet {
                message: &message,
                span,
                related: None,
                help: self.help(),
            }
            .render(source, filename, color),
            None => render_plain(&message, color),
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::InvalidRepeatExpression { expression, .. } => {
                write!(f, "\"{}\" is not a valid repeat expression.", expression)
            }
            BindError::DuplicateRegistration { name } => {
                write!(f, "Controller '{}' is already registered.", name)
            }
            BindError::NotFound { name, .. } => write!(f, "Controller '{}' doesn't exist.", name),
        }
    }
}

impl std::error::Error for BindError {}

/// Error during compilation (parsing, binding or loading data)
#[derive(Debug)]
pub enum CompileError {
    Parse(ParseError),
    Bind(BindError),
    Data(String),
}

impl CompileError {
    /// Render the error with source context (no color)
    pub fn render(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Parse(err) => err.render(source, filename),
            CompileError::Bind(err) => err.render(source, filename),
            CompileError::Data(msg) => render_plain(&format!("Invalid data: {}", msg), false),
        }
    }

    /// Render the error with ANSI color codes
    pub fn render_color(&self, source: &str, filename: &str) -> String {
        match self {
            CompileError::Parse(err) => err.render_color(source, filename),
            CompileError::Bind(err) => err.render_color(source, filename),
            CompileError::Data(msg) => render_plain(&format!("Invalid data: {}", msg), true),
        }
    }
}

impl From<ParseError> for CompileError {
    fn from(err: ParseError) -> Self {
        CompileError::Parse(err)
    }
}

impl From<BindError> for CompileError {
    fn from(err: BindError) -> Self {
        CompileError::Bind(err)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Parse(err) => write!(f, "{}", err),
            CompileError::Bind(err) => write!(f, "{}", err),
            CompileError::Data(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl std::error::Error for CompileError {}

fn render_plain(message: &str, color: bool) -> String {
    if color {
        format!("\x1b[1;31merror:\x1b[0m {}\n", message)
    } else {
        format!("error: {}\n", message)
    }
}

/// A diagnostic pointing at a source location
struct Snippet<'a> {
    message: &'a str,
    span: Span,
    related: Option<(Span, &'a str)>,
    help: Option<&'a str>,
}

impl Snippet<'_> {
    fn render(&self, source: &str, filename: &str, color: bool) -> String {
        // Visual hierarchy: red for errors only, dim for structural chrome
        let red = if color { "\x1b[1;31m" } else { "" };
        let dim = if color { "\x1b[2m" } else { "" };
        let cyan = if color { "\x1b[1;38;5;73m" } else { "" };
        let reset = if color { "\x1b[0m" } else { "" };

        let mut output = String::new();

        // Leading blank line for visual separation
        output.push('\n');

        // File location at the top: use the related span if available (points to where the fix is needed)
        let loc_span = self.related.map(|(span, _)| span).unwrap_or(self.span);
        output.push_str(&format!(
            " {}file:{} {}:{}:{}\n",
            dim,
            reset,
            filename,
            loc_span.start.line + 1,
            loc_span.start.col + 1
        ));

        output.push_str(&format!("{}error:{} {}\n", red, reset, self.message));

        // Source context
        write_underlined(&mut output, source, self.span, red, dim, reset, None);

        // Related span: dim chrome, secondary context
        if let Some((related, label)) = self.related {
            write_underlined(&mut output, source, related, dim, dim, reset, Some(label));
        }

        if let Some(help) = self.help {
            output.push('\n');
            for (i, help_line) in help.lines().enumerate() {
                if i == 0 {
                    output.push_str(&format!(" {}help:{} {}\n", cyan, reset, help_line));
                } else {
                    output.push_str(&format!("       {}\n", help_line));
                }
            }
        }

        // Trailing blank line for visual separation
        output.push('\n');

        output
    }
}

fn write_underlined(
    output: &mut String,
    source: &str,
    span: Span,
    caret_color: &str,
    dim: &str,
    reset: &str,
    label: Option<&str>,
) {
    let Some(source_line) = source.lines().nth(span.start.line) else {
        return;
    };

    let line_number = span.start.line + 1;
    let width = format!("{}", line_number).len().max(2);
    output.push_str(&format!("{}{:>width$} |{}\n", dim, "", reset, width = width));
    output.push_str(&format!("{}{:>width$} |{} {}\n", dim, line_number, reset, source_line, width = width));

    let underline_start = span.start.col;
    let underline_len = if span.end.line == span.start.line {
        span.end.col.saturating_sub(span.start.col).max(1)
    } else {
        source_line.chars().count().saturating_sub(underline_start).max(1)
    };

    let label = label.map(|l| format!(" {}", l)).unwrap_or_default();
    output.push_str(&format!(
        "{}{:>width$} |{} {}{}{}{}{}\n",
        dim,
        "",
        reset,
        " ".repeat(underline_start),
        caret_color,
        "^".repeat(underline_len),
        label,
        reset,
        width = width
    ));
}
