//! Token definitions for the CSS tokenizer.

use std::fmt;

/// The smallest lexical unit produced by the tokenizer.
///
/// Tokens are immutable once produced. `start` and `end` are 0-based
/// character offsets into the normalized input, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self { kind, start, end }
    }

    /// True for the end-of-input marker.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// True for a whitespace run.
    pub fn is_whitespace(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace)
    }

    /// True if this is the delimiter `c`.
    pub fn is_delim(&self, c: char) -> bool {
        matches!(self.kind, TokenKind::Delim(d) if d == c)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// Token payload.
///
/// Numeric tokens keep the parsed value, whether the literal carried an
/// explicit sign, and the integer value when the literal was an integer
/// (`An+B` parsing needs both).
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier (`TubeShape`, `color`, `--accent`).
    Ident(String),
    /// `#` followed by a name (`#submit`, `#1a2b3c`).
    Hash(String),
    /// Quoted string; the payload is the decoded content.
    QuotedString(String),
    /// Function name with the opening `(` consumed (`calc`, `var`). The
    /// matching `)` is a separate [`TokenKind::Delim`] left for the caller.
    Function(String),
    /// `url(...)`; the payload is the decoded url.
    Url(String),
    Number {
        has_sign: bool,
        value: f64,
        int_value: Option<i32>,
    },
    Percentage {
        has_sign: bool,
        value: f64,
        int_value: Option<i32>,
    },
    Dimension {
        has_sign: bool,
        value: f64,
        int_value: Option<i32>,
        unit: String,
    },
    /// Any other single character.
    Delim(char),
    Comma,
    /// A run of whitespace. Kept where it is significant: between simple
    /// selectors (descendant combinator) and around `calc()` operators.
    Whitespace,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "{name}"),
            TokenKind::Hash(name) => write!(f, "#{name}"),
            TokenKind::QuotedString(value) => write_string_literal(f, value),
            TokenKind::Function(name) => write!(f, "{name}("),
            TokenKind::Url(value) => {
                write!(f, "url(")?;
                write_string_literal(f, value)?;
                write!(f, ")")
            }
            TokenKind::Number { value, .. } => write!(f, "{}", format_number(*value)),
            TokenKind::Percentage { value, .. } => write!(f, "{}%", format_number(*value)),
            TokenKind::Dimension { value, unit, .. } => {
                write!(f, "{}{unit}", format_number(*value))
            }
            TokenKind::Delim(c) => write!(f, "{c}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Whitespace => write!(f, " "),
            TokenKind::Eof => Ok(()),
        }
    }
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    write!(f, "\"")?;
    for c in value.chars() {
        match c {
            '"' => write!(f, "\\\"")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\a ")?,
            _ => write!(f, "{c}")?,
        }
    }
    write!(f, "\"")
}

/// Format a numeric value without a trailing `.0` on integral values.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
