//! Error types for the styling engine.

use std::fmt;
use std::path::PathBuf;

/// Result type alias for style operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the styling engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error while loading a stylesheet.
    #[error("failed to read stylesheet '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A recoverable parse error promoted to a hard failure by a caller.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A declaration value failed to expand.
    #[error(transparent)]
    Function(#[from] FunctionError),
}

impl Error {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Classification of recoverable errors recorded while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Malformed token, e.g. an unterminated string or url.
    Tokenize,
    /// Malformed rule or declaration.
    Parse,
    /// Invalid selector content, e.g. a selector list inside `:not()`.
    Selector,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Tokenize => write!(f, "tokenize error"),
            ParseErrorKind::Parse => write!(f, "parse error"),
            ParseErrorKind::Selector => write!(f, "selector error"),
        }
    }
}

/// A recoverable error recorded during parsing.
///
/// The parser resynchronizes at the next rule boundary after recording one
/// of these and keeps going; [`parse_stylesheet`](crate::parser::parse_stylesheet)
/// returns the accumulated list next to the AST. `offset` is a 0-based
/// character offset into the normalized input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at offset {offset}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    /// Create a parse error of the given kind.
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, offset: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            offset,
        }
    }

    /// Create a malformed-rule error.
    pub fn parse(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ParseErrorKind::Parse, message, offset)
    }

    /// Create a malformed-token error.
    pub fn tokenize(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ParseErrorKind::Tokenize, message, offset)
    }

    /// Create an invalid-selector error.
    pub fn selector(message: impl Into<String>, offset: usize) -> Self {
        Self::new(ParseErrorKind::Selector, message, offset)
    }
}

/// Errors raised while expanding functions in a declaration value.
///
/// These are local to a single declaration: the declaration emits no tokens
/// and is dropped, sibling declarations and rules are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FunctionError {
    #[error("{function}() expects {expected} arguments, got {found}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("{function}(): {message}")]
    Type {
        function: &'static str,
        message: String,
    },

    #[error("unresolved custom property '--{name}'")]
    UnresolvedVariable { name: String },

    #[error("cyclic custom property '--{name}'")]
    CyclicVariable { name: String },

    #[error("custom property expansion exceeded {limit} levels")]
    RecursionLimit { limit: usize },

    #[error("missing attribute '{name}' and no fallback given")]
    MissingAttribute { name: String },

    #[error("invalid pattern in replace(): {message}")]
    InvalidPattern { message: String },

    #[error("unterminated {function}() call")]
    Unterminated { function: String },
}

impl FunctionError {
    /// Create a type-mismatch error for the named function.
    pub fn type_error(function: &'static str, message: impl Into<String>) -> Self {
        Self::Type {
            function,
            message: message.into(),
        }
    }
}
