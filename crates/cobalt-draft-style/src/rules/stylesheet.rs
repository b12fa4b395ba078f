//! Stylesheet collection and namespace table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, ParseError, Result};
use crate::rules::{AtRule, Rule, StyleRule};
use crate::token::TokenKind;

/// Where a stylesheet came from.
///
/// Higher origins override lower ones at equal specificity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum StyleOrigin {
    /// Application defaults (lowest priority).
    UserAgent = 0,
    /// Document-author stylesheet.
    Author = 1,
}

/// A parsed stylesheet.
///
/// Immutable once parsed; matched repeatedly and statelessly against many
/// elements. `@namespace` declarations are executed into the prefix table
/// at parse time.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    /// All rules in source order.
    pub rules: Vec<Rule>,
    namespaces: HashMap<String, String>,
    default_namespace: Option<String>,
    /// Source file path when loaded from disk.
    pub source_path: Option<PathBuf>,
}

impl Stylesheet {
    /// Create an empty stylesheet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a stylesheet from CSS text.
    ///
    /// Never fails: recoverable errors are collected while the parser
    /// resynchronizes, and a partially valid stylesheet remains usable.
    pub fn parse(css: &str) -> (Self, Vec<ParseError>) {
        crate::parser::parse_stylesheet(css)
    }

    /// Load a stylesheet from a file.
    ///
    /// I/O failures are hard errors; parse errors are returned next to the
    /// stylesheet like in [`parse`](Self::parse).
    pub fn from_file(path: impl AsRef<Path>) -> Result<(Self, Vec<ParseError>)> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let (mut sheet, errors) = Self::parse(&content);
        sheet.source_path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), rules = sheet.rules.len(), "loaded stylesheet");
        Ok((sheet, errors))
    }

    /// Bind a namespace prefix, or the default namespace when `prefix` is
    /// `None`.
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: impl Into<String>) {
        match prefix {
            Some(prefix) => {
                self.namespaces.insert(prefix.to_string(), uri.into());
            }
            None => self.default_namespace = Some(uri.into()),
        }
    }

    /// Resolve a namespace prefix bound by `@namespace`.
    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    /// The default namespace, if one was declared.
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Execute an `@namespace` rule into the prefix table.
    ///
    /// Accepted preludes: `<uri>`, `"uri"`, or `prefix <uri>`.
    pub(crate) fn apply_namespace_rule(&mut self, rule: &AtRule) -> std::result::Result<(), ParseError> {
        let tokens: Vec<_> = rule.prelude.iter().filter(|t| !t.is_whitespace()).collect();
        let offset = rule.prelude.first().map(|t| t.start).unwrap_or(0);
        match tokens.as_slice() {
            [uri] => match &uri.kind {
                TokenKind::Url(u) | TokenKind::QuotedString(u) => {
                    self.declare_namespace(None, u.clone());
                    Ok(())
                }
                _ => Err(ParseError::parse("malformed @namespace rule", offset)),
            },
            [prefix, uri] => match (&prefix.kind, &uri.kind) {
                (TokenKind::Ident(p), TokenKind::Url(u))
                | (TokenKind::Ident(p), TokenKind::QuotedString(u)) => {
                    self.declare_namespace(Some(p), u.clone());
                    Ok(())
                }
                _ => Err(ParseError::parse("malformed @namespace rule", offset)),
            },
            _ => Err(ParseError::parse("malformed @namespace rule", offset)),
        }
    }

    /// Iterate over style rules, skipping at-rules.
    pub fn style_rules(&self) -> impl Iterator<Item = &StyleRule> {
        self.rules.iter().filter_map(Rule::as_style)
    }

    /// The number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the stylesheet has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn namespace_declarations_resolve() {
        let (sheet, errors) =
            Stylesheet::parse("@namespace svg url(\"http://www.w3.org/2000/svg\");\nsvg|rect {}");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(
            sheet.namespace_uri("svg"),
            Some("http://www.w3.org/2000/svg")
        );
        assert_eq!(sheet.default_namespace(), None);
    }

    #[test]
    fn default_namespace_declaration() {
        let (sheet, errors) = Stylesheet::parse("@namespace url(http://example.com/ns);");
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(sheet.default_namespace(), Some("http://example.com/ns"));
    }

    #[test]
    fn malformed_namespace_is_recorded() {
        let (sheet, errors) = Stylesheet::parse("@namespace 12;");
        assert_eq!(errors.len(), 1);
        assert_eq!(sheet.default_namespace(), None);
    }

    #[test]
    fn from_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "TubeShape {{ fill: red; }}").unwrap();
        let (sheet, errors) = Stylesheet::from_file(file.path()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet.source_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Stylesheet::from_file("/nonexistent/sheet.css").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
