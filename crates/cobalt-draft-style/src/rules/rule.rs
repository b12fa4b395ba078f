//! Rule and declaration definitions.

use crate::selector::SelectorGroup;
use crate::token::Token;

/// A parsed top-level construct.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// `selector-group { declarations }`.
    Style(StyleRule),
    /// `@name prelude;` or `@name prelude { ... }`, kept verbatim.
    At(AtRule),
}

impl Rule {
    pub fn as_style(&self) -> Option<&StyleRule> {
        match self {
            Rule::Style(rule) => Some(rule),
            Rule::At(_) => None,
        }
    }

    pub fn as_at(&self) -> Option<&AtRule> {
        match self {
            Rule::At(rule) => Some(rule),
            Rule::Style(_) => None,
        }
    }
}

/// A style rule mapping a selector group to declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selectors: SelectorGroup,
    pub declarations: Vec<Declaration>,
}

impl StyleRule {
    pub fn new(selectors: SelectorGroup, declarations: Vec<Declaration>) -> Self {
        Self {
            selectors,
            declarations,
        }
    }
}

/// An at-rule recognized syntactically but not executed, except for
/// `@namespace` whose prelude feeds the stylesheet's namespace table.
#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub name: String,
    pub prelude: Vec<Token>,
    pub block: Option<Vec<Token>>,
}

impl AtRule {
    pub fn new(name: impl Into<String>, prelude: Vec<Token>, block: Option<Vec<Token>>) -> Self {
        Self {
            name: name.into(),
            prelude,
            block,
        }
    }
}

/// A property declaration; terms are unexpanded tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub terms: Vec<Token>,
}

impl Declaration {
    pub fn new(property: impl Into<String>, terms: Vec<Token>) -> Self {
        Self {
            property: property.into(),
            terms,
        }
    }

    /// True for `--name: value` declarations, stored for `var()` and never
    /// applied to elements directly.
    pub fn is_custom_property(&self) -> bool {
        self.property.starts_with("--")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn custom_property_detection() {
        let decl = Declaration::new("--accent", vec![]);
        assert!(decl.is_custom_property());
        let decl = Declaration::new("fill", vec![Token::new(TokenKind::Ident("red".into()), 0, 3)]);
        assert!(!decl.is_custom_property());
    }
}
