//! CSS-subset styling engine for Cobalt Draft.
//!
//! This crate implements the styling core of the diagram editor, featuring:
//!
//! - **Tokenizer**: hand-written CSS lexer with escape decoding and
//!   single-token push-back
//! - **Parser**: recursive descent into a rule AST, collecting recoverable
//!   errors instead of failing
//! - **Selectors**: type, class, ID, attribute, pseudo-class and combinator
//!   selectors with integer specificity
//! - **Functions**: `var()`, `calc()`, `attr()`, `concat()`, `replace()`,
//!   `round()` and `ladder()` expansion with custom-property cycle detection
//! - **Application**: specificity-ordered cascade onto any element tree
//!   reached through the [`SelectorModel`](model::SelectorModel) capability
//!
//! The document tree itself is never owned here; hosts implement the model
//! trait for their own representation.
//!
//! # Example
//!
//! ```ignore
//! use cobalt_draft_style::prelude::*;
//!
//! let (sheet, errors) = Stylesheet::parse("TubeShape.Two { fill: var(--accent); }");
//! assert!(errors.is_empty());
//!
//! let mut engine = StyleEngine::new();
//! engine.add_stylesheet(StyleOrigin::Author, sheet);
//! engine.apply_tree(&mut document, &root);
//! ```

pub mod apply;
pub mod functions;
pub mod model;
pub mod parser;
pub mod printer;
pub mod rules;
pub mod scanner;
pub mod selector;
pub mod token;
pub mod tokenizer;
pub mod types;
pub mod variables;

mod error;

pub use error::{Error, FunctionError, ParseError, ParseErrorKind, Result};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::apply::StyleEngine;
    pub use crate::error::{Error, FunctionError, ParseError, ParseErrorKind, Result};
    pub use crate::functions::FunctionProcessor;
    pub use crate::model::{SelectorModel, WritableSelectorModel};
    pub use crate::parser::parse_stylesheet;
    pub use crate::printer::{print, print_indented};
    pub use crate::rules::{AtRule, Declaration, Rule, StyleOrigin, StyleRule, Stylesheet};
    pub use crate::selector::{
        AttrMatch, AttributeSelector, Combinator, NamespacePrefix, NthExpr, PseudoClass, Selector,
        SelectorGroup, SelectorMatcher, SelectorPart, Specificity, TypeSelector,
    };
    pub use crate::token::{Token, TokenKind};
    pub use crate::tokenizer::Tokenizer;
    pub use crate::types::Color;
    pub use crate::variables::CustomProperties;
}
