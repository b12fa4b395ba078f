//! Selector types, matching, and specificity.

mod matcher;
mod specificity;
mod types;

pub use matcher::SelectorMatcher;
pub use specificity::Specificity;
pub use types::{
    AttrMatch, AttributeSelector, Combinator, NamespacePrefix, NthExpr, PseudoClass, Selector,
    SelectorGroup, SelectorPart, TypeSelector,
};
