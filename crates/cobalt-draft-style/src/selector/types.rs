//! Selector type definitions.

use std::fmt;

/// A group of comma-separated selector alternatives.
///
/// The group matches an element if any alternative matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorGroup {
    pub selectors: Vec<Selector>,
}

impl SelectorGroup {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self { selectors }
    }
}

impl fmt::Display for SelectorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

/// A complete selector (e.g. `TubeShape.Two > Label:nth-child(2n+1)`).
///
/// A selector consists of one or more simple-selector sequences connected
/// by combinators; `combinators.len() == parts.len() - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    pub parts: Vec<SelectorPart>,
    pub combinators: Vec<Combinator>,
}

impl Selector {
    /// Create a single-sequence selector.
    pub fn simple(part: SelectorPart) -> Self {
        Self {
            parts: vec![part],
            combinators: vec![],
        }
    }

    /// Create a type selector.
    pub fn type_selector(name: impl Into<String>) -> Self {
        Self::simple(SelectorPart::type_only(name))
    }

    /// Create a universal selector (`*`).
    pub fn universal() -> Self {
        Self::simple(SelectorPart::universal())
    }

    /// Append a sequence behind the given combinator.
    pub fn combine(mut self, combinator: Combinator, part: SelectorPart) -> Self {
        self.combinators.push(combinator);
        self.parts.push(part);
        self
    }

    /// The rightmost (subject) sequence.
    pub fn subject(&self) -> Option<&SelectorPart> {
        self.parts.last()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                match &self.combinators[i - 1] {
                    Combinator::Descendant => write!(f, " ")?,
                    Combinator::Child => write!(f, " > ")?,
                    Combinator::AdjacentSibling => write!(f, " + ")?,
                    Combinator::GeneralSibling => write!(f, " ~ ")?,
                }
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

/// Combinator between simple-selector sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Whitespace: matches any descendant.
    Descendant,
    /// `>`: matches a direct child only.
    Child,
    /// `+`: matches the immediately following sibling.
    AdjacentSibling,
    /// `~`: matches any following sibling.
    GeneralSibling,
}

/// One simple-selector sequence (e.g. `svg|rect.Two[state=open]:not(.off)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SelectorPart {
    /// Type or universal selector, with its namespace prefix.
    pub type_selector: Option<TypeSelector>,
    /// ID selector (`#id`).
    pub id: Option<String>,
    /// Class selectors (`.class`).
    pub classes: Vec<String>,
    /// Attribute predicates (`[name=value]`).
    pub attributes: Vec<AttributeSelector>,
    /// Pseudo-classes (`:nth-child(..)`, `:not(..)`).
    pub pseudo_classes: Vec<PseudoClass>,
}

impl SelectorPart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a type-only sequence in the default namespace.
    pub fn type_only(name: impl Into<String>) -> Self {
        Self {
            type_selector: Some(TypeSelector::Named {
                namespace: NamespacePrefix::Default,
                name: name.into(),
            }),
            ..Default::default()
        }
    }

    /// Create a universal sequence (`*`).
    pub fn universal() -> Self {
        Self {
            type_selector: Some(TypeSelector::Universal {
                namespace: NamespacePrefix::Default,
            }),
            ..Default::default()
        }
    }

    /// Create a class-only sequence.
    pub fn class_only(class: impl Into<String>) -> Self {
        Self {
            classes: vec![class.into()],
            ..Default::default()
        }
    }

    /// Create an ID-only sequence.
    pub fn id_only(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Add a class selector.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Add an attribute predicate.
    pub fn with_attribute(mut self, attribute: AttributeSelector) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add a pseudo-class.
    pub fn with_pseudo(mut self, pseudo: PseudoClass) -> Self {
        self.pseudo_classes.push(pseudo);
        self
    }

    /// True when no simple selector has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.type_selector.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
            && self.pseudo_classes.is_empty()
    }
}

impl fmt::Display for SelectorPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.type_selector {
            Some(TypeSelector::Universal { namespace }) => write!(f, "{namespace}*")?,
            Some(TypeSelector::Named { namespace, name }) => write!(f, "{namespace}{name}")?,
            None => {}
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        for attribute in &self.attributes {
            write!(f, "{attribute}")?;
        }
        for pseudo in &self.pseudo_classes {
            write!(f, ":{pseudo}")?;
        }
        Ok(())
    }
}

/// Type selector with its namespace constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSelector {
    /// `*` or `ns|*`.
    Universal { namespace: NamespacePrefix },
    /// `name` or `ns|name`.
    Named { namespace: NamespacePrefix, name: String },
}

/// Namespace constraint spelled before a `|` in a type selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NamespacePrefix {
    /// `*|name`: any namespace.
    Any,
    /// `|name`: only elements without a namespace.
    None,
    /// No prefix: the stylesheet's default namespace if one is declared,
    /// otherwise any namespace.
    Default,
    /// `prefix|name`: the namespace bound to `prefix` by `@namespace`.
    Named(String),
}

impl fmt::Display for NamespacePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespacePrefix::Any => write!(f, "*|"),
            NamespacePrefix::None => write!(f, "|"),
            NamespacePrefix::Default => Ok(()),
            NamespacePrefix::Named(prefix) => write!(f, "{prefix}|"),
        }
    }
}

/// Attribute predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: AttrMatch,
}

impl AttributeSelector {
    pub fn new(name: impl Into<String>, matcher: AttrMatch) -> Self {
        Self {
            name: name.into(),
            matcher,
        }
    }

    /// `[name]`.
    pub fn exists(name: impl Into<String>) -> Self {
        Self::new(name, AttrMatch::Exists)
    }

    /// `[name=value]`.
    pub fn equals(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, AttrMatch::Equals(value.into()))
    }
}

impl fmt::Display for AttributeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.name)?;
        let (op, value) = match &self.matcher {
            AttrMatch::Exists => return write!(f, "]"),
            AttrMatch::Equals(v) => ("=", v),
            AttrMatch::Includes(v) => ("~=", v),
            AttrMatch::DashMatch(v) => ("|=", v),
            AttrMatch::Prefix(v) => ("^=", v),
            AttrMatch::Suffix(v) => ("$=", v),
            AttrMatch::Substring(v) => ("*=", v),
        };
        if !value.is_empty() && value.chars().all(crate::tokenizer::is_name_char) {
            write!(f, "{op}{value}]")
        } else {
            write!(f, "{op}\"{value}\"]")
        }
    }
}

/// How an attribute predicate compares against the element's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrMatch {
    /// The attribute is present.
    Exists,
    /// `=`: exact match.
    Equals(String),
    /// `~=`: one of the whitespace-separated words.
    Includes(String),
    /// `|=`: exact match or a `value-` prefix.
    DashMatch(String),
    /// `^=`: starts with.
    Prefix(String),
    /// `$=`: ends with.
    Suffix(String),
    /// `*=`: contains.
    Substring(String),
}

/// Pseudo-class selectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PseudoClass {
    /// `:first-child`.
    FirstChild,
    /// `:last-child`.
    LastChild,
    /// `:only-child`.
    OnlyChild,
    /// `:empty` - has no child elements.
    Empty,
    /// `:nth-child(An+B)`.
    NthChild(NthExpr),
    /// `:not(selector)` - negation of a single simple-selector sequence.
    Not(Box<SelectorPart>),
}

impl fmt::Display for PseudoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PseudoClass::FirstChild => write!(f, "first-child"),
            PseudoClass::LastChild => write!(f, "last-child"),
            PseudoClass::OnlyChild => write!(f, "only-child"),
            PseudoClass::Empty => write!(f, "empty"),
            PseudoClass::NthChild(expr) => write!(f, "nth-child({expr})"),
            PseudoClass::Not(inner) => write!(f, "not({inner})"),
        }
    }
}

/// Expression for `:nth-child` (`An+B`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NthExpr {
    /// Coefficient (A in An+B).
    pub a: i32,
    /// Offset (B in An+B).
    pub b: i32,
}

impl NthExpr {
    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    /// `:nth-child(odd)` = 2n+1.
    pub fn odd() -> Self {
        Self { a: 2, b: 1 }
    }

    /// `:nth-child(even)` = 2n.
    pub fn even() -> Self {
        Self { a: 2, b: 0 }
    }

    /// Check whether a 1-based child position satisfies `p = A*n + B` for
    /// some integer `n >= 0`.
    pub fn matches(&self, position: usize) -> bool {
        let p = position as i64;
        let a = self.a as i64;
        let b = self.b as i64;
        if a == 0 {
            return p == b;
        }
        let diff = p - b;
        diff % a == 0 && diff / a >= 0
    }
}

impl fmt::Display for NthExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.a, self.b) {
            (2, 1) => write!(f, "odd"),
            (2, 0) => write!(f, "even"),
            (0, b) => write!(f, "{b}"),
            (a, 0) => write!(f, "{a}n"),
            (a, b) if b > 0 => write!(f, "{a}n+{b}"),
            (a, b) => write!(f, "{a}n{b}"),
        }
    }
}
