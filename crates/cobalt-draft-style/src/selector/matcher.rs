//! Selector matching over the element-tree capability.
//!
//! Evaluation is right-to-left with backtracking: the subject sequence is
//! tested against the candidate element first, then combinators walk
//! leftward through ancestors and preceding siblings.

use crate::model::SelectorModel;
use crate::rules::Stylesheet;
use crate::selector::{
    AttrMatch, Combinator, NamespacePrefix, PseudoClass, Selector, SelectorGroup, SelectorPart,
    Specificity, TypeSelector,
};

/// Stateless matching engine bound to a model and, optionally, a
/// stylesheet's namespace declarations.
pub struct SelectorMatcher<'a, M: SelectorModel> {
    model: &'a M,
    namespaces: Option<&'a Stylesheet>,
}

impl<'a, M: SelectorModel> SelectorMatcher<'a, M> {
    /// Create a matcher with no namespace declarations in scope; unprefixed
    /// type selectors then match any namespace.
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            namespaces: None,
        }
    }

    /// Create a matcher that resolves namespace prefixes against the
    /// stylesheet's `@namespace` declarations.
    pub fn with_namespaces(model: &'a M, stylesheet: &'a Stylesheet) -> Self {
        Self {
            model,
            namespaces: Some(stylesheet),
        }
    }

    /// Whether any alternative in the group matches the element.
    pub fn matches(&self, group: &SelectorGroup, element: &M::Element) -> bool {
        group
            .selectors
            .iter()
            .any(|selector| self.matches_selector(selector, element))
    }

    /// The matching alternative with the highest specificity, for cascade
    /// and specificity reporting; ties resolve to the first in source order.
    pub fn match_selector<'g>(
        &self,
        group: &'g SelectorGroup,
        element: &M::Element,
    ) -> Option<&'g Selector> {
        group
            .selectors
            .iter()
            .filter(|selector| self.matches_selector(selector, element))
            .max_by_key(|selector| Specificity::of_selector(selector))
    }

    /// Whether a single selector matches the element.
    pub fn matches_selector(&self, selector: &Selector, element: &M::Element) -> bool {
        if selector.parts.is_empty() {
            return false;
        }
        self.match_from(selector, selector.parts.len() - 1, element)
    }

    fn match_from(&self, selector: &Selector, index: usize, element: &M::Element) -> bool {
        if !self.part_matches(&selector.parts[index], element) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match selector.combinators[index - 1] {
            Combinator::Child => match self.model.parent(element) {
                Some(parent) => self.match_from(selector, index - 1, &parent),
                None => false,
            },
            Combinator::Descendant => {
                let mut cursor = self.model.parent(element);
                while let Some(ancestor) = cursor {
                    if self.match_from(selector, index - 1, &ancestor) {
                        return true;
                    }
                    cursor = self.model.parent(&ancestor);
                }
                false
            }
            Combinator::AdjacentSibling => match self.preceding_siblings(element).last() {
                Some(previous) => self.match_from(selector, index - 1, previous),
                None => false,
            },
            Combinator::GeneralSibling => self
                .preceding_siblings(element)
                .iter()
                .rev()
                .any(|sibling| self.match_from(selector, index - 1, sibling)),
        }
    }

    /// Whether one simple-selector sequence matches the element.
    pub fn part_matches(&self, part: &SelectorPart, element: &M::Element) -> bool {
        if let Some(type_selector) = &part.type_selector
            && !self.type_matches(type_selector, element)
        {
            return false;
        }
        if let Some(id) = &part.id
            && self.model.id(element).as_deref() != Some(id.as_str())
        {
            return false;
        }
        for class in &part.classes {
            if !self.model.has_class(element, class) {
                return false;
            }
        }
        for attribute in &part.attributes {
            let value = self.model.attribute(element, &attribute.name);
            if !attr_matches(&attribute.matcher, value.as_deref()) {
                return false;
            }
        }
        for pseudo in &part.pseudo_classes {
            if !self.pseudo_matches(pseudo, element) {
                return false;
            }
        }
        true
    }

    fn type_matches(&self, type_selector: &TypeSelector, element: &M::Element) -> bool {
        match type_selector {
            TypeSelector::Universal { namespace } => self.namespace_matches(namespace, element),
            TypeSelector::Named { namespace, name } => {
                self.model.tag_name(element) == *name && self.namespace_matches(namespace, element)
            }
        }
    }

    fn namespace_matches(&self, prefix: &NamespacePrefix, element: &M::Element) -> bool {
        match prefix {
            NamespacePrefix::Any => true,
            NamespacePrefix::None => self.model.namespace_uri(element).is_none(),
            NamespacePrefix::Default => {
                match self.namespaces.and_then(Stylesheet::default_namespace) {
                    // no default declared: unprefixed selectors are
                    // namespace-agnostic
                    None => true,
                    Some(uri) => self.model.namespace_uri(element).as_deref() == Some(uri),
                }
            }
            NamespacePrefix::Named(prefix) => {
                match self.namespaces.and_then(|s| s.namespace_uri(prefix)) {
                    Some(uri) => self.model.namespace_uri(element).as_deref() == Some(uri),
                    // unbound prefixes match nothing
                    None => false,
                }
            }
        }
    }

    fn pseudo_matches(&self, pseudo: &PseudoClass, element: &M::Element) -> bool {
        match pseudo {
            PseudoClass::FirstChild => self.model.child_index(element) == Some(0),
            PseudoClass::LastChild => match (self.child_position(element), self.sibling_count(element)) {
                (Some(position), Some(count)) => position == count,
                _ => false,
            },
            PseudoClass::OnlyChild => {
                self.model.child_index(element) == Some(0) && self.sibling_count(element) == Some(1)
            }
            PseudoClass::Empty => self.model.children(element).is_empty(),
            PseudoClass::NthChild(expr) => match self.child_position(element) {
                Some(position) => expr.matches(position),
                None => false,
            },
            PseudoClass::Not(inner) => !self.part_matches(inner, element),
        }
    }

    /// 1-based position among the parent's children.
    fn child_position(&self, element: &M::Element) -> Option<usize> {
        self.model.child_index(element).map(|index| index + 1)
    }

    fn sibling_count(&self, element: &M::Element) -> Option<usize> {
        let parent = self.model.parent(element)?;
        Some(self.model.children(&parent).len())
    }

    fn preceding_siblings(&self, element: &M::Element) -> Vec<M::Element> {
        let Some(parent) = self.model.parent(element) else {
            return Vec::new();
        };
        let Some(index) = self.model.child_index(element) else {
            return Vec::new();
        };
        let mut siblings = self.model.children(&parent);
        siblings.truncate(index);
        siblings
    }
}

fn attr_matches(matcher: &AttrMatch, value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    match matcher {
        AttrMatch::Exists => true,
        AttrMatch::Equals(expected) => value == expected,
        AttrMatch::Includes(word) => {
            !word.is_empty() && value.split_whitespace().any(|w| w == word)
        }
        AttrMatch::DashMatch(expected) => {
            value == expected
                || (value.starts_with(expected) && value[expected.len()..].starts_with('-'))
        }
        AttrMatch::Prefix(prefix) => !prefix.is_empty() && value.starts_with(prefix),
        AttrMatch::Suffix(suffix) => !suffix.is_empty() && value.ends_with(suffix),
        AttrMatch::Substring(needle) => !needle.is_empty() && value.contains(needle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock::Doc;

    fn group(css: &str) -> SelectorGroup {
        let (sheet, errors) = Stylesheet::parse(&format!("{css} {{}}"));
        assert!(errors.is_empty(), "bad selector {css}: {errors:?}");
        sheet.style_rules().next().unwrap().selectors.clone()
    }

    /// <xml><b/><a/><b class="x"/><c/><b/></xml>
    fn sibling_doc() -> (Doc, Vec<usize>) {
        let mut doc = Doc::with_root("xml");
        let b1 = doc.append(0, "b");
        let a = doc.append(0, "a");
        let b2 = doc.append(0, "b");
        doc.set(b2, "class", "x");
        let c = doc.append(0, "c");
        let b3 = doc.append(0, "b");
        (doc, vec![b1, a, b2, c, b3])
    }

    #[test]
    fn type_and_universal() {
        let (doc, nodes) = sibling_doc();
        let matcher = SelectorMatcher::new(&doc);
        assert!(matcher.matches(&group("b"), &nodes[0]));
        assert!(!matcher.matches(&group("a"), &nodes[0]));
        assert!(matcher.matches(&group("*"), &nodes[3]));
    }

    #[test]
    fn group_matches_any_alternative() {
        let (doc, nodes) = sibling_doc();
        let matcher = SelectorMatcher::new(&doc);
        assert!(matcher.matches(&group("a, c"), &nodes[3]));
        assert!(!matcher.matches(&group("a, c"), &nodes[0]));
    }

    #[test]
    fn general_sibling_combinator() {
        let (doc, nodes) = sibling_doc();
        let matcher = SelectorMatcher::new(&doc);
        let selector = group("a~b");
        // every <b> following the <a> as a sibling, not necessarily adjacent
        assert!(!matcher.matches(&selector, &nodes[0]));
        assert!(matcher.matches(&selector, &nodes[2]));
        assert!(matcher.matches(&selector, &nodes[4]));
    }

    #[test]
    fn adjacent_sibling_combinator() {
        let (doc, nodes) = sibling_doc();
        let matcher = SelectorMatcher::new(&doc);
        let selector = group("a + b");
        assert!(matcher.matches(&selector, &nodes[2]));
        assert!(!matcher.matches(&selector, &nodes[4]));
        assert!(!matcher.matches(&selector, &nodes[0]));
    }

    #[test]
    fn child_and_descendant_combinators() {
        let mut doc = Doc::with_root("root");
        let section = doc.append(0, "section");
        let list = doc.append(section, "list");
        let item = doc.append(list, "item");

        let matcher = SelectorMatcher::new(&doc);
        assert!(matcher.matches(&group("list > item"), &item));
        assert!(!matcher.matches(&group("section > item"), &item));
        assert!(matcher.matches(&group("section item"), &item));
        assert!(matcher.matches(&group("root item"), &item));
        assert!(!matcher.matches(&group("nope item"), &item));
    }

    #[test]
    fn descendant_backtracking() {
        // root > a > a > b: "root a b" must match even though the first
        // ancestor `a` the walk meets is not the one under root
        let mut doc = Doc::with_root("root");
        let outer = doc.append(0, "a");
        let inner = doc.append(outer, "a");
        let b = doc.append(inner, "b");
        let matcher = SelectorMatcher::new(&doc);
        assert!(matcher.matches(&group("root a b"), &b));
        assert!(matcher.matches(&group("a a b"), &b));
        assert!(!matcher.matches(&group("b a b"), &b));
    }

    #[test]
    fn id_class_and_attributes() {
        let mut doc = Doc::with_root("xml");
        let node = doc.append(0, "shape");
        doc.set(node, "id", "s1");
        doc.set(node, "class", "big round");
        doc.set(node, "state", "open-modal");

        let matcher = SelectorMatcher::new(&doc);
        assert!(matcher.matches(&group("#s1"), &node));
        assert!(!matcher.matches(&group("#s2"), &node));
        assert!(matcher.matches(&group(".big.round"), &node));
        assert!(!matcher.matches(&group(".big.square"), &node));
        assert!(matcher.matches(&group("[state]"), &node));
        assert!(matcher.matches(&group("[state=open-modal]"), &node));
        assert!(matcher.matches(&group("[class~=round]"), &node));
        assert!(matcher.matches(&group("[state|=open]"), &node));
        assert!(matcher.matches(&group("[state^=open]"), &node));
        assert!(matcher.matches(&group("[state$=modal]"), &node));
        assert!(matcher.matches(&group("[state*=n-m]"), &node));
        assert!(!matcher.matches(&group("[missing]"), &node));
    }

    #[test]
    fn not_negates_a_sequence() {
        let (doc, nodes) = sibling_doc();
        let matcher = SelectorMatcher::new(&doc);
        assert!(matcher.matches(&group("b:not(.x)"), &nodes[0]));
        assert!(!matcher.matches(&group("b:not(.x)"), &nodes[2]));
        assert!(matcher.matches(&group(":not(a)"), &nodes[0]));
        assert!(!matcher.matches(&group(":not(a)"), &nodes[1]));
    }

    #[test]
    fn nth_child_positions() {
        let (doc, nodes) = sibling_doc();
        let matcher = SelectorMatcher::new(&doc);
        // positions are 1-based: nodes[1] is position 2
        assert!(matcher.matches(&group(":nth-child(2n+0)"), &nodes[1]));
        assert!(matcher.matches(&group(":nth-child(even)"), &nodes[1]));
        assert!(!matcher.matches(&group(":nth-child(even)"), &nodes[0]));
        assert!(matcher.matches(&group(":nth-child(0n+5)"), &nodes[4]));
        assert!(!matcher.matches(&group(":nth-child(0n+5)"), &nodes[3]));
        assert!(matcher.matches(&group(":nth-child(5)"), &nodes[4]));
    }

    #[test]
    fn structural_pseudo_classes() {
        let (doc, nodes) = sibling_doc();
        let matcher = SelectorMatcher::new(&doc);
        assert!(matcher.matches(&group("b:first-child"), &nodes[0]));
        assert!(!matcher.matches(&group("b:first-child"), &nodes[2]));
        assert!(matcher.matches(&group("b:last-child"), &nodes[4]));
        assert!(!matcher.matches(&group("b:last-child"), &nodes[0]));
        assert!(matcher.matches(&group("b:empty"), &nodes[0]));
        assert!(!matcher.matches(&group("xml:empty"), &0));
        assert!(!matcher.matches(&group("b:only-child"), &nodes[0]));
    }

    #[test]
    fn namespace_matching() {
        const SVG: &str = "http://www.w3.org/2000/svg";
        let mut doc = Doc::with_root("xml");
        let plain = doc.append(0, "rect");
        let svg = doc.append_ns(0, "rect", Some(SVG));

        let (sheet, errors) = Stylesheet::parse(&format!(
            "@namespace svg url(\"{SVG}\");\nsvg|rect {{}}"
        ));
        assert!(errors.is_empty());
        let matcher = SelectorMatcher::with_namespaces(&doc, &sheet);

        let bound = sheet.style_rules().next().unwrap().selectors.clone();
        assert!(matcher.matches(&bound, &svg));
        assert!(!matcher.matches(&bound, &plain));

        assert!(matcher.matches(&group("*|rect"), &svg));
        assert!(matcher.matches(&group("*|rect"), &plain));
        assert!(matcher.matches(&group("|rect"), &plain));
        assert!(!matcher.matches(&group("|rect"), &svg));
        // no default namespace declared: unprefixed matches both
        assert!(matcher.matches(&group("rect"), &svg));
        assert!(matcher.matches(&group("rect"), &plain));
    }

    #[test]
    fn default_namespace_restricts_unprefixed() {
        const SVG: &str = "http://www.w3.org/2000/svg";
        let mut doc = Doc::with_root("xml");
        let plain = doc.append(0, "rect");
        let svg = doc.append_ns(0, "rect", Some(SVG));

        let (sheet, errors) =
            Stylesheet::parse(&format!("@namespace url(\"{SVG}\");\nrect {{}}"));
        assert!(errors.is_empty());
        let matcher = SelectorMatcher::with_namespaces(&doc, &sheet);
        let selector = sheet.style_rules().next().unwrap().selectors.clone();
        assert!(matcher.matches(&selector, &svg));
        assert!(!matcher.matches(&selector, &plain));
    }

    #[test]
    fn match_selector_reports_highest_specificity() {
        let mut doc = Doc::with_root("xml");
        let node = doc.append(0, "TubeShape");
        doc.set(node, "class", "Two");

        let matcher = SelectorMatcher::new(&doc);
        let alternatives = group("TubeShape, TubeShape.Two, nomatch");
        let matched = matcher.match_selector(&alternatives, &node).unwrap();
        assert_eq!(Specificity::of_selector(matched), Specificity(11));

        assert!(matcher.match_selector(&group("nomatch"), &node).is_none());
    }
}
