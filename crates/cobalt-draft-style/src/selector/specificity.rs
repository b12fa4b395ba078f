//! Selector specificity calculation.

use super::{PseudoClass, Selector, SelectorPart, TypeSelector};

/// Comparable cascade weight of a selector.
///
/// Computed as `100 * ids + 10 * (classes + attributes + pseudo-classes)
/// + 1 * types`; higher values override lower ones when the cascade is
/// resolved. `:not()` contributes the counts of its argument, not itself;
/// the universal selector contributes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Specificity(pub i32);

impl Specificity {
    /// Zero specificity (universal selector).
    pub const ZERO: Self = Self(0);

    /// Calculate the specificity of a selector.
    pub fn of_selector(selector: &Selector) -> Self {
        let mut counts = Counts::default();
        for part in &selector.parts {
            counts.add_part(part);
        }
        counts.into_specificity()
    }

    /// Calculate the specificity of a single sequence.
    pub fn of_part(part: &SelectorPart) -> Self {
        let mut counts = Counts::default();
        counts.add_part(part);
        counts.into_specificity()
    }

    /// The raw integer weight.
    pub fn value(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for Specificity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct Counts {
    ids: i32,
    classes: i32,
    types: i32,
}

impl Counts {
    fn add_part(&mut self, part: &SelectorPart) {
        if part.id.is_some() {
            self.ids += 1;
        }
        self.classes += part.classes.len() as i32;
        self.classes += part.attributes.len() as i32;
        for pseudo in &part.pseudo_classes {
            match pseudo {
                // :not() takes the specificity of its argument
                PseudoClass::Not(inner) => self.add_part(inner),
                _ => self.classes += 1,
            }
        }
        if let Some(TypeSelector::Named { .. }) = &part.type_selector {
            self.types += 1;
        }
    }

    fn into_specificity(self) -> Specificity {
        Specificity(100 * self.ids + 10 * self.classes + self.types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::{AttributeSelector, Combinator, NthExpr};

    #[test]
    fn specificity_calculation() {
        // * -> 0
        assert_eq!(Specificity::of_selector(&Selector::universal()), Specificity(0));

        // TubeShape -> 1
        let sel = Selector::type_selector("TubeShape");
        assert_eq!(Specificity::of_selector(&sel), Specificity(1));

        // TubeShape.Two -> 11
        let sel = Selector::simple(SelectorPart::type_only("TubeShape").with_class("Two"));
        assert_eq!(Specificity::of_selector(&sel), Specificity(11));

        // #submit -> 100
        let sel = Selector::simple(SelectorPart::id_only("submit"));
        assert_eq!(Specificity::of_selector(&sel), Specificity(100));

        // Button[state=open]:nth-child(2) -> 21
        let sel = Selector::simple(
            SelectorPart::type_only("Button")
                .with_attribute(AttributeSelector::equals("state", "open"))
                .with_pseudo(PseudoClass::NthChild(NthExpr::new(0, 2))),
        );
        assert_eq!(Specificity::of_selector(&sel), Specificity(21));
    }

    #[test]
    fn chains_accumulate() {
        let sel = Selector::type_selector("a")
            .combine(Combinator::Descendant, SelectorPart::type_only("b"))
            .combine(Combinator::Child, SelectorPart::class_only("c"));
        assert_eq!(Specificity::of_selector(&sel), Specificity(12));
    }

    #[test]
    fn not_contributes_inner_counts() {
        // :not(.primary) -> 10
        let sel = Selector::simple(
            SelectorPart::new()
                .with_pseudo(PseudoClass::Not(Box::new(SelectorPart::class_only("primary")))),
        );
        assert_eq!(Specificity::of_selector(&sel), Specificity(10));

        // :not(a) -> 1
        let sel = Selector::simple(
            SelectorPart::new()
                .with_pseudo(PseudoClass::Not(Box::new(SelectorPart::type_only("a")))),
        );
        assert_eq!(Specificity::of_selector(&sel), Specificity(1));
    }

    #[test]
    fn ordering() {
        assert!(Specificity(100) > Specificity(99));
        assert!(Specificity(11) > Specificity(10));
        assert!(Specificity(1) > Specificity::ZERO);
    }
}
