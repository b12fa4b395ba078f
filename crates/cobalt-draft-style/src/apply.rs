//! Stylesheet application to element trees.
//!
//! The engine owns a set of stylesheets tagged with their origin, resolves
//! the cascade per element (origin, then specificity, then source order),
//! expands declaration values through the function processor, and writes
//! the results back through the writable model capability.

use crate::error::Error;
use crate::functions::FunctionProcessor;
use crate::model::WritableSelectorModel;
use crate::rules::{Declaration, StyleOrigin, Stylesheet};
use crate::selector::{SelectorMatcher, Specificity};
use crate::variables::CustomProperties;

/// Applies stylesheets to elements.
#[derive(Debug, Default)]
pub struct StyleEngine {
    stylesheets: Vec<(StyleOrigin, Stylesheet)>,
    /// Externally injected custom properties; they override declarations
    /// collected from the stylesheets.
    overrides: CustomProperties,
}

impl StyleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stylesheet under the given origin.
    pub fn add_stylesheet(&mut self, origin: StyleOrigin, stylesheet: Stylesheet) {
        self.stylesheets.push((origin, stylesheet));
    }

    /// Inject a custom property from CSS value text, overriding stylesheet
    /// declarations of the same name.
    pub fn set_custom_property(&mut self, name: impl AsRef<str>, value: &str) {
        self.overrides.set_text(name, value);
    }

    /// The custom-property table the next application will see.
    pub fn custom_properties(&self) -> CustomProperties {
        let mut properties = CustomProperties::new();
        let mut origins: Vec<&(StyleOrigin, Stylesheet)> = self.stylesheets.iter().collect();
        origins.sort_by_key(|(origin, _)| *origin);
        for (_, sheet) in origins {
            properties.add_stylesheet(sheet);
        }
        for (name, terms) in self.overrides.iter() {
            properties.set(name, terms.to_vec());
        }
        properties
    }

    /// Apply every matching declaration to one element.
    ///
    /// Declarations are applied in ascending cascade order so the last
    /// write wins: origin first, then specificity of the matched selector
    /// alternative, then rule order, then declaration order. Custom
    /// property declarations feed `var()` and are never written to the
    /// element. A declaration whose value fails to expand is dropped and
    /// reported; everything else is unaffected.
    pub fn apply_to<M: WritableSelectorModel>(
        &self,
        model: &mut M,
        element: &M::Element,
    ) -> Vec<Error> {
        let mut errors = Vec::new();
        let properties = self.custom_properties();
        let mut resolved: Vec<(String, String)> = Vec::new();
        {
            let model_ref: &M = model;
            let processor = FunctionProcessor::new(model_ref, &properties);
            let mut matched: Vec<(StyleOrigin, Specificity, (usize, usize, usize), &Declaration)> =
                Vec::new();
            for (sheet_order, (origin, sheet)) in self.stylesheets.iter().enumerate() {
                let matcher = SelectorMatcher::with_namespaces(model_ref, sheet);
                for (rule_order, rule) in sheet.style_rules().enumerate() {
                    let Some(selector) = matcher.match_selector(&rule.selectors, element) else {
                        continue;
                    };
                    let specificity = Specificity::of_selector(selector);
                    for (decl_order, declaration) in rule.declarations.iter().enumerate() {
                        matched.push((
                            *origin,
                            specificity,
                            (sheet_order, rule_order, decl_order),
                            declaration,
                        ));
                    }
                }
            }
            matched.sort_by_key(|(origin, specificity, order, _)| {
                (*origin, *specificity, *order)
            });
            for (_, _, _, declaration) in matched {
                if declaration.is_custom_property() {
                    continue;
                }
                match processor.process(element, &declaration.terms) {
                    Ok(tokens) => {
                        let value = value_text(&tokens);
                        match resolved.iter().position(|(name, _)| *name == declaration.property) {
                            Some(i) => resolved[i].1 = value,
                            None => resolved.push((declaration.property.clone(), value)),
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            property = %declaration.property,
                            "dropped declaration: {err}"
                        );
                        errors.push(Error::Function(err));
                    }
                }
            }
        }
        for (name, value) in resolved {
            model.set_attribute(element, &name, &value);
        }
        errors
    }

    /// Apply stylesheets to an element and all of its descendants.
    pub fn apply_tree<M: WritableSelectorModel>(
        &self,
        model: &mut M,
        root: &M::Element,
    ) -> Vec<Error> {
        let mut errors = self.apply_to(model, root);
        let children = model.children(root);
        for child in children {
            errors.extend(self.apply_tree(model, &child));
        }
        errors
    }
}

/// Attribute text for an expanded value: a lone string token contributes
/// its content unquoted, anything else its normalized serialization.
fn value_text(tokens: &[crate::token::Token]) -> String {
    use crate::token::TokenKind;
    let significant: Vec<&crate::token::Token> =
        tokens.iter().filter(|t| !t.is_whitespace()).collect();
    if let [token] = significant.as_slice()
        && let TokenKind::QuotedString(value) = &token.kind
    {
        return value.clone();
    }
    crate::printer::serialize_terms(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock::Doc;

    fn sheet(css: &str) -> Stylesheet {
        let (sheet, errors) = Stylesheet::parse(css);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        sheet
    }

    fn author_engine(css: &str) -> StyleEngine {
        let mut engine = StyleEngine::new();
        engine.add_stylesheet(StyleOrigin::Author, sheet(css));
        engine
    }

    #[test]
    fn general_sibling_end_to_end() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        // <xml><b/><a/><b/><c/><b/></xml>
        let mut doc = Doc::with_root("xml");
        let b1 = doc.append(0, "b");
        let _a = doc.append(0, "a");
        let b2 = doc.append(0, "b");
        let _c = doc.append(0, "c");
        let b3 = doc.append(0, "b");

        let engine = author_engine("a~b {x:y}");
        let errors = engine.apply_tree(&mut doc, &0);
        assert!(errors.is_empty());

        // every <b> following the <a> as a sibling gets x="y"
        assert_eq!(doc.attr(b1, "x"), None);
        assert_eq!(doc.attr(b2, "x"), Some("y"));
        assert_eq!(doc.attr(b3, "x"), Some("y"));
    }

    #[test]
    fn higher_specificity_wins_over_later_order() {
        let mut doc = Doc::with_root("xml");
        let shape = doc.append(0, "TubeShape");
        doc.set(shape, "class", "Two");

        let engine = author_engine("TubeShape.Two { fill: blue; }\nTubeShape { fill: red; }");
        engine.apply_to(&mut doc, &shape);
        assert_eq!(doc.attr(shape, "fill"), Some("blue"));
    }

    #[test]
    fn later_rule_wins_at_equal_specificity() {
        let mut doc = Doc::with_root("xml");
        let shape = doc.append(0, "TubeShape");

        let engine = author_engine("TubeShape { fill: red; }\nTubeShape { fill: green; }");
        engine.apply_to(&mut doc, &shape);
        assert_eq!(doc.attr(shape, "fill"), Some("green"));
    }

    #[test]
    fn author_origin_wins_over_user_agent() {
        let mut doc = Doc::with_root("xml");
        let shape = doc.append(0, "TubeShape");

        let mut engine = StyleEngine::new();
        engine.add_stylesheet(StyleOrigin::Author, sheet("TubeShape { fill: author; }"));
        engine.add_stylesheet(StyleOrigin::UserAgent, sheet("TubeShape.x, TubeShape { fill: agent; }"));
        engine.apply_to(&mut doc, &shape);
        assert_eq!(doc.attr(shape, "fill"), Some("author"));
    }

    #[test]
    fn custom_properties_expand_but_are_not_applied() {
        let mut doc = Doc::with_root("xml");
        let shape = doc.append(0, "TubeShape");

        let engine = author_engine("* { --accent: #ff0000; }\nTubeShape { fill: var(--accent); }");
        engine.apply_to(&mut doc, &shape);
        assert_eq!(doc.attr(shape, "fill"), Some("#ff0000"));
        assert_eq!(doc.attr(shape, "--accent"), None);
    }

    #[test]
    fn injected_custom_properties_override_sheet_ones() {
        let mut doc = Doc::with_root("xml");
        let shape = doc.append(0, "TubeShape");

        let mut engine =
            author_engine("* { --accent: red; }\nTubeShape { fill: var(--accent); }");
        engine.set_custom_property("--accent", "green");
        engine.apply_to(&mut doc, &shape);
        assert_eq!(doc.attr(shape, "fill"), Some("green"));
    }

    #[test]
    fn failed_expansion_drops_only_that_declaration() {
        let mut doc = Doc::with_root("xml");
        let shape = doc.append(0, "TubeShape");

        let engine = author_engine("TubeShape { fill: var(--missing); stroke: black; }");
        let errors = engine.apply_to(&mut doc, &shape);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::Function(_)));
        assert_eq!(doc.attr(shape, "fill"), None);
        assert_eq!(doc.attr(shape, "stroke"), Some("black"));
    }

    #[test]
    fn string_values_are_written_unquoted() {
        let mut doc = Doc::with_root("xml");
        let shape = doc.append(0, "TubeShape");
        doc.set(shape, "label", "Tank");

        let engine = author_engine("TubeShape { title: concat(attr(label), \" #\", \"1\"); }");
        engine.apply_to(&mut doc, &shape);
        assert_eq!(doc.attr(shape, "title"), Some("Tank #1"));
    }

    #[test]
    fn namespaced_rules_apply_per_sheet() {
        const SVG: &str = "http://www.w3.org/2000/svg";
        let mut doc = Doc::with_root("xml");
        let plain = doc.append(0, "rect");
        let svg = doc.append_ns(0, "rect", Some(SVG));

        let engine = author_engine(&format!(
            "@namespace svg url(\"{SVG}\");\nsvg|rect {{ fill: green; }}"
        ));
        engine.apply_tree(&mut doc, &0);
        assert_eq!(doc.attr(svg, "fill"), Some("green"));
        assert_eq!(doc.attr(plain, "fill"), None);
    }
}
