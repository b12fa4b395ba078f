//! Stylesheet pretty-printing.
//!
//! Round-trips parsed stylesheets back to text with normalized whitespace.
//! The compact form is the normal form: printing already-normalized input
//! reproduces it exactly, so printing stabilizes after one pass.

use crate::rules::{AtRule, Rule, StyleRule, Stylesheet};
use crate::token::Token;

/// Parse `css` and reprint it in compact normalized form.
///
/// Parse errors are ignored here; whatever rules survived recovery are
/// printed.
pub fn print(css: &str) -> String {
    let (sheet, _errors) = crate::parser::parse_stylesheet(css);
    print_stylesheet(&sheet)
}

/// Parse `css` and reprint it in block form with tab-indented declarations.
pub fn print_indented(css: &str) -> String {
    let (sheet, _errors) = crate::parser::parse_stylesheet(css);
    print_stylesheet_indented(&sheet)
}

/// Print a stylesheet in compact normalized form.
pub fn print_stylesheet(sheet: &Stylesheet) -> String {
    let rules: Vec<String> = sheet.rules.iter().map(|r| print_rule(r, false)).collect();
    rules.join("\n")
}

/// Print a stylesheet in block form with tab-indented declarations.
pub fn print_stylesheet_indented(sheet: &Stylesheet) -> String {
    let rules: Vec<String> = sheet.rules.iter().map(|r| print_rule(r, true)).collect();
    rules.join("\n")
}

fn print_rule(rule: &Rule, indented: bool) -> String {
    match rule {
        Rule::Style(rule) => print_style_rule(rule, indented),
        Rule::At(rule) => print_at_rule(rule),
    }
}

fn print_style_rule(rule: &StyleRule, indented: bool) -> String {
    let mut out = String::new();
    out.push_str(&rule.selectors.to_string());
    if indented {
        out.push_str(" {\n");
        for declaration in &rule.declarations {
            out.push('\t');
            out.push_str(&declaration.property);
            out.push_str(": ");
            out.push_str(&serialize_terms(&declaration.terms));
            out.push_str(";\n");
        }
        out.push('}');
    } else {
        out.push_str(" { ");
        for declaration in &rule.declarations {
            out.push_str(&declaration.property);
            out.push_str(": ");
            out.push_str(&serialize_terms(&declaration.terms));
            out.push_str("; ");
        }
        out.push('}');
    }
    out
}

fn print_at_rule(rule: &AtRule) -> String {
    let mut out = String::new();
    out.push('@');
    out.push_str(&rule.name);
    if !rule.prelude.is_empty() {
        out.push(' ');
        out.push_str(&serialize_terms(&rule.prelude));
    }
    match &rule.block {
        Some(block) if block.is_empty() => out.push_str(" { }"),
        Some(block) => {
            out.push_str(" { ");
            out.push_str(&serialize_terms(block));
            out.push_str(" }");
        }
        None => out.push(';'),
    }
    out
}

/// Serialize a token run with whitespace runs collapsed to single spaces.
pub fn serialize_terms(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    for token in tokens {
        if token.is_whitespace() {
            if !out.is_empty() {
                pending_space = true;
            }
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push_str(&token.to_string());
    }
    out
}
