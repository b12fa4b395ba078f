//! Declaration-value function expansion.

use std::collections::HashSet;

use regex::Regex;

use crate::error::FunctionError;
use crate::functions::calc;
use crate::model::SelectorModel;
use crate::token::{Token, TokenKind};
use crate::types::Color;
use crate::variables::{self, CustomProperties};

/// Hard ceiling on nested custom-property expansion.
///
/// Cycles are caught by the visited set; the depth ceiling bounds
/// degenerate non-cyclic chains. Mandatory, not an optimization: without
/// it a hostile stylesheet could otherwise only be stopped by stack
/// exhaustion.
pub const MAX_RECURSION_DEPTH: usize = 32;

/// Functions the processor expands, resolved by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleFunction {
    Var,
    Calc,
    Attr,
    Concat,
    Replace,
    Round,
    Ladder,
}

impl StyleFunction {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "var" => Some(Self::Var),
            "calc" => Some(Self::Calc),
            "attr" => Some(Self::Attr),
            "concat" => Some(Self::Concat),
            "replace" => Some(Self::Replace),
            "round" => Some(Self::Round),
            "ladder" => Some(Self::Ladder),
            _ => None,
        }
    }
}

/// Per-call expansion guard: recursion depth plus the set of custom
/// properties on the current expansion path.
#[derive(Debug, Default)]
struct Guard {
    depth: usize,
    visited: HashSet<String>,
}

/// Expands registered functions in declaration term lists against one
/// element of the tree.
///
/// Stateless between calls: each top-level [`process`](Self::process)
/// threads a fresh guard, so a processor may be reused across elements and
/// declarations.
pub struct FunctionProcessor<'a, M: SelectorModel> {
    model: &'a M,
    custom_properties: &'a CustomProperties,
}

impl<'a, M: SelectorModel> FunctionProcessor<'a, M> {
    pub fn new(model: &'a M, custom_properties: &'a CustomProperties) -> Self {
        Self {
            model,
            custom_properties,
        }
    }

    /// Expand `terms` for `element`.
    ///
    /// On success the output contains no registered function tokens; on
    /// failure nothing is emitted and the declaration must be dropped.
    /// Unregistered functions pass through unchanged, their argument tokens
    /// still processed.
    pub fn process(
        &self,
        element: &M::Element,
        terms: &[Token],
    ) -> Result<Vec<Token>, FunctionError> {
        let mut out = Vec::new();
        let mut guard = Guard::default();
        self.process_into(element, terms, &mut guard, &mut out)?;
        Ok(out)
    }

    fn process_into(
        &self,
        element: &M::Element,
        tokens: &[Token],
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        let mut index = 0;
        while index < tokens.len() {
            let token = &tokens[index];
            if let TokenKind::Function(name) = &token.kind
                && let Some(function) = StyleFunction::from_name(name)
            {
                let (args, next) = collect_arguments(tokens, index, name)?;
                self.expand(function, element, &args, token, guard, out)?;
                index = next;
                continue;
            }
            out.push(token.clone());
            index += 1;
        }
        Ok(())
    }

    fn expand(
        &self,
        function: StyleFunction,
        element: &M::Element,
        args: &[Vec<Token>],
        span: &Token,
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        match function {
            StyleFunction::Var => self.expand_var(element, args, span, guard, out),
            StyleFunction::Calc => self.expand_calc(element, args, span, guard, out),
            StyleFunction::Attr => self.expand_attr(element, args, span, guard, out),
            StyleFunction::Concat => self.expand_concat(element, args, span, guard, out),
            StyleFunction::Replace => self.expand_replace(element, args, span, guard, out),
            StyleFunction::Round => self.expand_round(element, args, span, guard, out),
            StyleFunction::Ladder => self.expand_ladder(element, args, guard, out),
        }
    }

    fn process_arg(
        &self,
        element: &M::Element,
        arg: &[Token],
        guard: &mut Guard,
    ) -> Result<Vec<Token>, FunctionError> {
        let mut out = Vec::new();
        self.process_into(element, arg, guard, &mut out)?;
        Ok(out)
    }

    /// Process `args` and emit them re-joined with commas (used for `var()`
    /// and `attr()` fallbacks, which may themselves contain commas).
    fn emit_joined(
        &self,
        element: &M::Element,
        args: &[Vec<Token>],
        span: &Token,
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                out.push(Token::new(TokenKind::Comma, span.start, span.end));
            }
            self.process_into(element, arg, guard, out)?;
        }
        Ok(())
    }

    fn expand_var(
        &self,
        element: &M::Element,
        args: &[Vec<Token>],
        span: &Token,
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        if args.is_empty() {
            return Err(FunctionError::Arity {
                function: "var",
                expected: "at least 1",
                found: 0,
            });
        }
        let name = match single_token(&args[0]) {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) if name.starts_with("--") => name.clone(),
            _ => {
                return Err(FunctionError::type_error(
                    "var",
                    "expected a custom property name",
                ));
            }
        };
        let key = variables::normalize(&name).to_string();
        match self.custom_properties.get(&key) {
            Some(terms) => {
                if guard.visited.contains(&key) {
                    return Err(FunctionError::CyclicVariable { name: key });
                }
                if guard.depth >= MAX_RECURSION_DEPTH {
                    return Err(FunctionError::RecursionLimit {
                        limit: MAX_RECURSION_DEPTH,
                    });
                }
                guard.visited.insert(key.clone());
                guard.depth += 1;
                let result = self.process_into(element, terms, guard, out);
                guard.depth -= 1;
                guard.visited.remove(&key);
                result
            }
            None if args.len() >= 2 => self.emit_joined(element, &args[1..], span, guard, out),
            None => Err(FunctionError::UnresolvedVariable { name: key }),
        }
    }

    fn expand_calc(
        &self,
        element: &M::Element,
        args: &[Vec<Token>],
        span: &Token,
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        if args.len() != 1 {
            return Err(FunctionError::Arity {
                function: "calc",
                expected: "1",
                found: args.len(),
            });
        }
        let body = self.process_arg(element, &args[0], guard)?;
        out.push(calc::evaluate(&body, (span.start, span.end))?);
        Ok(())
    }

    fn expand_attr(
        &self,
        element: &M::Element,
        args: &[Vec<Token>],
        span: &Token,
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        if args.is_empty() {
            return Err(FunctionError::Arity {
                function: "attr",
                expected: "at least 1",
                found: 0,
            });
        }
        let head: Vec<&Token> = args[0].iter().filter(|t| !t.is_whitespace()).collect();
        let (name, attr_type) = match head.as_slice() {
            [name] => (attr_name(name)?, AttrType::String),
            [name, type_token] => (attr_name(name)?, attr_type_of(type_token)?),
            _ => {
                return Err(FunctionError::type_error(
                    "attr",
                    "malformed attribute reference",
                ));
            }
        };
        match self.model.attribute(element, &name) {
            Some(raw) => {
                let kind = match attr_type {
                    AttrType::String => TokenKind::QuotedString(raw),
                    AttrType::Length => {
                        let (value, unit) = numeric_prefix(&name, &raw)?;
                        if unit.is_empty() {
                            TokenKind::Number {
                                has_sign: value < 0.0,
                                value,
                                int_value: calc::int_of(value),
                            }
                        } else {
                            TokenKind::Dimension {
                                has_sign: value < 0.0,
                                value,
                                int_value: calc::int_of(value),
                                unit,
                            }
                        }
                    }
                    AttrType::Percentage => {
                        let (value, _) = numeric_prefix(&name, &raw)?;
                        TokenKind::Percentage {
                            has_sign: value < 0.0,
                            value,
                            int_value: calc::int_of(value),
                        }
                    }
                    // unit reinterpretation: the magnitude is copied and the
                    // unit label swapped, no physical conversion
                    AttrType::Unit(unit) => {
                        let (value, _) = numeric_prefix(&name, &raw)?;
                        TokenKind::Dimension {
                            has_sign: value < 0.0,
                            value,
                            int_value: calc::int_of(value),
                            unit,
                        }
                    }
                };
                out.push(Token::new(kind, span.start, span.end));
                Ok(())
            }
            None if args.len() >= 2 => self.emit_joined(element, &args[1..], span, guard, out),
            None => {
                let kind = match attr_type {
                    AttrType::String => {
                        return Err(FunctionError::MissingAttribute { name });
                    }
                    AttrType::Length => TokenKind::Number {
                        has_sign: false,
                        value: 0.0,
                        int_value: Some(0),
                    },
                    AttrType::Percentage => TokenKind::Percentage {
                        has_sign: false,
                        value: 0.0,
                        int_value: Some(0),
                    },
                    AttrType::Unit(unit) => TokenKind::Dimension {
                        has_sign: false,
                        value: 0.0,
                        int_value: Some(0),
                        unit,
                    },
                };
                out.push(Token::new(kind, span.start, span.end));
                Ok(())
            }
        }
    }

    fn expand_concat(
        &self,
        element: &M::Element,
        args: &[Vec<Token>],
        span: &Token,
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        let mut value = String::new();
        for arg in args {
            let tokens = self.process_arg(element, arg, guard)?;
            value.push_str(&stringify(&tokens));
        }
        out.push(Token::new(
            TokenKind::QuotedString(value),
            span.start,
            span.end,
        ));
        Ok(())
    }

    fn expand_replace(
        &self,
        element: &M::Element,
        args: &[Vec<Token>],
        span: &Token,
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        match args.len() {
            1 => {
                let subject = stringify(&self.process_arg(element, &args[0], guard)?);
                out.push(Token::new(
                    TokenKind::QuotedString(subject),
                    span.start,
                    span.end,
                ));
                Ok(())
            }
            3 => {
                let subject = stringify(&self.process_arg(element, &args[0], guard)?);
                let pattern = stringify(&self.process_arg(element, &args[1], guard)?);
                let replacement = stringify(&self.process_arg(element, &args[2], guard)?);
                let regex = Regex::new(&pattern).map_err(|e| FunctionError::InvalidPattern {
                    message: e.to_string(),
                })?;
                let replaced = regex.replace_all(&subject, replacement.as_str()).into_owned();
                out.push(Token::new(
                    TokenKind::QuotedString(replaced),
                    span.start,
                    span.end,
                ));
                Ok(())
            }
            found => Err(FunctionError::Arity {
                function: "replace",
                expected: "1 or 3",
                found,
            }),
        }
    }

    fn expand_round(
        &self,
        element: &M::Element,
        args: &[Vec<Token>],
        span: &Token,
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        if args.len() != 1 {
            return Err(FunctionError::Arity {
                function: "round",
                expected: "1",
                found: args.len(),
            });
        }
        let tokens = self.process_arg(element, &args[0], guard)?;
        let Some(token) = single_token(&tokens) else {
            return Err(FunctionError::type_error(
                "round",
                "expected a single numeric value",
            ));
        };
        // half-up: the midpoint rounds toward positive infinity
        let rounded = |value: f64| (value + 0.5).floor();
        let kind = match &token.kind {
            TokenKind::Number { value, .. } => {
                let value = rounded(*value);
                TokenKind::Number {
                    has_sign: value < 0.0,
                    value,
                    int_value: calc::int_of(value),
                }
            }
            TokenKind::Percentage { value, .. } => {
                let value = rounded(*value);
                TokenKind::Percentage {
                    has_sign: value < 0.0,
                    value,
                    int_value: calc::int_of(value),
                }
            }
            TokenKind::Dimension { value, unit, .. } => {
                let value = rounded(*value);
                TokenKind::Dimension {
                    has_sign: value < 0.0,
                    value,
                    int_value: calc::int_of(value),
                    unit: unit.clone(),
                }
            }
            _ => {
                return Err(FunctionError::type_error(
                    "round",
                    format!("expected a numeric value, found '{token}'"),
                ));
            }
        };
        out.push(Token::new(kind, span.start, span.end));
        Ok(())
    }

    fn expand_ladder(
        &self,
        element: &M::Element,
        args: &[Vec<Token>],
        guard: &mut Guard,
        out: &mut Vec<Token>,
    ) -> Result<(), FunctionError> {
        if args.len() < 2 {
            return Err(FunctionError::Arity {
                function: "ladder",
                expected: "at least 2",
                found: args.len(),
            });
        }
        let reference = self.color_arg(element, &args[0], guard)?;
        let luminance = reference.luminance() as f64;

        struct Stop {
            threshold: f64,
            tokens: Vec<Token>,
        }
        let mut stops = Vec::new();
        for arg in &args[1..] {
            let mut tokens: Vec<Token> = self
                .process_arg(element, arg, guard)?
                .into_iter()
                .filter(|t| !t.is_whitespace())
                .collect();
            let Some(last) = tokens.pop() else {
                return Err(FunctionError::type_error("ladder", "empty color stop"));
            };
            let threshold = match last.kind {
                TokenKind::Number { value, .. } => value,
                TokenKind::Percentage { value, .. } => value / 100.0,
                _ => {
                    return Err(FunctionError::type_error(
                        "ladder",
                        "color stop must end with a number or percentage threshold",
                    ));
                }
            };
            if tokens.is_empty() {
                return Err(FunctionError::type_error(
                    "ladder",
                    "color stop is missing a color",
                ));
            }
            stops.push(Stop { threshold, tokens });
        }
        stops.sort_by(|a, b| {
            a.threshold
                .partial_cmp(&b.threshold)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        // the highest stop doubles as the else branch
        let chosen = stops
            .iter()
            .position(|stop| stop.threshold >= luminance)
            .unwrap_or(stops.len() - 1);
        out.extend(stops[chosen].tokens.iter().cloned());
        Ok(())
    }

    fn color_arg(
        &self,
        element: &M::Element,
        arg: &[Token],
        guard: &mut Guard,
    ) -> Result<Color, FunctionError> {
        let tokens = self.process_arg(element, arg, guard)?;
        let color = match single_token(&tokens).map(|t| &t.kind) {
            Some(TokenKind::Hash(hex)) => Color::from_hex(hex),
            Some(TokenKind::Ident(name)) => Color::named(name),
            Some(TokenKind::QuotedString(text)) => {
                Color::from_hex(text).or_else(|| Color::named(text))
            }
            _ => None,
        };
        color.ok_or_else(|| FunctionError::type_error("ladder", "expected a color"))
    }
}

enum AttrType {
    String,
    Length,
    Percentage,
    Unit(String),
}

fn attr_name(token: &Token) -> Result<String, FunctionError> {
    match &token.kind {
        TokenKind::Ident(name) => Ok(name.clone()),
        _ => Err(FunctionError::type_error("attr", "expected an attribute name")),
    }
}

fn attr_type_of(token: &Token) -> Result<AttrType, FunctionError> {
    match &token.kind {
        TokenKind::Ident(keyword) => match keyword.to_ascii_lowercase().as_str() {
            "string" => Ok(AttrType::String),
            "length" => Ok(AttrType::Length),
            unit => Ok(AttrType::Unit(unit.to_string())),
        },
        TokenKind::Delim('%') => Ok(AttrType::Percentage),
        _ => Err(FunctionError::type_error(
            "attr",
            "expected a type or unit keyword",
        )),
    }
}

/// Parse the numeric prefix of an attribute value; the remainder is its
/// unit label.
fn numeric_prefix(attribute: &str, raw: &str) -> Result<(f64, String), FunctionError> {
    let text = raw.trim();
    let mut end = 0;
    let bytes = text.as_bytes();
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let digits_start = end;
    while matches!(bytes.get(end), Some(c) if c.is_ascii_digit()) {
        end += 1;
    }
    if matches!(bytes.get(end), Some(b'.'))
        && matches!(bytes.get(end + 1), Some(c) if c.is_ascii_digit())
    {
        end += 1;
        while matches!(bytes.get(end), Some(c) if c.is_ascii_digit()) {
            end += 1;
        }
    }
    if end == digits_start {
        return Err(FunctionError::type_error(
            "attr",
            format!("attribute '{attribute}' is not numeric"),
        ));
    }
    let value: f64 = text[..end].parse().map_err(|_| {
        FunctionError::type_error("attr", format!("attribute '{attribute}' is not numeric"))
    })?;
    Ok((value, text[end..].trim().to_string()))
}

/// The single non-whitespace token of a list, if there is exactly one.
fn single_token(tokens: &[Token]) -> Option<&Token> {
    let mut significant = tokens.iter().filter(|t| !t.is_whitespace());
    let first = significant.next()?;
    match significant.next() {
        None => Some(first),
        Some(_) => None,
    }
}

/// Textual value of a token list: string tokens contribute their content,
/// whitespace a single space, everything else its canonical form.
fn stringify(tokens: &[Token]) -> String {
    let mut text = String::new();
    for token in tokens {
        match &token.kind {
            TokenKind::QuotedString(value) => text.push_str(value),
            TokenKind::Whitespace => text.push(' '),
            _ => text.push_str(&token.to_string()),
        }
    }
    text
}

/// Split the arguments of the function at `index` at top-level commas,
/// consuming through the matching `)`. Returns the trimmed argument lists
/// and the index just past the closing parenthesis.
fn collect_arguments(
    tokens: &[Token],
    index: usize,
    name: &str,
) -> Result<(Vec<Vec<Token>>, usize), FunctionError> {
    let mut args: Vec<Vec<Token>> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut had_comma = false;
    let mut depth = 0usize;
    let mut i = index + 1;
    loop {
        let Some(token) = tokens.get(i) else {
            return Err(FunctionError::Unterminated {
                function: name.to_string(),
            });
        };
        match &token.kind {
            TokenKind::Delim(')') if depth == 0 => {
                i += 1;
                break;
            }
            TokenKind::Comma if depth == 0 => {
                had_comma = true;
                args.push(std::mem::take(&mut current));
                i += 1;
            }
            kind => {
                match kind {
                    TokenKind::Function(_) | TokenKind::Delim('(') | TokenKind::Delim('[') => {
                        depth += 1;
                    }
                    TokenKind::Delim(')') | TokenKind::Delim(']') => {
                        depth = depth.saturating_sub(1);
                    }
                    _ => {}
                }
                current.push(token.clone());
                i += 1;
            }
        }
    }
    args.push(current);
    for arg in &mut args {
        while arg.first().is_some_and(Token::is_whitespace) {
            arg.remove(0);
        }
        while arg.last().is_some_and(Token::is_whitespace) {
            arg.pop();
        }
    }
    if !had_comma && args.len() == 1 && args[0].is_empty() {
        args.clear();
    }
    Ok((args, i))
}
