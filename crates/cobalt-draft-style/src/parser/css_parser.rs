//! CSS syntax parser.
//!
//! Recursive descent over the token stream. The parser never fails hard on
//! recoverable input: malformed constructs are recorded as [`ParseError`]s
//! and parsing resynchronizes at the next rule boundary, so a partially
//! invalid stylesheet still yields a usable AST.

use crate::error::ParseError;
use crate::rules::{AtRule, Declaration, Rule, StyleRule, Stylesheet};
use crate::selector::{
    AttrMatch, AttributeSelector, Combinator, NamespacePrefix, NthExpr, PseudoClass, Selector,
    SelectorGroup, SelectorPart, TypeSelector,
};
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

/// Parse a stylesheet, collecting recoverable errors instead of failing.
///
/// Always returns an AST; a fully malformed construct that cannot be
/// resynchronized (e.g. an unterminated url swallowing the rest of the
/// input) terminates the parse with the errors accumulated so far.
pub fn parse_stylesheet(css: &str) -> (Stylesheet, Vec<ParseError>) {
    Parser::new(css).run()
}

struct Parser<'a> {
    tokens: Tokenizer<'a>,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(css: &'a str) -> Self {
        Self {
            tokens: Tokenizer::new(css),
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> (Stylesheet, Vec<ParseError>) {
        let mut sheet = Stylesheet::new();
        loop {
            self.skip_whitespace();
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Delim('@') => match self.parse_at_rule(token.start) {
                    Ok(rule) => {
                        if rule.name.eq_ignore_ascii_case("namespace")
                            && let Err(err) = sheet.apply_namespace_rule(&rule)
                        {
                            self.errors.push(err);
                        }
                        sheet.rules.push(Rule::At(rule));
                    }
                    Err(err) => {
                        tracing::warn!("recovered from CSS parse error: {err}");
                        self.errors.push(err);
                        if !self.resync_rule() {
                            break;
                        }
                    }
                },
                // stray closing braces at the top level are tolerated
                TokenKind::Delim('}') => continue,
                _ => {
                    self.tokens.push_back(token);
                    match self.parse_style_rule() {
                        Ok(rule) => sheet.rules.push(Rule::Style(rule)),
                        Err(err) => {
                            tracing::warn!("recovered from CSS parse error: {err}");
                            self.errors.push(err);
                            if !self.resync_rule() {
                                break;
                            }
                        }
                    }
                }
            }
            self.errors.extend(self.tokens.take_errors());
        }
        self.errors.extend(self.tokens.take_errors());
        (sheet, self.errors)
    }

    fn skip_whitespace(&mut self) {
        loop {
            let token = self.tokens.next();
            if !token.is_whitespace() {
                self.tokens.push_back(token);
                break;
            }
        }
    }

    /// Skip to the next rule boundary: past a balanced block, or past the
    /// next top-level `;` or `}`. Returns false at end of input.
    fn resync_rule(&mut self) -> bool {
        let mut depth = 0usize;
        loop {
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Eof => return false,
                TokenKind::Delim('{') => depth += 1,
                TokenKind::Delim('}') => {
                    if depth <= 1 {
                        return true;
                    }
                    depth -= 1;
                }
                TokenKind::Delim(';') if depth == 0 => return true,
                _ => {}
            }
        }
    }

    /// Parse an at-rule; the `@` is already consumed.
    fn parse_at_rule(&mut self, at_offset: usize) -> Result<AtRule, ParseError> {
        let name_token = self.tokens.next();
        // `@supports(..)` tokenizes the name as a function token
        let (name, mut prelude) = match name_token.kind {
            TokenKind::Ident(name) => (name, Vec::new()),
            TokenKind::Function(name) => {
                let paren = Token::new(TokenKind::Delim('('), name_token.start, name_token.end);
                (name, vec![paren])
            }
            _ => {
                return Err(ParseError::parse(
                    "expected at-rule name after '@'",
                    at_offset,
                ));
            }
        };
        loop {
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Eof => {
                    return Err(ParseError::parse(
                        format!("unexpected end of input in @{name}"),
                        token.start,
                    ));
                }
                TokenKind::Delim(';') => {
                    trim_whitespace(&mut prelude);
                    return Ok(AtRule::new(name, prelude, None));
                }
                TokenKind::Delim('{') => {
                    let block = self.consume_block_tokens(&name, token.start)?;
                    trim_whitespace(&mut prelude);
                    return Ok(AtRule::new(name, prelude, Some(block)));
                }
                TokenKind::Delim('}') => {
                    return Err(ParseError::parse(
                        format!("unexpected '}}' in @{name} prelude"),
                        token.start,
                    ));
                }
                _ => prelude.push(token),
            }
        }
    }

    /// Collect a balanced `{ ... }` token run; the opening brace is already
    /// consumed and the closing brace is not included.
    fn consume_block_tokens(
        &mut self,
        name: &str,
        open_offset: usize,
    ) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        loop {
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Eof => {
                    return Err(ParseError::parse(
                        format!("unclosed block in @{name}"),
                        open_offset,
                    ));
                }
                TokenKind::Delim('{') => {
                    depth += 1;
                    tokens.push(token);
                }
                TokenKind::Delim('}') => {
                    if depth == 0 {
                        trim_whitespace(&mut tokens);
                        return Ok(tokens);
                    }
                    depth -= 1;
                    tokens.push(token);
                }
                _ => tokens.push(token),
            }
        }
    }

    fn parse_style_rule(&mut self) -> Result<StyleRule, ParseError> {
        let selectors = self.parse_selector_group()?;
        self.skip_whitespace();
        let token = self.tokens.next();
        if !token.is_delim('{') {
            return Err(ParseError::parse(
                format!("expected '{{' after selector '{selectors}'"),
                token.start,
            ));
        }
        let declarations = self.parse_declarations();
        Ok(StyleRule::new(selectors, declarations))
    }

    fn parse_selector_group(&mut self) -> Result<SelectorGroup, ParseError> {
        let mut selectors = vec![self.parse_selector()?];
        loop {
            self.skip_whitespace();
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Comma => {
                    self.skip_whitespace();
                    let next = self.tokens.next();
                    let ended = next.is_delim('{') || next.is_eof();
                    let offset = next.start;
                    self.tokens.push_back(next);
                    if ended {
                        return Err(ParseError::parse("expected selector after ','", offset));
                    }
                    selectors.push(self.parse_selector()?);
                }
                _ => {
                    self.tokens.push_back(token);
                    break;
                }
            }
        }
        Ok(SelectorGroup::new(selectors))
    }

    fn parse_selector(&mut self) -> Result<Selector, ParseError> {
        let mut parts = vec![self.parse_simple_sequence(true)?];
        let mut combinators = Vec::new();
        loop {
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Whitespace => {
                    let next = self.tokens.next();
                    match next.kind {
                        TokenKind::Delim('>') => {
                            self.skip_whitespace();
                            combinators.push(Combinator::Child);
                            parts.push(self.parse_simple_sequence(true)?);
                        }
                        TokenKind::Delim('+') => {
                            self.skip_whitespace();
                            combinators.push(Combinator::AdjacentSibling);
                            parts.push(self.parse_simple_sequence(true)?);
                        }
                        TokenKind::Delim('~') => {
                            self.skip_whitespace();
                            combinators.push(Combinator::GeneralSibling);
                            parts.push(self.parse_simple_sequence(true)?);
                        }
                        TokenKind::Delim('{') | TokenKind::Comma | TokenKind::Eof => {
                            self.tokens.push_back(next);
                            break;
                        }
                        _ => {
                            // bare whitespace is the descendant combinator
                            self.tokens.push_back(next);
                            combinators.push(Combinator::Descendant);
                            parts.push(self.parse_simple_sequence(true)?);
                        }
                    }
                }
                TokenKind::Delim('>') => {
                    self.skip_whitespace();
                    combinators.push(Combinator::Child);
                    parts.push(self.parse_simple_sequence(true)?);
                }
                TokenKind::Delim('+') => {
                    self.skip_whitespace();
                    combinators.push(Combinator::AdjacentSibling);
                    parts.push(self.parse_simple_sequence(true)?);
                }
                TokenKind::Delim('~') => {
                    self.skip_whitespace();
                    combinators.push(Combinator::GeneralSibling);
                    parts.push(self.parse_simple_sequence(true)?);
                }
                _ => {
                    self.tokens.push_back(token);
                    break;
                }
            }
        }
        Ok(Selector { parts, combinators })
    }

    /// Parse one simple-selector sequence. `allow_not` is false inside a
    /// `:not()` argument; nesting another `:not()` there is an error.
    fn parse_simple_sequence(&mut self, allow_not: bool) -> Result<SelectorPart, ParseError> {
        let mut part = SelectorPart::new();
        loop {
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Ident(name) => {
                    if !part.is_empty() {
                        self.tokens.push_back(Token::new(
                            TokenKind::Ident(name),
                            token.start,
                            token.end,
                        ));
                        break;
                    }
                    part.type_selector = Some(self.finish_type_selector(
                        NamespacePrefix::Default,
                        Some(name),
                        token.end,
                    )?);
                }
                TokenKind::Delim('*') if part.is_empty() => {
                    part.type_selector = Some(self.finish_type_selector(
                        NamespacePrefix::Default,
                        None,
                        token.end,
                    )?);
                }
                TokenKind::Delim('|') if part.is_empty() => {
                    part.type_selector = Some(self.parse_namespaced_type(NamespacePrefix::None)?);
                }
                TokenKind::Hash(id) => {
                    part.id = Some(id);
                }
                TokenKind::Delim('.') => {
                    let name = self.tokens.next();
                    match name.kind {
                        TokenKind::Ident(class) => part.classes.push(class),
                        _ => {
                            return Err(ParseError::parse(
                                "expected class name after '.'",
                                name.start,
                            ));
                        }
                    }
                }
                TokenKind::Delim('[') => {
                    part.attributes.push(self.parse_attribute_selector()?);
                }
                TokenKind::Delim(':') => {
                    part.pseudo_classes.push(self.parse_pseudo_class(allow_not)?);
                }
                _ => {
                    self.tokens.push_back(token);
                    break;
                }
            }
        }
        if part.is_empty() {
            let offset = self.tokens.position();
            return Err(ParseError::parse("empty selector", offset));
        }
        Ok(part)
    }

    /// Complete a type selector whose first token was an ident, `*`, or a
    /// leading `|`. A `|` glued to the first token turns it into a
    /// namespace prefix.
    fn finish_type_selector(
        &mut self,
        default_prefix: NamespacePrefix,
        name: Option<String>,
        end: usize,
    ) -> Result<TypeSelector, ParseError> {
        let bar = self.tokens.next();
        if bar.is_delim('|') && bar.start == end {
            let prefix = match name {
                Some(prefix) => NamespacePrefix::Named(prefix),
                None => NamespacePrefix::Any,
            };
            return self.parse_namespaced_type(prefix);
        }
        self.tokens.push_back(bar);
        Ok(match name {
            Some(name) => TypeSelector::Named {
                namespace: default_prefix,
                name,
            },
            None => TypeSelector::Universal {
                namespace: default_prefix,
            },
        })
    }

    /// Parse the element name following a namespace prefix bar.
    fn parse_namespaced_type(
        &mut self,
        namespace: NamespacePrefix,
    ) -> Result<TypeSelector, ParseError> {
        let token = self.tokens.next();
        match token.kind {
            TokenKind::Ident(name) => Ok(TypeSelector::Named { namespace, name }),
            TokenKind::Delim('*') => Ok(TypeSelector::Universal { namespace }),
            _ => Err(ParseError::parse(
                "expected element name after namespace prefix",
                token.start,
            )),
        }
    }

    /// Parse an attribute predicate; the `[` is already consumed.
    fn parse_attribute_selector(&mut self) -> Result<AttributeSelector, ParseError> {
        self.skip_whitespace();
        let name_token = self.tokens.next();
        let TokenKind::Ident(name) = name_token.kind else {
            return Err(ParseError::parse(
                "expected attribute name after '['",
                name_token.start,
            ));
        };
        self.skip_whitespace();
        let op = self.tokens.next();
        let matcher = match op.kind {
            TokenKind::Delim(']') => return Ok(AttributeSelector::new(name, AttrMatch::Exists)),
            TokenKind::Delim('=') => AttrMatch::Equals(self.parse_attribute_value()?),
            TokenKind::Delim(c @ ('~' | '|' | '^' | '$' | '*')) => {
                let eq = self.tokens.next();
                if !eq.is_delim('=') {
                    return Err(ParseError::parse(
                        format!("expected '=' after '{c}' in attribute selector"),
                        eq.start,
                    ));
                }
                let value = self.parse_attribute_value()?;
                match c {
                    '~' => AttrMatch::Includes(value),
                    '|' => AttrMatch::DashMatch(value),
                    '^' => AttrMatch::Prefix(value),
                    '$' => AttrMatch::Suffix(value),
                    _ => AttrMatch::Substring(value),
                }
            }
            _ => {
                return Err(ParseError::parse(
                    "expected ']' or a match operator in attribute selector",
                    op.start,
                ));
            }
        };
        self.skip_whitespace();
        let close = self.tokens.next();
        if !close.is_delim(']') {
            return Err(ParseError::parse(
                "expected ']' to close attribute selector",
                close.start,
            ));
        }
        Ok(AttributeSelector::new(name, matcher))
    }

    fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        self.skip_whitespace();
        let token = self.tokens.next();
        match token.kind {
            TokenKind::Ident(value) | TokenKind::QuotedString(value) => Ok(value),
            TokenKind::Number { value, .. } => Ok(crate::token::format_number(value)),
            _ => Err(ParseError::parse(
                "expected attribute value",
                token.start,
            )),
        }
    }

    /// Parse a pseudo-class; the `:` is already consumed.
    fn parse_pseudo_class(&mut self, allow_not: bool) -> Result<PseudoClass, ParseError> {
        let token = self.tokens.next();
        match token.kind {
            TokenKind::Ident(name) => match name.to_ascii_lowercase().as_str() {
                "first-child" => Ok(PseudoClass::FirstChild),
                "last-child" => Ok(PseudoClass::LastChild),
                "only-child" => Ok(PseudoClass::OnlyChild),
                "empty" => Ok(PseudoClass::Empty),
                _ => Err(ParseError::selector(
                    format!("unknown pseudo-class ':{name}'"),
                    token.start,
                )),
            },
            TokenKind::Function(name) => match name.to_ascii_lowercase().as_str() {
                "not" => {
                    if !allow_not {
                        return Err(ParseError::selector(
                            "':not()' cannot be nested",
                            token.start,
                        ));
                    }
                    self.parse_not_argument().map(|part| PseudoClass::Not(Box::new(part)))
                }
                "nth-child" => self.parse_nth_expression().map(PseudoClass::NthChild),
                _ => Err(ParseError::selector(
                    format!("unknown pseudo-class ':{name}()'"),
                    token.start,
                )),
            },
            _ => Err(ParseError::parse(
                "expected pseudo-class name after ':'",
                token.start,
            )),
        }
    }

    /// Parse the single simple-selector sequence inside `:not(...)`.
    fn parse_not_argument(&mut self) -> Result<SelectorPart, ParseError> {
        self.skip_whitespace();
        let inner = self.parse_simple_sequence(false)?;
        self.skip_whitespace();
        let token = self.tokens.next();
        match token.kind {
            TokenKind::Delim(')') => Ok(inner),
            TokenKind::Comma => Err(ParseError::selector(
                "selector list inside ':not()' is not allowed",
                token.start,
            )),
            _ => Err(ParseError::selector(
                "expected ')' after ':not()' argument",
                token.start,
            )),
        }
    }

    /// Parse the `An+B` expression inside `:nth-child(...)`, consuming the
    /// closing parenthesis.
    fn parse_nth_expression(&mut self) -> Result<NthExpr, ParseError> {
        let mut args = Vec::new();
        let offset = self.tokens.position();
        loop {
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Delim(')') => break,
                TokenKind::Eof => {
                    return Err(ParseError::parse(
                        "unterminated ':nth-child()'",
                        token.start,
                    ));
                }
                _ => args.push(token),
            }
        }
        nth_from_tokens(&args).map_err(|message| ParseError::selector(message, offset))
    }

    /// Parse declarations until the closing `}` of the block; errors inside
    /// the block are recorded and skip a single declaration.
    fn parse_declarations(&mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        loop {
            self.skip_whitespace();
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Eof => {
                    self.errors
                        .push(ParseError::parse("unclosed declaration block", token.start));
                    break;
                }
                TokenKind::Delim('}') => break,
                TokenKind::Delim(';') => continue,
                TokenKind::Ident(property) => {
                    self.skip_whitespace();
                    let colon = self.tokens.next();
                    if !colon.is_delim(':') {
                        self.errors.push(ParseError::parse(
                            format!("expected ':' after property '{property}'"),
                            colon.start,
                        ));
                        self.tokens.push_back(colon);
                        self.skip_declaration();
                        continue;
                    }
                    let terms = self.parse_declaration_value();
                    declarations.push(Declaration::new(property, terms));
                }
                _ => {
                    self.errors.push(ParseError::parse(
                        format!("unexpected '{token}' in declaration block"),
                        token.start,
                    ));
                    self.skip_declaration();
                }
            }
        }
        declarations
    }

    /// Collect value tokens until a top-level `;` or the block's `}`.
    /// Brackets, parentheses and braces inside the value are opaque; the
    /// terminating `}` is left for the block loop.
    fn parse_declaration_value(&mut self) -> Vec<Token> {
        let mut terms = Vec::new();
        let mut depth = 0usize;
        self.skip_whitespace();
        loop {
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Eof => {
                    self.tokens.push_back(token);
                    break;
                }
                TokenKind::Delim(';') if depth == 0 => break,
                TokenKind::Delim('}') if depth == 0 => {
                    self.tokens.push_back(token);
                    break;
                }
                TokenKind::Delim('{') | TokenKind::Delim('(') | TokenKind::Delim('[') => {
                    depth += 1;
                    terms.push(token);
                }
                TokenKind::Function(_) => {
                    depth += 1;
                    terms.push(token);
                }
                TokenKind::Delim('}') | TokenKind::Delim(')') | TokenKind::Delim(']') => {
                    depth = depth.saturating_sub(1);
                    terms.push(token);
                }
                _ => terms.push(token),
            }
        }
        trim_whitespace(&mut terms);
        terms
    }

    /// Skip the remainder of one malformed declaration.
    fn skip_declaration(&mut self) {
        let mut depth = 0usize;
        loop {
            let token = self.tokens.next();
            match token.kind {
                TokenKind::Eof => {
                    self.tokens.push_back(token);
                    break;
                }
                TokenKind::Delim(';') if depth == 0 => break,
                TokenKind::Delim('}') if depth == 0 => {
                    self.tokens.push_back(token);
                    break;
                }
                TokenKind::Delim('{') | TokenKind::Delim('(') | TokenKind::Delim('[') => depth += 1,
                TokenKind::Function(_) => depth += 1,
                TokenKind::Delim('}') | TokenKind::Delim(')') | TokenKind::Delim(']') => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
        }
    }
}

fn trim_whitespace(tokens: &mut Vec<Token>) {
    while tokens.first().is_some_and(Token::is_whitespace) {
        tokens.remove(0);
    }
    while tokens.last().is_some_and(Token::is_whitespace) {
        tokens.pop();
    }
}

/// Interpret the tokens of an `An+B` expression.
///
/// Accepts `even`, `odd`, bare integers, and signed `An+B` forms with
/// optional internal whitespace (`2n+1`, `2n + 1`, `-n+3`, `0n+5`).
fn nth_from_tokens(tokens: &[Token]) -> Result<NthExpr, String> {
    let toks: Vec<&Token> = tokens.iter().filter(|t| !t.is_whitespace()).collect();
    let mut i = 0;

    // "+n..." arrives as a separate delimiter before the ident
    let explicit_plus = if matches!(toks.first(), Some(t) if t.is_delim('+'))
        && matches!(toks.get(1), Some(t) if matches!(t.kind, TokenKind::Ident(_)))
    {
        i += 1;
        true
    } else {
        false
    };

    let (a, b_done) = match toks.get(i) {
        None => return Err("empty ':nth-child()' expression".into()),
        Some(token) => match &token.kind {
            TokenKind::Ident(name) => {
                let name = name.to_ascii_lowercase();
                match name.as_str() {
                    "even" if !explicit_plus => {
                        return expect_end(&toks, i + 1, NthExpr::even());
                    }
                    "odd" if !explicit_plus => {
                        return expect_end(&toks, i + 1, NthExpr::odd());
                    }
                    _ => {
                        let (sign, rest) = match name.strip_prefix('-') {
                            Some(rest) if !explicit_plus => (-1, rest),
                            _ => (1, name.as_str()),
                        };
                        let tail = rest
                            .strip_prefix('n')
                            .ok_or_else(|| format!("invalid ':nth-child()' term '{name}'"))?;
                        (sign, parse_n_tail(tail)?)
                    }
                }
            }
            TokenKind::Number {
                int_value: Some(b), ..
            } if !explicit_plus => {
                return expect_end(&toks, i + 1, NthExpr::new(0, *b));
            }
            TokenKind::Dimension {
                int_value: Some(a),
                unit,
                ..
            } if !explicit_plus => {
                let tail = unit
                    .to_ascii_lowercase()
                    .strip_prefix('n')
                    .map(str::to_string)
                    .ok_or_else(|| format!("invalid ':nth-child()' unit '{unit}'"))?;
                (*a, parse_n_tail(&tail)?)
            }
            _ => return Err("invalid ':nth-child()' expression".into()),
        },
    };
    i += 1;

    if let Some(b) = b_done {
        return expect_end(&toks, i, NthExpr::new(a, b));
    }

    // optional "+ B" / "- B" tail, or a signed number glued to the n-term
    match toks.get(i) {
        None => Ok(NthExpr::new(a, 0)),
        Some(token) => match &token.kind {
            TokenKind::Delim(sign @ ('+' | '-')) => {
                let sign = if *sign == '-' { -1 } else { 1 };
                match toks.get(i + 1).map(|t| &t.kind) {
                    Some(TokenKind::Number {
                        has_sign: false,
                        int_value: Some(b),
                        ..
                    }) => expect_end(&toks, i + 2, NthExpr::new(a, sign * b)),
                    _ => Err("expected integer after sign in ':nth-child()'".into()),
                }
            }
            TokenKind::Number {
                has_sign: true,
                int_value: Some(b),
                ..
            } => expect_end(&toks, i + 1, NthExpr::new(a, *b)),
            _ => Err("invalid ':nth-child()' expression".into()),
        },
    }
}

/// Interpret what follows the `n` inside an ident or unit: nothing, or a
/// glued `-B`.
fn parse_n_tail(tail: &str) -> Result<Option<i32>, String> {
    if tail.is_empty() {
        return Ok(None);
    }
    if let Some(digits) = tail.strip_prefix('-') {
        let b: i32 = digits
            .parse()
            .map_err(|_| format!("invalid ':nth-child()' offset '{tail}'"))?;
        return Ok(Some(-b));
    }
    Err(format!("invalid ':nth-child()' term 'n{tail}'"))
}

fn expect_end(toks: &[&Token], from: usize, expr: NthExpr) -> Result<NthExpr, String> {
    if from == toks.len() {
        Ok(expr)
    } else {
        Err("trailing tokens in ':nth-child()' expression".into())
    }
}
