//! CSS tokenizer.
//!
//! Converts the normalized character stream into typed [`Token`]s. Comments
//! are consumed silently, whitespace runs collapse into single
//! [`TokenKind::Whitespace`] tokens, and a single token of push-back is
//! available for the recursive-descent parser above.
//!
//! Malformed input (unterminated strings and urls) is reported through the
//! recoverable-error channel while a best-effort token is still produced;
//! the tokenizer never fails hard.

use crate::error::ParseError;
use crate::scanner::Scanner;
use crate::token::{Token, TokenKind};

pub(crate) fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n')
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit() || c == '-'
}

/// Lazy token stream over a stylesheet source.
#[derive(Debug)]
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    pushback: Option<Token>,
    current: Option<Token>,
    errors: Vec<ParseError>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            scanner: Scanner::new(input),
            pushback: None,
            current: None,
            errors: Vec::new(),
        }
    }

    /// Consume and return the next token. At end of input this returns
    /// [`TokenKind::Eof`] tokens forever.
    pub fn next(&mut self) -> Token {
        let token = match self.pushback.take() {
            Some(token) => token,
            None => self.consume_token(),
        };
        self.current = Some(token.clone());
        token
    }

    /// Return `token` to the stream; the next call to [`next`](Self::next)
    /// yields it again. Only one token of push-back is supported.
    pub fn push_back(&mut self, token: Token) {
        debug_assert!(self.pushback.is_none(), "push_back buffer already full");
        self.pushback = Some(token);
    }

    /// The most recently returned token.
    pub fn current(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Offset of the next unread character, for diagnostics.
    pub fn position(&self) -> usize {
        match &self.pushback {
            Some(token) => token.start,
            None => self.scanner.position(),
        }
    }

    /// Recoverable errors recorded while tokenizing.
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    fn consume_token(&mut self) -> Token {
        let start = self.scanner.position();
        let mut saw_whitespace = false;
        loop {
            match self.scanner.peek() {
                Some('/') if self.scanner.peek2() == Some('*') => self.skip_comment(),
                Some(c) if is_whitespace(c) => {
                    self.scanner.next_char();
                    saw_whitespace = true;
                }
                _ => break,
            }
        }
        if saw_whitespace {
            return Token::new(TokenKind::Whitespace, start, self.scanner.position());
        }

        let start = self.scanner.position();
        let Some(c) = self.scanner.peek() else {
            return Token::new(TokenKind::Eof, start, start);
        };
        match c {
            '"' | '\'' => self.consume_string(c),
            '#' => {
                self.scanner.next_char();
                match self.scanner.peek() {
                    Some(c2) if is_name_char(c2) || c2 == '\\' => {
                        let name = self.consume_name();
                        Token::new(TokenKind::Hash(name), start, self.scanner.position())
                    }
                    _ => Token::new(TokenKind::Delim('#'), start, self.scanner.position()),
                }
            }
            ',' => {
                self.scanner.next_char();
                Token::new(TokenKind::Comma, start, self.scanner.position())
            }
            c if c.is_ascii_digit() => self.consume_numeric(start),
            '+' | '-' | '.' => {
                if self.starts_number() {
                    self.consume_numeric(start)
                } else if c == '-' && self.would_start_ident_after_dash() {
                    self.consume_ident_like(start)
                } else {
                    self.scanner.next_char();
                    Token::new(TokenKind::Delim(c), start, self.scanner.position())
                }
            }
            '\\' => self.consume_ident_like(start),
            c if is_name_start(c) => self.consume_ident_like(start),
            _ => {
                self.scanner.next_char();
                Token::new(TokenKind::Delim(c), start, self.scanner.position())
            }
        }
    }

    fn skip_comment(&mut self) {
        self.scanner.next_char();
        self.scanner.next_char();
        loop {
            match self.scanner.peek() {
                None => break,
                Some('*') if self.scanner.peek2() == Some('/') => {
                    self.scanner.next_char();
                    self.scanner.next_char();
                    break;
                }
                _ => {
                    self.scanner.next_char();
                }
            }
        }
    }

    fn starts_number(&self) -> bool {
        match self.scanner.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => matches!(self.scanner.peek2(), Some(d) if d.is_ascii_digit()),
            Some('+') | Some('-') => match self.scanner.peek2() {
                Some(d) if d.is_ascii_digit() => true,
                Some('.') => matches!(self.scanner.peek3(), Some(d) if d.is_ascii_digit()),
                _ => false,
            },
            _ => false,
        }
    }

    fn would_start_ident_after_dash(&self) -> bool {
        matches!(self.scanner.peek2(), Some(c) if is_name_start(c) || c == '-' || c == '\\')
    }

    fn consume_name(&mut self) -> String {
        let mut name = String::new();
        loop {
            match self.scanner.peek() {
                Some(c) if is_name_char(c) => {
                    name.push(c);
                    self.scanner.next_char();
                }
                Some('\\') => {
                    self.scanner.next_char();
                    name.push(self.consume_escape());
                }
                _ => break,
            }
        }
        name
    }

    /// Decode one escape sequence; the backslash is already consumed.
    ///
    /// 1-6 hex digits, optionally terminated by a single whitespace
    /// character, decode to the code point; anything else is the literal
    /// escaped character.
    fn consume_escape(&mut self) -> char {
        match self.scanner.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                let mut code = 0u32;
                let mut digits = 0;
                while digits < 6 {
                    match self.scanner.peek() {
                        Some(h) if h.is_ascii_hexdigit() => {
                            code = code * 16 + h.to_digit(16).unwrap();
                            self.scanner.next_char();
                            digits += 1;
                        }
                        _ => break,
                    }
                }
                if matches!(self.scanner.peek(), Some(w) if is_whitespace(w)) {
                    self.scanner.next_char();
                }
                char::from_u32(code).unwrap_or('\u{fffd}')
            }
            Some(c) => {
                self.scanner.next_char();
                c
            }
            None => '\u{fffd}',
        }
    }

    fn consume_string(&mut self, quote: char) -> Token {
        let start = self.scanner.position();
        self.scanner.next_char();
        let mut value = String::new();
        loop {
            match self.scanner.peek() {
                None => {
                    self.errors.push(ParseError::tokenize("unterminated string", start));
                    break;
                }
                Some('\n') => {
                    // the newline stays in the stream
                    self.errors.push(ParseError::tokenize("unterminated string", start));
                    break;
                }
                Some(c) if c == quote => {
                    self.scanner.next_char();
                    break;
                }
                Some('\\') => {
                    self.scanner.next_char();
                    match self.scanner.peek() {
                        Some('\n') => {
                            // line continuation
                            self.scanner.next_char();
                        }
                        None => {}
                        _ => value.push(self.consume_escape()),
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.scanner.next_char();
                }
            }
        }
        Token::new(TokenKind::QuotedString(value), start, self.scanner.position())
    }

    fn consume_ident_like(&mut self, start: usize) -> Token {
        let name = self.consume_name();
        if self.scanner.peek() == Some('(') {
            self.scanner.next_char();
            if name.eq_ignore_ascii_case("url") {
                return self.consume_url(start);
            }
            return Token::new(TokenKind::Function(name), start, self.scanner.position());
        }
        Token::new(TokenKind::Ident(name), start, self.scanner.position())
    }

    /// Consume a url body; `url(` is already consumed.
    fn consume_url(&mut self, start: usize) -> Token {
        self.skip_url_whitespace();
        let mut value = String::new();
        match self.scanner.peek() {
            Some(q @ ('"' | '\'')) => {
                if let TokenKind::QuotedString(s) = self.consume_string(q).kind {
                    value = s;
                }
            }
            _ => loop {
                match self.scanner.peek() {
                    None | Some(')') => break,
                    Some(c) if is_whitespace(c) => break,
                    Some('\\') => {
                        self.scanner.next_char();
                        value.push(self.consume_escape());
                    }
                    Some(c) => {
                        value.push(c);
                        self.scanner.next_char();
                    }
                }
            },
        }
        self.skip_url_whitespace();
        if self.scanner.peek() == Some(')') {
            self.scanner.next_char();
        } else {
            self.errors.push(ParseError::tokenize("unterminated url", start));
        }
        Token::new(TokenKind::Url(value), start, self.scanner.position())
    }

    fn skip_url_whitespace(&mut self) {
        while matches!(self.scanner.peek(), Some(c) if is_whitespace(c)) {
            self.scanner.next_char();
        }
    }

    fn consume_numeric(&mut self, start: usize) -> Token {
        let mut repr = String::new();
        let mut has_sign = false;
        let mut integral = true;
        if matches!(self.scanner.peek(), Some('+') | Some('-')) {
            has_sign = true;
            repr.push(self.scanner.next_char().unwrap());
        }
        while matches!(self.scanner.peek(), Some(c) if c.is_ascii_digit()) {
            repr.push(self.scanner.next_char().unwrap());
        }
        if self.scanner.peek() == Some('.')
            && matches!(self.scanner.peek2(), Some(c) if c.is_ascii_digit())
        {
            integral = false;
            repr.push(self.scanner.next_char().unwrap());
            while matches!(self.scanner.peek(), Some(c) if c.is_ascii_digit()) {
                repr.push(self.scanner.next_char().unwrap());
            }
        }
        // scientific notation; careful not to eat the `e` of a unit like `em`
        if matches!(self.scanner.peek(), Some('e') | Some('E')) {
            let exponent = match self.scanner.peek2() {
                Some(d) if d.is_ascii_digit() => true,
                Some('+') | Some('-') => {
                    matches!(self.scanner.peek3(), Some(d) if d.is_ascii_digit())
                }
                _ => false,
            };
            if exponent {
                integral = false;
                repr.push(self.scanner.next_char().unwrap());
                if matches!(self.scanner.peek(), Some('+') | Some('-')) {
                    repr.push(self.scanner.next_char().unwrap());
                }
                while matches!(self.scanner.peek(), Some(c) if c.is_ascii_digit()) {
                    repr.push(self.scanner.next_char().unwrap());
                }
            }
        }

        let value: f64 = repr.parse().unwrap_or(0.0);
        let int_value = if integral { repr.parse::<i32>().ok() } else { None };

        if self.scanner.peek() == Some('%') {
            self.scanner.next_char();
            return Token::new(
                TokenKind::Percentage {
                    has_sign,
                    value,
                    int_value,
                },
                start,
                self.scanner.position(),
            );
        }
        let unit_follows = match self.scanner.peek() {
            Some(c) if is_name_start(c) => true,
            Some('\\') => true,
            Some('-') => self.would_start_ident_after_dash(),
            _ => false,
        };
        if unit_follows {
            let unit = self.consume_name();
            return Token::new(
                TokenKind::Dimension {
                    has_sign,
                    value,
                    int_value,
                    unit,
                },
                start,
                self.scanner.position(),
            );
        }
        Token::new(
            TokenKind::Number {
                has_sign,
                value,
                int_value,
            },
            start,
            self.scanner.position(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut tokenizer = Tokenizer::new(input);
        let mut out = Vec::new();
        loop {
            let token = tokenizer.next();
            let eof = token.is_eof();
            out.push(token.kind);
            if eof {
                break;
            }
        }
        out
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Ident(name.into())
    }

    #[test]
    fn idents_and_delimiters() {
        assert_eq!(
            kinds("color: red"),
            vec![
                ident("color"),
                TokenKind::Delim(':'),
                TokenKind::Whitespace,
                ident("red"),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn custom_property_names_are_idents() {
        assert_eq!(kinds("--accent")[0], ident("--accent"));
    }

    #[test]
    fn hex_escapes_decode() {
        assert_eq!(kinds("\\41")[0], ident("A"));
        assert_eq!(kinds("\\000041B")[0], ident("AB"));
        // a single whitespace character terminates the escape
        assert_eq!(kinds("\\41 B")[0], ident("AB"));
        assert_eq!(kinds("\\26 b")[0], ident("&b"));
    }

    #[test]
    fn literal_escapes_decode() {
        assert_eq!(kinds("a\\.b")[0], ident("a.b"));
    }

    #[test]
    fn numbers() {
        assert_eq!(
            kinds("12")[0],
            TokenKind::Number {
                has_sign: false,
                value: 12.0,
                int_value: Some(12)
            }
        );
        assert_eq!(
            kinds("+3")[0],
            TokenKind::Number {
                has_sign: true,
                value: 3.0,
                int_value: Some(3)
            }
        );
        assert_eq!(
            kinds("-4.5")[0],
            TokenKind::Number {
                has_sign: true,
                value: -4.5,
                int_value: None
            }
        );
        assert_eq!(
            kinds(".5")[0],
            TokenKind::Number {
                has_sign: false,
                value: 0.5,
                int_value: None
            }
        );
        assert_eq!(
            kinds("2e3")[0],
            TokenKind::Number {
                has_sign: false,
                value: 2000.0,
                int_value: None
            }
        );
    }

    #[test]
    fn percentages_and_dimensions() {
        assert_eq!(
            kinds("50%")[0],
            TokenKind::Percentage {
                has_sign: false,
                value: 50.0,
                int_value: Some(50)
            }
        );
        assert_eq!(
            kinds("3475mm")[0],
            TokenKind::Dimension {
                has_sign: false,
                value: 3475.0,
                int_value: Some(3475),
                unit: "mm".into()
            }
        );
        // `em` is a unit, not scientific notation
        assert_eq!(
            kinds("5em")[0],
            TokenKind::Dimension {
                has_sign: false,
                value: 5.0,
                int_value: Some(5),
                unit: "em".into()
            }
        );
    }

    #[test]
    fn nth_like_input() {
        assert_eq!(
            kinds("2n+1"),
            vec![
                TokenKind::Dimension {
                    has_sign: false,
                    value: 2.0,
                    int_value: Some(2),
                    unit: "n".into()
                },
                TokenKind::Number {
                    has_sign: true,
                    value: 1.0,
                    int_value: Some(1)
                },
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds("2n-1")[0],
            TokenKind::Dimension {
                has_sign: false,
                value: 2.0,
                int_value: Some(2),
                unit: "n-1".into()
            }
        );
    }

    #[test]
    fn function_token() {
        assert_eq!(
            kinds("calc(1)"),
            vec![
                TokenKind::Function("calc".into()),
                TokenKind::Number {
                    has_sign: false,
                    value: 1.0,
                    int_value: Some(1)
                },
                TokenKind::Delim(')'),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn urls() {
        assert_eq!(kinds("url(http://a/b)")[0], TokenKind::Url("http://a/b".into()));
        assert_eq!(kinds("url( \"a b\" )")[0], TokenKind::Url("a b".into()));
    }

    #[test]
    fn unterminated_url_is_best_effort() {
        let mut tokenizer = Tokenizer::new("url(abc");
        let token = tokenizer.next();
        assert_eq!(token.kind, TokenKind::Url("abc".into()));
        let errors = tokenizer.take_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, crate::error::ParseErrorKind::Tokenize);
    }

    #[test]
    fn strings() {
        assert_eq!(kinds("\"a'b\"")[0], TokenKind::QuotedString("a'b".into()));
        assert_eq!(kinds("'a\"b'")[0], TokenKind::QuotedString("a\"b".into()));
        assert_eq!(kinds("\"a\\\"b\"")[0], TokenKind::QuotedString("a\"b".into()));
    }

    #[test]
    fn unterminated_string_is_best_effort() {
        let mut tokenizer = Tokenizer::new("\"abc");
        let token = tokenizer.next();
        assert_eq!(token.kind, TokenKind::QuotedString("abc".into()));
        assert_eq!(tokenizer.take_errors().len(), 1);
    }

    #[test]
    fn hashes() {
        assert_eq!(kinds("#fff")[0], TokenKind::Hash("fff".into()));
        assert_eq!(kinds("#-a")[0], TokenKind::Hash("-a".into()));
        assert_eq!(kinds("# ")[0], TokenKind::Delim('#'));
    }

    #[test]
    fn comments_are_consumed() {
        assert_eq!(kinds("a/*x*/b"), vec![ident("a"), ident("b"), TokenKind::Eof]);
        assert_eq!(
            kinds("a /* x */ b"),
            vec![ident("a"), TokenKind::Whitespace, ident("b"), TokenKind::Eof]
        );
    }

    #[test]
    fn whitespace_runs_collapse() {
        assert_eq!(
            kinds("a  \t\n  b"),
            vec![ident("a"), TokenKind::Whitespace, ident("b"), TokenKind::Eof]
        );
    }

    #[test]
    fn push_back_and_current() {
        let mut tokenizer = Tokenizer::new("a b");
        let first = tokenizer.next();
        assert_eq!(first.kind, ident("a"));
        tokenizer.push_back(first.clone());
        assert_eq!(tokenizer.position(), first.start);
        let again = tokenizer.next();
        assert_eq!(again, first);
        assert_eq!(tokenizer.current(), Some(&again));
    }

    #[test]
    fn offsets_are_recorded() {
        let mut tokenizer = Tokenizer::new("ab cd");
        let first = tokenizer.next();
        assert_eq!((first.start, first.end), (0, 2));
        let ws = tokenizer.next();
        assert_eq!((ws.start, ws.end), (2, 3));
        let second = tokenizer.next();
        assert_eq!((second.start, second.end), (3, 5));
    }
}
