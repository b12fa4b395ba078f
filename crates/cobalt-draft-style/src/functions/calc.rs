//! `calc()` expression evaluation.
//!
//! Evaluates a restricted arithmetic grammar over numbers, percentages and
//! dimensions. Additive operators require surrounding whitespace (the CSS
//! `calc()` grammar; `1+2` never parses as an addition because `+2` is a
//! signed number token), multiplicative operators do not.

use crate::error::FunctionError;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
enum Unit {
    None,
    Percent,
    Dim(String),
}

#[derive(Debug, Clone)]
struct CalcValue {
    value: f64,
    unit: Unit,
}

/// Evaluate a fully expanded `calc()` body into a single numeric token.
///
/// `span` carries the offsets of the originating function token so the
/// synthesized result still points into the source.
pub(super) fn evaluate(tokens: &[Token], span: (usize, usize)) -> Result<Token, FunctionError> {
    let mut parser = ExprParser { tokens, index: 0 };
    parser.skip_whitespace();
    let value = parser.parse_sum()?;
    parser.skip_whitespace();
    if let Some(token) = parser.peek() {
        return Err(FunctionError::type_error(
            "calc",
            format!("unexpected '{token}' in expression"),
        ));
    }
    Ok(into_token(value, span))
}

struct ExprParser<'a> {
    tokens: &'a [Token],
    index: usize,
}

impl<'a> ExprParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.index)
    }

    fn skip_whitespace(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(Token::is_whitespace) {
            self.index += 1;
            skipped = true;
        }
        skipped
    }

    fn parse_sum(&mut self) -> Result<CalcValue, FunctionError> {
        let mut left = self.parse_product()?;
        loop {
            let checkpoint = self.index;
            let space_before = self.skip_whitespace();
            let sign = match self.peek() {
                Some(token) if token.is_delim('+') => 1.0,
                Some(token) if token.is_delim('-') => -1.0,
                _ => {
                    self.index = checkpoint;
                    break;
                }
            };
            self.index += 1;
            let space_after = self.skip_whitespace();
            if !space_before || !space_after {
                return Err(FunctionError::type_error(
                    "calc",
                    "'+' and '-' must be surrounded by whitespace",
                ));
            }
            let right = self.parse_product()?;
            left = add(left, right, sign)?;
        }
        Ok(left)
    }

    fn parse_product(&mut self) -> Result<CalcValue, FunctionError> {
        let mut left = self.parse_factor()?;
        loop {
            let checkpoint = self.index;
            self.skip_whitespace();
            let is_division = match self.peek() {
                Some(token) if token.is_delim('*') => false,
                Some(token) if token.is_delim('/') => true,
                _ => {
                    self.index = checkpoint;
                    break;
                }
            };
            self.index += 1;
            self.skip_whitespace();
            let right = self.parse_factor()?;
            left = if is_division {
                div(left, right)?
            } else {
                mul(left, right)?
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self) -> Result<CalcValue, FunctionError> {
        self.skip_whitespace();
        let Some(token) = self.peek() else {
            return Err(FunctionError::type_error("calc", "unexpected end of expression"));
        };
        self.index += 1;
        match &token.kind {
            TokenKind::Number { value, .. } => Ok(CalcValue {
                value: *value,
                unit: Unit::None,
            }),
            TokenKind::Percentage { value, .. } => Ok(CalcValue {
                value: *value,
                unit: Unit::Percent,
            }),
            TokenKind::Dimension { value, unit, .. } => Ok(CalcValue {
                value: *value,
                unit: Unit::Dim(unit.clone()),
            }),
            TokenKind::Delim('(') => {
                let value = self.parse_sum()?;
                self.skip_whitespace();
                match self.peek() {
                    Some(token) if token.is_delim(')') => {
                        self.index += 1;
                        Ok(value)
                    }
                    _ => Err(FunctionError::type_error("calc", "expected ')'")),
                }
            }
            _ => Err(FunctionError::type_error(
                "calc",
                format!("expected a number, percentage, or dimension, found '{token}'"),
            )),
        }
    }
}

fn add(left: CalcValue, right: CalcValue, sign: f64) -> Result<CalcValue, FunctionError> {
    if left.unit != right.unit {
        return Err(FunctionError::type_error(
            "calc",
            "incompatible units in addition",
        ));
    }
    Ok(CalcValue {
        value: left.value + sign * right.value,
        unit: left.unit,
    })
}

fn mul(left: CalcValue, right: CalcValue) -> Result<CalcValue, FunctionError> {
    let unit = match (&left.unit, &right.unit) {
        (Unit::None, unit) | (unit, Unit::None) => unit.clone(),
        (a, b) if a == b => a.clone(),
        _ => {
            return Err(FunctionError::type_error(
                "calc",
                "incompatible units in multiplication",
            ));
        }
    };
    Ok(CalcValue {
        value: left.value * right.value,
        unit,
    })
}

fn div(left: CalcValue, right: CalcValue) -> Result<CalcValue, FunctionError> {
    if right.value == 0.0 {
        return Err(FunctionError::type_error("calc", "division by zero"));
    }
    let unit = match (&left.unit, &right.unit) {
        (unit, Unit::None) => unit.clone(),
        (a, b) if a == b => Unit::None,
        _ => {
            return Err(FunctionError::type_error(
                "calc",
                "incompatible units in division",
            ));
        }
    };
    Ok(CalcValue {
        value: left.value / right.value,
        unit,
    })
}

fn into_token(value: CalcValue, span: (usize, usize)) -> Token {
    let int_value = int_of(value.value);
    let has_sign = value.value < 0.0;
    let kind = match value.unit {
        Unit::None => TokenKind::Number {
            has_sign,
            value: value.value,
            int_value,
        },
        Unit::Percent => TokenKind::Percentage {
            has_sign,
            value: value.value,
            int_value,
        },
        Unit::Dim(unit) => TokenKind::Dimension {
            has_sign,
            value: value.value,
            int_value,
            unit,
        },
    };
    Token::new(kind, span.0, span.1)
}

pub(super) fn int_of(value: f64) -> Option<i32> {
    if value.fract() == 0.0 && value.abs() <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Tokenizer;

    fn terms(css: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(css);
        let mut out = Vec::new();
        loop {
            let token = tokenizer.next();
            if token.is_eof() {
                break;
            }
            out.push(token);
        }
        out
    }

    fn eval(css: &str) -> Result<String, FunctionError> {
        evaluate(&terms(css), (0, 0)).map(|t| t.to_string())
    }

    #[test]
    fn addition_and_subtraction() {
        assert_eq!(eval("1 + 2").unwrap(), "3");
        assert_eq!(eval("5 - 2").unwrap(), "3");
        assert_eq!(eval("1mm + 2mm").unwrap(), "3mm");
        assert_eq!(eval("50% + 25%").unwrap(), "75%");
    }

    #[test]
    fn additive_operators_require_whitespace() {
        assert!(eval("1+2").is_err());
        assert!(eval("1 +2").is_err());
        assert!(eval("1- 2").is_err());
    }

    #[test]
    fn incompatible_addition_fails() {
        assert!(eval("1 + 2mm").is_err());
        assert!(eval("1mm + 2px").is_err());
        assert!(eval("50% + 1").is_err());
    }

    #[test]
    fn multiplication_units() {
        assert_eq!(eval("2mm * 3").unwrap(), "6mm");
        assert_eq!(eval("3 * 2mm").unwrap(), "6mm");
        assert_eq!(eval("1475mm * 3475mm").unwrap(), "5125625mm");
        assert!(eval("2mm * 3px").is_err());
    }

    #[test]
    fn division_units() {
        assert_eq!(eval("10mm / 2").unwrap(), "5mm");
        assert_eq!(eval("10mm / 2mm").unwrap(), "5");
        assert!(eval("10 / 0").is_err());
        assert!(eval("10 / 2mm").is_err());
    }

    #[test]
    fn parentheses_group() {
        assert_eq!(eval("(1 + 2) * 3mm").unwrap(), "9mm");
        assert_eq!(eval("2 * (3mm + 1mm)").unwrap(), "8mm");
        assert!(eval("(1 + 2").is_err());
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(eval("1 2").is_err());
        assert!(eval("1 + 2 )").is_err());
        assert!(eval("").is_err());
    }
}
