//! Calculator Tool
//!
//! Evaluates arithmetic expressions with a small recursive-descent parser.
//! Supported: `+ - * / // % **` (`^` is an alias for `**`), parentheses,
//! unary signs and decimal literals with an optional exponent.

use async_trait::async_trait;
use thiserror::Error;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

pub const NAME: &str = "calculate";

const MAX_DEPTH: usize = 64;

/// Why an expression could not be evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token after position {0}")]
    TrailingInput(usize),

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression nested too deeply")]
    TooDeep,

    #[error("result is not a finite number")]
    NotFinite,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Pow,
    Slash,
    FloorDiv,
    Percent,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Exponent: 1e3, 2.5E-4
                if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && matches!(chars[j], '+' | '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Num(value));
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Pow);
                i += 2;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::FloorDiv);
                i += 2;
            }
            '+' | '-' | '*' | '/' | '%' | '^' | '(' | ')' => {
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '^' => Token::Pow,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                });
                i += 1;
            }
            other => return Err(CalcError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn enter(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '//' | '%') unary)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::FloorDiv | Token::Percent)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => return Err(CalcError::DivisionByZero),
                Token::Slash => value / rhs,
                Token::FloorDiv => (value / rhs).floor(),
                // Sign follows the divisor
                _ => value - rhs * (value / rhs).floor(),
            };
        }
        Ok(value)
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.enter()?;
                let value = -self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.enter()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.power(),
        }
    }

    // power := primary ('**' unary)?   (right-associative, binds tighter than unary minus on its left)
    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            self.enter()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // primary := number | '(' expr ')'
    fn primary(&mut self) -> Result<f64, CalcError> {
        match self.advance() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                self.enter()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(_) => Err(CalcError::TrailingInput(self.pos - 1)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(_) => Err(CalcError::TrailingInput(self.pos - 1)),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let mut parser = Parser {
        tokens: tokenize(expr)?,
        pos: 0,
        depth: 0,
    };

    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(CalcError::TrailingInput(parser.pos));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

/// Render integral values without a fractional part
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let integral = value as i64;
        integral.to_string()
    } else {
        value.to_string()
    }
}

/// Tool wrapper around [`evaluate`]
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: NAME.into(),
            description: "Evaluate a mathematical expression".into(),
            parameters: vec![ParameterSchema::required_string(
                "expression",
                "Arithmetic expression to evaluate (e.g., '15 * 8 + 23', '(2 + 3) ** 2')",
            )],
            category: Some("math".into()),
            has_side_effects: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let expr = call.str_arg("expression")?;

        match evaluate(expr) {
            Ok(value) => Ok(ToolResult::success(
                NAME,
                format!("The result of {expr} is {}", format_number(value)),
            )),
            Err(e) => Ok(ToolResult::failure(NAME, format!("Error calculating {expr}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> f64 {
        evaluate(expr).unwrap()
    }

    #[test]
    fn test_basic_arithmetic() {
        assert!((eval("2+2") - 4.0).abs() < f64::EPSILON);
        assert!((eval("15 * 8 + 23") - 143.0).abs() < f64::EPSILON);
        assert!((eval("(2 + 3) * 4") - 20.0).abs() < f64::EPSILON);
        assert!((eval("10 - 4 - 3") - 3.0).abs() < f64::EPSILON);
        assert!((eval("7 / 2") - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_powers_and_signs() {
        assert!((eval("2 ** 8") - 256.0).abs() < f64::EPSILON);
        assert!((eval("2 ^ 3 ^ 2") - 512.0).abs() < f64::EPSILON);
        assert!((eval("-2 ** 2") + 4.0).abs() < f64::EPSILON);
        assert!((eval("2 * -3") + 6.0).abs() < f64::EPSILON);
        assert!((eval("2 ** -1") - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_floor_division_and_modulo() {
        assert!((eval("7 // 2") - 3.0).abs() < f64::EPSILON);
        assert!((eval("-7 // 2") + 4.0).abs() < f64::EPSILON);
        assert!((eval("7 % 3") - 1.0).abs() < f64::EPSILON);
        assert!((eval("-7 % 3") - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decimals_and_exponents() {
        assert!((eval("1.5 * 2") - 3.0).abs() < f64::EPSILON);
        assert!((eval("1e3 + 2.5E-1") - 1000.25).abs() < 1e-9);
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("5 % 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("2 +"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::UnexpectedEnd));
        assert!(matches!(evaluate("2 $ 3"), Err(CalcError::UnexpectedChar('$', 2))));
        assert!(matches!(evaluate("2 3"), Err(CalcError::TrailingInput(1))));
        assert!(matches!(evaluate("1.2.3"), Err(CalcError::InvalidNumber(_))));
        assert_eq!(evaluate("10 ** 400"), Err(CalcError::NotFinite));
        assert_eq!(evaluate(&"(".repeat(100)), Err(CalcError::TooDeep));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-6.0), "-6");
        assert_eq!(format_number(3.5), "3.5");
    }

    #[tokio::test]
    async fn test_tool_output() {
        let call = ToolCall::new(NAME).with_arg("expression", "2+2");
        let result = CalculatorTool.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "The result of 2+2 is 4");

        let call = ToolCall::new(NAME).with_arg("expression", "1/0");
        let result = CalculatorTool.execute(&call).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.output, "Error calculating 1/0: division by zero");
    }
}
