//! Arithmetic calculator tool.
//!
//! Input is free text. Everything outside the arithmetic alphabet
//! (digits, `+ - * / ( ) .` and whitespace) is stripped before parsing, and
//! the remainder is evaluated by a pure-arithmetic recursive-descent
//! parser: no names, no calls, nothing to inject into.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use super::Tool;

pub struct CalculatorTool;

fn sanitize_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^0-9+\-*/().\s]").expect("valid sanitize pattern"))
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Useful for performing mathematical calculations. Input should be a valid mathematical expression."
    }

    async fn run(&self, input: &str) -> String {
        let expression = sanitize_pattern().replace_all(input.trim(), "").to_string();

        match evaluate(&expression) {
            Ok(value) => format_result(value),
            Err(reason) => format!("Error calculating '{}': {}", expression.trim(), reason),
        }
    }
}

/// Integer-valued results render without a decimal point, everything else
/// to 4 decimal places.
fn format_result(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.4}", value)
    }
}

fn evaluate(expression: &str) -> Result<f64, String> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }

    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.parse_expression()?;
    if parser.pos != parser.tokens.len() {
        return Err("unexpected trailing input".to_string());
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expression.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{}'", literal))?;
                tokens.push(Token::Number(value));
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    // expression := term (('+' | '-') term)*
    fn parse_expression(&mut self) -> Result<f64, String> {
        let mut value = self.parse_term()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Plus => {
                    self.advance();
                    value += self.parse_term()?;
                }
                Token::Minus => {
                    self.advance();
                    value -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn parse_term(&mut self) -> Result<f64, String> {
        let mut value = self.parse_factor()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Star => {
                    self.advance();
                    value *= self.parse_factor()?;
                }
                Token::Slash => {
                    self.advance();
                    let divisor = self.parse_factor()?;
                    if divisor == 0.0 {
                        return Err("division by zero".to_string());
                    }
                    value /= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // factor := '-' factor | number | '(' expression ')'
    fn parse_factor(&mut self) -> Result<f64, String> {
        match self.advance() {
            Some(Token::Minus) => Ok(-self.parse_factor()?),
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.parse_expression()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected token {:?}", token)),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(input: &str) -> String {
        CalculatorTool.run(input).await
    }

    #[tokio::test]
    async fn integer_results_render_bare() {
        assert_eq!(run("2 + 2").await, "4");
        assert_eq!(run("(1 + 2) * 3").await, "9");
        assert_eq!(run("-5 + 2").await, "-3");
    }

    #[tokio::test]
    async fn fractional_results_render_to_four_places() {
        assert_eq!(run("10 / 4").await, "2.5000");
        assert_eq!(run("1 / 3").await, "0.3333");
        assert_eq!(run("3.5 * 2").await, "7");
    }

    #[tokio::test]
    async fn injected_code_is_stripped_before_evaluation() {
        // Letters and semicolons vanish in sanitization; only the
        // arithmetic core survives.
        assert_eq!(run("2+2; import os").await, "4");
        assert_eq!(run("abc(1+1)def").await, "2");
    }

    #[tokio::test]
    async fn precedence_and_nesting() {
        assert_eq!(run("2 + 3 * 4").await, "14");
        assert_eq!(run("(2 + 3) * 4").await, "20");
        assert_eq!(run("2 * (3 + (4 - 1))").await, "12");
    }

    #[tokio::test]
    async fn errors_come_back_as_strings() {
        assert!(run("1 / 0").await.starts_with("Error calculating"));
        assert!(run("(1 + 2").await.starts_with("Error calculating"));
        assert!(run("no numbers here").await.starts_with("Error calculating"));
        assert!(run("").await.starts_with("Error calculating"));
    }
}
