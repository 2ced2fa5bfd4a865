//! Expression evaluation.
//!
//! A small recursive-descent parser over sanitized input. Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := number | '(' expr ')' | '-' factor
//! number := digit+ ('.' digit+)?
//! ```
//!
//! Results are formatted the way the calculator displays them.

use thiserror::Error;

use super::sanitize::is_allowed;

/// Deepest nesting of parentheses and unary minus accepted by the parser.
const MAX_DEPTH: usize = 256;

/// Why an expression could not be evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("nothing to calculate")]
    EmptyExpression,
    #[error("invalid character '{found}' at position {position}")]
    InvalidCharacter { found: char, position: usize },
    #[error("syntax error at position {position}: {reason}")]
    SyntaxError { position: usize, reason: &'static str },
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFiniteResult,
}

/// Evaluate a sanitized expression.
///
/// The character set is checked again here, so input that skipped the
/// sanitizer fails with [`EvalError::InvalidCharacter`] instead of reaching
/// the parser.
pub fn evaluate(expr: &str) -> Result<f64, EvalError> {
    if expr.is_empty() {
        return Err(EvalError::EmptyExpression);
    }

    // Position counts characters, not bytes. Past this check the input is
    // ASCII, so parser positions are character positions too.
    if let Some((position, found)) = expr.chars().enumerate().find(|&(_, c)| !is_allowed(c)) {
        return Err(EvalError::InvalidCharacter { found, position });
    }

    let mut parser = Parser::new(expr.as_bytes());
    let value = parser.expr(0)?;

    if parser.pos < parser.input.len() {
        let reason = if parser.peek() == Some(b')') {
            "unmatched ')'"
        } else {
            "unexpected character"
        };
        return Err(parser.syntax_error(reason));
    }

    if !value.is_finite() {
        return Err(EvalError::NonFiniteResult);
    }

    Ok(value)
}

/// Cursor over the ASCII bytes of a validated expression.
struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn syntax_error(&self, reason: &'static str) -> EvalError {
        EvalError::SyntaxError {
            position: self.pos,
            reason,
        }
    }

    fn expr(&mut self, depth: usize) -> Result<f64, EvalError> {
        let mut value = self.term(depth)?;

        while let Some(op @ (b'+' | b'-')) = self.peek() {
            self.pos += 1;
            let rhs = self.term(depth)?;
            if op == b'+' {
                value += rhs;
            } else {
                value -= rhs;
            }
        }

        Ok(value)
    }

    fn term(&mut self, depth: usize) -> Result<f64, EvalError> {
        let mut value = self.factor(depth)?;

        while let Some(op @ (b'*' | b'/')) = self.peek() {
            self.pos += 1;
            let rhs = self.factor(depth)?;
            if op == b'*' {
                value *= rhs;
            } else if rhs == 0.0 {
                return Err(EvalError::DivisionByZero);
            } else {
                value /= rhs;
            }
        }

        Ok(value)
    }

    fn factor(&mut self, depth: usize) -> Result<f64, EvalError> {
        if depth >= MAX_DEPTH {
            return Err(self.syntax_error("expression nested too deeply"));
        }

        match self.peek() {
            Some(b'0'..=b'9') => self.number(),
            Some(b'(') => {
                self.pos += 1;
                if self.peek() == Some(b')') {
                    return Err(self.syntax_error("empty parentheses"));
                }
                let value = self.expr(depth + 1)?;
                if self.peek() != Some(b')') {
                    return Err(self.syntax_error("missing ')'"));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(b'-') => {
                self.pos += 1;
                Ok(-self.factor(depth + 1)?)
            }
            Some(_) => Err(self.syntax_error("expected a number")),
            None => Err(self.syntax_error("unexpected end of expression")),
        }
    }

    fn number(&mut self) -> Result<f64, EvalError> {
        let start = self.pos;
        self.skip_digits();

        if self.peek() == Some(b'.') {
            self.pos += 1;
            let fraction_start = self.pos;
            self.skip_digits();
            if self.pos == fraction_start {
                return Err(self.syntax_error("expected digits after '.'"));
            }
        }

        if self.peek() == Some(b'.') {
            return Err(self.syntax_error("malformed number"));
        }

        // The slice holds only ASCII digits and at most one dot.
        std::str::from_utf8(&self.input[start..self.pos])
            .ok()
            .and_then(|literal| literal.parse::<f64>().ok())
            .ok_or(EvalError::SyntaxError {
                position: start,
                reason: "malformed number",
            })
    }

    fn skip_digits(&mut self) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
    }
}

/// Result of running a calculator expression through the evaluator.
#[derive(Clone, Debug)]
pub enum CalcResult {
    /// Successful calculation with a finite numeric result.
    Success {
        /// The sanitized expression.
        expression: String,
        /// The numeric value.
        value: f64,
        /// Formatted for display.
        display_result: String,
        /// Formatted for clipboard (raw number).
        clipboard_result: String,
    },
    /// The expression could not be evaluated.
    Error {
        /// The sanitized expression.
        expression: String,
        /// Human readable reason.
        message: String,
        error: EvalError,
    },
}

impl CalcResult {
    /// Evaluate `expression` and format the outcome.
    pub fn compute(expression: &str, thousands_separators: bool) -> Self {
        let expression = expression.to_string();

        match evaluate(&expression) {
            Ok(value) => Self::Success {
                display_result: format_display(value, thousands_separators),
                clipboard_result: format_clipboard(value),
                expression,
                value,
            },
            Err(error) => Self::Error {
                expression,
                message: error.to_string(),
                error,
            },
        }
    }

    /// Get the expression that was evaluated.
    pub fn expression(&self) -> &str {
        match self {
            Self::Success { expression, .. } => expression,
            Self::Error { expression, .. } => expression,
        }
    }

    /// Check if this is a successful result.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Get the display string (result or error message).
    pub fn display(&self) -> &str {
        match self {
            Self::Success { display_result, .. } => display_result,
            Self::Error { message, .. } => message,
        }
    }

    /// Get the clipboard string (only for successful results).
    pub fn clipboard(&self) -> Option<&str> {
        match self {
            Self::Success {
                clipboard_result, ..
            } => Some(clipboard_result),
            Self::Error { .. } => None,
        }
    }
}

/// Format a number for display, optionally with thousand separators.
pub fn format_display(value: f64, thousands_separators: bool) -> String {
    let raw = format_clipboard(value);
    if !thousands_separators || value.abs() >= 1e15 {
        return raw;
    }

    let (sign, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (int_part, dec_part) = match unsigned.find('.') {
        Some(dot_pos) => unsigned.split_at(dot_pos),
        None => (unsigned, ""),
    };

    format!("{}{}{}", sign, group_thousands(int_part), dec_part)
}

/// Insert a comma every three digits, counting from the right.
fn group_thousands(digits: &str) -> String {
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a number for clipboard (raw number, no separators).
pub fn format_clipboard(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        // Integer cast also turns -0 into 0.
        format!("{}", value as i64)
    } else if value.abs() >= 1e15 {
        format!("{}", value)
    } else {
        let formatted = format!("{:.10}", value);
        let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
        if trimmed == "-0" {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }
}
