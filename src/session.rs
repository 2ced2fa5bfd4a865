//! The calculate boundary between the input buffer and the collaborators.

use serde::Serialize;

use crate::calculator::{CalcResult, ExpressionBuffer, sanitize};
use crate::joke::{JokeRequest, Outcome};

/// Shown when nothing is left to calculate after sanitization.
pub const EMPTY_PROMPT: &str = "Enter a valid expression to calculate.";

/// Shown in the result field when evaluation fails.
pub const ERROR_DISPLAY: &str = "Error";

/// Everything the front end needs after a calculate action.
#[derive(Clone, Debug, Serialize)]
pub struct Calculation {
    /// The sanitized expression; empty if nothing was left.
    pub expression: String,
    /// Text for the result field: a number, "Error", or blank.
    pub display_result: String,
    /// Raw number for the clipboard, for successful calculations only.
    pub clipboard_result: Option<String>,
    /// Whether this is an error result.
    pub is_error: bool,
    /// Message to show in place of a joke, when no joke will be fetched.
    pub message: Option<String>,
    /// What to ask the joke teller about, if anything.
    pub joke_request: Option<JokeRequest>,
}

impl Calculation {
    fn empty() -> Self {
        Self {
            expression: String::new(),
            display_result: String::new(),
            clipboard_result: None,
            is_error: false,
            message: Some(EMPTY_PROMPT.to_string()),
            joke_request: None,
        }
    }

    fn from_calc_result(result: CalcResult) -> Self {
        match result {
            CalcResult::Success {
                expression,
                value,
                display_result,
                clipboard_result,
            } => Self {
                joke_request: Some(JokeRequest::new(expression.clone(), Outcome::Value(value))),
                expression,
                display_result,
                clipboard_result: Some(clipboard_result),
                is_error: false,
                message: None,
            },
            CalcResult::Error {
                expression,
                message,
                ..
            } => Self {
                joke_request: Some(JokeRequest::new(
                    expression.clone(),
                    Outcome::Failure(format!("{}: {}", ERROR_DISPLAY, message)),
                )),
                expression,
                display_result: ERROR_DISPLAY.to_string(),
                clipboard_result: None,
                is_error: true,
                message: None,
            },
        }
    }

    /// Text to copy: the raw number, or the displayed text for errors.
    pub fn text_for_clipboard(&self) -> &str {
        self.clipboard_result
            .as_deref()
            .unwrap_or(&self.display_result)
    }
}

/// One calculator: the expression being typed and the last result.
#[derive(Debug, Default)]
pub struct Session {
    buffer: ExpressionBuffer,
    last: Option<Calculation>,
    thousands_separators: bool,
}

impl Session {
    pub fn new(thousands_separators: bool) -> Self {
        Self {
            thousands_separators,
            ..Self::default()
        }
    }

    /// Append keystrokes; an operator typed after an operator replaces it.
    pub fn append(&mut self, value: &str) {
        self.buffer.append(value);
    }

    /// Append pasted text unchanged.
    pub fn paste(&mut self, value: &str) {
        self.buffer.push_str(value);
    }

    pub fn backspace(&mut self) {
        self.buffer.backspace();
    }

    /// Empty the buffer and forget the last result.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last = None;
    }

    pub fn pending(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn last(&self) -> Option<&Calculation> {
        self.last.as_ref()
    }

    /// Sanitize and evaluate the buffer, leaving it empty.
    pub fn calculate(&mut self) -> Calculation {
        let raw = self.buffer.take();
        let expression = sanitize(&raw);

        let calculation = if expression.is_empty() {
            Calculation::empty()
        } else {
            Calculation::from_calc_result(CalcResult::compute(
                &expression,
                self.thousands_separators,
            ))
        };

        tracing::debug!(
            raw = %raw,
            expression = %calculation.expression,
            result = %calculation.display_result,
            "Calculated"
        );

        self.last = Some(calculation.clone());
        calculation
    }
}
