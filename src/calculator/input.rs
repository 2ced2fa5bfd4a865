//! The live-edited expression, before it is sanitized.

use super::sanitize::is_operator_or_dot;

/// Text entered so far via keystrokes or button presses.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpressionBuffer {
    text: String,
}

impl ExpressionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single key or button value.
    ///
    /// Two operator characters never end up next to each other: when the
    /// buffer ends in an operator and `c` is one too, `c` replaces it.
    pub fn push(&mut self, c: char) {
        if is_operator_or_dot(c) && self.text.ends_with(is_operator_or_dot) {
            self.text.pop();
        }
        self.text.push(c);
    }

    /// Append every character of `value`, as if typed one at a time.
    pub fn append(&mut self, value: &str) {
        for c in value.chars() {
            self.push(c);
        }
    }

    /// Append `value` verbatim, as pasted text.
    ///
    /// Pasted expressions keep sequences like `*-` that the keystroke guard
    /// would collapse.
    pub fn push_str(&mut self, value: &str) {
        self.text.push_str(value);
    }

    /// Remove the last character, if any.
    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    /// Return the contents and leave the buffer empty.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}
