//! Calculator core.
//!
//! This module provides functionality to:
//! - Hold the expression being typed
//! - Sanitize raw input into a restricted arithmetic alphabet
//! - Evaluate sanitized expressions without executing anything
//! - Copy results to the clipboard

mod clipboard;
mod evaluation;
mod input;
mod sanitize;

pub use clipboard::copy_to_clipboard;
pub use evaluation::{CalcResult, EvalError, evaluate, format_clipboard};
pub use input::ExpressionBuffer;
pub use sanitize::sanitize;
