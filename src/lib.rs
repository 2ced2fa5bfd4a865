//! A calculator that tells a joke about every calculation.
//!
//! The [`calculator`] module is the pure core: it turns raw keyboard input
//! into a restricted arithmetic expression and evaluates it with a
//! recursive-descent parser. [`session`] ties it to an input buffer, while
//! [`joke`] and [`speech`] are the collaborators that run afterwards.

pub mod calculator;
pub mod config;
pub mod joke;
pub mod session;
pub mod speech;

pub use calculator::{EvalError, evaluate, sanitize};
pub use session::{Calculation, Session};
