//! Input sanitization for the calculator.
//!
//! Turns whatever the user typed or pasted into the restricted arithmetic
//! alphabet understood by the evaluator: digits, `+ - * / ( ) .`.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    /// Multiplication signs, including the letter x used as a times sign.
    static ref TIMES_VARIANTS: Regex = Regex::new(r"[×✕✖xX]").unwrap();

    static ref DIVIDE_VARIANTS: Regex = Regex::new(r"[÷∕／]").unwrap();

    /// Minus sign, en/em dash, hyphen and non-breaking hyphen.
    static ref MINUS_VARIANTS: Regex = Regex::new(r"[−–—‐‑]").unwrap();

    static ref PLUS_VARIANTS: Regex = Regex::new(r"[＋﹢]").unwrap();

    /// Everything outside the evaluator's alphabet.
    static ref DISALLOWED: Regex = Regex::new(r"[^0-9+\-*/().]").unwrap();
}

/// Characters that may appear in a sanitized expression.
const ALLOWED_CHARS: &str = "0123456789+-*/().";

/// Returns `true` for the characters that may not end a sanitized expression.
pub fn is_operator_or_dot(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/' | '.')
}

/// Returns `true` for the characters stripped from the end of an expression.
///
/// A dangling `(` can never be closed, so it goes along with trailing
/// operators and dots.
fn is_dangling(c: char) -> bool {
    is_operator_or_dot(c) || c == '('
}

/// Returns `true` if `c` belongs to the sanitized alphabet.
pub fn is_allowed(c: char) -> bool {
    ALLOWED_CHARS.contains(c)
}

/// Normalize raw input into a sanitized expression.
///
/// The steps are, in order:
/// 1. NFKC normalization (fullwidth digits and operators become ASCII)
/// 2. Whitespace removal
/// 3. Mapping of known math symbol variants to `* / - +`
/// 4. Removal of every character outside `0-9 + - * / ( ) .`
/// 5. Stripping of trailing operators, dots and open parentheses, repeatedly
///
/// The result is either empty or ends in a digit or `)`. The function is
/// idempotent.
pub fn sanitize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let normalized: String = raw.nfkc().collect();
    let compact = WHITESPACE.replace_all(&normalized, "");

    let mapped = TIMES_VARIANTS.replace_all(&compact, "*");
    let mapped = DIVIDE_VARIANTS.replace_all(&mapped, "/");
    let mapped = MINUS_VARIANTS.replace_all(&mapped, "-");
    let mapped = PLUS_VARIANTS.replace_all(&mapped, "+");

    let filtered = DISALLOWED.replace_all(&mapped, "");

    filtered.trim_end_matches(is_dangling).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "2×3",
        "5++",
        "  12 + 7 ",
        "１２＋３４",
        "8÷2",
        "9−4",
        "hello world",
        "(2+3)*4.",
        "1.2.3",
        "3 x 4 X 5",
        "7﹢1",
        "10／2",
        "-.-.",
        "((",
        "🦀 42 🦀",
        "1e5",
        "２ × （３ ＋ ４）",
    ];

    #[test]
    fn test_unicode_times_sign() {
        assert_eq!(sanitize("2×3"), "2*3");
        assert_eq!(sanitize("2✕3✖4"), "2*3*4");
        assert_eq!(sanitize("3 x 4 X 5"), "3*4*5");
    }

    #[test]
    fn test_other_operator_variants() {
        assert_eq!(sanitize("8÷2"), "8/2");
        assert_eq!(sanitize("8∕2"), "8/2");
        assert_eq!(sanitize("10／2"), "10/2");
        assert_eq!(sanitize("9−4–1—1‐1‑1"), "9-4-1-1-1-1");
        assert_eq!(sanitize("7﹢1＋1"), "7+1+1");
    }

    #[test]
    fn test_fullwidth_forms_collapse() {
        assert_eq!(sanitize("１２＋３４"), "12+34");
        assert_eq!(sanitize("２ × （３ ＋ ４）"), "2*(3+4)");
    }

    #[test]
    fn test_whitespace_removed() {
        assert_eq!(sanitize("  12 + 7 "), "12+7");
        assert_eq!(sanitize("1\t+\n2"), "1+2");
    }

    #[test]
    fn test_disallowed_characters_dropped() {
        assert_eq!(sanitize("hello world"), "");
        assert_eq!(sanitize("🦀 42 🦀"), "42");
        assert_eq!(sanitize("1e5"), "15");
    }

    #[test]
    fn test_trailing_operators_stripped() {
        assert_eq!(sanitize("5++"), "5");
        assert_eq!(sanitize("(2+3)*4."), "(2+3)*4");
        assert_eq!(sanitize("-.-."), "");
        assert_eq!(sanitize("3*("), "3");
        assert_eq!(sanitize("(("), "");
        assert_eq!(sanitize("(1+2)*(+"), "(1+2)");
    }

    #[test]
    fn test_allowed_alphabet() {
        assert!("0123456789+-*/().".chars().all(is_allowed));
        assert!(!"x×１ e,%^".chars().any(is_allowed));
    }

    #[test]
    fn test_leading_operator_kept() {
        assert_eq!(sanitize("-5"), "-5");
    }

    #[test]
    fn test_idempotent() {
        for sample in SAMPLES {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "input: {sample:?}");
        }
    }

    #[test]
    fn test_output_alphabet_and_ending() {
        for sample in SAMPLES {
            let out = sanitize(sample);
            assert!(out.chars().all(is_allowed), "input: {sample:?}");
            if let Some(last) = out.chars().last() {
                assert!(last.is_ascii_digit() || last == ')', "input: {sample:?}");
            }
        }
    }
}
