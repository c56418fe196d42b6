//! Numeric shorthand normalization.
//!
//! Filter text from the upstream extractor often carries human shorthand:
//! `100M`, `1.5K`, `$2B`, `3,000`. Comparisons must use the expanded
//! numeric value, so parsing happens before any literal reaches the AST.

use once_cell::sync::Lazy;
use regex::Regex;

use super::expr::{lit_float, lit_int, Expr};

static SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    // Optional currency symbol, digits with optional thousands separators,
    // optional decimal part, optional magnitude suffix.
    Regex::new(r"^[\$€£]?\s*(\d{1,3}(?:,\d{3})+|\d+)(\.\d+)?\s*([kKmMbBtT])?$").unwrap()
});

/// A normalized numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Convert to a literal expression.
    pub fn to_expr(self) -> Expr {
        match self {
            Number::Int(n) => lit_int(n),
            Number::Float(f) => lit_float(f),
        }
    }
}

/// Parse a numeric string with optional shorthand into its expansion.
///
/// Returns `None` when the text is not numeric at all - callers treat that
/// as an unparsable filter term, never as a string to interpolate.
///
/// ```
/// use sqlloom::sql::numeric::{parse_number, Number};
///
/// assert_eq!(parse_number("100M"), Some(Number::Int(100_000_000)));
/// assert_eq!(parse_number("1.5K"), Some(Number::Int(1_500)));
/// assert_eq!(parse_number("$2B"), Some(Number::Int(2_000_000_000)));
/// assert_eq!(parse_number("3,000"), Some(Number::Int(3_000)));
/// assert_eq!(parse_number("12.75"), Some(Number::Float(12.75)));
/// assert_eq!(parse_number("equity"), None);
/// ```
pub fn parse_number(text: &str) -> Option<Number> {
    let caps = SHORTHAND.captures(text.trim())?;

    let digits: String = caps[1].chars().filter(|c| *c != ',').collect();
    let whole: f64 = digits.parse().ok()?;
    let frac: f64 = caps
        .get(2)
        .map(|m| format!("0{}", m.as_str()).parse().unwrap_or(0.0))
        .unwrap_or(0.0);
    let value = whole + frac;

    let multiplier: f64 = match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(s) if s == "k" => 1e3,
        Some(s) if s == "m" => 1e6,
        Some(s) if s == "b" => 1e9,
        Some(s) if s == "t" => 1e12,
        _ => 1.0,
    };

    let expanded = value * multiplier;
    // Absurdly long digit strings overflow f64 to infinity, which the
    // token layer refuses to serialize.
    if !expanded.is_finite() {
        return None;
    }
    if expanded.fract() == 0.0 && expanded.abs() < i64::MAX as f64 {
        Some(Number::Int(expanded as i64))
    } else {
        Some(Number::Float(expanded))
    }
}
