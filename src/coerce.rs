//! Coerce-or-default helpers.
//!
//! Every monetary and quantity field pulled from untrusted or partial
//! input goes through [`safe_parse_f64`] before any arithmetic.  A
//! price preview must never fail because of a malformed value, so
//! anything that does not parse to a finite number becomes `0.0`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Monetary aggregates are rounded to this many decimal places.
pub const MONEY_DECIMAL_PLACES: u32 = 2;

/// Convert any JSON value intended as a number to a finite `f64`.
///
/// * finite numbers pass through
/// * strings are parsed from their longest leading decimal prefix, so
///   `" 12.50 EUR"` yields `12.5`
/// * everything else, including non-finite results, yields `0.0`
pub fn safe_parse_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal_prefix(s),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Same as [`safe_parse_f64`] for an optional field.
pub fn safe_parse_opt(value: Option<&Value>) -> f64 {
    value.map(safe_parse_f64).unwrap_or(0.0)
}

/// Loose truthiness for flags and "is this field set" checks.
///
/// `null`, `false`, `0`, `NaN`-like numbers and the empty string are
/// false; every other value is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Round to two decimal places, half away from zero, on the exact
/// binary value of `value`.
///
/// Values outside the range of [`Decimal`] are returned unchanged.
pub fn round_money(value: f64) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Longest `[+-]digits[.digits][(e|E)[+-]digits]` prefix after leading
/// whitespace.
fn parse_decimal_prefix(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    // Only consume an exponent when it has at least one digit.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}
