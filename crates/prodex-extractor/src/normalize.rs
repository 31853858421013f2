//! Field normalization shared by every parser stage.
//!
//! Prices arrive as JSON numbers, JSON strings, meta-tag text, or free text
//! such as `"1,299.50 ر.س"`; all of them funnel through [`parse_price_text`]
//! so the cascade produces the same `Decimal` no matter which stage wins.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::LazyLock;

use prodex_core::Availability;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;

static NUMBER_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9][0-9,]*(?:\.[0-9]+)?").expect("valid number regex"));

/// Rewrites Arabic-Indic and Extended Arabic-Indic digits to ASCII, along
/// with the Arabic decimal (`٫`) and thousands (`٬`) separators.
///
/// Borrows when the input is already ASCII-only in those positions.
#[must_use]
pub fn normalize_digits(text: &str) -> Cow<'_, str> {
    if !text.chars().any(is_arabic_numeric) {
        return Cow::Borrowed(text);
    }

    Cow::Owned(
        text.chars()
            .map(|c| match c {
                '\u{0660}'..='\u{0669}' => ascii_digit(u32::from(c) - 0x0660),
                '\u{06F0}'..='\u{06F9}' => ascii_digit(u32::from(c) - 0x06F0),
                '\u{066B}' => '.',
                '\u{066C}' => ',',
                other => other,
            })
            .collect(),
    )
}

fn is_arabic_numeric(c: char) -> bool {
    matches!(c, '\u{0660}'..='\u{0669}' | '\u{06F0}'..='\u{06F9}' | '\u{066B}' | '\u{066C}')
}

fn ascii_digit(offset: u32) -> char {
    char::from_digit(offset, 10).unwrap_or('0')
}

/// Parses a price written with optional comma thousands separators.
///
/// Commas and surrounding whitespace are stripped before conversion.
/// Negative and unparseable values yield `None`.
#[must_use]
pub fn parse_price_text(raw: &str) -> Option<Decimal> {
    let digits = normalize_digits(raw);
    let cleaned: String = digits
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let value = Decimal::from_str(&cleaned).ok()?;
    if value.is_sign_negative() {
        return None;
    }
    Some(value.normalize())
}

/// Pulls the first number out of display text such as `"SAR 1,299.50"` or
/// `"ر.س ٤٩٫٠٠"` and parses it, ignoring currency words and symbols.
#[must_use]
pub fn parse_price_display(text: &str) -> Option<Decimal> {
    let digits = normalize_digits(text);
    NUMBER_RUN_RE
        .find(&digits)
        .and_then(|m| parse_price_text(m.as_str()))
}

/// Reads a price from a JSON payload field that may be a number or a string.
#[must_use]
pub fn parse_price_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_price_text(&n.to_string()),
        Value::String(s) => parse_price_text(s),
        _ => None,
    }
}

/// Reduces a machine-readable availability value to its trailing path
/// segment (`"https://schema.org/InStock"` → `"InStock"`) and classifies it.
///
/// Returns `None` when nothing is left after trimming.
#[must_use]
pub fn availability_from_uri(raw: &str) -> Option<Availability> {
    let token = raw
        .trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if token.is_empty() {
        None
    } else {
        Some(Availability::from_token(token))
    }
}

/// Collapses internal whitespace runs to single spaces and trims the result.
#[must_use]
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the cleaned text, or `None` when it is empty.
#[must_use]
pub fn non_empty(text: &str) -> Option<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Returns the trimmed text, or `None` when it is empty. Unlike
/// [`non_empty`], internal whitespace is preserved.
#[must_use]
pub fn trimmed(text: &str) -> Option<String> {
    let t = text.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
