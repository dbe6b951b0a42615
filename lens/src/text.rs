//! Comparison-key normalization for station, line and company labels.
//!
//! The output is only ever used as a join key and is never displayed.

use serde_json::Value;

const FULLWIDTH_START: char = '\u{FF01}';
const FULLWIDTH_END: char = '\u{FF5E}';
const FULLWIDTH_OFFSET: u32 = 0xFEE0;
const IDEOGRAPHIC_SPACE: char = '\u{3000}';

/// Folds full-width ASCII variants to half-width, lowercases ASCII letters
/// and strips ASCII and ideographic spaces. Kana are left untouched.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| *c != ' ' && *c != IDEOGRAPHIC_SPACE)
        .map(|c| fold_width(c).to_ascii_lowercase())
        .collect()
}

/// Normalizes a JSON cell. Anything other than a string becomes `""`.
pub fn normalize_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => normalize_text(s),
        _ => String::new(),
    }
}

fn fold_width(c: char) -> char {
    if (FULLWIDTH_START..=FULLWIDTH_END).contains(&c) {
        char::from_u32(c as u32 - FULLWIDTH_OFFSET).unwrap_or(c)
    } else {
        c
    }
}
