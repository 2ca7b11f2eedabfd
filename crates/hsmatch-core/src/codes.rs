//! HS code prefix helpers and confidence normalisation.
//!
//! HS codes nest by prefix: the first 2 digits are the chapter, the first 4
//! the heading, and the full 10 digits the national tariff line. Prefixes are
//! compared as plain strings, so a code is only ever truncated, never parsed.

/// First 2 characters of a code, or `None` if the code is shorter.
pub fn two_digit(code: &str) -> Option<&str> {
    code.get(..2)
}

/// First 4 characters of a code, or `None` if the code is shorter.
pub fn four_digit(code: &str) -> Option<&str> {
    code.get(..4)
}

/// Whether `code` is exactly 4 ASCII digits (a heading code).
pub fn is_heading_code(code: &str) -> bool {
    code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Keep only the ASCII digits of a code as printed by reference sources
/// (e.g. `"8471.30-0000"` → `"8471300000"`).
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Round a score to 3 decimal places and clamp it into `[0, 1]`.
///
/// Non-finite input maps to `0.0`.
pub fn round_confidence(score: f32) -> f32 {
    if !score.is_finite() {
        return 0.0;
    }
    ((score * 1000.0).round() / 1000.0).clamp(0.0, 1.0)
}
