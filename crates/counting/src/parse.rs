//! Numeric-prefix extraction for submitted messages.

use std::sync::LazyLock;

use regex::Regex;

/// A submission counts only when the message *starts* with digits followed
/// by whitespace or end of input. "12 next!" submits 12; "12abc" submits
/// nothing.
static NUMERIC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)(\s|$)").unwrap_or_else(|e| panic!("{e}")));

/// Extract the submitted value from a message, if any.
///
/// Any leading digit run is a submission, even one too large for `u64`:
/// those saturate to `u64::MAX`, which no reachable counter expects, so the
/// sequence check fails them like any other wrong number.
pub fn submitted_value(text: &str) -> Option<u64> {
    let digits = NUMERIC_PREFIX.captures(text)?.get(1)?.as_str();
    Some(digits.parse().unwrap_or(u64::MAX))
}
