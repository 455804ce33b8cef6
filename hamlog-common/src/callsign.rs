//! Callsign normalization and validation
//!
//! Every callsign that becomes a cache key, a stored QSO field, or a value
//! returned to a client goes through [`normalize`] first.

/// Maximum stored callsign length (prefixes and `/P`, `/QRP` suffixes included)
pub const MAX_CALLSIGN_LEN: usize = 20;

/// Minimum stored callsign length
pub const MIN_CALLSIGN_LEN: usize = 2;

/// Upper-case and trim a callsign
///
/// # Examples
///
/// ```
/// use hamlog_common::callsign::normalize;
///
/// assert_eq!(normalize("  w1aw "), "W1AW");
/// assert_eq!(normalize("dl3foo/p"), "DL3FOO/P");
/// ```
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Check that a callsign has a loggable shape
///
/// Accepts 2 to 20 characters of ASCII letters, digits and `/`.
/// The check is applied to the trimmed value.
pub fn is_valid(raw: &str) -> bool {
    let call = raw.trim();
    let len = call.chars().count();
    (MIN_CALLSIGN_LEN..=MAX_CALLSIGN_LEN).contains(&len)
        && call.chars().all(|c| c.is_ascii_alphanumeric() || c == '/')
}
