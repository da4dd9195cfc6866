//! Formatting of slicer duration strings into compact clock strings.
//!
//! PrusaSlicer reports estimated print time as free text such as
//! `1d 2h 3m 4s` (descending units, any subset present). Printer screens
//! have very little room, so the value is condensed to `DDd HH:MM[:SS]`.

use regex::Regex;
use std::sync::OnceLock;

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*(\d+)\s*([dhms])").unwrap())
}

/// Formats a free-text duration into a colon-joined clock string.
///
/// Days are rendered literally (`3d `), hours and minutes as zero-padded
/// two-digit groups joined by `:`. With `short` set, seconds are dropped
/// (truncated, not rounded). An empty input yields an empty output.
///
/// ```
/// use neptune_thumb_core::duration::format_duration;
///
/// assert_eq!(format_duration("1d 2h 3m 4s", true), "1d 02:03");
/// assert_eq!(format_duration("5m 10s", true), "00:05");
/// assert_eq!(format_duration("", true), "");
/// ```
pub fn format_duration(raw: &str, short: bool) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let substituted = token_regex().replace_all(raw, |caps: &regex::Captures| {
        let n: u64 = caps[1].parse().unwrap_or(0);
        match &caps[2] {
            "d" => format!("{}d ", n),
            "s" if short => String::new(),
            _ => format!(":{:02}", n),
        }
    });

    let cleaned = substituted.replace(" :", " ");
    let cleaned = cleaned.trim_matches([':', ' ']);
    if cleaned.contains(':') {
        cleaned.to_string()
    } else {
        format!("00:{}", cleaned)
    }
}
