//! Print-progress rewrite state for `M73` remaining-time commands.
//!
//! PrusaSlicer emits `M73 P<percent> R<minutes-remaining>` throughout the
//! file. Neptune firmware instead reads `;TIME:<seconds>` (total) and
//! `;TIME_ELAPSED:<seconds>` comments, the latter at layer boundaries.

use regex::Regex;
use std::sync::OnceLock;

const M73_PREFIX: &str = "M73 P";
const LAYER_CHANGE_MARKER: &str = ";LAYER_CHANGE";

fn m73_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^M73 P[0-9.]+ R(\d+)\b").unwrap())
}

/// Scan-through accumulator for the time-progress rewrite.
///
/// Lives only for the duration of one body-copy pass. The first `M73`
/// observed fixes the total duration and emits `;TIME:` right before it;
/// every later `M73` updates the pending elapsed time, which is flushed as
/// `;TIME_ELAPSED:` right before the next `;LAYER_CHANGE` line.
#[derive(Debug, Default)]
pub struct TimeProgressState {
    total_duration_seconds: Option<i64>,
    pending_elapsed_seconds: Option<i64>,
}

impl TimeProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the comment line to emit immediately before `line`, if any.
    pub fn rewrite(&mut self, line: &str) -> Option<String> {
        if line.starts_with(M73_PREFIX) {
            let minutes: i64 = m73_regex()
                .captures(line)
                .and_then(|c| c[1].parse().ok())?;
            let remaining = minutes * 60;
            match self.total_duration_seconds {
                None => {
                    self.total_duration_seconds = Some(remaining);
                    return Some(format!(";TIME:{}", remaining));
                }
                Some(total) => {
                    self.pending_elapsed_seconds = Some(total - remaining);
                }
            }
        } else if line.starts_with(LAYER_CHANGE_MARKER) {
            if let Some(elapsed) = self.pending_elapsed_seconds.take() {
                return Some(format!(";TIME_ELAPSED:{}", elapsed));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_m73_sets_total() {
        let mut state = TimeProgressState::new();
        assert_eq!(state.rewrite("M73 P10 R50").as_deref(), Some(";TIME:3000"));
    }

    #[test]
    fn test_elapsed_flushed_at_layer_change() {
        let mut state = TimeProgressState::new();
        assert_eq!(state.rewrite("M73 P10 R50").as_deref(), Some(";TIME:3000"));
        assert_eq!(state.rewrite("M73 P20 R40"), None);
        assert_eq!(state.rewrite("G1 X1 Y1"), None);
        assert_eq!(
            state.rewrite(";LAYER_CHANGE").as_deref(),
            Some(";TIME_ELAPSED:600")
        );
        // Flushed once, not repeated at the next boundary.
        assert_eq!(state.rewrite(";LAYER_CHANGE"), None);
    }

    #[test]
    fn test_last_m73_before_boundary_wins() {
        let mut state = TimeProgressState::new();
        state.rewrite("M73 P0 R100");
        state.rewrite("M73 P5 R95");
        state.rewrite("M73 P10 R90");
        assert_eq!(
            state.rewrite(";LAYER_CHANGE").as_deref(),
            Some(";TIME_ELAPSED:600")
        );
    }

    #[test]
    fn test_non_m73_lines_ignored() {
        let mut state = TimeProgressState::new();
        assert_eq!(state.rewrite("G1 X1 Y1 E0.5"), None);
        assert_eq!(state.rewrite("; comment"), None);
        assert_eq!(state.rewrite(";LAYER_CHANGE"), None);
    }

    #[test]
    fn test_malformed_m73_passes_through() {
        let mut state = TimeProgressState::new();
        assert_eq!(state.rewrite("M73 P10"), None);
        assert_eq!(state.rewrite("M73 P10 Rabc"), None);
    }
}
