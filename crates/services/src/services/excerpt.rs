//! Console excerpt extraction for failed builds.
//!
//! Given the tail of a failed build's console log, keep only the window that
//! belongs to the failing build attempt:
//!
//! - blank lines are dropped
//! - a restart marker (`Building ... in workspace ...`) discards everything
//!   retained before it
//! - a failure marker (`' marked build as failure`) ends the window; the line
//!   itself is kept, everything after it is dropped
//!
//! Markers are matched by substring containment, so unrelated output that
//! happens to contain a marker string moves the window too. Matching runs on
//! the line as emitted; only blank detection looks at trimmed content.

use std::{fmt, io};

use serde::{Deserialize, Serialize};
use utils::log_tail::LogTail;

/// Both substrings must be present for a line to count as a restart marker.
pub const RESTART_MARKER_BUILDING: &str = "Building ";
pub const RESTART_MARKER_WORKSPACE: &str = " in workspace ";
pub const FAILURE_MARKER: &str = "' marked build as failure";

/// Relevant lines of a failed build's console tail, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Excerpt {
    lines: Vec<String>,
}

impl Excerpt {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Write every line followed by `\n`. No escaping is applied.
    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        for line in &self.lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Excerpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

pub fn is_restart_marker(line: &str) -> bool {
    line.contains(RESTART_MARKER_BUILDING) && line.contains(RESTART_MARKER_WORKSPACE)
}

pub fn is_failure_marker(line: &str) -> bool {
    line.contains(FAILURE_MARKER)
}

/// Single pass over `tail`; total over any input.
pub fn extract(tail: &LogTail) -> Excerpt {
    let mut retained: Vec<String> = Vec::with_capacity(tail.len());

    for line in tail.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if is_restart_marker(line) {
            retained.clear();
        }

        retained.push(line.clone());

        if is_failure_marker(line) {
            break;
        }
    }

    Excerpt { lines: retained }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tail(lines: &[&str]) -> LogTail {
        LogTail::from_lines(lines.iter().copied())
    }

    #[test]
    fn test_restart_marker_discards_preceding_lines() {
        let excerpt = extract(&tail(&["keep-me", "Building X in workspace Y", "after"]));
        assert_eq!(excerpt.lines(), &["Building X in workspace Y", "after"]);
    }

    #[test]
    fn test_failure_marker_stops_processing() {
        let excerpt = extract(&tail(&["a", "'job' marked build as failure", "b", "c"]));
        assert_eq!(excerpt.lines(), &["a", "'job' marked build as failure"]);
    }

    #[test]
    fn test_no_markers_keeps_everything() {
        let excerpt = extract(&tail(&["x", "y", "z"]));
        assert_eq!(excerpt.lines(), &["x", "y", "z"]);
    }

    #[test]
    fn test_empty_tail() {
        assert!(extract(&LogTail::default()).is_empty());
    }

    #[test]
    fn test_blank_lines_are_dropped() {
        let excerpt = extract(&tail(&["", "a", "   ", "\t", "b", " "]));
        assert_eq!(excerpt.lines(), &["a", "b"]);
    }

    #[test]
    fn test_blank_lines_do_not_shift_markers() {
        let with_blanks = extract(&tail(&[
            "old",
            "",
            "Building p in workspace /w",
            "  ",
            "step",
            "",
            "'p' marked build as failure",
            "",
            "after",
        ]));
        let without_blanks = extract(&tail(&[
            "old",
            "Building p in workspace /w",
            "step",
            "'p' marked build as failure",
            "after",
        ]));
        assert_eq!(with_blanks, without_blanks);
    }

    #[test]
    fn test_last_restart_marker_wins() {
        let excerpt = extract(&tail(&[
            "Building p in workspace /w",
            "attempt 1 failed",
            "Building p in workspace /w",
            "attempt 2",
            "'p' marked build as failure",
        ]));
        assert_eq!(
            excerpt.lines(),
            &[
                "Building p in workspace /w",
                "attempt 2",
                "'p' marked build as failure"
            ]
        );
    }

    #[test]
    fn test_restart_after_failure_marker_is_ignored() {
        let excerpt = extract(&tail(&[
            "a",
            "'p' marked build as failure",
            "Building p in workspace /w",
        ]));
        assert_eq!(excerpt.lines(), &["a", "'p' marked build as failure"]);
    }

    #[test]
    fn test_both_markers_on_one_line() {
        let line = "Building p in workspace /w: 'p' marked build as failure";
        let excerpt = extract(&tail(&["before", line, "after"]));
        assert_eq!(excerpt.lines(), &[line]);
    }

    #[test]
    fn test_restart_marker_needs_both_substrings() {
        assert!(!is_restart_marker("Building p"));
        assert!(!is_restart_marker("p in workspace /w"));
        assert!(is_restart_marker("[INFO] Building p in workspace /w"));
    }

    #[test]
    fn test_markers_match_anywhere_in_line() {
        // Incidental text counts as a marker.
        let excerpt = extract(&tail(&[
            "a",
            "echo \"Building docs in workspace tmp\"",
            "b",
        ]));
        assert_eq!(excerpt.lines(), &["echo \"Building docs in workspace tmp\"", "b"]);
    }

    #[test]
    fn test_lines_are_kept_untrimmed() {
        let excerpt = extract(&tail(&["  indented  ", "\ttabbed"]));
        assert_eq!(excerpt.lines(), &["  indented  ", "\ttabbed"]);
    }

    #[test]
    fn test_extract_is_deterministic() {
        let input = tail(&[
            "Started",
            "Building p in workspace /w",
            "x",
            "'p' marked build as failure",
        ]);
        assert_eq!(extract(&input), extract(&input));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let excerpt = extract(&tail(&[
            "Started",
            "Building proj in workspace /w",
            "step1 ok",
            "",
            "step2 failed",
            "'proj' marked build as failure",
            "ignored tail",
        ]));
        assert_eq!(
            excerpt.lines(),
            &[
                "Building proj in workspace /w",
                "step1 ok",
                "step2 failed",
                "'proj' marked build as failure"
            ]
        );
    }

    #[test]
    fn test_render_is_newline_terminated() {
        let excerpt = extract(&tail(&["a <b>", "c & d"]));
        let mut out = Vec::new();
        excerpt.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a <b>\nc & d\n");
        assert_eq!(excerpt.to_text(), "a <b>\nc & d\n");
        assert_eq!(Excerpt::default().to_text(), "");
    }

    #[test]
    fn test_serializes_as_array_of_lines() {
        let excerpt = extract(&tail(&["one", "two"]));
        assert_eq!(serde_json::to_string(&excerpt).unwrap(), r#"["one","two"]"#);
    }
}
