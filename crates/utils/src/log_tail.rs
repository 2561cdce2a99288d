//! Bounded tail of a build's console output.
//!
//! A [`LogTail`] holds at most N of the most recent console lines, oldest
//! first. Hosts produce it; excerpt extraction only ever reads it.

use std::{collections::VecDeque, io::BufRead};

use serde::{Deserialize, Serialize};

/// Number of trailing console lines considered when a build fails.
pub const DEFAULT_TAIL_LINES: usize = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogTail {
    lines: Vec<String>,
}

impl LogTail {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Stream `reader` to the end, keeping only the last `limit` lines.
    ///
    /// Line terminators (`\n` and `\r\n`) are stripped.
    pub fn read_last_lines<R: BufRead>(reader: R, limit: usize) -> std::io::Result<Self> {
        if limit == 0 {
            return Ok(Self::default());
        }

        // `limit` is caller-supplied; grow on demand past the usual tail size.
        let mut window: VecDeque<String> = VecDeque::with_capacity(limit.min(DEFAULT_TAIL_LINES));
        for line in reader.lines() {
            let line = line?;
            if window.len() == limit {
                window.pop_front();
            }
            window.push_back(line);
        }

        Ok(Self {
            lines: window.into(),
        })
    }

    pub fn from_text(text: &str, limit: usize) -> Self {
        let skip = text.lines().count().saturating_sub(limit);
        Self::from_lines(text.lines().skip(skip))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl FromIterator<String> for LogTail {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a LogTail {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}
