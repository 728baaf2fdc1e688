use std::ops::Range;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// The query text is not a valid regular expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid regular expression: /{pattern}/: {reason}")]
pub struct PatternError {
    pattern: String,
    reason: String,
}

impl PatternError {
    fn from_regex(source: &str, error: regex::Error) -> Self {
        let reason = match &error {
            // Syntax errors render the pattern with a caret underneath; keep
            // only the trailing `error: ...` line for inline display.
            regex::Error::Syntax(detail) => detail
                .lines()
                .rev()
                .find_map(|line| line.trim().strip_prefix("error: "))
                .map(str::to_string)
                .unwrap_or_else(|| detail.trim().to_string()),
            other => other.to_string(),
        };
        Self {
            pattern: source.to_string(),
            reason,
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A compiled, case-insensitive search pattern.
///
/// Queries use `regex` crate syntax. Lookaround and backreferences are not
/// supported and are reported as a [`PatternError`].
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|error| PatternError::from_regex(source, error))?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Byte ranges of every non-empty match in `text`, scanning from offset 0.
    pub fn match_ranges<'p, 't>(&'p self, text: &'t str) -> MatchRanges<'p, 't> {
        MatchRanges {
            regex: &self.regex,
            text,
            position: 0,
        }
    }
}

pub struct MatchRanges<'p, 't> {
    regex: &'p Regex,
    text: &'t str,
    position: usize,
}

impl Iterator for MatchRanges<'_, '_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.position <= self.text.len() {
            let found = self.regex.find_at(self.text, self.position)?;
            if found.is_empty() {
                // Step over one character so empty matches cannot stall the scan.
                let step = self.text[found.start()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                self.position = found.start() + step;
                continue;
            }
            self.position = found.end();
            return Some(found.range());
        }
        None
    }
}
