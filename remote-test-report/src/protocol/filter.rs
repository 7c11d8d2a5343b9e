// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use aho_corasick::{AhoCorasick, BuildError};

/// Drops stack-trace lines that point into test framework internals.
///
/// A line is dropped if it contains any of the configured substrings. A filter
/// built from an empty pattern list keeps every line.
#[derive(Clone, Debug, Default)]
pub struct StackTraceFilter {
    matcher: Option<AhoCorasick>,
}

impl StackTraceFilter {
    /// Builds a filter from a list of substrings.
    pub fn new<I, P>(patterns: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        let patterns: Vec<P> = patterns.into_iter().collect();
        if patterns.is_empty() {
            return Ok(Self::disabled());
        }
        let matcher = AhoCorasick::new(patterns)?;
        Ok(Self {
            matcher: Some(matcher),
        })
    }

    /// Returns a filter that keeps every line.
    pub fn disabled() -> Self {
        Self { matcher: None }
    }

    /// Returns true if this filter can drop lines.
    pub fn is_enabled(&self) -> bool {
        self.matcher.is_some()
    }

    /// Returns true if `line` should be kept.
    pub fn keep(&self, line: &str) -> bool {
        match &self.matcher {
            Some(matcher) => !matcher.is_match(line),
            None => true,
        }
    }

    /// Filters a multi-line trace. Retained lines keep their line endings.
    pub fn filter_trace(&self, trace: &str) -> String {
        if !self.is_enabled() {
            return trace.to_owned();
        }
        trace
            .split_inclusive('\n')
            .filter(|line| self.keep(line))
            .collect()
    }
}
