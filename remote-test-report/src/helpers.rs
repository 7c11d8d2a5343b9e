// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for remote-test-report.

use std::{fmt, time::Duration};

/// Utilities for pluralizing various words based on count or plurality.
pub(crate) mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub(crate) fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "assumption failure" if `count` is 1, otherwise "assumption failures".
    pub(crate) fn assumption_failures_str(count: usize) -> &'static str {
        if count == 1 {
            "assumption failure"
        } else {
            "assumption failures"
        }
    }

    /// Returns "suite failure" if `count` is 1, otherwise "suite failures".
    pub(crate) fn suite_failures_str(count: usize) -> &'static str {
        if count == 1 {
            "suite failure"
        } else {
            "suite failures"
        }
    }
}

/// Displays a per-test runtime as fractional seconds.
pub(crate) struct DisplayRuntime(pub(crate) Duration);

impl fmt::Display for DisplayRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // .3 means print three digits after the decimal point.
        write!(f, "{:.3}s", self.0.as_secs_f64())
    }
}

/// Displays a total run time in whole milliseconds, the unit the JUnit runner
/// reports it in.
pub(crate) struct DisplayElapsedMillis(pub(crate) Duration);

impl fmt::Display for DisplayElapsedMillis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ms", self.0.as_millis())
    }
}

/// Splits `input` on unescaped commas, unescaping `\,` along the way.
///
/// The Eclipse runner escapes commas that appear inside names this way.
pub(crate) fn split_escaped_commas(input: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&',') => {
                current.push(',');
                chars.next();
            }
            ',' => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Removes a trailing `\n` or `\r\n` from `line`.
pub(crate) fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
