// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Renders a finished run as a markdown-like report.
//!
//! The report is a heading, the time the session started, one nested list item
//! per test (with failure details under failed tests), and a summary footer.
//! Rendering doesn't touch any state outside its arguments, so rendering the
//! same run twice produces the same text.

use crate::{
    helpers::{DisplayElapsedMillis, DisplayRuntime, plural},
    indenter::indented,
    model::{RunSummary, Test},
    protocol::{DecodedRun, ProtocolKind},
};
use chrono::{DateTime, FixedOffset, SecondsFormat};
use std::fmt;
use swrite::{SWrite, swrite};

/// Glyph for a test that passed, or that never ran.
pub const SUCCESS_GLYPH: char = '\u{2714}';

/// Glyph for a test that failed, or a suite containing a failed test.
pub const FAILURE_GLYPH: char = '\u{2718}';

/// Glyph for a test whose assumptions didn't hold.
pub const ASSUMPTION_FAILURE_GLYPH: char = '\u{26a0}';

/// Report metadata that doesn't come from the runner.
#[derive(Clone, Debug)]
pub struct ReportHeader {
    /// The heading at the top of the report.
    pub title: String,

    /// The protocol the runner spoke.
    pub protocol: ProtocolKind,

    /// When the listener session started.
    pub started_at: DateTime<FixedOffset>,
}

/// Renders `run` as a report.
pub fn render(run: &DecodedRun, header: &ReportHeader) -> String {
    Report { run, header }.to_string()
}

struct Report<'a> {
    run: &'a DecodedRun,
    header: &'a ReportHeader,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# {}", self.header.title)?;
        writeln!(f)?;
        writeln!(
            f,
            "Started at {}",
            self.header
                .started_at
                .to_rfc3339_opts(SecondsFormat::Secs, false)
        )?;
        writeln!(f)?;

        let container = &self.run.container;
        if container.is_empty() {
            writeln!(f, "No test results were received.")?;
        } else {
            for (depth, test) in container.walk() {
                write_test(f, depth, test)?;
            }
        }
        writeln!(f)?;

        self.write_footer(f)
    }
}

impl Report<'_> {
    fn write_footer(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = RunSummary::new(&self.run.container);

        match self.run.expected_count {
            Some(expected) if expected != summary.tests => write!(
                f,
                "Ran {} of {expected} {}",
                summary.tests,
                plural::tests_str(expected)
            )?,
            _ => write!(
                f,
                "Ran {} {}",
                summary.tests,
                plural::tests_str(summary.tests)
            )?,
        }
        write!(
            f,
            ": {} passed, {} failed, {} skipped",
            summary.passed, summary.failed, summary.skipped
        )?;
        if summary.assumption_failures > 0 {
            write!(
                f,
                ", {} {}",
                summary.assumption_failures,
                plural::assumption_failures_str(summary.assumption_failures)
            )?;
        }
        if summary.suite_failures > 0 {
            write!(
                f,
                ", {} {}",
                summary.suite_failures,
                plural::suite_failures_str(summary.suite_failures)
            )?;
        }
        writeln!(f)?;

        if self.run.stopped {
            writeln!(f, "Run stopped before completion")?;
        }
        if let Some(elapsed) = self.run.elapsed {
            writeln!(f, "Total time: {}", DisplayElapsedMillis(elapsed))?;
        }

        Ok(())
    }
}

fn write_test(f: &mut fmt::Formatter<'_>, depth: usize, test: &Test) -> fmt::Result {
    let indent = "  ".repeat(depth);
    write!(f, "{indent}- {} {}", glyph(test), test.label())?;
    let tags = tags(test);
    if !tags.is_empty() {
        write!(f, " ({tags})")?;
    }
    writeln!(f)?;

    if test.is_failed() || test.is_assumption_failed() {
        let details_indent = "  ".repeat(depth + 1);
        write_details(&mut indented(f).with_str(&details_indent), test)?;
    }

    Ok(())
}

fn glyph(test: &Test) -> char {
    if test.is_failed() {
        FAILURE_GLYPH
    } else if test.is_assumption_failed() {
        ASSUMPTION_FAILURE_GLYPH
    } else {
        SUCCESS_GLYPH
    }
}

fn tags(test: &Test) -> String {
    let mut tags = String::new();
    let mut push = |tag: &dyn fmt::Display| {
        if !tags.is_empty() {
            tags.push_str(", ");
        }
        swrite!(tags, "{tag}");
    };

    if test.is_suite() {
        push(&"suite");
    }
    if test.is_dynamic() {
        push(&"dynamic");
    }
    if test.is_skipped() {
        push(&"skipped");
    }
    if test.is_ignored() {
        push(&"ignored");
    }
    if test.is_assumption_failed() {
        push(&"assumption failed");
    }
    if let Some(runtime) = test.runtime() {
        push(&DisplayRuntime(runtime));
    }

    tags
}

/// Writes the message, the expected/actual pair and the stack trace of a
/// failed test, each only if present.
fn write_details(f: &mut dyn fmt::Write, test: &Test) -> fmt::Result {
    if let Some(message) = test.message().map(str::trim_end).filter(|m| !m.is_empty()) {
        writeln!(f, "- Message: {message}")?;
    }

    let expected = test.expected().trim_end();
    let actual = test.actual().trim_end();
    if !expected.is_empty() || !actual.is_empty() {
        writeln!(f, "- Expected: {}", block_value(expected))?;
        writeln!(f, "  Actual: {}", block_value(actual))?;
    }

    let trace = test.trace().trim_end();
    if !trace.is_empty() {
        writeln!(f, "- <details><summary>Stack trace</summary>")?;
        writeln!(f)?;
        writeln!(f, "  ```")?;
        for line in trace.lines() {
            writeln!(f, "  {line}")?;
        }
        writeln!(f, "  ```")?;
        writeln!(f)?;
        writeln!(f, "  </details>")?;
    }

    Ok(())
}

/// Formats an expected or actual value so that it stays on one line.
fn block_value(value: &str) -> String {
    if value.is_empty() {
        return "(none)".to_owned();
    }
    let mut out = String::new();
    for (index, line) in value.lines().enumerate() {
        if index > 0 {
            out.push_str("\\n");
        }
        out.push_str(line);
    }
    out
}
