// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for indenting multi-line blocks inside nested report list items.
//!
//! This module is adapted from [indenter](https://github.com/eyre-rs/indenter) and is used under the
//! terms of the MIT or Apache-2.0 licenses.

use std::fmt;

/// A writer that inserts indentation after every newline it sees.
///
/// The report nests list items by depth, and every line of a failure message
/// or stack trace has to line up under its item. Rather than allocating an
/// indented copy of each block, this intercepts `write_str` calls, splits on
/// newlines and interleaves the indentation.
pub(crate) struct Indented<'a, D: ?Sized> {
    inner: &'a mut D,
    needs_indent: bool,
    indentation: &'a str,
}

impl<'a, D: ?Sized> Indented<'a, D> {
    /// Sets the indentation inserted before each line.
    pub(crate) fn with_str(mut self, indentation: &'a str) -> Self {
        self.indentation = indentation;
        self
    }
}

impl<D> fmt::Write for Indented<'_, D>
where
    D: fmt::Write + ?Sized,
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for (ind, line) in s.split('\n').enumerate() {
            if ind > 0 {
                self.inner.write_char('\n')?;
                self.needs_indent = true;
            }

            if self.needs_indent {
                // Blank lines stay blank, without trailing whitespace.
                if line.is_empty() {
                    continue;
                }

                self.inner.write_str(self.indentation)?;
                self.needs_indent = false;
            }

            self.inner.write_str(line)?;
        }

        Ok(())
    }
}

/// Creates an indenter with the default four-space indentation.
pub(crate) fn indented<D: ?Sized>(f: &mut D) -> Indented<'_, D> {
    Indented {
        inner: f,
        needs_indent: true,
        indentation: "    ",
    }
}
