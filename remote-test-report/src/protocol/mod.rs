// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoders for the line-oriented result streams test runners send back.
//!
//! Two wire formats are supported:
//!
//! * [`junit`]: the Eclipse JUnit `RemoteTestRunner` protocol, with fixed
//!   8-byte headers and comma-separated arguments.
//! * [`testng`]: JSON payloads wrapped in `@@<TestRunner-` ... `-TestRunner>`
//!   sentinels.
//!
//! Both decoders consume one line at a time, mutate a [`TestContainer`], and
//! never fail: lines they can't make sense of are logged and dropped.

mod filter;
pub mod junit;
pub mod testng;

pub use filter::StackTraceFilter;

use crate::{
    config::ReportConfig, errors::ProtocolKindParseError, helpers::trim_line_ending,
    model::TestContainer,
};
use junit::JunitDecoder;
use std::{fmt, str::FromStr, time::Duration};
use testng::TestngDecoder;

/// The wire format a runner speaks.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProtocolKind {
    /// The Eclipse JUnit `RemoteTestRunner` protocol.
    Junit,

    /// The TestNG JSON-line protocol.
    Testng,
}

impl ProtocolKind {
    /// Returns string representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["junit", "testng"]
    }

    /// Returns the string representation of this protocol.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Junit => "junit",
            Self::Testng => "testng",
        }
    }
}

impl FromStr for ProtocolKind {
    type Err = ProtocolKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "junit" => Self::Junit,
            "testng" => Self::Testng,
            other => return Err(ProtocolKindParseError::new(other)),
        };
        Ok(val)
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a decoder wants surfaced while the run is still in progress.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DecodeEvent {
    /// A test started running.
    TestStarted {
        /// The test's display name.
        name: String,
    },
}

impl fmt::Display for DecodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestStarted { name } => write!(f, "Running {name}"),
        }
    }
}

/// The outcome of decoding a whole stream.
#[derive(Clone, Debug, Default)]
pub struct DecodedRun {
    /// Every test the runner declared or reported.
    pub container: TestContainer,

    /// Total run time, if the runner reported it.
    pub elapsed: Option<Duration>,

    /// The number of tests the runner announced it would run.
    pub expected_count: Option<usize>,

    /// True if the runner reported the run as stopped before completion.
    pub stopped: bool,
}

/// A decoder for either wire format.
#[derive(Debug)]
pub enum Decoder {
    /// Decodes the JUnit protocol.
    Junit(JunitDecoder),

    /// Decodes the TestNG protocol.
    Testng(TestngDecoder),
}

impl Decoder {
    /// Creates a decoder for `kind`, using the stack-trace filter configured
    /// for it.
    pub fn new(kind: ProtocolKind, config: &ReportConfig) -> Self {
        let filter = config.protocol(kind).stack_trace_filter().clone();
        match kind {
            ProtocolKind::Junit => Self::Junit(JunitDecoder::new(filter)),
            ProtocolKind::Testng => Self::Testng(TestngDecoder::new(filter)),
        }
    }

    /// Returns the protocol this decoder speaks.
    pub fn kind(&self) -> ProtocolKind {
        match self {
            Self::Junit(_) => ProtocolKind::Junit,
            Self::Testng(_) => ProtocolKind::Testng,
        }
    }

    /// Decodes a single line as received, terminator included if it had one.
    pub fn decode_line(&mut self, line: &str) -> Option<DecodeEvent> {
        match self {
            Self::Junit(decoder) => decoder.decode_line(line),
            Self::Testng(decoder) => decoder.decode_line(trim_line_ending(line)),
        }
    }

    /// Returns the tests decoded so far.
    pub fn container(&self) -> &TestContainer {
        match self {
            Self::Junit(decoder) => decoder.container(),
            Self::Testng(decoder) => decoder.container(),
        }
    }

    /// Ends decoding and hands over the result.
    pub fn finish(self) -> DecodedRun {
        match self {
            Self::Junit(decoder) => decoder.finish(),
            Self::Testng(decoder) => decoder.finish(),
        }
    }
}
