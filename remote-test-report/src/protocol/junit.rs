// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoder for the Eclipse JUnit `RemoteTestRunner` protocol.
//!
//! Every control line starts with an 8-byte header, padded with spaces, and
//! most are followed by comma-separated arguments:
//!
//! ```text
//! %TESTC  2 v2
//! %TSTTREE1,com.example.AppTest,true,2,false,1,AppTest,,
//! %TSTTREE2,adds(com.example.AppTest),false,1,false,1,adds(),,
//! %TESTS  2,adds(com.example.AppTest)
//! %FAILED 2,adds(com.example.AppTest)
//! %TRACES
//! java.lang.AssertionError: expected:<1> but was:<2>
//! %TRACEE
//! %TESTE  2,adds(com.example.AppTest)
//! %RUNTIME1200
//! ```
//!
//! The `TRACE`, `ACTUAL` and `EXPECTED` start headers open a block: every line
//! up to the matching end header is appended to the current test verbatim.

use super::{DecodeEvent, DecodedRun, StackTraceFilter};
use crate::{
    errors::ProtocolParseError,
    helpers::{split_escaped_commas, trim_line_ending},
    model::{
        ASSUMPTION_FAILURE_PREFIX, IGNORED_PREFIX, NodeIndex, TestContainer, TestDeclaration,
        TestId,
    },
};
use std::{collections::HashMap, sync::LazyLock, time::Duration};
use tracing::debug;

/// A message header in the JUnit protocol.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MessageId {
    /// `%TESTC  `: the run started. Carries the expected test count.
    TestRunStart,

    /// `%TSTTREE`: declares a node of the test tree.
    TestTree,

    /// `%TESTS  `: a test started.
    TestStart,

    /// `%TESTE  `: a test ended.
    TestEnd,

    /// `%ERROR  `: a test errored.
    TestError,

    /// `%FAILED `: a test failed.
    TestFailed,

    /// `%TRACES `: starts a stack-trace block.
    TraceStart,

    /// `%TRACEE `: ends a stack-trace block.
    TraceEnd,

    /// `%ACTUALS`: starts an actual-value block.
    ActualStart,

    /// `%ACTUALE`: ends an actual-value block.
    ActualEnd,

    /// `%EXPECTS`: starts an expected-value block.
    ExpectedStart,

    /// `%EXPECTE`: ends an expected-value block.
    ExpectedEnd,

    /// `%TSTSTP `: the run was stopped.
    TestRunStop,

    /// `%RUNTIME`: the run finished. Carries the elapsed milliseconds.
    TestRunEnd,
}

/// The length of every header, including padding.
pub const HEADER_LEN: usize = 8;

static HEADERS: LazyLock<HashMap<&'static str, MessageId>> = LazyLock::new(|| {
    MessageId::ALL
        .iter()
        .map(|&id| (id.header().trim_end(), id))
        .collect()
});

impl MessageId {
    /// All message ids.
    pub const ALL: [Self; 14] = [
        Self::TestRunStart,
        Self::TestTree,
        Self::TestStart,
        Self::TestEnd,
        Self::TestError,
        Self::TestFailed,
        Self::TraceStart,
        Self::TraceEnd,
        Self::ActualStart,
        Self::ActualEnd,
        Self::ExpectedStart,
        Self::ExpectedEnd,
        Self::TestRunStop,
        Self::TestRunEnd,
    ];

    /// Returns the header literal, padded to [`HEADER_LEN`] bytes.
    pub fn header(self) -> &'static str {
        match self {
            Self::TestRunStart => "%TESTC  ",
            Self::TestTree => "%TSTTREE",
            Self::TestStart => "%TESTS  ",
            Self::TestEnd => "%TESTE  ",
            Self::TestError => "%ERROR  ",
            Self::TestFailed => "%FAILED ",
            Self::TraceStart => "%TRACES ",
            Self::TraceEnd => "%TRACEE ",
            Self::ActualStart => "%ACTUALS",
            Self::ActualEnd => "%ACTUALE",
            Self::ExpectedStart => "%EXPECTS",
            Self::ExpectedEnd => "%EXPECTE",
            Self::TestRunStop => "%TSTSTP ",
            Self::TestRunEnd => "%RUNTIME",
        }
    }

    /// Splits a line into its header and arguments.
    ///
    /// Senders sometimes trim the padding off argument-less headers, so a
    /// line shorter than [`HEADER_LEN`] is matched on its own.
    pub fn parse(line: &str) -> Option<(Self, &str)> {
        let (header, args) = match line.get(..HEADER_LEN) {
            Some(header) => (header, &line[HEADER_LEN..]),
            None if line.len() < HEADER_LEN => (line, ""),
            None => return None,
        };
        HEADERS.get(header.trim_end()).map(|&id| (id, args))
    }

    fn block_kind(self) -> Option<BlockKind> {
        match self {
            Self::TraceStart => Some(BlockKind::Trace),
            Self::ActualStart => Some(BlockKind::Actual),
            Self::ExpectedStart => Some(BlockKind::Expected),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum BlockKind {
    Trace,
    Actual,
    Expected,
}

impl BlockKind {
    fn end(self) -> MessageId {
        match self {
            Self::Trace => MessageId::TraceEnd,
            Self::Actual => MessageId::ActualEnd,
            Self::Expected => MessageId::ExpectedEnd,
        }
    }
}

/// An open `TRACE`/`ACTUAL`/`EXPECTED` block.
#[derive(Clone, Copy, Debug)]
struct Block {
    kind: BlockKind,
    target: NodeIndex,
}

/// Decodes the JUnit protocol into a [`TestContainer`].
#[derive(Debug)]
pub struct JunitDecoder {
    container: TestContainer,
    filter: StackTraceFilter,
    current: Option<NodeIndex>,
    block: Option<Block>,
    expected_count: Option<usize>,
    elapsed: Option<Duration>,
    stopped: bool,
}

impl JunitDecoder {
    /// Creates a decoder that drops trace lines matched by `filter`.
    pub fn new(filter: StackTraceFilter) -> Self {
        Self {
            container: TestContainer::new(),
            filter,
            current: None,
            block: None,
            expected_count: None,
            elapsed: None,
            stopped: false,
        }
    }

    /// Returns the tests decoded so far.
    pub fn container(&self) -> &TestContainer {
        &self.container
    }

    /// Ends decoding and hands over the result.
    pub fn finish(self) -> DecodedRun {
        if let Some(block) = self.block {
            debug!("stream ended inside an open {:?} block", block.kind);
        }
        DecodedRun {
            container: self.container,
            elapsed: self.elapsed,
            expected_count: self.expected_count,
            stopped: self.stopped,
        }
    }

    /// Decodes a single line.
    ///
    /// The line may still carry its `\n` or `\r\n` terminator. Headers are
    /// matched without it, and block lines are appended with it unchanged.
    pub fn decode_line(&mut self, raw_line: &str) -> Option<DecodeEvent> {
        let line = trim_line_ending(raw_line);
        let parsed = MessageId::parse(line);

        if let Some(block) = self.block {
            // The end header has to be checked before appending, so it never
            // ends up in the buffer.
            if matches!(parsed, Some((id, _)) if id == block.kind.end()) {
                self.block = None;
            } else {
                self.append(block.kind, block.target, raw_line);
            }
            return None;
        }

        let Some((id, args)) = parsed else {
            debug!("ignoring unrecognized line: {line:?}");
            return None;
        };

        match self.handle(id, args) {
            Ok(event) => event,
            Err(error) => {
                debug!(
                    "ignoring malformed {} line: {error} ({line:?})",
                    id.header().trim_end()
                );
                None
            }
        }
    }

    fn handle(
        &mut self,
        id: MessageId,
        args: &str,
    ) -> Result<Option<DecodeEvent>, ProtocolParseError> {
        match id {
            MessageId::TestRunStart => {
                let count = args.split_whitespace().next().unwrap_or_default();
                self.expected_count = Some(parse_number("count", count)?);
            }
            MessageId::TestTree => {
                let declaration = parse_tree_line(args)?;
                self.container.insert(declaration);
            }
            MessageId::TestStart => return Ok(self.test_started(args)),
            MessageId::TestEnd => {
                self.current = None;
            }
            MessageId::TestError | MessageId::TestFailed => {
                self.test_failed(id, args);
            }
            MessageId::TraceStart | MessageId::ActualStart | MessageId::ExpectedStart => {
                // block_kind is Some for exactly these three.
                if let Some(kind) = id.block_kind() {
                    match self.current {
                        Some(target) => self.block = Some(Block { kind, target }),
                        None => debug!("ignoring {kind:?} block start without a current test"),
                    }
                }
            }
            MessageId::TraceEnd | MessageId::ActualEnd | MessageId::ExpectedEnd => {
                debug!("ignoring {} outside of a block", id.header().trim_end());
            }
            MessageId::TestRunStop => {
                self.stopped = true;
                if let Ok(elapsed) = parse_number("elapsed", args.trim()) {
                    self.elapsed.get_or_insert(Duration::from_millis(elapsed));
                }
            }
            MessageId::TestRunEnd => {
                let elapsed = parse_number("elapsed", args.trim())?;
                self.elapsed = Some(Duration::from_millis(elapsed));
            }
        }

        Ok(None)
    }

    fn test_started(&mut self, args: &str) -> Option<DecodeEvent> {
        let (id, name) = split_id_and_name(args);
        let Some(index) = self.container.index_of(&id) else {
            debug!("start event for undeclared test `{id}`");
            return None;
        };

        let test = self.container.node_mut(index);
        if name.starts_with(IGNORED_PREFIX) {
            test.ignored = true;
            return None;
        }

        let name = test.label().to_owned();
        self.container.mark_started_at(index);
        self.current = Some(index);
        Some(DecodeEvent::TestStarted { name })
    }

    fn test_failed(&mut self, id: MessageId, args: &str) {
        let (test_id, name) = split_id_and_name(args);
        self.current = self.container.index_of(&test_id);
        let Some(index) = self.current else {
            debug!("failure event for undeclared test `{test_id}`");
            return;
        };

        if id == MessageId::TestFailed && name.starts_with(ASSUMPTION_FAILURE_PREFIX) {
            self.container.mark_assumption_failed(&test_id);
        } else {
            self.container.mark_failed_at(index);
        }
    }

    fn append(&mut self, kind: BlockKind, target: NodeIndex, line: &str) {
        let test = self.container.node_mut(target);
        let buffer = match kind {
            BlockKind::Trace => {
                if !self.filter.keep(line) {
                    return;
                }
                &mut test.trace
            }
            BlockKind::Actual => &mut test.actual,
            BlockKind::Expected => &mut test.expected,
        };
        buffer.push_str(line);
        if !line.ends_with('\n') {
            buffer.push('\n');
        }
    }
}

fn split_id_and_name(args: &str) -> (TestId, String) {
    let mut fields = split_escaped_commas(args).into_iter();
    let id = fields.next().unwrap_or_default();
    let name = fields.collect::<Vec<_>>().join(",");
    (TestId::new(id), name)
}

/// Parses the arguments of a `%TSTTREE` line:
/// `id,name,isSuite,count,isDynamic,parentId,displayName,parameterTypes,uniqueId`.
fn parse_tree_line(args: &str) -> Result<TestDeclaration, ProtocolParseError> {
    let fields = split_escaped_commas(args);
    if fields.len() < 6 {
        return Err(ProtocolParseError::MissingFields {
            expected: 6,
            actual: fields.len(),
        });
    }

    let id = TestId::new(&fields[0]);
    let is_suite = parse_bool("isSuite", &fields[2])?;
    let count = if fields[3].is_empty() {
        0
    } else {
        parse_number("count", &fields[3])?
    };
    let is_dynamic = parse_bool("isDynamic", &fields[4])?;
    let parent_id = match fields[5].as_str() {
        "" | "-1" => None,
        parent if parent == id.as_str() => None,
        parent => Some(TestId::new(parent)),
    };
    let non_empty = |index: usize| fields.get(index).filter(|s| !s.is_empty()).cloned();
    // The unique id is last, and may itself contain commas the runner didn't
    // escape.
    let unique_id = fields.get(8..).map(|rest| rest.join(",")).filter(|s| !s.is_empty());

    Ok(TestDeclaration {
        id,
        name: fields[1].clone(),
        display_name: non_empty(6),
        is_suite,
        count,
        is_dynamic,
        parent_id,
        parameter_types: non_empty(7),
        unique_id,
    })
}

fn parse_bool(field: &'static str, value: &str) -> Result<bool, ProtocolParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ProtocolParseError::InvalidBool {
            field,
            value: value.to_owned(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> Result<T, ProtocolParseError> {
    value.parse().map_err(|_| ProtocolParseError::InvalidNumber {
        field,
        value: value.to_owned(),
    })
}
