// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by remote-test-report.

use crate::protocol::ProtocolKind;
use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::{io, net::SocketAddr, time::Duration};
use thiserror::Error;

/// An error that occurred while binding the result listener's socket.
///
/// This is the only error that can happen before the port is handed to the
/// runner's launcher.
#[derive(Debug, Error)]
#[error("failed to bind result listener to `{addr}`")]
#[non_exhaustive]
pub struct ListenerBindError {
    addr: SocketAddr,
    #[source]
    error: io::Error,
}

impl ListenerBindError {
    pub(crate) fn new(addr: SocketAddr, error: io::Error) -> Self {
        Self { addr, error }
    }

    /// Returns the address the listener attempted to bind to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// An error that ended a listener session without producing a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ListenerError {
    /// No test runner connected before the accept timeout expired.
    #[error("no test runner connected within {timeout:?}")]
    AcceptTimeout {
        /// The configured timeout.
        timeout: Duration,
    },

    /// Accepting the runner's connection failed.
    #[error("failed to accept test runner connection")]
    Accept {
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The listener task panicked.
    #[error("result listener task panicked")]
    TaskPanicked,

    /// The listener task was aborted before the stream ended.
    #[error("result listener task was cancelled")]
    TaskCancelled,
}

/// An error that occurred while parsing the report config.
#[derive(Debug, Error)]
#[error("failed to parse test report config from {source_name}")]
#[non_exhaustive]
pub struct ConfigParseError {
    source_name: String,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<&Utf8Path>, kind: ConfigParseErrorKind) -> Self {
        let source_name = match config_file {
            Some(path) => format!("`{path}`"),
            None => "the default config".to_owned(),
        };
        Self { source_name, kind }
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing the report config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// The TOML could not be read or deserialized.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A stack-trace filter list could not be compiled.
    #[error("invalid stack-trace filters for {protocol}")]
    StackTraceFilter {
        /// The protocol section the filters belong to.
        protocol: ProtocolKind,

        /// The underlying error.
        #[source]
        error: aho_corasick::BuildError,
    },
}

/// Error returned while parsing a [`ProtocolKind`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for protocol: {input}\n(known values: {})",
    ProtocolKind::variants().join(", "),
)]
pub struct ProtocolKindParseError {
    input: String,
}

impl ProtocolKindParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while substituting the listener port into runner
/// launch arguments.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LaunchArgsError {
    /// The program arguments have no `-port` flag.
    #[error("runner program arguments do not contain a `-port` flag")]
    MissingPortFlag,

    /// The `-port` flag is the last program argument.
    #[error("runner program arguments end with `-port` but no value follows it")]
    MissingPortValue,
}

/// An error that occurred while reading runner launch arguments from a file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LaunchArgsReadError {
    /// The file could not be read.
    #[error("failed to read launch arguments from `{path}`")]
    Read {
        /// The path that was read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The file did not contain valid launch arguments.
    #[error("failed to parse launch arguments in `{path}`")]
    Parse {
        /// The path that was read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },
}

/// A line that a decoder recognized but could not make sense of.
///
/// These never escape a decoder: they're logged and the line is dropped.
#[derive(Debug, Error)]
pub(crate) enum ProtocolParseError {
    #[error("expected at least {expected} fields, found {actual}")]
    MissingFields { expected: usize, actual: usize },

    #[error("invalid boolean for `{field}`: {value:?}")]
    InvalidBool { field: &'static str, value: String },

    #[error("invalid number for `{field}`: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid TestNG payload")]
    Json(#[from] serde_json::Error),
}
