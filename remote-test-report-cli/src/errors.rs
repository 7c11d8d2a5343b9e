// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use remote_test_report::errors::{
    ConfigParseError, LaunchArgsError, LaunchArgsReadError, ListenerBindError, ListenerError,
};
use std::{error::Error, process::ExitStatus};
use thiserror::Error;
use tracing::error;

/// Process exit codes.
pub struct RemoteTestReportExitCode;

impl RemoteTestReportExitCode {
    /// The run finished and no tests failed.
    pub const OK: i32 = 0;

    /// The runner connected but reported no tests.
    pub const NO_TESTS_RUN: i32 = 4;

    /// At least one test failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// The runner never produced a report, or stopped before finishing.
    pub const INCOMPLETE_RUN: i32 = 106;

    /// The report could not be written.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;

    /// Something went wrong before the runner was started.
    pub const SETUP_ERROR: i32 = 96;
}

// The #[error()] strings are placeholders: errors are printed with
// display_to_stderr, which colorizes them and prints the source chain.

/// An error that ends the command with a non-zero exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to bind result listener")]
    ListenerBindError {
        #[from]
        err: ListenerBindError,
    },
    #[error("failed to build async runtime")]
    RuntimeBuildError {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to read launch arguments")]
    LaunchArgsReadError {
        #[from]
        err: LaunchArgsReadError,
    },
    #[error("invalid launch arguments")]
    LaunchArgsError {
        path: Utf8PathBuf,
        #[source]
        err: LaunchArgsError,
    },
    #[error("no runner to launch")]
    MissingRunnerCommand,
    #[error("failed to spawn test runner")]
    RunnerSpawnError {
        command: String,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to wait for test runner")]
    RunnerWaitError {
        command: String,
        #[source]
        err: std::io::Error,
    },
    #[error("test runner exited without reporting")]
    RunnerExitedWithoutReport { command: String, status: ExitStatus },
    #[error("result listener failed")]
    ListenerError {
        #[from]
        err: ListenerError,
    },
    #[error("failed to write report")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. }
            | Self::ListenerBindError { .. }
            | Self::RuntimeBuildError { .. }
            | Self::LaunchArgsReadError { .. }
            | Self::LaunchArgsError { .. }
            | Self::MissingRunnerCommand
            | Self::RunnerSpawnError { .. } => RemoteTestReportExitCode::SETUP_ERROR,
            Self::RunnerWaitError { .. }
            | Self::RunnerExitedWithoutReport { .. }
            | Self::ListenerError { .. } => {
                RemoteTestReportExitCode::INCOMPLETE_RUN
            }
            Self::WriteOutputError { .. } => RemoteTestReportExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ConfigParseError { err } => {
                error!("{err}");
                err.source()
            }
            Self::ListenerBindError { err } => {
                error!(
                    "failed to bind result listener to {}",
                    err.addr().style(styles.bold)
                );
                err.source()
            }
            Self::RuntimeBuildError { err } => {
                error!("failed to build async runtime");
                Some(err as &dyn Error)
            }
            Self::LaunchArgsReadError { err } => {
                error!("{err}");
                err.source()
            }
            Self::LaunchArgsError { path, err } => {
                error!(
                    "cannot substitute listener port into `{}`: {err}",
                    path.style(styles.bold)
                );
                None
            }
            Self::MissingRunnerCommand => {
                error!(
                    "the testng protocol needs a runner command after `--` to pass tests to"
                );
                None
            }
            Self::RunnerSpawnError { command, err } => {
                error!("failed to spawn `{}`", command.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::RunnerWaitError { command, err } => {
                error!("failed to wait for `{}`", command.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::RunnerExitedWithoutReport { command, status } => {
                error!(
                    "`{}` {} without reporting any results",
                    command.style(styles.bold),
                    format!("exited with {status}").style(styles.failure)
                );
                None
            }
            Self::ListenerError { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteOutputError { err } => {
                error!("failed to write report");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
