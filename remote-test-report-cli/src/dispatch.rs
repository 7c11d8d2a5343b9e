// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, RemoteTestReportExitCode,
    output::{OutputContext, OutputOpts, clap_styles},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use remote_test_report::{
    config::ReportConfig,
    launch::{JunitLaunchArguments, testng_runner_args},
    listener::{ListenerHandle, ResultListener, RunReport, TracingObserver},
    model::RunSummary,
    protocol::ProtocolKind,
};
use std::{io::Write, time::Duration};
use tracing::{debug, info, warn};

/// The placeholder in a runner command that is replaced with the listener port.
const PORT_PLACEHOLDER: &str = "{port}";

/// Collects results from a Java test runner and prints a report.
///
/// The runner connects back to a loopback port and streams its results in the
/// Eclipse JUnit or TestNG wire format.
#[derive(Debug, Parser)]
#[command(version, name = "remote-test-report", styles = clap_styles::style())]
pub struct RemoteTestReportApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl RemoteTestReportApp {
    /// Initializes logging and returns the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(self, output: OutputContext) -> Result<i32, ExpectedError> {
        match self.command {
            Command::Listen(opts) => opts.exec(output),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Listen for one test run and print its report
    ///
    /// Binds a loopback port, optionally launches a runner pointed at it, and
    /// prints the report to stdout once the runner closes the connection.
    /// Without a runner, the port is logged and any runner may connect.
    Listen(ListenOpts),
}

#[derive(Debug, Args)]
struct ListenOpts {
    /// Wire protocol the runner speaks: junit, testng
    #[arg(long, short = 'p', value_name = "PROTOCOL", default_value = "junit")]
    protocol: ProtocolKind,

    /// Config file
    #[arg(long, value_name = "PATH", env = "REMOTE_TEST_REPORT_CONFIG")]
    config_file: Option<Utf8PathBuf>,

    /// How long to wait for the runner to connect, e.g. "30s" [default: forever]
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    accept_timeout: Option<Duration>,

    /// How long to wait for results once the runner process exits
    #[arg(
        long,
        value_name = "DURATION",
        default_value = "5s",
        value_parser = humantime::parse_duration
    )]
    grace_period: Duration,

    /// JSON file with JUnit launch arguments; the runner is started with `java`
    #[arg(long, value_name = "PATH", conflicts_with = "runner")]
    launch_args: Option<Utf8PathBuf>,

    /// Java executable used with --launch-args
    #[arg(long, value_name = "PATH", default_value = "java", requires = "launch_args")]
    java: String,

    /// Extra classpath entry for --launch-args, appended unless already present
    /// (may be repeated)
    #[arg(long = "classpath", value_name = "ENTRY", requires = "launch_args")]
    classpath: Vec<String>,

    /// TestNG test to run, as <project>@<class>#<method> (may be repeated)
    #[arg(long = "test", value_name = "ID")]
    tests: Vec<String>,

    /// Runner command; `{port}` in any argument is replaced with the listener port
    #[arg(last = true, value_name = "RUNNER")]
    runner: Vec<String>,
}

impl ListenOpts {
    fn exec(self, output: OutputContext) -> Result<i32, ExpectedError> {
        let mut config = ReportConfig::from_sources(self.config_file.as_deref())?;
        if let Some(timeout) = self.accept_timeout {
            config.set_accept_timeout(Some(timeout));
        }

        let listener = ResultListener::open(self.protocol, config)?;
        let port = listener.port();
        let runner = self.runner_command(port)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("remote-test-report-worker")
            .build()
            .map_err(|err| ExpectedError::RuntimeBuildError { err })?;

        let report = runtime.block_on(async {
            let handle = listener.spawn(TracingObserver);
            match runner {
                Some(runner) => run_with_runner(handle, runner, self.grace_period, output).await,
                None => {
                    info!("waiting for a {} runner on 127.0.0.1:{port}", self.protocol);
                    Ok(handle.wait().await?)
                }
            }
        })?;

        write_report(&report)?;
        Ok(exit_code(&report.summary, report.run.stopped))
    }

    fn runner_command(&self, port: u16) -> Result<Option<RunnerCommand>, ExpectedError> {
        if self.protocol == ProtocolKind::Junit && !self.tests.is_empty() {
            warn!("--test is only used with the testng protocol, ignoring it");
        }

        if let Some(path) = &self.launch_args {
            let mut args = JunitLaunchArguments::from_path(path)?
                .with_port(port)
                .map_err(|err| ExpectedError::LaunchArgsError {
                    path: path.clone(),
                    err,
                })?;
            args.merge_classpath(&self.classpath);
            return Ok(Some(RunnerCommand {
                program: self.java.clone(),
                args: args.java_args(),
                current_dir: Some(args.working_directory),
            }));
        }

        let Some((program, rest)) = self.runner.split_first() else {
            if self.protocol == ProtocolKind::Testng && !self.tests.is_empty() {
                return Err(ExpectedError::MissingRunnerCommand);
            }
            return Ok(None);
        };

        let port_str = port.to_string();
        let mut args: Vec<String> = rest
            .iter()
            .map(|arg| arg.replace(PORT_PLACEHOLDER, &port_str))
            .collect();
        if self.protocol == ProtocolKind::Testng {
            args.extend(testng_runner_args(port, &self.tests));
        }

        Ok(Some(RunnerCommand {
            program: program.replace(PORT_PLACEHOLDER, &port_str),
            args,
            current_dir: None,
        }))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct RunnerCommand {
    program: String,
    args: Vec<String>,
    current_dir: Option<Utf8PathBuf>,
}

impl RunnerCommand {
    fn display(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(&self.args))
    }

    fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command.args(&self.args).kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

async fn run_with_runner(
    handle: ListenerHandle,
    runner: RunnerCommand,
    grace_period: Duration,
    output: OutputContext,
) -> Result<RunReport, ExpectedError> {
    let command = runner.display();
    if output.verbose {
        info!("starting runner: {command}");
    } else {
        debug!("starting runner: {command}");
    }

    let mut child = runner
        .to_command()
        .spawn()
        .map_err(|err| ExpectedError::RunnerSpawnError {
            command: command.clone(),
            err,
        })?;

    let wait = handle.wait();
    tokio::pin!(wait);

    tokio::select! {
        result = &mut wait => {
            let report = result?;
            // The runner closes the connection just before it exits.
            match tokio::time::timeout(grace_period, child.wait()).await {
                Ok(Ok(status)) => debug!("runner exited with {status}"),
                Ok(Err(error)) => warn!("failed to wait for runner: {error}"),
                Err(_) => warn!("runner still running {grace_period:?} after reporting, killing it"),
            }
            Ok(report)
        }
        status = child.wait() => {
            let status = status.map_err(|err| ExpectedError::RunnerWaitError {
                command: command.clone(),
                err,
            })?;
            debug!("runner exited with {status}, waiting for its results");
            match tokio::time::timeout(grace_period, &mut wait).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(ExpectedError::RunnerExitedWithoutReport { command, status }),
            }
        }
    }
}

fn write_report(report: &RunReport) -> Result<(), ExpectedError> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(report.text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|err| ExpectedError::WriteOutputError { err })
}

fn exit_code(summary: &RunSummary, stopped: bool) -> i32 {
    if !summary.is_success() {
        RemoteTestReportExitCode::TEST_RUN_FAILED
    } else if stopped {
        RemoteTestReportExitCode::INCOMPLETE_RUN
    } else if summary.tests == 0 {
        RemoteTestReportExitCode::NO_TESTS_RUN
    } else {
        RemoteTestReportExitCode::OK
    }
}
