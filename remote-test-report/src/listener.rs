// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single-shot TCP listener that test runners report back to.
//!
//! A [`ResultListener`] binds a loopback port as soon as it's opened, so the
//! port can be put on the runner's command line before the runner starts. It
//! then accepts exactly one connection, decodes it until the runner closes
//! the stream, and renders the report.

use crate::{
    config::ReportConfig,
    errors::{ListenerBindError, ListenerError},
    helpers::trim_line_ending,
    model::RunSummary,
    protocol::{DecodedRun, Decoder, ProtocolKind},
    report::{self, ReportHeader},
};
use chrono::Local;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
    sync::oneshot,
    task::JoinHandle,
};
use tracing::{debug, info, warn};

const READ_BUFFER_CAPACITY: usize = 16 * 1024;

/// Receives a run's output while it's still streaming in.
///
/// Each session gets its own observer, so concurrent runs never share
/// progress state.
pub trait RunObserver: Send {
    /// Called for every line received, whether or not it decoded. The line
    /// has no terminator.
    fn on_raw_line(&mut self, line: &str) {
        let _ = line;
    }

    /// Called with a progress message such as `Running adds()`.
    fn on_progress(&mut self, message: &str) {
        let _ = message;
    }
}

/// An observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// An observer that mirrors the stream as `tracing` events.
///
/// Raw lines are emitted at `debug` level under the `remote_test_report::stream`
/// target, progress messages at `info` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn on_raw_line(&mut self, line: &str) {
        debug!(target: "remote_test_report::stream", "{line}");
    }

    fn on_progress(&mut self, message: &str) {
        info!("{message}");
    }
}

/// The outcome of a listener session.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// The report header.
    pub header: ReportHeader,

    /// The decoded run.
    pub run: DecodedRun,

    /// Outcome counts.
    pub summary: RunSummary,

    /// The rendered report.
    pub text: String,
}

/// A listener bound to a loopback port, waiting for a test runner.
#[derive(Debug)]
pub struct ResultListener {
    listener: std::net::TcpListener,
    port: u16,
    protocol: ProtocolKind,
    config: ReportConfig,
    header: ReportHeader,
}

impl ResultListener {
    /// Binds a listener to an OS-assigned port on `127.0.0.1`.
    ///
    /// This doesn't need a runtime and returns as soon as the port is bound.
    pub fn open(protocol: ProtocolKind, config: ReportConfig) -> Result<Self, ListenerBindError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        let listener = std::net::TcpListener::bind(addr)
            .and_then(|listener| {
                listener.set_nonblocking(true)?;
                Ok(listener)
            })
            .map_err(|error| ListenerBindError::new(addr, error))?;
        let port = listener
            .local_addr()
            .map_err(|error| ListenerBindError::new(addr, error))?
            .port();

        let header = ReportHeader {
            title: config.title().to_owned(),
            protocol,
            started_at: Local::now().fixed_offset(),
        };
        debug!("result listener for {protocol} bound to port {port}");

        Ok(Self {
            listener,
            port,
            protocol,
            config,
            header,
        })
    }

    /// Returns the port the runner should connect to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.port))
    }

    /// Runs the session on a new tokio task.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<O>(self, observer: O) -> ListenerHandle
    where
        O: RunObserver + 'static,
    {
        let port = self.port;
        let (sender, receiver) = oneshot::channel();
        let task = tokio::spawn(async move {
            let result = self.run_to_completion(observer).await;
            // Nobody is waiting if the handle was dropped.
            _ = sender.send(result);
        });

        ListenerHandle {
            port,
            receiver,
            task,
        }
    }

    /// Runs the session on the current task: accepts one connection, decodes
    /// it until the runner closes it, and renders the report.
    ///
    /// The listening socket is closed as soon as the connection is accepted.
    pub async fn run_to_completion<O>(self, mut observer: O) -> Result<RunReport, ListenerError>
    where
        O: RunObserver,
    {
        let Self {
            listener,
            port,
            protocol,
            config,
            header,
        } = self;

        let listener =
            TcpListener::from_std(listener).map_err(|error| ListenerError::Accept { error })?;
        let accept = listener.accept();
        let (stream, peer) = match config.accept_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, accept)
                .await
                .map_err(|_| ListenerError::AcceptTimeout { timeout })?,
            None => accept.await,
        }
        .map_err(|error| ListenerError::Accept { error })?;
        drop(listener);
        debug!("test runner connected to port {port} from {peer}");

        let mut decoder = Decoder::new(protocol, &config);
        let mut reader = BufReader::with_capacity(READ_BUFFER_CAPACITY, stream);
        let mut buf = Vec::new();
        let mut line_count = 0usize;
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    line_count += 1;
                    let raw_line = String::from_utf8_lossy(&buf);
                    observer.on_raw_line(trim_line_ending(&raw_line));
                    if let Some(event) = decoder.decode_line(&raw_line) {
                        observer.on_progress(&event.to_string());
                    }
                }
                Err(error) => {
                    warn!("reading from test runner failed, ending the run early: {error}");
                    break;
                }
            }
        }
        drop(reader);
        debug!("test runner closed the stream after {line_count} lines");

        let run = decoder.finish();
        let summary = RunSummary::new(&run.container);
        let text = report::render(&run, &header);

        Ok(RunReport {
            header,
            run,
            summary,
            text,
        })
    }
}

/// A listener session running on a background task.
///
/// Returned by [`ResultListener::spawn`].
#[derive(Debug)]
pub struct ListenerHandle {
    port: u16,
    receiver: oneshot::Receiver<Result<RunReport, ListenerError>>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// Returns the port the runner should connect to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the session to finish and returns its report.
    pub async fn wait(self) -> Result<RunReport, ListenerError> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => match self.task.await {
                Err(error) if error.is_panic() => Err(ListenerError::TaskPanicked),
                _ => Err(ListenerError::TaskCancelled),
            },
        }
    }

    /// Cancels the session. A later [`Self::wait`] returns
    /// [`ListenerError::TaskCancelled`] unless the report was already ready.
    pub fn abort(&self) {
        self.task.abort();
    }
}
