// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listener, decoders and report renderer for remote test runs.
//!
//! A test runner process (the Eclipse JUnit remote runner, or the TestNG
//! launcher) is started with the port of a [`ResultListener`](listener::ResultListener)
//! on its command line. It connects back, streams its results one line at a
//! time, and the listener decodes those lines into a
//! [`TestContainer`](model::TestContainer) and renders a report once the
//! stream closes.
//!
//! The basic flow is:
//!
//! 1. [`ResultListener::open`](listener::ResultListener::open) binds a loopback
//!    port and returns immediately.
//! 2. The port is substituted into the runner's arguments (see [`launch`]).
//! 3. [`ResultListener::spawn`](listener::ResultListener::spawn) drives the
//!    single session on a background task, and
//!    [`ListenerHandle::wait`](listener::ListenerHandle::wait) hands the
//!    finished [`RunReport`](listener::RunReport) back.

#![warn(missing_docs)]

pub mod config;
pub mod errors;
mod helpers;
mod indenter;
pub mod launch;
pub mod listener;
pub mod model;
pub mod protocol;
pub mod report;
