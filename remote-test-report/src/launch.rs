// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building runner command lines that point back at a listener's port.
//!
//! The JUnit runner is launched from a JSON description that the Java
//! language server resolves for a test class or method. The TestNG runner
//! takes the port and the tests to run as plain arguments.

use crate::errors::{LaunchArgsError, LaunchArgsReadError};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexSet;
use serde::Deserialize;
use tracing::debug;

/// The separator between classpath entries on this platform.
pub const CLASSPATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// The program argument that precedes the listener port.
pub const PORT_FLAG: &str = "-port";

/// How to launch the Eclipse JUnit runner.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JunitLaunchArguments {
    /// The runner's main class.
    pub main_class: String,

    /// The project the tests belong to.
    #[serde(default)]
    pub project_name: String,

    /// The directory to run the runner in.
    pub working_directory: Utf8PathBuf,

    /// Classpath entries, in order.
    #[serde(default)]
    pub classpath: Vec<String>,

    /// Module path entries, in order.
    #[serde(default)]
    pub modulepath: Vec<String>,

    /// Arguments for the JVM.
    #[serde(default)]
    pub vm_arguments: Vec<String>,

    /// Arguments for the runner's main class. Contains `-port <port>`.
    #[serde(default)]
    pub program_arguments: Vec<String>,
}

impl JunitLaunchArguments {
    /// Reads launch arguments from a JSON file.
    pub fn from_path(path: &Utf8Path) -> Result<Self, LaunchArgsReadError> {
        let contents = std::fs::read_to_string(path).map_err(|error| LaunchArgsReadError::Read {
            path: path.to_owned(),
            error,
        })?;
        serde_json::from_str(&contents).map_err(|error| LaunchArgsReadError::Parse {
            path: path.to_owned(),
            error,
        })
    }

    /// Replaces the value after `-port` in the program arguments.
    pub fn with_port(mut self, port: u16) -> Result<Self, LaunchArgsError> {
        let flag = self
            .program_arguments
            .iter()
            .position(|arg| arg == PORT_FLAG)
            .ok_or(LaunchArgsError::MissingPortFlag)?;
        let value = self
            .program_arguments
            .get_mut(flag + 1)
            .ok_or(LaunchArgsError::MissingPortValue)?;
        *value = port.to_string();
        Ok(self)
    }

    /// Appends classpath entries that aren't already present.
    pub fn merge_classpath<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut merged: IndexSet<String> = self.classpath.drain(..).collect();
        merged.extend(entries.into_iter().map(Into::into));
        self.classpath = merged.into_iter().collect();
    }

    /// Returns the arguments to pass to `java`.
    pub fn java_args(&self) -> Vec<String> {
        let mut args = self.vm_arguments.clone();
        if !self.modulepath.is_empty() {
            args.push("--module-path".to_owned());
            args.push(self.modulepath.join(CLASSPATH_SEPARATOR));
        }
        if !self.classpath.is_empty() {
            args.push("-cp".to_owned());
            args.push(self.classpath.join(CLASSPATH_SEPARATOR));
        }
        args.push(self.main_class.clone());
        args.extend(self.program_arguments.iter().cloned());
        args
    }
}

/// Builds the TestNG runner's arguments: the port, `testng`, then one
/// `<class>#<method>` per test.
///
/// Test ids have the form `<project>@<class>#<method>`. Ids without a project
/// separator are skipped.
pub fn testng_runner_args<I, S>(port: u16, test_ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut args = vec![port.to_string(), "testng".to_owned()];
    for id in test_ids {
        let id = id.as_ref();
        match id.split_once('@') {
            Some((_, test)) if !test.is_empty() => args.push(test.to_owned()),
            _ => debug!("skipping malformed TestNG test id {id:?}"),
        }
    }
    args
}
