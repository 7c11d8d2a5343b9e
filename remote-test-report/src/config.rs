// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for listener sessions and reports.
//!
//! The config is TOML. An embedded default config (see `default-config.toml`)
//! is always loaded first, and an optional user file is layered on top of it.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    protocol::{ProtocolKind, StackTraceFilter},
};
use camino::Utf8Path;
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, de::IntoDeserializer};
use std::{collections::BTreeSet, fmt, time::Duration};
use tracing::warn;

/// Settings for one listener session: how long to wait for the runner, how to
/// decode its stream and how to title the report.
#[derive(Clone, Debug)]
pub struct ReportConfig {
    accept_timeout: Option<Duration>,
    title: String,
    junit: ProtocolConfig,
    testng: ProtocolConfig,
    unknown_keys: BTreeSet<String>,
}

impl ReportConfig {
    /// The embedded default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Loads the default config, with `config_file` layered on top if given.
    ///
    /// Unknown keys are not an error: they're logged as warnings and are also
    /// available through [`Self::unknown_keys`].
    pub fn from_sources(config_file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        let mut builder = Self::make_default_config();
        if let Some(path) = config_file {
            builder = builder.add_source(File::new(path.as_str(), FileFormat::Toml));
        }

        let (deserialized, unknown_keys) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(config_file, kind))?;

        if !unknown_keys.is_empty() {
            let source = config_file.map_or("the default config", |path| path.as_str());
            for key in &unknown_keys {
                warn!("ignoring unknown config key `{key}` in {source}");
            }
        }

        Self::compile(deserialized, unknown_keys)
            .map_err(|kind| ConfigParseError::new(config_file, kind))
    }

    /// Returns the embedded default config.
    pub fn default_config() -> Self {
        let (deserialized, unknown_keys) =
            Self::build_and_deserialize_config(&Self::make_default_config())
                .expect("default config is always valid");
        Self::compile(deserialized, unknown_keys).expect("default config is always valid")
    }

    /// Returns how long to wait for a runner to connect, or `None` to wait
    /// forever.
    pub fn accept_timeout(&self) -> Option<Duration> {
        self.accept_timeout
    }

    /// Overrides the accept timeout, e.g. from a command-line flag.
    pub fn set_accept_timeout(&mut self, timeout: Option<Duration>) {
        self.accept_timeout = timeout;
    }

    /// Returns the report title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the decoder settings for a protocol.
    pub fn protocol(&self, kind: ProtocolKind) -> &ProtocolConfig {
        match kind {
            ProtocolKind::Junit => &self.junit,
            ProtocolKind::Testng => &self.testng,
        }
    }

    /// Returns config keys that were present but not recognized.
    pub fn unknown_keys(&self) -> &BTreeSet<String> {
        &self.unknown_keys
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ReportConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder.build_cloned()?;

        let mut ignored = BTreeSet::new();
        let deserialized: ReportConfigDeserialize =
            serde_ignored::deserialize(config, |path: serde_ignored::Path| {
                ignored.insert(path.to_string());
            })?;

        Ok((deserialized, ignored))
    }

    fn compile(
        deserialized: ReportConfigDeserialize,
        unknown_keys: BTreeSet<String>,
    ) -> Result<Self, ConfigParseErrorKind> {
        let ReportConfigDeserialize {
            listener,
            report,
            junit,
            testng,
        } = deserialized;

        Ok(Self {
            accept_timeout: listener.accept_timeout,
            title: report.title,
            junit: junit.compile(ProtocolKind::Junit)?,
            testng: testng.compile(ProtocolKind::Testng)?,
            unknown_keys,
        })
    }
}

/// Decoder settings for one protocol.
#[derive(Clone, Debug)]
pub struct ProtocolConfig {
    stack_trace_filter: StackTraceFilter,
}

impl ProtocolConfig {
    /// Returns the filter applied to stack traces. Disabled if
    /// `filter-stack-traces` is false.
    pub fn stack_trace_filter(&self) -> &StackTraceFilter {
        &self.stack_trace_filter
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportConfigDeserialize {
    listener: ListenerConfigDeserialize,
    report: ReportSectionDeserialize,
    junit: ProtocolConfigDeserialize,
    testng: ProtocolConfigDeserialize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ListenerConfigDeserialize {
    #[serde(default, deserialize_with = "deserialize_accept_timeout")]
    accept_timeout: Option<Duration>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportSectionDeserialize {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ProtocolConfigDeserialize {
    filter_stack_traces: bool,
    #[serde(default)]
    stack_trace_filters: Vec<String>,
}

impl ProtocolConfigDeserialize {
    fn compile(self, protocol: ProtocolKind) -> Result<ProtocolConfig, ConfigParseErrorKind> {
        let stack_trace_filter = if self.filter_stack_traces {
            StackTraceFilter::new(&self.stack_trace_filters)
                .map_err(|error| ConfigParseErrorKind::StackTraceFilter { protocol, error })?
        } else {
            StackTraceFilter::disabled()
        };
        Ok(ProtocolConfig { stack_trace_filter })
    }
}

/// Deserializes `accept-timeout`: an empty string means no timeout, anything
/// else is a humantime duration.
fn deserialize_accept_timeout<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct V;

    impl<'de2> serde::de::Visitor<'de2> for V {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a duration (\"30s\") or an empty string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v.is_empty() {
                Ok(None)
            } else {
                humantime_serde::deserialize(v.into_deserializer()).map(Some)
            }
        }
    }

    deserializer.deserialize_any(V)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn write_config(dir: &Utf8TempDir, contents: &str) -> camino::Utf8PathBuf {
        let path = dir.path().join("report.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn default_config_is_valid() {
        let config = ReportConfig::default_config();
        assert_eq!(config.accept_timeout(), None);
        assert_eq!(config.title(), "Test Results");
        assert!(config.unknown_keys().is_empty());

        let junit = config.protocol(ProtocolKind::Junit).stack_trace_filter();
        assert!(junit.is_enabled());
        assert!(!junit.keep("\tat org.junit.Assert.fail(Assert.java:89)"));
        assert!(junit.keep("\tat com.example.AppTest.adds(AppTest.java:12)"));

        let testng = config.protocol(ProtocolKind::Testng).stack_trace_filter();
        assert!(!testng.keep("\tat org.testng.internal.Invoker.invokeMethod(Invoker.java:1)"));
    }

    #[test]
    fn user_config_overrides_defaults() {
        let dir = Utf8TempDir::new().unwrap();
        let path = write_config(
            &dir,
            indoc! {r#"
                [listener]
                accept-timeout = "30s"

                [report]
                title = "Nightly"

                [junit]
                filter-stack-traces = false
            "#},
        );

        let config = ReportConfig::from_sources(Some(&path)).unwrap();
        assert_eq!(config.accept_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.title(), "Nightly");
        assert!(
            !config
                .protocol(ProtocolKind::Junit)
                .stack_trace_filter()
                .is_enabled()
        );
        assert!(
            config
                .protocol(ProtocolKind::Testng)
                .stack_trace_filter()
                .is_enabled()
        );
    }

    #[test]
    fn unknown_keys_are_collected() {
        let dir = Utf8TempDir::new().unwrap();
        let path = write_config(
            &dir,
            indoc! {r#"
                [report]
                subtitle = "extra"

                [colors]
                enabled = true
            "#},
        );

        let config = ReportConfig::from_sources(Some(&path)).unwrap();
        let unknown: Vec<_> = config.unknown_keys().iter().map(String::as_str).collect();
        assert_eq!(unknown, ["colors", "report.subtitle"]);
    }

    #[test]
    fn invalid_timeout_is_an_error() {
        let dir = Utf8TempDir::new().unwrap();
        let path = write_config(
            &dir,
            indoc! {r#"
                [listener]
                accept-timeout = "soon"
            "#},
        );

        let error = ReportConfig::from_sources(Some(&path)).unwrap_err();
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::Config(_)),
            "unexpected error: {error:?}"
        );
        assert!(error.to_string().contains("report.toml"));
    }
}
