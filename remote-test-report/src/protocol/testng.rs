// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decoder for the TestNG JSON-line protocol.
//!
//! Each message is a JSON object wrapped in sentinels on a line of its own:
//!
//! ```text
//! @@<TestRunner-{"name":"testStarted","attributes":{"name":"com.example.AppTest#adds"}}-TestRunner>
//! ```
//!
//! TestNG sends no tree: every test is a root, created when it starts.

use super::{DecodeEvent, DecodedRun, StackTraceFilter};
use crate::{
    errors::ProtocolParseError,
    model::{TestContainer, TestDeclaration, TestId},
};
use regex::Regex;
use serde::Deserialize;
use std::{fmt, sync::LazyLock, time::Duration};
use tracing::debug;

static PAYLOAD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@@<TestRunner-(.+)-TestRunner>").expect("payload regex is valid")
});

/// A decoded TestNG message.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "name", content = "attributes", rename_all = "camelCase")]
pub enum TestngMessage {
    /// A test started.
    TestStarted {
        /// The test's identifier.
        name: String,
    },

    /// A test finished, successfully or not.
    TestFinished {
        /// The test's identifier.
        name: String,

        /// How long the test took.
        #[serde(default, deserialize_with = "deserialize_millis")]
        duration: Option<Duration>,
    },

    /// A test failed.
    TestFailed {
        /// The test's identifier.
        name: String,

        /// The failure message.
        #[serde(default)]
        message: Option<String>,

        /// The stack trace, with lines separated by `\n`.
        #[serde(default)]
        trace: Option<String>,

        /// How long the test took.
        #[serde(default, deserialize_with = "deserialize_millis")]
        duration: Option<Duration>,
    },
}

impl TestngMessage {
    /// Extracts and decodes the payload of a line.
    ///
    /// Returns `Ok(None)` if the line carries no payload at all.
    fn parse(line: &str) -> Result<Option<Self>, ProtocolParseError> {
        let Some(payload) = PAYLOAD_REGEX.captures(line).and_then(|c| c.get(1)) else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(payload.as_str())?))
    }
}

/// Decodes the TestNG protocol into a [`TestContainer`].
#[derive(Debug)]
pub struct TestngDecoder {
    container: TestContainer,
    filter: StackTraceFilter,
}

impl TestngDecoder {
    /// Creates a decoder that filters failure traces through `filter`.
    pub fn new(filter: StackTraceFilter) -> Self {
        Self {
            container: TestContainer::new(),
            filter,
        }
    }

    /// Returns the tests decoded so far.
    pub fn container(&self) -> &TestContainer {
        &self.container
    }

    /// Ends decoding and hands over the result.
    pub fn finish(self) -> DecodedRun {
        DecodedRun {
            container: self.container,
            ..Default::default()
        }
    }

    /// Decodes a single line, without its terminator.
    pub fn decode_line(&mut self, line: &str) -> Option<DecodeEvent> {
        match TestngMessage::parse(line) {
            Ok(Some(message)) => self.handle(message),
            Ok(None) => {
                debug!("ignoring line without a TestNG payload: {line:?}");
                None
            }
            Err(error) => {
                debug!("ignoring malformed TestNG line: {error} ({line:?})");
                None
            }
        }
    }

    fn handle(&mut self, message: TestngMessage) -> Option<DecodeEvent> {
        match message {
            TestngMessage::TestStarted { name } => {
                let id = TestId::new(&name);
                if self.container.index_of(&id).is_none() {
                    self.container.insert(TestDeclaration::leaf(id.clone(), name));
                }
                self.container.mark_started(&id);
                let test = self.container.get(&id)?;
                Some(DecodeEvent::TestStarted {
                    name: test.label().to_owned(),
                })
            }
            TestngMessage::TestFinished { name, duration } => {
                let id = TestId::new(&name);
                match self.container.get_mut(&id) {
                    Some(test) => {
                        if duration.is_some() {
                            test.runtime = duration;
                        }
                    }
                    None => debug!("finish event for unknown test `{id}`"),
                }
                None
            }
            TestngMessage::TestFailed {
                name,
                message,
                trace,
                duration,
            } => {
                let id = TestId::new(&name);
                if !self.container.mark_failed(&id) {
                    return None;
                }
                let filter = &self.filter;
                if let Some(test) = self.container.get_mut(&id) {
                    if message.is_some() {
                        test.message = message;
                    }
                    if let Some(trace) = trace {
                        test.trace = filter.filter_trace(&trace);
                    }
                    if duration.is_some() {
                        test.runtime = duration;
                    }
                }
                None
            }
        }
    }
}

/// Deserializes a duration in milliseconds, sent either as a number or as a
/// string. Values that aren't a non-negative number of milliseconds are
/// treated as absent.
fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct V;

    impl serde::de::Visitor<'_> for V {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a number of milliseconds, as a number or a string")
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(u64::try_from(v).ok().map(Duration::from_millis))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(millis_from_f64(v))
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            let v = v.trim();
            if let Ok(millis) = v.parse::<u64>() {
                return Ok(Some(Duration::from_millis(millis)));
            }
            match v.parse::<f64>() {
                Ok(millis) => Ok(millis_from_f64(millis)),
                Err(_) => {
                    debug!("ignoring invalid duration {v:?}");
                    Ok(None)
                }
            }
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(V)
}

fn millis_from_f64(millis: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(millis / 1000.0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn wrap(json: &str) -> String {
        format!("@@<TestRunner-{json}-TestRunner>")
    }

    fn decoder() -> TestngDecoder {
        TestngDecoder::new(StackTraceFilter::disabled())
    }

    #[test]
    fn finished_duration_is_recorded() {
        let mut decoder = decoder();
        let event =
            decoder.decode_line(&wrap(r#"{"name":"testStarted","attributes":{"name":"t1"}}"#));
        assert_eq!(
            event,
            Some(DecodeEvent::TestStarted {
                name: "t1".to_owned()
            })
        );
        decoder.decode_line(&wrap(
            r#"{"name":"testFinished","attributes":{"name":"t1","duration":"1500"}}"#,
        ));

        let run = decoder.finish();
        let t1 = run.container.get(&TestId::from("t1")).unwrap();
        assert!(t1.is_started());
        assert!(!t1.is_failed());
        assert_eq!(t1.runtime(), Some(Duration::from_millis(1500)));
        assert_eq!(t1.parent(), None);
    }

    #[test_case(r#""1500""#, Some(Duration::from_millis(1500)); "string")]
    #[test_case("1500", Some(Duration::from_millis(1500)); "integer")]
    #[test_case(r#""12.5""#, Some(Duration::from_micros(12_500)); "fractional string")]
    #[test_case("0.5", Some(Duration::from_micros(500)); "fractional number")]
    #[test_case(r#""soon""#, None; "invalid string")]
    #[test_case("-3", None; "negative")]
    #[test_case("null", None; "null")]
    fn duration_formats(duration: &str, expected: Option<Duration>) {
        let json = format!(
            r#"{{"name":"testFinished","attributes":{{"name":"t","duration":{duration}}}}}"#
        );
        let message: TestngMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(
            message,
            TestngMessage::TestFinished {
                name: "t".to_owned(),
                duration: expected,
            }
        );
    }

    #[test]
    fn failure_records_message_and_filtered_trace() {
        let filter = StackTraceFilter::new(["org.testng.internal."]).unwrap();
        let mut decoder = TestngDecoder::new(filter);
        decoder.decode_line(&wrap(
            r#"{"name":"testStarted","attributes":{"name":"AppTest#adds"}}"#,
        ));
        decoder.decode_line(&wrap(
            r#"{"name":"testFailed","attributes":{"name":"AppTest#adds","message":"expected [1] but found [2]","trace":"java.lang.AssertionError\n\tat AppTest.adds(AppTest.java:9)\n\tat org.testng.internal.Invoker.invoke(Invoker.java:1)\n","duration":"20"}}"#,
        ));

        let run = decoder.finish();
        let test = run.container.get(&TestId::from("AppTest#adds")).unwrap();
        assert!(test.is_failed());
        assert_eq!(test.message(), Some("expected [1] but found [2]"));
        assert_eq!(
            test.trace(),
            "java.lang.AssertionError\n\tat AppTest.adds(AppTest.java:9)\n"
        );
        assert_eq!(test.runtime(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn restarted_test_is_reused() {
        let mut decoder = decoder();
        let started = wrap(r#"{"name":"testStarted","attributes":{"name":"t1"}}"#);
        decoder.decode_line(&started);
        decoder.decode_line(&started);
        assert_eq!(decoder.container().len(), 1);
        assert_eq!(decoder.container().roots().len(), 1);
    }

    #[test_case("plain runner output"; "no sentinels")]
    #[test_case(r#"@@<TestRunner-{"name":"testStarted"-TestRunner>"#; "invalid json")]
    #[test_case(r#"@@<TestRunner-{"name":"testStarted","attributes":{}}-TestRunner>"#; "missing name")]
    #[test_case(r#"@@<TestRunner-{"name":"suiteStarted","attributes":{"name":"s"}}-TestRunner>"#; "unknown message")]
    fn unusable_lines_are_dropped(line: &str) {
        let mut decoder = decoder();
        assert_eq!(decoder.decode_line(line), None);
        assert!(decoder.container().is_empty());
    }

    #[test]
    fn events_for_unknown_tests_are_no_ops() {
        let mut decoder = decoder();
        decoder.decode_line(&wrap(
            r#"{"name":"testFinished","attributes":{"name":"ghost","duration":"5"}}"#,
        ));
        decoder.decode_line(&wrap(
            r#"{"name":"testFailed","attributes":{"name":"ghost","message":"boom"}}"#,
        ));
        assert!(decoder.container().is_empty());
    }

    #[test]
    fn surrounding_text_is_tolerated() {
        let mut decoder = decoder();
        let line = format!(
            "[main] {}\r",
            wrap(r#"{"name":"testStarted","attributes":{"name":"t1"}}"#)
        );
        assert!(decoder.decode_line(&line).is_some());
    }
}
