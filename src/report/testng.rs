//! TestNG `testng-results.xml` dialect.
//!
//! ```text
//! testng-results
//!   suite name
//!     test name
//!       class name
//!         test-method status name duration-ms started-at is-config
//!           exception class
//!             message
//!             full-stacktrace
//! ```

use super::xml::{attr, cdata, malformed, message_from_stack, parse_timestamp, text};
use crate::core::{FailureCategory, FailureRecord, TestStatus};
use crate::error::Result;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    Message,
    Stack,
}

#[derive(Debug, Default)]
struct MethodBuilder {
    name: String,
    status: String,
    duration_ms: u64,
    started_at: Option<String>,
    is_config: bool,
    exception_class: String,
    message: String,
    stack: String,
}

impl MethodBuilder {
    fn from_element(element: &BytesStart<'_>) -> Self {
        Self {
            name: attr(element, b"name").unwrap_or_default(),
            status: attr(element, b"status").unwrap_or_default(),
            duration_ms: attr(element, b"duration-ms")
                .and_then(|d| d.trim().parse().ok())
                .unwrap_or(0),
            started_at: attr(element, b"started-at"),
            is_config: attr(element, b"is-config")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            ..Default::default()
        }
    }

    fn finish(self, class_name: &str, suite: &str) -> Option<FailureRecord> {
        if self.status.trim().is_empty() {
            log::warn!(
                "test-method '{}' in class '{}' has no status; counting it as skipped",
                self.name,
                class_name
            );
        }
        let status = TestStatus::parse(&self.status);
        // Passing and skipped setup/teardown methods are noise.
        if self.is_config && status != TestStatus::Fail {
            return None;
        }
        if self.name.is_empty() {
            log::warn!(
                "test-method without a name in class '{}'; using '<unnamed>'",
                class_name
            );
        }

        let stack_trace = self.stack.trim().to_string();
        let mut error_message = self.message.trim().to_string();
        if error_message.is_empty() && status == TestStatus::Fail {
            error_message = message_from_stack(&stack_trace);
        }

        let category = match status {
            TestStatus::Fail if self.is_config => FailureCategory::Environment,
            TestStatus::Fail => FailureCategory::infer(&self.exception_class, &error_message),
            _ => FailureCategory::Unknown,
        };

        let method = if self.name.is_empty() {
            "<unnamed>"
        } else {
            self.name.as_str()
        };
        let test_id = if class_name.is_empty() {
            method.to_string()
        } else {
            format!("{class_name}.{method}")
        };

        Some(FailureRecord {
            test_id,
            suite: suite.to_string(),
            status,
            failure_type_label: self.exception_class,
            error_message,
            stack_trace,
            duration_ms: self.duration_ms,
            timestamp: self.started_at.as_deref().and_then(parse_timestamp),
            category,
        })
    }
}

#[derive(Debug, Default)]
struct TestNgState {
    suite: String,
    test: String,
    class_name: String,
    method: Option<MethodBuilder>,
    target: Option<TextTarget>,
    records: Vec<FailureRecord>,
}

impl TestNgState {
    fn group(&self) -> String {
        match (self.suite.is_empty(), self.test.is_empty()) {
            (false, false) if self.suite != self.test => format!("{}/{}", self.suite, self.test),
            (false, _) => self.suite.clone(),
            (true, _) => self.test.clone(),
        }
    }

    fn open(&mut self, element: &BytesStart<'_>, self_closing: bool) {
        match element.local_name().as_ref() {
            b"suite" => self.suite = attr(element, b"name").unwrap_or_default(),
            b"test" => self.test = attr(element, b"name").unwrap_or_default(),
            b"class" => self.class_name = attr(element, b"name").unwrap_or_default(),
            b"test-method" => {
                let builder = MethodBuilder::from_element(element);
                if self_closing {
                    self.push(builder);
                } else {
                    self.method = Some(builder);
                }
            }
            b"exception" => {
                if let Some(method) = self.method.as_mut() {
                    method.exception_class = attr(element, b"class").unwrap_or_default();
                }
            }
            b"message" if !self_closing => self.target = Some(TextTarget::Message),
            b"full-stacktrace" if !self_closing => self.target = Some(TextTarget::Stack),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"message" | b"full-stacktrace" => self.target = None,
            b"test-method" => {
                if let Some(builder) = self.method.take() {
                    self.push(builder);
                }
            }
            b"class" => self.class_name.clear(),
            b"test" => self.test.clear(),
            b"suite" => self.suite.clear(),
            _ => {}
        }
    }

    fn append_text(&mut self, value: &str) {
        let (Some(target), Some(method)) = (self.target, self.method.as_mut()) else {
            return;
        };
        match target {
            TextTarget::Message => method.message.push_str(value),
            TextTarget::Stack => method.stack.push_str(value),
        }
    }

    fn push(&mut self, builder: MethodBuilder) {
        let group = self.group();
        if let Some(record) = builder.finish(&self.class_name, &group) {
            self.records.push(record);
        }
    }
}

pub(super) fn parse(content: &str, path: Option<&Path>) -> Result<Vec<FailureRecord>> {
    let mut reader = Reader::from_str(content);
    let mut state = TestNgState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => state.open(&e, false),
            Ok(Event::Empty(e)) => state.open(&e, true),
            Ok(Event::End(e)) => state.close(e.local_name().as_ref()),
            Ok(Event::Text(t)) => state.append_text(&text(&t)),
            Ok(Event::CData(c)) => state.append_text(&cdata(&c)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(malformed(err, path)),
        }
    }

    Ok(state.records)
}
