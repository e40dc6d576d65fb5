//! JUnit XML dialect (Surefire, pytest `--junitxml`, Playwright/Cypress junit reporters).
//!
//! ```text
//! testsuites?
//!   testsuite name timestamp
//!     testcase classname name time
//!       failure|error message type   (text = stack trace)
//!       skipped
//! ```

use super::xml::{attr, cdata, malformed, message_from_stack, parse_timestamp, text};
use crate::core::{FailureCategory, FailureRecord, TestStatus};
use crate::error::Result;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

#[derive(Debug, Default)]
struct CaseBuilder {
    class_name: String,
    name: String,
    duration_ms: u64,
    status: Option<TestStatus>,
    failure_type: String,
    message: String,
    body: String,
}

impl CaseBuilder {
    fn from_element(element: &BytesStart<'_>) -> Self {
        Self {
            class_name: attr(element, b"classname").unwrap_or_default(),
            name: attr(element, b"name").unwrap_or_default(),
            duration_ms: attr(element, b"time")
                .and_then(|t| t.trim().parse::<f64>().ok())
                .map(|secs| (secs * 1000.0).round().max(0.0) as u64)
                .unwrap_or(0),
            ..Default::default()
        }
    }

    fn mark_failure(&mut self, element: &BytesStart<'_>) {
        self.status = Some(TestStatus::Fail);
        self.failure_type = attr(element, b"type").unwrap_or_default();
        self.message = attr(element, b"message").unwrap_or_default();
    }

    fn finish(self, suite: &str, timestamp: Option<DateTime<Utc>>) -> FailureRecord {
        let status = self.status.unwrap_or(TestStatus::Pass);
        let stack_trace = self.body.trim().to_string();
        let mut error_message = self.message.trim().to_string();
        if error_message.is_empty() && status == TestStatus::Fail {
            error_message = message_from_stack(&stack_trace);
        }
        let category = if status == TestStatus::Fail {
            FailureCategory::infer(&self.failure_type, &error_message)
        } else {
            FailureCategory::Unknown
        };
        let test_id = if self.class_name.is_empty() {
            self.name
        } else {
            format!("{}.{}", self.class_name, self.name)
        };

        FailureRecord {
            test_id,
            suite: suite.to_string(),
            status,
            failure_type_label: self.failure_type,
            error_message,
            stack_trace,
            duration_ms: self.duration_ms,
            timestamp,
            category,
        }
    }
}

#[derive(Debug, Default)]
struct JUnitState {
    suites: Vec<(String, Option<DateTime<Utc>>)>,
    case: Option<CaseBuilder>,
    capturing: bool,
    records: Vec<FailureRecord>,
}

impl JUnitState {
    fn current_suite(&self) -> (String, Option<DateTime<Utc>>) {
        let name = self
            .suites
            .iter()
            .map(|(n, _)| n.as_str())
            .filter(|n| !n.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        let timestamp = self.suites.iter().rev().find_map(|(_, ts)| *ts);
        (name, timestamp)
    }

    fn open(&mut self, element: &BytesStart<'_>, self_closing: bool) {
        match element.local_name().as_ref() {
            b"testsuite" if !self_closing => self.suites.push((
                attr(element, b"name").unwrap_or_default(),
                attr(element, b"timestamp").as_deref().and_then(parse_timestamp),
            )),
            b"testcase" => {
                let builder = CaseBuilder::from_element(element);
                if self_closing {
                    self.push(builder);
                } else {
                    self.case = Some(builder);
                }
            }
            b"failure" | b"error" => {
                if let Some(case) = self.case.as_mut() {
                    case.mark_failure(element);
                    self.capturing = !self_closing;
                }
            }
            b"skipped" => {
                if let Some(case) = self.case.as_mut() {
                    if case.status.is_none() {
                        case.status = Some(TestStatus::Skip);
                    }
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"failure" | b"error" => self.capturing = false,
            b"testcase" => {
                if let Some(builder) = self.case.take() {
                    self.push(builder);
                }
            }
            b"testsuite" => {
                self.suites.pop();
            }
            _ => {}
        }
    }

    fn append_text(&mut self, value: &str) {
        if !self.capturing {
            return;
        }
        if let Some(case) = self.case.as_mut() {
            case.body.push_str(value);
        }
    }

    fn push(&mut self, builder: CaseBuilder) {
        let (suite, timestamp) = self.current_suite();
        self.records.push(builder.finish(&suite, timestamp));
    }
}

pub(super) fn parse(content: &str, path: Option<&Path>) -> Result<Vec<FailureRecord>> {
    let mut reader = Reader::from_str(content);
    let mut state = JUnitState::default();

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
