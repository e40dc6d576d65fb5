pub mod code_reference;
pub mod signal;

pub use code_reference::{resolve_code_reference, CodeReference};
pub use signal::Signal;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one test method as reported by the test framework.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
}

impl TestStatus {
    /// Parse a framework status label. Unrecognized labels are treated as
    /// failures so that nothing broken is silently dropped; a missing (empty)
    /// label is partial data and becomes `Skip`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "pass" | "passed" | "success" | "ok" => TestStatus::Pass,
            "" | "skip" | "skipped" | "ignored" | "disabled" => TestStatus::Skip,
            _ => TestStatus::Fail,
        }
    }

    pub fn is_failing(self) -> bool {
        self == TestStatus::Fail
    }
}

/// Coarse category assigned by the report parser before any log evidence is seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCategory {
    TestAssertion,
    Infrastructure,
    Environment,
    Application,
    Flaky,
    Unknown,
}

const ASSERTION_MARKERS: &[&str] = &[
    "assertionerror",
    "assertionfailederror",
    "comparisonfailure",
    "assert ",
    "expected:",
    "expected [",
    "but was",
    "but found",
];

/// Connectivity, timeout and session keywords. Shared with the correlation
/// engine, which uses them to upgrade a category to infrastructure.
pub const INFRASTRUCTURE_KEYWORDS: &[&str] = &[
    "timeout",
    "timed out",
    "connection refused",
    "connection reset",
    "connectexception",
    "unreachable",
    "no such session",
    "nosuchsession",
    "session not created",
    "sessionnotcreated",
    "session deleted",
    "invalid session id",
    "unknownhost",
    "socketexception",
    "econnrefused",
    "econnreset",
    "selenium grid",
    "grid node",
];

const ENVIRONMENT_MARKERS: &[&str] = &[
    "environment variable",
    "permission denied",
    "no such file",
    "filenotfound",
    "disk full",
    "no space left",
    "out of memory",
    "outofmemory",
    "certificate",
    "sslhandshake",
    "ssl handshake",
];

const APPLICATION_MARKERS: &[&str] = &[
    "500 internal server error",
    "internal server error",
    "status code 500",
    "http 500",
    "502 bad gateway",
    "503 service unavailable",
    "nullpointerexception",
    "unhandled exception",
];

impl FailureCategory {
    /// Guess the coarse category from an exception type label and message.
    pub fn infer(failure_type_label: &str, message: &str) -> Self {
        let text = format!("{} {}", failure_type_label, message).to_lowercase();
        let has_any = |markers: &[&str]| markers.iter().any(|m| text.contains(m));

        if has_any(INFRASTRUCTURE_KEYWORDS) {
            FailureCategory::Infrastructure
        } else if has_any(ASSERTION_MARKERS) {
            FailureCategory::TestAssertion
        } else if has_any(ENVIRONMENT_MARKERS) {
            FailureCategory::Environment
        } else if has_any(APPLICATION_MARKERS) {
            FailureCategory::Application
        } else {
            FailureCategory::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FailureCategory::TestAssertion => "test-assertion",
            FailureCategory::Infrastructure => "infrastructure",
            FailureCategory::Environment => "environment",
            FailureCategory::Application => "application",
            FailureCategory::Flaky => "flaky",
            FailureCategory::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classification outcome of the rule engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureType {
    ProductDefect,
    AutomationDefect,
    EnvironmentIssue,
    ConfigurationIssue,
    Unknown,
}

impl FailureType {
    pub const ALL: [FailureType; 5] = [
        FailureType::ProductDefect,
        FailureType::AutomationDefect,
        FailureType::EnvironmentIssue,
        FailureType::ConfigurationIssue,
        FailureType::Unknown,
    ];

    /// Parse a type label such as `PRODUCT_DEFECT` or `product-defect`.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "PRODUCT_DEFECT" | "PRODUCT" => Some(FailureType::ProductDefect),
            "AUTOMATION_DEFECT" | "AUTOMATION" | "TEST_DEFECT" => {
                Some(FailureType::AutomationDefect)
            }
            "ENVIRONMENT_ISSUE" | "ENVIRONMENT" | "INFRASTRUCTURE" => {
                Some(FailureType::EnvironmentIssue)
            }
            "CONFIGURATION_ISSUE" | "CONFIGURATION" | "CONFIG" => {
                Some(FailureType::ConfigurationIssue)
            }
            "UNKNOWN" => Some(FailureType::Unknown),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureType::ProductDefect => "PRODUCT_DEFECT",
            FailureType::AutomationDefect => "AUTOMATION_DEFECT",
            FailureType::EnvironmentIssue => "ENVIRONMENT_ISSUE",
            FailureType::ConfigurationIssue => "CONFIGURATION_ISSUE",
            FailureType::Unknown => "UNKNOWN",
        }
    }

    /// Human-readable label used in annotations.
    pub fn title(self) -> &'static str {
        match self {
            FailureType::ProductDefect => "Product defect",
            FailureType::AutomationDefect => "Automation defect",
            FailureType::EnvironmentIssue => "Environment issue",
            FailureType::ConfigurationIssue => "Configuration issue",
            FailureType::Unknown => "Unclassified failure",
        }
    }
}

impl std::fmt::Display for FailureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a recurring failure is intermittent or reproducible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Nature {
    Flaky,
    Deterministic,
    #[default]
    Unknown,
}

impl Nature {
    pub fn as_str(self) -> &'static str {
        match self {
            Nature::Flaky => "FLAKY",
            Nature::Deterministic => "DETERMINISTIC",
            Nature::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Nature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One test method's result, flattened out of the structured report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Qualified id, `class.method`.
    pub test_id: String,
    /// Suite or group the method ran under.
    pub suite: String,
    pub status: TestStatus,
    /// Exception class or framework failure type, e.g. `org.openqa.selenium.TimeoutException`.
    pub failure_type_label: String,
    pub error_message: String,
    pub stack_trace: String,
    pub duration_ms: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub category: FailureCategory,
}

impl FailureRecord {
    /// Class part of the qualified id (everything before the last dot).
    pub fn class_name(&self) -> &str {
        self.test_id
            .rsplit_once('.')
            .map(|(class, _)| class)
            .unwrap_or(&self.test_id)
    }

    /// Unqualified class name, e.g. `LoginTest` for `com.acme.LoginTest`.
    pub fn simple_class_name(&self) -> &str {
        let class = self.class_name();
        class.rsplit_once('.').map(|(_, s)| s).unwrap_or(class)
    }

    pub fn method_name(&self) -> &str {
        self.test_id
            .rsplit_once('.')
            .map(|(_, method)| method)
            .unwrap_or(&self.test_id)
    }

    pub fn is_failing(&self) -> bool {
        self.status.is_failing()
    }

    pub fn has_stack_trace(&self) -> bool {
        !self.stack_trace.trim().is_empty()
    }

    /// First non-empty line of the error message, else of the stack trace.
    pub fn first_error_line(&self) -> &str {
        self.error_message
            .lines()
            .chain(self.stack_trace.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "TRACE" | "FINEST" | "FINER" => Some(LogLevel::Trace),
            "DEBUG" | "FINE" => Some(LogLevel::Debug),
            "INFO" | "CONFIG" => Some(LogLevel::Info),
            "WARN" | "WARNING" => Some(LogLevel::Warn),
            "ERROR" | "SEVERE" | "ERR" => Some(LogLevel::Error),
            "FATAL" | "CRITICAL" => Some(LogLevel::Fatal),
            _ => None,
        }
    }

    pub fn is_error(self) -> bool {
        self >= LogLevel::Error
    }
}

/// One leveled line from a framework log, with any stack-frame continuation lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp text as it appeared in the log; formats vary per framework.
    pub timestamp: Option<String>,
    pub level: LogLevel,
    /// Logger, class or thread that emitted the line.
    pub component: String,
    pub message: String,
    /// Multi-line exception text appended from continuation lines.
    pub exception: Option<String>,
    /// 1-based line number of the leveled line in its source.
    pub line: usize,
}

impl LogEntry {
    /// Message and exception text together, for keyword searches.
    pub fn full_text(&self) -> String {
        match &self.exception {
            Some(exception) => format!("{}\n{}", self.message, exception),
            None => self.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> FailureRecord {
        FailureRecord {
            test_id: id.to_string(),
            suite: "smoke".to_string(),
            status: TestStatus::Fail,
            failure_type_label: String::new(),
            error_message: String::new(),
            stack_trace: String::new(),
            duration_ms: 0,
            timestamp: None,
            category: FailureCategory::Unknown,
        }
    }

    #[test]
    fn test_class_and_method_split() {
        let r = record("com.acme.LoginTest.testValidLogin");
        assert_eq!(r.class_name(), "com.acme.LoginTest");
        assert_eq!(r.simple_class_name(), "LoginTest");
        assert_eq!(r.method_name(), "testValidLogin");
    }

    #[test]
    fn test_unqualified_id() {
        let r = record("standalone");
        assert_eq!(r.class_name(), "standalone");
        assert_eq!(r.method_name(), "standalone");
    }

    #[test]
    fn test_first_error_line_falls_back_to_stack() {
        let mut r = record("a.b");
        r.stack_trace = "\n  java.lang.AssertionError: boom\n\tat a.b(B.java:1)".to_string();
        assert_eq!(r.first_error_line(), "java.lang.AssertionError: boom");
    }

    #[test]
    fn test_category_inference() {
        assert_eq!(
            FailureCategory::infer(
                "org.openqa.selenium.TimeoutException",
                "Timeout waiting for element"
            ),
            FailureCategory::Infrastructure
        );
        assert_eq!(
            FailureCategory::infer("java.lang.AssertionError", "expected [3] but found [4]"),
            FailureCategory::TestAssertion
        );
        assert_eq!(
            FailureCategory::infer("java.io.IOException", "Permission denied"),
            FailureCategory::Environment
        );
        assert_eq!(
            FailureCategory::infer("HttpError", "500 Internal Server Error"),
            FailureCategory::Application
        );
        assert_eq!(
            FailureCategory::infer("Weird", "something odd"),
            FailureCategory::Unknown
        );
    }

    #[test]
    fn test_failure_type_parse_accepts_variants() {
        assert_eq!(
            FailureType::parse("product-defect"),
            Some(FailureType::ProductDefect)
        );
        assert_eq!(
            FailureType::parse("ENVIRONMENT_ISSUE"),
            Some(FailureType::EnvironmentIssue)
        );
        assert_eq!(FailureType::parse("banana"), None);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(TestStatus::parse("PASS"), TestStatus::Pass);
        assert_eq!(TestStatus::parse("SKIP"), TestStatus::Skip);
        assert_eq!(TestStatus::parse("FAIL"), TestStatus::Fail);
        assert_eq!(TestStatus::parse("weird"), TestStatus::Fail);
        assert_eq!(TestStatus::parse(""), TestStatus::Skip);
        assert_eq!(TestStatus::parse("  "), TestStatus::Skip);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Fatal.is_error());
        assert!(LogLevel::Error.is_error());
        assert!(!LogLevel::Warn.is_error());
        assert_eq!(LogLevel::parse("severe"), Some(LogLevel::Error));
    }
}
