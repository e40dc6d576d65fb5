//! Fluent builders for test data.
//!
//! ```rust,ignore
//! use failtriage::testkit::FailureRecordBuilder;
//!
//! let record = FailureRecordBuilder::new("com.acme.LoginTest.testLogin")
//!     .exception("org.openqa.selenium.TimeoutException", "Timeout waiting for element")
//!     .build();
//! ```

use crate::ci::{CiDecision, CiOutput};
use crate::core::{FailureCategory, FailureRecord, FailureType, LogEntry, LogLevel, Nature, TestStatus};
use crate::correlation::MatchKind;
use crate::history::FailureSignature;
use crate::scoring::{ConfidenceInputs, ConfidenceScorer};

pub struct FailureRecordBuilder {
    record: FailureRecord,
}

impl FailureRecordBuilder {
    /// A failing record with no evidence attached.
    pub fn new(test_id: &str) -> Self {
        Self {
            record: FailureRecord {
                test_id: test_id.to_string(),
                suite: "suite".to_string(),
                status: TestStatus::Fail,
                failure_type_label: String::new(),
                error_message: String::new(),
                stack_trace: String::new(),
                duration_ms: 0,
                timestamp: None,
                category: FailureCategory::Unknown,
            },
        }
    }

    pub fn status(mut self, status: TestStatus) -> Self {
        self.record.status = status;
        self
    }

    /// Set the exception label and message; the category is inferred from them.
    pub fn exception(mut self, label: &str, message: &str) -> Self {
        self.record.failure_type_label = label.to_string();
        self.record.error_message = message.to_string();
        self.record.category = FailureCategory::infer(label, message);
        self
    }

    pub fn stack_trace(mut self, stack_trace: &str) -> Self {
        self.record.stack_trace = stack_trace.to_string();
        self
    }

    pub fn category(mut self, category: FailureCategory) -> Self {
        self.record.category = category;
        self
    }

    pub fn build(self) -> FailureRecord {
        self.record
    }
}

/// An ERROR entry emitted by `component`.
pub fn error_entry(component: &str, message: &str, exception: Option<&str>) -> LogEntry {
    LogEntry {
        timestamp: None,
        level: LogLevel::Error,
        component: component.to_string(),
        message: message.to_string(),
        exception: exception.map(str::to_string),
        line: 1,
    }
}

pub struct CiOutputBuilder {
    output: CiOutput,
}

impl CiOutputBuilder {
    /// An UNKNOWN, PASS output with a default breakdown.
    pub fn new(test_id: &str) -> Self {
        let breakdown = ConfidenceScorer::new().score(&ConfidenceInputs::default());
        Self {
            output: CiOutput {
                test_id: test_id.to_string(),
                suite: "suite".to_string(),
                framework: "generic".to_string(),
                failure_type: FailureType::Unknown,
                category: FailureCategory::Unknown,
                confidence: breakdown.final_confidence,
                nature: Nature::Unknown,
                nature_confidence: 0.3,
                signature: FailureSignature::compute(test_id, FailureType::Unknown, ""),
                summary: "summary".to_string(),
                root_cause: String::new(),
                match_kind: MatchKind::NoLogSource,
                log_quality: None,
                code_reference: None,
                error_excerpt: None,
                recommendation: "Inspect the failure.".to_string(),
                matched_rules: Vec::new(),
                decision: CiDecision::Pass,
                annotation: None,
                breakdown,
            },
        }
    }

    pub fn failure_type(mut self, failure_type: FailureType) -> Self {
        self.output.failure_type = failure_type;
        self
    }

    pub fn category(mut self, category: FailureCategory) -> Self {
        self.output.category = category;
        self
    }

    pub fn nature(mut self, nature: Nature) -> Self {
        self.output.nature = nature;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.output.confidence = confidence;
        self.output.breakdown.final_confidence = confidence;
        self
    }

    pub fn decision(mut self, decision: CiDecision) -> Self {
        self.output.decision = decision;
        self
    }

    pub fn build(self) -> CiOutput {
        self.output
    }
}
