//! Structured test-result report parsing.
//!
//! Turns a machine-readable report (TestNG `testng-results.xml` or a JUnit
//! XML report) into an ordered, flat sequence of [`FailureRecord`]s. Nested
//! suite/class/method structure is flattened and every record id is
//! `class.method`.
//!
//! A wrong artifact (most commonly TestNG's human-readable
//! `emailable-report.html`) is rejected with a format error that names the
//! artifact to use instead. Missing optional fields default to zero/empty
//! and are never errors.

mod junit;
mod testng;
mod xml;

use crate::core::{FailureRecord, TestStatus};
use crate::error::{Result, TriageError};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The artifact users should point the parser at.
pub const EXPECTED_ARTIFACT: &str = "testng-results.xml";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    TestNg,
    JUnit,
}

/// Pass/fail/skip counters accumulated while parsing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounters {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ReportCounters {
    fn count(&mut self, status: TestStatus) {
        self.total += 1;
        match status {
            TestStatus::Pass => self.passed += 1,
            TestStatus::Fail => self.failed += 1,
            TestStatus::Skip => self.skipped += 1,
        }
    }

    pub fn merge(&mut self, other: &ReportCounters) {
        self.total += other.total;
        self.passed += other.passed;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Records and counters of one parsed report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParsedReport {
    pub format: ReportFormat,
    pub records: Vec<FailureRecord>,
    pub counters: ReportCounters,
}

/// Parses reports and keeps run-wide counters across every report it has seen.
#[derive(Debug, Default)]
pub struct ReportParser {
    counters: ReportCounters,
}

impl ReportParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters accumulated over all successfully parsed reports.
    pub fn counters(&self) -> ReportCounters {
        self.counters
    }

    pub fn parse_file(&mut self, path: &Path) -> Result<ParsedReport> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TriageError::from_io_error(e, Some(path.to_path_buf())))?;
        self.parse_str(&content, Some(path))
    }

    pub fn parse_str(&mut self, content: &str, path: Option<&Path>) -> Result<ParsedReport> {
        let report = parse_report(content, path)?;
        self.counters.merge(&report.counters);
        Ok(report)
    }
}

/// Parse a report document. Pure: the same input always yields the same output.
pub fn parse_report(content: &str, path: Option<&Path>) -> Result<ParsedReport> {
    let owned_path = path.map(Path::to_path_buf);
    let format = match detect_root(content) {
        RootKind::TestNg => ReportFormat::TestNg,
        RootKind::JUnit => ReportFormat::JUnit,
        RootKind::Html => {
            return Err(TriageError::format(
                format!(
                    "{EXPECTED_ARTIFACT} (the HTML report is for humans; TestNG writes {EXPECTED_ARTIFACT} next to it)"
                ),
                "html",
                owned_path,
            ))
        }
        RootKind::Other(root) => {
            return Err(TriageError::format(
                format!("{EXPECTED_ARTIFACT} or a JUnit XML report"),
                root,
                owned_path,
            ))
        }
        RootKind::Empty => {
            return Err(TriageError::format(
                EXPECTED_ARTIFACT,
                "empty document",
                owned_path,
            ))
        }
    };

    let records = match format {
        ReportFormat::TestNg => testng::parse(content, path)?,
        ReportFormat::JUnit => junit::parse(content, path)?,
    };

    let mut counters = ReportCounters::default();
    records.iter().for_each(|r| counters.count(r.status));

    log::debug!(
        "Parsed {:?} report with {} records ({} failed)",
        format,
        counters.total,
        counters.failed
    );

    Ok(ParsedReport {
        format,
        records,
        counters,
    })
}

#[derive(Debug, PartialEq, Eq)]
enum RootKind {
    TestNg,
    JUnit,
    Html,
    Other(String),
    Empty,
}

fn looks_like_html(content: &str) -> bool {
    let head: String = content
        .trim_start_matches('\u{feff}')
        .trim_start()
        .chars()
        .take(64)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

fn detect_root(content: &str) -> RootKind {
    if looks_like_html(content) {
        return RootKind::Html;
    }

    let mut reader = Reader::from_str(content);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase();
                return match name.as_str() {
                    "testng-results" => RootKind::TestNg,
                    "testsuites" | "testsuite" => RootKind::JUnit,
                    "html" => RootKind::Html,
                    _ => RootKind::Other(name),
                };
            }
            Ok(Event::DocType(d)) => {
                if String::from_utf8_lossy(&d).to_ascii_lowercase().contains("html") {
                    return RootKind::Html;
                }
            }
            Ok(Event::Eof) => return RootKind::Empty,
            Ok(_) => {}
            Err(_) => return RootKind::Other("malformed XML".to_string()),
        }
    }
}
