//! Structured report and framework log parsing through the public API.

mod common;

use common::fixtures;
use failtriage::assert_format_error;
use failtriage::logs::parse_log;
use failtriage::report::{parse_report, ReportFormat, ReportParser};
use failtriage::{FailureCategory, LogLevel, TestStatus};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::path::Path;
use tempfile::TempDir;

#[test]
fn test_testng_report_flattens_methods_and_skips_passing_config() {
    let report = parse_report(fixtures::TESTNG_TIMEOUT, None).unwrap();
    assert_eq!(report.format, ReportFormat::TestNg);
    assert_eq!(report.counters.total, 2);
    assert_eq!(report.counters.passed, 1);
    assert_eq!(report.counters.failed, 1);

    let failing: Vec<_> = report.records.iter().filter(|r| r.is_failing()).collect();
    assert_eq!(failing.len(), 1);
    let record = failing[0];
    assert_eq!(record.test_id, "com.acme.tests.LoginTest.testLogin");
    assert_eq!(record.failure_type_label, "org.openqa.selenium.TimeoutException");
    assert_eq!(record.category, FailureCategory::Infrastructure);
    assert_eq!(record.duration_ms, 30012);
    assert_eq!(record.simple_class_name(), "LoginTest");
    assert_eq!(record.method_name(), "testLogin");
    assert!(record.has_stack_trace());
}

#[test]
fn test_junit_errors_count_as_failures() {
    let report = parse_report(fixtures::JUNIT_MIXED, None).unwrap();
    assert_eq!(report.format, ReportFormat::JUnit);
    assert_eq!(report.counters.total, 4);
    assert_eq!(report.counters.passed, 1);
    assert_eq!(report.counters.failed, 2);
    assert_eq!(report.counters.skipped, 1);

    let connect = report
        .records
        .iter()
        .find(|r| r.test_id.ends_with("listsUsers"))
        .unwrap();
    assert_eq!(connect.status, TestStatus::Fail);
    assert_eq!(connect.category, FailureCategory::Infrastructure);
}

#[test]
fn test_html_report_names_the_expected_artifact() {
    let path = Path::new("target/surefire-reports/emailable-report.html");
    assert_format_error!(
        parse_report(fixtures::HTML_REPORT, Some(path)),
        "testng-results.xml"
    );
}

#[test]
fn test_parser_counters_span_reports_but_not_failures() {
    let dir = TempDir::new().unwrap();
    let good = common::write_fixture(dir.path(), "testng-results.xml", fixtures::TESTNG_TIMEOUT);
    let bad = common::write_fixture(dir.path(), "index.html", fixtures::HTML_REPORT);
    let junit = common::write_fixture(dir.path(), "TEST-api.xml", fixtures::JUNIT_MIXED);

    let mut parser = ReportParser::new();
    parser.parse_file(&good).unwrap();
    assert!(parser.parse_file(&bad).is_err());
    parser.parse_file(&junit).unwrap();

    let counters = parser.counters();
    assert_eq!(counters.total, 6);
    assert_eq!(counters.failed, 3);
}

#[test]
fn test_method_without_status_is_not_counted_as_failure() {
    let xml = r#"<testng-results><suite name="S"><test name="T"><class name="com.acme.CartTest">
        <test-method name="noStatus" duration-ms="5"/>
        <test-method status="PASS" name="addsItem"/>
    </class></test></suite></testng-results>"#;
    let report = parse_report(xml, None).unwrap();
    assert_eq!(report.counters.total, 2);
    assert_eq!(report.counters.failed, 0);
    assert_eq!(report.counters.skipped, 1);
    assert!(report.records.iter().all(|r| !r.is_failing()));
}

#[test]
fn test_missing_report_is_io_error() {
    let mut parser = ReportParser::new();
    let err = parser
        .parse_file(Path::new("/nonexistent/testng-results.xml"))
        .unwrap_err();
    assert_eq!(err.category(), "I/O");
}

#[test]
fn test_selenium_log_levels_and_continuations() {
    let log = parse_log(fixtures::SELENIUM_LOG);
    assert_eq!(log.entries.len(), 3);
    assert_eq!(log.errors().count(), 1);
    assert_eq!(log.warnings().count(), 1);

    let error = log.errors().next().unwrap();
    assert_eq!(error.level, LogLevel::Error);
    assert_eq!(error.component, "com.acme.tests.LoginTest");
    assert!(error.full_text().contains("LoginPage.java:42"));
    assert_eq!(log.infrastructure().count(), 1);
}

proptest! {
    #[test]
    fn prop_report_parser_never_panics(content in "\\PC{0,400}") {
        let _ = parse_report(&content, None);
    }

    #[test]
    fn prop_log_parser_is_deterministic(content in "[ -~\n\t]{0,400}") {
        prop_assert_eq!(parse_log(&content), parse_log(&content));
    }
}
