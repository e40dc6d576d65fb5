//! End-to-end triage through the library: correlation, rule resolution,
//! persisted history and CI decisions.

mod common;

use common::{day, fixtures};
use failtriage::history::{load_snapshot, HistoryStore, InMemoryHistoryStore};
use failtriage::logs::parse_log;
use failtriage::report::parse_report;
use failtriage::rules::PackSource;
use failtriage::pipeline::InputKind;
use failtriage::{
    CiConfig, CiDecision, CorrelationEngine, FailureCategory, FailureType, InputSource,
    LogQuality, MatchKind, Nature, Platform, RuleEngine, RuleRegistry, RunInputs, TriagePipeline,
};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn checkout_inputs() -> RunInputs {
    RunInputs::new()
        .with_report(InputSource::inline(
            "testng-results.xml",
            fixtures::TESTNG_SERVER_ERROR,
        ))
        .with_log(InputSource::inline("automation.log", fixtures::CHECKOUT_LOG))
        .with_app_log(InputSource::inline("app.log", fixtures::APP_LOG))
}

#[test]
fn test_component_correlation_yields_good_log_quality() {
    let report = parse_report(fixtures::TESTNG_TIMEOUT, None).unwrap();
    let log = parse_log(fixtures::SELENIUM_LOG);
    let correlated = CorrelationEngine::new(Some(&log)).correlate(&report.records);

    assert_eq!(correlated.len(), 1);
    let failure = &correlated[0];
    assert_eq!(failure.match_kind, MatchKind::ComponentName);
    assert!(failure.is_infrastructure);
    assert_eq!(failure.category, FailureCategory::Infrastructure);
    assert_eq!(failure.log_quality(), Some(LogQuality::Good));
}

#[test]
fn test_selenium_pack_classifies_wait_timeout() {
    let registry = RuleRegistry::builtin_only();
    let engine = RuleEngine::new(registry.resolve("selenium"));
    let report = parse_report(fixtures::TESTNG_TIMEOUT, None).unwrap();
    let failing: Vec<_> = report.records.iter().filter(|r| r.is_failing()).collect();

    let classification = engine.classify(&failing);
    assert_eq!(classification.failure_type, FailureType::EnvironmentIssue);
    assert_eq!(classification.confidence, 0.75);
    assert!(classification.rule_ids().contains(&"selenium-wait-timeout"));
    assert!(classification.rule_ids().contains(&"timeout"));
}

#[test]
fn test_central_document_overrides_builtin_pack() {
    let central = json!({
        "frameworks": {
            "selenium": {
                "rules": [
                    { "id": "team-captcha", "any": ["captcha"], "failure_type": "ENVIRONMENT_ISSUE", "confidence": 0.95 },
                    { "id": "broken", "failure_type": "NOT_A_TYPE", "confidence": 0.5 }
                ]
            }
        }
    });
    let registry = RuleRegistry::new(Some(central), None);
    let pack = registry.resolve("selenium");

    assert_eq!(pack.len(), 1);
    assert_eq!(pack.skipped, 1);
    assert_eq!(
        pack.source,
        PackSource::Config {
            key_path: "frameworks.selenium.rules".to_string()
        }
    );

    let classification = RuleEngine::new(pack).classify(&["Blocked by CAPTCHA page"]);
    assert_eq!(classification.failure_type, FailureType::EnvironmentIssue);
    assert_eq!(classification.confidence, 0.95);
}

#[test]
fn test_rules_directory_pack_extends_generic() {
    let dir = TempDir::new().unwrap();
    common::write_fixture(
        dir.path(),
        "rules/playwright.yaml",
        indoc! {r#"
            name: team-playwright
            version: "4"
            extends: generic
            rules:
              - id: checkout-banner
                any: ["cookie banner"]
                failure_type: AUTOMATION_DEFECT
                confidence: 0.8
                priority: 5
        "#},
    );
    let registry = RuleRegistry::new(None, Some(dir.path().join("rules")));

    let pack = registry.resolve("playwright");
    assert_eq!(pack.name, "team-playwright");
    assert_eq!(pack.version, "4");
    assert_eq!(pack.rules[0].id, "checkout-banner");
    assert!(pack.rules.iter().any(|r| r.id == "connection-refused"));

    // No file for cypress: the built-in pack is used.
    assert_eq!(registry.resolve("cypress").source, PackSource::BuiltIn);
}

#[test]
fn test_history_persists_across_runs_until_failure_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join(".failtriage/history.json");
    let registry = RuleRegistry::builtin_only();
    let inputs = checkout_inputs();

    let mut decisions = Vec::new();
    for run in 0..5 {
        let store = InMemoryHistoryStore::load(&snapshot);
        let outcome = TriagePipeline::new(&registry, &store).run(&inputs, day(run));
        store.save(&snapshot).unwrap();
        decisions.push((outcome.outputs[0].nature, outcome.outputs[0].decision));
    }

    assert_eq!(decisions[0].0, Nature::Unknown);
    assert_eq!(decisions[4], (Nature::Deterministic, CiDecision::Fail));

    let table = load_snapshot(&snapshot).unwrap();
    assert_eq!(table.len(), 1);
    let history = table.iter().next().unwrap();
    assert_eq!(history.occurrences, 5);
    assert_eq!(history.consecutive_failures, 5);
    assert_eq!(history.test_name, "com.acme.checkout.CheckoutTest.testPlaceOrder");
}

#[test]
fn test_junit_failures_are_classified_independently() {
    let registry = RuleRegistry::builtin_only();
    let store = InMemoryHistoryStore::new();
    let inputs = RunInputs::new().with_report(InputSource::inline("TEST-api.xml", fixtures::JUNIT_MIXED));

    let outcome = TriagePipeline::new(&registry, &store).run(&inputs, day(0));
    assert_eq!(outcome.framework, "generic");
    assert_eq!(outcome.outputs.len(), 2);
    assert_eq!(outcome.summary.total, 4);
    assert_eq!(outcome.summary.skipped, 1);

    let by_test = |suffix: &str| {
        outcome
            .outputs
            .iter()
            .find(|o| o.test_id.ends_with(suffix))
            .unwrap()
    };
    assert_eq!(by_test("rejectsDuplicate").failure_type, FailureType::ProductDefect);
    assert_eq!(by_test("listsUsers").failure_type, FailureType::EnvironmentIssue);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_log_files_merge_in_order_and_missing_ones_become_input_errors() {
    let dir = TempDir::new().unwrap();
    let first = common::write_fixture(dir.path(), "selenium.log", fixtures::SELENIUM_LOG);
    let second = common::write_fixture(dir.path(), "checkout.log", fixtures::CHECKOUT_LOG);
    let missing = dir.path().join("absent.log");

    let registry = RuleRegistry::builtin_only();
    let store = InMemoryHistoryStore::new();
    let inputs = RunInputs::new()
        .with_report(InputSource::inline(
            "testng-results.xml",
            fixtures::TESTNG_SERVER_ERROR,
        ))
        .with_log(first.as_path())
        .with_log(missing.as_path())
        .with_log(second.as_path());

    let outcome = TriagePipeline::new(&registry, &store).run(&inputs, day(0));
    assert_eq!(outcome.input_errors.len(), 1);
    assert_eq!(outcome.input_errors[0].kind, InputKind::Log);
    assert_eq!(outcome.outputs[0].match_kind, MatchKind::ComponentName);
    assert_eq!(outcome.reports_loaded, 1);
}

#[test]
fn test_annotations_follow_configured_platform() {
    let registry = RuleRegistry::builtin_only();
    let store = InMemoryHistoryStore::new();
    let ci = CiConfig {
        platform: Platform::Github,
        ..CiConfig::default()
    };
    let inputs = RunInputs::new().with_report(InputSource::inline(
        "testng-results.xml",
        fixtures::TESTNG_SERVER_ERROR,
    ));

    let outcome = TriagePipeline::new(&registry, &store)
        .with_ci_config(ci)
        .run(&inputs, day(0));
    let output = &outcome.outputs[0];
    assert_eq!(output.decision, CiDecision::Warn);
    let annotation = output.annotation.as_deref().unwrap();
    assert!(annotation.starts_with("::warning title="));
    assert!(annotation.contains("file=CheckoutTest.java,line=57"));
}

#[test]
fn test_stricter_threshold_turns_fail_into_warn() {
    let registry = RuleRegistry::builtin_only();
    let store = InMemoryHistoryStore::new();
    let inputs = checkout_inputs();
    for run in 0..4 {
        TriagePipeline::new(&registry, &store).run(&inputs, day(run));
    }

    let strict = CiConfig {
        min_confidence_to_fail: 0.99,
        ..CiConfig::default()
    };
    let outcome = TriagePipeline::new(&registry, &store)
        .with_ci_config(strict)
        .run(&inputs, day(4));
    assert_eq!(outcome.outputs[0].nature, Nature::Deterministic);
    assert_eq!(outcome.outputs[0].decision, CiDecision::Warn);
    assert_eq!(outcome.exit_code(), 0);
}

#[test]
fn test_cleanup_evicts_signatures_outside_retention() {
    let registry = RuleRegistry::builtin_only();
    let store = InMemoryHistoryStore::new();
    TriagePipeline::new(&registry, &store).run(&checkout_inputs(), day(0));
    assert_eq!(store.len(), 1);

    let evicted = store.cleanup(chrono::Duration::days(30), day(45));
    assert_eq!(evicted, 1);
    assert!(store.is_empty());
}
