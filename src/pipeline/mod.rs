//! Per-run orchestration of the triage stages.
//!
//! Stages run in order for every failing test case:
//! report parsing, log parsing, correlation, rule matching, history update,
//! confidence scoring, CI decision and annotation.
//!
//! Correlation, rule matching and scoring are pure per failure and run on a
//! rayon parallel iterator. History updates touch the only shared state and
//! are applied on the calling thread in report order, so updates to one
//! signature are observed in arrival order. Output order follows the reports.

pub mod inputs;

pub use inputs::{
    load_ai_signals, parse_ai_signals, InputError, InputKind, InputSource, RunInputs,
};

use crate::ci::{recommendation, truncate_excerpt, CiConfig, CiOutput, RunSummary, MAX_EXCERPT_CHARS};
use crate::core::{resolve_code_reference, FailureRecord, FailureType, Signal, TestStatus};
use crate::correlation::{CorrelatedFailure, CorrelationEngine};
use crate::history::{FailureHistory, HistoryStore, HistoryTable};
use crate::logs::{parse_log, ParsedLog};
use crate::observability::{
    increment_processed, set_current_source, set_current_test, set_phase, set_progress,
    TriagePhase,
};
use crate::report::{ReportCounters, ReportParser};
use crate::rules::{detect_framework, Classification, RuleEngine, RuleRegistry};
use crate::scoring::{AiSignal, ConfidenceInputs, ConfidenceScorer};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

/// Result of one run.
#[derive(Clone, Debug, Serialize)]
pub struct RunOutcome {
    pub framework: String,
    pub outputs: Vec<CiOutput>,
    pub summary: RunSummary,
    pub input_errors: Vec<InputError>,
    pub reports_total: usize,
    pub reports_loaded: usize,
    /// Updated history, for persistence between runs.
    #[serde(skip)]
    pub history: HistoryTable,
}

impl RunOutcome {
    pub fn all_reports_failed(&self) -> bool {
        self.reports_total > 0 && self.reports_loaded == 0
    }

    /// 2 when no report could be loaded, 1 when any decision is FAIL, else 0.
    pub fn exit_code(&self) -> i32 {
        if self.all_reports_failed() {
            2
        } else if self.summary.has_failures() {
            1
        } else {
            0
        }
    }
}

/// Evidence gathered for one failing test before history and scoring.
struct Assessed {
    correlated: CorrelatedFailure,
    classification: Classification,
    /// Type used for the failure signature, from report evidence only.
    history_type: FailureType,
    signals: Vec<String>,
    has_application_logs: bool,
}

/// Runs the stages against an injected history store and rule registry.
pub struct TriagePipeline<'a> {
    registry: &'a RuleRegistry,
    store: &'a dyn HistoryStore,
    ci: CiConfig,
    max_excerpt_chars: usize,
    scorer: ConfidenceScorer,
}

impl<'a> TriagePipeline<'a> {
    pub fn new(registry: &'a RuleRegistry, store: &'a dyn HistoryStore) -> Self {
        Self {
            registry,
            store,
            ci: CiConfig::default(),
            max_excerpt_chars: MAX_EXCERPT_CHARS,
            scorer: ConfidenceScorer::new(),
        }
    }

    pub fn with_ci_config(mut self, ci: CiConfig) -> Self {
        self.ci = ci.sanitized();
        self
    }

    pub fn with_max_excerpt_chars(mut self, max_chars: usize) -> Self {
        self.max_excerpt_chars = max_chars.min(MAX_EXCERPT_CHARS);
        self
    }

    pub fn ci_config(&self) -> &CiConfig {
        &self.ci
    }

    /// Run every stage. Never fails: unusable inputs are reported in
    /// [`RunOutcome::input_errors`] and the run continues without them.
    pub fn run(&self, inputs: &RunInputs, now: DateTime<Utc>) -> RunOutcome {
        let span = tracing::info_span!("triage_run", reports = inputs.reports.len());
        let _enter = span.enter();
        let mut input_errors = Vec::new();

        let (records, counters, reports_loaded) = self.load_reports(inputs, &mut input_errors);
        let log = load_logs(&inputs.logs, InputKind::Log, &mut input_errors);
        let app_log = load_logs(&inputs.app_logs, InputKind::ApplicationLog, &mut input_errors);
        let ai_signals = inputs.resolve_ai_signals(&mut input_errors);

        let framework = match &inputs.framework {
            Some(name) => name.trim().to_lowercase(),
            None => detect_run_framework(&records, log.as_ref()).to_string(),
        };
        let engine = RuleEngine::new(self.registry.resolve(&framework));

        let failing: Vec<&FailureRecord> = records.iter().filter(|r| r.is_failing()).collect();
        set_progress(0, failing.len());
        log::info!(
            "Triaging {} failing test(s) of {} with the '{}' rule pack",
            failing.len(),
            counters.total,
            engine.pack().name
        );

        let assessed: Vec<Assessed> = {
            let _phase = set_phase(TriagePhase::Correlation);
            let correlation = CorrelationEngine::new(log.as_ref());
            failing
                .par_iter()
                .map(|record| assess(record, &correlation, &engine, app_log.as_ref()))
                .collect()
        };

        let histories = self.update_history(&records, &assessed, now);

        let mut outputs: Vec<CiOutput> = {
            let _phase = set_phase(TriagePhase::Scoring);
            assessed
                .par_iter()
                .zip(histories.par_iter())
                .map(|(item, history)| {
                    self.finish(item, history, &framework, &ai_signals)
                })
                .collect()
        };

        {
            let _phase = set_phase(TriagePhase::Decision);
            let generated_at = now.timestamp();
            for output in &mut outputs {
                output.render_annotation(self.ci.platform, generated_at);
            }
        }

        let summary = RunSummary::build(counters, &outputs, input_errors.len());
        log::info!(
            "Triage complete: {} failure(s), {} FAIL, {} input error(s)",
            outputs.len(),
            summary.fail_count(),
            input_errors.len()
        );

        RunOutcome {
            framework,
            outputs,
            summary,
            input_errors,
            reports_total: inputs.reports.len(),
            reports_loaded,
            history: self.store.snapshot(),
        }
    }

    fn load_reports(
        &self,
        inputs: &RunInputs,
        errors: &mut Vec<InputError>,
    ) -> (Vec<FailureRecord>, ReportCounters, usize) {
        let _phase = set_phase(TriagePhase::ReportParsing);
        let mut parser = ReportParser::new();
        let mut records = Vec::new();
        let mut loaded = 0;

        for source in &inputs.reports {
            let _source = set_current_source(source.label());
            let parsed = source
                .read()
                .and_then(|content| parser.parse_str(&content, source.path()));
            match parsed {
                Ok(report) => {
                    log::debug!(
                        "Parsed {} record(s) from {}",
                        report.records.len(),
                        source.label()
                    );
                    records.extend(report.records);
                    loaded += 1;
                }
                Err(e) => {
                    log::warn!("Skipping report {}: {}", source.label(), e);
                    errors.push(InputError::new(source, InputKind::Report, &e));
                }
            }
        }
        (records, parser.counters(), loaded)
    }

    /// Record passes and failures in report order. Returns the history entry
    /// of each assessed failure, aligned with `assessed`.
    fn update_history(
        &self,
        records: &[FailureRecord],
        assessed: &[Assessed],
        now: DateTime<Utc>,
    ) -> Vec<FailureHistory> {
        let _phase = set_phase(TriagePhase::History);
        let mut failures = assessed.iter();
        let mut histories = Vec::with_capacity(assessed.len());

        for record in records {
            if record.is_failing() {
                let Some(item) = failures.next() else {
                    break;
                };
                histories.push(self.store.record_failure(
                    &record.test_id,
                    item.history_type,
                    signature_message(record),
                    now,
                ));
            } else if record.status == TestStatus::Pass {
                self.store.record_pass(&record.test_id);
            }
        }
        histories
    }

    fn finish(
        &self,
        item: &Assessed,
        history: &FailureHistory,
        framework: &str,
        ai_signals: &HashMap<String, AiSignal>,
    ) -> CiOutput {
        let record = &item.correlated.record;
        let _test = set_current_test(record.test_id.clone());
        let code_reference = resolve_code_reference(&record.stack_trace, Some(record.class_name()));

        let confidence_inputs = ConfidenceInputs::from_classification(&item.classification)
            .with_signals(&item.signals)
            .with_history(history.occurrences, history.consistency())
            .with_logs(item.correlated.log_quality(), item.has_application_logs);
        let confidence_inputs = ConfidenceInputs {
            has_stack_trace: record.has_stack_trace(),
            has_code_reference: code_reference.is_some(),
            ..confidence_inputs
        };
        let breakdown = self
            .scorer
            .score_with_ai(&confidence_inputs, ai_signals.get(&record.test_id));

        let failure_type = item.classification.failure_type;
        let confidence = breakdown.final_confidence;
        let decision = self.ci.decide(failure_type, history.nature, confidence);
        increment_processed();

        CiOutput {
            test_id: record.test_id.clone(),
            suite: record.suite.clone(),
            framework: framework.to_string(),
            failure_type,
            category: item.correlated.category,
            confidence,
            nature: history.nature,
            nature_confidence: history.nature_confidence,
            signature: history.signature.clone(),
            summary: summarize(&item.correlated),
            root_cause: item.correlated.root_cause.clone(),
            match_kind: item.correlated.match_kind,
            log_quality: item.correlated.log_quality(),
            code_reference,
            error_excerpt: truncate_excerpt(&excerpt_source(record), self.max_excerpt_chars),
            recommendation: recommendation(failure_type, history.nature, decision),
            matched_rules: item
                .classification
                .rule_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            decision,
            annotation: None,
            breakdown,
        }
    }
}

fn assess(
    record: &FailureRecord,
    correlation: &CorrelationEngine<'_>,
    engine: &RuleEngine,
    app_log: Option<&ParsedLog>,
) -> Assessed {
    let _test = set_current_test(record.test_id.clone());
    let correlated = correlation.correlate_one(record);

    let _phase = set_phase(TriagePhase::RuleMatching);
    let mut signals = vec![record.text().into_owned()];
    let history_type = engine.classify(&signals).failure_type;
    signals.extend(correlated.errors.iter().map(|e| e.text().into_owned()));
    if !correlated.root_cause.trim().is_empty() {
        signals.push(correlated.root_cause.clone());
    }
    let classification = engine.classify(&signals);

    Assessed {
        has_application_logs: app_log.is_some_and(|log| application_log_relevant(log, record)),
        correlated,
        classification,
        history_type,
        signals,
    }
}

/// Any error at all, or any entry mentioning the failing class or method.
fn application_log_relevant(log: &ParsedLog, record: &FailureRecord) -> bool {
    if log.errors().next().is_some() {
        return true;
    }
    let class = record.simple_class_name().to_lowercase();
    let method = record.method_name().to_lowercase();
    log.entries.iter().any(|entry| {
        let text = entry.full_text().to_lowercase();
        (!class.is_empty() && text.contains(&class)) || (!method.is_empty() && text.contains(&method))
    })
}

fn load_logs(
    sources: &[InputSource],
    kind: InputKind,
    errors: &mut Vec<InputError>,
) -> Option<ParsedLog> {
    let _phase = set_phase(TriagePhase::LogParsing);
    let mut combined: Option<ParsedLog> = None;
    for source in sources {
        let _source = set_current_source(source.label());
        match source.read() {
            Ok(content) => combined
                .get_or_insert_with(ParsedLog::default)
                .extend(parse_log(&content)),
            Err(e) => {
                log::warn!("Log source {} is unavailable: {}", source.label(), e);
                errors.push(InputError::new(source, kind, &e));
            }
        }
    }
    combined
}

fn detect_run_framework(records: &[FailureRecord], log: Option<&ParsedLog>) -> &'static str {
    let mut texts: Vec<&str> = Vec::new();
    for record in records.iter().filter(|r| r.is_failing()) {
        texts.extend([
            record.failure_type_label.as_str(),
            record.error_message.as_str(),
            record.stack_trace.as_str(),
        ]);
    }
    if let Some(log) = log {
        for entry in &log.entries {
            texts.push(entry.component.as_str());
            texts.push(entry.message.as_str());
            if let Some(exception) = &entry.exception {
                texts.push(exception.as_str());
            }
        }
    }
    let framework = detect_framework(texts);
    log::debug!("Detected framework '{}'", framework);
    framework
}

/// The text a signature is computed from: the report's own message, so the
/// same failure keeps its signature whether or not logs were supplied.
fn signature_message(record: &FailureRecord) -> &str {
    if record.error_message.trim().is_empty() {
        record.first_error_line()
    } else {
        &record.error_message
    }
}

fn excerpt_source(record: &FailureRecord) -> String {
    if record.has_stack_trace() {
        record.stack_trace.clone()
    } else {
        record.error_message.clone()
    }
}

fn summarize(correlated: &CorrelatedFailure) -> String {
    let cause = correlated
        .root_cause
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no error message recorded");
    let mut summary: String = cause.chars().take(200).collect();
    if correlated.is_infrastructure {
        summary.push_str(" [infrastructure]");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ci::CiDecision;
    use crate::core::{FailureCategory, FailureType, Nature};
    use crate::history::InMemoryHistoryStore;
    use crate::testkit::fixtures;

    fn at(day: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap() + chrono::Duration::days(day)
    }

    #[test]
    fn test_timeout_failure_is_infrastructure_and_never_fails() {
        let registry = RuleRegistry::builtin_only();
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let inputs = RunInputs::new().with_report(InputSource::inline(
            "testng-results.xml",
            fixtures::TESTNG_TIMEOUT,
        ));

        let outcome = pipeline.run(&inputs, at(0));
        assert_eq!(outcome.outputs.len(), 1);
        let output = &outcome.outputs[0];
        assert_eq!(output.category, FailureCategory::Infrastructure);
        assert!(output.matched_rules.iter().any(|id| id.contains("timeout")));
        assert_eq!(output.failure_type, FailureType::EnvironmentIssue);
        assert_eq!(output.nature, Nature::Unknown);
        assert_ne!(output.decision, CiDecision::Fail);
        assert_eq!(outcome.framework, "selenium");
    }

    #[test]
    fn test_recurring_product_defect_becomes_deterministic_and_fails() {
        let registry = RuleRegistry::builtin_only();
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let inputs = RunInputs::new()
            .with_report(InputSource::inline(
                "testng-results.xml",
                fixtures::TESTNG_SERVER_ERROR,
            ))
            .with_log(InputSource::inline("automation.log", fixtures::CHECKOUT_LOG))
            .with_app_log(InputSource::inline("app.log", fixtures::APP_LOG));

        let mut last = None;
        for day in 0..5 {
            last = Some(pipeline.run(&inputs, at(day)));
        }
        let outcome = last.unwrap();
        let output = &outcome.outputs[0];
        assert_eq!(output.failure_type, FailureType::ProductDefect);
        assert_eq!(output.nature, Nature::Deterministic);
        assert!(output.nature_confidence >= 0.6);
        assert!(output.confidence >= 0.85, "{:?}", output.breakdown);
        assert_eq!(output.decision, CiDecision::Fail);
        assert!(output.annotation.is_some());
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(outcome.history.len(), 1);
    }

    #[test]
    fn test_log_evidence_does_not_split_failure_history() {
        let central = serde_json::json!({
            "rules": { "generic": [
                { "id": "server-500", "any": ["500 internal server error"], "failure_type": "PRODUCT_DEFECT", "confidence": 0.7 },
                { "id": "db-down", "any": ["connection refused"], "failure_type": "ENVIRONMENT_ISSUE", "confidence": 0.9 }
            ]}
        });
        let registry = RuleRegistry::new(Some(central), None);
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let report = InputSource::inline("testng-results.xml", fixtures::TESTNG_SERVER_ERROR);

        let without_logs = RunInputs::new()
            .with_report(report.clone())
            .with_framework("generic");
        let with_logs = without_logs.clone().with_log(InputSource::inline(
            "automation.log",
            "[ERROR] com.acme.checkout.CheckoutTest - Connection refused: db:5432\n",
        ));

        let first = pipeline.run(&without_logs, at(0));
        let second = pipeline.run(&with_logs, at(1));

        assert_eq!(first.outputs[0].failure_type, FailureType::ProductDefect);
        assert_eq!(second.outputs[0].failure_type, FailureType::EnvironmentIssue);
        assert_eq!(first.outputs[0].signature, second.outputs[0].signature);
        assert_eq!(second.history.len(), 1);
        assert_eq!(second.history.iter().next().unwrap().occurrences, 2);
    }

    #[test]
    fn test_first_occurrence_without_logs_only_warns() {
        let registry = RuleRegistry::builtin_only();
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let inputs = RunInputs::new().with_report(InputSource::inline(
            "testng-results.xml",
            fixtures::TESTNG_SERVER_ERROR,
        ));
        let outcome = pipeline.run(&inputs, at(0));
        let output = &outcome.outputs[0];
        assert_eq!(output.nature, Nature::Unknown);
        assert!(output.confidence < 0.85);
        assert_eq!(output.decision, CiDecision::Warn);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[test]
    fn test_intermittent_failure_becomes_flaky_and_never_fails() {
        let registry = RuleRegistry::builtin_only();
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let failing = RunInputs::new().with_report(InputSource::inline(
            "testng-results.xml",
            fixtures::TESTNG_SERVER_ERROR,
        ));
        let passing = RunInputs::new().with_report(InputSource::inline(
            "testng-results.xml",
            fixtures::TESTNG_SERVER_ERROR_PASSING,
        ));

        pipeline.run(&failing, at(0));
        pipeline.run(&failing, at(1));
        pipeline.run(&passing, at(2));
        pipeline.run(&failing, at(3));
        pipeline.run(&passing, at(4));
        let outcome = pipeline.run(&failing, at(5));

        let output = &outcome.outputs[0];
        assert_eq!(output.nature, Nature::Flaky);
        assert_ne!(output.decision, CiDecision::Fail);
    }

    #[test]
    fn test_html_report_is_isolated_format_error() {
        let registry = RuleRegistry::builtin_only();
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let inputs = RunInputs::new()
            .with_report(InputSource::inline("emailable-report.html", fixtures::HTML_REPORT))
            .with_report(InputSource::inline(
                "testng-results.xml",
                fixtures::TESTNG_TIMEOUT,
            ));

        let outcome = pipeline.run(&inputs, at(0));
        assert_eq!(outcome.input_errors.len(), 1);
        let error = &outcome.input_errors[0];
        assert_eq!(error.kind, InputKind::Report);
        assert_eq!(error.code, "E010");
        assert!(error.message.contains("testng-results.xml"));
        assert_eq!(outcome.outputs.len(), 1);
        assert!(!outcome.all_reports_failed());
    }

    #[test]
    fn test_only_bad_reports_exit_with_two() {
        let registry = RuleRegistry::builtin_only();
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let inputs = RunInputs::new()
            .with_report(InputSource::inline("emailable-report.html", fixtures::HTML_REPORT));
        let outcome = pipeline.run(&inputs, at(0));
        assert!(outcome.all_reports_failed());
        assert_eq!(outcome.exit_code(), 2);
        assert!(outcome.outputs.is_empty());
    }

    #[test]
    fn test_missing_log_degrades_to_absent_source() {
        let registry = RuleRegistry::builtin_only();
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let inputs = RunInputs::new()
            .with_report(InputSource::inline(
                "testng-results.xml",
                fixtures::TESTNG_TIMEOUT,
            ))
            .with_log(std::path::PathBuf::from("/nonexistent/automation.log"));
        let outcome = pipeline.run(&inputs, at(0));
        assert_eq!(outcome.input_errors.len(), 1);
        assert_eq!(outcome.input_errors[0].kind, InputKind::Log);
        assert!(outcome.outputs[0].log_quality.is_none());
        assert_eq!(outcome.outputs[0].breakdown.log_score, 0.3);
    }

    #[test]
    fn test_log_evidence_is_correlated() {
        let registry = RuleRegistry::builtin_only();
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let inputs = RunInputs::new()
            .with_report(InputSource::inline(
                "testng-results.xml",
                fixtures::TESTNG_TIMEOUT,
            ))
            .with_log(InputSource::inline("automation.log", fixtures::SELENIUM_LOG));
        let outcome = pipeline.run(&inputs, at(0));
        let output = &outcome.outputs[0];
        assert!(output.log_quality.is_some());
        assert!(output.breakdown.log_score > 0.3);
    }

    #[test]
    fn test_ai_disagreement_keeps_classification() {
        let registry = RuleRegistry::builtin_only();
        let inputs = RunInputs::new().with_report(InputSource::inline(
            "testng-results.xml",
            fixtures::TESTNG_SERVER_ERROR,
        ));
        let baseline = TriagePipeline::new(&registry, &InMemoryHistoryStore::new())
            .run(&inputs, at(0));

        let disagreeing = inputs.clone().with_ai_signal(
            "com.acme.checkout.CheckoutTest.testPlaceOrder",
            crate::scoring::AiSignal::new(false, 0.99),
        );
        let outcome = TriagePipeline::new(&registry, &InMemoryHistoryStore::new())
            .run(&disagreeing, at(0));

        assert_eq!(outcome.outputs[0].failure_type, baseline.outputs[0].failure_type);
        assert_eq!(outcome.outputs[0].confidence, baseline.outputs[0].confidence);
        assert!(outcome.outputs[0].breakdown.ai_adjusted);
    }

    #[test]
    fn test_passing_records_reset_streaks() {
        let registry = RuleRegistry::builtin_only();
        let store = InMemoryHistoryStore::new();
        let pipeline = TriagePipeline::new(&registry, &store);
        let failing = RunInputs::new().with_report(InputSource::inline(
            "testng-results.xml",
            fixtures::TESTNG_SERVER_ERROR,
        ));
        let passing = RunInputs::new().with_report(InputSource::inline(
            "testng-results.xml",
            fixtures::TESTNG_SERVER_ERROR_PASSING,
        ));
        pipeline.run(&failing, at(0));
        let outcome = pipeline.run(&passing, at(1));
        assert!(outcome.outputs.is_empty());
        let entry = outcome.history.iter().next().unwrap();
        assert_eq!(entry.consecutive_failures, 0);
        assert_eq!(entry.pass_count, 1);
        assert_eq!(entry.occurrences, 1);
    }
}
