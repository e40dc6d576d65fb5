use super::CiOutput;
use crate::core::FailureCategory;
use crate::report::ReportCounters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Run-level totals over every classified failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Failures with a type other than UNKNOWN.
    pub classified: usize,
    pub average_confidence: f64,
    pub infrastructure_count: usize,
    pub assertion_count: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_nature: BTreeMap<String, usize>,
    pub by_decision: BTreeMap<String, usize>,
    /// Inputs that could not be loaded (wrong artifact, unreadable file).
    pub input_errors: usize,
}

impl RunSummary {
    pub fn build(counters: ReportCounters, outputs: &[CiOutput], input_errors: usize) -> Self {
        let mut summary = RunSummary {
            total: counters.total,
            passed: counters.passed,
            failed: counters.failed,
            skipped: counters.skipped,
            input_errors,
            ..RunSummary::default()
        };

        for output in outputs {
            if output.failure_type != crate::core::FailureType::Unknown {
                summary.classified += 1;
            }
            match output.category {
                FailureCategory::Infrastructure => summary.infrastructure_count += 1,
                FailureCategory::TestAssertion => summary.assertion_count += 1,
                _ => {}
            }
            *summary
                .by_type
                .entry(output.failure_type.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_nature
                .entry(output.nature.as_str().to_string())
                .or_default() += 1;
            *summary
                .by_decision
                .entry(output.decision.as_str().to_string())
                .or_default() += 1;
        }

        if !outputs.is_empty() {
            let sum: f64 = outputs.iter().map(|o| o.confidence).sum();
            summary.average_confidence = sum / outputs.len() as f64;
        }
        summary
    }

    pub fn fail_count(&self) -> usize {
        self.by_decision.get("FAIL").copied().unwrap_or(0)
    }

    pub fn has_failures(&self) -> bool {
        self.fail_count() > 0
    }
}
