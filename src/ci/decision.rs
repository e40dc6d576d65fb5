use super::annotation::Platform;
use crate::core::{FailureType, Nature};
use serde::{Deserialize, Serialize};

/// What the CI pipeline should do about one classified failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CiDecision {
    Fail,
    Warn,
    Pass,
}

impl CiDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            CiDecision::Fail => "FAIL",
            CiDecision::Warn => "WARN",
            CiDecision::Pass => "PASS",
        }
    }

    pub fn is_fail(self) -> bool {
        self == CiDecision::Fail
    }
}

impl std::fmt::Display for CiDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `[ci]` configuration section.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CiConfig {
    pub fail_on_product_defect: bool,
    pub fail_on_automation_defect: bool,
    pub fail_on_flaky: bool,
    pub annotate_automation_defects: bool,
    pub annotate_flaky_tests: bool,
    pub min_confidence_to_fail: f64,
    pub min_confidence_to_annotate: f64,
    pub platform: Platform,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            fail_on_product_defect: true,
            fail_on_automation_defect: false,
            fail_on_flaky: false,
            annotate_automation_defects: true,
            annotate_flaky_tests: true,
            min_confidence_to_fail: 0.85,
            min_confidence_to_annotate: 0.65,
            platform: Platform::Plain,
        }
    }
}

impl CiConfig {
    /// Replace out-of-range thresholds with defaults, warning once per field.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        for (name, value, default) in [
            (
                "min_confidence_to_fail",
                &mut self.min_confidence_to_fail,
                defaults.min_confidence_to_fail,
            ),
            (
                "min_confidence_to_annotate",
                &mut self.min_confidence_to_annotate,
                defaults.min_confidence_to_annotate,
            ),
        ] {
            if !(0.0..=1.0).contains(&*value) {
                log::warn!(
                    "ci.{} = {} is outside [0, 1]; using default {}",
                    name,
                    value,
                    default
                );
                *value = default;
            }
        }
        self
    }

    fn fail_eligible(&self, failure_type: FailureType) -> bool {
        match failure_type {
            FailureType::ProductDefect => self.fail_on_product_defect,
            FailureType::AutomationDefect => self.fail_on_automation_defect,
            _ => false,
        }
    }

    fn annotate_eligible(&self, failure_type: FailureType, nature: Nature) -> bool {
        let type_ok = match failure_type {
            FailureType::ProductDefect
            | FailureType::EnvironmentIssue
            | FailureType::ConfigurationIssue => true,
            FailureType::AutomationDefect => self.annotate_automation_defects,
            FailureType::Unknown => false,
        };
        type_ok && (nature != Nature::Flaky || self.annotate_flaky_tests)
    }

    /// Ordered decision table:
    /// 1. flaky failures never fail the build unless `fail_on_flaky`
    /// 2. FAIL needs the fail threshold and a fail-eligible type
    /// 3. WARN needs the annotate threshold and an annotate-eligible type
    /// 4. otherwise PASS
    pub fn decide(&self, failure_type: FailureType, nature: Nature, confidence: f64) -> CiDecision {
        let flaky_shielded = nature == Nature::Flaky && !self.fail_on_flaky;
        if !flaky_shielded
            && self.fail_eligible(failure_type)
            && confidence >= self.min_confidence_to_fail
        {
            CiDecision::Fail
        } else if self.annotate_eligible(failure_type, nature)
            && confidence >= self.min_confidence_to_annotate
        {
            CiDecision::Warn
        } else {
            CiDecision::Pass
        }
    }
}
