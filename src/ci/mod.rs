//! CI decision and annotation.
//!
//! The last pipeline stage. A classified failure becomes a [`CiOutput`]: the
//! FAIL/WARN/PASS decision from [`CiConfig::decide`] plus, unless the
//! decision is PASS, one rendered annotation.

pub mod annotation;
pub mod decision;
pub mod summary;

pub use annotation::{recommendation, truncate_excerpt, AnnotationBlock, Platform, MAX_EXCERPT_CHARS};
pub use decision::{CiConfig, CiDecision};
pub use summary::RunSummary;

use crate::core::{CodeReference, FailureCategory, FailureType, Nature};
use crate::correlation::{LogQuality, MatchKind};
use crate::history::FailureSignature;
use crate::scoring::ConfidenceBreakdown;
use serde::{Deserialize, Serialize};

/// Final read-only projection of one failing test case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CiOutput {
    pub test_id: String,
    pub suite: String,
    pub framework: String,
    pub failure_type: FailureType,
    pub category: FailureCategory,
    pub confidence: f64,
    pub breakdown: ConfidenceBreakdown,
    pub nature: Nature,
    pub nature_confidence: f64,
    pub signature: FailureSignature,
    pub summary: String,
    pub root_cause: String,
    pub match_kind: MatchKind,
    pub log_quality: Option<LogQuality>,
    pub code_reference: Option<CodeReference>,
    pub error_excerpt: Option<String>,
    pub recommendation: String,
    pub matched_rules: Vec<String>,
    pub decision: CiDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl CiOutput {
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }

    pub fn annotation_block(&self) -> AnnotationBlock {
        AnnotationBlock {
            title: format!("{}: {}", self.test_id, self.failure_type.title()),
            failure_type: self.failure_type,
            confidence_percent: self.confidence_percent(),
            nature: self.nature,
            summary: self.summary.clone(),
            location: self.code_reference.clone(),
            excerpt: self.error_excerpt.clone(),
            recommendation: self.recommendation.clone(),
            decision: self.decision,
            signature: self.signature.to_string(),
        }
    }

    /// Render the annotation for a non-PASS decision. PASS leaves it empty.
    pub fn render_annotation(&mut self, platform: Platform, generated_at: i64) {
        self.annotation = match self.decision {
            CiDecision::Pass => None,
            _ => Some(self.annotation_block().render(platform, generated_at)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::CiOutputBuilder;

    #[test]
    fn test_pass_renders_no_annotation() {
        let mut output = CiOutputBuilder::new("a.B.c")
            .decision(CiDecision::Pass)
            .build();
        output.render_annotation(Platform::Github, 0);
        assert!(output.annotation.is_none());

        let mut warned = CiOutputBuilder::new("a.B.c")
            .decision(CiDecision::Warn)
            .build();
        warned.render_annotation(Platform::Plain, 0);
        assert!(warned.annotation.unwrap().starts_with("a.B.c: "));
    }

    #[test]
    fn test_confidence_percent_rounds() {
        let output = CiOutputBuilder::new("a.B.c").confidence(0.876).build();
        assert_eq!(output.confidence_percent(), 88);
    }
}
