//! Thread-local context tracking for crash reports.
//!
//! Records the triage phase and the test case currently being processed.
//! Context is per thread (works with rayon workers); progress is a pair of
//! global atomic counters.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

static FAILURES_PROCESSED: AtomicUsize = AtomicUsize::new(0);
static FAILURES_TOTAL: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_CONTEXT: RefCell<TriageContext> = const { RefCell::new(TriageContext::new()) };
}

/// What the pipeline was doing on this thread.
#[derive(Debug, Clone, Default)]
pub struct TriageContext {
    pub phase: Option<TriagePhase>,
    /// Report or log source being read.
    pub current_source: Option<String>,
    /// Qualified id of the test case being classified.
    pub current_test: Option<String>,
}

impl TriageContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_source: None,
            current_test: None,
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriagePhase {
    ReportParsing,
    LogParsing,
    Correlation,
    RuleMatching,
    History,
    Scoring,
    Decision,
    OutputGeneration,
}

impl std::fmt::Display for TriagePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ReportParsing => "report_parsing",
            Self::LogParsing => "log_parsing",
            Self::Correlation => "correlation",
            Self::RuleMatching => "rule_matching",
            Self::History => "history",
            Self::Scoring => "scoring",
            Self::Decision => "decision",
            Self::OutputGeneration => "output_generation",
        };
        f.write_str(name)
    }
}

/// Restores the previous context on drop, so guards nest.
pub struct ContextGuard {
    previous: TriageContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

fn update(apply: impl FnOnce(&mut TriageContext)) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        apply(&mut ctx.borrow_mut());
        ContextGuard { previous }
    })
}

#[must_use]
pub fn set_phase(phase: TriagePhase) -> ContextGuard {
    update(|ctx| ctx.phase = Some(phase))
}

#[must_use]
pub fn set_current_source(source: impl Into<String>) -> ContextGuard {
    let source = source.into();
    update(|ctx| ctx.current_source = Some(source))
}

#[must_use]
pub fn set_current_test(test_id: impl Into<String>) -> ContextGuard {
    let test_id = test_id.into();
    update(|ctx| ctx.current_test = Some(test_id))
}

pub fn set_progress(processed: usize, total: usize) {
    FAILURES_PROCESSED.store(processed, Ordering::Relaxed);
    FAILURES_TOTAL.store(total, Ordering::Relaxed);
}

pub fn increment_processed() {
    FAILURES_PROCESSED.fetch_add(1, Ordering::Relaxed);
}

#[must_use]
pub fn get_current_context() -> TriageContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// (processed, total) failing test cases.
#[must_use]
pub fn get_progress() -> (usize, usize) {
    (
        FAILURES_PROCESSED.load(Ordering::Relaxed),
        FAILURES_TOTAL.load(Ordering::Relaxed),
    )
}

pub fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = TriageContext::new();
    });
}
