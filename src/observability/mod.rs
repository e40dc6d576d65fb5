//! Crash reports, context tracking and logging setup.
//!
//! Install the panic hook at startup and mark phases while triaging:
//!
//! ```ignore
//! use failtriage::observability::{install_panic_hook, set_phase, TriagePhase};
//!
//! install_panic_hook();
//! let _phase = set_phase(TriagePhase::Correlation);
//! // a panic here reports the correlation phase
//! ```

pub mod context;
pub mod logging;
pub mod panic_hook;

pub use context::{
    get_current_context, get_progress, increment_processed, reset_context, set_current_source,
    set_current_test, set_phase, set_progress, ContextGuard, TriageContext, TriagePhase,
};
pub use logging::{init_logging, LOG_ENV};
pub use panic_hook::install_panic_hook;
