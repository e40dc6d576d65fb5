//! Cross-run failure history and the flaky/deterministic classifier.
//!
//! Each failing occurrence is keyed by its [`FailureSignature`]. The
//! [`HistoryTable`] is the only state carried between runs; it is owned by a
//! [`HistoryStore`] that callers inject, so every run (and every test) can use
//! an isolated store.

pub mod classifier;
pub mod signature;
pub mod store;
pub mod table;

pub use signature::{normalize_error, FailureSignature};
pub use store::{load_snapshot, save_snapshot, HistoryStore, InMemoryHistoryStore};
pub use table::{FailureHistory, HistoryTable, SNAPSHOT_VERSION};
