//! CLI command implementations.
//!
//! - **analyze**: triage failing tests and decide the CI outcome
//! - **init**: write a default `.failtriage.toml`
//! - **history**: inspect or prune the failure history snapshot
//! - **rules**: show which rule packs resolve and what they contain

pub mod analyze;
pub mod history;
pub mod init;
pub mod rules;

pub use analyze::{handle_analyze, AnalyzeConfig};
pub use history::{cleanup_history, show_history};
pub use init::init_config;
pub use rules::{list_rule_packs, show_rule_pack};
