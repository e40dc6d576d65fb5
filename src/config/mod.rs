//! `.failtriage.toml` configuration.
//!
//! The file is looked up in the working directory and up to nine of its
//! ancestors, or given explicitly. Invalid values warn and fall back to
//! defaults; configuration problems never abort a run.

mod core;
mod loader;

pub use core::{
    HistoryConfig, OutputConfig, RulesConfig, TriageConfig, CONFIG_FILE_NAME,
    DEFAULT_HISTORY_PATH, DEFAULT_RETENTION_DAYS, DEFAULT_RULES_DIR,
};
pub use loader::{
    directory_ancestors, discover_config, load_config, parse_and_validate_config,
    try_load_config_from_path, LoadedConfig,
};

use crate::rules::RuleRegistry;

impl LoadedConfig {
    /// Rule registry over this configuration's central document and rule
    /// directory.
    pub fn rule_registry(&self) -> RuleRegistry {
        let directory = self.resolve_path(&self.config.rules.directory);
        RuleRegistry::new(self.rule_document.clone(), Some(directory))
    }

    pub fn history_path(&self) -> std::path::PathBuf {
        self.resolve_path(&self.config.history.path)
    }
}
