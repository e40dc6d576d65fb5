use std::fs;
use std::path::{Path, PathBuf};

use super::core::{TriageConfig, CONFIG_FILE_NAME};
use crate::rules::loader::load_document;

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// A configuration plus where it came from.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: TriageConfig,
    /// File the configuration was read from; `None` means built-in defaults.
    pub source: Option<PathBuf>,
    /// Raw central rule document, searched for framework rule tables.
    pub rule_document: Option<serde_json::Value>,
}

impl LoadedConfig {
    /// Directory relative paths in the configuration resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.source
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }
}

/// Parse and validate TOML configuration text.
pub fn parse_and_validate_config(contents: &str) -> Result<TriageConfig, String> {
    let config = toml::from_str::<TriageConfig>(contents)
        .map_err(|e| format!("Failed to parse {}: {}", CONFIG_FILE_NAME, e))?;
    Ok(config.sanitized())
}

fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // A missing file just means "keep looking".
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// Load one configuration file. `None` when it is missing; an unreadable or
/// invalid file warns and yields defaults, since configuration never aborts
/// a run.
pub fn try_load_config_from_path(config_path: &Path) -> Option<LoadedConfig> {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    let config = match parse_and_validate_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            config
        }
        Err(e) => {
            log::warn!("{}. Using defaults.", e);
            TriageConfig::default()
        }
    };

    let mut loaded = LoadedConfig {
        config,
        source: Some(config_path.to_path_buf()),
        rule_document: None,
    };
    loaded.rule_document = load_rule_document(&loaded);
    Some(loaded)
}

fn load_rule_document(loaded: &LoadedConfig) -> Option<serde_json::Value> {
    let path = match &loaded.config.rules.central {
        Some(central) => loaded.resolve_path(central),
        None => loaded.source.clone()?,
    };
    match load_document(&path) {
        Ok(document) => Some(document),
        Err(e) => {
            log::warn!("Ignoring central rule document: {}", e);
            None
        }
    }
}

/// `start` and up to `max_depth - 1` of its parents.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find `.failtriage.toml` in `start` or its ancestors.
pub fn discover_config(start: PathBuf) -> LoadedConfig {
    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            LoadedConfig::default()
        })
}

/// Load the explicit `--config` file if given, else discover one from the
/// working directory.
pub fn load_config(explicit: Option<&Path>) -> LoadedConfig {
    if let Some(path) = explicit {
        return try_load_config_from_path(path).unwrap_or_else(|| {
            log::warn!("Config file {} not found. Using defaults.", path.display());
            LoadedConfig::default()
        });
    }
    match std::env::current_dir() {
        Ok(dir) => discover_config(dir),
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            LoadedConfig::default()
        }
    }
}
