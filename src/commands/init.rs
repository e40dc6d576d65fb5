use crate::config::CONFIG_FILE_NAME;
use crate::io;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = r#"# failtriage configuration

[ci]
fail_on_product_defect = true
fail_on_automation_defect = false
fail_on_flaky = false
annotate_flaky_tests = true
annotate_automation_defects = true
min_confidence_to_fail = 0.85
min_confidence_to_annotate = 0.65
# github | gitlab | azure | markdown | plain
platform = "plain"

[history]
path = ".failtriage/history.json"
retention_days = 30

[rules]
# Rule pack to use; detected from reports and logs when unset.
# framework = "selenium"
directory = "rules"

# Team-specific rules replace the built-in pack for that framework.
# Add `extends = "generic"` to keep the generic rules as a fallback.
#
# [rules.selenium]
# extends = "generic"
#
# [[rules.selenium.rules]]
# id = "captcha-blocked"
# any = ["captcha"]
# failure_type = "ENVIRONMENT_ISSUE"
# confidence = 0.9
# priority = 10

[output]
default_format = "terminal"
max_excerpt_chars = 500
"#;

pub fn init_config(force: bool) -> Result<()> {
    init_config_at(Path::new("."), force).map(|path| {
        println!("Created {} configuration file", path.display());
    })
}

/// Write the default configuration into `dir`.
pub fn init_config_at(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }

    io::write_file(&config_path, DEFAULT_CONFIG)?;
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_and_validate_config, TriageConfig};

    #[test]
    fn test_default_config_parses_to_defaults() {
        let config = parse_and_validate_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, TriageConfig::default());
    }

    #[test]
    fn test_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        init_config_at(dir.path(), false).unwrap();
        let err = init_config_at(dir.path(), false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert!(init_config_at(dir.path(), true).is_ok());
    }
}
