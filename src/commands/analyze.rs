use crate::ci::Platform;
use crate::cli::{self, PlatformChoice};
use crate::config::{self, LoadedConfig};
use crate::formatting::{FormattingConfig, Styler};
use crate::history::InMemoryHistoryStore;
use crate::io::output::{create_writer, OutputFormat};
use crate::observability::{set_phase, TriagePhase};
use crate::pipeline::{InputSource, RunInputs, RunOutcome, TriagePipeline};
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

pub struct AnalyzeConfig {
    pub reports: Vec<String>,
    pub logs: Vec<PathBuf>,
    pub app_logs: Vec<PathBuf>,
    pub framework: Option<String>,
    pub ai_signals: Option<PathBuf>,
    pub format: Option<cli::OutputFormat>,
    pub output: Option<PathBuf>,
    pub platform: Option<PlatformChoice>,
    pub config: Option<PathBuf>,
    pub history: Option<PathBuf>,
    pub no_history: bool,
    pub formatting_config: FormattingConfig,
}

/// Run a triage and write the result. Returns the process exit code:
/// 2 when no report could be read, 1 when any failure is FAIL, else 0.
pub fn handle_analyze(config: AnalyzeConfig) -> Result<i32> {
    let loaded = config::load_config(config.config.as_deref());
    let settings = &loaded.config;

    let mut ci = settings.ci.clone();
    ci.platform = resolve_platform(config.platform, ci.platform);
    log::debug!("Rendering annotations for {}", ci.platform);

    let registry = loaded.rule_registry();
    let history_path = (!config.no_history)
        .then(|| config.history.clone().unwrap_or_else(|| loaded.history_path()));
    let store = match &history_path {
        Some(path) => InMemoryHistoryStore::load(path),
        None => InMemoryHistoryStore::new(),
    };

    let now = Utc::now();
    let inputs = build_inputs(&config, &loaded);
    let outcome = TriagePipeline::new(&registry, &store)
        .with_ci_config(ci)
        .with_max_excerpt_chars(settings.output.max_excerpt_chars)
        .run(&inputs, now);

    if let Some(path) = &history_path {
        // Eviction only happens through `failtriage history cleanup`.
        let _phase = set_phase(TriagePhase::History);
        store
            .save(path)
            .with_context(|| format!("Failed to save failure history to {}", path.display()))?;
    }

    let format = config
        .format
        .map(OutputFormat::from)
        .unwrap_or(settings.output.default_format);
    write_outcome(&outcome, format, config.output.as_ref(), config.formatting_config)?;

    Ok(outcome.exit_code())
}

fn resolve_platform(choice: Option<PlatformChoice>, configured: Platform) -> Platform {
    match choice {
        Some(choice) => choice
            .platform()
            .or_else(Platform::detect_from_env)
            .unwrap_or_default(),
        None => configured,
    }
}

fn build_inputs(config: &AnalyzeConfig, loaded: &LoadedConfig) -> RunInputs {
    let mut inputs = RunInputs::new();
    for report in expand_report_patterns(&config.reports) {
        inputs = inputs.with_report(report);
    }
    for log in &config.logs {
        inputs = inputs.with_log(log.as_path());
    }
    for log in &config.app_logs {
        inputs = inputs.with_app_log(log.as_path());
    }
    if let Some(path) = &config.ai_signals {
        inputs = inputs.with_ai_signal_file(path.as_path());
    }
    if let Some(framework) = config
        .framework
        .clone()
        .or_else(|| loaded.config.rules.framework.clone())
    {
        inputs = inputs.with_framework(framework);
    }
    inputs
}

fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expand glob patterns into report paths. A pattern matching nothing is
/// kept as a literal path so it surfaces as an input error.
pub fn expand_report_patterns(patterns: &[String]) -> Vec<InputSource> {
    let mut sources = Vec::new();
    for pattern in patterns {
        if !is_glob_pattern(pattern) {
            sources.push(InputSource::File(PathBuf::from(pattern)));
            continue;
        }
        let mut matches: Vec<PathBuf> = match glob::glob(pattern) {
            Ok(paths) => paths.filter_map(|entry| entry.ok()).collect(),
            Err(e) => {
                log::warn!("Invalid report pattern '{}': {}", pattern, e);
                Vec::new()
            }
        };
        if matches.is_empty() {
            log::warn!("Report pattern '{}' matched no files", pattern);
            sources.push(InputSource::File(PathBuf::from(pattern)));
            continue;
        }
        matches.sort();
        sources.extend(matches.into_iter().map(InputSource::File));
    }
    sources
}

fn write_outcome(
    outcome: &RunOutcome,
    format: OutputFormat,
    output: Option<&PathBuf>,
    formatting_config: FormattingConfig,
) -> Result<()> {
    let _phase = set_phase(TriagePhase::OutputGeneration);
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                crate::io::ensure_dir(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            // Files never get ANSI colors.
            create_writer(format, &mut writer, Styler::plain()).write_outcome(outcome)?;
            writer.flush()?;
            log::info!("Wrote triage report to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            create_writer(format, &mut handle, Styler::new(formatting_config))
                .write_outcome(outcome)?;
            handle.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_patterns_expand_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b-results.xml", "a-results.xml", "notes.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*.xml", dir.path().display());
        let sources = expand_report_patterns(&[pattern]);
        let names: Vec<String> = sources
            .iter()
            .filter_map(|s| s.path())
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a-results.xml", "b-results.xml"]);
    }

    #[test]
    fn test_unmatched_pattern_is_kept_literal() {
        let sources = expand_report_patterns(&["/nonexistent/dir/*.xml".to_string()]);
        assert_eq!(sources.len(), 1);
        assert_eq!(
            sources[0].path(),
            Some(std::path::Path::new("/nonexistent/dir/*.xml"))
        );
    }

    #[test]
    fn test_explicit_platform_wins_over_config() {
        assert_eq!(
            resolve_platform(Some(PlatformChoice::Azure), Platform::Github),
            Platform::Azure
        );
        assert_eq!(resolve_platform(None, Platform::Gitlab), Platform::Gitlab);
    }
}
