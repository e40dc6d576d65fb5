use crate::config::{self, LoadedConfig};
use crate::history::{load_snapshot, save_snapshot, FailureHistory, HistoryTable};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use std::path::{Path, PathBuf};

fn history_path(loaded: &LoadedConfig, explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| loaded.history_path())
}

fn load(path: &Path) -> Result<HistoryTable> {
    load_snapshot(path)
        .with_context(|| format!("Failed to read failure history {}", path.display()))
}

pub fn show_history(
    config: Option<PathBuf>,
    history: Option<PathBuf>,
    test: Option<String>,
    json: bool,
) -> Result<()> {
    let loaded = config::load_config(config.as_deref());
    let path = history_path(&loaded, history);
    let table = load(&path)?;
    let entries: Vec<&FailureHistory> = table
        .iter()
        .filter(|h| test.as_deref().is_none_or(|t| h.test_name == t))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("No failure history in {}", path.display());
    } else {
        println!("{}", render_table(&entries));
    }
    Ok(())
}

fn render_table(entries: &[&FailureHistory]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Signature",
            "Test",
            "Type",
            "Seen",
            "Passes",
            "Streak",
            "Nature",
            "Last seen",
        ]);
    for entry in entries {
        table.add_row(vec![
            entry.signature.to_string(),
            entry.test_name.clone(),
            entry.failure_type.as_str().to_string(),
            entry.occurrences.to_string(),
            entry.pass_count.to_string(),
            entry.consecutive_failures.to_string(),
            format!(
                "{} ({:.0}%)",
                entry.nature,
                entry.nature_confidence * 100.0
            ),
            entry.last_seen.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

pub fn cleanup_history(
    config: Option<PathBuf>,
    history: Option<PathBuf>,
    retention_days: Option<u32>,
) -> Result<()> {
    let loaded = config::load_config(config.as_deref());
    let path = history_path(&loaded, history);
    let retention = match retention_days {
        Some(days) => Duration::days(i64::from(days)),
        None => loaded.config.retention(),
    };

    let mut table = load(&path)?;
    let evicted = table.cleanup(retention, Utc::now());
    save_snapshot(&table, &path)
        .with_context(|| format!("Failed to write failure history {}", path.display()))?;
    println!(
        "Removed {} stale signature(s); {} remain in {}",
        evicted,
        table.len(),
        path.display()
    );
    Ok(())
}
