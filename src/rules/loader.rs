//! Rule pack documents: TOML, YAML or JSON, normalized through
//! `serde_json::Value` so one lenient entry parser serves every format.

use super::{PackSource, Rule, RulePack, DEFAULT_PRIORITY};
use crate::core::FailureType;
use crate::error::{Result, TriageError};
use serde_json::Value;
use std::path::Path;

/// Extensions tried for standalone rule files, in order.
pub const RULE_FILE_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Format from a file extension; unknown extensions read as TOML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => DocumentFormat::Yaml,
            Some("json") => DocumentFormat::Json,
            _ => DocumentFormat::Toml,
        }
    }
}

pub fn parse_document(content: &str, format: DocumentFormat, path: Option<&Path>) -> Result<Value> {
    let parsed = match format {
        DocumentFormat::Toml => toml::from_str::<Value>(content).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string()),
        DocumentFormat::Json => serde_json::from_str::<Value>(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| {
        let message = format!("cannot parse rule document: {message}");
        match path {
            Some(path) => TriageError::config_with_path(message, path),
            None => TriageError::config(message),
        }
    })
}

/// Read and parse a document, choosing the format by extension.
pub fn load_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| TriageError::from_io_error(e, Some(path.to_path_buf())))?;
    parse_document(&content, DocumentFormat::from_path(path), Some(path))
}

/// Walk a dotted key path through nested tables.
pub fn lookup<'a>(document: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(document, |node, key| node.as_object()?.get(*key))
}

fn string_list(value: Option<&Value>) -> std::result::Result<Vec<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("keyword {item} is not a string"))
            })
            .collect(),
        Some(other) => Err(format!("expected a keyword list, found {other}")),
    }
}

fn first_present<'a>(entry: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| entry.get(*k))
}

/// Parse one rule entry. Errors are reasons, reported by the caller.
pub fn rule_from_value(
    value: &Value,
    pack_framework: Option<&str>,
) -> std::result::Result<Rule, String> {
    let entry = value
        .as_object()
        .ok_or_else(|| "rule entry is not a table".to_string())?;

    let id = entry
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| "missing 'id'".to_string())?;

    let type_label = entry
        .get("failure_type")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("rule '{id}': missing 'failure_type'"))?;
    let failure_type = FailureType::parse(type_label)
        .ok_or_else(|| format!("rule '{id}': unknown failure_type '{type_label}'"))?;

    let confidence = entry
        .get("confidence")
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("rule '{id}': missing numeric 'confidence'"))?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!(
            "rule '{id}': confidence {confidence} is outside [0, 1]"
        ));
    }

    let priority = match entry.get("priority") {
        None => DEFAULT_PRIORITY,
        Some(p) => p
            .as_u64()
            .and_then(|p| u32::try_from(p).ok())
            .ok_or_else(|| format!("rule '{id}': priority must be a non-negative integer"))?,
    };

    let any = string_list(first_present(entry, &["any", "any_of", "keywords"]))
        .map_err(|e| format!("rule '{id}': {e}"))?;
    let all = string_list(first_present(entry, &["all", "all_of"]))
        .map_err(|e| format!("rule '{id}': {e}"))?;
    let exclude = string_list(first_present(entry, &["exclude", "none_of"]))
        .map_err(|e| format!("rule '{id}': {e}"))?;

    let framework = entry
        .get("framework")
        .and_then(Value::as_str)
        .or(pack_framework);

    let mut rule = Rule::new(id, failure_type, confidence, priority)
        .with_any(any)
        .with_all(all)
        .with_exclude(exclude);
    rule.framework = framework.map(str::to_string);
    Ok(rule)
}

/// Build a pack from either a table with a `rules` array or a bare array.
/// Malformed entries are skipped and counted. A table without `rules` is not
/// a pack, so resolution moves on to the next source.
pub fn pack_from_value(default_name: &str, value: &Value, source: PackSource) -> Result<RulePack> {
    let (table, entries) = match value {
        Value::Array(entries) => (None, entries.as_slice()),
        Value::Object(table) => match table.get("rules") {
            Some(Value::Array(entries)) => (Some(table), entries.as_slice()),
            Some(_) => {
                return Err(TriageError::rule(
                    format!("'rules' in {source} is not an array"),
                    None,
                ))
            }
            None => {
                return Err(TriageError::rule(
                    format!("table in {source} has no 'rules' array"),
                    None,
                ))
            }
        },
        _ => {
            return Err(TriageError::rule(
                format!("rule pack in {source} is neither a table nor an array"),
                None,
            ))
        }
    };

    let text = |key: &str| {
        table
            .and_then(|t| t.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let framework = text("framework");
    let mut pack = RulePack {
        name: text("name").unwrap_or_else(|| default_name.to_string()),
        version: text("version")
            .or_else(|| {
                table
                    .and_then(|t| t.get("version"))
                    .and_then(Value::as_i64)
                    .map(|v| v.to_string())
            })
            .unwrap_or_else(|| "1".to_string()),
        framework: framework.clone(),
        rules: Vec::with_capacity(entries.len()),
        skipped: 0,
        extends: text("extends"),
        source,
    };

    for (index, entry) in entries.iter().enumerate() {
        match rule_from_value(entry, framework.as_deref()) {
            Ok(rule) => pack.rules.push(rule),
            Err(reason) => {
                log::warn!(
                    "Skipping malformed rule #{} in pack '{}' ({}): {}",
                    index + 1,
                    pack.name,
                    pack.source,
                    reason
                );
                pack.skipped += 1;
            }
        }
    }

    Ok(pack)
}

pub fn parse_pack_str(
    content: &str,
    format: DocumentFormat,
    default_name: &str,
    source: PackSource,
) -> Result<RulePack> {
    let path = match &source {
        PackSource::File { path } => Some(path.as_path()),
        _ => None,
    };
    let document = parse_document(content, format, path)?;
    pack_from_value(default_name, &document, source)
}

pub fn load_pack_file(path: &Path, default_name: &str) -> Result<RulePack> {
    let document = load_document(path)?;
    pack_from_value(
        default_name,
        &document,
        PackSource::File {
            path: path.to_path_buf(),
        },
    )
}

/// Key paths searched in the central configuration document, in priority order.
pub fn config_key_paths(framework: &str) -> Vec<Vec<String>> {
    let f = framework.to_string();
    [
        vec!["failtriage", "rule_packs", f.as_str()],
        vec!["triage", "rules", f.as_str()],
        vec!["rules", f.as_str()],
        vec!["frameworks", f.as_str(), "rules"],
        vec!["classification", f.as_str(), "rules"],
    ]
    .into_iter()
    .map(|p| p.into_iter().map(str::to_string).collect())
    .collect()
}

/// First key path in the central document that holds a usable pack.
pub fn pack_from_config(document: &Value, framework: &str) -> Option<RulePack> {
    config_key_paths(framework).into_iter().find_map(|path| {
        let keys: Vec<&str> = path.iter().map(String::as_str).collect();
        let node = lookup(document, &keys)?;
        let key_path = keys.join(".");
        match pack_from_value(framework, node, PackSource::Config { key_path: key_path.clone() }) {
            Ok(pack) => Some(pack),
            Err(e) => {
                log::warn!("Ignoring rules at '{}': {}", key_path, e);
                None
            }
        }
    })
}

/// `<dir>/<name>.{toml,yaml,yml,json}`, first existing file wins.
pub fn find_rule_file(dir: &Path, name: &str) -> Option<std::path::PathBuf> {
    RULE_FILE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|p| p.is_file())
}
