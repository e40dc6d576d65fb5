use crate::config;
use crate::rules::{builtin, RulePack};
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use std::path::PathBuf;

pub fn list_rule_packs(config: Option<PathBuf>) -> Result<()> {
    let loaded = config::load_config(config.as_deref());
    let registry = loaded.rule_registry();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Framework", "Pack", "Version", "Rules", "Skipped", "Source"]);
    for framework in builtin::names() {
        let pack = registry.resolve(framework);
        table.add_row(vec![
            framework.to_string(),
            pack.name.clone(),
            pack.version.clone(),
            pack.len().to_string(),
            pack.skipped.to_string(),
            pack.source.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn show_rule_pack(framework: &str, config: Option<PathBuf>) -> Result<()> {
    let loaded = config::load_config(config.as_deref());
    let pack = loaded.rule_registry().resolve(framework);
    println!(
        "Rule pack '{}' v{} from {}",
        pack.name, pack.version, pack.source
    );
    println!("{}", render_rules(&pack));
    Ok(())
}

fn render_rules(pack: &RulePack) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Id", "Type", "Confidence", "Priority", "Keywords", "Excludes"]);
    for rule in &pack.rules {
        let keywords = if rule.all.is_empty() {
            format!("any: {}", rule.any.join(", "))
        } else {
            format!("all: {}", rule.all.join(", "))
        };
        table.add_row(vec![
            rule.id.clone(),
            rule.failure_type.as_str().to_string(),
            format!("{:.2}", rule.confidence),
            rule.priority.to_string(),
            keywords,
            rule.exclude.join(", "),
        ]);
    }
    table
}
