//! Rule pack resolution with a per-run cache.
//!
//! For framework `F`, first hit wins:
//! 1. the central configuration document, at the key paths of
//!    [`loader::config_key_paths`]
//! 2. `<rules_dir>/F.{toml,yaml,yml,json}`
//! 3. `<rules_dir>/generic.*`
//! 4. the built-in pack `F`, else the built-in generic pack
//!
//! A pack declaring `extends = "<builtin>"` gets that built-in pack's rules
//! appended after its own.

use super::{builtin, loader, RulePack};
use dashmap::DashMap;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct RuleRegistry {
    central: Option<Value>,
    rules_dir: Option<PathBuf>,
    cache: DashMap<String, Arc<RulePack>>,
}

impl RuleRegistry {
    pub fn new(central: Option<Value>, rules_dir: Option<PathBuf>) -> Self {
        Self {
            central,
            rules_dir,
            cache: DashMap::new(),
        }
    }

    /// Registry that only knows the built-in packs.
    pub fn builtin_only() -> Self {
        Self::default()
    }

    /// Resolve the pack for a framework. Never fails: the built-in generic
    /// pack is the last resort.
    pub fn resolve(&self, framework: &str) -> Arc<RulePack> {
        let key = framework.trim().to_lowercase();
        if let Some(pack) = self.cache.get(&key) {
            return Arc::clone(pack.value());
        }
        let pack = Arc::new(self.resolve_uncached(&key));
        log::info!(
            "Using rule pack '{}' v{} from {} ({} rules, {} skipped)",
            pack.name,
            pack.version,
            pack.source,
            pack.len(),
            pack.skipped
        );
        Arc::clone(self.cache.entry(key).or_insert(pack).value())
    }

    fn resolve_uncached(&self, framework: &str) -> RulePack {
        let pack = self
            .from_central(framework)
            .or_else(|| self.from_rules_dir(framework))
            .or_else(|| self.from_rules_dir(builtin::GENERIC))
            .or_else(|| builtin::pack(framework))
            .or_else(|| builtin::pack(builtin::GENERIC))
            .unwrap_or_else(|| RulePack::new(builtin::GENERIC, Vec::new()));
        with_extension(pack)
    }

    fn from_central(&self, framework: &str) -> Option<RulePack> {
        let document = self.central.as_ref()?;
        let pack = loader::pack_from_config(document, framework)?;
        log::debug!("Rule pack for '{}' found in {}", framework, pack.source);
        Some(pack)
    }

    fn from_rules_dir(&self, name: &str) -> Option<RulePack> {
        let dir = self.rules_dir.as_deref()?;
        let path = loader::find_rule_file(dir, name)?;
        match loader::load_pack_file(&path, name) {
            Ok(pack) => Some(pack),
            Err(e) => {
                log::warn!("Ignoring rule file {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn with_extension(mut pack: RulePack) -> RulePack {
    let Some(base_name) = pack.extends.clone() else {
        return pack;
    };
    if base_name == pack.name {
        return pack;
    }
    match builtin::pack(&base_name) {
        Some(base) => {
            let own: std::collections::HashSet<String> =
                pack.rules.iter().map(|r| r.id.clone()).collect();
            pack.rules
                .extend(base.rules.into_iter().filter(|r| !own.contains(&r.id)));
        }
        None => log::warn!(
            "Rule pack '{}' extends unknown built-in pack '{}'",
            pack.name,
            base_name
        ),
    }
    pack
}
