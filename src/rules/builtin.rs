//! Rule packs compiled into the binary.

use super::loader::{parse_pack_str, DocumentFormat};
use super::{PackSource, RulePack};

pub const GENERIC: &str = "generic";

const PACKS: &[(&str, &str)] = &[
    (GENERIC, include_str!("packs/generic.toml")),
    ("selenium", include_str!("packs/selenium.toml")),
    ("playwright", include_str!("packs/playwright.toml")),
    ("cypress", include_str!("packs/cypress.toml")),
    ("restassured", include_str!("packs/restassured.toml")),
    ("robot", include_str!("packs/robot.toml")),
    ("pytest", include_str!("packs/pytest.toml")),
];

/// Names of all built-in packs, generic first.
pub fn names() -> impl Iterator<Item = &'static str> {
    PACKS.iter().map(|(name, _)| *name)
}

pub fn is_builtin(name: &str) -> bool {
    PACKS.iter().any(|(n, _)| *n == name)
}

/// The built-in pack with this name, without any `extends` applied.
pub fn pack(name: &str) -> Option<RulePack> {
    let (_, source) = PACKS.iter().find(|(n, _)| *n == name)?;
    match parse_pack_str(source, DocumentFormat::Toml, name, PackSource::BuiltIn) {
        Ok(pack) => Some(pack),
        Err(e) => {
            log::error!("Built-in rule pack '{}' is unreadable: {}", name, e);
            None
        }
    }
}
