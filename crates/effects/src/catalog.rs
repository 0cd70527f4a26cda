//! Built-in effect catalog and premium entitlements.

use serde::{Deserialize, Serialize};

use duet_media_model::effect::{AreaKind, DecorationKind, EffectCategory};

/// One catalog entry, as shown in effect pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    pub category: EffectCategory,
    /// Requires a premium entitlement to activate.
    pub premium: bool,
}

/// What the current user is allowed to activate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlements {
    pub premium: bool,
}

impl Entitlements {
    pub fn free() -> Self {
        Self { premium: false }
    }

    pub fn premium() -> Self {
        Self { premium: true }
    }
}

/// The set of effects this build knows how to render.
#[derive(Debug, Clone)]
pub struct EffectCatalog {
    entries: Vec<CatalogEntry>,
}

const PREMIUM_IDS: [&str; 3] = ["crown", "sparkles", "horns"];

impl EffectCatalog {
    /// Catalog of every area transform and decoration in this crate.
    pub fn builtin() -> Self {
        let filters = AreaKind::ALL.iter().map(|kind| CatalogEntry {
            id: kind.as_str().to_string(),
            name: display_name(kind.as_str()),
            category: EffectCategory::Filter,
            premium: PREMIUM_IDS.contains(&kind.as_str()),
        });
        let decorations = DecorationKind::ALL.iter().map(|kind| CatalogEntry {
            id: kind.as_str().to_string(),
            name: display_name(kind.as_str()),
            category: EffectCategory::Decoration,
            premium: PREMIUM_IDS.contains(&kind.as_str()),
        });
        Self {
            entries: filters.chain(decorations).collect(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Whether `id` needs a premium entitlement. Ids outside the catalog are not gated.
    pub fn is_premium(&self, id: &str) -> bool {
        self.get(id).is_some_and(|e| e.premium)
    }

    /// Whether the given entitlements allow activating `id`.
    pub fn is_allowed(&self, id: &str, entitlements: &Entitlements) -> bool {
        entitlements.premium || !self.is_premium(id)
    }
}

impl Default for EffectCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn display_name(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
