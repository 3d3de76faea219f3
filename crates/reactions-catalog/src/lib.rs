// SPDX-License-Identifier: Apache-2.0
//! Immutable, ordered catalog of emoji reactions.
//!
//! The catalog maps a stable string alias (URL/attribute-safe) to a display
//! symbol and a human-readable description, optionally broken up by named
//! section markers. It is loaded once per process, has no side effects, and
//! answers the same queries for the same configuration every time. An unknown
//! alias is not an error; it simply does not exist.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One reaction definition: alias, display glyph, description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionDefinition {
    /// Stable unique key, safe in URLs and HTML attributes.
    pub alias: String,
    /// Display glyph (the emoji itself).
    pub symbol: String,
    /// Human-readable description of the reaction.
    pub description: String,
}

/// An ordered catalog entry. Sections are pseudo-entries carrying a title
/// instead of a definition; iteration callers must special-case them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEntry {
    /// A reaction definition.
    Reaction(ReactionDefinition),
    /// A section title splitting the catalog for picker display.
    Section(String),
}

/// Bandwidth-minimized reaction form shipped to the client bootstrap.
///
/// Field names are single letters on the wire to keep the payload small:
/// `a` = alias, `s` = symbol, `d` = description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefReaction {
    /// Alias.
    #[serde(rename = "a")]
    pub alias: String,
    /// Symbol.
    #[serde(rename = "s")]
    pub symbol: String,
    /// Description.
    #[serde(rename = "d")]
    pub description: String,
}

/// The full reaction catalog: an ordered entry list plus the set of aliases
/// whose count badge is rendered even at zero.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    default_visible: BTreeSet<String>,
}

impl Catalog {
    /// Build a catalog from an explicit entry list and default-visible set.
    ///
    /// The visible set is injected at construction rather than filtered at
    /// query time, so two catalogs with the same inputs behave identically.
    pub fn new(entries: Vec<CatalogEntry>, default_visible: BTreeSet<String>) -> Self {
        Self {
            entries,
            default_visible,
        }
    }

    /// The built-in catalog: a handful of common reactions grouped into
    /// sections, with `thumbsup` visible by default.
    pub fn builtin() -> Self {
        let entries = vec![
            CatalogEntry::Section("Frequently used".to_string()),
            def("thumbsup", "\u{1F44D}", "Thumbs up"),
            def("thumbsdown", "\u{1F44E}", "Thumbs down"),
            def("heart", "\u{2764}\u{FE0F}", "Heart"),
            def("tada", "\u{1F389}", "Party popper"),
            CatalogEntry::Section("Smileys".to_string()),
            def("smile", "\u{1F604}", "Smiling face"),
            def("joy", "\u{1F602}", "Tears of joy"),
            def("wink", "\u{1F609}", "Winking face"),
            def("thinking", "\u{1F914}", "Thinking face"),
            def("cry", "\u{1F622}", "Crying face"),
            def("astonished", "\u{1F632}", "Astonished face"),
            CatalogEntry::Section("Gestures".to_string()),
            def("clap", "\u{1F44F}", "Clapping hands"),
            def("wave", "\u{1F44B}", "Waving hand"),
            def("pray", "\u{1F64F}", "Folded hands"),
            def("muscle", "\u{1F4AA}", "Flexed biceps"),
            CatalogEntry::Section("Objects".to_string()),
            def("fire", "\u{1F525}", "Fire"),
            def("rocket", "\u{1F680}", "Rocket"),
            def("eyes", "\u{1F440}", "Eyes"),
            def("bulb", "\u{1F4A1}", "Light bulb"),
            def("coffee", "\u{2615}", "Hot beverage"),
        ];
        let default_visible = ["thumbsup".to_string()].into_iter().collect();
        Self::new(entries, default_visible)
    }

    /// All entries in catalog order, sections included.
    pub fn get_all(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Iterate over reaction definitions only, skipping section markers.
    pub fn definitions(&self) -> impl Iterator<Item = &ReactionDefinition> {
        self.entries.iter().filter_map(|entry| match entry {
            CatalogEntry::Reaction(def) => Some(def),
            CatalogEntry::Section(_) => None,
        })
    }

    /// Look up a definition by alias.
    pub fn get(&self, alias: &str) -> Option<&ReactionDefinition> {
        self.definitions().find(|def| def.alias == alias)
    }

    /// Whether an alias exists in the catalog.
    pub fn exists(&self, alias: &str) -> bool {
        self.get(alias).is_some()
    }

    /// Aliases rendered with a count badge even when the count is zero.
    pub fn default_visible(&self) -> &BTreeSet<String> {
        &self.default_visible
    }

    /// The client-facing brief form, definitions only, in catalog order.
    pub fn brief(&self) -> Vec<BriefReaction> {
        self.definitions()
            .map(|d| BriefReaction {
                alias: d.alias.clone(),
                symbol: d.symbol.clone(),
                description: d.description.clone(),
            })
            .collect()
    }
}

fn def(alias: &str, symbol: &str, description: &str) -> CatalogEntry {
    CatalogEntry::Reaction(ReactionDefinition {
        alias: alias.to_string(),
        symbol: symbol.to_string(),
        description: description.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_thumbsup_visible_by_default() {
        let catalog = Catalog::builtin();
        assert!(catalog.exists("thumbsup"));
        assert!(catalog.default_visible().contains("thumbsup"));
        assert_eq!(catalog.default_visible().len(), 1);
    }

    #[test]
    fn unknown_alias_does_not_exist() {
        let catalog = Catalog::builtin();
        assert!(!catalog.exists("nonexistent"));
        assert!(catalog.get("nonexistent").is_none());
    }

    #[test]
    fn definitions_skip_section_markers() {
        let catalog = Catalog::builtin();
        let sections = catalog
            .get_all()
            .iter()
            .filter(|e| matches!(e, CatalogEntry::Section(_)))
            .count();
        assert!(sections > 0, "builtin catalog is sectioned");
        assert_eq!(
            catalog.definitions().count(),
            catalog.get_all().len() - sections
        );
    }

    #[test]
    fn brief_preserves_order_and_minimizes_keys() {
        let catalog = Catalog::builtin();
        let brief = catalog.brief();
        assert_eq!(brief.len(), catalog.definitions().count());
        assert_eq!(brief[0].alias, "thumbsup");

        let json = serde_json::to_value(&brief[0]).unwrap();
        assert_eq!(json["a"], "thumbsup");
        assert_eq!(json["s"], "\u{1F44D}");
        assert_eq!(json["d"], "Thumbs up");
    }

    #[test]
    fn aliases_are_unique() {
        let catalog = Catalog::builtin();
        let mut seen = BTreeSet::new();
        for d in catalog.definitions() {
            assert!(seen.insert(d.alias.clone()), "duplicate alias {}", d.alias);
        }
    }
}
