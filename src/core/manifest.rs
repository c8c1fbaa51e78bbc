//! The composed declaration manifest.
//!
//! A manifest is produced fresh by every composition run and never changes
//! afterwards. It is the only thing handed to an emitter.

use serde::{Deserialize, Serialize};

use crate::core::fragment::{DeclItem, ItemKind};
use crate::util::hash::Fingerprint;

/// Version of the manifest format.
pub const MANIFEST_VERSION: u32 = 1;

/// The result of a composition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version
    pub version: u32,

    /// Configuration this manifest was composed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,

    /// Enabled flags, sorted
    pub flags: Vec<String>,

    /// Included fragments in composition order
    pub fragments: Vec<String>,

    /// Declaration items in order
    pub items: Vec<ManifestItem>,

    /// Chronological rewrite log
    pub rewrites: Vec<RewriteEvent>,
}

/// A declaration item together with the fragment it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestItem {
    /// Contributing fragment
    pub fragment: String,

    /// The declaration
    #[serde(flatten)]
    pub item: DeclItem,
}

/// One entry of the rewrite audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteEvent {
    /// Apply or restore
    pub action: RewriteAction,

    /// Affected symbol
    pub symbol: String,

    /// Value after the event (None = undefined)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Fragment whose scope caused the event
    pub fragment: String,

    /// Number of manifest items emitted before this event
    pub position: usize,
}

/// Kind of rewrite event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteAction {
    Apply,
    Restore,
}

impl Manifest {
    /// Declaration items without their fragment tags.
    pub fn declarations(&self) -> impl Iterator<Item = &DeclItem> {
        self.items.iter().map(|i| &i.item)
    }

    /// Items contributed by one fragment.
    pub fn items_of<'a>(&'a self, fragment: &'a str) -> impl Iterator<Item = &'a DeclItem> + 'a {
        self.items
            .iter()
            .filter(move |i| i.fragment == fragment)
            .map(|i| &i.item)
    }

    /// Position of a fragment in composition order.
    pub fn position_of(&self, fragment: &str) -> Option<usize> {
        self.fragments.iter().position(|f| f == fragment)
    }

    /// Check if a fragment was included.
    pub fn contains(&self, fragment: &str) -> bool {
        self.position_of(fragment).is_some()
    }

    /// Rewrite events that happen right before the item at `position`.
    pub fn events_at(&self, position: usize) -> impl Iterator<Item = &RewriteEvent> {
        self.rewrites.iter().filter(move |e| e.position == position)
    }

    /// SHA-256 over everything an emitter can render.
    ///
    /// Identical inputs give identical fingerprints, so the value can be
    /// used to detect whether a regenerated surface actually changed.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_usize(self.version as usize)
            .update_opt(self.configuration.as_deref())
            .update_usize(self.flags.len())
            .update_strs(self.flags.iter().map(String::as_str))
            .update_usize(self.fragments.len())
            .update_strs(self.fragments.iter().map(String::as_str))
            .update_usize(self.items.len());

        for entry in &self.items {
            fp.update_str(&entry.fragment);
            match &entry.item.kind {
                ItemKind::Include { path, system } => {
                    fp.update_str("include")
                        .update_str(path)
                        .update_str(if *system { "system" } else { "local" });
                }
                ItemKind::Text { text, id } => {
                    fp.update_str("text").update_str(text).update_opt(id.as_deref());
                }
                ItemKind::Initializer {
                    macro_name,
                    type_name,
                } => {
                    fp.update_str("initializer")
                        .update_str(macro_name)
                        .update_str(type_name);
                }
            }
        }

        fp.update_usize(self.rewrites.len());
        for event in &self.rewrites {
            fp.update_str(match event.action {
                RewriteAction::Apply => "apply",
                RewriteAction::Restore => "restore",
            })
            .update_str(&event.symbol)
            .update_opt(event.value.as_deref())
            .update_str(&event.fragment)
            .update_usize(event.position);
        }

        fp.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest {
            version: MANIFEST_VERSION,
            configuration: None,
            flags: vec!["MODULE_GCOAP".to_string()],
            fragments: vec!["prelude".to_string(), "gcoap".to_string()],
            items: vec![
                ManifestItem {
                    fragment: "prelude".to_string(),
                    item: DeclItem::system_include("stdint.h"),
                },
                ManifestItem {
                    fragment: "gcoap".to_string(),
                    item: DeclItem::system_include("net/gcoap.h"),
                },
            ],
            rewrites: vec![
                RewriteEvent {
                    action: RewriteAction::Apply,
                    symbol: "UINT16_MAX".to_string(),
                    value: Some("0xffff".to_string()),
                    fragment: "prelude".to_string(),
                    position: 0,
                },
                RewriteEvent {
                    action: RewriteAction::Restore,
                    symbol: "UINT16_MAX".to_string(),
                    value: None,
                    fragment: "prelude".to_string(),
                    position: 1,
                },
            ],
        }
    }

    #[test]
    fn test_queries() {
        let manifest = sample();
        assert_eq!(manifest.position_of("gcoap"), Some(1));
        assert!(!manifest.contains("saul"));
        assert_eq!(manifest.items_of("prelude").count(), 1);
        assert_eq!(manifest.events_at(1).count(), 1);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let manifest = sample();
        assert_eq!(manifest.fingerprint(), sample().fingerprint());

        let mut changed = sample();
        changed.rewrites[0].value = Some("65535".to_string());
        assert_ne!(manifest.fingerprint(), changed.fingerprint());

        let mut reordered = sample();
        reordered.items.swap(0, 1);
        assert_ne!(manifest.fingerprint(), reordered.fingerprint());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();

        assert_eq!(json["items"][0]["kind"], "include");
        assert_eq!(json["items"][0]["path"], "stdint.h");
        assert_eq!(json["items"][0]["fragment"], "prelude");
        assert_eq!(json["rewrites"][1]["action"], "restore");
        assert!(json["rewrites"][1].get("value").is_none());
        assert!(json.get("configuration").is_none());

        let back: Manifest = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample());
    }
}
