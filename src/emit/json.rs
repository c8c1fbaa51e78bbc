//! JSON emitter.

use crate::core::manifest::Manifest;
use crate::emit::Emitter;

/// Emits the manifest as pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEmitter;

impl Emitter for JsonEmitter {
    fn emit(&self, manifest: &Manifest) -> String {
        let mut output = serde_json::to_string_pretty(manifest)
            .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize manifest: {}"}}"#, e));
        output.push('\n');
        output
    }
}
