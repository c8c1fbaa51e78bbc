//! Plain list emitter: one declaration per line.

use std::fmt::Write as _;

use crate::core::manifest::{Manifest, RewriteAction};
use crate::emit::Emitter;

/// Emits one declaration reference per line, followed by a commented
/// summary of the rewrite log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListEmitter;

impl Emitter for ListEmitter {
    fn emit(&self, manifest: &Manifest) -> String {
        let mut output = String::new();

        for entry in &manifest.items {
            writeln!(output, "{}", entry.item).unwrap();
        }

        if !manifest.rewrites.is_empty() {
            writeln!(output, "# rewrites:").unwrap();
            for event in &manifest.rewrites {
                match (event.action, &event.value) {
                    (RewriteAction::Apply, Some(value)) => writeln!(
                        output,
                        "#   @{} apply {} = {} ({})",
                        event.position, event.symbol, value, event.fragment
                    ),
                    (RewriteAction::Restore, Some(value)) => writeln!(
                        output,
                        "#   @{} restore {} = {} ({})",
                        event.position, event.symbol, value, event.fragment
                    ),
                    (_, None) => writeln!(
                        output,
                        "#   @{} undefine {} ({})",
                        event.position, event.symbol, event.fragment
                    ),
                }
                .unwrap();
            }
        }

        output
    }
}
