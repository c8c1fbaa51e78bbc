//! C header emitter.
//!
//! Renders a manifest as a header a binding generator can consume directly.
//! Rewrite events are written as preprocessor directives at the exact
//! positions they occurred, so each substitution is visible only to the
//! declarations of the fragment that requested it.

use std::fmt::Write as _;

use crate::compose::rewrite::macro_name;
use crate::core::fragment::ItemKind;
use crate::core::manifest::{Manifest, RewriteAction, RewriteEvent};
use crate::emit::{EmitOptions, Emitter};

/// Emits a C header.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderEmitter {
    options: EmitOptions,
}

impl HeaderEmitter {
    /// Create a header emitter.
    pub fn new(options: EmitOptions) -> Self {
        HeaderEmitter { options }
    }

    fn banner(&self, manifest: &Manifest, output: &mut String) {
        writeln!(output, "/* Generated by quay. Do not edit. */").unwrap();
        if self.options.fingerprint {
            writeln!(output, "/* fingerprint: {} */", manifest.fingerprint()).unwrap();
        }
        if let Some(configuration) = &manifest.configuration {
            writeln!(output, "/* configuration: {} */", configuration).unwrap();
        }
        if !manifest.flags.is_empty() {
            writeln!(output, "/* flags: {} */", manifest.flags.join(" ")).unwrap();
        }
        writeln!(output).unwrap();
    }
}

fn write_event(output: &mut String, event: &RewriteEvent) {
    let name = macro_name(&event.symbol);

    match (event.action, &event.value) {
        (RewriteAction::Apply, Some(value)) => {
            writeln!(output, "#undef {}", name).unwrap();
            write_define(output, &event.symbol, value);
        }
        (RewriteAction::Restore, Some(value)) => {
            writeln!(output, "#undef {}", name).unwrap();
            write_define(output, &event.symbol, value);
        }
        (_, None) => {
            writeln!(output, "#undef {}", name).unwrap();
        }
    }
}

fn write_define(output: &mut String, symbol: &str, value: &str) {
    if value.is_empty() {
        writeln!(output, "#define {}", symbol).unwrap();
    } else {
        writeln!(output, "#define {} {}", symbol, value).unwrap();
    }
}

fn write_item(output: &mut String, kind: &ItemKind) {
    match kind {
        ItemKind::Include { path, system: true } => {
            writeln!(output, "#include <{}>", path).unwrap();
        }
        ItemKind::Include {
            path,
            system: false,
        } => {
            writeln!(output, "#include \"{}\"", path).unwrap();
        }
        ItemKind::Text { text, .. } => {
            output.push_str(text);
            if !text.ends_with('\n') {
                output.push('\n');
            }
        }
        ItemKind::Initializer {
            macro_name,
            type_name,
        } => {
            writeln!(output, "static {} init_{}(void) {{", type_name, macro_name).unwrap();
            writeln!(output, "    {} result = {};", type_name, macro_name).unwrap();
            writeln!(output, "    return result;").unwrap();
            writeln!(output, "}}").unwrap();
        }
    }
}

impl Emitter for HeaderEmitter {
    fn emit(&self, manifest: &Manifest) -> String {
        let mut output = String::new();
        self.banner(manifest, &mut output);

        let mut events = manifest.rewrites.iter().peekable();

        for (position, entry) in manifest.items.iter().enumerate() {
            while let Some(event) = events.next_if(|e| e.position <= position) {
                write_event(&mut output, event);
            }
            write_item(&mut output, &entry.item.kind);
        }

        for event in events {
            write_event(&mut output, event);
        }

        output
    }
}
