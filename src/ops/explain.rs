//! Implementation of `quay explain`.
//!
//! Answers "why is (or isn't) this fragment in my surface, and where?"

use std::fmt::Write as _;

use anyhow::{bail, Result};

use crate::compose::Composer;
use crate::core::flags::FlagSet;
use crate::core::fragment::Fragment;
use crate::core::library::Library;
use crate::util::diagnostic::suggestions;

/// A rewrite rule as it affects the explained fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplainedRule {
    /// Rewritten symbol
    pub symbol: String,
    /// Substituted value
    pub value: String,
    /// Rule gate
    pub gate: String,
    /// Whether the rule's gate holds
    pub active: bool,
    /// Fragment whose scope applies it (the fragment itself or an ancestor)
    pub scope: String,
}

/// Everything known about one fragment under a flag set.
#[derive(Debug, Clone)]
pub struct Explanation {
    /// Fragment name
    pub fragment: String,

    /// Enclosing fragment, for nested fragments
    pub parent: Option<String>,

    /// Gate expression
    pub gate: String,

    /// Flags the gate refers to, with their state
    pub flags: Vec<(String, bool)>,

    /// Whether the gate holds
    pub gate_passes: bool,

    /// Whether the selected configuration allows it (None = no configuration)
    pub allowed: Option<bool>,

    /// Ordering constraints, as written
    pub constraints: Vec<String>,

    /// Rewrite rules in effect for it, outermost scope first
    pub rules: Vec<ExplainedRule>,

    /// Declaration items, as written
    pub items: Vec<String>,

    /// Position in the composed surface, if included
    pub position: Option<usize>,

    /// Number of fragments in the composed surface
    pub total: usize,

    /// Composition error, if composing failed
    pub error: Option<String>,
}

impl Explanation {
    /// Whether the fragment ends up in the surface.
    pub fn included(&self) -> bool {
        self.position.is_some()
    }
}

fn find_parent<'a>(fragments: &'a [Fragment], name: &str) -> Option<&'a Fragment> {
    for fragment in fragments {
        if fragment.children.iter().any(|c| c.name == name) {
            return Some(fragment);
        }
        if let Some(found) = find_parent(&fragment.children, name) {
            return Some(found);
        }
    }
    None
}

/// Explain one fragment of a library under a flag set and optional
/// configuration.
pub fn explain(
    library: &Library,
    fragment: &str,
    flags: &FlagSet,
    configuration: Option<&str>,
) -> Result<Explanation> {
    let Some(found) = library.fragment(fragment) else {
        bail!(
            "fragment `{}` not found in library `{}`\n{}",
            fragment,
            library.name,
            suggestions::FRAGMENT_NOT_FOUND
        );
    };

    let configuration = configuration
        .map(|name| library.configuration(name))
        .transpose()?;

    let mut composer = Composer::new(&library.rewrites);
    if let Some(configuration) = configuration {
        composer = composer.with_configuration(configuration);
    }
    let effective = composer.effective_flags(flags);

    let parent = find_parent(&library.fragments, fragment).map(|p| p.name.clone());

    // Enclosing scopes, outermost first. Nested fragments are subject to the
    // allowlist through their top-level ancestor.
    let mut scopes = vec![found];
    while let Some(p) = find_parent(&library.fragments, &scopes[0].name) {
        scopes.insert(0, p);
    }
    let top = scopes[0];

    let rules = scopes
        .iter()
        .flat_map(|&scope| {
            let effective = &effective;
            library.rules_for(&scope.name).map(move |rule| ExplainedRule {
                symbol: rule.symbol.clone(),
                value: rule.value.clone(),
                gate: rule.gate.to_string(),
                active: rule.gate.evaluate(effective),
                scope: scope.name.clone(),
            })
        })
        .collect();

    let mut explanation = Explanation {
        fragment: fragment.to_string(),
        parent,
        gate: found.gate.to_string(),
        flags: found
            .gate
            .flags()
            .into_iter()
            .map(|f| (f.to_string(), effective.is_enabled(f)))
            .collect(),
        gate_passes: found.gate.evaluate(&effective),
        allowed: configuration.map(|c| c.allows(&top.name)),
        constraints: found.constraints.iter().map(|c| c.to_string()).collect(),
        rules,
        items: found.items.iter().map(|i| i.to_string()).collect(),
        position: None,
        total: 0,
        error: None,
    };

    match library
        .store()
        .and_then(|store| composer.compose(&store, flags))
    {
        Ok(manifest) => {
            explanation.position = manifest.position_of(fragment);
            explanation.total = manifest.fragments.len();
        }
        Err(e) => explanation.error = Some(e.to_string()),
    }

    Ok(explanation)
}

/// Format an explanation for display.
pub fn format_explanation(explanation: &Explanation) -> String {
    let mut output = String::new();

    writeln!(output, "Fragment: {}", explanation.fragment).unwrap();
    if let Some(parent) = &explanation.parent {
        writeln!(output, "  Nested in: {}", parent).unwrap();
    }

    writeln!(
        output,
        "  Gate: {} ({})",
        explanation.gate,
        if explanation.gate_passes { "true" } else { "false" }
    )
    .unwrap();
    for (flag, enabled) in &explanation.flags {
        let state = if *enabled { "set" } else { "unset" };
        writeln!(output, "    {} = {}", flag, state).unwrap();
    }

    match explanation.allowed {
        Some(true) => writeln!(output, "  Configuration: allowed").unwrap(),
        Some(false) => writeln!(output, "  Configuration: excluded").unwrap(),
        None => {}
    }

    if !explanation.constraints.is_empty() {
        writeln!(output, "  Constraints:").unwrap();
        for constraint in &explanation.constraints {
            writeln!(output, "    {}", constraint).unwrap();
        }
    }

    if !explanation.rules.is_empty() {
        writeln!(output, "  Rewrites:").unwrap();
        for rule in &explanation.rules {
            let state = if rule.active { "" } else { " (inactive)" };
            let inherited = if rule.scope == explanation.fragment {
                String::new()
            } else {
                format!(" (from `{}`)", rule.scope)
            };
            writeln!(
                output,
                "    {} -> {}{}{}",
                rule.symbol, rule.value, inherited, state
            )
            .unwrap();
            if rule.gate != "true" {
                writeln!(output, "      when {}", rule.gate).unwrap();
            }
        }
    }

    if !explanation.items.is_empty() {
        writeln!(output, "  Items:").unwrap();
        for item in &explanation.items {
            writeln!(output, "    {}", item).unwrap();
        }
    }

    writeln!(output).unwrap();
    match (&explanation.error, explanation.position) {
        (Some(error), _) => writeln!(output, "Composition failed: {}", error).unwrap(),
        (None, Some(position)) => writeln!(
            output,
            "Included at position {} of {}",
            position + 1,
            explanation.total
        )
        .unwrap(),
        (None, None) => writeln!(output, "Not included").unwrap(),
    }

    output
}
