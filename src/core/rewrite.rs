//! Rewrite rules - temporary, scoped symbol substitutions.
//!
//! A rewrite rule is the explicit form of a `#define X ... #undef X` pair
//! wrapped around a block of includes, used to paper over declarations a
//! binding generator cannot digest (`#define __float128 long double`).

use serde::{Deserialize, Serialize};

use crate::core::gate::Gate;

/// What happens to a symbol when its rewrite goes out of scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreAction {
    /// Put back whatever value the symbol had before (or undefine it if it
    /// had none)
    #[default]
    Reinstate,
    /// Always leave the symbol undefined
    Undefine,
}

/// A scoped substitution of one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    /// Symbol or macro name
    pub symbol: String,

    /// Substitution value while the rule is active
    pub value: String,

    /// Fragments during whose processing the rule is active
    pub fragments: Vec<String>,

    /// Restore behavior
    pub restore: RestoreAction,

    /// Condition under which the rule applies at all
    pub gate: Gate,
}

impl RewriteRule {
    /// Create a rule that reinstates the previous value on restore.
    pub fn new(symbol: impl Into<String>, value: impl Into<String>) -> Self {
        RewriteRule {
            symbol: symbol.into(),
            value: value.into(),
            fragments: Vec::new(),
            restore: RestoreAction::Reinstate,
            gate: Gate::Always,
        }
    }

    /// Scope the rule to a fragment.
    pub fn for_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragments.push(fragment.into());
        self
    }

    /// Set the restore action.
    pub fn with_restore(mut self, restore: RestoreAction) -> Self {
        self.restore = restore;
        self
    }

    /// Set the gate.
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Check if the rule is scoped to the given fragment.
    pub fn applies_to(&self, fragment: &str) -> bool {
        self.fragments.iter().any(|f| f == fragment)
    }
}
