//! Rewrite engine - scoped symbol substitutions with guaranteed restore.
//!
//! Rules are applied inside a [`RewriteScope`]. Dropping the scope restores
//! every rule it applied in reverse order, so a rewrite can never outlive the
//! fragment that requested it, whether processing finished or bailed out
//! with `?`. Scopes nest: rules of an outer scope stay active while an inner
//! scope is open.

use std::collections::BTreeMap;

use crate::compose::errors::ComposeError;
use crate::core::manifest::{RewriteAction, RewriteEvent};
use crate::core::rewrite::{RestoreAction, RewriteRule};

/// The macro name of a symbol: `ATOMIC_VAR_INIT(x)` -> `ATOMIC_VAR_INIT`.
pub fn macro_name(symbol: &str) -> &str {
    symbol.split('(').next().unwrap_or(symbol).trim()
}

/// A rule currently in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRewrite {
    /// Symbol as written in the rule
    pub symbol: String,
    /// Substituted value
    pub value: String,
    /// Fragment whose scope applied it
    pub fragment: String,
    restore: RestoreAction,
    previous: Option<String>,
}

/// Symbol state and rewrite stack for one composition run.
#[derive(Debug, Default)]
pub struct RewriteEngine {
    /// Current value of every defined symbol, keyed by macro name
    symbols: BTreeMap<String, String>,

    /// Active rewrites, innermost last
    active: Vec<ActiveRewrite>,

    /// Apply/restore events in order
    log: Vec<RewriteEvent>,

    /// Manifest position stamped on new events
    position: usize,
}

impl RewriteEngine {
    /// Create an engine with no symbols defined.
    pub fn new() -> Self {
        RewriteEngine::default()
    }

    /// Create an engine whose symbols start out with the given values.
    pub fn with_baseline(symbols: BTreeMap<String, String>) -> Self {
        RewriteEngine {
            symbols,
            ..RewriteEngine::default()
        }
    }

    /// Open a new scope for a fragment.
    pub fn scope(&mut self, fragment: impl Into<String>) -> RewriteScope<'_> {
        let mark = self.active.len();
        RewriteScope {
            engine: self,
            fragment: fragment.into(),
            mark,
        }
    }

    /// Currently active rewrites, outermost first.
    pub fn active(&self) -> &[ActiveRewrite] {
        &self.active
    }

    /// Current value of a symbol.
    pub fn value_of(&self, symbol: &str) -> Option<&str> {
        self.symbols.get(macro_name(symbol)).map(String::as_str)
    }

    /// Current symbol table.
    pub fn symbols(&self) -> &BTreeMap<String, String> {
        &self.symbols
    }

    /// Set the manifest position stamped on subsequent events.
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// The event log so far.
    pub fn log(&self) -> &[RewriteEvent] {
        &self.log
    }

    /// Consume the engine, returning its event log.
    pub fn into_log(self) -> Vec<RewriteEvent> {
        self.log
    }

    fn apply(&mut self, rule: &RewriteRule, fragment: &str) -> Result<(), ComposeError> {
        let name = macro_name(&rule.symbol);

        if let Some(existing) = self
            .active
            .iter()
            .find(|a| macro_name(&a.symbol) == name)
        {
            if existing.value != rule.value || existing.symbol != rule.symbol {
                return Err(ComposeError::RewriteConflict {
                    symbol: name.to_string(),
                    active_value: existing.value.clone(),
                    active_fragment: existing.fragment.clone(),
                    value: rule.value.clone(),
                    fragment: fragment.to_string(),
                });
            }
        }

        let previous = self.symbols.insert(name.to_string(), rule.value.clone());

        tracing::debug!(
            "rewrite `{}` -> `{}` for fragment `{}`",
            rule.symbol,
            rule.value,
            fragment
        );

        self.log.push(RewriteEvent {
            action: RewriteAction::Apply,
            symbol: rule.symbol.clone(),
            value: Some(rule.value.clone()),
            fragment: fragment.to_string(),
            position: self.position,
        });

        self.active.push(ActiveRewrite {
            symbol: rule.symbol.clone(),
            value: rule.value.clone(),
            fragment: fragment.to_string(),
            restore: rule.restore,
            previous,
        });

        Ok(())
    }

    fn restore_to(&mut self, mark: usize) {
        while self.active.len() > mark {
            let Some(entry) = self.active.pop() else {
                break;
            };
            let name = macro_name(&entry.symbol).to_string();

            // An outer rule for the same symbol keeps it alive regardless of
            // this rule's restore action.
            let outer_active = self.active.iter().any(|a| macro_name(&a.symbol) == name);

            let restored = match (entry.restore, outer_active) {
                (RestoreAction::Undefine, false) => None,
                _ => entry.previous,
            };

            // A value reinstated from the baseline belongs to the plain macro
            // name, not to this rule's parameter list.
            let symbol = if restored.is_some() && !outer_active {
                name.clone()
            } else {
                entry.symbol
            };

            match &restored {
                Some(value) => {
                    self.symbols.insert(name, value.clone());
                }
                None => {
                    self.symbols.remove(&name);
                }
            }

            self.log.push(RewriteEvent {
                action: RewriteAction::Restore,
                symbol,
                value: restored,
                fragment: entry.fragment,
                position: self.position,
            });
        }
    }
}

/// A rewrite scope. Dropping it restores everything applied through it.
#[derive(Debug)]
pub struct RewriteScope<'e> {
    engine: &'e mut RewriteEngine,
    fragment: String,
    mark: usize,
}

impl RewriteScope<'_> {
    /// Apply a rule within this scope.
    pub fn apply(&mut self, rule: &RewriteRule) -> Result<(), ComposeError> {
        self.engine.apply(rule, &self.fragment)
    }

    /// Open a nested scope; this scope's rules stay active inside it.
    pub fn nested(&mut self, fragment: impl Into<String>) -> RewriteScope<'_> {
        self.engine.scope(fragment)
    }

    /// The fragment this scope belongs to.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// Set the manifest position stamped on subsequent events.
    pub fn set_position(&mut self, position: usize) {
        self.engine.set_position(position);
    }

    /// Read-only view of the engine.
    pub fn engine(&self) -> &RewriteEngine {
        &*self.engine
    }
}

impl Drop for RewriteScope<'_> {
    fn drop(&mut self) {
        self.engine.restore_to(self.mark);
    }
}
