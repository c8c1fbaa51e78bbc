//! The composer - turns a fragment store and a flag set into a manifest.
//!
//! Composition runs in five steps:
//! 1. validate constraints and rewrite scopes against the store
//! 2. drop fragments whose gate is false (or that the configuration excludes)
//! 3. order the survivors with a stable topological sort
//! 4. walk them in order, bracketing each with its rewrite scope
//! 5. collect items, rejecting non-idempotent duplicates
//!
//! Composition is all-or-nothing: any error discards the partial result.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::compose::errors::ComposeError;
use crate::compose::graph::OrderGraph;
use crate::compose::rewrite::{RewriteEngine, RewriteScope};
use crate::compose::store::FragmentStore;
use crate::core::flags::FlagSet;
use crate::core::fragment::{Constraint, DeclItem, Fragment};
use crate::core::library::Configuration;
use crate::core::manifest::{Manifest, ManifestItem, MANIFEST_VERSION};
use crate::core::rewrite::RewriteRule;

/// Shared flag used to abort composition runs at the next fragment boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Composes fragments into a manifest.
#[derive(Debug, Clone, Default)]
pub struct Composer<'a> {
    rules: &'a [RewriteRule],
    configuration: Option<&'a Configuration>,
    cancel: Option<CancelToken>,
}

/// Items and fragments collected so far.
#[derive(Debug, Default)]
struct Collector {
    fragments: Vec<String>,
    items: Vec<ManifestItem>,
    /// identity -> (first fragment, idempotent)
    seen: HashMap<String, (String, bool)>,
}

impl Collector {
    fn push(&mut self, fragment: &str, item: &DeclItem) -> Result<(), ComposeError> {
        let identity = item.identity();

        if let Some((first, first_idempotent)) = self.seen.get(&identity) {
            if *first_idempotent && item.idempotent {
                tracing::debug!(
                    "skipping repeated declaration {} in `{}` (first in `{}`)",
                    item,
                    fragment,
                    first
                );
                return Ok(());
            }
            return Err(ComposeError::DuplicateDeclaration {
                identity,
                first: first.clone(),
                second: fragment.to_string(),
            });
        }

        self.seen
            .insert(identity, (fragment.to_string(), item.idempotent));
        self.items.push(ManifestItem {
            fragment: fragment.to_string(),
            item: item.clone(),
        });
        Ok(())
    }
}

impl<'a> Composer<'a> {
    /// Create a composer using the given rewrite rules.
    pub fn new(rules: &'a [RewriteRule]) -> Self {
        Composer {
            rules,
            configuration: None,
            cancel: None,
        }
    }

    /// Compose for a named configuration: its flags are forced on and only
    /// the fragments it allows are considered.
    pub fn with_configuration(mut self, configuration: &'a Configuration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Abort at the next fragment boundary once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The effective flag set: the caller's flags plus configuration flags.
    pub fn effective_flags(&self, flags: &FlagSet) -> FlagSet {
        let mut effective = flags.clone();
        if let Some(configuration) = self.configuration {
            for flag in &configuration.flags {
                effective.enable(flag.clone());
            }
        }
        effective
    }

    /// Compose the store's fragments against a flag set.
    pub fn compose(&self, store: &FragmentStore, flags: &FlagSet) -> Result<Manifest, ComposeError> {
        let flags = self.effective_flags(flags);

        self.validate(store)?;

        let by_name: HashMap<&str, &Fragment> =
            store.all().iter().map(|f| (f.name.as_str(), f)).collect();

        let included: Vec<&Fragment> = store
            .all()
            .iter()
            .filter(|f| {
                if let Some(configuration) = self.configuration {
                    if !configuration.allows(&f.name) {
                        tracing::debug!(
                            "skipping fragment `{}`: not part of configuration `{}`",
                            f.name,
                            configuration.name
                        );
                        return false;
                    }
                }
                let enabled = f.gate.evaluate(&flags);
                if !enabled {
                    tracing::debug!("skipping fragment `{}`: gate `{}` is false", f.name, f.gate);
                }
                enabled
            })
            .collect();

        let mut graph = OrderGraph::new(included.iter().map(|f| f.name.as_str()));
        for fragment in &included {
            for constraint in &fragment.constraints {
                // Constraints against excluded fragments have nothing to order
                match constraint {
                    Constraint::MustPrecede(other) => graph.add_edge(&fragment.name, other),
                    Constraint::MustFollow(other) => graph.add_edge(other, &fragment.name),
                };
            }
        }

        let order = graph.stable_order()?;

        let mut engine = RewriteEngine::with_baseline(flags.baseline());
        let mut collected = Collector::default();

        for name in order {
            if let Some(token) = &self.cancel {
                if token.is_cancelled() {
                    return Err(ComposeError::Cancelled {
                        completed: collected.fragments.len(),
                    });
                }
            }

            let Some(fragment) = by_name.get(name) else {
                continue;
            };

            {
                let mut scope = engine.scope(name);
                self.process(fragment, &mut scope, &flags, &mut collected)?;
            }

            debug_assert!(engine.active().is_empty());
        }

        tracing::debug!(
            "composed {} fragment(s), {} item(s), {} rewrite event(s)",
            collected.fragments.len(),
            collected.items.len(),
            engine.log().len()
        );

        Ok(Manifest {
            version: MANIFEST_VERSION,
            configuration: self.configuration.map(|c| c.name.clone()),
            flags: flags.names().map(str::to_string).collect(),
            fragments: collected.fragments,
            items: collected.items,
            rewrites: engine.into_log(),
        })
    }

    /// Process one fragment inside its own scope: apply rules, collect
    /// items, then recurse into included children.
    fn process(
        &self,
        fragment: &Fragment,
        scope: &mut RewriteScope<'_>,
        flags: &FlagSet,
        collected: &mut Collector,
    ) -> Result<(), ComposeError> {
        scope.set_position(collected.items.len());

        for rule in self.rules.iter().filter(|r| r.applies_to(&fragment.name)) {
            if rule.gate.evaluate(flags) {
                scope.apply(rule)?;
            }
        }

        collected.fragments.push(fragment.name.clone());
        for item in &fragment.items {
            collected.push(&fragment.name, item)?;
        }

        for child in &fragment.children {
            if !child.gate.evaluate(flags) {
                tracing::debug!(
                    "skipping nested fragment `{}`: gate `{}` is false",
                    child.name,
                    child.gate
                );
                continue;
            }
            let mut inner = scope.nested(child.name.clone());
            self.process(child, &mut inner, flags, collected)?;
        }

        scope.set_position(collected.items.len());
        Ok(())
    }

    /// Static checks that do not depend on the flag set.
    fn validate(&self, store: &FragmentStore) -> Result<(), ComposeError> {
        let top_level: HashSet<&str> = store.all().iter().map(|f| f.name.as_str()).collect();

        for fragment in store.all() {
            unordered_children(fragment)?;

            let mut precedes = HashSet::new();
            let mut follows = HashSet::new();

            for constraint in &fragment.constraints {
                let other = constraint.target();

                if other == fragment.name {
                    return Err(ComposeError::Conflict {
                        fragment: fragment.name.clone(),
                        other: other.to_string(),
                        reason: format!("`{}` is ordered relative to itself", other),
                    });
                }

                if !top_level.contains(other) {
                    if store.contains(other) {
                        return Err(ComposeError::Conflict {
                            fragment: fragment.name.clone(),
                            other: other.to_string(),
                            reason: format!(
                                "`{}` is a nested fragment and cannot be ordered against",
                                other
                            ),
                        });
                    }
                    return Err(ComposeError::UnknownFragment {
                        name: other.to_string(),
                        referenced_by: format!("fragment `{}`", fragment.name),
                    });
                }

                match constraint {
                    Constraint::MustPrecede(_) => precedes.insert(other),
                    Constraint::MustFollow(_) => follows.insert(other),
                };

                if precedes.contains(other) && follows.contains(other) {
                    return Err(ComposeError::Conflict {
                        fragment: fragment.name.clone(),
                        other: other.to_string(),
                        reason: format!("it must both precede and follow `{}`", other),
                    });
                }
            }
        }

        for rule in self.rules {
            for name in &rule.fragments {
                if !store.contains(name) {
                    return Err(ComposeError::UnknownFragment {
                        name: name.clone(),
                        referenced_by: format!("rewrite `{}`", rule.symbol),
                    });
                }
            }
        }

        if let Some(configuration) = self.configuration {
            for name in &configuration.fragments {
                if !top_level.contains(name.as_str()) {
                    return Err(ComposeError::UnknownFragment {
                        name: name.clone(),
                        referenced_by: format!("configuration `{}`", configuration.name),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Nested fragments run inside their parent and cannot carry ordering
/// constraints of their own.
fn unordered_children(fragment: &Fragment) -> Result<(), ComposeError> {
    for child in &fragment.children {
        if let Some(constraint) = child.constraints.first() {
            return Err(ComposeError::Conflict {
                fragment: child.name.clone(),
                other: constraint.target().to_string(),
                reason: format!(
                    "nested fragment `{}` is placed by `{}` and cannot declare ordering constraints",
                    child.name, fragment.name
                ),
            });
        }
        unordered_children(child)?;
    }
    Ok(())
}

/// Compose a store against a flag set without rewrite rules.
pub fn compose(store: &FragmentStore, flags: &FlagSet) -> Result<Manifest, ComposeError> {
    Composer::default().compose(store, flags)
}
