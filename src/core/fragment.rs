//! Fragments - named, gated groups of declaration items.
//!
//! A fragment corresponds to one guarded block of an aggregator header:
//! a gate (`#ifdef MODULE_PERIPH_GPIO`), the declarations inside it, and the
//! ordering it must keep relative to other blocks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::gate::Gate;

/// A single declaration item.
///
/// The payload is opaque to composition; only its identity matters, for
/// duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclItem {
    /// What the item declares
    #[serde(flatten)]
    pub kind: ItemKind,

    /// Whether repeating this item is harmless (e.g. include-guarded header)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub idempotent: bool,
}

/// The payload of a declaration item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    /// A header include
    Include {
        /// Header path as written in the include directive
        path: String,
        /// `<path>` when true, `"path"` otherwise
        #[serde(default)]
        system: bool,
    },

    /// Raw declaration text
    Text {
        /// Declaration source
        text: String,
        /// Explicit identity, defaults to the text itself
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// A typed accessor for a constant initializer macro.
    ///
    /// Initializer macros such as `MUTEX_INIT` cannot be used by a binding
    /// generator without knowing their type; the accessor gives them one.
    Initializer {
        /// The initializer macro name
        #[serde(rename = "macro")]
        macro_name: String,
        /// The C type the macro initializes
        #[serde(rename = "type")]
        type_name: String,
    },
}

impl DeclItem {
    /// A local include (`#include "path"`).
    pub fn include(path: impl Into<String>) -> Self {
        DeclItem {
            kind: ItemKind::Include {
                path: path.into(),
                system: false,
            },
            idempotent: false,
        }
    }

    /// A system include (`#include <path>`).
    pub fn system_include(path: impl Into<String>) -> Self {
        DeclItem {
            kind: ItemKind::Include {
                path: path.into(),
                system: true,
            },
            idempotent: false,
        }
    }

    /// A raw declaration.
    pub fn text(text: impl Into<String>) -> Self {
        DeclItem {
            kind: ItemKind::Text {
                text: text.into(),
                id: None,
            },
            idempotent: false,
        }
    }

    /// A typed initializer accessor.
    pub fn initializer(macro_name: impl Into<String>, type_name: impl Into<String>) -> Self {
        DeclItem {
            kind: ItemKind::Initializer {
                macro_name: macro_name.into(),
                type_name: type_name.into(),
            },
            idempotent: false,
        }
    }

    /// Mark this item as safe to repeat.
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    /// Give a text item an explicit identity.
    pub fn with_id(mut self, new_id: impl Into<String>) -> Self {
        if let ItemKind::Text { ref mut id, .. } = self.kind {
            *id = Some(new_id.into());
        }
        self
    }

    /// The identity used for duplicate detection.
    pub fn identity(&self) -> String {
        match &self.kind {
            ItemKind::Include { path, .. } => format!("include:{}", path),
            ItemKind::Text { id: Some(id), .. } => format!("text:{}", id),
            ItemKind::Text { text, id: None } => format!("text:{}", text),
            ItemKind::Initializer { macro_name, .. } => format!("initializer:{}", macro_name),
        }
    }
}

impl fmt::Display for DeclItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ItemKind::Include { path, system: true } => write!(f, "<{}>", path),
            ItemKind::Include { path, system: false } => write!(f, "\"{}\"", path),
            ItemKind::Text { id: Some(id), .. } => write!(f, "text `{}`", id),
            ItemKind::Text { text, id: None } => {
                let first = text.lines().next().unwrap_or_default();
                write!(f, "text `{}`", first.trim())
            }
            ItemKind::Initializer {
                macro_name,
                type_name,
            } => write!(f, "init_{}() -> {}", macro_name, type_name),
        }
    }
}

/// An ordering constraint between two fragments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// This fragment must come before the named one
    MustPrecede(String),
    /// This fragment must come after the named one
    MustFollow(String),
}

impl Constraint {
    /// The other fragment this constraint refers to.
    pub fn target(&self) -> &str {
        match self {
            Constraint::MustPrecede(name) | Constraint::MustFollow(name) => name,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::MustPrecede(name) => write!(f, "must precede `{}`", name),
            Constraint::MustFollow(name) => write!(f, "must follow `{}`", name),
        }
    }
}

/// A named, gated group of declaration items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Unique name
    pub name: String,

    /// Inclusion condition
    pub gate: Gate,

    /// Declaration items, in order
    pub items: Vec<DeclItem>,

    /// Ordering constraints relative to other top-level fragments
    pub constraints: Vec<Constraint>,

    /// Sub-fragments processed inside this fragment's rewrite scope
    pub children: Vec<Fragment>,
}

impl Fragment {
    /// Create an ungated, empty fragment.
    pub fn new(name: impl Into<String>) -> Self {
        Fragment {
            name: name.into(),
            gate: Gate::Always,
            items: Vec::new(),
            constraints: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Set the gate.
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Append a declaration item.
    pub fn with_item(mut self, item: DeclItem) -> Self {
        self.items.push(item);
        self
    }

    /// Require this fragment to come before `other`.
    pub fn must_precede(mut self, other: impl Into<String>) -> Self {
        self.constraints.push(Constraint::MustPrecede(other.into()));
        self
    }

    /// Require this fragment to come after `other`.
    pub fn must_follow(mut self, other: impl Into<String>) -> Self {
        self.constraints.push(Constraint::MustFollow(other.into()));
        self
    }

    /// Append a nested sub-fragment.
    pub fn with_child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    /// This fragment's name and the names of all nested children, depth first.
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        for child in &self.children {
            names.extend(child.names());
        }
        names
    }
}
