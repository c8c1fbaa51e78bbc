//! Composition error types and diagnostics.
//!
//! Every error here is a static configuration defect: nothing is retried and
//! no partial manifest is produced.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error during composition.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum ComposeError {
    #[error("duplicate fragment `{name}`")]
    #[diagnostic(
        code(quay::compose::duplicate_fragment),
        help("Rename one of the fragments; names must be unique across the library")
    )]
    DuplicateFragment { name: String },

    #[error("conflicting rewrites of `{symbol}`")]
    #[diagnostic(
        code(quay::compose::rewrite_conflict),
        help("Give both rules the same value, or scope them to fragments that never nest")
    )]
    RewriteConflict {
        symbol: String,
        active_value: String,
        active_fragment: String,
        value: String,
        fragment: String,
    },

    #[error("ordering cycle between fragments: {}", fragments.join(", "))]
    #[diagnostic(
        code(quay::compose::cycle),
        help("Remove one of the `precede`/`follow` constraints forming the cycle")
    )]
    Cycle { fragments: Vec<String> },

    #[error("contradictory ordering for fragment `{fragment}`: {reason}")]
    #[diagnostic(code(quay::compose::conflict))]
    Conflict {
        fragment: String,
        other: String,
        reason: String,
    },

    #[error("duplicate declaration `{identity}`")]
    #[diagnostic(
        code(quay::compose::duplicate_declaration),
        help("Mark both occurrences `idempotent = true` if repeating the declaration is harmless")
    )]
    DuplicateDeclaration {
        identity: String,
        first: String,
        second: String,
    },

    #[error("unknown fragment `{name}` (referenced by {referenced_by})")]
    #[diagnostic(code(quay::compose::unknown_fragment))]
    UnknownFragment {
        name: String,
        referenced_by: String,
    },

    #[error("composition cancelled after {completed} fragment(s)")]
    #[diagnostic(code(quay::compose::cancelled))]
    Cancelled { completed: usize },
}

impl ComposeError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ComposeError::DuplicateFragment { name } => {
                Diagnostic::error(format!("fragment `{}` is defined more than once", name))
                    .with_context("nested fragments share the namespace of top-level fragments")
                    .with_suggestion(format!("Rename one of the `{}` fragments", name))
            }

            ComposeError::RewriteConflict {
                symbol,
                active_value,
                active_fragment,
                value,
                fragment,
            } => Diagnostic::error(format!("conflicting rewrites of `{}`", symbol))
                .with_context(format!(
                    "`{}` rewrites it to `{}` and is still active",
                    active_fragment, active_value
                ))
                .with_context(format!("`{}` rewrites it to `{}`", fragment, value))
                .with_suggestion("Use the same substitution value in both rules".to_string())
                .with_suggestion(format!(
                    "Move `{}` out of `{}`'s nested fragments",
                    fragment, active_fragment
                )),

            ComposeError::Cycle { fragments } => {
                let mut path = fragments.clone();
                if let Some(first) = fragments.first() {
                    path.push(first.clone());
                }
                Diagnostic::error("ordering cycle between fragments")
                    .with_context(format!("cycle: {}", path.join(" -> ")))
                    .with_suggestion(
                        "Break the cycle by removing a `precede` or `follow` constraint"
                            .to_string(),
                    )
            }

            ComposeError::Conflict {
                fragment,
                other,
                reason,
            } => Diagnostic::error(format!("contradictory ordering for `{}`", fragment))
                .with_context(reason.clone())
                .with_suggestion(format!(
                    "Keep a single constraint between `{}` and `{}`",
                    fragment, other
                )),

            ComposeError::DuplicateDeclaration {
                identity,
                first,
                second,
            } => Diagnostic::error(format!("duplicate declaration `{}`", identity))
                .with_context(format!("first declared by `{}`", first))
                .with_context(format!("declared again by `{}`", second))
                .with_suggestion(
                    "Mark both occurrences `idempotent = true` if the header is include-guarded"
                        .to_string(),
                )
                .with_suggestion(format!("Remove the declaration from `{}`", second)),

            ComposeError::UnknownFragment {
                name,
                referenced_by,
            } => Diagnostic::error(format!("unknown fragment `{}`", name))
                .with_context(format!("referenced by {}", referenced_by))
                .with_suggestion("Check that the fragment name is spelled correctly".to_string())
                .with_suggestion("Run `quay list` to see all fragments".to_string()),

            ComposeError::Cancelled { completed } => Diagnostic::error(format!(
                "composition cancelled after {} fragment(s)",
                completed
            ))
            .with_context("another composition run in the same batch failed"),
        }
    }
}
