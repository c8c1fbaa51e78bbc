//! Core data structures for Quay.
//!
//! This module contains the foundational types used throughout Quay:
//! - Gates and flag sets
//! - Fragments, declaration items and rewrite rules
//! - Libraries (Quay.toml) and the composed manifest

pub mod flags;
pub mod fragment;
pub mod gate;
pub mod library;
pub mod manifest;
pub mod rewrite;

pub use flags::FlagSet;
pub use fragment::{Constraint, DeclItem, Fragment, ItemKind};
pub use gate::{Gate, GateParseError};
pub use library::{Configuration, Library, LIBRARY_NAME};
pub use manifest::{Manifest, ManifestItem, RewriteAction, RewriteEvent};
pub use rewrite::{RestoreAction, RewriteRule};
