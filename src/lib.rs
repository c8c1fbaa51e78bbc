//! Quay - compose gated C declaration surfaces for binding generators
//!
//! This crate provides the core library functionality for Quay: gate
//! evaluation, fragment ordering, scoped rewrites, and manifest emission.

pub mod compose;
pub mod core;
pub mod emit;
pub mod ops;
pub mod util;

/// Test utilities and fixtures for Quay unit tests.
#[cfg(test)]
pub mod test_support;

pub use compose::{ComposeError, Composer, FragmentStore};
pub use core::{flags::FlagSet, gate::Gate, library::Library, manifest::Manifest};
pub use util::context::GlobalContext;
