//! High-level operations.
//!
//! This module contains the implementation of Quay commands.

pub mod check;
pub mod compose;
pub mod explain;

pub use check::{check, format_report, CheckReport};
pub use compose::{compose_all, compose_library, ComposeOptions, ComposeOutput};
pub use explain::{explain, format_explanation, ExplainedRule, Explanation};
