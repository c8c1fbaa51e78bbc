//! Composition: fragment store, ordering, rewrite scopes and the composer.

pub mod composer;
pub mod errors;
pub mod graph;
pub mod rewrite;
pub mod store;

pub use composer::{compose, CancelToken, Composer};
pub use errors::ComposeError;
pub use graph::OrderGraph;
pub use rewrite::{RewriteEngine, RewriteScope};
pub use store::FragmentStore;
