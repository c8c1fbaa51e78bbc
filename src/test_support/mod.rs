//! Test utilities for Quay unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use quay::test_support::{flags, store_of, TestLibrary};
//!
//! #[test]
//! fn test_example() {
//!     let lib = TestLibrary::new(fixtures::RIOT_LIBRARY);
//!     let library = lib.load();
//!     // Compose against flags(&["MODULE_GCOAP"])...
//! }
//! ```

pub mod fixtures;

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::compose::store::FragmentStore;
use crate::core::flags::FlagSet;
use crate::core::fragment::Fragment;
use crate::core::library::{Library, LIBRARY_NAME};

// Re-export fixtures for convenience
pub use fixtures::*;

/// A flag set from flag names.
pub fn flags(names: &[&str]) -> FlagSet {
    FlagSet::from_names(names.iter().copied())
}

/// A store with the given fragments registered in order.
///
/// Panics on duplicate names; use `FragmentStore::register` directly to
/// test that path.
pub fn store_of(fragments: Vec<Fragment>) -> FragmentStore {
    let mut store = FragmentStore::new();
    for fragment in fragments {
        if let Err(e) = store.register(fragment) {
            panic!("invalid test store: {}", e);
        }
    }
    store
}

/// A library written to a temporary directory.
#[derive(Debug)]
pub struct TestLibrary {
    dir: TempDir,
}

impl TestLibrary {
    /// Write `contents` as `Quay.toml` in a fresh temporary directory.
    pub fn new(contents: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(LIBRARY_NAME), contents).unwrap();
        TestLibrary { dir }
    }

    /// Add another file next to the library.
    pub fn with_file(self, path: impl AsRef<Path>, contents: &str) -> Self {
        let path = self.dir.path().join(path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
        self
    }

    /// The temporary directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the library file.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join(LIBRARY_NAME)
    }

    /// Load the library, panicking on error.
    pub fn load(&self) -> Library {
        match Library::load(&self.path()) {
            Ok(library) => library,
            Err(e) => panic!("failed to load test library: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_of_keeps_order() {
        let store = store_of(vec![Fragment::new("b"), Fragment::new("a")]);
        assert_eq!(store.all()[0].name, "b");
    }

    #[test]
    #[should_panic(expected = "invalid test store")]
    fn test_store_of_rejects_duplicates() {
        store_of(vec![Fragment::new("a"), Fragment::new("a")]);
    }

    #[test]
    fn test_library_fixture_loads() {
        let lib = TestLibrary::new(RIOT_LIBRARY);
        let library = lib.load();
        assert_eq!(library.name, "riot-sys");
        assert!(!library.configurations.is_empty());
    }
}
