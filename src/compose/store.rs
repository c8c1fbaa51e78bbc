//! Fragment store - the registry of fragments for one composition run.

use std::collections::HashSet;

use crate::compose::errors::ComposeError;
use crate::core::fragment::Fragment;

/// Holds fragments in registration order.
///
/// Registration order is the stable default ordering: fragments that no
/// constraint orders relative to each other keep the order they were
/// registered in.
#[derive(Debug, Clone, Default)]
pub struct FragmentStore {
    fragments: Vec<Fragment>,
    names: HashSet<String>,
}

impl FragmentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        FragmentStore::default()
    }

    /// Register a top-level fragment.
    ///
    /// Fails if the fragment, or any of its nested children, shares a name
    /// with something already registered or with each other. A failed
    /// registration leaves the store unchanged.
    pub fn register(&mut self, fragment: Fragment) -> Result<(), ComposeError> {
        let mut incoming = HashSet::new();
        for name in fragment.names() {
            if self.names.contains(name) || !incoming.insert(name) {
                return Err(ComposeError::DuplicateFragment {
                    name: name.to_string(),
                });
            }
        }

        self.names
            .extend(incoming.into_iter().map(|n| n.to_string()));
        self.fragments.push(fragment);
        Ok(())
    }

    /// All top-level fragments in registration order.
    pub fn all(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Check if a name is registered (top-level or nested).
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of top-level fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_preserves_order() {
        let mut store = FragmentStore::new();
        store.register(Fragment::new("b")).unwrap();
        store.register(Fragment::new("a")).unwrap();
        store.register(Fragment::new("c")).unwrap();

        let names: Vec<_> = store.all().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_duplicate_fragment() {
        let mut store = FragmentStore::new();
        store.register(Fragment::new("a")).unwrap();

        let err = store.register(Fragment::new("a")).unwrap_err();
        assert_eq!(
            err,
            ComposeError::DuplicateFragment {
                name: "a".to_string()
            }
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_nested_fragment() {
        let mut store = FragmentStore::new();
        store
            .register(Fragment::new("outer").with_child(Fragment::new("inner")))
            .unwrap();
        assert!(store.contains("inner"));

        let err = store.register(Fragment::new("inner")).unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateFragment { name } if name == "inner"));

        let err = store
            .register(
                Fragment::new("x")
                    .with_child(Fragment::new("y"))
                    .with_child(Fragment::new("y")),
            )
            .unwrap_err();
        assert!(matches!(err, ComposeError::DuplicateFragment { name } if name == "y"));
        assert!(!store.contains("x"));
    }
}
