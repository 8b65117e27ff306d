//! Registry for managing providers.
//!
//! The `Registry` keeps providers keyed by their unique name while
//! remembering registration order, which breaks priority ties during
//! provider selection.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{RegistryError, RegistryResult};
use crate::provider::Provider;

/// An ordered, name-unique collection of shared providers.
///
/// # Example
///
/// ```rust
/// use mailroute::{MockProvider, Provider, Registry};
/// use std::sync::Arc;
///
/// let mut registry: Registry<dyn Provider> = Registry::new();
/// registry.register(Arc::new(MockProvider::new("relay"))).unwrap();
///
/// assert!(registry.get("relay").is_some());
/// ```
#[derive(Debug)]
pub struct Registry<P: ?Sized> {
    providers: HashMap<String, Arc<P>>,
    ordered: Vec<String>,
}

impl<P: Provider + ?Sized> Registry<P> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            ordered: Vec::new(),
        }
    }

    /// Register a provider, returning an error if the name is taken.
    pub fn register(&mut self, provider: Arc<P>) -> RegistryResult<()> {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        self.ordered.push(name.clone());
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<&Arc<P>> {
        self.providers.get(name)
    }

    /// Check if a provider with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// Get the names of all registered providers, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.ordered.iter().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Iterate over all providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<P>> {
        self.ordered
            .iter()
            .filter_map(move |name| self.providers.get(name))
    }
}

impl<P: Provider + ?Sized> Default for Registry<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;
    use crate::provider::EmailProvider;

    #[test]
    fn test_registry_register_and_get() {
        let mut registry: Registry<dyn EmailProvider> = Registry::new();
        registry.register(Arc::new(MockProvider::new("smtp"))).unwrap();

        assert!(registry.get("smtp").is_some());
        assert!(registry.get("unknown").is_none());
        assert!(registry.contains("smtp"));
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let mut registry: Registry<dyn EmailProvider> = Registry::new();
        registry.register(Arc::new(MockProvider::new("smtp"))).unwrap();

        let err = registry
            .register(Arc::new(MockProvider::new("smtp")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRegistered(name) if name == "smtp"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_preserves_order() {
        let mut registry: Registry<dyn EmailProvider> = Registry::new();
        for name in ["c", "a", "b"] {
            registry.register(Arc::new(MockProvider::new(name))).unwrap();
        }

        assert_eq!(registry.names(), vec!["c", "a", "b"]);
        let iterated: Vec<&str> = registry.iter().map(|p| p.name()).collect();
        assert_eq!(iterated, vec!["c", "a", "b"]);
    }
}
