use crate::{AddonProvider, CoreError, ProviderDefinition, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Lookup from provider name to its definition and handler.
///
/// Built once at startup; afterwards it is shared behind an `Arc` and only
/// read, so lookups need no locking.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn AddonProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under the name declared by its definition
    pub fn register(&mut self, provider: Arc<dyn AddonProvider>) -> Result<()> {
        let name = provider.definition().name.clone();
        if self.providers.contains_key(&name) {
            return Err(CoreError::DuplicateProvider(name));
        }

        debug!(provider = %name, "Registered addon provider");
        self.providers.insert(name, provider);
        Ok(())
    }

    pub fn with_provider(mut self, provider: Arc<dyn AddonProvider>) -> Result<Self> {
        self.register(provider)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn AddonProvider>> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownProvider(name.to_string()))
    }

    pub fn definition(&self, name: &str) -> Result<&ProviderDefinition> {
        self.providers
            .get(name)
            .map(|provider| provider.definition())
            .ok_or_else(|| CoreError::UnknownProvider(name.to_string()))
    }

    /// All provider definitions, ordered by name.
    pub fn list(&self) -> Vec<&ProviderDefinition> {
        let mut definitions: Vec<_> = self
            .providers
            .values()
            .map(|provider| provider.definition())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.providers.keys().collect();
        names.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubProvider;

    #[test]
    fn test_register_and_get() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider::new("simple"))).unwrap();

        let provider = registry.get("simple").unwrap();
        assert_eq!(provider.name(), "simple");
        assert_eq!(registry.definition("simple").unwrap().display_name, "Simple");
        assert!(registry.contains("simple"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(StubProvider::new("simple"))).unwrap();

        let result = registry.register(Arc::new(StubProvider::new("simple")));
        assert!(matches!(result, Err(CoreError::DuplicateProvider(name)) if name == "simple"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_unknown_provider() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());

        let result = registry.get("unknown");
        assert!(matches!(result, Err(CoreError::UnknownProvider(name)) if name == "unknown"));
        assert!(registry.definition("unknown").is_err());
    }

    #[test]
    fn test_list_is_sorted_by_name() {
        let registry = ProviderRegistry::new()
            .with_provider(Arc::new(StubProvider::new("webhook")))
            .and_then(|r| r.with_provider(Arc::new(StubProvider::new("jira"))))
            .and_then(|r| r.with_provider(Arc::new(StubProvider::new("slack"))))
            .unwrap();

        let names: Vec<_> = registry.list().into_iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["jira", "slack", "webhook"]);
    }

    #[test]
    fn test_concurrent_lookups_share_registry() {
        let registry = Arc::new(
            ProviderRegistry::new()
                .with_provider(Arc::new(StubProvider::new("simple")))
                .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get("simple").is_ok())
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
