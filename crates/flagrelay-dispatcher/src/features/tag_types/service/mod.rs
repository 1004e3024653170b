use crate::features::tag_types::repo::TagTypeRepository;
use crate::shared::error::DispatcherResult;
use crate::shared::types::TagTypeDefinition;
use flagrelay_core::ProviderRegistry;
use std::sync::Arc;
use tracing::{debug, info};

pub struct TagTypeService {
    repo: Arc<dyn TagTypeRepository>,
}

impl TagTypeService {
    pub fn new(repo: Arc<dyn TagTypeRepository>) -> Self {
        Self { repo }
    }

    /// Register the tag types every installed provider declares. Existing
    /// tag types win. Returns the number newly registered.
    pub async fn register_provider_tag_types(
        &self,
        registry: &ProviderRegistry,
    ) -> DispatcherResult<usize> {
        let mut registered = 0;
        for definition in registry.list() {
            for tag_type in &definition.tag_types {
                if self.repo.insert_if_absent(tag_type.clone()).await? {
                    info!(tag_type = %tag_type.name, provider = %definition.name, "Registered tag type");
                    registered += 1;
                } else {
                    debug!(tag_type = %tag_type.name, provider = %definition.name, "Tag type already exists");
                }
            }
        }
        Ok(registered)
    }

    pub async fn list_tag_types(&self) -> DispatcherResult<Vec<TagTypeDefinition>> {
        self.repo.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tag_types::repo::InMemoryTagTypeRepository;
    use crate::testing::{registry_with, RecordingProvider};

    #[tokio::test]
    async fn test_register_provider_tag_types() {
        let service = TagTypeService::new(Arc::new(InMemoryTagTypeRepository::new()));
        let registry = registry_with(vec![
            RecordingProvider::new("plain"),
            RecordingProvider::new("chat").with_tag_type("slack"),
            RecordingProvider::new("tracker").with_tag_type("jira"),
        ]);

        assert_eq!(service.register_provider_tag_types(&registry).await.unwrap(), 2);

        let names: Vec<_> = service
            .list_tag_types()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["jira", "slack"]);
    }

    #[tokio::test]
    async fn test_shared_tag_type_is_registered_once() {
        let repo = Arc::new(InMemoryTagTypeRepository::new());
        let service = TagTypeService::new(repo.clone());
        let registry = registry_with(vec![
            RecordingProvider::new("chat-a").with_tag_type("slack"),
            RecordingProvider::new("chat-b").with_tag_type("slack"),
        ]);

        assert_eq!(service.register_provider_tag_types(&registry).await.unwrap(), 1);
        assert_eq!(service.register_provider_tag_types(&registry).await.unwrap(), 0);
        assert_eq!(service.list_tag_types().await.unwrap().len(), 1);
    }
}
