use crate::shared::error::{DispatcherError, DispatcherResult};
use crate::shared::types::TagTypeDefinition;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

#[async_trait]
pub trait TagTypeRepository: Send + Sync {
    /// Store a tag type unless one with the same name exists. Returns
    /// whether it was stored.
    async fn insert_if_absent(&self, tag_type: TagTypeDefinition) -> DispatcherResult<bool>;

    /// Ordered by name
    async fn list(&self) -> DispatcherResult<Vec<TagTypeDefinition>>;
}

#[derive(Clone, Default)]
pub struct InMemoryTagTypeRepository {
    storage: Arc<RwLock<BTreeMap<String, TagTypeDefinition>>>,
}

impl InMemoryTagTypeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TagTypeRepository for InMemoryTagTypeRepository {
    async fn insert_if_absent(&self, tag_type: TagTypeDefinition) -> DispatcherResult<bool> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| DispatcherError::StorageError("Lock poisoned".to_string()))?;
        if storage.contains_key(&tag_type.name) {
            return Ok(false);
        }
        storage.insert(tag_type.name.clone(), tag_type);
        Ok(true)
    }

    async fn list(&self) -> DispatcherResult<Vec<TagTypeDefinition>> {
        let storage = self
            .storage
            .read()
            .map_err(|_| DispatcherError::StorageError("Lock poisoned".to_string()))?;
        Ok(storage.values().cloned().collect())
    }
}
