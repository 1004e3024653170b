pub mod cache;

use crate::shared::error::{DispatcherError, DispatcherResult};
use crate::shared::types::{AddonConfig, AddonInstance};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Repository trait for addon configuration storage
#[async_trait]
pub trait AddonRepository: Send + Sync {
    /// Store a new addon, assigning its id
    async fn insert(&self, config: AddonConfig, created_by: &str)
        -> DispatcherResult<AddonInstance>;

    /// Retrieve an addon by id
    async fn get(&self, id: u64) -> DispatcherResult<Option<AddonInstance>>;

    /// Replace the configuration of an existing addon
    async fn update(&self, id: u64, config: AddonConfig) -> DispatcherResult<AddonInstance>;

    /// Delete an addon, returning whether it existed
    async fn delete(&self, id: u64) -> DispatcherResult<bool>;

    /// List all addons ordered by id
    async fn list(&self) -> DispatcherResult<Vec<AddonInstance>>;
}

#[derive(Default)]
struct AddonTable {
    next_id: u64,
    addons: BTreeMap<u64, AddonInstance>,
}

/// In-memory implementation of the addon repository.
///
/// Writes to the table go through one lock, so mutations of the same addon
/// are serialized.
#[derive(Clone, Default)]
pub struct InMemoryAddonRepository {
    storage: Arc<RwLock<AddonTable>>,
}

impl InMemoryAddonRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> DispatcherError {
    DispatcherError::StorageError("Lock poisoned".to_string())
}

#[async_trait]
impl AddonRepository for InMemoryAddonRepository {
    async fn insert(
        &self,
        config: AddonConfig,
        created_by: &str,
    ) -> DispatcherResult<AddonInstance> {
        let mut storage = self.storage.write().map_err(|_| poisoned())?;
        storage.next_id += 1;
        let addon = AddonInstance::new(storage.next_id, config, created_by);
        storage.addons.insert(addon.id, addon.clone());
        Ok(addon)
    }

    async fn get(&self, id: u64) -> DispatcherResult<Option<AddonInstance>> {
        let storage = self.storage.read().map_err(|_| poisoned())?;
        Ok(storage.addons.get(&id).cloned())
    }

    async fn update(&self, id: u64, config: AddonConfig) -> DispatcherResult<AddonInstance> {
        let mut storage = self.storage.write().map_err(|_| poisoned())?;
        let addon = storage
            .addons
            .get_mut(&id)
            .ok_or(DispatcherError::AddonNotFound(id))?;
        addon.config = config;
        addon.updated_at = Some(Utc::now());
        Ok(addon.clone())
    }

    async fn delete(&self, id: u64) -> DispatcherResult<bool> {
        let mut storage = self.storage.write().map_err(|_| poisoned())?;
        Ok(storage.addons.remove(&id).is_some())
    }

    async fn list(&self) -> DispatcherResult<Vec<AddonInstance>> {
        let storage = self.storage.read().map_err(|_| poisoned())?;
        Ok(storage.addons.values().cloned().collect())
    }
}
