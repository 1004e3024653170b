use super::AddonRepository;
use crate::shared::error::{DispatcherError, DispatcherResult};
use crate::shared::types::{AddonConfig, AddonInstance};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Default)]
struct CacheState {
    /// Bumped on every mutation; a load that started under an older
    /// generation is returned but not cached.
    generation: u64,
    entry: Option<(Instant, Vec<AddonInstance>)>,
}

/// Serves `list()` from memory for at most `ttl`. Mutations go to the inner
/// repository and then drop the cached list.
pub struct CachedAddonRepository {
    inner: Arc<dyn AddonRepository>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl CachedAddonRepository {
    pub fn new(inner: Arc<dyn AddonRepository>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn invalidate(&self) -> DispatcherResult<()> {
        let mut state = self.lock()?;
        state.generation += 1;
        state.entry = None;
        Ok(())
    }

    fn lock(&self) -> DispatcherResult<std::sync::MutexGuard<'_, CacheState>> {
        self.state
            .lock()
            .map_err(|_| DispatcherError::StorageError("addon cache lock poisoned".to_string()))
    }
}

#[async_trait]
impl AddonRepository for CachedAddonRepository {
    async fn insert(
        &self,
        config: AddonConfig,
        created_by: &str,
    ) -> DispatcherResult<AddonInstance> {
        let result = self.inner.insert(config, created_by).await;
        self.invalidate()?;
        result
    }

    async fn get(&self, id: u64) -> DispatcherResult<Option<AddonInstance>> {
        self.inner.get(id).await
    }

    async fn update(&self, id: u64, config: AddonConfig) -> DispatcherResult<AddonInstance> {
        let result = self.inner.update(id, config).await;
        self.invalidate()?;
        result
    }

    async fn delete(&self, id: u64) -> DispatcherResult<bool> {
        let result = self.inner.delete(id).await;
        self.invalidate()?;
        result
    }

    async fn list(&self) -> DispatcherResult<Vec<AddonInstance>> {
        let generation = {
            let state = self.lock()?;
            if let Some((loaded_at, addons)) = &state.entry {
                if loaded_at.elapsed() < self.ttl {
                    return Ok(addons.clone());
                }
            }
            state.generation
        };

        let addons = self.inner.list().await?;

        let mut state = self.lock()?;
        if state.generation == generation {
            state.entry = Some((Instant::now(), addons.clone()));
        } else {
            debug!("Addon list changed while loading, not caching");
        }
        Ok(addons)
    }
}
