use crate::features::addon_management::repo::AddonRepository;
use crate::features::event_feed::repo::EventRepository;
use crate::shared::error::{DispatcherError, DispatcherResult};
use crate::shared::types::{AddonConfig, AddonInstance, DomainEvent, ProviderDefinition};
use flagrelay_core::{event_kind, validate_addon_config, ProviderRegistry};
use std::sync::Arc;
use tracing::{info, warn};

/// Service for managing addon configurations
pub struct AddonService {
    repo: Arc<dyn AddonRepository>,
    registry: Arc<ProviderRegistry>,
    events: Arc<dyn EventRepository>,
}

impl AddonService {
    pub fn new(
        repo: Arc<dyn AddonRepository>,
        registry: Arc<ProviderRegistry>,
        events: Arc<dyn EventRepository>,
    ) -> Self {
        Self {
            repo,
            registry,
            events,
        }
    }

    /// Create an addon. Invalid configurations are rejected before anything
    /// is stored.
    pub async fn create_addon(
        &self,
        config: AddonConfig,
        created_by: &str,
    ) -> DispatcherResult<AddonInstance> {
        validate_addon_config(&self.registry, &config)?;

        let addon = self.repo.insert(config, created_by).await?;
        info!(addon_id = addon.id, provider = %addon.provider(), "Addon created");

        self.record_audit_event(event_kind::ADDON_CONFIG_CREATED, created_by, &addon)
            .await;
        Ok(addon)
    }

    pub async fn update_addon(
        &self,
        id: u64,
        config: AddonConfig,
        updated_by: &str,
    ) -> DispatcherResult<AddonInstance> {
        validate_addon_config(&self.registry, &config)?;

        let addon = self.repo.update(id, config).await?;
        info!(addon_id = addon.id, provider = %addon.provider(), "Addon updated");

        self.record_audit_event(event_kind::ADDON_CONFIG_UPDATED, updated_by, &addon)
            .await;
        Ok(addon)
    }

    pub async fn remove_addon(&self, id: u64, removed_by: &str) -> DispatcherResult<()> {
        let addon = self
            .repo
            .get(id)
            .await?
            .ok_or(DispatcherError::AddonNotFound(id))?;

        if !self.repo.delete(id).await? {
            return Err(DispatcherError::AddonNotFound(id));
        }
        info!(addon_id = id, "Addon removed");

        self.record_audit_event(event_kind::ADDON_CONFIG_DELETED, removed_by, &addon)
            .await;
        Ok(())
    }

    pub async fn get_addon(&self, id: u64) -> DispatcherResult<AddonInstance> {
        self.repo
            .get(id)
            .await?
            .ok_or(DispatcherError::AddonNotFound(id))
    }

    pub async fn list_addons(&self) -> DispatcherResult<Vec<AddonInstance>> {
        self.repo.list().await
    }

    pub fn provider_definitions(&self) -> Vec<ProviderDefinition> {
        self.registry.list().into_iter().cloned().collect()
    }

    /// Parameters are left out of the audit trail; they hold credentials.
    async fn record_audit_event(&self, kind: &str, actor: &str, addon: &AddonInstance) {
        let event = DomainEvent::new(
            kind,
            actor,
            serde_json::json!({ "id": addon.id, "provider": addon.provider() }),
        );

        if let Err(error) = self.events.append(event).await {
            warn!(addon_id = addon.id, error = %error, "Failed to record addon audit event");
        }
    }
}
