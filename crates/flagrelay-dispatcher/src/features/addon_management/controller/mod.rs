use crate::features::addon_management::service::AddonService;
use crate::shared::types::{AddonConfig, AddonInstance, AddonSeed, ProviderDefinition};
use flagrelay_core::ErrorResponse;
use std::sync::Arc;
use tracing::{info, warn};

/// Controller for addon configuration requests
pub struct AddonController {
    service: Arc<AddonService>,
}

impl AddonController {
    pub fn new(service: Arc<AddonService>) -> Self {
        Self { service }
    }

    /// Handle create addon request
    /// Thin wrapper that delegates to service
    pub async fn create_addon(
        &self,
        config: AddonConfig,
        created_by: &str,
    ) -> Result<AddonInstance, ErrorResponse> {
        info!(provider = %config.provider, "Received create addon request");

        self.service
            .create_addon(config, created_by)
            .await
            .map_err(|e| e.into())
    }

    pub fn provider_definitions(&self) -> Vec<ProviderDefinition> {
        self.service.provider_definitions()
    }

    /// Create every seed; invalid seeds are logged and skipped. Returns the
    /// number created.
    pub async fn load_seeds(&self, seeds: Vec<AddonSeed>) -> usize {
        let mut created = 0;
        for seed in seeds {
            let provider = seed.config.provider.clone();
            match self.service.create_addon(seed.config, &seed.created_by).await {
                Ok(addon) => {
                    info!(addon_id = addon.id, %provider, "Seeded addon");
                    created += 1;
                }
                Err(error) => {
                    warn!(%provider, error = %error, "Skipping invalid addon seed");
                }
            }
        }
        created
    }
}
