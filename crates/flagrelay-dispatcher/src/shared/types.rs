pub use flagrelay_core::{
    AddonConfig, AddonInstance, DispatchOutcome, DomainEvent, EventTag, ProviderDefinition,
    TagTypeDefinition,
};
use serde::Deserialize;

/// Entry of the startup addons file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonSeed {
    #[serde(default = "default_seed_author")]
    pub created_by: String,
    #[serde(flatten)]
    pub config: AddonConfig,
}

fn default_seed_author() -> String {
    "flagrelay-bootstrap".to_string()
}

/// Query for the recent outcome history
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OutcomeQuery {
    pub limit: Option<usize>,
}
