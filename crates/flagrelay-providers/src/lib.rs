pub mod features;

use features::http_delivery::{HttpDeliveryRepository, ReqwestHttpDeliveryRepository};
use features::jira::JiraProvider;
use features::slack::SlackProvider;
use features::webhook::WebhookProvider;
use flagrelay_core::{event_kind, AddonParameters, CoreError, ProviderRegistry, Result};
use std::sync::Arc;
use std::time::Duration;

/// Settings shared by the bundled providers.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL of the toggle admin UI, used for links in messages.
    pub public_url: String,
    pub request_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            public_url: "http://localhost:4242".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Registry with the webhook, slack and jira providers over a reqwest client.
pub fn builtin_registry(settings: &ProviderSettings) -> Result<ProviderRegistry> {
    let repo = Arc::new(ReqwestHttpDeliveryRepository::new(settings.request_timeout)?);
    builtin_registry_with(repo, settings)
}

pub fn builtin_registry_with(
    repo: Arc<dyn HttpDeliveryRepository>,
    settings: &ProviderSettings,
) -> Result<ProviderRegistry> {
    ProviderRegistry::new()
        .with_provider(Arc::new(WebhookProvider::new(repo.clone())))?
        .with_provider(Arc::new(SlackProvider::new(
            repo.clone(),
            settings.public_url.clone(),
        )))?
        .with_provider(Arc::new(JiraProvider::new(repo, settings.public_url.clone())))
}

pub(crate) fn lifecycle_events() -> Vec<String> {
    event_kind::TOGGLE_LIFECYCLE
        .iter()
        .map(|kind| kind.to_string())
        .collect()
}

/// Parameters are validated before they are stored, so a missing one here
/// means the addon was stored around validation.
pub(crate) fn required_parameter<'a>(parameters: &'a AddonParameters, name: &str) -> Result<&'a str> {
    parameters
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CoreError::Validation(format!("Missing '{name}' parameter")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contains_bundled_providers() {
        let registry = builtin_registry(&ProviderSettings::default()).unwrap();
        let names: Vec<_> = registry.list().into_iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["jira", "slack", "webhook"]);
    }

    #[test]
    fn test_bundled_providers_react_to_lifecycle_events() {
        let registry = builtin_registry(&ProviderSettings::default()).unwrap();
        for definition in registry.list() {
            for kind in event_kind::TOGGLE_LIFECYCLE {
                assert!(definition.declares_event(kind), "{} misses {kind}", definition.name);
            }
        }
    }

    #[test]
    fn test_required_parameter_rejects_empty_value() {
        let mut parameters = AddonParameters::new();
        parameters.insert("url".to_string(), String::new());
        assert!(required_parameter(&parameters, "url").is_err());
        assert!(required_parameter(&parameters, "other").is_err());
    }
}
