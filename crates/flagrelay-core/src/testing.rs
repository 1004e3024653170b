use crate::{
    event_kind, AddonParameters, AddonProvider, Delivery, DomainEvent, ParameterDefinition,
    ParameterType, ProviderDefinition, Result,
};
use async_trait::async_trait;

/// Provider with a `url` (required) and `var` (optional) parameter that
/// accepts every lifecycle event and does nothing.
pub struct StubProvider {
    definition: ProviderDefinition,
}

impl StubProvider {
    pub fn new(name: &str) -> Self {
        Self {
            definition: ProviderDefinition {
                name: name.to_string(),
                display_name: "Simple".to_string(),
                description: "Some description".to_string(),
                parameters: vec![
                    ParameterDefinition::required("url", "Some URL", ParameterType::Url),
                    ParameterDefinition::optional("var", "Some var", ParameterType::Text),
                ],
                events: event_kind::TOGGLE_LIFECYCLE
                    .iter()
                    .map(|e| e.to_string())
                    .collect(),
                tag_types: vec![],
            },
        }
    }
}

#[async_trait]
impl AddonProvider for StubProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn handle_event(
        &self,
        _event_type: &str,
        _event: &DomainEvent,
        _parameters: &AddonParameters,
    ) -> Result<Delivery> {
        Ok(Delivery::sent(0))
    }
}
