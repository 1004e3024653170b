use crate::{AddonParameters, DomainEvent, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Url,
    Text,
    Textfield,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    pub required: bool,
}

impl ParameterDefinition {
    pub fn required(
        name: impl Into<String>,
        display_name: impl Into<String>,
        parameter_type: ParameterType,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: None,
            parameter_type,
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        display_name: impl Into<String>,
        parameter_type: ParameterType,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, display_name, parameter_type)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagTypeDefinition {
    pub name: String,
    pub description: String,
    pub icon: String,
}

/// Static description of an integration type. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDefinition {
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub parameters: Vec<ParameterDefinition>,
    pub events: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_types: Vec<TagTypeDefinition>,
}

impl ProviderDefinition {
    pub fn declares_event(&self, event_type: &str) -> bool {
        self.events.iter().any(|e| e == event_type)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterDefinition> {
        self.parameters.iter().filter(|p| p.required)
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// What a handler did with an event it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Delivery {
    /// `requests` external calls were made and all succeeded.
    Sent { requests: usize },
    /// The handler chose not to act, e.g. no routing tag on the event.
    Skipped { reason: String },
}

impl Delivery {
    pub fn sent(requests: usize) -> Self {
        Delivery::Sent { requests }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Delivery::Skipped {
            reason: reason.into(),
        }
    }
}

/// Delivery logic of one provider.
///
/// `parameters` were validated against `definition()` when the addon was
/// stored. Implementations must be reentrant: the same provider is invoked
/// concurrently for different addons and events. A handler that decides an
/// event is not for it returns `Delivery::Skipped` rather than an error.
///
/// Under a `RetryPolicy` with retries, any `Err` causes `handle_event` to run again
/// from the start with the same event, so side effects of a partially
/// successful attempt happen twice.
#[async_trait]
pub trait AddonProvider: Send + Sync {
    fn definition(&self) -> &ProviderDefinition;

    async fn handle_event(
        &self,
        event_type: &str,
        event: &DomainEvent,
        parameters: &AddonParameters,
    ) -> Result<Delivery>;

    fn name(&self) -> &str {
        &self.definition().name
    }
}
