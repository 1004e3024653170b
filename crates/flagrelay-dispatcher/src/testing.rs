use async_trait::async_trait;
use flagrelay_core::{
    event_kind, AddonParameters, AddonProvider, CoreError, Delivery, DomainEvent,
    ParameterDefinition, ParameterType, ProviderDefinition, ProviderRegistry, Result,
    TagTypeDefinition,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub event_type: String,
    pub event_id: u64,
    pub parameters: AddonParameters,
}

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Fail,
    /// Fail this many times, then succeed.
    FailTimes(u32),
    Sleep(Duration),
    Panic,
}

/// Provider stub with a `url` (required) and `var` (optional) parameter.
/// Clones share the invocation log.
#[derive(Clone)]
pub struct RecordingProvider {
    definition: ProviderDefinition,
    behavior: Behavior,
    calls: Arc<AtomicU32>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingProvider {
    pub fn new(name: &str) -> Self {
        Self {
            definition: ProviderDefinition {
                name: name.to_string(),
                display_name: name.to_string(),
                description: "Recording test provider".to_string(),
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
            behavior: Behavior::Succeed,
            calls: Arc::new(AtomicU32::new(0)),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_events(mut self, events: &[&str]) -> Self {
        self.definition.events = events.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_tag_type(mut self, name: &str) -> Self {
        self.definition.tag_types.push(TagTypeDefinition {
            name: name.to_string(),
            description: format!("{name} tag"),
            icon: name.chars().next().map(String::from).unwrap_or_default(),
        });
        self
    }

    pub fn failing(mut self) -> Self {
        self.behavior = Behavior::Fail;
        self
    }

    pub fn failing_times(mut self, times: u32) -> Self {
        self.behavior = Behavior::FailTimes(times);
        self
    }

    pub fn sleeping(mut self, duration: Duration) -> Self {
        self.behavior = Behavior::Sleep(duration);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.behavior = Behavior::Panic;
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddonProvider for RecordingProvider {
    fn definition(&self) -> &ProviderDefinition {
        &self.definition
    }

    async fn handle_event(
        &self,
        event_type: &str,
        event: &DomainEvent,
        parameters: &AddonParameters,
    ) -> Result<Delivery> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().unwrap().push(Invocation {
            event_type: event_type.to_string(),
            event_id: event.id,
            parameters: parameters.clone(),
        });

        match self.behavior {
            Behavior::Succeed => Ok(Delivery::sent(1)),
            Behavior::Fail => Err(CoreError::Delivery("endpoint returned 500".to_string())),
            Behavior::FailTimes(times) if call < times => {
                Err(CoreError::Delivery(format!("attempt {} failed", call + 1)))
            }
            Behavior::FailTimes(_) => Ok(Delivery::sent(1)),
            Behavior::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Ok(Delivery::sent(1))
            }
            Behavior::Panic => panic!("handler blew up"),
        }
    }
}

pub fn registry_of(providers: Vec<RecordingProvider>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry.register(Arc::new(provider)).unwrap();
    }
    registry
}

pub fn registry_with(providers: Vec<RecordingProvider>) -> Arc<ProviderRegistry> {
    Arc::new(registry_of(providers))
}
