use crate::{AddonConfig, CoreError, ProviderDefinition, ProviderRegistry, Result};

/// Validate an addon configuration against the provider it references.
///
/// Runs on create and update, before anything is persisted. Dispatch never
/// re-validates stored addons.
pub fn validate_addon_config<'r>(
    registry: &'r ProviderRegistry,
    config: &AddonConfig,
) -> Result<&'r ProviderDefinition> {
    let definition = registry.definition(&config.provider)?;
    validate_required_parameters(definition, config)?;
    validate_event_filter(definition, config)?;
    Ok(definition)
}

fn validate_required_parameters(
    definition: &ProviderDefinition,
    config: &AddonConfig,
) -> Result<()> {
    for parameter in definition.required_parameters() {
        let present = config
            .parameters
            .get(&parameter.name)
            .is_some_and(|value| !value.trim().is_empty());

        if !present {
            return Err(CoreError::Validation(format!(
                "Missing required parameter '{}' for provider '{}'",
                parameter.name, definition.name
            )));
        }
    }

    Ok(())
}

fn validate_event_filter(definition: &ProviderDefinition, config: &AddonConfig) -> Result<()> {
    if let Some(unsupported) = config
        .events
        .iter()
        .find(|event| !definition.declares_event(event))
    {
        return Err(CoreError::Validation(format!(
            "Event '{}' is not supported by provider '{}'",
            unsupported, definition.name
        )));
    }

    Ok(())
}
