use crate::host::{ComponentBuilder, StandardComponent};
use std::collections::BTreeMap;

const DEFAULT_COMPONENT_TYPE: &str = "UtilityModule";

pub type ComponentFactory = fn() -> Box<dyn ComponentBuilder>;

/// Maps a `componentType` string to the builder that constructs it.
pub struct ComponentRegistry {
    factories: BTreeMap<String, ComponentFactory>,
    default_type: String,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    /// Registry with the built-in component types.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for component_type in [
            "RootModule",
            "UtilityModule",
            "SingleJointModule",
            "EmptyJointModule",
        ] {
            registry.register(component_type, standard_factory);
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
            default_type: DEFAULT_COMPONENT_TYPE.to_string(),
        }
    }

    pub fn register(
        &mut self,
        component_type: impl Into<String>,
        factory: ComponentFactory,
    ) -> Option<ComponentFactory> {
        self.factories.insert(component_type.into(), factory)
    }

    pub fn set_default_type(&mut self, component_type: impl Into<String>) {
        self.default_type = component_type.into();
    }

    pub fn default_type(&self) -> &str {
        &self.default_type
    }

    pub fn contains(&self, component_type: &str) -> bool {
        self.factories.contains_key(component_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Builder for `component_type`, falling back to the default type.
    /// `None` only when neither is registered.
    pub fn create(&self, component_type: &str) -> Option<Box<dyn ComponentBuilder>> {
        self.factories
            .get(component_type.trim())
            .or_else(|| self.factories.get(&self.default_type))
            .map(|factory| factory())
    }
}

fn standard_factory() -> Box<dyn ComponentBuilder> {
    Box::new(StandardComponent::default())
}
