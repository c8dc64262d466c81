//! Resource schema provider

use crate::error::{AuthzError, Result};
use crate::types::Resource;
use std::collections::HashMap;

/// Source of resource descriptors, keyed by class
pub trait ResourceSchemaProvider: Send + Sync {
    fn schema(&self, class: &str) -> Option<&Resource>;

    /// Descriptor for `class`, or [`AuthzError::UnknownResource`]
    fn require(&self, class: &str) -> Result<&Resource> {
        self.schema(class)
            .ok_or_else(|| AuthzError::UnknownResource(class.to_string()))
    }
}

/// Static registry of resource descriptors
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry, rejecting duplicate or empty class names
    pub fn from_resources(resources: impl IntoIterator<Item = Resource>) -> Result<Self> {
        let mut registry = Self::new();
        for resource in resources {
            if resource.class.trim().is_empty() {
                return Err(AuthzError::Config("resource class cannot be empty".to_string()));
            }
            if registry.resources.contains_key(&resource.class) {
                return Err(AuthzError::Config(format!(
                    "resource '{}' declared twice",
                    resource.class
                )));
            }
            registry.resources.insert(resource.class.clone(), resource);
        }
        Ok(registry)
    }

    pub fn register(&mut self, resource: Resource) {
        self.resources.insert(resource.class.clone(), resource);
    }

    pub fn get(&self, class: &str) -> Option<&Resource> {
        self.resources.get(class)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ResourceSchemaProvider for ResourceRegistry {
    fn schema(&self, class: &str) -> Option<&Resource> {
        self.get(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = ResourceRegistry::from_resources([
            Resource::model("Post").with_ownership_fk(),
            Resource::special("Git"),
        ])
        .unwrap();

        assert!(registry.require("Post").unwrap().declares_ownership_fk());
        assert!(registry.require("Git").unwrap().is_special());
        assert!(matches!(
            registry.require("Comment"),
            Err(AuthzError::UnknownResource(_))
        ));
    }

    #[test]
    fn test_rejects_duplicates() {
        let result = ResourceRegistry::from_resources([
            Resource::model("Post"),
            Resource::model("Post"),
        ]);
        assert!(matches!(result, Err(AuthzError::Config(_))));
    }
}
