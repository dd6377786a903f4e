//! Uniform property names
//!
//! Uniforms are addressed by a small integer [`PropertyId`] instead of their
//! name. The mapping is bijective and append-only: an id is never reused or
//! reassigned for the lifetime of the registry.

use std::collections::HashMap;

/// Interned uniform name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub u32);

/// Bidirectional name ↔ [`PropertyId`] map
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    by_name: HashMap<String, PropertyId>,
    names: Vec<String>,
}

impl PropertyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, assigning the next free id on first use
    pub fn id(&mut self, name: &str) -> PropertyId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }

        let id = PropertyId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        log::trace!("Registered uniform property '{}' as {:?}", name, id);
        id
    }

    /// Id for `name` if it was registered before
    pub fn lookup(&self, name: &str) -> Option<PropertyId> {
        self.by_name.get(name).copied()
    }

    /// Name registered for `id`
    pub fn name(&self, id: PropertyId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_idempotent_and_distinct() {
        let mut registry = PropertyRegistry::new();

        let color = registry.id("u_Color");
        let model = registry.id("u_Model");

        assert_eq!(registry.id("u_Color"), color);
        assert_ne!(color, model);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_name_lookup_is_bijective() {
        let mut registry = PropertyRegistry::new();
        let id = registry.id("u_Time");

        assert_eq!(registry.name(id), Some("u_Time"));
        assert_eq!(registry.lookup("u_Time"), Some(id));
        assert_eq!(registry.lookup("u_Missing"), None);
        assert_eq!(registry.name(PropertyId(99)), None);
    }
}
