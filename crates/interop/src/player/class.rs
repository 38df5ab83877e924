use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ConfigError;

pub const BASE_CLASS: &str = "Player";

const BUILTIN: &[(&str, &str)] = &[
    ("AirVehicle", BASE_CLASS),
    ("Aircraft", "AirVehicle"),
    ("Helicopter", "AirVehicle"),
    ("UnmannedAirVehicle", "AirVehicle"),
    ("GroundVehicle", BASE_CLASS),
    ("Tank", "GroundVehicle"),
    ("ArmoredVehicle", "GroundVehicle"),
    ("Ship", BASE_CLASS),
    ("Weapon", BASE_CLASS),
    ("Missile", "Weapon"),
    ("Bomb", "Weapon"),
    ("LifeForm", BASE_CLASS),
    ("Building", BASE_CLASS),
];

#[derive(Debug)]
pub struct PlayerClass {
    name: String,
    parent: Option<Arc<PlayerClass>>,
}

impl PlayerClass {
    pub fn root(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            parent: None,
        })
    }

    pub fn derived(name: &str, parent: &Arc<PlayerClass>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            parent: Some(Arc::clone(parent)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<PlayerClass>> {
        self.parent.as_ref()
    }

    /// This class and its ancestors, most derived first.
    pub fn lineage(&self) -> impl Iterator<Item = &PlayerClass> {
        std::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    pub fn is_kind_of(&self, name: &str) -> bool {
        self.lineage().any(|class| class.name == name)
    }

    pub fn depth(&self) -> usize {
        self.lineage().count() - 1
    }
}

impl PartialEq for PlayerClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PlayerClass {}

#[derive(Debug)]
pub struct ClassRegistry {
    classes: HashMap<String, Arc<PlayerClass>>,
    base: Arc<PlayerClass>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl ClassRegistry {
    pub fn new() -> Self {
        let base = PlayerClass::root(BASE_CLASS);
        let mut classes = HashMap::new();
        classes.insert(BASE_CLASS.to_string(), Arc::clone(&base));
        Self { classes, base }
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for (name, parent) in BUILTIN {
            let parent = Arc::clone(&registry.classes[*parent]);
            registry
                .classes
                .insert(name.to_string(), PlayerClass::derived(name, &parent));
        }
        registry
    }

    pub fn register(&mut self, name: &str, parent: &str) -> Result<Arc<PlayerClass>, ConfigError> {
        if self.classes.contains_key(name) {
            return Err(ConfigError::DuplicateClass(name.to_string()));
        }
        let parent = self
            .classes
            .get(parent)
            .ok_or_else(|| ConfigError::UnknownClass(parent.to_string()))?;

        let class = PlayerClass::derived(name, parent);
        self.classes.insert(name.to_string(), Arc::clone(&class));
        Ok(class)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<PlayerClass>> {
        self.classes.get(name)
    }

    pub fn base(&self) -> &Arc<PlayerClass> {
        &self.base
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_of_walks_parent_chain() {
        let registry = ClassRegistry::with_builtin();
        let aircraft = registry.get("Aircraft").unwrap();

        assert!(aircraft.is_kind_of("Aircraft"));
        assert!(aircraft.is_kind_of("AirVehicle"));
        assert!(aircraft.is_kind_of(BASE_CLASS));
        assert!(!aircraft.is_kind_of("GroundVehicle"));
        assert_eq!(aircraft.depth(), 2);
    }

    #[test]
    fn register_custom_class() {
        let mut registry = ClassRegistry::with_builtin();
        let f16 = registry.register("F16Model", "Aircraft").unwrap();
        assert!(f16.is_kind_of("AirVehicle"));

        assert_eq!(
            registry.register("F16Model", "Aircraft").unwrap_err(),
            ConfigError::DuplicateClass("F16Model".to_string())
        );
        assert_eq!(
            registry.register("Blimp", "Airship").unwrap_err(),
            ConfigError::UnknownClass("Airship".to_string())
        );
    }
}
