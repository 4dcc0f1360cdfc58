//! Unit Registry - Factory Pattern for Audio Units
//!
//! Maps component descriptors to factories, so the render graph can create
//! units without knowing their concrete types.

use super::{AudioUnit, ComponentDescriptor, Delay, DelaySettings, Gain, Limiter, LimiterSettings};
use soul_core::{Result, SoulError};
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Factory function type for creating units from type-erased parameters
pub type CreateFn = Arc<dyn Fn(&dyn Any) -> Option<Box<dyn AudioUnit>> + Send + Sync>;

/// Factory for a specific unit type
#[derive(Clone)]
pub struct UnitFactory {
    /// Descriptor the factory answers to
    pub descriptor: ComponentDescriptor,
    /// Human-readable name
    pub display_name: &'static str,
    /// Create a new instance, from parameters or `&()` for defaults
    pub create: CreateFn,
}

impl Debug for UnitFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitFactory")
            .field("descriptor", &self.descriptor)
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Registry of available unit types
///
/// Lookups take a descriptor used as a query, so zero codes act as
/// wildcards; the first registered match wins.
///
/// # Example
///
/// ```rust
/// use soul_render::units::{ComponentDescriptor, UnitRegistry};
///
/// let registry = UnitRegistry::with_builtin_units();
/// let limiter = registry.instantiate(&ComponentDescriptor::builtin(*b"lmtr")).unwrap();
/// assert_eq!(limiter.info().display_name, "Limiter");
/// ```
#[derive(Debug, Default, Clone)]
pub struct UnitRegistry {
    factories: Vec<UnitFactory>,
}

impl UnitRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Create a registry with all built-in units registered
    pub fn with_builtin_units() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_units();
        registry
    }

    /// Register a factory, replacing one with the same descriptor
    pub fn register(&mut self, factory: UnitFactory) {
        if let Some(existing) = self
            .factories
            .iter_mut()
            .find(|f| f.descriptor == factory.descriptor)
        {
            *existing = factory;
        } else {
            self.factories.push(factory);
        }
    }

    /// First factory matching `query`
    pub fn find(&self, query: &ComponentDescriptor) -> Option<&UnitFactory> {
        self.factories.iter().find(|f| query.matches(&f.descriptor))
    }

    /// Every factory matching `query`
    pub fn find_all(&self, query: &ComponentDescriptor) -> Vec<&UnitFactory> {
        self.factories
            .iter()
            .filter(|f| query.matches(&f.descriptor))
            .collect()
    }

    /// Check if any factory matches `query`
    pub fn is_registered(&self, query: &ComponentDescriptor) -> bool {
        self.find(query).is_some()
    }

    /// All registered descriptors
    pub fn registered(&self) -> Vec<ComponentDescriptor> {
        self.factories.iter().map(|f| f.descriptor).collect()
    }

    /// Create a unit with default parameters
    ///
    /// # Errors
    /// `UnknownComponent` if nothing matches `query`
    pub fn instantiate(&self, query: &ComponentDescriptor) -> Result<Box<dyn AudioUnit>> {
        self.instantiate_with(query, &())
    }

    /// Create a unit from type-erased parameters
    ///
    /// # Errors
    /// `UnknownComponent` if nothing matches `query` or the factory rejects `params`
    pub fn instantiate_with(
        &self,
        query: &ComponentDescriptor,
        params: &dyn Any,
    ) -> Result<Box<dyn AudioUnit>> {
        let factory = self
            .find(query)
            .ok_or_else(|| SoulError::UnknownComponent(query.to_string()))?;
        (factory.create)(params).ok_or_else(|| {
            SoulError::UnknownComponent(format!("{} rejected its parameters", factory.descriptor))
        })
    }

    /// Register all built-in units
    fn register_builtin_units(&mut self) {
        // Gain
        self.register(UnitFactory {
            descriptor: Gain::DESCRIPTOR,
            display_name: "Gain",
            create: Arc::new(|params| {
                if let Some(db) = params.downcast_ref::<f32>() {
                    Some(Box::new(Gain::from_db(*db)))
                } else {
                    Some(Box::new(Gain::new()))
                }
            }),
        });

        // Limiter
        self.register(UnitFactory {
            descriptor: Limiter::DESCRIPTOR,
            display_name: "Limiter",
            create: Arc::new(|params| {
                if let Some(settings) = params.downcast_ref::<LimiterSettings>() {
                    Limiter::with_settings(*settings)
                        .ok()
                        .map(|l| Box::new(l) as Box<dyn AudioUnit>)
                } else {
                    Some(Box::new(Limiter::new()))
                }
            }),
        });

        // Delay
        self.register(UnitFactory {
            descriptor: Delay::DESCRIPTOR,
            display_name: "Delay",
            create: Arc::new(|params| {
                if let Some(settings) = params.downcast_ref::<DelaySettings>() {
                    Delay::with_settings(*settings)
                        .ok()
                        .map(|d| Box::new(d) as Box<dyn AudioUnit>)
                } else {
                    Some(Box::new(Delay::new()))
                }
            }),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_builtin_units() {
        let registry = UnitRegistry::with_builtin_units();

        assert!(registry.is_registered(&Gain::DESCRIPTOR));
        assert!(registry.is_registered(&Limiter::DESCRIPTOR));
        assert!(registry.is_registered(&Delay::DESCRIPTOR));
        assert_eq!(registry.registered().len(), 3);
    }

    #[test]
    fn test_wildcard_query_finds_all_effects() {
        let registry = UnitRegistry::with_builtin_units();
        assert_eq!(registry.find_all(&ComponentDescriptor::any_effect()).len(), 3);
    }

    #[test]
    fn test_unknown_descriptor_is_configuration_error() {
        let registry = UnitRegistry::with_builtin_units();
        let err = registry
            .instantiate(&ComponentDescriptor::builtin(*b"nope"))
            .err()
            .unwrap();
        assert!(matches!(err, SoulError::UnknownComponent(_)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_create_with_settings() {
        let registry = UnitRegistry::with_builtin_units();
        let settings = LimiterSettings {
            threshold_db: -3.0,
            release_ms: 100.0,
        };
        let unit = registry.instantiate_with(&Limiter::DESCRIPTOR, &settings).unwrap();
        let limiter = unit.as_any().downcast_ref::<Limiter>().unwrap();
        assert_eq!(limiter.settings().threshold_db, -3.0);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let registry = UnitRegistry::with_builtin_units();
        let settings = LimiterSettings {
            threshold_db: 3.0,
            release_ms: 100.0,
        };
        assert!(registry.instantiate_with(&Limiter::DESCRIPTOR, &settings).is_err());
    }

    #[test]
    fn test_register_replaces_same_descriptor() {
        let mut registry = UnitRegistry::with_builtin_units();
        registry.register(UnitFactory {
            descriptor: Gain::DESCRIPTOR,
            display_name: "Loud Gain",
            create: Arc::new(|_| Some(Box::new(Gain::from_db(12.0)))),
        });
        assert_eq!(registry.registered().len(), 3);
        assert_eq!(registry.find(&Gain::DESCRIPTOR).unwrap().display_name, "Loud Gain");
    }
}
