//! Plugin registry for creating instances from type identifiers.
//!
//! The registry is the only place plugins are constructed, so persisted and
//! historical records can be turned back into live instances by name.

use crate::error::ConstructionError;
use crate::parameter::ParameterMap;
use crate::plugin::{InstanceId, Plugin, PluginInstance};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Create a [`ParameterMap`](crate::ParameterMap) from key-value pairs.
///
/// # Example
/// ```
/// use chainrack_core::params;
///
/// let params = params! {
///     "gain" => -6.0,
///     "enabled" => true,
/// };
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::ParameterMap::new();
        $(
            map.insert($key.to_string(), $value.into());
        )*
        map
    }};
}

/// Function that constructs a plugin in its default state.
pub type PluginFactory =
    Arc<dyn Fn() -> Result<Box<dyn Plugin>, ConstructionError> + Send + Sync>;

/// Display metadata for a registered plugin type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub type_id: String,
    pub name: String,
    pub category: String,
}

impl PluginDescriptor {
    pub fn new(
        type_id: impl Into<String>,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            name: name.into(),
            category: category.into(),
        }
    }
}

struct RegistryEntry {
    descriptor: PluginDescriptor,
    factory: PluginFactory,
}

/// Registry of plugin factories. Cloning shares the underlying table.
#[derive(Clone)]
pub struct PluginRegistry {
    entries: Arc<RwLock<HashMap<String, RegistryEntry>>>,
    next_id: Arc<AtomicU64>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a plugin factory under `descriptor.type_id`, replacing any
    /// previous registration.
    ///
    /// # Example
    /// ```ignore
    /// registry.register(PluginDescriptor::new("Volume", "Volume", "Basics"), || {
    ///     Ok(Box::new(Volume::new()))
    /// });
    /// ```
    pub fn register<F>(&self, descriptor: PluginDescriptor, factory: F)
    where
        F: Fn() -> Result<Box<dyn Plugin>, ConstructionError> + Send + Sync + 'static,
    {
        tracing::debug!("Registered plugin type: {}", descriptor.type_id);
        self.entries.write().insert(
            descriptor.type_id.clone(),
            RegistryEntry {
                descriptor,
                factory: Arc::new(factory),
            },
        );
    }

    /// Register with a descriptor derived from the type id.
    pub fn register_fn<F>(&self, type_id: &str, factory: F)
    where
        F: Fn() -> Result<Box<dyn Plugin>, ConstructionError> + Send + Sync + 'static,
    {
        self.register(PluginDescriptor::new(type_id, type_id, "Other"), factory);
    }

    pub fn is_available(&self, type_id: &str) -> bool {
        self.entries.read().contains_key(type_id)
    }

    /// Create an instance in its default state.
    pub fn create(&self, type_id: &str) -> Result<PluginInstance, ConstructionError> {
        // Clone the factory out so construction (which may load backing
        // modules) runs without holding the table lock.
        let factory = self
            .entries
            .read()
            .get(type_id)
            .map(|entry| Arc::clone(&entry.factory))
            .ok_or_else(|| ConstructionError::UnknownType(type_id.to_string()))?;

        let plugin = factory()?;
        let id = InstanceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        Ok(PluginInstance::new(id, type_id, plugin))
    }

    /// Create an instance and apply `params` through `set_parameters`.
    pub fn create_with(
        &self,
        type_id: &str,
        params: &ParameterMap,
    ) -> Result<PluginInstance, ConstructionError> {
        let instance = self.create(type_id)?;
        if !params.is_empty() {
            instance.set_parameters(params);
        }
        Ok(instance)
    }

    pub fn descriptor(&self, type_id: &str) -> Option<PluginDescriptor> {
        self.entries
            .read()
            .get(type_id)
            .map(|entry| entry.descriptor.clone())
    }

    /// List all registered type ids, sorted.
    pub fn list_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entries.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn unregister(&self, type_id: &str) -> bool {
        self.entries.write().remove(type_id).is_some()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
