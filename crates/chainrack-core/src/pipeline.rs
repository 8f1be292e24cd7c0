//! An ordered chain of plugin instances.
//!
//! Structural edits (insert, remove, move, routing) bump the version and
//! rebuild the cached [`Generation`]. Flag flips (enabled, master bypass) and
//! parameter writes act on shared state and do not need a new generation.

use crate::error::{Error, Result};
use crate::generation::Generation;
use crate::lockfree::AtomicFlag;
use crate::parameter::ParameterMap;
use crate::plugin::{InstanceId, PluginInstance};
use crate::routing::BusRouting;
use std::ops::Range;
use std::sync::Arc;

pub struct Pipeline {
    instances: Vec<PluginInstance>,
    master_bypass: Arc<AtomicFlag>,
    version: u64,
    generation: Arc<Generation>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::from_instances(Vec::new())
    }

    pub fn from_instances(instances: Vec<PluginInstance>) -> Self {
        let master_bypass = Arc::new(AtomicFlag::new(false));
        let generation = Arc::new(Generation::build(1, &instances, Arc::clone(&master_bypass)));
        Self {
            instances,
            master_bypass,
            version: 1,
            generation,
        }
    }

    fn rebuild(&mut self) -> u64 {
        self.version += 1;
        self.generation = Arc::new(Generation::build(
            self.version,
            &self.instances,
            Arc::clone(&self.master_bypass),
        ));
        tracing::debug!(
            "Pipeline v{} rebuilt with {} instances",
            self.version,
            self.instances.len()
        );
        self.version
    }

    /// Insert instances at `index`, clamped to the pipeline length.
    ///
    /// Returns the new version.
    pub fn insert_at(&mut self, index: usize, instances: Vec<PluginInstance>) -> u64 {
        let index = index.min(self.instances.len());
        self.instances.splice(index..index, instances);
        self.rebuild()
    }

    pub fn push(&mut self, instance: PluginInstance) -> u64 {
        let index = self.instances.len();
        self.insert_at(index, vec![instance])
    }

    /// Remove an instance; it is released when dropped.
    pub fn remove(&mut self, id: InstanceId) -> Result<u64> {
        let index = self.position(id).ok_or(Error::InstanceNotFound(id))?;
        let removed = self.instances.remove(index);
        removed.release();
        Ok(self.rebuild())
    }

    /// Move an instance to `new_index`, clamped to the last position.
    pub fn move_to(&mut self, id: InstanceId, new_index: usize) -> Result<u64> {
        let index = self.position(id).ok_or(Error::InstanceNotFound(id))?;
        let instance = self.instances.remove(index);
        let new_index = new_index.min(self.instances.len());
        self.instances.insert(new_index, instance);
        Ok(self.rebuild())
    }

    pub fn set_bus_routing(&mut self, id: InstanceId, routing: BusRouting) -> Result<u64> {
        let instance = self
            .instances
            .iter_mut()
            .find(|i| i.id() == id)
            .ok_or(Error::InstanceNotFound(id))?;
        instance.set_routing(routing);
        Ok(self.rebuild())
    }

    /// Takes effect at the next block boundary without a new generation.
    pub fn set_enabled(&self, id: InstanceId, enabled: bool) -> Result<()> {
        self.get(id)
            .ok_or(Error::InstanceNotFound(id))?
            .set_enabled(enabled);
        Ok(())
    }

    pub fn set_parameters(&self, id: InstanceId, partial: &ParameterMap) -> Result<()> {
        self.get(id)
            .ok_or(Error::InstanceNotFound(id))?
            .set_parameters(partial);
        Ok(())
    }

    pub fn set_master_bypass(&self, bypass: bool) {
        self.master_bypass.set(bypass);
    }

    pub fn is_master_bypassed(&self) -> bool {
        self.master_bypass.get()
    }

    /// Index range covered by a section marker: the marker itself and every
    /// instance up to (not including) the next marker.
    pub fn section_range(&self, id: InstanceId) -> Result<Range<usize>> {
        let start = self.position(id).ok_or(Error::InstanceNotFound(id))?;
        if !self.instances[start].is_section() {
            return Err(Error::NotASection(id));
        }
        let end = self.instances[start + 1..]
            .iter()
            .position(|i| i.is_section())
            .map(|offset| start + 1 + offset)
            .unwrap_or(self.instances.len());
        Ok(start..end)
    }

    /// Remove a section marker together with its members as one edit.
    pub fn remove_section(&mut self, id: InstanceId) -> Result<u64> {
        let range = self.section_range(id)?;
        for removed in self.instances.drain(range) {
            removed.release();
        }
        Ok(self.rebuild())
    }

    /// Remove every instance, releasing each.
    pub fn clear(&mut self) -> u64 {
        for removed in self.instances.drain(..) {
            removed.release();
        }
        self.rebuild()
    }

    /// Replace every instance, releasing the old ones.
    pub fn replace_all(&mut self, instances: Vec<PluginInstance>) -> u64 {
        for removed in std::mem::replace(&mut self.instances, instances) {
            removed.release();
        }
        self.rebuild()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: InstanceId) -> Option<&PluginInstance> {
        self.instances.iter().find(|i| i.id() == id)
    }

    pub fn at(&self, index: usize) -> Option<&PluginInstance> {
        self.instances.get(index)
    }

    pub fn position(&self, id: InstanceId) -> Option<usize> {
        self.instances.iter().position(|i| i.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginInstance> {
        self.instances.iter()
    }

    pub fn ids(&self) -> Vec<InstanceId> {
        self.instances.iter().map(|i| i.id()).collect()
    }

    pub fn type_ids(&self) -> Vec<&str> {
        self.instances.iter().map(|i| i.type_id()).collect()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The cached generation for the current structure.
    pub fn generation(&self) -> Arc<Generation> {
        Arc::clone(&self.generation)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("version", &self.version)
            .field("instances", &self.type_ids())
            .field("master_bypass", &self.is_master_bypassed())
            .finish()
    }
}
