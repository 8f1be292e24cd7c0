//! The plugin contract and the engine-side instance wrapper.
//!
//! A [`Plugin`] is a trait object resolved once by the registry. The engine
//! wraps it in a [`PluginInstance`], which owns the enabled flag and bus
//! routing and shares the plugin with published generations through an
//! `Arc<PluginSlot>`.
//!
//! # Threading
//!
//! Parameter reads and writes on the control context go through a mirror held
//! by the instance and never touch the plugin. A write clamps into the mirror
//! and stages the full map on the slot; the render context applies staged maps
//! at the start of the plugin's next block, while it holds the plugin. So
//! `set_parameters` and `process` never overlap on one instance, and the audio
//! thread neither blocks nor finds the plugin taken by a parameter edit.

use crate::format::{AudioBlock, FormatDescriptor};
use crate::lockfree::AtomicFlag;
use crate::parameter::{ParameterMap, ParameterSet};
use crate::routing::BusRouting;
use arc_swap::ArcSwapOption;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Whether an instance processes audio or marks the start of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluginRole {
    #[default]
    Effect,
    /// Disabling a section bypasses every instance up to the next section.
    Section,
}

/// An audio-effect plugin.
pub trait Plugin: Send {
    /// Registry key of this plugin's type.
    fn type_id(&self) -> &str;

    fn role(&self) -> PluginRole {
        PluginRole::Effect
    }

    /// Current parameter values. Pure: never mutates the plugin.
    fn parameters(&self) -> ParameterMap;

    /// The declared parameters, for plugins whose `set_parameters` clamps
    /// exactly as [`ParameterSet::apply`] does. Instances clone it to clamp
    /// edits on the control context. Plugins returning `None` are locked for
    /// every write.
    fn parameter_set(&self) -> Option<&ParameterSet> {
        None
    }

    /// Apply a partial update. Each recognized key is clamped into its
    /// domain, unknown keys are ignored, and derived constants are refreshed
    /// before returning.
    fn set_parameters(&mut self, partial: &ParameterMap);

    /// Process one block in place.
    ///
    /// Implementations rebuild their context whenever `format` or a
    /// context-invalidating parameter differs from what the context was built
    /// for. The first call is treated as a format change.
    fn process(&mut self, block: &mut AudioBlock<'_>, format: &FormatDescriptor);

    /// Drop the context and any backing resources.
    fn release(&mut self) {}

    /// Number of times the context has been (re)built.
    fn reinit_count(&self) -> u64 {
        0
    }
}

/// Lazily built per-instance context keyed by format and an invalidation key.
///
/// ```
/// use chainrack_core::{ContextCache, FormatDescriptor};
///
/// let mut cache: ContextCache<u32, Vec<f32>> = ContextCache::new();
/// let format = FormatDescriptor::new(48000.0, 2, 64);
/// cache.get_or_rebuild(&format, &1, |f, _| vec![0.0; f.samples()]);
/// cache.get_or_rebuild(&format, &1, |f, _| vec![0.0; f.samples()]);
/// assert_eq!(cache.reinit_count(), 1);
///
/// let doubled = FormatDescriptor::new(96000.0, 2, 64);
/// cache.get_or_rebuild(&doubled, &1, |f, _| vec![0.0; f.samples()]);
/// assert_eq!(cache.reinit_count(), 2);
/// ```
#[derive(Debug)]
pub struct ContextCache<K, C> {
    built_for: Option<(FormatDescriptor, K)>,
    context: Option<C>,
    reinits: u64,
}

impl<K: PartialEq + Clone, C> ContextCache<K, C> {
    pub fn new() -> Self {
        Self {
            built_for: None,
            context: None,
            reinits: 0,
        }
    }

    /// Return the context, rebuilding it first if it is missing or was built
    /// for a different format or key.
    pub fn get_or_rebuild<F>(&mut self, format: &FormatDescriptor, key: &K, build: F) -> &mut C
    where
        F: FnOnce(&FormatDescriptor, &K) -> C,
    {
        let stale = match &self.built_for {
            Some((built_format, built_key)) => built_format != format || built_key != key,
            None => true,
        };
        if stale || self.context.is_none() {
            self.reinits += 1;
            self.built_for = Some((*format, key.clone()));
            return self.context.insert(build(format, key));
        }
        self.context.get_or_insert_with(|| build(format, key))
    }

    pub fn get_mut(&mut self) -> Option<&mut C> {
        self.context.as_mut()
    }

    /// Format and key the current context was built for.
    pub fn built_for(&self) -> Option<(&FormatDescriptor, &K)> {
        self.built_for.as_ref().map(|(format, key)| (format, key))
    }

    /// Force a rebuild on the next call.
    pub fn invalidate(&mut self) {
        self.built_for = None;
    }

    /// Drop the context.
    pub fn clear(&mut self) {
        self.built_for = None;
        self.context = None;
    }

    pub fn is_built(&self) -> bool {
        self.context.is_some()
    }

    pub fn reinit_count(&self) -> u64 {
        self.reinits
    }
}

impl<K: PartialEq + Clone, C> Default for ContextCache<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier of a plugin instance, assigned by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub(crate) u64);

impl InstanceId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State shared between an instance and every generation that includes it.
pub struct PluginSlot {
    type_id: Arc<str>,
    role: PluginRole,
    enabled: AtomicFlag,
    /// Set once the instance has been released; render treats it as bypassed.
    retired: AtomicFlag,
    /// Full parameter map waiting for the plugin's next block.
    staged: ArcSwapOption<ParameterMap>,
    /// Reinit count as of the plugin's last block.
    reinits: AtomicU64,
    plugin: Mutex<Box<dyn Plugin>>,
}

impl PluginSlot {
    #[inline]
    pub fn type_id(&self) -> &Arc<str> {
        &self.type_id
    }

    #[inline]
    pub fn role(&self) -> PluginRole {
        self.role
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    #[inline]
    pub fn is_retired(&self) -> bool {
        self.retired.get()
    }

    /// Non-blocking access for the render context.
    #[inline]
    pub(crate) fn try_lock(&self) -> Option<MutexGuard<'_, Box<dyn Plugin>>> {
        self.plugin.try_lock()
    }

    /// Apply any staged parameters, then process one block. `plugin` is this
    /// slot's plugin, held through [`try_lock`](Self::try_lock).
    pub(crate) fn process_locked(
        &self,
        plugin: &mut dyn Plugin,
        block: &mut AudioBlock<'_>,
        format: &FormatDescriptor,
    ) {
        if let Some(staged) = self.staged.swap(None) {
            plugin.set_parameters(&staged);
        }
        plugin.process(block, format);
        self.reinits.store(plugin.reinit_count(), Ordering::Relaxed);
    }
}

impl fmt::Debug for PluginSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSlot")
            .field("type_id", &self.type_id)
            .field("role", &self.role)
            .field("enabled", &self.is_enabled())
            .field("retired", &self.is_retired())
            .field("staged", &self.staged.load().is_some())
            .finish()
    }
}

/// Control-side copy of an instance's parameters.
#[derive(Debug)]
struct ParameterMirror {
    /// Clamping domain; `None` when the plugin does not declare one.
    schema: Option<ParameterSet>,
    values: ParameterMap,
}

/// A plugin placed in a pipeline.
///
/// Dropping an instance releases its plugin.
#[derive(Debug)]
pub struct PluginInstance {
    id: InstanceId,
    routing: BusRouting,
    mirror: Mutex<ParameterMirror>,
    slot: Arc<PluginSlot>,
}

impl PluginInstance {
    /// `type_id` is the registry key the plugin was created under.
    pub(crate) fn new(id: InstanceId, type_id: &str, plugin: Box<dyn Plugin>) -> Self {
        let mirror = ParameterMirror {
            schema: plugin.parameter_set().cloned(),
            values: plugin.parameters(),
        };
        let slot = PluginSlot {
            type_id: Arc::from(type_id),
            role: plugin.role(),
            enabled: AtomicFlag::new(true),
            retired: AtomicFlag::new(false),
            staged: ArcSwapOption::empty(),
            reinits: AtomicU64::new(plugin.reinit_count()),
            plugin: Mutex::new(plugin),
        };
        Self {
            id,
            routing: BusRouting::default(),
            mirror: Mutex::new(mirror),
            slot: Arc::new(slot),
        }
    }

    #[inline]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn type_id(&self) -> &str {
        &self.slot.type_id
    }

    pub fn role(&self) -> PluginRole {
        self.slot.role
    }

    pub fn is_section(&self) -> bool {
        self.slot.role == PluginRole::Section
    }

    pub fn is_enabled(&self) -> bool {
        self.slot.is_enabled()
    }

    /// Takes effect at the next block boundary.
    pub fn set_enabled(&self, enabled: bool) {
        self.slot.enabled.set(enabled);
    }

    pub fn routing(&self) -> BusRouting {
        self.routing
    }

    pub(crate) fn set_routing(&mut self, routing: BusRouting) {
        self.routing = routing;
    }

    /// Current parameter values, as of the last edit.
    pub fn parameters(&self) -> ParameterMap {
        self.mirror.lock().values.clone()
    }

    /// Clamp `partial` into the mirror and stage the result for the plugin's
    /// next block.
    pub fn set_parameters(&self, partial: &ParameterMap) {
        let mut mirror = self.mirror.lock();
        let ParameterMirror { schema, values } = &mut *mirror;
        match schema {
            Some(schema) => {
                if !schema.apply(partial) {
                    return;
                }
                *values = schema.snapshot();
                self.slot.staged.store(Some(Arc::new(values.clone())));
            }
            None => {
                let mut plugin = self.slot.plugin.lock();
                plugin.set_parameters(partial);
                *values = plugin.parameters();
            }
        }
    }

    /// Context rebuilds reported by the plugin's most recent block.
    pub fn reinit_count(&self) -> u64 {
        self.slot.reinits.load(Ordering::Relaxed)
    }

    /// Retire the instance and release its plugin. Idempotent.
    pub fn release(&self) {
        if self.slot.retired.swap(true) {
            return;
        }
        self.slot.plugin.lock().release();
        tracing::debug!("Released plugin {} {}", self.slot.type_id, self.id);
    }

    pub fn is_released(&self) -> bool {
        self.slot.is_retired()
    }

    pub(crate) fn slot(&self) -> &Arc<PluginSlot> {
        &self.slot
    }
}

impl Drop for PluginInstance {
    fn drop(&mut self) {
        self.release();
    }
}
