//! Immutable pipeline snapshots and their hand-off to the render context.
//!
//! # Architecture
//!
//! ```text
//! Control Context                        Render Context
//!     │                                       │
//!     ▼                                       ▼
//! ┌───────────────────┐                 ┌──────────────────┐
//! │ GenerationHandoff │───ArcSwap──────▶│ RenderEngine     │
//! │ - publish()       │                 │ - adopts at      │
//! │ - retained[]      │                 │   block boundary │
//! │ - collect()       │                 └──────────────────┘
//! └───────────────────┘
//!     ▲
//!     │ Arc<Generation> (built by Pipeline on every structural edit)
//! ```
//!
//! A generation moves `Staged → Active → Superseded`. Switching back to a
//! pipeline whose cached generation was superseded re-activates it.
//!
//! The render context never performs the final drop of a generation: every
//! generation it has seen stays in `retained` until the control context calls
//! [`GenerationHandoff::collect`].

use crate::lockfree::{AtomicFlag, AtomicState};
use crate::plugin::{InstanceId, PluginInstance, PluginRole, PluginSlot};
use crate::routing::BusRouting;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Lifecycle stage of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GenerationState {
    /// Built and possibly published, not yet rendered.
    Staged = 0,
    /// Currently rendered.
    Active = 1,
    /// Replaced by another generation.
    Superseded = 2,
}

impl GenerationState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Active,
            2 => Self::Superseded,
            _ => Self::Staged,
        }
    }
}

/// One instance as seen by a generation.
#[derive(Debug)]
pub struct GenerationEntry {
    id: InstanceId,
    routing: BusRouting,
    slot: Arc<PluginSlot>,
    /// Set by the render context after a panic in `process`.
    faulted: AtomicFlag,
}

impl GenerationEntry {
    #[inline]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    #[inline]
    pub fn routing(&self) -> BusRouting {
        self.routing
    }

    #[inline]
    pub fn role(&self) -> PluginRole {
        self.slot.role()
    }

    #[inline]
    pub(crate) fn slot(&self) -> &Arc<PluginSlot> {
        &self.slot
    }

    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.faulted.get()
    }

    #[inline]
    pub(crate) fn quarantine(&self) {
        self.faulted.set(true);
    }
}

/// Immutable, versioned snapshot of a pipeline's structure.
#[derive(Debug)]
pub struct Generation {
    version: u64,
    entries: Box<[GenerationEntry]>,
    master_bypass: Arc<AtomicFlag>,
    state: AtomicState,
    degraded: AtomicFlag,
}

impl Generation {
    pub(crate) fn build(
        version: u64,
        instances: &[PluginInstance],
        master_bypass: Arc<AtomicFlag>,
    ) -> Self {
        let entries = instances
            .iter()
            .map(|instance| GenerationEntry {
                id: instance.id(),
                routing: instance.routing(),
                slot: Arc::clone(instance.slot()),
                faulted: AtomicFlag::new(false),
            })
            .collect();
        Self {
            version,
            entries,
            master_bypass,
            state: AtomicState::new(GenerationState::Staged as u8),
            degraded: AtomicFlag::new(false),
        }
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn entries(&self) -> &[GenerationEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_master_bypassed(&self) -> bool {
        self.master_bypass.get()
    }

    #[inline]
    pub fn state(&self) -> GenerationState {
        GenerationState::from_u8(self.state.load())
    }

    #[inline]
    pub(crate) fn set_state(&self, state: GenerationState) {
        self.state.store(state as u8);
    }

    /// True once any instance in this generation has faulted.
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded.get()
    }

    #[inline]
    pub(crate) fn mark_degraded(&self) {
        self.degraded.set(true);
    }

    /// Instances currently bypassed after a fault.
    pub fn faulted_instances(&self) -> Vec<InstanceId> {
        self.entries
            .iter()
            .filter(|e| e.is_faulted())
            .map(|e| e.id)
            .collect()
    }
}

/// Read side of the hand-off, owned by the render engine.
#[derive(Clone)]
pub struct GenerationReader {
    current: Arc<ArcSwap<Generation>>,
}

impl GenerationReader {
    #[inline]
    pub fn load(&self) -> arc_swap::Guard<Arc<Generation>> {
        self.current.load()
    }
}

/// Publishes generations to the render context and reclaims old ones.
pub struct GenerationHandoff {
    current: Arc<ArcSwap<Generation>>,
    retained: Vec<Arc<Generation>>,
}

impl GenerationHandoff {
    pub fn new(initial: Arc<Generation>) -> Self {
        Self {
            current: Arc::new(ArcSwap::new(initial)),
            retained: Vec::new(),
        }
    }

    pub fn reader(&self) -> GenerationReader {
        GenerationReader {
            current: Arc::clone(&self.current),
        }
    }

    /// The generation the render context will see on its next block.
    pub fn current(&self) -> Arc<Generation> {
        self.current.load_full()
    }

    /// Atomically replace the published generation.
    ///
    /// Returns `false` if `generation` is already the published one.
    pub fn publish(&mut self, generation: Arc<Generation>) -> bool {
        if Arc::ptr_eq(&*self.current.load(), &generation) {
            return false;
        }
        let version = generation.version();
        let previous = self.current.swap(generation);
        if !self.retained.iter().any(|g| Arc::ptr_eq(g, &previous)) {
            self.retained.push(previous);
        }
        tracing::info!("Published pipeline generation v{}", version);
        true
    }

    /// Drop retained generations referenced by nothing else.
    ///
    /// A generation the render context still holds, or a pipeline still
    /// caches, has other strong references and survives. Returns the number
    /// of generations dropped.
    pub fn collect(&mut self) -> usize {
        let current = self.current.load_full();
        let before = self.retained.len();
        self.retained
            .retain(|g| Arc::ptr_eq(g, &current) || Arc::strong_count(g) > 1);
        let dropped = before - self.retained.len();
        if dropped > 0 {
            tracing::debug!("Collected {} superseded generations", dropped);
        }
        dropped
    }

    pub fn retained_len(&self) -> usize {
        self.retained.len()
    }
}
