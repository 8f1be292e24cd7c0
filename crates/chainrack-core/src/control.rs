//! The control context: the single writer of pipeline state.
//!
//! Every user-facing mutation goes through [`ControlContext`], which edits the
//! active pipeline, publishes the resulting generation to the render context
//! and records history.

use crate::codec::{self, LoadReport, PersistedPlugin, SetRecord};
use crate::config::EngineConfig;
use crate::error::{ConstructionError, Error, Result};
use crate::events::{event_channel, EngineEvent, EventSender};
use crate::generation::GenerationHandoff;
use crate::history::{EditOrigin, HistoryManager, ReplayInProgress};
use crate::parameter::ParameterMap;
use crate::pipeline::Pipeline;
use crate::pipeline_set::{PipelineSet, Selector};
use crate::plugin::{InstanceId, PluginInstance};
use crate::registry::PluginRegistry;
use crate::render::RenderEngine;
use crate::routing::BusRouting;
use crossbeam_channel::Receiver;

/// A user edit of the active pipeline.
#[derive(Debug, Clone)]
pub enum EditOp {
    Insert {
        index: usize,
        type_id: String,
        parameters: ParameterMap,
    },
    /// Insert several plugins at once as one edit.
    InsertTypes {
        index: usize,
        type_ids: Vec<String>,
    },
    Remove(InstanceId),
    Move {
        id: InstanceId,
        index: usize,
    },
    SetRouting {
        id: InstanceId,
        routing: BusRouting,
    },
    SetEnabled {
        id: InstanceId,
        enabled: bool,
    },
    SetParameters {
        id: InstanceId,
        parameters: ParameterMap,
    },
    SetMasterBypass(bool),
    /// Remove a section marker together with its members.
    RemoveSection(InstanceId),
    Clear,
}

impl EditOp {
    pub fn insert(index: usize, type_id: impl Into<String>) -> Self {
        Self::Insert {
            index,
            type_id: type_id.into(),
            parameters: ParameterMap::new(),
        }
    }

    /// Whether the edit is recorded in history.
    fn is_recorded(&self) -> bool {
        !matches!(self, Self::SetMasterBypass(_))
    }
}

pub struct ControlContext {
    registry: PluginRegistry,
    set: PipelineSet,
    history: HistoryManager,
    handoff: GenerationHandoff,
    events: EventSender,
    event_rx: Receiver<EngineEvent>,
    config: EngineConfig,
}

impl ControlContext {
    pub fn new(registry: PluginRegistry, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let set = PipelineSet::new();
        let handoff = GenerationHandoff::new(set.active().generation());
        let (events, event_rx) = event_channel(config.event_capacity);
        let mut history = HistoryManager::new(config.history_capacity);
        history.save_state(&set, EditOrigin::User);
        Ok(Self {
            registry,
            set,
            history,
            handoff,
            events,
            event_rx,
            config,
        })
    }

    /// Create a render engine bound to this context's published generations.
    ///
    /// Hosts run exactly one; it is `Send` and belongs on the audio thread.
    pub fn render_engine(&self) -> RenderEngine {
        RenderEngine::new(self.handoff.reader(), self.events.clone(), &self.config)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pipelines(&self) -> &PipelineSet {
        &self.set
    }

    pub fn active(&self) -> &Pipeline {
        self.set.active()
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Apply a user edit to the active pipeline.
    ///
    /// Returns the active pipeline's version afterwards. On error nothing is
    /// published or recorded and the pipeline is unchanged.
    pub fn edit(&mut self, op: EditOp) -> Result<u64> {
        self.apply(op, EditOrigin::User)
    }

    fn apply(&mut self, op: EditOp, origin: EditOrigin<'_>) -> Result<u64> {
        tracing::debug!("Applying edit {:?}", op);
        let recorded = op.is_recorded();
        let version = match op {
            EditOp::Insert {
                index,
                type_id,
                parameters,
            } => {
                let instance = self.construct(&type_id, &parameters)?;
                self.set.active_mut().insert_at(index, vec![instance])
            }
            EditOp::InsertTypes { index, type_ids } => {
                let instances = type_ids
                    .iter()
                    .map(|t| self.construct(t, &ParameterMap::new()))
                    .collect::<Result<Vec<_>>>()?;
                self.set.active_mut().insert_at(index, instances)
            }
            EditOp::Remove(id) => self.set.active_mut().remove(id)?,
            EditOp::Move { id, index } => self.set.active_mut().move_to(id, index)?,
            EditOp::SetRouting { id, routing } => {
                self.set.active_mut().set_bus_routing(id, routing)?
            }
            EditOp::SetEnabled { id, enabled } => {
                self.set.active().set_enabled(id, enabled)?;
                self.set.active().version()
            }
            EditOp::SetParameters { id, parameters } => {
                self.set.active().set_parameters(id, &parameters)?;
                self.set.active().version()
            }
            EditOp::SetMasterBypass(bypass) => {
                self.set.active().set_master_bypass(bypass);
                self.set.active().version()
            }
            EditOp::RemoveSection(id) => self.set.active_mut().remove_section(id)?,
            EditOp::Clear => self.set.active_mut().clear(),
        };
        self.publish();
        if recorded {
            self.history.save_state(&self.set, origin);
        }
        Ok(version)
    }

    fn construct(&self, type_id: &str, parameters: &ParameterMap) -> Result<PluginInstance> {
        self.registry
            .create_with(type_id, parameters)
            .map_err(|e| self.report_construction(type_id, e))
    }

    fn report_construction(&self, type_id: &str, error: ConstructionError) -> Error {
        tracing::warn!("Failed to create plugin '{}': {}", type_id, error);
        self.events.emit(EngineEvent::ConstructionFailed {
            type_id: type_id.to_string(),
            reason: error.to_string(),
        });
        error.into()
    }

    /// Hand the active pipeline's generation to the render context.
    pub fn publish(&mut self) -> bool {
        self.handoff.publish(self.set.active().generation())
    }

    /// Make `selector` active. Returns `false` if B does not exist.
    pub fn switch_active(&mut self, selector: Selector) -> bool {
        if !self.set.switch_active(selector) {
            return false;
        }
        self.publish();
        self.history.save_state(&self.set, EditOrigin::User);
        true
    }

    /// Flip A/B, creating B from A first if needed.
    pub fn toggle_active(&mut self) -> Result<Selector> {
        let selector = self.set.toggle(&self.registry)?;
        self.publish();
        self.history.save_state(&self.set, EditOrigin::User);
        Ok(selector)
    }

    /// Replace B with a copy of A and make B active.
    pub fn copy_a_to_b(&mut self) -> Result<()> {
        self.set.copy_a_to_b(&self.registry)?;
        self.publish();
        self.history.save_state(&self.set, EditOrigin::User);
        Ok(())
    }

    /// Replace A with a copy of B and make A active.
    pub fn copy_b_to_a(&mut self) -> Result<()> {
        self.set.copy_b_to_a(&self.registry)?;
        self.publish();
        self.history.save_state(&self.set, EditOrigin::User);
        Ok(())
    }

    /// Record the current state as a history entry.
    pub fn save_state(&mut self) -> bool {
        self.history.save_state(&self.set, EditOrigin::User)
    }

    pub fn undo(&mut self) -> bool {
        let moved = self
            .history
            .undo(&mut self.set, &self.registry, Some(&self.events));
        if moved {
            self.publish();
        }
        moved
    }

    pub fn redo(&mut self) -> bool {
        let moved = self
            .history
            .redo(&mut self.set, &self.registry, Some(&self.events));
        if moved {
            self.publish();
        }
        moved
    }

    /// Records for the active pipeline.
    pub fn serialize_for_persistence(&self) -> Vec<PersistedPlugin> {
        codec::serialize_for_persistence(self.set.active())
    }

    /// Replace the active pipeline with `records`. Unknown types are skipped
    /// and listed in the returned type ids.
    pub fn load_from_persistence(&mut self, records: &[PersistedPlugin]) -> Vec<String> {
        self.load_records(records, EditOrigin::User)
    }

    /// Load a preset. The load replays records like a restore but is itself
    /// recorded, so it can be undone.
    pub fn load_preset(&mut self, records: &[PersistedPlugin]) -> Vec<String> {
        let replay = ReplayInProgress::begin();
        self.history.record_next_replay();
        self.load_records(records, EditOrigin::Replay(&replay))
    }

    fn load_records(&mut self, records: &[PersistedPlugin], origin: EditOrigin<'_>) -> Vec<String> {
        let LoadReport { instances, skipped } =
            codec::load_from_persistence(records, &self.registry, Some(&self.events));
        let pipeline = self.set.active_mut();
        pipeline.replace_all(instances);
        pipeline.set_master_bypass(false);
        self.publish();
        self.history.save_state(&self.set, origin);
        tracing::info!(
            "Loaded {} plugins ({} skipped)",
            records.len() - skipped.len(),
            skipped.len()
        );
        skipped
    }

    /// Both pipelines and the active selection.
    pub fn set_record(&self) -> SetRecord {
        self.set.to_record()
    }

    pub fn load_set_record(&mut self, record: &SetRecord) -> Vec<String> {
        let skipped = self
            .set
            .load_record(record, &self.registry, Some(&self.events));
        self.publish();
        self.history.save_state(&self.set, EditOrigin::User);
        skipped
    }

    /// Drop generations the render context no longer holds.
    pub fn collect_garbage(&mut self) -> usize {
        self.handoff.collect()
    }

    pub fn events(&self) -> &Receiver<EngineEvent> {
        &self.event_rx
    }

    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Events lost to a full queue.
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }
}
