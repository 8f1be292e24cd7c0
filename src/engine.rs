//! Chainrack engine facade over the control context.

use crate::{Error, Result};
use chainrack_core::codec::{self, PersistedPlugin, SetRecord};
use chainrack_core::{
    BusRouting, ControlContext, EditOp, EngineEvent, InstanceId, ParameterMap, Pipeline,
    PluginRegistry, RenderEngine, Selector,
};

/// Owns the control context of one plugin rack.
///
/// All methods run on the control thread. Audio is produced by a
/// [`RenderEngine`] obtained once from [`Chainrack::render_engine`] and moved
/// to the audio thread.
///
/// # Example
///
/// ```ignore
/// use chainrack::prelude::*;
///
/// let mut rack = Chainrack::builder().build()?;
/// let mut render = rack.render_engine();
///
/// let volume = rack.add("Volume", params! { "gain" => -6.0 })?;
/// rack.set_parameters(volume, params! { "gain" => -12.0 })?;
/// rack.undo();
///
/// // audio thread
/// render.render(&mut block, &format);
/// ```
pub struct Chainrack {
    control: ControlContext,
}

impl Chainrack {
    /// Create a new engine builder
    pub fn builder() -> crate::ChainrackBuilder {
        crate::ChainrackBuilder::default()
    }

    pub(crate) fn from_control(control: ControlContext) -> Self {
        Self { control }
    }

    pub fn control(&self) -> &ControlContext {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut ControlContext {
        &mut self.control
    }

    pub fn registry(&self) -> &PluginRegistry {
        self.control.registry()
    }

    pub fn sample_rate(&self) -> f64 {
        self.control.config().sample_rate
    }

    /// Render engine bound to this rack. Create one per audio stream.
    pub fn render_engine(&self) -> RenderEngine {
        self.control.render_engine()
    }

    /// The active pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        self.control.active()
    }

    pub fn selector(&self) -> Selector {
        self.control.pipelines().selector()
    }

    pub fn edit(&mut self, op: EditOp) -> Result<u64> {
        Ok(self.control.edit(op)?)
    }

    /// Append a plugin to the active pipeline.
    pub fn add(&mut self, type_id: &str, parameters: ParameterMap) -> Result<InstanceId> {
        let index = self.pipeline().len();
        self.insert(index, type_id, parameters)
    }

    /// Insert a plugin at `index` (clamped to the pipeline length).
    pub fn insert(
        &mut self,
        index: usize,
        type_id: &str,
        parameters: ParameterMap,
    ) -> Result<InstanceId> {
        let index = index.min(self.pipeline().len());
        self.control.edit(EditOp::Insert {
            index,
            type_id: type_id.to_string(),
            parameters,
        })?;
        self.pipeline()
            .at(index)
            .map(|i| i.id())
            .ok_or_else(|| Error::NotInserted(type_id.to_string()))
    }

    pub fn remove(&mut self, id: InstanceId) -> Result<u64> {
        self.edit(EditOp::Remove(id))
    }

    pub fn move_to(&mut self, id: InstanceId, index: usize) -> Result<u64> {
        self.edit(EditOp::Move { id, index })
    }

    pub fn set_parameters(&mut self, id: InstanceId, parameters: ParameterMap) -> Result<u64> {
        self.edit(EditOp::SetParameters { id, parameters })
    }

    pub fn set_enabled(&mut self, id: InstanceId, enabled: bool) -> Result<u64> {
        self.edit(EditOp::SetEnabled { id, enabled })
    }

    pub fn set_routing(&mut self, id: InstanceId, routing: BusRouting) -> Result<u64> {
        self.edit(EditOp::SetRouting { id, routing })
    }

    pub fn set_master_bypass(&mut self, bypass: bool) -> Result<u64> {
        self.edit(EditOp::SetMasterBypass(bypass))
    }

    pub fn switch_active(&mut self, selector: Selector) -> bool {
        self.control.switch_active(selector)
    }

    pub fn toggle_active(&mut self) -> Result<Selector> {
        Ok(self.control.toggle_active()?)
    }

    pub fn copy_a_to_b(&mut self) -> Result<()> {
        Ok(self.control.copy_a_to_b()?)
    }

    pub fn copy_b_to_a(&mut self) -> Result<()> {
        Ok(self.control.copy_b_to_a()?)
    }

    pub fn save_state(&mut self) -> bool {
        self.control.save_state()
    }

    /// Step back one history entry. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> bool {
        self.control.undo()
    }

    /// Step forward one history entry. Returns `false` at the newest entry.
    pub fn redo(&mut self) -> bool {
        self.control.redo()
    }

    /// Active pipeline as pretty JSON records.
    pub fn preset_json(&self) -> Result<String> {
        Ok(codec::to_json(&self.control.serialize_for_persistence())?)
    }

    /// Load a preset from JSON as an undoable edit. Returns skipped type ids.
    pub fn load_preset_json(&mut self, json: &str) -> Result<Vec<String>> {
        let records: Vec<PersistedPlugin> = codec::from_json(json)?;
        Ok(self.control.load_preset(&records))
    }

    /// Both pipelines and the active selection as JSON.
    pub fn session_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.control.set_record())?)
    }

    pub fn load_session_json(&mut self, json: &str) -> Result<Vec<String>> {
        let record: SetRecord = serde_json::from_str(json)?;
        Ok(self.control.load_set_record(&record))
    }

    /// Drain pending engine events (render faults, construction failures, ...).
    pub fn events(&self) -> Vec<EngineEvent> {
        self.control.drain_events()
    }

    /// Drop generations the render engine no longer holds.
    pub fn collect_garbage(&mut self) -> usize {
        self.control.collect_garbage()
    }
}
