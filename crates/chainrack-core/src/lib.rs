//! Real-time plugin pipeline runtime.
//!
//! # Primary API
//!
//! - [`ControlContext`]: single writer of pipeline state (edits, A/B, undo/redo)
//! - [`RenderEngine`]: per-block execution on the audio thread
//! - [`PluginRegistry`]: constructs [`Plugin`] trait objects by type id
//! - [`codec`]: deterministic records for persistence and history
//!
//! # Example
//!
//! ```ignore
//! use chainrack_core::prelude::*;
//!
//! let registry = PluginRegistry::new();
//! registry.register_fn("Volume", || Ok(Box::new(Volume::new())));
//!
//! let mut control = ControlContext::new(registry, EngineConfig::default())?;
//! let mut render = control.render_engine();
//!
//! control.edit(EditOp::insert(0, "Volume"))?;
//!
//! // audio thread
//! render.render(&mut block, &format);
//! ```

pub mod error;
pub use error::{ConstructionError, Error, Result};

mod config;
pub use config::{EngineConfig, MAX_BUSES};

pub(crate) mod lockfree;
pub use lockfree::AtomicFlag;

pub mod parameter;
pub use parameter::{
    ParamKind, ParamSpec, ParamValue, ParameterMap, ParameterRange, ParameterScale, ParameterSet,
};

mod format;
pub use format::{AudioBlock, FormatDescriptor};

mod routing;
pub use routing::{BusRouting, ChannelSelection, InvalidChannelSelection};

mod plugin;
pub use plugin::{ContextCache, InstanceId, Plugin, PluginInstance, PluginRole, PluginSlot};

pub mod registry;
pub use registry::{PluginDescriptor, PluginFactory, PluginRegistry};

mod pipeline;
pub use pipeline::Pipeline;

mod generation;
pub use generation::{
    Generation, GenerationEntry, GenerationHandoff, GenerationReader, GenerationState,
};

mod events;
pub use events::{event_channel, EngineEvent, EventSender};

pub mod codec;
pub use codec::{LoadReport, PersistedPlugin, PluginRecord, SetRecord};

mod pipeline_set;
pub use pipeline_set::{PipelineSet, Selector};

pub mod history;
pub use history::{EditOrigin, History, HistoryEntry, HistoryManager, ReplayInProgress};

mod render;
pub use render::RenderEngine;

mod control;
pub use control::{ControlContext, EditOp};

pub mod prelude {
    pub use crate::{
        params, AudioBlock, BusRouting, ChannelSelection, ContextCache, ControlContext, EditOp,
        EngineConfig, EngineEvent, FormatDescriptor, InstanceId, ParamKind, ParamValue,
        ParameterMap, ParameterRange, ParameterSet, Plugin, PluginDescriptor, PluginRegistry,
        PluginRole, RenderEngine, Selector,
    };
}
