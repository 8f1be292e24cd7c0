//! # Chainrack - Real-time Plugin Pipeline Engine
//!
//! Ordered chains of audio effect plugins that can be edited live while audio
//! keeps flowing, with A/B comparison and undo/redo.
//!
//! ## Architecture
//!
//! Chainrack is an umbrella crate that coordinates:
//! - **chainrack-core** - Plugin contract, registry, pipelines, generations,
//!   render engine, codec, history, control context
//! - **chainrack-dsp** - Built-in plugins (volume, band-pass, delay, section
//!   marker, module-backed horn resonator)
//!
//! ## Quick Start
//!
//! ```ignore
//! use chainrack::prelude::*;
//!
//! let mut rack = Chainrack::builder().sample_rate(48000.0).build()?;
//! let mut render = rack.render_engine();
//!
//! let filter = rack.add("BandPassFilter", params! { "hf" => 200.0, "lf" => 8000.0 })?;
//! rack.add("Volume", params! { "gain" => -6.0 })?;
//!
//! // audio thread, once per block
//! let format = FormatDescriptor::new(48000.0, 2, 512);
//! render.render(&mut block, &format);
//!
//! // control thread
//! rack.set_enabled(filter, false)?;
//! rack.undo()?;
//! ```

/// Re-export of chainrack-core for direct access
pub use chainrack_core as core;

/// Re-export of chainrack-dsp for direct access
pub use chainrack_dsp as dsp;

pub use chainrack_core::{
    params, AudioBlock, BusRouting, ChannelSelection, ConstructionError, ContextCache,
    ControlContext, EditOp, EngineConfig, EngineEvent, FormatDescriptor, InstanceId, ParamKind,
    ParamValue, ParameterMap, ParameterRange, ParameterSet, Pipeline, Plugin, PluginDescriptor,
    PluginRegistry, PluginRole, RenderEngine, Selector,
};

pub use chainrack_dsp::{
    register_builtin_plugins, BandPassFilter, Delay, ModuleError, ModuleKernel, ModuleLoader,
    ModulePlugin, Section, Volume,
};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::ChainrackBuilder;
pub use engine::Chainrack;

/// Convenience prelude for common imports
pub mod prelude {
    // Main engine
    pub use crate::{Chainrack, ChainrackBuilder};

    // Essential types
    pub use crate::core::prelude::*;
}
