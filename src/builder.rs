//! Builder for configuring and constructing a `Chainrack` engine.

use crate::{Chainrack, Result};
use chainrack_core::{ControlContext, EngineConfig, PluginRegistry};
use std::path::Path;

/// Built-in plugins are registered unless `.without_builtins()` is called.
///
/// # Example
///
/// ```ignore
/// use chainrack::prelude::*;
///
/// let mut rack = Chainrack::builder()
///     .sample_rate(44100.0)
///     .history_capacity(50)
///     .build()?;
///
/// let mut render = rack.render_engine();
/// ```
pub struct ChainrackBuilder {
    config: EngineConfig,
    registry: Option<PluginRegistry>,
    builtins: bool,
}

impl Default for ChainrackBuilder {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            registry: None,
            builtins: true,
        }
    }
}

impl ChainrackBuilder {
    /// Default: 48000
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 8
    pub fn max_channels(mut self, channels: usize) -> Self {
        self.config.max_channels = channels;
        self
    }

    /// Default: 4096
    pub fn max_block_size(mut self, frames: usize) -> Self {
        self.config.max_block_size = frames;
        self
    }

    /// Default: 5 (main plus four auxiliary buses)
    pub fn bus_count(mut self, count: usize) -> Self {
        self.config.bus_count = count;
        self
    }

    /// Default: 100
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Default: 256
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load settings from a TOML file. Missing keys keep their defaults.
    pub fn config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let config = EngineConfig::from_toml_str(&source)?;
        Ok(self.config(config))
    }

    /// Use an existing registry. Built-ins are still added unless disabled.
    pub fn registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    pub fn build(self) -> Result<Chainrack> {
        let registry = self.registry.unwrap_or_default();
        if self.builtins {
            chainrack_dsp::register_builtin_plugins(&registry);
        }
        let control = ControlContext::new(registry, self.config)?;
        tracing::info!(
            "Chainrack ready: {} Hz, {} buses, {} plugin types",
            control.config().sample_rate,
            control.config().bus_count,
            control.registry().list_types().len()
        );
        Ok(Chainrack::from_control(control))
    }
}
