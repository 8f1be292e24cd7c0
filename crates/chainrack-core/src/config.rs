//! Engine configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on buses a pipeline can address (main bus plus auxiliaries).
pub const MAX_BUSES: usize = 16;

/// Configuration for the pipeline engine.
///
/// Everything that sizes a render-side buffer lives here, so the render
/// engine can preallocate once and never grow on the audio thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sample_rate: f64,
    /// Widest channel layout the render engine accepts.
    pub max_channels: usize,
    /// Largest block (frames per channel) the render engine accepts.
    pub max_block_size: usize,
    /// Bus 0 is the main bus; the rest are auxiliary buses.
    pub bus_count: usize,
    pub history_capacity: usize,
    /// Capacity of the bounded render-to-control event queue.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            max_channels: 8,
            max_block_size: 4096,
            bus_count: 5,
            history_capacity: 100,
            event_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    ///
    /// ```
    /// use chainrack_core::EngineConfig;
    ///
    /// let config = EngineConfig::from_toml_str("sample_rate = 96000.0\nbus_count = 3").unwrap();
    /// assert_eq!(config.sample_rate, 96000.0);
    /// assert_eq!(config.history_capacity, 100);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8000.0 || self.sample_rate > 384000.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (8000-384000 Hz)",
                self.sample_rate
            )));
        }
        if self.max_channels == 0 || self.max_channels > 64 {
            return Err(Error::InvalidConfig(format!(
                "max_channels {} out of range (1-64)",
                self.max_channels
            )));
        }
        if self.max_block_size == 0 {
            return Err(Error::InvalidConfig("max_block_size must be non-zero".into()));
        }
        if self.bus_count == 0 || self.bus_count > MAX_BUSES {
            return Err(Error::InvalidConfig(format!(
                "bus_count {} out of range (1-{})",
                self.bus_count, MAX_BUSES
            )));
        }
        if self.history_capacity == 0 {
            return Err(Error::InvalidConfig(
                "history_capacity must be non-zero".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig("event_capacity must be non-zero".into()));
        }
        Ok(())
    }
}
