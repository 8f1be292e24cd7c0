//! Built-in plugins for chainrack pipelines: volume, band-pass filter, delay,
//! section markers, and a horn resonator backed by a linear-memory module.
//!
//! ```ignore
//! use chainrack_core::PluginRegistry;
//!
//! let registry = PluginRegistry::new();
//! chainrack_dsp::register_builtin_plugins(&registry);
//! let filter = registry.create(chainrack_dsp::BAND_PASS_TYPE)?;
//! ```

mod error;
pub use error::{ModuleError, Result};

mod biquad;
pub use biquad::{BiquadCoeffs, BiquadState};

mod volume;
pub use volume::{Volume, VOLUME_TYPE};

mod band_pass;
pub use band_pass::{BandPassFilter, BAND_PASS_TYPE};

mod delay;
pub use delay::{Delay, DELAY_TYPE, MAX_DELAY_MS};

mod section;
pub use section::{Section, SECTION_TYPE};

mod memory;
pub use memory::{LinearMemory, MemoryView, PAGE_SAMPLES};

mod module;
pub use module::{ModuleKernel, ModuleLoader, ModulePlugin, DEFAULT_MEMORY_LIMIT};

mod horn;
pub use horn::{horn_module, horn_resonator, segment_count, HornKernel, HORN_TYPE};

use chainrack_core::{PluginDescriptor, PluginRegistry};

/// Register every built-in plugin type with `registry`.
pub fn register_builtin_plugins(registry: &PluginRegistry) {
    registry.register(
        PluginDescriptor::new(VOLUME_TYPE, "Volume", "Basics"),
        || Ok(Box::new(Volume::new())),
    );
    registry.register(
        PluginDescriptor::new(BAND_PASS_TYPE, "Band Pass Filter", "EQ"),
        || Ok(Box::new(BandPassFilter::new())),
    );
    registry.register(
        PluginDescriptor::new(DELAY_TYPE, "Delay", "Delay"),
        || Ok(Box::new(Delay::new())),
    );
    registry.register(
        PluginDescriptor::new(SECTION_TYPE, "Section", "Basics"),
        || Ok(Box::new(Section::new())),
    );
    registry.register(
        PluginDescriptor::new(HORN_TYPE, "Horn Resonator", "Resonator"),
        || Ok(Box::new(horn_resonator()?)),
    );
}
