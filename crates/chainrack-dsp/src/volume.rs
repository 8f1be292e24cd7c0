//! Volume plugin.

use chainrack_core::{
    AudioBlock, FormatDescriptor, ParamKind, ParameterMap, ParameterRange, ParameterSet, Plugin,
};

pub const VOLUME_TYPE: &str = "Volume";

/// Static gain stage with a dB parameter in `[-60, 0]`.
pub struct Volume {
    params: ParameterSet,
    linear: f32,
}

impl Volume {
    pub fn new() -> Self {
        let params = ParameterSet::new().with(
            "gain",
            ParamKind::Float(ParameterRange::linear(-60.0, 0.0, 0.0)),
        );
        Self {
            params,
            linear: 1.0,
        }
    }

    /// Current linear gain factor.
    #[inline]
    pub fn linear_gain(&self) -> f32 {
        self.linear
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for Volume {
    fn type_id(&self) -> &str {
        VOLUME_TYPE
    }

    fn parameters(&self) -> ParameterMap {
        self.params.snapshot()
    }

    fn parameter_set(&self) -> Option<&ParameterSet> {
        Some(&self.params)
    }

    fn set_parameters(&mut self, partial: &ParameterMap) {
        if self.params.apply(partial) {
            self.linear = ParameterRange::db_to_linear(self.params.float("gain")) as f32;
        }
    }

    fn process(&mut self, block: &mut AudioBlock<'_>, _format: &FormatDescriptor) {
        if self.linear == 1.0 {
            return;
        }
        for sample in block.as_mut_slice() {
            *sample *= self.linear;
        }
    }
}
