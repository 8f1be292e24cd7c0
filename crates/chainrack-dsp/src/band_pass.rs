//! Band-pass filter: cascaded Butterworth high-pass and low-pass sections.
//!
//! | key  | meaning             | domain                        | default |
//! |------|---------------------|-------------------------------|---------|
//! | `hf` | high-pass frequency | 1 - 40000 Hz                  | 1000    |
//! | `lf` | low-pass frequency  | 1 - 40000 Hz                  | 1000    |
//! | `hs` | high-pass slope     | 0, -12, -24, -36, -48 dB/oct  | -24     |
//! | `ls` | low-pass slope      | 0, -12, -24, -36, -48 dB/oct  | -24     |
//!
//! Each 12 dB/oct of slope is one biquad stage. A slope of 0 disables that
//! side. Slopes outside the allowed set fall back to -24.

use crate::biquad::{BiquadCoeffs, BiquadState};
use chainrack_core::{
    AudioBlock, ContextCache, FormatDescriptor, ParamKind, ParameterMap, ParameterRange,
    ParameterSet, Plugin,
};

pub const BAND_PASS_TYPE: &str = "BandPassFilter";

const ALLOWED_SLOPES: [i64; 5] = [0, -12, -24, -36, -48];
const DEFAULT_SLOPE: i64 = -24;

fn stage_count(slope: i64) -> usize {
    (slope.unsigned_abs() / 12) as usize
}

/// One side of the band: coefficients plus `[stage][channel]` state.
struct FilterSide {
    coeffs: BiquadCoeffs,
    states: Vec<Vec<BiquadState>>,
}

impl FilterSide {
    fn new(coeffs: BiquadCoeffs, stages: usize, channels: usize) -> Self {
        Self {
            coeffs,
            states: vec![vec![BiquadState::seeded(); channels]; stages],
        }
    }

    fn run(&mut self, block: &mut AudioBlock<'_>) {
        if self.states.is_empty() {
            return;
        }
        let channels = block.channels().min(self.states[0].len());
        for ch in 0..channels {
            for sample in block.channel_mut(ch) {
                let mut y = *sample;
                for stage in self.states.iter_mut() {
                    y = stage[ch].tick(&self.coeffs, y);
                }
                *sample = y;
            }
        }
    }
}

struct BandContext {
    highpass: FilterSide,
    lowpass: FilterSide,
}

impl BandContext {
    fn new(format: &FormatDescriptor, (hp, lp): (usize, usize), (hf, lf): (f64, f64)) -> Self {
        Self {
            highpass: FilterSide::new(
                BiquadCoeffs::highpass(hf, format.sample_rate),
                hp,
                format.channels,
            ),
            lowpass: FilterSide::new(
                BiquadCoeffs::lowpass(lf, format.sample_rate),
                lp,
                format.channels,
            ),
        }
    }
}

pub struct BandPassFilter {
    params: ParameterSet,
    context: ContextCache<(usize, usize), BandContext>,
}

impl BandPassFilter {
    pub fn new() -> Self {
        let freq = || ParamKind::Float(ParameterRange::logarithmic(1.0, 40000.0, 1000.0));
        let slope = || ParamKind::Stepped {
            steps: ALLOWED_SLOPES.to_vec(),
            default: DEFAULT_SLOPE,
        };
        let params = ParameterSet::new()
            .with("hf", freq())
            .with("lf", freq())
            .with("hs", slope())
            .with("ls", slope());
        Self {
            params,
            context: ContextCache::new(),
        }
    }

    fn stages(&self) -> (usize, usize) {
        (
            stage_count(self.params.int("hs")),
            stage_count(self.params.int("ls")),
        )
    }

    fn frequencies(&self) -> (f64, f64) {
        (self.params.float("hf"), self.params.float("lf"))
    }

    /// Recompute coefficients for the built context. Slope changes are left
    /// to the next block, which rebuilds the context.
    fn refresh_coefficients(&mut self) {
        let Some(sample_rate) = self.context.built_for().map(|(f, _)| f.sample_rate) else {
            return;
        };
        let (hf, lf) = self.frequencies();
        if let Some(ctx) = self.context.get_mut() {
            ctx.highpass.coeffs = BiquadCoeffs::highpass(hf, sample_rate);
            ctx.lowpass.coeffs = BiquadCoeffs::lowpass(lf, sample_rate);
        }
    }
}

impl Default for BandPassFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for BandPassFilter {
    fn type_id(&self) -> &str {
        BAND_PASS_TYPE
    }

    fn parameters(&self) -> ParameterMap {
        self.params.snapshot()
    }

    fn parameter_set(&self) -> Option<&ParameterSet> {
        Some(&self.params)
    }

    fn set_parameters(&mut self, partial: &ParameterMap) {
        if self.params.apply(partial) {
            self.refresh_coefficients();
        }
    }

    fn process(&mut self, block: &mut AudioBlock<'_>, format: &FormatDescriptor) {
        let stages = self.stages();
        let frequencies = self.frequencies();
        let ctx = self
            .context
            .get_or_rebuild(format, &stages, |format, &stages| {
                BandContext::new(format, stages, frequencies)
            });

        ctx.highpass.run(block);
        ctx.lowpass.run(block);
    }

    fn release(&mut self) {
        self.context.clear();
    }

    fn reinit_count(&self) -> u64 {
        self.context.reinit_count()
    }
}
