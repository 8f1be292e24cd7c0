//! Horn resonator: a waveguide horn model run as a module kernel.
//!
//! The input is split at the crossover frequency. The high band is sent down
//! a one-dimensional scattering waveguide whose cross-section flares from the
//! throat to the mouth; the low band is delayed by the horn's travel time so
//! both bands stay aligned.
//!
//! Segment reflection coefficients and the per-channel waveguide lines live
//! in linear memory. Only the horn length changes the segment count, so it is
//! the one layout parameter.

use crate::biquad::{BiquadCoeffs, BiquadState};
use crate::error::{ModuleError, Result};
use crate::memory::{LinearMemory, MemoryView};
use crate::module::{ModuleKernel, ModulePlugin};
use chainrack_core::{
    ConstructionError, FormatDescriptor, ParamKind, ParameterRange, ParameterSet,
};
use std::f64::consts::PI;

pub const HORN_TYPE: &str = "HornResonator";

/// Speed of sound, m/s.
const SPEED_OF_SOUND: f64 = 343.0;
/// Characteristic impedance of air, rayl.
const AIR_IMPEDANCE: f64 = 413.0;
const MAX_SEGMENTS: usize = 400;
const EPS: f64 = 1e-9;

fn float(min: f64, max: f64, default: f64) -> ParamKind {
    ParamKind::Float(ParameterRange::linear(min, max, default))
}

/// Number of waveguide segments for a horn of `length_cm` at `sample_rate`.
pub fn segment_count(length_cm: f64, sample_rate: f64) -> usize {
    let dx = SPEED_OF_SOUND / sample_rate;
    ((length_cm / 100.0 / dx).round() as usize).clamp(1, MAX_SEGMENTS)
}

#[derive(Debug, Clone, Copy)]
struct Coeffs {
    /// Per-segment propagation loss.
    loss: f32,
    throat_reflection: f32,
    mouth_b0: f32,
    mouth_a1: f32,
    mouth_a2: f32,
    throat_b0: f32,
    throat_a1: f32,
    low: BiquadCoeffs,
    high: BiquadCoeffs,
    output_gain: f32,
}

impl Default for Coeffs {
    fn default() -> Self {
        Self {
            loss: 1.0,
            throat_reflection: 0.0,
            mouth_b0: 0.0,
            mouth_a1: 0.0,
            mouth_a2: 0.0,
            throat_b0: 0.0,
            throat_a1: 0.0,
            low: BiquadCoeffs::IDENTITY,
            high: BiquadCoeffs::IDENTITY,
            output_gain: 1.0,
        }
    }
}

/// Small per-channel state kept outside linear memory.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    /// Which half of the double-buffered lines is current.
    buffer: usize,
    low_index: usize,
    mouth_y1: f32,
    mouth_y2: f32,
    throat_y1: f32,
    low: [BiquadState; 2],
    high: [BiquadState; 2],
}

/// Memory layout: `segments` reflection coefficients, then per channel
/// `fwd[2][segments + 1]`, `rev[2][segments + 1]` and a `segments`-long
/// low-band delay line.
#[derive(Debug, Clone, Copy)]
struct Layout {
    segments: usize,
    state: MemoryView,
}

impl Layout {
    fn line_len(&self) -> usize {
        self.segments + 1
    }

    fn channel_stride(&self) -> usize {
        channel_stride(self.segments)
    }
}

fn channel_stride(segments: usize) -> usize {
    4 * (segments + 1) + segments
}

#[derive(Debug, Default)]
pub struct HornKernel {
    layout: Option<Layout>,
    coeffs: Coeffs,
    channels: Vec<ChannelState>,
}

impl HornKernel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> Option<usize> {
        self.layout.map(|l| l.segments)
    }
}

/// Loader for the built-in horn kernel.
pub fn horn_module() -> Result<Box<dyn ModuleKernel>> {
    Ok(Box::new(HornKernel::new()))
}

/// Construct a horn resonator plugin.
pub fn horn_resonator() -> std::result::Result<ModulePlugin, ConstructionError> {
    ModulePlugin::load(HORN_TYPE, &horn_module, None)
}

impl ModuleKernel for HornKernel {
    fn parameters(&self) -> ParameterSet {
        ParameterSet::new()
            .with(
                "co",
                ParamKind::Float(ParameterRange::logarithmic(20.0, 5000.0, 600.0)),
            )
            .with("ln", float(20.0, 120.0, 70.0))
            .with("th", float(0.5, 50.0, 3.0))
            .with("mo", float(5.0, 200.0, 60.0))
            .with("cv", float(-100.0, 100.0, 40.0))
            .with("dp", float(0.0, 10.0, 0.03))
            .with("tr", float(0.0, 0.99, 0.99))
            .with("wg", float(-36.0, 36.0, 30.0))
    }

    fn layout_keys(&self) -> &'static [&'static str] {
        &["ln"]
    }

    fn instantiate(
        &mut self,
        memory: &mut LinearMemory,
        format: &FormatDescriptor,
        params: &ParameterSet,
    ) -> Result<()> {
        let segments = segment_count(params.float("ln"), format.sample_rate);
        let state = memory.reserve(segments + format.channels * channel_stride(segments))?;
        self.layout = Some(Layout { segments, state });
        self.channels = vec![ChannelState::default(); format.channels];
        self.update(memory, format, params)
    }

    fn update(
        &mut self,
        memory: &mut LinearMemory,
        format: &FormatDescriptor,
        params: &ParameterSet,
    ) -> Result<()> {
        let layout = self
            .layout
            .ok_or_else(|| ModuleError::Instantiate("horn kernel has no layout".to_string()))?;
        let sr = format.sample_rate;
        let n = layout.segments;
        let dx = SPEED_OF_SOUND / sr;

        let curve = 10f64.powf(params.float("cv") / 100.0);
        let throat_radius = params.float("th") / 200.0;
        let mouth_radius = params.float("mo") / 200.0;
        let impedance = |i: usize| {
            let radius = if i == 0 {
                throat_radius
            } else if i == n {
                mouth_radius
            } else {
                throat_radius + (mouth_radius - throat_radius) * (i as f64 / n as f64).powf(curve)
            };
            AIR_IMPEDANCE / (PI * (radius * radius).max(EPS))
        };

        let state = memory.reacquire(&layout.state)?;
        let reflections = &mut memory.slice_mut(&state)?[..n];
        for (i, r) in reflections.iter_mut().enumerate() {
            let (z0, z1) = (impedance(i), impedance(i + 1));
            let sum = z0 + z1;
            *r = if sum < EPS { 0.0 } else { ((z1 - z0) / sum) as f32 };
        }

        // One-pole throat filter and two-pole mouth filter at the radiation cutoffs.
        let cutoff = |radius: f64| {
            let fc = if radius > EPS {
                SPEED_OF_SOUND / (2.0 * PI * radius)
            } else {
                sr / 4.0
            };
            0.99 * (-2.0 * PI * fc.min(sr * 0.45) / sr).exp()
        };
        let throat_pole = cutoff(throat_radius);
        let mouth_pole = cutoff(mouth_radius);
        let mouth_a1 = -2.0 * mouth_pole;
        let mouth_a2 = mouth_pole * mouth_pole;

        let crossover = params.float("co").clamp(20.0, sr * 0.5 - 1.0);
        self.coeffs = Coeffs {
            loss: 10f64.powf(-params.float("dp") * dx / 20.0) as f32,
            throat_reflection: params.float("tr") as f32,
            mouth_b0: (-1.0 - mouth_a1 - mouth_a2) as f32,
            mouth_a1: mouth_a1 as f32,
            mouth_a2: mouth_a2 as f32,
            throat_b0: (1.0 - throat_pole) as f32,
            throat_a1: (-throat_pole) as f32,
            low: BiquadCoeffs::lowpass(crossover, sr),
            high: BiquadCoeffs::highpass(crossover, sr),
            output_gain: 10f64.powf(params.float("wg") / 20.0) as f32,
        };
        Ok(())
    }

    fn process(
        &mut self,
        memory: &mut LinearMemory,
        io: &MemoryView,
        format: &FormatDescriptor,
    ) -> Result<()> {
        let layout = self
            .layout
            .ok_or_else(|| ModuleError::Instantiate("horn kernel has no layout".to_string()))?;
        let frames = format.block_size;
        if frames == 0 {
            return Ok(());
        }
        let n = layout.segments;
        let m = layout.line_len();
        let c = self.coeffs;

        let state = memory.reacquire(&layout.state)?;
        let (data, state) = memory.pair_mut(io, &state)?;
        let (reflections, lines) = state.split_at_mut(n);

        let channels = self.channels.len().min(data.len() / frames);
        let stride = layout.channel_stride();
        for ch in 0..channels {
            let st = &mut self.channels[ch];
            let line = &mut lines[ch * stride..(ch + 1) * stride];
            let (fwd, rest) = line.split_at_mut(2 * m);
            let (rev, low_line) = rest.split_at_mut(2 * m);

            for sample in &mut data[ch * frames..(ch + 1) * frames] {
                let input = *sample;
                let low = st.low[0].tick(&c.low, input);
                let low = st.low[1].tick(&c.low, low);
                let high = st.high[0].tick(&c.high, input);
                let high = st.high[1].tick(&c.high, high);

                let cur = st.buffer * m;
                let next = (st.buffer ^ 1) * m;
                for (j, r) in reflections.iter().enumerate() {
                    let f_in = fwd[cur + j];
                    let r_in = rev[cur + j + 1];
                    let diff = r * (f_in - r_in);
                    fwd[next + j + 1] = c.loss * (f_in + diff);
                    rev[next + j] = c.loss * (r_in + diff);
                }

                let fw_n = fwd[next + n];
                let reflected =
                    c.mouth_b0 * fw_n - c.mouth_a1 * st.mouth_y1 - c.mouth_a2 * st.mouth_y2;
                rev[next + n] = reflected;
                st.mouth_y2 = st.mouth_y1;
                st.mouth_y1 = reflected;

                let throat = c.throat_b0 * rev[next] - c.throat_a1 * st.throat_y1;
                st.throat_y1 = throat;
                fwd[next] = high + c.throat_reflection * throat;
                st.buffer ^= 1;

                let delayed = low_line[st.low_index];
                low_line[st.low_index] = low;
                st.low_index = (st.low_index + 1) % n;

                *sample = (fw_n + reflected) * c.output_gain + delayed;
            }
        }
        Ok(())
    }
}
