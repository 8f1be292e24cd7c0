//! Test helpers and fixtures for chainrack integration tests
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `DSP_EPSILON` (1e-4): DSP processing (filters, resonators)
//! - `PERCEPTUAL_EPSILON` (0.001): Perceptual equivalence (-60dB)
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)
#![allow(dead_code)]


use chainrack::prelude::*;

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 512;

/// Gain effect with a dB parameter in `[-60, 0]`.
pub struct EffectX {
    params: ParameterSet,
}

impl EffectX {
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new().with(
                "gain",
                ParamKind::Float(ParameterRange::linear(-60.0, 0.0, 0.0)),
            ),
        }
    }
}

impl Plugin for EffectX {
    fn type_id(&self) -> &str {
        "EffectX"
    }

    fn parameters(&self) -> ParameterMap {
        self.params.snapshot()
    }

    fn set_parameters(&mut self, partial: &ParameterMap) {
        self.params.apply(partial);
    }

    fn process(&mut self, block: &mut AudioBlock<'_>, _format: &FormatDescriptor) {
        let gain = ParameterRange::db_to_linear(self.params.float("gain")) as f32;
        for sample in block.as_mut_slice() {
            *sample *= gain;
        }
    }
}

/// Frequency-carrying effect with a format-keyed context.
pub struct EffectY {
    params: ParameterSet,
    context: ContextCache<(), Vec<f32>>,
}

impl EffectY {
    pub fn new() -> Self {
        Self {
            params: ParameterSet::new().with(
                "freq",
                ParamKind::Float(ParameterRange::logarithmic(20.0, 20000.0, 1000.0)),
            ),
            context: ContextCache::new(),
        }
    }
}

impl Plugin for EffectY {
    fn type_id(&self) -> &str {
        "EffectY"
    }

    fn parameters(&self) -> ParameterMap {
        self.params.snapshot()
    }

    fn set_parameters(&mut self, partial: &ParameterMap) {
        self.params.apply(partial);
    }

    fn process(&mut self, _block: &mut AudioBlock<'_>, format: &FormatDescriptor) {
        self.context
            .get_or_rebuild(format, &(), |f, _| vec![0.0; f.channels]);
    }

    fn release(&mut self) {
        self.context.clear();
    }

    fn reinit_count(&self) -> u64 {
        self.context.reinit_count()
    }
}

/// Panics on every block.
pub struct Exploding;

impl Plugin for Exploding {
    fn type_id(&self) -> &str {
        "Exploding"
    }

    fn parameters(&self) -> ParameterMap {
        ParameterMap::new()
    }

    fn set_parameters(&mut self, _partial: &ParameterMap) {}

    fn process(&mut self, _block: &mut AudioBlock<'_>, _format: &FormatDescriptor) {
        panic!("exploding plugin");
    }
}

/// Route control-path logs to the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Registry with the built-ins plus the test effects.
pub fn test_registry() -> PluginRegistry {
    let registry = PluginRegistry::new();
    chainrack::register_builtin_plugins(&registry);
    registry.register_fn("EffectX", || Ok(Box::new(EffectX::new())));
    registry.register_fn("EffectY", || Ok(Box::new(EffectY::new())));
    registry.register_fn("Exploding", || Ok(Box::new(Exploding)));
    registry
}

/// Create a basic test rack with the test effects registered.
pub fn test_rack() -> Chainrack {
    init_tracing();
    Chainrack::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .registry(test_registry())
        .build()
        .expect("Failed to create test rack")
}

/// Create a test rack with a specific history capacity.
pub fn test_rack_with_history(capacity: usize) -> Chainrack {
    init_tracing();
    Chainrack::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .history_capacity(capacity)
        .registry(test_registry())
        .build()
        .expect("Failed to create test rack")
}

pub fn stereo_format() -> FormatDescriptor {
    FormatDescriptor::new(TEST_SAMPLE_RATE, 2, TEST_BUFFER_SIZE)
}

/// Render one block of `input` (planar, matching `format`) and return it.
pub fn render_block(
    render: &mut RenderEngine,
    input: &[f32],
    format: &FormatDescriptor,
) -> Vec<f32> {
    let mut block = input.to_vec();
    render.render(&mut block, format);
    block
}

/// Planar block with every channel holding the same sine.
pub fn sine_block(frequency: f64, format: &FormatDescriptor) -> Vec<f32> {
    let channel = generate_sine(frequency, format.sample_rate, format.block_size);
    channel.repeat(format.channels)
}

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Check if two signals are approximately equal within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Parameter value of the instance at `index` in the active pipeline.
pub fn param_at(rack: &Chainrack, index: usize, key: &str) -> ParamValue {
    rack.pipeline()
        .at(index)
        .expect("no instance at index")
        .parameters()[key]
        .clone()
}

/// Type ids of the active pipeline, in order.
pub fn types(rack: &Chainrack) -> Vec<String> {
    rack.pipeline()
        .type_ids()
        .into_iter()
        .map(String::from)
        .collect()
}
