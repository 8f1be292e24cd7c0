//! Feedback delay.

use chainrack_core::{
    AudioBlock, ContextCache, FormatDescriptor, ParamKind, ParameterMap, ParameterRange,
    ParameterSet, Plugin,
};

pub const DELAY_TYPE: &str = "Delay";

/// Longest delay the ring buffers are sized for.
pub const MAX_DELAY_MS: f64 = 2000.0;

/// Per-channel ring buffers sized for [`MAX_DELAY_MS`] at the built sample rate.
struct DelayLines {
    lines: Vec<Vec<f32>>,
    len: usize,
    write: usize,
    /// Delay time in samples.
    offset: usize,
}

impl DelayLines {
    fn new(format: &FormatDescriptor, time_ms: f64) -> Self {
        let len = ((MAX_DELAY_MS * 0.001 * format.sample_rate).ceil() as usize).max(1) + 1;
        let mut lines = Self {
            lines: vec![vec![0.0; len]; format.channels],
            len,
            write: 0,
            offset: 1,
        };
        lines.retime(time_ms, format.sample_rate);
        lines
    }

    fn retime(&mut self, time_ms: f64, sample_rate: f64) {
        let samples = (time_ms * 0.001 * sample_rate).round() as usize;
        self.offset = samples.clamp(1, self.len.saturating_sub(1).max(1));
    }
}

pub struct Delay {
    params: ParameterSet,
    context: ContextCache<(), DelayLines>,
}

impl Delay {
    pub fn new() -> Self {
        let params = ParameterSet::new()
            .with(
                "time_ms",
                ParamKind::Float(ParameterRange::linear(1.0, MAX_DELAY_MS, 250.0)),
            )
            .with(
                "feedback",
                ParamKind::Float(ParameterRange::linear(0.0, 0.95, 0.3)),
            )
            .with("mix", ParamKind::Float(ParameterRange::linear(0.0, 1.0, 0.5)));
        Self {
            params,
            context: ContextCache::new(),
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for Delay {
    fn type_id(&self) -> &str {
        DELAY_TYPE
    }

    fn parameters(&self) -> ParameterMap {
        self.params.snapshot()
    }

    fn parameter_set(&self) -> Option<&ParameterSet> {
        Some(&self.params)
    }

    fn set_parameters(&mut self, partial: &ParameterMap) {
        if !self.params.apply(partial) {
            return;
        }
        let Some(sample_rate) = self.context.built_for().map(|(f, _)| f.sample_rate) else {
            return;
        };
        let time_ms = self.params.float("time_ms");
        if let Some(ctx) = self.context.get_mut() {
            ctx.retime(time_ms, sample_rate);
        }
    }

    fn process(&mut self, block: &mut AudioBlock<'_>, format: &FormatDescriptor) {
        let time_ms = self.params.float("time_ms");
        let ctx = self
            .context
            .get_or_rebuild(format, &(), |format, _| DelayLines::new(format, time_ms));

        let feedback = self.params.float("feedback") as f32;
        let mix = self.params.float("mix") as f32;
        let (len, offset) = (ctx.len, ctx.offset);

        let start = ctx.write;
        let channels = block.channels().min(ctx.lines.len());
        for ch in 0..channels {
            let line = &mut ctx.lines[ch];
            let mut write = start;
            for sample in block.channel_mut(ch) {
                let read = (write + len - offset) % len;
                let delayed = line[read];
                line[write] = *sample + delayed * feedback;
                *sample = *sample * (1.0 - mix) + delayed * mix;
                write = (write + 1) % len;
            }
        }
        ctx.write = (start + block.frames()) % len;
    }

    fn release(&mut self) {
        self.context.clear();
    }

    fn reinit_count(&self) -> u64 {
        self.context.reinit_count()
    }
}
