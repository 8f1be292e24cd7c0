//! Stream format and planar audio block views.

/// Sample rate, channel count and block size of one `process` call.
///
/// Plugins compare the incoming descriptor against the one their context was
/// built for; any difference means the context must be rebuilt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatDescriptor {
    pub sample_rate: f64,
    pub channels: usize,
    /// Frames per channel.
    pub block_size: usize,
}

impl FormatDescriptor {
    pub fn new(sample_rate: f64, channels: usize, block_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            block_size,
        }
    }

    /// Total samples in a planar block of this format.
    #[inline]
    pub fn samples(&self) -> usize {
        self.channels * self.block_size
    }

    #[inline]
    pub fn with_channels(self, channels: usize) -> Self {
        Self { channels, ..self }
    }
}

/// Mutable view over a planar (channel-major) block of samples.
pub struct AudioBlock<'a> {
    data: &'a mut [f32],
    channels: usize,
    frames: usize,
}

impl<'a> AudioBlock<'a> {
    /// `data` must hold at least `channels * frames` samples; any excess is
    /// not visible through the view.
    pub fn new(data: &'a mut [f32], channels: usize, frames: usize) -> Self {
        let available = (channels * frames).min(data.len());
        let channels = if frames == 0 {
            channels
        } else {
            available / frames
        };
        let len = channels * frames;
        Self {
            data: &mut data[..len],
            channels,
            frames,
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    #[inline]
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        let start = index * self.frames;
        &self.data[start..start + self.frames]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        let start = index * self.frames;
        &mut self.data[start..start + self.frames]
    }

    /// Iterate channels in order.
    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.data.chunks_exact_mut(self.frames.max(1))
    }

    pub fn as_slice(&self) -> &[f32] {
        self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        self.data
    }
}
