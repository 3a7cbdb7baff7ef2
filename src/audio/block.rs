//! Sample blocks delivered by the audio producer.

use serde::{Deserialize, Serialize};

/// Errors raised when a buffer cannot form a valid [`SampleBlock`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("Channel count must be at least 1")]
    ZeroChannels,
    #[error("Buffer of {len} samples is not a whole number of {channels}-channel frames")]
    Misaligned { len: usize, channels: u16 },
    #[error("No encoding has been set for the stream")]
    NoEncoding,
}

/// Stream format announced before the first block of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingDescriptor {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channel_count: u16,
}

impl EncodingDescriptor {
    pub fn new(sample_rate: u32, channel_count: u16) -> Self {
        Self {
            sample_rate,
            channel_count,
        }
    }

    pub fn mono(sample_rate: u32) -> Self {
        Self::new(sample_rate, 1)
    }

    pub fn stereo(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2)
    }
}

/// One chunk of interleaved `f32` samples.
///
/// Immutable once built: the producer hands ownership to the stage and the
/// next block supersedes it rather than mutating it.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    samples: Vec<f32>,
    channel_count: u16,
    sample_rate: u32,
}

impl SampleBlock {
    /// Build a block, checking that `samples` holds whole frames.
    pub fn new(samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> Result<Self, BlockError> {
        if channel_count == 0 {
            return Err(BlockError::ZeroChannels);
        }
        if samples.len() % channel_count as usize != 0 {
            return Err(BlockError::Misaligned {
                len: samples.len(),
                channels: channel_count,
            });
        }
        Ok(Self {
            samples,
            channel_count,
            sample_rate,
        })
    }

    /// Build a block from a buffer already known to hold whole frames.
    pub(crate) fn from_frames(samples: Vec<f32>, channel_count: u16, sample_rate: u32) -> Self {
        debug_assert!(channel_count > 0 && samples.len() % channel_count as usize == 0);
        Self {
            samples,
            channel_count,
            sample_rate,
        }
    }

    /// Build a block in the given stream format.
    pub fn with_encoding(samples: Vec<f32>, encoding: EncodingDescriptor) -> Result<Self, BlockError> {
        Self::new(samples, encoding.channel_count, encoding.sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channel_count as usize
    }

    pub fn encoding(&self) -> EncodingDescriptor {
        EncodingDescriptor::new(self.sample_rate, self.channel_count)
    }

    /// Sample of `channel` at frame `frame`.
    #[inline]
    pub fn sample(&self, frame: usize, channel: u16) -> f32 {
        self.samples[frame * self.channel_count as usize + channel as usize]
    }

    /// Iterate the samples of a single channel in frame order.
    pub fn channel(&self, channel: u16) -> impl Iterator<Item = f32> + '_ {
        self.samples
            .iter()
            .skip(channel as usize)
            .step_by(self.channel_count as usize)
            .copied()
    }

    /// Duration covered by this block in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}
