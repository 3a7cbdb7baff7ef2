//! Synthetic sample blocks for demos, benches and tests.
//!
//! Generates deterministic interleaved blocks (sine, silence, impulse,
//! noise) and a continuous-phase [`SineSource`] that stands in for an audio
//! callback.

use super::block::{EncodingDescriptor, SampleBlock};
use std::f32::consts::PI;

/// Generate a block of silence.
pub fn silence_block(encoding: EncodingDescriptor, frames: usize) -> SampleBlock {
    block_from_fn(encoding, frames, |_, _| 0.0)
}

/// Generate a sine block, same signal on every channel.
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `encoding` - Sample rate and channel layout
/// * `frames` - Frames per channel
/// * `amplitude` - Amplitude (0.0 to 1.0)
pub fn sine_block(
    frequency: f32,
    encoding: EncodingDescriptor,
    frames: usize,
    amplitude: f32,
) -> SampleBlock {
    let rate = encoding.sample_rate.max(1) as f32;
    block_from_fn(encoding, frames, |frame, _| {
        let t = frame as f32 / rate;
        amplitude * (2.0 * PI * frequency * t).sin()
    })
}

/// Generate a block that is silent except for one frame at `amplitude`.
pub fn impulse_block(
    encoding: EncodingDescriptor,
    frames: usize,
    position: usize,
    amplitude: f32,
) -> SampleBlock {
    block_from_fn(encoding, frames, |frame, _| {
        if frame == position {
            amplitude
        } else {
            0.0
        }
    })
}

/// Generate white noise.
///
/// Uses a simple linear congruential generator for reproducibility.
pub fn noise_block(
    encoding: EncodingDescriptor,
    frames: usize,
    amplitude: f32,
    seed: u64,
) -> SampleBlock {
    let mut state = seed;
    let a: u64 = 6364136223846793005;
    let c: u64 = 1442695040888963407;

    block_from_fn(encoding, frames, |_, _| {
        state = state.wrapping_mul(a).wrapping_add(c);
        let normalized = (state as f32 / u64::MAX as f32) * 2.0 - 1.0;
        amplitude * normalized
    })
}

/// Build an interleaved block from a per-(frame, channel) generator.
fn block_from_fn(
    encoding: EncodingDescriptor,
    frames: usize,
    mut sample: impl FnMut(usize, u16) -> f32,
) -> SampleBlock {
    let channels = encoding.channel_count.max(1);
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for frame in 0..frames {
        for channel in 0..channels {
            samples.push(sample(frame, channel));
        }
    }
    SampleBlock::from_frames(samples, channels, encoding.sample_rate)
}

/// Continuous sine generator producing consecutive callback-sized blocks.
///
/// Each channel is phase shifted by a quarter turn so stereo output is
/// visually distinguishable.
#[derive(Debug, Clone)]
pub struct SineSource {
    encoding: EncodingDescriptor,
    frequency: f32,
    amplitude: f32,
    frames_per_block: usize,
    phase: f32,
}

impl SineSource {
    pub fn new(
        encoding: EncodingDescriptor,
        frequency: f32,
        amplitude: f32,
        frames_per_block: usize,
    ) -> Self {
        Self {
            encoding,
            frequency,
            amplitude,
            frames_per_block,
            phase: 0.0,
        }
    }

    pub fn encoding(&self) -> EncodingDescriptor {
        self.encoding
    }

    /// Time between blocks at the source's sample rate.
    pub fn block_interval(&self) -> std::time::Duration {
        let rate = self.encoding.sample_rate.max(1) as f64;
        std::time::Duration::from_secs_f64(self.frames_per_block as f64 / rate)
    }

    /// Produce the next block's interleaved samples.
    pub fn next_samples(&mut self) -> Vec<f32> {
        let channels = self.encoding.channel_count.max(1) as usize;
        let step = 2.0 * PI * self.frequency / self.encoding.sample_rate.max(1) as f32;
        let mut samples = Vec::with_capacity(self.frames_per_block * channels);

        for _ in 0..self.frames_per_block {
            for channel in 0..channels {
                let offset = channel as f32 * PI * 0.5;
                samples.push(self.amplitude * (self.phase + offset).sin());
            }
            self.phase = (self.phase + step) % (2.0 * PI);
        }
        samples
    }
}

impl Iterator for SineSource {
    type Item = SampleBlock;

    fn next(&mut self) -> Option<SampleBlock> {
        let samples = self.next_samples();
        let channels = self.encoding.channel_count.max(1);
        Some(SampleBlock::from_frames(samples, channels, self.encoding.sample_rate))
    }
}
