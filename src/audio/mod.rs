//! Audio-side types and the producer/consumer hand-off.
//!
//! This module provides:
//! - `SampleBlock` / `EncodingDescriptor`: interleaved `f32` blocks and their format
//! - `WaveformStage`: the latest-wins mailbox written by the audio callback
//! - Synthetic block generators for demos and tests

pub mod block;
pub mod stage;
pub mod synth;

// Re-export commonly used types
pub use block::{BlockError, EncodingDescriptor, SampleBlock};
pub use stage::{FrameReadyNotify, WaveformSink, WaveformStage};
pub use synth::{impulse_block, noise_block, silence_block, sine_block, SineSource};
