//! Phobz Scope Core
//!
//! Real-time oscilloscope-style waveform display for a live audio stream.
//!
//! # Overview
//!
//! - The audio thread publishes each block of interleaved samples into a
//!   single-slot, latest-wins [`WaveformStage`]
//! - A [`RenderDispatcher`] coalesces "frame ready" signals into render
//!   passes on one dedicated render thread
//! - Each pass rasterizes the latest block into per-channel line segments
//!   and composites them through a [`SurfaceCompositor`], which owns the GPU
//!   device and recreates it once when the device is lost
//! - [`WgpuBackend`] renders headless via wgpu (Metal on macOS, Vulkan on
//!   Linux) and presents by reading the frame back into a [`FrontBuffer`]

pub mod audio;
pub mod gpu;
pub mod pipeline;
pub mod raster;
pub mod render;

// Re-export commonly used types
pub use audio::{
    BlockError, EncodingDescriptor, FrameReadyNotify, SampleBlock, SineSource, WaveformSink,
    WaveformStage,
};
pub use gpu::{FrontBuffer, GpuContext, GpuError, PresentedFrame, WgpuBackend};
pub use pipeline::{parse_hex_color, ScopeConfig, ScopeError, ScopeStatus, WaveformScope};
pub use raster::{rasterize, rasterize_baseline, LineSegment, SegmentKind};
pub use render::{
    BackendError, CompositorError, CompositorState, FeatureLevel, GpuBackend, RenderDispatcher,
    StrokeStyle, SurfaceCompositor, WaveformView,
};
