//! Headless wgpu rendering.
//!
//! Provides the wgpu implementation of the render backend: device
//! acquisition per feature level, a thick-line pipeline, offscreen surfaces
//! and CPU readback of the displayed frame.

pub mod backend;
pub mod context;
pub mod pipeline;
pub mod textures;

pub use backend::{FrontBuffer, PresentedFrame, WgpuBackend, WgpuDevice, WgpuDraw, WgpuSurface};
pub use context::{GpuContext, GpuError};
pub use pipeline::LinePipeline;
pub use textures::{ReadbackBuffer, RenderTarget};
