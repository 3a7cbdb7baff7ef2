//! Render-thread machinery.
//!
//! - [`backend`]: the device/surface seam a concrete GPU API implements
//! - [`compositor`]: device ownership, resize and device-loss recovery
//! - [`dispatcher`]: coalescing frame-ready signals onto the render thread
//! - [`view`]: one render pass from the stage to the compositor

pub mod backend;
pub mod compositor;
pub mod dispatcher;
pub mod view;

pub use backend::{BackendError, FeatureLevel, GpuBackend, Rgba};
pub use compositor::{
    CompositorError, CompositorState, DrawTransaction, StrokeStyle, SurfaceCompositor,
    SurfaceDescriptor,
};
pub use dispatcher::{
    channel, DispatchError, DispatchState, RenderCommand, RenderDispatcher, RenderQueue,
};
pub use view::WaveformView;
