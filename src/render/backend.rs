//! Device/surface seam between the compositor and a concrete GPU API.

use crate::raster::LineSegment;
use serde::{Deserialize, Serialize};

/// RGBA color with components in 0.0 - 1.0.
pub type Rgba = [f32; 4];

/// Hardware capability tier requested when acquiring a device.
///
/// Candidates are tried from most to least capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureLevel {
    /// Full desktop limits.
    Full,
    /// Downlevel limits (older Vulkan/Metal/DX11 class hardware).
    Downlevel,
    /// WebGL2-class limits, the minimum this renderer supports.
    WebGl2,
}

impl FeatureLevel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Downlevel => "downlevel",
            Self::WebGl2 => "webgl2",
        }
    }

    /// Default descending candidate list.
    pub fn descending() -> &'static [Self] {
        &[Self::Full, Self::Downlevel, Self::WebGl2]
    }
}

/// Errors reported by a [`GpuBackend`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The device was removed or reset; every device-derived object is invalid.
    #[error("GPU device lost: {0}")]
    DeviceLost(String),
    #[error("No device available at feature level {}", .0.name())]
    Unsupported(FeatureLevel),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Draw failed: {0}")]
    Draw(String),
}

impl BackendError {
    /// Whether this is the recoverable device-removed/device-reset class.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, Self::DeviceLost(_))
    }
}

/// A GPU API able to create a device, a drawable surface bound to it, and
/// run begin/clear/stroke/end draw transactions against that surface.
///
/// All methods are called from the single render thread.
pub trait GpuBackend {
    /// Device plus its drawing context.
    type Device;
    /// Drawable surface of a fixed size, bound to one device.
    type Surface;
    /// An open draw transaction.
    type Draw;

    fn create_device(&mut self, level: FeatureLevel) -> Result<Self::Device, BackendError>;

    fn create_surface(
        &mut self,
        device: &Self::Device,
        width: u32,
        height: u32,
    ) -> Result<Self::Surface, BackendError>;

    /// Open a draw transaction on `surface`.
    fn begin_draw(
        &mut self,
        device: &Self::Device,
        surface: &Self::Surface,
    ) -> Result<Self::Draw, BackendError>;

    fn clear(&mut self, draw: &mut Self::Draw, color: Rgba);

    fn stroke(
        &mut self,
        draw: &mut Self::Draw,
        segment: &LineSegment,
        color: Rgba,
        line_width: f32,
    ) -> Result<(), BackendError>;

    /// Commit and present the transaction.
    fn end_draw(
        &mut self,
        device: &Self::Device,
        surface: &Self::Surface,
        draw: Self::Draw,
    ) -> Result<(), BackendError>;

    /// Release a transaction without presenting it.
    fn abandon_draw(&mut self, draw: Self::Draw);

    /// Human-readable description of a device, for logs.
    fn describe(&self, _device: &Self::Device) -> String {
        String::from("gpu device")
    }
}
