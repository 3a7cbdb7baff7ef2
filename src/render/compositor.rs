//! Surface compositor: device ownership, resize and device-loss recovery.
//!
//! State machine:
//!
//! ```text
//! Uninitialized --new--> Ready --resize--> Ready
//!                          |
//!                     draw fails with device loss
//!                          v
//!                        Lost --> Recreating --> Ready (draw retried once)
//! ```
//!
//! A second consecutive device loss on the retried draw is fatal.

use super::backend::{BackendError, FeatureLevel, GpuBackend, Rgba};
use crate::raster::{LineSegment, SegmentKind};

/// Lifecycle state of a [`SurfaceCompositor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositorState {
    Uninitialized,
    Ready,
    Lost,
    Recreating,
}

/// Logical surface size plus the generation of the device backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceDescriptor {
    pub width: u32,
    pub height: u32,
    /// Incremented each time device objects are recreated.
    pub device_generation: u64,
}

impl SurfaceDescriptor {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Stroke colors and width for the two segment kinds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub waveform: Rgba,
    pub baseline: Rgba,
    pub line_width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            waveform: [0.0, 1.0, 0.53, 1.0],
            baseline: [1.0, 0.0, 0.0, 1.0],
            line_width: 1.0,
        }
    }
}

impl StrokeStyle {
    pub fn color_for(&self, kind: SegmentKind) -> Rgba {
        match kind {
            SegmentKind::Waveform => self.waveform,
            SegmentKind::Baseline => self.baseline,
        }
    }
}

/// Errors surfaced by the compositor. Everything here is fatal for rendering.
#[derive(Debug, thiserror::Error)]
pub enum CompositorError {
    #[error("No GPU device available at any feature level ({0})")]
    NoDevice(String),
    #[error("GPU device lost again after recreation: {0}")]
    DeviceLostAfterRetry(BackendError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Compositor has been disposed")]
    Disposed,
}

/// Scoped draw transaction. Dropping it without [`commit`](Self::commit)
/// abandons the draw so no half-open state leaks into the next frame.
pub struct DrawTransaction<'a, B: GpuBackend> {
    backend: &'a mut B,
    device: &'a B::Device,
    surface: &'a B::Surface,
    draw: Option<B::Draw>,
}

impl<'a, B: GpuBackend> DrawTransaction<'a, B> {
    pub fn begin(
        backend: &'a mut B,
        device: &'a B::Device,
        surface: &'a B::Surface,
    ) -> Result<Self, BackendError> {
        let draw = backend.begin_draw(device, surface)?;
        Ok(Self {
            backend,
            device,
            surface,
            draw: Some(draw),
        })
    }

    pub fn clear(&mut self, color: Rgba) {
        if let Some(draw) = self.draw.as_mut() {
            self.backend.clear(draw, color);
        }
    }

    pub fn stroke(
        &mut self,
        segment: &LineSegment,
        color: Rgba,
        line_width: f32,
    ) -> Result<(), BackendError> {
        match self.draw.as_mut() {
            Some(draw) => self.backend.stroke(draw, segment, color, line_width),
            None => Ok(()),
        }
    }

    /// End the transaction and present it.
    pub fn commit(mut self) -> Result<(), BackendError> {
        match self.draw.take() {
            Some(draw) => self.backend.end_draw(self.device, self.surface, draw),
            None => Ok(()),
        }
    }
}

impl<B: GpuBackend> Drop for DrawTransaction<'_, B> {
    fn drop(&mut self) {
        if let Some(draw) = self.draw.take() {
            self.backend.abandon_draw(draw);
        }
    }
}

/// Owns the GPU device and the drawable surface.
///
/// Render thread only.
pub struct SurfaceCompositor<B: GpuBackend> {
    backend: B,
    levels: Vec<FeatureLevel>,
    level: Option<FeatureLevel>,
    device: Option<B::Device>,
    surface: Option<B::Surface>,
    descriptor: SurfaceDescriptor,
    state: CompositorState,
    style: StrokeStyle,
    recoveries: u64,
    disposed: bool,
}

impl<B: GpuBackend> SurfaceCompositor<B> {
    /// Acquire a device at the first supported level of `levels` and create
    /// a `width` x `height` surface on it.
    ///
    /// Fails with [`CompositorError::NoDevice`] when no level is supported.
    pub fn new(
        backend: B,
        levels: &[FeatureLevel],
        width: u32,
        height: u32,
        style: StrokeStyle,
    ) -> Result<Self, CompositorError> {
        let mut compositor = Self {
            backend,
            levels: levels.to_vec(),
            level: None,
            device: None,
            surface: None,
            descriptor: SurfaceDescriptor {
                width,
                height,
                device_generation: 0,
            },
            state: CompositorState::Uninitialized,
            style,
            recoveries: 0,
            disposed: false,
        };
        compositor.acquire_device()?;
        compositor.rebuild_surface()?;
        compositor.state = CompositorState::Ready;
        Ok(compositor)
    }

    /// Replace the surface with one of the new size, keeping the device.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CompositorError> {
        if self.disposed {
            return Err(CompositorError::Disposed);
        }
        log::debug!(
            "Resizing surface {}x{} -> {}x{}",
            self.descriptor.width,
            self.descriptor.height,
            width,
            height
        );
        self.descriptor.width = width;
        self.descriptor.height = height;

        if self.device.is_none() {
            self.acquire_device()?;
        }

        match self.rebuild_surface() {
            Ok(()) => {
                self.state = CompositorState::Ready;
                Ok(())
            }
            Err(err) if err.is_device_lost() => {
                log::warn!("GPU device lost while resizing ({}); recreating", err);
                self.state = CompositorState::Lost;
                self.recreate_device()
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Clear to `clear_color` and stroke every segment, as one transaction.
    ///
    /// On device loss the device objects are recreated and the draw is
    /// retried exactly once.
    pub fn draw_frame(
        &mut self,
        segments: &[LineSegment],
        clear_color: Rgba,
    ) -> Result<(), CompositorError> {
        if self.disposed {
            return Err(CompositorError::Disposed);
        }

        let err = match self.try_draw(segments, clear_color) {
            Ok(()) => return Ok(()),
            Err(err) if err.is_device_lost() => err,
            Err(err) => return Err(err.into()),
        };

        log::warn!("GPU device lost during draw ({}); recreating", err);
        self.state = CompositorState::Lost;
        self.recreate_device()?;

        match self.try_draw(segments, clear_color) {
            Ok(()) => Ok(()),
            Err(err) if err.is_device_lost() => {
                self.state = CompositorState::Lost;
                log::error!("GPU device lost again after recreation: {}", err);
                Err(CompositorError::DeviceLostAfterRetry(err))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Release the surface and device. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.surface = None;
        self.device = None;
        self.level = None;
        self.state = CompositorState::Uninitialized;
        self.disposed = true;
        log::debug!("Compositor disposed");
    }

    pub fn state(&self) -> CompositorState {
        self.state
    }

    pub fn descriptor(&self) -> SurfaceDescriptor {
        self.descriptor
    }

    /// Level the current device was acquired at.
    pub fn feature_level(&self) -> Option<FeatureLevel> {
        self.level
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    /// Number of completed device recreations.
    pub fn recoveries(&self) -> u64 {
        self.recoveries
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn device(&self) -> Option<&B::Device> {
        self.device.as_ref()
    }

    pub fn surface(&self) -> Option<&B::Surface> {
        self.surface.as_ref()
    }

    fn try_draw(&mut self, segments: &[LineSegment], clear_color: Rgba) -> Result<(), BackendError> {
        let (Some(device), Some(surface)) = (self.device.as_ref(), self.surface.as_ref()) else {
            log::trace!("No surface to draw on; skipping frame");
            return Ok(());
        };
        let style = self.style;

        let mut draw = DrawTransaction::begin(&mut self.backend, device, surface)?;
        draw.clear(clear_color);
        for segment in segments {
            draw.stroke(segment, style.color_for(segment.kind), style.line_width)?;
        }
        draw.commit()
    }

    fn acquire_device(&mut self) -> Result<(), CompositorError> {
        let mut failures = Vec::new();
        for &level in &self.levels {
            match self.backend.create_device(level) {
                Ok(device) => {
                    log::info!(
                        "Acquired {} at feature level {}",
                        self.backend.describe(&device),
                        level.name()
                    );
                    self.device = Some(device);
                    self.level = Some(level);
                    return Ok(());
                }
                Err(err) => {
                    log::debug!("Feature level {} unavailable: {}", level.name(), err);
                    failures.push(format!("{}: {}", level.name(), err));
                }
            }
        }

        if failures.is_empty() {
            failures.push(String::from("no feature levels requested"));
        }
        Err(CompositorError::NoDevice(failures.join("; ")))
    }

    fn rebuild_surface(&mut self) -> Result<(), BackendError> {
        // Release the old surface before creating its replacement.
        self.surface = None;
        if self.descriptor.is_empty() {
            return Ok(());
        }
        if let Some(device) = self.device.as_ref() {
            let surface =
                self.backend
                    .create_surface(device, self.descriptor.width, self.descriptor.height)?;
            self.surface = Some(surface);
        }
        Ok(())
    }

    fn recreate_device(&mut self) -> Result<(), CompositorError> {
        self.state = CompositorState::Recreating;
        self.surface = None;
        self.device = None;
        self.level = None;

        if let Err(err) = self.acquire_device() {
            self.state = CompositorState::Lost;
            return Err(err);
        }
        self.descriptor.device_generation += 1;

        if let Err(err) = self.rebuild_surface() {
            self.state = CompositorState::Lost;
            return Err(if err.is_device_lost() {
                CompositorError::DeviceLostAfterRetry(err)
            } else {
                err.into()
            });
        }

        self.state = CompositorState::Ready;
        self.recoveries += 1;
        log::info!(
            "Recreated GPU device (generation {})",
            self.descriptor.device_generation
        );
        Ok(())
    }
}
