//! [`GpuBackend`] over wgpu.
//!
//! Surfaces are offscreen RGBA8 targets; presenting a frame copies it back
//! to the CPU and publishes it through a shared [`FrontBuffer`] the host
//! reads from.

use super::context::{GpuContext, GpuError};
use super::pipeline::LinePipeline;
use super::textures::{ReadbackBuffer, RenderTarget};
use crate::raster::{LineSegment, LineVertex, Tessellator};
use crate::render::{BackendError, FeatureLevel, GpuBackend, Rgba};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use wgpu::util::DeviceExt;
use wgpu::TextureFormat;

const SURFACE_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// A displayed frame: tightly packed RGBA8 rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// Device generation the frame was drawn with.
    pub generation: u64,
}

impl PresentedFrame {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let px = self.pixels.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )
    }
}

/// Latest presented frame, shared between the render thread and the host.
#[derive(Debug, Clone, Default)]
pub struct FrontBuffer {
    inner: Arc<Mutex<Option<PresentedFrame>>>,
}

impl FrontBuffer {
    pub fn latest(&self) -> Option<PresentedFrame> {
        self.slot().clone()
    }

    pub fn present(&self, frame: PresentedFrame) {
        *self.slot() = Some(frame);
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<PresentedFrame>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// wgpu device with the line pipeline built for it.
pub struct WgpuDevice {
    ctx: GpuContext,
    pipeline: LinePipeline,
    generation: u64,
}

impl WgpuDevice {
    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    /// Flag the device as removed; the next draw reports device loss.
    pub fn simulate_loss(&self) {
        self.ctx.mark_lost();
    }

    fn check_alive(&self) -> Result<(), BackendError> {
        if self.ctx.is_lost() {
            return Err(BackendError::DeviceLost(format!(
                "{} was removed",
                self.ctx.adapter_info().name
            )));
        }
        Ok(())
    }
}

pub struct WgpuSurface {
    target: RenderTarget,
    readback: ReadbackBuffer,
}

pub struct WgpuDraw {
    clear: Rgba,
    vertices: Vec<LineVertex>,
    tessellator: Tessellator,
}

/// Headless wgpu backend.
#[derive(Default)]
pub struct WgpuBackend {
    front: FrontBuffer,
    devices_created: u64,
}

impl WgpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present into an existing front buffer.
    pub fn with_front_buffer(front: FrontBuffer) -> Self {
        Self {
            front,
            devices_created: 0,
        }
    }

    pub fn front_buffer(&self) -> FrontBuffer {
        self.front.clone()
    }

    fn map_gpu_error(device: &WgpuDevice, err: GpuError) -> BackendError {
        if device.ctx.is_lost() {
            BackendError::DeviceLost(err.to_string())
        } else {
            BackendError::Draw(err.to_string())
        }
    }
}

impl GpuBackend for WgpuBackend {
    type Device = WgpuDevice;
    type Surface = WgpuSurface;
    type Draw = WgpuDraw;

    fn create_device(&mut self, level: FeatureLevel) -> Result<WgpuDevice, BackendError> {
        let ctx = pollster::block_on(GpuContext::new(level)).map_err(|err| {
            log::debug!("wgpu device at {} failed: {}", level.name(), err);
            BackendError::Unsupported(level)
        })?;
        let pipeline = LinePipeline::new(&ctx.device, SURFACE_FORMAT);
        self.devices_created += 1;
        Ok(WgpuDevice {
            ctx,
            pipeline,
            generation: self.devices_created - 1,
        })
    }

    fn create_surface(
        &mut self,
        device: &WgpuDevice,
        width: u32,
        height: u32,
    ) -> Result<WgpuSurface, BackendError> {
        device.check_alive()?;
        let max = device.ctx.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(BackendError::Surface(format!(
                "{}x{} exceeds the device limit of {}",
                width, height, max
            )));
        }
        Ok(WgpuSurface {
            target: RenderTarget::for_output(
                &device.ctx.device,
                "scope_surface",
                width,
                height,
                SURFACE_FORMAT,
            ),
            readback: ReadbackBuffer::new(&device.ctx.device, width, height),
        })
    }

    fn begin_draw(
        &mut self,
        device: &WgpuDevice,
        surface: &WgpuSurface,
    ) -> Result<WgpuDraw, BackendError> {
        device.check_alive()?;
        let (width, height) = surface.target.size();
        Ok(WgpuDraw {
            clear: [0.0, 0.0, 0.0, 1.0],
            vertices: Vec::new(),
            tessellator: Tessellator::new(width, height),
        })
    }

    fn clear(&mut self, draw: &mut WgpuDraw, color: Rgba) {
        draw.clear = color;
    }

    fn stroke(
        &mut self,
        draw: &mut WgpuDraw,
        segment: &LineSegment,
        color: Rgba,
        line_width: f32,
    ) -> Result<(), BackendError> {
        draw.tessellator
            .push_segment(&mut draw.vertices, segment, color, line_width);
        Ok(())
    }

    fn end_draw(
        &mut self,
        device: &WgpuDevice,
        surface: &WgpuSurface,
        draw: WgpuDraw,
    ) -> Result<(), BackendError> {
        device.check_alive()?;
        let gpu = &device.ctx.device;

        let mut encoder = gpu.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("scope_encoder"),
        });

        let vertex_buffer = (!draw.vertices.is_empty()).then(|| {
            gpu.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("scope_vertices"),
                contents: bytemuck::cast_slice(&draw.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        {
            let [r, g, b, a] = draw.clear;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scope_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: surface.target.view(),
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            if let Some(buffer) = vertex_buffer.as_ref() {
                render_pass.set_pipeline(&device.pipeline.pipeline);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..draw.vertices.len() as u32, 0..1);
            }
        }

        surface.target.copy_to(&mut encoder, &surface.readback);
        device.ctx.queue.submit(std::iter::once(encoder.finish()));

        let pixels = surface
            .readback
            .read_pixels(gpu)
            .map_err(|err| Self::map_gpu_error(device, err))?;
        device.check_alive()?;

        let (width, height) = surface.target.size();
        self.front.present(PresentedFrame {
            width,
            height,
            pixels,
            generation: device.generation,
        });
        Ok(())
    }

    fn abandon_draw(&mut self, draw: WgpuDraw) {
        log::trace!("Abandoned draw with {} vertices", draw.vertices.len());
    }

    fn describe(&self, device: &WgpuDevice) -> String {
        let info = device.ctx.adapter_info();
        format!("{} ({:?})", info.name, info.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::rasterize;
    use crate::render::{StrokeStyle, SurfaceCompositor};
    use crate::SampleBlock;

    fn compositor(width: u32, height: u32) -> Option<SurfaceCompositor<WgpuBackend>> {
        // Skip on machines without a usable adapter.
        SurfaceCompositor::new(
            WgpuBackend::new(),
            FeatureLevel::descending(),
            width,
            height,
            StrokeStyle {
                line_width: 3.0,
                ..StrokeStyle::default()
            },
        )
        .ok()
    }

    #[test]
    fn test_presented_frame_pixel_bounds() {
        let frame = PresentedFrame {
            width: 2,
            height: 1,
            pixels: vec![1, 2, 3, 4, 5, 6, 7, 8],
            generation: 0,
        };
        assert_eq!(frame.pixel(1, 0), Some([5, 6, 7, 8]));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn test_save_png() {
        let frame = PresentedFrame {
            width: 2,
            height: 2,
            pixels: vec![255; 16],
            generation: 0,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        frame.save_png(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_draws_waveform_and_baseline() {
        let Some(mut compositor) = compositor(64, 32) else {
            return;
        };
        let front = compositor.backend().front_buffer();
        let block = SampleBlock::new(vec![1.0; 64], 1, 48000).unwrap();
        compositor
            .draw_frame(&rasterize(&block, 64, 32), [0.0, 0.0, 0.0, 1.0])
            .unwrap();

        let frame = front.latest().unwrap();
        assert_eq!((frame.width, frame.height), (64, 32));
        // Above the baseline the column is waveform green.
        let px = frame.pixel(10, 8).unwrap();
        assert!(px[1] > 200 && px[0] < 50);
        // Baseline is drawn last, in red.
        let px = frame.pixel(10, 16).unwrap();
        assert!(px[0] > 200 && px[1] < 50);
    }

    #[test]
    fn test_simulated_loss_recreates_device() {
        let Some(mut compositor) = compositor(32, 16) else {
            return;
        };
        let front = compositor.backend().front_buffer();
        compositor.device().unwrap().simulate_loss();

        compositor
            .draw_frame(&crate::raster::rasterize_baseline(1, 32, 16), [0.0; 4])
            .unwrap();
        assert_eq!(compositor.recoveries(), 1);
        assert_eq!(front.latest().unwrap().generation, 1);
    }
}
