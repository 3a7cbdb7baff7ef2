//! Offscreen surface textures and CPU readback.

use super::context::GpuError;
use wgpu::{Device, Texture, TextureFormat, TextureUsages, TextureView};

/// A render target that owns both texture and view.
/// The texture must outlive its view, so we keep them together.
pub struct RenderTarget {
    texture: Texture,
    view: TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Create a render target that can be drawn to and copied to the CPU.
    pub fn for_output(
        device: &Device,
        label: &str,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    pub fn view(&self) -> &TextureView {
        &self.view
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Record a copy of the whole target into `readback`.
    pub fn copy_to(&self, encoder: &mut wgpu::CommandEncoder, readback: &ReadbackBuffer) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: readback.buffer(),
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(readback.padded_row_bytes()),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// Readback buffer for copying GPU texture data to CPU.
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row_bytes: u32,
    unpadded_row_bytes: u32,
}

impl ReadbackBuffer {
    /// Create a new readback buffer sized for the given dimensions.
    pub fn new(device: &Device, width: u32, height: u32) -> Self {
        let bytes_per_pixel = 4u32;
        let unpadded_row_bytes = width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_bytes = unpadded_row_bytes.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback_buffer"),
            size: (padded_row_bytes * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            width,
            height,
            padded_row_bytes,
            unpadded_row_bytes,
        }
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Get the padded bytes per row (for texture copy).
    pub fn padded_row_bytes(&self) -> u32 {
        self.padded_row_bytes
    }

    /// Map the buffer, copy out tightly packed RGBA8 rows and unmap it again
    /// so the buffer can take the next frame.
    pub fn read_pixels(&self, device: &Device) -> Result<Vec<u8>, GpuError> {
        let buffer_slice = self.buffer.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GpuError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|_| GpuError::Readback(String::from("map callback dropped")))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        {
            let data = buffer_slice.get_mapped_range();
            for row in 0..self.height {
                let start = (row * self.padded_row_bytes) as usize;
                let end = start + self.unpadded_row_bytes as usize;
                pixels.extend_from_slice(&data[start..end]);
            }
        }
        self.buffer.unmap();
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;
    use crate::render::FeatureLevel;

    #[tokio::test]
    async fn test_render_target_creation() {
        let ctx = match GpuContext::new(FeatureLevel::WebGl2).await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let target =
            RenderTarget::for_output(&ctx.device, "test", 256, 128, TextureFormat::Rgba8Unorm);
        assert_eq!(target.size(), (256, 128));
    }

    #[tokio::test]
    async fn test_readback_buffer_creation() {
        let ctx = match GpuContext::new(FeatureLevel::WebGl2).await {
            Ok(ctx) => ctx,
            Err(_) => return,
        };

        let buffer = ReadbackBuffer::new(&ctx.device, 100, 16);
        assert!(buffer.padded_row_bytes() >= 100 * 4);
        assert_eq!(buffer.padded_row_bytes() % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
    }
}
