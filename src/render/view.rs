//! Render-thread side of the scope: one pass takes the latest block,
//! rasterizes it for the current surface size and composites it.

use super::backend::{GpuBackend, Rgba};
use super::compositor::{CompositorError, SurfaceCompositor};
use crate::audio::{SampleBlock, WaveformStage};
use crate::raster::{rasterize, rasterize_baseline, LineSegment};
use std::sync::Arc;

/// Ties a [`WaveformStage`] to a [`SurfaceCompositor`].
pub struct WaveformView<B: GpuBackend> {
    compositor: SurfaceCompositor<B>,
    stage: Arc<WaveformStage>,
    background: Rgba,
    /// Last block drawn; redrawn when a pass finds nothing new.
    current: Option<SampleBlock>,
    epoch: u64,
    rejected_seen: u64,
    passes: u64,
}

impl<B: GpuBackend> WaveformView<B> {
    pub fn new(compositor: SurfaceCompositor<B>, stage: Arc<WaveformStage>, background: Rgba) -> Self {
        let epoch = stage.encoding_epoch();
        Self {
            compositor,
            stage,
            background,
            current: None,
            epoch,
            rejected_seen: 0,
            passes: 0,
        }
    }

    /// Draw the most recent block, or the baselines if none has arrived.
    pub fn render_pass(&mut self) -> Result<(), CompositorError> {
        self.sync_encoding();
        if let Some(block) = self.stage.take_latest() {
            // A publish racing an encoding change can still land a stale block.
            if self.stage.accepts(&block) {
                self.current = Some(block);
            } else {
                log::debug!("Discarding block encoded as {:?}", block.encoding());
                self.current = None;
            }
        }
        self.report_rejections();

        let segments = self.segments();
        self.compositor.draw_frame(&segments, self.background)?;
        self.passes += 1;
        Ok(())
    }

    /// Resize the surface and redraw onto the new one.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), CompositorError> {
        self.compositor.resize(width, height)?;
        self.render_pass()
    }

    /// Segments for the current block against the current surface size.
    pub fn segments(&self) -> Vec<LineSegment> {
        let surface = self.compositor.descriptor();
        match &self.current {
            Some(block) => rasterize(block, surface.width, surface.height),
            None => rasterize_baseline(self.stage.channel_count(), surface.width, surface.height),
        }
    }

    pub fn dispose(&mut self) {
        self.current = None;
        self.compositor.dispose();
    }

    pub fn compositor(&self) -> &SurfaceCompositor<B> {
        &self.compositor
    }

    pub fn current_block(&self) -> Option<&SampleBlock> {
        self.current.as_ref()
    }

    /// Completed render passes.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    fn sync_encoding(&mut self) {
        let epoch = self.stage.encoding_epoch();
        if epoch != self.epoch {
            self.epoch = epoch;
            log::debug!("Stream encoding changed to {:?}", self.stage.encoding());
        }
        if self.current.as_ref().is_some_and(|block| !self.stage.accepts(block)) {
            self.current = None;
        }
    }

    fn report_rejections(&mut self) {
        let rejected = self.stage.rejected_blocks();
        if rejected > self.rejected_seen {
            log::warn!(
                "Dropped {} malformed audio block(s)",
                rejected - self.rejected_seen
            );
            self.rejected_seen = rejected;
        }
    }
}
