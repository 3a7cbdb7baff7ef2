//! Scope assembly: stage, dispatcher and render thread wired together.

use crate::audio::{EncodingDescriptor, SampleBlock, WaveformSink, WaveformStage};
use crate::gpu::{FrontBuffer, WgpuBackend};
use crate::render::{
    self, CompositorError, DispatchError, FeatureLevel, GpuBackend, RenderCommand,
    RenderDispatcher, RenderQueue, Rgba, StrokeStyle, SurfaceCompositor, WaveformView,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Scope configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Initial surface size in pixels; either may be zero.
    pub width: u32,
    pub height: u32,
    #[serde(with = "hex_color")]
    pub background: [f32; 3],
    #[serde(with = "hex_color")]
    pub waveform_color: [f32; 3],
    #[serde(with = "hex_color")]
    pub baseline_color: [f32; 3],
    /// Stroke width in pixels.
    pub line_width: f32,
    /// Device candidates, most capable first.
    pub feature_levels: Vec<FeatureLevel>,
    /// Bound on queued render-thread commands.
    pub queue_capacity: usize,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 256,
            background: [0.0, 0.0, 0.0],
            waveform_color: [0.0, 1.0, 0.53],
            baseline_color: [1.0, 0.0, 0.0],
            line_width: 1.0,
            feature_levels: FeatureLevel::descending().to_vec(),
            queue_capacity: 8,
        }
    }
}

impl ScopeConfig {
    pub fn from_json(json: &str) -> Result<Self, ScopeError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ScopeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        if !self.line_width.is_finite() || self.line_width < 0.0 {
            return Err(ScopeError::Config(format!(
                "line_width must be a non-negative number, got {}",
                self.line_width
            )));
        }
        if self.feature_levels.is_empty() {
            return Err(ScopeError::Config(String::from(
                "at least one feature level is required",
            )));
        }
        Ok(())
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle {
            waveform: opaque(self.waveform_color),
            baseline: opaque(self.baseline_color),
            line_width: self.line_width,
        }
    }

    pub fn background_rgba(&self) -> Rgba {
        opaque(self.background)
    }
}

fn opaque([r, g, b]: [f32; 3]) -> Rgba {
    [r, g, b, 1.0]
}

/// Parse hex color to RGB floats (accepts 6-char RGB or 8-char RGBA, alpha is ignored).
pub fn parse_hex_color(hex: &str) -> Option<[f32; 3]> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 && hex.len() != 8 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()? as f32 / 255.0;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()? as f32 / 255.0;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()? as f32 / 255.0;
    Some([r, g, b])
}

mod hex_color {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(rgb: &[f32; 3], serializer: S) -> Result<S::Ok, S::Error> {
        let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        serializer.serialize_str(&format!("#{:02x}{:02x}{:02x}", r, g, b))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[f32; 3], D::Error> {
        let hex = String::deserialize(deserializer)?;
        super::parse_hex_color(&hex)
            .ok_or_else(|| de::Error::custom(format!("invalid color: {}", hex)))
    }
}

/// Errors that can occur while running a scope.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("Renderer initialization failed: {0}")]
    Init(#[from] CompositorError),
    #[error("Failed to spawn render thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Render thread has stopped")]
    RenderThreadStopped,
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<DispatchError> for ScopeError {
    fn from(_: DispatchError) -> Self {
        Self::RenderThreadStopped
    }
}

/// Health of the render side as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeStatus {
    Running,
    /// Rendering hit a fatal error; publishing still works but nothing draws.
    Unavailable(String),
    /// Disposed by the host.
    Stopped,
}

/// A running waveform scope.
///
/// Audio threads publish through [`stage`](Self::stage) (or [`sink`](Self::sink));
/// a dedicated render thread owns the GPU objects and draws the latest block.
pub struct WaveformScope {
    stage: Arc<WaveformStage>,
    dispatcher: RenderDispatcher,
    status: Arc<Mutex<ScopeStatus>>,
    thread: Option<JoinHandle<()>>,
    front: Option<FrontBuffer>,
}

impl WaveformScope {
    /// Start a scope rendering through the backend built by `make_backend`.
    ///
    /// The backend is constructed on the render thread and never leaves it.
    /// Returns once the device and initial surface exist.
    pub fn start<B, F>(config: ScopeConfig, make_backend: F) -> Result<Self, ScopeError>
    where
        B: GpuBackend + 'static,
        F: FnOnce() -> B + Send + 'static,
    {
        config.validate()?;

        let (dispatcher, queue) = render::channel(config.queue_capacity);
        let stage = Arc::new(WaveformStage::new(Box::new(dispatcher.clone())));
        let status = Arc::new(Mutex::new(ScopeStatus::Running));
        let (init_tx, init_rx) = crossbeam::channel::bounded(1);

        let thread_stage = stage.clone();
        let thread_status = status.clone();
        let handle = thread::Builder::new()
            .name("waveform-render".to_string())
            .spawn(move || {
                let compositor = match SurfaceCompositor::new(
                    make_backend(),
                    &config.feature_levels,
                    config.width,
                    config.height,
                    config.stroke_style(),
                ) {
                    Ok(compositor) => compositor,
                    Err(err) => {
                        let _ = init_tx.send(Err(err));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));

                let mut view = WaveformView::new(compositor, thread_stage, config.background_rgba());
                render_loop(&queue, &mut view, &thread_status);
                view.dispose();
                log::debug!("Render thread exiting after {} passes", view.passes());
            })?;

        match init_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(ScopeError::Init(err));
            }
            Err(_) => {
                let _ = handle.join();
                return Err(ScopeError::RenderThreadStopped);
            }
        }

        log::info!("Waveform scope started");
        // Show baselines before the first block arrives.
        dispatcher.notify_frame_ready();

        Ok(Self {
            stage,
            dispatcher,
            status,
            thread: Some(handle),
            front: None,
        })
    }

    /// Start a scope on the headless wgpu backend.
    pub fn start_wgpu(config: ScopeConfig) -> Result<Self, ScopeError> {
        let front = FrontBuffer::default();
        let backend_front = front.clone();
        let mut scope = Self::start(config, move || WgpuBackend::with_front_buffer(backend_front))?;
        scope.front = Some(front);
        Ok(scope)
    }

    pub fn stage(&self) -> &Arc<WaveformStage> {
        &self.stage
    }

    /// Audio-side handle restricted to the sink operations.
    pub fn sink(&self) -> Arc<dyn WaveformSink> {
        self.stage.clone()
    }

    pub fn publish(&self, block: SampleBlock) {
        self.stage.publish(block);
    }

    pub fn set_encoding(&self, encoding: EncodingDescriptor) {
        self.stage.set_encoding(encoding);
    }

    /// Queue a surface resize; the render thread redraws at the new size.
    pub fn resize(&self, width: u32, height: u32) -> Result<(), ScopeError> {
        self.dispatcher.request_resize(width, height)?;
        Ok(())
    }

    pub fn status(&self) -> ScopeStatus {
        lock_status(&self.status).clone()
    }

    /// Displayed frames, when running on the wgpu backend.
    pub fn front_buffer(&self) -> Option<&FrontBuffer> {
        self.front.as_ref()
    }

    /// Stop the render thread and release the GPU objects. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        let Some(handle) = self.thread.take() else {
            return;
        };
        // Fails only if the render thread already stopped.
        let _ = self.dispatcher.shutdown();
        let joined = handle.join();

        let mut status = lock_status(&self.status);
        if joined.is_err() {
            log::error!("Render thread panicked");
            *status = ScopeStatus::Unavailable(String::from("render thread panicked"));
        } else if *status == ScopeStatus::Running {
            *status = ScopeStatus::Stopped;
        }
        log::info!("Waveform scope disposed");
    }
}

impl Drop for WaveformScope {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn render_loop<B: GpuBackend>(
    queue: &RenderQueue,
    view: &mut WaveformView<B>,
    status: &Mutex<ScopeStatus>,
) {
    while let Some(command) = queue.recv() {
        let result = match command {
            RenderCommand::Render => queue.run_coalesced(|| view.render_pass()).map(|passes| {
                if passes > 1 {
                    log::trace!("Coalesced render ran {} passes", passes);
                }
            }),
            RenderCommand::Resize { width, height } => view.resize(width, height),
            RenderCommand::Shutdown => break,
        };

        if let Err(err) = result {
            log::error!("Rendering stopped: {}", err);
            *lock_status(status) = ScopeStatus::Unavailable(err.to_string());
            break;
        }
    }
}

fn lock_status(status: &Mutex<ScopeStatus>) -> MutexGuard<'_, ScopeStatus> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}
