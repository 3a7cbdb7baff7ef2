//! GPU context initialization and management.

use crate::render::FeatureLevel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wgpu::{Adapter, Device, Instance, Queue};

/// Errors that can occur during GPU operations.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("No suitable GPU adapter found")]
    NoAdapter,
    #[error("Failed to request device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
    #[error("Readback failed: {0}")]
    Readback(String),
}

impl FeatureLevel {
    /// wgpu limits requested for this level.
    pub fn limits(&self) -> wgpu::Limits {
        match self {
            Self::Full => wgpu::Limits::default(),
            Self::Downlevel => wgpu::Limits::downlevel_defaults(),
            Self::WebGl2 => wgpu::Limits::downlevel_webgl2_defaults(),
        }
    }
}

/// GPU context holding device and queue for rendering.
pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Arc<Adapter>,
    pub device: Arc<Device>,
    pub queue: Arc<Queue>,
    level: FeatureLevel,
    lost: Arc<AtomicBool>,
}

impl GpuContext {
    /// Create a headless GPU context whose device is limited to `level`.
    ///
    /// Prefers Metal on macOS and Vulkan elsewhere, falling back to GL.
    pub async fn new(level: FeatureLevel) -> Result<Self, GpuError> {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::METAL | wgpu::Backends::VULKAN | wgpu::Backends::GL,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .map_err(|_| GpuError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("phobz-scope"),
                required_features: wgpu::Features::empty(),
                required_limits: level.limits(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::warn!("GPU device lost ({:?}): {}", reason, message);
            flag.store(true, Ordering::Release);
        });

        Ok(Self {
            instance,
            adapter: Arc::new(adapter),
            device: Arc::new(device),
            queue: Arc::new(queue),
            level,
            lost,
        })
    }

    /// Get info about the GPU adapter.
    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn feature_level(&self) -> FeatureLevel {
        self.level
    }

    /// Whether the device has been removed or reset since creation.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    pub(crate) fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
    }
}
