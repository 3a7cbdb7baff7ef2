//! Shared fixtures: a recording, fault-injecting render backend.

#![allow(dead_code)]

use phobz_scope::render::{BackendError, FeatureLevel, GpuBackend, Rgba};
use phobz_scope::LineSegment;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// A presented frame as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub device: u32,
    pub width: u32,
    pub height: u32,
    pub clear: Rgba,
    pub strokes: Vec<(LineSegment, Rgba)>,
}

impl Frame {
    pub fn waveform(&self) -> impl Iterator<Item = &LineSegment> {
        self.strokes
            .iter()
            .map(|(segment, _)| segment)
            .filter(|s| !s.is_baseline())
    }

    pub fn baselines(&self) -> impl Iterator<Item = &LineSegment> {
        self.strokes
            .iter()
            .map(|(segment, _)| segment)
            .filter(|s| s.is_baseline())
    }
}

#[derive(Debug, Default)]
pub struct ProbeState {
    pub frames: Vec<Frame>,
    pub devices_created: u32,
    pub surfaces_created: Vec<(u32, u32, u32)>,
    pub begun: u32,
    pub abandoned: u32,
    /// Levels that refuse to create a device.
    pub unsupported: Vec<FeatureLevel>,
    /// Upcoming `begin_draw` calls that report device loss.
    pub lose_on_begin: u32,
    /// Upcoming `end_draw` calls that report device loss.
    pub lose_on_end: u32,
    /// Every stroke fails with a non-loss error.
    pub fail_strokes: bool,
}

/// Test-side view of a [`RecordingBackend`], usable from any thread.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    state: Arc<Mutex<ProbeState>>,
    live_devices: Arc<AtomicI64>,
    live_surfaces: Arc<AtomicI64>,
}

impl Probe {
    pub fn state(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap()
    }

    pub fn frames(&self) -> Vec<Frame> {
        self.state().frames.clone()
    }

    pub fn frame_count(&self) -> usize {
        self.state().frames.len()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.state().frames.last().cloned()
    }

    pub fn live_devices(&self) -> i64 {
        self.live_devices.load(Ordering::SeqCst)
    }

    pub fn live_surfaces(&self) -> i64 {
        self.live_surfaces.load(Ordering::SeqCst)
    }

    pub fn lose_next_draws(&self, count: u32) {
        self.state().lose_on_begin = count;
    }
}

pub struct MockDevice {
    pub id: u32,
    live: Arc<AtomicI64>,
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockSurface {
    pub device: u32,
    pub width: u32,
    pub height: u32,
    live: Arc<AtomicI64>,
}

impl Drop for MockSurface {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockDraw {
    device: u32,
    width: u32,
    height: u32,
    clear: Rgba,
    strokes: Vec<(LineSegment, Rgba)>,
}

#[derive(Default)]
pub struct RecordingBackend {
    probe: Probe,
}

impl RecordingBackend {
    pub fn new() -> (Self, Probe) {
        let probe = Probe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }

    pub fn with_probe(probe: &Probe) -> Self {
        Self {
            probe: probe.clone(),
        }
    }
}

impl GpuBackend for RecordingBackend {
    type Device = MockDevice;
    type Surface = MockSurface;
    type Draw = MockDraw;

    fn create_device(&mut self, level: FeatureLevel) -> Result<MockDevice, BackendError> {
        let mut state = self.probe.state();
        if state.unsupported.contains(&level) {
            return Err(BackendError::Unsupported(level));
        }
        state.devices_created += 1;
        self.probe.live_devices.fetch_add(1, Ordering::SeqCst);
        Ok(MockDevice {
            id: state.devices_created,
            live: self.probe.live_devices.clone(),
        })
    }

    fn create_surface(
        &mut self,
        device: &MockDevice,
        width: u32,
        height: u32,
    ) -> Result<MockSurface, BackendError> {
        self.probe
            .state()
            .surfaces_created
            .push((device.id, width, height));
        self.probe.live_surfaces.fetch_add(1, Ordering::SeqCst);
        Ok(MockSurface {
            device: device.id,
            width,
            height,
            live: self.probe.live_surfaces.clone(),
        })
    }

    fn begin_draw(
        &mut self,
        device: &MockDevice,
        surface: &MockSurface,
    ) -> Result<MockDraw, BackendError> {
        assert_eq!(device.id, surface.device, "surface bound to another device");
        let mut state = self.probe.state();
        if state.lose_on_begin > 0 {
            state.lose_on_begin -= 1;
            return Err(BackendError::DeviceLost(String::from("device removed")));
        }
        state.begun += 1;
        Ok(MockDraw {
            device: device.id,
            width: surface.width,
            height: surface.height,
            clear: [0.0; 4],
            strokes: Vec::new(),
        })
    }

    fn clear(&mut self, draw: &mut MockDraw, color: Rgba) {
        draw.clear = color;
    }

    fn stroke(
        &mut self,
        draw: &mut MockDraw,
        segment: &LineSegment,
        color: Rgba,
        _line_width: f32,
    ) -> Result<(), BackendError> {
        if self.probe.state().fail_strokes {
            return Err(BackendError::Draw(String::from("stroke rejected")));
        }
        draw.strokes.push((*segment, color));
        Ok(())
    }

    fn end_draw(
        &mut self,
        _device: &MockDevice,
        _surface: &MockSurface,
        draw: MockDraw,
    ) -> Result<(), BackendError> {
        let mut state = self.probe.state();
        if state.lose_on_end > 0 {
            state.lose_on_end -= 1;
            return Err(BackendError::DeviceLost(String::from("device reset")));
        }
        state.frames.push(Frame {
            device: draw.device,
            width: draw.width,
            height: draw.height,
            clear: draw.clear,
            strokes: draw.strokes,
        });
        Ok(())
    }

    fn abandon_draw(&mut self, _draw: MockDraw) {
        self.probe.state().abandoned += 1;
    }

    fn describe(&self, device: &MockDevice) -> String {
        format!("mock device #{}", device.id)
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
