//! Coalescing hand-off of "frame ready" signals to the render thread.
//!
//! A burst of notifications while a pass is queued collapses into that
//! pass; a burst while a pass is running collapses into at most one more.
//! The pass always reads the stage's latest block, so skipped signals only
//! ever drop stale frames.

use crate::audio::FrameReadyNotify;
use crossbeam::channel::{self, Receiver, Sender};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const IDLE: u8 = 0;
const SCHEDULED: u8 = 1;
const IN_FLIGHT: u8 = 2;
const IN_FLIGHT_PENDING: u8 = 3;

/// Commands handled on the render thread, in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCommand {
    /// Run a render pass against the latest pending frame.
    Render,
    /// Replace the surface with one of the given size and redraw.
    Resize { width: u32, height: u32 },
    /// Stop the render loop.
    Shutdown,
}

/// Scheduling state as seen by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Scheduled,
    InFlight,
    InFlightPending,
}

impl DispatchState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            SCHEDULED => Self::Scheduled,
            IN_FLIGHT => Self::InFlight,
            IN_FLIGHT_PENDING => Self::InFlightPending,
            _ => Self::Idle,
        }
    }
}

/// Errors returned to the host when the render thread is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Render thread has stopped")]
    Disconnected,
}

/// Producer-side handle. Cheap to clone; never blocks on `notify_frame_ready`.
#[derive(Clone)]
pub struct RenderDispatcher {
    state: Arc<AtomicU8>,
    tx: Sender<RenderCommand>,
}

/// Render-thread side of the dispatcher.
pub struct RenderQueue {
    state: Arc<AtomicU8>,
    rx: Receiver<RenderCommand>,
}

/// Create a connected dispatcher/queue pair.
///
/// `capacity` bounds the number of queued commands; render requests never
/// occupy more than one slot.
pub fn channel(capacity: usize) -> (RenderDispatcher, RenderQueue) {
    let (tx, rx) = channel::bounded(capacity.max(2));
    let state = Arc::new(AtomicU8::new(IDLE));
    (
        RenderDispatcher {
            state: state.clone(),
            tx,
        },
        RenderQueue { state, rx },
    )
}

impl RenderDispatcher {
    /// Schedule a render pass unless one is already scheduled or pending.
    pub fn notify_frame_ready(&self) {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next = match current {
                IDLE => SCHEDULED,
                IN_FLIGHT => IN_FLIGHT_PENDING,
                _ => return,
            };
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if current == IDLE && self.tx.try_send(RenderCommand::Render).is_err() {
            // Queue is busy with resizes (which redraw anyway) or the render
            // thread is gone; let the next signal try again.
            let _ =
                self.state
                    .compare_exchange(SCHEDULED, IDLE, Ordering::AcqRel, Ordering::Acquire);
        }
    }

    /// Queue a resize. Blocks only if the command queue is full.
    pub fn request_resize(&self, width: u32, height: u32) -> Result<(), DispatchError> {
        self.tx
            .send(RenderCommand::Resize { width, height })
            .map_err(|_| DispatchError::Disconnected)
    }

    /// Ask the render loop to stop.
    pub fn shutdown(&self) -> Result<(), DispatchError> {
        self.tx
            .send(RenderCommand::Shutdown)
            .map_err(|_| DispatchError::Disconnected)
    }

    pub fn state(&self) -> DispatchState {
        DispatchState::from_raw(self.state.load(Ordering::Acquire))
    }
}

impl FrameReadyNotify for RenderDispatcher {
    fn notify_frame_ready(&self) {
        RenderDispatcher::notify_frame_ready(self);
    }
}

impl RenderQueue {
    /// Block until the next command; `None` once every dispatcher is dropped.
    pub fn recv(&self) -> Option<RenderCommand> {
        self.rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<RenderCommand> {
        self.rx.try_recv().ok()
    }

    /// Run `pass` for a dequeued [`RenderCommand::Render`], re-running it once
    /// more for every window in which new frames arrived during the pass.
    ///
    /// Stops at the first error and leaves the dispatcher idle.
    pub fn run_coalesced<E>(&self, mut pass: impl FnMut() -> Result<(), E>) -> Result<u32, E> {
        self.state.store(IN_FLIGHT, Ordering::Release);
        let mut passes = 0;
        loop {
            passes += 1;
            if let Err(err) = pass() {
                self.state.store(IDLE, Ordering::Release);
                return Err(err);
            }
            match self
                .state
                .compare_exchange(IN_FLIGHT, IDLE, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Ok(passes),
                Err(_) => {
                    // IN_FLIGHT_PENDING: frames arrived mid-pass.
                    self.state.store(IN_FLIGHT, Ordering::Release);
                }
            }
        }
    }

    pub fn state(&self) -> DispatchState {
        DispatchState::from_raw(self.state.load(Ordering::Acquire))
    }
}
