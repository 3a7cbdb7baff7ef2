//! Single-slot hand-off between the audio callback and the render thread.
//!
//! The audio side only ever performs one short mutex-guarded swap per block.
//! Blocks are latest-wins: a new block replaces an undrawn one, it never
//! queues behind it.

use super::block::{BlockError, EncodingDescriptor, SampleBlock};
use crossbeam::atomic::AtomicCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Receiver of "a new frame is ready" signals.
///
/// Implementations are called from the audio thread and must not block.
pub trait FrameReadyNotify: Send + Sync {
    fn notify_frame_ready(&self);
}

/// Capability handed to the audio-processing stage where the pipeline is
/// assembled.
pub trait WaveformSink: Send + Sync {
    /// Announce the stream format. Called before the first block and again
    /// whenever a new source is loaded.
    fn set_encoding(&self, encoding: EncodingDescriptor);

    /// Hand over one callback's worth of interleaved samples.
    ///
    /// Malformed buffers are dropped; the previously pending block is kept.
    fn process_samples(&self, samples: Vec<f32>);
}

/// Thread-safe latest-wins mailbox for [`SampleBlock`]s.
pub struct WaveformStage {
    pending: Mutex<Option<SampleBlock>>,
    encoding: AtomicCell<Option<EncodingDescriptor>>,
    encoding_epoch: AtomicU64,
    published: AtomicU64,
    rejected: AtomicU64,
    notify: Box<dyn FrameReadyNotify>,
}

impl WaveformStage {
    pub fn new(notify: Box<dyn FrameReadyNotify>) -> Self {
        Self {
            pending: Mutex::new(None),
            encoding: AtomicCell::new(None),
            encoding_epoch: AtomicU64::new(0),
            published: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            notify,
        }
    }

    /// Store `block` as the pending frame and signal the render side.
    ///
    /// Audio thread only. Any undrawn block is discarded. A block whose
    /// encoding differs from the announced one is counted as rejected and
    /// dropped, keeping the pending block.
    pub fn publish(&self, block: SampleBlock) {
        if !self.accepts(&block) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let superseded = self.slot().replace(block);
        // Dropped outside the critical section.
        drop(superseded);
        self.published.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_frame_ready();
    }

    /// Validate a raw buffer against the current encoding and publish it.
    pub fn try_publish_samples(&self, samples: Vec<f32>) -> Result<(), BlockError> {
        let result = self
            .encoding
            .load()
            .ok_or(BlockError::NoEncoding)
            .and_then(|encoding| SampleBlock::with_encoding(samples, encoding));

        match result {
            Ok(block) => {
                self.publish(block);
                Ok(())
            }
            Err(err) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Take the pending frame, leaving the slot empty.
    ///
    /// Render thread only. Returns `None` if nothing arrived since the last take.
    pub fn take_latest(&self) -> Option<SampleBlock> {
        self.slot().take()
    }

    /// Whether a block is waiting to be drawn.
    pub fn has_pending(&self) -> bool {
        self.slot().is_some()
    }

    /// Set the stream format. A changed format resets the pipeline.
    pub fn set_encoding(&self, encoding: EncodingDescriptor) {
        if self.encoding.swap(Some(encoding)) == Some(encoding) {
            return;
        }
        let stale = self.slot().take();
        drop(stale);
        self.encoding_epoch.fetch_add(1, Ordering::Release);
        self.notify.notify_frame_ready();
    }

    pub fn encoding(&self) -> Option<EncodingDescriptor> {
        self.encoding.load()
    }

    /// Incremented every time the encoding changes.
    pub fn encoding_epoch(&self) -> u64 {
        self.encoding_epoch.load(Ordering::Acquire)
    }

    /// Whether `block` matches the current encoding. Anything goes before one
    /// has been announced.
    pub fn accepts(&self, block: &SampleBlock) -> bool {
        self.encoding
            .load()
            .map_or(true, |encoding| block.encoding() == encoding)
    }

    /// Channel count of the current stream, 1 before any encoding is known.
    pub fn channel_count(&self) -> u16 {
        self.encoding
            .load()
            .map(|e| e.channel_count.max(1))
            .unwrap_or(1)
    }

    pub fn published_blocks(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn rejected_blocks(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    fn slot(&self) -> MutexGuard<'_, Option<SampleBlock>> {
        // The slot holds a plain value; a panic elsewhere cannot leave it torn.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WaveformSink for WaveformStage {
    fn set_encoding(&self, encoding: EncodingDescriptor) {
        WaveformStage::set_encoding(self, encoding);
    }

    fn process_samples(&self, samples: Vec<f32>) {
        let _ = self.try_publish_samples(samples);
    }
}
