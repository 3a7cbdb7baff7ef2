//! Waveform rasterization.
//!
//! Converts a [`SampleBlock`] into per-channel line segments in pixel space
//! (origin top-left, y down). Each channel owns an equal horizontal band
//! with its baseline at the band's vertical midpoint; sample `i` of a
//! channel is drawn as a vertical stroke in column `x = i` from the baseline
//! to `baseline - sample * band_height / 2`.
//!
//! Frames beyond the target width are truncated, not decimated.

mod tessellate;

pub use tessellate::{tessellate, LineVertex, Tessellator, VERTICES_PER_SEGMENT};

use crate::audio::SampleBlock;

/// What a segment represents; the compositor picks its stroke color from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    Waveform,
    Baseline,
}

/// A line segment in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: [f32; 2],
    pub end: [f32; 2],
    pub channel: u16,
    pub kind: SegmentKind,
}

impl LineSegment {
    pub fn is_baseline(&self) -> bool {
        self.kind == SegmentKind::Baseline
    }
}

/// Vertical layout of one channel's band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelBand {
    /// y of the zero-amplitude line.
    pub baseline: f32,
    /// Distance from the baseline to full scale.
    pub half_height: f32,
}

impl ChannelBand {
    pub fn new(channel: u16, channel_count: u16, target_height: u32) -> Self {
        let channels = channel_count.max(1) as f32;
        let band_height = target_height as f32 / channels;
        Self {
            baseline: band_height * (channel as f32 + 0.5),
            half_height: band_height * 0.5,
        }
    }

    #[inline]
    pub fn y_for(&self, sample: f32) -> f32 {
        self.baseline - sample * self.half_height
    }
}

/// Rasterize a block against a `target_width` x `target_height` surface.
///
/// Emits `channel_count * (min(frame_count, target_width) + 1)` segments:
/// all waveform strokes first, then one baseline per channel so baselines
/// draw on top. Input is assumed to be normalized to `[-1, 1]`.
pub fn rasterize(block: &SampleBlock, target_width: u32, target_height: u32) -> Vec<LineSegment> {
    let channels = block.channel_count().max(1);
    let columns = block.frame_count().min(target_width as usize);
    let bands: Vec<ChannelBand> = (0..channels)
        .map(|c| ChannelBand::new(c, channels, target_height))
        .collect();

    let mut segments = Vec::with_capacity(channels as usize * (columns + 1));

    for frame in 0..columns {
        let x = frame as f32;
        for (channel, band) in bands.iter().enumerate() {
            let sample = block.sample(frame, channel as u16);
            segments.push(LineSegment {
                start: [x, band.baseline],
                end: [x, band.y_for(sample)],
                channel: channel as u16,
                kind: SegmentKind::Waveform,
            });
        }
    }

    push_baselines(&mut segments, &bands, target_width);
    segments
}

/// Baselines only, for when no block has arrived yet.
pub fn rasterize_baseline(channel_count: u16, target_width: u32, target_height: u32) -> Vec<LineSegment> {
    let channels = channel_count.max(1);
    let bands: Vec<ChannelBand> = (0..channels)
        .map(|c| ChannelBand::new(c, channels, target_height))
        .collect();
    let mut segments = Vec::with_capacity(channels as usize);
    push_baselines(&mut segments, &bands, target_width);
    segments
}

fn push_baselines(segments: &mut Vec<LineSegment>, bands: &[ChannelBand], target_width: u32) {
    let width = target_width as f32;
    for (channel, band) in bands.iter().enumerate() {
        segments.push(LineSegment {
            start: [0.0, band.baseline],
            end: [width, band.baseline],
            channel: channel as u16,
            kind: SegmentKind::Baseline,
        });
    }
}
