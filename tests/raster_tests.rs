//! Rasterization properties and end-to-end line placement.

mod common;

use common::RecordingBackend;
use phobz_scope::audio::{impulse_block, noise_block, silence_block, sine_block};
use phobz_scope::render::{FeatureLevel, StrokeStyle, SurfaceCompositor};
use phobz_scope::{rasterize, rasterize_baseline, EncodingDescriptor, SampleBlock};

#[test]
fn test_rasterize_is_deterministic() {
    let block = noise_block(EncodingDescriptor::stereo(44100), 512, 0.9, 7);
    let a = rasterize(&block, 300, 120);
    let b = rasterize(&block, 300, 120);
    assert_eq!(a, b);
}

#[test]
fn test_segment_count_formula() {
    let cases = [
        (1u16, 256usize, 256u32),
        (2, 100, 640),
        (2, 1000, 640),
        (6, 10, 3),
        (1, 0, 100),
    ];
    for (channels, frames, width) in cases {
        let block = silence_block(EncodingDescriptor::new(48000, channels), frames);
        let segments = rasterize(&block, width, 100);
        let expected = channels as usize * (frames.min(width as usize) + 1);
        assert_eq!(
            segments.len(),
            expected,
            "{} channels, {} frames, width {}",
            channels,
            frames,
            width
        );
    }
}

#[test]
fn test_silence_renders_flat_line_at_midpoint() {
    let block = silence_block(EncodingDescriptor::mono(48000), 256);
    let segments = rasterize(&block, 256, 100);

    assert_eq!(segments.len(), 257);
    for segment in segments.iter().filter(|s| !s.is_baseline()) {
        assert_eq!(segment.start[1], 50.0);
        assert_eq!(segment.end[1], 50.0);
    }
    let baseline = segments.last().unwrap();
    assert!(baseline.is_baseline());
    assert_eq!(baseline.start, [0.0, 50.0]);
    assert_eq!(baseline.end, [256.0, 50.0]);
}

#[test]
fn test_full_scale_sample_peaks_at_top() {
    let block = impulse_block(EncodingDescriptor::mono(48000), 256, 17, 1.0);
    let segments = rasterize(&block, 256, 100);

    let peak = segments
        .iter()
        .find(|s| !s.is_baseline() && s.start[0] == 17.0)
        .unwrap();
    assert_eq!(peak.start[1], 50.0);
    assert_eq!(peak.end[1], 0.0);

    let neighbour = segments
        .iter()
        .find(|s| !s.is_baseline() && s.start[0] == 18.0)
        .unwrap();
    assert_eq!(neighbour.end[1], 50.0);
}

#[test]
fn test_channels_stay_inside_their_bands() {
    let block = sine_block(220.0, EncodingDescriptor::new(48000, 4), 400, 1.0);
    let segments = rasterize(&block, 400, 200);
    for segment in segments.iter().filter(|s| !s.is_baseline()) {
        let top = segment.channel as f32 * 50.0;
        let bottom = top + 50.0;
        assert!(segment.end[1] >= top - 1e-3 && segment.end[1] <= bottom + 1e-3);
    }
}

#[test]
fn test_excess_frames_are_truncated() {
    let samples: Vec<f32> = (0..20).map(|i| if i < 10 { 0.0 } else { 1.0 }).collect();
    let block = SampleBlock::new(samples, 1, 48000).unwrap();
    let segments = rasterize(&block, 10, 100);
    // Only the first 10 (silent) frames are drawn.
    assert!(segments
        .iter()
        .filter(|s| !s.is_baseline())
        .all(|s| s.end[1] == 50.0));
}

#[test]
fn test_baseline_without_data() {
    let segments = rasterize_baseline(2, 256, 100);
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].start[1], 25.0);
    assert_eq!(segments[1].start[1], 75.0);
}

#[test]
fn test_end_to_end_through_compositor() {
    let (backend, probe) = RecordingBackend::new();
    let mut compositor = SurfaceCompositor::new(
        backend,
        FeatureLevel::descending(),
        256,
        100,
        StrokeStyle::default(),
    )
    .unwrap();

    let block = impulse_block(EncodingDescriptor::mono(48000), 256, 0, 1.0);
    let segments = rasterize(&block, 256, 100);
    compositor.draw_frame(&segments, [0.0, 0.0, 0.0, 1.0]).unwrap();

    let frame = probe.last_frame().unwrap();
    assert_eq!((frame.width, frame.height), (256, 100));
    assert_eq!(frame.clear, [0.0, 0.0, 0.0, 1.0]);
    assert_eq!(frame.strokes.len(), 257);

    let style = StrokeStyle::default();
    let (first, color) = frame.strokes[0];
    assert_eq!(first.end[1], 0.0);
    assert_eq!(color, style.waveform);

    let (baseline, color) = frame.strokes[256];
    assert!(baseline.is_baseline());
    assert_eq!(baseline.start[1], 50.0);
    assert_eq!(color, style.baseline);
}
