//! Thick-line tessellation of pixel-space segments into GPU vertices.

use super::LineSegment;

/// Vertex data for the line pipeline.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LineVertex {
    /// Position in normalized device coordinates.
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// Vertices emitted per segment (two triangles).
pub const VERTICES_PER_SEGMENT: usize = 6;

/// Converts pixel-space segments to NDC quads for a target size.
#[derive(Debug, Clone, Copy)]
pub struct Tessellator {
    width: f32,
    height: f32,
}

impl Tessellator {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }

    #[inline]
    fn to_ndc(&self, x: f32, y: f32) -> [f32; 2] {
        [(x / self.width) * 2.0 - 1.0, 1.0 - (y / self.height) * 2.0]
    }

    /// Push a segment as a quad `line_width` pixels thick.
    ///
    /// Zero-length segments become a square dot so silent columns stay visible.
    pub fn push_segment(
        &self,
        vertices: &mut Vec<LineVertex>,
        segment: &LineSegment,
        color: [f32; 4],
        line_width: f32,
    ) {
        let half_width = line_width.max(0.0) * 0.5;
        let [mut x1, y1] = segment.start;
        let [mut x2, y2] = segment.end;

        let mut dx = x2 - x1;
        let mut dy = y2 - y1;
        if (dx * dx + dy * dy) < 1e-6 {
            x1 -= half_width;
            x2 += half_width;
            dx = x2 - x1;
            dy = 0.0;
        }

        // Perpendicular direction for line thickness
        let len = (dx * dx + dy * dy).sqrt().max(0.001);
        let nx = -dy / len * half_width;
        let ny = dx / len * half_width;

        let positions = [
            self.to_ndc(x1 + nx, y1 + ny), // start top
            self.to_ndc(x1 - nx, y1 - ny), // start bottom
            self.to_ndc(x2 + nx, y2 + ny), // end top
            self.to_ndc(x2 - nx, y2 - ny), // end bottom
        ];
        let indices = [0, 1, 2, 2, 1, 3]; // Two triangles

        for &idx in &indices {
            vertices.push(LineVertex {
                position: positions[idx],
                color,
            });
        }
    }
}

/// Tessellate a whole segment list with a per-segment color.
pub fn tessellate(
    segments: &[LineSegment],
    width: u32,
    height: u32,
    line_width: f32,
    color_of: impl Fn(&LineSegment) -> [f32; 4],
) -> Vec<LineVertex> {
    let tessellator = Tessellator::new(width, height);
    let mut vertices = Vec::with_capacity(segments.len() * VERTICES_PER_SEGMENT);
    for segment in segments {
        tessellator.push_segment(&mut vertices, segment, color_of(segment), line_width);
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::SegmentKind;

    const WHITE: [f32; 4] = [1.0; 4];

    fn segment(start: [f32; 2], end: [f32; 2]) -> LineSegment {
        LineSegment {
            start,
            end,
            channel: 0,
            kind: SegmentKind::Waveform,
        }
    }

    #[test]
    fn test_six_vertices_per_segment() {
        let segments = [segment([0.0, 0.0], [10.0, 10.0]), segment([5.0, 5.0], [5.0, 0.0])];
        let vertices = tessellate(&segments, 100, 100, 1.0, |_| WHITE);
        assert_eq!(vertices.len(), 12);
    }

    #[test]
    fn test_corners_map_to_ndc() {
        let baseline = segment([0.0, 50.0], [100.0, 50.0]);
        let vertices = tessellate(&[baseline], 100, 100, 0.0, |_| WHITE);
        let xs: Vec<f32> = vertices.iter().map(|v| v.position[0]).collect();
        assert!(xs.contains(&-1.0));
        assert!(xs.contains(&1.0));
        assert!(vertices.iter().all(|v| v.position[1].abs() < 1e-6));
    }

    #[test]
    fn test_vertical_stroke_has_width() {
        let stroke = segment([50.0, 50.0], [50.0, 0.0]);
        let vertices = tessellate(&[stroke], 100, 100, 2.0, |_| WHITE);
        let min_x = vertices.iter().map(|v| v.position[0]).fold(f32::INFINITY, f32::min);
        let max_x = vertices.iter().map(|v| v.position[0]).fold(f32::NEG_INFINITY, f32::max);
        // 2 px wide on a 100 px target is 0.04 in NDC
        assert!((max_x - min_x - 0.04).abs() < 1e-5);
    }

    #[test]
    fn test_zero_length_segment_becomes_dot() {
        let dot = segment([10.0, 10.0], [10.0, 10.0]);
        let vertices = tessellate(&[dot], 100, 100, 2.0, |_| WHITE);
        let min_x = vertices.iter().map(|v| v.position[0]).fold(f32::INFINITY, f32::min);
        let max_x = vertices.iter().map(|v| v.position[0]).fold(f32::NEG_INFINITY, f32::max);
        let min_y = vertices.iter().map(|v| v.position[1]).fold(f32::INFINITY, f32::min);
        let max_y = vertices.iter().map(|v| v.position[1]).fold(f32::NEG_INFINITY, f32::max);
        assert!(max_x > min_x);
        assert!(max_y > min_y);
    }

    #[test]
    fn test_color_callback_applied() {
        let segments = [
            segment([0.0, 0.0], [1.0, 1.0]),
            LineSegment {
                kind: SegmentKind::Baseline,
                ..segment([0.0, 5.0], [10.0, 5.0])
            },
        ];
        let vertices = tessellate(&segments, 10, 10, 1.0, |s| {
            if s.is_baseline() {
                [1.0, 0.0, 0.0, 1.0]
            } else {
                [0.0, 1.0, 0.0, 1.0]
            }
        });
        assert!(vertices[..6].iter().all(|v| v.color == [0.0, 1.0, 0.0, 1.0]));
        assert!(vertices[6..].iter().all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));
    }
}
