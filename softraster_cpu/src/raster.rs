// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scanline rasterization into 32-bit surfaces.
//!
//! Paths are flattened to line segments and filled with the nonzero winding
//! rule. Antialiasing samples four sub-scanlines per row and accumulates
//! fractional coverage at span ends; without it, rows are sampled once at
//! the pixel center. Draw targets are always 32-bit; 24-bit and 1-bit
//! buffers act as sources only.

use peniko::kurbo::{flatten, BezPath, PathEl, Point, Rect, Shape};
use softraster_common::convert::channel;
use softraster_common::region::Region;

use crate::surface::{Surface, SurfaceFormat};

const FLATTEN_TOLERANCE: f64 = 0.25;

/// The compositing rule applied when writing pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    /// Source-over alpha blend, the default.
    Over,
    /// Bitwise complement of the destination RGB against the source color;
    /// applying the same paint twice restores the original pixels.
    Xor,
}

/// An unpremultiplied RGBA source color with components in `0..=1`.
pub(crate) type SourceColor = [f64; 4];

/// A monotonic (in y) line segment with its winding direction.
struct Segment {
    top: Point,
    bottom: Point,
    direction: i32,
}

fn push_segment(segments: &mut Vec<Segment>, from: Point, to: Point) {
    if from.y == to.y {
        return;
    }
    if from.y < to.y {
        segments.push(Segment {
            top: from,
            bottom: to,
            direction: 1,
        });
    } else {
        segments.push(Segment {
            top: to,
            bottom: from,
            direction: -1,
        });
    }
}

fn collect_segments(path: &BezPath) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut start = Point::ZERO;
    let mut last = Point::ZERO;
    flatten(
        path.elements().iter().copied(),
        FLATTEN_TOLERANCE,
        |element| match element {
            PathEl::MoveTo(p) => {
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                push_segment(&mut segments, last, p);
                last = p;
            }
            PathEl::ClosePath => {
                push_segment(&mut segments, last, start);
                last = start;
            }
            // flattening emits no curves
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {
                debug_assert!(false, "flatten produced a curve element");
            }
        },
    );
    segments
}

/// Fill `path` into `surface` with the nonzero winding rule.
///
/// Returns the damage extents actually paintable: the path bounds clipped to
/// the surface and clip region, or [`Rect::ZERO`] when nothing can be
/// painted.
pub(crate) fn fill_path(
    surface: &mut Surface,
    path: &BezPath,
    source: SourceColor,
    operator: Operator,
    clip: Option<&Region>,
    anti_alias: bool,
) -> Rect {
    debug_assert_eq!(
        surface.format(),
        SurfaceFormat::Argb32,
        "draw targets must be 32-bit surfaces"
    );
    if surface.format() != SurfaceFormat::Argb32 {
        return Rect::ZERO;
    }

    let surface_rect = Rect::new(0.0, 0.0, f64::from(surface.width()), f64::from(surface.height()));
    let mut bounds = path.bounding_box().intersect(surface_rect);
    if let Some(region) = clip {
        bounds = match region.bounding_box() {
            Some(clip_box) => bounds.intersect(clip_box),
            None => return Rect::ZERO,
        };
    }
    if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return Rect::ZERO;
    }

    let segments = collect_segments(path);
    if segments.is_empty() {
        return Rect::ZERO;
    }

    let x_start = bounds.x0.floor() as i64;
    let x_end = bounds.x1.ceil() as i64;
    let y_start = bounds.y0.floor() as i64;
    let y_end = bounds.y1.ceil() as i64;
    let row_len = (x_end - x_start) as usize;

    let samples = if anti_alias { 4 } else { 1 };
    let weight = 1.0 / samples as f32;
    let mut coverage = vec![0.0_f32; row_len];
    let mut crossings: Vec<(f64, i32)> = Vec::new();

    for y in y_start..y_end {
        coverage.fill(0.0);
        for sample in 0..samples {
            let yc = y as f64 + (sample as f64 + 0.5) / samples as f64;
            crossings.clear();
            for segment in &segments {
                if segment.top.y <= yc && yc < segment.bottom.y {
                    let t = (yc - segment.top.y) / (segment.bottom.y - segment.top.y);
                    let x = segment.top.x + t * (segment.bottom.x - segment.top.x);
                    crossings.push((x, segment.direction));
                }
            }
            crossings.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                winding += pair[0].1;
                if winding != 0 {
                    add_span(&mut coverage, x_start, pair[0].0, pair[1].0, weight);
                }
            }
        }

        let row = surface.buffer_mut().row_mut(y as u32);
        for (index, &cover) in coverage.iter().enumerate() {
            if cover <= 0.0 {
                continue;
            }
            let x = x_start + index as i64;
            if let Some(region) = clip {
                if !region.contains(Point::new(x as f64 + 0.5, y as f64 + 0.5)) {
                    continue;
                }
            }
            blend_pixel(row, x as usize, source, cover.min(1.0), operator);
        }
    }

    bounds
}

/// Accumulate coverage for the span `[x0, x1)` into a scanline buffer that
/// starts at pixel `x_offset`.
fn add_span(coverage: &mut [f32], x_offset: i64, x0: f64, x1: f64, weight: f32) {
    let left = x0.max(x_offset as f64);
    let right = x1.min(x_offset as f64 + coverage.len() as f64);
    if right <= left {
        return;
    }
    let first = left.floor() as i64;
    let last = right.ceil() as i64 - 1;
    for px in first..=last {
        let lo = left.max(px as f64);
        let hi = right.min(px as f64 + 1.0);
        coverage[(px - x_offset) as usize] += (hi - lo) as f32 * weight;
    }
}

fn blend_pixel(row: &mut [u8], x: usize, source: SourceColor, coverage: f32, operator: Operator) {
    let pixel = &mut row[x * 4..x * 4 + 4];
    match operator {
        Operator::Over => {
            let alpha = (source[3] * f64::from(coverage)).clamp(0.0, 1.0);
            let mix = |dst: u8, src: f64| -> u8 {
                (f64::from(dst) * (1.0 - alpha) + src * 255.0 * alpha + 0.5) as u8
            };
            pixel[channel::RED] = mix(pixel[channel::RED], source[0]);
            pixel[channel::GREEN] = mix(pixel[channel::GREEN], source[1]);
            pixel[channel::BLUE] = mix(pixel[channel::BLUE], source[2]);
            pixel[channel::ALPHA] = mix(pixel[channel::ALPHA], 1.0);
        }
        Operator::Xor => {
            // applied on full coverage only, so the operation stays
            // self-inverse
            if coverage >= 0.5 {
                pixel[channel::RED] ^= (source[0] * 255.0 + 0.5) as u8;
                pixel[channel::GREEN] ^= (source[1] * 255.0 + 0.5) as u8;
                pixel[channel::BLUE] ^= (source[2] * 255.0 + 0.5) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use softraster_common::buffer::{BitDepth, RasterBuffer};

    fn argb_surface(width: u32, height: u32) -> Surface {
        Surface::new(RasterBuffer::allocate(width, height, BitDepth::Argb32).unwrap())
    }

    fn rect_path(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
        Rect::new(x0, y0, x1, y1).to_path(0.1)
    }

    #[test]
    fn fills_an_axis_aligned_rect() {
        let mut surface = argb_surface(8, 8);
        let red = [1.0, 0.0, 0.0, 1.0];
        let damage = fill_path(
            &mut surface,
            &rect_path(2.0, 2.0, 6.0, 6.0),
            red,
            Operator::Over,
            None,
            false,
        );
        assert_eq!(damage, Rect::new(2.0, 2.0, 6.0, 6.0));

        let row = surface.buffer().row(3);
        assert_eq!(row[3 * 4 + channel::RED], 255);
        assert_eq!(row[3 * 4 + channel::ALPHA], 255);
        // outside the rect nothing is painted
        assert_eq!(row[4 + channel::RED], 0);
        let row_outside = surface.buffer().row(7);
        assert_eq!(row_outside[3 * 4 + channel::RED], 0);
    }

    #[test]
    fn clip_region_limits_painting_and_damage() {
        let mut surface = argb_surface(8, 8);
        let clip = Region::from_rect(Rect::new(0.0, 0.0, 4.0, 8.0));
        let white = [1.0, 1.0, 1.0, 1.0];
        let damage = fill_path(
            &mut surface,
            &rect_path(0.0, 0.0, 8.0, 8.0),
            white,
            Operator::Over,
            Some(&clip),
            false,
        );
        assert_eq!(damage, Rect::new(0.0, 0.0, 4.0, 8.0));
        let row = surface.buffer().row(2);
        assert_eq!(row[2 * 4 + channel::RED], 255);
        assert_eq!(row[5 * 4 + channel::RED], 0);
    }

    #[test]
    fn xor_twice_restores_pixels() {
        let mut surface = argb_surface(8, 8);
        let green = [0.0, 1.0, 0.0, 1.0];
        let path = rect_path(1.0, 1.0, 7.0, 7.0);
        fill_path(&mut surface, &path, green, Operator::Xor, None, false);
        assert_eq!(surface.buffer().row(3)[3 * 4 + channel::GREEN], 255);
        fill_path(&mut surface, &path, green, Operator::Xor, None, false);
        assert!(surface.buffer().bits().iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_clip_paints_nothing() {
        let mut surface = argb_surface(8, 8);
        let clip = Region::default();
        let damage = fill_path(
            &mut surface,
            &rect_path(0.0, 0.0, 8.0, 8.0),
            [1.0, 1.0, 1.0, 1.0],
            Operator::Over,
            Some(&clip),
            false,
        );
        assert_eq!(damage, Rect::ZERO);
        assert!(surface.buffer().bits().iter().all(|&b| b == 0));
    }
}
