// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Polygons and pixel snapping for path construction.

use peniko::kurbo::{Affine, Point, Rect};

/// A polygon: an ordered point list plus a closed flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    points: Vec<Point>,
    closed: bool,
}

impl Polygon {
    /// Create a polygon from its vertices.
    pub fn new(points: Vec<Point>, closed: bool) -> Self {
        Self { points, closed }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the last vertex connects back to the first.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The vertex at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn point(&self, index: usize) -> Point {
        self.points[index]
    }

    /// All vertices in order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The axis-aligned bounds of the vertices, or `None` when empty.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut points = self.points.iter();
        let first = *points.next()?;
        let seed = Rect::new(first.x, first.y, first.x, first.y);
        Some(points.fold(seed, |acc, p| {
            Rect::new(
                acc.x0.min(p.x),
                acc.y0.min(p.y),
                acc.x1.max(p.x),
                acc.y1.max(p.y),
            )
        }))
    }
}

/// Snap a polygon vertex to the device pixel grid.
///
/// The vertex is transformed to device space; a coordinate is snapped to its
/// rounded value only when the edge to the previous or next vertex becomes
/// axis-aligned after rounding. This keeps near-axis-aligned edges from
/// blurring under antialiasing without disturbing diagonal geometry.
/// Neighbour lookup wraps around the point list.
///
/// Returns the device-space point.
pub fn snap_to_pixel(polygon: &Polygon, index: usize, object_to_device: &Affine) -> Point {
    let count = polygon.len();
    let round = |p: Point| Point::new(p.x.round(), p.y.round());

    let prev = round(*object_to_device * polygon.point((index + count - 1) % count));
    let curr = *object_to_device * polygon.point(index);
    let curr_rounded = round(curr);
    let next = round(*object_to_device * polygon.point((index + 1) % count));

    let snap_x = prev.x == curr_rounded.x || next.x == curr_rounded.x;
    let snap_y = prev.y == curr_rounded.y || next.y == curr_rounded.y;

    Point::new(
        if snap_x { curr_rounded.x } else { curr.x },
        if snap_y { curr_rounded.y } else { curr.y },
    )
}
