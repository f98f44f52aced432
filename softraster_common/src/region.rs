// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip regions as unions of device-space rectangles.

use crate::snap::Polygon;
use peniko::kurbo::{Point, Rect};
use smallvec::SmallVec;

/// A clip region: the union of a set of axis-aligned rectangles.
///
/// The common case is a single rectangle, which is stored inline. An empty
/// region clips everything away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    rects: SmallVec<[Rect; 1]>,
}

impl Region {
    /// The region covering a single rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::from_rects([rect])
    }

    /// The region covering the union of `rects`. Degenerate rectangles are
    /// dropped.
    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        Self {
            rects: rects
                .into_iter()
                .filter(|r| r.width() > 0.0 && r.height() > 0.0)
                .collect(),
        }
    }

    /// A conservative region for a polygon clip: its device-space bounds
    /// rounded out to whole pixels.
    pub fn from_polygon(polygon: &Polygon) -> Self {
        match polygon.bounding_box() {
            Some(bounds) => Self::from_rect(Rect::new(
                bounds.x0.floor(),
                bounds.y0.floor(),
                bounds.x1.ceil(),
                bounds.y1.ceil(),
            )),
            None => Self::default(),
        }
    }

    /// Whether the region clips everything away.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// The rectangles making up the region.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// The bounding rectangle of the region, or `None` when empty.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut rects = self.rects.iter();
        let first = *rects.next()?;
        Some(rects.fold(first, |acc, r| acc.union(*r)))
    }

    /// Whether `point` lies inside the region.
    pub fn contains(&self, point: Point) -> bool {
        self.rects.iter().any(|r| r.contains(point))
    }

    /// The intersection of two regions.
    pub fn intersect(&self, other: &Region) -> Region {
        let mut rects = SmallVec::new();
        for a in &self.rects {
            for b in &other.rects {
                let r = a.intersect(*b);
                if r.width() > 0.0 && r.height() > 0.0 {
                    rects.push(r);
                }
            }
        }
        Region { rects }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_rects_are_dropped() {
        let region = Region::from_rects([
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(5.0, 5.0, 5.0, 20.0),
        ]);
        assert_eq!(region.rects().len(), 1);
        assert!(Region::from_rect(Rect::ZERO).is_empty());
    }

    #[test]
    fn bounding_box_unions_all_rects() {
        let region = Region::from_rects([
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(20.0, 5.0, 30.0, 25.0),
        ]);
        assert_eq!(region.bounding_box(), Some(Rect::new(0.0, 0.0, 30.0, 25.0)));
        assert_eq!(Region::default().bounding_box(), None);
    }

    #[test]
    fn contains_checks_every_rect() {
        let region = Region::from_rects([
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(20.0, 0.0, 30.0, 10.0),
        ]);
        assert!(region.contains(Point::new(5.0, 5.0)));
        assert!(region.contains(Point::new(25.0, 5.0)));
        assert!(!region.contains(Point::new(15.0, 5.0)));
    }

    #[test]
    fn intersect_keeps_overlap_only() {
        let a = Region::from_rect(Rect::new(0.0, 0.0, 20.0, 20.0));
        let b = Region::from_rect(Rect::new(10.0, 10.0, 30.0, 30.0));
        let both = a.intersect(&b);
        assert_eq!(both.rects(), &[Rect::new(10.0, 10.0, 20.0, 20.0)]);

        let disjoint = Region::from_rect(Rect::new(40.0, 40.0, 50.0, 50.0));
        assert!(a.intersect(&disjoint).is_empty());
    }

    #[test]
    fn polygon_regions_are_conservative_bounds() {
        let polygon = Polygon::new(
            vec![
                Point::new(1.2, 2.8),
                Point::new(8.9, 2.8),
                Point::new(5.0, 7.5),
            ],
            true,
        );
        let region = Region::from_polygon(&polygon);
        assert_eq!(region.rects(), &[Rect::new(1.0, 2.0, 9.0, 8.0)]);
    }
}
