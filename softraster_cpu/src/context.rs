// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drawing-context lifecycle: clip regions, paint state and repaint damage.
//!
//! A [`RasterContext`] holds the durable paint state for a drawable. Drawing
//! happens through a [`DrawContext`] obtained from
//! [`acquire_context`](RasterContext::acquire_context) and returned through
//! [`release_context`](RasterContext::release_context); the accumulated
//! damage extents are reported to a registered [`DamageTracker`] once per
//! release, never once per primitive, which decouples draw-call granularity
//! from repaint-scheduling granularity.

use peniko::color::Rgba8;
use peniko::kurbo::{stroke, Affine, BezPath, Cap, Join, Point, Rect, Stroke, StrokeOpts, Vec2};
use softraster_common::region::Region;
use softraster_common::snap::{snap_to_pixel, Polygon};

use crate::raster::{fill_path, Operator, SourceColor};
use crate::surface::Surface;

const STROKE_TOLERANCE: f64 = 0.25;

/// The compositing rule requested for painting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaintMode {
    /// Source-over alpha blending.
    #[default]
    Over,
    /// Exclusive-or painting, used for rubber-band style invert feedback.
    Xor,
}

/// Collaborator notified with device-pixel damage extents.
///
/// Invoked at most once per [`RasterContext::release_context`] call.
pub trait DamageTracker {
    /// Report that the rectangle at (`x`, `y`) sized `width` × `height`
    /// device pixels has been touched.
    fn damaged(&mut self, x: i32, y: i32, width: u32, height: u32);
}

/// Durable drawing state for one drawable surface.
pub struct RasterContext {
    clip: Option<Region>,
    line_color: Rgba8,
    fill_color: Rgba8,
    paint_mode: PaintMode,
    damage: Option<Rect>,
    acquired: bool,
    tracker: Option<Box<dyn DamageTracker>>,
}

impl Default for RasterContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterContext {
    /// Create a context with default paint state: black lines, white fill,
    /// over-painting, no clip, no accumulated damage.
    pub fn new() -> Self {
        Self {
            clip: None,
            line_color: Rgba8 {
                r: 0x00,
                g: 0x00,
                b: 0x00,
                a: 0xFF,
            },
            fill_color: Rgba8 {
                r: 0xFF,
                g: 0xFF,
                b: 0xFF,
                a: 0xFF,
            },
            paint_mode: PaintMode::Over,
            damage: None,
            acquired: false,
            tracker: None,
        }
    }

    /// The current stroke color.
    pub fn line_color(&self) -> Rgba8 {
        self.line_color
    }

    /// Set the stroke color.
    pub fn set_line_color(&mut self, color: Rgba8) {
        self.line_color = color;
    }

    /// The current fill color.
    pub fn fill_color(&self) -> Rgba8 {
        self.fill_color
    }

    /// Set the fill color.
    pub fn set_fill_color(&mut self, color: Rgba8) {
        self.fill_color = color;
    }

    /// The current paint mode.
    pub fn paint_mode(&self) -> PaintMode {
        self.paint_mode
    }

    /// Set the paint mode.
    pub fn set_paint_mode(&mut self, mode: PaintMode) {
        self.paint_mode = mode;
    }

    /// Set or clear the clip region applied to newly acquired contexts.
    pub fn set_clip_region(&mut self, region: Option<Region>) {
        self.clip = region;
    }

    /// Register the collaborator notified on release.
    pub fn set_damage_tracker(&mut self, tracker: Box<dyn DamageTracker>) {
        self.tracker = Some(tracker);
    }

    /// Bind a drawing context to `surface`.
    ///
    /// Antialiasing is enabled per `anti_alias`; the compositing operator is
    /// switched to exclusive-or only when `xor_allowed` is set *and* the
    /// current paint mode is [`PaintMode::Xor`]. The stored clip region is
    /// applied to the fresh context; strokes start from the stored line
    /// color and polygon fills from the stored fill color.
    ///
    /// Acquiring while another context is outstanding is a contract
    /// violation (single writer per surface).
    pub fn acquire_context<'a>(
        &mut self,
        surface: &'a mut Surface,
        xor_allowed: bool,
        anti_alias: bool,
    ) -> DrawContext<'a> {
        debug_assert!(!self.acquired, "nested context acquisition on one surface");
        self.acquired = true;

        let operator = if xor_allowed && self.paint_mode == PaintMode::Xor {
            Operator::Xor
        } else {
            Operator::Over
        };
        let mut context = DrawContext::new(
            surface,
            operator,
            anti_alias,
            color_to_source(self.line_color, 0.0),
            color_to_source(self.fill_color, 0.0),
        );
        if let Some(region) = &self.clip {
            context.clip_region(region);
        }
        context
    }

    /// Finalize drawing on `context`.
    ///
    /// Restores the default compositing operator if it was switched, unions
    /// `extents` into the outstanding damage and notifies the registered
    /// tracker exactly once.
    pub fn release_context(
        &mut self,
        mut context: DrawContext<'_>,
        xor_allowed: bool,
        extents: Option<Rect>,
    ) {
        debug_assert!(self.acquired, "release without matching acquire");
        if xor_allowed && context.operator == Operator::Xor {
            context.operator = Operator::Over;
        }
        drop(context);
        self.acquired = false;

        let Some(extents) = extents else {
            return;
        };
        // an empty extent is the union identity; folding it in anyway would
        // drag the accumulated damage out to the origin
        if extents.width() <= 0.0 || extents.height() <= 0.0 {
            return;
        }
        self.damage = Some(match self.damage {
            Some(damage) => damage.union(extents),
            None => extents,
        });
        if let Some(tracker) = &mut self.tracker {
            let x0 = extents.x0.floor();
            let y0 = extents.y0.floor();
            let width = (extents.x1.ceil() - x0).max(0.0) as u32;
            let height = (extents.y1.ceil() - y0).max(0.0) as u32;
            tracker.damaged(x0 as i32, y0 as i32, width, height);
        }
    }

    /// The damage accumulated since the last [`take_damage`](Self::take_damage).
    pub fn damage(&self) -> Option<Rect> {
        self.damage
    }

    /// Hand the accumulated damage to the repaint scheduler, resetting it.
    pub fn take_damage(&mut self) -> Option<Rect> {
        self.damage.take()
    }
}

/// A drawing context bound to a surface between acquire and release.
///
/// Exclusive ownership of the surface for the lifetime of the context is
/// enforced by the mutable borrow.
pub struct DrawContext<'a> {
    surface: &'a mut Surface,
    operator: Operator,
    anti_alias: bool,
    clip: Option<Region>,
    source: SourceColor,
    fill_source: SourceColor,
    path: BezPath,
}

/// Normalize 0-255 channel values to floating components, blending an extra
/// `transparency` between 0 (opaque) and 1 (fully transparent) into alpha.
fn color_to_source(color: Rgba8, transparency: f64) -> SourceColor {
    let alpha = (f64::from(color.a) / 255.0) * (1.0 - transparency.clamp(0.0, 1.0));
    [
        f64::from(color.r) / 255.0,
        f64::from(color.g) / 255.0,
        f64::from(color.b) / 255.0,
        alpha,
    ]
}

impl<'a> DrawContext<'a> {
    fn new(
        surface: &'a mut Surface,
        operator: Operator,
        anti_alias: bool,
        source: SourceColor,
        fill_source: SourceColor,
    ) -> Self {
        Self {
            surface,
            operator,
            anti_alias,
            clip: None,
            source,
            fill_source,
            path: BezPath::new(),
        }
    }

    /// Whether antialiasing is enabled on this context.
    pub fn anti_alias(&self) -> bool {
        self.anti_alias
    }

    /// Translate an external rectangle/polygon clip region into the native
    /// clip and apply it, intersecting with any clip already in effect.
    pub fn clip_region(&mut self, region: &Region) {
        self.clip = Some(match self.clip.take() {
            Some(current) => current.intersect(region),
            None => region.clone(),
        });
    }

    /// Override the stroke color seeded at acquire, blending in an optional
    /// extra `transparency` between 0 (opaque) and 1 (fully transparent).
    pub fn apply_color(&mut self, color: Rgba8, transparency: f64) {
        self.source = color_to_source(color, transparency);
    }

    /// Transform each vertex of `polygon` by `object_to_device` and append
    /// the result to the working path.
    ///
    /// With `pixel_snap`, transformed points on near-axis-aligned edges are
    /// snapped to the device pixel grid; with `pixel_snap_hairline`, every
    /// point is rounded to the nearest device-pixel center so hairlines stay
    /// crisp. Zero-length segments are skipped silently.
    ///
    /// Returns the number of points emitted.
    pub fn add_polygon_path(
        &mut self,
        polygon: &Polygon,
        object_to_device: &Affine,
        pixel_snap: bool,
        pixel_snap_hairline: bool,
    ) -> usize {
        let count = polygon.len();
        if count == 0 {
            return 0;
        }

        let mut emitted = 0;
        let mut last: Option<Point> = None;
        for index in 0..count {
            let mut point = if pixel_snap {
                snap_to_pixel(polygon, index, object_to_device)
            } else {
                *object_to_device * polygon.point(index)
            };
            if pixel_snap_hairline {
                point = Point::new(point.x.round(), point.y.round()) + Vec2::new(0.5, 0.5);
            }
            if last == Some(point) {
                continue;
            }
            if emitted == 0 {
                self.path.move_to(point);
            } else {
                self.path.line_to(point);
            }
            last = Some(point);
            emitted += 1;
        }
        if polygon.is_closed() && emitted > 1 {
            self.path.close_path();
        }
        emitted
    }

    /// Stroke `polygon` with the active source color.
    ///
    /// `dashes` is an on/off length pattern (empty for solid strokes).
    /// Miter joins sharper than `miter_minimum_angle` (radians) degrade to
    /// bevel. Returns the bounding damage extents on success — empty when
    /// nothing was painted — and `None` only for degenerate input with
    /// fewer than 2 points.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_poly_line(
        &mut self,
        polygon: &Polygon,
        object_to_device: &Affine,
        line_width: f64,
        dashes: &[f64],
        join: Join,
        cap: Cap,
        miter_minimum_angle: f64,
        pixel_snap_hairline: bool,
    ) -> Option<Rect> {
        if polygon.len() < 2 {
            return None;
        }

        self.path = BezPath::new();
        let pixel_snap = !self.anti_alias;
        let emitted =
            self.add_polygon_path(polygon, object_to_device, pixel_snap, pixel_snap_hairline);
        if emitted < 2 || line_width <= 0.0 {
            // fully degenerate geometry or an invisible stroke; a silent
            // no-op, not an error
            return Some(Rect::ZERO);
        }

        let mut style = Stroke::new(line_width).with_join(join).with_caps(cap);
        if join == Join::Miter && miter_minimum_angle > 0.0 {
            style = style.with_miter_limit(1.0 / (miter_minimum_angle / 2.0).sin());
        }
        if !dashes.is_empty() {
            style = style.with_dashes(0.0, dashes.iter().copied());
        }

        let outline = stroke(
            self.path.elements().iter().copied(),
            &style,
            &StrokeOpts::default(),
            STROKE_TOLERANCE,
        );
        let damage = fill_path(
            self.surface,
            &outline,
            self.source,
            self.operator,
            self.clip.as_ref(),
            self.anti_alias,
        );
        Some(damage)
    }

    /// Fill `polygon` with the context's fill color.
    ///
    /// The outline is closed whether or not the polygon is. Returns the
    /// bounding damage extents on success — empty when nothing was
    /// painted — and `None` only for degenerate input with fewer than
    /// 3 points.
    pub fn draw_polygon(&mut self, polygon: &Polygon, object_to_device: &Affine) -> Option<Rect> {
        if polygon.len() < 3 {
            return None;
        }

        self.path = BezPath::new();
        let pixel_snap = !self.anti_alias;
        let emitted = self.add_polygon_path(polygon, object_to_device, pixel_snap, false);
        if emitted < 3 {
            return Some(Rect::ZERO);
        }
        if !polygon.is_closed() {
            self.path.close_path();
        }

        let damage = fill_path(
            self.surface,
            &self.path,
            self.fill_source,
            self.operator,
            self.clip.as_ref(),
            self.anti_alias,
        );
        Some(damage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use softraster_common::buffer::{BitDepth, RasterBuffer};

    fn surface_8x8() -> Surface {
        Surface::new(RasterBuffer::allocate(8, 8, BitDepth::Argb32).unwrap())
    }

    #[test]
    fn xor_operator_needs_mode_and_permission() {
        let mut surface = surface_8x8();
        let mut owner = RasterContext::new();

        let ctx = owner.acquire_context(&mut surface, true, false);
        assert_eq!(ctx.operator, Operator::Over);
        owner.release_context(ctx, true, None);

        owner.set_paint_mode(PaintMode::Xor);
        let ctx = owner.acquire_context(&mut surface, false, false);
        assert_eq!(ctx.operator, Operator::Over);
        owner.release_context(ctx, false, None);

        let ctx = owner.acquire_context(&mut surface, true, false);
        assert_eq!(ctx.operator, Operator::Xor);
        owner.release_context(ctx, true, None);
    }

    #[test]
    fn polygon_path_skips_zero_length_segments() {
        let mut surface = surface_8x8();
        let mut owner = RasterContext::new();
        let mut ctx = owner.acquire_context(&mut surface, false, true);

        let polygon = Polygon::new(
            vec![
                Point::new(1.0, 1.0),
                Point::new(1.0, 1.0),
                Point::new(5.0, 1.0),
                Point::new(5.0, 5.0),
            ],
            false,
        );
        let emitted = ctx.add_polygon_path(&polygon, &Affine::IDENTITY, false, false);
        assert_eq!(emitted, 3);
        owner.release_context(ctx, false, None);
    }

    #[test]
    fn hairline_snapping_hits_pixel_centers() {
        let mut surface = surface_8x8();
        let mut owner = RasterContext::new();
        let mut ctx = owner.acquire_context(&mut surface, false, true);

        let polygon = Polygon::new(vec![Point::new(1.2, 1.8), Point::new(4.9, 1.8)], false);
        let emitted = ctx.add_polygon_path(&polygon, &Affine::IDENTITY, false, true);
        assert_eq!(emitted, 2);
        assert_eq!(
            ctx.path.elements(),
            &[
                peniko::kurbo::PathEl::MoveTo(Point::new(1.5, 2.5)),
                peniko::kurbo::PathEl::LineTo(Point::new(5.5, 2.5)),
            ]
        );
        owner.release_context(ctx, false, None);
    }
}
