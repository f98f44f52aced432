// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A multi-resolution surface cache.
//!
//! The cache owns one primary surface plus lazily generated downscaled
//! derivatives keyed by their generated size. Derivatives are never evicted;
//! the expected workload is a small, bounded set of repeatedly requested
//! sizes (a few zoom levels), and the whole tree is dropped with the cache.

use crate::surface::{Surface, SurfaceFormat};
use log::{trace, warn};
use softraster_common::buffer::{BitDepth, RasterBuffer};
use softraster_common::convert::convert_to_32bit;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Surfaces below this pixel count are cheap enough to rescale at paint time.
const MIN_AREA_TO_CACHE: u64 = 64 * 64;

/// Configuration for a [`SurfaceCache`], injected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Whether downscaled derivatives may be generated and cached.
    pub downscale: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self { downscale: true }
    }
}

impl CacheOptions {
    /// Options honoring the `SOFTRASTER_DISABLE_DOWNSCALE` environment
    /// variable, read once per process.
    ///
    /// Application shells that source configuration elsewhere should build
    /// [`CacheOptions`] directly instead.
    pub fn from_env() -> Self {
        static DISABLED: OnceLock<bool> = OnceLock::new();
        let disabled =
            *DISABLED.get_or_init(|| std::env::var_os("SOFTRASTER_DISABLE_DOWNSCALE").is_some());
        Self {
            downscale: !disabled,
        }
    }
}

/// Repeatedly halve (rounding up) starting from half of `source` while the
/// value still exceeds `target` and 1. Returns the final value and the
/// total halving factor.
fn halve_to_target(source: u32, target: u32) -> (u32, u32) {
    let mut value = source.div_ceil(2);
    let mut factor = 1;
    while value > target && value > 1 {
        value = value.div_ceil(2);
        factor *= 2;
    }
    (value, factor)
}

/// One primary surface plus its downscaled derivatives.
///
/// The primary and every derivative form a single-owner tree: dropping the
/// cache releases them all, and no surface outlives its cache.
pub struct SurfaceCache {
    primary: Surface,
    downscaled: HashMap<(u32, u32), Surface>,
    downscale: bool,
}

impl SurfaceCache {
    /// Wrap a raster buffer as the primary surface without copying.
    pub fn new(buffer: RasterBuffer, options: &CacheOptions) -> Self {
        Self {
            primary: Surface::new(buffer),
            downscaled: HashMap::new(),
            downscale: options.downscale,
        }
    }

    /// Wrap a foreign bitmap buffer, converting 24-bit sources to the
    /// native 32-bit format on the way in.
    ///
    /// When the fast conversion fails (stride overflow, allocation failure)
    /// the packed buffer is kept as-is and acts as a source-only surface.
    pub fn from_foreign(buffer: RasterBuffer, options: &CacheOptions) -> Self {
        let buffer = if buffer.depth() == BitDepth::Rgb24 {
            match convert_to_32bit(&buffer) {
                Some(converted) => converted,
                None => buffer,
            }
        } else {
            buffer
        };
        Self::new(buffer, options)
    }

    /// The primary surface, never downscaled.
    pub fn primary(&self) -> &Surface {
        &self.primary
    }

    /// Mutable access to the primary surface, for drawing contexts.
    pub fn primary_mut(&mut self) -> &mut Surface {
        &mut self.primary
    }

    /// Return the best surface for painting at `target_width` ×
    /// `target_height` device pixels.
    ///
    /// The primary surface is returned unchanged when downscaling is
    /// disabled, a target dimension is zero, the primary is trivially small,
    /// or the target is not strictly smaller than the source on both axes.
    /// Otherwise a power-of-two downscaled derivative is rendered on first
    /// request and reused afterwards.
    pub fn surface(&mut self, target_width: u32, target_height: u32) -> &Surface {
        if !self.downscale
            || target_width == 0
            || target_height == 0
            || self.is_trivial()
        {
            return &self.primary;
        }
        self.create_or_reuse_downscale(target_width, target_height)
    }

    /// Approximate memory usage of the primary surface and its derivative
    /// tree, in bytes.
    ///
    /// With downscaling enabled the derivatives add 1/4 + 1/16 + ... of the
    /// primary; a flat 5/4 multiplier is a good enough upper bound for
    /// buffer-survival heuristics.
    pub fn estimate_bytes(&self) -> u64 {
        let bytes = self.primary.buffer().stride() as u64 * u64::from(self.primary.height());
        if self.downscale {
            bytes * 5 / 4
        } else {
            bytes
        }
    }

    fn is_trivial(&self) -> bool {
        u64::from(self.primary.width()) * u64::from(self.primary.height()) < MIN_AREA_TO_CACHE
    }

    fn create_or_reuse_downscale(&mut self, target_width: u32, target_height: u32) -> &Surface {
        let source_width = self.primary.width();
        let source_height = self.primary.height();

        // zoomed in, need to stretch at paint, no pre-scale useful
        if target_width >= source_width || target_height >= source_height {
            return &self.primary;
        }

        let (half_w, factor_w) = halve_to_target(source_width, target_width);
        let (half_h, factor_h) = halve_to_target(source_height, target_height);

        if factor_w == 1 && factor_h == 1 {
            // original size is already the best binary size
            return &self.primary;
        }

        // go up one scale again - look for no change
        let width = if factor_w == 1 { target_width } else { half_w * 2 };
        let height = if factor_h == 1 { target_height } else { half_h * 2 };

        let key = (width, height);
        if !self.downscaled.contains_key(&key) {
            trace!("surface cache miss, rendering {width}x{height} derivative");
            match render_downscale(&self.primary, width, height) {
                Some(derivative) => {
                    self.downscaled.insert(key, derivative);
                }
                None => {
                    warn!("failed to allocate {width}x{height} derivative surface");
                    return &self.primary;
                }
            }
        } else {
            trace!("surface cache hit for {width}x{height}");
        }
        &self.downscaled[&key]
    }
}

/// Render `source` into a new surface of the given size, scaling each axis
/// independently with an area-averaging filter, and tag it with the applied
/// device scale. Returns `None` when the allocation fails.
fn render_downscale(source: &Surface, width: u32, height: u32) -> Option<Surface> {
    let mut buffer = RasterBuffer::allocate(width, height, source.buffer().depth()).ok()?;
    match source.format() {
        SurfaceFormat::A1 => downscale_mask(source.buffer(), &mut buffer),
        SurfaceFormat::Rgb24 | SurfaceFormat::Argb32 => {
            downscale_packed(source.buffer(), &mut buffer);
        }
    }
    let mut surface = Surface::new(buffer);
    surface.set_device_scale(
        f64::from(width) / f64::from(source.width()),
        f64::from(height) / f64::from(source.height()),
    );
    Some(surface)
}

/// Box-filter downscale for byte-per-channel formats.
fn downscale_packed(src: &RasterBuffer, dst: &mut RasterBuffer) {
    let bpp = src.depth().bits() / 8;
    let (sw, sh) = (src.width() as usize, src.height() as usize);
    let (dw, dh) = (dst.width() as usize, dst.height() as usize);

    for dy in 0..dh {
        let sy0 = dy * sh / dh;
        let sy1 = ((dy + 1) * sh / dh).max(sy0 + 1);
        let dst_row = dst.row_mut(dy as u32);
        for dx in 0..dw {
            let sx0 = dx * sw / dw;
            let sx1 = ((dx + 1) * sw / dw).max(sx0 + 1);
            let mut acc = [0_u64; 4];
            for sy in sy0..sy1 {
                let src_row = src.row(sy as u32);
                for sx in sx0..sx1 {
                    for c in 0..bpp {
                        acc[c] += u64::from(src_row[sx * bpp + c]);
                    }
                }
            }
            let count = ((sy1 - sy0) * (sx1 - sx0)) as u64;
            for c in 0..bpp {
                dst_row[dx * bpp + c] = ((acc[c] + count / 2) / count) as u8;
            }
        }
    }
}

/// Coverage-threshold downscale for 1-bit masks (MSB-first bit order).
fn downscale_mask(src: &RasterBuffer, dst: &mut RasterBuffer) {
    let bit_at = |row: &[u8], x: usize| row[x / 8] & (0x80 >> (x % 8)) != 0;
    let (sw, sh) = (src.width() as usize, src.height() as usize);
    let (dw, dh) = (dst.width() as usize, dst.height() as usize);

    for dy in 0..dh {
        let sy0 = dy * sh / dh;
        let sy1 = ((dy + 1) * sh / dh).max(sy0 + 1);
        let mut set_bits = vec![0_usize; dw];
        let mut totals = vec![0_usize; dw];
        for sy in sy0..sy1 {
            let src_row = src.row(sy as u32);
            for (dx, (set, total)) in set_bits.iter_mut().zip(totals.iter_mut()).enumerate() {
                let sx0 = dx * sw / dw;
                let sx1 = ((dx + 1) * sw / dw).max(sx0 + 1);
                for sx in sx0..sx1 {
                    *set += usize::from(bit_at(src_row, sx));
                    *total += 1;
                }
            }
        }
        let dst_row = dst.row_mut(dy as u32);
        for dx in 0..dw {
            if set_bits[dx] * 2 >= totals[dx] {
                dst_row[dx / 8] |= 0x80 >> (dx % 8);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halving_counts_round_up_steps() {
        // 1024 -> 512 (>300) -> 256 (<=300), one halving past the start
        assert_eq!(halve_to_target(1024, 300), (256, 2));
        // already at or below the target after the initial halving
        assert_eq!(halve_to_target(1024, 600), (512, 1));
        // odd sizes round up at every step
        assert_eq!(halve_to_target(1001, 100), (63, 8));
        // degenerate: never halve below 1
        assert_eq!(halve_to_target(2, 0), (1, 1));
    }

    #[test]
    fn packed_downscale_averages_boxes() {
        let mut buffer = RasterBuffer::allocate(4, 2, BitDepth::Argb32).unwrap();
        for y in 0..2 {
            let row = buffer.row_mut(y);
            for x in 0..4 {
                let value = if x < 2 { 0 } else { 200 };
                row[x * 4..x * 4 + 4].copy_from_slice(&[value, value, value, 255]);
            }
        }
        let mut dst = RasterBuffer::allocate(2, 1, BitDepth::Argb32).unwrap();
        downscale_packed(&buffer, &mut dst);
        let row = dst.row(0);
        assert_eq!(&row[0..4], &[0, 0, 0, 255]);
        assert_eq!(&row[4..8], &[200, 200, 200, 255]);
    }

    #[test]
    fn mask_downscale_thresholds_coverage() {
        let mut mask = RasterBuffer::allocate(8, 2, BitDepth::One).unwrap();
        // left half fully set, right half clear
        mask.row_mut(0)[0] = 0xF0;
        mask.row_mut(1)[0] = 0xF0;
        let mut dst = RasterBuffer::allocate(2, 1, BitDepth::One).unwrap();
        downscale_mask(&mask, &mut dst);
        assert_eq!(dst.row(0)[0], 0x80);
    }
}
