// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native surfaces: pixel memory plus format and device-scale metadata.

use softraster_common::buffer::{BitDepth, RasterBuffer};

/// Pixel formats understood by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFormat {
    /// 32-bit ARGB word in host byte order; the native drawing format.
    Argb32,
    /// 24-bit packed true color, source-only.
    Rgb24,
    /// 1-bit alpha mask, source-only.
    A1,
}

impl SurfaceFormat {
    /// The format matching a buffer's bit depth.
    pub fn from_depth(depth: BitDepth) -> Self {
        match depth {
            BitDepth::Argb32 => Self::Argb32,
            BitDepth::Rgb24 => Self::Rgb24,
            BitDepth::One => Self::A1,
        }
    }
}

/// An owned in-memory pixel buffer with format and device-scale metadata.
///
/// Width and height are immutable. The device scale is `(1.0, 1.0)` except
/// for downscaled derivatives produced by the surface cache, where it records
/// the per-axis scale actually applied.
#[derive(Debug)]
pub struct Surface {
    buffer: RasterBuffer,
    format: SurfaceFormat,
    device_scale: (f64, f64),
}

impl Surface {
    /// Wrap a raster buffer as a surface without copying.
    pub fn new(buffer: RasterBuffer) -> Self {
        let format = SurfaceFormat::from_depth(buffer.depth());
        Self {
            buffer,
            format,
            device_scale: (1.0, 1.0),
        }
    }

    /// Width in physical pixels.
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Height in physical pixels.
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// The surface's pixel format.
    pub fn format(&self) -> SurfaceFormat {
        self.format
    }

    /// The underlying pixel buffer.
    pub fn buffer(&self) -> &RasterBuffer {
        &self.buffer
    }

    /// Mutable access to the underlying pixel buffer.
    pub fn buffer_mut(&mut self) -> &mut RasterBuffer {
        &mut self.buffer
    }

    /// Ratio between the surface's logical size and its stored physical
    /// size, per axis.
    pub fn device_scale(&self) -> (f64, f64) {
        self.device_scale
    }

    /// Record the scale applied when this surface was rendered as a
    /// downscaled derivative.
    pub fn set_device_scale(&mut self, x: f64, y: f64) {
        self.device_scale = (x, y);
    }
}
