// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owned raster pixel buffers.

use peniko::color::Rgba8;
use thiserror::Error;

/// Bit depths understood by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    /// 1 bit per pixel, used for alpha masks.
    One,
    /// 24 bits per pixel, packed 3-byte true color.
    Rgb24,
    /// 32 bits per pixel, native drawing format.
    Argb32,
}

impl BitDepth {
    /// Bits per pixel.
    pub fn bits(self) -> usize {
        match self {
            Self::One => 1,
            Self::Rgb24 => 24,
            Self::Argb32 => 32,
        }
    }
}

/// Errors that can occur while allocating pixel memory.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The scanline size computation overflowed the native integer range.
    #[error("scanline size computation overflowed")]
    StrideOverflow,
    /// The allocator could not provide the pixel memory.
    #[error("pixel memory allocation failed")]
    OutOfMemory,
}

/// An indexed palette for 1-bit buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette(Vec<Rgba8>);

impl Palette {
    /// Create a palette from its entries.
    pub fn new(entries: Vec<Rgba8>) -> Self {
        Self(entries)
    }

    /// Number of palette entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the palette has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the index of the entry closest to `color` by squared channel
    /// distance, or 0 for an empty palette.
    pub fn best_index(&self, color: Rgba8) -> usize {
        let distance = |entry: &Rgba8| {
            let dr = i32::from(entry.r) - i32::from(color.r);
            let dg = i32::from(entry.g) - i32::from(color.g);
            let db = i32::from(entry.b) - i32::from(color.b);
            dr * dr + dg * dg + db * db
        };
        self.0
            .iter()
            .enumerate()
            .min_by_key(|(_, entry)| distance(entry))
            .map(|(index, _)| index)
            .unwrap_or(0)
    }
}

/// An exclusively owned pixel buffer with format metadata.
///
/// Scanlines are stored top-down with a 4-byte aligned stride. Rows are
/// accessed through bounds-checked slices rather than raw pointers.
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    depth: BitDepth,
    stride: usize,
    bits: Vec<u8>,
    palette: Option<Palette>,
}

impl RasterBuffer {
    /// Compute the 4-byte aligned scanline size for a row of `width` pixels.
    ///
    /// Returns `None` when the computation overflows the native integer
    /// range.
    pub fn aligned_stride(width: u32, depth: BitDepth) -> Option<usize> {
        let bits = (width as usize).checked_mul(depth.bits())?;
        let bytes = bits.div_ceil(8);
        bytes.checked_add(3).map(|b| b & !3)
    }

    /// Allocate a zero-filled buffer.
    ///
    /// Allocation failure is reported as an error, never a process abort;
    /// callers are expected to fall back to a slower path.
    pub fn allocate(width: u32, height: u32, depth: BitDepth) -> Result<Self, BufferError> {
        let stride = Self::aligned_stride(width, depth).ok_or(BufferError::StrideOverflow)?;
        let len = stride
            .checked_mul(height as usize)
            .ok_or(BufferError::StrideOverflow)?;
        let mut bits = Vec::new();
        bits.try_reserve_exact(len)
            .map_err(|_| BufferError::OutOfMemory)?;
        bits.resize(len, 0);
        Ok(Self {
            width,
            height,
            depth,
            stride,
            bits,
            palette: None,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bit depth of the pixel data.
    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    /// Scanline size in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The indexed palette, present only for some 1-bit buffers.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Attach or remove the indexed palette.
    pub fn set_palette(&mut self, palette: Option<Palette>) {
        self.palette = palette;
    }

    /// The raw pixel bytes, all scanlines including alignment padding.
    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Mutable access to the raw pixel bytes.
    pub fn bits_mut(&mut self) -> &mut [u8] {
        &mut self.bits
    }

    /// The scanline at `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of range.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.bits[start..start + self.stride]
    }

    /// Mutable access to the scanline at `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of range.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        &mut self.bits[start..start + self.stride]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_4_byte_aligned() {
        // 2 pixels * 3 bytes = 6, rounded up to 8
        assert_eq!(RasterBuffer::aligned_stride(2, BitDepth::Rgb24), Some(8));
        // 1 bit rounds up to a whole aligned byte group
        assert_eq!(RasterBuffer::aligned_stride(1, BitDepth::One), Some(4));
        assert_eq!(RasterBuffer::aligned_stride(33, BitDepth::One), Some(8));
        assert_eq!(RasterBuffer::aligned_stride(3, BitDepth::Argb32), Some(12));
    }

    #[test]
    fn absurd_dimensions_fail_recoverably() {
        let result = RasterBuffer::allocate(u32::MAX, u32::MAX, BitDepth::Argb32);
        assert!(result.is_err());
    }

    #[test]
    fn rows_are_bounds_checked_views() {
        let mut buf = RasterBuffer::allocate(2, 2, BitDepth::Argb32).unwrap();
        assert_eq!(buf.stride(), 8);
        buf.row_mut(1)[0] = 0xAB;
        assert_eq!(buf.row(1)[0], 0xAB);
        assert_eq!(buf.row(0)[0], 0);
        assert_eq!(buf.bits().len(), 16);
    }

    #[test]
    fn palette_best_index() {
        let palette = Palette::new(vec![
            Rgba8 { r: 0, g: 0, b: 0, a: 255 },
            Rgba8 { r: 255, g: 255, b: 255, a: 255 },
        ]);
        let black = Rgba8 { r: 0, g: 0, b: 0, a: 255 };
        let near_white = Rgba8 { r: 250, g: 250, b: 240, a: 255 };
        assert_eq!(palette.best_index(black), 0);
        assert_eq!(palette.best_index(near_white), 1);
        assert_eq!(Palette::default().best_index(black), 0);
    }
}
