// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel-format conversion between foreign bitmap buffers and the native
//! packed raster format.
//!
//! The native 32-bit format stores an ARGB word in host byte order, so the
//! in-memory channel order differs between little- and big-endian hosts.
//! Android deviates from both and stores RGBA bytes so that buffers can be
//! handed to GL paths without swizzling.

use crate::buffer::{BitDepth, RasterBuffer};
use log::warn;
use peniko::color::Rgba8;

/// Byte index of each channel within a native 32-bit pixel.
pub mod channel {
    #[cfg(target_os = "android")]
    mod order {
        pub const RED: usize = 0;
        pub const GREEN: usize = 1;
        pub const BLUE: usize = 2;
        pub const ALPHA: usize = 3;
    }
    #[cfg(all(not(target_os = "android"), target_endian = "big"))]
    mod order {
        pub const ALPHA: usize = 0;
        pub const RED: usize = 1;
        pub const GREEN: usize = 2;
        pub const BLUE: usize = 3;
    }
    #[cfg(all(not(target_os = "android"), target_endian = "little"))]
    mod order {
        pub const BLUE: usize = 0;
        pub const GREEN: usize = 1;
        pub const RED: usize = 2;
        pub const ALPHA: usize = 3;
    }
    pub use order::*;
}

/// Byte index of each channel within a native 24-bit packed pixel, the
/// converter's expected input order.
pub mod channel24 {
    #[cfg(any(target_os = "android", target_endian = "big"))]
    mod order {
        pub const RED: usize = 0;
        pub const GREEN: usize = 1;
        pub const BLUE: usize = 2;
    }
    #[cfg(all(not(target_os = "android"), target_endian = "little"))]
    mod order {
        pub const BLUE: usize = 0;
        pub const GREEN: usize = 1;
        pub const RED: usize = 2;
    }
    pub use order::*;
}

/// Convert a 24-bit packed buffer into a freshly allocated 32-bit top-down
/// buffer of identical size.
///
/// Every alpha byte is forced to fully opaque and the RGB bytes are permuted
/// into the native channel order. Returns `None` when the scanline size
/// computation overflows or the allocation fails; callers must fall back to
/// a slower generic conversion path rather than treat this as fatal.
pub fn convert_to_32bit(src: &RasterBuffer) -> Option<RasterBuffer> {
    debug_assert_eq!(
        src.depth(),
        BitDepth::Rgb24,
        "fast conversion expects a 24-bit packed source"
    );

    let width = src.width();
    let height = src.height();
    let mut dst = match RasterBuffer::allocate(width, height, BitDepth::Argb32) {
        Ok(buf) => buf,
        Err(err) => {
            warn!("24->32 bit conversion failed: {err}");
            return None;
        }
    };
    dst.set_palette(src.palette().cloned());

    let w = width as usize;
    for y in 0..height {
        let src_row = src.row(y);
        let dst_row = dst.row_mut(y);
        let src_px: &[[u8; 3]] = bytemuck::cast_slice(&src_row[..w * 3]);
        let dst_px: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut dst_row[..w * 4]);
        for (s, d) in src_px.iter().zip(dst_px.iter_mut()) {
            #[cfg(all(not(target_os = "android"), target_endian = "big"))]
            {
                *d = [0xFF, s[0], s[1], s[2]];
            }
            #[cfg(any(target_os = "android", target_endian = "little"))]
            {
                *d = [s[0], s[1], s[2], 0xFF];
            }
        }
    }

    Some(dst)
}

/// Complement every byte of a 1-bit mask buffer in place.
///
/// The indexed-palette convention (index 0 means black) is inverted relative
/// to the native alpha-mask convention (a set bit means opaque), so masks
/// must be toggled when they cross between the two. Applying this twice is
/// the identity. Buffers of other depths are left untouched.
pub fn invert_one_bit_alpha(buf: &mut RasterBuffer) {
    if buf.depth() != BitDepth::One {
        return;
    }
    debug_assert!(
        buf.palette().map_or(true, |palette| palette.best_index(Rgba8 {
            r: 0,
            g: 0,
            b: 0,
            a: 255
        }) == 0),
        "1-bit masks expect black at palette index 0"
    );
    for byte in buf.bits_mut() {
        *byte = !*byte;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Palette;

    fn rgb24_2x2() -> RasterBuffer {
        let mut src = RasterBuffer::allocate(2, 2, BitDepth::Rgb24).unwrap();
        src.row_mut(0)[..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        src.row_mut(1)[..6].copy_from_slice(&[7, 8, 9, 10, 11, 12]);
        src
    }

    #[test]
    fn converts_to_opaque_32bit() {
        let src = rgb24_2x2();
        let dst = convert_to_32bit(&src).unwrap();

        assert_eq!(dst.width(), 2);
        assert_eq!(dst.height(), 2);
        assert_eq!(dst.depth(), BitDepth::Argb32);
        assert_eq!(dst.stride(), 8);

        for y in 0..2 {
            let src_row = src.row(y);
            let dst_row = dst.row(y);
            for x in 0..2 {
                let s = &src_row[x * 3..x * 3 + 3];
                let d = &dst_row[x * 4..x * 4 + 4];
                assert_eq!(d[channel::ALPHA], 0xFF);
                assert_eq!(d[channel::RED], s[channel24::RED]);
                assert_eq!(d[channel::GREEN], s[channel24::GREEN]);
                assert_eq!(d[channel::BLUE], s[channel24::BLUE]);
            }
        }
    }

    #[test]
    fn conversion_keeps_the_palette() {
        let mut src = rgb24_2x2();
        src.set_palette(Some(Palette::new(vec![Rgba8 {
            r: 0,
            g: 0,
            b: 0,
            a: 255,
        }])));
        let dst = convert_to_32bit(&src).unwrap();
        assert_eq!(dst.palette(), src.palette());
    }

    #[test]
    fn mask_inversion_is_an_involution() {
        let mut buf = RasterBuffer::allocate(9, 2, BitDepth::One).unwrap();
        buf.bits_mut().copy_from_slice(&[0xA5, 0x80, 0, 0, 0x01, 0xFF, 0, 0]);
        let original = buf.bits().to_vec();

        invert_one_bit_alpha(&mut buf);
        assert_ne!(buf.bits(), original.as_slice());
        invert_one_bit_alpha(&mut buf);
        assert_eq!(buf.bits(), original.as_slice());
    }

    #[test]
    fn mask_inversion_ignores_other_depths() {
        let mut buf = rgb24_2x2();
        let original = buf.bits().to_vec();
        invert_one_bit_alpha(&mut buf);
        assert_eq!(buf.bits(), original.as_slice());
    }
}
