// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU surface management for software rasterization: a multi-resolution
//! surface cache that produces and reuses downscaled copies of a rendering
//! surface, and a drawing-context lifecycle tracking clip regions, paint
//! state and repaint damage.
//!
//! Everything here is single-threaded and cooperative: surfaces, caches and
//! contexts belong to the thread owning the drawable, and exclusive access
//! between context acquire and release is enforced through borrows.

#![forbid(unsafe_code)]

mod cache;
mod context;
mod raster;
mod surface;

pub use cache::{CacheOptions, SurfaceCache};
pub use context::{DamageTracker, DrawContext, PaintMode, RasterContext};
pub use surface::{Surface, SurfaceFormat};

pub use softraster_common::buffer::RasterBuffer;
pub use softraster_common::region::Region;
pub use softraster_common::snap::Polygon;
