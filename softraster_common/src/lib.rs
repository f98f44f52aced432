// Copyright 2026 the Softraster Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared data structures for the softraster surface layer: owned raster
//! buffers, pixel-format conversion between foreign bitmap representations
//! and the native packed format, clip regions, and pixel snapping helpers.
//!
//! This crate should not be used on its own; it is the foundation for
//! `softraster_cpu`, which provides the surface cache and drawing contexts.

#![forbid(unsafe_code)]

pub mod buffer;
pub mod convert;
pub mod region;
pub mod snap;

pub use peniko;
pub use peniko::color;
pub use peniko::kurbo;
