// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Parley Strike caches the results of scaling one font configuration.
//!
//! A [`ScalerCache`] is bound to a single [`Scaler`]: one typeface at one size,
//! transform and set of rendering flags (a "strike"). It memoizes the glyph
//! metrics, outlines and images the scaler produces, keyed by
//! [`PackedGlyphId`], and every operation that materializes something new
//! reports how many bytes it added. An owner managing many strikes can sum
//! those deltas against a memory budget and drop whole caches when it is
//! exceeded.
//!
//! Besides plain lookups, the cache sorts batches of positioned glyphs into
//! drawing strategies: atlas masks, signed distance fields, or paths. Glyphs a
//! strategy cannot handle are recorded in a [`RejectBuffer`] so the caller can
//! retry them with another one.
//!
//! ## Features
//!
//! - `skrifa` (enabled by default): Provides [`SkrifaScaler`], a scaler reading
//!   OpenType font data with [Skrifa].
//!
//! [Skrifa]: https://docs.rs/skrifa

// LINEBENDER LINT SET - lib.rs - v3
// See https://linebender.org/wiki/canonical-lints/
// These lints shouldn't apply to examples or tests.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
// These lints shouldn't apply to examples.
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use kurbo;

mod arena;
mod buffer;
mod cache;
mod error;
mod glyph;
mod intercept;
mod key;
mod scaler;
#[cfg(feature = "skrifa")]
mod skrifa_scaler;

#[cfg(test)]
mod testing;

pub use buffer::{DrawStrategy, Drawable, DrawableGlyphBuffer, Reject, RejectBuffer};
pub use cache::{CacheOptions, MAX_CPU_IMAGE_DIMENSION, ScalerCache};
pub use error::Error;
pub use glyph::{
    GLYPH_RECORD_SIZE, Glyph, GlyphClass, GlyphImage, GlyphMetrics, MAX_ATLAS_DIMENSION,
    MaskFormat, Outline,
};
pub use key::{AxisAlignment, PackedGlyphId, RoundingSpec, SUBPIXEL_BUCKETS};
pub use scaler::{Decoration, FontMetrics, Scaler, Slant, StrikeDescriptor, TypefaceInfo};
#[cfg(feature = "skrifa")]
pub use skrifa_scaler::SkrifaScaler;
