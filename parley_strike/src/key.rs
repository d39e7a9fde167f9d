// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed glyph keys and subpixel position rounding.

use core::fmt::{Debug, Formatter};
use kurbo::{Point, Vec2};

/// Number of subpixel quantization buckets per axis.
pub const SUBPIXEL_BUCKETS: u8 = 4;

/// Bits needed to store one bucket index.
const SUBPIXEL_BITS: u32 = 2;
const SUBPIXEL_MASK: u64 = (1 << SUBPIXEL_BITS) - 1;
const SUBPIXEL_X_SHIFT: u32 = u32::BITS;
const SUBPIXEL_Y_SHIFT: u32 = u32::BITS + SUBPIXEL_BITS;

const _BUCKETS_FIT_IN_FIELD: () = assert!(SUBPIXEL_BUCKETS as u64 == 1 << SUBPIXEL_BITS);

/// Rounding bias for axes that keep subpixel precision: half of one bucket.
const SUBPIXEL_ROUND: f64 = 1.0 / (2.0 * SUBPIXEL_BUCKETS as f64);

/// A glyph index combined with its horizontal and vertical subpixel buckets.
///
/// Renderings of the same glyph at visually distinct subpixel offsets get
/// distinct keys, and therefore distinct cache entries. A key built with
/// [`PackedGlyphId::new`] has both buckets set to zero.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PackedGlyphId(u64);

impl PackedGlyphId {
    /// Creates a key for a glyph at an integer position.
    #[inline]
    pub const fn new(glyph_id: u32) -> Self {
        Self(glyph_id as u64)
    }

    /// Creates a key for a glyph with explicit subpixel buckets.
    ///
    /// Bucket values wrap modulo [`SUBPIXEL_BUCKETS`].
    #[inline]
    pub const fn with_subpixel(glyph_id: u32, subpixel_x: u8, subpixel_y: u8) -> Self {
        Self(
            glyph_id as u64
                | ((subpixel_x as u64 & SUBPIXEL_MASK) << SUBPIXEL_X_SHIFT)
                | ((subpixel_y as u64 & SUBPIXEL_MASK) << SUBPIXEL_Y_SHIFT),
        )
    }

    /// The glyph index within the font.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the glyph index occupies the low 32 bits"
    )]
    #[inline]
    pub const fn glyph_id(self) -> u32 {
        self.0 as u32
    }

    /// The horizontal subpixel bucket, `0..SUBPIXEL_BUCKETS`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the field is masked to two bits"
    )]
    #[inline]
    pub const fn subpixel_x(self) -> u8 {
        ((self.0 >> SUBPIXEL_X_SHIFT) & SUBPIXEL_MASK) as u8
    }

    /// The vertical subpixel bucket, `0..SUBPIXEL_BUCKETS`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the field is masked to two bits"
    )]
    #[inline]
    pub const fn subpixel_y(self) -> u8 {
        ((self.0 >> SUBPIXEL_Y_SHIFT) & SUBPIXEL_MASK) as u8
    }

    /// The fractional offset represented by the subpixel buckets.
    #[inline]
    pub fn subpixel_offset(self) -> Vec2 {
        Vec2::new(
            subpixel_offset(self.subpixel_x()),
            subpixel_offset(self.subpixel_y()),
        )
    }
}

impl From<u32> for PackedGlyphId {
    #[inline]
    fn from(glyph_id: u32) -> Self {
        Self::new(glyph_id)
    }
}

impl Debug for PackedGlyphId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "PackedGlyphId({}, x: {}, y: {})",
            self.glyph_id(),
            self.subpixel_x(),
            self.subpixel_y()
        )
    }
}

/// The axis along which text advances in device space.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum AxisAlignment {
    /// Glyph advances are neither purely horizontal nor purely vertical.
    None,
    /// Glyph advances are horizontal.
    X,
    /// Glyph advances are vertical.
    Y,
}

/// How device positions are rounded and folded into glyph keys.
///
/// Subpixel precision is only kept along the axis text advances on; the
/// other axis is rounded to whole pixels so that baselines stay crisp. A
/// scaler without subpixel support rounds both axes.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct RoundingSpec {
    half_axis_sample_freq: Vec2,
    subpixel_x: bool,
    subpixel_y: bool,
}

impl RoundingSpec {
    /// Derives the rounding policy from a scaler's capabilities.
    pub fn new(is_subpixel: bool, axis_alignment: AxisAlignment) -> Self {
        let (subpixel_x, subpixel_y) = match (is_subpixel, axis_alignment) {
            (false, _) => (false, false),
            (true, AxisAlignment::X) => (true, false),
            (true, AxisAlignment::Y) => (false, true),
            (true, AxisAlignment::None) => (true, true),
        };
        let bias = |subpixel: bool| if subpixel { SUBPIXEL_ROUND } else { 0.5 };
        Self {
            half_axis_sample_freq: Vec2::new(bias(subpixel_x), bias(subpixel_y)),
            subpixel_x,
            subpixel_y,
        }
    }

    /// The bias added to a position before it is floored to whole pixels.
    pub fn half_axis_sample_freq(&self) -> Vec2 {
        self.half_axis_sample_freq
    }

    /// Whether horizontal subpixel positions produce distinct keys.
    pub fn subpixel_x(&self) -> bool {
        self.subpixel_x
    }

    /// Whether vertical subpixel positions produce distinct keys.
    pub fn subpixel_y(&self) -> bool {
        self.subpixel_y
    }

    /// Splits a device position into a whole pixel origin and a packed key.
    ///
    /// Non-finite positions produce a non-finite origin; they are filtered
    /// out later by the drawing passes.
    pub fn pack(&self, glyph_id: u32, position: Point) -> (PackedGlyphId, Point) {
        let biased = position + self.half_axis_sample_freq;
        let origin = Point::new(biased.x.floor(), biased.y.floor());
        let x = if self.subpixel_x {
            quantize_subpixel(biased.x)
        } else {
            0
        };
        let y = if self.subpixel_y {
            quantize_subpixel(biased.y)
        } else {
            0
        };
        (PackedGlyphId::with_subpixel(glyph_id, x, y), origin)
    }
}

/// Quantize the fractional part of a position into [`SUBPIXEL_BUCKETS`] buckets.
#[expect(
    clippy::cast_possible_truncation,
    reason = "result is clamped to SUBPIXEL_BUCKETS-1 which fits in u8"
)]
#[inline]
fn quantize_subpixel(value: f64) -> u8 {
    let fraction = value - value.floor();
    ((fraction * f64::from(SUBPIXEL_BUCKETS)) as u8).min(SUBPIXEL_BUCKETS - 1)
}

/// Returns the subpixel offset value for a quantized bucket.
#[inline]
fn subpixel_offset(quantized: u8) -> f64 {
    f64::from(quantized) / f64::from(SUBPIXEL_BUCKETS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_subpixel() {
        assert_eq!(quantize_subpixel(0.0), 0);
        assert_eq!(quantize_subpixel(0.2), 0);
        assert_eq!(quantize_subpixel(0.25), 1);
        assert_eq!(quantize_subpixel(0.49), 1);
        assert_eq!(quantize_subpixel(0.5), 2);
        assert_eq!(quantize_subpixel(0.8), 3);
        assert_eq!(quantize_subpixel(1.0), 0);
        assert_eq!(quantize_subpixel(-0.25), 3);
    }

    #[test]
    fn test_packing() {
        let id = PackedGlyphId::with_subpixel(0xFFFF_FFFF, 3, 2);
        assert_eq!(id.glyph_id(), 0xFFFF_FFFF);
        assert_eq!(id.subpixel_x(), 3);
        assert_eq!(id.subpixel_y(), 2);
        assert_eq!(id.subpixel_offset(), Vec2::new(0.75, 0.5));

        let plain = PackedGlyphId::from(42);
        assert_eq!(plain, PackedGlyphId::with_subpixel(42, 0, 0));
        assert_ne!(plain, PackedGlyphId::with_subpixel(42, 1, 0));
        assert_ne!(plain, PackedGlyphId::with_subpixel(42, 0, 1));
    }

    #[test]
    fn test_bucket_wraps() {
        assert_eq!(
            PackedGlyphId::with_subpixel(7, 5, 6),
            PackedGlyphId::with_subpixel(7, 1, 2)
        );
    }

    #[test]
    fn test_no_subpixel_rounds_both_axes() {
        let spec = RoundingSpec::new(false, AxisAlignment::X);
        assert_eq!(spec.half_axis_sample_freq(), Vec2::new(0.5, 0.5));
        assert!(!spec.subpixel_x() && !spec.subpixel_y());

        let (id, origin) = spec.pack(9, Point::new(1.4, 2.6));
        assert_eq!(id, PackedGlyphId::new(9));
        assert_eq!(origin, Point::new(1.0, 3.0));
    }

    #[test]
    fn test_horizontal_subpixel() {
        let spec = RoundingSpec::new(true, AxisAlignment::X);
        assert_eq!(spec.half_axis_sample_freq(), Vec2::new(0.125, 0.5));

        // 1.3 is nearest to the 0.25 bucket.
        let (id, origin) = spec.pack(9, Point::new(1.3, 2.3));
        assert_eq!(id, PackedGlyphId::with_subpixel(9, 1, 0));
        assert_eq!(origin, Point::new(1.0, 2.0));

        // 1.9 is nearest to the next whole pixel.
        let (id, origin) = spec.pack(9, Point::new(1.9, 2.0));
        assert_eq!(id, PackedGlyphId::with_subpixel(9, 0, 0));
        assert_eq!(origin, Point::new(2.0, 2.0));
    }

    #[test]
    fn test_vertical_and_unaligned_subpixel() {
        let spec = RoundingSpec::new(true, AxisAlignment::Y);
        let (id, _) = spec.pack(3, Point::new(0.5, 0.5));
        assert_eq!(id, PackedGlyphId::with_subpixel(3, 0, 2));

        let spec = RoundingSpec::new(true, AxisAlignment::None);
        let (id, origin) = spec.pack(3, Point::new(0.5, 0.75));
        assert_eq!(id, PackedGlyphId::with_subpixel(3, 2, 3));
        assert_eq!(origin, Point::new(0.0, 0.0));
    }

    #[test]
    fn test_non_finite_position() {
        let spec = RoundingSpec::new(true, AxisAlignment::X);
        let (id, origin) = spec.pack(1, Point::new(f64::NAN, 0.0));
        assert_eq!(id.glyph_id(), 1);
        assert!(!origin.is_finite());
    }
}
