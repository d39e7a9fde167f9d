// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scaling capability a cache is bound to, and the identity of a strike.

use core::fmt::{self, Display, Formatter};

use kurbo::{BezPath, Rect};

use crate::glyph::{GlyphClass, GlyphImage, GlyphMetrics};
use crate::key::{AxisAlignment, PackedGlyphId};

/// Suggested offset and thickness of an underline or strikeout.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct Decoration {
    /// Offset from the baseline.
    pub offset: f32,
    /// Thickness of the decoration.
    pub thickness: f32,
}

/// Metrics that apply to every glyph of a strike, in pixels.
///
/// Vertical values follow the font's convention: y points up, so `descent`
/// is usually negative.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct FontMetrics {
    /// Number of font design units per em.
    pub units_per_em: u16,
    /// Distance from the baseline to the top of the alignment box.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the alignment box.
    pub descent: f32,
    /// Recommended additional spacing between lines.
    pub leading: f32,
    /// Height of a typical capital letter.
    pub cap_height: Option<f32>,
    /// Height of a lowercase "x".
    pub x_height: Option<f32>,
    /// Average width of all non-zero width glyphs.
    pub average_width: Option<f32>,
    /// Largest advance width.
    pub max_width: Option<f32>,
    /// Underline placement.
    pub underline: Option<Decoration>,
    /// Strikeout placement.
    pub strikeout: Option<Decoration>,
    /// Union of all glyph bounds.
    pub bounds: Option<Rect>,
}

/// Slant of a typeface.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum Slant {
    /// Upright glyphs.
    #[default]
    Upright,
    /// Italic glyphs.
    Italic,
    /// Mechanically slanted glyphs.
    Oblique,
}

impl Display for Slant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Upright => "upright",
            Self::Italic => "italic",
            Self::Oblique => "oblique",
        })
    }
}

/// Identity and style of the typeface behind a scaler, for diagnostics.
#[derive(Clone, PartialEq, Debug)]
pub struct TypefaceInfo {
    /// An identifier unique to the typeface within the process.
    pub unique_id: u64,
    /// The family name.
    pub family_name: String,
    /// Weight on the CSS scale, 400 being regular.
    pub weight: f32,
    /// Width as a ratio of normal, 1.0 being normal.
    pub width: f32,
    /// Slant.
    pub slant: Slant,
}

impl Default for TypefaceInfo {
    fn default() -> Self {
        Self {
            unique_id: 0,
            family_name: String::new(),
            weight: 400.0,
            width: 1.0,
            slant: Slant::Upright,
        }
    }
}

/// Computes glyph data for one typeface at one size, transform and set of
/// rendering flags.
///
/// A scaler never fails loudly: anything it cannot produce is reported as
/// `None`, and the cache records that as a final answer.
pub trait Scaler: Send {
    /// Metrics shared by every glyph.
    fn font_metrics(&mut self) -> FontMetrics;

    /// Metrics of a single glyph.
    fn glyph_metrics(&mut self, glyph: PackedGlyphId) -> GlyphMetrics;

    /// The glyph outline in device space with y pointing down, if the glyph
    /// has one.
    fn outline(&mut self, glyph: PackedGlyphId) -> Option<BezPath>;

    /// The rendered glyph image.
    ///
    /// Only called for glyphs whose metrics are not empty. The image should
    /// match the size and format of `metrics`.
    fn image(&mut self, glyph: PackedGlyphId, metrics: &GlyphMetrics) -> Option<GlyphImage>;

    /// Decides which drawing strategies can handle the glyph.
    fn classify(&self, glyph: PackedGlyphId, metrics: &GlyphMetrics) -> GlyphClass {
        let _ = glyph;
        GlyphClass::from_metrics(metrics)
    }

    /// Whether glyphs are rendered at subpixel offsets.
    fn is_subpixel(&self) -> bool {
        false
    }

    /// The device axis text advances along.
    fn axis_alignment(&self) -> AxisAlignment {
        AxisAlignment::X
    }

    /// Identity and style of the typeface.
    fn typeface(&self) -> TypefaceInfo {
        TypefaceInfo::default()
    }
}

/// Identifies one strike configuration.
///
/// Two descriptors are equal when every parameter affecting glyph rendering
/// is equal, so a cache of caches can key on them.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct StrikeDescriptor {
    font_id: u64,
    font_index: u32,
    /// Font size as f32 bits (exact match, no quantization).
    size_bits: u32,
    /// The 2x2 part of the device transform as f64 bits.
    transform_bits: [u64; 4],
    hinted: bool,
    subpixel: bool,
}

impl StrikeDescriptor {
    /// Creates a descriptor for an unhinted, untransformed strike.
    ///
    /// # Arguments
    /// * `font_id` - Unique identifier for the font blob
    /// * `font_index` - Index within font collection
    /// * `size` - Font size in pixels per em
    pub fn new(font_id: u64, font_index: u32, size: f32) -> Self {
        Self {
            font_id,
            font_index,
            size_bits: size.to_bits(),
            transform_bits: [1.0, 0.0, 0.0, 1.0].map(f64::to_bits),
            hinted: false,
            subpixel: false,
        }
    }

    /// Sets the scale/skew coefficients `[a, b, c, d]` of the device transform.
    pub fn with_transform(mut self, coeffs: [f64; 4]) -> Self {
        self.transform_bits = coeffs.map(f64::to_bits);
        self
    }

    /// Sets whether hinting is applied.
    pub fn with_hinting(mut self, hinted: bool) -> Self {
        self.hinted = hinted;
        self
    }

    /// Sets whether glyphs are positioned at subpixel offsets.
    pub fn with_subpixel(mut self, subpixel: bool) -> Self {
        self.subpixel = subpixel;
        self
    }

    /// Unique identifier for the font blob.
    pub fn font_id(&self) -> u64 {
        self.font_id
    }

    /// Index within the font collection.
    pub fn font_index(&self) -> u32 {
        self.font_index
    }

    /// Font size in pixels per em.
    pub fn size(&self) -> f32 {
        f32::from_bits(self.size_bits)
    }

    /// The scale/skew coefficients `[a, b, c, d]` of the device transform.
    pub fn transform(&self) -> [f64; 4] {
        self.transform_bits.map(f64::from_bits)
    }

    /// Whether hinting is applied.
    pub fn hinted(&self) -> bool {
        self.hinted
    }

    /// Whether glyphs are positioned at subpixel offsets.
    pub fn subpixel(&self) -> bool {
        self.subpixel
    }
}

impl Display for StrikeDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.transform();
        write!(
            f,
            "font: {:016x}/{} size: {} matrix: [{a} {b} {c} {d}] hinted: {} subpixel: {}",
            self.font_id,
            self.font_index,
            self.size(),
            self.hinted,
            self.subpixel,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[test]
    fn test_descriptor_identity() {
        let base = StrikeDescriptor::new(1, 0, 16.0);
        assert_eq!(base, StrikeDescriptor::new(1, 0, 16.0));
        assert_ne!(base, StrikeDescriptor::new(1, 0, 16.5));
        assert_ne!(base, base.with_hinting(true));
        assert_ne!(base, base.with_subpixel(true));
        assert_ne!(base, base.with_transform([1.0, 0.0, -0.2, 1.0]));

        let mut set = HashSet::new();
        set.insert(base);
        set.insert(StrikeDescriptor::new(1, 0, 16.0));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_descriptor_accessors() {
        let desc = StrikeDescriptor::new(0xAB, 2, 12.5)
            .with_transform([2.0, 0.0, 0.0, 2.0])
            .with_hinting(true);
        assert_eq!(desc.font_id(), 0xAB);
        assert_eq!(desc.font_index(), 2);
        assert_eq!(desc.size(), 12.5);
        assert_eq!(desc.transform(), [2.0, 0.0, 0.0, 2.0]);
        assert!(desc.hinted());
        assert!(!desc.subpixel());
        assert_eq!(
            desc.to_string(),
            "font: 00000000000000ab/2 size: 12.5 matrix: [2 0 0 2] hinted: true subpixel: false"
        );
    }
}
