// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`Scaler`] over OpenType font data.

use core::fmt::{Debug, Formatter};
use std::sync::Arc;

use kurbo::{BezPath, Rect, Vec2};
use skrifa::attribute::Style;
use skrifa::bitmap::{BitmapData, BitmapGlyph, Origin};
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::string::StringId;
use skrifa::{FontRef, GlyphId, MetadataProvider};

use crate::error::Error;
use crate::glyph::{GlyphClass, GlyphImage, GlyphMetrics, MaskFormat};
use crate::key::PackedGlyphId;
use crate::scaler::{Decoration, FontMetrics, Scaler, Slant, StrikeDescriptor, TypefaceInfo};

/// Scales glyphs of one font at one size, unhinted and at the default
/// variation location.
///
/// Outlines come from the `glyf`, `CFF` or `CFF2` tables. Images are only
/// produced for glyphs with an embedded bitmap strike at exactly the
/// requested size, in BGRA color or as an unpacked 1 or 8 bit mask; other
/// glyphs are expected to be drawn from their outline.
pub struct SkrifaScaler {
    data: Arc<[u8]>,
    index: u32,
    size: f32,
    font_id: u64,
    subpixel: bool,
}

impl SkrifaScaler {
    /// Creates a scaler for the font at `index` in `data`, at `size` pixels
    /// per em.
    pub fn new(data: Arc<[u8]>, index: u32, size: f32) -> Result<Self, Error> {
        if !size.is_finite() || size < 0.0 {
            return Err(Error::InvalidSize(size));
        }
        FontRef::from_index(&data, index)?;
        Ok(Self {
            data,
            index,
            size,
            font_id: 0,
            subpixel: false,
        })
    }

    /// Sets whether glyphs are rendered at subpixel offsets.
    pub fn subpixel(mut self, subpixel: bool) -> Self {
        self.subpixel = subpixel;
        self
    }

    /// Sets the identifier reported as the typeface's unique id and used in
    /// [`descriptor`](Self::descriptor).
    pub fn with_font_id(mut self, font_id: u64) -> Self {
        self.font_id = font_id;
        self
    }

    /// The descriptor of the strike this scaler renders.
    pub fn descriptor(&self) -> StrikeDescriptor {
        StrikeDescriptor::new(self.font_id, self.index, self.size).with_subpixel(self.subpixel)
    }

    fn font(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(&self.data, self.index).ok()
    }

    fn bitmap<'a>(&self, font: &FontRef<'a>, glyph: PackedGlyphId) -> Option<BitmapGlyph<'a>> {
        let bitmap = font
            .bitmap_strikes()
            .glyph_for_size(Size::new(self.size), GlyphId::new(glyph.glyph_id()))?;
        // Bitmaps are never resampled.
        let ppem = self.size.round();
        let exact = bitmap.ppem_x == ppem && bitmap.ppem_y == ppem;
        (exact && bitmap_format(&bitmap.data).is_some()).then_some(bitmap)
    }

    fn bitmap_metrics(&self, font: &FontRef<'_>, bitmap: &BitmapGlyph<'_>) -> Option<GlyphMetrics> {
        let format = bitmap_format(&bitmap.data)?;
        let width = u16::try_from(bitmap.width).ok()?;
        let height = u16::try_from(bitmap.height).ok()?;
        let upem = font
            .metrics(Size::unscaled(), LocationRef::default())
            .units_per_em;
        let scale = self.size / f32::from(upem.max(1));
        let left = bitmap.bearing_x * scale + bitmap.inner_bearing_x;
        let mut top = -(bitmap.bearing_y * scale + bitmap.inner_bearing_y);
        if let Origin::BottomLeft = bitmap.placement_origin {
            top -= f32::from(height);
        }
        Some(GlyphMetrics {
            advance_x: bitmap.advance.unwrap_or_default(),
            advance_y: 0.0,
            bearing_x: clamp_i16(f64::from(left).round()),
            bearing_y: clamp_i16(f64::from(top).round()),
            width,
            height,
            format,
        })
    }
}

fn bitmap_format(data: &BitmapData<'_>) -> Option<MaskFormat> {
    match data {
        BitmapData::Bgra(_) => Some(MaskFormat::Argb),
        BitmapData::Mask(mask) if !mask.is_packed && mask.bpp == 8 => Some(MaskFormat::A8),
        BitmapData::Mask(mask) if !mask.is_packed && mask.bpp == 1 => Some(MaskFormat::Bw),
        _ => None,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped to the i16 range"
)]
fn clamp_i16(value: f64) -> i16 {
    value.clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to the u16 range"
)]
fn clamp_u16(value: f64) -> u16 {
    value.clamp(0.0, f64::from(u16::MAX)) as u16
}

impl Scaler for SkrifaScaler {
    fn font_metrics(&mut self) -> FontMetrics {
        let Some(font) = self.font() else {
            return FontMetrics::default();
        };
        let metrics = font.metrics(Size::new(self.size), LocationRef::default());
        let decoration = |d: skrifa::metrics::Decoration| Decoration {
            offset: d.offset,
            thickness: d.thickness,
        };
        FontMetrics {
            units_per_em: metrics.units_per_em,
            ascent: metrics.ascent,
            descent: metrics.descent,
            leading: metrics.leading,
            cap_height: metrics.cap_height,
            x_height: metrics.x_height,
            average_width: metrics.average_width,
            max_width: metrics.max_width,
            underline: metrics.underline.map(decoration),
            strikeout: metrics.strikeout.map(decoration),
            bounds: metrics.bounds.map(|b| {
                Rect::new(
                    f64::from(b.x_min),
                    f64::from(b.y_min),
                    f64::from(b.x_max),
                    f64::from(b.y_max),
                )
            }),
        }
    }

    fn glyph_metrics(&mut self, glyph: PackedGlyphId) -> GlyphMetrics {
        let Some(font) = self.font() else {
            return GlyphMetrics::default();
        };
        let gid = GlyphId::new(glyph.glyph_id());
        let glyph_metrics = font.glyph_metrics(Size::new(self.size), LocationRef::default());
        let advance_x = glyph_metrics.advance_width(gid).unwrap_or_default();

        if let Some(bitmap) = self.bitmap(&font, glyph) {
            if let Some(mut metrics) = self.bitmap_metrics(&font, &bitmap) {
                if bitmap.advance.is_none() {
                    metrics.advance_x = advance_x;
                }
                return metrics;
            }
        }

        let format = if font.color_glyphs().get(gid).is_some() {
            MaskFormat::Argb
        } else {
            MaskFormat::A8
        };
        let Some(bounds) = glyph_metrics.bounds(gid) else {
            return GlyphMetrics {
                advance_x,
                format,
                ..GlyphMetrics::default()
            };
        };
        // Font space is y up; glyph bounds are y down.
        let offset = glyph.subpixel_offset();
        let left = (f64::from(bounds.x_min) + offset.x).floor();
        let right = (f64::from(bounds.x_max) + offset.x).ceil();
        let top = (offset.y - f64::from(bounds.y_max)).floor();
        let bottom = (offset.y - f64::from(bounds.y_min)).ceil();
        GlyphMetrics {
            advance_x,
            advance_y: 0.0,
            bearing_x: clamp_i16(left),
            bearing_y: clamp_i16(top),
            width: clamp_u16(right - left),
            height: clamp_u16(bottom - top),
            format,
        }
    }

    fn outline(&mut self, glyph: PackedGlyphId) -> Option<BezPath> {
        let font = self.font()?;
        let outline = font
            .outline_glyphs()
            .get(GlyphId::new(glyph.glyph_id()))?;
        let mut pen = DevicePen::new(glyph.subpixel_offset());
        let settings = DrawSettings::unhinted(Size::new(self.size), LocationRef::default());
        outline.draw(settings, &mut pen).ok()?;
        Some(pen.path)
    }

    fn image(&mut self, glyph: PackedGlyphId, metrics: &GlyphMetrics) -> Option<GlyphImage> {
        let font = self.font()?;
        let bitmap = self.bitmap(&font, glyph)?;
        let data = match bitmap.data {
            BitmapData::Bgra(data) => data,
            BitmapData::Mask(mask) => mask.data,
            BitmapData::Png(_) => return None,
        };
        let len = metrics.image_size();
        let pixels = data.get(..len)?;
        Some(GlyphImage::new(
            metrics.width,
            metrics.height,
            metrics.format,
            pixels.to_vec(),
        ))
    }

    fn classify(&self, glyph: PackedGlyphId, metrics: &GlyphMetrics) -> GlyphClass {
        let mut class = GlyphClass::from_metrics(metrics);
        // Only embedded bitmaps can be placed in an atlas.
        if class.mask_drawable {
            class.mask_drawable = self
                .font()
                .is_some_and(|font| self.bitmap(&font, glyph).is_some());
        }
        class
    }

    fn is_subpixel(&self) -> bool {
        self.subpixel
    }

    fn typeface(&self) -> TypefaceInfo {
        let Some(font) = self.font() else {
            return TypefaceInfo {
                unique_id: self.font_id,
                ..TypefaceInfo::default()
            };
        };
        let attributes = font.attributes();
        let family_name = font
            .localized_strings(StringId::FAMILY_NAME)
            .english_or_first()
            .map(|name| name.to_string())
            .unwrap_or_default();
        TypefaceInfo {
            unique_id: self.font_id,
            family_name,
            weight: attributes.weight.value(),
            width: attributes.stretch.ratio(),
            slant: match attributes.style {
                Style::Normal => Slant::Upright,
                Style::Italic => Slant::Italic,
                Style::Oblique(_) => Slant::Oblique,
            },
        }
    }
}

impl Debug for SkrifaScaler {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SkrifaScaler")
            .field("data_len", &self.data.len())
            .field("index", &self.index)
            .field("size", &self.size)
            .field("font_id", &self.font_id)
            .field("subpixel", &self.subpixel)
            .finish()
    }
}

/// Collects an outline into a device space path, flipping y to point down
/// and shifting by the glyph's subpixel offset.
struct DevicePen {
    path: BezPath,
    offset: Vec2,
}

impl DevicePen {
    fn new(offset: Vec2) -> Self {
        Self {
            path: BezPath::new(),
            offset,
        }
    }

    #[inline]
    fn point(&self, x: f32, y: f32) -> (f64, f64) {
        (
            f64::from(x) + self.offset.x,
            self.offset.y - f64::from(y),
        )
    }
}

impl OutlinePen for DevicePen {
    #[inline]
    fn move_to(&mut self, x: f32, y: f32) {
        let p = self.point(x, y);
        self.path.move_to(p);
    }

    #[inline]
    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.point(x, y);
        self.path.line_to(p);
    }

    #[inline]
    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        let p1 = self.point(cx0, cy0);
        let p2 = self.point(x, y);
        self.path.quad_to(p1, p2);
    }

    #[inline]
    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let p1 = self.point(cx0, cy0);
        let p2 = self.point(cx1, cy1);
        let p3 = self.point(x, y);
        self.path.curve_to(p1, p2, p3);
    }

    #[inline]
    fn close(&mut self) {
        self.path.close_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DrawableGlyphBuffer, RejectBuffer, ScalerCache};
    use kurbo::{PathEl, Point, Shape};
    use skrifa::raw::TableProvider;

    fn font_cache(data: &'static [u8], size: f32, subpixel: bool) -> ScalerCache {
        let scaler = SkrifaScaler::new(Arc::from(data), 0, size)
            .unwrap()
            .subpixel(subpixel);
        ScalerCache::new(scaler.descriptor(), Box::new(scaler), None)
    }

    fn all_glyphs(data: &[u8]) -> Vec<u32> {
        let count = FontRef::new(data).unwrap().maxp().unwrap().num_glyphs();
        (0..u32::from(count)).collect()
    }

    #[test]
    fn test_rejects_bad_size() {
        let data: Arc<[u8]> = Arc::from(vec![0_u8; 4]);
        assert!(matches!(
            SkrifaScaler::new(Arc::clone(&data), 0, f32::NAN),
            Err(Error::InvalidSize(_))
        ));
        assert!(matches!(
            SkrifaScaler::new(data, 0, -2.0),
            Err(Error::InvalidSize(size)) if size == -2.0
        ));
    }

    #[test]
    fn test_rejects_invalid_font_data() {
        let data: Arc<[u8]> = Arc::from(&b"not a font"[..]);
        assert!(matches!(
            SkrifaScaler::new(data, 0, 16.0),
            Err(Error::Read(_))
        ));
    }

    #[test]
    fn test_pen_flips_y_and_applies_offset() {
        let mut pen = DevicePen::new(Vec2::new(0.25, 0.0));
        pen.move_to(1.0, 2.0);
        pen.line_to(3.0, -4.0);
        pen.quad_to(5.0, 6.0, 7.0, 8.0);
        pen.close();
        assert_eq!(
            pen.path.elements(),
            &[
                PathEl::MoveTo(Point::new(1.25, -2.0)),
                PathEl::LineTo(Point::new(3.25, 4.0)),
                PathEl::QuadTo(Point::new(5.25, -6.0), Point::new(7.25, -8.0)),
                PathEl::ClosePath,
            ]
        );
    }

    #[test]
    fn test_bitmap_formats() {
        assert_eq!(bitmap_format(&BitmapData::Bgra(&[])), Some(MaskFormat::Argb));
        assert_eq!(bitmap_format(&BitmapData::Png(&[])), None);
        let mask = |bpp, is_packed| {
            BitmapData::Mask(skrifa::bitmap::MaskData {
                bpp,
                is_packed,
                data: &[],
            })
        };
        assert_eq!(bitmap_format(&mask(8, false)), Some(MaskFormat::A8));
        assert_eq!(bitmap_format(&mask(1, false)), Some(MaskFormat::Bw));
        assert_eq!(bitmap_format(&mask(1, true)), None);
        assert_eq!(bitmap_format(&mask(4, false)), None);
    }

    #[test]
    fn test_clamping() {
        assert_eq!(clamp_i16(-1.0e9), i16::MIN);
        assert_eq!(clamp_i16(12.0), 12);
        assert_eq!(clamp_u16(-3.0), 0);
        assert_eq!(clamp_u16(1.0e9), u16::MAX);
    }

    #[test]
    fn test_outlines_fit_metrics() {
        for (data, family) in [
            (font_test_data::TINOS_SUBSET, "Tinos"),
            (font_test_data::AHEM, "Ahem"),
        ] {
            let cache = font_cache(data, 16.0, true);
            let metrics = cache.font_metrics();
            assert!(metrics.units_per_em > 0);
            assert!(metrics.ascent > 0.0 && metrics.descent < 0.0);
            assert!(cache.dump().contains(family), "{}", cache.dump());

            let ids = all_glyphs(data);
            let mut drawables = DrawableGlyphBuffer::new();
            let mut rejects = RejectBuffer::new();
            drawables.start_device(
                ids.iter().map(|&id| (id, Point::new(1.3, 5.0))),
                cache.rounding_spec(),
            );
            cache.prepare_for_path_drawing(&mut drawables, &mut rejects);
            assert!(!drawables.drawables().is_empty(), "{family}");

            let mut above_baseline = false;
            for drawable in drawables.drawables() {
                let glyph = &drawable.glyph;
                assert_eq!(glyph.id().subpixel_offset().x, 0.25);
                let metrics = glyph.metrics().unwrap();
                let ink = drawable.outline().unwrap().path().bounding_box();
                let bounds = metrics.bounds().inflate(1e-3, 1e-3);
                assert!(
                    bounds.contains(ink.origin()) && bounds.contains(Point::new(ink.x1, ink.y1)),
                    "{family} {:?}: {ink:?} outside {bounds:?}",
                    glyph.id()
                );
                // Device space is y down.
                above_baseline |= metrics.bearing_y < 0;
            }
            assert!(above_baseline, "{family}");
        }
    }

    #[test]
    fn test_colr_glyphs_are_color() {
        let data = font_test_data::COLRV0V1;
        let font = FontRef::new(data).unwrap();
        let colr: Vec<u32> = all_glyphs(data)
            .into_iter()
            .filter(|&id| font.color_glyphs().get(GlyphId::new(id)).is_some())
            .collect();
        assert!(!colr.is_empty());

        let cache = font_cache(data, 16.0, false);
        let (glyphs, _) = cache.metrics(&colr);
        assert!(glyphs.iter().all(|glyph| glyph.is_color()));

        let mut drawables = DrawableGlyphBuffer::new();
        let mut rejects = RejectBuffer::new();
        drawables.start_source(colr.iter().map(|&id| (id, Point::ORIGIN)));
        cache.prepare_for_path_drawing(&mut drawables, &mut rejects);
        assert!(drawables.drawables().is_empty());
        assert_eq!(rejects.len(), colr.len());
        for reject in rejects.rejects() {
            assert_eq!(
                reject.max_dimension,
                Some(glyphs[reject.index].max_dimension())
            );
        }
        assert!(glyphs.iter().all(|glyph| !glyph.outline_prepared()));
    }

    #[test]
    fn test_png_bitmaps_are_declined() {
        let data = font_test_data::CBDT;
        let cache = font_cache(data, 16.0, false);
        let ids: Vec<PackedGlyphId> = all_glyphs(data)
            .into_iter()
            .map(PackedGlyphId::new)
            .collect();
        let (glyphs, bytes) = cache.prepare_images(&ids);
        assert_eq!(bytes, cache.memory_used());
        assert!(glyphs.iter().all(|glyph| glyph.image_prepared()));
        assert!(glyphs.iter().all(|glyph| glyph.image().is_none()));
        assert!(glyphs.iter().all(|glyph| !glyph.class().mask_drawable));

        let mut drawables = DrawableGlyphBuffer::new();
        let mut rejects = RejectBuffer::new();
        drawables.start_source(ids.iter().map(|id| (id.glyph_id(), Point::ORIGIN)));
        cache.prepare_for_mask_drawing(&mut drawables, &mut rejects);
        assert!(drawables.drawables().is_empty());
        let non_empty = glyphs.iter().filter(|glyph| !glyph.is_empty()).count();
        assert_eq!(rejects.len(), non_empty);
    }
}
