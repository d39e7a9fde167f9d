// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scripted scaler for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hashbrown::HashMap;
use kurbo::{BezPath, Shape};

use crate::glyph::{GlyphImage, GlyphMetrics, MaskFormat};
use crate::key::{AxisAlignment, PackedGlyphId};
use crate::scaler::{FontMetrics, Scaler, Slant, TypefaceInfo};

/// How many times each scaler entry point was called.
#[derive(Debug, Default)]
pub(crate) struct CallCounts {
    font_metrics: AtomicUsize,
    glyph_metrics: AtomicUsize,
    outline: AtomicUsize,
    image: AtomicUsize,
}

impl CallCounts {
    pub(crate) fn font_metrics(&self) -> usize {
        self.font_metrics.load(Ordering::Relaxed)
    }

    pub(crate) fn glyph_metrics(&self) -> usize {
        self.glyph_metrics.load(Ordering::Relaxed)
    }

    pub(crate) fn outline(&self) -> usize {
        self.outline.load(Ordering::Relaxed)
    }

    pub(crate) fn image(&self) -> usize {
        self.image.load(Ordering::Relaxed)
    }
}

#[derive(Copy, Clone, Debug)]
struct FakeGlyph {
    metrics: GlyphMetrics,
    has_outline: bool,
    has_image: bool,
}

/// Answers from a fixed table of glyphs.
///
/// Unknown glyphs are empty, with no outline or image. Outlines are the
/// rectangle of the glyph's bounds, and images are filled with the low byte
/// of the glyph index.
#[derive(Debug)]
pub(crate) struct FakeScaler {
    glyphs: HashMap<u32, FakeGlyph>,
    calls: Arc<CallCounts>,
    subpixel: bool,
    axis_alignment: AxisAlignment,
}

impl FakeScaler {
    pub(crate) fn new() -> Self {
        Self {
            glyphs: HashMap::new(),
            calls: Arc::default(),
            subpixel: false,
            axis_alignment: AxisAlignment::X,
        }
    }

    /// Adds a glyph with an outline and an image, spanning `width` by
    /// `height` pixels above the baseline.
    pub(crate) fn glyph(mut self, id: u32, width: u16, height: u16, format: MaskFormat) -> Self {
        let metrics = GlyphMetrics {
            advance_x: 10.0,
            advance_y: 0.0,
            bearing_x: 0,
            bearing_y: -i16::try_from(height).unwrap_or(i16::MAX),
            width,
            height,
            format,
        };
        self.glyphs.insert(
            id,
            FakeGlyph {
                metrics,
                has_outline: true,
                has_image: true,
            },
        );
        self
    }

    pub(crate) fn without_outline(mut self, id: u32) -> Self {
        if let Some(glyph) = self.glyphs.get_mut(&id) {
            glyph.has_outline = false;
        }
        self
    }

    pub(crate) fn without_image(mut self, id: u32) -> Self {
        if let Some(glyph) = self.glyphs.get_mut(&id) {
            glyph.has_image = false;
        }
        self
    }

    pub(crate) fn subpixel(mut self, axis_alignment: AxisAlignment) -> Self {
        self.subpixel = true;
        self.axis_alignment = axis_alignment;
        self
    }

    pub(crate) fn calls(&self) -> Arc<CallCounts> {
        Arc::clone(&self.calls)
    }

    fn lookup(&self, glyph: PackedGlyphId) -> Option<&FakeGlyph> {
        self.glyphs.get(&glyph.glyph_id())
    }
}

impl Scaler for FakeScaler {
    fn font_metrics(&mut self) -> FontMetrics {
        self.calls.font_metrics.fetch_add(1, Ordering::Relaxed);
        FontMetrics {
            units_per_em: 1000,
            ascent: 12.0,
            descent: -4.0,
            ..FontMetrics::default()
        }
    }

    fn glyph_metrics(&mut self, glyph: PackedGlyphId) -> GlyphMetrics {
        self.calls.glyph_metrics.fetch_add(1, Ordering::Relaxed);
        self.lookup(glyph)
            .map(|g| g.metrics)
            .unwrap_or(GlyphMetrics {
                advance_x: 5.0,
                ..GlyphMetrics::default()
            })
    }

    fn outline(&mut self, glyph: PackedGlyphId) -> Option<BezPath> {
        self.calls.outline.fetch_add(1, Ordering::Relaxed);
        let fake = self.lookup(glyph).filter(|g| g.has_outline)?;
        let bounds = fake.metrics.bounds() + glyph.subpixel_offset();
        Some(bounds.to_path(0.1))
    }

    fn image(&mut self, glyph: PackedGlyphId, metrics: &GlyphMetrics) -> Option<GlyphImage> {
        self.calls.image.fetch_add(1, Ordering::Relaxed);
        self.lookup(glyph).filter(|g| g.has_image)?;
        let fill = glyph.glyph_id().to_le_bytes()[0];
        Some(GlyphImage::new(
            metrics.width,
            metrics.height,
            metrics.format,
            vec![fill; metrics.image_size()],
        ))
    }

    fn is_subpixel(&self) -> bool {
        self.subpixel
    }

    fn axis_alignment(&self) -> AxisAlignment {
        self.axis_alignment
    }

    fn typeface(&self) -> TypefaceInfo {
        TypefaceInfo {
            unique_id: 0x2a,
            family_name: "Fake Sans".to_owned(),
            weight: 700.0,
            width: 1.0,
            slant: Slant::Italic,
        }
    }
}
