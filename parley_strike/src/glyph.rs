// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Glyph records and the data a scaler produces for them.

use std::sync::{Arc, OnceLock};

use kurbo::{BezPath, PathEl, Point, Rect};

use crate::key::PackedGlyphId;
use crate::scaler::Scaler;

/// Largest width or height of a glyph that can be placed in a mask atlas.
pub const MAX_ATLAS_DIMENSION: u16 = 256;

/// Fixed number of bytes charged for every new glyph record.
pub const GLYPH_RECORD_SIZE: usize = size_of::<Glyph>();

/// Pixel format of a glyph image.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum MaskFormat {
    /// One bit per pixel, rows padded to whole bytes.
    Bw,
    /// 8-bit coverage.
    #[default]
    A8,
    /// 16-bit subpixel coverage (5-6-5).
    Lcd16,
    /// 32-bit premultiplied color.
    Argb,
    /// 8-bit signed distance field.
    Sdf,
}

impl MaskFormat {
    /// Number of bytes in one row of an image `width` pixels wide.
    pub fn row_bytes(self, width: u16) -> usize {
        let width = usize::from(width);
        match self {
            Self::Bw => width.div_ceil(8),
            Self::A8 | Self::Sdf => width,
            Self::Lcd16 => width * 2,
            Self::Argb => width * 4,
        }
    }
}

/// Metrics of one scaled glyph.
///
/// The bounding box is in whole device pixels relative to the glyph origin,
/// with y pointing down.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct GlyphMetrics {
    /// Horizontal advance in pixels.
    pub advance_x: f32,
    /// Vertical advance in pixels.
    pub advance_y: f32,
    /// Offset from the origin to the left edge of the bounding box.
    pub bearing_x: i16,
    /// Offset from the origin to the top edge of the bounding box.
    pub bearing_y: i16,
    /// Width of the bounding box in pixels.
    pub width: u16,
    /// Height of the bounding box in pixels.
    pub height: u16,
    /// Format an image of this glyph is produced in.
    pub format: MaskFormat,
}

impl GlyphMetrics {
    /// Whether the glyph covers no pixels, like a space.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The larger of width and height.
    #[inline]
    pub fn max_dimension(&self) -> u16 {
        self.width.max(self.height)
    }

    /// Bytes per row of this glyph's image.
    #[inline]
    pub fn row_bytes(&self) -> usize {
        self.format.row_bytes(self.width)
    }

    /// Bytes needed for this glyph's image.
    #[inline]
    pub fn image_size(&self) -> usize {
        self.row_bytes() * usize::from(self.height)
    }

    /// The bounding box relative to the glyph origin.
    pub fn bounds(&self) -> Rect {
        let x0 = f64::from(self.bearing_x);
        let y0 = f64::from(self.bearing_y);
        Rect::new(
            x0,
            y0,
            x0 + f64::from(self.width),
            y0 + f64::from(self.height),
        )
    }
}

/// Properties that decide which drawing strategies can handle a glyph.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct GlyphClass {
    /// The glyph has its own colors and cannot be drawn as a single-color path.
    pub is_color: bool,
    /// The glyph can be drawn from a bitmap in a mask atlas.
    pub mask_drawable: bool,
    /// The glyph can be drawn from a signed distance field.
    pub sdf_drawable: bool,
}

impl GlyphClass {
    /// Classifies a glyph from its metrics alone.
    ///
    /// Color glyphs are those with an [`MaskFormat::Argb`] image. Atlas
    /// eligibility requires a non-empty glyph no larger than
    /// [`MAX_ATLAS_DIMENSION`] on either side, and distance fields additionally
    /// require the [`MaskFormat::Sdf`] format.
    pub fn from_metrics(metrics: &GlyphMetrics) -> Self {
        let mask_drawable =
            !metrics.is_empty() && metrics.max_dimension() <= MAX_ATLAS_DIMENSION;
        Self {
            is_color: metrics.format == MaskFormat::Argb,
            mask_drawable,
            sdf_drawable: mask_drawable && metrics.format == MaskFormat::Sdf,
        }
    }
}

/// A glyph outline in device space, y pointing down.
#[derive(Clone, PartialEq, Debug)]
pub struct Outline {
    path: BezPath,
    bounds: Rect,
}

impl Outline {
    /// Wraps a path, computing the bounds of its control points.
    pub fn new(path: BezPath) -> Self {
        let mut bounds: Option<Rect> = None;
        let mut add = |p: Point| {
            bounds = Some(bounds.map_or(Rect::from_points(p, p), |b| b.union_pt(p)));
        };
        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) => add(p),
                PathEl::QuadTo(p1, p2) => {
                    add(p1);
                    add(p2);
                }
                PathEl::CurveTo(p1, p2, p3) => {
                    add(p1);
                    add(p2);
                    add(p3);
                }
                PathEl::ClosePath => {}
            }
        }
        Self {
            path,
            bounds: bounds.unwrap_or(Rect::ZERO),
        }
    }

    /// The outline path.
    pub fn path(&self) -> &BezPath {
        &self.path
    }

    /// Bounds of the path's control points.
    ///
    /// This may be larger than the tight bounds of the curves.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Approximate heap and inline bytes held by this outline.
    pub fn approximate_bytes_used(&self) -> usize {
        size_of::<Self>() + self.path.elements().len() * size_of::<PathEl>()
    }
}

/// Pixels of one rendered glyph.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GlyphImage {
    width: u16,
    height: u16,
    format: MaskFormat,
    data: Vec<u8>,
}

impl GlyphImage {
    /// Creates an image from rows of `format.row_bytes(width)` bytes each.
    pub fn new(width: u16, height: u16, format: MaskFormat, data: Vec<u8>) -> Self {
        debug_assert_eq!(
            data.len(),
            format.row_bytes(width) * usize::from(height),
            "image data does not match its dimensions"
        );
        Self {
            width,
            height,
            format,
            data,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Pixel format.
    pub fn format(&self) -> MaskFormat {
        self.format
    }

    /// Bytes per row.
    pub fn row_bytes(&self) -> usize {
        self.format.row_bytes(self.width)
    }

    /// The pixel rows, top to bottom.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes held by the pixel data.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// Everything cached for one glyph identity.
///
/// Each field starts out absent and is filled in at most once; nothing is
/// ever cleared or recomputed. An outline or image slot can be filled with
/// "none", which is a final answer: the scaler could not produce one and
/// will not be asked again.
///
/// Records are shared as `Arc<Glyph>` and can be read without holding the
/// owning cache's lock.
#[derive(Debug)]
pub struct Glyph {
    id: PackedGlyphId,
    metrics: OnceLock<(GlyphMetrics, GlyphClass)>,
    outline: OnceLock<Option<Arc<Outline>>>,
    image: OnceLock<Option<Arc<GlyphImage>>>,
}

impl Glyph {
    pub(crate) fn new(id: PackedGlyphId) -> Self {
        Self {
            id,
            metrics: OnceLock::new(),
            outline: OnceLock::new(),
            image: OnceLock::new(),
        }
    }

    /// Creates a standalone record with metrics and an image.
    ///
    /// This is how results rasterized away from a cache are handed to
    /// [`ScalerCache::merge_glyph_and_image`](crate::ScalerCache::merge_glyph_and_image).
    /// `None` for `image` records that no image can be produced.
    pub fn with_image(
        id: PackedGlyphId,
        metrics: GlyphMetrics,
        class: GlyphClass,
        image: Option<GlyphImage>,
    ) -> Self {
        let glyph = Self::new(id);
        glyph.set_metrics(metrics, class);
        glyph.set_image(image);
        glyph
    }

    /// The key this record is stored under.
    #[inline]
    pub fn id(&self) -> PackedGlyphId {
        self.id
    }

    /// The glyph's metrics, if they have been computed.
    #[inline]
    pub fn metrics(&self) -> Option<&GlyphMetrics> {
        self.metrics.get().map(|(metrics, _)| metrics)
    }

    /// The glyph's drawing classification.
    ///
    /// All properties are false until metrics have been computed.
    #[inline]
    pub fn class(&self) -> GlyphClass {
        self.metrics
            .get()
            .map(|(_, class)| *class)
            .unwrap_or_default()
    }

    /// Whether the glyph has its own colors.
    #[inline]
    pub fn is_color(&self) -> bool {
        self.class().is_color
    }

    /// Whether the glyph covers no pixels, or has no metrics yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.metrics().is_none_or(GlyphMetrics::is_empty)
    }

    /// The larger of the glyph's width and height, or 0 without metrics.
    #[inline]
    pub fn max_dimension(&self) -> u16 {
        self.metrics().map_or(0, GlyphMetrics::max_dimension)
    }

    /// Whether the scaler has been asked for an outline.
    #[inline]
    pub fn outline_prepared(&self) -> bool {
        self.outline.get().is_some()
    }

    /// The glyph outline, if one was prepared and exists.
    #[inline]
    pub fn outline(&self) -> Option<&Arc<Outline>> {
        self.outline.get().and_then(Option::as_ref)
    }

    /// Whether the scaler has been asked for an image.
    #[inline]
    pub fn image_prepared(&self) -> bool {
        self.image.get().is_some()
    }

    /// The glyph image, if one was prepared and exists.
    #[inline]
    pub fn image(&self) -> Option<&Arc<GlyphImage>> {
        self.image.get().and_then(Option::as_ref)
    }

    /// Stores metrics unless some are already present. Returns whether they
    /// were stored.
    pub(crate) fn set_metrics(&self, metrics: GlyphMetrics, class: GlyphClass) -> bool {
        self.metrics.set((metrics, class)).is_ok()
    }

    /// Fills the outline slot if it is still empty, returning the bytes added.
    pub(crate) fn set_outline(&self, outline: Option<Outline>) -> usize {
        let bytes = outline.as_ref().map_or(0, Outline::approximate_bytes_used);
        match self.outline.set(outline.map(Arc::new)) {
            Ok(()) => bytes,
            Err(_) => 0,
        }
    }

    /// Fills the image slot if it is still empty, returning the bytes added.
    pub(crate) fn set_image(&self, image: Option<GlyphImage>) -> usize {
        let bytes = image.as_ref().map_or(0, GlyphImage::size_bytes);
        match self.image.set(image.map(Arc::new)) {
            Ok(()) => bytes,
            Err(_) => 0,
        }
    }

    pub(crate) fn prepare_metrics(&self, scaler: &mut dyn Scaler) {
        if self.metrics.get().is_some() {
            return;
        }
        let metrics = scaler.glyph_metrics(self.id);
        let class = scaler.classify(self.id, &metrics);
        self.set_metrics(metrics, class);
    }

    pub(crate) fn prepare_outline(&self, scaler: &mut dyn Scaler) -> usize {
        if self.outline_prepared() {
            return 0;
        }
        let outline = scaler.outline(self.id).map(Outline::new);
        if outline.is_none() {
            log::trace!("no outline for {:?}", self.id);
        }
        self.set_outline(outline)
    }

    /// Asks the scaler for an image. Empty glyphs never get one.
    pub(crate) fn prepare_image(&self, scaler: &mut dyn Scaler) -> usize {
        if self.image_prepared() {
            return 0;
        }
        let image = match self.metrics() {
            Some(metrics) if !metrics.is_empty() => scaler.image(self.id, metrics),
            _ => None,
        };
        if image.is_none() {
            log::trace!("no image for {:?}", self.id);
        }
        self.set_image(image)
    }

    /// Folds in metrics and image state computed elsewhere.
    ///
    /// Nothing happens once this record's image slot is filled. Otherwise
    /// missing metrics are copied and the image state of `from`, if it has
    /// one, is deep-copied. Returns the image bytes added.
    pub(crate) fn merge_metrics_and_image(&self, from: &Self) -> usize {
        if self.image_prepared() {
            return 0;
        }
        if let Some(&(metrics, class)) = from.metrics.get() {
            self.set_metrics(metrics, class);
        }
        match from.image.get() {
            Some(image) => self.set_image(image.as_deref().cloned()),
            None => 0,
        }
    }
}
