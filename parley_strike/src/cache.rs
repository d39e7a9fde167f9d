// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-strike glyph cache.

use core::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hashbrown::HashMap;
use kurbo::BezPath;
use smallvec::SmallVec;

use crate::arena::{GlyphArena, GlyphHandle};
use crate::buffer::{DrawStrategy, DrawableGlyphBuffer, RejectBuffer};
use crate::glyph::{Glyph, Outline};
use crate::intercept::Intercept;
use crate::key::{PackedGlyphId, RoundingSpec};
use crate::scaler::{FontMetrics, Scaler, StrikeDescriptor};

/// Default largest width or height of a glyph rasterized by
/// [`ScalerCache::prepare_for_drawing_masks_cpu`].
pub const MAX_CPU_IMAGE_DIMENSION: u16 = 8192;

/// Configuration for a [`ScalerCache`].
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct CacheOptions {
    /// Glyphs wider or taller than this are never rasterized for CPU mask
    /// drawing.
    pub max_cpu_image_dimension: u16,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_cpu_image_dimension: MAX_CPU_IMAGE_DIMENSION,
        }
    }
}

/// Glyph data for one strike: a typeface at one size, transform and set of
/// rendering flags.
///
/// Every glyph identity is resolved through the scaler at most once. Records
/// are created on first request, filled in lazily, and live as long as the
/// cache. Operations that may create or fill in records return the number of
/// bytes they added so an owner can enforce a memory budget across caches.
///
/// All operations are safe to call from multiple threads. A single lock is
/// held for the duration of each call, including any calls into the scaler.
pub struct ScalerCache {
    descriptor: StrikeDescriptor,
    font_metrics: FontMetrics,
    rounding_spec: RoundingSpec,
    options: CacheOptions,
    state: Mutex<CacheState>,
}

/// Everything guarded by the cache lock.
struct CacheState {
    scaler: Box<dyn Scaler>,
    glyph_map: HashMap<PackedGlyphId, GlyphHandle>,
    arena: GlyphArena,
    intercepts: HashMap<PackedGlyphId, SmallVec<[Intercept; 2]>>,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum PathDetail {
    MetricsOnly,
    MetricsAndPath,
}

impl CacheState {
    fn find(&self, id: PackedGlyphId) -> Option<Arc<Glyph>> {
        self.glyph_map
            .get(&id)
            .map(|&handle| Arc::clone(self.arena.get(handle)))
    }

    /// Adds a record without asking the scaler for anything.
    fn make_glyph(&mut self, id: PackedGlyphId) -> (Arc<Glyph>, usize) {
        let (handle, bytes) = self.arena.alloc(Glyph::new(id));
        self.glyph_map.insert(id, handle);
        (Arc::clone(self.arena.get(handle)), bytes)
    }

    fn find_or_make(&mut self, id: PackedGlyphId) -> (Arc<Glyph>, usize) {
        match self.find(id) {
            Some(glyph) => (glyph, 0),
            None => self.make_glyph(id),
        }
    }

    /// Looks up a record, creating it if needed, and makes sure it has
    /// metrics.
    fn glyph(&mut self, id: PackedGlyphId) -> (Arc<Glyph>, usize) {
        let (glyph, bytes) = self.find_or_make(id);
        // Records created by a merge may still lack metrics.
        glyph.prepare_metrics(self.scaler.as_mut());
        (glyph, bytes)
    }

    fn prepare_path(&mut self, glyph: &Glyph) -> usize {
        let bytes = glyph.prepare_outline(self.scaler.as_mut());
        self.arena.charge(bytes);
        bytes
    }

    fn prepare_image(&mut self, glyph: &Glyph) -> usize {
        let bytes = glyph.prepare_image(self.scaler.as_mut());
        self.arena.charge(bytes);
        bytes
    }

    fn internal_prepare(
        &mut self,
        ids: impl IntoIterator<Item = PackedGlyphId>,
        detail: PathDetail,
    ) -> (Vec<Arc<Glyph>>, usize) {
        let mut delta = 0;
        let glyphs = ids
            .into_iter()
            .map(|id| {
                let (glyph, bytes) = self.glyph(id);
                delta += bytes;
                if detail == PathDetail::MetricsAndPath {
                    delta += self.prepare_path(&glyph);
                }
                glyph
            })
            .collect();
        (glyphs, delta)
    }

    /// Runs `f` on every input glyph with a finite position and a non-empty
    /// bounding box, returning the bytes spent on new records.
    fn common_filter_loop(
        &mut self,
        drawables: &mut DrawableGlyphBuffer,
        mut f: impl FnMut(&mut Self, &mut DrawableGlyphBuffer, usize, Arc<Glyph>),
    ) -> usize {
        let mut total = 0;
        for index in 0..drawables.input().len() {
            let (id, position) = drawables.input()[index];
            if !position.is_finite() {
                continue;
            }
            let (glyph, bytes) = self.glyph(id);
            total += bytes;
            if !glyph.is_empty() {
                f(self, drawables, index, glyph);
            }
        }
        total
    }
}

impl ScalerCache {
    /// Creates an empty cache bound to `scaler`.
    ///
    /// When `font_metrics` is `None` they are fetched from the scaler right
    /// away.
    ///
    /// # Panics
    ///
    /// If the descriptor's size is negative or not finite.
    pub fn new(
        descriptor: StrikeDescriptor,
        scaler: Box<dyn Scaler>,
        font_metrics: Option<FontMetrics>,
    ) -> Self {
        Self::with_options(descriptor, scaler, font_metrics, CacheOptions::default())
    }

    /// Creates an empty cache with the given options.
    ///
    /// # Panics
    ///
    /// If the descriptor's size is negative or not finite.
    pub fn with_options(
        descriptor: StrikeDescriptor,
        mut scaler: Box<dyn Scaler>,
        font_metrics: Option<FontMetrics>,
        options: CacheOptions,
    ) -> Self {
        let size = descriptor.size();
        assert!(
            size.is_finite() && size >= 0.0,
            "strike size must be finite and non-negative, got {size}"
        );
        let font_metrics = font_metrics.unwrap_or_else(|| scaler.font_metrics());
        let rounding_spec = RoundingSpec::new(scaler.is_subpixel(), scaler.axis_alignment());
        log::debug!("creating strike cache for {descriptor}");
        Self {
            descriptor,
            font_metrics,
            rounding_spec,
            options,
            state: Mutex::new(CacheState {
                scaler,
                glyph_map: HashMap::new(),
                arena: GlyphArena::new(),
                intercepts: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Slots are write-once cells, so a panic elsewhere cannot leave a
        // record half written.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The strike this cache holds glyphs for.
    pub fn descriptor(&self) -> &StrikeDescriptor {
        &self.descriptor
    }

    /// Metrics shared by every glyph of the strike.
    pub fn font_metrics(&self) -> &FontMetrics {
        &self.font_metrics
    }

    /// How device positions are turned into glyph keys for this strike.
    pub fn rounding_spec(&self) -> &RoundingSpec {
        &self.rounding_spec
    }

    /// The options this cache was created with.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Number of distinct glyph keys with a record.
    pub fn glyph_count(&self) -> usize {
        self.lock().glyph_map.len()
    }

    /// Total bytes charged so far, the sum of every delta returned.
    pub fn memory_used(&self) -> usize {
        self.lock().arena.bytes_allocated()
    }

    /// Returns records with metrics for `glyph_ids`, in order.
    pub fn metrics(&self, glyph_ids: &[u32]) -> (Vec<Arc<Glyph>>, usize) {
        self.lock().internal_prepare(
            glyph_ids.iter().copied().map(PackedGlyphId::new),
            PathDetail::MetricsOnly,
        )
    }

    /// Returns records with metrics and a prepared outline for `glyph_ids`,
    /// in order.
    pub fn prepare_paths(&self, glyph_ids: &[u32]) -> (Vec<Arc<Glyph>>, usize) {
        self.lock().internal_prepare(
            glyph_ids.iter().copied().map(PackedGlyphId::new),
            PathDetail::MetricsAndPath,
        )
    }

    /// Returns records with metrics and a prepared image for `glyph_ids`, in
    /// order.
    pub fn prepare_images(&self, glyph_ids: &[PackedGlyphId]) -> (Vec<Arc<Glyph>>, usize) {
        let mut state = self.lock();
        let mut delta = 0;
        let glyphs = glyph_ids
            .iter()
            .map(|&id| {
                let (glyph, bytes) = state.glyph(id);
                delta += bytes + state.prepare_image(&glyph);
                glyph
            })
            .collect();
        (glyphs, delta)
    }

    /// Folds in metrics and an image rendered away from the cache.
    ///
    /// The record for `id` is created if needed. If its image was already
    /// prepared nothing else changes; otherwise metrics are copied when
    /// missing, and the image state of `from` is copied.
    pub fn merge_glyph_and_image(&self, id: PackedGlyphId, from: &Glyph) -> (Arc<Glyph>, usize) {
        let mut state = self.lock();
        let (glyph, bytes) = state.find_or_make(id);
        let image_bytes = glyph.merge_metrics_and_image(from);
        state.arena.charge(image_bytes);
        log::trace!("merged image for {id:?}: {image_bytes} bytes");
        (glyph, bytes + image_bytes)
    }

    /// Folds in an outline computed away from the cache.
    ///
    /// `None` records that the glyph has no outline. An outline that was
    /// already prepared is kept and `path` is discarded.
    pub fn merge_path(&self, id: PackedGlyphId, path: Option<BezPath>) -> (Arc<Glyph>, usize) {
        let mut state = self.lock();
        let (glyph, bytes) = state.find_or_make(id);
        let path_bytes = glyph.set_outline(path.map(Outline::new));
        state.arena.charge(path_bytes);
        log::trace!("merged outline for {id:?}: {path_bytes} bytes");
        (glyph, bytes + path_bytes)
    }

    /// Accepts glyphs that can be drawn from an atlas bitmap, rejecting the
    /// rest.
    ///
    /// Images are prepared for atlas-eligible glyphs. Glyphs at non-finite
    /// positions and empty glyphs are skipped.
    pub fn prepare_for_mask_drawing(
        &self,
        drawables: &mut DrawableGlyphBuffer,
        rejects: &mut RejectBuffer,
    ) -> usize {
        let mut image_delta = 0;
        let delta = self
            .lock()
            .common_filter_loop(drawables, |state, drawables, index, glyph| {
                if glyph.class().mask_drawable {
                    image_delta += state.prepare_image(&glyph);
                    if glyph.image().is_some() {
                        drawables.accept(index, glyph, DrawStrategy::Mask);
                        return;
                    }
                }
                rejects.reject(index);
            });
        delta + image_delta
    }

    /// Accepts glyphs that can be drawn from a signed distance field,
    /// rejecting the rest.
    pub fn prepare_for_sdft_drawing(
        &self,
        drawables: &mut DrawableGlyphBuffer,
        rejects: &mut RejectBuffer,
    ) -> usize {
        self.lock()
            .common_filter_loop(drawables, |_, drawables, index, glyph| {
                if glyph.class().sdf_drawable {
                    drawables.accept(index, glyph, DrawStrategy::Sdf);
                } else {
                    rejects.reject(index);
                }
            })
    }

    /// Accepts glyphs that can be drawn by filling their outline.
    ///
    /// Color glyphs and glyphs without an outline are rejected along with
    /// their largest dimension, so a fallback can pick a bitmap size.
    pub fn prepare_for_path_drawing(
        &self,
        drawables: &mut DrawableGlyphBuffer,
        rejects: &mut RejectBuffer,
    ) -> usize {
        let mut path_delta = 0;
        let delta = self
            .lock()
            .common_filter_loop(drawables, |state, drawables, index, glyph| {
                if !glyph.is_color() {
                    path_delta += state.prepare_path(&glyph);
                    if glyph.outline().is_some() {
                        drawables.accept(index, glyph, DrawStrategy::Path);
                        return;
                    }
                }
                rejects.reject_with_dimension(index, glyph.max_dimension());
            });
        delta + path_delta
    }

    /// Accepts glyphs with an image for drawing on the CPU.
    ///
    /// Glyphs larger than [`CacheOptions::max_cpu_image_dimension`] are
    /// dropped without being rasterized, and glyphs the scaler has no image
    /// for are dropped too. Nothing is rejected.
    pub fn prepare_for_drawing_masks_cpu(&self, drawables: &mut DrawableGlyphBuffer) -> usize {
        let max_dimension = self.options.max_cpu_image_dimension;
        let mut image_delta = 0;
        let delta = self
            .lock()
            .common_filter_loop(drawables, |state, drawables, index, glyph| {
                if glyph.max_dimension() > max_dimension {
                    log::trace!(
                        "skipping {:?}: {} px exceeds the CPU image limit",
                        glyph.id(),
                        glyph.max_dimension()
                    );
                    return;
                }
                image_delta += state.prepare_image(&glyph);
                if glyph.image().is_some() {
                    drawables.accept(index, glyph, DrawStrategy::CpuMask);
                }
            });
        delta + image_delta
    }

    /// Appends where `glyph`'s outline crosses the horizontal band between
    /// `bounds[0]` and `bounds[1]`, returning the number of values written.
    ///
    /// The band is in outline coordinates. The left and right edges of the ink
    /// inside it are written as `edge * scale + x_pos`. Nothing is written if
    /// the outline misses the band, or if no outline was prepared for the
    /// glyph. Results are cached per glyph and band for records owned by
    /// this cache; records from elsewhere are measured on every call.
    pub fn find_intercepts(
        &self,
        bounds: [f32; 2],
        scale: f32,
        x_pos: f32,
        glyph: &Glyph,
        out: &mut Vec<f32>,
    ) -> usize {
        let mut state = self.lock();
        let Some(outline) = glyph.outline() else {
            return 0;
        };
        let owned = state
            .find(glyph.id())
            .is_some_and(|record| core::ptr::eq(&*record, glyph));
        if !owned {
            return Intercept::new(outline, bounds).write(scale, x_pos, out);
        }
        let cached = state.intercepts.entry(glyph.id()).or_default();
        let intercept = match cached.iter().find(|intercept| intercept.matches(bounds)) {
            Some(intercept) => *intercept,
            None => {
                let intercept = Intercept::new(outline, bounds);
                cached.push(intercept);
                intercept
            }
        };
        intercept.write(scale, x_pos, out)
    }

    /// Describes the typeface, strike and glyph count, also logging it at
    /// debug level.
    pub fn dump(&self) -> String {
        let state = self.lock();
        let face = state.scaler.typeface();
        let msg = format!(
            "cache typeface:{:x} {:>25}:({},{},{})\n {} glyphs:{:3}",
            face.unique_id,
            face.family_name,
            face.weight,
            face.width,
            face.slant,
            self.descriptor,
            state.glyph_map.len(),
        );
        log::debug!("{msg}");
        msg
    }
}

impl Debug for ScalerCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScalerCache")
            .field("descriptor", &self.descriptor)
            .field("rounding_spec", &self.rounding_spec)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
