// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Buffers exchanged with the drawing passes of a [`ScalerCache`].
//!
//! [`ScalerCache`]: crate::ScalerCache

use std::sync::Arc;

use kurbo::Point;

use crate::glyph::{Glyph, Outline};
use crate::key::{PackedGlyphId, RoundingSpec};

/// How an accepted glyph is meant to be drawn.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DrawStrategy {
    /// From a bitmap placed in a mask atlas.
    Mask,
    /// From the glyph image, rasterized on the CPU.
    CpuMask,
    /// From a signed distance field.
    Sdf,
    /// By filling the glyph outline.
    Path,
}

/// A glyph accepted by a drawing pass.
#[derive(Clone, Debug)]
pub struct Drawable {
    /// Index of the glyph in the buffer's input.
    pub index: usize,
    /// The cached glyph record.
    pub glyph: Arc<Glyph>,
    /// The strategy that accepted it.
    pub strategy: DrawStrategy,
}

impl Drawable {
    /// The outline to fill, for glyphs accepted as [`DrawStrategy::Path`].
    pub fn outline(&self) -> Option<&Arc<Outline>> {
        self.glyph.outline()
    }
}

/// Positioned glyphs going into a drawing pass, and the ones it accepted.
///
/// Accepted glyphs accumulate across passes until the buffer is restarted,
/// each tagged with the strategy that accepted it.
#[derive(Clone, Debug, Default)]
pub struct DrawableGlyphBuffer {
    input: Vec<(PackedGlyphId, Point)>,
    drawables: Vec<Drawable>,
}

impl DrawableGlyphBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads glyphs whose positions are used as given, ignoring any subpixel
    /// offset.
    pub fn start_source(&mut self, glyphs: impl IntoIterator<Item = (u32, Point)>) {
        self.clear();
        self.input.extend(
            glyphs
                .into_iter()
                .map(|(id, position)| (PackedGlyphId::new(id), position)),
        );
    }

    /// Loads glyphs at device positions.
    ///
    /// Each position is rounded according to `rounding`; the whole pixel
    /// origin becomes the input position and the fraction is folded into the
    /// glyph key.
    pub fn start_device(
        &mut self,
        glyphs: impl IntoIterator<Item = (u32, Point)>,
        rounding: &RoundingSpec,
    ) {
        self.clear();
        self.input.extend(
            glyphs
                .into_iter()
                .map(|(id, position)| rounding.pack(id, position)),
        );
    }

    /// Appends one already keyed glyph to the input.
    pub fn push_input(&mut self, glyph: PackedGlyphId, position: Point) {
        self.input.push((glyph, position));
    }

    /// The glyphs to classify, in order.
    pub fn input(&self) -> &[(PackedGlyphId, Point)] {
        &self.input
    }

    /// Glyphs accepted so far, in input order within each pass.
    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    /// Take all accepted glyphs, leaving the list empty.
    pub fn take_drawables(&mut self) -> Vec<Drawable> {
        core::mem::take(&mut self.drawables)
    }

    /// Clears both the input and the accepted glyphs.
    pub fn clear(&mut self) {
        self.input.clear();
        self.drawables.clear();
    }

    pub(crate) fn accept(&mut self, index: usize, glyph: Arc<Glyph>, strategy: DrawStrategy) {
        self.drawables.push(Drawable {
            index,
            glyph,
            strategy,
        });
    }
}

/// A glyph a drawing pass could not handle.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Reject {
    /// Index of the glyph in the drawable buffer's input.
    pub index: usize,
    /// The glyph's largest dimension, when the pass reports it so a fallback
    /// can pick a suitable bitmap size.
    pub max_dimension: Option<u16>,
}

/// Glyphs rejected by drawing passes, for escalation to another strategy.
#[derive(Clone, Debug, Default)]
pub struct RejectBuffer {
    rejects: Vec<Reject>,
    max_dimension: u16,
}

impl RejectBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rejected glyph.
    pub fn reject(&mut self, index: usize) {
        self.rejects.push(Reject {
            index,
            max_dimension: None,
        });
    }

    /// Records a rejected glyph along with its largest dimension.
    pub fn reject_with_dimension(&mut self, index: usize, max_dimension: u16) {
        self.max_dimension = self.max_dimension.max(max_dimension);
        self.rejects.push(Reject {
            index,
            max_dimension: Some(max_dimension),
        });
    }

    /// The rejected glyphs, in the order they were rejected.
    pub fn rejects(&self) -> &[Reject] {
        &self.rejects
    }

    /// Input indices of the rejected glyphs.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.rejects.iter().map(|reject| reject.index)
    }

    /// The largest dimension reported with any rejected glyph.
    pub fn rejected_max_dimension(&self) -> u16 {
        self.max_dimension
    }

    /// Number of rejected glyphs.
    pub fn len(&self) -> usize {
        self.rejects.len()
    }

    /// Whether no glyph has been rejected.
    pub fn is_empty(&self) -> bool {
        self.rejects.is_empty()
    }

    /// Forgets all rejected glyphs.
    pub fn clear(&mut self) {
        self.rejects.clear();
        self.max_dimension = 0;
    }
}
