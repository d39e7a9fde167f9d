// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Horizontal extents of glyph outlines inside a band, used to skip
//! underlines and strike-throughs around glyph ink.

use core::ops::RangeInclusive;

use kurbo::{Line, ParamCurve, ParamCurveExtrema, PathSeg};
use smallvec::SmallVec;

use crate::glyph::Outline;

/// The cached extent of one outline inside one band.
#[derive(Copy, Clone, PartialEq, Debug)]
pub(crate) struct Intercept {
    bounds: [f32; 2],
    /// `None` when the outline does not reach into the band.
    interval: Option<(f32, f32)>,
}

impl Intercept {
    /// Computes the extent of `outline` inside the band between `bounds[0]`
    /// and `bounds[1]`.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "intercepts are reported in f32 like the band bounds"
    )]
    pub(crate) fn new(outline: &Outline, bounds: [f32; 2]) -> Self {
        let top = f64::from(bounds[0].min(bounds[1]));
        let bottom = f64::from(bounds[0].max(bounds[1]));
        let interval = outline_interval(outline, top..=bottom)
            .map(|(left, right)| (left as f32, right as f32));
        Self { bounds, interval }
    }

    /// Whether this intercept was computed for exactly these bounds.
    pub(crate) fn matches(&self, bounds: [f32; 2]) -> bool {
        self.bounds[0].to_bits() == bounds[0].to_bits()
            && self.bounds[1].to_bits() == bounds[1].to_bits()
    }

    /// Appends the interval, scaled and offset, returning the number of
    /// values written.
    pub(crate) fn write(&self, scale: f32, x_pos: f32, out: &mut Vec<f32>) -> usize {
        match self.interval {
            Some((left, right)) => {
                out.extend([left * scale + x_pos, right * scale + x_pos]);
                2
            }
            None => 0,
        }
    }
}

fn outline_interval(outline: &Outline, y_span: RangeInclusive<f64>) -> Option<(f64, f64)> {
    let bounds = outline.bounds();
    if bounds.y1 < *y_span.start() || bounds.y0 > *y_span.end() {
        return None;
    }
    let mut extent: Option<(f64, f64)> = None;
    for seg in outline.path().segments() {
        for (left, right) in segment_extents(seg, &y_span) {
            extent = Some(match extent {
                Some((x0, x1)) => (x0.min(left), x1.max(right)),
                None => (left, right),
            });
        }
    }
    extent
}

/// Yields the x-extent of each piece of `seg` that lies inside the band.
///
/// The segment is cut wherever it crosses a band edge; a piece is inside the
/// band when its midpoint is.
fn segment_extents(
    seg: PathSeg,
    y_span: &RangeInclusive<f64>,
) -> impl Iterator<Item = (f64, f64)> + '_ {
    let seg_box = seg.bounding_box();
    let touches = seg_box.y1 >= *y_span.start() && seg_box.y0 <= *y_span.end();
    let mut cuts: SmallVec<[f64; 8]> = SmallVec::new();
    if touches {
        cuts.extend([0.0, 1.0]);
        for y in [*y_span.start(), *y_span.end()] {
            let edge = Line::new((seg_box.x0 - 1.0, y), (seg_box.x1 + 1.0, y));
            cuts.extend(seg.intersect_line(edge).iter().map(|hit| hit.segment_t));
        }
        cuts.sort_by(f64::total_cmp);
    }
    (0..cuts.len().saturating_sub(1)).filter_map(move |i| {
        let (t0, t1) = (cuts[i], cuts[i + 1]);
        if !y_span.contains(&seg.eval(0.5 * (t0 + t1)).y) {
            return None;
        }
        let piece = seg.subsegment(t0..t1).bounding_box();
        Some((piece.x0, piece.x1))
    })
}
