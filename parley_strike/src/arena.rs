// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Append-only storage for glyph records.

use std::sync::Arc;

use crate::glyph::{GLYPH_RECORD_SIZE, Glyph};

/// Stable index of a record in a [`GlyphArena`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub(crate) struct GlyphHandle(u32);

/// Owns every record of a cache.
///
/// Records are only ever appended, so a handle stays valid for the lifetime
/// of the arena. Nothing is freed until the arena itself is dropped.
#[derive(Debug, Default)]
pub(crate) struct GlyphArena {
    glyphs: Vec<Arc<Glyph>>,
    /// Total bytes charged: record overhead plus payloads.
    bytes_allocated: usize,
}

impl GlyphArena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends a record, returning its handle and the bytes charged for it.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "a single strike never holds anywhere near 2^32 glyphs"
    )]
    pub(crate) fn alloc(&mut self, glyph: Glyph) -> (GlyphHandle, usize) {
        let handle = GlyphHandle(self.glyphs.len() as u32);
        self.glyphs.push(Arc::new(glyph));
        self.bytes_allocated += GLYPH_RECORD_SIZE;
        (handle, GLYPH_RECORD_SIZE)
    }

    pub(crate) fn get(&self, handle: GlyphHandle) -> &Arc<Glyph> {
        &self.glyphs[handle.0 as usize]
    }

    /// Accounts for payload bytes stored in a record.
    pub(crate) fn charge(&mut self, bytes: usize) {
        self.bytes_allocated += bytes;
    }

    pub(crate) fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub(crate) fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }
}
