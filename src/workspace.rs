// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Preallocated scratch buffers shared across encoder passes.
//!
//! Every buffer the quantize and encode passes touch is sized once at
//! engine construction and reused for the engine's lifetime; the hot loops
//! never allocate. The write buffer is reserved for the worst case of the
//! band encoder: every palette color present in every band, each color row
//! emitted literally.

use crate::color::Color;
use crate::protocol::{FOOTER, HEADER};
use crate::MAX_COLORS;

/// Scratch storage owned by one engine handle.
pub(crate) struct Workspace {
    /// YUV-converted source plane, `width * height`.
    pub yuv: Vec<Color>,
    /// Diffusion error field, `(width + 2) * (height + 1)` signed triples.
    pub errors: Vec<[i32; 3]>,
    /// Encoded-stream build buffer.
    pub output: bytes::BytesMut,
    /// Per-color six-bit column patterns for the current band,
    /// `MAX_COLORS` rows of `width` cells.
    pub band_rows: Vec<u8>,
    /// 256-bit "color used in this band" bitmap.
    pub color_seen: [u32; MAX_COLORS / 32],
    /// Palette indices in first-seen order for the current band.
    pub band_colors: Vec<u8>,
}

impl Workspace {
    /// Allocates all scratch buffers for a `width x height` engine, or
    /// `None` when a buffer size overflows the address space.
    pub fn new(width: usize, height: usize) -> Option<Self> {
        let plane = width.checked_mul(height)?;
        let error_cells = width.checked_add(2)?.checked_mul(height.checked_add(1)?)?;
        let band_cells = width.checked_mul(MAX_COLORS)?;

        let bands = height.checked_add(5)? / 6;
        let band_bytes = width
            .checked_add(5)?
            .checked_mul(MAX_COLORS)?
            .checked_mul(bands)?;
        let output_bytes = (MAX_COLORS * 18 + 1)
            .checked_add(band_bytes)?
            .checked_add(HEADER.len() + FOOTER.len())?;

        Some(Workspace {
            yuv: vec![Color::from_packed(0); plane],
            errors: vec![[0; 3]; error_cells],
            output: bytes::BytesMut::with_capacity(output_bytes),
            band_rows: vec![0; band_cells],
            color_seen: [0; MAX_COLORS / 32],
            band_colors: Vec::with_capacity(MAX_COLORS),
        })
    }
}
