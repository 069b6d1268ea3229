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


//! Palette storage and the quantized-color lookup grid.
//!
//! Each surviving median-cut bucket contributes one representative color
//! (the rounded mean of the pixels inside its box) and claims its box's
//! cells in a 32x32x32 lookup grid mapping quantized YUV directly to a
//! palette index. Cells covered by no bucket hold -1; the diffuser falls
//! back to the undiffused source pixel for those, which is always covered.

use crate::color::Color;
use crate::cutter::Bucket;
use crate::histogram::{ColorBox, Histogram, CHANNEL_SHIFT, RESOLUTION};
use crate::MAX_COLORS;

/// Total cell count of the lookup grid.
const GRID_SIZE: usize = RESOLUTION * RESOLUTION * RESOLUTION;

/// Shift of the Y coordinate in a flat grid index.
const GRID_SHIFT_Y: u32 = 10;

/// Shift of the U coordinate in a flat grid index.
const GRID_SHIFT_U: u32 = 5;

/// An ordered list of up to 256 YUV colors plus the inverse lookup grid.
pub(crate) struct Palette {
    colors: [Color; MAX_COLORS],
    len: usize,
    grid: Vec<i16>,
}

impl Palette {
    /// Allocates an empty palette. The grid allocation is reused by every
    /// [`rebuild`](Palette::rebuild).
    pub fn new() -> Self {
        Palette {
            colors: [Color::from_packed(0); MAX_COLORS],
            len: 0,
            grid: vec![-1; GRID_SIZE],
        }
    }

    /// Number of colors currently in the palette.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Color at `index`. Panics when out of range.
    pub fn color(&self, index: usize) -> Color {
        assert!(index < self.len, "palette index {index} out of range");
        self.colors[index]
    }

    /// Palette index for a (clamped, unquantized) YUV triple, or -1 when
    /// the cell is covered by no bucket.
    #[inline]
    pub fn lookup(&self, y: i32, u: i32, v: i32) -> i16 {
        let index = (((y >> CHANNEL_SHIFT) as usize) << GRID_SHIFT_Y)
            + (((u >> CHANNEL_SHIFT) as usize) << GRID_SHIFT_U)
            + ((v >> CHANNEL_SHIFT) as usize);
        self.grid[index]
    }

    /// Discards the current palette and rebuilds it from the bucket list.
    ///
    /// Buckets whose box holds no pixel are dropped; every other bucket
    /// gets the next free index and writes it into all of its grid cells.
    /// The cutter's disjointness invariant guarantees no cell is claimed
    /// twice.
    pub fn rebuild(&mut self, histogram: &Histogram, buckets: &[Bucket]) {
        self.grid.fill(-1);
        self.len = 0;

        for bucket in buckets {
            let (count, sum) = histogram.box_sum(&bucket.cells);
            if count == 0 {
                continue;
            }
            debug_assert!(self.len < MAX_COLORS);

            let y = round_mean(sum[0], count);
            let u = round_mean(sum[1], count);
            let v = round_mean(sum[2], count);
            self.colors[self.len] = Color::from_channels(y, u, v, 0xFF);
            self.claim(&bucket.cells, self.len as i16);
            self.len += 1;
        }
    }

    fn claim(&mut self, cells: &ColorBox, index: i16) {
        for y in cells.start[0]..=cells.end[0] {
            let ty = (y as usize) << GRID_SHIFT_Y;
            for u in cells.start[1]..=cells.end[1] {
                let tu = ty + ((u as usize) << GRID_SHIFT_U);
                for v in cells.start[2]..=cells.end[2] {
                    self.grid[tu + v as usize] = index;
                }
            }
        }
    }
}

/// Nearest-integer mean of a channel sum, saturating to `u8`.
#[inline]
fn round_mean(sum: u32, count: u32) -> u8 {
    let mean = (((sum as u64) << 1) / count as u64 + 1) >> 1;
    if mean < 256 {
        mean as u8
    } else {
        255
    }
}
