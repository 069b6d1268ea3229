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


//! Serpentine Floyd-Steinberg error diffusion.
//!
//! Maps the YUV source plane to palette indices, pushing each pixel's
//! quantization residue into unprocessed neighbors with the classic
//! 7/3/5/1 (over 16) stencil. Even rows sweep left to right, odd rows
//! right to left; on right-to-left rows the two diagonal weights swap
//! neighbors. Errors accumulate in 16x fixed point.
//!
//! The error field is `(width + 2) x (height + 1)` signed triples: one
//! spare column on each side and one spare row below, so edge pixels
//! diffuse without bounds checks. Pixel `(x, y)` reads cell `(y, x + 1)`.
//!
//! All arithmetic is integer, so the index map is byte-identical across
//! runs and platforms.

use crate::color::Color;
use crate::palette::Palette;

/// Weight of the next pixel in scan direction on the current row (x16).
const W_NEXT: i32 = 7;
/// Weight of the next-row neighbor behind the scan direction (x16).
const W_DOWN_BEHIND: i32 = 3;
/// Weight of the next-row neighbor directly below (x16).
const W_DOWN: i32 = 5;
/// Weight of the next-row neighbor ahead of the scan direction (x16).
const W_DOWN_AHEAD: i32 = 1;

/// Diffuses `yuv` into `indices` using the palette's lookup grid.
///
/// `errors` is the caller-owned scratch field of `(width + 2) * (height + 1)`
/// cells; it is zeroed here, so the pass is self-contained and repeatable.
/// Every cell a source pixel quantizes to is covered by the palette grid,
/// so the undiffused fallback lookup cannot miss.
pub(crate) fn error_diffusion(
    indices: &mut [u8],
    yuv: &[Color],
    palette: &Palette,
    errors: &mut [[i32; 3]],
    width: usize,
    height: usize,
) {
    debug_assert_eq!(indices.len(), width * height);
    debug_assert_eq!(yuv.len(), width * height);
    debug_assert_eq!(errors.len(), (width + 2) * (height + 1));

    errors.fill([0; 3]);

    for row in 0..height {
        if row & 1 == 0 {
            diffuse_right(indices, yuv, palette, errors, width, row);
        } else {
            diffuse_left(indices, yuv, palette, errors, width, row);
        }
    }
}

/// Quantizes one pixel: applies the accumulated error, resolves the palette
/// index, and returns the signed residual to spread.
#[inline]
fn quantize_pixel(
    source: Color,
    error: [i32; 3],
    palette: &Palette,
) -> (u8, [i32; 3]) {
    let sy = source.c0() as i32;
    let su = source.c1() as i32;
    let sv = source.c2() as i32;

    let ty = ((error[0] + (sy << 4)) >> 4).clamp(0, 255);
    let tu = ((error[1] + (su << 4)) >> 4).clamp(0, 255);
    let tv = ((error[2] + (sv << 4)) >> 4).clamp(0, 255);

    let mut index = palette.lookup(ty, tu, tv);
    if index < 0 {
        // Diffusion drifted into an uncovered cell; the source cell itself
        // is always covered.
        index = palette.lookup(sy, su, sv);
        debug_assert!(index >= 0);
    }
    let chosen = palette.color(index as usize);

    let residual = [
        sy - chosen.c0() as i32,
        su - chosen.c1() as i32,
        sv - chosen.c2() as i32,
    ];
    (index as u8, residual)
}

#[inline]
fn spread(cell: &mut [i32; 3], weight: i32, residual: [i32; 3]) {
    cell[0] += weight * residual[0];
    cell[1] += weight * residual[1];
    cell[2] += weight * residual[2];
}

fn diffuse_right(
    indices: &mut [u8],
    yuv: &[Color],
    palette: &Palette,
    errors: &mut [[i32; 3]],
    width: usize,
    row: usize,
) {
    let stride = width + 2;
    let mut index0 = row * width;
    let mut index1 = row * stride + 1;

    for _ in 0..width {
        let (index, residual) = quantize_pixel(yuv[index0], errors[index1], palette);
        indices[index0] = index;

        spread(&mut errors[index1 + 1], W_NEXT, residual);
        spread(&mut errors[index1 + stride - 1], W_DOWN_BEHIND, residual);
        spread(&mut errors[index1 + stride], W_DOWN, residual);
        spread(&mut errors[index1 + stride + 1], W_DOWN_AHEAD, residual);

        index0 += 1;
        index1 += 1;
    }
}

fn diffuse_left(
    indices: &mut [u8],
    yuv: &[Color],
    palette: &Palette,
    errors: &mut [[i32; 3]],
    width: usize,
    row: usize,
) {
    let stride = width + 2;
    let mut index0 = row * width + width - 1;
    let mut index1 = row * stride + width;

    for _ in 0..width {
        let (index, residual) = quantize_pixel(yuv[index0], errors[index1], palette);
        indices[index0] = index;

        spread(&mut errors[index1 - 1], W_NEXT, residual);
        spread(&mut errors[index1 + stride + 1], W_DOWN_BEHIND, residual);
        spread(&mut errors[index1 + stride], W_DOWN, residual);
        spread(&mut errors[index1 + stride - 1], W_DOWN_AHEAD, residual);

        index0 = index0.wrapping_sub(1);
        index1 -= 1;
    }
}
