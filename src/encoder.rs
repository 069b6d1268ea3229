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


//! The SIXEL encoder engine.
//!
//! [`SixelEncoder`] owns every buffer the pipeline needs for one image
//! geometry and drives the two externally visible operations:
//!
//! - [`quantize`](SixelEncoder::quantize) converts a packed RGBA frame to
//!   YUV, builds the adaptive palette (histogram, prefix sums, median cut),
//!   and fills the caller's index map through serpentine error diffusion.
//! - [`encode`](SixelEncoder::encode) serializes an index map from the last
//!   quantization into a complete DECSIXEL byte stream and flushes it to a
//!   sink.
//!
//! Both operations are synchronous, allocation-free after construction, and
//! deterministic: the same input produces byte-identical output on every
//! platform.

use std::io::Write;

use bytes::BufMut;

use crate::color::{rgb_to_yuv, yuv_to_sixel_percent, Color};
use crate::cutter::{cut, Bucket};
use crate::diffuse::error_diffusion;
use crate::error::{Result, SixelError};
use crate::histogram::Histogram;
use crate::palette::Palette;
use crate::protocol::{
    put_color_selector, put_palette_color, put_sixel_run, CARRIAGE_RETURN, FOOTER, HEADER,
    MAX_RUN, NEW_LINE,
};
use crate::workspace::Workspace;
use crate::MAX_COLORS;

/// Rows per SIXEL band.
const BAND_HEIGHT: usize = 6;

/// A reusable SIXEL encoder for one image geometry.
///
/// # Example
///
/// ```
/// use rustsixel::SixelEncoder;
///
/// let mut encoder = SixelEncoder::new(2, 2)?;
/// let pixels = [0xFF00_00FFu32; 4]; // opaque red, R in the low byte
/// let mut indices = [0u8; 4];
/// encoder.quantize(&mut indices, &pixels, false);
///
/// let mut sixel = Vec::new();
/// encoder.encode(&mut sixel, &indices)?;
/// assert!(sixel.starts_with(b"\x1BP"));
/// # Ok::<(), rustsixel::SixelError>(())
/// ```
pub struct SixelEncoder {
    width: usize,
    height: usize,
    histogram: Histogram,
    buckets: Vec<Bucket>,
    palette: Palette,
    workspace: Workspace,
    quantized: bool,
}

impl SixelEncoder {
    /// Creates an encoder for `width x height` images.
    ///
    /// All working memory is allocated here; `quantize` and `encode` reuse
    /// it without further allocation. Zero-sized dimensions are valid and
    /// produce an empty stream.
    ///
    /// # Errors
    ///
    /// Returns [`SixelError::DimensionsTooLarge`] when a working buffer
    /// size would overflow the address space.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let workspace = Workspace::new(width as usize, height as usize)
            .ok_or(SixelError::DimensionsTooLarge { width, height })?;

        Ok(SixelEncoder {
            width: width as usize,
            height: height as usize,
            histogram: Histogram::new(),
            buckets: Vec::with_capacity(MAX_COLORS),
            palette: Palette::new(),
            workspace,
            quantized: false,
        })
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width as u32
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height as u32
    }

    /// Quantizes a packed RGBA frame into palette indices.
    ///
    /// `pixels` holds one little-endian `u32` per pixel with `R` in the low
    /// byte (`[R, G, B, A]` in memory); the alpha byte is ignored.
    /// `indices` receives one palette index per pixel. With
    /// `flip_vertical` the source rows are read bottom-up, which undoes the
    /// row order of GL-style framebuffer readbacks.
    ///
    /// Each call rebuilds the palette from scratch; previously returned
    /// index maps are only meaningful for [`encode`](SixelEncoder::encode)
    /// until the next `quantize`.
    ///
    /// # Panics
    ///
    /// Panics when either buffer length differs from `width * height`.
    pub fn quantize(&mut self, indices: &mut [u8], pixels: &[u32], flip_vertical: bool) {
        let size = self.width * self.height;
        assert_eq!(pixels.len(), size, "pixel buffer must be width * height");
        assert_eq!(indices.len(), size, "index buffer must be width * height");

        self.histogram.reset();
        if size == 0 {
            self.buckets.clear();
            self.palette.rebuild(&self.histogram, &self.buckets);
            self.quantized = true;
            return;
        }

        for row in 0..self.height {
            let src_row = if flip_vertical {
                self.height - 1 - row
            } else {
                row
            };
            let src = &pixels[src_row * self.width..(src_row + 1) * self.width];
            let dst = &mut self.workspace.yuv[row * self.width..(row + 1) * self.width];
            for (cell, &pixel) in dst.iter_mut().zip(src) {
                let yuv = rgb_to_yuv(Color::from_packed(pixel));
                self.histogram.record(yuv);
                *cell = yuv;
            }
        }

        self.histogram.build_prefix_sums();
        cut(&self.histogram, &mut self.buckets, MAX_COLORS);
        self.palette.rebuild(&self.histogram, &self.buckets);

        error_diffusion(
            indices,
            &self.workspace.yuv,
            &self.palette,
            &mut self.workspace.errors,
            self.width,
            self.height,
        );
        self.quantized = true;

        log::debug!(
            "quantized {}x{} frame to {} colors",
            self.width,
            self.height,
            self.palette.len()
        );
    }

    /// Number of colors in the current palette.
    ///
    /// Zero before the first [`quantize`](SixelEncoder::quantize).
    #[must_use]
    pub fn palette_len(&self) -> usize {
        self.palette.len()
    }

    /// The YUV palette color at `index`.
    ///
    /// Convert with [`yuv_to_rgb`](crate::color::yuv_to_rgb) to reconstruct
    /// a preview image from an index map.
    ///
    /// # Panics
    ///
    /// Panics when no quantization has run or `index` is out of range.
    #[must_use]
    pub fn palette_color(&self, index: usize) -> Color {
        assert!(self.quantized, "palette_color requires a prior quantize");
        self.palette.color(index)
    }

    /// Serializes an index map into a DECSIXEL stream and writes it to
    /// `sink` in one call.
    ///
    /// Returns the number of bytes written. The stream is built in the
    /// preallocated write buffer first, so the sink sees a single
    /// `write_all`.
    ///
    /// # Errors
    ///
    /// Returns [`SixelError::Io`] when the sink fails.
    ///
    /// # Panics
    ///
    /// Panics when called before any [`quantize`](SixelEncoder::quantize),
    /// or when `indices` has the wrong length.
    pub fn encode<W: Write>(&mut self, sink: &mut W, indices: &[u8]) -> Result<usize> {
        assert!(self.quantized, "encode requires a prior quantize");
        assert_eq!(
            indices.len(),
            self.width * self.height,
            "index buffer must be width * height"
        );

        let width = self.width;
        let Workspace {
            output,
            band_rows,
            color_seen,
            band_colors,
            ..
        } = &mut self.workspace;

        output.clear();
        output.put_slice(HEADER);
        for index in 0..self.palette.len() {
            let percent = yuv_to_sixel_percent(self.palette.color(index));
            put_palette_color(output, index, percent);
        }

        band_rows.fill(0);
        let out_height = if width == 0 {
            0
        } else {
            (self.height + BAND_HEIGHT - 1) / BAND_HEIGHT * BAND_HEIGHT
        };

        for band_top in (0..out_height).step_by(BAND_HEIGHT) {
            *color_seen = [0; MAX_COLORS / 32];
            band_colors.clear();

            let rows = (self.height - band_top).min(BAND_HEIGHT);
            for row in 0..rows {
                let base = (band_top + row) * width;
                for col in 0..width {
                    let color = indices[base + col];
                    let block = (color >> 5) as usize;
                    let flag = 1u32 << (color & 31);
                    if color_seen[block] & flag == 0 {
                        color_seen[block] |= flag;
                        band_colors.push(color);
                    }
                    band_rows[width * color as usize + col] |= 1 << row;
                }
            }

            for (nth, &color) in band_colors.iter().enumerate() {
                if nth > 0 {
                    output.put_u8(CARRIAGE_RETURN);
                }
                put_color_selector(output, color);

                let start = width * color as usize;
                let row = &mut band_rows[start..start + width];
                let mut run = 0usize;
                let mut prev = 0xFFu8;
                for cell in row.iter_mut() {
                    let bits = *cell;
                    *cell = 0;
                    if prev != bits && run > 0 {
                        put_sixel_run(output, run, prev);
                        run = 0;
                    }
                    prev = bits;
                    run += 1;
                    if run > MAX_RUN {
                        put_sixel_run(output, MAX_RUN, prev);
                        run -= MAX_RUN;
                    }
                }
                if run > 0 {
                    put_sixel_run(output, run, prev);
                }
            }

            output.put_u8(NEW_LINE);
        }

        output.put_slice(FOOTER);

        let written = output.len();
        sink.write_all(output)?;
        log::debug!(
            "encoded {}x{} frame ({} colors) into {} bytes",
            self.width,
            self.height,
            self.palette.len(),
            written
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::yuv_to_rgb;

    fn pack(r: u8, g: u8, b: u8) -> u32 {
        (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | 0xFF00_0000
    }

    fn run_pipeline(width: u32, height: u32, pixels: &[u32]) -> (SixelEncoder, Vec<u8>, Vec<u8>) {
        let mut encoder = SixelEncoder::new(width, height).unwrap();
        let mut indices = vec![0u8; (width * height) as usize];
        encoder.quantize(&mut indices, pixels, false);
        let mut stream = Vec::new();
        encoder.encode(&mut stream, &indices).unwrap();
        (encoder, indices, stream)
    }

    /// Expands a DECSIXEL stream back into an index map. Exercises the
    /// run-length expansion invariant: `! n c` must mean exactly `n`
    /// copies of `c`.
    fn decode_stream(stream: &[u8], width: usize, height: usize) -> Vec<u8> {
        assert!(stream.starts_with(HEADER), "missing header");
        assert!(stream.ends_with(FOOTER), "missing footer");
        let body = &stream[HEADER.len()..stream.len() - FOOTER.len()];

        // -1 marks pixels no band has painted yet.
        let mut result = vec![-1i16; width * height];
        let mut paint = |band: usize, x: usize, color: u8, bits: u8| {
            assert!(bits <= 63);
            for row in 0..6 {
                if bits & (1 << row) != 0 {
                    let y = band * 6 + row;
                    assert!(y < height && x < width, "pixel out of bounds");
                    result[y * width + x] = color as i16;
                }
            }
        };

        let read_number = |i: &mut usize| -> usize {
            let mut value = 0usize;
            let mut digits = 0;
            while *i < body.len() && body[*i].is_ascii_digit() {
                value = value * 10 + (body[*i] - b'0') as usize;
                *i += 1;
                digits += 1;
            }
            assert!(digits > 0, "expected decimal number");
            value
        };

        let mut band = 0usize;
        let mut x = 0usize;
        let mut color = 0u8;
        let mut i = 0usize;
        while i < body.len() {
            match body[i] {
                b'#' => {
                    i += 1;
                    let number = read_number(&mut i);
                    if i < body.len() && body[i] == b';' {
                        // Palette declaration: consume ";2;r;g;b".
                        for _ in 0..4 {
                            i += 1;
                            read_number(&mut i);
                        }
                    } else {
                        color = number as u8;
                        x = 0;
                    }
                }
                b'$' => {
                    x = 0;
                    i += 1;
                }
                b'-' => {
                    band += 1;
                    x = 0;
                    i += 1;
                }
                b'!' => {
                    i += 1;
                    let run = read_number(&mut i);
                    assert!(run <= 255, "run longer than 255");
                    let bits = body[i] - 63;
                    i += 1;
                    for _ in 0..run {
                        paint(band, x, color, bits);
                        x += 1;
                    }
                }
                c @ b'?'..=b'~' => {
                    paint(band, x, color, c - 63);
                    x += 1;
                    i += 1;
                }
                other => panic!("unexpected byte {other:#04x} in stream"),
            }
        }
        assert!(result.iter().all(|&c| c >= 0), "unpainted pixels");
        result.into_iter().map(|c| c as u8).collect()
    }

    #[test]
    fn test_single_red_pixel() {
        let (encoder, indices, stream) = run_pipeline(1, 1, &[pack(255, 0, 0)]);
        assert_eq!(encoder.palette_len(), 1);
        assert_eq!(indices, [0]);
        // Red converts to YUV (76, 85, 255); back to percent RGB (99, 0, 0).
        assert_eq!(stream, b"\x1BP0;0;8q\"1;1#0;2;99;0;0#0@-\x1B\\");
    }

    #[test]
    fn test_black_and_white_pair() {
        let (encoder, indices, _) = run_pipeline(2, 1, &[pack(0, 0, 0), pack(255, 255, 255)]);
        assert_eq!(encoder.palette_len(), 2);
        assert_eq!(indices, [0, 1]);

        let black = yuv_to_rgb(encoder.palette_color(0));
        assert_eq!((black.c0(), black.c1(), black.c2()), (0, 0, 0));
        let white = yuv_to_rgb(encoder.palette_color(1));
        assert_eq!((white.c0(), white.c1(), white.c2()), (255, 255, 255));
    }

    #[test]
    fn test_solid_row_run_length() {
        let (_, _, stream) = run_pipeline(6, 1, &vec![pack(255, 0, 0); 6]);
        assert_eq!(stream, b"\x1BP0;0;8q\"1;1#0;2;99;0;0#0!6@-\x1B\\");
    }

    #[test]
    fn test_solid_full_band_run_length() {
        // Six full rows set every bit of the column pattern: 63 -> '~'.
        let (_, _, stream) = run_pipeline(6, 6, &vec![pack(255, 0, 0); 36]);
        assert_eq!(stream, b"\x1BP0;0;8q\"1;1#0;2;99;0;0#0!6~-\x1B\\");
    }

    #[test]
    fn test_alternating_colors_share_band() {
        let pixels: Vec<u32> = (0..7)
            .map(|i| if i % 2 == 0 { pack(255, 0, 0) } else { pack(0, 0, 255) })
            .collect();
        let (encoder, indices, stream) = run_pipeline(7, 1, &pixels);

        assert_eq!(encoder.palette_len(), 2);
        // Red appears four times to blue's three, so red owns index 0.
        assert_eq!(indices, [0, 1, 0, 1, 0, 1, 0]);
        // Blue's YUV (29, 255, 108) maps back to percent RGB (0, 0, 99).
        assert_eq!(
            stream,
            b"\x1BP0;0;8q\"1;1#0;2;99;0;0#1;2;0;0;99#0@?@?@?@$#1?@?@?@?-\x1B\\"
        );
    }

    #[test]
    fn test_gradient_fills_palette() {
        // 256 pixels, each in its own lattice cell forming a solid
        // 4x8x8 block, so the cutter subdivides down to single cells.
        let mut pixels = Vec::with_capacity(256);
        for qy in 12..16u8 {
            for qu in 12..20u8 {
                for qv in 12..20u8 {
                    let center = Color::from_channels(qy * 8 + 4, qu * 8 + 4, qv * 8 + 4, 255);
                    pixels.push(yuv_to_rgb(center).packed() | 0xFF00_0000);
                }
            }
        }
        let (encoder, indices, stream) = run_pipeline(16, 16, &pixels);

        assert_eq!(encoder.palette_len(), 256);
        let mut seen = [false; 256];
        for &index in &indices {
            seen[index as usize] = true;
        }
        assert!(seen.iter().all(|&s| s), "every palette entry used once");
        assert_eq!(decode_stream(&stream, 16, 16), indices);
    }

    #[test]
    fn test_checkerboard_two_bands() {
        let pixels: Vec<u32> = (0..12 * 12)
            .map(|i| {
                let (row, col) = (i / 12, i % 12);
                if (row + col) % 2 == 0 { pack(0, 0, 0) } else { pack(255, 255, 255) }
            })
            .collect();
        let (encoder, indices, stream) = run_pipeline(12, 12, &pixels);

        assert_eq!(encoder.palette_len(), 2);
        for row in 0..12 {
            for col in 0..12 {
                let expected = ((row + col) % 2) as u8;
                let flipped = indices[row * 12 + col];
                // Index assignment is frequency-ordered; both colors tie, so
                // just require the exact checker structure.
                assert_eq!(flipped, expected ^ indices[0]);
            }
        }
        assert_eq!(stream.iter().filter(|&&b| b == NEW_LINE).count(), 2);
        assert_eq!(decode_stream(&stream, 12, 12), indices);
    }

    #[test]
    fn test_long_run_splits_at_255() {
        let (_, _, stream) = run_pipeline(300, 1, &vec![pack(255, 0, 0); 300]);
        assert_eq!(
            stream,
            b"\x1BP0;0;8q\"1;1#0;2;99;0;0#0!255@!45@-\x1B\\"
        );
    }

    #[test]
    fn test_stream_round_trips_through_expansion() {
        let pixels: Vec<u32> = (0..64 * 16u32)
            .map(|i| i.wrapping_mul(2_654_435_761) | 0xFF00_0000)
            .collect();
        let (encoder, indices, stream) = run_pipeline(64, 16, &pixels);
        assert!(encoder.palette_len() <= MAX_COLORS);
        assert_eq!(decode_stream(&stream, 64, 16), indices);
    }

    #[test]
    fn test_empty_image_streams() {
        for (width, height) in [(0u32, 0u32), (5, 0), (0, 5)] {
            let (encoder, _, stream) = run_pipeline(width, height, &[]);
            assert_eq!(encoder.palette_len(), 0);
            assert_eq!(stream, b"\x1BP0;0;8q\"1;1\x1B\\");
        }
    }

    #[test]
    fn test_quantize_is_deterministic() {
        let pixels: Vec<u32> = (0..48 * 7u32)
            .map(|i| i.wrapping_mul(747_796_405) | 0xFF00_0000)
            .collect();
        let mut encoder = SixelEncoder::new(48, 7).unwrap();
        let mut first = vec![0u8; 48 * 7];
        encoder.quantize(&mut first, &pixels, false);
        let mut second = vec![0u8; 48 * 7];
        encoder.quantize(&mut second, &pixels, false);
        assert_eq!(first, second);
    }

    #[test]
    fn test_flip_vertical_reverses_rows() {
        let pixels = [pack(255, 0, 0), pack(0, 0, 255)];
        let mut encoder = SixelEncoder::new(1, 2).unwrap();

        let mut upright = vec![0u8; 2];
        encoder.quantize(&mut upright, &pixels, false);
        let mut flipped = vec![0u8; 2];
        encoder.quantize(&mut flipped, &pixels, true);

        assert_eq!(upright[0], flipped[1]);
        assert_eq!(upright[1], flipped[0]);
        assert_ne!(upright[0], upright[1]);
    }

    #[test]
    #[should_panic(expected = "encode requires a prior quantize")]
    fn test_encode_before_quantize_panics() {
        let mut encoder = SixelEncoder::new(2, 2).unwrap();
        let mut sink = Vec::new();
        let _ = encoder.encode(&mut sink, &[0u8; 4]);
    }

    #[test]
    fn test_palette_indices_stay_in_range() {
        let pixels: Vec<u32> = (0..40 * 13u32)
            .map(|i| i.wrapping_mul(97_003) | 0xFF00_0000)
            .collect();
        let (encoder, indices, _) = run_pipeline(40, 13, &pixels);
        assert!(encoder.palette_len() >= 1);
        for &index in &indices {
            assert!((index as usize) < encoder.palette_len());
        }
    }
}
