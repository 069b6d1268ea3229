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


//! # rustsixel
//!
//! A pure Rust SIXEL encoder.
//!
//! This library converts true-color RGBA frames into DECSIXEL escape
//! sequences for SIXEL-capable terminals. It builds an adaptive palette of
//! up to 256 colors per frame with a histogram-backed median cut in YUV
//! space, dithers the frame onto that palette with serpentine
//! Floyd-Steinberg error diffusion, and serializes the result with
//! run-length compressed six-row bands.
//!
//! ## Features
//!
//! - **Adaptive palettes**: variance-guided median cut over a 32x32x32
//!   quantized YUV histogram with O(1) summed-area box queries
//! - **Error diffusion**: serpentine Floyd-Steinberg dithering with a
//!   precomputed nearest-color grid
//! - **Compact output**: per-color run-length encoding inside each six-row
//!   band
//! - **Deterministic**: integer-only arithmetic; byte-identical streams
//!   across runs and platforms
//! - **Allocation-free hot path**: all working memory is reserved when the
//!   encoder is created and reused for every frame
//! - **Memory safe**: pure Rust with zero unsafe code
//!
//! ## Quick Start
//!
//! ```no_run
//! use rustsixel::SixelEncoder;
//! use std::io::{self, Write};
//!
//! fn main() -> rustsixel::Result<()> {
//!     // One encoder per frame geometry.
//!     let mut encoder = SixelEncoder::new(640, 480)?;
//!
//!     // Packed RGBA pixels, R in the low byte of each u32.
//!     let pixels = vec![0xFF00_0000u32; 640 * 480];
//!     let mut indices = vec![0u8; 640 * 480];
//!
//!     encoder.quantize(&mut indices, &pixels, false);
//!
//!     let stdout = io::stdout();
//!     let mut lock = stdout.lock();
//!     encoder.encode(&mut lock, &indices)?;
//!     lock.flush()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! packed RGBA frame
//!        │
//!        ▼
//! ┌─────────────────────────────────────────┐
//! │  Quantize                               │
//! │                                         │
//! │  RGB → YUV conversion                   │
//! │  3D histogram + prefix sums             │
//! │  median cut → palette + lookup grid     │
//! │  serpentine error diffusion → indices   │
//! └──────────────────┬──────────────────────┘
//!                    │ palette index map
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │  Encode                                 │
//! │                                         │
//! │  DCS header + palette declarations      │
//! │  six-row bands, per-color RLE           │
//! │  string terminator                      │
//! └──────────────────┬──────────────────────┘
//!                    │ DECSIXEL bytes
//!                    ▼
//!            caller-supplied sink
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod color;
pub mod encoder;
pub mod error;

// Internal modules
mod cutter;
mod diffuse;
mod histogram;
mod palette;
mod protocol;
mod workspace;

// Re-exports
pub use color::{rgb_to_yuv, yuv_to_rgb, Color};
pub use encoder::SixelEncoder;
pub use error::{Result, SixelError};

/// Maximum number of palette entries in a SIXEL stream.
pub const MAX_COLORS: usize = 256;
