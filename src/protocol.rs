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

//! DECSIXEL wire format constants and primitive writers.
//!
//! A DECSIXEL stream is a DCS envelope: `ESC P 0;0;8 q` with raster
//! attributes `"1;1`, followed by palette declarations and six-row pixel
//! bands, terminated by `ESC \`. All numeric parameters are plain ASCII
//! decimal. Each data character encodes a six-pixel vertical stripe as
//! `bits + 63`, spanning the printable range `?` (0x3F) through `~` (0x7E).
//!
//! The writers here append to a [`BytesMut`]; stream assembly order is the
//! encoder's responsibility.

use bytes::{BufMut, BytesMut};

/// DCS introducer, mode parameters, and raster attributes.
///
/// `ESC P 0 ; 0 ; 8 q` selects sixel graphics with horizontal grid size 8;
/// `" 1 ; 1` declares a 1:1 pixel aspect ratio.
pub(crate) const HEADER: &[u8] = b"\x1BP0;0;8q\"1;1";

/// String terminator: `ESC \`.
pub(crate) const FOOTER: &[u8] = b"\x1B\\";

/// Graphics carriage return: rewinds to the left edge within a band.
pub(crate) const CARRIAGE_RETURN: u8 = b'$';

/// Graphics new line: ends a six-row band.
pub(crate) const NEW_LINE: u8 = b'-';

/// Longest run a single `!` repeat introducer may carry.
pub(crate) const MAX_RUN: usize = 255;

/// Writes a decimal number in `0..=999` without padding.
pub(crate) fn put_number(buf: &mut BytesMut, number: u16) {
    debug_assert!(number < 1000);
    if number >= 100 {
        buf.put_u8(b'0' + (number / 100) as u8);
        buf.put_u8(b'0' + (number / 10 % 10) as u8);
        buf.put_u8(b'0' + (number % 10) as u8);
    } else if number >= 10 {
        buf.put_u8(b'0' + (number / 10) as u8);
        buf.put_u8(b'0' + (number % 10) as u8);
    } else {
        buf.put_u8(b'0' + number as u8);
    }
}

/// Writes a palette selector: `#` followed by the color index.
pub(crate) fn put_color_selector(buf: &mut BytesMut, index: u8) {
    buf.put_u8(b'#');
    put_number(buf, index as u16);
}

/// Writes a palette declaration: `#<index>;2;<r>;<g>;<b>` with percent-scale
/// RGB components (color system 2).
pub(crate) fn put_palette_color(buf: &mut BytesMut, index: usize, percent: [u8; 3]) {
    buf.put_u8(b'#');
    put_number(buf, index as u16);
    buf.put_slice(b";2;");
    put_number(buf, percent[0] as u16);
    buf.put_u8(b';');
    put_number(buf, percent[1] as u16);
    buf.put_u8(b';');
    put_number(buf, percent[2] as u16);
}

/// Writes a run of one six-bit pattern.
///
/// Runs longer than three characters use the `!` repeat introducer
/// (`! <run> <char>`); shorter runs repeat the character literally.
/// `run` must be in `1..=255` and `bits` at most 63.
pub(crate) fn put_sixel_run(buf: &mut BytesMut, run: usize, bits: u8) {
    debug_assert!(0 < run && run <= MAX_RUN);
    debug_assert!(bits <= 63);
    let ch = bits + 63;
    if run > 3 {
        buf.put_u8(b'!');
        put_number(buf, run as u16);
        buf.put_u8(ch);
    } else {
        for _ in 0..run {
            buf.put_u8(ch);
        }
    }
}
