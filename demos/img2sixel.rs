//! SIXEL conversion demo.
//!
//! Loads an image file, quantizes it to an adaptive 256-color palette, and
//! writes the DECSIXEL stream to stdout.
//!
//! Usage:
//!   cargo run --example img2sixel -- <path-to-image>
//!
//! Pipe the output to a SIXEL-capable terminal (xterm -ti vt340, mlterm,
//! foot, ...) to see the image.

use rustsixel::SixelEncoder;
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: img2sixel <path-to-image>");
        return ExitCode::from(2);
    };

    let image = match image::open(&path) {
        Ok(image) => image.to_rgba8(),
        Err(err) => {
            eprintln!("Error: failed to open {path}: {err}");
            return ExitCode::from(1);
        }
    };

    let (width, height) = image.dimensions();

    // Repack to one u32 per pixel, R in the low byte.
    let pixels: Vec<u32> = image
        .pixels()
        .map(|pixel| u32::from_le_bytes(pixel.0))
        .collect();

    let mut encoder = match SixelEncoder::new(width, height) {
        Ok(encoder) => encoder,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::from(1);
        }
    };

    let mut indices = vec![0u8; width as usize * height as usize];
    encoder.quantize(&mut indices, &pixels, false);

    let stdout = io::stdout();
    let mut lock = stdout.lock();
    if let Err(err) = encoder.encode(&mut lock, &indices) {
        eprintln!("Error: {err}");
        return ExitCode::from(1);
    }
    let _ = lock.flush();

    ExitCode::SUCCESS
}
