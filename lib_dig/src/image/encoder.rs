use log::{debug, info};
use thiserror::Error;

use super::format::{ensure_len, parse_header, BitmapDescriptor, HeaderError};
use super::palette::{DisplayPalette, PaletteError};
use super::plane::{flip_rows, interlace, PlaneError};
use crate::compression::{self, CompressionError, CompressionKind, Compressor};
use crate::constants::STORED_PALETTE_SIZE;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Invalid bitmap header")]
    Header(#[from] HeaderError),
    #[error("Invalid bitmap palette")]
    Palette(#[from] PaletteError),
    #[error("Invalid pixel plane")]
    Plane(#[from] PlaneError),
    #[error("Failed to compress packed bitmap")]
    CompressionFailed(#[from] CompressionError),
}

/// What the engine expects of one packed bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    pub width: u16,
    pub height: u16,
    /// Prefix the pixels with the 768-byte stored palette.
    pub emit_palette: bool,
    pub interlaced: bool,
    pub compression: CompressionKind,
}

/// Packs an 8bpp bitmap file into the engine's binary layout: optional
/// stored palette, then top-down (optionally interlaced) pixel indices.
pub fn encode(
    bitmap: &[u8],
    options: &PackOptions,
    compressor: &dyn Compressor,
) -> Result<Vec<u8>, EncodeError> {
    info!("Starting encoding");

    let header = parse_header(bitmap, options.width, options.height)?;
    let width = options.width as usize;
    let height = options.height as usize;

    let mut packed = Vec::with_capacity(STORED_PALETTE_SIZE + width * height);

    if options.emit_palette {
        let palette = read_palette(bitmap, &header)?;
        packed.extend_from_slice(&palette.to_stored().to_bytes());
        debug!("Stored palette written");
    }

    let bottom_up = read_pixels(bitmap, &header)?;
    let mut pixels = flip_rows(&bottom_up, width, height)?;
    if options.interlaced {
        pixels = interlace(&pixels, width, height)?;
        debug!("Pixels interlaced");
    }
    packed.extend_from_slice(&pixels);
    debug!("Packed {} bytes before compression", packed.len());

    let packed = compression::compress(compressor, options.compression, packed)?;

    info!("Encoding process completed successfully");
    Ok(packed)
}

fn read_palette(bitmap: &[u8], header: &BitmapDescriptor) -> Result<DisplayPalette, EncodeError> {
    let offset = header.palette_offset();
    let entry_size = header.shape.palette_entry_size();
    let count = header.palette_entries();
    ensure_len(bitmap, "palette", offset, entry_size * count)?;

    Ok(DisplayPalette::from_bitmap_entries(
        &bitmap[offset..],
        entry_size,
        count,
    )?)
}

/// Collects the stored rows, still bottom-up, without their padding.
/// Bitmaps whose rows were written back to back, with no padding, are
/// accepted too.
fn read_pixels(bitmap: &[u8], header: &BitmapDescriptor) -> Result<Vec<u8>, EncodeError> {
    let width = header.width as usize;
    let height = header.height as usize;
    let offset = header.pixels_offset as usize;

    let available = bitmap.len().saturating_sub(offset);
    let mut stride = header.row_stride();
    if available < stride * height && available >= width * height {
        debug!("Pixel rows are not padded");
        stride = width;
    }
    ensure_len(bitmap, "pixel data", offset, stride * height)?;

    let mut pixels = Vec::with_capacity(width * height);
    for row in bitmap[offset..offset + stride * height].chunks_exact(stride.max(1)).take(height) {
        pixels.extend_from_slice(&row[..width]);
    }
    Ok(pixels)
}
