use log::{debug, info};
use thiserror::Error;

use super::format::{row_stride, write_core_header};
use super::palette::{PaletteError, StoredPalette};
use super::plane::{deinterlace, flip_rows, PlaneError};
use crate::constants::STORED_PALETTE_SIZE;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid stored palette")]
    Palette(#[from] PaletteError),
    #[error("Invalid pixel plane")]
    Plane(#[from] PlaneError),
}

/// Where the colours of a packed bitmap come from.
#[derive(Debug, Clone, Copy)]
pub enum PaletteSource<'a> {
    /// The payload starts with its own 768-byte stored palette.
    Embedded,
    /// The palette is the head of another asset's (decompressed) payload.
    Sibling(&'a [u8]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackOptions {
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
}

/// Rebuilds an editor bitmap (core header, display palette, bottom-up rows)
/// from a decompressed engine payload.
pub fn decode(
    payload: &[u8],
    palette: PaletteSource<'_>,
    options: &UnpackOptions,
) -> Result<Vec<u8>, DecodeError> {
    info!("Starting decoding");

    let width = options.width as usize;
    let height = options.height as usize;

    let (stored, plane) = match palette {
        PaletteSource::Embedded => {
            let stored = StoredPalette::from_bytes(payload)?;
            (stored, &payload[STORED_PALETTE_SIZE..])
        }
        PaletteSource::Sibling(sibling) => (StoredPalette::from_bytes(sibling)?, payload),
    };
    debug!("Pixel plane: {} bytes", plane.len());

    let top_down = if options.interlaced {
        deinterlace(plane, width, height)?
    } else {
        plane.to_vec()
    };
    let bottom_up = flip_rows(&top_down, width, height)?;
    let display = stored.to_display();

    let stride = row_stride(width);
    let mut bitmap = Vec::new();
    write_core_header(
        &mut bitmap,
        options.width,
        options.height,
        STORED_PALETTE_SIZE,
        stride * height,
    );
    bitmap.extend_from_slice(&display.to_bytes());
    if width > 0 {
        for row in bottom_up.chunks_exact(width) {
            bitmap.extend_from_slice(row);
            bitmap.resize(bitmap.len() + stride - width, 0);
        }
    }
    debug!("Bitmap assembled: {} bytes", bitmap.len());

    info!("Decoding successful");
    Ok(bitmap)
}
