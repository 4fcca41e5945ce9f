#![allow(dead_code)]

use lib_dig::compression::{ensure_compressed, CompressionError, Compressor};

/// Display palette whose channels are multiples of 4, so it survives the
/// 6-bit stored form unchanged.
pub fn display_palette() -> [[u8; 3]; 256] {
    let mut palette = [[0u8; 3]; 256];
    for (i, entry) in palette.iter_mut().enumerate() {
        *entry = [
            ((i * 4) % 256) as u8,
            ((i * 12) % 256) as u8 & !3,
            (252 - (i % 64) * 4) as u8,
        ];
    }
    palette
}

/// Top-down pixel indices with no two neighbouring rows alike.
pub fn pattern(width: usize, height: usize) -> Vec<u8> {
    (0..width * height).map(|i| (i * 7 + i / width) as u8).collect()
}

fn stride(width: usize) -> usize {
    (width + 3) & !3
}

fn bottom_up_rows(out: &mut Vec<u8>, width: usize, top_down: &[u8]) {
    for row in top_down.chunks_exact(width).rev() {
        out.extend_from_slice(row);
        out.resize(out.len() + stride(width) - width, 0);
    }
}

/// A BITMAPCOREHEADER bitmap as the editors and the unpacker write it.
pub fn core_bitmap(width: u16, height: u16, palette: &[[u8; 3]; 256], top_down: &[u8]) -> Vec<u8> {
    let offset = 14 + 12 + 768;
    let size = offset + stride(width as usize) * height as usize;

    let mut data = Vec::with_capacity(size);
    data.extend_from_slice(b"BM");
    data.extend_from_slice(&(size as u32).to_le_bytes());
    data.extend_from_slice(&[0u8; 4]);
    data.extend_from_slice(&(offset as u32).to_le_bytes());
    data.extend_from_slice(&12u32.to_le_bytes());
    data.extend_from_slice(&width.to_le_bytes());
    data.extend_from_slice(&height.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&8u16.to_le_bytes());
    for entry in palette {
        data.extend_from_slice(entry);
    }
    bottom_up_rows(&mut data, width as usize, top_down);
    data
}

/// A core header bitmap with its rows back to back, as older unpackers
/// wrote them.
pub fn unpadded_core_bitmap(
    width: u16,
    height: u16,
    palette: &[[u8; 3]; 256],
    top_down: &[u8],
) -> Vec<u8> {
    let offset = 14 + 12 + 768;
    let size = offset + width as usize * height as usize;

    let mut data = core_bitmap(width, height, palette, &[]);
    data.truncate(offset);
    data[2..6].copy_from_slice(&(size as u32).to_le_bytes());
    for row in top_down.chunks_exact(width as usize).rev() {
        data.extend_from_slice(row);
    }
    data
}

/// A BITMAPINFOHEADER bitmap with RGBQUAD palette entries.
pub fn info_bitmap(width: u16, height: u16, palette: &[[u8; 3]; 256], top_down: &[u8]) -> Vec<u8> {
    let offset = 14 + 40 + 256 * 4;
    let size = offset + stride(width as usize) * height as usize;

    let mut data = Vec::with_capacity(size);
    data.extend_from_slice(b"BM");
    data.extend_from_slice(&(size as u32).to_le_bytes());
    data.extend_from_slice(&[0u8; 4]);
    data.extend_from_slice(&(offset as u32).to_le_bytes());
    data.extend_from_slice(&40u32.to_le_bytes());
    data.extend_from_slice(&(width as i32).to_le_bytes());
    data.extend_from_slice(&(height as i32).to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&8u16.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes()); // compression
    data.extend_from_slice(&[0u8; 20]);
    for entry in palette {
        data.extend_from_slice(entry);
        data.push(0);
    }
    bottom_up_rows(&mut data, width as usize, top_down);
    data
}

/// Stands in for Pro-Pack: prefixes the signature.
pub struct TaggingCompressor;

impl Compressor for TaggingCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Ok([&b"RNC"[..], data].concat())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        ensure_compressed(data)?;
        Ok(data[3..].to_vec())
    }
}

/// A compressor whose tool is always broken.
pub struct BrokenCompressor;

impl Compressor for BrokenCompressor {
    fn compress(&self, _data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Err(CompressionError::Tool {
            tool: "rnc_lib.exe".into(),
            reason: "exited with 1".into(),
        })
    }

    fn decompress(&self, _data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        Err(CompressionError::Tool {
            tool: "dernc.exe".into(),
            reason: "exited with 1".into(),
        })
    }
}
