use thiserror::Error;

use crate::constants::{PALETTE_ENTRIES, STORED_PALETTE_SIZE};

#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("Palette block too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },
}

/// 6-bit per channel palette as persisted by the engine, channels in R,G,B
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPalette(pub [[u8; 3]; PALETTE_ENTRIES]);

/// 8-bit per channel palette as found in bitmap files, channels in B,G,R
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPalette(pub [[u8; 3]; PALETTE_ENTRIES]);

impl StoredPalette {
    /// Reads the first 768 bytes of an engine binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, PaletteError> {
        if data.len() < STORED_PALETTE_SIZE {
            return Err(PaletteError::TooShort {
                expected: STORED_PALETTE_SIZE,
                actual: data.len(),
            });
        }

        let mut entries = [[0u8; 3]; PALETTE_ENTRIES];
        for (entry, chunk) in entries.iter_mut().zip(data.chunks_exact(3)) {
            entry.copy_from_slice(chunk);
        }
        Ok(Self(entries))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flatten().copied().collect()
    }

    /// Widens every channel to 8 bits and swaps the channel order. Values
    /// above 63 saturate at 255.
    pub fn to_display(&self) -> DisplayPalette {
        let mut entries = [[0u8; 3]; PALETTE_ENTRIES];
        for (display, stored) in entries.iter_mut().zip(self.0.iter()) {
            *display = [
                widen(stored[2]),
                widen(stored[1]),
                widen(stored[0]),
            ];
        }
        DisplayPalette(entries)
    }
}

impl DisplayPalette {
    /// Reads `count` bitmap palette entries of `entry_size` bytes each; the
    /// 4th byte of RGBQUAD entries is ignored. Entries past `count` are black.
    pub fn from_bitmap_entries(
        data: &[u8],
        entry_size: usize,
        count: usize,
    ) -> Result<Self, PaletteError> {
        let count = count.min(PALETTE_ENTRIES);
        let expected = entry_size * count;
        if data.len() < expected {
            return Err(PaletteError::TooShort {
                expected,
                actual: data.len(),
            });
        }

        let mut entries = [[0u8; 3]; PALETTE_ENTRIES];
        for (entry, chunk) in entries.iter_mut().zip(data[..expected].chunks_exact(entry_size)) {
            entry.copy_from_slice(&chunk[..3]);
        }
        Ok(Self(entries))
    }

    /// Bitmap palette bytes as written after a BITMAPCOREHEADER.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flatten().copied().collect()
    }

    /// Narrows every channel to 6 bits by truncating division and swaps the
    /// channel order back. Low two bits of each channel are lost.
    pub fn to_stored(&self) -> StoredPalette {
        let mut entries = [[0u8; 3]; PALETTE_ENTRIES];
        for (stored, display) in entries.iter_mut().zip(self.0.iter()) {
            *stored = [display[2] / 4, display[1] / 4, display[0] / 4];
        }
        StoredPalette(entries)
    }
}

fn widen(channel: u8) -> u8 {
    (channel as u16 * 4).min(255) as u8
}
