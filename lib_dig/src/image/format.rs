use log::{debug, error};
use thiserror::Error;

use crate::constants::PALETTE_ENTRIES;

/// Two-byte tags of the bitmap family. Only the palette-indexed `BM` layout
/// is ever produced, the rest are accepted on read.
pub const MAGIC_TAGS: [[u8; 2]; 6] = [*b"BM", *b"BA", *b"CI", *b"CP", *b"IC", *b"PT"];
pub const MAGIC_HEADER: [u8; 2] = *b"BM";

pub const FILE_HEADER_SIZE: usize = 14;
pub const CORE_HEADER_SIZE: usize = 12;
pub const INFO_HEADER_SIZE: usize = 40;

#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Not a bitmap: unrecognized magic {0:?}")]
    UnsupportedFormat([u8; 2]),
    #[error("Bitmap size {declared} does not match buffer size {actual}")]
    SizeMismatch { declared: u32, actual: usize },
    #[error("Bitmap header size {0} not supported, must be BITMAPCOREHEADER or BITMAPINFOHEADER")]
    UnsupportedHeader(u32),
    #[error("Image geometry mismatch: expected {expected_width}x{expected_height}, found {width}x{height}")]
    GeometryMismatch {
        width: i32,
        height: i32,
        expected_width: i32,
        expected_height: i32,
    },
    #[error("Only 8bpp bitmaps supported. Found: {0}")]
    UnsupportedDepth(u16),
    #[error("Only uncompressed bitmaps supported. Found compression type {0}")]
    UnsupportedCompression(u32),
    #[error("Bitmap truncated: {region} needs {needed} bytes at offset {offset}, buffer holds {actual}")]
    Truncated {
        region: &'static str,
        offset: usize,
        needed: usize,
        actual: usize,
    },
}

/// The two DIB header layouts this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderShape {
    /// BITMAPCOREHEADER: u16 geometry, 3-byte palette entries.
    Core,
    /// BITMAPINFOHEADER: i32 geometry, compression field, 4-byte palette entries.
    Info,
}

impl HeaderShape {
    fn from_size(size: u32) -> Option<Self> {
        match size as usize {
            CORE_HEADER_SIZE => Some(Self::Core),
            INFO_HEADER_SIZE => Some(Self::Info),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::Core => CORE_HEADER_SIZE,
            Self::Info => INFO_HEADER_SIZE,
        }
    }

    pub fn palette_entry_size(self) -> usize {
        match self {
            Self::Core => 3,
            Self::Info => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmapDescriptor {
    pub magic: [u8; 2],
    pub size: u32,
    pub pixels_offset: u32,
    pub shape: HeaderShape,
    pub width: i32,
    pub height: i32,
    pub colour_planes: u16,
    pub bpp: u16,
    /// Only present for the info header.
    pub compression: Option<u32>,
    /// Palette entries actually stored; 0 in the file means all of them.
    pub colours_used: u32,
}

impl BitmapDescriptor {
    pub fn palette_offset(&self) -> usize {
        FILE_HEADER_SIZE + self.shape.size()
    }

    pub fn palette_entries(&self) -> usize {
        match self.colours_used as usize {
            n @ 1..=PALETTE_ENTRIES => n,
            _ => PALETTE_ENTRIES,
        }
    }

    /// Bytes per stored pixel row, including padding to a 4-byte boundary.
    pub fn row_stride(&self) -> usize {
        row_stride(self.width as usize)
    }
}

pub fn row_stride(width: usize) -> usize {
    (width + 3) & !3
}

fn u16_at(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn u32_at(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn i32_at(data: &[u8], at: usize) -> i32 {
    u32_at(data, at) as i32
}

pub(crate) fn ensure_len(
    data: &[u8],
    region: &'static str,
    offset: usize,
    needed: usize,
) -> Result<(), HeaderError> {
    if offset.checked_add(needed).map_or(true, |end| end > data.len()) {
        error!("Bitmap truncated while reading {}", region);
        return Err(HeaderError::Truncated {
            region,
            offset,
            needed,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Parses the file and DIB headers of `data` and checks them against the
/// geometry the engine expects for this asset.
pub fn parse_header(
    data: &[u8],
    expected_width: u16,
    expected_height: u16,
) -> Result<BitmapDescriptor, HeaderError> {
    ensure_len(data, "magic", 0, 2)?;
    let magic = [data[0], data[1]];
    if !MAGIC_TAGS.contains(&magic) {
        error!("Invalid bitmap magic {:?}", magic);
        return Err(HeaderError::UnsupportedFormat(magic));
    }

    ensure_len(data, "file header", 0, FILE_HEADER_SIZE + 4)?;
    let size = u32_at(data, 2);
    if size as usize != data.len() {
        error!("Declared size {} but buffer holds {}", size, data.len());
        return Err(HeaderError::SizeMismatch {
            declared: size,
            actual: data.len(),
        });
    }
    // Bytes 6..10 are reserved.
    let pixels_offset = u32_at(data, 10);

    let header_size = u32_at(data, FILE_HEADER_SIZE);
    let shape = HeaderShape::from_size(header_size).ok_or_else(|| {
        error!("Unsupported DIB header size {}", header_size);
        HeaderError::UnsupportedHeader(header_size)
    })?;
    ensure_len(data, "DIB header", FILE_HEADER_SIZE, shape.size())?;

    let at = FILE_HEADER_SIZE + 4;
    let descriptor = match shape {
        HeaderShape::Core => BitmapDescriptor {
            magic,
            size,
            pixels_offset,
            shape,
            width: u16_at(data, at) as i32,
            height: u16_at(data, at + 2) as i32,
            colour_planes: u16_at(data, at + 4),
            bpp: u16_at(data, at + 6),
            compression: None,
            colours_used: 0,
        },
        HeaderShape::Info => BitmapDescriptor {
            magic,
            size,
            pixels_offset,
            shape,
            width: i32_at(data, at),
            height: i32_at(data, at + 4),
            colour_planes: u16_at(data, at + 8),
            bpp: u16_at(data, at + 10),
            compression: Some(u32_at(data, at + 12)),
            colours_used: u32_at(data, at + 28),
        },
    };
    debug!(
        "Bitmap header: {:?} {}x{} {}bpp, pixels at {}",
        descriptor.shape,
        descriptor.width,
        descriptor.height,
        descriptor.bpp,
        descriptor.pixels_offset
    );

    if descriptor.width != expected_width as i32 || descriptor.height != expected_height as i32 {
        error!(
            "Image geometry {}x{} does not match expected {}x{}",
            descriptor.width, descriptor.height, expected_width, expected_height
        );
        return Err(HeaderError::GeometryMismatch {
            width: descriptor.width,
            height: descriptor.height,
            expected_width: expected_width as i32,
            expected_height: expected_height as i32,
        });
    }
    if descriptor.bpp != 8 {
        return Err(HeaderError::UnsupportedDepth(descriptor.bpp));
    }
    if let Some(compression) = descriptor.compression.filter(|&c| c != 0) {
        return Err(HeaderError::UnsupportedCompression(compression));
    }

    Ok(descriptor)
}

/// Writes a file header followed by a BITMAPCOREHEADER for an 8bpp image
/// whose palette and pixel rows are `palette_size` and `pixels_size` bytes.
pub fn write_core_header(
    out: &mut Vec<u8>,
    width: u16,
    height: u16,
    palette_size: usize,
    pixels_size: usize,
) {
    let pixels_offset = FILE_HEADER_SIZE + CORE_HEADER_SIZE + palette_size;
    let file_size = pixels_offset + pixels_size;

    out.extend_from_slice(&MAGIC_HEADER);
    out.extend_from_slice(&(file_size as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 4]); // reserved
    out.extend_from_slice(&(pixels_offset as u32).to_le_bytes());

    out.extend_from_slice(&(CORE_HEADER_SIZE as u32).to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // colour planes
    out.extend_from_slice(&8u16.to_le_bytes()); // bits per pixel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_bitmap(width: i32, height: i32, bpp: u16, compression: u32) -> Vec<u8> {
        let pixels = row_stride(width as usize) * height.unsigned_abs() as usize;
        let offset = FILE_HEADER_SIZE + INFO_HEADER_SIZE + 256 * 4;
        let size = offset + pixels;

        let mut data = Vec::with_capacity(size);
        data.extend_from_slice(b"BM");
        data.extend_from_slice(&(size as u32).to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&(offset as u32).to_le_bytes());
        data.extend_from_slice(&40u32.to_le_bytes());
        data.extend_from_slice(&width.to_le_bytes());
        data.extend_from_slice(&height.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes());
        data.extend_from_slice(&bpp.to_le_bytes());
        data.extend_from_slice(&compression.to_le_bytes());
        data.extend_from_slice(&[0u8; 20]);
        data.resize(size, 0);
        data
    }

    #[test]
    fn test_core_header_written_and_parsed() {
        let mut data = Vec::new();
        write_core_header(&mut data, 8, 2, 768, 16);
        data.resize(FILE_HEADER_SIZE + CORE_HEADER_SIZE + 768 + 16, 0);

        let header = parse_header(&data, 8, 2).unwrap();
        assert_eq!(header.shape, HeaderShape::Core);
        assert_eq!(header.size as usize, data.len());
        assert_eq!(header.pixels_offset, 26 + 768);
        assert_eq!(header.palette_offset(), 26);
        assert_eq!(header.colour_planes, 1);
        assert_eq!(header.compression, None);
    }

    #[test]
    fn test_info_header_parsed() {
        let data = info_bitmap(6, 3, 8, 0);
        let header = parse_header(&data, 6, 3).unwrap();
        assert_eq!(header.shape, HeaderShape::Info);
        assert_eq!(header.palette_offset(), 54);
        assert_eq!(header.row_stride(), 8);
        assert_eq!(header.compression, Some(0));
        assert_eq!(header.palette_entries(), 256);
    }

    #[test]
    fn test_unknown_magic() {
        let mut data = info_bitmap(4, 4, 8, 0);
        data[0] = b'P';
        data[1] = b'N';
        assert!(matches!(
            parse_header(&data, 4, 4),
            Err(HeaderError::UnsupportedFormat([b'P', b'N']))
        ));
    }

    #[test]
    fn test_alternate_magic_accepted() {
        let mut data = info_bitmap(4, 4, 8, 0);
        data[0] = b'C';
        data[1] = b'I';
        assert!(parse_header(&data, 4, 4).is_ok());
    }

    #[test]
    fn test_unsupported_header_size() {
        let mut data = info_bitmap(4, 4, 8, 0);
        data[14..18].copy_from_slice(&108u32.to_le_bytes());
        assert!(matches!(
            parse_header(&data, 4, 4),
            Err(HeaderError::UnsupportedHeader(108))
        ));
    }

    #[test]
    fn test_geometry_mismatch() {
        let data = info_bitmap(4, 4, 8, 0);
        assert!(matches!(
            parse_header(&data, 4, 5),
            Err(HeaderError::GeometryMismatch { height: 4, expected_height: 5, .. })
        ));
    }

    #[test]
    fn test_top_down_height_is_a_mismatch() {
        let data = info_bitmap(4, -4, 8, 0);
        assert!(matches!(
            parse_header(&data, 4, 4),
            Err(HeaderError::GeometryMismatch { height: -4, .. })
        ));
    }

    #[test]
    fn test_compressed_info_bitmap_rejected() {
        let data = info_bitmap(4, 4, 8, 1);
        assert!(matches!(
            parse_header(&data, 4, 4),
            Err(HeaderError::UnsupportedCompression(1))
        ));
    }

    #[test]
    fn test_colours_used_limits_palette() {
        let mut data = info_bitmap(4, 4, 8, 0);
        data[46..50].copy_from_slice(&16u32.to_le_bytes());
        let header = parse_header(&data, 4, 4).unwrap();
        assert_eq!(header.palette_entries(), 16);
    }

    #[test]
    fn test_short_buffer() {
        assert!(matches!(
            parse_header(b"B", 1, 1),
            Err(HeaderError::Truncated { region: "magic", .. })
        ));
    }
}
