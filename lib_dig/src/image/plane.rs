use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaneError {
    #[error("Pixel plane holds {actual} bytes, expected {expected} for {width}x{height}")]
    SizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
    #[error("A {width}x{height} plane cannot be interlaced: odd pixel count has no inverse")]
    NotInterlaceable { width: usize, height: usize },
}

fn check_len(buf: &[u8], width: usize, height: usize) -> Result<usize, PlaneError> {
    let expected = width * height;
    if buf.len() != expected {
        return Err(PlaneError::SizeMismatch {
            width,
            height,
            expected,
            actual: buf.len(),
        });
    }
    Ok(expected)
}

/// Reverses the row order of a tightly packed 8bpp plane. Applying it twice
/// yields the input.
pub fn flip_rows(buf: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PlaneError> {
    check_len(buf, width, height)?;
    if width == 0 {
        return Ok(Vec::new());
    }

    let mut flipped = Vec::with_capacity(buf.len());
    for row in buf.chunks_exact(width).rev() {
        flipped.extend_from_slice(row);
    }
    Ok(flipped)
}

/// Source offset of output pixel `index` in a plane of `len` pixels: the
/// index times four, wrapped back by `len - 1` until it lands inside.
fn interlace_offset(index: usize, len: usize) -> usize {
    let mut offset = index * 4;
    while offset >= len {
        offset -= len - 1;
    }
    offset
}

/// The stride-4 walk only visits every pixel once when `len - 1` is odd.
fn check_interlaceable(width: usize, height: usize) -> Result<usize, PlaneError> {
    let len = width * height;
    if len > 1 && len % 2 != 0 {
        return Err(PlaneError::NotInterlaceable { width, height });
    }
    Ok(len)
}

/// Gathers pixels into the engine's interlaced scan order.
pub fn interlace(buf: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PlaneError> {
    check_len(buf, width, height)?;
    let len = check_interlaceable(width, height)?;

    Ok((0..len).map(|i| buf[interlace_offset(i, len)]).collect())
}

/// Scatters interlaced pixels back to scanline order. Exact inverse of
/// [`interlace`].
pub fn deinterlace(buf: &[u8], width: usize, height: usize) -> Result<Vec<u8>, PlaneError> {
    check_len(buf, width, height)?;
    let len = check_interlaceable(width, height)?;

    let mut out = vec![0u8; len];
    for (i, &value) in buf.iter().enumerate() {
        out[interlace_offset(i, len)] = value;
    }
    Ok(out)
}
