pub mod propack;

use std::io;
use std::path::PathBuf;

use log::{debug, error};
use serde::Deserialize;
use thiserror::Error;

use crate::constants::RNC_SIGNATURE;

pub use propack::{ProPack, ProPackConfig, ToolCommand};

#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Buffer not compressed with RNC Pro-Pack")]
    NotCompressed,
    #[error("Compression tool {tool:?} failed: {reason}")]
    Tool { tool: PathBuf, reason: String },
    #[error("Compression tool {tool:?} did not finish within {seconds}s")]
    Timeout { tool: PathBuf, seconds: u64 },
    #[error("IO error while running compression tool: {0}")]
    Io(#[from] io::Error),
}

/// How an asset's engine binary is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CompressionKind {
    #[default]
    #[serde(alias = "none")]
    None,
    #[serde(rename = "RNC")]
    Rnc,
}

/// Opaque compress/decompress transform over whole buffers.
pub trait Compressor: Send + Sync {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;

    /// Implementations must reject input without the `RNC` signature with
    /// [`CompressionError::NotCompressed`]; see [`ensure_compressed`].
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

pub fn is_compressed(data: &[u8]) -> bool {
    data.starts_with(&RNC_SIGNATURE)
}

pub fn ensure_compressed(data: &[u8]) -> Result<(), CompressionError> {
    if !is_compressed(data) {
        error!("Buffer of {} bytes lacks the RNC signature", data.len());
        return Err(CompressionError::NotCompressed);
    }
    Ok(())
}

/// Applies `kind` to a freshly packed payload.
pub fn compress(
    compressor: &dyn Compressor,
    kind: CompressionKind,
    data: Vec<u8>,
) -> Result<Vec<u8>, CompressionError> {
    match kind {
        CompressionKind::None => Ok(data),
        CompressionKind::Rnc => {
            let packed = compressor.compress(&data)?;
            debug!("Compressed {} bytes to {}", data.len(), packed.len());
            Ok(packed)
        }
    }
}

/// Undoes `kind` on an engine binary. Files the engine left uncompressed
/// despite their descriptor pass through untouched.
pub fn decompress(
    compressor: &dyn Compressor,
    kind: CompressionKind,
    data: Vec<u8>,
) -> Result<Vec<u8>, CompressionError> {
    if kind == CompressionKind::Rnc && is_compressed(&data) {
        let unpacked = compressor.decompress(&data)?;
        debug!("Decompressed {} bytes to {}", data.len(), unpacked.len());
        return Ok(unpacked);
    }
    Ok(data)
}
