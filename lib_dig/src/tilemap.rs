//! Level tile layers: the engine's 128x128 grid of big-endian `i16` tile
//! indices, and the Tiled (`.tmx`) CSV layer the editor works with.
//!
//! Editor ids are one-based with 0 meaning "no tile", so every value is
//! shifted by one between the two forms.

use log::{debug, error};
use thiserror::Error;

use crate::constants::{TILEMAP_BYTES, TILEMAP_SIDE, TILEMAP_TILES};

#[derive(Error, Debug)]
pub enum TilemapError {
    #[error("Tilemap layer not found")]
    MalformedLayer,
    #[error("Tilemap layer encoding {0:?} not supported, save the map with CSV layer format")]
    UnsupportedEncoding(String),
    #[error("Tile layer holds {actual} tiles, expected {expected}")]
    LayerSizeMismatch { expected: usize, actual: usize },
    #[error("Tile layer file is {actual} bytes, expected {expected}")]
    BinarySizeMismatch { expected: usize, actual: usize },
    #[error("Invalid tile id {token:?} at position {index}")]
    InvalidTile { index: usize, token: String },
}

/// Converts a CSV tile layer into the engine's binary layer.
pub fn encode_layer(csv: &str) -> Result<Vec<u8>, TilemapError> {
    let tokens: Vec<&str> = csv
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.len() != TILEMAP_TILES {
        error!("Tile layer holds {} tiles", tokens.len());
        return Err(TilemapError::LayerSizeMismatch {
            expected: TILEMAP_TILES,
            actual: tokens.len(),
        });
    }

    let mut data = Vec::with_capacity(TILEMAP_BYTES);
    for (index, token) in tokens.into_iter().enumerate() {
        let tile = token
            .parse::<i32>()
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|tile| i16::try_from(tile).ok())
            .ok_or_else(|| TilemapError::InvalidTile {
                index,
                token: token.to_string(),
            })?;
        data.extend_from_slice(&tile.to_be_bytes());
    }
    Ok(data)
}

/// Converts an engine binary layer into CSV editor ids.
pub fn decode_layer(data: &[u8]) -> Result<String, TilemapError> {
    if data.len() != TILEMAP_BYTES {
        error!("Tile layer file is {} bytes", data.len());
        return Err(TilemapError::BinarySizeMismatch {
            expected: TILEMAP_BYTES,
            actual: data.len(),
        });
    }

    let ids: Vec<String> = data
        .chunks_exact(2)
        .map(|pair| (i16::from_be_bytes([pair[0], pair[1]]) as i32 + 1).to_string())
        .collect();
    Ok(ids.join(","))
}

/// Finds the CSV text of the first layer's `<data>` element. Later layers
/// are never consulted.
pub fn extract_layer(document: &str) -> Result<&str, TilemapError> {
    let start = document.find("<layer").ok_or(TilemapError::MalformedLayer)?;
    let rest = &document[start..];
    let open_end = rest.find('>').ok_or(TilemapError::MalformedLayer)?;
    if rest[..open_end].ends_with('/') {
        return Err(TilemapError::MalformedLayer);
    }
    let close = rest.find("</layer>").ok_or(TilemapError::MalformedLayer)?;
    let layer = &rest[..close];

    let data = layer.find("<data").ok_or(TilemapError::MalformedLayer)?;
    let rest = &layer[data..];
    let tag_end = rest.find('>').ok_or(TilemapError::MalformedLayer)?;
    let tag = &rest[..tag_end];

    if let Some(encoding) = attribute(tag, "encoding") {
        if encoding != "csv" {
            return Err(TilemapError::UnsupportedEncoding(encoding.to_string()));
        }
    }
    if tag.ends_with('/') {
        return Ok("");
    }

    let body = &rest[tag_end + 1..];
    let close = body.find("</data>").ok_or(TilemapError::MalformedLayer)?;
    debug!("Located tile layer data: {} bytes", close);
    Ok(&body[..close])
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!(" {}=\"", name);
    let start = tag.find(&pattern)? + pattern.len();
    let len = tag[start..].find('"')?;
    Some(&tag[start..start + len])
}

/// Wraps a CSV layer in a Tiled map referencing the two block tilesets of
/// `tileset`.
pub fn layer_to_document(csv: &str, tileset: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.0" tiledversion="1.1.1" orientation="orthogonal" renderorder="right-down" width="{side}" height="{side}" tilewidth="16" tileheight="16" infinite="0" nextobjectid="1">
 <tileset firstgid="1" name="{tileset}BLOCK1" tilewidth="16" tileheight="16" tilecount="240" columns="20">
  <image source="../GFX/{tileset}BLOCK1.bmp" width="320" height="200"/>
 </tileset>
 <tileset firstgid="241" name="{tileset}BLOCK2" tilewidth="16" tileheight="16" tilecount="240" columns="20">
  <image source="../GFX/{tileset}BLOCK2.bmp" width="320" height="200"/>
 </tileset>
 <layer name="Tile Layer 1" width="{side}" height="{side}">
  <data encoding="csv">{csv}</data>
 </layer>
</map>
"#,
        side = TILEMAP_SIDE,
        tileset = tileset,
        csv = csv,
    )
}

/// Tiled document to engine layer.
pub fn pack_document(document: &str) -> Result<Vec<u8>, TilemapError> {
    encode_layer(extract_layer(document)?)
}

/// Engine layer to Tiled document.
pub fn unpack_to_document(data: &[u8], tileset: &str) -> Result<String, TilemapError> {
    Ok(layer_to_document(&decode_layer(data)?, tileset))
}
