use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::compression::CompressionKind;
use crate::constants::{BITMAP_EXT, EXTRACTORS_MARKER, TILEMAP_EXT};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse manifest {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The two games sharing this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameVariant {
    Diggers,
    Extractors,
}

impl GameVariant {
    /// Extractors installs carry their own executable name.
    pub fn detect(game_dir: &Path) -> Self {
        if game_dir.join(EXTRACTORS_MARKER).exists() {
            Self::Extractors
        } else {
            Self::Diggers
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Diggers => "diggers",
            Self::Extractors => "extractors",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Gfx,
    LevelData,
}

impl ManifestKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Gfx => "gfx",
            Self::LevelData => "lvl_data",
        }
    }
}

/// Which palette a bitmap is drawn with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<RawPalette>")]
pub enum PaletteRef {
    /// No palette known; the asset cannot be converted.
    #[default]
    None,
    /// The engine binary starts with its own palette.
    SelfReference,
    /// The palette is the one embedded in another asset of the same batch.
    Named(String),
}

/// Manifests spell the palette as `true`, `false` or an asset name.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPalette {
    Flag(bool),
    Name(String),
}

impl From<Option<RawPalette>> for PaletteRef {
    fn from(raw: Option<RawPalette>) -> Self {
        match raw {
            Some(RawPalette::Flag(true)) => Self::SelfReference,
            Some(RawPalette::Name(name)) if !name.is_empty() => Self::Named(name),
            _ => Self::None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetDescriptor {
    /// File name inside the engine's data directory.
    pub name: String,
    #[serde(default)]
    pub width: u16,
    #[serde(default)]
    pub height: u16,
    #[serde(default)]
    pub palette: PaletteRef,
    #[serde(default)]
    pub interlaced: bool,
    /// 1bpp masks use a different layout and are left alone.
    #[serde(default)]
    pub bitmask: bool,
    #[serde(default)]
    pub compression: CompressionKind,
    /// Level maps only: tileset prefix of the block graphics.
    #[serde(default)]
    pub tileset: String,
    /// Level maps only: human readable level title.
    #[serde(default)]
    pub title: String,
}

impl AssetDescriptor {
    /// Whether the raster codec handles this graphics entry at all.
    pub fn is_convertible_bitmap(&self) -> bool {
        !self.bitmask && self.width > 0 && self.palette != PaletteRef::None
    }

    /// Whether the engine binary starts with this asset's own palette, either
    /// flagged `true` or named after the asset itself.
    pub fn embeds_palette(&self) -> bool {
        match &self.palette {
            PaletteRef::SelfReference => true,
            PaletteRef::Named(name) => *name == self.name,
            PaletteRef::None => false,
        }
    }

    /// Editor file name of a graphics entry: `TITLE.SPR` becomes `TITLE.bmp`.
    pub fn bitmap_file_name(&self) -> String {
        let stem = Path::new(&self.name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone());
        format!("{}.{}", stem, BITMAP_EXT)
    }

    /// Editor file name of a level entry, `<name>-<tileset>-<title>.tmx`.
    pub fn level_file_name(&self) -> String {
        format!("{}-{}-{}.{}", self.name, self.tileset, self.title, TILEMAP_EXT)
    }
}

/// One metadata file: where the engine keeps a class of assets and what
/// each of them looks like.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    /// Engine data directory relative to the game root.
    #[serde(rename = "path")]
    pub output_directory: PathBuf,
    pub files: Vec<AssetDescriptor>,
}

impl Manifest {
    pub fn file_name(variant: GameVariant, kind: ManifestKind) -> String {
        format!("{}-{}.json", variant.name(), kind.name())
    }

    /// Reads `<meta_dir>/<variant>-<kind>.json`.
    pub fn load(
        meta_dir: &Path,
        variant: GameVariant,
        kind: ManifestKind,
    ) -> Result<Self, ManifestError> {
        let path = meta_dir.join(Self::file_name(variant, kind));
        debug!("Loading manifest {:?}", path);

        let file = File::open(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        let manifest: Manifest = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| ManifestError::Parse { path: path.clone(), source })?;

        info!("Loaded {} entries from {:?}", manifest.files.len(), path);
        Ok(manifest)
    }

    pub fn find(&self, name: &str) -> Option<&AssetDescriptor> {
        self.files.iter().find(|file| file.name == name)
    }

    /// The entry whose payload carries `asset`'s palette, if it is in this
    /// batch.
    pub fn palette_owner<'a>(&'a self, asset: &'a AssetDescriptor) -> Option<&'a AssetDescriptor> {
        match &asset.palette {
            PaletteRef::None => None,
            PaletteRef::SelfReference => Some(asset),
            PaletteRef::Named(name) => self.find(name),
        }
    }
}
