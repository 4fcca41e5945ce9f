//! Whole-game conversion driven by the asset manifests.
//!
//! Assets are independent apart from read-only palette lookups, so each
//! manifest is processed in parallel. A failing asset is logged and counted;
//! only a manifest that cannot be loaded stops the run.

use std::collections::{HashMap, HashSet};
use std::error::Error as StdError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};
use rayon::prelude::*;
use thiserror::Error;

use crate::compression::{self, CompressionError, Compressor};
use crate::constants::{MOD_DIR, MOD_GFX_DIR, MOD_LEVEL_DIR};
use crate::image::{self, DecodeError, EncodeError, PackOptions, PaletteSource, UnpackOptions};
use crate::manifest::{AssetDescriptor, GameVariant, Manifest, ManifestError, ManifestKind};
use crate::tilemap::{self, TilemapError};

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error on {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to pack bitmap")]
    Encode(#[from] EncodeError),
    #[error("Failed to unpack bitmap")]
    Decode(#[from] DecodeError),
    #[error("Failed to convert tile layer")]
    Tilemap(#[from] TilemapError),
    #[error("Failed to decompress engine file")]
    Compression(#[from] CompressionError),
    #[error("Couldn't find palette for {asset}")]
    MissingPalette { asset: String },
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Failed to load asset manifest")]
    Manifest(#[from] ManifestError),
    #[error("Failed to start worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Root of the game install.
    pub game_dir: PathBuf,
    /// Directory holding the `<variant>-<kind>.json` manifests.
    pub meta_dir: PathBuf,
    /// Worker threads, which also bounds concurrent compressor processes.
    /// 0 picks one per core.
    pub jobs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub converted: usize,
    pub skipped: usize,
    /// Names of the assets that failed, in manifest order.
    pub failed: Vec<String>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, asset: &str, result: Result<Outcome, AssetError>) {
        match result {
            Ok(Outcome::Converted) => self.converted += 1,
            Ok(Outcome::Skipped) => self.skipped += 1,
            Err(err) => {
                error!("{}: {}", asset, describe(&err));
                self.failed.push(asset.to_string());
            }
        }
    }
}

enum Outcome {
    Converted,
    Skipped,
}

/// Renders an error and all of its sources on one line.
pub fn describe(err: &dyn StdError) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Where both sides of the conversion live inside a game install.
#[derive(Debug, Clone)]
pub struct GameLayout {
    game_dir: PathBuf,
}

impl GameLayout {
    pub fn new(game_dir: impl Into<PathBuf>) -> Self {
        Self {
            game_dir: game_dir.into(),
        }
    }

    pub fn gfx_dir(&self) -> PathBuf {
        self.game_dir.join(MOD_DIR).join(MOD_GFX_DIR)
    }

    pub fn level_dir(&self) -> PathBuf {
        self.game_dir.join(MOD_DIR).join(MOD_LEVEL_DIR)
    }

    pub fn engine_path(&self, manifest: &Manifest, asset: &AssetDescriptor) -> PathBuf {
        self.game_dir
            .join(&manifest.output_directory)
            .join(&asset.name)
    }

    pub fn bitmap_path(&self, asset: &AssetDescriptor) -> PathBuf {
        self.gfx_dir().join(asset.bitmap_file_name())
    }

    pub fn level_path(&self, asset: &AssetDescriptor) -> PathBuf {
        self.level_dir().join(asset.level_file_name())
    }
}

fn read(path: &Path) -> Result<Vec<u8>, AssetError> {
    fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, data: &[u8]) -> Result<(), AssetError> {
    let io_error = |source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, data).map_err(io_error)
}

fn worker_pool(config: &BatchConfig) -> Result<rayon::ThreadPool, BatchError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()?)
}

/// Converts the editor files under `MOD/` back into engine files.
pub fn pack(config: &BatchConfig, compressor: &dyn Compressor) -> Result<BatchReport, BatchError> {
    let variant = GameVariant::detect(&config.game_dir);
    info!("Packing {:?} install at {:?}", variant, config.game_dir);

    let layout = GameLayout::new(&config.game_dir);
    let pool = worker_pool(config)?;
    let mut report = BatchReport::default();

    let levels = Manifest::load(&config.meta_dir, variant, ManifestKind::LevelData)?;
    let results: Vec<_> = pool.install(|| {
        levels
            .files
            .par_iter()
            .map(|file| pack_level(&layout, &levels, file))
            .collect()
    });
    for (file, result) in levels.files.iter().zip(results) {
        report.record(&file.name, result);
    }

    let gfx = Manifest::load(&config.meta_dir, variant, ManifestKind::Gfx)?;
    let results: Vec<_> = pool.install(|| {
        gfx.files
            .par_iter()
            .map(|file| pack_bitmap(&layout, &gfx, file, compressor))
            .collect()
    });
    for (file, result) in gfx.files.iter().zip(results) {
        report.record(&file.name, result);
    }

    info!(
        "Packed {} assets, skipped {}, {} failed",
        report.converted,
        report.skipped,
        report.failed.len()
    );
    Ok(report)
}

fn pack_level(
    layout: &GameLayout,
    manifest: &Manifest,
    file: &AssetDescriptor,
) -> Result<Outcome, AssetError> {
    let src = layout.level_path(file);
    if !src.exists() {
        debug!("No level source {:?}", src);
        return Ok(Outcome::Skipped);
    }

    info!("Packing {:?} to {}", src, file.name);
    let document = fs::read_to_string(&src).map_err(|source| AssetError::Io {
        path: src.clone(),
        source,
    })?;
    let data = tilemap::pack_document(&document)?;
    write(&layout.engine_path(manifest, file), &data)?;
    Ok(Outcome::Converted)
}

fn pack_bitmap(
    layout: &GameLayout,
    manifest: &Manifest,
    file: &AssetDescriptor,
    compressor: &dyn Compressor,
) -> Result<Outcome, AssetError> {
    if !file.is_convertible_bitmap() {
        return Ok(Outcome::Skipped);
    }
    let src = layout.bitmap_path(file);
    if !src.exists() {
        debug!("No bitmap source {:?}", src);
        return Ok(Outcome::Skipped);
    }

    info!("Packing {:?} to {}", src, file.name);
    let bitmap = read(&src)?;
    let options = PackOptions {
        width: file.width,
        height: file.height,
        emit_palette: file.embeds_palette(),
        interlaced: file.interlaced,
        compression: file.compression,
    };
    let packed = image::encode(&bitmap, &options, compressor)?;
    write(&layout.engine_path(manifest, file), &packed)?;
    Ok(Outcome::Converted)
}

/// Converts engine files into editor files under `MOD/`.
pub fn unpack(config: &BatchConfig, compressor: &dyn Compressor) -> Result<BatchReport, BatchError> {
    let variant = GameVariant::detect(&config.game_dir);
    info!("Unpacking {:?} install at {:?}", variant, config.game_dir);

    let layout = GameLayout::new(&config.game_dir);
    let pool = worker_pool(config)?;
    let mut report = BatchReport::default();

    let levels = Manifest::load(&config.meta_dir, variant, ManifestKind::LevelData)?;
    let results: Vec<_> = pool.install(|| {
        levels
            .files
            .par_iter()
            .map(|file| unpack_level(&layout, &levels, file))
            .collect()
    });
    for (file, result) in levels.files.iter().zip(results) {
        report.record(&file.name, result);
    }

    let gfx = Manifest::load(&config.meta_dir, variant, ManifestKind::Gfx)?;
    let loaded = pool.install(|| load_payloads(&layout, &gfx, compressor));
    let mut payloads = HashMap::new();
    let mut failed = HashSet::new();
    for (name, result) in loaded {
        match result {
            Ok(payload) => {
                payloads.insert(name, payload);
            }
            Err(err) => {
                report.record(&name, Err(err));
                failed.insert(name);
            }
        }
    }

    let results: Vec<_> = pool.install(|| {
        gfx.files
            .par_iter()
            .filter(|file| !failed.contains(&file.name))
            .map(|file| (file, unpack_bitmap(&layout, &gfx, file, &payloads)))
            .collect()
    });
    for (file, result) in results {
        report.record(&file.name, result);
    }

    info!(
        "Unpacked {} assets, skipped {}, {} failed",
        report.converted,
        report.skipped,
        report.failed.len()
    );
    Ok(report)
}

fn unpack_level(
    layout: &GameLayout,
    manifest: &Manifest,
    file: &AssetDescriptor,
) -> Result<Outcome, AssetError> {
    let src = layout.engine_path(manifest, file);
    if !src.exists() {
        debug!("No level file {:?}", src);
        return Ok(Outcome::Skipped);
    }

    let dest = layout.level_path(file);
    info!("Unpacking {} to {:?}", file.name, dest);
    let data = read(&src)?;
    let document = tilemap::unpack_to_document(&data, &file.tileset)?;
    write(&dest, document.as_bytes())?;
    Ok(Outcome::Converted)
}

/// Reads and decompresses every convertible bitmap plus every entry used
/// as someone's palette. Entries without an engine file are left out.
fn load_payloads(
    layout: &GameLayout,
    manifest: &Manifest,
    compressor: &dyn Compressor,
) -> Vec<(String, Result<Vec<u8>, AssetError>)> {
    let mut wanted: Vec<&AssetDescriptor> = manifest
        .files
        .iter()
        .filter(|file| file.is_convertible_bitmap())
        .collect();
    for file in manifest.files.iter().filter(|file| file.is_convertible_bitmap()) {
        if let Some(owner) = manifest.palette_owner(file) {
            if !wanted.iter().any(|wanted| wanted.name == owner.name) {
                wanted.push(owner);
            }
        }
    }

    wanted
        .par_iter()
        .filter_map(|file| {
            let src = layout.engine_path(manifest, file);
            if !src.exists() {
                return None;
            }
            let payload = read(&src).and_then(|data| {
                compression::decompress(compressor, file.compression, data)
                    .map_err(AssetError::from)
            });
            Some((file.name.clone(), payload))
        })
        .collect()
}

fn unpack_bitmap(
    layout: &GameLayout,
    manifest: &Manifest,
    file: &AssetDescriptor,
    payloads: &HashMap<String, Vec<u8>>,
) -> Result<Outcome, AssetError> {
    if !file.is_convertible_bitmap() {
        return Ok(Outcome::Skipped);
    }
    let Some(payload) = payloads.get(&file.name) else {
        debug!("No engine file for {}", file.name);
        return Ok(Outcome::Skipped);
    };

    let missing = || AssetError::MissingPalette {
        asset: file.name.clone(),
    };
    let owner = manifest.palette_owner(file).ok_or_else(missing)?;
    let palette = if file.embeds_palette() {
        PaletteSource::Embedded
    } else {
        match payloads.get(&owner.name) {
            Some(sibling) => PaletteSource::Sibling(sibling),
            None => {
                warn!("Palette {} of {} is not available", owner.name, file.name);
                return Err(missing());
            }
        }
    };

    let dest = layout.bitmap_path(file);
    info!("Unpacking {} to {:?}", file.name, dest);
    let options = UnpackOptions {
        width: file.width,
        height: file.height,
        interlaced: file.interlaced,
    };
    let bitmap = image::decode(payload, palette, &options)?;
    write(&dest, &bitmap)?;
    Ok(Outcome::Converted)
}
