pub mod batch;
pub mod compression;
pub mod constants;
pub mod image;
pub mod manifest;
pub mod tilemap;

use log::*;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

pub use crate::batch::{BatchConfig, BatchReport};
pub use crate::compression::{CompressionKind, Compressor, ProPack, ProPackConfig};
pub use crate::image::{decode, encode, PackOptions, PaletteSource, UnpackOptions};
pub use crate::manifest::{AssetDescriptor, GameVariant, Manifest, PaletteRef};

/// Sets up `env_logger` for the library and its front end. `RUST_LOG`
/// overrides the default level; with `log_file` the output goes there
/// instead of stderr.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> io::Result<()> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter(None, LevelFilter::Warn)
        .filter(Some("lib_dig"), level)
        .filter(Some("digmod"), level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

    if let Some(path) = log_file {
        let target = Box::new(File::create(path)?);
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.init();
    Ok(())
}
