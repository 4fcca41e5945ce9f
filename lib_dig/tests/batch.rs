mod common;

use std::fs;
use std::path::Path;

use common::{core_bitmap, display_palette, pattern, BrokenCompressor, TaggingCompressor};
use lib_dig::batch::{self, BatchConfig, BatchError};
use lib_dig::compression::CompressionKind;
use lib_dig::constants::TILEMAP_BYTES;
use lib_dig::image::{encode, PackOptions};
use tempfile::TempDir;

const LEVELS: &str = r#"{
    "path": "LEVELS",
    "files": [
        {"name": "LEVEL01.DAT", "tileset": "CAVE", "title": "First Dig"}
    ]
}"#;

fn gfx_manifest(font_palette: &str) -> String {
    format!(
        r#"{{
    "path": "DATA",
    "files": [
        {{"name": "TITLE.SPR", "width": 4, "height": 4, "palette": true, "compression": "RNC"}},
        {{"name": "FONT.SPR", "width": 8, "height": 2, "palette": "{}", "interlaced": true}},
        {{"name": "LOGO.SPR", "width": 4, "height": 2, "palette": "LOGO.SPR"}},
        {{"name": "SOUND.DAT"}}
    ]
}}"#,
        font_palette
    )
}

struct Install {
    game: TempDir,
    meta: TempDir,
}

impl Install {
    fn new(font_palette: &str) -> Self {
        let game = tempfile::tempdir().unwrap();
        let meta = tempfile::tempdir().unwrap();
        fs::write(meta.path().join("diggers-lvl_data.json"), LEVELS).unwrap();
        fs::write(meta.path().join("diggers-gfx.json"), gfx_manifest(font_palette)).unwrap();

        let install = Self { game, meta };
        install.write_engine_files();
        install
    }

    fn config(&self) -> BatchConfig {
        BatchConfig {
            game_dir: self.game.path().to_path_buf(),
            meta_dir: self.meta.path().to_path_buf(),
            jobs: 2,
        }
    }

    fn game(&self) -> &Path {
        self.game.path()
    }

    fn write_engine_files(&self) {
        let palette = display_palette();
        fs::create_dir_all(self.game().join("DATA")).unwrap();
        fs::create_dir_all(self.game().join("LEVELS")).unwrap();

        let title = encode(
            &core_bitmap(4, 4, &palette, &pattern(4, 4)),
            &PackOptions {
                width: 4,
                height: 4,
                emit_palette: true,
                interlaced: false,
                compression: CompressionKind::Rnc,
            },
            &TaggingCompressor,
        )
        .unwrap();
        fs::write(self.game().join("DATA/TITLE.SPR"), title).unwrap();

        let font = encode(
            &core_bitmap(8, 2, &palette, &pattern(8, 2)),
            &PackOptions {
                width: 8,
                height: 2,
                emit_palette: false,
                interlaced: true,
                compression: CompressionKind::None,
            },
            &TaggingCompressor,
        )
        .unwrap();
        fs::write(self.game().join("DATA/FONT.SPR"), font).unwrap();

        let logo = encode(
            &core_bitmap(4, 2, &palette, &pattern(4, 2)),
            &PackOptions {
                width: 4,
                height: 2,
                emit_palette: true,
                interlaced: false,
                compression: CompressionKind::None,
            },
            &TaggingCompressor,
        )
        .unwrap();
        fs::write(self.game().join("DATA/LOGO.SPR"), logo).unwrap();

        let level: Vec<u8> = (0..TILEMAP_BYTES).map(|i| (i % 7) as u8).collect();
        fs::write(self.game().join("LEVELS/LEVEL01.DAT"), level).unwrap();
    }

    fn engine_files(&self) -> Vec<Vec<u8>> {
        [
            "DATA/TITLE.SPR",
            "DATA/FONT.SPR",
            "DATA/LOGO.SPR",
            "LEVELS/LEVEL01.DAT",
        ]
            .iter()
            .map(|name| fs::read(self.game().join(name)).unwrap())
            .collect()
    }
}

#[test]
fn test_unpack_then_pack_restores_engine_files() {
    let install = Install::new("TITLE.SPR");
    let original = install.engine_files();

    let report = batch::unpack(&install.config(), &TaggingCompressor).unwrap();
    assert!(report.is_clean(), "failed: {:?}", report.failed);
    assert_eq!(report.converted, 4);
    assert_eq!(report.skipped, 1);

    let mod_dir = install.game().join("MOD");
    assert!(mod_dir.join("GFX/TITLE.bmp").exists());
    assert!(mod_dir.join("GFX/FONT.bmp").exists());
    assert!(mod_dir.join("GFX/LOGO.bmp").exists());
    let document =
        fs::read_to_string(mod_dir.join("LVL_DATA/LEVEL01.DAT-CAVE-First Dig.tmx")).unwrap();
    assert!(document.contains("CAVEBLOCK1"));

    fs::remove_dir_all(install.game().join("DATA")).unwrap();
    fs::remove_dir_all(install.game().join("LEVELS")).unwrap();

    let report = batch::pack(&install.config(), &TaggingCompressor).unwrap();
    assert!(report.is_clean(), "failed: {:?}", report.failed);
    assert_eq!(report.converted, 4);
    assert_eq!(install.engine_files(), original);
}

#[test]
fn test_missing_palette_writes_nothing() {
    let install = Install::new("GONE.SPR");

    let report = batch::unpack(&install.config(), &TaggingCompressor).unwrap();
    assert_eq!(report.failed, ["FONT.SPR"]);
    assert_eq!(report.converted, 3);
    assert!(!install.game().join("MOD/GFX/FONT.bmp").exists());
    assert!(install.game().join("MOD/GFX/TITLE.bmp").exists());
}

#[test]
fn test_missing_sources_are_skipped() {
    let install = Install::new("TITLE.SPR");

    // Nothing has been unpacked yet, so there is nothing to pack.
    let report = batch::pack(&install.config(), &TaggingCompressor).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.converted, 0);
    assert_eq!(report.skipped, 5);
}

#[test]
fn test_missing_manifest_is_fatal() {
    let install = Install::new("TITLE.SPR");
    fs::remove_file(install.meta.path().join("diggers-gfx.json")).unwrap();

    assert!(matches!(
        batch::unpack(&install.config(), &TaggingCompressor),
        Err(BatchError::Manifest(_))
    ));
}

#[test]
fn test_compressor_failure_is_counted() {
    let install = Install::new("TITLE.SPR");

    let report = batch::unpack(&install.config(), &BrokenCompressor).unwrap();
    assert_eq!(report.converted, 2);
    let mut failed = report.failed.clone();
    failed.sort();
    assert_eq!(failed, ["FONT.SPR", "TITLE.SPR"]);
    assert!(!install.game().join("MOD/GFX/TITLE.bmp").exists());
}

#[test]
fn test_extractors_install_uses_its_manifests() {
    let install = Install::new("TITLE.SPR");
    fs::write(install.game().join("XTRACTOR.EXE"), b"").unwrap();

    assert!(matches!(
        batch::unpack(&install.config(), &TaggingCompressor),
        Err(BatchError::Manifest(_))
    ));
}
