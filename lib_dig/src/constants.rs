pub const BITMAP_EXT: &str = "bmp";
pub const TILEMAP_EXT: &str = "tmx";

/// Number of entries in every palette, stored or display.
pub const PALETTE_ENTRIES: usize = 256;
/// Size of a stored palette block inside an engine binary.
pub const STORED_PALETTE_SIZE: usize = PALETTE_ENTRIES * 3;

/// Side length of a level tile layer, in tiles.
pub const TILEMAP_SIDE: usize = 128;
pub const TILEMAP_TILES: usize = TILEMAP_SIDE * TILEMAP_SIDE;
/// Size of an engine tile layer file.
pub const TILEMAP_BYTES: usize = TILEMAP_TILES * std::mem::size_of::<i16>();

/// Signature at the start of every Pro-Pack compressed buffer.
pub const RNC_SIGNATURE: [u8; 3] = *b"RNC";

/// File whose presence marks an Extractors install instead of Diggers.
pub const EXTRACTORS_MARKER: &str = "XTRACTOR.EXE";
/// Directory inside the game tree holding editor-side files.
pub const MOD_DIR: &str = "MOD";
pub const MOD_GFX_DIR: &str = "GFX";
pub const MOD_LEVEL_DIR: &str = "LVL_DATA";
