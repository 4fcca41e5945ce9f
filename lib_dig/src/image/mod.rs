pub mod decoder;
pub mod encoder;
pub mod format;
pub mod palette;
pub mod plane;

pub use decoder::{decode, DecodeError, PaletteSource, UnpackOptions};
pub use encoder::{encode, EncodeError, PackOptions};
pub use format::{parse_header, write_core_header, BitmapDescriptor, HeaderError, HeaderShape};
pub use palette::{DisplayPalette, StoredPalette};
pub use plane::{deinterlace, flip_rows, interlace, PlaneError};
