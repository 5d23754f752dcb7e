//! Tag-tree documents and the region containers that store them.

pub mod big_endian;
pub mod compression;
pub mod error;
pub mod nbt;
pub mod region;
pub mod world;

pub use compression::CompressionKind;
pub use error::{Error, Result};
pub use nbt::{Compound, NamedTag, TagKind, TagList, TagValue};
pub use region::{CellStatus, RegionContainer};
