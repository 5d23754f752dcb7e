//! Region containers: 32x32 cells, each holding at most one compressed
//! tag-tree document, addressed through a two-sector allocation table.
//!
//! Layout:
//! - bytes 0..4096: 1024 location entries, a 24-bit big-endian sector
//!   offset followed by an 8-bit sector count, indexed by `x * 32 + z`
//! - bytes 4096..8192: 1024 big-endian 32-bit timestamps, same indexing
//! - from byte 8192: cell payloads, each starting on a sector boundary with
//!   a 32-bit length, a compression byte and `length - 1` data bytes,
//!   zero-padded to the next sector boundary

pub mod allocator;
pub mod container;
pub mod header;

#[cfg(test)]
mod tests;

pub use allocator::{required_sectors, Placement, SectorAllocator, SectorRange};
pub use container::{CellDocument, CellFailure, RegionContainer, RegionScan};
pub use header::{CellStatus, RegionCell};

pub const SECTOR_SIZE: u64 = 4096;
pub const HEADER_SECTORS: u32 = 2;
pub const HEADER_BYTES: u64 = SECTOR_SIZE * HEADER_SECTORS as u64;
pub const CELLS_PER_AXIS: u8 = 32;
pub const CELL_COUNT: usize = CELLS_PER_AXIS as usize * CELLS_PER_AXIS as usize;
/// Largest sector offset a 24-bit location entry can hold.
pub const MAX_SECTOR_OFFSET: u32 = 0x00FF_FFFF;
pub const MAX_SECTOR_COUNT: u32 = u8::MAX as u32;
/// Bytes in front of each payload: the 32-bit length and the compression byte.
pub const PAYLOAD_HEADER_LEN: u64 = 5;
