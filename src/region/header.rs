use crate::big_endian::{BigEndianReader, BigEndianWriter};
use crate::error::{Error, Result};
use crate::nbt::NamedTag;
use crate::region::allocator::SectorRange;
use crate::region::{CELLS_PER_AXIS, CELL_COUNT, HEADER_BYTES, HEADER_SECTORS, SECTOR_SIZE};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellStatus {
    NotCreated,
    ZeroLength,
    /// The location entry points into the allocation table itself.
    InHeader,
    /// The entry's sectors reach past the end of the file.
    OutOfFile,
    /// The stored payload length does not fit the entry's sectors. Only known
    /// once the payload has been read.
    MismatchedLength,
    Ok,
}

impl fmt::Display for CellStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CellStatus::NotCreated => "not-created",
            CellStatus::ZeroLength => "zero-length",
            CellStatus::InHeader => "in-header",
            CellStatus::OutOfFile => "out-of-file",
            CellStatus::MismatchedLength => "mismatched-length",
            CellStatus::Ok => "ok",
        })
    }
}

/// One allocation table slot plus the document decoded from it, if any.
#[derive(Clone, Debug, Default)]
pub struct RegionCell {
    pub offset: u32,
    pub sector_count: u8,
    pub timestamp: u32,
    pub(crate) length_mismatch: bool,
    pub(crate) document: Option<NamedTag>,
}

impl RegionCell {
    pub fn status(&self, file_len: u64) -> CellStatus {
        if self.offset == 0 && self.sector_count == 0 {
            CellStatus::NotCreated
        } else if self.sector_count == 0 {
            CellStatus::ZeroLength
        } else if self.offset < HEADER_SECTORS {
            CellStatus::InHeader
        } else if self.sector_range().end() as u64 * SECTOR_SIZE > file_len {
            CellStatus::OutOfFile
        } else if self.length_mismatch {
            CellStatus::MismatchedLength
        } else {
            CellStatus::Ok
        }
    }

    /// Whether the entry names sectors that really exist after the header,
    /// whether or not their contents turned out to be readable.
    pub fn holds_sectors(&self, file_len: u64) -> bool {
        matches!(
            self.status(file_len),
            CellStatus::Ok | CellStatus::MismatchedLength
        )
    }

    pub fn sector_range(&self) -> SectorRange {
        SectorRange::new(self.offset, self.sector_count as u32)
    }

    pub fn document(&self) -> Option<&NamedTag> {
        self.document.as_ref()
    }

    pub(crate) fn set_location(&mut self, offset: u32, sector_count: u8, timestamp: u32) {
        self.offset = offset;
        self.sector_count = sector_count;
        self.timestamp = timestamp;
        self.length_mismatch = false;
        self.document = None;
    }
}

pub fn cell_index(x: u8, z: u8) -> Result<usize> {
    if x >= CELLS_PER_AXIS || z >= CELLS_PER_AXIS {
        return Err(Error::InvalidCoordinate { x, z });
    }
    Ok(x as usize * CELLS_PER_AXIS as usize + z as usize)
}

pub fn index_to_coords(index: usize) -> (u8, u8) {
    let axis = CELLS_PER_AXIS as usize;
    ((index / axis) as u8, (index % axis) as u8)
}

pub fn location_entry_pos(index: usize) -> u64 {
    index as u64 * 4
}

pub fn timestamp_entry_pos(index: usize) -> u64 {
    SECTOR_SIZE + index as u64 * 4
}

pub fn parse_header(bytes: &[u8]) -> Result<Vec<RegionCell>> {
    if (bytes.len() as u64) < HEADER_BYTES {
        return Err(Error::format(format!(
            "missing header: {} bytes, expected {HEADER_BYTES}",
            bytes.len()
        )));
    }
    let mut reader = BigEndianReader::new(bytes);
    let mut cells = Vec::with_capacity(CELL_COUNT);
    for _ in 0..CELL_COUNT {
        let offset = reader.read_u24()?;
        let sector_count = reader.read_u8()?;
        cells.push(RegionCell {
            offset,
            sector_count,
            ..RegionCell::default()
        });
    }
    for cell in cells.iter_mut() {
        cell.timestamp = reader.read_u32()?;
    }
    Ok(cells)
}

pub fn encode_location(offset: u32, sector_count: u8) -> Result<Vec<u8>> {
    let mut writer = BigEndianWriter::new(Vec::with_capacity(4));
    writer
        .write_u24(offset)
        .map_err(|_| Error::allocation(format!("sector offset {offset} exceeds 24 bits")))?;
    writer.write_u8(sector_count)?;
    Ok(writer.into_inner())
}
