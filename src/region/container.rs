use crate::big_endian::BigEndianWriter;
use crate::compression::{self, CompressionKind};
use crate::error::{Error, Result};
use crate::nbt::{self, NamedTag};
use crate::region::allocator::{required_sectors, SectorAllocator, SectorRange};
use crate::region::header::{
    self, cell_index, index_to_coords, location_entry_pos, timestamp_entry_pos, CellStatus,
    RegionCell,
};
use crate::region::{CELL_COUNT, HEADER_BYTES, MAX_SECTOR_COUNT, PAYLOAD_HEADER_LEN, SECTOR_SIZE};
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A document read from one cell during a whole-container scan.
#[derive(Clone, Debug)]
pub struct CellDocument {
    pub x: u8,
    pub z: u8,
    pub document: NamedTag,
}

/// A cell that could not be read during a whole-container scan.
#[derive(Debug)]
pub struct CellFailure {
    pub x: u8,
    pub z: u8,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct RegionScan {
    pub documents: Vec<CellDocument>,
    pub failures: Vec<CellFailure>,
}

/// One region file and its allocation table. Every mutation goes straight
/// to disk; the in-memory table mirrors what was last read or written.
#[derive(Debug)]
pub struct RegionContainer {
    path: PathBuf,
    file_len: u64,
    cells: Vec<RegionCell>,
}

pub fn now_unix_secs() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs().min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}

impl RegionContainer {
    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            file_len: 0,
            cells: vec![RegionCell::default(); CELL_COUNT],
        }
    }

    /// Loads the allocation table of `path`. A missing or empty file opens as
    /// a container with every cell not yet created; the file is created on
    /// the first [`replace`](Self::replace).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::empty(path)),
            Err(err) => return Err(err.into()),
        };

        let file_len = file.metadata()?.len();
        if file_len == 0 {
            return Ok(Self::empty(path));
        }
        if file_len < HEADER_BYTES {
            return Err(Error::format(format!(
                "missing header: {} is {file_len} bytes, shorter than the {HEADER_BYTES} byte allocation table",
                path.display()
            )));
        }

        let mut header_bytes = vec![0u8; HEADER_BYTES as usize];
        file.read_exact(&mut header_bytes)?;
        let cells = header::parse_header(&header_bytes)?;

        let container = Self {
            path,
            file_len,
            cells,
        };
        debug!(
            "opened region {} ({} bytes, {} readable cells)",
            container.path.display(),
            file_len,
            container.coordinates().count()
        );
        Ok(container)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    pub fn cell(&self, x: u8, z: u8) -> Result<&RegionCell> {
        Ok(&self.cells[cell_index(x, z)?])
    }

    pub fn status(&self, x: u8, z: u8) -> Result<CellStatus> {
        Ok(self.cell(x, z)?.status(self.file_len))
    }

    /// Every slot in row-major order, created or not.
    pub fn cells(&self) -> impl Iterator<Item = (u8, u8, &RegionCell)> + '_ {
        self.cells.iter().enumerate().map(|(index, cell)| {
            let (x, z) = index_to_coords(index);
            (x, z, cell)
        })
    }

    /// Coordinates of the cells currently readable, x outer and z inner.
    /// Each call starts a fresh pass over the table.
    pub fn coordinates(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        let file_len = self.file_len;
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, cell)| cell.status(file_len) == CellStatus::Ok)
            .map(|(index, _)| index_to_coords(index))
    }

    /// Reads and caches the document stored at `(x, z)`.
    ///
    /// Returns `None` for cells that are not created or whose table entry is
    /// unusable. A payload length that does not fit the cell's sectors marks
    /// the cell [`CellStatus::MismatchedLength`] and also yields `None`.
    /// Decompression and decode failures are returned as errors.
    pub fn read(&mut self, x: u8, z: u8) -> Result<Option<&NamedTag>> {
        let index = cell_index(x, z)?;
        if self.cells[index].status(self.file_len) != CellStatus::Ok {
            return Ok(None);
        }
        if self.cells[index].document.is_none() {
            let Some(document) = self.load_cell(index)? else {
                return Ok(None);
            };
            self.cells[index].document = Some(document);
        }
        Ok(self.cells[index].document.as_ref())
    }

    fn load_cell(&mut self, index: usize) -> Result<Option<NamedTag>> {
        let (x, z) = index_to_coords(index);
        let range = self.cells[index].sector_range();
        let span = range.count as u64 * SECTOR_SIZE;

        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(range.byte_offset()))?;
        let mut sectors = vec![0u8; span as usize];
        file.read_exact(&mut sectors)?;

        let &[l0, l1, l2, l3, compression_id, ..] = sectors.as_slice() else {
            return Err(Error::format("cell sectors shorter than the payload header"));
        };
        let length = u32::from_be_bytes([l0, l1, l2, l3]) as u64;
        if length == 0 || length + 4 > span {
            warn!(
                "cell ({x}, {z}) of {} declares {length} payload bytes but spans {} sectors",
                self.path.display(),
                range.count
            );
            self.cells[index].length_mismatch = true;
            return Ok(None);
        }

        let compression = CompressionKind::from_id(compression_id)?;
        let end = (length + 4) as usize;
        let data = sectors
            .get(PAYLOAD_HEADER_LEN as usize..end)
            .ok_or_else(|| Error::format("cell payload shorter than its header"))?;
        let decoded = compression::decompress(data, compression)?;
        let document = nbt::decode_document(&decoded)?;
        Ok(Some(document))
    }

    /// Reads every readable cell. Failures are logged and collected per cell
    /// instead of ending the scan.
    pub fn read_all(&mut self) -> RegionScan {
        let mut scan = RegionScan::default();
        let path = self.path.clone();
        let coordinates: Vec<(u8, u8)> = self.coordinates().collect();
        for (x, z) in coordinates {
            match self.read(x, z) {
                Ok(Some(document)) => scan.documents.push(CellDocument {
                    x,
                    z,
                    document: document.clone(),
                }),
                Ok(None) => {
                    if self.status(x, z).ok() == Some(CellStatus::MismatchedLength) {
                        scan.failures.push(CellFailure {
                            x,
                            z,
                            error: Error::format("payload length does not match the cell's sectors"),
                        });
                    }
                }
                Err(error) => {
                    warn!("skipping cell ({x}, {z}) of {}: {error}", path.display());
                    scan.failures.push(CellFailure { x, z, error });
                }
            }
        }
        scan
    }

    /// Writes `document` into cell `(x, z)`, replacing whatever it held.
    ///
    /// The payload is written and synced before the allocation entry that
    /// points at it. The cell's old sectors are released first, so the new
    /// payload may land on them; a same-size rewrite always does. An
    /// interrupted write that moved the payload leaves the previous cell
    /// readable. An interrupted write in place leaves the old entry
    /// pointing at a partly overwritten payload, which then fails to decode.
    pub fn replace(
        &mut self,
        x: u8,
        z: u8,
        document: &NamedTag,
        compression: CompressionKind,
    ) -> Result<()> {
        let index = cell_index(x, z)?;
        let compressed = compression::compress(&nbt::encode_document(document)?, compression)?;
        let payload = build_payload(&compressed, compression)?;
        let sector_count = (payload.len() as u64 / SECTOR_SIZE) as u32;
        if sector_count > MAX_SECTOR_COUNT {
            return Err(Error::allocation(format!(
                "cell ({x}, {z}) needs {sector_count} sectors, more than the {MAX_SECTOR_COUNT} a location entry can describe"
            )));
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;
        let mut file_len = file.metadata()?.len();
        if file_len == 0 {
            file.write_all(&vec![0u8; HEADER_BYTES as usize])?;
            file_len = HEADER_BYTES;
        } else if file_len < HEADER_BYTES {
            return Err(Error::format(format!(
                "missing header: {} is {file_len} bytes",
                self.path.display()
            )));
        }
        self.file_len = file_len;

        let allocator = self.allocator_for_replace(index);
        let placement = allocator.place(sector_count)?;
        let range = SectorRange::new(placement.offset(), sector_count);
        debug!(
            "cell ({x}, {z}) of {}: {} bytes -> {:?} ({sector_count} sectors)",
            self.path.display(),
            compressed.len(),
            placement
        );

        let location = header::encode_location(range.offset, sector_count as u8)?;
        file.seek(SeekFrom::Start(range.byte_offset()))?;
        file.write_all(&payload)?;
        file.flush()?;
        file.sync_data()?;

        let timestamp = now_unix_secs();
        file.seek(SeekFrom::Start(location_entry_pos(index)))?;
        file.write_all(&location)?;
        file.seek(SeekFrom::Start(timestamp_entry_pos(index)))?;
        file.write_all(&timestamp.to_be_bytes())?;
        file.flush()?;
        file.sync_data()?;

        self.file_len = file_len.max(range.end() as u64 * SECTOR_SIZE);
        let cell = &mut self.cells[index];
        cell.set_location(range.offset, sector_count as u8, timestamp);
        cell.document = Some(document.clone());
        Ok(())
    }

    /// Occupancy of every cell's sectors, minus the sectors of `target`.
    fn allocator_for_replace(&self, target: usize) -> SectorAllocator {
        let file_len = self.file_len;
        let occupied: Vec<(usize, SectorRange)> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.holds_sectors(file_len))
            .map(|(index, cell)| (index, cell.sector_range()))
            .collect();

        let mut allocator = SectorAllocator::for_file_len(file_len);
        for (_, range) in &occupied {
            allocator.occupy(*range);
        }

        if let Some((_, released)) = occupied.iter().find(|(index, _)| *index == target) {
            allocator.release(*released);
            // A damaged table can point two cells at the same sectors.
            for (index, range) in &occupied {
                if *index != target && range.overlaps(*released) {
                    allocator.occupy(*range);
                }
            }
        }
        allocator
    }
}

/// Frames compressed bytes as a cell payload, zero-padded to whole sectors.
fn build_payload(compressed: &[u8], compression: CompressionKind) -> Result<Vec<u8>> {
    let length = u32::try_from(compressed.len() as u64 + 1).map_err(|_| {
        Error::allocation(format!(
            "compressed payload of {} bytes is too large",
            compressed.len()
        ))
    })?;
    let framed_len = PAYLOAD_HEADER_LEN + compressed.len() as u64;
    let padded_len = required_sectors(framed_len) * SECTOR_SIZE;

    let mut writer = BigEndianWriter::new(Vec::with_capacity(padded_len as usize));
    writer.write_u32(length)?;
    writer.write_u8(compression.id())?;
    writer.write_bytes(compressed)?;
    let mut payload = writer.into_inner();
    payload.resize(padded_len as usize, 0);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_framed_and_padded() {
        let payload = build_payload(&[0xAB; 10], CompressionKind::Zlib).unwrap();
        assert_eq!(payload.len() as u64, SECTOR_SIZE);
        assert_eq!(&payload[..5], &[0, 0, 0, 11, 2]);
        assert_eq!(&payload[5..15], &[0xAB; 10]);
        assert!(payload[15..].iter().all(|b| *b == 0));
    }

    #[test]
    fn payload_filling_a_sector_exactly_takes_one_sector() {
        let data = vec![1u8; SECTOR_SIZE as usize - 5];
        let payload = build_payload(&data, CompressionKind::None).unwrap();
        assert_eq!(payload.len() as u64, SECTOR_SIZE);

        let data = vec![1u8; SECTOR_SIZE as usize - 4];
        let payload = build_payload(&data, CompressionKind::None).unwrap();
        assert_eq!(payload.len() as u64, 2 * SECTOR_SIZE);
    }
}
