//! First-fit placement of cell payloads over a region file's sectors.

use crate::error::{Error, Result};
use crate::region::{HEADER_SECTORS, MAX_SECTOR_OFFSET, SECTOR_SIZE};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SectorRange {
    pub offset: u32,
    pub count: u32,
}

impl SectorRange {
    pub fn new(offset: u32, count: u32) -> Self {
        Self { offset, count }
    }

    /// One past the last sector of the range.
    pub fn end(self) -> u32 {
        self.offset.saturating_add(self.count)
    }

    pub fn overlaps(self, other: SectorRange) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }

    pub fn byte_offset(self) -> u64 {
        self.offset as u64 * SECTOR_SIZE
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// A run of free sectors inside the current file.
    Gap { offset: u32 },
    /// No gap was large enough; the payload goes at the end of the file.
    Append { offset: u32 },
}

impl Placement {
    pub fn offset(self) -> u32 {
        match self {
            Placement::Gap { offset } | Placement::Append { offset } => offset,
        }
    }

    pub fn is_append(self) -> bool {
        matches!(self, Placement::Append { .. })
    }
}

/// Sectors needed for `payload_len` bytes, rounding any partial sector up.
pub fn required_sectors(payload_len: u64) -> u64 {
    payload_len.div_ceil(SECTOR_SIZE)
}

/// Occupancy map over the sectors of one region file. Sectors past the end
/// of the file are not tracked and count as free; the header sectors are
/// always occupied.
#[derive(Clone, Debug)]
pub struct SectorAllocator {
    used: Vec<bool>,
}

impl SectorAllocator {
    pub fn new(file_sectors: u32) -> Self {
        let len = file_sectors.max(HEADER_SECTORS) as usize;
        let mut used = vec![false; len];
        for sector in used.iter_mut().take(HEADER_SECTORS as usize) {
            *sector = true;
        }
        Self { used }
    }

    /// Sector count of a file of `file_len` bytes, counting a trailing
    /// partial sector as whole so appends stay sector aligned.
    pub fn for_file_len(file_len: u64) -> Self {
        let sectors = required_sectors(file_len).min(u32::MAX as u64) as u32;
        Self::new(sectors)
    }

    pub fn with_occupied<I>(file_sectors: u32, ranges: I) -> Self
    where
        I: IntoIterator<Item = SectorRange>,
    {
        let mut allocator = Self::new(file_sectors);
        for range in ranges {
            allocator.occupy(range);
        }
        allocator
    }

    pub fn file_sectors(&self) -> u32 {
        self.used.len() as u32
    }

    pub fn is_free(&self, sector: u32) -> bool {
        !self.used.get(sector as usize).copied().unwrap_or(false)
    }

    pub fn occupy(&mut self, range: SectorRange) {
        self.mark(range, true);
    }

    /// Returns a range to the free pool. Header sectors stay occupied.
    pub fn release(&mut self, range: SectorRange) {
        let start = range.offset.max(HEADER_SECTORS);
        if start < range.end() {
            self.mark(SectorRange::new(start, range.end() - start), false);
        }
    }

    fn mark(&mut self, range: SectorRange, used: bool) {
        let start = (range.offset as usize).min(self.used.len());
        let end = (range.end() as usize).min(self.used.len());
        for sector in &mut self.used[start..end] {
            *sector = used;
        }
    }

    /// First run of `count` free sectors inside the file, or the end of the
    /// file when no run is long enough.
    pub fn place(&self, count: u32) -> Result<Placement> {
        if count == 0 {
            return Err(Error::allocation("cannot place an empty payload"));
        }

        let mut run_start = 0u32;
        let mut run_len = 0u32;
        for (sector, used) in self.used.iter().enumerate() {
            if *used {
                run_len = 0;
                continue;
            }
            if run_len == 0 {
                run_start = sector as u32;
            }
            run_len += 1;
            if run_len == count {
                return Ok(Placement::Gap { offset: run_start });
            }
        }

        let offset = self.file_sectors();
        if offset > MAX_SECTOR_OFFSET {
            return Err(Error::allocation(format!(
                "region file already spans {offset} sectors, beyond the 24-bit offset limit"
            )));
        }
        Ok(Placement::Append { offset })
    }
}
