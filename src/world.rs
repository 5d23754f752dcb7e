//! Worlds are directories of region containers.

use crate::compression::CompressionKind;
use crate::error::{Error, Result};
use crate::nbt::NamedTag;
use crate::region::{CellFailure, RegionContainer};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const REGION_FILE_EXTENSION: &str = "mca";

/// Region container files directly inside `dir`, sorted by file name.
pub fn discover_region_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_region = path
            .extension()
            .map(|ext| ext == REGION_FILE_EXTENSION)
            .unwrap_or(false);
        if is_region && entry.file_type()?.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Seedable xorshift generator so a shuffle can be replayed.
#[derive(Clone, Debug)]
pub struct ShuffleRng {
    state: u64,
}

impl ShuffleRng {
    pub fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift.
        let state = seed ^ 0x9E37_79B9_7F4A_7C15;
        Self {
            state: if state == 0 { 0x2545_F491_4F6C_DD1D } else { state },
        }
    }

    pub fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|dur| dur.as_nanos() as u64)
            .unwrap_or(0);
        Self::new(nanos)
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform-ish index in `0..n`. `n` must be non-zero.
    pub fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }
}

#[derive(Debug)]
pub struct ShuffleFailure {
    pub path: PathBuf,
    pub failure: CellFailure,
}

#[derive(Debug, Default)]
pub struct ShuffleReport {
    pub containers: usize,
    pub cells_moved: usize,
    /// Cells that could not be read; they are left untouched.
    pub failures: Vec<ShuffleFailure>,
}

struct Slot {
    container: usize,
    x: u8,
    z: u8,
}

/// Reads every readable cell of `paths` and writes the documents back over
/// the same set of cells in a random order. Unreadable cells are reported
/// and left as they were; a failing write aborts the shuffle.
pub fn shuffle_world(
    paths: &[PathBuf],
    rng: &mut ShuffleRng,
    compression: CompressionKind,
) -> Result<ShuffleReport> {
    let mut report = ShuffleReport::default();
    let mut containers = Vec::with_capacity(paths.len());
    let mut slots = Vec::new();
    let mut documents: Vec<NamedTag> = Vec::new();

    for path in paths {
        let mut container = RegionContainer::open(path)?;
        let scan = container.read_all();
        for failure in scan.failures {
            report.failures.push(ShuffleFailure {
                path: path.clone(),
                failure,
            });
        }
        for cell in scan.documents {
            slots.push(Slot {
                container: containers.len(),
                x: cell.x,
                z: cell.z,
            });
            documents.push(cell.document);
        }
        containers.push(container);
    }
    report.containers = containers.len();
    info!(
        "shuffling {} documents across {} region files",
        documents.len(),
        containers.len()
    );
    if !report.failures.is_empty() {
        warn!("{} unreadable cells will be left in place", report.failures.len());
    }

    rng.shuffle(&mut documents);
    for (slot, document) in slots.iter().zip(documents.iter()) {
        let container = containers
            .get_mut(slot.container)
            .ok_or_else(|| Error::format("shuffle slot names an unknown container"))?;
        container.replace(slot.x, slot.z, document, compression)?;
        report.cells_moved += 1;
    }
    info!(
        "moved {} cells across {} region files",
        report.cells_moved, report.containers
    );
    Ok(report)
}
