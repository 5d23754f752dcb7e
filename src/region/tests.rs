use super::*;
use crate::compression::CompressionKind;
use crate::error::Error;
use crate::nbt::{Compound, NamedTag, TagValue};
use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEST_UNIQUIFIER: AtomicU64 = AtomicU64::new(0);

fn test_region_path(name: &str) -> PathBuf {
    let serial = TEST_UNIQUIFIER.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!("cwv-region-{name}-{}-{}", std::process::id(), serial));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).expect("create test dir");
    path.push("r.0.0.mca");
    path
}

fn int_document(value: i32) -> NamedTag {
    let mut root = Compound::new();
    root.insert("x", value);
    NamedTag::new("", root)
}

/// A document whose uncompressed payload needs `sectors` sectors.
fn sized_document(sectors: u64) -> NamedTag {
    let len = (sectors - 1) * SECTOR_SIZE + 64;
    let mut root = Compound::new();
    root.insert("blob", TagValue::ByteArray(vec![7; len as usize]));
    NamedTag::new("", root)
}

fn patch_file(path: &Path, position: u64, bytes: &[u8]) {
    let mut file = OpenOptions::new().write(true).open(path).unwrap();
    file.seek(SeekFrom::Start(position)).unwrap();
    file.write_all(bytes).unwrap();
}

#[test]
fn replace_then_read_after_reopen() {
    let path = test_region_path("end-to-end");
    let document = int_document(42);

    let mut region = RegionContainer::open(&path).unwrap();
    assert_eq!(region.coordinates().count(), 0);
    region.replace(3, 5, &document, CompressionKind::Gzip).unwrap();
    assert_eq!(region.read(3, 5).unwrap(), Some(&document));

    let mut reopened = RegionContainer::open(&path).unwrap();
    assert_eq!(reopened.coordinates().collect::<Vec<_>>(), vec![(3, 5)]);
    assert_eq!(reopened.status(3, 5).unwrap(), CellStatus::Ok);
    assert_eq!(reopened.status(5, 3).unwrap(), CellStatus::NotCreated);
    assert_eq!(reopened.read(5, 3).unwrap(), None);

    let cell = reopened.cell(3, 5).unwrap();
    assert_eq!(cell.offset, HEADER_SECTORS);
    assert_eq!(cell.sector_count, 1);
    assert!(cell.timestamp > 0);

    let read = reopened.read(3, 5).unwrap().cloned().unwrap();
    assert_eq!(read.value.as_compound().unwrap().get("x"), Some(&TagValue::Int(42)));
    assert_eq!(reopened.file_len(), 3 * SECTOR_SIZE);
}

#[test]
fn header_layout_on_disk() {
    let path = test_region_path("layout");
    let mut region = RegionContainer::open(&path).unwrap();
    region.replace(3, 5, &int_document(1), CompressionKind::Zlib).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len() as u64 % SECTOR_SIZE, 0);
    let entry = (3 * 32 + 5) * 4;
    assert_eq!(&bytes[entry..entry + 4], &[0, 0, 2, 1]);
    assert_eq!(bytes[8192 + 4], CompressionKind::Zlib.id());
    let length = u32::from_be_bytes([bytes[8192], bytes[8193], bytes[8194], bytes[8195]]);
    assert!(length > 1);
    assert!(bytes[8192 + 4 + length as usize..].iter().all(|b| *b == 0));
}

#[test]
fn replacing_with_the_same_document_is_stable() {
    let path = test_region_path("idempotent");
    let document = int_document(7);
    let mut region = RegionContainer::open(&path).unwrap();
    region.replace(0, 0, &document, CompressionKind::Gzip).unwrap();
    let first_len = region.file_len();
    region.replace(0, 0, &document, CompressionKind::Gzip).unwrap();

    assert_eq!(region.file_len(), first_len);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), first_len);
    let mut reopened = RegionContainer::open(&path).unwrap();
    assert_eq!(reopened.read(0, 0).unwrap(), Some(&document));
}

#[test]
fn same_size_rewrite_lands_on_the_cells_own_sectors() {
    let path = test_region_path("in-place");
    let mut region = RegionContainer::open(&path).unwrap();
    region.replace(0, 0, &sized_document(1), CompressionKind::None).unwrap();
    region.replace(0, 1, &sized_document(1), CompressionKind::None).unwrap();
    let before = region.cell(0, 0).unwrap().sector_range();

    region.replace(0, 0, &int_document(5), CompressionKind::None).unwrap();
    assert_eq!(region.cell(0, 0).unwrap().sector_range(), before);
}

#[test]
fn moved_rewrite_leaves_the_old_payload_intact_until_the_entry_changes() {
    let path = test_region_path("moved");
    let mut region = RegionContainer::open(&path).unwrap();
    region.replace(0, 0, &sized_document(1), CompressionKind::None).unwrap();
    region.replace(0, 1, &sized_document(1), CompressionKind::None).unwrap();
    let old_range = region.cell(0, 0).unwrap().sector_range();
    let old_bytes = std::fs::read(&path).unwrap();
    let old_sector = old_range.byte_offset() as usize..(old_range.end() as u64 * SECTOR_SIZE) as usize;

    region.replace(0, 0, &sized_document(2), CompressionKind::None).unwrap();
    assert!(!region.cell(0, 0).unwrap().sector_range().overlaps(old_range));
    let new_bytes = std::fs::read(&path).unwrap();
    assert_eq!(&new_bytes[old_sector.clone()], &old_bytes[old_sector]);
}

#[test]
fn repeated_replace_does_not_grow_the_file() {
    let path = test_region_path("release");
    let mut region = RegionContainer::open(&path).unwrap();
    for value in 0..20 {
        region.replace(4, 4, &int_document(value), CompressionKind::Gzip).unwrap();
    }
    assert_eq!(region.file_len(), 3 * SECTOR_SIZE);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * SECTOR_SIZE);
    assert_eq!(
        RegionContainer::open(&path).unwrap().read(4, 4).unwrap(),
        Some(&int_document(19))
    );
}

#[test]
fn freed_sectors_are_reused_by_later_writes() {
    let path = test_region_path("reuse");
    let mut region = RegionContainer::open(&path).unwrap();
    region.replace(0, 0, &sized_document(1), CompressionKind::None).unwrap();
    region.replace(0, 1, &sized_document(1), CompressionKind::None).unwrap();
    assert_eq!(region.cell(0, 1).unwrap().offset, 3);

    // Grows past its single sector, so it moves to the end and frees sector 2.
    region.replace(0, 0, &sized_document(2), CompressionKind::None).unwrap();
    assert_eq!(region.cell(0, 0).unwrap().offset, 4);
    assert_eq!(region.cell(0, 0).unwrap().sector_count, 2);

    region.replace(0, 2, &int_document(3), CompressionKind::None).unwrap();
    assert_eq!(region.cell(0, 2).unwrap().offset, 2);
    assert_eq!(region.file_len(), 6 * SECTOR_SIZE);

    let mut reopened = RegionContainer::open(&path).unwrap();
    let scan = reopened.read_all();
    assert!(scan.failures.is_empty());
    assert_eq!(scan.documents.len(), 3);
}

#[test]
fn every_compression_kind_reads_back() {
    let path = test_region_path("kinds");
    let mut region = RegionContainer::open(&path).unwrap();
    region.replace(1, 0, &int_document(1), CompressionKind::None).unwrap();
    region.replace(1, 1, &int_document(2), CompressionKind::Gzip).unwrap();
    region.replace(1, 2, &int_document(3), CompressionKind::Zlib).unwrap();

    let mut reopened = RegionContainer::open(&path).unwrap();
    let scan = reopened.read_all();
    let found: Vec<(u8, u8, i32)> = scan
        .documents
        .iter()
        .map(|cell| {
            let x = cell.document.value.as_compound().unwrap().get("x").unwrap();
            (cell.x, cell.z, x.as_int().unwrap())
        })
        .collect();
    assert_eq!(found, vec![(1, 0, 1), (1, 1, 2), (1, 2, 3)]);
}

#[test]
fn corrupt_cell_does_not_hide_its_neighbours() {
    let path = test_region_path("corrupt");
    let mut region = RegionContainer::open(&path).unwrap();
    region.replace(0, 0, &int_document(1), CompressionKind::Gzip).unwrap();
    region.replace(1, 1, &int_document(2), CompressionKind::Gzip).unwrap();
    let damaged = region.cell(0, 0).unwrap().sector_range().byte_offset();

    patch_file(&path, damaged + PAYLOAD_HEADER_LEN, &[0x55; 24]);

    let mut reopened = RegionContainer::open(&path).unwrap();
    assert!(reopened.read(0, 0).is_err());
    let scan = reopened.read_all();
    assert_eq!(scan.documents.len(), 1);
    assert_eq!((scan.documents[0].x, scan.documents[0].z), (1, 1));
    assert_eq!(scan.failures.len(), 1);
    assert_eq!((scan.failures[0].x, scan.failures[0].z), (0, 0));
}

#[test]
fn oversized_payload_length_marks_the_cell() {
    let path = test_region_path("mismatch");
    let mut region = RegionContainer::open(&path).unwrap();
    region.replace(0, 0, &int_document(1), CompressionKind::Gzip).unwrap();
    region.replace(0, 1, &int_document(2), CompressionKind::Gzip).unwrap();
    let damaged = region.cell(0, 0).unwrap().sector_range().byte_offset();
    patch_file(&path, damaged, &0x00FF_FFFFu32.to_be_bytes());

    let mut reopened = RegionContainer::open(&path).unwrap();
    assert_eq!(reopened.read(0, 0).unwrap(), None);
    assert_eq!(reopened.status(0, 0).unwrap(), CellStatus::MismatchedLength);
    assert_eq!(reopened.coordinates().collect::<Vec<_>>(), vec![(0, 1)]);

    // The marked cell keeps its sectors until it is rewritten.
    reopened.replace(0, 2, &int_document(3), CompressionKind::Gzip).unwrap();
    assert_eq!(reopened.cell(0, 2).unwrap().offset, 4);
    reopened.replace(0, 0, &int_document(4), CompressionKind::Gzip).unwrap();
    assert_eq!(reopened.cell(0, 0).unwrap().offset, 2);
    assert_eq!(reopened.status(0, 0).unwrap(), CellStatus::Ok);
}

#[test]
fn scan_reports_mismatched_cells_as_failures() {
    let path = test_region_path("scan-mismatch");
    let mut region = RegionContainer::open(&path).unwrap();
    region.replace(2, 2, &int_document(1), CompressionKind::Gzip).unwrap();
    let damaged = region.cell(2, 2).unwrap().sector_range().byte_offset();
    patch_file(&path, damaged, &0u32.to_be_bytes());

    let scan = RegionContainer::open(&path).unwrap().read_all();
    assert!(scan.documents.is_empty());
    assert_eq!(scan.failures.len(), 1);
    assert!(matches!(scan.failures[0].error, Error::Format(_)));
}

#[test]
fn short_file_is_missing_its_header() {
    let path = test_region_path("short");
    std::fs::write(&path, [0u8; 100]).unwrap();
    assert!(matches!(RegionContainer::open(&path), Err(Error::Format(_))));
}

#[test]
fn empty_file_opens_as_empty_container() {
    let path = test_region_path("empty");
    std::fs::write(&path, b"").unwrap();
    let mut region = RegionContainer::open(&path).unwrap();
    assert_eq!(region.coordinates().count(), 0);
    region.replace(31, 31, &int_document(9), CompressionKind::Gzip).unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * SECTOR_SIZE);
}

#[test]
fn unusable_entries_are_classified() {
    let path = test_region_path("statuses");
    let mut bytes = vec![0u8; (HEADER_BYTES + SECTOR_SIZE) as usize];
    let mut put = |x: u8, z: u8, entry: [u8; 4]| {
        let index = header::cell_index(x, z).unwrap();
        bytes[index * 4..index * 4 + 4].copy_from_slice(&entry);
    };
    put(0, 1, [0, 0, 1, 1]);
    put(0, 2, [0, 0, 5, 1]);
    put(0, 3, [0, 0, 2, 0]);
    put(0, 4, [0, 0, 0, 3]);
    std::fs::write(&path, &bytes).unwrap();

    let mut region = RegionContainer::open(&path).unwrap();
    assert_eq!(region.status(0, 1).unwrap(), CellStatus::InHeader);
    assert_eq!(region.status(0, 2).unwrap(), CellStatus::OutOfFile);
    assert_eq!(region.status(0, 3).unwrap(), CellStatus::ZeroLength);
    assert_eq!(region.status(0, 4).unwrap(), CellStatus::InHeader);
    assert_eq!(region.status(0, 0).unwrap(), CellStatus::NotCreated);
    assert_eq!(region.coordinates().count(), 0);
    for z in 0..5 {
        assert_eq!(region.read(0, z).unwrap(), None);
    }

    let scan = region.read_all();
    assert!(scan.documents.is_empty());
    assert!(scan.failures.is_empty());
}

#[test]
fn out_of_range_coordinates_are_rejected() {
    let path = test_region_path("coords");
    let mut region = RegionContainer::open(&path).unwrap();
    assert!(matches!(
        region.read(32, 0),
        Err(Error::InvalidCoordinate { x: 32, z: 0 })
    ));
    assert!(matches!(
        region.replace(0, 40, &int_document(1), CompressionKind::Gzip),
        Err(Error::InvalidCoordinate { x: 0, z: 40 })
    ));
    assert!(!path.exists());
}

#[test]
fn documents_without_a_compound_root_are_refused() {
    let path = test_region_path("root");
    let mut region = RegionContainer::open(&path).unwrap();
    let bare = NamedTag::new("x", 5);
    assert!(matches!(
        region.replace(0, 0, &bare, CompressionKind::Gzip),
        Err(Error::Format(_))
    ));
}
