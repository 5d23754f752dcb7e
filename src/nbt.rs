//! Tag-tree documents: a single named compound, optionally wrapped in a
//! gzip or zlib envelope when stored on its own.

pub mod codec;
pub mod pretty;
pub mod value;

pub use codec::{decode, encode};
pub use pretty::pretty_tree;
pub use value::{Compound, NamedTag, TagKind, TagList, TagValue};

use crate::compression::{self, CompressionKind};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn ensure_compound(tag: &NamedTag) -> Result<()> {
    if tag.kind() != TagKind::Compound {
        return Err(Error::format(format!(
            "document root is {}, expected {}",
            tag.kind(),
            TagKind::Compound
        )));
    }
    Ok(())
}

/// Decodes uncompressed document bytes. The root tag must be a compound.
pub fn decode_document(bytes: &[u8]) -> Result<NamedTag> {
    let tag = decode(bytes)?;
    ensure_compound(&tag)?;
    Ok(tag)
}

pub fn encode_document(document: &NamedTag) -> Result<Vec<u8>> {
    ensure_compound(document)?;
    encode(document)
}

/// Decodes document bytes in any supported envelope.
pub fn read_document(bytes: &[u8]) -> Result<NamedTag> {
    decode_document(&compression::decompress_detected(bytes)?)
}

pub fn read_document_file(path: &Path) -> Result<NamedTag> {
    let bytes = std::fs::read(path)?;
    read_document(&bytes)
}

pub fn write_document_file(
    path: &Path,
    document: &NamedTag,
    compression: CompressionKind,
) -> Result<()> {
    let encoded = compression::compress(&encode_document(document)?, compression)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&encoded)?;
    writer.flush()?;
    Ok(())
}
