//! gzip / zlib envelopes around encoded tag trees.

use crate::error::{Error, Result};
use crate::nbt::TagKind;
use flate2::read::GzDecoder;
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::fmt;
use std::io::{Read, Write};

const GZIP_ID1: u8 = 0x1F;
const GZIP_ID2: u8 = 0x8B;
const ZLIB_CMF: u8 = 0x78;

/// Stream filter around a cell payload or standalone document. The numeric
/// value is the compression byte stored in front of each region payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompressionKind {
    None = 0,
    #[default]
    Gzip = 1,
    Zlib = 2,
}

impl CompressionKind {
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::None),
            1 => Ok(Self::Gzip),
            2 => Ok(Self::Zlib),
            other => Err(Error::UnknownCompression(vec![other])),
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Zlib => "zlib",
        })
    }
}

/// Sniffs the envelope from the leading bytes of a stream.
pub fn detect(bytes: &[u8]) -> Result<CompressionKind> {
    match bytes {
        [GZIP_ID1, GZIP_ID2, ..] => Ok(CompressionKind::Gzip),
        [ZLIB_CMF, 0x9C | 0xDA, ..] => Ok(CompressionKind::Zlib),
        [first, ..] if TagKind::from_id(*first).is_ok() => Ok(CompressionKind::None),
        _ => Err(Error::UnknownCompression(bytes.iter().take(2).copied().collect())),
    }
}

pub fn compress(bytes: &[u8], kind: CompressionKind) -> Result<Vec<u8>> {
    let compressed = match kind {
        CompressionKind::None => bytes.to_vec(),
        CompressionKind::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()?
        }
        CompressionKind::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(bytes)?;
            encoder.finish()?
        }
    };
    Ok(compressed)
}

pub fn decompress(bytes: &[u8], kind: CompressionKind) -> Result<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(bytes.to_vec()),
        CompressionKind::Gzip => {
            let mut out = Vec::new();
            // Input is fully in memory, so any failure here is a damaged stream.
            GzDecoder::new(bytes)
                .read_to_end(&mut out)
                .map_err(|err| Error::format(format!("corrupt gzip stream: {err}")))?;
            Ok(out)
        }
        CompressionKind::Zlib => inflate_zlib(bytes),
    }
}

/// Inflates a complete zlib stream. Unlike the `Read` adapter this treats
/// input that runs out before the end-of-stream marker as an error.
fn inflate_zlib(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut inflater = Decompress::new(true);
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(4).max(4096));
    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }
        let consumed = (inflater.total_in() as usize).min(bytes.len());
        let status = inflater
            .decompress_vec(&bytes[consumed..], &mut out, FlushDecompress::None)
            .map_err(|err| Error::format(format!("corrupt zlib stream: {err}")))?;
        if status == Status::StreamEnd {
            return Ok(out);
        }
        let input_exhausted = inflater.total_in() as usize >= bytes.len();
        if input_exhausted && out.len() < out.capacity() {
            return Err(Error::format("truncated zlib stream"));
        }
    }
}

pub fn decompress_detected(bytes: &[u8]) -> Result<Vec<u8>> {
    decompress(bytes, detect(bytes)?)
}
