//! Binary encoding of tag trees. Every multi-byte field is big-endian;
//! strings are a `u16` byte length followed by UTF-8, arrays and lists an
//! `i32` count followed by their members.

use crate::big_endian::{BigEndianReader, BigEndianWriter};
use crate::error::{Error, Result};
use crate::nbt::value::{Compound, NamedTag, TagKind, TagList, TagValue};
use std::io::{Read, Write};

/// Deepest compound/list nesting accepted on decode.
pub const MAX_DEPTH: usize = 512;

/// Decodes one framed tag from the start of `bytes`.
pub fn decode(bytes: &[u8]) -> Result<NamedTag> {
    let mut reader = BigEndianReader::new(bytes);
    read_named_tag(&mut reader)
}

pub fn decode_from<R: Read>(reader: R) -> Result<NamedTag> {
    let mut reader = BigEndianReader::new(reader);
    read_named_tag(&mut reader)
}

pub fn encode(tag: &NamedTag) -> Result<Vec<u8>> {
    let mut writer = BigEndianWriter::new(Vec::new());
    write_named_tag(&mut writer, tag)?;
    Ok(writer.into_inner())
}

pub fn encode_into<W: Write>(writer: W, tag: &NamedTag) -> Result<()> {
    let mut writer = BigEndianWriter::new(writer);
    write_named_tag(&mut writer, tag)
}

fn read_named_tag<R: Read>(reader: &mut BigEndianReader<R>) -> Result<NamedTag> {
    let (kind, name) = read_frame(reader)?;
    let value = read_payload(reader, kind, 0)?;
    Ok(NamedTag { name, value })
}

fn read_frame<R: Read>(reader: &mut BigEndianReader<R>) -> Result<(TagKind, String)> {
    let kind = TagKind::from_id(reader.read_u8()?)?;
    if kind == TagKind::End {
        return Ok((kind, String::new()));
    }
    Ok((kind, read_string(reader)?))
}

fn read_string<R: Read>(reader: &mut BigEndianReader<R>) -> Result<String> {
    let len = reader.read_u16()? as usize;
    let bytes = reader.read_bytes(len)?;
    String::from_utf8(bytes).map_err(|err| Error::format(format!("invalid UTF-8 in string: {err}")))
}

fn read_count<R: Read>(reader: &mut BigEndianReader<R>, what: &str) -> Result<usize> {
    let count = reader.read_i32()?;
    usize::try_from(count).map_err(|_| Error::format(format!("negative {what} length {count}")))
}

fn read_payload<R: Read>(
    reader: &mut BigEndianReader<R>,
    kind: TagKind,
    depth: usize,
) -> Result<TagValue> {
    if depth > MAX_DEPTH {
        return Err(Error::format(format!(
            "tag nesting deeper than {MAX_DEPTH} levels"
        )));
    }

    let value = match kind {
        TagKind::End => TagValue::End,
        TagKind::Byte => TagValue::Byte(reader.read_i8()?),
        TagKind::Short => TagValue::Short(reader.read_i16()?),
        TagKind::Int => TagValue::Int(reader.read_i32()?),
        TagKind::Long => TagValue::Long(reader.read_i64()?),
        TagKind::Float => TagValue::Float(reader.read_f32()?),
        TagKind::Double => TagValue::Double(reader.read_f64()?),
        TagKind::ByteArray => {
            let count = read_count(reader, "byte array")?;
            let bytes = reader.read_bytes(count)?;
            TagValue::ByteArray(bytes.into_iter().map(|b| b as i8).collect())
        }
        TagKind::String => TagValue::String(read_string(reader)?),
        TagKind::List => {
            let element_kind = TagKind::from_id(reader.read_u8()?)?;
            let count = read_count(reader, "list")?;
            let mut items = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                items.push(read_payload(reader, element_kind, depth + 1)?);
            }
            TagValue::List(TagList {
                element_kind,
                items,
            })
        }
        TagKind::Compound => {
            let mut entries = Vec::new();
            loop {
                let (child_kind, name) = read_frame(reader)?;
                if child_kind == TagKind::End {
                    break;
                }
                let value = read_payload(reader, child_kind, depth + 1)?;
                entries.push(NamedTag { name, value });
            }
            TagValue::Compound(Compound::from_entries(entries))
        }
        TagKind::IntArray => {
            let count = read_count(reader, "int array")?;
            let mut values = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                values.push(reader.read_i32()?);
            }
            TagValue::IntArray(values)
        }
        TagKind::LongArray => {
            let count = read_count(reader, "long array")?;
            let mut values = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                values.push(reader.read_i64()?);
            }
            TagValue::LongArray(values)
        }
    };
    Ok(value)
}

fn write_named_tag<W: Write>(writer: &mut BigEndianWriter<W>, tag: &NamedTag) -> Result<()> {
    check_end_name(tag)?;
    let kind = tag.kind();
    writer.write_u8(kind.id())?;
    if kind == TagKind::End {
        return Ok(());
    }
    write_string(writer, &tag.name)?;
    write_payload(writer, &tag.value, 0)
}

fn check_end_name(tag: &NamedTag) -> Result<()> {
    if tag.kind() == TagKind::End && !tag.name.is_empty() {
        return Err(Error::schema(format!(
            "end tag cannot carry the name {:?}",
            tag.name
        )));
    }
    Ok(())
}

fn write_string<W: Write>(writer: &mut BigEndianWriter<W>, value: &str) -> Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| {
        Error::schema(format!(
            "string of {} bytes exceeds the {} byte limit",
            value.len(),
            u16::MAX
        ))
    })?;
    writer.write_u16(len)?;
    writer.write_bytes(value.as_bytes())?;
    Ok(())
}

fn write_count<W: Write>(writer: &mut BigEndianWriter<W>, count: usize, what: &str) -> Result<()> {
    let count = i32::try_from(count)
        .map_err(|_| Error::schema(format!("{what} of {count} members is too long")))?;
    writer.write_i32(count)?;
    Ok(())
}

fn write_payload<W: Write>(
    writer: &mut BigEndianWriter<W>,
    value: &TagValue,
    depth: usize,
) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(Error::schema(format!(
            "tag nesting deeper than {MAX_DEPTH} levels"
        )));
    }

    match value {
        TagValue::End => {}
        TagValue::Byte(v) => writer.write_i8(*v)?,
        TagValue::Short(v) => writer.write_i16(*v)?,
        TagValue::Int(v) => writer.write_i32(*v)?,
        TagValue::Long(v) => writer.write_i64(*v)?,
        TagValue::Float(v) => writer.write_f32(*v)?,
        TagValue::Double(v) => writer.write_f64(*v)?,
        TagValue::ByteArray(values) => {
            write_count(writer, values.len(), "byte array")?;
            let bytes: Vec<u8> = values.iter().map(|b| *b as u8).collect();
            writer.write_bytes(&bytes)?;
        }
        TagValue::String(v) => write_string(writer, v)?,
        TagValue::List(list) => {
            list.check_homogeneous()?;
            writer.write_u8(list.element_kind.id())?;
            write_count(writer, list.len(), "list")?;
            for item in list.iter() {
                write_payload(writer, item, depth + 1)?;
            }
        }
        TagValue::Compound(compound) => {
            for child in compound {
                if child.kind() == TagKind::End {
                    return Err(Error::schema(format!(
                        "compound child {:?} is an end tag",
                        child.name
                    )));
                }
                writer.write_u8(child.kind().id())?;
                write_string(writer, &child.name)?;
                write_payload(writer, &child.value, depth + 1)?;
            }
            writer.write_u8(TagKind::End.id())?;
        }
        TagValue::IntArray(values) => {
            write_count(writer, values.len(), "int array")?;
            for v in values {
                writer.write_i32(*v)?;
            }
        }
        TagValue::LongArray(values) => {
            write_count(writer, values.len(), "long array")?;
            for v in values {
                writer.write_i64(*v)?;
            }
        }
    }
    Ok(())
}
