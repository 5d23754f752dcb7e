//! Big-endian primitive reader and writer used by the tag codec and the
//! region allocation table.

use std::io::{self, Read, Write};

pub struct BigEndianReader<R> {
    inner: R,
}

impl<R: Read> BigEndianReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn read_array<const N: usize>(&mut self) -> io::Result<[u8; N]> {
        let mut bytes = [0u8; N];
        self.inner.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    pub fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        // Grow with the data actually present so a bogus length cannot
        // force a huge up-front allocation.
        let mut bytes = Vec::with_capacity(len.min(64 * 1024));
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut bytes)?;
        if read != len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, found {read}"),
            ));
        }
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> io::Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> io::Result<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    /// Three-byte unsigned integer, as used by allocation table sector offsets.
    pub fn read_u24(&mut self) -> io::Result<u32> {
        let [a, b, c] = self.read_array::<3>()?;
        Ok(u32::from_be_bytes([0, a, b, c]))
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> io::Result<f32> {
        Ok(f32::from_be_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> io::Result<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }
}

pub struct BigEndianWriter<W> {
    inner: W,
}

impl<W: Write> BigEndianWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.inner.write_all(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> io::Result<()> {
        self.write_u8(value as u8)
    }

    pub fn write_u16(&mut self, value: u16) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }

    pub fn write_i16(&mut self, value: i16) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }

    pub fn write_u24(&mut self, value: u32) -> io::Result<()> {
        if value > 0x00FF_FFFF {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{value} does not fit in 24 bits"),
            ));
        }
        self.inner.write_all(&value.to_be_bytes()[1..])
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }

    pub fn write_f32(&mut self, value: f32) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }

    pub fn write_f64(&mut self, value: f64) -> io::Result<()> {
        self.inner.write_all(&value.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_most_significant_byte_first() {
        let mut writer = BigEndianWriter::new(Vec::new());
        writer.write_i16(0x0102).unwrap();
        writer.write_u24(0x0A0B0C).unwrap();
        writer.write_i32(-2).unwrap();
        assert_eq!(
            writer.into_inner(),
            vec![0x01, 0x02, 0x0A, 0x0B, 0x0C, 0xFF, 0xFF, 0xFF, 0xFE]
        );
    }

    #[test]
    fn reads_back_mixed_primitives() {
        let mut writer = BigEndianWriter::new(Vec::new());
        writer.write_i8(-5).unwrap();
        writer.write_u16(65_000).unwrap();
        writer.write_i64(i64::MIN + 7).unwrap();
        writer.write_f32(1.5).unwrap();
        writer.write_f64(-0.25).unwrap();
        let bytes = writer.into_inner();

        let mut reader = BigEndianReader::new(bytes.as_slice());
        assert_eq!(reader.read_i8().unwrap(), -5);
        assert_eq!(reader.read_u16().unwrap(), 65_000);
        assert_eq!(reader.read_i64().unwrap(), i64::MIN + 7);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_f64().unwrap(), -0.25);
    }

    #[test]
    fn u24_rejects_wide_values() {
        let mut writer = BigEndianWriter::new(Vec::new());
        assert!(writer.write_u24(0x0100_0000).is_err());
    }

    #[test]
    fn short_input_is_unexpected_eof() {
        let mut reader = BigEndianReader::new(&[0x00, 0x01][..]);
        let err = reader.read_i32().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let mut reader = BigEndianReader::new(&[1, 2, 3][..]);
        let err = reader.read_bytes(10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
