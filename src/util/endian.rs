//! Byte order selection and a bounds-checked primitive reader.
//!
//! NIF documents pick their byte order at runtime (one byte in the header), so
//! every multi-byte read goes through [`Endian`] instead of a compile-time
//! `byteorder` type parameter.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use super::{Error, Result};

/// Byte order of a document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

impl Endian {
    /// Byte order of the host.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::Little;
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::Big;

    /// Decode the header's endianness byte (1 = little, 0 = big).
    pub const fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Self::Big),
            1 => Some(Self::Little),
            _ => None,
        }
    }

    /// Header byte for this byte order.
    pub const fn flag(self) -> u8 {
        match self {
            Self::Little => 1,
            Self::Big => 0,
        }
    }

    #[inline]
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Self::Little => LittleEndian::read_u16(buf),
            Self::Big => BigEndian::read_u16(buf),
        }
    }

    #[inline]
    pub fn read_i16(self, buf: &[u8]) -> i16 {
        match self {
            Self::Little => LittleEndian::read_i16(buf),
            Self::Big => BigEndian::read_i16(buf),
        }
    }

    #[inline]
    pub fn read_u32(self, buf: &[u8]) -> u32 {
        match self {
            Self::Little => LittleEndian::read_u32(buf),
            Self::Big => BigEndian::read_u32(buf),
        }
    }

    #[inline]
    pub fn read_i32(self, buf: &[u8]) -> i32 {
        match self {
            Self::Little => LittleEndian::read_i32(buf),
            Self::Big => BigEndian::read_i32(buf),
        }
    }

    #[inline]
    pub fn read_f32(self, buf: &[u8]) -> f32 {
        match self {
            Self::Little => LittleEndian::read_f32(buf),
            Self::Big => BigEndian::read_f32(buf),
        }
    }

    #[inline]
    pub fn write_u16(self, buf: &mut [u8], v: u16) {
        match self {
            Self::Little => LittleEndian::write_u16(buf, v),
            Self::Big => BigEndian::write_u16(buf, v),
        }
    }

    #[inline]
    pub fn write_i16(self, buf: &mut [u8], v: i16) {
        match self {
            Self::Little => LittleEndian::write_i16(buf, v),
            Self::Big => BigEndian::write_i16(buf, v),
        }
    }

    #[inline]
    pub fn write_u32(self, buf: &mut [u8], v: u32) {
        match self {
            Self::Little => LittleEndian::write_u32(buf, v),
            Self::Big => BigEndian::write_u32(buf, v),
        }
    }

    #[inline]
    pub fn write_i32(self, buf: &mut [u8], v: i32) {
        match self {
            Self::Little => LittleEndian::write_i32(buf, v),
            Self::Big => BigEndian::write_i32(buf, v),
        }
    }

    #[inline]
    pub fn write_f32(self, buf: &mut [u8], v: f32) {
        match self {
            Self::Little => LittleEndian::write_f32(buf, v),
            Self::Big => BigEndian::write_f32(buf, v),
        }
    }
}

/// Cursor over an in-memory byte slice.
///
/// Every read checks the remaining length first and fails with
/// [`Error::Truncated`] instead of reading past the slice. Block decoders get
/// a reader whose slice ends exactly at the block's declared size.
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self { data, pos: 0, endian }
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Switch byte order (the header selects it after the first few fields).
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::Truncated { offset: self.pos as u64, wanted: len });
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Advance without interpreting the bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let e = self.endian;
        Ok(e.read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let e = self.endian;
        Ok(e.read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let e = self.endian;
        Ok(e.read_i32(self.take(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let e = self.endian;
        Ok(e.read_f32(self.take(4)?))
    }

    /// Read a u32 length followed by that many bytes, decoded as text.
    pub fn read_sized_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_byte_order() {
        let bytes = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(ByteReader::new(&bytes, Endian::Little).read_u32().unwrap(), 0x04030201);
        assert_eq!(ByteReader::new(&bytes, Endian::Big).read_u32().unwrap(), 0x01020304);

        let mut r = ByteReader::new(&bytes, Endian::Big);
        assert_eq!(r.read_u16().unwrap(), 0x0102);
        r.set_endian(Endian::Little);
        assert_eq!(r.read_u16().unwrap(), 0x0403);
    }

    #[test]
    fn test_read_f32() {
        let bytes = 1.5f32.to_be_bytes();
        assert_eq!(ByteReader::new(&bytes, Endian::Big).read_f32().unwrap(), 1.5);
    }

    #[test]
    fn test_overrun_is_reported() {
        let bytes = [0u8; 3];
        let mut r = ByteReader::new(&bytes, Endian::Little);
        r.read_u16().unwrap();
        match r.read_u32() {
            Err(Error::Truncated { offset, wanted }) => {
                assert_eq!(offset, 2);
                assert_eq!(wanted, 4);
            }
            other => panic!("expected Truncated, got {:?}", other),
        }
        // A failed read does not move the cursor
        assert_eq!(r.position(), 2);
    }

    #[test]
    fn test_endian_flag() {
        assert_eq!(Endian::from_flag(1), Some(Endian::Little));
        assert_eq!(Endian::from_flag(0), Some(Endian::Big));
        assert_eq!(Endian::from_flag(2), None);
        assert_eq!(Endian::Big.flag(), 0);
    }
}
