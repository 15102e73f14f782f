//! Output stream for document headers and block bodies.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use crate::util::{Endian, Result};

/// Byte-order aware output stream that tracks how much it has written.
pub struct OStream<W: Write> {
    writer: W,
    endian: Endian,
    pos: u64,
}

impl OStream<BufWriter<File>> {
    /// Create (or truncate) a file for writing.
    pub fn create(path: impl AsRef<Path>, endian: Endian) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self::new(BufWriter::with_capacity(1024 * 1024, file), endian))
    }
}

impl<W: Write> OStream<W> {
    pub fn new(writer: W, endian: Endian) -> Self {
        Self { writer, endian, pos: 0 }
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Change byte order for the following writes.
    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.pos += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        match self.endian {
            Endian::Little => self.writer.write_u16::<LittleEndian>(value)?,
            Endian::Big => self.writer.write_u16::<BigEndian>(value)?,
        }
        self.pos += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        match self.endian {
            Endian::Little => self.writer.write_u32::<LittleEndian>(value)?,
            Endian::Big => self.writer.write_u32::<BigEndian>(value)?,
        }
        self.pos += 4;
        Ok(())
    }

    /// u32 length followed by the raw bytes.
    pub fn write_sized_string(&mut self, s: &str) -> Result<()> {
        self.write_u32(s.len() as u32)?;
        self.write_bytes(s.as_bytes())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endian_switch() {
        let mut s = OStream::new(Vec::new(), Endian::Little);
        s.write_u32(1).unwrap();
        s.set_endian(Endian::Big);
        s.write_u16(1).unwrap();
        s.write_sized_string("ab").unwrap();
        assert_eq!(s.pos(), 12);
        assert_eq!(s.into_inner(), vec![1, 0, 0, 0, 0, 1, 0, 0, 0, 2, b'a', b'b']);
    }
}
