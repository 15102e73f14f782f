//! Block-level reading and writing helpers.
//!
//! [`BlockCursor`] wraps a [`ByteReader`] limited to one block's declared
//! bytes and adds the document context a decoder needs (string table, type
//! tag). [`BlockWriter`] is its mirror: it encodes into a private buffer and
//! interns strings so the block size is known before anything hits the output.

use std::collections::HashMap;
use std::fmt;

use super::constants::{NO_REF, NO_STRING};
use crate::util::{ByteReader, Color3, Color4, Endian, Error, NiTransform, Quat, QuatTransform, Result, Vec2, Vec3};

/// Non-owning link to another block by ordinal index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef(u32);

impl BlockRef {
    /// The "no block" sentinel.
    pub const NONE: Self = Self(NO_REF);

    /// Reference to block `index`.
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw wire value (may be the sentinel).
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// True for the sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == NO_REF
    }

    /// Block index, or `None` for the sentinel.
    #[inline]
    pub const fn index(self) -> Option<u32> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }
}

impl Default for BlockRef {
    fn default() -> Self {
        Self::NONE
    }
}

impl From<u32> for BlockRef {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

impl fmt::Debug for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "BlockRef({})", i),
            None => write!(f, "BlockRef(none)"),
        }
    }
}

/// Reader positioned inside one block.
pub struct BlockCursor<'a> {
    reader: ByteReader<'a>,
    strings: &'a [String],
    tag: &'a str,
    block: u32,
}

impl<'a> BlockCursor<'a> {
    /// Cursor over one block body, resolving strings against the document table.
    pub fn new(data: &'a [u8], endian: Endian, strings: &'a [String], tag: &'a str) -> Self {
        Self { reader: ByteReader::new(data, endian), strings, tag, block: 0 }
    }

    /// Attach the ordinal of the block being decoded (used in error reports).
    pub fn with_block(mut self, block: u32) -> Self {
        self.block = block;
        self
    }

    /// Ordinal of the block being decoded.
    #[inline]
    pub fn block(&self) -> u32 {
        self.block
    }

    /// `CorruptBlock` for the block being decoded.
    pub fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::corrupt_block(self.block, reason)
    }

    /// Full type tag of the block being decoded.
    #[inline]
    pub fn tag(&self) -> &'a str {
        self.tag
    }

    /// Byte order of the document.
    #[inline]
    pub fn endian(&self) -> Endian {
        self.reader.endian()
    }

    /// Offset from the start of the block body.
    #[inline]
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    /// Bytes left before the declared end of the block.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.reader.read_u8()
    }

    /// Read a one-byte boolean (nonzero is true).
    pub fn read_bool(&mut self) -> Result<bool> {
        self.reader.read_bool()
    }

    /// Read a u16 in document byte order.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.reader.read_u16()
    }

    /// Read a u32 in document byte order.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.reader.read_u32()
    }

    /// Read an f32 in document byte order.
    pub fn read_f32(&mut self) -> Result<f32> {
        self.reader.read_f32()
    }

    /// Borrow the next `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.reader.take(len)
    }

    /// Read a u32 element count, refusing counts the remaining bytes cannot hold.
    pub fn read_count(&mut self, min_element_size: usize) -> Result<usize> {
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_element_size) > self.remaining() {
            return Err(Error::Truncated {
                offset: self.position() as u64,
                wanted: count.saturating_mul(min_element_size),
            });
        }
        Ok(count)
    }

    /// Read two f32 values.
    pub fn read_vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    /// Read three f32 values.
    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Read an RGB color.
    pub fn read_color3(&mut self) -> Result<Color3> {
        self.read_vec3()
    }

    /// Read an RGBA color.
    pub fn read_color4(&mut self) -> Result<Color4> {
        Ok(Color4::new(self.read_f32()?, self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    /// Quaternion stored as w, x, y, z.
    pub fn read_quat(&mut self) -> Result<Quat> {
        let w = self.read_f32()?;
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }

    /// Translation, three rotation rows, uniform scale.
    pub fn read_transform(&mut self) -> Result<NiTransform> {
        let translation = self.read_vec3()?;
        let rows = [self.read_vec3()?, self.read_vec3()?, self.read_vec3()?];
        let scale = self.read_f32()?;
        Ok(NiTransform::from_rows(translation, rows, scale))
    }

    /// Three rotation rows, translation, uniform scale (skinning order).
    pub fn read_skin_transform(&mut self) -> Result<NiTransform> {
        let rows = [self.read_vec3()?, self.read_vec3()?, self.read_vec3()?];
        let translation = self.read_vec3()?;
        let scale = self.read_f32()?;
        Ok(NiTransform::from_rows(translation, rows, scale))
    }

    /// Translation, quaternion, uniform scale.
    pub fn read_quat_transform(&mut self) -> Result<QuatTransform> {
        Ok(QuatTransform {
            translation: self.read_vec3()?,
            rotation: self.read_quat()?,
            scale: self.read_f32()?,
        })
    }

    /// Read a block reference (may be the sentinel).
    pub fn read_ref(&mut self) -> Result<BlockRef> {
        Ok(BlockRef(self.read_u32()?))
    }

    /// u32 count followed by that many block indices.
    pub fn read_ref_list(&mut self) -> Result<Vec<BlockRef>> {
        let count = self.read_count(4)?;
        (0..count).map(|_| self.read_ref()).collect()
    }

    /// u32 count followed by that many u16 values.
    pub fn read_u16_list(&mut self) -> Result<Vec<u16>> {
        let count = self.read_count(2)?;
        (0..count).map(|_| self.read_u16()).collect()
    }

    /// Optional string-table reference.
    pub fn read_string_ref(&mut self) -> Result<Option<String>> {
        let index = self.read_u32()?;
        if index == NO_STRING {
            return Ok(None);
        }
        self.strings
            .get(index as usize)
            .cloned()
            .map(Some)
            .ok_or(Error::UnresolvedString(index))
    }

    /// String-table reference where "none" reads as an empty string.
    pub fn read_string(&mut self) -> Result<String> {
        Ok(self.read_string_ref()?.unwrap_or_default())
    }
}

/// Deduplicating string table built while encoding blocks.
#[derive(Clone, Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
    index: HashMap<String, u32>,
}

impl StringTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding `strings` at their existing indices.
    ///
    /// Opaque blocks carry raw string indices, so a parsed document keeps its
    /// table order when written back. Duplicates keep their slots; new
    /// interning resolves to the first one.
    pub fn with_existing(strings: &[String]) -> Self {
        let mut table = Self { strings: strings.to_vec(), index: HashMap::with_capacity(strings.len()) };
        for (i, s) in strings.iter().enumerate() {
            table.index.entry(s.clone()).or_insert(i as u32);
        }
        table
    }

    /// Return the index of `s`, appending it on first use.
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let i = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.index.insert(s.to_string(), i);
        i
    }

    /// Number of strings, including seeded ones.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True when no string has been interned or seeded.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Longest string in bytes (written as an informational header hint).
    pub fn max_len(&self) -> u32 {
        self.strings.iter().map(|s| s.len()).max().unwrap_or(0) as u32
    }

    /// Strings in index order.
    pub fn as_slice(&self) -> &[String] {
        &self.strings
    }
}

/// Encoder for one block's payload.
pub struct BlockWriter<'a> {
    buf: Vec<u8>,
    endian: Endian,
    strings: &'a mut StringTable,
}

impl<'a> BlockWriter<'a> {
    /// Writer for one block body, interning strings into `strings`.
    pub fn new(endian: Endian, strings: &'a mut StringTable) -> Self {
        Self { buf: Vec::new(), endian, strings }
    }

    /// Byte order being written.
    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Bytes encoded so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True before anything is written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finished block body.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Write one byte.
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    /// Write a one-byte boolean.
    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    /// Write a u16 in the target byte order.
    pub fn write_u16(&mut self, v: u16) {
        let mut b = [0u8; 2];
        self.endian.write_u16(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    /// Write a u32 in the target byte order.
    pub fn write_u32(&mut self, v: u32) {
        let mut b = [0u8; 4];
        self.endian.write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    /// Write an f32 in the target byte order.
    pub fn write_f32(&mut self, v: f32) {
        let mut b = [0u8; 4];
        self.endian.write_f32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    /// Append raw bytes unchanged.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Element counts are u32 on the wire.
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        let count = u32::try_from(count).map_err(|_| Error::other(format!("count {} exceeds u32", count)))?;
        self.write_u32(count);
        Ok(())
    }

    /// Write two f32 values.
    pub fn write_vec2(&mut self, v: Vec2) {
        self.write_f32(v.x);
        self.write_f32(v.y);
    }

    /// Write three f32 values.
    pub fn write_vec3(&mut self, v: Vec3) {
        self.write_f32(v.x);
        self.write_f32(v.y);
        self.write_f32(v.z);
    }

    /// Write an RGB color.
    pub fn write_color3(&mut self, c: Color3) {
        self.write_vec3(c);
    }

    /// Write an RGBA color.
    pub fn write_color4(&mut self, c: Color4) {
        for v in c.to_array() {
            self.write_f32(v);
        }
    }

    /// Quaternion as w, x, y, z.
    pub fn write_quat(&mut self, q: Quat) {
        self.write_f32(q.w);
        self.write_f32(q.x);
        self.write_f32(q.y);
        self.write_f32(q.z);
    }

    /// Translation, three rotation rows, uniform scale.
    pub fn write_transform(&mut self, t: &NiTransform) {
        self.write_vec3(t.translation);
        for row in t.rows() {
            self.write_vec3(row);
        }
        self.write_f32(t.scale);
    }

    /// Three rotation rows, translation, uniform scale.
    pub fn write_skin_transform(&mut self, t: &NiTransform) {
        for row in t.rows() {
            self.write_vec3(row);
        }
        self.write_vec3(t.translation);
        self.write_f32(t.scale);
    }

    /// Translation, quaternion, uniform scale.
    pub fn write_quat_transform(&mut self, t: &QuatTransform) {
        self.write_vec3(t.translation);
        self.write_quat(t.rotation);
        self.write_f32(t.scale);
    }

    /// Write a block reference.
    pub fn write_ref(&mut self, r: BlockRef) {
        self.write_u32(r.raw());
    }

    /// u32 count followed by the references.
    pub fn write_ref_list(&mut self, refs: &[BlockRef]) -> Result<()> {
        self.write_count(refs.len())?;
        for r in refs {
            self.write_ref(*r);
        }
        Ok(())
    }

    /// u32 count followed by the values.
    pub fn write_u16_list(&mut self, values: &[u16]) -> Result<()> {
        self.write_count(values.len())?;
        for v in values {
            self.write_u16(*v);
        }
        Ok(())
    }

    /// Intern `s` and write its index, or the sentinel for `None`.
    pub fn write_string_ref(&mut self, s: Option<&str>) {
        let index = match s {
            Some(s) => self.strings.intern(s),
            None => NO_STRING,
        };
        self.write_u32(index);
    }

    /// Intern `s` and write its index.
    pub fn write_string(&mut self, s: &str) {
        self.write_string_ref(Some(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_ref_sentinel() {
        assert!(BlockRef::NONE.is_none());
        assert_eq!(BlockRef::NONE.index(), None);
        assert_eq!(BlockRef::new(4).index(), Some(4));
        assert_eq!(BlockRef::default(), BlockRef::NONE);
    }

    #[test]
    fn test_string_refs() {
        let strings = vec!["a".to_string(), "b".to_string()];
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&NO_STRING.to_le_bytes());
        bytes.extend_from_slice(&9u32.to_le_bytes());

        let mut cur = BlockCursor::new(&bytes, Endian::Little, &strings, "NiNode");
        assert_eq!(cur.read_string_ref().unwrap().as_deref(), Some("b"));
        assert_eq!(cur.read_string_ref().unwrap(), None);
        assert!(matches!(cur.read_string_ref(), Err(Error::UnresolvedString(9))));
    }

    #[test]
    fn test_count_guard() {
        let bytes = 1000u32.to_le_bytes();
        let mut cur = BlockCursor::new(&bytes, Endian::Little, &[], "");
        assert!(matches!(cur.read_ref_list(), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_writer_interns_strings() {
        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Big, &mut table);
        w.write_string("mesh");
        w.write_string("mesh");
        w.write_string_ref(None);
        let bytes = w.into_bytes();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[0xFF; 4]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.max_len(), 4);
    }

    #[test]
    fn test_transform_wire_order() {
        let t = NiTransform::from_rows(
            Vec3::new(1.0, 2.0, 3.0),
            [Vec3::X, Vec3::Y, Vec3::Z],
            0.5,
        );
        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Little, &mut table);
        w.write_transform(&t);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 13 * 4);

        let mut cur = BlockCursor::new(&bytes, Endian::Little, &[], "");
        assert_eq!(cur.read_transform().unwrap(), t);
        assert_eq!(cur.remaining(), 0);
    }
}
