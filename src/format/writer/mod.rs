//! Document writer.
//!
//! Blocks are encoded into memory first, interning every string they
//! reference, so each block's size field is the exact length of its bytes and
//! the string table is complete before the header is written. The table
//! starts from the document's own strings, which keeps the raw indices inside
//! opaque blocks valid.

mod stream;

pub use stream::OStream;

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use super::blocks::has_embedded_name;
use super::constants::*;
use super::cursor::{BlockWriter, StringTable};
use super::document::Document;
use crate::util::{Endian, Error, Result};

/// Header settings for newly written documents.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteOptions {
    pub banner: String,
    pub version: u32,
    pub user_version: u32,
    pub endian: Endian,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            banner: DEFAULT_BANNER.to_string(),
            version: DEFAULT_VERSION,
            user_version: 0,
            endian: Endian::Little,
        }
    }
}

impl WriteOptions {
    /// Same options with a different byte order.
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = endian;
        self
    }
}

/// Lengths and counts are u32 on the wire.
fn wire_len(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::other(format!("{} {} exceeds u32", what, len)))
}

/// Blocks encoded and ready to be framed.
struct EncodedBlocks {
    block_types: Vec<String>,
    type_indices: Vec<u16>,
    bodies: Vec<Vec<u8>>,
    strings: StringTable,
}

impl Document {
    /// Apply header settings to a document that is about to be written.
    ///
    /// Raw stream and unknown-block bytes are not re-ordered, so only change
    /// the byte order of a document whose data streams were built for it.
    pub fn apply_options(&mut self, opts: &WriteOptions) {
        self.banner = opts.banner.clone();
        self.version = opts.version;
        self.user_version = opts.user_version;
        self.endian = opts.endian;
    }

    /// Write the document; returns the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<u64> {
        let _span = tracing::debug_span!("nif_write", blocks = self.blocks.len()).entered();

        if self.banner.contains('\n') {
            return Err(Error::other("banner must be a single line"));
        }
        let encoded = self.encode_blocks()?;

        let mut out = OStream::new(writer, Endian::Little);
        out.write_bytes(self.banner.as_bytes())?;
        out.write_u8(b'\n')?;
        out.write_u32(self.version)?;
        out.write_u8(self.endian.flag())?;
        out.set_endian(self.endian);

        out.write_u32(self.user_version)?;
        out.write_u32(wire_len(self.blocks.len(), "block count")?)?;
        out.write_u32(wire_len(self.metadata.len(), "metadata size")?)?;
        out.write_bytes(&self.metadata)?;

        out.write_u16(encoded.block_types.len() as u16)?;
        for name in &encoded.block_types {
            out.write_sized_string(name)?;
        }
        for index in &encoded.type_indices {
            out.write_u16(*index)?;
        }
        for body in &encoded.bodies {
            out.write_u32(wire_len(body.len(), "block size")?)?;
        }

        out.write_u32(wire_len(encoded.strings.len(), "string count")?)?;
        out.write_u32(encoded.strings.max_len())?;
        for s in encoded.strings.as_slice() {
            out.write_sized_string(s)?;
        }
        out.write_u32(0)?; // groups

        for body in &encoded.bodies {
            out.write_bytes(body)?;
        }
        out.flush()?;

        debug!(
            bytes = out.pos(),
            types = encoded.block_types.len(),
            strings = encoded.strings.len(),
            "document written"
        );
        Ok(out.pos())
    }

    /// Encode into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Write to a file, replacing it.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))?;
        Ok(())
    }

    fn encode_blocks(&self) -> Result<EncodedBlocks> {
        let mut strings = StringTable::with_existing(&self.strings);
        let mut block_types = Vec::new();
        let mut type_lookup: HashMap<&str, u16> = HashMap::new();
        let mut type_indices = Vec::with_capacity(self.blocks.len());
        let mut bodies = Vec::with_capacity(self.blocks.len());

        for block in &self.blocks {
            let type_index = match type_lookup.get(block.type_tag.as_str()) {
                Some(&i) => i,
                None => {
                    let i = u16::try_from(block_types.len())
                        .ok()
                        .filter(|i| *i <= BLOCK_TYPE_INDEX_MASK)
                        .ok_or_else(|| Error::other("too many distinct block types"))?;
                    block_types.push(block.type_tag.clone());
                    type_lookup.insert(block.type_tag.as_str(), i);
                    i
                }
            };
            type_indices.push(type_index);

            let mut w = BlockWriter::new(self.endian, &mut strings);
            if !block.payload.is_unknown() && has_embedded_name(block.base_name()) {
                w.write_string_ref(block.name.as_deref());
            }
            block.payload.encode(&mut w)?;
            bodies.push(w.into_bytes());
        }

        Ok(EncodedBlocks { block_types, type_indices, bodies, strings })
    }
}
