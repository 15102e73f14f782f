//! Document model and the block-table builder.
//!
//! Parsing is a single forward pass over the bytes:
//!
//! ```text
//! banner "\n" | version u32 | endian u8 | user_version | num_blocks | meta_size | meta
//! num_types u16 | type names (u32 length + bytes)
//! type index u16 x num_blocks | block size u32 x num_blocks
//! num_strings | max_len | strings (u32 length + bytes)
//! num_groups (must be 0)
//! block 0 | block 1 | ...
//! ```
//!
//! Each block is handed to its decoder as a slice that ends exactly at its
//! declared size, so a decoder cannot read into the next block. A decoder
//! that wants more, or leaves bytes behind, fails the whole parse.

use std::fs::File;
use std::io::Read;
use std::path::Path;

#[cfg(feature = "mmap")]
use memmap2::Mmap;
use tracing::{debug, trace};

use super::blocks::{find_decoder, BlockPayload};
use super::constants::*;
use super::cursor::BlockCursor;
use crate::util::{ByteReader, Endian, Error, Result};

/// Options for opening a document from disk.
#[derive(Clone, Copy, Debug)]
pub struct ReadOptions {
    /// Memory-map the file instead of reading it into a buffer.
    pub use_mmap: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { use_mmap: cfg!(feature = "mmap") }
    }
}

/// One record of the block table.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    /// Full type tag as stored (may carry a suffix after the base name).
    pub type_tag: String,
    /// Declared size in bytes; zero for blocks built in memory.
    pub size: u32,
    pub name: Option<String>,
    pub payload: BlockPayload,
}

impl Block {
    #[inline]
    pub fn base_name(&self) -> &str {
        base_type_name(&self.type_tag)
    }
}

/// Parsed (or assembled) document: header fields, string table and blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub banner: String,
    pub version: u32,
    pub endian: Endian,
    pub user_version: u32,
    /// Opaque metadata bytes carried between the header counts and the type table.
    pub metadata: Vec<u8>,
    /// Type names as stored; rebuilt from the blocks on write.
    pub block_types: Vec<String>,
    /// String table as stored; rebuilt from the payloads on write.
    pub strings: Vec<String>,
    pub blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Endian::Little)
    }
}

struct RawHeader {
    banner: String,
    version: u32,
    endian: Endian,
    user_version: u32,
    metadata: Vec<u8>,
    block_types: Vec<String>,
    type_indices: Vec<u16>,
    sizes: Vec<u32>,
    strings: Vec<String>,
}

impl Document {
    /// Empty document with the default banner and version.
    pub fn new(endian: Endian) -> Self {
        Self {
            banner: DEFAULT_BANNER.to_string(),
            version: DEFAULT_VERSION,
            endian,
            user_version: 0,
            metadata: Vec::new(),
            block_types: Vec::new(),
            strings: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Open a file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, ReadOptions::default())
    }

    pub fn open_opts(path: impl AsRef<Path>, opts: ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        #[cfg(feature = "mmap")]
        if opts.use_mmap && file.metadata()?.len() > 0 {
            // Safety: the map is read-only and dropped before this call returns.
            let mmap = unsafe { Mmap::map(&file) }?;
            return Self::from_bytes(&mmap);
        }
        #[cfg(not(feature = "mmap"))]
        let _ = opts;

        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Read a whole document from a stream.
    pub fn read(mut reader: impl Read) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Parse a document held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let _span = tracing::debug_span!("nif_parse", bytes = data.len()).entered();

        let mut r = ByteReader::new(data, Endian::Little);
        let header = read_header(&mut r).map_err(|e| match e {
            Error::Truncated { offset, wanted } => Error::corrupt_header(format!(
                "header ends early: wanted {} bytes at offset {}",
                wanted, offset
            )),
            other => other,
        })?;
        debug!(
            banner = %header.banner,
            version = %format!("{:#010x}", header.version),
            endian = ?header.endian,
            blocks = header.sizes.len(),
            types = header.block_types.len(),
            strings = header.strings.len(),
            "document header"
        );

        let mut blocks = Vec::with_capacity(header.sizes.len());
        for (i, (&type_index, &size)) in header.type_indices.iter().zip(&header.sizes).enumerate() {
            let index = i as u32;
            let type_index = (type_index & BLOCK_TYPE_INDEX_MASK) as usize;
            let tag = header.block_types.get(type_index).ok_or_else(|| {
                Error::corrupt_block(
                    index,
                    format!("type index {} outside table of {}", type_index, header.block_types.len()),
                )
            })?;
            let bytes = r.take(size as usize).map_err(|_| {
                Error::corrupt_block(
                    index,
                    format!("declared size {} exceeds the {} bytes left", size, r.remaining()),
                )
            })?;
            let block = decode_block(index, tag, bytes, header.endian, &header.strings)?;
            trace!(block = index, tag = %block.base_name(), size, kind = block.payload.kind(), "block");
            blocks.push(block);
        }

        if !r.is_empty() {
            debug!(trailing = r.remaining(), "ignoring bytes after the last block");
        }

        Ok(Self {
            banner: header.banner,
            version: header.version,
            endian: header.endian,
            user_version: header.user_version,
            metadata: header.metadata,
            block_types: header.block_types,
            strings: header.strings,
            blocks,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[inline]
    pub fn block(&self, index: u32) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    /// Append a typed block; returns its index.
    pub fn push_block(&mut self, name: Option<String>, payload: BlockPayload) -> Result<u32> {
        let type_tag = payload
            .type_tag()
            .ok_or_else(|| Error::other("raw payloads need an explicit type tag"))?
            .into_owned();
        Ok(self.push(Block { type_tag, size: 0, name, payload }))
    }

    /// Append an opaque block under the given tag; returns its index.
    pub fn push_raw_block(&mut self, type_tag: impl Into<String>, bytes: Vec<u8>) -> u32 {
        self.push(Block { type_tag: type_tag.into(), size: 0, name: None, payload: BlockPayload::Unknown(bytes) })
    }

    fn push(&mut self, block: Block) -> u32 {
        self.blocks.push(block);
        (self.blocks.len() - 1) as u32
    }
}

fn read_header(r: &mut ByteReader<'_>) -> Result<RawHeader> {
    let banner = read_banner(r)?;
    let version = r.read_u32()?;
    let endian = Endian::from_flag(r.read_u8()?)
        .ok_or_else(|| Error::corrupt_header("endian flag is neither 0 nor 1"))?;
    r.set_endian(endian);

    let user_version = r.read_u32()?;
    let num_blocks = r.read_u32()? as usize;
    let meta_size = r.read_u32()? as usize;
    let metadata = r.take(meta_size)?.to_vec();

    let num_types = r.read_u16()? as usize;
    let block_types = (0..num_types).map(|_| r.read_sized_string()).collect::<Result<Vec<_>>>()?;

    if num_blocks.saturating_mul(6) > r.remaining() {
        return Err(Error::corrupt_header(format!(
            "{} blocks cannot fit in the {} bytes left",
            num_blocks,
            r.remaining()
        )));
    }
    let type_indices = (0..num_blocks).map(|_| r.read_u16()).collect::<Result<Vec<_>>>()?;
    let sizes = (0..num_blocks).map(|_| r.read_u32()).collect::<Result<Vec<_>>>()?;

    let num_strings = r.read_u32()? as usize;
    let _max_len = r.read_u32()?;
    if num_strings.saturating_mul(4) > r.remaining() {
        return Err(Error::corrupt_header(format!("string count {} is larger than the file", num_strings)));
    }
    let strings = (0..num_strings).map(|_| r.read_sized_string()).collect::<Result<Vec<_>>>()?;

    let num_groups = r.read_u32()?;
    if num_groups != 0 {
        return Err(Error::UnsupportedFeature(format!("{} block groups", num_groups)));
    }

    Ok(RawHeader {
        banner,
        version,
        endian,
        user_version,
        metadata,
        block_types,
        type_indices,
        sizes,
        strings,
    })
}

fn read_banner(r: &mut ByteReader<'_>) -> Result<String> {
    let window = r.remaining().min(MAX_BANNER_LEN + 1);
    let peek = r.clone().take(window)?;
    let len = peek
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| Error::corrupt_header("no banner line"))?;
    let banner = String::from_utf8_lossy(r.take(len)?).into_owned();
    r.skip(1)?;
    if !banner.contains(BANNER_MARKER) {
        return Err(Error::corrupt_header(format!("unrecognised banner {:?}", banner)));
    }
    Ok(banner)
}

fn decode_block(index: u32, tag: &str, bytes: &[u8], endian: Endian, strings: &[String]) -> Result<Block> {
    let size = bytes.len() as u32;
    let unknown = |name: Option<String>| Block {
        type_tag: tag.to_string(),
        size,
        name,
        payload: BlockPayload::Unknown(bytes.to_vec()),
    };

    if bytes.is_empty() {
        return Ok(unknown(None));
    }
    let Some(decoder) = find_decoder(base_type_name(tag)) else {
        return Ok(unknown(None));
    };

    let mut cur = BlockCursor::new(bytes, endian, strings, tag).with_block(index);
    let mismatch = |consumed: u64| Error::BlockSizeMismatch { block: index, declared: size, consumed };

    // A body holding nothing but the name stays opaque, keeping the name.
    let decoded = (|| -> Result<(Option<String>, Option<BlockPayload>)> {
        let name = if decoder.has_name { cur.read_string_ref()? } else { None };
        if cur.remaining() == 0 {
            return Ok((name, None));
        }
        Ok((name, Some((decoder.decode)(&mut cur)?)))
    })();

    match decoded {
        Ok((name, None)) => Ok(unknown(name)),
        Ok((name, Some(payload))) => {
            if cur.remaining() != 0 {
                return Err(mismatch(cur.position() as u64));
            }
            Ok(Block { type_tag: tag.to_string(), size, name, payload })
        }
        Err(Error::Truncated { offset, wanted }) => Err(mismatch(offset + wanted as u64)),
        Err(e) => Err(e),
    }
}
