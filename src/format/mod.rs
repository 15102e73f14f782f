//! Wire-level NIF documents.
//!
//! A document is a flat table of typed, size-framed blocks plus a shared
//! string table. Blocks refer to each other by ordinal index.
//!
//! ```text
//! +----------------------------+
//! | banner line, version, BOM  |
//! | counts, metadata           |
//! | block type names           |
//! | type index per block       |
//! | byte size per block        |
//! | string table               |
//! +----------------------------+
//! | block 0 | block 1 | ...    |
//! +----------------------------+
//! ```
//!
//! [`Document::from_bytes`] builds the block table, dispatching each block to
//! its decoder in [`blocks`]. [`Document::write_to`] is the inverse.

pub mod blocks;
pub mod component;
pub mod constants;
pub mod cursor;
mod document;
mod writer;

pub use blocks::{BlockCodec, BlockPayload};
pub use component::{ComponentFormat, ComponentInfo, COMPONENT_TABLE};
pub use cursor::{BlockCursor, BlockRef, BlockWriter, StringTable};
pub use document::{Block, Document, ReadOptions};
pub use writer::{OStream, WriteOptions};
