//! `NiDataStream`: raw vertex/index bytes described by component tags.
//!
//! The stream usage is not stored in the payload. It is the ASCII digit at a
//! fixed offset of the block's type tag (`NiDataStream\x01<usage>...`).

use smallvec::SmallVec;

use super::BlockCodec;
use crate::format::component::{ComponentFormat, ComponentInfo};
use crate::format::constants::{data_stream_tag, DATA_STREAM_USAGE_OFFSET};
use crate::format::cursor::{BlockCursor, BlockWriter};
use crate::util::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamUsage {
    IndexBuffer = 0,
    #[default]
    VertexBuffer = 1,
    ShaderConstant = 2,
    User = 3,
}

impl StreamUsage {
    pub fn from_digit(d: u8) -> Option<Self> {
        Some(match d {
            b'0' => Self::IndexBuffer,
            b'1' => Self::VertexBuffer,
            b'2' => Self::ShaderConstant,
            b'3' => Self::User,
            _ => return None,
        })
    }

    /// Extract the usage from a full data-stream type tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.as_bytes().get(DATA_STREAM_USAGE_OFFSET).copied().and_then(Self::from_digit)
    }

    /// Type tag a stream of this usage is written under.
    pub fn tag(self) -> String {
        data_stream_tag(self as u8)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CloningBehavior {
    #[default]
    Share = 0,
    Copy = 1,
    BlankCopy = 2,
}

impl CloningBehavior {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::Share,
            1 => Self::Copy,
            2 => Self::BlankCopy,
            _ => return None,
        })
    }
}

/// Contiguous element range used by one submesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    pub start_index: u32,
    pub num_indices: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiDataStream {
    pub usage: StreamUsage,
    pub cloning: CloningBehavior,
    pub regions: Vec<Region>,
    pub components: SmallVec<[ComponentFormat; 4]>,
    /// Interleaved elements in the document's byte order.
    pub data: Vec<u8>,
    pub streamable: bool,
}

impl NiDataStream {
    /// Resolved (type, count) of each component.
    pub fn component_infos(&self) -> impl Iterator<Item = ComponentInfo> + '_ {
        self.components.iter().map(|c| c.info())
    }

    /// Bytes per element (sum of component sizes).
    pub fn stride(&self) -> usize {
        self.component_infos().map(|i| i.size()).sum()
    }

    /// Number of whole elements in `data`.
    pub fn num_elements(&self) -> usize {
        match self.stride() {
            0 => 0,
            stride => self.data.len() / stride,
        }
    }

    /// Element count of the first region, or zero without regions.
    pub fn first_region_count(&self) -> u32 {
        self.regions.first().map(|r| r.num_indices).unwrap_or(0)
    }
}

impl BlockCodec for NiDataStream {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let usage = StreamUsage::from_tag(cur.tag())
            .ok_or_else(|| cur.corrupt(format!("no stream usage in tag {:?}", cur.tag())))?;
        let stream_size = cur.read_u32()? as usize;
        let raw_cloning = cur.read_u32()?;
        let cloning = CloningBehavior::from_u32(raw_cloning)
            .ok_or_else(|| cur.corrupt(format!("invalid cloning behavior {}", raw_cloning)))?;

        let num_regions = cur.read_count(8)?;
        let regions = (0..num_regions)
            .map(|_| -> Result<Region> {
                Ok(Region { start_index: cur.read_u32()?, num_indices: cur.read_u32()? })
            })
            .collect::<Result<Vec<_>>>()?;

        let num_components = cur.read_count(4)?;
        let components = (0..num_components)
            .map(|_| cur.read_u32().map(ComponentFormat))
            .collect::<Result<SmallVec<[ComponentFormat; 4]>>>()?;

        let data = cur.read_bytes(stream_size)?.to_vec();
        let streamable = cur.read_bool()?;

        Ok(Self { usage, cloning, regions, components, data, streamable })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        w.write_count(self.data.len())?;
        w.write_u32(self.cloning as u32);
        w.write_count(self.regions.len())?;
        for r in &self.regions {
            w.write_u32(r.start_index);
            w.write_u32(r.num_indices);
        }
        w.write_count(self.components.len())?;
        for c in &self.components {
            w.write_u32(c.0);
        }
        w.write_bytes(&self.data);
        w.write_bool(self.streamable);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::cursor::StringTable;
    use crate::util::{AttributeDataType, Endian, Error};
    use smallvec::smallvec;

    #[test]
    fn test_usage_from_tag() {
        assert_eq!(StreamUsage::from_tag("NiDataStream\u{1}0\u{1}2"), Some(StreamUsage::IndexBuffer));
        assert_eq!(StreamUsage::from_tag(&StreamUsage::User.tag()), Some(StreamUsage::User));
        assert_eq!(StreamUsage::from_tag("NiDataStream"), None);
        assert_eq!(StreamUsage::from_tag("NiDataStream\u{1}9"), None);
    }

    #[test]
    fn test_stream_codec_and_stride() {
        let stream = NiDataStream {
            usage: StreamUsage::VertexBuffer,
            regions: vec![Region { start_index: 0, num_indices: 2 }],
            components: smallvec![ComponentFormat::FLOAT32_3, ComponentFormat::UINT16_2],
            data: vec![0u8; 32],
            streamable: true,
            ..Default::default()
        };
        assert_eq!(stream.stride(), 16);
        assert_eq!(stream.num_elements(), 2);
        let infos: Vec<_> = stream.component_infos().collect();
        assert_eq!(infos[1].data_type, AttributeDataType::UInt16);

        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Little, &mut table);
        stream.encode(&mut w).unwrap();
        let bytes = w.into_bytes();
        let tag = StreamUsage::VertexBuffer.tag();
        let mut cur = BlockCursor::new(&bytes, Endian::Little, &[], &tag);
        assert_eq!(NiDataStream::decode(&mut cur).unwrap(), stream);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn test_short_payload_is_truncated() {
        let stream = NiDataStream {
            components: smallvec![ComponentFormat::FLOAT32_3],
            data: vec![0u8; 24],
            ..Default::default()
        };
        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Little, &mut table);
        stream.encode(&mut w).unwrap();
        let bytes = w.into_bytes();

        let tag = StreamUsage::VertexBuffer.tag();
        let mut cur = BlockCursor::new(&bytes[..bytes.len() - 10], Endian::Little, &[], &tag);
        assert!(matches!(NiDataStream::decode(&mut cur), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_unknown_component_has_zero_stride() {
        let stream = NiDataStream {
            components: smallvec![ComponentFormat(0xDEAD_BEEF)],
            data: vec![1, 2, 3],
            ..Default::default()
        };
        assert_eq!(stream.stride(), 0);
        assert_eq!(stream.num_elements(), 0);
    }
}
