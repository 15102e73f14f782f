//! Scene-graph object headers and `NiNode`.

use super::BlockCodec;
use crate::format::cursor::{BlockCursor, BlockRef, BlockWriter};
use crate::util::{NiTransform, Result};

/// Fields every named object carries after its name: extra data and controller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectNet {
    pub extra_data: Vec<BlockRef>,
    pub controller: BlockRef,
}

impl BlockCodec for ObjectNet {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self {
            extra_data: cur.read_ref_list()?,
            controller: cur.read_ref()?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        w.write_ref_list(&self.extra_data)?;
        w.write_ref(self.controller);
        Ok(())
    }
}

/// Header shared by nodes and meshes: object fields, flags, local transform,
/// property list and collision object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AvObject {
    pub net: ObjectNet,
    pub flags: u16,
    pub transform: NiTransform,
    pub properties: Vec<BlockRef>,
    pub collision: BlockRef,
}

impl BlockCodec for AvObject {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self {
            net: ObjectNet::decode(cur)?,
            flags: cur.read_u16()?,
            transform: cur.read_transform()?,
            properties: cur.read_ref_list()?,
            collision: cur.read_ref()?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.net.encode(w)?;
        w.write_u16(self.flags);
        w.write_transform(&self.transform);
        w.write_ref_list(&self.properties)?;
        w.write_ref(self.collision);
        Ok(())
    }
}

/// Grouping node. Child slots may hold the "no reference" sentinel; those are
/// kept so the block re-encodes to the same size.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiNode {
    pub av: AvObject,
    pub children: Vec<BlockRef>,
    pub effects: Vec<BlockRef>,
}

impl NiNode {
    /// Child references that point at a block.
    pub fn live_children(&self) -> impl Iterator<Item = u32> + '_ {
        self.children.iter().filter_map(|c| c.index())
    }
}

impl BlockCodec for NiNode {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self {
            av: AvObject::decode(cur)?,
            children: cur.read_ref_list()?,
            effects: cur.read_ref_list()?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.av.encode(w)?;
        w.write_ref_list(&self.children)?;
        w.write_ref_list(&self.effects)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::cursor::StringTable;
    use crate::util::{Endian, Vec3};

    #[test]
    fn test_node_keeps_sentinel_child() {
        let node = NiNode {
            av: AvObject {
                flags: 14,
                transform: NiTransform {
                    translation: Vec3::new(1.0, 2.0, 3.0),
                    ..Default::default()
                },
                ..Default::default()
            },
            children: vec![BlockRef::new(1), BlockRef::NONE],
            effects: vec![],
        };

        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Little, &mut table);
        node.encode(&mut w).unwrap();
        let bytes = w.into_bytes();
        // extra(4) ctrl(4) flags(2) xform(52) props(4) coll(4) children(4+8) effects(4)
        assert_eq!(bytes.len(), 86);

        let mut cur = BlockCursor::new(&bytes, Endian::Little, &[], "NiNode");
        let back = NiNode::decode(&mut cur).unwrap();
        assert_eq!(back, node);
        assert_eq!(back.live_children().collect::<Vec<_>>(), vec![1]);
    }
}
