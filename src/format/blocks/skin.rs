//! `NiSkinningMeshModifier`: bone binding for a skinned mesh.

use super::BlockCodec;
use crate::format::cursor::{BlockCursor, BlockRef, BlockWriter};
use crate::util::{BoundingSphere, NiTransform, Result};

/// Flag bit: per-bone bounding spheres follow the bone transforms.
pub const SKIN_FLAG_HAS_BOUNDS: u16 = 0x2;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiSkinningMeshModifier {
    pub submit_points: Vec<u16>,
    pub complete_points: Vec<u16>,
    pub flags: u16,
    pub skeleton_root: BlockRef,
    pub skeleton_transform: NiTransform,
    pub bones: Vec<BlockRef>,
    /// Bind-pose transform per bone.
    pub bone_transforms: Vec<NiTransform>,
    /// Present only with [`SKIN_FLAG_HAS_BOUNDS`].
    pub bone_bounds: Vec<BoundingSphere>,
}

impl NiSkinningMeshModifier {
    #[inline]
    pub fn has_bounds(&self) -> bool {
        self.flags & SKIN_FLAG_HAS_BOUNDS != 0
    }
}

impl BlockCodec for NiSkinningMeshModifier {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let submit_points = cur.read_u16_list()?;
        let complete_points = cur.read_u16_list()?;
        let flags = cur.read_u16()?;
        let skeleton_root = cur.read_ref()?;
        let skeleton_transform = cur.read_skin_transform()?;

        let bones = cur.read_ref_list()?;
        let bone_transforms = (0..bones.len())
            .map(|_| cur.read_skin_transform())
            .collect::<Result<Vec<_>>>()?;
        let bone_bounds = if flags & SKIN_FLAG_HAS_BOUNDS != 0 {
            (0..bones.len())
                .map(|_| -> Result<BoundingSphere> { Ok(BoundingSphere::new(cur.read_vec3()?, cur.read_f32()?)) })
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            submit_points,
            complete_points,
            flags,
            skeleton_root,
            skeleton_transform,
            bones,
            bone_transforms,
            bone_bounds,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        w.write_u16_list(&self.submit_points)?;
        w.write_u16_list(&self.complete_points)?;
        w.write_u16(self.flags);
        w.write_ref(self.skeleton_root);
        w.write_skin_transform(&self.skeleton_transform);
        w.write_ref_list(&self.bones)?;
        for i in 0..self.bones.len() {
            w.write_skin_transform(&self.bone_transforms.get(i).copied().unwrap_or_default());
        }
        if self.has_bounds() {
            for i in 0..self.bones.len() {
                let b = self.bone_bounds.get(i).copied().unwrap_or_default();
                w.write_vec3(b.center);
                w.write_f32(b.radius);
            }
        }
        Ok(())
    }
}
