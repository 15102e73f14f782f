//! `NiMesh`: geometry node bound to data streams.

use super::node::AvObject;
use super::BlockCodec;
use crate::format::cursor::{BlockCursor, BlockRef, BlockWriter};
use crate::util::{BoundingSphere, Result};

/// How the index stream assembles primitives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PrimitiveType {
    #[default]
    Triangles = 0,
    TriStrips = 1,
    Lines = 2,
    LineStrips = 3,
    Quads = 4,
    Points = 5,
}

impl PrimitiveType {
    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => Self::Triangles,
            1 => Self::TriStrips,
            2 => Self::Lines,
            3 => Self::LineStrips,
            4 => Self::Quads,
            5 => Self::Points,
            _ => return None,
        })
    }
}

/// Semantic name and channel index of one stream component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Semantic {
    pub name: String,
    pub index: u32,
}

impl Semantic {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self { name: name.into(), index }
    }
}

/// Binding of one data stream to a mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshStream {
    pub stream: BlockRef,
    pub per_instance: bool,
    pub submesh_to_region: Vec<u16>,
    /// One entry per component of the referenced stream.
    pub semantics: Vec<Semantic>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiMesh {
    pub av: AvObject,
    pub materials: Vec<String>,
    pub material_extra_data: Vec<BlockRef>,
    pub active_material: u32,
    pub material_needs_update: bool,
    pub primitive_type: PrimitiveType,
    pub num_submeshes: u16,
    pub instancing: bool,
    pub bound: BoundingSphere,
    pub streams: Vec<MeshStream>,
    pub modifiers: Vec<BlockRef>,
}

impl BlockCodec for NiMesh {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let av = AvObject::decode(cur)?;

        let num_materials = cur.read_count(8)?;
        let materials = (0..num_materials)
            .map(|_| cur.read_string())
            .collect::<Result<Vec<_>>>()?;
        let material_extra_data = (0..num_materials)
            .map(|_| cur.read_ref())
            .collect::<Result<Vec<_>>>()?;

        let active_material = cur.read_u32()?;
        let material_needs_update = cur.read_bool()?;
        let raw_primitive = cur.read_u32()?;
        let primitive_type = PrimitiveType::from_u32(raw_primitive)
            .ok_or_else(|| cur.corrupt(format!("invalid primitive type {}", raw_primitive)))?;
        let num_submeshes = cur.read_u16()?;
        let instancing = cur.read_bool()?;
        let bound = BoundingSphere::new(cur.read_vec3()?, cur.read_f32()?);

        let num_streams = cur.read_count(11)?;
        let mut streams = Vec::with_capacity(num_streams);
        for _ in 0..num_streams {
            let stream = cur.read_ref()?;
            let per_instance = cur.read_bool()?;
            let num_regions = cur.read_u16()? as usize;
            let submesh_to_region = (0..num_regions)
                .map(|_| cur.read_u16())
                .collect::<Result<Vec<_>>>()?;
            let num_semantics = cur.read_count(8)?;
            let semantics = (0..num_semantics)
                .map(|_| -> Result<Semantic> {
                    Ok(Semantic { name: cur.read_string()?, index: cur.read_u32()? })
                })
                .collect::<Result<Vec<_>>>()?;
            streams.push(MeshStream { stream, per_instance, submesh_to_region, semantics });
        }

        Ok(Self {
            av,
            materials,
            material_extra_data,
            active_material,
            material_needs_update,
            primitive_type,
            num_submeshes,
            instancing,
            bound,
            streams,
            modifiers: cur.read_ref_list()?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.av.encode(w)?;

        w.write_count(self.materials.len())?;
        for name in &self.materials {
            w.write_string(name);
        }
        for i in 0..self.materials.len() {
            w.write_ref(self.material_extra_data.get(i).copied().unwrap_or_default());
        }

        w.write_u32(self.active_material);
        w.write_bool(self.material_needs_update);
        w.write_u32(self.primitive_type as u32);
        w.write_u16(self.num_submeshes);
        w.write_bool(self.instancing);
        w.write_vec3(self.bound.center);
        w.write_f32(self.bound.radius);

        w.write_count(self.streams.len())?;
        for s in &self.streams {
            w.write_ref(s.stream);
            w.write_bool(s.per_instance);
            w.write_u16(s.submesh_to_region.len() as u16);
            for r in &s.submesh_to_region {
                w.write_u16(*r);
            }
            w.write_count(s.semantics.len())?;
            for sem in &s.semantics {
                w.write_string(&sem.name);
                w.write_u32(sem.index);
            }
        }

        w.write_ref_list(&self.modifiers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::cursor::StringTable;
    use crate::util::{Endian, Error, Vec3};

    fn sample_mesh() -> NiMesh {
        NiMesh {
            materials: vec!["stone".into()],
            material_extra_data: vec![BlockRef::NONE],
            primitive_type: PrimitiveType::TriStrips,
            num_submeshes: 1,
            bound: BoundingSphere::new(Vec3::new(0.0, 1.0, 0.0), 2.5),
            streams: vec![MeshStream {
                stream: BlockRef::new(3),
                per_instance: false,
                submesh_to_region: vec![0],
                semantics: vec![Semantic::new("POSITION", 0), Semantic::new("TEXCOORD", 1)],
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_mesh_codec() {
        let mesh = sample_mesh();
        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Big, &mut table);
        mesh.encode(&mut w).unwrap();
        let bytes = w.into_bytes();

        let strings = table.as_slice().to_vec();
        let mut cur = BlockCursor::new(&bytes, Endian::Big, &strings, "NiMesh");
        let back = NiMesh::decode(&mut cur).unwrap();
        assert_eq!(cur.remaining(), 0);
        assert_eq!(back, mesh);
    }

    #[test]
    fn test_bad_primitive_type() {
        let mut mesh = sample_mesh();
        mesh.streams.clear();
        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Little, &mut table);
        mesh.encode(&mut w).unwrap();
        let mut bytes = w.into_bytes();

        // primitive type follows av(70) + materials(4+4+4) + active(4) + update(1)
        let offset = 70 + 12 + 5;
        bytes[offset..offset + 4].copy_from_slice(&9u32.to_le_bytes());
        let strings = table.as_slice().to_vec();
        let mut cur = BlockCursor::new(&bytes, Endian::Little, &strings, "NiMesh").with_block(7);
        assert!(matches!(
            NiMesh::decode(&mut cur),
            Err(Error::CorruptBlock { block: 7, .. })
        ));
    }
}
