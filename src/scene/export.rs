//! Package to document encoder, the inverse of [`link`](super::link).
//!
//! Block order per package node:
//!
//! ```text
//! NiNode | NiMesh, index stream, vertex stream per binding
//!        [NiTexturingProperty, NiSourceTexture..., NiMaterialProperty]
//!         ^ only the first time a material slot is used
//! ```
//!
//! Parents precede children in the package, so every parent entry the linker
//! needs is recorded before the block it points at.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::{debug, debug_span};

use super::link::ATTRIBUTE_ALIASES;
use super::mesh::{MeshData, VertexAttributeFormat};
use super::package::{Material, Package};
use crate::format::blocks::{
    MeshStream, NiDataStream, NiMaterialProperty, NiMesh, NiNode, NiSourceTexture, NiTexturingProperty, Region,
    Semantic, ShaderTexture, StreamUsage, TexDesc, TextureSlot,
};
use crate::format::{BlockPayload, BlockRef, ComponentFormat, Document, WriteOptions};
use crate::util::{BoundingSphere, Endian, Error, Result, Vec3};

/// Stream semantic for an attribute name; undoes the linker's aliasing and
/// index suffix (`textureCoords1` gives `TEXCOORD`, 1).
pub fn semantic_for_attribute(name: &str) -> Semantic {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    let (base, index) = match name.split_at(name.len() - digits) {
        (base, suffix) if !base.is_empty() && !suffix.starts_with('0') => match suffix.parse::<u32>() {
            Ok(index) => (base, index),
            Err(_) => (name, 0),
        },
        _ => (name, 0),
    };
    let semantic = ATTRIBUTE_ALIASES
        .iter()
        .find(|(_, to)| *to == base)
        .map(|(from, _)| *from)
        .unwrap_or(base);
    Semantic::new(semantic, index)
}

/// Build a document that links back into an equivalent package.
pub fn export(package: &Package, options: &WriteOptions) -> Result<Document> {
    let _span = debug_span!("nif_export", nodes = package.nodes.len()).entered();
    package.validate()?;

    let mut doc = Document::new(options.endian);
    doc.apply_options(options);

    let mut node_blocks: Vec<u32> = Vec::with_capacity(package.nodes.len());
    // Block indices of (texturing property, material property) per material slot.
    let mut material_blocks: HashMap<usize, (u32, u32)> = HashMap::new();

    for node in &package.nodes {
        let Some(mesh) = &node.mesh else {
            let mut ni = NiNode::default();
            ni.av.transform = node.transform;
            node_blocks.push(doc.push_block(Some(node.name.clone()), BlockPayload::Node(ni))?);
            continue;
        };

        let mesh_index = doc.len() as u32;
        let streams = encode_streams(mesh, options.endian)?;

        let material = node
            .material
            .and_then(|slot| package.materials.get(slot).map(|m| (slot, m)));
        let first_material_block = mesh_index + 1 + streams.len() as u32;
        let (properties, new_material) = match material {
            Some((slot, _)) if material_blocks.contains_key(&slot) => {
                let (texturing, props) = material_blocks[&slot];
                (vec![BlockRef::new(texturing), BlockRef::new(props)], None)
            }
            Some((slot, m)) => {
                let blocks = material_payloads(m, first_material_block);
                let texturing = first_material_block;
                let props = first_material_block + blocks.len() as u32 - 1;
                material_blocks.insert(slot, (texturing, props));
                (vec![BlockRef::new(texturing), BlockRef::new(props)], Some(blocks))
            }
            None => (Vec::new(), None),
        };

        let mut ni = NiMesh {
            materials: material.map(|(_, m)| vec![m.name.clone()]).unwrap_or_default(),
            material_extra_data: material.map(|_| vec![BlockRef::NONE]).unwrap_or_default(),
            num_submeshes: 1,
            bound: mesh_bound(mesh),
            ..Default::default()
        };
        ni.av.transform = node.transform;
        ni.av.properties = properties;
        ni.streams = streams
            .iter()
            .enumerate()
            .map(|(i, (semantics, _))| MeshStream {
                stream: BlockRef::new(mesh_index + 1 + i as u32),
                per_instance: false,
                submesh_to_region: vec![0],
                semantics: semantics.clone(),
            })
            .collect();

        node_blocks.push(doc.push_block(Some(node.name.clone()), BlockPayload::Mesh(ni))?);
        for (_, stream) in streams {
            doc.push_block(None, BlockPayload::DataStream(stream))?;
        }
        for (name, payload) in new_material.into_iter().flatten() {
            doc.push_block(name, payload)?;
        }
    }

    attach_children(package, &node_blocks, &mut doc)?;
    debug!(blocks = doc.len(), materials = material_blocks.len(), "package exported");
    Ok(doc)
}

/// Fill in the child lists of parent nodes.
fn attach_children(package: &Package, node_blocks: &[u32], doc: &mut Document) -> Result<()> {
    let mut children: HashMap<usize, Vec<BlockRef>> = HashMap::new();
    for (i, node) in package.nodes.iter().enumerate() {
        if let Some(parent) = node.attached_to {
            children.entry(parent).or_default().push(BlockRef::new(node_blocks[i]));
        }
    }
    for (parent, refs) in children {
        let block = &mut doc.blocks[node_blocks[parent] as usize];
        match &mut block.payload {
            BlockPayload::Node(ni) => ni.children = refs,
            _ => {
                return Err(Error::UnsupportedFeature(format!(
                    "mesh node {} ({}) can not have children",
                    parent, package.nodes[parent].name
                )))
            }
        }
    }
    Ok(())
}

fn mesh_bound(mesh: &MeshData) -> BoundingSphere {
    let Some(values) = mesh.read_attribute::<f32>("position") else {
        return BoundingSphere::default();
    };
    let per_vertex = mesh
        .format()
        .attribute("position")
        .map(|a| a.element_count as usize)
        .unwrap_or(3);
    if per_vertex < 3 {
        return BoundingSphere::default();
    }
    let points: Vec<Vec3> = values.chunks_exact(per_vertex).map(|c| Vec3::new(c[0], c[1], c[2])).collect();
    BoundingSphere::from_points(&points)
}

fn component_for(attr: &VertexAttributeFormat) -> Result<ComponentFormat> {
    ComponentFormat::canonical(attr.data_type, attr.element_count).ok_or_else(|| {
        Error::UnsupportedComponentFormat(format!(
            "{} has {} x {} elements",
            attr.name, attr.element_count, attr.data_type
        ))
    })
}

/// Index stream followed by one vertex stream per binding, data in `endian`.
fn encode_streams(mesh: &MeshData, endian: Endian) -> Result<Vec<(Vec<Semantic>, NiDataStream)>> {
    let mut out = Vec::with_capacity(1 + mesh.format().num_bindings());

    let mut index_data = vec![0u8; mesh.indices().len() * 4];
    for (chunk, index) in index_data.chunks_exact_mut(4).zip(mesh.indices()) {
        endian.write_i32(chunk, *index);
    }
    out.push((
        Vec::new(),
        NiDataStream {
            usage: StreamUsage::IndexBuffer,
            regions: vec![Region { start_index: 0, num_indices: mesh.indices().len() as u32 }],
            components: SmallVec::from_elem(ComponentFormat::INT32_1, 1),
            data: index_data,
            ..Default::default()
        },
    ));

    let format = mesh.format();
    for binding in 0..format.num_bindings() as u32 {
        let attrs: Vec<&VertexAttributeFormat> =
            format.attributes().iter().filter(|a| a.binding == binding).collect();
        let components = attrs
            .iter()
            .map(|a| component_for(a))
            .collect::<Result<SmallVec<[ComponentFormat; 4]>>>()?;
        let semantics = attrs.iter().map(|a| semantic_for_attribute(&a.name)).collect();

        let src = mesh.buffer(binding).unwrap_or_default();
        let mut data = vec![0u8; src.len()];
        let stride = format.stride(binding);
        for v in 0..mesh.vertex_count() {
            for attr in &attrs {
                let elem = attr.data_type.num_bytes();
                for e in 0..attr.element_count as usize {
                    let at = v * stride + attr.offset as usize + e * elem;
                    attr.data_type.convert(
                        &src[at..at + elem],
                        Endian::Little,
                        attr.data_type,
                        &mut data[at..at + elem],
                        endian,
                    );
                }
            }
        }

        out.push((
            semantics,
            NiDataStream {
                usage: StreamUsage::VertexBuffer,
                regions: vec![Region { start_index: 0, num_indices: mesh.vertex_count() as u32 }],
                components,
                data,
                ..Default::default()
            },
        ));
    }
    Ok(out)
}

/// Texturing property, one source texture per path, then the material
/// property. `first` is the block index the texturing property will get.
fn material_payloads(material: &Material, first: u32) -> Vec<(Option<String>, BlockPayload)> {
    let mut texturing = NiTexturingProperty::default();
    let mut blocks = Vec::new();
    let mut next = first + 1;
    let mut source = |path: &Option<String>, blocks: &mut Vec<(Option<String>, BlockPayload)>| {
        let path = path.as_deref().filter(|p| !p.is_empty())?;
        let index = next;
        next += 1;
        blocks.push((None, BlockPayload::SourceTexture(NiSourceTexture::external(path))));
        Some(TexDesc { source: BlockRef::new(index), ..Default::default() })
    };

    let diffuse = source(&material.diffuse, &mut blocks);
    let normal = source(&material.normal, &mut blocks);
    let specular = source(&material.specular, &mut blocks);
    let override_color = source(&material.override_color, &mut blocks);

    texturing.set_slot(TextureSlot::Base, diffuse);
    texturing.set_slot(TextureSlot::Normal, normal);
    texturing.set_slot(TextureSlot::Gloss, specular);
    if let Some(map) = override_color {
        texturing.shader_textures.push(ShaderTexture { map: Some(map), map_id: 0 });
    }

    let shader_name = Some(material.shader_name.clone()).filter(|s| !s.is_empty());
    blocks.insert(0, (shader_name, BlockPayload::TexturingProperty(texturing)));
    blocks.push((
        Some(material.name.clone()),
        BlockPayload::MaterialProperty(NiMaterialProperty {
            ambient: material.ambient_color,
            diffuse: material.diffuse_color,
            specular: material.specular_color,
            emissive: material.emissive_color,
            glossiness: material.shininess,
            alpha: material.alpha,
            ..Default::default()
        }),
    ));
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::cache::FormatCache;
    use crate::scene::link::link;
    use crate::scene::mesh::MeshFormat;
    use crate::scene::package::Node;
    use crate::util::AttributeDataType::*;
    use std::sync::Arc;

    fn triangle(format: Arc<MeshFormat>) -> MeshData {
        let mut mesh = MeshData::new(format, 3);
        mesh.write_attribute("position", &[0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        mesh.set_indices(vec![0, 1, 2]);
        mesh
    }

    fn scene() -> Package {
        let mut format = MeshFormat::new();
        format.push(Float32, 3, "position", 0).push(UInt16, 2, "textureCoords1", 1);
        let format = Arc::new(format);

        let mut material = Material::new("Brick");
        material.shader_name = "Phong".into();
        material.diffuse = Some("brick.dds".into());
        material.override_color = Some("tint.dds".into());
        material.alpha = 0.5;

        Package {
            nodes: vec![
                Node::new("root"),
                Node {
                    name: "wall".into(),
                    attached_to: Some(0),
                    material: Some(0),
                    mesh: Some(triangle(Arc::clone(&format))),
                    ..Default::default()
                },
                Node {
                    name: "wall2".into(),
                    attached_to: Some(0),
                    material: Some(0),
                    mesh: Some(triangle(format)),
                    ..Default::default()
                },
            ],
            materials: vec![material, Material::new("unused")],
        }
    }

    #[test]
    fn test_semantic_for_attribute() {
        assert_eq!(semantic_for_attribute("position"), Semantic::new("POSITION", 0));
        assert_eq!(semantic_for_attribute("textureCoords1"), Semantic::new("TEXCOORD", 1));
        assert_eq!(semantic_for_attribute("COLOR2"), Semantic::new("COLOR", 2));
        assert_eq!(semantic_for_attribute("uv0"), Semantic::new("uv0", 0));
        assert_eq!(semantic_for_attribute("42"), Semantic::new("42", 0));
    }

    #[test]
    fn test_block_layout() {
        let doc = export(&scene(), &WriteOptions::default()).unwrap();
        let kinds: Vec<_> = doc.blocks.iter().map(|b| b.payload.kind()).collect();
        assert_eq!(doc.blocks[0].type_tag, "NiNode");
        // wall: mesh, 3 streams, texturing, 2 sources, material; wall2: mesh, 3 streams
        assert_eq!(doc.len(), 1 + 8 + 4);
        assert_eq!(kinds[1], doc.blocks[9].payload.kind());
        if let BlockPayload::Node(root) = &doc.blocks[0].payload {
            assert_eq!(root.children, vec![BlockRef::new(1), BlockRef::new(9)]);
        } else {
            panic!("root is not a node");
        }
        if let BlockPayload::Mesh(wall2) = &doc.blocks[9].payload {
            assert_eq!(wall2.av.properties, vec![BlockRef::new(5), BlockRef::new(8)]);
            assert!(wall2.bound.radius > 0.0);
        } else {
            panic!("wall2 is not a mesh");
        }
    }

    #[test]
    fn test_export_links_back() {
        let original = scene();
        let doc = export(&original, &WriteOptions::default().with_endian(Endian::Big)).unwrap();
        let pkg = link(&doc, &FormatCache::new()).unwrap();

        assert_eq!(pkg.nodes.len(), 3);
        assert_eq!(pkg.nodes[2].attached_to, Some(0));
        assert_eq!(pkg.materials.len(), 1);
        let m = &pkg.materials[0];
        assert_eq!(m.name, "Brick");
        assert_eq!(m.shader_name, "Phong");
        assert_eq!(m.diffuse.as_deref(), Some("brick.dds"));
        assert_eq!(m.override_color.as_deref(), Some("tint.dds"));
        assert_eq!(m.alpha, 0.5);

        let mesh = pkg.nodes[1].mesh.as_ref().unwrap();
        let names: Vec<_> = mesh.format().attributes().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["position", "textureCoords1"]);
        assert_eq!(mesh.indices(), &[0, 1, 2]);
        assert_eq!(
            mesh.read_attribute::<f32>("position"),
            original.nodes[1].mesh.as_ref().unwrap().read_attribute::<f32>("position")
        );
    }

    #[test]
    fn test_mesh_parent_is_rejected() {
        let mut pkg = scene();
        pkg.nodes[2].attached_to = Some(1);
        let err = export(&pkg, &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFeature(_)));
    }

    #[test]
    fn test_unknown_attribute_type_fails() {
        let mut format = MeshFormat::new();
        format.push(Unknown, 1, "blob", 0);
        let mut pkg = Package::new();
        pkg.nodes.push(Node { mesh: Some(MeshData::new(Arc::new(format), 1)), ..Default::default() });
        let err = export(&pkg, &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedComponentFormat(_)));
    }
}
