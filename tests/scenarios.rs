//! Documents built block by block, checked through parse and link.

use nif::format::blocks::*;
use nif::format::constants::NO_STRING;
use nif::format::ComponentFormat;
use nif::prelude::*;
use smallvec::smallvec;

/// Minimal little-endian header with the given type names, no blocks.
fn empty_header(types: &[&str]) -> Vec<u8> {
    let mut out = b"Gamebryo File Format, Version 20.6.5.0\n".to_vec();
    out.extend_from_slice(&0x1406_0500u32.to_le_bytes());
    out.push(1);
    out.extend_from_slice(&0u32.to_le_bytes()); // user version
    out.extend_from_slice(&0u32.to_le_bytes()); // blocks
    out.extend_from_slice(&0u32.to_le_bytes()); // metadata
    out.extend_from_slice(&(types.len() as u16).to_le_bytes());
    for t in types {
        out.extend_from_slice(&(t.len() as u32).to_le_bytes());
        out.extend_from_slice(t.as_bytes());
    }
    out.extend_from_slice(&0u32.to_le_bytes()); // strings
    out.extend_from_slice(&0u32.to_le_bytes()); // max length
    out.extend_from_slice(&0u32.to_le_bytes()); // groups
    out
}

fn relink(doc: &Document) -> Result<Package> {
    let bytes = doc.to_bytes()?;
    let parsed = Document::from_bytes(&bytes)?;
    link(&parsed, &FormatCache::new())
}

#[test]
fn test_zero_block_types_is_empty_package() -> Result<()> {
    let doc = Document::from_bytes(&empty_header(&[]))?;
    assert!(doc.is_empty());
    let package = link(&doc, &FormatCache::new())?;
    assert!(package.is_empty());
    Ok(())
}

#[test]
fn test_unused_type_names_are_kept() -> Result<()> {
    let doc = Document::from_bytes(&empty_header(&["NiNode", "NiCamera"]))?;
    assert_eq!(doc.block_types, vec!["NiNode", "NiCamera"]);
    assert!(link(&doc, &FormatCache::new())?.nodes.is_empty());
    Ok(())
}

#[test]
fn test_sentinel_child_contributes_nothing() -> Result<()> {
    let mut doc = Document::default();
    let root = NiNode { children: vec![BlockRef::new(1), BlockRef::NONE], ..Default::default() };
    doc.push_block(Some("root".into()), BlockPayload::Node(root))?;
    doc.push_block(Some("a".into()), BlockPayload::Node(NiNode::default()))?;
    doc.push_block(Some("b".into()), BlockPayload::Node(NiNode::default()))?;

    let package = relink(&doc)?;
    let parents: Vec<_> = package.nodes.iter().map(|n| n.attached_to).collect();
    assert_eq!(parents, vec![None, Some(0), None]);
    Ok(())
}

#[test]
fn test_three_semantics_one_binding() -> Result<()> {
    let mut doc = Document::new(Endian::Big);
    let semantics = vec![Semantic::new("POSITION", 0), Semantic::new("NORMAL", 0), Semantic::new("TEXCOORD", 0)];
    let mesh = NiMesh {
        streams: vec![MeshStream { stream: BlockRef::new(1), semantics, ..Default::default() }],
        ..Default::default()
    };
    doc.push_block(Some("mesh".into()), BlockPayload::Mesh(mesh))?;
    let floats = [0.0f32, 1.0, 2.0, 0.0, 1.0, 0.0, 0.5, 0.5, 3.0, 4.0, 5.0, 0.0, 0.0, 1.0, 1.0, 0.0];
    doc.push_block(
        None,
        BlockPayload::DataStream(NiDataStream {
            regions: vec![Region { start_index: 0, num_indices: 2 }],
            components: smallvec![ComponentFormat::FLOAT32_3, ComponentFormat::FLOAT32_3, ComponentFormat::FLOAT32_2],
            data: floats.iter().flat_map(|f| f.to_be_bytes()).collect(),
            ..Default::default()
        }),
    )?;

    let package = relink(&doc)?;
    let mesh = package.nodes[0].mesh.as_ref().expect("mesh");
    let attrs: Vec<_> = mesh
        .format()
        .attributes()
        .iter()
        .map(|a| (a.name.as_str(), a.binding, a.offset))
        .collect();
    assert_eq!(attrs, vec![("position", 0, 0), ("normal", 0, 12), ("textureCoords", 0, 24)]);
    assert_eq!(
        mesh.read_attribute::<f32>("position").expect("positions"),
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]
    );
    Ok(())
}

#[test]
fn test_second_texcoord_channel_gets_suffix() -> Result<()> {
    let mut doc = Document::default();
    let mesh = NiMesh {
        streams: vec![
            MeshStream {
                stream: BlockRef::new(1),
                semantics: vec![Semantic::new("TEXCOORD", 0)],
                ..Default::default()
            },
            MeshStream {
                stream: BlockRef::new(1),
                semantics: vec![Semantic::new("TEXCOORD", 1)],
                ..Default::default()
            },
        ],
        ..Default::default()
    };
    doc.push_block(Some("mesh".into()), BlockPayload::Mesh(mesh))?;
    doc.push_block(
        None,
        BlockPayload::DataStream(NiDataStream {
            regions: vec![Region { start_index: 0, num_indices: 1 }],
            components: smallvec![ComponentFormat::FLOAT32_2],
            data: vec![0; 8],
            ..Default::default()
        }),
    )?;

    let package = relink(&doc)?;
    let format = package.nodes[0].format().expect("format");
    let names: Vec<_> = format.attributes().iter().map(|a| (a.name.as_str(), a.binding)).collect();
    assert_eq!(names, vec![("textureCoords", 0), ("textureCoords1", 1)]);
    Ok(())
}

#[test]
fn test_texture_and_material_property_share_slot() -> Result<()> {
    let mut doc = Document::default();
    let mut mesh = NiMesh { materials: vec!["Wood".into()], material_extra_data: vec![BlockRef::NONE], ..Default::default() };
    mesh.av.properties = vec![BlockRef::new(1), BlockRef::new(4)];
    doc.push_block(Some("table".into()), BlockPayload::Mesh(mesh))?;

    let mut texturing = NiTexturingProperty::default();
    texturing.set_slot(TextureSlot::Base, Some(TexDesc { source: BlockRef::new(2), ..Default::default() }));
    texturing.set_slot(TextureSlot::Gloss, Some(TexDesc { source: BlockRef::new(3), ..Default::default() }));
    doc.push_block(Some("WoodShader".into()), BlockPayload::TexturingProperty(texturing))?;
    doc.push_block(None, BlockPayload::SourceTexture(NiSourceTexture::external("wood.dds")))?;
    doc.push_block(None, BlockPayload::SourceTexture(NiSourceTexture::external("wood_s.dds")))?;
    let props = NiMaterialProperty {
        diffuse: Color3::new(0.8, 0.6, 0.4),
        emissive: Color3::new(0.0, 0.0, 0.1),
        alpha: 0.75,
        ..Default::default()
    };
    doc.push_block(Some("WoodMaterial".into()), BlockPayload::MaterialProperty(props))?;

    let package = relink(&doc)?;
    assert_eq!(package.materials.len(), 1);
    assert_eq!(package.nodes[0].material, Some(0));
    let m = &package.materials[0];
    assert_eq!(m.name, "Wood");
    assert_eq!(m.shader_name, "WoodShader");
    assert_eq!(m.diffuse.as_deref(), Some("wood.dds"));
    assert_eq!(m.specular.as_deref(), Some("wood_s.dds"));
    assert_eq!(m.normal, None);
    assert_eq!(m.diffuse_color, Color3::new(0.8, 0.6, 0.4));
    assert_eq!(m.emissive_color, Color3::new(0.0, 0.0, 0.1));
    assert_eq!(m.alpha, 0.75);
    Ok(())
}

#[test]
fn test_shader_slot_zero_feeds_override() -> Result<()> {
    let mut doc = Document::default();
    let mut mesh = NiMesh { materials: vec!["Glow".into()], material_extra_data: vec![BlockRef::NONE], ..Default::default() };
    mesh.av.properties = vec![BlockRef::new(1)];
    doc.push_block(Some("lamp".into()), BlockPayload::Mesh(mesh))?;

    let mut texturing = NiTexturingProperty::default();
    let map = |i: u32| ShaderTexture {
        map: Some(TexDesc { source: BlockRef::new(i), ..Default::default() }),
        map_id: i,
    };
    texturing.shader_textures = vec![map(2), map(3)];
    doc.push_block(None, BlockPayload::TexturingProperty(texturing))?;
    doc.push_block(None, BlockPayload::SourceTexture(NiSourceTexture::external("tint.dds")))?;
    doc.push_block(None, BlockPayload::SourceTexture(NiSourceTexture::external("ignored.dds")))?;

    let package = relink(&doc)?;
    let m = &package.materials[0];
    assert_eq!(m.override_color.as_deref(), Some("tint.dds"));
    assert_eq!(m.textures().iter().flatten().count(), 1);
    Ok(())
}

#[test]
fn test_unclaimed_properties_do_not_create_materials() -> Result<()> {
    let mut doc = Document::default();
    doc.push_block(None, BlockPayload::TexturingProperty(NiTexturingProperty::default()))?;
    doc.push_block(None, BlockPayload::MaterialProperty(NiMaterialProperty::default()))?;
    doc.push_block(None, BlockPayload::SourceTexture(NiSourceTexture::external("x.dds")))?;
    let package = relink(&doc)?;
    assert!(package.is_empty());
    Ok(())
}

#[test]
fn test_truncated_data_stream_is_size_mismatch() -> Result<()> {
    let mut doc = Document::default();
    doc.push_block(
        None,
        BlockPayload::DataStream(NiDataStream {
            regions: vec![Region { start_index: 0, num_indices: 4 }],
            components: smallvec![ComponentFormat::FLOAT32_3],
            data: vec![0; 48],
            ..Default::default()
        }),
    )?;
    let bytes = doc.to_bytes()?;
    let body_len = Document::from_bytes(&bytes)?.blocks[0].size;

    // Layout tail: size array, string count, max length, group count, body.
    let size_at = bytes.len() - body_len as usize - 12 - 4;
    let mut cut = bytes[..bytes.len() - 16].to_vec();
    cut[size_at..size_at + 4].copy_from_slice(&(body_len - 16).to_le_bytes());

    match Document::from_bytes(&cut) {
        Err(Error::BlockSizeMismatch { block: 0, declared, consumed }) => {
            assert_eq!(declared, body_len - 16);
            assert!(consumed > declared as u64);
        }
        other => panic!("expected BlockSizeMismatch, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_opaque_blocks_survive() -> Result<()> {
    let mut doc = Document::default();
    doc.push_raw_block("NiCamera", vec![1, 2, 3, 4, 5]);
    doc.push_raw_block("NiNode", NO_STRING.to_le_bytes().to_vec());
    doc.push_block(Some("root".into()), BlockPayload::Node(NiNode::default()))?;

    let parsed = Document::from_bytes(&doc.to_bytes()?)?;
    assert_eq!(parsed.blocks[0].payload, BlockPayload::Unknown(vec![1, 2, 3, 4, 5]));
    assert!(parsed.blocks[1].payload.is_unknown());
    let package = link(&parsed, &FormatCache::new())?;
    assert_eq!(package.nodes.len(), 1);
    Ok(())
}

#[test]
fn test_forest_invariant_holds() -> Result<()> {
    // Children listed out of order, including one pointing backwards.
    let mut doc = Document::default();
    let root = NiNode { children: vec![BlockRef::new(3), BlockRef::new(1)], ..Default::default() };
    doc.push_block(Some("root".into()), BlockPayload::Node(root))?;
    let mid = NiNode { children: vec![BlockRef::new(0), BlockRef::new(2)], ..Default::default() };
    doc.push_block(Some("mid".into()), BlockPayload::Node(mid))?;
    doc.push_block(Some("leaf".into()), BlockPayload::Node(NiNode::default()))?;
    doc.push_block(Some("late".into()), BlockPayload::Node(NiNode::default()))?;

    let package = relink(&doc)?;
    package.validate()?;
    for (i, node) in package.nodes.iter().enumerate() {
        if let Some(p) = node.attached_to {
            assert!(p < i, "node {} has parent {}", i, p);
        }
    }
    assert_eq!(package.nodes[0].attached_to, None);
    assert_eq!(package.nodes[2].attached_to, Some(1));
    assert_eq!(package.nodes[3].attached_to, Some(0));
    Ok(())
}
