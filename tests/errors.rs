//! Failure surface: every malformed input is a typed error, never a panic.

use nif::format::blocks::*;
use nif::format::ComponentFormat;
use nif::prelude::*;
use smallvec::smallvec;
use tempfile::Builder;

/// Header fields up to and including the endian byte.
fn preamble(banner: &str, endian_flag: u8) -> Vec<u8> {
    let mut out = banner.as_bytes().to_vec();
    out.push(b'\n');
    out.extend_from_slice(&0x1406_0500u32.to_le_bytes());
    out.push(endian_flag);
    out
}

/// Complete header with no types or blocks and the given group count.
fn header_with_groups(groups: u32) -> Vec<u8> {
    let mut out = preamble("Gamebryo File Format, Version 20.6.5.0", 1);
    for v in [0u32, 0, 0] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&0u16.to_le_bytes());
    for v in [0u32, 0, groups] {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

#[test]
fn test_bad_endian_flag() {
    let mut bytes = header_with_groups(0);
    let flag_at = bytes.iter().position(|&b| b == b'\n').expect("banner") + 5;
    bytes[flag_at] = 7;
    assert!(matches!(Document::from_bytes(&bytes), Err(Error::CorruptHeader(_))));
}

#[test]
fn test_banner_without_marker() {
    let bytes = preamble("Some Other Format 1.0", 1);
    assert!(matches!(Document::from_bytes(&bytes), Err(Error::CorruptHeader(_))));
}

#[test]
fn test_missing_banner_newline() {
    let bytes = vec![b'A'; 5000];
    assert!(matches!(Document::from_bytes(&bytes), Err(Error::CorruptHeader(_))));
}

#[test]
fn test_header_ends_early() {
    let bytes = preamble("Gamebryo File Format, Version 20.6.5.0", 0);
    assert!(matches!(Document::from_bytes(&bytes), Err(Error::CorruptHeader(_))));
}

#[test]
fn test_block_groups_are_unsupported() {
    assert!(Document::from_bytes(&header_with_groups(0)).is_ok());
    assert!(matches!(
        Document::from_bytes(&header_with_groups(2)),
        Err(Error::UnsupportedFeature(_))
    ));
}

#[test]
fn test_huge_block_count_is_rejected() {
    let mut bytes = preamble("Gamebryo File Format, Version 20.6.5.0", 1);
    for v in [0u32, u32::MAX, 0] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes.extend_from_slice(&0u16.to_le_bytes());
    assert!(matches!(Document::from_bytes(&bytes), Err(Error::CorruptHeader(_))));
}

#[test]
fn test_unresolved_child_reference() -> Result<()> {
    let mut doc = Document::default();
    let root = NiNode { children: vec![BlockRef::new(1), BlockRef::new(40)], ..Default::default() };
    doc.push_block(Some("root".into()), BlockPayload::Node(root))?;
    doc.push_block(Some("child".into()), BlockPayload::Node(NiNode::default()))?;

    let parsed = Document::from_bytes(&doc.to_bytes()?)?;
    match link(&parsed, &FormatCache::new()) {
        Err(Error::UnresolvedReference { from, target }) => {
            assert_eq!(from, 0);
            assert_eq!(target, 40);
        }
        other => panic!("expected UnresolvedReference, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_unresolved_string_reference() -> Result<()> {
    let mut doc = Document::default();
    // Source texture whose file name points past the string table.
    let mut body = Vec::new();
    body.extend_from_slice(&u32::MAX.to_le_bytes()); // block name
    body.extend_from_slice(&0u32.to_le_bytes()); // extra data count
    body.extend_from_slice(&u32::MAX.to_le_bytes()); // controller
    body.push(1); // external
    body.extend_from_slice(&99u32.to_le_bytes()); // file name
    body.extend_from_slice(&u32::MAX.to_le_bytes()); // pixel data
    for v in [6u32, 2, 3] {
        body.extend_from_slice(&v.to_le_bytes());
    }
    body.extend_from_slice(&[1, 1, 0]);
    doc.push_raw_block("NiSourceTexture", body);

    match Document::from_bytes(&doc.to_bytes()?) {
        Err(Error::UnresolvedString(99)) => {}
        other => panic!("expected UnresolvedString, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_semantics_component_mismatch() -> Result<()> {
    let mut doc = Document::default();
    let mesh = NiMesh {
        streams: vec![MeshStream {
            stream: BlockRef::new(1),
            semantics: vec![Semantic::new("POSITION", 0)],
            ..Default::default()
        }],
        ..Default::default()
    };
    doc.push_block(Some("mesh".into()), BlockPayload::Mesh(mesh))?;
    doc.push_block(
        None,
        BlockPayload::DataStream(NiDataStream {
            regions: vec![Region { start_index: 0, num_indices: 1 }],
            components: smallvec![ComponentFormat::FLOAT32_3, ComponentFormat::FLOAT32_3],
            data: vec![0; 24],
            ..Default::default()
        }),
    )?;

    let parsed = Document::from_bytes(&doc.to_bytes()?)?;
    assert!(matches!(link(&parsed, &FormatCache::new()), Err(Error::FormatMismatch(_))));
    Ok(())
}

#[test]
fn test_vertex_count_beyond_stream_is_rejected() -> Result<()> {
    let mut doc = Document::default();
    let mesh = NiMesh {
        streams: vec![MeshStream {
            stream: BlockRef::new(1),
            semantics: vec![Semantic::new("POSITION", 0), Semantic::new("NORMAL", 0)],
            ..Default::default()
        }],
        ..Default::default()
    };
    doc.push_block(Some("mesh".into()), BlockPayload::Mesh(mesh))?;
    doc.push_block(
        None,
        BlockPayload::DataStream(NiDataStream {
            regions: vec![Region { start_index: 0, num_indices: u32::MAX }],
            components: smallvec![ComponentFormat::FLOAT32_4, ComponentFormat::FLOAT32_4],
            data: vec![0; 32],
            ..Default::default()
        }),
    )?;

    // A few hundred bytes must not turn into a huge allocation.
    let parsed = Document::from_bytes(&doc.to_bytes()?)?;
    assert!(matches!(link(&parsed, &FormatCache::new()), Err(Error::FormatMismatch(_))));
    Ok(())
}

#[test]
fn test_index_count_beyond_stream_is_rejected() -> Result<()> {
    let mut doc = Document::default();
    let mesh = NiMesh {
        streams: vec![MeshStream { stream: BlockRef::new(1), ..Default::default() }],
        ..Default::default()
    };
    doc.push_block(Some("mesh".into()), BlockPayload::Mesh(mesh))?;
    doc.push_block(
        None,
        BlockPayload::DataStream(NiDataStream {
            usage: StreamUsage::IndexBuffer,
            regions: vec![Region { start_index: 0, num_indices: u32::MAX }],
            components: smallvec![ComponentFormat::UINT16_1],
            data: vec![0; 6],
            ..Default::default()
        }),
    )?;

    let parsed = Document::from_bytes(&doc.to_bytes()?)?;
    assert!(matches!(link(&parsed, &FormatCache::new()), Err(Error::FormatMismatch(_))));
    Ok(())
}

#[test]
fn test_unknown_component_tag_degrades() -> Result<()> {
    let mut doc = Document::default();
    doc.push_block(
        None,
        BlockPayload::DataStream(NiDataStream {
            regions: vec![Region { start_index: 0, num_indices: 0 }],
            components: smallvec![ComponentFormat(0xDEAD_BEEF)],
            data: Vec::new(),
            ..Default::default()
        }),
    )?;
    let parsed = Document::from_bytes(&doc.to_bytes()?)?;
    let BlockPayload::DataStream(stream) = &parsed.blocks[0].payload else {
        panic!("not a data stream");
    };
    let info = stream.components[0].info();
    assert!(!info.is_known());
    assert_eq!(info.size(), 0);
    Ok(())
}

#[test]
fn test_bad_type_index_is_corrupt_block() -> Result<()> {
    let mut doc = Document::default();
    doc.push_raw_block("NiCamera", vec![0; 4]);
    let mut bytes = doc.to_bytes()?;
    // The single type index sits right after the one type name.
    let name_end = bytes.windows(8).position(|w| w == b"NiCamera").expect("type name") + 8;
    bytes[name_end..name_end + 2].copy_from_slice(&5u16.to_le_bytes());
    assert!(matches!(
        Document::from_bytes(&bytes),
        Err(Error::CorruptBlock { block: 0, .. })
    ));
    Ok(())
}

#[test]
fn test_missing_file_and_extension() {
    let cache = FormatCache::new();
    assert!(matches!(load_package("/no/such/dir/model.nif", &cache), Err(Error::FileNotFound(_))));
    assert!(matches!(load_package("model.fbx", &cache), Err(Error::UnsupportedExtension(_))));

    let temp = Builder::new().suffix(".kf").tempfile().expect("Failed to create temp file");
    save_package(&Package::new(), temp.path(), &WriteOptions::default()).expect("save");
    assert!(load_package(temp.path(), &cache).expect("load").is_empty());
}
