//! Pass 2: turn a decoded [`Document`] into a [`Package`].
//!
//! Blocks are visited once, in file order. A block that references a later
//! block leaves a *parent entry* keyed by the later block's index; when the
//! walk reaches that block, the entry says which package slot claims it:
//!
//! ```text
//! NiNode ──children──▶ Node(slot)        node parent index
//! NiMesh ──properties─▶ Material(slot)   texturing + material property
//! NiTexturingProperty ──sources──▶ Material(slot) + texture link
//! ```
//!
//! Entries only ever point at slots that already exist, so node parents always
//! precede their children.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, debug_span, warn};

use super::cache::FormatCache;
use super::mesh::{read_indices, MeshData, MeshFormat};
use super::package::{Material, Node, Package};
use crate::format::blocks::{
    AvObject, NiDataStream, NiMaterialProperty, NiMesh, NiNode, NiSourceTexture, NiTexturingProperty,
    StreamUsage, TextureSlot,
};
use crate::format::{Block, BlockPayload, BlockRef, Document};
use crate::util::{Endian, Error, Result};

/// Semantic names rewritten to engine attribute names.
pub const ATTRIBUTE_ALIASES: &[(&str, &str)] = &[
    ("POSITION", "position"),
    ("POSITION_BP", "position"),
    ("NORMAL", "normal"),
    ("NORMAL_BP", "normal"),
    ("TEXCOORD", "textureCoords"),
    ("BINORMAL", "binormal"),
    ("TANGENT", "tangent"),
    ("MORPH_POSITION", "morphPosition"),
];

/// Attribute name for a stream semantic: aliased, then suffixed with a
/// nonzero semantic index (`TEXCOORD`, 1 gives `textureCoords1`).
pub fn attribute_name(semantic: &str, index: u32) -> String {
    let base = ATTRIBUTE_ALIASES
        .iter()
        .find(|(from, _)| *from == semantic)
        .map(|(_, to)| *to)
        .unwrap_or(semantic);
    if index == 0 {
        base.to_string()
    } else {
        format!("{}{}", base, index)
    }
}

/// Which package slot a not-yet-visited block belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParentEntry {
    Node(usize),
    Material(usize),
}

/// Material field a source texture is written into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum TextureLink {
    Diffuse = 0,
    Normal = 1,
    Specular = 2,
    OverrideColor = 3,
}

/// Texturing slots that feed material fields, in the order they are linked.
const LINKED_SLOTS: [(TextureSlot, TextureLink); 3] = [
    (TextureSlot::Base, TextureLink::Diffuse),
    (TextureSlot::Gloss, TextureLink::Specular),
    (TextureSlot::Normal, TextureLink::Normal),
];

/// Link a decoded document into a package, interning vertex formats in `cache`.
pub fn link(doc: &Document, cache: &FormatCache) -> Result<Package> {
    Linker::new(doc, cache).run()
}

/// Pass 2 state for one document.
pub struct Linker<'a> {
    doc: &'a Document,
    cache: &'a FormatCache,
    package: Package,
    parent_entries: HashMap<u32, ParentEntry>,
    texture_links: HashMap<u32, TextureLink>,
}

impl<'a> Linker<'a> {
    pub fn new(doc: &'a Document, cache: &'a FormatCache) -> Self {
        Self {
            doc,
            cache,
            package: Package::new(),
            parent_entries: HashMap::new(),
            texture_links: HashMap::new(),
        }
    }

    pub fn run(mut self) -> Result<Package> {
        let _span = debug_span!("nif_link", blocks = self.doc.len()).entered();
        let doc = self.doc;
        for (index, block) in doc.blocks.iter().enumerate() {
            let index = index as u32;
            match &block.payload {
                BlockPayload::Node(node) => self.link_node(index, block, node)?,
                BlockPayload::Mesh(mesh) => self.link_mesh(index, block, mesh)?,
                BlockPayload::TexturingProperty(prop) => self.link_texturing(index, prop)?,
                BlockPayload::SourceTexture(tex) => self.link_source_texture(index, tex),
                BlockPayload::MaterialProperty(prop) => self.link_material_property(index, prop),
                _ => {}
            }
        }
        debug!(
            nodes = self.package.nodes.len(),
            materials = self.package.materials.len(),
            "linked package"
        );
        Ok(self.package)
    }

    /// Resolve `target` (referenced from block `from`) to its block.
    fn resolve(&self, from: u32, target: BlockRef) -> Result<Option<&'a Block>> {
        let Some(idx) = target.index() else {
            return Ok(None);
        };
        self.doc
            .block(idx)
            .map(Some)
            .ok_or(Error::UnresolvedReference { from, target: idx })
    }

    fn node_parent(&self, index: u32) -> Option<usize> {
        match self.parent_entries.get(&index) {
            Some(ParentEntry::Node(slot)) => Some(*slot),
            Some(ParentEntry::Material(_)) => {
                warn!(block = index, "scene object is claimed by a material, treating as root");
                None
            }
            None => None,
        }
    }

    fn material_entry(&self, index: u32, kind: &str) -> Option<usize> {
        match self.parent_entries.get(&index) {
            Some(ParentEntry::Material(slot)) => Some(*slot),
            Some(ParentEntry::Node(_)) => {
                warn!(block = index, kind, "property is listed as a child node, skipping");
                None
            }
            None => None,
        }
    }

    fn push_node(&mut self, index: u32, block: &Block, av: &AvObject, material: Option<usize>, mesh: Option<MeshData>) {
        // Read before recording children so a node listing itself stays a root.
        let attached_to = self.node_parent(index);
        self.package.nodes.push(Node {
            name: block.name.clone().unwrap_or_default(),
            attached_to,
            material,
            mesh,
            transform: av.transform,
        });
    }

    fn link_node(&mut self, index: u32, block: &Block, node: &NiNode) -> Result<()> {
        let slot = self.package.nodes.len();
        self.push_node(index, block, &node.av, None, None);
        for child in node.live_children() {
            if self.doc.block(child).is_none() {
                return Err(Error::UnresolvedReference { from: index, target: child });
            }
            self.parent_entries.insert(child, ParentEntry::Node(slot));
        }
        Ok(())
    }

    fn link_mesh(&mut self, index: u32, block: &Block, mesh: &NiMesh) -> Result<()> {
        let material = self.claim_material(index, mesh)?;
        let data = self.assemble_mesh(index, mesh)?;
        self.push_node(index, block, &mesh.av, material, Some(data));
        Ok(())
    }

    /// Allocate or reuse the material slot defined by the mesh's texturing
    /// property; the last one listed wins.
    fn claim_material(&mut self, index: u32, mesh: &NiMesh) -> Result<Option<usize>> {
        let Some(material_name) = mesh.materials.first() else {
            return Ok(None);
        };

        let mut material = None;
        let mut material_props = Vec::new();
        for &prop in &mesh.av.properties {
            let Some(target) = self.resolve(index, prop)? else {
                continue;
            };
            let prop = prop.raw();
            match &target.payload {
                BlockPayload::TexturingProperty(_) => {
                    let slot = match self.parent_entries.get(&prop) {
                        Some(ParentEntry::Material(slot)) => *slot,
                        _ => {
                            let slot = self.package.materials.len();
                            let mut m = Material::new(material_name.clone());
                            m.shader_name = target.name.clone().unwrap_or_default();
                            self.package.materials.push(m);
                            self.parent_entries.insert(prop, ParentEntry::Material(slot));
                            slot
                        }
                    };
                    material = Some(slot);
                }
                BlockPayload::MaterialProperty(_) => material_props.push(prop),
                _ => {}
            }
        }

        if let Some(slot) = material {
            for prop in material_props {
                self.parent_entries.insert(prop, ParentEntry::Material(slot));
            }
        }
        Ok(material)
    }

    fn stream_of<'b>(&self, index: u32, target: &'b Block) -> Option<&'b NiDataStream> {
        match &target.payload {
            BlockPayload::DataStream(stream) => Some(stream),
            other => {
                warn!(block = index, found = other.kind(), "mesh stream reference is not a data stream");
                None
            }
        }
    }

    fn assemble_mesh(&self, index: u32, mesh: &NiMesh) -> Result<MeshData> {
        let endian = self.doc.endian;
        let mut indices = Vec::new();
        let mut src_format = MeshFormat::new();
        let mut sources: Vec<&[u8]> = Vec::new();
        let mut vertex_count = 0usize;
        let mut have_indices = false;

        for binding in &mesh.streams {
            let Some(target) = self.resolve(index, binding.stream)? else {
                continue;
            };
            let Some(stream) = self.stream_of(index, target) else {
                continue;
            };

            match stream.usage {
                StreamUsage::IndexBuffer if !have_indices => {
                    have_indices = true;
                    indices = read_index_stream(stream, endian)?;
                }
                StreamUsage::VertexBuffer => {
                    if binding.semantics.len() != stream.components.len() {
                        return Err(Error::FormatMismatch(format!(
                            "mesh block {} binds {} semantics to a stream of {} components",
                            index,
                            binding.semantics.len(),
                            stream.components.len()
                        )));
                    }
                    let slot = sources.len() as u32;
                    for (semantic, info) in binding.semantics.iter().zip(stream.component_infos()) {
                        src_format.push(
                            info.data_type,
                            info.element_count,
                            attribute_name(&semantic.name, semantic.index),
                            slot,
                        );
                    }
                    sources.push(&stream.data);
                    vertex_count = stream.first_region_count() as usize;
                }
                _ => {}
            }
        }

        // Buffers are sized from the vertex count, so it must fit every stream.
        for (binding, source) in sources.iter().enumerate() {
            let stride = src_format.stride(binding as u32);
            if stride.checked_mul(vertex_count).map_or(true, |n| n > source.len()) {
                return Err(Error::FormatMismatch(format!(
                    "mesh block {} declares {} vertices, binding {} holds {} bytes at stride {}",
                    index,
                    vertex_count,
                    binding,
                    source.len(),
                    stride
                )));
            }
        }

        let format = self.cache.intern(src_format);
        let mut data = MeshData::new(Arc::clone(&format), vertex_count);
        data.copy_from(&format, &sources, endian)?;
        data.set_indices(indices);
        Ok(data)
    }

    fn link_texturing(&mut self, index: u32, prop: &NiTexturingProperty) -> Result<()> {
        let Some(slot) = self.material_entry(index, "NiTexturingProperty") else {
            return Ok(());
        };

        let mut sources: Vec<(BlockRef, TextureLink)> = LINKED_SLOTS
            .iter()
            .filter_map(|(tex_slot, link)| prop.slot(*tex_slot).map(|d| (d.source, *link)))
            .collect();
        if let Some(map) = prop.shader_textures.first().and_then(|s| s.map.as_ref()) {
            sources.push((map.source, TextureLink::OverrideColor));
        }

        for (source, link) in sources {
            let Some(target) = self.resolve(index, source)? else {
                continue;
            };
            if !matches!(target.payload, BlockPayload::SourceTexture(_)) {
                warn!(block = index, found = target.payload.kind(), "texture slot does not reference a source texture");
                continue;
            }
            let source = source.raw();
            self.parent_entries.insert(source, ParentEntry::Material(slot));
            self.texture_links.insert(source, link);
        }
        Ok(())
    }

    fn link_source_texture(&mut self, index: u32, tex: &NiSourceTexture) {
        let Some(slot) = self.material_entry(index, "NiSourceTexture") else {
            return;
        };
        let Some(link) = self.texture_links.get(&index).copied() else {
            return;
        };
        let Some(material) = self.package.materials.get_mut(slot) else {
            return;
        };
        let path = tex.file_name.clone();
        match link {
            TextureLink::Diffuse => material.diffuse = path,
            TextureLink::Normal => material.normal = path,
            TextureLink::Specular => material.specular = path,
            TextureLink::OverrideColor => material.override_color = path,
        }
    }

    fn link_material_property(&mut self, index: u32, prop: &NiMaterialProperty) {
        let Some(slot) = self.material_entry(index, "NiMaterialProperty") else {
            return;
        };
        if let Some(material) = self.package.materials.get_mut(slot) {
            material.diffuse_color = prop.diffuse;
            material.specular_color = prop.specular;
            material.ambient_color = prop.ambient;
            material.emissive_color = prop.emissive;
            material.shininess = prop.glossiness;
            material.alpha = prop.alpha;
        }
    }
}

/// Decode the first region of an index stream from component 0.
fn read_index_stream(stream: &NiDataStream, endian: Endian) -> Result<Vec<i32>> {
    let count = stream.first_region_count() as usize;
    if count == 0 {
        return Ok(Vec::new());
    }
    let info = stream.component_infos().next().unwrap_or_default();
    read_indices(&stream.data, endian, info.data_type, stream.stride(), count)
}
