//! Linked scene output: a node forest plus a flat material list.

use std::sync::Arc;

use super::mesh::{MeshData, MeshFormat};
use super::transform::TransformHierarchy;
use crate::util::{Color3, Error, Mat4, NiTransform, Result};

/// Shading parameters and texture paths of one material slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// First entry of the claiming mesh's material list.
    pub name: String,
    /// Embedded name of the texturing property that defined this slot.
    pub shader_name: String,
    pub diffuse: Option<String>,
    pub normal: Option<String>,
    pub specular: Option<String>,
    /// Texture bound through shader-texture slot 0.
    pub override_color: Option<String>,
    pub diffuse_color: Color3,
    pub specular_color: Color3,
    pub ambient_color: Color3,
    pub emissive_color: Color3,
    pub shininess: f32,
    pub alpha: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            shader_name: String::new(),
            diffuse: None,
            normal: None,
            specular: None,
            override_color: None,
            diffuse_color: Color3::splat(0.5),
            specular_color: Color3::splat(0.5),
            ambient_color: Color3::splat(0.5),
            emissive_color: Color3::ZERO,
            shininess: 10.0,
            alpha: 1.0,
        }
    }
}

impl Material {
    /// Material with default colors and no textures.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Texture paths in link-code order: diffuse, normal, specular, override.
    pub fn textures(&self) -> [Option<&str>; 4] {
        [
            self.diffuse.as_deref(),
            self.normal.as_deref(),
            self.specular.as_deref(),
            self.override_color.as_deref(),
        ]
    }
}

/// One scene node. Mesh nodes carry their geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub name: String,
    /// Index of the parent node; always lower than this node's own index.
    pub attached_to: Option<usize>,
    pub material: Option<usize>,
    pub mesh: Option<MeshData>,
    pub transform: NiTransform,
}

impl Node {
    /// Root node with an identity transform and no mesh.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// True when the node carries geometry.
    #[inline]
    pub fn is_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Vertex format of the node's mesh, if any.
    pub fn format(&self) -> Option<&Arc<MeshFormat>> {
        self.mesh.as_ref().map(|m| m.format())
    }
}

/// Result of linking one document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Package {
    pub nodes: Vec<Node>,
    pub materials: Vec<Material>,
}

impl Package {
    /// Empty package.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there are no nodes and no materials.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.materials.is_empty()
    }

    /// Number of nodes with mesh data.
    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_mesh()).count()
    }

    /// Index of the first node named `name`.
    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    /// Indices of nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().enumerate().filter(|(_, n)| n.attached_to.is_none()).map(|(i, _)| i)
    }

    /// Direct children of `index`, in node order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.attached_to == Some(index))
            .map(|(i, _)| i)
    }

    /// Number of ancestors of `index`.
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut cur = self.nodes.get(index).and_then(|n| n.attached_to);
        while let Some(p) = cur {
            depth += 1;
            cur = self.nodes.get(p).and_then(|n| n.attached_to);
        }
        depth
    }

    /// Check that parents precede children and material slots exist.
    pub fn validate(&self) -> Result<()> {
        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(p) = node.attached_to {
                if p >= i {
                    return Err(Error::other(format!(
                        "node {} ({}) is attached to node {}, which does not precede it",
                        i, node.name, p
                    )));
                }
            }
            if let Some(m) = node.material {
                if m >= self.materials.len() {
                    return Err(Error::other(format!(
                        "node {} ({}) uses material {} of {}",
                        i,
                        node.name,
                        m,
                        self.materials.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// World matrix of `index`: its local transform under every ancestor.
    pub fn world_matrix(&self, index: usize) -> Option<Mat4> {
        let node = self.nodes.get(index)?;
        let mut world = node.transform.to_matrix();
        let mut child = index;
        while let Some(p) = self.nodes.get(child)?.attached_to {
            // Parents precede children; anything else would loop.
            if p >= child {
                break;
            }
            world = self.nodes.get(p)?.transform.to_matrix() * world;
            child = p;
        }
        Some(world)
    }

    /// Create one transform per node, in node order, and attach each to its
    /// parent's transform. Returns the handles, indexed like `nodes`.
    pub fn attach_transforms<H: TransformHierarchy>(&self, hierarchy: &mut H) -> Result<Vec<H::Handle>> {
        let mut handles: Vec<H::Handle> = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            let handle = hierarchy.create_transform();
            hierarchy.set_transformation(handle, node.transform.to_matrix());
            hierarchy.set_inherits_transformation(handle, true);
            if let Some(p) = node.attached_to {
                let parent = handles.get(p).copied().ok_or_else(|| {
                    Error::other(format!("node {} ({}) is attached to later node {}", i, node.name, p))
                })?;
                hierarchy.set_parent(handle, parent);
            }
            handles.push(handle);
        }
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::transform::TransformArena;
    use crate::util::Vec3;

    fn translated(name: &str, parent: Option<usize>, t: Vec3) -> Node {
        Node {
            name: name.into(),
            attached_to: parent,
            transform: NiTransform { translation: t, ..NiTransform::IDENTITY },
            ..Default::default()
        }
    }

    fn chain() -> Package {
        Package {
            nodes: vec![
                translated("root", None, Vec3::X),
                translated("arm", Some(0), Vec3::Y),
                translated("hand", Some(1), Vec3::Z),
                translated("other", None, Vec3::ZERO),
            ],
            materials: Vec::new(),
        }
    }

    #[test]
    fn test_material_defaults() {
        let m = Material::new("stone");
        assert_eq!(m.diffuse_color, Color3::splat(0.5));
        assert_eq!(m.emissive_color, Color3::ZERO);
        assert_eq!(m.shininess, 10.0);
        assert_eq!(m.alpha, 1.0);
        assert_eq!(m.textures(), [None; 4]);
    }

    #[test]
    fn test_forest_queries() {
        let pkg = chain();
        assert_eq!(pkg.roots().collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(pkg.children(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(pkg.depth(2), 2);
        assert_eq!(pkg.find_node("hand"), Some(2));
        pkg.validate().unwrap();
    }

    #[test]
    fn test_forward_parent_is_rejected() {
        let mut pkg = chain();
        pkg.nodes[1].attached_to = Some(2);
        assert!(pkg.validate().is_err());
        assert!(pkg.attach_transforms(&mut TransformArena::new()).is_err());

        pkg.nodes[1].attached_to = Some(1);
        assert!(pkg.validate().is_err());
    }

    #[test]
    fn test_missing_material_is_rejected() {
        let mut pkg = chain();
        pkg.nodes[0].material = Some(0);
        assert!(pkg.validate().is_err());
        pkg.materials.push(Material::default());
        pkg.validate().unwrap();
    }

    #[test]
    fn test_attach_transforms_matches_world_matrix() {
        let pkg = chain();
        let mut arena = TransformArena::new();
        let handles = pkg.attach_transforms(&mut arena).unwrap();
        assert_eq!(handles.len(), 4);
        for (i, h) in handles.iter().enumerate() {
            assert_eq!(arena.world(*h), pkg.world_matrix(i));
        }
        let hand = pkg.world_matrix(2).unwrap().transform_point3(Vec3::ZERO);
        assert_eq!(hand, Vec3::new(1.0, 1.0, 1.0));
    }
}
