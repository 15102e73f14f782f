//! Linked scene model.
//!
//! - [`Package`] / [`Node`] / [`Material`] - node forest and materials
//! - [`MeshFormat`] / [`MeshData`] - vertex layouts and buffers
//! - [`FormatCache`] - shared, deduplicated vertex formats
//! - [`link`] - document to package (Pass 2)
//! - [`export`] - package to document
//! - [`TransformHierarchy`] - receiver for per-node transforms

mod cache;
pub mod export;
pub mod link;
mod mesh;
mod package;
mod transform;

pub use cache::FormatCache;
pub use export::{export, semantic_for_attribute};
pub use link::{attribute_name, link, Linker, ATTRIBUTE_ALIASES};
pub use mesh::{read_indices, MeshData, MeshFormat, VertexAttributeFormat};
pub use package::{Material, Node, Package};
pub use transform::{TransformArena, TransformHierarchy, TransformId};
