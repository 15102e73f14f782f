//! # NIF
//!
//! Reader and writer for the Gamebryo NIF (.nif/.kf) binary scene format.
//!
//! Loading runs in two passes:
//!
//! 1. [`Document::from_bytes`] reads the header and decodes every block into a
//!    typed payload, checking each decoder against the block's declared size.
//! 2. [`scene::link`] walks the blocks in file order and builds a
//!    [`Package`]: a node forest with transforms and meshes, plus materials.
//!
//! [`scene::export`] turns a package back into a document.
//!
//! ## Modules
//!
//! - [`util`] - Byte order, element types, math, errors
//! - [`format`] - Wire-level documents and block codecs
//! - [`scene`] - Package model, vertex formats, linker and exporter
//!
//! ## Example
//!
//! ```ignore
//! use nif::prelude::*;
//!
//! let cache = FormatCache::new();
//! let package = load_package("chair.nif", &cache)?;
//!
//! for root in package.roots() {
//!     println!("{}", package.nodes[root].name);
//! }
//! ```

pub mod format;
pub mod scene;
pub mod util;

use std::io::Read;
use std::path::Path;

pub use format::{Document, ReadOptions, WriteOptions};
pub use scene::{FormatCache, Material, MeshData, MeshFormat, Node, Package};
pub use util::{Endian, Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::format::{Block, BlockPayload, BlockRef, Document, ReadOptions, WriteOptions};
    pub use crate::scene::{
        export, link, FormatCache, Material, MeshData, MeshFormat, Node, Package, TransformArena,
        TransformHierarchy,
    };
    pub use crate::util::{AttributeDataType, Color3, Endian, Error, Mat4, NiTransform, Result, Vec3};
    pub use crate::{load_package, read_package, save_package, write_package, ModelFormat};
}

/// File formats handled by this crate, selected by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    /// Scene file
    Nif,
    /// Keyframe (animation) file, same container
    Kf,
}

impl ModelFormat {
    /// Pick the format from a path's extension (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "nif" => Ok(Self::Nif),
            "kf" => Ok(Self::Kf),
            _ => Err(Error::UnsupportedExtension(path.display().to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Nif => "nif",
            Self::Kf => "kf",
        }
    }
}

/// Parse and link a document from a reader.
pub fn read_package(reader: impl Read, cache: &FormatCache) -> Result<Package> {
    let doc = Document::read(reader)?;
    scene::link(&doc, cache)
}

/// Export a package and write it; returns the number of bytes written.
pub fn write_package<W: std::io::Write>(package: &Package, writer: W, options: &WriteOptions) -> Result<u64> {
    scene::export(package, options)?.write_to(writer)
}

/// Load a `.nif`/`.kf` file into a package.
pub fn load_package(path: impl AsRef<Path>, cache: &FormatCache) -> Result<Package> {
    let path = path.as_ref();
    ModelFormat::from_path(path)?;
    let doc = Document::open(path)?;
    scene::link(&doc, cache)
}

/// Save a package as a `.nif`/`.kf` file.
pub fn save_package(package: &Package, path: impl AsRef<Path>, options: &WriteOptions) -> Result<()> {
    let path = path.as_ref();
    ModelFormat::from_path(path)?;
    scene::export(package, options)?.save(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ModelFormat::from_path("a/b/chair.nif").unwrap(), ModelFormat::Nif);
        assert_eq!(ModelFormat::from_path("WALK.KF").unwrap(), ModelFormat::Kf);
        assert!(matches!(ModelFormat::from_path("scene.obj"), Err(Error::UnsupportedExtension(_))));
        assert!(matches!(ModelFormat::from_path("noext"), Err(Error::UnsupportedExtension(_))));
    }

    #[test]
    fn test_save_rejects_unknown_extension() {
        let err = save_package(&Package::new(), "/tmp/out.fbx", &WriteOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedExtension(_)));
    }
}
