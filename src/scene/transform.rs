//! Transform-hierarchy collaborator.
//!
//! The linker never owns scene transforms. It hands each package node's local
//! matrix to a [`TransformHierarchy`] implementation supplied by the caller
//! (an engine scene graph, an editor, a test double). [`TransformArena`] is a
//! small flat implementation for tools and tests.

use crate::util::Mat4;

/// Receiver of the per-node transforms built from a package.
pub trait TransformHierarchy {
    /// Handle to one transform owned by the hierarchy.
    type Handle: Copy;

    fn create_transform(&mut self) -> Self::Handle;

    /// Set the local matrix of `handle`.
    fn set_transformation(&mut self, handle: Self::Handle, matrix: Mat4);

    /// Whether `handle` is composed with its parent's world matrix.
    fn set_inherits_transformation(&mut self, handle: Self::Handle, inherits: bool);

    /// Attach `handle` below `parent`. Parents are always created first.
    fn set_parent(&mut self, handle: Self::Handle, parent: Self::Handle);
}

/// Index of a transform inside a [`TransformArena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransformId(pub usize);

#[derive(Clone, Debug)]
struct ArenaEntry {
    local: Mat4,
    inherits: bool,
    parent: Option<usize>,
}

/// Flat transform store that computes world matrices by walking parents.
#[derive(Clone, Debug, Default)]
pub struct TransformArena {
    entries: Vec<ArenaEntry>,
}

impl TransformArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn local(&self, id: TransformId) -> Option<Mat4> {
        self.entries.get(id.0).map(|e| e.local)
    }

    pub fn parent(&self, id: TransformId) -> Option<TransformId> {
        self.entries.get(id.0)?.parent.map(TransformId)
    }

    /// Local matrix composed with every inherited ancestor, root first.
    ///
    /// The walk stops after `len()` steps, so a malformed parent chain can not
    /// loop forever.
    pub fn world(&self, id: TransformId) -> Option<Mat4> {
        let mut entry = self.entries.get(id.0)?;
        let mut world = entry.local;
        for _ in 0..self.entries.len() {
            if !entry.inherits {
                break;
            }
            let Some(parent) = entry.parent.and_then(|p| self.entries.get(p)) else {
                break;
            };
            world = parent.local * world;
            entry = parent;
        }
        Some(world)
    }
}

impl TransformHierarchy for TransformArena {
    type Handle = TransformId;

    fn create_transform(&mut self) -> TransformId {
        self.entries.push(ArenaEntry { local: Mat4::IDENTITY, inherits: true, parent: None });
        TransformId(self.entries.len() - 1)
    }

    fn set_transformation(&mut self, handle: TransformId, matrix: Mat4) {
        if let Some(e) = self.entries.get_mut(handle.0) {
            e.local = matrix;
        }
    }

    fn set_inherits_transformation(&mut self, handle: TransformId, inherits: bool) {
        if let Some(e) = self.entries.get_mut(handle.0) {
            e.inherits = inherits;
        }
    }

    fn set_parent(&mut self, handle: TransformId, parent: TransformId) {
        if let Some(e) = self.entries.get_mut(handle.0) {
            e.parent = Some(parent.0);
        }
    }
}
