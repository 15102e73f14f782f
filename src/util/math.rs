//! Math type re-exports and NIF-specific transform types.

pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};

use bytemuck::{Pod, Zeroable};

/// RGB colour as stored by material properties.
pub type Color3 = Vec3;

/// RGBA colour as stored by colour extra data.
pub type Color4 = Vec4;

/// Rotation/translation/uniform-scale transform embedded in scene-graph blocks.
///
/// The rotation is stored on the wire as three row vectors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NiTransform {
    pub translation: Vec3,
    pub rotation: Mat3,
    pub scale: f32,
}

impl Default for NiTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl NiTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Mat3::IDENTITY,
        scale: 1.0,
    };

    /// Build from the three stored rotation rows.
    pub fn from_rows(translation: Vec3, rows: [Vec3; 3], scale: f32) -> Self {
        Self {
            translation,
            rotation: Mat3::from_cols(rows[0], rows[1], rows[2]).transpose(),
            scale,
        }
    }

    /// Rotation rows in wire order.
    pub fn rows(&self) -> [Vec3; 3] {
        [self.rotation.row(0), self.rotation.row(1), self.rotation.row(2)]
    }

    /// translation × rotation × uniform scale
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_mat3(self.rotation)
            * Mat4::from_scale(Vec3::splat(self.scale))
    }

    /// Decompose an affine matrix, collapsing its scale to the mean axis scale.
    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, translation) = m.to_scale_rotation_translation();
        Self {
            translation,
            rotation: Mat3::from_quat(rotation),
            scale: (scale.x + scale.y + scale.z) / 3.0,
        }
    }
}

/// Translation/rotation/scale with a quaternion, used by animation evaluators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuatTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Default for QuatTransform {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: 1.0 }
    }
}

/// Bounding sphere.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Smallest axis-aligned enclosing sphere of a point set (center of the box).
    pub fn from_points(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        let center = (min + max) * 0.5;
        let radius = points.iter().map(|p| p.distance(center)).fold(0.0f32, f32::max);
        Self { center, radius }
    }
}
