//! Typed block payloads and the decoder registry.
//!
//! Each block family lives in its own file and implements [`BlockCodec`]:
//! - [`node`] - object headers, `NiNode`
//! - [`mesh`] - `NiMesh` and its stream bindings
//! - [`stream`] - `NiDataStream`
//! - [`texture`] - `NiTexturingProperty`, `NiSourceTexture`
//! - [`material`] - `NiMaterialProperty`, flag properties, extra data
//! - [`skin`] - `NiSkinningMeshModifier`
//! - [`animation`] - key groups, evaluators, sequences
//!
//! Dispatch is by base type name through [`DECODERS`]. The registry entry also
//! says whether the block starts with an embedded name reference.

pub mod animation;
pub mod material;
pub mod mesh;
pub mod node;
pub mod skin;
pub mod stream;
pub mod texture;

use std::borrow::Cow;

use super::constants::*;
use super::cursor::{BlockCursor, BlockWriter};
use crate::util::Result;

pub use animation::*;
pub use material::*;
pub use mesh::*;
pub use node::*;
pub use skin::*;
pub use stream::*;
pub use texture::*;

/// Decode/encode contract for one block family.
///
/// `decode` reads exactly this family's fields from a cursor positioned after
/// any embedded name; `encode` writes the same fields in the same order.
pub trait BlockCodec: Sized {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self>;
    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()>;
}

/// Decoded contents of one block.
#[derive(Clone, Debug, PartialEq)]
pub enum BlockPayload {
    Node(NiNode),
    Mesh(NiMesh),
    TexturingProperty(NiTexturingProperty),
    SourceTexture(NiSourceTexture),
    DataStream(NiDataStream),
    MaterialProperty(NiMaterialProperty),
    VertexColorProperty(FlagProperty),
    ZBufferProperty(FlagProperty),
    SpecularProperty(FlagProperty),
    AlphaProperty(NiAlphaProperty),
    ExtraData(ExtraData),
    TextKeyExtraData(NiTextKeyExtraData),
    SkinningMeshModifier(NiSkinningMeshModifier),
    SequenceData(NiSequenceData),
    TransformEvaluator(NiTransformEvaluator),
    BSplineCompTransformEvaluator(NiBSplineCompTransformEvaluator),
    TransformData(NiTransformData),
    FloatInterpolator(NiFloatInterpolator),
    FloatData(NiFloatData),
    /// Uninterpreted block bytes (unregistered type, or nothing past the name).
    Unknown(Vec<u8>),
}

impl BlockPayload {
    /// Type tag this payload is written under; `None` for raw blocks, whose
    /// tag has to be carried alongside.
    pub fn type_tag(&self) -> Option<Cow<'static, str>> {
        let name = match self {
            Self::Node(_) => NI_NODE,
            Self::Mesh(_) => NI_MESH,
            Self::TexturingProperty(_) => NI_TEXTURING_PROPERTY,
            Self::SourceTexture(_) => NI_SOURCE_TEXTURE,
            Self::DataStream(s) => return Some(Cow::Owned(s.usage.tag())),
            Self::MaterialProperty(_) => NI_MATERIAL_PROPERTY,
            Self::VertexColorProperty(_) => NI_VERTEX_COLOR_PROPERTY,
            Self::ZBufferProperty(_) => NI_ZBUFFER_PROPERTY,
            Self::SpecularProperty(_) => NI_SPECULAR_PROPERTY,
            Self::AlphaProperty(_) => NI_ALPHA_PROPERTY,
            Self::ExtraData(ExtraData::Float(_)) => NI_FLOAT_EXTRA_DATA,
            Self::ExtraData(ExtraData::Color(_)) => NI_COLOR_EXTRA_DATA,
            Self::ExtraData(ExtraData::Integer(_)) => NI_INTEGER_EXTRA_DATA,
            Self::TextKeyExtraData(_) => NI_TEXT_KEY_EXTRA_DATA,
            Self::SkinningMeshModifier(_) => NI_SKINNING_MESH_MODIFIER,
            Self::SequenceData(_) => NI_SEQUENCE_DATA,
            Self::TransformEvaluator(_) => NI_TRANSFORM_EVALUATOR,
            Self::BSplineCompTransformEvaluator(_) => NI_BSPLINE_COMP_TRANSFORM_EVALUATOR,
            Self::TransformData(_) => NI_TRANSFORM_DATA,
            Self::FloatInterpolator(_) => NI_FLOAT_INTERPOLATOR,
            Self::FloatData(_) => NI_FLOAT_DATA,
            Self::Unknown(_) => return None,
        };
        Some(Cow::Borrowed(name))
    }

    /// Short label for listings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Mesh(_) => "mesh",
            Self::TexturingProperty(_) => "texturing",
            Self::SourceTexture(_) => "source-texture",
            Self::DataStream(_) => "data-stream",
            Self::MaterialProperty(_) => "material",
            Self::VertexColorProperty(_)
            | Self::ZBufferProperty(_)
            | Self::SpecularProperty(_)
            | Self::AlphaProperty(_) => "property",
            Self::ExtraData(_) | Self::TextKeyExtraData(_) => "extra-data",
            Self::SkinningMeshModifier(_) => "skin",
            Self::SequenceData(_) => "sequence",
            Self::TransformEvaluator(_) | Self::BSplineCompTransformEvaluator(_) => "evaluator",
            Self::TransformData(_) | Self::FloatInterpolator(_) | Self::FloatData(_) => "curve",
            Self::Unknown(_) => "unknown",
        }
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Write the payload fields (not the embedded name).
    pub fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        match self {
            Self::Node(v) => v.encode(w),
            Self::Mesh(v) => v.encode(w),
            Self::TexturingProperty(v) => v.encode(w),
            Self::SourceTexture(v) => v.encode(w),
            Self::DataStream(v) => v.encode(w),
            Self::MaterialProperty(v) => v.encode(w),
            Self::VertexColorProperty(v) | Self::ZBufferProperty(v) | Self::SpecularProperty(v) => v.encode(w),
            Self::AlphaProperty(v) => v.encode(w),
            Self::ExtraData(v) => v.encode(w),
            Self::TextKeyExtraData(v) => v.encode(w),
            Self::SkinningMeshModifier(v) => v.encode(w),
            Self::SequenceData(v) => v.encode(w),
            Self::TransformEvaluator(v) => v.encode(w),
            Self::BSplineCompTransformEvaluator(v) => v.encode(w),
            Self::TransformData(v) => v.encode(w),
            Self::FloatInterpolator(v) => v.encode(w),
            Self::FloatData(v) => v.encode(w),
            Self::Unknown(bytes) => {
                w.write_bytes(bytes);
                Ok(())
            }
        }
    }
}

/// Registered decoder for one base type name.
pub struct DecoderEntry {
    pub type_name: &'static str,
    /// Block starts with a 4-byte name string reference.
    pub has_name: bool,
    pub decode: fn(&mut BlockCursor<'_>) -> Result<BlockPayload>,
}

const fn entry(
    type_name: &'static str,
    has_name: bool,
    decode: fn(&mut BlockCursor<'_>) -> Result<BlockPayload>,
) -> DecoderEntry {
    DecoderEntry { type_name, has_name, decode }
}

/// All registered decoders. Types absent here are carried as raw bytes.
pub static DECODERS: &[DecoderEntry] = &[
    entry(NI_NODE, true, |c| NiNode::decode(c).map(BlockPayload::Node)),
    entry(NI_MESH, true, |c| NiMesh::decode(c).map(BlockPayload::Mesh)),
    entry(NI_TEXTURING_PROPERTY, true, |c| {
        NiTexturingProperty::decode(c).map(BlockPayload::TexturingProperty)
    }),
    entry(NI_SOURCE_TEXTURE, true, |c| NiSourceTexture::decode(c).map(BlockPayload::SourceTexture)),
    entry(NI_DATA_STREAM, false, |c| NiDataStream::decode(c).map(BlockPayload::DataStream)),
    entry(NI_MATERIAL_PROPERTY, true, |c| {
        NiMaterialProperty::decode(c).map(BlockPayload::MaterialProperty)
    }),
    entry(NI_VERTEX_COLOR_PROPERTY, true, |c| {
        FlagProperty::decode(c).map(BlockPayload::VertexColorProperty)
    }),
    entry(NI_ZBUFFER_PROPERTY, true, |c| FlagProperty::decode(c).map(BlockPayload::ZBufferProperty)),
    entry(NI_SPECULAR_PROPERTY, true, |c| FlagProperty::decode(c).map(BlockPayload::SpecularProperty)),
    entry(NI_ALPHA_PROPERTY, true, |c| NiAlphaProperty::decode(c).map(BlockPayload::AlphaProperty)),
    entry(NI_FLOAT_EXTRA_DATA, true, |c| ExtraData::decode_float(c).map(BlockPayload::ExtraData)),
    entry(NI_COLOR_EXTRA_DATA, true, |c| ExtraData::decode_color(c).map(BlockPayload::ExtraData)),
    entry(NI_INTEGER_EXTRA_DATA, true, |c| ExtraData::decode_integer(c).map(BlockPayload::ExtraData)),
    entry(NI_TEXT_KEY_EXTRA_DATA, true, |c| {
        NiTextKeyExtraData::decode(c).map(BlockPayload::TextKeyExtraData)
    }),
    entry(NI_SKINNING_MESH_MODIFIER, false, |c| {
        NiSkinningMeshModifier::decode(c).map(BlockPayload::SkinningMeshModifier)
    }),
    entry(NI_SEQUENCE_DATA, true, |c| NiSequenceData::decode(c).map(BlockPayload::SequenceData)),
    entry(NI_TRANSFORM_EVALUATOR, false, |c| {
        NiTransformEvaluator::decode(c).map(BlockPayload::TransformEvaluator)
    }),
    entry(NI_BSPLINE_COMP_TRANSFORM_EVALUATOR, false, |c| {
        NiBSplineCompTransformEvaluator::decode(c).map(BlockPayload::BSplineCompTransformEvaluator)
    }),
    entry(NI_TRANSFORM_DATA, false, |c| NiTransformData::decode(c).map(BlockPayload::TransformData)),
    entry(NI_FLOAT_INTERPOLATOR, false, |c| {
        NiFloatInterpolator::decode(c).map(BlockPayload::FloatInterpolator)
    }),
    entry(NI_FLOAT_DATA, false, |c| NiFloatData::decode(c).map(BlockPayload::FloatData)),
];

/// Look up the decoder for a base type name.
pub fn find_decoder(base_name: &str) -> Option<&'static DecoderEntry> {
    DECODERS.iter().find(|d| d.type_name == base_name)
}

/// Whether blocks of this base type carry an embedded name.
///
/// Unregistered types are opaque, so the question does not arise for them.
pub fn has_embedded_name(base_name: &str) -> bool {
    find_decoder(base_name).map(|d| d.has_name).unwrap_or(false)
}
