//! NIF format constants.

/// Banner written by default ("\n"-terminated on disk).
pub const DEFAULT_BANNER: &str = "Gamebryo File Format, Version 20.6.5.0";

/// Substring every accepted banner must contain.
pub const BANNER_MARKER: &str = "File Format";

/// Packed version tag matching [`DEFAULT_BANNER`].
pub const DEFAULT_VERSION: u32 = 0x1406_0500;

/// Longest banner line accepted before the header is declared corrupt.
pub const MAX_BANNER_LEN: usize = 0xFFF;

/// Reference value meaning "no block".
pub const NO_REF: u32 = 0xFFFF_FFFF;

/// String-table index meaning "no string".
pub const NO_STRING: u32 = 0xFFFF_FFFF;

/// Block type indices carry a format flag in the top bit.
pub const BLOCK_TYPE_INDEX_MASK: u16 = 0x7FFF;

/// Byte offset inside a data-stream tag holding the ASCII usage digit.
///
/// Tags look like `NiDataStream\x01<usage>...`; the name ends at the first byte <= 1.
pub const DATA_STREAM_USAGE_OFFSET: usize = 13;

// Block type names.
pub const NI_NODE: &str = "NiNode";
pub const NI_MESH: &str = "NiMesh";
pub const NI_TEXTURING_PROPERTY: &str = "NiTexturingProperty";
pub const NI_SOURCE_TEXTURE: &str = "NiSourceTexture";
pub const NI_DATA_STREAM: &str = "NiDataStream";
pub const NI_MATERIAL_PROPERTY: &str = "NiMaterialProperty";
pub const NI_VERTEX_COLOR_PROPERTY: &str = "NiVertexColorProperty";
pub const NI_ZBUFFER_PROPERTY: &str = "NiZBufferProperty";
pub const NI_SPECULAR_PROPERTY: &str = "NiSpecularProperty";
pub const NI_ALPHA_PROPERTY: &str = "NiAlphaProperty";
pub const NI_FLOAT_EXTRA_DATA: &str = "NiFloatExtraData";
pub const NI_COLOR_EXTRA_DATA: &str = "NiColorExtraData";
pub const NI_INTEGER_EXTRA_DATA: &str = "NiIntegerExtraData";
pub const NI_TEXT_KEY_EXTRA_DATA: &str = "NiTextKeyExtraData";
pub const NI_SKINNING_MESH_MODIFIER: &str = "NiSkinningMeshModifier";
pub const NI_SEQUENCE_DATA: &str = "NiSequenceData";
pub const NI_TRANSFORM_EVALUATOR: &str = "NiTransformEvaluator";
pub const NI_BSPLINE_COMP_TRANSFORM_EVALUATOR: &str = "NiBSplineCompTransformEvaluator";
pub const NI_TRANSFORM_DATA: &str = "NiTransformData";
pub const NI_FLOAT_INTERPOLATOR: &str = "NiFloatInterpolator";
pub const NI_FLOAT_DATA: &str = "NiFloatData";

/// Strip the suffix some tags carry after the name (first byte <= 1).
#[inline]
pub fn base_type_name(tag: &str) -> &str {
    let end = tag.bytes().position(|b| b <= 1).unwrap_or(tag.len());
    &tag[..end]
}

/// Build a data-stream tag for the given usage code.
pub fn data_stream_tag(usage: u8) -> String {
    format!("{}\u{1}{}", NI_DATA_STREAM, usage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("NiNode"), "NiNode");
        assert_eq!(base_type_name("NiDataStream\u{1}1\u{1}3"), "NiDataStream");
        assert_eq!(base_type_name(""), "");
    }

    #[test]
    fn test_data_stream_tag_layout() {
        let tag = data_stream_tag(1);
        assert_eq!(tag.as_bytes()[DATA_STREAM_USAGE_OFFSET], b'1');
        assert_eq!(base_type_name(&tag), NI_DATA_STREAM);
    }
}
