//! `NiTexturingProperty` and `NiSourceTexture`.

use super::node::ObjectNet;
use super::BlockCodec;
use crate::format::cursor::{BlockCursor, BlockRef, BlockWriter};
use crate::util::{Result, Vec2};

/// UV transform applied to one texture slot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TexTransform {
    pub translation: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
    pub method: u32,
    pub center: Vec2,
}

/// One texture slot. Absent slots occupy a single flag byte.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TexDesc {
    pub source: BlockRef,
    pub flags: u16,
    pub max_anisotropy: u16,
    pub transform: Option<TexTransform>,
}

fn read_slot(cur: &mut BlockCursor<'_>) -> Result<Option<TexDesc>> {
    if !cur.read_bool()? {
        return Ok(None);
    }
    let source = cur.read_ref()?;
    let flags = cur.read_u16()?;
    let max_anisotropy = cur.read_u16()?;
    let transform = if cur.read_bool()? {
        Some(TexTransform {
            translation: cur.read_vec2()?,
            scale: cur.read_vec2()?,
            rotation: cur.read_f32()?,
            method: cur.read_u32()?,
            center: cur.read_vec2()?,
        })
    } else {
        None
    };
    Ok(Some(TexDesc { source, flags, max_anisotropy, transform }))
}

fn write_slot(w: &mut BlockWriter<'_>, slot: &Option<TexDesc>) {
    let Some(desc) = slot else {
        w.write_bool(false);
        return;
    };
    w.write_bool(true);
    w.write_ref(desc.source);
    w.write_u16(desc.flags);
    w.write_u16(desc.max_anisotropy);
    w.write_bool(desc.transform.is_some());
    if let Some(t) = &desc.transform {
        w.write_vec2(t.translation);
        w.write_vec2(t.scale);
        w.write_f32(t.rotation);
        w.write_u32(t.method);
        w.write_vec2(t.center);
    }
}

/// Bump-map parameters, stored only when the bump slot is present.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BumpParams {
    pub luma_scale: f32,
    pub luma_offset: f32,
    /// 2x2 matrix, row-major.
    pub matrix: [f32; 4],
}

impl Default for BumpParams {
    fn default() -> Self {
        Self { luma_scale: 1.0, luma_offset: 0.0, matrix: [1.0, 0.0, 0.0, 1.0] }
    }
}

/// Extra shader-bound slot with its numeric map id.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShaderTexture {
    pub map: Option<TexDesc>,
    pub map_id: u32,
}

/// Fixed texture slots in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Base,
    Dark,
    Detail,
    Gloss,
    Glow,
    Bump,
    Normal,
    Parallax,
    Decal0,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 9] = [
        Self::Base,
        Self::Dark,
        Self::Detail,
        Self::Gloss,
        Self::Glow,
        Self::Bump,
        Self::Normal,
        Self::Parallax,
        Self::Decal0,
    ];
}

#[derive(Clone, Debug, PartialEq)]
pub struct NiTexturingProperty {
    pub net: ObjectNet,
    pub flags: u16,
    pub texture_count: u32,
    /// Indexed by [`TextureSlot`] order.
    pub slots: [Option<TexDesc>; 9],
    pub bump: BumpParams,
    pub shader_textures: Vec<ShaderTexture>,
}

impl Default for NiTexturingProperty {
    fn default() -> Self {
        Self {
            net: ObjectNet::default(),
            flags: 0,
            texture_count: TextureSlot::ALL.len() as u32,
            slots: [None; 9],
            bump: BumpParams::default(),
            shader_textures: Vec::new(),
        }
    }
}

impl NiTexturingProperty {
    #[inline]
    pub fn slot(&self, slot: TextureSlot) -> Option<&TexDesc> {
        self.slots[slot as usize].as_ref()
    }

    pub fn set_slot(&mut self, slot: TextureSlot, desc: Option<TexDesc>) {
        self.slots[slot as usize] = desc;
    }
}

impl BlockCodec for NiTexturingProperty {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let net = ObjectNet::decode(cur)?;
        let flags = cur.read_u16()?;
        let texture_count = cur.read_u32()?;

        let mut slots = [None; 9];
        let mut bump = BumpParams::default();
        for slot in TextureSlot::ALL {
            slots[slot as usize] = read_slot(cur)?;
            if slot == TextureSlot::Bump && slots[slot as usize].is_some() {
                bump.luma_scale = cur.read_f32()?;
                bump.luma_offset = cur.read_f32()?;
                for m in bump.matrix.iter_mut() {
                    *m = cur.read_f32()?;
                }
            }
        }

        let num_shader = cur.read_count(5)?;
        let mut shader_textures = Vec::with_capacity(num_shader);
        for _ in 0..num_shader {
            let map = read_slot(cur)?;
            // The map id follows every shader slot, present or not.
            let map_id = cur.read_u32()?;
            shader_textures.push(ShaderTexture { map, map_id });
        }

        Ok(Self { net, flags, texture_count, slots, bump, shader_textures })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.net.encode(w)?;
        w.write_u16(self.flags);
        w.write_u32(self.texture_count);
        for slot in TextureSlot::ALL {
            let desc = &self.slots[slot as usize];
            write_slot(w, desc);
            if slot == TextureSlot::Bump && desc.is_some() {
                w.write_f32(self.bump.luma_scale);
                w.write_f32(self.bump.luma_offset);
                for m in self.bump.matrix {
                    w.write_f32(m);
                }
            }
        }
        w.write_count(self.shader_textures.len())?;
        for st in &self.shader_textures {
            write_slot(w, &st.map);
            w.write_u32(st.map_id);
        }
        Ok(())
    }
}

/// Texture image reference.
#[derive(Clone, Debug, PartialEq)]
pub struct NiSourceTexture {
    pub net: ObjectNet,
    pub use_external: bool,
    pub file_name: Option<String>,
    pub pixel_data: BlockRef,
    pub pixel_layout: u32,
    pub use_mipmaps: u32,
    pub alpha_format: u32,
    pub is_static: bool,
    pub direct_render: bool,
    pub persist_render_data: bool,
}

impl Default for NiSourceTexture {
    fn default() -> Self {
        Self {
            net: ObjectNet::default(),
            use_external: true,
            file_name: None,
            pixel_data: BlockRef::NONE,
            pixel_layout: 6,
            use_mipmaps: 2,
            alpha_format: 3,
            is_static: true,
            direct_render: true,
            persist_render_data: false,
        }
    }
}

impl NiSourceTexture {
    pub fn external(file_name: impl Into<String>) -> Self {
        Self { file_name: Some(file_name.into()), ..Default::default() }
    }
}

impl BlockCodec for NiSourceTexture {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self {
            net: ObjectNet::decode(cur)?,
            use_external: cur.read_bool()?,
            file_name: cur.read_string_ref()?,
            pixel_data: cur.read_ref()?,
            pixel_layout: cur.read_u32()?,
            use_mipmaps: cur.read_u32()?,
            alpha_format: cur.read_u32()?,
            is_static: cur.read_bool()?,
            direct_render: cur.read_bool()?,
            persist_render_data: cur.read_bool()?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.net.encode(w)?;
        w.write_bool(self.use_external);
        w.write_string_ref(self.file_name.as_deref());
        w.write_ref(self.pixel_data);
        w.write_u32(self.pixel_layout);
        w.write_u32(self.use_mipmaps);
        w.write_u32(self.alpha_format);
        w.write_bool(self.is_static);
        w.write_bool(self.direct_render);
        w.write_bool(self.persist_render_data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::cursor::StringTable;
    use crate::util::Endian;

    fn encode<T: BlockCodec>(value: &T) -> (Vec<u8>, Vec<String>) {
        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Little, &mut table);
        value.encode(&mut w).unwrap();
        (w.into_bytes(), table.as_slice().to_vec())
    }

    #[test]
    fn test_absent_slots_cost_one_byte() {
        let prop = NiTexturingProperty::default();
        let (bytes, _) = encode(&prop);
        // net(8) flags(2) count(4) 9 slot flags, shader count(4)
        assert_eq!(bytes.len(), 8 + 2 + 4 + 9 + 4);
    }

    #[test]
    fn test_bump_params_only_with_bump_slot() {
        let mut prop = NiTexturingProperty::default();
        prop.set_slot(TextureSlot::Base, Some(TexDesc { source: BlockRef::new(2), ..Default::default() }));
        let (without, _) = encode(&prop);

        prop.set_slot(TextureSlot::Bump, Some(TexDesc { source: BlockRef::new(3), ..Default::default() }));
        prop.bump.luma_scale = 0.5;
        let (with, _) = encode(&prop);
        // bump slot body (9) + luma/offset/matrix (24)
        assert_eq!(with.len(), without.len() + 9 + 24);

        let mut cur = BlockCursor::new(&with, Endian::Little, &[], "NiTexturingProperty");
        let back = NiTexturingProperty::decode(&mut cur).unwrap();
        assert_eq!(cur.remaining(), 0);
        assert_eq!(back, prop);
    }

    #[test]
    fn test_shader_slots_with_transform() {
        let mut prop = NiTexturingProperty::default();
        prop.shader_textures.push(ShaderTexture {
            map: Some(TexDesc {
                source: BlockRef::new(5),
                flags: 0x3000,
                max_anisotropy: 4,
                transform: Some(TexTransform { scale: Vec2::ONE, ..Default::default() }),
            }),
            map_id: 7,
        });
        prop.shader_textures.push(ShaderTexture { map: None, map_id: 8 });
        let (bytes, _) = encode(&prop);

        let mut cur = BlockCursor::new(&bytes, Endian::Little, &[], "NiTexturingProperty");
        let back = NiTexturingProperty::decode(&mut cur).unwrap();
        assert_eq!(back.shader_textures, prop.shader_textures);
    }

    #[test]
    fn test_source_texture_without_name() {
        let tex = NiSourceTexture::default();
        let (bytes, strings) = encode(&tex);
        assert!(strings.is_empty());
        let mut cur = BlockCursor::new(&bytes, Endian::Little, &strings, "NiSourceTexture");
        assert_eq!(NiSourceTexture::decode(&mut cur).unwrap().file_name, None);

        let tex = NiSourceTexture::external("rock_d.dds");
        let (bytes, strings) = encode(&tex);
        let mut cur = BlockCursor::new(&bytes, Endian::Little, &strings, "NiSourceTexture");
        assert_eq!(NiSourceTexture::decode(&mut cur).unwrap(), tex);
    }
}
