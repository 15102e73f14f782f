//! Material and render-state properties, plus extra-data records.

use super::node::ObjectNet;
use super::BlockCodec;
use crate::format::cursor::{BlockCursor, BlockWriter};
use crate::util::{Color3, Color4, Result};

/// Colour and scalar shading parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct NiMaterialProperty {
    pub net: ObjectNet,
    pub ambient: Color3,
    pub diffuse: Color3,
    pub specular: Color3,
    pub emissive: Color3,
    pub glossiness: f32,
    pub alpha: f32,
}

impl Default for NiMaterialProperty {
    fn default() -> Self {
        Self {
            net: ObjectNet::default(),
            ambient: Color3::splat(0.5),
            diffuse: Color3::splat(0.5),
            specular: Color3::splat(0.5),
            emissive: Color3::ZERO,
            glossiness: 10.0,
            alpha: 1.0,
        }
    }
}

impl BlockCodec for NiMaterialProperty {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self {
            net: ObjectNet::decode(cur)?,
            ambient: cur.read_color3()?,
            diffuse: cur.read_color3()?,
            specular: cur.read_color3()?,
            emissive: cur.read_color3()?,
            glossiness: cur.read_f32()?,
            alpha: cur.read_f32()?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.net.encode(w)?;
        w.write_color3(self.ambient);
        w.write_color3(self.diffuse);
        w.write_color3(self.specular);
        w.write_color3(self.emissive);
        w.write_f32(self.glossiness);
        w.write_f32(self.alpha);
        Ok(())
    }
}

/// Property whose whole state is a flag word (vertex colour, z-buffer, specular).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlagProperty {
    pub net: ObjectNet,
    pub flags: u16,
}

impl BlockCodec for FlagProperty {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self { net: ObjectNet::decode(cur)?, flags: cur.read_u16()? })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.net.encode(w)?;
        w.write_u16(self.flags);
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiAlphaProperty {
    pub net: ObjectNet,
    pub flags: u16,
    pub threshold: u8,
}

impl BlockCodec for NiAlphaProperty {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self {
            net: ObjectNet::decode(cur)?,
            flags: cur.read_u16()?,
            threshold: cur.read_u8()?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.net.encode(w)?;
        w.write_u16(self.flags);
        w.write_u8(self.threshold);
        Ok(())
    }
}

/// Typed extra data attached to an object.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtraData {
    Float(f32),
    Color(Color4),
    Integer(u32),
}

impl ExtraData {
    pub fn decode_float(cur: &mut BlockCursor<'_>) -> Result<Self> {
        cur.read_f32().map(Self::Float)
    }

    pub fn decode_color(cur: &mut BlockCursor<'_>) -> Result<Self> {
        cur.read_color4().map(Self::Color)
    }

    pub fn decode_integer(cur: &mut BlockCursor<'_>) -> Result<Self> {
        cur.read_u32().map(Self::Integer)
    }

    pub fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        match self {
            Self::Float(v) => w.write_f32(*v),
            Self::Color(c) => w.write_color4(*c),
            Self::Integer(v) => w.write_u32(*v),
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextKey {
    pub time: f32,
    pub value: String,
}

/// Named time markers for an animation sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiTextKeyExtraData {
    pub keys: Vec<TextKey>,
}

impl BlockCodec for NiTextKeyExtraData {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let count = cur.read_count(8)?;
        let keys = (0..count)
            .map(|_| -> Result<TextKey> { Ok(TextKey { time: cur.read_f32()?, value: cur.read_string()? }) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { keys })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        w.write_count(self.keys.len())?;
        for k in &self.keys {
            w.write_f32(k.time);
            w.write_string(&k.value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::cursor::StringTable;
    use crate::util::Endian;

    #[test]
    fn test_material_property_layout() {
        let mut mat = NiMaterialProperty::default();
        mat.diffuse = Color3::new(1.0, 0.0, 0.0);
        mat.alpha = 0.25;

        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Big, &mut table);
        mat.encode(&mut w).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 8 + 4 * 12 + 8);

        let mut cur = BlockCursor::new(&bytes, Endian::Big, &[], "NiMaterialProperty");
        assert_eq!(NiMaterialProperty::decode(&mut cur).unwrap(), mat);
    }

    #[test]
    fn test_text_keys() {
        let keys = NiTextKeyExtraData {
            keys: vec![
                TextKey { time: 0.0, value: "start".into() },
                TextKey { time: 1.5, value: "end".into() },
            ],
        };
        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Little, &mut table);
        keys.encode(&mut w).unwrap();
        let bytes = w.into_bytes();

        let strings = table.as_slice().to_vec();
        let mut cur = BlockCursor::new(&bytes, Endian::Little, &strings, "NiTextKeyExtraData");
        assert_eq!(NiTextKeyExtraData::decode(&mut cur).unwrap(), keys);
    }

    #[test]
    fn test_extra_data_sizes() {
        let mut table = StringTable::new();
        let mut w = BlockWriter::new(Endian::Little, &mut table);
        ExtraData::Color(Color4::ONE).encode(&mut w).unwrap();
        ExtraData::Integer(3).encode(&mut w).unwrap();
        assert_eq!(w.len(), 20);
    }
}
