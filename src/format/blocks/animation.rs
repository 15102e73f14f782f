//! Animation blocks: keyed curves, evaluators and sequences.
//!
//! Curves are captured structurally; nothing here samples them.
//! Every key is read by [`read_key`], generic over the sampled value type.

use std::fmt::Debug;

use super::BlockCodec;
use crate::format::cursor::{BlockCursor, BlockRef, BlockWriter};
use crate::util::{Quat, QuatTransform, Result, Vec3};

/// Interpolation of a key group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum KeyType {
    #[default]
    Linear = 1,
    Quadratic = 2,
    Tbc = 3,
    Xyz = 4,
    Const = 5,
}

impl KeyType {
    fn read(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let raw = cur.read_u32()?;
        Ok(match raw {
            1 => Self::Linear,
            2 => Self::Quadratic,
            3 => Self::Tbc,
            4 => Self::Xyz,
            5 => Self::Const,
            _ => return Err(cur.corrupt(format!("invalid key type {}", raw))),
        })
    }
}

/// Value types a key can carry.
pub trait KeyValue: Copy + Default + PartialEq + Debug {
    /// Quadratic keys store forward/backward tangents of this type.
    const HAS_TANGENTS: bool = true;

    fn read(cur: &mut BlockCursor<'_>) -> Result<Self>;
    fn write(&self, w: &mut BlockWriter<'_>);
}

impl KeyValue for f32 {
    fn read(cur: &mut BlockCursor<'_>) -> Result<Self> {
        cur.read_f32()
    }

    fn write(&self, w: &mut BlockWriter<'_>) {
        w.write_f32(*self);
    }
}

impl KeyValue for Vec3 {
    fn read(cur: &mut BlockCursor<'_>) -> Result<Self> {
        cur.read_vec3()
    }

    fn write(&self, w: &mut BlockWriter<'_>) {
        w.write_vec3(*self);
    }
}

impl KeyValue for Quat {
    const HAS_TANGENTS: bool = false;

    fn read(cur: &mut BlockCursor<'_>) -> Result<Self> {
        cur.read_quat()
    }

    fn write(&self, w: &mut BlockWriter<'_>) {
        w.write_quat(*self);
    }
}

/// Tension/bias/continuity of a TBC key.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tbc {
    pub tension: f32,
    pub bias: f32,
    pub continuity: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Key<T: KeyValue> {
    pub time: f32,
    pub value: T,
    pub forward: T,
    pub backward: T,
    pub tbc: Tbc,
}

impl<T: KeyValue> Key<T> {
    pub fn new(time: f32, value: T) -> Self {
        Self { time, value, ..Default::default() }
    }
}

/// Read one key whose trailing fields depend on `key_type`.
pub fn read_key<T: KeyValue>(cur: &mut BlockCursor<'_>, key_type: KeyType) -> Result<Key<T>> {
    let mut key = Key { time: cur.read_f32()?, value: T::read(cur)?, ..Default::default() };
    match key_type {
        KeyType::Quadratic if T::HAS_TANGENTS => {
            key.forward = T::read(cur)?;
            key.backward = T::read(cur)?;
        }
        KeyType::Tbc => {
            key.tbc = Tbc {
                tension: cur.read_f32()?,
                bias: cur.read_f32()?,
                continuity: cur.read_f32()?,
            };
        }
        _ => {}
    }
    Ok(key)
}

pub fn write_key<T: KeyValue>(w: &mut BlockWriter<'_>, key: &Key<T>, key_type: KeyType) {
    w.write_f32(key.time);
    key.value.write(w);
    match key_type {
        KeyType::Quadratic if T::HAS_TANGENTS => {
            key.forward.write(w);
            key.backward.write(w);
        }
        KeyType::Tbc => {
            w.write_f32(key.tbc.tension);
            w.write_f32(key.tbc.bias);
            w.write_f32(key.tbc.continuity);
        }
        _ => {}
    }
}

fn read_keys<T: KeyValue>(cur: &mut BlockCursor<'_>, count: usize, key_type: KeyType) -> Result<Vec<Key<T>>> {
    (0..count).map(|_| read_key(cur, key_type)).collect()
}

/// Count-prefixed keys; the interpolation is stored only when keys exist.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyGroup<T: KeyValue> {
    pub interpolation: KeyType,
    pub keys: Vec<Key<T>>,
}

impl<T: KeyValue> KeyGroup<T> {
    pub fn read(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let count = cur.read_count(4)?;
        if count == 0 {
            return Ok(Self::default());
        }
        let interpolation = KeyType::read(cur)?;
        Ok(Self { interpolation, keys: read_keys(cur, count, interpolation)? })
    }

    pub fn write(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        w.write_count(self.keys.len())?;
        if self.keys.is_empty() {
            return Ok(());
        }
        w.write_u32(self.interpolation as u32);
        for k in &self.keys {
            write_key(w, k, self.interpolation);
        }
        Ok(())
    }
}

/// Rotation channel of a transform curve.
#[derive(Clone, Debug, PartialEq)]
pub enum RotationKeys {
    Quaternion { key_type: KeyType, keys: Vec<Key<Quat>> },
    /// Separate Euler curves; `num_keys` is the stored (ignored) count.
    Xyz { num_keys: u32, groups: [KeyGroup<f32>; 3] },
}

impl Default for RotationKeys {
    fn default() -> Self {
        Self::Quaternion { key_type: KeyType::Linear, keys: Vec::new() }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiTransformData {
    pub rotations: RotationKeys,
    pub translations: KeyGroup<Vec3>,
    pub scales: KeyGroup<f32>,
}

impl BlockCodec for NiTransformData {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let count = cur.read_count(4)?;
        let rotations = if count == 0 {
            RotationKeys::default()
        } else {
            match KeyType::read(cur)? {
                KeyType::Xyz => RotationKeys::Xyz {
                    num_keys: count as u32,
                    groups: [KeyGroup::read(cur)?, KeyGroup::read(cur)?, KeyGroup::read(cur)?],
                },
                key_type => RotationKeys::Quaternion { key_type, keys: read_keys(cur, count, key_type)? },
            }
        };
        Ok(Self {
            rotations,
            translations: KeyGroup::read(cur)?,
            scales: KeyGroup::read(cur)?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        match &self.rotations {
            RotationKeys::Quaternion { key_type, keys } => {
                w.write_count(keys.len())?;
                if !keys.is_empty() {
                    w.write_u32(*key_type as u32);
                    for k in keys {
                        write_key(w, k, *key_type);
                    }
                }
            }
            RotationKeys::Xyz { num_keys, groups } => {
                w.write_u32((*num_keys).max(1));
                w.write_u32(KeyType::Xyz as u32);
                for g in groups {
                    g.write(w)?;
                }
            }
        }
        self.translations.write(w)?;
        self.scales.write(w)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiFloatData {
    pub keys: KeyGroup<f32>,
}

impl BlockCodec for NiFloatData {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self { keys: KeyGroup::read(cur)? })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.keys.write(w)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiFloatInterpolator {
    pub value: f32,
    pub data: BlockRef,
}

impl BlockCodec for NiFloatInterpolator {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self { value: cur.read_f32()?, data: cur.read_ref()? })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        w.write_f32(self.value);
        w.write_ref(self.data);
        Ok(())
    }
}

/// Target description shared by evaluators.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvaluatorHeader {
    pub node_name: Option<String>,
    pub property_type: Option<String>,
    pub controller_type: Option<String>,
    pub controller_id: Option<String>,
    pub interpolator_id: Option<String>,
    pub channel_types: [u8; 4],
}

impl BlockCodec for EvaluatorHeader {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let mut header = Self {
            node_name: cur.read_string_ref()?,
            property_type: cur.read_string_ref()?,
            controller_type: cur.read_string_ref()?,
            controller_id: cur.read_string_ref()?,
            interpolator_id: cur.read_string_ref()?,
            channel_types: [0; 4],
        };
        for c in header.channel_types.iter_mut() {
            *c = cur.read_u8()?;
        }
        Ok(header)
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        w.write_string_ref(self.node_name.as_deref());
        w.write_string_ref(self.property_type.as_deref());
        w.write_string_ref(self.controller_type.as_deref());
        w.write_string_ref(self.controller_id.as_deref());
        w.write_string_ref(self.interpolator_id.as_deref());
        w.write_bytes(&self.channel_types);
        Ok(())
    }
}

/// Keyframed transform evaluator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiTransformEvaluator {
    pub header: EvaluatorHeader,
    pub value: QuatTransform,
    pub data: BlockRef,
}

impl BlockCodec for NiTransformEvaluator {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self {
            header: EvaluatorHeader::decode(cur)?,
            value: cur.read_quat_transform()?,
            data: cur.read_ref()?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.header.encode(w)?;
        w.write_quat_transform(&self.value);
        w.write_ref(self.data);
        Ok(())
    }
}

/// Offset and half range that de-quantize one compressed spline channel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChannelRange {
    pub offset: f32,
    pub half_range: f32,
}

/// Compressed B-spline transform evaluator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiBSplineCompTransformEvaluator {
    pub header: EvaluatorHeader,
    pub start_time: f32,
    pub end_time: f32,
    pub data: BlockRef,
    pub basis: BlockRef,
    pub value: QuatTransform,
    pub translation_handle: u32,
    pub rotation_handle: u32,
    pub scale_handle: u32,
    pub translation_range: ChannelRange,
    pub rotation_range: ChannelRange,
    pub scale_range: ChannelRange,
}

impl BlockCodec for NiBSplineCompTransformEvaluator {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        let header = EvaluatorHeader::decode(cur)?;
        let start_time = cur.read_f32()?;
        let end_time = cur.read_f32()?;
        let data = cur.read_ref()?;
        let basis = cur.read_ref()?;
        let value = cur.read_quat_transform()?;
        let translation_handle = cur.read_u32()?;
        let rotation_handle = cur.read_u32()?;
        let scale_handle = cur.read_u32()?;
        let mut range = || -> Result<ChannelRange> {
            Ok(ChannelRange { offset: cur.read_f32()?, half_range: cur.read_f32()? })
        };
        let translation_range = range()?;
        let rotation_range = range()?;
        let scale_range = range()?;
        Ok(Self {
            header,
            start_time,
            end_time,
            data,
            basis,
            value,
            translation_handle,
            rotation_handle,
            scale_handle,
            translation_range,
            rotation_range,
            scale_range,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        self.header.encode(w)?;
        w.write_f32(self.start_time);
        w.write_f32(self.end_time);
        w.write_ref(self.data);
        w.write_ref(self.basis);
        w.write_quat_transform(&self.value);
        w.write_u32(self.translation_handle);
        w.write_u32(self.rotation_handle);
        w.write_u32(self.scale_handle);
        for r in [self.translation_range, self.rotation_range, self.scale_range] {
            w.write_f32(r.offset);
            w.write_f32(r.half_range);
        }
        Ok(())
    }
}

/// Keyed animation sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NiSequenceData {
    pub evaluators: Vec<BlockRef>,
    pub text_keys: BlockRef,
    pub duration: f32,
    pub cycle_type: u32,
    pub frequency: f32,
    pub accum_root_name: Option<String>,
    pub accum_flags: u32,
}

impl BlockCodec for NiSequenceData {
    fn decode(cur: &mut BlockCursor<'_>) -> Result<Self> {
        Ok(Self {
            evaluators: cur.read_ref_list()?,
            text_keys: cur.read_ref()?,
            duration: cur.read_f32()?,
            cycle_type: cur.read_u32()?,
            frequency: cur.read_f32()?,
            accum_root_name: cur.read_string_ref()?,
            accum_flags: cur.read_u32()?,
        })
    }

    fn encode(&self, w: &mut BlockWriter<'_>) -> Result<()> {
        w.write_ref_list(&self.evaluators)?;
        w.write_ref(self.text_keys);
        w.write_f32(self.duration);
        w.write_u32(self.cycle_type);
        w.write_f32(self.frequency);
        w.write_string_ref(self.accum_root_name.as_deref());
        w.write_u32(self.accum_flags);
        Ok(())
    }
}
