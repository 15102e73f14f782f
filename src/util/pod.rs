//! Element data types for vertex attributes.
//!
//! Every vertex attribute stores 1-4 elements of one [`AttributeDataType`].
//! Conversions between element types follow plain numeric casts: integer to
//! integer wraps (two's complement truncation or sign/zero extension), float
//! to integer saturates, integer to float rounds to nearest.

use bytemuck::Pod;
use std::fmt;

use super::Endian;

/// Element type of a vertex attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AttributeDataType {
    Int8 = 0,
    UInt8 = 1,
    Int16 = 2,
    UInt16 = 3,
    Int32 = 4,
    UInt32 = 5,
    Float32 = 6,
    /// Unknown/unsupported wire format (zero-sized)
    #[default]
    Unknown = 127,
}

/// One element widened for conversion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl AttributeDataType {
    /// Size in bytes of a single element.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Unknown => 0,
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Float32 => "float32",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "int8" => Self::Int8,
            "uint8" => Self::UInt8,
            "int16" => Self::Int16,
            "uint16" => Self::UInt16,
            "int32" => Self::Int32,
            "uint32" => Self::UInt32,
            "float32" => Self::Float32,
            _ => Self::Unknown,
        }
    }

    #[inline]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32)
    }

    /// Decode one element. `buf` must hold at least [`num_bytes`](Self::num_bytes).
    pub fn read_scalar(self, buf: &[u8], endian: Endian) -> Scalar {
        match self {
            Self::Int8 => Scalar::Int(buf[0] as i8 as i64),
            Self::UInt8 => Scalar::Int(buf[0] as i64),
            Self::Int16 => Scalar::Int(endian.read_i16(buf) as i64),
            Self::UInt16 => Scalar::Int(endian.read_u16(buf) as i64),
            Self::Int32 => Scalar::Int(endian.read_i32(buf) as i64),
            Self::UInt32 => Scalar::Int(endian.read_u32(buf) as i64),
            Self::Float32 => Scalar::Float(endian.read_f32(buf) as f64),
            Self::Unknown => Scalar::Int(0),
        }
    }

    /// Encode one element, casting from whatever the source held.
    pub fn write_scalar(self, buf: &mut [u8], endian: Endian, value: Scalar) {
        match self {
            Self::Int8 => {
                buf[0] = match value {
                    Scalar::Int(v) => v as i8,
                    Scalar::Float(v) => v as i8,
                } as u8
            }
            Self::UInt8 => {
                buf[0] = match value {
                    Scalar::Int(v) => v as u8,
                    Scalar::Float(v) => v as u8,
                }
            }
            Self::Int16 => endian.write_i16(
                buf,
                match value {
                    Scalar::Int(v) => v as i16,
                    Scalar::Float(v) => v as i16,
                },
            ),
            Self::UInt16 => endian.write_u16(
                buf,
                match value {
                    Scalar::Int(v) => v as u16,
                    Scalar::Float(v) => v as u16,
                },
            ),
            Self::Int32 => endian.write_i32(
                buf,
                match value {
                    Scalar::Int(v) => v as i32,
                    Scalar::Float(v) => v as i32,
                },
            ),
            Self::UInt32 => endian.write_u32(
                buf,
                match value {
                    Scalar::Int(v) => v as u32,
                    Scalar::Float(v) => v as u32,
                },
            ),
            Self::Float32 => endian.write_f32(
                buf,
                match value {
                    Scalar::Int(v) => v as f32,
                    Scalar::Float(v) => v as f32,
                },
            ),
            Self::Unknown => {}
        }
    }

    /// Convert one element from `self` in `src` to `dst_type` in `dst`.
    #[inline]
    pub fn convert(
        self,
        src: &[u8],
        src_endian: Endian,
        dst_type: AttributeDataType,
        dst: &mut [u8],
        dst_endian: Endian,
    ) {
        dst_type.write_scalar(dst, dst_endian, self.read_scalar(src, src_endian));
    }
}

impl fmt::Display for AttributeDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rust element types that map onto an [`AttributeDataType`].
pub trait AttributePod: Pod + Copy + Default {
    const DATA_TYPE: AttributeDataType;
}

impl AttributePod for i8 {
    const DATA_TYPE: AttributeDataType = AttributeDataType::Int8;
}

impl AttributePod for u8 {
    const DATA_TYPE: AttributeDataType = AttributeDataType::UInt8;
}

impl AttributePod for i16 {
    const DATA_TYPE: AttributeDataType = AttributeDataType::Int16;
}

impl AttributePod for u16 {
    const DATA_TYPE: AttributeDataType = AttributeDataType::UInt16;
}

impl AttributePod for i32 {
    const DATA_TYPE: AttributeDataType = AttributeDataType::Int32;
}

impl AttributePod for u32 {
    const DATA_TYPE: AttributeDataType = AttributeDataType::UInt32;
}

impl AttributePod for f32 {
    const DATA_TYPE: AttributeDataType = AttributeDataType::Float32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(AttributeDataType::UInt8.num_bytes(), 1);
        assert_eq!(AttributeDataType::Int16.num_bytes(), 2);
        assert_eq!(AttributeDataType::Float32.num_bytes(), 4);
        assert_eq!(AttributeDataType::Unknown.num_bytes(), 0);
    }

    #[test]
    fn test_names() {
        assert_eq!(AttributeDataType::from_name("uint16"), AttributeDataType::UInt16);
        assert_eq!(AttributeDataType::from_name("bogus"), AttributeDataType::Unknown);
    }

    #[test]
    fn test_widening_keeps_sign() {
        let src = [0xFFu8];
        let mut dst = [0u8; 4];
        AttributeDataType::Int8.convert(&src, Endian::Little, AttributeDataType::Int32, &mut dst, Endian::Little);
        assert_eq!(i32::from_le_bytes(dst), -1);

        AttributeDataType::UInt8.convert(&src, Endian::Little, AttributeDataType::Int32, &mut dst, Endian::Little);
        assert_eq!(i32::from_le_bytes(dst), 255);
    }

    #[test]
    fn test_narrowing_wraps() {
        let src = 0x1234u16.to_be_bytes();
        let mut dst = [0u8; 1];
        AttributeDataType::UInt16.convert(&src, Endian::Big, AttributeDataType::UInt8, &mut dst, Endian::Little);
        assert_eq!(dst[0], 0x34);
    }

    #[test]
    fn test_float_to_int_saturates() {
        let src = 300.7f32.to_le_bytes();
        let mut dst = [0u8; 1];
        AttributeDataType::Float32.convert(&src, Endian::Little, AttributeDataType::UInt8, &mut dst, Endian::Little);
        assert_eq!(dst[0], 255);
    }

    #[test]
    fn test_byte_swap_only() {
        let src = 2.5f32.to_be_bytes();
        let mut dst = [0u8; 4];
        AttributeDataType::Float32.convert(&src, Endian::Big, AttributeDataType::Float32, &mut dst, Endian::Little);
        assert_eq!(f32::from_le_bytes(dst), 2.5);
    }
}
