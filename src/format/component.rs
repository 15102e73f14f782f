//! Component-format table.
//!
//! Data streams describe each vertex attribute with a 32-bit component tag.
//! The table below maps every known tag to the element type and element count
//! used when copying the raw bytes into a mesh buffer. Normalized signed tags
//! map to the *unsigned* element type, and half floats are carried as raw
//! `UInt16`; both match the exporter's own table and are kept as-is.

use crate::util::AttributeDataType;
use std::fmt;

use AttributeDataType::{Float32, Int16, Int32, Int8, UInt16, UInt32, UInt8};

/// Wire tag describing one vertex attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ComponentFormat(pub u32);

/// Element type and count a component tag resolves to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ComponentInfo {
    pub data_type: AttributeDataType,
    pub element_count: u8,
}

impl ComponentInfo {
    pub const UNKNOWN: Self = Self { data_type: AttributeDataType::Unknown, element_count: 0 };

    #[inline]
    pub const fn size(&self) -> usize {
        self.data_type.num_bytes() * self.element_count as usize
    }

    #[inline]
    pub const fn is_known(&self) -> bool {
        self.data_type.is_known()
    }
}

impl ComponentFormat {
    pub const UNKNOWN: Self = Self(0x0000_0000);
    pub const INT8_1: Self = Self(0x0001_0101);
    pub const INT8_2: Self = Self(0x0002_0102);
    pub const INT8_3: Self = Self(0x0003_0103);
    pub const INT8_4: Self = Self(0x0004_0104);
    pub const UINT8_1: Self = Self(0x0001_0105);
    pub const UINT8_2: Self = Self(0x0002_0106);
    pub const UINT8_3: Self = Self(0x0003_0107);
    pub const UINT8_4: Self = Self(0x0004_0108);
    pub const NORMINT8_1: Self = Self(0x0001_0109);
    pub const NORMINT8_2: Self = Self(0x0002_010A);
    pub const NORMINT8_3: Self = Self(0x0003_010B);
    pub const NORMINT8_4: Self = Self(0x0004_010C);
    pub const NORMUINT8_1: Self = Self(0x0001_010D);
    pub const NORMUINT8_2: Self = Self(0x0002_010E);
    pub const NORMUINT8_3: Self = Self(0x0003_010F);
    pub const NORMUINT8_4: Self = Self(0x0004_0110);
    pub const INT16_1: Self = Self(0x0001_0211);
    pub const INT16_2: Self = Self(0x0002_0212);
    pub const INT16_3: Self = Self(0x0003_0213);
    pub const INT16_4: Self = Self(0x0004_0214);
    pub const UINT16_1: Self = Self(0x0001_0215);
    pub const UINT16_2: Self = Self(0x0002_0216);
    pub const UINT16_3: Self = Self(0x0003_0217);
    pub const UINT16_4: Self = Self(0x0004_0218);
    pub const NORMINT16_1: Self = Self(0x0001_0219);
    pub const NORMINT16_2: Self = Self(0x0002_021A);
    pub const NORMINT16_3: Self = Self(0x0003_021B);
    pub const NORMINT16_4: Self = Self(0x0004_021C);
    pub const NORMUINT16_1: Self = Self(0x0001_021D);
    pub const NORMUINT16_2: Self = Self(0x0002_021E);
    pub const NORMUINT16_3: Self = Self(0x0003_021F);
    pub const NORMUINT16_4: Self = Self(0x0004_0220);
    pub const INT32_1: Self = Self(0x0001_0421);
    pub const INT32_2: Self = Self(0x0002_0422);
    pub const INT32_3: Self = Self(0x0003_0423);
    pub const INT32_4: Self = Self(0x0004_0424);
    pub const UINT32_1: Self = Self(0x0001_0425);
    pub const UINT32_2: Self = Self(0x0002_0426);
    pub const UINT32_3: Self = Self(0x0003_0427);
    pub const UINT32_4: Self = Self(0x0004_0428);
    pub const NORMINT32_1: Self = Self(0x0001_0429);
    pub const NORMINT32_2: Self = Self(0x0002_042A);
    pub const NORMINT32_3: Self = Self(0x0003_042B);
    pub const NORMINT32_4: Self = Self(0x0004_042C);
    pub const NORMUINT32_1: Self = Self(0x0001_042D);
    pub const NORMUINT32_2: Self = Self(0x0002_042E);
    pub const NORMUINT32_3: Self = Self(0x0003_042F);
    pub const NORMUINT32_4: Self = Self(0x0004_0430);
    pub const FLOAT16_1: Self = Self(0x0001_0231);
    pub const FLOAT16_2: Self = Self(0x0002_0232);
    pub const FLOAT16_3: Self = Self(0x0003_0233);
    pub const FLOAT16_4: Self = Self(0x0004_0234);
    pub const FLOAT32_1: Self = Self(0x0001_0435);
    pub const FLOAT32_2: Self = Self(0x0002_0436);
    pub const FLOAT32_3: Self = Self(0x0003_0437);
    pub const FLOAT32_4: Self = Self(0x0004_0438);
    pub const UINT_10_10_10_L1: Self = Self(0x0001_0439);
    pub const NORMINT_10_10_10_L1: Self = Self(0x0001_043A);
    pub const NORMINT_11_11_10: Self = Self(0x0001_043B);
    pub const NORMUINT8_4_BGRA: Self = Self(0x0004_013C);
    pub const NORMINT_10_10_10_2: Self = Self(0x0001_043D);
    pub const UINT_10_10_10_2: Self = Self(0x0001_043E);
    /// Two-component 16-bit tag seen in some exporters, outside the stock enum.
    pub const UNKNOWN_20240: Self = Self(0x0002_0240);

    /// Resolve through the table; tags absent from it degrade to unknown/zero-size.
    pub fn info(self) -> ComponentInfo {
        COMPONENT_TABLE
            .iter()
            .find(|(tag, _)| *tag == self)
            .map(|(_, info)| *info)
            .unwrap_or(ComponentInfo::UNKNOWN)
    }

    /// Canonical tag for writing an attribute of this element type and count.
    pub fn canonical(data_type: AttributeDataType, count: u8) -> Option<Self> {
        let tag = match (data_type, count) {
            (Int8, 1) => Self::INT8_1,
            (Int8, 2) => Self::INT8_2,
            (Int8, 3) => Self::INT8_3,
            (Int8, 4) => Self::INT8_4,
            (UInt8, 1) => Self::UINT8_1,
            (UInt8, 2) => Self::UINT8_2,
            (UInt8, 3) => Self::UINT8_3,
            (UInt8, 4) => Self::UINT8_4,
            (Int16, 1) => Self::INT16_1,
            (Int16, 2) => Self::INT16_2,
            (Int16, 3) => Self::INT16_3,
            (Int16, 4) => Self::INT16_4,
            (UInt16, 1) => Self::UINT16_1,
            (UInt16, 2) => Self::UINT16_2,
            (UInt16, 3) => Self::UINT16_3,
            (UInt16, 4) => Self::UINT16_4,
            (Int32, 1) => Self::INT32_1,
            (Int32, 2) => Self::INT32_2,
            (Int32, 3) => Self::INT32_3,
            (Int32, 4) => Self::INT32_4,
            (UInt32, 1) => Self::UINT32_1,
            (UInt32, 2) => Self::UINT32_2,
            (UInt32, 3) => Self::UINT32_3,
            (UInt32, 4) => Self::UINT32_4,
            (Float32, 1) => Self::FLOAT32_1,
            (Float32, 2) => Self::FLOAT32_2,
            (Float32, 3) => Self::FLOAT32_3,
            (Float32, 4) => Self::FLOAT32_4,
            _ => return None,
        };
        Some(tag)
    }
}

impl fmt::Display for ComponentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

const fn entry(tag: ComponentFormat, data_type: AttributeDataType, element_count: u8) -> (ComponentFormat, ComponentInfo) {
    (tag, ComponentInfo { data_type, element_count })
}

/// Every tag the importer understands.
pub static COMPONENT_TABLE: &[(ComponentFormat, ComponentInfo)] = &[
    entry(ComponentFormat::INT8_1, Int8, 1),
    entry(ComponentFormat::UINT8_1, UInt8, 1),
    entry(ComponentFormat::NORMINT8_1, UInt8, 1),
    entry(ComponentFormat::NORMUINT8_1, UInt8, 1),
    entry(ComponentFormat::INT16_1, Int16, 1),
    entry(ComponentFormat::UINT16_1, UInt16, 1),
    entry(ComponentFormat::NORMINT16_1, UInt16, 1),
    entry(ComponentFormat::NORMUINT16_1, UInt16, 1),
    entry(ComponentFormat::FLOAT16_1, UInt16, 1),
    entry(ComponentFormat::INT32_1, Int32, 1),
    entry(ComponentFormat::UINT32_1, UInt32, 1),
    entry(ComponentFormat::NORMINT32_1, UInt32, 1),
    entry(ComponentFormat::NORMUINT32_1, UInt32, 1),
    entry(ComponentFormat::FLOAT32_1, Float32, 1),
    entry(ComponentFormat::UINT_10_10_10_L1, UInt32, 1),
    entry(ComponentFormat::NORMINT_10_10_10_L1, UInt32, 1),
    entry(ComponentFormat::NORMINT_11_11_10, UInt32, 1),
    entry(ComponentFormat::NORMINT_10_10_10_2, UInt32, 1),
    entry(ComponentFormat::UINT_10_10_10_2, UInt32, 1),
    entry(ComponentFormat::INT8_2, Int8, 2),
    entry(ComponentFormat::UINT8_2, UInt8, 2),
    entry(ComponentFormat::NORMINT8_2, UInt8, 2),
    entry(ComponentFormat::NORMUINT8_2, UInt8, 2),
    entry(ComponentFormat::INT16_2, Int16, 2),
    entry(ComponentFormat::UINT16_2, UInt16, 2),
    entry(ComponentFormat::NORMINT16_2, UInt16, 2),
    entry(ComponentFormat::NORMUINT16_2, UInt16, 2),
    entry(ComponentFormat::FLOAT16_2, UInt16, 2),
    entry(ComponentFormat::UNKNOWN_20240, UInt16, 2),
    entry(ComponentFormat::INT32_2, Int32, 2),
    entry(ComponentFormat::UINT32_2, UInt32, 2),
    entry(ComponentFormat::NORMINT32_2, UInt32, 2),
    entry(ComponentFormat::NORMUINT32_2, UInt32, 2),
    entry(ComponentFormat::FLOAT32_2, Float32, 2),
    entry(ComponentFormat::INT8_3, Int8, 3),
    entry(ComponentFormat::UINT8_3, UInt8, 3),
    entry(ComponentFormat::NORMINT8_3, UInt8, 3),
    entry(ComponentFormat::NORMUINT8_3, UInt8, 3),
    entry(ComponentFormat::INT16_3, Int16, 3),
    entry(ComponentFormat::UINT16_3, UInt16, 3),
    entry(ComponentFormat::NORMINT16_3, UInt16, 3),
    entry(ComponentFormat::NORMUINT16_3, UInt16, 3),
    entry(ComponentFormat::FLOAT16_3, UInt16, 3),
    entry(ComponentFormat::INT32_3, Int32, 3),
    entry(ComponentFormat::UINT32_3, UInt32, 3),
    entry(ComponentFormat::NORMINT32_3, UInt32, 3),
    entry(ComponentFormat::NORMUINT32_3, UInt32, 3),
    entry(ComponentFormat::FLOAT32_3, Float32, 3),
    entry(ComponentFormat::INT8_4, Int8, 4),
    entry(ComponentFormat::UINT8_4, UInt8, 4),
    entry(ComponentFormat::NORMINT8_4, UInt8, 4),
    entry(ComponentFormat::NORMUINT8_4, UInt8, 4),
    entry(ComponentFormat::NORMUINT8_4_BGRA, UInt8, 4),
    entry(ComponentFormat::INT16_4, Int16, 4),
    entry(ComponentFormat::UINT16_4, UInt16, 4),
    entry(ComponentFormat::NORMINT16_4, UInt16, 4),
    entry(ComponentFormat::NORMUINT16_4, UInt16, 4),
    entry(ComponentFormat::FLOAT16_4, UInt16, 4),
    entry(ComponentFormat::INT32_4, Int32, 4),
    entry(ComponentFormat::UINT32_4, UInt32, 4),
    entry(ComponentFormat::NORMINT32_4, UInt32, 4),
    entry(ComponentFormat::NORMUINT32_4, UInt32, 4),
    entry(ComponentFormat::FLOAT32_4, Float32, 4),
];
