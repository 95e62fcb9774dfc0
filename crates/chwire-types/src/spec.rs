//! 线上格式常量与二进制类型标记表
//!
//! 类型标记表必须与服务端逐字节一致。

pub const MAX_NESTING_DEPTH: usize = 100;
pub const MAX_STRING_LENGTH: usize = 1 << 30;
pub const MAX_ARRAY_LENGTH: usize = 1 << 28;

/// Variant / Geometry 判别字节中表示 NULL 的值
pub const NULL_DISCRIMINATOR: u8 = 0xFF;

/// Variant 成员上限，判别值 0..=254
pub const MAX_VARIANT_MEMBERS: usize = NULL_DISCRIMINATOR as usize;

pub const JSON_SERIALIZATION_VERSION: u8 = 0;
pub const DEFAULT_MAX_DYNAMIC_PATHS: u64 = 1024;
pub const DEFAULT_MAX_DYNAMIC_TYPES: u8 = 32;

pub const MAX_DATETIME64_SCALE: u8 = 9;
pub const MAX_DECIMAL_PRECISION: u8 = 76;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryTypeTag {
    Nothing = 0x00,
    UInt8 = 0x01,
    UInt16 = 0x02,
    UInt32 = 0x03,
    UInt64 = 0x04,
    UInt128 = 0x05,
    UInt256 = 0x06,
    Int8 = 0x07,
    Int16 = 0x08,
    Int32 = 0x09,
    Int64 = 0x0A,
    Int128 = 0x0B,
    Int256 = 0x0C,
    Float32 = 0x0D,
    Float64 = 0x0E,
    Date = 0x0F,
    Date32 = 0x10,
    DateTime = 0x11,
    DateTimeWithTimezone = 0x12,
    DateTime64 = 0x13,
    DateTime64WithTimezone = 0x14,
    String = 0x15,
    FixedString = 0x16,
    Enum8 = 0x17,
    Enum16 = 0x18,
    Decimal32 = 0x19,
    Decimal64 = 0x1A,
    Decimal128 = 0x1B,
    Decimal256 = 0x1C,
    Uuid = 0x1D,
    Array = 0x1E,
    Tuple = 0x1F,
    NamedTuple = 0x20,
    Set = 0x21,
    Interval = 0x22,
    Nullable = 0x23,
    Function = 0x24,
    AggregateFunction = 0x25,
    LowCardinality = 0x26,
    Map = 0x27,
    Ipv4 = 0x28,
    Ipv6 = 0x29,
    Variant = 0x2A,
    Dynamic = 0x2B,
    Custom = 0x2C,
    Bool = 0x2D,
    SimpleAggregateFunction = 0x2E,
    Nested = 0x2F,
    Json = 0x30,
    BFloat16 = 0x31,
    Time = 0x32,
    Time64 = 0x34,
    QBit = 0x35,
}

impl BinaryTypeTag {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Nothing),
            0x01 => Some(Self::UInt8),
            0x02 => Some(Self::UInt16),
            0x03 => Some(Self::UInt32),
            0x04 => Some(Self::UInt64),
            0x05 => Some(Self::UInt128),
            0x06 => Some(Self::UInt256),
            0x07 => Some(Self::Int8),
            0x08 => Some(Self::Int16),
            0x09 => Some(Self::Int32),
            0x0A => Some(Self::Int64),
            0x0B => Some(Self::Int128),
            0x0C => Some(Self::Int256),
            0x0D => Some(Self::Float32),
            0x0E => Some(Self::Float64),
            0x0F => Some(Self::Date),
            0x10 => Some(Self::Date32),
            0x11 => Some(Self::DateTime),
            0x12 => Some(Self::DateTimeWithTimezone),
            0x13 => Some(Self::DateTime64),
            0x14 => Some(Self::DateTime64WithTimezone),
            0x15 => Some(Self::String),
            0x16 => Some(Self::FixedString),
            0x17 => Some(Self::Enum8),
            0x18 => Some(Self::Enum16),
            0x19 => Some(Self::Decimal32),
            0x1A => Some(Self::Decimal64),
            0x1B => Some(Self::Decimal128),
            0x1C => Some(Self::Decimal256),
            0x1D => Some(Self::Uuid),
            0x1E => Some(Self::Array),
            0x1F => Some(Self::Tuple),
            0x20 => Some(Self::NamedTuple),
            0x21 => Some(Self::Set),
            0x22 => Some(Self::Interval),
            0x23 => Some(Self::Nullable),
            0x24 => Some(Self::Function),
            0x25 => Some(Self::AggregateFunction),
            0x26 => Some(Self::LowCardinality),
            0x27 => Some(Self::Map),
            0x28 => Some(Self::Ipv4),
            0x29 => Some(Self::Ipv6),
            0x2A => Some(Self::Variant),
            0x2B => Some(Self::Dynamic),
            0x2C => Some(Self::Custom),
            0x2D => Some(Self::Bool),
            0x2E => Some(Self::SimpleAggregateFunction),
            0x2F => Some(Self::Nested),
            0x30 => Some(Self::Json),
            0x31 => Some(Self::BFloat16),
            0x32 => Some(Self::Time),
            0x34 => Some(Self::Time64),
            0x35 => Some(Self::QBit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_table_is_consistent() {
        for byte in 0u8..=0xFF {
            if let Some(tag) = BinaryTypeTag::from_u8(byte) {
                assert_eq!(tag as u8, byte);
            }
        }
        assert_eq!(BinaryTypeTag::from_u8(0x33), None);
        assert_eq!(BinaryTypeTag::from_u8(0x36), None);
    }
}
