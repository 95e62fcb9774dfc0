//! 宿主值类型定义模块
//!
//! 定义编解码器读写的所有值形状，包括标量、复合与自描述类型。
//! `Value` 实现 `Eq`/`Hash`，可作为关联容器的键。

use crate::decimal::ClickHouseDecimal;
use crate::named_tuple::NamedTuple;
use crate::record::JsonRecord;
use crate::temporal::DateTimeValue;
use crate::types::GeoKind;
use crate::{CodecError, CodecResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use num_bigint::{BigInt, BigUint};
use num_traits::{FromPrimitive, ToPrimitive};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use uuid::Uuid;

/// 编解码器的值
///
/// # 支持的形状
///
/// - **标量**: Null, Bool, 8 到 256 位整数, Float32/64, Decimal, String, Bytes
/// - **标识与地址**: Uuid, Ipv4, Ipv6
/// - **时间**: Date, DateTime, Time
/// - **复合**: Array, Tuple, NamedTuple, Map, Pairs, Geometry
/// - **结构化**: Json, Record
///
/// 浮点数按位模式比较与哈希，十进制按数值比较与哈希。
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    Int256(BigInt),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    UInt256(BigUint),
    Float32(f32),
    Float64(f64),
    /// 任意精度十进制
    Decimal(ClickHouseDecimal),
    /// 定宽十进制(96 位尾数)
    NativeDecimal(rust_decimal::Decimal),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Date(NaiveDate),
    DateTime(DateTimeValue),
    /// 时长(Time / Time64)
    Time(TimeDelta),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    NamedTuple(NamedTuple),
    /// 关联容器
    Map(IndexMap<Value, Value>),
    /// 有序键值对列表
    Pairs(Vec<(Value, Value)>),
    /// 带种类标记的几何值
    Geometry(GeoKind, Box<Value>),
    Json(serde_json::Value),
    /// 按注册模式扁平化的记录对象
    Record(Arc<dyn JsonRecord>),
}

impl Value {
    /// 获取值的形状名称
    ///
    /// # Brief
    /// 用于错误信息中描述实际收到的值
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int8(_) => "Int8",
            Value::Int16(_) => "Int16",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Int128(_) => "Int128",
            Value::Int256(_) => "Int256",
            Value::UInt8(_) => "UInt8",
            Value::UInt16(_) => "UInt16",
            Value::UInt32(_) => "UInt32",
            Value::UInt64(_) => "UInt64",
            Value::UInt128(_) => "UInt128",
            Value::UInt256(_) => "UInt256",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::Decimal(_) => "Decimal",
            Value::NativeDecimal(_) => "NativeDecimal",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Uuid(_) => "UUID",
            Value::Ipv4(_) => "IPv4",
            Value::Ipv6(_) => "IPv6",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Time(_) => "Time",
            Value::Array(_) => "Array",
            Value::Tuple(_) => "Tuple",
            Value::NamedTuple(_) => "NamedTuple",
            Value::Map(_) => "Map",
            Value::Pairs(_) => "Pairs",
            Value::Geometry(..) => "Geometry",
            Value::Json(_) => "Json",
            Value::Record(_) => "Record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// 转换为 i128，适用于不超过 128 位的整数与布尔值
    ///
    /// # Returns
    /// 超出 i128 范围或非整数形状时返回 `None`
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Bool(b) => Some(*b as i128),
            Value::Int8(n) => Some(*n as i128),
            Value::Int16(n) => Some(*n as i128),
            Value::Int32(n) => Some(*n as i128),
            Value::Int64(n) => Some(*n as i128),
            Value::Int128(n) => Some(*n),
            Value::UInt8(n) => Some(*n as i128),
            Value::UInt16(n) => Some(*n as i128),
            Value::UInt32(n) => Some(*n as i128),
            Value::UInt64(n) => Some(*n as i128),
            Value::UInt128(n) => i128::try_from(*n).ok(),
            _ => None,
        }
    }

    /// 将数值形状强制转换为任意精度整数
    ///
    /// # Brief
    /// 接受整数、布尔值、整数值的浮点数与十进制
    ///
    /// # Returns
    /// 非整数值返回 `InvalidValue`，非数值形状返回 `TypeMismatch`
    pub fn to_bigint(&self) -> CodecResult<BigInt> {
        if let Some(n) = self.as_i128() {
            return Ok(BigInt::from(n));
        }
        match self {
            Value::UInt128(n) => Ok(BigInt::from(*n)),
            Value::Int256(n) => Ok(n.clone()),
            Value::UInt256(n) => Ok(BigInt::from(n.clone())),
            Value::Float32(f) => float_to_bigint(*f as f64),
            Value::Float64(f) => float_to_bigint(*f),
            Value::Decimal(d) => d
                .to_integer()
                .ok_or_else(|| CodecError::InvalidValue(format!("{} is not an integer", d))),
            Value::NativeDecimal(d) => ClickHouseDecimal::from(*d)
                .to_integer()
                .ok_or_else(|| CodecError::InvalidValue(format!("{} is not an integer", d))),
            other => Err(CodecError::mismatch("integer", other)),
        }
    }

    /// 将数值形状转换为 f64
    pub fn to_f64(&self) -> CodecResult<f64> {
        match self {
            Value::Float32(f) => Ok(*f as f64),
            Value::Float64(f) => Ok(*f),
            Value::Decimal(d) => Ok(d.to_f64()),
            Value::NativeDecimal(d) => d
                .to_f64()
                .ok_or_else(|| CodecError::Overflow(format!("{} does not fit Float64", d))),
            Value::Int256(n) => Ok(n.to_f64().unwrap_or(f64::NAN)),
            Value::UInt256(n) => Ok(n.to_f64().unwrap_or(f64::NAN)),
            Value::UInt128(n) => Ok(*n as f64),
            other => match other.as_i128() {
                Some(n) => Ok(n as f64),
                None => Err(CodecError::mismatch("number", other)),
            },
        }
    }

    /// 将数值形状转换为任意精度十进制
    pub fn to_decimal(&self) -> CodecResult<ClickHouseDecimal> {
        match self {
            Value::Decimal(d) => Ok(d.clone()),
            Value::NativeDecimal(d) => Ok(ClickHouseDecimal::from(*d)),
            Value::Float32(f) => ClickHouseDecimal::from_f64(*f as f64),
            Value::Float64(f) => ClickHouseDecimal::from_f64(*f),
            Value::String(s) => s.parse(),
            other => Ok(ClickHouseDecimal::from(other.to_bigint()?)),
        }
    }

    fn discriminant_index(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int8(_) => 2,
            Value::Int16(_) => 3,
            Value::Int32(_) => 4,
            Value::Int64(_) => 5,
            Value::Int128(_) => 6,
            Value::Int256(_) => 7,
            Value::UInt8(_) => 8,
            Value::UInt16(_) => 9,
            Value::UInt32(_) => 10,
            Value::UInt64(_) => 11,
            Value::UInt128(_) => 12,
            Value::UInt256(_) => 13,
            Value::Float32(_) => 14,
            Value::Float64(_) => 15,
            Value::Decimal(_) => 16,
            Value::NativeDecimal(_) => 17,
            Value::String(_) => 18,
            Value::Bytes(_) => 19,
            Value::Uuid(_) => 20,
            Value::Ipv4(_) => 21,
            Value::Ipv6(_) => 22,
            Value::Date(_) => 23,
            Value::DateTime(_) => 24,
            Value::Time(_) => 25,
            Value::Array(_) => 26,
            Value::Tuple(_) => 27,
            Value::NamedTuple(_) => 28,
            Value::Map(_) => 29,
            Value::Pairs(_) => 30,
            Value::Geometry(..) => 31,
            Value::Json(_) => 32,
            Value::Record(_) => 33,
        }
    }
}

fn float_to_bigint(f: f64) -> CodecResult<BigInt> {
    if !f.is_finite() {
        return Err(CodecError::Overflow(format!("{} is not finite", f)));
    }
    if f.fract() != 0.0 {
        return Err(CodecError::InvalidValue(format!("{} is not an integer", f)));
    }
    BigInt::from_f64(f).ok_or_else(|| CodecError::Overflow(f.to_string()))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Int128(a), Value::Int128(b)) => a == b,
            (Value::Int256(a), Value::Int256(b)) => a == b,
            (Value::UInt8(a), Value::UInt8(b)) => a == b,
            (Value::UInt16(a), Value::UInt16(b)) => a == b,
            (Value::UInt32(a), Value::UInt32(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::UInt128(a), Value::UInt128(b)) => a == b,
            (Value::UInt256(a), Value::UInt256(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::NativeDecimal(a), Value::NativeDecimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Ipv4(a), Value::Ipv4(b)) => a == b,
            (Value::Ipv6(a), Value::Ipv6(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::NamedTuple(a), Value::NamedTuple(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Pairs(a), Value::Pairs(b)) => a == b,
            (Value::Geometry(ka, a), Value::Geometry(kb, b)) => ka == kb && a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant_index().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int8(n) => n.hash(state),
            Value::Int16(n) => n.hash(state),
            Value::Int32(n) => n.hash(state),
            Value::Int64(n) => n.hash(state),
            Value::Int128(n) => n.hash(state),
            Value::Int256(n) => n.hash(state),
            Value::UInt8(n) => n.hash(state),
            Value::UInt16(n) => n.hash(state),
            Value::UInt32(n) => n.hash(state),
            Value::UInt64(n) => n.hash(state),
            Value::UInt128(n) => n.hash(state),
            Value::UInt256(n) => n.hash(state),
            Value::Float32(f) => f.to_bits().hash(state),
            Value::Float64(f) => f.to_bits().hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::NativeDecimal(d) => d.hash(state),
            Value::String(s) => s.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Uuid(u) => u.hash(state),
            Value::Ipv4(ip) => ip.hash(state),
            Value::Ipv6(ip) => ip.hash(state),
            Value::Date(d) => d.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            Value::Time(t) => t.hash(state),
            Value::Array(items) | Value::Tuple(items) => items.hash(state),
            Value::NamedTuple(tuple) => tuple.hash(state),
            // 关联容器的相等与顺序无关，只哈希长度
            Value::Map(map) => map.len().hash(state),
            Value::Pairs(pairs) => pairs.hash(state),
            Value::Geometry(kind, inner) => {
                kind.hash(state);
                inner.hash(state);
            }
            Value::Json(json) => json.to_string().hash(state),
            Value::Record(record) => (Arc::as_ptr(record) as *const () as usize).hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int8(n) => write!(f, "{}", n),
            Value::Int16(n) => write!(f, "{}", n),
            Value::Int32(n) => write!(f, "{}", n),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Int128(n) => write!(f, "{}", n),
            Value::Int256(n) => write!(f, "{}", n),
            Value::UInt8(n) => write!(f, "{}", n),
            Value::UInt16(n) => write!(f, "{}", n),
            Value::UInt32(n) => write!(f, "{}", n),
            Value::UInt64(n) => write!(f, "{}", n),
            Value::UInt128(n) => write!(f, "{}", n),
            Value::UInt256(n) => write!(f, "{}", n),
            Value::Float32(n) => write!(f, "{}", n),
            Value::Float64(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::NativeDecimal(d) => write!(f, "{}", d),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Bytes(b) => write!(f, "<bytes:{}>", b.len()),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Ipv4(ip) => write!(f, "{}", ip),
            Value::Ipv6(ip) => write!(f, "{}", ip),
            Value::Date(d) => write!(f, "{}", d),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Time(t) => write!(f, "{}", t),
            Value::Array(items) => write_list(f, "[", items.iter(), "]"),
            Value::Tuple(items) => write_list(f, "(", items.iter(), ")"),
            Value::NamedTuple(tuple) => {
                write!(f, "(")?;
                for (i, (name, value)) in tuple.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, ")")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Pairs(pairs) => {
                write!(f, "[")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "({}, {})", k, v)?;
                }
                write!(f, "]")
            }
            Value::Geometry(kind, inner) => write!(f, "{}{}", kind.name(), inner),
            Value::Json(json) => write!(f, "{}", json),
            Value::Record(record) => write!(f, "<record:{}>", record.record_type_name()),
        }
    }
}

fn write_list<'a>(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: impl Iterator<Item = &'a Value>,
    close: &str,
) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, v) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", v)?;
    }
    write!(f, "{}", close)
}

// ============================================================================
// From 特征实现
// ============================================================================

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => Int128,
    BigInt => Int256,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    u128 => UInt128,
    BigUint => UInt256,
    f32 => Float32,
    f64 => Float64,
    ClickHouseDecimal => Decimal,
    rust_decimal::Decimal => NativeDecimal,
    String => String,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    Ipv4Addr => Ipv4,
    Ipv6Addr => Ipv6,
    NaiveDate => Date,
    DateTimeValue => DateTime,
    TimeDelta => Time,
    Vec<Value> => Array,
    NamedTuple => NamedTuple,
    serde_json::Value => Json,
);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(DateTimeValue::Naive(v))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(DateTimeValue::Utc(v))
    }
}

impl<T: JsonRecord> From<Arc<T>> for Value {
    fn from(v: Arc<T>) -> Self {
        Value::Record(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
