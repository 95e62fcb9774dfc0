//! 类型对象模块
//!
//! [`ClickHouseType`] 是封闭的类型枚举，每个变体携带其线上格式所需的参数。
//! 读写按类型族分派到各子模块:
//!
//! - `numeric`: 布尔、整数、浮点
//! - `decimal`: Decimal32/64/128/256
//! - `string`: String、FixedString、UUID、IPv4、IPv6
//! - `temporal`: Date、DateTime、Time 系列
//! - `enums`: Enum8、Enum16
//! - `composite`: Array、Map、Tuple、Nullable、Variant 等
//! - `geo`: 几何类型
//! - `dynamic`: Dynamic
//!
//! JSON 的读写位于 crate 根部的 `json` 模块。

mod composite;
mod decimal;
mod dynamic;
mod enums;
mod geo;
mod numeric;
mod string;
mod temporal;

pub use decimal::DecimalType;
pub use dynamic::DynamicType;
pub use enums::EnumType;
pub use geo::GeoKind;

use crate::codec::{BinaryReader, BinaryWriter};
use crate::json::JsonType;
use crate::named_tuple::NamedTuple;
use crate::spec::MAX_VARIANT_MEMBERS;
use crate::temporal::DateTimeValue;
use crate::value::Value;
use crate::{CodecError, CodecResult};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use chwire_grammar::ast::quote;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// 类型对象
///
/// 由注册表或类型头解码器构造，构造后不可变，可在线程间共享。
#[derive(Debug, Clone, PartialEq)]
pub enum ClickHouseType {
    Nothing,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    Int256,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    UInt256,
    Float32,
    Float64,
    BFloat16,
    Decimal(DecimalType),
    /// `as_bytes` 为 true 时读取为原始字节
    String { as_bytes: bool },
    FixedString(usize),
    Uuid,
    Ipv4,
    Ipv6,
    Date,
    Date32,
    DateTime(Option<Tz>),
    DateTime64 { scale: u8, timezone: Option<Tz> },
    Time,
    Time64(u8),
    Enum8(EnumType),
    Enum16(EnumType),
    Array(Box<ClickHouseType>),
    /// `as_pairs` 为 true 时读取为有序键值对列表
    Map {
        key: Box<ClickHouseType>,
        value: Box<ClickHouseType>,
        as_pairs: bool,
    },
    Tuple(Vec<ClickHouseType>),
    NamedTuple(Vec<(String, ClickHouseType)>),
    Nested(Vec<(String, ClickHouseType)>),
    Nullable(Box<ClickHouseType>),
    LowCardinality(Box<ClickHouseType>),
    /// 成员按规范名称排序
    Variant(Vec<ClickHouseType>),
    Dynamic(DynamicType),
    Json(Box<JsonType>),
    Point,
    Ring,
    LineString,
    Polygon,
    MultiLineString,
    MultiPolygon,
    Geometry,
    QBit {
        element: Box<ClickHouseType>,
        dimension: usize,
    },
    SimpleAggregateFunction {
        function: String,
        inner: Box<ClickHouseType>,
    },
    AggregateFunction {
        function: String,
        arguments: Vec<ClickHouseType>,
    },
}

impl ClickHouseType {
    /// 规范名称
    ///
    /// # Brief
    /// 返回与服务端一致的类型描述文本，可再次被注册表解析
    pub fn name(&self) -> String {
        match self {
            ClickHouseType::Nothing => "Nothing".to_string(),
            ClickHouseType::Bool => "Bool".to_string(),
            ClickHouseType::Int8 => "Int8".to_string(),
            ClickHouseType::Int16 => "Int16".to_string(),
            ClickHouseType::Int32 => "Int32".to_string(),
            ClickHouseType::Int64 => "Int64".to_string(),
            ClickHouseType::Int128 => "Int128".to_string(),
            ClickHouseType::Int256 => "Int256".to_string(),
            ClickHouseType::UInt8 => "UInt8".to_string(),
            ClickHouseType::UInt16 => "UInt16".to_string(),
            ClickHouseType::UInt32 => "UInt32".to_string(),
            ClickHouseType::UInt64 => "UInt64".to_string(),
            ClickHouseType::UInt128 => "UInt128".to_string(),
            ClickHouseType::UInt256 => "UInt256".to_string(),
            ClickHouseType::Float32 => "Float32".to_string(),
            ClickHouseType::Float64 => "Float64".to_string(),
            ClickHouseType::BFloat16 => "BFloat16".to_string(),
            ClickHouseType::Decimal(d) => d.name(),
            ClickHouseType::String { .. } => "String".to_string(),
            ClickHouseType::FixedString(n) => format!("FixedString({})", n),
            ClickHouseType::Uuid => "UUID".to_string(),
            ClickHouseType::Ipv4 => "IPv4".to_string(),
            ClickHouseType::Ipv6 => "IPv6".to_string(),
            ClickHouseType::Date => "Date".to_string(),
            ClickHouseType::Date32 => "Date32".to_string(),
            ClickHouseType::DateTime(None) => "DateTime".to_string(),
            ClickHouseType::DateTime(Some(tz)) => format!("DateTime({})", quote(tz.name())),
            ClickHouseType::DateTime64 { scale, timezone: None } => format!("DateTime64({})", scale),
            ClickHouseType::DateTime64 { scale, timezone: Some(tz) } => {
                format!("DateTime64({}, {})", scale, quote(tz.name()))
            }
            ClickHouseType::Time => "Time".to_string(),
            ClickHouseType::Time64(scale) => format!("Time64({})", scale),
            ClickHouseType::Enum8(e) => format!("Enum8({})", e.members_text()),
            ClickHouseType::Enum16(e) => format!("Enum16({})", e.members_text()),
            ClickHouseType::Array(inner) => format!("Array({})", inner.name()),
            ClickHouseType::Map { key, value, .. } => format!("Map({}, {})", key.name(), value.name()),
            ClickHouseType::Tuple(items) => format!("Tuple({})", join_names(items.iter())),
            ClickHouseType::NamedTuple(fields) => format!("Tuple({})", join_fields(fields)),
            ClickHouseType::Nested(fields) => format!("Nested({})", join_fields(fields)),
            ClickHouseType::Nullable(inner) => format!("Nullable({})", inner.name()),
            ClickHouseType::LowCardinality(inner) => format!("LowCardinality({})", inner.name()),
            ClickHouseType::Variant(members) => format!("Variant({})", join_names(members.iter())),
            ClickHouseType::Dynamic(d) => d.name(),
            ClickHouseType::Json(j) => j.name(),
            ClickHouseType::Point => "Point".to_string(),
            ClickHouseType::Ring => "Ring".to_string(),
            ClickHouseType::LineString => "LineString".to_string(),
            ClickHouseType::Polygon => "Polygon".to_string(),
            ClickHouseType::MultiLineString => "MultiLineString".to_string(),
            ClickHouseType::MultiPolygon => "MultiPolygon".to_string(),
            ClickHouseType::Geometry => "Geometry".to_string(),
            ClickHouseType::QBit { element, dimension } => {
                format!("QBit({}, {})", element.name(), dimension)
            }
            ClickHouseType::SimpleAggregateFunction { function, inner } => {
                format!("SimpleAggregateFunction({}, {})", function, inner.name())
            }
            ClickHouseType::AggregateFunction { function, arguments } => {
                if arguments.is_empty() {
                    format!("AggregateFunction({})", function)
                } else {
                    format!("AggregateFunction({}, {})", function, join_names(arguments.iter()))
                }
            }
        }
    }

    /// 从读取器解码一个值
    ///
    /// # Arguments
    /// * `reader` - 线上字节读取器
    ///
    /// # Returns
    /// 成功返回值；数据不足、格式非法或类型不支持读取时返回错误
    pub fn read(&self, reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
        match self {
            ClickHouseType::Nothing => Ok(Value::Null),
            ClickHouseType::Bool
            | ClickHouseType::Int8
            | ClickHouseType::Int16
            | ClickHouseType::Int32
            | ClickHouseType::Int64
            | ClickHouseType::Int128
            | ClickHouseType::Int256
            | ClickHouseType::UInt8
            | ClickHouseType::UInt16
            | ClickHouseType::UInt32
            | ClickHouseType::UInt64
            | ClickHouseType::UInt128
            | ClickHouseType::UInt256
            | ClickHouseType::Float32
            | ClickHouseType::Float64
            | ClickHouseType::BFloat16 => numeric::read(self, reader),
            ClickHouseType::Decimal(d) => d.read(reader),
            ClickHouseType::String { as_bytes } => string::read_string(reader, *as_bytes),
            ClickHouseType::FixedString(n) => string::read_fixed(reader, *n),
            ClickHouseType::Uuid => string::read_uuid(reader),
            ClickHouseType::Ipv4 => string::read_ipv4(reader),
            ClickHouseType::Ipv6 => string::read_ipv6(reader),
            ClickHouseType::Date
            | ClickHouseType::Date32
            | ClickHouseType::DateTime(_)
            | ClickHouseType::DateTime64 { .. }
            | ClickHouseType::Time
            | ClickHouseType::Time64(_) => temporal::read(self, reader),
            ClickHouseType::Enum8(e) => e.read8(reader),
            ClickHouseType::Enum16(e) => e.read16(reader),
            ClickHouseType::Array(inner) => composite::read_array(inner, reader),
            ClickHouseType::Map { key, value, as_pairs } => {
                composite::read_map(key, value, *as_pairs, reader)
            }
            ClickHouseType::Tuple(items) => composite::read_tuple(items, reader),
            ClickHouseType::NamedTuple(fields) => composite::read_named_tuple(fields, reader),
            ClickHouseType::Nested(fields) => composite::read_nested(fields, reader),
            ClickHouseType::Nullable(inner) => composite::read_nullable(inner, reader),
            ClickHouseType::LowCardinality(inner) => inner.read(reader),
            ClickHouseType::Variant(members) => composite::read_variant(members, reader),
            ClickHouseType::Dynamic(d) => d.read(reader),
            ClickHouseType::Json(j) => j.read(reader),
            ClickHouseType::Point
            | ClickHouseType::Ring
            | ClickHouseType::LineString
            | ClickHouseType::Polygon
            | ClickHouseType::MultiLineString
            | ClickHouseType::MultiPolygon => geo::read_shape(self.geo_kind_depth(), reader),
            ClickHouseType::Geometry => geo::read_geometry(reader),
            ClickHouseType::QBit { element, dimension } => {
                composite::read_qbit(element, *dimension, reader)
            }
            ClickHouseType::SimpleAggregateFunction { inner, .. } => inner.read(reader),
            ClickHouseType::AggregateFunction { function, .. } => Err(CodecError::NotSupported(
                format!("Reading AggregateFunction({}) state", function),
            )),
        }
    }

    /// 将值编码到写入器
    ///
    /// # Arguments
    /// * `writer` - 线上字节写入器
    /// * `value` - 要写入的值
    ///
    /// # Returns
    /// 值形状不匹配返回 `TypeMismatch`，超出范围返回 `Overflow`
    pub fn write(&self, writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
        match self {
            ClickHouseType::Nothing => match value {
                Value::Null => Ok(()),
                other => Err(CodecError::mismatch("Null", other)),
            },
            ClickHouseType::Bool
            | ClickHouseType::Int8
            | ClickHouseType::Int16
            | ClickHouseType::Int32
            | ClickHouseType::Int64
            | ClickHouseType::Int128
            | ClickHouseType::Int256
            | ClickHouseType::UInt8
            | ClickHouseType::UInt16
            | ClickHouseType::UInt32
            | ClickHouseType::UInt64
            | ClickHouseType::UInt128
            | ClickHouseType::UInt256
            | ClickHouseType::Float32
            | ClickHouseType::Float64
            | ClickHouseType::BFloat16 => numeric::write(self, writer, value),
            ClickHouseType::Decimal(d) => d.write(writer, value),
            ClickHouseType::String { .. } => string::write_string(writer, value),
            ClickHouseType::FixedString(n) => string::write_fixed(writer, *n, value),
            ClickHouseType::Uuid => string::write_uuid(writer, value),
            ClickHouseType::Ipv4 => string::write_ipv4(writer, value),
            ClickHouseType::Ipv6 => string::write_ipv6(writer, value),
            ClickHouseType::Date
            | ClickHouseType::Date32
            | ClickHouseType::DateTime(_)
            | ClickHouseType::DateTime64 { .. }
            | ClickHouseType::Time
            | ClickHouseType::Time64(_) => temporal::write(self, writer, value),
            ClickHouseType::Enum8(e) => e.write8(writer, value),
            ClickHouseType::Enum16(e) => e.write16(writer, value),
            ClickHouseType::Array(inner) => composite::write_array(inner, writer, value),
            ClickHouseType::Map { key, value: val, .. } => {
                composite::write_map(key, val, writer, value)
            }
            ClickHouseType::Tuple(items) => composite::write_tuple(items.iter(), writer, value),
            ClickHouseType::NamedTuple(fields) => {
                composite::write_tuple(fields.iter().map(|(_, ty)| ty), writer, value)
            }
            ClickHouseType::Nested(fields) => composite::write_nested(fields, writer, value),
            ClickHouseType::Nullable(inner) => composite::write_nullable(inner, writer, value),
            ClickHouseType::LowCardinality(inner) => inner.write(writer, value),
            ClickHouseType::Variant(members) => composite::write_variant(members, writer, value),
            ClickHouseType::Dynamic(d) => d.write(writer, value),
            ClickHouseType::Json(j) => j.write(writer, value),
            ClickHouseType::Point
            | ClickHouseType::Ring
            | ClickHouseType::LineString
            | ClickHouseType::Polygon
            | ClickHouseType::MultiLineString
            | ClickHouseType::MultiPolygon => geo::write_shape(self.geo_kind_depth(), writer, value),
            ClickHouseType::Geometry => geo::write_geometry(writer, value),
            ClickHouseType::QBit { element, dimension } => {
                composite::write_qbit(element, *dimension, writer, value)
            }
            ClickHouseType::SimpleAggregateFunction { inner, .. } => inner.write(writer, value),
            ClickHouseType::AggregateFunction { function, .. } => Err(CodecError::NotSupported(
                format!("Writing AggregateFunction({}) state", function),
            )),
        }
    }

    /// 类型的默认值(QBit 补齐元素时使用)
    pub fn default_value(&self) -> Value {
        match self {
            ClickHouseType::Nothing
            | ClickHouseType::Nullable(_)
            | ClickHouseType::Variant(_)
            | ClickHouseType::Dynamic(_)
            | ClickHouseType::Geometry
            | ClickHouseType::AggregateFunction { .. } => Value::Null,
            ClickHouseType::Bool => Value::Bool(false),
            ClickHouseType::Int8 => Value::Int8(0),
            ClickHouseType::Int16 => Value::Int16(0),
            ClickHouseType::Int32 => Value::Int32(0),
            ClickHouseType::Int64 => Value::Int64(0),
            ClickHouseType::Int128 => Value::Int128(0),
            ClickHouseType::Int256 => Value::Int256(Default::default()),
            ClickHouseType::UInt8 => Value::UInt8(0),
            ClickHouseType::UInt16 => Value::UInt16(0),
            ClickHouseType::UInt32 => Value::UInt32(0),
            ClickHouseType::UInt64 => Value::UInt64(0),
            ClickHouseType::UInt128 => Value::UInt128(0),
            ClickHouseType::UInt256 => Value::UInt256(Default::default()),
            ClickHouseType::Float32 | ClickHouseType::BFloat16 => Value::Float32(0.0),
            ClickHouseType::Float64 => Value::Float64(0.0),
            ClickHouseType::Decimal(d) => d.zero(),
            ClickHouseType::String { as_bytes: true } => Value::Bytes(Vec::new()),
            ClickHouseType::String { as_bytes: false } => Value::String(String::new()),
            ClickHouseType::FixedString(n) => Value::Bytes(vec![0; *n]),
            ClickHouseType::Uuid => Value::Uuid(uuid::Uuid::nil()),
            ClickHouseType::Ipv4 => Value::Ipv4(Ipv4Addr::UNSPECIFIED),
            ClickHouseType::Ipv6 => Value::Ipv6(Ipv6Addr::UNSPECIFIED),
            ClickHouseType::Date | ClickHouseType::Date32 => {
                Value::Date(NaiveDate::default())
            }
            ClickHouseType::DateTime(tz) => {
                Value::DateTime(DateTimeValue::from_utc(DateTime::<Utc>::default(), *tz))
            }
            ClickHouseType::DateTime64 { timezone, .. } => {
                Value::DateTime(DateTimeValue::from_utc(DateTime::<Utc>::default(), *timezone))
            }
            ClickHouseType::Time | ClickHouseType::Time64(_) => Value::Time(TimeDelta::zero()),
            ClickHouseType::Enum8(e) | ClickHouseType::Enum16(e) => e.default_value(),
            ClickHouseType::Array(_)
            | ClickHouseType::Nested(_)
            | ClickHouseType::Ring
            | ClickHouseType::LineString
            | ClickHouseType::Polygon
            | ClickHouseType::MultiLineString
            | ClickHouseType::MultiPolygon => Value::Array(Vec::new()),
            ClickHouseType::QBit { element, dimension } => {
                Value::Array(vec![element.default_value(); *dimension])
            }
            ClickHouseType::Map { as_pairs: true, .. } => Value::Pairs(Vec::new()),
            ClickHouseType::Map { as_pairs: false, .. } => Value::Map(Default::default()),
            ClickHouseType::Tuple(items) => {
                Value::Tuple(items.iter().map(|t| t.default_value()).collect())
            }
            ClickHouseType::NamedTuple(fields) => NamedTuple::new(
                fields.iter().map(|(name, ty)| (name.clone(), ty.default_value())),
            )
            .map(Value::NamedTuple)
            .unwrap_or(Value::Null),
            ClickHouseType::Point => Value::Tuple(vec![Value::Float64(0.0), Value::Float64(0.0)]),
            ClickHouseType::LowCardinality(inner) => inner.default_value(),
            ClickHouseType::SimpleAggregateFunction { inner, .. } => inner.default_value(),
            ClickHouseType::Json(_) => Value::Json(serde_json::Value::Object(Default::default())),
        }
    }

    /// 创建 FixedString，长度必须为正
    pub fn fixed_string(length: usize) -> CodecResult<Self> {
        if length == 0 {
            return Err(CodecError::invalid_parameter("FixedString", "length must be positive"));
        }
        Ok(ClickHouseType::FixedString(length))
    }

    /// 创建 Variant
    ///
    /// # Brief
    /// 成员按规范名称排序，判别值即排序后的下标
    ///
    /// # Returns
    /// 成员为空、超过 255 个或有重复时返回 InvalidParameter
    pub fn variant(mut members: Vec<ClickHouseType>) -> CodecResult<Self> {
        if members.is_empty() || members.len() > MAX_VARIANT_MEMBERS {
            return Err(CodecError::invalid_parameter(
                "Variant",
                format!("expected 1..={} members, got {}", MAX_VARIANT_MEMBERS, members.len()),
            ));
        }
        members.sort_by_cached_key(|member| member.name());
        if members.windows(2).any(|pair| pair[0].name() == pair[1].name()) {
            return Err(CodecError::invalid_parameter("Variant", "duplicate member type"));
        }
        Ok(ClickHouseType::Variant(members))
    }

    /// 创建 QBit，元素须为浮点类型且维度为正
    pub fn qbit(element: ClickHouseType, dimension: usize) -> CodecResult<Self> {
        if !matches!(
            element,
            ClickHouseType::BFloat16 | ClickHouseType::Float32 | ClickHouseType::Float64
        ) {
            return Err(CodecError::invalid_parameter(
                "QBit",
                format!("element type must be a float, got {}", element.name()),
            ));
        }
        if dimension == 0 {
            return Err(CodecError::invalid_parameter("QBit", "dimension must be positive"));
        }
        Ok(ClickHouseType::QBit {
            element: Box::new(element),
            dimension,
        })
    }

    /// 是否可写入 NULL
    pub fn is_nullable(&self) -> bool {
        match self {
            ClickHouseType::Nullable(_)
            | ClickHouseType::Nothing
            | ClickHouseType::Variant(_)
            | ClickHouseType::Dynamic(_)
            | ClickHouseType::Geometry => true,
            ClickHouseType::LowCardinality(inner) => inner.is_nullable(),
            ClickHouseType::SimpleAggregateFunction { inner, .. } => inner.is_nullable(),
            _ => false,
        }
    }

    /// 几何形状类型的数组嵌套层数(Point 为 0)
    fn geo_kind_depth(&self) -> usize {
        match self {
            ClickHouseType::Ring | ClickHouseType::LineString => 1,
            ClickHouseType::Polygon | ClickHouseType::MultiLineString => 2,
            ClickHouseType::MultiPolygon => 3,
            _ => 0,
        }
    }
}

impl fmt::Display for ClickHouseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn join_names<'a>(types: impl Iterator<Item = &'a ClickHouseType>) -> String {
    types.map(|t| t.name()).collect::<Vec<_>>().join(", ")
}

fn join_fields(fields: &[(String, ClickHouseType)]) -> String {
    fields
        .iter()
        .map(|(name, ty)| format!("{} {}", quote_identifier(name), ty.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 含有非标识符字符的名称用反引号括起
pub(crate) fn quote_identifier(name: &str) -> String {
    let plain = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "\\`"))
    }
}
