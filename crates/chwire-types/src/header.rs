//! 自描述二进制类型头
//!
//! Dynamic、Variant 成员与 JSON 未提示路径中内联的类型标记。
//! 参数化类型在标记字节后递归写入参数，标记表见 [`BinaryTypeTag`]。

use crate::codec::{BinaryReader, BinaryWriter};
use crate::json::JsonType;
use crate::settings::TypeSettings;
use crate::spec::{BinaryTypeTag, JSON_SERIALIZATION_VERSION, MAX_VARIANT_MEMBERS};
use crate::temporal::parse_timezone;
use crate::types::{ClickHouseType, DecimalType, DynamicType, EnumType, GeoKind};
use crate::{CodecError, CodecResult};
use chwire_common::{MapMode, StringMode};
use indexmap::IndexMap;
use tracing::trace;

/// 写入类型头
///
/// # Brief
/// 按标记表写入类型标记及其参数，复合类型递归写入成员类型
///
/// # Arguments
/// * `writer` - 目标写入器
/// * `ty` - 要描述的类型
///
/// # Returns
/// AggregateFunction 等没有客户端可写形式的类型返回 UnwritableHeader
pub fn write_header(writer: &mut BinaryWriter<'_>, ty: &ClickHouseType) -> CodecResult<()> {
    writer.enter()?;
    write_header_inner(writer, ty)?;
    writer.leave();
    Ok(())
}

fn put_tag(writer: &mut BinaryWriter<'_>, tag: BinaryTypeTag) {
    writer.put_u8(tag as u8);
}

fn write_header_inner(writer: &mut BinaryWriter<'_>, ty: &ClickHouseType) -> CodecResult<()> {
    match ty {
        ClickHouseType::Nothing => put_tag(writer, BinaryTypeTag::Nothing),
        ClickHouseType::Bool => put_tag(writer, BinaryTypeTag::Bool),
        ClickHouseType::Int8 => put_tag(writer, BinaryTypeTag::Int8),
        ClickHouseType::Int16 => put_tag(writer, BinaryTypeTag::Int16),
        ClickHouseType::Int32 => put_tag(writer, BinaryTypeTag::Int32),
        ClickHouseType::Int64 => put_tag(writer, BinaryTypeTag::Int64),
        ClickHouseType::Int128 => put_tag(writer, BinaryTypeTag::Int128),
        ClickHouseType::Int256 => put_tag(writer, BinaryTypeTag::Int256),
        ClickHouseType::UInt8 => put_tag(writer, BinaryTypeTag::UInt8),
        ClickHouseType::UInt16 => put_tag(writer, BinaryTypeTag::UInt16),
        ClickHouseType::UInt32 => put_tag(writer, BinaryTypeTag::UInt32),
        ClickHouseType::UInt64 => put_tag(writer, BinaryTypeTag::UInt64),
        ClickHouseType::UInt128 => put_tag(writer, BinaryTypeTag::UInt128),
        ClickHouseType::UInt256 => put_tag(writer, BinaryTypeTag::UInt256),
        ClickHouseType::Float32 => put_tag(writer, BinaryTypeTag::Float32),
        ClickHouseType::Float64 => put_tag(writer, BinaryTypeTag::Float64),
        ClickHouseType::BFloat16 => put_tag(writer, BinaryTypeTag::BFloat16),
        ClickHouseType::Decimal(d) => {
            put_tag(writer, d.tag());
            writer.put_u8(d.precision);
            writer.put_u8(d.scale);
        }
        ClickHouseType::String { .. } => put_tag(writer, BinaryTypeTag::String),
        ClickHouseType::FixedString(n) => {
            put_tag(writer, BinaryTypeTag::FixedString);
            writer.put_varint(*n as u64);
        }
        ClickHouseType::Uuid => put_tag(writer, BinaryTypeTag::Uuid),
        ClickHouseType::Ipv4 => put_tag(writer, BinaryTypeTag::Ipv4),
        ClickHouseType::Ipv6 => put_tag(writer, BinaryTypeTag::Ipv6),
        ClickHouseType::Date => put_tag(writer, BinaryTypeTag::Date),
        ClickHouseType::Date32 => put_tag(writer, BinaryTypeTag::Date32),
        ClickHouseType::DateTime(None) => put_tag(writer, BinaryTypeTag::DateTime),
        ClickHouseType::DateTime(Some(tz)) => {
            put_tag(writer, BinaryTypeTag::DateTimeWithTimezone);
            writer.put_string(tz.name());
        }
        ClickHouseType::DateTime64 { scale, timezone: None } => {
            put_tag(writer, BinaryTypeTag::DateTime64);
            writer.put_u8(*scale);
        }
        ClickHouseType::DateTime64 { scale, timezone: Some(tz) } => {
            put_tag(writer, BinaryTypeTag::DateTime64WithTimezone);
            writer.put_u8(*scale);
            writer.put_string(tz.name());
        }
        ClickHouseType::Time => put_tag(writer, BinaryTypeTag::Time),
        ClickHouseType::Time64(scale) => {
            put_tag(writer, BinaryTypeTag::Time64);
            writer.put_u8(*scale);
        }
        ClickHouseType::Enum8(e) => {
            put_tag(writer, BinaryTypeTag::Enum8);
            writer.put_varint(e.len() as u64);
            for (label, ordinal) in e.members() {
                writer.put_string(label);
                writer.put_i8(ordinal as i8);
            }
        }
        ClickHouseType::Enum16(e) => {
            put_tag(writer, BinaryTypeTag::Enum16);
            writer.put_varint(e.len() as u64);
            for (label, ordinal) in e.members() {
                writer.put_string(label);
                writer.put_i16(ordinal);
            }
        }
        ClickHouseType::Array(inner) => {
            put_tag(writer, BinaryTypeTag::Array);
            write_header(writer, inner)?;
        }
        ClickHouseType::Map { key, value, .. } => {
            put_tag(writer, BinaryTypeTag::Map);
            write_header(writer, key)?;
            write_header(writer, value)?;
        }
        ClickHouseType::Tuple(items) => {
            put_tag(writer, BinaryTypeTag::Tuple);
            writer.put_varint(items.len() as u64);
            for item in items {
                write_header(writer, item)?;
            }
        }
        ClickHouseType::NamedTuple(fields) => {
            put_tag(writer, BinaryTypeTag::NamedTuple);
            write_fields(writer, fields)?;
        }
        ClickHouseType::Nested(fields) => {
            put_tag(writer, BinaryTypeTag::Nested);
            write_fields(writer, fields)?;
        }
        ClickHouseType::Nullable(inner) => {
            put_tag(writer, BinaryTypeTag::Nullable);
            write_header(writer, inner)?;
        }
        ClickHouseType::LowCardinality(inner) => {
            put_tag(writer, BinaryTypeTag::LowCardinality);
            write_header(writer, inner)?;
        }
        ClickHouseType::Variant(members) => {
            put_tag(writer, BinaryTypeTag::Variant);
            writer.put_varint(members.len() as u64);
            for member in members {
                write_header(writer, member)?;
            }
        }
        ClickHouseType::Dynamic(d) => {
            put_tag(writer, BinaryTypeTag::Dynamic);
            writer.put_u8(d.max_types);
        }
        ClickHouseType::Json(j) => {
            put_tag(writer, BinaryTypeTag::Json);
            writer.put_u8(JSON_SERIALIZATION_VERSION);
            writer.put_varint(j.max_dynamic_paths);
            writer.put_u8(j.max_dynamic_types);
            writer.put_varint(j.typed_paths().len() as u64);
            for (path, path_type) in j.typed_paths() {
                writer.put_string(path);
                write_header(writer, path_type)?;
            }
            writer.put_varint(j.skip_paths().len() as u64);
            for path in j.skip_paths() {
                writer.put_string(path);
            }
            writer.put_varint(j.skip_regexps().len() as u64);
            for regexp in j.skip_regexps() {
                writer.put_string(regexp);
            }
        }
        ClickHouseType::Point => write_custom(writer, GeoKind::Point.name()),
        ClickHouseType::Ring => write_custom(writer, GeoKind::Ring.name()),
        ClickHouseType::LineString => write_custom(writer, GeoKind::LineString.name()),
        ClickHouseType::Polygon => write_custom(writer, GeoKind::Polygon.name()),
        ClickHouseType::MultiLineString => write_custom(writer, GeoKind::MultiLineString.name()),
        ClickHouseType::MultiPolygon => write_custom(writer, GeoKind::MultiPolygon.name()),
        ClickHouseType::Geometry => write_custom(writer, "Geometry"),
        ClickHouseType::QBit { element, dimension } => {
            put_tag(writer, BinaryTypeTag::QBit);
            write_header(writer, element)?;
            writer.put_varint(*dimension as u64);
        }
        ClickHouseType::SimpleAggregateFunction { function, inner } => {
            put_tag(writer, BinaryTypeTag::SimpleAggregateFunction);
            writer.put_string(function);
            writer.put_varint(0);
            writer.put_varint(1);
            write_header(writer, inner)?;
        }
        ClickHouseType::AggregateFunction { .. } => {
            return Err(CodecError::UnwritableHeader(ty.name()));
        }
    }
    Ok(())
}

fn write_custom(writer: &mut BinaryWriter<'_>, name: &str) {
    put_tag(writer, BinaryTypeTag::Custom);
    writer.put_string(name);
}

fn write_fields(
    writer: &mut BinaryWriter<'_>,
    fields: &[(String, ClickHouseType)],
) -> CodecResult<()> {
    writer.put_varint(fields.len() as u64);
    for (name, ty) in fields {
        writer.put_string(name);
        write_header(writer, ty)?;
    }
    Ok(())
}

/// 读取类型头
///
/// # Brief
/// 解码类型标记及其参数；解码出的类型使用 `settings` 中的读取模式
///
/// # Arguments
/// * `reader` - 源读取器
/// * `settings` - 解析设置
///
/// # Returns
/// 未知标记或客户端不支持的类型(Set、Function、Interval 等)返回 NotSupported，
/// 此时不再继续解析后续字节
pub fn read_header(reader: &mut BinaryReader<'_>, settings: &TypeSettings) -> CodecResult<ClickHouseType> {
    reader.enter()?;
    let ty = read_header_inner(reader, settings)?;
    reader.leave();
    Ok(ty)
}

fn read_header_inner(
    reader: &mut BinaryReader<'_>,
    settings: &TypeSettings,
) -> CodecResult<ClickHouseType> {
    let byte = reader.read_u8()?;
    let tag = BinaryTypeTag::from_u8(byte)
        .ok_or_else(|| CodecError::NotSupported(format!("Unknown binary type tag 0x{:02X}", byte)))?;
    trace!(tag = ?tag, "Decoding type header");
    Ok(match tag {
        BinaryTypeTag::Nothing => ClickHouseType::Nothing,
        BinaryTypeTag::UInt8 => ClickHouseType::UInt8,
        BinaryTypeTag::UInt16 => ClickHouseType::UInt16,
        BinaryTypeTag::UInt32 => ClickHouseType::UInt32,
        BinaryTypeTag::UInt64 => ClickHouseType::UInt64,
        BinaryTypeTag::UInt128 => ClickHouseType::UInt128,
        BinaryTypeTag::UInt256 => ClickHouseType::UInt256,
        BinaryTypeTag::Int8 => ClickHouseType::Int8,
        BinaryTypeTag::Int16 => ClickHouseType::Int16,
        BinaryTypeTag::Int32 => ClickHouseType::Int32,
        BinaryTypeTag::Int64 => ClickHouseType::Int64,
        BinaryTypeTag::Int128 => ClickHouseType::Int128,
        BinaryTypeTag::Int256 => ClickHouseType::Int256,
        BinaryTypeTag::Float32 => ClickHouseType::Float32,
        BinaryTypeTag::Float64 => ClickHouseType::Float64,
        BinaryTypeTag::BFloat16 => ClickHouseType::BFloat16,
        BinaryTypeTag::Bool => ClickHouseType::Bool,
        BinaryTypeTag::Date => ClickHouseType::Date,
        BinaryTypeTag::Date32 => ClickHouseType::Date32,
        BinaryTypeTag::DateTime => ClickHouseType::DateTime(None),
        BinaryTypeTag::DateTimeWithTimezone => {
            ClickHouseType::DateTime(Some(parse_timezone(&reader.read_utf8()?)?))
        }
        BinaryTypeTag::DateTime64 => ClickHouseType::DateTime64 {
            scale: read_scale(reader, "DateTime64")?,
            timezone: None,
        },
        BinaryTypeTag::DateTime64WithTimezone => {
            let scale = read_scale(reader, "DateTime64")?;
            ClickHouseType::DateTime64 {
                scale,
                timezone: Some(parse_timezone(&reader.read_utf8()?)?),
            }
        }
        BinaryTypeTag::Time => ClickHouseType::Time,
        BinaryTypeTag::Time64 => ClickHouseType::Time64(read_scale(reader, "Time64")?),
        BinaryTypeTag::String => ClickHouseType::String {
            as_bytes: settings.string_mode() == StringMode::Bytes,
        },
        BinaryTypeTag::FixedString => ClickHouseType::fixed_string(read_count(reader)?)?,
        BinaryTypeTag::Enum8 => {
            let count = read_count(reader)?;
            let mut members = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                let label = reader.read_utf8()?;
                members.push((label, reader.read_i8()? as i16));
            }
            ClickHouseType::Enum8(EnumType::enum8(members)?)
        }
        BinaryTypeTag::Enum16 => {
            let count = read_count(reader)?;
            let mut members = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                let label = reader.read_utf8()?;
                members.push((label, reader.read_i16()?));
            }
            ClickHouseType::Enum16(EnumType::enum16(members)?)
        }
        BinaryTypeTag::Decimal32
        | BinaryTypeTag::Decimal64
        | BinaryTypeTag::Decimal128
        | BinaryTypeTag::Decimal256 => {
            let precision = reader.read_u8()?;
            let scale = reader.read_u8()?;
            let decimal = DecimalType::new(precision, scale, settings.decimal_mode())?;
            if decimal.tag() != tag {
                return Err(CodecError::InvalidData(format!(
                    "{:?} header with precision {}",
                    tag, precision
                )));
            }
            ClickHouseType::Decimal(decimal)
        }
        BinaryTypeTag::Uuid => ClickHouseType::Uuid,
        BinaryTypeTag::Ipv4 => ClickHouseType::Ipv4,
        BinaryTypeTag::Ipv6 => ClickHouseType::Ipv6,
        BinaryTypeTag::Array => ClickHouseType::Array(Box::new(read_header(reader, settings)?)),
        BinaryTypeTag::Tuple => {
            let count = read_count(reader)?;
            let mut items = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                items.push(read_header(reader, settings)?);
            }
            ClickHouseType::Tuple(items)
        }
        BinaryTypeTag::NamedTuple => ClickHouseType::NamedTuple(read_fields(reader, settings)?),
        BinaryTypeTag::Nested => ClickHouseType::Nested(read_fields(reader, settings)?),
        BinaryTypeTag::Nullable => ClickHouseType::Nullable(Box::new(read_header(reader, settings)?)),
        BinaryTypeTag::LowCardinality => {
            ClickHouseType::LowCardinality(Box::new(read_header(reader, settings)?))
        }
        BinaryTypeTag::Map => {
            let key = read_header(reader, settings)?;
            let value = read_header(reader, settings)?;
            ClickHouseType::Map {
                key: Box::new(key),
                value: Box::new(value),
                as_pairs: settings.map_mode() == MapMode::Pairs,
            }
        }
        BinaryTypeTag::Variant => {
            let count = read_count(reader)?;
            if count > MAX_VARIANT_MEMBERS {
                return Err(CodecError::InvalidData(format!(
                    "Variant header with {} members",
                    count
                )));
            }
            let mut members = Vec::with_capacity(count.min(reader.remaining()));
            for _ in 0..count {
                members.push(read_header(reader, settings)?);
            }
            ClickHouseType::variant(members)?
        }
        BinaryTypeTag::Dynamic => {
            ClickHouseType::Dynamic(DynamicType::new(reader.read_u8()?, settings.clone()))
        }
        BinaryTypeTag::Custom => {
            let name = reader.read_utf8()?;
            match GeoKind::from_name(&name) {
                Some(kind) => kind.column_type(),
                None if name == "Geometry" => ClickHouseType::Geometry,
                None => {
                    return Err(CodecError::NotSupported(format!(
                        "Custom type '{}' in binary header",
                        name
                    )))
                }
            }
        }
        BinaryTypeTag::SimpleAggregateFunction => {
            let function = reader.read_utf8()?;
            let params = reader.read_varint()?;
            if params != 0 {
                return Err(CodecError::NotSupported(format!(
                    "SimpleAggregateFunction({}) with {} parameters",
                    function, params
                )));
            }
            let args = read_count(reader)?;
            if args != 1 {
                return Err(CodecError::NotSupported(format!(
                    "SimpleAggregateFunction({}) with {} arguments",
                    function, args
                )));
            }
            ClickHouseType::SimpleAggregateFunction {
                function,
                inner: Box::new(read_header(reader, settings)?),
            }
        }
        BinaryTypeTag::Json => read_json_header(reader, settings)?,
        BinaryTypeTag::QBit => {
            let element = read_header(reader, settings)?;
            ClickHouseType::qbit(element, read_count(reader)?)?
        }
        BinaryTypeTag::Set
        | BinaryTypeTag::Interval
        | BinaryTypeTag::Function
        | BinaryTypeTag::AggregateFunction => {
            return Err(CodecError::NotSupported(format!(
                "{:?} in binary type header",
                tag
            )))
        }
    })
}

fn read_count(reader: &mut BinaryReader<'_>) -> CodecResult<usize> {
    reader.read_length()
}

fn read_scale(reader: &mut BinaryReader<'_>, type_name: &str) -> CodecResult<u8> {
    let scale = reader.read_u8()?;
    if scale > crate::spec::MAX_DATETIME64_SCALE {
        return Err(CodecError::InvalidData(format!(
            "{} scale {} out of range",
            type_name, scale
        )));
    }
    Ok(scale)
}

fn read_fields(
    reader: &mut BinaryReader<'_>,
    settings: &TypeSettings,
) -> CodecResult<Vec<(String, ClickHouseType)>> {
    let count = read_count(reader)?;
    let mut fields = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        let name = reader.read_utf8()?;
        fields.push((name, read_header(reader, settings)?));
    }
    Ok(fields)
}

fn read_json_header(
    reader: &mut BinaryReader<'_>,
    settings: &TypeSettings,
) -> CodecResult<ClickHouseType> {
    let version = reader.read_u8()?;
    if version != JSON_SERIALIZATION_VERSION {
        return Err(CodecError::NotSupported(format!(
            "JSON serialization version {}",
            version
        )));
    }
    let max_dynamic_paths = reader.read_varint()?;
    let max_dynamic_types = reader.read_u8()?;
    let count = read_count(reader)?;
    let mut typed_paths = IndexMap::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        let path = reader.read_utf8()?;
        let ty = read_header(reader, settings)?;
        if typed_paths.contains_key(&path) {
            return Err(CodecError::DuplicatePath(path));
        }
        typed_paths.insert(path, ty);
    }
    let count = read_count(reader)?;
    let mut skip_paths = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        skip_paths.push(reader.read_utf8()?);
    }
    let count = read_count(reader)?;
    let mut skip_regexps = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        skip_regexps.push(reader.read_utf8()?);
    }
    let json = JsonType::new(typed_paths, settings.clone())
        .with_limits(max_dynamic_paths, max_dynamic_types)
        .with_skips(skip_paths, skip_regexps)?;
    Ok(ClickHouseType::Json(Box::new(json)))
}
