//! 复合类型的读写
//!
//! Array、Map、Tuple、NamedTuple、Nested、Nullable、Variant、QBit。
//! 进入每一层容器时检查嵌套深度。

use super::ClickHouseType;
use crate::codec::{BinaryReader, BinaryWriter};
use crate::infer::TypeInferenceCache;
use crate::named_tuple::NamedTuple;
use crate::spec::{MAX_ARRAY_LENGTH, NULL_DISCRIMINATOR};
use crate::value::Value;
use crate::{CodecError, CodecResult};
use bytes::BytesMut;
use indexmap::IndexMap;
use tracing::trace;

fn read_count(reader: &mut BinaryReader<'_>) -> CodecResult<usize> {
    let count = reader.read_varint()?;
    usize::try_from(count)
        .ok()
        .filter(|n| *n <= MAX_ARRAY_LENGTH)
        .ok_or_else(|| CodecError::InvalidData(format!("Element count too large: {}", count)))
}

fn read_elements(
    element: &ClickHouseType,
    count: usize,
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Vec<Value>> {
    let mut items = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        items.push(element.read(reader)?);
    }
    Ok(items)
}

pub(super) fn read_array(
    element: &ClickHouseType,
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Value> {
    reader.enter()?;
    let count = read_count(reader)?;
    let items = read_elements(element, count, reader)?;
    reader.leave();
    Ok(Value::Array(items))
}

pub(super) fn write_array(
    element: &ClickHouseType,
    writer: &mut BinaryWriter<'_>,
    value: &Value,
) -> CodecResult<()> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(CodecError::mismatch(format!("Array({})", element), other)),
    };
    writer.enter()?;
    writer.put_varint(items.len() as u64);
    for item in items {
        element.write(writer, item)?;
    }
    writer.leave();
    Ok(())
}

pub(super) fn read_map(
    key: &ClickHouseType,
    value: &ClickHouseType,
    as_pairs: bool,
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Value> {
    reader.enter()?;
    let count = read_count(reader)?;
    let result = if as_pairs {
        let mut pairs = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let k = key.read(reader)?;
            let v = value.read(reader)?;
            pairs.push((k, v));
        }
        Value::Pairs(pairs)
    } else {
        let mut map = IndexMap::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let k = key.read(reader)?;
            let v = value.read(reader)?;
            map.insert(k, v);
        }
        Value::Map(map)
    };
    reader.leave();
    Ok(result)
}

/// 写入 Map，接受关联容器或有序键值对列表，按迭代顺序写出
pub(super) fn write_map(
    key: &ClickHouseType,
    value: &ClickHouseType,
    writer: &mut BinaryWriter<'_>,
    input: &Value,
) -> CodecResult<()> {
    let pairs: Vec<(&Value, &Value)> = match input {
        Value::Map(map) => map.iter().collect(),
        Value::Pairs(pairs) => pairs.iter().map(|(k, v)| (k, v)).collect(),
        other => {
            return Err(CodecError::mismatch(
                format!("Map({}, {})", key, value),
                other,
            ))
        }
    };
    writer.enter()?;
    writer.put_varint(pairs.len() as u64);
    for (k, v) in pairs {
        if k.is_null() {
            return Err(CodecError::mismatch(format!("non-null {} key", key), k));
        }
        key.write(writer, k)?;
        value.write(writer, v)?;
    }
    writer.leave();
    Ok(())
}

pub(super) fn read_tuple(
    items: &[ClickHouseType],
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Value> {
    reader.enter()?;
    let mut values = Vec::with_capacity(items.len());
    for ty in items {
        values.push(ty.read(reader)?);
    }
    reader.leave();
    Ok(Value::Tuple(values))
}

pub(super) fn read_named_tuple(
    fields: &[(String, ClickHouseType)],
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Value> {
    reader.enter()?;
    let mut values = Vec::with_capacity(fields.len());
    for (name, ty) in fields {
        values.push((name.clone(), ty.read(reader)?));
    }
    reader.leave();
    Ok(Value::NamedTuple(NamedTuple::new(values)?))
}

/// 按位置写入元组
///
/// # Brief
/// 接受 Tuple、NamedTuple(按位置)或元素个数相同的 Array；
/// Map 等其他形状返回 TypeMismatch
pub(super) fn write_tuple<'t>(
    types: impl ExactSizeIterator<Item = &'t ClickHouseType>,
    writer: &mut BinaryWriter<'_>,
    value: &Value,
) -> CodecResult<()> {
    let arity = types.len();
    let items: Vec<&Value> = match value {
        Value::Tuple(items) | Value::Array(items) => items.iter().collect(),
        Value::NamedTuple(tuple) => tuple.values().collect(),
        other => {
            return Err(CodecError::mismatch(
                format!("Tuple of {} elements", arity),
                other,
            ))
        }
    };
    if items.len() != arity {
        return Err(CodecError::TypeMismatch {
            expected: format!("Tuple of {} elements", arity),
            actual: format!("{} of {} elements", value.kind_name(), items.len()),
        });
    }
    writer.enter()?;
    for (ty, item) in types.zip(items) {
        ty.write(writer, item)?;
    }
    writer.leave();
    Ok(())
}

/// Nested 的线上形式与 `Array(Tuple(...))` 相同
pub(super) fn read_nested(
    fields: &[(String, ClickHouseType)],
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Value> {
    reader.enter()?;
    let count = read_count(reader)?;
    let mut rows = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        rows.push(read_named_tuple(fields, reader)?);
    }
    reader.leave();
    Ok(Value::Array(rows))
}

pub(super) fn write_nested(
    fields: &[(String, ClickHouseType)],
    writer: &mut BinaryWriter<'_>,
    value: &Value,
) -> CodecResult<()> {
    let rows = match value {
        Value::Array(rows) => rows,
        other => return Err(CodecError::mismatch("Array of Nested rows", other)),
    };
    writer.enter()?;
    writer.put_varint(rows.len() as u64);
    for row in rows {
        write_tuple(fields.iter().map(|(_, ty)| ty), writer, row)?;
    }
    writer.leave();
    Ok(())
}

/// Nullable: 前导标志字节，1 表示 NULL(不写值)，0 表示值存在
pub(super) fn read_nullable(
    inner: &ClickHouseType,
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Value> {
    match reader.read_u8()? {
        1 => Ok(Value::Null),
        0 => inner.read(reader),
        flag => Err(CodecError::InvalidData(format!("Invalid Nullable flag {}", flag))),
    }
}

pub(super) fn write_nullable(
    inner: &ClickHouseType,
    writer: &mut BinaryWriter<'_>,
    value: &Value,
) -> CodecResult<()> {
    if value.is_null() {
        writer.put_u8(1);
        return Ok(());
    }
    writer.put_u8(0);
    inner.write(writer, value)
}

pub(super) fn read_variant(
    members: &[ClickHouseType],
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Value> {
    let discriminator = reader.read_u8()?;
    if discriminator == NULL_DISCRIMINATOR {
        return Ok(Value::Null);
    }
    let member = members.get(discriminator as usize).ok_or_else(|| {
        CodecError::InvalidData(format!(
            "Variant discriminator {} out of range for {} members",
            discriminator,
            members.len()
        ))
    })?;
    member.read(reader)
}

/// 成员下标对应的判别值，0xFF 保留给 NULL
fn variant_discriminator(index: usize) -> CodecResult<u8> {
    u8::try_from(index)
        .ok()
        .filter(|d| *d != NULL_DISCRIMINATOR)
        .ok_or_else(|| {
            CodecError::invalid_parameter(
                "Variant",
                format!("member index {} has no discriminator", index),
            )
        })
}

/// 写入 Variant
///
/// # Brief
/// 优先选择规范名称与值的推断类型一致的成员，否则选择第一个能写入该值的成员
pub(super) fn write_variant(
    members: &[ClickHouseType],
    writer: &mut BinaryWriter<'_>,
    value: &Value,
) -> CodecResult<()> {
    if value.is_null() {
        writer.put_u8(NULL_DISCRIMINATOR);
        return Ok(());
    }
    if let Ok(inferred) = TypeInferenceCache::global().infer(value) {
        let inferred_name = inferred.name();
        if let Some(index) = members.iter().position(|m| m.name() == inferred_name) {
            writer.put_u8(variant_discriminator(index)?);
            return members[index].write(writer, value);
        }
    }
    for (index, member) in members.iter().enumerate() {
        let mut scratch = BytesMut::new();
        let mut trial = writer.fork(&mut scratch);
        if member.write(&mut trial, value).is_ok() {
            trace!(member = %member, "Variant member chosen by trial write");
            writer.put_u8(variant_discriminator(index)?);
            writer.put_slice(&scratch);
            return Ok(());
        }
    }
    Err(CodecError::TypeMismatch {
        expected: format!("Variant({})", super::join_names(members.iter())),
        actual: value.kind_name().to_string(),
    })
}

/// QBit: 线上形式同 Array，读取时保留前 `dimension` 个元素并补齐默认值
pub(super) fn read_qbit(
    element: &ClickHouseType,
    dimension: usize,
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Value> {
    reader.enter()?;
    let count = read_count(reader)?;
    let mut items = Vec::with_capacity(dimension);
    for index in 0..count {
        let item = element.read(reader)?;
        if index < dimension {
            items.push(item);
        }
    }
    if count > dimension {
        trace!(count, dimension, "QBit extra elements discarded");
    }
    while items.len() < dimension {
        items.push(element.default_value());
    }
    reader.leave();
    Ok(Value::Array(items))
}

pub(super) fn write_qbit(
    element: &ClickHouseType,
    dimension: usize,
    writer: &mut BinaryWriter<'_>,
    value: &Value,
) -> CodecResult<()> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(CodecError::mismatch(format!("QBit({}, {})", element, dimension), other)),
    };
    if items.len() > dimension {
        return Err(CodecError::Overflow(format!(
            "{} elements do not fit QBit dimension {}",
            items.len(),
            dimension
        )));
    }
    writer.enter()?;
    writer.put_varint(dimension as u64);
    for item in items {
        element.write(writer, item)?;
    }
    let padding = element.default_value();
    for _ in items.len()..dimension {
        element.write(writer, &padding)?;
    }
    writer.leave();
    Ok(())
}
