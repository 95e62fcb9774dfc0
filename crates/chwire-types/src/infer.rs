//! 类型推断模块
//!
//! 为 Dynamic、Variant 与 JSON 未提示路径上的值推断类型。
//! 推断结果按值的形状缓存在进程级的 [`TypeInferenceCache`] 中。
//!
//! 标量映射:
//! - 十进制 → 默认 `Decimal(38, 18)`；标度或整数位更多时按值放宽到能精确容纳的精度
//! - 日期时间 → `DateTime64(9)`，日期 → `Date32`，时长 → `Time64(9)`
//! - 字节串 → `String`，JSON 值 → `String`(JSON 文本)，记录对象 → `JSON`
//! - 空数组 → `Array(Nothing)`；含 NULL 的元素类型包装为 `Nullable`

use crate::decimal::ClickHouseDecimal;
use crate::json::JsonType;
use crate::settings::TypeSettings;
use crate::spec::{DEFAULT_MAX_DYNAMIC_TYPES, MAX_DECIMAL_PRECISION};
use crate::types::{ClickHouseType, DecimalType, DynamicType, GeoKind};
use crate::value::Value;
use crate::{CodecError, CodecResult};
use chwire_common::DecimalMode;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// 值的形状，作为推断缓存的键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueShape {
    Scalar(&'static str),
    Nullable(Box<ValueShape>),
    Array(Box<ValueShape>),
    Tuple(Vec<ValueShape>),
    NamedTuple(Vec<(String, ValueShape)>),
    Map(Box<ValueShape>, Box<ValueShape>),
    Geometry(GeoKind),
    /// 十进制值的整数位数与标度
    Decimal {
        integer_digits: u32,
        scale: u32,
        native: bool,
    },
}

/// 推断十进制类型的默认标度
const DEFAULT_DECIMAL_SCALE: u32 = 18;

impl ValueShape {
    /// 计算值的形状
    ///
    /// # Returns
    /// 数组或 Map 中元素形状不一致时返回 InvalidValue
    pub fn of(value: &Value) -> CodecResult<Self> {
        Ok(match value {
            Value::Array(items) => ValueShape::Array(Box::new(unify(items.iter())?)),
            Value::Tuple(items) => {
                ValueShape::Tuple(items.iter().map(Self::of).collect::<CodecResult<_>>()?)
            }
            Value::NamedTuple(tuple) => ValueShape::NamedTuple(
                tuple
                    .iter()
                    .map(|(name, v)| Ok((name.to_string(), Self::of(v)?)))
                    .collect::<CodecResult<_>>()?,
            ),
            Value::Map(map) => ValueShape::Map(
                Box::new(unify(map.keys())?),
                Box::new(unify(map.values())?),
            ),
            Value::Pairs(pairs) => ValueShape::Map(
                Box::new(unify(pairs.iter().map(|(k, _)| k))?),
                Box::new(unify(pairs.iter().map(|(_, v)| v))?),
            ),
            Value::Geometry(kind, _) => ValueShape::Geometry(*kind),
            Value::Decimal(d) => Self::decimal(d, false)?,
            Value::NativeDecimal(d) => Self::decimal(&ClickHouseDecimal::from(*d), true)?,
            scalar => ValueShape::Scalar(scalar.kind_name()),
        })
    }

    /// 十进制值的形状
    ///
    /// # Returns
    /// 无法在 76 位精度内精确表示时返回 InvalidValue
    fn decimal(value: &ClickHouseDecimal, native: bool) -> CodecResult<Self> {
        let limit = MAX_DECIMAL_PRECISION as u32;
        let value = if value.scale() > limit {
            value.normalize()
        } else {
            value.clone()
        };
        let scale = value.scale();
        let integer_digits = value.precision().saturating_sub(scale);
        Self::decimal_shape(integer_digits, scale, native).ok_or_else(|| {
            CodecError::InvalidValue(format!(
                "Decimal value {} exceeds {} digits of precision",
                value, limit
            ))
        })
    }

    fn decimal_shape(integer_digits: u32, scale: u32, native: bool) -> Option<Self> {
        (integer_digits + scale <= MAX_DECIMAL_PRECISION as u32).then_some(ValueShape::Decimal {
            integer_digits,
            scale,
            native,
        })
    }

    /// 合并同一集合中的两个元素形状
    ///
    /// # Brief
    /// 形状相同时原样返回；两个十进制形状取较宽者；其余组合返回 InvalidValue
    fn widen(self, other: ValueShape) -> CodecResult<Self> {
        if self == other {
            return Ok(self);
        }
        if let (
            ValueShape::Decimal {
                integer_digits: a_digits,
                scale: a_scale,
                native: a_native,
            },
            ValueShape::Decimal {
                integer_digits: b_digits,
                scale: b_scale,
                native: b_native,
            },
        ) = (&self, &other)
        {
            if a_native == b_native {
                let merged =
                    Self::decimal_shape(*a_digits.max(b_digits), *a_scale.max(b_scale), *a_native);
                if let Some(merged) = merged {
                    return Ok(merged);
                }
            }
        }
        Err(CodecError::InvalidValue(format!(
            "Cannot infer a common type for {:?} and {:?}",
            self, other
        )))
    }

    fn is_composite(&self) -> bool {
        matches!(
            self,
            ValueShape::Array(_) | ValueShape::Tuple(_) | ValueShape::NamedTuple(_) | ValueShape::Map(..)
        )
    }
}

/// 合并元素形状；含 NULL 时包装为 Nullable
fn unify<'a>(items: impl Iterator<Item = &'a Value>) -> CodecResult<ValueShape> {
    let mut shape: Option<ValueShape> = None;
    let mut has_null = false;
    for item in items {
        if item.is_null() {
            has_null = true;
            continue;
        }
        let current = ValueShape::of(item)?;
        shape = Some(match shape.take() {
            None => current,
            Some(existing) => existing.widen(current)?,
        });
    }
    let shape = shape.unwrap_or(ValueShape::Scalar("Null"));
    if !has_null || shape == ValueShape::Scalar("Null") {
        return Ok(shape);
    }
    if shape.is_composite() {
        return Err(CodecError::InvalidValue(format!(
            "Composite element {:?} cannot be Nullable",
            shape
        )));
    }
    Ok(ValueShape::Nullable(Box::new(shape)))
}

/// 由形状构造类型
fn type_for_shape(shape: &ValueShape) -> CodecResult<ClickHouseType> {
    Ok(match shape {
        ValueShape::Scalar(kind) => scalar_type(kind)?,
        ValueShape::Nullable(inner) => ClickHouseType::Nullable(Box::new(type_for_shape(inner)?)),
        ValueShape::Array(inner) => ClickHouseType::Array(Box::new(type_for_shape(inner)?)),
        ValueShape::Tuple(items) => ClickHouseType::Tuple(
            items.iter().map(type_for_shape).collect::<CodecResult<_>>()?,
        ),
        ValueShape::NamedTuple(fields) => ClickHouseType::NamedTuple(
            fields
                .iter()
                .map(|(name, s)| Ok((name.clone(), type_for_shape(s)?)))
                .collect::<CodecResult<_>>()?,
        ),
        ValueShape::Map(key, value) => ClickHouseType::Map {
            key: Box::new(type_for_shape(key)?),
            value: Box::new(type_for_shape(value)?),
            as_pairs: false,
        },
        ValueShape::Geometry(_) => ClickHouseType::Geometry,
        ValueShape::Decimal {
            integer_digits,
            scale,
            native,
        } => ClickHouseType::Decimal(decimal_type(*integer_digits, *scale, *native)?),
    })
}

/// 选择能精确容纳给定位数的十进制类型
///
/// 优先 `Decimal(38, 18)`，放不下时依次尝试 `Decimal(38, s)` 与 `Decimal(76, s)`，
/// 其中 `s` 不小于 18；整数位过多时退回值自身的标度。
fn decimal_type(integer_digits: u32, scale: u32, native: bool) -> CodecResult<DecimalType> {
    let mode = if native {
        DecimalMode::Native
    } else {
        DecimalMode::BigDecimal
    };
    let padded = scale.max(DEFAULT_DECIMAL_SCALE);
    let (precision, scale) = if integer_digits + padded <= 38 {
        (38, padded)
    } else if integer_digits + padded <= MAX_DECIMAL_PRECISION as u32 {
        (MAX_DECIMAL_PRECISION as u32, padded)
    } else {
        (MAX_DECIMAL_PRECISION as u32, scale)
    };
    DecimalType::new(precision as u8, scale as u8, mode)
}

fn scalar_type(kind: &str) -> CodecResult<ClickHouseType> {
    Ok(match kind {
        "Null" => ClickHouseType::Nothing,
        "Bool" => ClickHouseType::Bool,
        "Int8" => ClickHouseType::Int8,
        "Int16" => ClickHouseType::Int16,
        "Int32" => ClickHouseType::Int32,
        "Int64" => ClickHouseType::Int64,
        "Int128" => ClickHouseType::Int128,
        "Int256" => ClickHouseType::Int256,
        "UInt8" => ClickHouseType::UInt8,
        "UInt16" => ClickHouseType::UInt16,
        "UInt32" => ClickHouseType::UInt32,
        "UInt64" => ClickHouseType::UInt64,
        "UInt128" => ClickHouseType::UInt128,
        "UInt256" => ClickHouseType::UInt256,
        "Float32" => ClickHouseType::Float32,
        "Float64" => ClickHouseType::Float64,
        "String" | "Json" => ClickHouseType::String { as_bytes: false },
        "Bytes" => ClickHouseType::String { as_bytes: true },
        "UUID" => ClickHouseType::Uuid,
        "IPv4" => ClickHouseType::Ipv4,
        "IPv6" => ClickHouseType::Ipv6,
        "Date" => ClickHouseType::Date32,
        "DateTime" => ClickHouseType::DateTime64 {
            scale: 9,
            timezone: None,
        },
        "Time" => ClickHouseType::Time64(9),
        "Record" => ClickHouseType::Json(Box::new(JsonType::default())),
        other => {
            return Err(CodecError::NotSupported(format!(
                "Cannot infer a type for {} values",
                other
            )))
        }
    })
}

/// 推断值的类型(不经缓存)
pub fn infer_type(value: &Value) -> CodecResult<ClickHouseType> {
    type_for_shape(&ValueShape::of(value)?)
}

/// 类型推断缓存
///
/// 进程级、线程安全；并发未命中时可能重复计算，结果相同。
#[derive(Default)]
pub struct TypeInferenceCache {
    types: DashMap<ValueShape, Arc<ClickHouseType>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TypeInferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级共享缓存，首次使用时创建
    pub fn global() -> &'static TypeInferenceCache {
        static GLOBAL: OnceLock<TypeInferenceCache> = OnceLock::new();
        GLOBAL.get_or_init(TypeInferenceCache::new)
    }

    /// 推断值的类型
    ///
    /// # Brief
    /// 按值的形状查找缓存，未命中时计算并写入；失败时不写缓存
    pub fn infer(&self, value: &Value) -> CodecResult<Arc<ClickHouseType>> {
        let shape = ValueShape::of(value)?;
        if let Some(ty) = self.types.get(&shape) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(ty.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let ty = Arc::new(type_for_shape(&shape)?);
        trace!(shape = ?shape, inferred = %ty, "Type inference cache miss");
        Ok(self.types.entry(shape).or_insert(ty).clone())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// 返回 (命中次数, 未命中次数)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

/// 推断得到的 Dynamic 类型(JSON 未提示路径使用)
pub(crate) fn dynamic_type(settings: &TypeSettings) -> ClickHouseType {
    ClickHouseType::Dynamic(DynamicType::new(DEFAULT_MAX_DYNAMIC_TYPES, settings.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_value;
    use crate::temporal::DateTimeValue;
    use chrono::NaiveDate;
    use indexmap::IndexMap;

    #[test]
    fn test_scalar_inference() {
        assert_eq!(infer_type(&Value::Int64(1)).unwrap().name(), "Int64");
        assert_eq!(infer_type(&Value::from("x")).unwrap().name(), "String");
        assert_eq!(
            infer_type(&Value::Decimal(Default::default())).unwrap().name(),
            "Decimal(38, 18)"
        );
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(infer_type(&Value::Date(date)).unwrap().name(), "Date32");
        let dt = Value::DateTime(DateTimeValue::Naive(date.and_hms_opt(0, 0, 0).unwrap()));
        assert_eq!(infer_type(&dt).unwrap().name(), "DateTime64(9)");
    }

    #[test]
    fn test_decimal_inference_widens_to_fit() {
        let infer = |text: &str| {
            let d: ClickHouseDecimal = text.parse().unwrap();
            infer_type(&Value::Decimal(d)).unwrap().name()
        };
        assert_eq!(infer("1.5"), "Decimal(38, 18)");
        assert_eq!(infer("0.00000000000000000001"), "Decimal(38, 20)");
        assert_eq!(infer("123456789012345678901.5"), "Decimal(76, 18)");
        assert_eq!(infer(&format!("1{}", "0".repeat(70))), "Decimal(76, 0)");
        let too_wide = ClickHouseDecimal::new(1, 77);
        assert!(matches!(
            infer_type(&Value::Decimal(too_wide)),
            Err(CodecError::InvalidValue(_))
        ));
        assert_eq!(
            infer_type(&Value::Decimal(ClickHouseDecimal::new(100, 78))).unwrap().name(),
            "Decimal(76, 76)"
        );

        let mixed = Value::Array(vec![
            Value::Decimal("1.5".parse().unwrap()),
            Value::Decimal(ClickHouseDecimal::new(12345, 20)),
        ]);
        assert_eq!(infer_type(&mixed).unwrap().name(), "Array(Decimal(38, 20))");
    }

    #[test]
    fn test_composite_inference() {
        let arr = Value::Array(vec![Value::Int32(1), Value::Null]);
        assert_eq!(infer_type(&arr).unwrap().name(), "Array(Nullable(Int32))");
        assert_eq!(infer_type(&Value::Array(vec![])).unwrap().name(), "Array(Nothing)");

        let mut map = IndexMap::new();
        map.insert(Value::from("k"), Value::Float64(1.0));
        assert_eq!(infer_type(&Value::Map(map)).unwrap().name(), "Map(String, Float64)");

        let tuple = Value::Tuple(vec![Value::Bool(true), Value::UInt8(1)]);
        assert_eq!(infer_type(&tuple).unwrap().name(), "Tuple(Bool, UInt8)");
    }

    #[test]
    fn test_heterogeneous_array_rejected() {
        let arr = Value::Array(vec![Value::Int32(1), Value::from("x")]);
        assert!(matches!(infer_type(&arr), Err(CodecError::InvalidValue(_))));
        let nested = Value::Array(vec![Value::Array(vec![]), Value::Null]);
        assert!(infer_type(&nested).is_err());
    }

    #[test]
    fn test_cache_is_idempotent() {
        let cache = TypeInferenceCache::new();
        let first = cache.infer(&Value::Int32(5)).unwrap();
        let second = cache.infer(&Value::Int32(9)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), (1, 1));

        let value = Value::Array(vec![Value::from("a")]);
        let a = cache.infer(&value).unwrap();
        let b = cache.infer(&value).unwrap();
        assert_eq!(a.name(), b.name());
        assert_eq!(encode_value(&a, &value).unwrap(), encode_value(&b, &value).unwrap());
    }

    #[test]
    fn test_failed_inference_not_cached() {
        let cache = TypeInferenceCache::new();
        let bad = Value::Array(vec![Value::Int8(1), Value::Int16(1)]);
        assert!(cache.infer(&bad).is_err());
        assert!(cache.is_empty());
    }
}
