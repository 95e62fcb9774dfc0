//! 布尔、整数与浮点类型的读写
//!
//! 整数写入时从任意数值形状强制转换，超出目标范围时报 `Overflow`，不做截断。

use super::ClickHouseType;
use crate::codec::{BinaryReader, BinaryWriter};
use crate::value::Value;
use crate::{CodecError, CodecResult};
use num_bigint::{BigInt, BigUint, Sign};

const WIDE_INT_BYTES: usize = 32;

pub(super) fn read(ty: &ClickHouseType, reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
    Ok(match ty {
        ClickHouseType::Bool => Value::Bool(reader.read_u8()? != 0),
        ClickHouseType::Int8 => Value::Int8(reader.read_i8()?),
        ClickHouseType::Int16 => Value::Int16(reader.read_i16()?),
        ClickHouseType::Int32 => Value::Int32(reader.read_i32()?),
        ClickHouseType::Int64 => Value::Int64(reader.read_i64()?),
        ClickHouseType::Int128 => Value::Int128(reader.read_i128()?),
        ClickHouseType::Int256 => {
            Value::Int256(BigInt::from_signed_bytes_le(reader.read_bytes(WIDE_INT_BYTES)?))
        }
        ClickHouseType::UInt8 => Value::UInt8(reader.read_u8()?),
        ClickHouseType::UInt16 => Value::UInt16(reader.read_u16()?),
        ClickHouseType::UInt32 => Value::UInt32(reader.read_u32()?),
        ClickHouseType::UInt64 => Value::UInt64(reader.read_u64()?),
        ClickHouseType::UInt128 => Value::UInt128(reader.read_u128()?),
        ClickHouseType::UInt256 => {
            Value::UInt256(BigUint::from_bytes_le(reader.read_bytes(WIDE_INT_BYTES)?))
        }
        ClickHouseType::Float32 => Value::Float32(reader.read_f32()?),
        ClickHouseType::Float64 => Value::Float64(reader.read_f64()?),
        ClickHouseType::BFloat16 => {
            let bits = reader.read_u16()? as u32;
            Value::Float32(f32::from_bits(bits << 16))
        }
        other => return Err(CodecError::NotSupported(format!("{} is not numeric", other))),
    })
}

pub(super) fn write(
    ty: &ClickHouseType,
    writer: &mut BinaryWriter<'_>,
    value: &Value,
) -> CodecResult<()> {
    match ty {
        ClickHouseType::Bool => writer.put_u8(coerce_bool(value)? as u8),
        ClickHouseType::Int8 => writer.put_i8(coerce_int(value, "Int8")?),
        ClickHouseType::Int16 => writer.put_i16(coerce_int(value, "Int16")?),
        ClickHouseType::Int32 => writer.put_i32(coerce_int(value, "Int32")?),
        ClickHouseType::Int64 => writer.put_i64(coerce_int(value, "Int64")?),
        ClickHouseType::Int128 => writer.put_i128(coerce_int(value, "Int128")?),
        ClickHouseType::Int256 => write_int256(writer, value)?,
        ClickHouseType::UInt8 => writer.put_u8(coerce_int(value, "UInt8")?),
        ClickHouseType::UInt16 => writer.put_u16(coerce_int(value, "UInt16")?),
        ClickHouseType::UInt32 => writer.put_u32(coerce_int(value, "UInt32")?),
        ClickHouseType::UInt64 => writer.put_u64(coerce_int(value, "UInt64")?),
        ClickHouseType::UInt128 => writer.put_u128(coerce_int(value, "UInt128")?),
        ClickHouseType::UInt256 => write_uint256(writer, value)?,
        ClickHouseType::Float32 => writer.put_f32(coerce_f32(value)?),
        ClickHouseType::Float64 => writer.put_f64(value.to_f64()?),
        ClickHouseType::BFloat16 => writer.put_u16((coerce_f32(value)?.to_bits() >> 16) as u16),
        other => return Err(CodecError::NotSupported(format!("{} is not numeric", other))),
    }
    Ok(())
}

fn coerce_bool(value: &Value) -> CodecResult<bool> {
    if let Value::Bool(b) = value {
        return Ok(*b);
    }
    match value.to_bigint()? {
        n if n == BigInt::from(0) => Ok(false),
        n if n == BigInt::from(1) => Ok(true),
        n => Err(CodecError::InvalidValue(format!("{} is not a valid Bool", n))),
    }
}

/// 将数值强制转换为定宽整数
///
/// 不超过 128 位的原生整数走快速路径，其余经由任意精度整数。
fn coerce_int<T>(value: &Value, type_name: &str) -> CodecResult<T>
where
    T: TryFrom<i128> + TryFrom<BigInt>,
{
    let overflow = || CodecError::Overflow(format!("{} does not fit {}", value, type_name));
    if let Some(n) = value.as_i128() {
        return T::try_from(n).map_err(|_| overflow());
    }
    T::try_from(value.to_bigint()?).map_err(|_| overflow())
}

fn coerce_f32(value: &Value) -> CodecResult<f32> {
    if let Value::Float32(f) = value {
        return Ok(*f);
    }
    let wide = value.to_f64()?;
    let narrow = wide as f32;
    if wide.is_finite() && narrow.is_infinite() {
        return Err(CodecError::Overflow(format!("{} does not fit Float32", wide)));
    }
    Ok(narrow)
}

fn write_int256(writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
    let n = value.to_bigint()?;
    let mut bytes = n.to_signed_bytes_le();
    if bytes.len() > WIDE_INT_BYTES {
        return Err(CodecError::Overflow(format!("{} does not fit Int256", n)));
    }
    let fill = if n.sign() == Sign::Minus { 0xFF } else { 0x00 };
    bytes.resize(WIDE_INT_BYTES, fill);
    writer.put_slice(&bytes);
    Ok(())
}

fn write_uint256(writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
    let n = value.to_bigint()?;
    let unsigned = n
        .to_biguint()
        .ok_or_else(|| CodecError::Overflow(format!("{} does not fit UInt256", n)))?;
    let mut bytes = unsigned.to_bytes_le();
    if bytes.len() > WIDE_INT_BYTES {
        return Err(CodecError::Overflow(format!("{} does not fit UInt256", n)));
    }
    bytes.resize(WIDE_INT_BYTES, 0);
    writer.put_slice(&bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_value, encode_value};
    use crate::decimal::ClickHouseDecimal;

    fn roundtrip(ty: &ClickHouseType, value: Value) {
        let bytes = encode_value(ty, &value).unwrap();
        assert_eq!(decode_value(ty, &bytes).unwrap(), value, "{}", ty);
    }

    #[test]
    fn test_integer_boundaries() {
        for v in [i8::MIN, -1, 0, i8::MAX] {
            roundtrip(&ClickHouseType::Int8, Value::Int8(v));
        }
        for v in [i16::MIN, -1, 0, i16::MAX] {
            roundtrip(&ClickHouseType::Int16, Value::Int16(v));
        }
        for v in [i32::MIN, -1, 0, i32::MAX] {
            roundtrip(&ClickHouseType::Int32, Value::Int32(v));
        }
        for v in [i64::MIN, -1, 0, i64::MAX] {
            roundtrip(&ClickHouseType::Int64, Value::Int64(v));
        }
        for v in [i128::MIN, -1, 0, i128::MAX] {
            roundtrip(&ClickHouseType::Int128, Value::Int128(v));
        }
        for v in [0, u8::MAX] {
            roundtrip(&ClickHouseType::UInt8, Value::UInt8(v));
        }
        for v in [0, u16::MAX] {
            roundtrip(&ClickHouseType::UInt16, Value::UInt16(v));
        }
        for v in [0, u32::MAX] {
            roundtrip(&ClickHouseType::UInt32, Value::UInt32(v));
        }
        for v in [0, u64::MAX] {
            roundtrip(&ClickHouseType::UInt64, Value::UInt64(v));
        }
        for v in [0, u128::MAX] {
            roundtrip(&ClickHouseType::UInt128, Value::UInt128(v));
        }
    }

    #[test]
    fn test_wide_integer_boundaries() {
        let max: BigInt = (BigInt::from(1) << 255) - 1;
        let min = -(BigInt::from(1) << 255u32);
        for v in [min.clone(), BigInt::from(-1), BigInt::from(0), max.clone()] {
            roundtrip(&ClickHouseType::Int256, Value::Int256(v));
        }
        let umax = (BigUint::from(1u8) << 256) - 1u8;
        roundtrip(&ClickHouseType::UInt256, Value::UInt256(umax));
        roundtrip(&ClickHouseType::UInt256, Value::UInt256(BigUint::from(0u8)));

        assert!(matches!(
            encode_value(&ClickHouseType::Int256, &Value::Int256(max + 1)),
            Err(CodecError::Overflow(_))
        ));
        assert!(matches!(
            encode_value(&ClickHouseType::UInt256, &Value::Int32(-1)),
            Err(CodecError::Overflow(_))
        ));
    }

    #[test]
    fn test_minus_one_is_all_ones() {
        let bytes = encode_value(&ClickHouseType::Int256, &Value::Int32(-1)).unwrap();
        assert_eq!(bytes, vec![0xFF; 32]);
        let bytes = encode_value(&ClickHouseType::Int32, &Value::Int32(-2)).unwrap();
        assert_eq!(bytes, vec![0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_integer_coercion() {
        let bytes = encode_value(&ClickHouseType::UInt8, &Value::Int64(200)).unwrap();
        assert_eq!(bytes, vec![200]);
        let bytes = encode_value(&ClickHouseType::Int16, &Value::Float64(-3.0)).unwrap();
        assert_eq!(bytes, (-3i16).to_le_bytes().to_vec());
        let decimal = Value::Decimal(ClickHouseDecimal::new(700, 2));
        let bytes = encode_value(&ClickHouseType::Int32, &decimal).unwrap();
        assert_eq!(bytes, 7i32.to_le_bytes().to_vec());

        assert!(matches!(
            encode_value(&ClickHouseType::UInt8, &Value::Int32(256)),
            Err(CodecError::Overflow(_))
        ));
        assert!(matches!(
            encode_value(&ClickHouseType::UInt64, &Value::Int8(-1)),
            Err(CodecError::Overflow(_))
        ));
        assert!(matches!(
            encode_value(&ClickHouseType::Int32, &Value::from("12")),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_float_boundaries() {
        for v in [0.0, -0.0, f64::MIN, f64::MAX, f64::MIN_POSITIVE, f64::EPSILON] {
            roundtrip(&ClickHouseType::Float64, Value::Float64(v));
        }
        for v in [0.0, f32::MIN, f32::MAX, f32::MIN_POSITIVE] {
            roundtrip(&ClickHouseType::Float32, Value::Float32(v));
        }
        assert!(matches!(
            encode_value(&ClickHouseType::Float32, &Value::Float64(1e300)),
            Err(CodecError::Overflow(_))
        ));
    }

    #[test]
    fn test_bfloat16_truncates() {
        let bytes = encode_value(&ClickHouseType::BFloat16, &Value::Float32(1.0)).unwrap();
        assert_eq!(bytes, vec![0x80, 0x3F]);
        // 1.00390625 = 1 + 2^-8，低 16 位被截断
        let bytes = encode_value(&ClickHouseType::BFloat16, &Value::Float32(1.003_906_3)).unwrap();
        assert_eq!(decode_value(&ClickHouseType::BFloat16, &bytes).unwrap(), Value::Float32(1.0));
    }

    #[test]
    fn test_bool() {
        roundtrip(&ClickHouseType::Bool, Value::Bool(true));
        roundtrip(&ClickHouseType::Bool, Value::Bool(false));
        assert_eq!(encode_value(&ClickHouseType::Bool, &Value::UInt8(1)).unwrap(), vec![1]);
        assert!(matches!(
            encode_value(&ClickHouseType::Bool, &Value::Int32(2)),
            Err(CodecError::InvalidValue(_))
        ));
    }
}
