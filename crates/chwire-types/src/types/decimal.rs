//! Decimal32/64/128/256 的读写
//!
//! 线上形式为尾数的小端有符号补码，宽度由精度决定。

use crate::codec::{BinaryReader, BinaryWriter};
use crate::decimal::ClickHouseDecimal;
use crate::spec::{BinaryTypeTag, MAX_DECIMAL_PRECISION};
use crate::value::Value;
use crate::{CodecError, CodecResult};
use chwire_common::DecimalMode;
use num_bigint::{BigInt, Sign};

/// Decimal 类型参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimalType {
    pub precision: u8,
    pub scale: u8,
    pub mode: DecimalMode,
}

impl DecimalType {
    /// 创建 Decimal 类型
    ///
    /// # Arguments
    /// * `precision` - 总位数 (1..=76)
    /// * `scale` - 小数位数 (0..=precision)
    /// * `mode` - 读取表示
    pub fn new(precision: u8, scale: u8, mode: DecimalMode) -> CodecResult<Self> {
        if precision == 0 || precision > MAX_DECIMAL_PRECISION {
            return Err(CodecError::invalid_parameter(
                "Decimal",
                format!("precision {} out of range 1..={}", precision, MAX_DECIMAL_PRECISION),
            ));
        }
        if scale > precision {
            return Err(CodecError::invalid_parameter(
                "Decimal",
                format!("scale {} exceeds precision {}", scale, precision),
            ));
        }
        Ok(Self {
            precision,
            scale,
            mode,
        })
    }

    /// 存储宽度(字节)
    pub fn byte_width(&self) -> usize {
        match self.precision {
            0..=9 => 4,
            10..=18 => 8,
            19..=38 => 16,
            _ => 32,
        }
    }

    /// 对应的类型头标记
    pub fn tag(&self) -> BinaryTypeTag {
        match self.byte_width() {
            4 => BinaryTypeTag::Decimal32,
            8 => BinaryTypeTag::Decimal64,
            16 => BinaryTypeTag::Decimal128,
            _ => BinaryTypeTag::Decimal256,
        }
    }

    pub fn name(&self) -> String {
        format!("Decimal({}, {})", self.precision, self.scale)
    }

    pub(super) fn zero(&self) -> Value {
        self.materialize(ClickHouseDecimal::new(0, self.scale as u32))
            .unwrap_or(Value::Null)
    }

    pub(super) fn read(&self, reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
        let bytes = reader.read_bytes(self.byte_width())?;
        let mantissa = BigInt::from_signed_bytes_le(bytes);
        self.materialize(ClickHouseDecimal::new(mantissa, self.scale as u32))
    }

    pub(super) fn write(&self, writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
        let decimal = value.to_decimal()?;
        let width = self.byte_width();
        let mantissa = decimal.scale_mantissa(self.scale as u32, width)?;
        let mut bytes = mantissa.to_signed_bytes_le();
        let fill = if mantissa.sign() == Sign::Minus { 0xFF } else { 0x00 };
        bytes.resize(width, fill);
        writer.put_slice(&bytes);
        Ok(())
    }

    fn materialize(&self, decimal: ClickHouseDecimal) -> CodecResult<Value> {
        match self.mode {
            DecimalMode::BigDecimal => Ok(Value::Decimal(decimal)),
            DecimalMode::Native => Ok(Value::NativeDecimal(decimal.to_native()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_value, encode_value};
    use crate::types::ClickHouseType;
    use std::str::FromStr;

    fn decimal(precision: u8, scale: u8) -> ClickHouseType {
        ClickHouseType::Decimal(DecimalType::new(precision, scale, DecimalMode::BigDecimal).unwrap())
    }

    #[test]
    fn test_storage_width() {
        let width = |p| DecimalType::new(p, 0, DecimalMode::BigDecimal).unwrap().byte_width();
        assert_eq!(width(9), 4);
        assert_eq!(width(10), 8);
        assert_eq!(width(18), 8);
        assert_eq!(width(38), 16);
        assert_eq!(width(39), 32);
        assert_eq!(width(76), 32);
        assert!(DecimalType::new(77, 0, DecimalMode::BigDecimal).is_err());
        assert!(DecimalType::new(5, 6, DecimalMode::BigDecimal).is_err());
    }

    #[test]
    fn test_decimal64_exact_roundtrip() {
        let ty = decimal(18, 9);
        let value = Value::Decimal(ClickHouseDecimal::from_str("123.456789").unwrap());
        let bytes = encode_value(&ty, &value).unwrap();
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes, 123_456_789_000i64.to_le_bytes().to_vec());
        let read = decode_value(&ty, &bytes).unwrap();
        assert_eq!(read, value);
        assert_eq!(read.to_string(), "123.456789000");
    }

    #[test]
    fn test_negative_sign_extension() {
        let ty = decimal(38, 2);
        let value = Value::Decimal(ClickHouseDecimal::from_str("-1.5").unwrap());
        let bytes = encode_value(&ty, &value).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes, (-150i128).to_le_bytes().to_vec());
        assert_eq!(decode_value(&ty, &bytes).unwrap(), value);
    }

    #[test]
    fn test_decimal256_roundtrip() {
        let ty = decimal(76, 10);
        let value = Value::Decimal(
            ClickHouseDecimal::from_str("-123456789012345678901234567890.0123456789").unwrap(),
        );
        let bytes = encode_value(&ty, &value).unwrap();
        assert_eq!(bytes.len(), 32);
        assert_eq!(decode_value(&ty, &bytes).unwrap(), value);
    }

    #[test]
    fn test_overflow_is_rejected() {
        let ty = decimal(9, 2);
        let too_big = Value::Decimal(ClickHouseDecimal::from_str("99999999999").unwrap());
        assert!(matches!(encode_value(&ty, &too_big), Err(CodecError::Overflow(_))));
    }

    #[test]
    fn test_extreme_exponent_text_is_rejected() {
        let ty = decimal(9, 2);
        for text in ["1e-4000000000", "1e200000000"] {
            assert!(encode_value(&ty, &Value::from(text)).is_err());
        }
        assert!(matches!(
            encode_value(&ty, &Value::from("1e300")),
            Err(CodecError::Overflow(_))
        ));
        let bytes = encode_value(&ty, &Value::from("1e-300")).unwrap();
        assert_eq!(bytes, 0i32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_write_coerces_numbers() {
        let ty = decimal(9, 2);
        let bytes = encode_value(&ty, &Value::Int32(7)).unwrap();
        assert_eq!(bytes, 700i32.to_le_bytes().to_vec());
        let bytes = encode_value(&ty, &Value::Float64(1.25)).unwrap();
        assert_eq!(bytes, 125i32.to_le_bytes().to_vec());
        let bytes = encode_value(&ty, &Value::from("3.999")).unwrap();
        assert_eq!(bytes, 399i32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_native_mode() {
        let ty = ClickHouseType::Decimal(DecimalType::new(18, 4, DecimalMode::Native).unwrap());
        let native = rust_decimal::Decimal::from_str("12.3456").unwrap();
        let bytes = encode_value(&ty, &Value::NativeDecimal(native)).unwrap();
        assert_eq!(decode_value(&ty, &bytes).unwrap(), Value::NativeDecimal(native));
    }
}
