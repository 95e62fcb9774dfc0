//! Dynamic 类型的读写
//!
//! 每个值前写入自描述类型头；`Nothing` 类型头表示 NULL。

use crate::codec::{BinaryReader, BinaryWriter};
use crate::header::{read_header, write_header};
use crate::infer::TypeInferenceCache;
use crate::settings::TypeSettings;
use crate::spec::DEFAULT_MAX_DYNAMIC_TYPES;
use crate::types::ClickHouseType;
use crate::value::Value;
use crate::CodecResult;

/// Dynamic 类型参数
///
/// 持有解析设置，用于解码值前的类型头。
#[derive(Debug, Clone)]
pub struct DynamicType {
    pub max_types: u8,
    settings: TypeSettings,
}

impl DynamicType {
    pub fn new(max_types: u8, settings: TypeSettings) -> Self {
        Self {
            max_types,
            settings,
        }
    }

    pub fn settings(&self) -> &TypeSettings {
        &self.settings
    }

    pub fn name(&self) -> String {
        if self.max_types == DEFAULT_MAX_DYNAMIC_TYPES {
            "Dynamic".to_string()
        } else {
            format!("Dynamic(max_types={})", self.max_types)
        }
    }

    pub(super) fn read(&self, reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
        reader.enter()?;
        let ty = read_header(reader, &self.settings)?;
        let value = match ty {
            ClickHouseType::Nothing => Value::Null,
            ty => ty.read(reader)?,
        };
        reader.leave();
        Ok(value)
    }

    pub(super) fn write(&self, writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
        writer.enter()?;
        if value.is_null() {
            write_header(writer, &ClickHouseType::Nothing)?;
        } else {
            let ty = TypeInferenceCache::global().infer(value)?;
            write_header(writer, &ty)?;
            ty.write(writer, value)?;
        }
        writer.leave();
        Ok(())
    }
}

impl PartialEq for DynamicType {
    fn eq(&self, other: &Self) -> bool {
        self.max_types == other.max_types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_value, encode_value};
    use crate::decimal::ClickHouseDecimal;

    fn dynamic() -> ClickHouseType {
        ClickHouseType::Dynamic(DynamicType::new(DEFAULT_MAX_DYNAMIC_TYPES, TypeSettings::default()))
    }

    #[test]
    fn test_dynamic_null_is_nothing_header() {
        let ty = dynamic();
        assert_eq!(encode_value(&ty, &Value::Null).unwrap(), vec![0x00]);
        assert_eq!(decode_value(&ty, &[0x00]).unwrap(), Value::Null);
    }

    #[test]
    fn test_dynamic_scalars() {
        let ty = dynamic();
        let bytes = encode_value(&ty, &Value::Int32(7)).unwrap();
        assert_eq!(bytes, vec![0x09, 7, 0, 0, 0]);
        assert_eq!(decode_value(&ty, &bytes).unwrap(), Value::Int32(7));

        let bytes = encode_value(&ty, &Value::from("ok")).unwrap();
        assert_eq!(bytes, vec![0x15, 2, b'o', b'k']);
        assert_eq!(decode_value(&ty, &bytes).unwrap(), Value::from("ok"));
    }

    #[test]
    fn test_dynamic_composite() {
        let ty = dynamic();
        let value = Value::Array(vec![Value::Int64(1), Value::Null]);
        let bytes = encode_value(&ty, &value).unwrap();
        // Array(Nullable(Int64))
        assert_eq!(&bytes[..3], &[0x1E, 0x23, 0x0A]);
        assert_eq!(decode_value(&ty, &bytes).unwrap(), value);

        let decimal = Value::Decimal(ClickHouseDecimal::new(12345, 2));
        let bytes = encode_value(&ty, &decimal).unwrap();
        assert_eq!(&bytes[..3], &[0x1B, 38, 18]);
        assert_eq!(decode_value(&ty, &bytes).unwrap(), decimal);
    }

    #[test]
    fn test_dynamic_decimal_keeps_all_digits() {
        let ty = dynamic();
        let decimal = Value::Decimal(ClickHouseDecimal::new(12345, 20));
        let bytes = encode_value(&ty, &decimal).unwrap();
        assert_eq!(&bytes[..3], &[0x1B, 38, 20]);
        match decode_value(&ty, &bytes).unwrap() {
            Value::Decimal(read) => {
                assert_eq!(read.scale(), 20);
                assert_eq!(read, ClickHouseDecimal::new(12345, 20));
            }
            other => panic!("unexpected value {:?}", other),
        }

        let wide: ClickHouseDecimal = "123456789012345678901234.5".parse().unwrap();
        let bytes = encode_value(&ty, &Value::Decimal(wide.clone())).unwrap();
        assert_eq!(&bytes[..3], &[0x1C, 76, 18]);
        assert_eq!(decode_value(&ty, &bytes).unwrap(), Value::Decimal(wide));
    }

    #[test]
    fn test_dynamic_name() {
        assert_eq!(dynamic().name(), "Dynamic");
        let limited = DynamicType::new(8, TypeSettings::default());
        assert_eq!(limited.name(), "Dynamic(max_types=8)");
    }
}
