//! Enum8、Enum16 的读写
//!
//! 线上为有符号序号；读取返回标签，写入接受标签或序号。

use crate::codec::{BinaryReader, BinaryWriter};
use crate::value::Value;
use crate::{CodecError, CodecResult};
use chwire_grammar::ast::quote;
use indexmap::IndexMap;
use std::collections::HashMap;

/// 枚举成员表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    by_name: IndexMap<String, i16>,
    by_value: HashMap<i16, String>,
}

impl EnumType {
    /// 由 `(标签, 序号)` 创建成员表
    ///
    /// # Arguments
    /// * `members` - 按声明顺序排列的成员
    /// * `min` / `max` - 序号允许范围(Enum8 为 i8 范围)
    ///
    /// # Returns
    /// 标签或序号重复、序号越界时返回 InvalidParameter
    pub fn new(members: Vec<(String, i16)>, min: i16, max: i16) -> CodecResult<Self> {
        let mut by_name = IndexMap::with_capacity(members.len());
        let mut by_value = HashMap::with_capacity(members.len());
        for (label, ordinal) in members {
            if ordinal < min || ordinal > max {
                return Err(CodecError::invalid_parameter(
                    "Enum",
                    format!("ordinal {} of '{}' out of range {}..={}", ordinal, label, min, max),
                ));
            }
            if by_value.insert(ordinal, label.clone()).is_some() {
                return Err(CodecError::invalid_parameter(
                    "Enum",
                    format!("duplicate ordinal {}", ordinal),
                ));
            }
            if by_name.insert(label.clone(), ordinal).is_some() {
                return Err(CodecError::invalid_parameter(
                    "Enum",
                    format!("duplicate label '{}'", label),
                ));
            }
        }
        Ok(Self { by_name, by_value })
    }

    pub fn enum8(members: Vec<(String, i16)>) -> CodecResult<Self> {
        Self::new(members, i8::MIN as i16, i8::MAX as i16)
    }

    pub fn enum16(members: Vec<(String, i16)>) -> CodecResult<Self> {
        Self::new(members, i16::MIN, i16::MAX)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, i16)> {
        self.by_name.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn ordinal(&self, label: &str) -> Option<i16> {
        self.by_name.get(label).copied()
    }

    pub fn label(&self, ordinal: i16) -> Option<&str> {
        self.by_value.get(&ordinal).map(|s| s.as_str())
    }

    pub(super) fn members_text(&self) -> String {
        self.by_name
            .iter()
            .map(|(label, ordinal)| format!("{} = {}", quote(label), ordinal))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(super) fn default_value(&self) -> Value {
        self.by_name
            .keys()
            .next()
            .map(|label| Value::String(label.clone()))
            .unwrap_or(Value::Null)
    }

    pub(super) fn read8(&self, reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
        let ordinal = reader.read_i8()? as i16;
        self.materialize(ordinal)
    }

    pub(super) fn read16(&self, reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
        let ordinal = reader.read_i16()?;
        self.materialize(ordinal)
    }

    pub(super) fn write8(&self, writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
        writer.put_i8(self.resolve(value)? as i8);
        Ok(())
    }

    pub(super) fn write16(&self, writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
        writer.put_i16(self.resolve(value)?);
        Ok(())
    }

    fn materialize(&self, ordinal: i16) -> CodecResult<Value> {
        self.label(ordinal)
            .map(|label| Value::String(label.to_string()))
            .ok_or_else(|| CodecError::InvalidValue(format!("Unknown enum ordinal {}", ordinal)))
    }

    fn resolve(&self, value: &Value) -> CodecResult<i16> {
        match value {
            Value::String(label) => self
                .ordinal(label)
                .ok_or_else(|| CodecError::InvalidValue(format!("Unknown enum label '{}'", label))),
            other => {
                let ordinal = other
                    .as_i128()
                    .ok_or_else(|| CodecError::mismatch("enum label or ordinal", other))?;
                i16::try_from(ordinal)
                    .ok()
                    .filter(|n| self.by_value.contains_key(n))
                    .ok_or_else(|| {
                        CodecError::InvalidValue(format!("Unknown enum ordinal {}", ordinal))
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_value, encode_value};
    use crate::types::ClickHouseType;

    fn colors() -> EnumType {
        EnumType::enum8(vec![("red".to_string(), 1), ("green".to_string(), -2)]).unwrap()
    }

    #[test]
    fn test_label_and_ordinal_writes() {
        let ty = ClickHouseType::Enum8(colors());
        let by_label = encode_value(&ty, &Value::from("green")).unwrap();
        let by_ordinal = encode_value(&ty, &Value::Int32(-2)).unwrap();
        assert_eq!(by_label, vec![0xFE]);
        assert_eq!(by_label, by_ordinal);
        assert_eq!(decode_value(&ty, &by_label).unwrap(), Value::from("green"));
    }

    #[test]
    fn test_unknown_members() {
        let ty = ClickHouseType::Enum8(colors());
        assert!(matches!(
            encode_value(&ty, &Value::from("blue")),
            Err(CodecError::InvalidValue(_))
        ));
        assert!(matches!(
            encode_value(&ty, &Value::Int32(7)),
            Err(CodecError::InvalidValue(_))
        ));
        assert!(matches!(decode_value(&ty, &[7]), Err(CodecError::InvalidValue(_))));
    }

    #[test]
    fn test_enum16_and_name() {
        let e = EnumType::enum16(vec![("a'b".to_string(), 1000)]).unwrap();
        let ty = ClickHouseType::Enum16(e);
        assert_eq!(ty.name(), "Enum16('a\\'b' = 1000)");
        let bytes = encode_value(&ty, &Value::from("a'b")).unwrap();
        assert_eq!(bytes, 1000i16.to_le_bytes().to_vec());
    }

    #[test]
    fn test_invalid_members() {
        assert!(EnumType::enum8(vec![("a".to_string(), 200)]).is_err());
        assert!(EnumType::enum8(vec![("a".to_string(), 1), ("b".to_string(), 1)]).is_err());
        assert!(EnumType::enum8(vec![("a".to_string(), 1), ("a".to_string(), 2)]).is_err());
    }
}
