//! 命名元组模块
//!
//! 有序的 `(名称, 值)` 序列，支持 O(1) 按名访问。

use crate::value::Value;
use crate::{CodecError, CodecResult};
use indexmap::IndexMap;
use std::hash::{Hash, Hasher};

/// 命名元组
///
/// 使用 `IndexMap` 保持字段声明顺序；构造时拒绝重复名称，构造后不可变。
#[derive(Debug, Clone, Default)]
pub struct NamedTuple {
    fields: IndexMap<String, Value>,
}

impl NamedTuple {
    /// 由 `(名称, 值)` 序列创建命名元组
    ///
    /// # Arguments
    /// * `fields` - 按位置排列的字段
    ///
    /// # Returns
    /// 出现重复名称时返回 `InvalidValue`
    pub fn new<I, S>(fields: I) -> CodecResult<Self>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut map = IndexMap::new();
        for (name, value) in fields {
            let name = name.into();
            if map.contains_key(&name) {
                return Err(CodecError::InvalidValue(format!(
                    "Duplicate named tuple field '{}'",
                    name
                )));
            }
            map.insert(name, value);
        }
        Ok(Self { fields: map })
    }

    /// 由名称列表与位置值构造
    pub fn from_parts(names: &[String], values: Vec<Value>) -> CodecResult<Self> {
        if names.len() != values.len() {
            return Err(CodecError::InvalidValue(format!(
                "Named tuple has {} names but {} values",
                names.len(),
                values.len()
            )));
        }
        Self::new(names.iter().cloned().zip(values))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_index(&self, index: usize) -> Option<(&str, &Value)> {
        self.fields.get_index(index).map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 按位置取出所有值
    pub fn into_values(self) -> Vec<Value> {
        self.fields.into_values().collect()
    }
}

// 字段顺序属于元组身份的一部分
impl PartialEq for NamedTuple {
    fn eq(&self, other: &Self) -> bool {
        self.fields.iter().eq(other.fields.iter())
    }
}

impl Eq for NamedTuple {}

impl Hash for NamedTuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields.len().hash(state);
        for (name, value) in &self.fields {
            name.hash(state);
            value.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_tuple_lookup() {
        let tuple = NamedTuple::new([("id", Value::Int32(1)), ("name", Value::from("x"))]).unwrap();
        assert_eq!(tuple.len(), 2);
        assert_eq!(tuple.get("name"), Some(&Value::from("x")));
        assert_eq!(tuple.get_index(0), Some(("id", &Value::Int32(1))));
        assert_eq!(tuple.names().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn test_named_tuple_rejects_duplicates() {
        let result = NamedTuple::new([("a", Value::Null), ("a", Value::Null)]);
        assert!(matches!(result, Err(CodecError::InvalidValue(_))));
    }

    #[test]
    fn test_from_parts_arity() {
        let names = vec!["a".to_string()];
        assert!(NamedTuple::from_parts(&names, vec![]).is_err());
        let tuple = NamedTuple::from_parts(&names, vec![Value::Int8(1)]).unwrap();
        assert_eq!(tuple.into_values(), vec![Value::Int8(1)]);
    }
}
