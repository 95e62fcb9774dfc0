//! JSON 结构化值编解码
//!
//! 线上形式为路径数量(varint)加若干 `(路径, 值)` 对:
//! - 声明了类型提示的路径直接按提示类型读写
//! - 其他路径按 Dynamic 读写，值前带自描述类型头
//!
//! 写入记录对象时按 [`RecordSchema`](crate::record::RecordSchema) 扁平化为点分路径，
//! 提示匹配不区分大小写，写出时使用提示声明的大小写。

use crate::codec::{BinaryReader, BinaryWriter};
use crate::infer::dynamic_type;
use crate::record::{JsonRecord, SchemaRegistry};
use crate::settings::TypeSettings;
use crate::spec::{DEFAULT_MAX_DYNAMIC_PATHS, DEFAULT_MAX_DYNAMIC_TYPES};
use crate::types::{quote_identifier, ClickHouseType};
use crate::value::Value;
use crate::{CodecError, CodecResult};
use chwire_common::{JsonReadMode, JsonWriteMode};
use chwire_grammar::ast::quote;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::trace;

/// JSON 列类型参数
#[derive(Debug, Clone)]
pub struct JsonType {
    typed_paths: IndexMap<String, ClickHouseType>,
    /// 小写路径 → 声明路径
    lowercase: HashMap<String, String>,
    pub max_dynamic_paths: u64,
    pub max_dynamic_types: u8,
    skip_paths: Vec<String>,
    skip_regexps: Vec<String>,
    skip_patterns: Vec<Regex>,
    settings: TypeSettings,
}

impl JsonType {
    /// 创建 JSON 类型
    ///
    /// # Arguments
    /// * `typed_paths` - 路径类型提示，按声明顺序
    /// * `settings` - 读写模式与未提示路径的解析设置
    pub fn new(typed_paths: IndexMap<String, ClickHouseType>, settings: TypeSettings) -> Self {
        let mut lowercase = HashMap::with_capacity(typed_paths.len());
        for path in typed_paths.keys() {
            lowercase
                .entry(path.to_lowercase())
                .or_insert_with(|| path.clone());
        }
        Self {
            typed_paths,
            lowercase,
            max_dynamic_paths: DEFAULT_MAX_DYNAMIC_PATHS,
            max_dynamic_types: DEFAULT_MAX_DYNAMIC_TYPES,
            skip_paths: Vec::new(),
            skip_regexps: Vec::new(),
            skip_patterns: Vec::new(),
            settings,
        }
    }

    pub fn with_limits(mut self, max_dynamic_paths: u64, max_dynamic_types: u8) -> Self {
        self.max_dynamic_paths = max_dynamic_paths;
        self.max_dynamic_types = max_dynamic_types;
        self
    }

    /// 设置跳过的路径与路径正则
    ///
    /// # Returns
    /// 正则无法编译时返回 InvalidParameter
    pub fn with_skips(mut self, skip_paths: Vec<String>, skip_regexps: Vec<String>) -> CodecResult<Self> {
        self.skip_patterns = skip_regexps
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    CodecError::invalid_parameter("JSON", format!("invalid SKIP REGEXP '{}': {}", pattern, e))
                })
            })
            .collect::<CodecResult<_>>()?;
        self.skip_paths = skip_paths;
        self.skip_regexps = skip_regexps;
        Ok(self)
    }

    pub fn skip_paths(&self) -> &[String] {
        &self.skip_paths
    }

    pub fn skip_regexps(&self) -> &[String] {
        &self.skip_regexps
    }

    /// 路径是否被 SKIP 或 SKIP REGEXP 排除(SKIP 同时排除其子路径)
    pub fn is_skipped(&self, path: &str) -> bool {
        self.skip_paths.iter().any(|skip| {
            path == skip || (path.starts_with(skip.as_str()) && path[skip.len()..].starts_with('.'))
        }) || self.skip_patterns.iter().any(|pattern| pattern.is_match(path))
    }

    pub fn typed_paths(&self) -> &IndexMap<String, ClickHouseType> {
        &self.typed_paths
    }

    pub fn settings(&self) -> &TypeSettings {
        &self.settings
    }

    /// 查找路径的类型提示
    ///
    /// # Brief
    /// 先精确匹配，再不区分大小写匹配
    ///
    /// # Arguments
    /// * `path` - 点分路径
    ///
    /// # Returns
    /// 命中时返回 (声明的路径, 提示类型)
    pub fn hint(&self, path: &str) -> Option<(&str, &ClickHouseType)> {
        if let Some((declared, ty)) = self.typed_paths.get_key_value(path) {
            return Some((declared.as_str(), ty));
        }
        let declared = self.lowercase.get(&path.to_lowercase())?;
        self.typed_paths
            .get_key_value(declared.as_str())
            .map(|(declared, ty)| (declared.as_str(), ty))
    }

    pub fn name(&self) -> String {
        let mut args = Vec::new();
        if self.max_dynamic_paths != DEFAULT_MAX_DYNAMIC_PATHS {
            args.push(format!("max_dynamic_paths={}", self.max_dynamic_paths));
        }
        if self.max_dynamic_types != DEFAULT_MAX_DYNAMIC_TYPES {
            args.push(format!("max_dynamic_types={}", self.max_dynamic_types));
        }
        for (path, ty) in &self.typed_paths {
            args.push(format!("{} {}", quote_identifier(path), ty.name()));
        }
        for path in &self.skip_paths {
            args.push(format!("SKIP {}", quote_identifier(path)));
        }
        for regexp in &self.skip_regexps {
            args.push(format!("SKIP REGEXP {}", quote(regexp)));
        }
        if args.is_empty() {
            "JSON".to_string()
        } else {
            format!("JSON({})", args.join(", "))
        }
    }

    pub(crate) fn read(&self, reader: &mut BinaryReader<'_>) -> CodecResult<Value> {
        if self.settings.json_read_mode() == JsonReadMode::String {
            let text = reader.read_utf8()?;
            let json = serde_json::from_str(&text)
                .map_err(|e| CodecError::InvalidData(format!("Invalid JSON text: {}", e)))?;
            return Ok(Value::Json(json));
        }

        reader.enter()?;
        let count = reader.read_length()?;
        let dynamic = dynamic_type(&self.settings);
        let mut pairs = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            let path = reader.read_utf8()?;
            let value = match self.typed_paths.get(&path) {
                Some(ty) => ty.read(reader)?,
                None => dynamic.read(reader)?,
            };
            pairs.push((path, value));
        }
        reader.leave();
        Ok(Value::Json(build_json_tree(&pairs, self.settings.schemas())?))
    }

    pub(crate) fn write(&self, writer: &mut BinaryWriter<'_>, value: &Value) -> CodecResult<()> {
        match value {
            Value::String(text) => {
                writer.put_string(text);
                Ok(())
            }
            Value::Json(json) => {
                writer.put_string(&json.to_string());
                Ok(())
            }
            Value::Record(record) => {
                let pairs = flatten_record(record, self.settings.schemas())?;
                match self.settings.json_write_mode() {
                    JsonWriteMode::String => {
                        let tree = build_json_tree(&pairs, self.settings.schemas())?;
                        writer.put_string(&tree.to_string());
                        Ok(())
                    }
                    JsonWriteMode::Binary => self.write_pairs(writer, &pairs),
                }
            }
            other => Err(CodecError::mismatch("JSON", other)),
        }
    }

    fn write_pairs(&self, writer: &mut BinaryWriter<'_>, pairs: &[(String, Value)]) -> CodecResult<()> {
        let mut emitted = Vec::with_capacity(pairs.len());
        let mut seen = HashSet::with_capacity(pairs.len());
        for (path, value) in pairs {
            if self.is_skipped(path) {
                trace!(path = %path, "Skipping excluded JSON path");
                continue;
            }
            let hint = self.hint(path);
            if value.is_null() && !hint.is_some_and(|(_, ty)| ty.is_nullable()) {
                trace!(path = %path, "Omitting null on dynamic JSON path");
                continue;
            }
            let name = hint.map_or(path.as_str(), |(declared, _)| declared);
            if !seen.insert(name) {
                return Err(CodecError::DuplicatePath(name.to_string()));
            }
            emitted.push((name, hint.map(|(_, ty)| ty), value));
        }

        let dynamic = dynamic_type(&self.settings);
        writer.enter()?;
        writer.put_varint(emitted.len() as u64);
        for (name, hint, value) in emitted {
            writer.put_string(name);
            match hint {
                Some(ty) => ty.write(writer, value)?,
                None => dynamic.write(writer, value)?,
            }
        }
        writer.leave();
        Ok(())
    }
}

impl Default for JsonType {
    fn default() -> Self {
        Self::new(IndexMap::new(), TypeSettings::default())
    }
}

impl PartialEq for JsonType {
    fn eq(&self, other: &Self) -> bool {
        self.typed_paths == other.typed_paths
            && self.max_dynamic_paths == other.max_dynamic_paths
            && self.max_dynamic_types == other.max_dynamic_types
            && self.skip_paths == other.skip_paths
            && self.skip_regexps == other.skip_regexps
    }
}

/// 将记录对象扁平化为 `(路径, 值)` 对
///
/// # Brief
/// 按记录模式遍历字段：跳过忽略的字段，使用自定义路径，
/// 嵌套记录以父路径为前缀递归展开。当前路径上的记录按指针身份判定循环。
///
/// # Arguments
/// * `record` - 顶层记录
/// * `schemas` - 记录模式注册表
///
/// # Returns
/// 按字段声明顺序排列的路径与值；循环返回 CircularReference，
/// 重复路径返回 DuplicatePath
pub fn flatten_record(
    record: &Arc<dyn JsonRecord>,
    schemas: &SchemaRegistry,
) -> CodecResult<Vec<(String, Value)>> {
    let mut flattener = Flattener {
        schemas,
        visiting: Vec::new(),
        seen: HashSet::new(),
        pairs: Vec::new(),
    };
    flattener.visit(record, "")?;
    Ok(flattener.pairs)
}

struct Flattener<'a> {
    schemas: &'a SchemaRegistry,
    visiting: Vec<*const ()>,
    seen: HashSet<String>,
    pairs: Vec<(String, Value)>,
}

impl Flattener<'_> {
    fn visit(&mut self, record: &Arc<dyn JsonRecord>, prefix: &str) -> CodecResult<()> {
        let identity = Arc::as_ptr(record) as *const ();
        if self.visiting.contains(&identity) {
            let path = if prefix.is_empty() { "$" } else { prefix };
            return Err(CodecError::CircularReference {
                path: path.to_string(),
            });
        }
        self.visiting.push(identity);

        let schema = self.schemas.schema_for(record.as_ref());
        for field in schema.fields.iter().filter(|f| !f.ignore) {
            let path = if prefix.is_empty() {
                field.emitted_path().to_string()
            } else {
                format!("{}.{}", prefix, field.emitted_path())
            };
            match record.field(&field.name) {
                Some(Value::Record(nested)) => self.visit(&nested, &path)?,
                value => {
                    if !self.seen.insert(path.clone()) {
                        return Err(CodecError::DuplicatePath(path));
                    }
                    self.pairs.push((path, value.unwrap_or_default()));
                }
            }
        }

        self.visiting.pop();
        Ok(())
    }
}

/// 由点分路径构建 JSON 对象树
///
/// # Arguments
/// * `pairs` - `(路径, 值)` 对，中间对象按需创建
/// * `schemas` - 值中嵌套记录使用的模式注册表
///
/// # Returns
/// 路径前缀已是叶子值时返回 DuplicatePath
pub fn build_json_tree(
    pairs: &[(String, Value)],
    schemas: &SchemaRegistry,
) -> CodecResult<JsonValue> {
    let mut root = JsonMap::new();
    for (path, value) in pairs {
        insert_path(&mut root, path, value_to_json(value, schemas)?)?;
    }
    Ok(JsonValue::Object(root))
}

fn insert_path(root: &mut JsonMap<String, JsonValue>, path: &str, leaf: JsonValue) -> CodecResult<()> {
    let mut segments = path.split('.');
    let last = segments.next_back().unwrap_or(path);
    let mut node = root;
    for segment in segments {
        let child = node
            .entry(segment.to_string())
            .or_insert_with(|| JsonValue::Object(JsonMap::new()));
        node = match child {
            JsonValue::Object(map) => map,
            _ => return Err(CodecError::DuplicatePath(path.to_string())),
        };
    }
    if matches!(node.get(last), Some(JsonValue::Object(_))) {
        return Err(CodecError::DuplicatePath(path.to_string()));
    }
    node.insert(last.to_string(), leaf);
    Ok(())
}

/// 将值转换为通用 JSON 表示
///
/// 128 位及以上整数、UUID、IP、十进制与日期时间没有对应的 JSON 原语，渲染为字符串。
pub fn value_to_json(value: &Value, schemas: &SchemaRegistry) -> CodecResult<JsonValue> {
    let to_json = |item: &Value| value_to_json(item, schemas);
    Ok(match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int8(n) => JsonValue::from(*n),
        Value::Int16(n) => JsonValue::from(*n),
        Value::Int32(n) => JsonValue::from(*n),
        Value::Int64(n) => JsonValue::from(*n),
        Value::UInt8(n) => JsonValue::from(*n),
        Value::UInt16(n) => JsonValue::from(*n),
        Value::UInt32(n) => JsonValue::from(*n),
        Value::UInt64(n) => JsonValue::from(*n),
        Value::Int128(n) => JsonValue::String(n.to_string()),
        Value::UInt128(n) => JsonValue::String(n.to_string()),
        Value::Int256(n) => JsonValue::String(n.to_string()),
        Value::UInt256(n) => JsonValue::String(n.to_string()),
        Value::Float32(n) => float_to_json(*n as f64),
        Value::Float64(n) => float_to_json(*n),
        Value::Decimal(d) => JsonValue::String(d.to_string()),
        Value::NativeDecimal(d) => JsonValue::String(d.to_string()),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Bytes(b) => JsonValue::String(String::from_utf8_lossy(b).into_owned()),
        Value::Uuid(u) => JsonValue::String(u.to_string()),
        Value::Ipv4(ip) => JsonValue::String(ip.to_string()),
        Value::Ipv6(ip) => JsonValue::String(ip.to_string()),
        Value::Date(d) => JsonValue::String(d.to_string()),
        Value::DateTime(dt) => JsonValue::String(dt.to_string()),
        Value::Time(t) => JsonValue::from(t.num_seconds()),
        Value::Array(items) | Value::Tuple(items) => {
            JsonValue::Array(items.iter().map(to_json).collect::<CodecResult<_>>()?)
        }
        Value::NamedTuple(tuple) => {
            let mut map = JsonMap::with_capacity(tuple.len());
            for (name, item) in tuple.iter() {
                map.insert(name.to_string(), to_json(item)?);
            }
            JsonValue::Object(map)
        }
        Value::Map(entries) => {
            let mut map = JsonMap::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(json_key(key), to_json(item)?);
            }
            JsonValue::Object(map)
        }
        Value::Pairs(entries) => {
            let mut map = JsonMap::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(json_key(key), to_json(item)?);
            }
            JsonValue::Object(map)
        }
        Value::Geometry(_, inner) => to_json(inner)?,
        Value::Json(json) => json.clone(),
        Value::Record(record) => build_json_tree(&flatten_record(record, schemas)?, schemas)?,
    })
}

fn float_to_json(n: f64) -> JsonValue {
    Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
}

fn json_key(key: &Value) -> String {
    key.as_str().map_or_else(|| key.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_value, encode_value};
    use crate::record::RecordSchema;
    use chwire_common::CodecConfig;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Debug)]
    struct User {
        id: i32,
        name: &'static str,
    }

    impl JsonRecord for User {
        fn describe(&self) -> RecordSchema {
            RecordSchema::new().field("Id").field("Name")
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "Id" => Some(Value::Int32(self.id)),
                "Name" => Some(Value::from(self.name)),
                _ => None,
            }
        }
    }

    #[derive(Debug)]
    struct Outer {
        inner: Arc<dyn JsonRecord>,
    }

    impl JsonRecord for Outer {
        fn describe(&self) -> RecordSchema {
            RecordSchema::new().field("Outer")
        }

        fn field(&self, name: &str) -> Option<Value> {
            (name == "Outer").then(|| Value::Record(self.inner.clone()))
        }
    }

    #[derive(Debug)]
    struct Inner;

    impl JsonRecord for Inner {
        fn describe(&self) -> RecordSchema {
            RecordSchema::new().field("Inner").ignore("Secret")
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "Inner" => Some(Value::Int32(42)),
                "Secret" => Some(Value::from("hidden")),
                _ => None,
            }
        }
    }

    #[derive(Debug)]
    struct Node {
        next: Mutex<Option<Arc<dyn JsonRecord>>>,
    }

    impl JsonRecord for Node {
        fn describe(&self) -> RecordSchema {
            RecordSchema::new().field("Label").field("Next")
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "Label" => Some(Value::from("n")),
                "Next" => Some(self.next.lock().clone().map_or(Value::Null, Value::Record)),
                _ => None,
            }
        }
    }

    #[derive(Debug)]
    struct Sparse;

    impl JsonRecord for Sparse {
        fn describe(&self) -> RecordSchema {
            RecordSchema::new().field("A").field("B").field("C")
        }

        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "A" => Some(Value::Null),
                "B" => Some(Value::Null),
                _ => None,
            }
        }
    }

    #[derive(Debug)]
    struct Clash;

    impl JsonRecord for Clash {
        fn describe(&self) -> RecordSchema {
            RecordSchema::new()
                .field_with_path("First", "x")
                .field_with_path("Second", "x")
        }

        fn field(&self, _name: &str) -> Option<Value> {
            Some(Value::Int8(1))
        }
    }

    fn json_type(hints: &[(&str, ClickHouseType)]) -> ClickHouseType {
        let typed_paths = hints
            .iter()
            .map(|(path, ty)| (path.to_string(), ty.clone()))
            .collect();
        ClickHouseType::Json(Box::new(JsonType::new(typed_paths, TypeSettings::default())))
    }

    #[test]
    fn test_hinted_and_inferred_paths() {
        let ty = json_type(&[("Id", ClickHouseType::Int64)]);
        let user: Arc<dyn JsonRecord> = Arc::new(User { id: 123, name: "x" });
        let bytes = encode_value(&ty, &Value::Record(user)).unwrap();

        let mut expected = vec![2, 2, b'I', b'd'];
        expected.extend_from_slice(&123i64.to_le_bytes());
        expected.extend_from_slice(&[4, b'N', b'a', b'm', b'e', 0x15, 1, b'x']);
        assert_eq!(bytes, expected);

        assert_eq!(
            decode_value(&ty, &bytes).unwrap(),
            Value::Json(json!({"Id": 123, "Name": "x"}))
        );
    }

    #[test]
    fn test_hint_casing_is_emitted() {
        let ty = json_type(&[("ID", ClickHouseType::Int64)]);
        let user: Arc<dyn JsonRecord> = Arc::new(User { id: 1, name: "y" });
        let bytes = encode_value(&ty, &Value::Record(user)).unwrap();
        assert_eq!(&bytes[..4], &[2, 2, b'I', b'D']);
    }

    #[test]
    fn test_nested_record_with_dotted_hint() {
        let ty = json_type(&[("outer.inner", ClickHouseType::Int32)]);
        let record: Arc<dyn JsonRecord> = Arc::new(Outer { inner: Arc::new(Inner) });
        let bytes = encode_value(&ty, &Value::Record(record)).unwrap();

        let mut expected = vec![1, 11];
        expected.extend_from_slice(b"outer.inner");
        expected.extend_from_slice(&42i32.to_le_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let node = Arc::new(Node { next: Mutex::new(None) });
        let record: Arc<dyn JsonRecord> = node.clone();
        *node.next.lock() = Some(record.clone());

        let err = flatten_record(&record, &SchemaRegistry::new()).unwrap_err();
        assert!(matches!(err, CodecError::CircularReference { ref path } if path == "Next"));

        let ty = json_type(&[]);
        assert!(matches!(
            encode_value(&ty, &Value::Record(record)),
            Err(CodecError::CircularReference { .. })
        ));
        // 断开循环以释放引用
        *node.next.lock() = None;
    }

    #[test]
    fn test_shared_record_is_not_a_cycle() {
        let shared: Arc<dyn JsonRecord> = Arc::new(Inner);
        let first: Arc<dyn JsonRecord> = Arc::new(Outer { inner: shared.clone() });
        let pairs = flatten_record(&first, &SchemaRegistry::new()).unwrap();
        assert_eq!(pairs, vec![("Outer.Inner".to_string(), Value::Int32(42))]);
    }

    #[test]
    fn test_nulls_omitted_unless_hinted_nullable() {
        let ty = json_type(&[("b", ClickHouseType::Nullable(Box::new(ClickHouseType::Int32)))]);
        let bytes = encode_value(&ty, &Value::Record(Arc::new(Sparse))).unwrap();
        // 只写出 B(可空提示)，NULL 标志为 1
        assert_eq!(bytes, vec![1, 1, b'b', 1]);
    }

    #[test]
    fn test_duplicate_path() {
        let record: Arc<dyn JsonRecord> = Arc::new(Clash);
        assert!(matches!(
            flatten_record(&record, &SchemaRegistry::new()),
            Err(CodecError::DuplicatePath(ref p)) if p == "x"
        ));
    }

    #[test]
    fn test_build_tree_from_dotted_paths() {
        let pairs = vec![
            ("a.b".to_string(), Value::Int64(1)),
            ("a.c".to_string(), Value::from("x")),
            ("d".to_string(), Value::UInt128(u128::MAX)),
            ("e".to_string(), Value::Array(vec![Value::Bool(true), Value::Null])),
        ];
        let tree = build_json_tree(&pairs, &SchemaRegistry::new()).unwrap();
        assert_eq!(
            tree,
            json!({
                "a": {"b": 1, "c": "x"},
                "d": u128::MAX.to_string(),
                "e": [true, null],
            })
        );

        let conflicting = vec![
            ("a".to_string(), Value::Int8(1)),
            ("a.b".to_string(), Value::Int8(2)),
        ];
        assert!(matches!(
            build_json_tree(&conflicting, &SchemaRegistry::new()),
            Err(CodecError::DuplicatePath(_))
        ));
    }

    #[test]
    fn test_nested_records_use_given_registry() {
        let schemas = SchemaRegistry::new();
        schemas.register::<User>(RecordSchema::new().field_with_path("Id", "user_id"));
        let user: Arc<dyn JsonRecord> = Arc::new(User { id: 9, name: "bob" });
        let value = Value::Array(vec![Value::Record(user.clone())]);
        assert_eq!(
            value_to_json(&value, &schemas).unwrap(),
            json!([{"user_id": 9}])
        );
        assert_eq!(
            value_to_json(&value, &SchemaRegistry::new()).unwrap(),
            json!([{"Id": 9, "Name": "bob"}])
        );

        let settings = TypeSettings::from_config(&CodecConfig {
            json_write_mode: JsonWriteMode::String,
            ..Default::default()
        })
        .unwrap()
        .with_schema_registry(Arc::new(schemas));
        let ty = ClickHouseType::Json(Box::new(JsonType::new(IndexMap::new(), settings)));
        let bytes = encode_value(&ty, &Value::Record(user)).unwrap();
        assert_eq!(&bytes[1..], br#"{"user_id":9}"#);
    }

    #[test]
    fn test_text_passthrough() {
        let ty = json_type(&[]);
        let bytes = encode_value(&ty, &Value::from("{\"a\":1}")).unwrap();
        assert_eq!(bytes[0], 7);
        assert_eq!(&bytes[1..], b"{\"a\":1}");

        let bytes = encode_value(&ty, &Value::Json(json!({"k": [1, 2]}))).unwrap();
        assert_eq!(&bytes[1..], b"{\"k\":[1,2]}");

        assert!(matches!(encode_value(&ty, &Value::Int32(1)), Err(CodecError::TypeMismatch { .. })));
    }

    #[test]
    fn test_string_modes() {
        let config = CodecConfig {
            json_read_mode: JsonReadMode::String,
            json_write_mode: JsonWriteMode::String,
            ..Default::default()
        };
        let settings = TypeSettings::from_config(&config).unwrap();
        let ty = ClickHouseType::Json(Box::new(JsonType::new(IndexMap::new(), settings)));

        let record: Arc<dyn JsonRecord> = Arc::new(Outer { inner: Arc::new(Inner) });
        let bytes = encode_value(&ty, &Value::Record(record)).unwrap();
        assert_eq!(&bytes[1..], br#"{"Outer":{"Inner":42}}"#);
        assert_eq!(
            decode_value(&ty, &bytes).unwrap(),
            Value::Json(json!({"Outer": {"Inner": 42}}))
        );
    }

    #[test]
    fn test_json_names() {
        assert_eq!(JsonType::default().name(), "JSON");
        let mut typed_paths = IndexMap::new();
        typed_paths.insert("a.b".to_string(), ClickHouseType::UInt32);
        let json = JsonType::new(typed_paths, TypeSettings::default())
            .with_limits(10, DEFAULT_MAX_DYNAMIC_TYPES)
            .with_skips(vec!["c".to_string()], vec!["^x.*".to_string()])
            .unwrap();
        assert_eq!(
            json.name(),
            "JSON(max_dynamic_paths=10, a.b UInt32, SKIP c, SKIP REGEXP '^x.*')"
        );
        assert_eq!(json.hint("A.B").map(|(p, _)| p), Some("a.b"));
        assert!(json.hint("a").is_none());

        assert!(json.is_skipped("c"));
        assert!(json.is_skipped("c.d"));
        assert!(!json.is_skipped("cd"));
        assert!(json.is_skipped("xyz"));
        assert!(!json.is_skipped("a.b"));

        let invalid = JsonType::default().with_skips(Vec::new(), vec!["(".to_string()]);
        assert!(matches!(invalid, Err(CodecError::InvalidParameter { .. })));
    }

    #[test]
    fn test_skipped_paths_not_written() {
        let json = JsonType::default()
            .with_skips(vec!["Name".to_string()], Vec::new())
            .unwrap();
        let ty = ClickHouseType::Json(Box::new(json));
        let user: Arc<dyn JsonRecord> = Arc::new(User { id: 5, name: "z" });
        let bytes = encode_value(&ty, &Value::Record(user)).unwrap();
        // 只剩 Id，按 Dynamic 写出 Int32
        assert_eq!(bytes, vec![1, 2, b'I', b'd', 0x09, 5, 0, 0, 0]);
    }
}
