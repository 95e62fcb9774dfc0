//! 记录模式模块
//!
//! JSON 列写入记录对象时，按显式注册的模式将字段扁平化为路径:
//! - [`JsonRecord`]: 记录对象需实现的 trait(对象安全)
//! - [`RecordSchema`] / [`FieldSchema`]: 字段名、自定义路径、忽略标记
//! - [`SchemaRegistry`]: 按宿主类型缓存模式，线程安全

use crate::value::Value;
use dashmap::DashMap;
use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// 可写入 JSON 列的记录对象
///
/// # Example
/// ```rust,ignore
/// #[derive(Debug)]
/// struct User { id: i64, name: String }
///
/// impl JsonRecord for User {
///     fn describe(&self) -> RecordSchema {
///         RecordSchema::new().field("Id").field("Name")
///     }
///
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "Id" => Some(Value::Int64(self.id)),
///             "Name" => Some(Value::from(self.name.as_str())),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait JsonRecord: fmt::Debug + Send + Sync + 'static {
    /// 描述记录的字段模式
    fn describe(&self) -> RecordSchema;

    /// 读取字段值；字段不存在时返回 None
    fn field(&self, name: &str) -> Option<Value>;

    /// 宿主类型标识，作为模式缓存的键
    fn record_type_id(&self) -> TypeId {
        TypeId::of::<Self>()
    }

    fn record_type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// 字段模式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// 字段名
    pub name: String,
    /// 自定义路径(可含 `.` 表示嵌套)，None 时使用字段名
    pub path: Option<String>,
    /// 是否忽略该字段
    pub ignore: bool,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            ignore: false,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// 写出时使用的路径
    pub fn emitted_path(&self) -> &str {
        self.path.as_deref().unwrap_or(&self.name)
    }
}

/// 记录模式
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSchema {
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加使用字段名作为路径的字段
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldSchema::new(name));
        self
    }

    /// 添加带自定义路径的字段
    pub fn field_with_path(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.fields.push(FieldSchema::new(name).with_path(path));
        self
    }

    /// 添加被忽略的字段
    pub fn ignore(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldSchema::new(name).ignored());
        self
    }

    pub fn with_field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// 记录模式注册表
///
/// 按宿主类型缓存模式。未注册的类型在首次使用时调用 `describe()` 计算；
/// 并发未命中时可能重复计算，结果相同。
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: DashMap<TypeId, Arc<RecordSchema>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级共享注册表
    pub fn global() -> Arc<SchemaRegistry> {
        static GLOBAL: OnceLock<Arc<SchemaRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(SchemaRegistry::new())).clone()
    }

    /// 显式注册类型 `T` 的模式，覆盖已有条目
    pub fn register<T: JsonRecord>(&self, schema: RecordSchema) {
        self.schemas.insert(TypeId::of::<T>(), Arc::new(schema));
    }

    /// 获取记录对象的模式
    ///
    /// # Brief
    /// 命中缓存直接返回；未命中时调用 `describe()` 并写入缓存
    pub fn schema_for(&self, record: &dyn JsonRecord) -> Arc<RecordSchema> {
        let type_id = record.record_type_id();
        if let Some(schema) = self.schemas.get(&type_id) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return schema.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(record_type = record.record_type_name(), "Record schema cache miss");
        let schema = Arc::new(record.describe());
        self.schemas
            .entry(type_id)
            .or_insert_with(|| schema.clone())
            .clone()
    }

    pub fn contains<T: JsonRecord>(&self) -> bool {
        self.schemas.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// 返回 (命中次数, 未命中次数)
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schemas", &self.schemas.len())
            .finish()
    }
}
