//! 类型解析设置

use crate::codec::{BinaryReader, BinaryWriter};
use crate::record::SchemaRegistry;
use crate::CodecResult;
use bytes::BytesMut;
use chrono_tz::Tz;
use chwire_common::{CodecConfig, DecimalMode, JsonReadMode, JsonWriteMode, MapMode, StringMode};
use std::sync::Arc;

#[derive(Debug)]
struct SettingsInner {
    decimal_mode: DecimalMode,
    default_timezone: Option<Tz>,
    map_mode: MapMode,
    string_mode: StringMode,
    json_read_mode: JsonReadMode,
    json_write_mode: JsonWriteMode,
    max_nesting_depth: usize,
    schemas: Arc<SchemaRegistry>,
}

/// 类型解析设置
///
/// 不可变，克隆只增加引用计数。由 [`CodecConfig`] 构造或使用默认值。
#[derive(Debug, Clone)]
pub struct TypeSettings {
    inner: Arc<SettingsInner>,
}

impl TypeSettings {
    /// 由编解码配置构造设置
    ///
    /// # Arguments
    /// * `config` - 已加载的配置
    ///
    /// # Returns
    /// 默认时区无效时返回错误
    pub fn from_config(config: &CodecConfig) -> CodecResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(SettingsInner {
                decimal_mode: config.decimal_mode,
                default_timezone: config.timezone()?,
                map_mode: config.map_mode,
                string_mode: config.string_mode,
                json_read_mode: config.json_read_mode,
                json_write_mode: config.json_write_mode,
                max_nesting_depth: config.max_nesting_depth,
                schemas: SchemaRegistry::global(),
            }),
        })
    }

    /// 使用独立的记录模式注册表
    pub fn with_schema_registry(&self, schemas: Arc<SchemaRegistry>) -> Self {
        let inner = &self.inner;
        Self {
            inner: Arc::new(SettingsInner {
                decimal_mode: inner.decimal_mode,
                default_timezone: inner.default_timezone,
                map_mode: inner.map_mode,
                string_mode: inner.string_mode,
                json_read_mode: inner.json_read_mode,
                json_write_mode: inner.json_write_mode,
                max_nesting_depth: inner.max_nesting_depth,
                schemas,
            }),
        }
    }

    pub fn decimal_mode(&self) -> DecimalMode {
        self.inner.decimal_mode
    }

    pub fn default_timezone(&self) -> Option<Tz> {
        self.inner.default_timezone
    }

    pub fn map_mode(&self) -> MapMode {
        self.inner.map_mode
    }

    pub fn string_mode(&self) -> StringMode {
        self.inner.string_mode
    }

    pub fn json_read_mode(&self) -> JsonReadMode {
        self.inner.json_read_mode
    }

    pub fn json_write_mode(&self) -> JsonWriteMode {
        self.inner.json_write_mode
    }

    pub fn max_nesting_depth(&self) -> usize {
        self.inner.max_nesting_depth
    }

    pub fn schemas(&self) -> &Arc<SchemaRegistry> {
        &self.inner.schemas
    }

    /// 创建受最大嵌套层数约束的读取器
    pub fn reader<'a>(&self, data: &'a [u8]) -> BinaryReader<'a> {
        BinaryReader::with_max_depth(data, self.inner.max_nesting_depth)
    }

    /// 创建受最大嵌套层数约束的写入器
    pub fn writer<'a>(&self, buf: &'a mut BytesMut) -> BinaryWriter<'a> {
        BinaryWriter::with_max_depth(buf, self.inner.max_nesting_depth)
    }
}

impl Default for TypeSettings {
    fn default() -> Self {
        let config = CodecConfig::default();
        Self {
            inner: Arc::new(SettingsInner {
                decimal_mode: config.decimal_mode,
                default_timezone: None,
                map_mode: config.map_mode,
                string_mode: config.string_mode,
                json_read_mode: config.json_read_mode,
                json_write_mode: config.json_write_mode,
                max_nesting_depth: config.max_nesting_depth,
                schemas: SchemaRegistry::global(),
            }),
        }
    }
}
