//! 编解码配置模块
//!
//! 本模块定义了类型解析与二进制编解码的所有可配置项:
//! - Decimal 解析为任意精度类型还是定宽近似类型
//! - 默认时区(应用于未声明时区的 DateTime 列)
//! - Map 读取为关联容器还是有序键值对列表
//! - String 读取为文本还是原始字节
//! - JSON 列的读写模式(节点树 / 字符串)
//!
//! 支持从 TOML 文件加载配置。

use crate::{CommonError, CommonResult};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Decimal 列的读取表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalMode {
    /// 任意精度(尾数 + 标度)
    #[default]
    BigDecimal,
    /// 96 位定宽十进制近似
    Native,
}

/// Map 列的读取表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapMode {
    /// 关联容器(键唯一)
    #[default]
    Dictionary,
    /// 按线上顺序排列的键值对列表
    Pairs,
}

/// String 列的读取表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringMode {
    /// UTF-8 文本
    #[default]
    Text,
    /// 原始字节，不做文本解码
    Bytes,
}

/// JSON 列的读取模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonReadMode {
    /// 按路径展开为节点树
    #[default]
    Tree,
    /// 服务端以 JSON 文本返回
    String,
}

/// JSON 列的写入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonWriteMode {
    /// 路径 + 值的二进制形式
    #[default]
    Binary,
    /// JSON 文本，由服务端解析
    String,
}

/// 编解码主配置
///
/// 所有字段都有默认值，空配置文件即可得到默认行为。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Decimal 读取模式 (默认: big_decimal)
    #[serde(default)]
    pub decimal_mode: DecimalMode,

    /// 默认时区 IANA 标识 (默认: 无)
    #[serde(default)]
    pub default_timezone: Option<String>,

    /// Map 读取模式 (默认: dictionary)
    #[serde(default)]
    pub map_mode: MapMode,

    /// String 读取模式 (默认: text)
    #[serde(default)]
    pub string_mode: StringMode,

    /// JSON 读取模式 (默认: tree)
    #[serde(default)]
    pub json_read_mode: JsonReadMode,

    /// JSON 写入模式 (默认: binary)
    #[serde(default)]
    pub json_write_mode: JsonWriteMode,

    /// 编解码最大嵌套层数 (默认: 100)
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

fn default_max_nesting_depth() -> usize { 100 }

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            decimal_mode: DecimalMode::default(),
            default_timezone: None,
            map_mode: MapMode::default(),
            string_mode: StringMode::default(),
            json_read_mode: JsonReadMode::default(),
            json_write_mode: JsonWriteMode::default(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

impl CodecConfig {
    /// 从 TOML 文本加载配置
    ///
    /// # Brief
    /// 解析 TOML 文本并校验配置项
    ///
    /// # Arguments
    /// * `text` - TOML 文本
    ///
    /// # Returns
    /// 成功返回配置，解析或校验失败返回错误
    pub fn from_toml_str(text: &str) -> CommonResult<Self> {
        let config: CodecConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载配置
    ///
    /// # Arguments
    /// * `path` - 配置文件路径
    pub fn from_file(path: impl AsRef<Path>) -> CommonResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// 校验配置
    ///
    /// # Brief
    /// 检查默认时区可识别、嵌套层数非零
    pub fn validate(&self) -> CommonResult<()> {
        self.timezone()?;
        if self.max_nesting_depth == 0 {
            return Err(CommonError::Config(
                "max_nesting_depth must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 解析默认时区
    ///
    /// # Returns
    /// 未配置返回 `Ok(None)`，标识无效返回 InvalidTimezone
    pub fn timezone(&self) -> CommonResult<Option<Tz>> {
        match &self.default_timezone {
            None => Ok(None),
            Some(name) => parse_timezone(name).map(Some),
        }
    }
}

/// 解析 IANA 时区标识
///
/// # Arguments
/// * `name` - 时区名，例如 `Europe/Amsterdam`
pub fn parse_timezone(name: &str) -> CommonResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| CommonError::InvalidTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = CodecConfig::from_toml_str("").unwrap();
        assert_eq!(config, CodecConfig::default());
        assert_eq!(config.max_nesting_depth, 100);
    }

    #[test]
    fn test_config_modes() {
        let config = CodecConfig::from_toml_str(
            r#"
            decimal_mode = "native"
            map_mode = "pairs"
            string_mode = "bytes"
            json_read_mode = "string"
            json_write_mode = "string"
            default_timezone = "Europe/Amsterdam"
            "#,
        )
        .unwrap();
        assert_eq!(config.decimal_mode, DecimalMode::Native);
        assert_eq!(config.map_mode, MapMode::Pairs);
        assert_eq!(config.string_mode, StringMode::Bytes);
        assert_eq!(config.json_read_mode, JsonReadMode::String);
        assert_eq!(config.json_write_mode, JsonWriteMode::String);
        assert_eq!(config.timezone().unwrap(), Some(chrono_tz::Europe::Amsterdam));
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let err = CodecConfig::from_toml_str(r#"default_timezone = "Mars/Olympus""#).unwrap_err();
        assert!(matches!(err, CommonError::InvalidTimezone(name) if name == "Mars/Olympus"));
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = CodecConfig::from_toml_str("max_nesting_depth = 0").unwrap_err();
        assert!(matches!(err, CommonError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "map_mode = \"pairs\"").unwrap();
        let config = CodecConfig::from_file(file.path()).unwrap();
        assert_eq!(config.map_mode, MapMode::Pairs);
    }
}
