//! 错误类型定义模块
//!
//! 定义配置加载与校验阶段的错误类型 CommonError 和 Result 别名。

use thiserror::Error;

/// 公共错误类型
#[derive(Error, Debug)]
pub enum CommonError {
    /// I/O 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置内容无效
    #[error("Config error: {0}")]
    Config(String),

    /// TOML 解析错误
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// 时区标识无法识别
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// 公共 Result 类型别名
pub type CommonResult<T> = Result<T, CommonError>;
