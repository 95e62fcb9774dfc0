//! chwire 公共模块
//!
//! 提供编解码器各 crate 共享的内容:
//! - 错误类型 `CommonError`
//! - 编解码配置 `CodecConfig` 及各读写模式枚举
//! - 日志初始化辅助函数

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CodecConfig, DecimalMode, JsonReadMode, JsonWriteMode, MapMode, StringMode};
pub use error::{CommonError, CommonResult};
