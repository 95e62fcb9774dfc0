//! # chwire-types - 列式数据库线上格式的类型系统与二进制编解码
//!
//! 本 crate 负责客户端侧的数据表示:
//!
//! - **类型注册表**：将类型描述语法树解析为具体类型对象 [`ClickHouseType`]
//! - **类型编解码**：约四十种标量、复合与自描述类型的二进制读写
//! - **任意精度十进制**：[`ClickHouseDecimal`]，尾数 + 标度
//! - **时区感知时间转换**：墙上时间、时刻与列时区之间的映射
//! - **自描述类型头**：Dynamic / Variant / JSON 中内联的二进制类型标记
//! - **JSON 结构化值**：路径扁平化、类型提示与类型推断
//!
//! ## 快速开始
//!
//! ```rust,ignore
//! use chwire_types::{parse_type_descriptor, encode_value, decode_value, TypeSettings, Value};
//!
//! let settings = TypeSettings::default();
//! let ty = parse_type_descriptor("Array(Nullable(Int32))", &settings)?;
//!
//! let value = Value::Array(vec![Value::Int32(1), Value::Null, Value::Int32(3)]);
//! let bytes = encode_value(&ty, &value)?;
//! assert_eq!(decode_value(&ty, &bytes)?, value);
//! ```
//!
//! 类型对象创建后不可变，可在线程间共享；编解码过程不做任何 I/O。

pub mod codec;
pub mod decimal;
pub mod header;
pub mod infer;
pub mod json;
pub mod named_tuple;
pub mod record;
pub mod registry;
pub mod settings;
pub mod spec;
pub mod temporal;
pub mod types;
pub mod value;

pub use codec::{decode_value, encode_value, BinaryReader, BinaryWriter};
pub use decimal::ClickHouseDecimal;
pub use header::{read_header, write_header};
pub use infer::TypeInferenceCache;
pub use named_tuple::NamedTuple;
pub use record::{FieldSchema, JsonRecord, RecordSchema, SchemaRegistry};
pub use registry::{parse_type_descriptor, resolve};
pub use settings::TypeSettings;
pub use temporal::DateTimeValue;
pub use types::ClickHouseType;
pub use value::Value;

use chwire_common::CommonError;
use chwire_grammar::GrammarError;
use thiserror::Error;

/// 编解码错误类型
///
/// 区分语法错误、类型解析错误、值形状不匹配、数值溢出等情况，
/// 调用方可以按错误种类进行匹配。
#[derive(Error, Debug)]
pub enum CodecError {
    /// 类型描述语法错误
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] CommonError),

    /// 未知或不支持的类型名称
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// 类型参数无效
    #[error("Invalid parameter in {type_name}: {message}")]
    InvalidParameter { type_name: String, message: String },

    /// 值的形状与声明类型不匹配
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// 数值溢出(不会静默截断或回绕)
    #[error("Overflow: {0}")]
    Overflow(String),

    /// 值在类型的取值范围内无效(如未知枚举标签)
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// JSON 扁平化时检测到循环引用
    #[error("Circular reference detected at path '{path}'")]
    CircularReference { path: String },

    /// 扁平化后出现重复路径
    #[error("Duplicate JSON path: {0}")]
    DuplicatePath(String),

    /// 类型没有可写出的自描述类型头
    #[error("Type {0} has no binary type header")]
    UnwritableHeader(String),

    /// 当前操作不支持该类型
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// 意外的输入结束
    #[error("Unexpected end of input")]
    UnexpectedEof,

    /// 线上数据无效
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 嵌套层级过深
    #[error("Nesting too deep: max {0}")]
    NestingTooDeep(usize),

    /// 十进制除零
    #[error("Division by zero")]
    DivisionByZero,
}

impl CodecError {
    pub(crate) fn mismatch(expected: impl Into<String>, actual: &Value) -> Self {
        CodecError::TypeMismatch {
            expected: expected.into(),
            actual: actual.kind_name().to_string(),
        }
    }

    pub(crate) fn invalid_parameter(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::InvalidParameter {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// 编解码 Result 类型别名
pub type CodecResult<T> = Result<T, CodecError>;
