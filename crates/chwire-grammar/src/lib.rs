//! chwire 类型描述语法模块
//!
//! 将类型描述字符串(如 `Map(String, Array(Nullable(Int32)))`)解析为语法树:
//! - 词法分析: 括号、逗号、单引号字面量、其余文本片段
//! - 语法分析: 递归下降，按顶层逗号与括号拆分参数
//! - 语法树: 名称 + 有序子节点，平铺参数保留为叶子节点
//!
//! 该模块只负责语法，不识别类型名称；类型名称的解析由 `chwire-types` 的注册表完成。

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::SyntaxTreeNode;
pub use parser::{parse, Parser};

use thiserror::Error;

/// 语法错误类型
///
/// 描述类型描述字符串无法构成合法语法树的各种情况。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// 输入为空
    #[error("Empty type descriptor")]
    EmptyInput,

    /// 一般语法错误(带位置信息)
    #[error("Syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    /// 单引号字面量未闭合
    #[error("Unterminated string literal starting at position {position}")]
    UnterminatedLiteral { position: usize },

    /// 括号不匹配
    #[error("Unbalanced parentheses at position {position}")]
    UnbalancedParentheses { position: usize },
}

/// 语法解析结果类型
pub type GrammarResult<T> = Result<T, GrammarError>;
