//! 语法树定义

use std::fmt;

/// 语法树节点
///
/// `value` 为类型名称或参数字面量原文；`children` 为括号内按逗号拆分的参数。
/// 不含嵌套括号的参数保留为叶子节点(原文，含引号)。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SyntaxTreeNode {
    pub value: String,
    pub children: Vec<SyntaxTreeNode>,
}

impl SyntaxTreeNode {
    pub fn new(value: impl Into<String>, children: Vec<SyntaxTreeNode>) -> Self {
        Self {
            value: value.into(),
            children,
        }
    }

    pub fn leaf(value: impl Into<String>) -> Self {
        Self::new(value, Vec::new())
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// 判断节点原文是否为单引号字面量
    pub fn is_quoted(&self) -> bool {
        self.value.len() >= 2 && self.value.starts_with('\'') && self.value.ends_with('\'')
    }

    /// 去掉单引号并还原转义
    ///
    /// # Brief
    /// 支持 `\'`、`\\` 与 SQL 风格的 `''`；非字面量原样返回
    pub fn unquote(&self) -> String {
        unquote(&self.value)
    }
}

/// 去掉单引号字面量的引号并还原转义
///
/// # Arguments
/// * `text` - 字面量原文，如 `'Europe/Amsterdam'`
///
/// # Returns
/// 还原后的字符串；不是字面量时返回去除首尾空白的原文
pub fn unquote(text: &str) -> String {
    let text = text.trim();
    if text.len() < 2 || !text.starts_with('\'') || !text.ends_with('\'') {
        return text.to_string();
    }
    let inner = &text[1..text.len() - 1];
    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('0') => result.push('\0'),
                Some(other) => result.push(other),
                None => result.push('\\'),
            },
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                result.push('\'');
            }
            c => result.push(c),
        }
    }
    result
}

/// 将字符串渲染为单引号字面量
pub fn quote(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + 2);
    result.push('\'');
    for c in text.chars() {
        match c {
            '\'' => result.push_str("\\'"),
            '\\' => result.push_str("\\\\"),
            c => result.push(c),
        }
    }
    result.push('\'');
    result
}

impl fmt::Display for SyntaxTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote("'Europe/Amsterdam'"), "Europe/Amsterdam");
        assert_eq!(unquote(r"'it\'s'"), "it's");
        assert_eq!(unquote("'it''s'"), "it's");
        assert_eq!(unquote("18"), "18");
    }

    #[test]
    fn test_quote_roundtrip() {
        for s in ["plain", "it's", r"back\slash", ""] {
            assert_eq!(unquote(&quote(s)), s);
        }
    }

    #[test]
    fn test_display() {
        let node = SyntaxTreeNode::new(
            "Map",
            vec![
                SyntaxTreeNode::leaf("String"),
                SyntaxTreeNode::new("Array", vec![SyntaxTreeNode::leaf("Int32")]),
            ],
        );
        assert_eq!(node.to_string(), "Map(String, Array(Int32))");
    }
}
