//! 类型描述语法解析器模块
//!
//! 使用递归下降算法将词法单元序列解析为 [`SyntaxTreeNode`]。

use crate::ast::SyntaxTreeNode;
use crate::lexer::{Lexer, Token};
use crate::{GrammarError, GrammarResult};
use std::ops::Range;
use tracing::trace;

/// 解析类型描述字符串
///
/// # Brief
/// `Parser::parse` 的便捷入口
///
/// # Arguments
/// * `input` - 类型描述字符串，如 `Array(Nullable(Int32))`
///
/// # Returns
/// 成功返回语法树根节点，括号不匹配或字面量未闭合返回 GrammarError
pub fn parse(input: &str) -> GrammarResult<SyntaxTreeNode> {
    Parser::parse(input)
}

/// 类型描述解析器
///
/// 节点名称为第一个未匹配 `(` 之前的文本，子节点为括号内按顶层逗号拆分的参数。
pub struct Parser<'a> {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    /// 创建新解析器
    ///
    /// # Arguments
    /// * `input` - 类型描述字符串
    ///
    /// # Returns
    /// 词法分析失败时返回 GrammarError
    pub fn new(input: &'a str) -> GrammarResult<Self> {
        let tokens = Lexer::tokenize(input)?;
        Ok(Self {
            tokens,
            pos: 0,
            input,
        })
    }

    /// 解析完整的类型描述
    ///
    /// # Brief
    /// 解析一个根节点，并要求输入在根节点之后结束
    ///
    /// # Arguments
    /// * `input` - 类型描述字符串
    ///
    /// # Returns
    /// 成功返回语法树，失败返回 GrammarError
    pub fn parse(input: &str) -> GrammarResult<SyntaxTreeNode> {
        if input.trim().is_empty() {
            return Err(GrammarError::EmptyInput);
        }
        let mut parser = Parser::new(input)?;
        let node = parser.parse_node()?;
        match parser.next() {
            None => {
                trace!("Parsed type descriptor {:?}", input);
                Ok(node)
            }
            Some((Token::RParen, span)) => Err(GrammarError::UnbalancedParentheses {
                position: span.start,
            }),
            Some((token, span)) => Err(GrammarError::Syntax {
                position: span.start,
                message: format!("Unexpected {} after type descriptor", token),
            }),
        }
    }

    fn peek(&self) -> Option<&(Token, Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<(Token, Range<usize>)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn position(&self) -> usize {
        self.peek().map(|(_, span)| span.start).unwrap_or(self.input.len())
    }

    fn parse_node(&mut self) -> GrammarResult<SyntaxTreeNode> {
        let start = self.position();
        let mut end = start;
        while let Some((Token::Text | Token::Literal, span)) = self.peek() {
            end = span.end;
            self.pos += 1;
        }
        let head = self.input[start..end].trim();

        match self.peek() {
            Some((Token::LParen, span)) => {
                let open = span.start;
                self.pos += 1;
                if head.is_empty() {
                    return Err(GrammarError::Syntax {
                        position: open,
                        message: "Missing type name before '('".to_string(),
                    });
                }
                let children = self.parse_arguments(open)?;
                Ok(SyntaxTreeNode::new(head, children))
            }
            _ => {
                if head.is_empty() {
                    return Err(GrammarError::Syntax {
                        position: start,
                        message: "Empty argument".to_string(),
                    });
                }
                Ok(SyntaxTreeNode::leaf(head))
            }
        }
    }

    fn parse_arguments(&mut self, open: usize) -> GrammarResult<Vec<SyntaxTreeNode>> {
        let mut children = Vec::new();
        if let Some((Token::RParen, _)) = self.peek() {
            self.pos += 1;
            return Ok(children);
        }
        loop {
            children.push(self.parse_node()?);
            match self.next() {
                Some((Token::Comma, _)) => continue,
                Some((Token::RParen, _)) => return Ok(children),
                Some((token, span)) => {
                    return Err(GrammarError::Syntax {
                        position: span.start,
                        message: format!("Expected ',' or ')', got {}", token),
                    })
                }
                None => return Err(GrammarError::UnbalancedParentheses { position: open }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name() {
        let node = parse("Int32").unwrap();
        assert_eq!(node, SyntaxTreeNode::leaf("Int32"));
    }

    #[test]
    fn test_nested() {
        let node = parse("Map(String, Array(Nullable(Int32)))").unwrap();
        assert_eq!(node.value, "Map");
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0], SyntaxTreeNode::leaf("String"));
        assert_eq!(node.children[1].value, "Array");
        assert_eq!(node.children[1].children[0].value, "Nullable");
        assert_eq!(node.children[1].children[0].children[0].value, "Int32");
    }

    #[test]
    fn test_flat_parameters_are_leaves() {
        let node = parse("Decimal(18,3)").unwrap();
        assert_eq!(node.value, "Decimal");
        assert_eq!(
            node.children,
            vec![SyntaxTreeNode::leaf("18"), SyntaxTreeNode::leaf("3")]
        );
    }

    #[test]
    fn test_quoted_literals() {
        let node = parse("DateTime64(3, 'Europe/Amsterdam')").unwrap();
        assert_eq!(node.children[1].value, "'Europe/Amsterdam'");
        assert_eq!(node.children[1].unquote(), "Europe/Amsterdam");

        let node = parse("Enum8('a, b' = 1, 'c)' = 2)").unwrap();
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].value, "'a, b' = 1");
        assert_eq!(node.children[1].value, "'c)' = 2");
    }

    #[test]
    fn test_named_tuple_child() {
        let node = parse("Tuple(a Int32, b Array(String))").unwrap();
        assert_eq!(node.children[0].value, "a Int32");
        assert_eq!(node.children[1].value, "b Array");
        assert_eq!(node.children[1].children[0].value, "String");
    }

    #[test]
    fn test_empty_arguments() {
        let node = parse("Tuple()").unwrap();
        assert_eq!(node.value, "Tuple");
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_unbalanced() {
        assert!(matches!(
            parse("Array(Int32"),
            Err(GrammarError::UnbalancedParentheses { position: 5 })
        ));
        assert!(matches!(
            parse("Array(Int32))"),
            Err(GrammarError::UnbalancedParentheses { .. })
        ));
    }

    #[test]
    fn test_unterminated_literal() {
        assert!(matches!(
            parse("DateTime('UTC)"),
            Err(GrammarError::UnterminatedLiteral { .. })
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse("   "), Err(GrammarError::EmptyInput));
        assert!(matches!(parse("Tuple(Int32,)"), Err(GrammarError::Syntax { .. })));
        assert!(matches!(parse("(Int32)"), Err(GrammarError::Syntax { .. })));
        assert!(matches!(
            parse("Array(Int32) trailing"),
            Err(GrammarError::Syntax { .. })
        ));
    }

    #[test]
    fn test_display_roundtrip() {
        for input in [
            "Map(String, Array(Nullable(Int32)))",
            "Tuple(a Int32, b String)",
            "DateTime64(3, 'UTC')",
            "Enum8('a' = 1, 'b' = 2)",
        ] {
            assert_eq!(parse(input).unwrap().to_string(), input);
        }
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn descriptor() -> impl Strategy<Value = String> {
            let leaf = prop::sample::select(vec!["Int32", "String", "UInt8", "Float64"])
                .prop_map(|s| s.to_string());
            leaf.prop_recursive(4, 16, 3, |inner| {
                prop_oneof![
                    inner.clone().prop_map(|t| format!("Array({})", t)),
                    inner.clone().prop_map(|t| format!("Nullable({})", t)),
                    (inner.clone(), inner).prop_map(|(k, v)| format!("Map({}, {})", k, v)),
                ]
            })
        }

        proptest! {
            #[test]
            fn parse_display_roundtrip(input in descriptor()) {
                let node = parse(&input).unwrap();
                prop_assert_eq!(node.to_string(), input);
            }
        }
    }
}
