use crate::{GrammarError, GrammarResult};
use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,

    #[regex(r"'([^'\\]|\\.)*'")]
    Literal,

    #[regex(r"[^(),']+")]
    Text,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Comma => write!(f, "','"),
            Token::Literal => write!(f, "string literal"),
            Token::Text => write!(f, "text"),
        }
    }
}

/// 带位置的词法单元迭代器
pub struct Lexer<'a> {
    inner: logos::SpannedIter<'a, Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: Token::lexer(input).spanned(),
        }
    }

    /// 将输入切分为带位置的词法单元
    ///
    /// 唯一可能的词法错误是未闭合的单引号字面量。
    pub fn tokenize(input: &str) -> GrammarResult<Vec<(Token, Range<usize>)>> {
        Lexer::new(input).collect()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = GrammarResult<(Token, Range<usize>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (result, span) = self.inner.next()?;
        Some(match result {
            Ok(token) => Ok((token, span)),
            Err(()) => Err(GrammarError::UnterminatedLiteral {
                position: span.start,
            }),
        })
    }
}
