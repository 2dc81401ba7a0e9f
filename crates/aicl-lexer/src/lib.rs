//! AICL lexer.
//!
//! Tokenizes AICL workflow scripts. Keywords are matched case-insensitively,
//! identifiers are case-sensitive. Uses the `logos` crate for the token
//! automaton, with callbacks for the two constructs that need manual
//! scanning (string literals and block comments).

use logos::Logos;
use smol_str::SmolStr;
use std::fmt;
use std::ops::Range;

/// Source span representing a byte range in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Span::new(range.start, range.end)
    }
}

impl From<Span> for Range<usize> {
    fn from(span: Span) -> Self {
        span.start..span.end
    }
}

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Callback for string literals. The opening quote has already been
/// consumed; scan until the closing quote or end of input. `\"` yields an
/// embedded quote; any other backslash sequence passes through verbatim
/// (backslash plus the following character). An unterminated literal
/// consumes the rest of the input.
fn lex_string(lex: &mut logos::Lexer<TokenKind>) -> SmolStr {
    let remainder = lex.remainder();
    let mut value = String::new();
    let mut consumed = remainder.len();

    let mut chars = remainder.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                consumed = i + 1;
                break;
            }
            '\\' => match chars.next() {
                Some((_, '"')) => value.push('"'),
                Some((_, other)) => {
                    value.push('\\');
                    value.push(other);
                }
                None => {
                    value.push('\\');
                    break;
                }
            },
            other => value.push(other),
        }
    }

    lex.bump(consumed);
    SmolStr::new(value)
}

/// Callback for `/* ... */` block comments (non-nesting). The opening `/*`
/// has been consumed. An unterminated comment runs to end of input.
fn lex_block_comment(lex: &mut logos::Lexer<TokenKind>) -> SmolStr {
    let remainder = lex.remainder();
    if let Some(end) = remainder.find("*/") {
        let content = SmolStr::new(&remainder[..end]);
        lex.bump(end + 2);
        content
    } else {
        lex.bump(remainder.len());
        SmolStr::new(remainder)
    }
}

/// All token kinds in AICL.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"\s+")]
pub enum TokenKind {
    // ========== Keywords (case-insensitive) ==========
    #[token("START", ignore(ascii_case))]
    Start,
    #[token("END", ignore(ascii_case))]
    End,
    #[token("DATA", ignore(ascii_case))]
    Data,
    #[token("TYPE", ignore(ascii_case))]
    Type,
    #[token("VALUE", ignore(ascii_case))]
    Value,
    #[token("PERM", ignore(ascii_case))]
    Perm,
    #[token("AGENT", ignore(ascii_case))]
    Agent,
    #[token("ACCESS", ignore(ascii_case))]
    Access,
    #[token("TASK", ignore(ascii_case))]
    Task,
    #[token("PARAMETERS", ignore(ascii_case))]
    Parameters,
    #[token("RUNSEQ", ignore(ascii_case))]
    RunSeq,
    #[token("RUNCON", ignore(ascii_case))]
    RunCon,
    #[token("WAIT", ignore(ascii_case))]
    Wait,

    // ========== Literals ==========
    /// Identifier: a Unicode letter followed by letters, digits or `_`.
    #[regex(r"[\p{L}][\p{L}\p{Nd}_]*", |lex| SmolStr::new(lex.slice()))]
    Identifier(SmolStr),

    /// Double-quoted string literal, stored with escapes resolved.
    #[token("\"", lex_string)]
    String(SmolStr),

    /// Number literal: a run of digits optionally containing `.`. Kept as
    /// text; no numeric conversion happens at lex time.
    #[regex(r"[0-9][0-9.]*", |lex| SmolStr::new(lex.slice()))]
    Number(SmolStr),

    // ========== Punctuation ==========
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("=")]
    Equal,

    // ========== Trivia ==========
    #[regex(r"//[^\n]*", |lex| SmolStr::new(&lex.slice()[2..]))]
    LineComment(SmolStr),
    #[token("/*", lex_block_comment)]
    BlockComment(SmolStr),

    /// Produced by the wrapper for any byte the automaton rejects. The
    /// offending byte is identified by the token's span and reported in
    /// the error list.
    Illegal,
}

impl TokenKind {
    /// Check if this token is a comment.
    pub fn is_comment(&self) -> bool {
        matches!(self, TokenKind::LineComment(_) | TokenKind::BlockComment(_))
    }

    /// Keyword kinds, in declaration order.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Start
                | TokenKind::End
                | TokenKind::Data
                | TokenKind::Type
                | TokenKind::Value
                | TokenKind::Perm
                | TokenKind::Agent
                | TokenKind::Access
                | TokenKind::Task
                | TokenKind::Parameters
                | TokenKind::RunSeq
                | TokenKind::RunCon
                | TokenKind::Wait
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Start => write!(f, "START"),
            TokenKind::End => write!(f, "END"),
            TokenKind::Data => write!(f, "DATA"),
            TokenKind::Type => write!(f, "TYPE"),
            TokenKind::Value => write!(f, "VALUE"),
            TokenKind::Perm => write!(f, "PERM"),
            TokenKind::Agent => write!(f, "AGENT"),
            TokenKind::Access => write!(f, "ACCESS"),
            TokenKind::Task => write!(f, "TASK"),
            TokenKind::Parameters => write!(f, "PARAMETERS"),
            TokenKind::RunSeq => write!(f, "RUNSEQ"),
            TokenKind::RunCon => write!(f, "RUNCON"),
            TokenKind::Wait => write!(f, "WAIT"),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            TokenKind::String(value) => write!(f, "\"{value}\""),
            TokenKind::Number(value) => write!(f, "{value}"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Equal => write!(f, "="),
            TokenKind::LineComment(_) => write!(f, "line comment"),
            TokenKind::BlockComment(_) => write!(f, "block comment"),
            TokenKind::Illegal => write!(f, "illegal character"),
        }
    }
}

/// Lexer error type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LexerError {
    #[error("unexpected character '{1}' at position {0}")]
    UnexpectedCharacter(usize, char),
}

/// Lexer for AICL source text.
pub struct Lexer<'src> {
    source: &'src str,
    inner: logos::Lexer<'src, TokenKind>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            inner: TokenKind::lexer(source),
        }
    }

    /// Get the source text being lexed.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Tokenize the entire source into a vector of tokens.
    ///
    /// Rejected bytes become `Illegal` tokens and are additionally reported
    /// through the error list, so a caller can choose between recovery and
    /// strictness.
    pub fn tokenize(self) -> (Vec<Token>, Vec<LexerError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        for (result, span) in self.inner.spanned() {
            match result {
                Ok(kind) => tokens.push(Token::new(kind, Span::from(span))),
                Err(_) => {
                    let bad_char = self.source[span.clone()].chars().next().unwrap_or('?');
                    errors.push(LexerError::UnexpectedCharacter(span.start, bad_char));
                    tokens.push(Token::new(TokenKind::Illegal, Span::from(span)));
                }
            }
        }

        (tokens, errors)
    }

    /// Tokenize, filtering out comment tokens.
    pub fn tokenize_filtered(self) -> (Vec<Token>, Vec<LexerError>) {
        let (tokens, errors) = self.tokenize();
        let filtered = tokens.into_iter().filter(|t| !t.kind.is_comment()).collect();
        (filtered, errors)
    }
}
