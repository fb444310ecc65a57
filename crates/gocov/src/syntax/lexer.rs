//! Go lexer
//!
//! Produces the token stream the tree builder needs: brackets, separators,
//! statement keywords and opaque operands, plus every comment with its
//! position. Go's automatic semicolon insertion is applied here so the
//! builder only ever sees explicit statement terminators.

use crate::result::{GocovError, GocovResult};
use logos::Logos;
use std::path::Path;

/// 1-based line/column position; columns count bytes like `go tool cover`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    /// Line number
    pub line: usize,
    /// Byte column
    pub column: usize,
}

impl Position {
    /// Create a position
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Token kinds recognized by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TokenKind {
    #[regex(r"//[^\n]*")]
    LineComment,
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    BlockComment,

    // Keywords that shape statements
    #[token("package")]
    Package,
    #[token("func")]
    Func,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("switch")]
    Switch,
    #[token("select")]
    Select,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("fallthrough")]
    Fallthrough,
    #[token("return")]
    Return,
    /// Any other keyword (`var`, `go`, `defer`, `struct`, ...)
    #[token("import")]
    #[token("var")]
    #[token("const")]
    #[token("type")]
    #[token("struct")]
    #[token("interface")]
    #[token("map")]
    #[token("chan")]
    #[token("go")]
    #[token("defer")]
    #[token("goto")]
    #[token("range")]
    Keyword,

    #[regex(r"[\p{L}_][\p{L}\p{N}_]*")]
    Ident,
    #[regex(r"[0-9][0-9a-zA-Z_]*(\.[0-9a-zA-Z_]*)?([eEpP][+-][0-9_]+i?)?")]
    #[regex(r"\.[0-9][0-9a-zA-Z_]*([eEpP][+-][0-9_]+i?)?")]
    Number,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"`[^`]*`")]
    String,
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Rune,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[regex(r"[-+*/%&|^<>=!~]|<<|>>|&\^|&&|\|\||<-|==|!=|<=|>=|:=")]
    #[regex(r"\+=|-=|\*=|/=|%=|&=|\|=|\^=|<<=|>>=|&\^=")]
    Operator,

    /// End of input (never produced by logos)
    Eof,
}

impl TokenKind {
    /// A newline after this token terminates the statement
    #[must_use]
    pub const fn ends_line_statement(self) -> bool {
        matches!(
            self,
            Self::Ident
                | Self::Number
                | Self::String
                | Self::Rune
                | Self::Break
                | Self::Continue
                | Self::Fallthrough
                | Self::Return
                | Self::Inc
                | Self::Dec
                | Self::RParen
                | Self::RBracket
                | Self::RBrace
        )
    }

    const fn is_comment(self) -> bool {
        matches!(self, Self::LineComment | Self::BlockComment)
    }
}

/// A code token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Kind
    pub kind: TokenKind,
    /// Position of the first byte
    pub start: Position,
    /// Position just past the last byte
    pub end: Position,
    /// Semicolon inserted at a line break rather than written
    pub implicit: bool,
}

/// A comment and where it sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Full comment text including `//` or `/* */`
    pub text: String,
    /// Position of the opening slash
    pub start: Position,
    /// Position just past the comment
    pub end: Position,
    /// No code precedes the comment on its line
    pub own_line: bool,
}

/// Lexed source: code tokens (ending with [`TokenKind::Eof`]) and comments
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    /// Code tokens with semicolons inserted
    pub tokens: Vec<Token>,
    /// Comments in document order
    pub comments: Vec<Comment>,
}

/// Leading byte order mark, skipped like the Go scanner does
const BOM: char = '\u{feff}';

/// Byte offset to line/column mapping
#[derive(Debug)]
struct LineIndex {
    starts: Vec<usize>,
    /// Bytes stripped from the front of line 1
    skipped: usize,
}

impl LineIndex {
    fn new(source: &str, skipped: usize) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts, skipped }
    }

    fn position(&self, offset: usize) -> Position {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line.saturating_sub(1)];
        let shift = if line <= 1 { self.skipped } else { 0 };
        Position::new(line, offset - start + 1 + shift)
    }
}

/// Lex Go source into a [`TokenStream`]
///
/// A leading byte order mark is skipped; columns on line 1 still count its
/// bytes so they match the compiler's positions.
pub fn lex(path: &Path, source: &str) -> GocovResult<TokenStream> {
    let (source, skipped) = source
        .strip_prefix(BOM)
        .map_or((source, 0), |rest| (rest, BOM.len_utf8()));
    let index = LineIndex::new(source, skipped);
    let mut stream = TokenStream::default();
    let mut lexer = TokenKind::lexer(source);
    let mut last: Option<Token> = None;

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let start = index.position(span.start);
        let end = index.position(span.end);
        let Ok(kind) = result else {
            return Err(GocovError::Parse {
                path: path.to_path_buf(),
                line: start.line,
                column: start.column,
                message: format!("unexpected character {:?}", &source[span]),
            });
        };

        if kind.is_comment() {
            let own_line = last.map_or(true, |t| t.end.line < start.line);
            stream.comments.push(Comment {
                text: source[span].to_string(),
                start,
                end,
                own_line,
            });
            continue;
        }

        if let Some(prev) = last {
            if prev.end.line < start.line && prev.kind.ends_line_statement() {
                stream.tokens.push(implicit_semicolon(prev.end));
            }
        }
        let token = Token {
            kind,
            start,
            end,
            implicit: false,
        };
        stream.tokens.push(token);
        last = Some(token);
    }

    let eof = index.position(source.len());
    if let Some(prev) = last {
        if prev.kind.ends_line_statement() {
            stream.tokens.push(implicit_semicolon(prev.end));
        }
    }
    stream.tokens.push(Token {
        kind: TokenKind::Eof,
        start: eof,
        end: eof,
        implicit: true,
    });
    Ok(stream)
}

const fn implicit_semicolon(at: Position) -> Token {
    Token {
        kind: TokenKind::Semicolon,
        start: at,
        end: at,
        implicit: true,
    }
}
