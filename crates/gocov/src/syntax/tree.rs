//! Statement/block tree for Go source
//!
//! The tree only models what scope detection needs: declarations and
//! statements with their extents, `{}` blocks nested anywhere inside a
//! statement (function bodies, `if`/`for` bodies, function literals passed
//! as arguments), and `case`/`default` clauses of `switch` and `select`.
//! Expressions are opaque token runs, so parameter lists, variadic calls
//! and composite literals never introduce statement boundaries.

use super::lexer::{lex, Comment, Position, Token, TokenKind};
use crate::result::{GocovError, GocovResult};
use std::path::{Path, PathBuf};

/// A parsed source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    /// Position of the `package` keyword
    pub package: Position,
    /// Top-level declarations in document order
    pub decls: Vec<StatementNode>,
    /// Every comment in the file, in document order
    pub comments: Vec<Comment>,
    /// Position just past the last code token
    pub end: Position,
}

/// A `{ ... }` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockNode {
    /// Position of `{`
    pub lbrace: Position,
    /// Position of `}`
    pub rbrace: Position,
    /// Statements, or clauses when this is a switch/select body
    pub items: Vec<Node>,
}

/// A statement or declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementNode {
    /// First token
    pub start: Position,
    /// Just past the last token
    pub end: Position,
    /// Blocks nested directly in this statement
    pub blocks: Vec<BlockNode>,
}

/// A `case` or `default` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseNode {
    /// Position of the `case`/`default` keyword
    pub keyword: Position,
    /// Position of the `:` closing the clause header
    pub colon: Position,
    /// Where the clause ends: the next clause keyword or the closing `}`
    pub end: Position,
    /// Clause body
    pub body: Vec<StatementNode>,
}

/// Item inside a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Plain statement
    Statement(StatementNode),
    /// Switch/select clause
    Case(CaseNode),
}

impl Node {
    /// Position where the item starts
    #[must_use]
    pub const fn start(&self) -> Position {
        match self {
            Self::Statement(stmt) => stmt.start,
            Self::Case(case) => case.keyword,
        }
    }
}

/// Parse Go source into a [`FileNode`]
pub fn parse_file(path: &Path, source: &str) -> GocovResult<FileNode> {
    let stream = lex(path, source)?;
    let mut builder = TreeBuilder {
        path: path.to_path_buf(),
        tokens: &stream.tokens,
        pos: 0,
    };
    let (package, decls, end) = builder.file()?;
    Ok(FileNode {
        package,
        decls,
        comments: stream.comments,
        end,
    })
}

struct TreeBuilder<'a> {
    path: PathBuf,
    tokens: &'a [Token],
    pos: usize,
}

impl TreeBuilder<'_> {
    fn peek(&self) -> Token {
        // lex always terminates the stream with Eof
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, at: Position, message: impl Into<String>) -> GocovError {
        GocovError::Parse {
            path: self.path.clone(),
            line: at.line,
            column: at.column,
            message: message.into(),
        }
    }

    fn skip_semicolons(&mut self) {
        while self.peek().kind == TokenKind::Semicolon {
            self.bump();
        }
    }

    fn file(&mut self) -> GocovResult<(Position, Vec<StatementNode>, Position)> {
        let first = self.peek();
        if first.kind != TokenKind::Package {
            return Err(self.error(first.start, "expected 'package' clause"));
        }
        let package = first.start;
        self.bump();
        let name = self.bump();
        if name.kind != TokenKind::Ident {
            return Err(self.error(name.start, "expected package name"));
        }

        let mut decls = Vec::new();
        let mut end = name.end;
        loop {
            self.skip_semicolons();
            let next = self.peek();
            match next.kind {
                TokenKind::Eof => break,
                TokenKind::RBrace => return Err(self.error(next.start, "unbalanced '}'")),
                TokenKind::Case | TokenKind::Default => {
                    return Err(self.error(next.start, "clause outside of switch or select"));
                }
                _ => {
                    let decl = self.statement()?;
                    end = decl.end;
                    decls.push(decl);
                }
            }
        }
        Ok((package, decls, end))
    }

    fn block(&mut self) -> GocovResult<BlockNode> {
        let lbrace = self.bump().start;
        let mut items = Vec::new();
        loop {
            self.skip_semicolons();
            let next = self.peek();
            match next.kind {
                TokenKind::RBrace => {
                    self.bump();
                    return Ok(BlockNode {
                        lbrace,
                        rbrace: next.start,
                        items,
                    });
                }
                TokenKind::Eof => {
                    return Err(self.error(
                        next.start,
                        format!("'{{' opened at line {} is never closed", lbrace.line),
                    ));
                }
                TokenKind::Case | TokenKind::Default => items.push(Node::Case(self.clause()?)),
                _ => items.push(Node::Statement(self.statement()?)),
            }
        }
    }

    fn clause(&mut self) -> GocovResult<CaseNode> {
        let keyword = self.bump().start;
        let mut depth = 0usize;
        let colon = loop {
            let token = self.bump();
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace if depth > 0 => {
                    depth -= 1;
                }
                TokenKind::Colon if depth == 0 => break token.start,
                TokenKind::RBrace | TokenKind::Eof => {
                    return Err(self.error(token.start, "expected ':' after case expression"));
                }
                _ => {}
            }
        };

        let mut body = Vec::new();
        loop {
            self.skip_semicolons();
            let next = self.peek();
            match next.kind {
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof => {
                    return Ok(CaseNode {
                        keyword,
                        colon,
                        end: next.start,
                        body,
                    });
                }
                _ => body.push(self.statement()?),
            }
        }
    }

    /// One statement: tokens up to a `;` outside brackets, or up to the `}`
    /// or clause keyword that ends the enclosing list.
    ///
    /// `if`, `for`, `switch` and `select` headers may contain `;` before
    /// their body, so terminators are ignored until that body is read.
    fn statement(&mut self) -> GocovResult<StatementNode> {
        let start = self.peek().start;
        let mut end = start;
        let mut blocks = Vec::new();
        let mut depth = 0usize;
        let mut in_header = false;

        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Semicolon if depth == 0 && !in_header => {
                    self.bump();
                    break;
                }
                TokenKind::RBrace | TokenKind::Case | TokenKind::Default if depth == 0 => break,
                TokenKind::RBrace => {
                    return Err(self.error(token.start, "unbalanced '}' inside brackets"));
                }
                TokenKind::LBrace => {
                    let block = self.block()?;
                    end = Position::new(block.rbrace.line, block.rbrace.column + 1);
                    blocks.push(block);
                    if depth == 0 {
                        in_header = false;
                    }
                    continue;
                }
                TokenKind::If | TokenKind::For | TokenKind::Switch | TokenKind::Select
                    if depth == 0 =>
                {
                    in_header = true;
                }
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => {
                    if depth == 0 {
                        return Err(self.error(token.start, "unbalanced closing bracket"));
                    }
                    depth -= 1;
                }
                _ => {}
            }
            if !token.implicit {
                end = token.end;
            }
            self.bump();
        }

        Ok(StatementNode { start, end, blocks })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parse(source: &str) -> FileNode {
        parse_file(Path::new("a.go"), source).unwrap()
    }

    fn func_body(file: &FileNode, index: usize) -> &BlockNode {
        &file.decls[index].blocks[0]
    }

    #[test]
    fn test_function_body_statements() {
        let file = parse(
            "package foo\n\nfunc Baz() int {\n\ti := 1\n\tif i > 1 {\n\t\treturn i\n\t}\n\
            \treturn 0\n}\n",
        );
        assert_eq!(file.decls.len(), 1);
        let body = func_body(&file, 0);
        assert_eq!(body.lbrace.line, 3);
        assert_eq!(body.rbrace.line, 9);
        assert_eq!(body.items.len(), 3);
        let Node::Statement(if_stmt) = &body.items[1] else {
            panic!("expected statement");
        };
        assert_eq!(if_stmt.start.line, 5);
        assert_eq!(if_stmt.end.line, 7);
        assert_eq!(if_stmt.blocks.len(), 1);
    }

    #[test]
    fn test_for_header_semicolons_stay_in_statement() {
        let file = parse("package foo\nfunc F() {\n\tfor i := 0; i < 3; i++ {\n\t\tg(i)\n\t}\n}\n");
        let body = func_body(&file, 0);
        assert_eq!(body.items.len(), 1);
    }

    #[test]
    fn test_if_with_init_and_else_if() {
        let file = parse(
            "package foo\nfunc F() {\n\tif a := f(); a {\n\t} else if b := g(); b {\n\
            \t} else {\n\t}\n\th()\n}\n",
        );
        let body = func_body(&file, 0);
        assert_eq!(body.items.len(), 2);
        let Node::Statement(stmt) = &body.items[0] else {
            panic!("expected statement");
        };
        assert_eq!(stmt.blocks.len(), 3);
    }

    #[test]
    fn test_function_literal_argument_is_nested_block() {
        let file = parse(
            "package foo\nfunc F() {\n\trun(func(x ...int) error {\n\t\treturn nil\n\t})\n\
            \tdone()\n}\n",
        );
        let body = func_body(&file, 0);
        assert_eq!(body.items.len(), 2);
        let Node::Statement(call) = &body.items[0] else {
            panic!("expected statement");
        };
        assert_eq!(call.blocks.len(), 1);
        assert_eq!(call.end.line, 5);
    }

    #[test]
    fn test_switch_clauses() {
        let file = parse(
            "package foo\nfunc F(x int) bool {\n\tswitch x {\n\tcase 1, 2:\n\t\treturn true\n\
            \tdefault:\n\t\tg()\n\t\treturn false\n\t}\n}\n",
        );
        let body = func_body(&file, 0);
        let Node::Statement(switch) = &body.items[0] else {
            panic!("expected statement");
        };
        let clauses: Vec<&CaseNode> = switch.blocks[0]
            .items
            .iter()
            .filter_map(|n| match n {
                Node::Case(c) => Some(c),
                Node::Statement(_) => None,
            })
            .collect();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].keyword.line, 4);
        assert_eq!(clauses[0].end.line, 6);
        assert_eq!(clauses[0].body.len(), 1);
        assert_eq!(clauses[1].body.len(), 2);
        assert_eq!(clauses[1].end.line, 9);
    }

    #[test]
    fn test_select_clause_with_receive() {
        let file = parse(
            "package foo\nfunc F(ch chan int) {\n\tselect {\n\tcase v := <-ch:\n\t\tuse(v)\n\
            \tcase <-time.After(s[1:2]):\n\t}\n}\n",
        );
        let body = func_body(&file, 0);
        let Node::Statement(select) = &body.items[0] else {
            panic!("expected statement");
        };
        assert_eq!(select.blocks[0].items.len(), 2);
    }

    #[test]
    fn test_imports_and_types() {
        let file = parse(
            "package foo\n\nimport (\n\t\"fmt\"\n\t\"os\"\n)\n\ntype Logger struct {\n\
            \tEnabled bool\n}\n\nvar x = []int{\n\t1,\n\t2,\n}\n",
        );
        assert_eq!(file.decls.len(), 3);
        assert_eq!(file.decls[0].start.line, 3);
        assert_eq!(file.decls[0].end.line, 6);
        assert_eq!(file.end.line, 15);
    }

    #[test]
    fn test_missing_package_clause() {
        let err = parse_file(Path::new("a.go"), "func F() {}").unwrap_err();
        assert!(err.to_string().contains("package"));
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse_file(Path::new("a.go"), "package foo\nfunc F() {\n\tx()\n").unwrap_err();
        assert!(err.to_string().contains("never closed"));
    }

    #[test]
    fn test_unbalanced_brace() {
        let err = parse_file(Path::new("a.go"), "package foo\n}\n").unwrap_err();
        assert!(matches!(err, GocovError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_comments_attached_to_file() {
        let file = parse("// header\npackage foo\n// notest\nfunc F() {}\n");
        assert_eq!(file.comments.len(), 2);
        assert_eq!(file.package.line, 2);
    }
}
