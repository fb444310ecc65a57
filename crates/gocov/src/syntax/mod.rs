//! Go syntax support for the exclusion scanner
//!
//! A lexer with automatic semicolon insertion, a statement/block tree
//! (`FileNode`, `BlockNode`, `StatementNode`, `CaseNode`) and a visitor.

mod lexer;
mod tree;
pub mod visit;

pub use lexer::{lex, Comment, Position, Token, TokenKind, TokenStream};
pub use tree::{parse_file, BlockNode, CaseNode, FileNode, Node, StatementNode};
pub use visit::Visit;
