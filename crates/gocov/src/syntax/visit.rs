//! Document-order traversal of the syntax tree
//!
//! Same shape as `syn::visit::Visit`: override the hooks you need and call
//! the matching `walk_*` function to keep descending.

use super::tree::{BlockNode, CaseNode, FileNode, Node, StatementNode};

/// Visitor over the node model
pub trait Visit<'ast> {
    /// Visit a whole file
    fn visit_file(&mut self, node: &'ast FileNode) {
        walk_file(self, node);
    }

    /// Visit a statement or declaration
    fn visit_statement(&mut self, node: &'ast StatementNode) {
        walk_statement(self, node);
    }

    /// Visit a `{}` block
    fn visit_block(&mut self, node: &'ast BlockNode) {
        walk_block(self, node);
    }

    /// Visit a switch/select clause
    fn visit_case(&mut self, node: &'ast CaseNode) {
        walk_case(self, node);
    }
}

/// Visit each declaration
pub fn walk_file<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, node: &'ast FileNode) {
    for decl in &node.decls {
        v.visit_statement(decl);
    }
}

/// Visit each nested block
pub fn walk_statement<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, node: &'ast StatementNode) {
    for block in &node.blocks {
        v.visit_block(block);
    }
}

/// Visit each statement or clause
pub fn walk_block<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, node: &'ast BlockNode) {
    for item in &node.items {
        match item {
            Node::Statement(stmt) => v.visit_statement(stmt),
            Node::Case(case) => v.visit_case(case),
        }
    }
}

/// Visit each statement of the clause body
pub fn walk_case<'ast, V: Visit<'ast> + ?Sized>(v: &mut V, node: &'ast CaseNode) {
    for stmt in &node.body {
        v.visit_statement(stmt);
    }
}
