//! Statement AST nodes.
//!
//! A block evaluates to the value of its last statement. Branches are
//! always the final statement of their block.

use yune_core::{Name, Span};

use crate::expr::Expression;
use crate::ops::AssignmentOp;

/// A sequence of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub span: Span,
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>, span: Span) -> Self {
        Self { span, statements }
    }

    /// A block holding a single expression statement.
    pub fn expression(expression: Expression) -> Self {
        Self {
            span: expression.span(),
            statements: vec![Statement::Expression(expression)],
        }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Variable(VariableDeclaration),
    Assignment {
        span: Span,
        target: Name,
        op: AssignmentOp,
        body: Block,
    },
    /// `if condition then else otherwise`
    Branch {
        span: Span,
        condition: Expression,
        then: Block,
        otherwise: Block,
    },
    Expression(Expression),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Variable(v) => v.span,
            Statement::Assignment { span, .. } | Statement::Branch { span, .. } => *span,
            Statement::Expression(e) => e.span(),
        }
    }
}

/// `let name: ty = body`
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclaration {
    pub span: Span,
    pub name: Name,
    pub ty: Expression,
    pub body: Block,
}
