//! Top-level declarations and function parameters.

use yune_core::{Name, Span};

use crate::expr::Expression;
use crate::stmt::Block;

/// A parsed module: top-level declarations in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub declarations: Vec<TopLevelDeclaration>,
}

/// A declaration at module scope.
#[derive(Debug, Clone, PartialEq)]
pub enum TopLevelDeclaration {
    Function(FunctionDeclaration),
    Constant(ConstantDeclaration),
}

impl TopLevelDeclaration {
    pub fn name(&self) -> &Name {
        match self {
            TopLevelDeclaration::Function(f) => &f.name,
            TopLevelDeclaration::Constant(c) => &c.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TopLevelDeclaration::Function(f) => f.span,
            TopLevelDeclaration::Constant(c) => c.span,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, TopLevelDeclaration::Function(_))
    }
}

/// `fn name(parameters): return_type -> body`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub span: Span,
    pub name: Name,
    pub parameters: Vec<FunctionParameter>,
    pub return_type: Expression,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionParameter {
    pub span: Span,
    pub name: Name,
    pub ty: Expression,
}

impl FunctionParameter {
    pub fn new(name: Name, ty: Expression) -> Self {
        Self {
            span: name.span,
            name,
            ty,
        }
    }
}

/// `const name: ty = body`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantDeclaration {
    pub span: Span,
    pub name: Name,
    pub ty: Expression,
    pub body: Block,
}
