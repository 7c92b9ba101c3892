//! Type-checked trees produced by the analyzer.
//!
//! Every node carries its [`TypeValue`]. Lowering and constant folding only
//! ever see these trees, never raw syntax.

use yune_ast::{AssignmentOp, BinaryOp, UnaryOp};
use yune_core::{Name, Span, TypeValue, Value};

use crate::declaration::{DeclId, Declaration};

/// A checked expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub span: Span,
    pub ty: TypeValue,
    pub kind: TypedExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExprKind {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Variable {
        name: String,
        declaration: Declaration,
    },
    Call {
        function: Box<TypedExpr>,
        arguments: Vec<TypedExpr>,
    },
    /// A tuple of values, or a tuple type when `ty` is `Type`.
    Tuple(Vec<TypedExpr>),
    List(Vec<TypedExpr>),
    Unary {
        op: UnaryOp,
        operand: Box<TypedExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    Closure {
        parameters: Vec<(String, TypeValue)>,
        /// Outer locals the body refers to.
        captures: Vec<String>,
        body: Box<TypedBlock>,
    },
    /// A value already known at compile time.
    Value(Value),
}

impl TypedExpr {
    pub fn new(span: Span, ty: TypeValue, kind: TypedExprKind) -> Self {
        Self { span, ty, kind }
    }

    /// A known value of type `ty`.
    pub fn value(span: Span, ty: TypeValue, value: Value) -> Self {
        Self::new(span, ty, TypedExprKind::Value(value))
    }

    /// Visit every top-level declaration the expression refers to.
    pub fn visit_top_level(&self, visit: &mut impl FnMut(DeclId)) {
        match &self.kind {
            TypedExprKind::Integer(_)
            | TypedExprKind::Float(_)
            | TypedExprKind::Bool(_)
            | TypedExprKind::String(_)
            | TypedExprKind::Value(_) => {}
            TypedExprKind::Variable { declaration, .. } => {
                if let Declaration::TopLevel(id) = declaration {
                    visit(*id);
                }
            }
            TypedExprKind::Call {
                function,
                arguments,
            } => {
                function.visit_top_level(visit);
                for argument in arguments {
                    argument.visit_top_level(visit);
                }
            }
            TypedExprKind::Tuple(elements) | TypedExprKind::List(elements) => {
                for element in elements {
                    element.visit_top_level(visit);
                }
            }
            TypedExprKind::Unary { operand, .. } => operand.visit_top_level(visit),
            TypedExprKind::Binary { left, right, .. } => {
                left.visit_top_level(visit);
                right.visit_top_level(visit);
            }
            TypedExprKind::Closure { body, .. } => body.visit_top_level(visit),
        }
    }
}

/// A checked block. Its type is the type of its last statement.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedBlock {
    pub span: Span,
    pub ty: TypeValue,
    pub statements: Vec<TypedStmt>,
}

impl TypedBlock {
    /// The expression a single-expression block evaluates to.
    pub fn as_expression(&self) -> Option<&TypedExpr> {
        match self.statements.as_slice() {
            [TypedStmt::Expression(expr)] => Some(expr),
            _ => None,
        }
    }

    /// Span of the statement that produces the block's value.
    pub fn result_span(&self) -> Span {
        self.statements.last().map_or(self.span, TypedStmt::span)
    }

    pub fn visit_top_level(&self, visit: &mut impl FnMut(DeclId)) {
        for statement in &self.statements {
            match statement {
                TypedStmt::Variable { body, .. } | TypedStmt::Assignment { body, .. } => {
                    body.visit_top_level(visit)
                }
                TypedStmt::Branch {
                    condition,
                    then,
                    otherwise,
                    ..
                } => {
                    condition.visit_top_level(visit);
                    then.visit_top_level(visit);
                    otherwise.visit_top_level(visit);
                }
                TypedStmt::Expression(expr) => expr.visit_top_level(visit),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedStmt {
    Variable {
        span: Span,
        name: Name,
        ty: TypeValue,
        body: TypedBlock,
    },
    Assignment {
        span: Span,
        target: String,
        op: AssignmentOp,
        body: TypedBlock,
    },
    Branch {
        span: Span,
        ty: TypeValue,
        condition: TypedExpr,
        then: TypedBlock,
        otherwise: TypedBlock,
    },
    Expression(TypedExpr),
}

impl TypedStmt {
    pub fn span(&self) -> Span {
        match self {
            TypedStmt::Variable { span, .. }
            | TypedStmt::Assignment { span, .. }
            | TypedStmt::Branch { span, .. } => *span,
            TypedStmt::Expression(expr) => expr.span,
        }
    }

    /// Type of the value this statement leaves behind.
    pub fn ty(&self) -> TypeValue {
        match self {
            TypedStmt::Variable { .. } | TypedStmt::Assignment { .. } => TypeValue::unit(),
            TypedStmt::Branch { ty, .. } => ty.clone(),
            TypedStmt::Expression(expr) => expr.ty.clone(),
        }
    }
}
