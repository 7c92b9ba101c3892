//! Unary and binary operators.
//!
//! Operands are never converted: both sides of a binary operator must have
//! the same type.

use yune_ast::{BinaryOp, Expression, UnaryOp};
use yune_core::{CompilationError, Span, TypeValue};

use super::{Analyzer, Check};
use crate::typed::{TypedExpr, TypedExprKind};

pub(super) fn infer_unary(
    analyzer: &mut Analyzer<'_, '_, '_>,
    span: Span,
    op: UnaryOp,
    operand: &Expression,
) -> Check<TypedExpr> {
    let operand = analyzer.infer(operand, None)?;
    let valid = match op {
        UnaryOp::Negate => operand.ty.is_numeric(),
        UnaryOp::Not => operand.ty == TypeValue::Bool,
    };
    if !valid {
        return Err(analyzer.report(CompilationError::InvalidUnaryExpressionType {
            op: op.to_string(),
            found: operand.ty,
            span,
        }));
    }

    Ok(TypedExpr::new(
        span,
        operand.ty.clone(),
        TypedExprKind::Unary {
            op,
            operand: Box::new(operand),
        },
    ))
}

pub(super) fn infer_binary(
    analyzer: &mut Analyzer<'_, '_, '_>,
    span: Span,
    op: BinaryOp,
    left: &Expression,
    right: &Expression,
) -> Check<TypedExpr> {
    let left = analyzer.infer(left, None)?;
    let right = analyzer.infer(right, Some(&left.ty))?;

    let Some(ty) = result_type(op, &left.ty, &right.ty) else {
        return Err(analyzer.report(CompilationError::InvalidBinaryExpressionTypes {
            op: op.to_string(),
            left: left.ty,
            right: right.ty,
            span,
        }));
    };

    Ok(TypedExpr::new(
        span,
        ty,
        TypedExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    ))
}

/// Type of `left op right`, if the operator applies.
fn result_type(op: BinaryOp, left: &TypeValue, right: &TypeValue) -> Option<TypeValue> {
    if left != right {
        return None;
    }
    if op.is_arithmetic() {
        left.is_numeric().then(|| left.clone())
    } else if op.is_ordering() {
        left.is_numeric().then_some(TypeValue::Bool)
    } else if op.is_logical() {
        (*left == TypeValue::Bool).then_some(TypeValue::Bool)
    } else if op.is_equality() {
        Some(TypeValue::Bool)
    } else {
        None
    }
}
