//! Function calls.
//!
//! A function's argument type is a tuple with one element per parameter.
//! Calls list their arguments individually and are checked against those
//! elements.

use yune_ast::Expression;
use yune_core::{CompilationError, Span, TypeValue};

use super::{Analyzer, Check};
use crate::typed::{TypedExpr, TypedExprKind};

pub(super) fn infer_call(
    analyzer: &mut Analyzer<'_, '_, '_>,
    span: Span,
    function: &Expression,
    arguments: &[Expression],
) -> Check<TypedExpr> {
    let function = analyzer.infer(function, None)?;
    let Some((argument_type, return_type)) = function.ty.as_function() else {
        return Err(analyzer.report(CompilationError::NotAFunction {
            found: function.ty.clone(),
            span: function.span,
        }));
    };
    let parameters = match argument_type {
        TypeValue::Tuple(parameters) => parameters.clone(),
        single => vec![single.clone()],
    };
    let return_type = return_type.clone();

    if parameters.len() != arguments.len() {
        return Err(analyzer.report(CompilationError::ArityMismatch {
            expected: parameters.len(),
            found: arguments.len(),
            span,
        }));
    }

    let mut typed = Vec::with_capacity(arguments.len());
    for (argument, expected) in arguments.iter().zip(&parameters) {
        let checked = analyzer.infer(argument, Some(expected))?;
        if checked.ty != *expected {
            return Err(analyzer.report(CompilationError::ArgumentTypeMismatch {
                expected: expected.clone(),
                found: checked.ty,
                span: checked.span,
            }));
        }
        typed.push(checked);
    }

    Ok(TypedExpr::new(
        span,
        return_type,
        TypedExprKind::Call {
            function: Box::new(function),
            arguments: typed,
        },
    ))
}
