//! Expression inference.
//!
//! `infer` takes an optional hint, the type the surrounding code expects.
//! Hints never make a mismatch legal. They only resolve what the expression
//! alone cannot: a tuple of types in type position is a tuple type, and an
//! empty list takes its element type from the hint.

use yune_ast::{Closure, Expression};
use yune_core::{CompilationError, Span, TypeValue, Value};

use super::{Analyzer, Check, calls, macros, operators};
use crate::declaration::{Declaration, LocalKind};
use crate::typed::{TypedExpr, TypedExprKind};

impl Analyzer<'_, '_, '_> {
    /// Infer the type of an expression and build its checked form.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn infer(&mut self, expr: &Expression, hint: Option<&TypeValue>) -> Check<TypedExpr> {
        let span = expr.span();
        match expr {
            Expression::Integer { value, .. } => Ok(TypedExpr::new(
                span,
                TypeValue::Int,
                TypedExprKind::Integer(*value),
            )),
            Expression::Float { value, .. } => Ok(TypedExpr::new(
                span,
                TypeValue::Float,
                TypedExprKind::Float(*value),
            )),
            Expression::Bool { value, .. } => Ok(TypedExpr::new(
                span,
                TypeValue::Bool,
                TypedExprKind::Bool(*value),
            )),
            Expression::String { value, .. } => Ok(TypedExpr::new(
                span,
                TypeValue::String,
                TypedExprKind::String(value.clone()),
            )),
            Expression::TypeLiteral { value, .. } => Ok(TypedExpr::value(
                span,
                TypeValue::Type,
                Value::Type(value.clone()),
            )),
            Expression::Variable(name) => {
                let (declaration, ty) = self.get_type(name)?;
                Ok(TypedExpr::new(
                    span,
                    ty,
                    TypedExprKind::Variable {
                        name: name.string.clone(),
                        declaration,
                    },
                ))
            }
            Expression::Call {
                function,
                arguments,
                ..
            } => calls::infer_call(self, span, function, arguments),
            Expression::Tuple { elements, .. } => self.infer_tuple(span, elements, hint),
            Expression::List { elements, .. } => self.infer_list(span, elements, hint),
            Expression::Unary { op, operand, .. } => {
                operators::infer_unary(self, span, *op, operand)
            }
            Expression::Binary {
                op, left, right, ..
            } => operators::infer_binary(self, span, *op, left, right),
            Expression::Macro(m) => macros::expand_macro(self, m, hint),
            Expression::Closure(closure) => self.infer_closure(closure),
        }
    }

    /// Infer `expr` and require the result to be `expected`.
    pub(super) fn check_expr(
        &mut self,
        expr: &Expression,
        expected: &TypeValue,
    ) -> Check<TypedExpr> {
        let typed = self.infer(expr, Some(expected))?;
        if typed.ty != *expected {
            return Err(self.report(CompilationError::UnexpectedType {
                expected: expected.clone(),
                found: typed.ty,
                span: typed.span,
            }));
        }
        Ok(typed)
    }

    fn infer_tuple(
        &mut self,
        span: Span,
        elements: &[Expression],
        hint: Option<&TypeValue>,
    ) -> Check<TypedExpr> {
        let element_hints: Vec<Option<&TypeValue>> = match hint {
            Some(TypeValue::Tuple(types)) if types.len() == elements.len() => {
                types.iter().map(Some).collect()
            }
            Some(TypeValue::Type) => vec![Some(&TypeValue::Type); elements.len()],
            _ => vec![None; elements.len()],
        };

        let mut typed = Vec::with_capacity(elements.len());
        for (element, hint) in elements.iter().zip(element_hints) {
            typed.push(self.infer(element, hint)?);
        }

        // In type position, a tuple of types is itself a type.
        let is_type = hint == Some(&TypeValue::Type)
            && typed.iter().all(|element| element.ty == TypeValue::Type);
        let ty = if is_type {
            TypeValue::Type
        } else {
            TypeValue::Tuple(typed.iter().map(|element| element.ty.clone()).collect())
        };
        Ok(TypedExpr::new(span, ty, TypedExprKind::Tuple(typed)))
    }

    fn infer_list(
        &mut self,
        span: Span,
        elements: &[Expression],
        hint: Option<&TypeValue>,
    ) -> Check<TypedExpr> {
        let mut element_type = match hint {
            Some(TypeValue::List(element)) => Some(element.as_ref().clone()),
            _ => None,
        };

        let mut typed = Vec::with_capacity(elements.len());
        for element in elements {
            let checked = match &element_type {
                Some(expected) => self.check_expr(element, expected)?,
                None => {
                    let inferred = self.infer(element, None)?;
                    element_type = Some(inferred.ty.clone());
                    inferred
                }
            };
            typed.push(checked);
        }

        // An empty list with nothing to go on holds nothing.
        let ty = TypeValue::list(element_type.unwrap_or(TypeValue::Nil));
        Ok(TypedExpr::new(span, ty, TypedExprKind::List(typed)))
    }

    /// Check a closure in a child scope. The outer locals its body resolves
    /// become its capture list.
    fn infer_closure(&mut self, closure: &Closure) -> Check<TypedExpr> {
        let mut parameters = Vec::with_capacity(closure.parameters.len());
        for parameter in &closure.parameters {
            let ty = self.type_annotation(&parameter.ty)?;
            parameters.push((parameter.name.clone(), ty));
        }
        let return_type = self.type_annotation(&closure.return_type)?;

        let table = self.table;
        let mut scope = table.new_scope();
        for (name, ty) in &parameters {
            let local = Declaration::local(name.clone(), LocalKind::Parameter, ty.clone());
            if let Err(error) = scope.add(name, local) {
                return Err(self.report(error));
            }
        }
        let body = self.nested(&scope).check_block(&closure.body, Some(&return_type))?;
        if body.ty != return_type {
            return Err(self.report(CompilationError::ReturnTypeMismatch {
                expected: return_type,
                found: body.ty.clone(),
                span: body.result_span(),
            }));
        }

        let captures: Vec<String> = scope
            .local_captures()
            .into_iter()
            .map(|capture| capture.name)
            .collect();
        tracing::trace!(captures = ?captures, "closure captures");

        let ty = TypeValue::function_of(
            parameters.iter().map(|(_, ty)| ty.clone()).collect(),
            return_type,
        );
        Ok(TypedExpr::new(
            closure.span,
            ty,
            TypedExprKind::Closure {
                parameters: parameters
                    .into_iter()
                    .map(|(name, ty)| (name.string, ty))
                    .collect(),
                captures,
                body: Box::new(body),
            },
        ))
    }
}
