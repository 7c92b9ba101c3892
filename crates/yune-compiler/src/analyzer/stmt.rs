//! Blocks and statements.
//!
//! Every block opens a scope. Variables become visible to the statements
//! after their declaration, and the block's type is the type of its last
//! statement, or `()` when the block is empty.

use yune_ast::{AssignmentOp, Block, Expression, Statement, VariableDeclaration};
use yune_core::{CompilationError, Name, Span, TypeValue};

use super::{Analyzer, Check};
use crate::declaration::{Declaration, LocalKind};
use crate::typed::{TypedBlock, TypedStmt};

impl Analyzer<'_, '_, '_> {
    /// Check a block in a fresh child scope.
    ///
    /// `hint` is the type the block's value is expected to have. It only
    /// guides inference of the last statement; the caller still compares the
    /// result against the expected type.
    pub(super) fn check_block(
        &mut self,
        block: &Block,
        hint: Option<&TypeValue>,
    ) -> Check<TypedBlock> {
        let table = self.table;
        let mut scope = table.new_scope();
        let mut statements = Vec::with_capacity(block.statements.len());
        let count = block.statements.len();

        for (index, statement) in block.statements.iter().enumerate() {
            let is_last = index + 1 == count;
            let hint = if is_last { hint } else { None };
            let typed = self.nested(&scope).check_statement(statement, hint)?;
            if let TypedStmt::Variable { name, ty, .. } = &typed {
                let local = Declaration::local(name.clone(), LocalKind::Variable, ty.clone());
                if let Err(error) = scope.add(name, local) {
                    return Err(self.report(error));
                }
            }
            statements.push(typed);
        }

        let ty = statements.last().map_or_else(TypeValue::unit, TypedStmt::ty);
        Ok(TypedBlock {
            span: block.span,
            ty,
            statements,
        })
    }

    fn check_statement(
        &mut self,
        statement: &Statement,
        hint: Option<&TypeValue>,
    ) -> Check<TypedStmt> {
        match statement {
            Statement::Variable(variable) => self.check_variable(variable),
            Statement::Assignment {
                span,
                target,
                op,
                body,
            } => self.check_assignment(*span, target, *op, body),
            Statement::Branch {
                span,
                condition,
                then,
                otherwise,
            } => self.check_branch(*span, condition, then, otherwise, hint),
            Statement::Expression(expr) => Ok(TypedStmt::Expression(self.infer(expr, hint)?)),
        }
    }

    fn check_variable(&mut self, variable: &VariableDeclaration) -> Check<TypedStmt> {
        let ty = self.type_annotation(&variable.ty)?;
        let body = self.check_block(&variable.body, Some(&ty))?;
        if body.ty != ty {
            return Err(self.report(CompilationError::VariableTypeMismatch {
                expected: ty,
                found: body.ty.clone(),
                span: body.result_span(),
            }));
        }
        Ok(TypedStmt::Variable {
            span: variable.span,
            name: variable.name.clone(),
            ty,
            body,
        })
    }

    fn check_assignment(
        &mut self,
        span: Span,
        target: &Name,
        op: AssignmentOp,
        body: &Block,
    ) -> Check<TypedStmt> {
        let (declaration, variable_type) = self.get_type(target)?;
        let is_variable = matches!(
            &declaration,
            Declaration::Local(local) if local.kind == LocalKind::Variable
        );
        if !is_variable {
            return Err(self.report(CompilationError::InvalidAssignmentTarget {
                name: target.string.clone(),
                span: target.span,
            }));
        }

        let body = self.check_block(body, Some(&variable_type))?;
        if let Some(binary) = op.binary_op() {
            if !variable_type.is_numeric() {
                return Err(self.report(CompilationError::InvalidBinaryExpressionTypes {
                    op: binary.to_string(),
                    left: variable_type,
                    right: body.ty.clone(),
                    span,
                }));
            }
        }
        if body.ty != variable_type {
            return Err(self.report(CompilationError::AssignmentTypeMismatch {
                expected: variable_type,
                found: body.ty.clone(),
                span: body.result_span(),
            }));
        }

        Ok(TypedStmt::Assignment {
            span,
            target: target.string.clone(),
            op,
            body,
        })
    }

    fn check_branch(
        &mut self,
        span: Span,
        condition: &Expression,
        then: &Block,
        otherwise: &Block,
        hint: Option<&TypeValue>,
    ) -> Check<TypedStmt> {
        let condition = self.infer(condition, Some(&TypeValue::Bool))?;
        if condition.ty != TypeValue::Bool {
            return Err(self.report(CompilationError::InvalidConditionType {
                found: condition.ty,
                span: condition.span,
            }));
        }

        let then = self.check_block(then, hint)?;
        let otherwise = self.check_block(otherwise, hint)?;
        if then.ty != otherwise.ty {
            return Err(self.report(CompilationError::BranchTypeNotEqual {
                then: then.ty.clone(),
                then_span: then.result_span(),
                otherwise: otherwise.ty.clone(),
                else_span: otherwise.result_span(),
            }));
        }

        Ok(TypedStmt::Branch {
            span,
            ty: then.ty.clone(),
            condition,
            then,
            otherwise,
        })
    }
}
