//! Analysis of top-level declarations and type annotations.

use yune_ast::{ConstantDeclaration, Expression, FunctionDeclaration};
use yune_core::{BackendError, CompilationError, TypeValue, Value};

use super::{Analyzer, Check};
use crate::const_eval::ConstEvaluator;
use crate::declaration::{Builtin, DeclId, Declaration, LocalKind};
use crate::lower::{self, Signature};
use crate::typed::{TypedBlock, TypedExpr};

impl Analyzer<'_, '_, '_> {
    pub(super) fn analyze_builtin(&mut self, id: DeclId, builtin: Builtin) -> Check<()> {
        self.declare(&builtin.lower_declaration())?;
        self.define(id, &builtin.lower_definition())?;
        self.state.types.insert(id, builtin.ty());
        if let Some(aliased) = builtin.aliased() {
            self.state.values.insert(id, Value::Type(aliased));
        }
        Ok(())
    }

    /// Check a function.
    ///
    /// The signature is published before the body is checked so the body may
    /// call the function itself, or a function that calls back into it.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn analyze_function(
        &mut self,
        id: DeclId,
        function: &FunctionDeclaration,
    ) -> Check<()> {
        self.state.in_progress.insert(id);
        let mut parameters = Vec::with_capacity(function.parameters.len());
        for parameter in &function.parameters {
            let ty = self.type_annotation(&parameter.ty)?;
            parameters.push((parameter.name.clone(), ty));
        }
        let return_type = self.type_annotation(&function.return_type)?;
        let ty = TypeValue::function_of(
            parameters.iter().map(|(_, ty)| ty.clone()).collect(),
            return_type.clone(),
        );
        self.state.types.insert(id, ty.clone());
        self.state.in_progress.remove(&id);

        let lowered: Vec<(String, TypeValue)> = parameters
            .iter()
            .map(|(name, ty)| (name.string.clone(), ty.clone()))
            .collect();
        let signature = Signature {
            name: function.name.as_str(),
            parameters: &lowered,
            return_type: &return_type,
            is_entry_point: function.name.as_str() == self.state.options.entry_point,
        };
        self.declare(&lower::function_declaration(&signature))?;

        let table = self.table;
        let mut scope = table.new_scope();
        for (name, ty) in &parameters {
            let local = Declaration::local(name.clone(), LocalKind::Parameter, ty.clone());
            if let Err(error) = scope.add(name, local) {
                return Err(self.report(error));
            }
        }
        let body = self.nested(&scope).check_block(&function.body, Some(&return_type))?;
        if body.ty != return_type {
            return Err(self.report(CompilationError::ReturnTypeMismatch {
                expected: return_type.clone(),
                found: body.ty.clone(),
                span: body.result_span(),
            }));
        }
        if signature.is_entry_point && ty != TypeValue::main_signature() {
            return Err(self.report(CompilationError::InvalidMainSignature {
                found: ty,
                span: function.name.span,
            }));
        }

        self.define(id, &lower::function_definition(&signature, &body))?;
        Ok(())
    }

    /// Check a constant.
    ///
    /// The constant's type only becomes visible once it is defined, so a
    /// constant can never observe itself.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn analyze_constant(
        &mut self,
        id: DeclId,
        constant: &ConstantDeclaration,
    ) -> Check<()> {
        self.state.in_progress.insert(id);
        let ty = self.type_annotation(&constant.ty)?;
        let name = constant.name.as_str();
        self.declare(&lower::constant_declaration(name, &ty))?;

        let table = self.table;
        let scope = table.new_scope();
        let body = self.nested(&scope).check_block(&constant.body, Some(&ty))?;
        if body.ty != ty {
            return Err(self.report(CompilationError::ConstantTypeMismatch {
                expected: ty,
                found: body.ty.clone(),
                span: body.result_span(),
            }));
        }

        match self.fold_block(&body) {
            Some(value) => {
                self.define(id, &lower::constant_literal(name, &ty, &value))?;
                self.state.values.insert(id, value);
            }
            None => self.define(id, &lower::constant_definition(name, &ty, &body))?,
        }
        self.state.types.insert(id, ty);
        Ok(())
    }

    /// Check and evaluate a type annotation.
    ///
    /// The annotation must be an expression of type `Type`. Its value is
    /// folded when possible and evaluated by the backend otherwise.
    pub(super) fn type_annotation(&mut self, annotation: &Expression) -> Check<TypeValue> {
        let previous = std::mem::replace(&mut self.in_annotation, true);
        let typed = self.infer(annotation, Some(&TypeValue::Type));
        self.in_annotation = previous;
        let typed = typed?;

        if typed.ty != TypeValue::Type {
            return Err(self.report(CompilationError::UnexpectedType {
                expected: TypeValue::Type,
                found: typed.ty,
                span: annotation.span(),
            }));
        }

        let value = match self.fold(&typed) {
            Some(value) => value,
            None => self.evaluate(&typed)?,
        };
        match value {
            Value::Type(ty) => Ok(ty),
            other => Err(BackendError::Protocol {
                message: format!("type annotation evaluated to {other:?}"),
            }
            .into()),
        }
    }

    pub(super) fn fold(&self, expr: &TypedExpr) -> Option<Value> {
        if !self.state.options.fold_constants {
            return None;
        }
        ConstEvaluator::new(self.state.declarations, &self.state.values).eval(expr)
    }

    fn fold_block(&self, block: &TypedBlock) -> Option<Value> {
        if !self.state.options.fold_constants {
            return None;
        }
        ConstEvaluator::new(self.state.declarations, &self.state.values).eval_block(block)
    }
}
